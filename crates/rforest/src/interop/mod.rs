//! Model interop layer.
//!
//! A [`Model`] is backend-agnostic. Each compute backend executes against
//! its own native layout, produced and consumed through one adapter per
//! backend implementing [`ModelInterop`]:
//!
//! - [`HostForest`]: array-of-structs nodes in pre-order, walked one row at
//!   a time by the host predictor.
//! - [`DeviceForest`]: breadth-first structure-of-arrays buffers, walked
//!   level by level over row blocks by the device kernel.
//!
//! Backend layouts are disposable copies. Exporting never moves or shares
//! the model's trees, and importing always builds a fresh, validated model.
//! `import(export(model))` reproduces the model exactly: same node arrays,
//! bit-identical thresholds and leaf values.

mod device;
mod host;

pub use device::{DeviceForest, LEAF_FEATURE};
pub use host::{HostForest, HostNode, HostTreeView};

use crate::error::Result;
use crate::model::Model;

/// Conversion between the logical model and one backend's layout.
pub trait ModelInterop: Sized {
    /// Lay out `model` for this backend.
    fn export(model: &Model) -> Self;

    /// Rebuild a logical model from this layout.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidModel`](crate::Error::InvalidModel) if the layout does
    /// not describe a structurally valid forest.
    fn import(&self) -> Result<Model>;
}
