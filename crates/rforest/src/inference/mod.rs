//! Batch inference over a trained [`Model`](crate::Model).
//!
//! The execution context's backend picks the layout a model is evaluated
//! in: the host walks the pre-order [`HostForest`](crate::interop::HostForest)
//! one row at a time, the device runs the level-synchronous kernel of
//! [`DeviceForest`](crate::interop::DeviceForest) over row blocks. Both sum
//! tree predictions in `f64` in tree order, so their labels are identical.
//!
//! ```
//! use rforest::{infer, train, ExecutionContext, HomogenTable, Table, TrainConfig};
//!
//! let ctx = ExecutionContext::host().sequential();
//! let x = HomogenTable::from_vec((0..40).map(|i| i as f32).collect(), 20, 2)?;
//! let y = HomogenTable::column_vector((0..20).map(|i| (i / 10) as f32).collect());
//! let config = TrainConfig::builder().tree_count(5).build()?;
//!
//! let model = train(&ctx, &config, &x, &y)?.into_model();
//! let labels = infer(&ctx, &model, &x)?.into_labels();
//! assert_eq!(labels.row_count(), 20);
//! # Ok::<(), rforest::Error>(())
//! ```

mod predictor;

pub use predictor::{Inferencer, DEFAULT_BLOCK_SIZE};

use crate::context::ExecutionContext;
use crate::data::Table;
use crate::error::Result;
use crate::model::{InferResult, Model};

/// Predict every row of `x` with `model` on `ctx`.
///
/// Shorthand for [`Inferencer::new`] followed by [`Inferencer::infer`]; build
/// an [`Inferencer`] directly to reuse the backend layout across calls.
///
/// # Errors
///
/// [`Error::Data`](crate::Error::Data) if the model has no trees or `x` has
/// fewer columns than the model has features.
pub fn infer<X: Table + ?Sized>(ctx: &ExecutionContext, model: &Model, x: &X) -> Result<InferResult> {
    Inferencer::new(*ctx, model)?.infer(x)
}
