//! rforest: random-forest regression for Rust.
//!
//! Trains ensembles of regression trees over dense numeric tables, with
//! histogram-based split search, out-of-bag error and variable importance,
//! and evaluates them on either of two compute backends through a lossless
//! model interop layer.
//!
//! # Key Types
//!
//! - [`TrainConfig`] - Hyperparameters, built with `TrainConfig::builder()`
//! - [`ExecutionContext`] - Backend and thread budget for a call
//! - [`HomogenTable`] / [`Table`] - Input and result tables
//! - [`Model`] - Trained forest plus metadata
//! - [`TrainResult`] / [`InferResult`] - Call outputs
//!
//! # Training and inference
//!
//! ```
//! use rforest::{infer, train, ExecutionContext, Table, TrainConfig};
//! use rforest::testing::reference_dataset;
//!
//! let data = reference_dataset()?;
//! let ctx = ExecutionContext::host();
//!
//! let config = TrainConfig::builder().build()?;
//! let result = train(&ctx, &config, &data.x_train, &data.y_train)?;
//! let labels = infer(&ctx, result.get_model(), &data.x_test)?;
//! assert_eq!(labels.get_labels().row_count(), 5);
//! # Ok::<(), rforest::Error>(())
//! ```
//!
//! # Moving models between backends
//!
//! A [`Model`] does not belong to any backend. Train on one context and run
//! inference on another, or convert explicitly with the adapters in
//! [`interop`]. Models persist as JSON through [`Model::save_json`] and
//! [`Model::load_json`].

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod context;
pub mod data;
mod error;
pub mod inference;
pub mod interop;
pub mod model;
pub mod persist;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use error::{Error, Result};

pub use context::{Backend, ExecutionContext, Residency};
pub use data::{HomogenTable, SampleAccessor, Table};

pub use model::{InferResult, Model, ModelMeta, TaskKind, TrainResult};

pub use training::{
    train, ErrorMetricMode, ForestTrainer, TrainConfig, VariableImportanceMode, Verbosity,
};

pub use inference::{infer, Inferencer};
pub use interop::{DeviceForest, HostForest, ModelInterop};

pub use utils::{run_with_threads, Parallelism};
