//! Trained models and training/inference results.

mod forest_model;
mod meta;
mod results;

pub use forest_model::Model;
pub use meta::{ModelMeta, TaskKind};
pub use results::{InferResult, TrainResult};
