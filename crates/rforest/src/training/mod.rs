//! Random-forest training.
//!
//! One pipeline per tree, each owning its state:
//!
//! - [`sampling`]: per-tree bootstrap rows and out-of-bag sets
//! - [`histogram`]: global bin cuts, binned matrix, per-node bucket statistics
//! - [`split`]: best split by impurity decrease over bucket boundaries
//! - [`grower`]: depth-first tree growth with in-place row partitioning
//! - [`trainer`]: orchestration, OOB error and variable importance
//!
//! [`TrainConfig`] holds every hyperparameter; [`TrainingLogger`] reports
//! progress through `tracing` at the configured [`Verbosity`].

pub mod config;
pub mod grower;
pub mod histogram;
mod logger;
pub mod sampling;
pub mod split;
pub mod trainer;

pub use config::{ErrorMetricMode, TrainConfig, VariableImportanceMode};
pub use grower::{GrowerParams, GrownTree, TreeGrower};
pub use histogram::{BinCuts, BinStats, BinnedMatrix, NodeHistogram};
pub use logger::{TrainingLogger, Verbosity};
pub use sampling::{BootstrapSample, Sampler};
pub use split::{SplitCandidate, SplitFinder, SplitParams};
pub use trainer::{train, ForestTrainer};
