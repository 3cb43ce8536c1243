//! Schema types for model serialization.
//!
//! These types provide a stable serialization format independent of runtime
//! types, so the on-disk form can evolve separately from the in-memory
//! representation and is validated on the way in.

use serde::{Deserialize, Serialize};

/// Current serialized format version.
pub const FORMAT_VERSION: u32 = 1;

/// Task type for model output interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKindSchema {
    Regression,
}

/// Model metadata schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaSchema {
    pub task: TaskKindSchema,
    pub num_features: usize,
    pub tree_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

/// Tree schema (SoA layout, nodes in pre-order).
///
/// Thresholds and leaf values are written as `f64`; every `f32` threshold
/// is exactly representable, so the round trip is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    /// Number of nodes (internal + leaves).
    pub num_nodes: u32,
    pub split_indices: Vec<u32>,
    pub thresholds: Vec<f64>,
    pub children_left: Vec<u32>,
    pub children_right: Vec<u32>,
    pub is_leaf: Vec<bool>,
    /// Mean target per node; the prediction for leaves.
    pub node_values: Vec<f64>,
    /// Training observations that reached each node.
    pub covers: Vec<u32>,
    /// Impurity decrease of each split (0 for leaves).
    pub gains: Vec<f64>,
}

/// Forest schema (trees in index order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSchema {
    pub trees: Vec<TreeSchema>,
}

/// Top-level serialized model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModelSchema {
    pub format_version: u32,
    pub model_type: String,
    pub meta: ModelMetaSchema,
    pub forest: ForestSchema,
}

impl RandomForestModelSchema {
    pub const MODEL_TYPE: &'static str = "random_forest_regression";
}
