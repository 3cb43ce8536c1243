//! Model metadata.

/// Type of machine learning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TaskKind {
    /// Regression (continuous target).
    #[default]
    Regression,
}

impl TaskKind {
    /// Returns true if this is a regression task.
    pub fn is_regression(&self) -> bool {
        matches!(self, Self::Regression)
    }
}

/// Introspection data about a model's structure and training context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMeta {
    /// Task type.
    pub task: TaskKind,
    /// Number of features the model was trained on.
    pub n_features: usize,
    /// Number of trees.
    pub tree_count: usize,
    /// Feature names (optional).
    pub feature_names: Option<Vec<String>>,
}

impl ModelMeta {
    pub fn regression(n_features: usize, tree_count: usize) -> Self {
        Self {
            task: TaskKind::Regression,
            n_features,
            tree_count,
            feature_names: None,
        }
    }
}
