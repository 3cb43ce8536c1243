//! Random-forest regression model.
//!
//! High-level wrapper around [`Forest`] with metadata, prediction and
//! persistence. The model exclusively owns its trees; backend layouts
//! produced by [`crate::interop`] are independent copies.

use std::path::Path;

use crate::data::SampleAccessor;
use crate::error::{Error, Result};
use crate::persist;
use crate::repr::{Forest, Tree};

use super::meta::ModelMeta;

/// Trained random-forest regression model.
///
/// Immutable after training. Access components via
/// [`forest()`](Self::forest) and [`meta()`](Self::meta).
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    forest: Forest,
    meta: ModelMeta,
}

impl Model {
    /// Create a regression model over `n_features` features from a forest.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidModel`] if a tree is malformed or tests a feature
    /// at or beyond `n_features`.
    pub fn new(forest: Forest, n_features: usize) -> Result<Self> {
        let meta = ModelMeta::regression(n_features, forest.n_trees());
        Self::from_parts(forest, meta)
    }

    /// Wrap a forest grown by the trainer, which only emits valid trees.
    pub(crate) fn from_trained(forest: Forest, n_features: usize) -> Self {
        let meta = ModelMeta::regression(n_features, forest.n_trees());
        Self { forest, meta }
    }

    /// Create a model from its parts, validating every tree.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidModel`] if a tree is malformed or tests a feature
    /// beyond `meta.n_features`; [`Error::Data`] if `meta.tree_count`
    /// disagrees with the forest.
    pub fn from_parts(forest: Forest, meta: ModelMeta) -> Result<Self> {
        if meta.tree_count != forest.n_trees() {
            return Err(Error::data(format!(
                "metadata declares {} trees, forest has {}",
                meta.tree_count,
                forest.n_trees()
            )));
        }
        forest.validate(Some(meta.n_features))?;
        Ok(Self { forest, meta })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    #[inline]
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    #[inline]
    pub fn tree_count(&self) -> usize {
        self.forest.n_trees()
    }

    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        self.forest.tree(idx)
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        self.forest.trees()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.meta.n_features
    }

    /// Set feature names.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.meta.feature_names = Some(names);
        self
    }

    /// Validate every tree against the model's feature count.
    pub fn validate(&self) -> Result<()> {
        self.forest.validate(Some(self.meta.n_features))
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Predict a single row: mean leaf value over all trees.
    ///
    /// For batches, use [`crate::inference::infer`].
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        self.forest.predict_row(sample)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Encode the model as JSON bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        persist::to_json_bytes(self)
    }

    /// Decode a model from JSON bytes, validating it.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        persist::from_json_bytes(bytes)
    }

    /// Write the model to a JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.serialize()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a model from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::deserialize(&bytes)
    }
}
