//! Random-forest training configuration with builder pattern.
//!
//! [`TrainConfig`] gathers every training hyperparameter and uses the `bon`
//! crate for builder generation with validation.
//!
//! # Example
//!
//! ```
//! use rforest::training::{ErrorMetricMode, TrainConfig, VariableImportanceMode};
//!
//! // All defaults
//! let config = TrainConfig::builder().build().unwrap();
//!
//! let config = TrainConfig::builder()
//!     .tree_count(50)
//!     .features_per_node(1)
//!     .variable_importance_mode(VariableImportanceMode::Mdi)
//!     .error_metric_mode(ErrorMetricMode::OUT_OF_BAG_ERROR)
//!     .build()
//!     .unwrap();
//! ```

use std::ops::{BitOr, BitOrAssign};

use bon::Builder;

use crate::error::{Error, Result};
use crate::training::Verbosity;

// =============================================================================
// Option enums
// =============================================================================

/// Which variable importance to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableImportanceMode {
    #[default]
    None,
    /// Mean decrease of impurity, averaged over trees.
    Mdi,
}

/// Set of out-of-bag error outputs to compute.
///
/// Flags combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ErrorMetricMode(u8);

impl ErrorMetricMode {
    pub const NONE: Self = Self(0);
    /// Scalar OOB mean squared error.
    pub const OUT_OF_BAG_ERROR: Self = Self(1);
    /// Per-observation OOB mean squared error.
    pub const OUT_OF_BAG_ERROR_PER_OBSERVATION: Self = Self(1 << 1);

    /// `true` if every flag in `other` is set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `true` if any out-of-bag output is requested.
    #[inline]
    pub fn requires_oob(self) -> bool {
        !self.is_none()
    }
}

impl BitOr for ErrorMetricMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorMetricMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// TrainConfig
// =============================================================================

/// Configuration for random-forest regression training.
///
/// Integer options are signed so that out-of-range requests (zero,
/// negative, beyond the index space) are reported as errors rather than
/// being unrepresentable.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct TrainConfig {
    // === Ensemble ===
    /// Number of trees. Default: 100.
    #[builder(default = 100)]
    pub tree_count: i64,

    /// Candidate features drawn per node. `0` selects `max(1, N / 3)`.
    #[builder(default = 0)]
    pub features_per_node: i64,

    // === Tree shape ===
    /// Minimum observations in each child of a split. Default: 5.
    #[builder(default = 5)]
    pub min_observations_in_leaf_node: i64,

    /// Maximum depth, root at depth 0. `0` = unlimited.
    #[builder(default = 0)]
    pub max_tree_depth: i64,

    /// A node whose target variance is at most this value is a leaf.
    #[builder(default = 0.0)]
    pub impurity_threshold: f64,

    /// Minimum impurity decrease per parent observation for a split.
    #[builder(default = 0.0)]
    pub min_impurity_decrease_in_split_node: f64,

    // === Histograms ===
    /// Maximum buckets per feature. Default: 256.
    #[builder(default = 256)]
    pub max_bins: i64,

    /// Minimum observations per bucket. Default: 5.
    #[builder(default = 5)]
    pub min_bin_size: i64,

    // === Sampling ===
    /// Draw rows with replacement. Out-of-bag metrics require it.
    #[builder(default = true)]
    pub bootstrap: bool,

    /// Fraction of rows drawn per tree, in `(0, 1]`.
    #[builder(default = 1.0)]
    pub observations_per_tree_fraction: f64,

    // === Outputs ===
    #[builder(default)]
    pub variable_importance_mode: VariableImportanceMode,

    #[builder(default)]
    pub error_metric_mode: ErrorMetricMode,

    // === Reproducibility ===
    /// Random seed. Default: 777.
    #[builder(default = 777)]
    pub seed: u64,

    // === Logging ===
    /// Verbosity level. Default: `Silent`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: train_config_builder::IsComplete> TrainConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Domain`] if any table-independent rule is violated.
    pub fn build(self) -> Result<TrainConfig> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

const U32_MAX: i64 = u32::MAX as i64;

impl TrainConfig {
    /// Validate the table-independent domain rules.
    ///
    /// Fields are public, so training re-runs this before touching data.
    pub fn validate(&self) -> Result<()> {
        if self.tree_count < 1 {
            return Err(Error::domain("tree_count", self.tree_count, "must be at least 1"));
        }
        check_range("features_per_node", self.features_per_node, 0, U32_MAX)?;
        check_range(
            "min_observations_in_leaf_node",
            self.min_observations_in_leaf_node,
            1,
            U32_MAX,
        )?;
        check_range("max_tree_depth", self.max_tree_depth, 0, U32_MAX)?;
        check_range("max_bins", self.max_bins, 2, U32_MAX)?;
        check_range("min_bin_size", self.min_bin_size, 1, U32_MAX)?;

        let fraction = self.observations_per_tree_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(Error::domain(
                "observations_per_tree_fraction",
                fraction,
                "must be in (0, 1]",
            ));
        }
        check_non_negative("impurity_threshold", self.impurity_threshold)?;
        check_non_negative(
            "min_impurity_decrease_in_split_node",
            self.min_impurity_decrease_in_split_node,
        )?;

        if self.error_metric_mode.requires_oob() && !self.bootstrap {
            return Err(Error::domain(
                "error_metric_mode",
                format!("{:?}", self.error_metric_mode),
                "out-of-bag metrics require bootstrap = true",
            ));
        }
        Ok(())
    }

    /// Validate the rules that depend on the feature count.
    pub(crate) fn validate_for_features(&self, n_features: usize) -> Result<()> {
        if self.features_per_node as u64 > n_features as u64 {
            return Err(Error::domain(
                "features_per_node",
                self.features_per_node,
                format!("exceeds the {n_features} columns of the feature table"),
            ));
        }
        Ok(())
    }

    /// Candidate features per node for a table with `n_features` columns.
    pub fn resolved_features_per_node(&self, n_features: usize) -> usize {
        match self.features_per_node {
            0 => (n_features / 3).max(1),
            k => (k as usize).min(n_features),
        }
    }

    /// Depth limit, `None` when unlimited.
    pub fn depth_limit(&self) -> Option<usize> {
        match self.max_tree_depth {
            0 => None,
            d => Some(d as usize),
        }
    }

    #[inline]
    pub fn computes_importance(&self) -> bool {
        self.variable_importance_mode == VariableImportanceMode::Mdi
    }
}

fn check_range(param: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::domain(
            param,
            value,
            format!("must be in [{min}, {max}]"),
        ));
    }
    Ok(())
}

fn check_non_negative(param: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::domain(param, value, "must be finite and non-negative"));
    }
    Ok(())
}
