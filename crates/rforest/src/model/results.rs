//! Outputs of training and inference calls.

use crate::context::Residency;
use crate::data::HomogenTable;

use super::Model;

/// Output of a training call.
///
/// Optional outputs that were not requested are empty tables
/// (`has_data() == false`).
#[derive(Debug, Clone)]
pub struct TrainResult {
    pub(crate) model: Model,
    /// `1 × N` mean decrease of impurity per feature.
    pub(crate) var_importance: HomogenTable,
    /// `1 × 1` out-of-bag mean squared error.
    pub(crate) oob_err: HomogenTable,
    /// `M × 1` out-of-bag mean squared error per observation.
    pub(crate) oob_err_per_observation: HomogenTable,
}

impl TrainResult {
    pub(crate) fn new(model: Model) -> Self {
        Self {
            model,
            var_importance: HomogenTable::empty(),
            oob_err: HomogenTable::empty(),
            oob_err_per_observation: HomogenTable::empty(),
        }
    }

    pub(crate) fn with_residency(mut self, residency: Residency) -> Self {
        self.var_importance = self.var_importance.with_residency(residency);
        self.oob_err = self.oob_err.with_residency(residency);
        self.oob_err_per_observation = self.oob_err_per_observation.with_residency(residency);
        self
    }

    pub fn get_model(&self) -> &Model {
        &self.model
    }

    pub fn get_var_importance(&self) -> &HomogenTable {
        &self.var_importance
    }

    pub fn get_oob_err(&self) -> &HomogenTable {
        &self.oob_err
    }

    /// Rows that were never out of bag hold `NaN`.
    pub fn get_oob_err_per_observation(&self) -> &HomogenTable {
        &self.oob_err_per_observation
    }

    pub fn into_model(self) -> Model {
        self.model
    }
}

/// Output of an inference call.
#[derive(Debug, Clone)]
pub struct InferResult {
    labels: HomogenTable,
}

impl InferResult {
    pub(crate) fn new(labels: HomogenTable) -> Self {
        Self { labels }
    }

    /// `M × 1` predictions, resident where the call ran.
    pub fn get_labels(&self) -> &HomogenTable {
        &self.labels
    }

    pub fn into_labels(self) -> HomogenTable {
        self.labels
    }
}
