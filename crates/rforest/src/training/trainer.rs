//! Random-forest trainer.
//!
//! Training runs `tree_count` independent pipelines, one per tree:
//! sample rows → grow the tree → score the tree on its own out-of-bag rows.
//! Pipelines run on the execution context's worker pool and own all their
//! intermediate state; their outcomes are reduced afterwards in tree-index
//! order, so the model, the importances and the OOB errors do not depend
//! on the thread count.
//!
//! # Out-of-bag policy
//!
//! A row's OOB error is the mean squared error of the trees for which the
//! row was out of bag. A row that is in bag for every tree is reported as
//! `NaN` and contributes nothing to the scalar OOB error, which is the mean
//! over rows that were out of bag at least once (`NaN` if there are none).

use crate::context::ExecutionContext;
use crate::data::{HomogenTable, Table, TableRow};
use crate::error::{Error, Result};
use crate::model::{Model, TrainResult};
use crate::repr::{Forest, Tree, TreeView};
use crate::utils::Parallelism;

use super::config::{ErrorMetricMode, TrainConfig};
use super::grower::{GrowerParams, TreeGrower};
use super::histogram::{BinCuts, BinnedMatrix};
use super::logger::TrainingLogger;
use super::sampling::Sampler;
use super::split::SplitParams;

/// Everything one tree pipeline produces.
struct TreeOutcome {
    tree: Tree,
    /// Per-feature impurity decrease; empty when importance is off.
    importance: Vec<f64>,
    /// `(row, squared error)` for each out-of-bag row.
    oob: Vec<(u32, f64)>,
}

/// Random-forest regression trainer.
#[derive(Debug, Clone, Default)]
pub struct ForestTrainer {
    config: TrainConfig,
}

impl ForestTrainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train a forest on `x` (`M × N`) and `y` (`M × 1`).
    ///
    /// # Errors
    ///
    /// Checked in this order, before any computation:
    /// - [`Error::Domain`]: a configuration value is out of range
    /// - [`Error::Data`]: empty or mis-shaped tables, non-finite values
    /// - [`Error::Overflow`]: the request exceeds an index or size limit
    pub fn train<X, Y>(&self, ctx: &ExecutionContext, x: &X, y: &Y) -> Result<TrainResult>
    where
        X: Table + ?Sized,
        Y: Table + ?Sized,
    {
        self.config.validate()?;
        validate_data(x, y)?;
        self.config.validate_for_features(x.column_count())?;
        check_limits(&self.config, x.row_count(), x.column_count())?;

        let result = ctx.install(|parallelism| self.train_impl(x, y, parallelism))?;
        Ok(result.with_residency(ctx.residency()))
    }

    fn train_impl<X, Y>(&self, x: &X, y: &Y, parallelism: Parallelism) -> TrainResult
    where
        X: Table + ?Sized,
        Y: Table + ?Sized,
    {
        let config = &self.config;
        let n_rows = x.row_count();
        let n_features = x.column_count();
        let n_trees = config.tree_count as usize;
        let metrics = config.error_metric_mode;
        let needs_oob = metrics.requires_oob();
        let needs_importance = config.computes_importance();

        let mut logger = TrainingLogger::new(config.verbosity);
        logger.start_training(n_trees, n_rows, n_features);

        let targets: Vec<f64> = (0..n_rows).map(|r| y.get(r, 0) as f64).collect();
        let cuts = BinCuts::compute(
            x,
            config.max_bins as usize,
            config.min_bin_size as usize,
            parallelism,
        );
        let binned = BinnedMatrix::from_table(x, &cuts, parallelism);
        logger.log_bins(cuts.total_bins(), n_features);

        let sampler = Sampler::new(
            config.seed,
            config.bootstrap,
            config.observations_per_tree_fraction,
        );
        let grower = TreeGrower::new(
            &binned,
            &cuts,
            &targets,
            GrowerParams {
                max_depth: config.depth_limit(),
                features_per_node: config.resolved_features_per_node(n_features),
                impurity_threshold: config.impurity_threshold,
                split: SplitParams {
                    min_observations_in_leaf: config.min_observations_in_leaf_node as u32,
                    min_impurity_decrease: config.min_impurity_decrease_in_split_node,
                },
            },
        );

        // Trees are grown sequentially inside each task; parallelism is
        // across trees.
        let outcomes = parallelism.maybe_par_map(0..n_trees, |tree_index| {
            let (sample, mut rng) = sampler.sample(tree_index, n_rows);
            let oob_rows = if needs_oob { sample.oob_rows() } else { Vec::new() };
            let grown = grower.grow(sample.into_rows(), &mut rng);

            let oob = oob_rows
                .into_iter()
                .map(|row| {
                    let prediction = grown.tree.predict(&TableRow::new(x, row as usize));
                    let error = prediction - targets[row as usize];
                    (row, error * error)
                })
                .collect();

            TreeOutcome {
                tree: grown.tree,
                importance: if needs_importance {
                    grown.importance
                } else {
                    Vec::new()
                },
                oob,
            }
        });

        // Reduce in tree order.
        let mut forest = Forest::with_capacity(n_trees);
        let mut importance = vec![0.0f64; if needs_importance { n_features } else { 0 }];
        let mut oob_sum = vec![0.0f64; if needs_oob { n_rows } else { 0 }];
        let mut oob_hits = vec![0u32; if needs_oob { n_rows } else { 0 }];

        for (tree_index, outcome) in outcomes.into_iter().enumerate() {
            logger.log_tree(
                tree_index,
                outcome.tree.n_nodes(),
                outcome.tree.n_leaves(),
                outcome.tree.depth(),
            );
            for (acc, v) in importance.iter_mut().zip(&outcome.importance) {
                *acc += v;
            }
            for (row, squared_error) in outcome.oob {
                oob_sum[row as usize] += squared_error;
                oob_hits[row as usize] += 1;
            }
            forest.push_tree(outcome.tree);
        }

        let mut result = TrainResult::new(Model::from_trained(forest, n_features));

        if needs_importance {
            let values = importance
                .iter()
                .map(|&v| (v / n_trees as f64) as f32)
                .collect();
            result.var_importance = HomogenTable::row_vector(values);
        }

        if needs_oob {
            let per_row: Vec<f64> = oob_sum
                .iter()
                .zip(&oob_hits)
                .map(|(&sum, &hits)| {
                    if hits == 0 {
                        f64::NAN
                    } else {
                        sum / hits as f64
                    }
                })
                .collect();
            let oob_rows = oob_hits.iter().filter(|&&h| h > 0).count();
            let scalar = if oob_rows == 0 {
                f64::NAN
            } else {
                per_row.iter().filter(|v| !v.is_nan()).sum::<f64>() / oob_rows as f64
            };
            logger.log_oob(scalar, oob_rows, n_rows);

            if metrics.contains(ErrorMetricMode::OUT_OF_BAG_ERROR) {
                result.oob_err = HomogenTable::column_vector(vec![scalar as f32]);
            }
            if metrics.contains(ErrorMetricMode::OUT_OF_BAG_ERROR_PER_OBSERVATION) {
                result.oob_err_per_observation =
                    HomogenTable::column_vector(per_row.iter().map(|&v| v as f32).collect());
            }
        }

        logger.finish_training(n_trees);
        result
    }
}

/// Train a forest with `config` on the given context.
///
/// Shorthand for `ForestTrainer::new(config.clone()).train(ctx, x, y)`.
pub fn train<X, Y>(ctx: &ExecutionContext, config: &TrainConfig, x: &X, y: &Y) -> Result<TrainResult>
where
    X: Table + ?Sized,
    Y: Table + ?Sized,
{
    ForestTrainer::new(config.clone()).train(ctx, x, y)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_data<X, Y>(x: &X, y: &Y) -> Result<()>
where
    X: Table + ?Sized,
    Y: Table + ?Sized,
{
    if !x.has_data() {
        return Err(Error::data("feature table is empty"));
    }
    if !y.has_data() {
        return Err(Error::data("target table is empty"));
    }
    if y.column_count() != 1 {
        return Err(Error::data(format!(
            "target table must have one column, got {}",
            y.column_count()
        )));
    }
    if x.row_count() != y.row_count() {
        return Err(Error::data(format!(
            "feature table has {} rows but target table has {}",
            x.row_count(),
            y.row_count()
        )));
    }
    for row in 0..x.row_count() {
        for col in 0..x.column_count() {
            if !x.get(row, col).is_finite() {
                return Err(Error::data(format!(
                    "non-finite feature value at row {row}, column {col}"
                )));
            }
        }
        if !y.get(row, 0).is_finite() {
            return Err(Error::data(format!("non-finite target value at row {row}")));
        }
    }
    Ok(())
}

fn check_limits(config: &TrainConfig, n_rows: usize, n_features: usize) -> Result<()> {
    if config.tree_count as u64 > u32::MAX as u64 {
        return Err(Error::overflow(format!(
            "tree_count {} exceeds the tree index space",
            config.tree_count
        )));
    }
    if n_rows as u64 > u32::MAX as u64 {
        return Err(Error::overflow(format!(
            "{n_rows} rows exceed the row index space"
        )));
    }
    // u32::MAX marks leaves in the device layout.
    if n_features as u64 >= u32::MAX as u64 {
        return Err(Error::overflow(format!(
            "{n_features} features exceed the feature index space"
        )));
    }
    let tree_bytes = (config.tree_count as usize).checked_mul(std::mem::size_of::<Tree>());
    let binned_bytes = n_rows
        .checked_mul(n_features)
        .and_then(|n| n.checked_mul(std::mem::size_of::<u32>()));
    for (what, bytes) in [("forest", tree_bytes), ("binned feature matrix", binned_bytes)] {
        if bytes.map_or(true, |b| b > isize::MAX as usize) {
            return Err(Error::overflow(format!("{what} size exceeds isize::MAX bytes")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::VariableImportanceMode;

    fn step_tables() -> (HomogenTable, HomogenTable) {
        let x: Vec<f32> = (0..40).map(|i| i as f32).collect();
        let y: Vec<f32> = (0..40).map(|i| if i < 20 { 1.0 } else { 3.0 }).collect();
        (
            HomogenTable::from_vec(x, 40, 1).unwrap(),
            HomogenTable::column_vector(y),
        )
    }

    fn small_config() -> TrainConfig {
        TrainConfig::builder()
            .tree_count(8)
            .min_observations_in_leaf_node(1)
            .min_bin_size(1)
            .build()
            .unwrap()
    }

    #[test]
    fn trains_requested_number_of_trees() {
        let (x, y) = step_tables();
        let result = train(&ExecutionContext::host(), &small_config(), &x, &y).unwrap();
        let model = result.get_model();
        assert_eq!(model.tree_count(), 8);
        assert_eq!(model.n_features(), 1);
        assert!(!result.get_var_importance().has_data());
        assert!(!result.get_oob_err().has_data());
    }

    #[test]
    fn validation_order_is_domain_data_overflow() {
        let (x, y) = step_tables();
        let ctx = ExecutionContext::host();

        // Domain beats data.
        let mut config = small_config();
        config.max_bins = 1;
        let empty = HomogenTable::empty();
        assert!(train(&ctx, &config, &empty, &y).unwrap_err().is_domain());

        // Data beats overflow.
        let mut config = small_config();
        config.tree_count = i64::MAX;
        assert!(train(&ctx, &config, &empty, &y).unwrap_err().is_data());
        assert!(train(&ctx, &config, &x, &y).unwrap_err().is_overflow());
    }

    #[test]
    fn rejects_malformed_data() {
        let (x, y) = step_tables();
        let ctx = ExecutionContext::host();
        let config = small_config();

        let short_y = HomogenTable::column_vector(vec![1.0; 39]);
        assert!(train(&ctx, &config, &x, &short_y).unwrap_err().is_data());

        let wide_y = HomogenTable::from_vec(vec![0.0; 80], 40, 2).unwrap();
        assert!(train(&ctx, &config, &x, &wide_y).unwrap_err().is_data());

        let mut bad = x.to_vec();
        bad[3] = f32::NAN;
        let bad_x = HomogenTable::from_vec(bad, 40, 1).unwrap();
        assert!(train(&ctx, &config, &bad_x, &y).unwrap_err().is_data());

        let mut bad = y.to_vec();
        bad[0] = f32::INFINITY;
        let bad_y = HomogenTable::column_vector(bad);
        assert!(train(&ctx, &config, &x, &bad_y).unwrap_err().is_data());
    }

    #[test]
    fn features_per_node_beyond_columns_is_domain_error() {
        let (x, y) = step_tables();
        let mut config = small_config();
        config.features_per_node = 2;
        let err = train(&ExecutionContext::host(), &config, &x, &y).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn results_do_not_depend_on_thread_count() {
        let (x, y) = step_tables();
        let config = TrainConfig::builder()
            .tree_count(6)
            .min_observations_in_leaf_node(2)
            .min_bin_size(1)
            .variable_importance_mode(VariableImportanceMode::Mdi)
            .error_metric_mode(ErrorMetricMode::OUT_OF_BAG_ERROR_PER_OBSERVATION)
            .build()
            .unwrap();
        let seq = train(&ExecutionContext::host().sequential(), &config, &x, &y).unwrap();
        let par = train(&ExecutionContext::host().with_threads(4), &config, &x, &y).unwrap();
        assert_eq!(seq.get_model().forest(), par.get_model().forest());
        assert_eq!(seq.get_var_importance(), par.get_var_importance());
        let a = seq.get_oob_err_per_observation().to_vec();
        let b = par.get_oob_err_per_observation().to_vec();
        assert_eq!(a.len(), b.len());
        for (a, b) in a.iter().zip(&b) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn result_tables_follow_context_residency() {
        let (x, y) = step_tables();
        let config = TrainConfig::builder()
            .tree_count(2)
            .error_metric_mode(ErrorMetricMode::OUT_OF_BAG_ERROR)
            .build()
            .unwrap();
        let result = train(&ExecutionContext::device(), &config, &x, &y).unwrap();
        assert_eq!(
            result.get_oob_err().residency(),
            crate::context::Residency::Device
        );
    }
}
