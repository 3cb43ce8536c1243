//! Split finding by variance reduction.
//!
//! For each tree node, the best split is found by:
//! 1. Drawing the node's candidate features (without replacement)
//! 2. Scanning the bucket boundaries of each candidate feature left to right
//! 3. Scoring each boundary by its impurity decrease
//! 4. Keeping the strictly best boundary, so ties resolve to the lowest
//!    feature index and then to the lowest threshold
//!
//! # Impurity decrease
//!
//! With `m2` the centred sum of squares of a set of targets,
//!
//! ```text
//! decrease = m2(parent) − m2(left) − m2(right)
//!          = (mean_R − mean_L)² · n_L · n_R / n
//!          = n · [var(parent) − n_L/n · var(left) − n_R/n · var(right)]
//! ```
//!
//! The second form is what is computed: it is never negative and carries no
//! cancellation.

use rand::Rng;

use super::histogram::{BinCuts, BinStats, NodeHistogram};

// ============================================================================
// SplitParams
// ============================================================================

/// Constraints a split must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    /// Minimum observations on each side.
    pub min_observations_in_leaf: u32,
    /// Minimum impurity decrease per parent observation.
    pub min_impurity_decrease: f64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            min_observations_in_leaf: 1,
            min_impurity_decrease: 0.0,
        }
    }
}

// ============================================================================
// SplitCandidate
// ============================================================================

/// Best split found for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCandidate {
    pub feature: u32,
    /// Last bucket on the left side.
    pub bin: u32,
    /// Lower bound of the first right bucket; `x < threshold` goes left.
    pub threshold: f32,
    pub left: BinStats,
    pub right: BinStats,
    pub impurity_decrease: f64,
}

// ============================================================================
// Feature selection
// ============================================================================

/// Draw `k` distinct features out of `n_features`, returned ascending.
///
/// Uses a partial Fisher-Yates shuffle; when `k >= n_features` every
/// feature is returned and `rng` is not advanced.
pub fn select_features<R: Rng + ?Sized>(rng: &mut R, n_features: usize, k: usize) -> Vec<u32> {
    let mut features: Vec<u32> = (0..n_features as u32).collect();
    if k >= n_features {
        return features;
    }
    for i in 0..k {
        let j = rng.gen_range(i..n_features);
        features.swap(i, j);
    }
    features.truncate(k);
    features.sort_unstable();
    features
}

// ============================================================================
// SplitFinder
// ============================================================================

/// Exhaustive scan over histogram bucket boundaries.
#[derive(Debug, Clone, Default)]
pub struct SplitFinder {
    params: SplitParams,
}

impl SplitFinder {
    pub fn new(params: SplitParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SplitParams {
        &self.params
    }

    /// Best valid split over the histogram's candidate features.
    ///
    /// `parent` holds the statistics of every row of the node. Returns
    /// `None` when no boundary satisfies the constraints.
    pub fn find_best_split(
        &self,
        histogram: &NodeHistogram,
        cuts: &BinCuts,
        parent: &BinStats,
    ) -> Option<SplitCandidate> {
        let n = parent.count();
        let min_leaf = self.params.min_observations_in_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }
        let min_decrease = self.params.min_impurity_decrease * n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut suffix = Vec::new();

        // Ascending feature order with strict improvement keeps the lowest
        // feature (then the lowest threshold) among equal decreases.
        let mut order: Vec<usize> = (0..histogram.features().len()).collect();
        order.sort_by_key(|&i| histogram.features()[i]);

        for i in order {
            let feature = histogram.features()[i];
            let bins = histogram.feature_stats(i);
            if bins.len() < 2 {
                continue;
            }

            // suffix[b] = stats of buckets b.. (merged, never subtracted)
            suffix.clear();
            suffix.resize(bins.len() + 1, BinStats::default());
            for b in (0..bins.len()).rev() {
                suffix[b] = bins[b].merge(&suffix[b + 1]);
            }

            let mut left = BinStats::default();
            for b in 0..bins.len() - 1 {
                left.merge_in(&bins[b]);
                if bins[b].is_empty() {
                    // Same partition as the previous boundary.
                    continue;
                }
                let right = suffix[b + 1];
                if left.count() < min_leaf {
                    continue;
                }
                if right.count() < min_leaf {
                    break;
                }

                let decrease = left.pooling_gain(&right);
                if decrease <= 0.0 || decrease < min_decrease {
                    continue;
                }
                if best.map_or(true, |s| decrease > s.impurity_decrease) {
                    best = Some(SplitCandidate {
                        feature,
                        bin: b as u32,
                        threshold: cuts.threshold(feature as usize, b),
                        left,
                        right,
                        impurity_decrease: decrease,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::HomogenTable;
    use crate::training::histogram::BinnedMatrix;
    use crate::utils::Parallelism;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    struct Fixture {
        cuts: BinCuts,
        binned: BinnedMatrix,
        targets: Vec<f64>,
    }

    fn fixture(x: Vec<f32>, n_features: usize, y: Vec<f64>) -> Fixture {
        let n_rows = y.len();
        let table = HomogenTable::from_vec(x, n_rows, n_features).unwrap();
        let cuts = BinCuts::compute(&table, 256, 1, Parallelism::Sequential);
        let binned = BinnedMatrix::from_table(&table, &cuts, Parallelism::Sequential);
        Fixture {
            cuts,
            binned,
            targets: y,
        }
    }

    fn best_split(fx: &Fixture, features: &[u32], params: SplitParams) -> Option<SplitCandidate> {
        let rows: Vec<u32> = (0..fx.targets.len() as u32).collect();
        let hist = NodeHistogram::build(&fx.binned, &fx.cuts, &fx.targets, &rows, features);
        let parent: BinStats = fx.targets.iter().copied().collect();
        SplitFinder::new(params).find_best_split(&hist, &fx.cuts, &parent)
    }

    #[test]
    fn finds_step_in_target() {
        let fx = fixture(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            1,
            vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
        );
        let split = best_split(&fx, &[0], SplitParams::default()).unwrap();
        assert_eq!(split.feature, 0);
        assert_eq!(split.bin, 2);
        assert_eq!(split.threshold, 4.0);
        assert_eq!(split.left.count(), 3);
        assert_eq!(split.right.count(), 3);
        // Whole spread removed: m2(parent) = 150.
        assert_relative_eq!(split.impurity_decrease, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn decrease_equals_m2_difference() {
        let y = vec![1.0, 4.0, 2.0, 8.0, 5.0, 7.0, 3.0];
        let x: Vec<f32> = (0..7).map(|i| i as f32).collect();
        let fx = fixture(x, 1, y.clone());
        let split = best_split(&fx, &[0], SplitParams::default()).unwrap();
        let parent: BinStats = y.iter().copied().collect();
        assert_relative_eq!(
            split.impurity_decrease,
            parent.m2() - split.left.m2() - split.right.m2(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn ties_pick_lowest_feature() {
        // Both features separate the targets identically.
        let fx = fixture(
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0],
            2,
            vec![0.0, 0.0, 1.0, 1.0],
        );
        let split = best_split(&fx, &[1, 0], SplitParams::default()).unwrap();
        assert_eq!(split.feature, 0);
    }

    #[test]
    fn ties_pick_lowest_threshold() {
        // Splitting after row 0 or after row 1 gives the same decrease.
        let fx = fixture(vec![0.0, 1.0, 2.0], 1, vec![0.0, 1.0, 0.0]);
        let split = best_split(&fx, &[0], SplitParams::default()).unwrap();
        assert_eq!(split.threshold, 1.0);
    }

    #[test]
    fn respects_min_observations_in_leaf() {
        let fx = fixture(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            1,
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 10.0],
        );
        let free = best_split(&fx, &[0], SplitParams::default()).unwrap();
        assert_eq!(free.right.count(), 1);

        let params = SplitParams {
            min_observations_in_leaf: 2,
            ..Default::default()
        };
        let constrained = best_split(&fx, &[0], params).unwrap();
        assert_eq!(constrained.right.count(), 2);

        let params = SplitParams {
            min_observations_in_leaf: 4,
            ..Default::default()
        };
        assert!(best_split(&fx, &[0], params).is_none());
    }

    #[test]
    fn rejects_useless_and_weak_splits() {
        // Constant target: nothing to gain.
        let fx = fixture(vec![1.0, 2.0, 3.0, 4.0], 1, vec![5.0; 4]);
        assert!(best_split(&fx, &[0], SplitParams::default()).is_none());

        // Decrease per row is 150 / 6 = 25.
        let fx = fixture(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            1,
            vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0],
        );
        let params = |min_impurity_decrease| SplitParams {
            min_observations_in_leaf: 1,
            min_impurity_decrease,
        };
        assert!(best_split(&fx, &[0], params(25.0)).is_some());
        assert!(best_split(&fx, &[0], params(25.5)).is_none());
    }

    #[test]
    fn constant_feature_never_splits() {
        let fx = fixture(vec![3.0; 4], 1, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(best_split(&fx, &[0], SplitParams::default()).is_none());
    }

    #[test]
    fn feature_selection_is_distinct_and_sorted() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        for _ in 0..50 {
            let features = select_features(&mut rng, 10, 4);
            assert_eq!(features.len(), 4);
            assert!(features.windows(2).all(|w| w[0] < w[1]));
            assert!(features.iter().all(|&f| f < 10));
        }
        assert_eq!(select_features(&mut rng, 3, 3), vec![0, 1, 2]);
        assert_eq!(select_features(&mut rng, 3, 7), vec![0, 1, 2]);
    }
}
