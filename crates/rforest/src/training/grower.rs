//! Tree grower for random-forest regression.
//!
//! Grows one tree from a bootstrap sample, depth first with an explicit
//! stack. Every pending node owns a contiguous range of a single row
//! buffer, which is partitioned in place when the node splits.

use rand::Rng;

use crate::repr::{MutableTree, NodeId, Tree};

use super::histogram::{BinCuts, BinStats, BinnedMatrix, NodeHistogram};
use super::split::{select_features, SplitFinder, SplitParams};

/// Parameters for tree growth.
#[derive(Clone, Debug)]
pub struct GrowerParams {
    /// Depth at which nodes become leaves (root is depth 0). `None` = unlimited.
    pub max_depth: Option<usize>,
    /// Candidate features drawn per node.
    pub features_per_node: usize,
    /// A node whose target variance is at most this value is a leaf.
    pub impurity_threshold: f64,
    /// Split constraints.
    pub split: SplitParams,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            features_per_node: usize::MAX,
            impurity_threshold: 0.0,
            split: SplitParams::default(),
        }
    }
}

/// A grown tree plus the impurity decrease it attributes to each feature.
#[derive(Debug, Clone)]
pub struct GrownTree {
    pub tree: Tree,
    /// Summed impurity decrease of this tree's splits, per feature.
    pub importance: Vec<f64>,
}

/// A node waiting to be split or turned into a leaf.
struct PendingNode {
    node: NodeId,
    start: usize,
    end: usize,
    depth: usize,
}

/// Tree grower over a shared binned feature matrix.
pub struct TreeGrower<'a> {
    binned: &'a BinnedMatrix,
    cuts: &'a BinCuts,
    targets: &'a [f64],
    params: GrowerParams,
    finder: SplitFinder,
}

impl<'a> TreeGrower<'a> {
    pub fn new(
        binned: &'a BinnedMatrix,
        cuts: &'a BinCuts,
        targets: &'a [f64],
        params: GrowerParams,
    ) -> Self {
        debug_assert_eq!(binned.n_rows(), targets.len());
        let finder = SplitFinder::new(params.split);
        Self {
            binned,
            cuts,
            targets,
            params,
            finder,
        }
    }

    /// Grow a tree over `rows` (original row indices, repetitions allowed).
    ///
    /// `rng` supplies the per-node feature draws; it is the tree's own
    /// stream, so the result does not depend on scheduling.
    pub fn grow<R: Rng + ?Sized>(&self, mut rows: Vec<u32>, rng: &mut R) -> GrownTree {
        let n_features = self.binned.n_features();
        let k = self.params.features_per_node.clamp(1, n_features.max(1));
        let min_leaf = self.params.split.min_observations_in_leaf.max(1) as usize;

        let mut tree = MutableTree::with_capacity(64);
        let mut importance = vec![0.0; n_features];
        let root = tree.init_root();

        let mut stack = vec![PendingNode {
            node: root,
            start: 0,
            end: rows.len(),
            depth: 0,
        }];

        while let Some(PendingNode {
            node,
            start,
            end,
            depth,
        }) = stack.pop()
        {
            let node_rows = &rows[start..end];
            let parent: BinStats = node_rows.iter().map(|&r| self.targets[r as usize]).collect();
            let count = parent.count();

            let at_max_depth = self.params.max_depth.is_some_and(|d| depth >= d);
            let too_small = node_rows.len() < 2 * min_leaf;
            let pure = parent.m2() <= 0.0 || parent.variance() <= self.params.impurity_threshold;
            if at_max_depth || too_small || pure || n_features == 0 {
                tree.make_leaf(node, parent.mean(), count);
                continue;
            }

            let features = select_features(rng, n_features, k);
            let histogram =
                NodeHistogram::build(self.binned, self.cuts, self.targets, node_rows, &features);
            let Some(split) = self.finder.find_best_split(&histogram, self.cuts, &parent) else {
                tree.make_leaf(node, parent.mean(), count);
                continue;
            };

            let mid = partition(
                &mut rows[start..end],
                self.binned.feature_bins(split.feature as usize),
                split.bin,
            ) + start;
            debug_assert_eq!(mid - start, split.left.count() as usize);

            tree.set_node_stats(node, parent.mean(), count);
            let (left, right) =
                tree.apply_split(node, split.feature, split.threshold, split.impurity_decrease);
            importance[split.feature as usize] += split.impurity_decrease;

            // Right pushed first so the left subtree is grown first.
            stack.push(PendingNode {
                node: right,
                start: mid,
                end,
                depth: depth + 1,
            });
            stack.push(PendingNode {
                node: left,
                start,
                end: mid,
                depth: depth + 1,
            });
        }

        GrownTree {
            tree: tree.freeze(),
            importance,
        }
    }
}

/// Move rows whose bucket is `<= bin` to the front; returns the left count.
fn partition(rows: &mut [u32], feature_bins: &[u32], bin: u32) -> usize {
    let mut left_end = 0;
    for i in 0..rows.len() {
        if feature_bins[rows[i] as usize] <= bin {
            rows.swap(i, left_end);
            left_end += 1;
        }
    }
    left_end
}
