//! Device backend layout: breadth-first structure-of-arrays.
//!
//! Each tree is stored level by level. The two children of a split node are
//! allocated next to each other, so only the left child index is kept and
//! the right child is `left + 1`. Child indices are global into the
//! concatenated buffers. Leaves are marked by [`LEAF_FEATURE`] in the
//! feature buffer.
//!
//! The kernel ([`DeviceForest::predict_block`]) advances every row of a
//! block one level per step, for one tree at a time, until all rows of the
//! block have reached a leaf.

use std::collections::VecDeque;

use crate::data::Table;
use crate::error::{Error, Result};
use crate::model::{Model, ModelMeta};
use crate::repr::{goes_left, Forest, MutableTree, NodeId, TreeView};

use super::ModelInterop;

/// Feature index marking a leaf in [`DeviceForest::features`].
pub const LEAF_FEATURE: u32 = u32::MAX;

/// Forest laid out for the device kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceForest {
    features: Vec<u32>,
    thresholds: Vec<f32>,
    left_children: Vec<u32>,
    values: Vec<f64>,
    observation_counts: Vec<u32>,
    impurity_decreases: Vec<f64>,
    /// Tree `t` occupies `tree_offsets[t]..tree_offsets[t + 1]`.
    tree_offsets: Vec<usize>,
    meta: ModelMeta,
}

impl DeviceForest {
    /// Build a device layout from raw buffers.
    ///
    /// Checks buffer lengths and offsets, then runs the structural checks of
    /// [`import`](ModelInterop::import) so the kernel never follows a child
    /// outside its tree or reads a feature beyond `meta.n_features`.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] for mismatched buffers or offsets;
    /// [`Error::InvalidModel`] for a malformed tree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        features: Vec<u32>,
        thresholds: Vec<f32>,
        left_children: Vec<u32>,
        values: Vec<f64>,
        observation_counts: Vec<u32>,
        impurity_decreases: Vec<f64>,
        tree_offsets: Vec<usize>,
        meta: ModelMeta,
    ) -> Result<Self> {
        let n = features.len();
        let lengths = [
            thresholds.len(),
            left_children.len(),
            values.len(),
            observation_counts.len(),
            impurity_decreases.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(Error::data("device buffers differ in length"));
        }
        let well_formed = tree_offsets.first() == Some(&0)
            && tree_offsets.last() == Some(&n)
            && tree_offsets.windows(2).all(|w| w[0] <= w[1]);
        if !well_formed {
            return Err(Error::data("device tree offsets do not partition the node buffers"));
        }
        let layout = Self {
            features,
            thresholds,
            left_children,
            values,
            observation_counts,
            impurity_decreases,
            tree_offsets,
            meta,
        };
        layout.import()?;
        Ok(layout)
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.tree_offsets.len() - 1
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn features(&self) -> &[u32] {
        &self.features
    }

    #[inline]
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    #[inline]
    pub fn left_children(&self) -> &[u32] {
        &self.left_children
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn tree_offsets(&self) -> &[usize] {
        &self.tree_offsets
    }

    #[inline]
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Predict rows `first_row..first_row + out.len()` of `x`.
    ///
    /// Writes the mean leaf value over all trees, summed in tree order, so
    /// results are bit-identical to the host predictor.
    pub fn predict_block<T: Table + ?Sized>(&self, x: &T, first_row: usize, out: &mut [f64]) {
        let block = out.len();
        let mut cursor = vec![0u32; block];
        out.fill(0.0);

        for t in 0..self.n_trees() {
            let start = self.tree_offsets[t];
            let end = self.tree_offsets[t + 1];
            cursor.fill(start as u32);

            // A valid tree is shallower than its node count.
            for _ in 0..end - start {
                let mut active = false;
                for (r, node) in cursor.iter_mut().enumerate() {
                    let n = *node as usize;
                    let feature = self.features[n];
                    if feature == LEAF_FEATURE {
                        continue;
                    }
                    active = true;
                    let value = x.get(first_row + r, feature as usize);
                    let left = self.left_children[n];
                    *node = if goes_left(value, self.thresholds[n]) {
                        left
                    } else {
                        left + 1
                    };
                }
                if !active {
                    break;
                }
            }

            for (acc, &node) in out.iter_mut().zip(&cursor) {
                *acc += self.values[node as usize];
            }
        }

        let n_trees = self.n_trees() as f64;
        for acc in out.iter_mut() {
            *acc /= n_trees;
        }
    }
}

impl ModelInterop for DeviceForest {
    fn export(model: &Model) -> Self {
        let forest = model.forest();
        let n = forest.n_nodes();
        let mut features = Vec::with_capacity(n);
        let mut thresholds = Vec::with_capacity(n);
        let mut left_children = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        let mut observation_counts = Vec::with_capacity(n);
        let mut impurity_decreases = Vec::with_capacity(n);
        let mut tree_offsets = Vec::with_capacity(forest.n_trees() + 1);
        tree_offsets.push(0);

        let mut queue = VecDeque::new();
        for tree in forest.trees() {
            let base = features.len();
            // Next free slot; children are claimed in pairs as parents are visited.
            let mut next = base + 1;
            queue.clear();
            queue.push_back(0 as NodeId);
            while let Some(node) = queue.pop_front() {
                if tree.is_leaf(node) {
                    features.push(LEAF_FEATURE);
                    thresholds.push(0.0);
                    left_children.push(0);
                } else {
                    features.push(tree.split_index(node));
                    thresholds.push(tree.split_threshold(node));
                    left_children.push(next as u32);
                    next += 2;
                    queue.push_back(tree.left_child(node));
                    queue.push_back(tree.right_child(node));
                }
                values.push(tree.leaf_value(node));
                observation_counts.push(tree.observation_count(node));
                impurity_decreases.push(tree.impurity_decreases()[node as usize]);
            }
            tree_offsets.push(features.len());
        }

        Self {
            features,
            thresholds,
            left_children,
            values,
            observation_counts,
            impurity_decreases,
            tree_offsets,
            meta: model.meta().clone(),
        }
    }

    fn import(&self) -> Result<Model> {
        let mut forest = Forest::with_capacity(self.n_trees());
        for t in 0..self.n_trees() {
            let start = self.tree_offsets[t];
            let end = self.tree_offsets[t + 1];
            let mut tree = MutableTree::with_capacity(end - start);
            tree.init_root_with_num_nodes(end - start);

            for (local, global) in (start..end).enumerate() {
                let id = local as NodeId;
                if self.features[global] == LEAF_FEATURE {
                    tree.make_leaf(id, self.values[global], self.observation_counts[global]);
                    continue;
                }
                // Children before the tree start become out-of-range indices.
                let left = (self.left_children[global] as usize)
                    .checked_sub(start)
                    .map_or(NodeId::MAX - 1, |l| l.min(NodeId::MAX as usize - 1) as NodeId);
                tree.set_split(
                    id,
                    self.features[global],
                    self.thresholds[global],
                    self.impurity_decreases[global],
                    left,
                    left + 1,
                );
                tree.set_node_stats(id, self.values[global], self.observation_counts[global]);
            }

            let tree = tree
                .try_freeze()
                .map_err(|source| Error::InvalidModel { tree: t, source })?;
            forest.push_tree(tree);
        }
        Model::from_parts(forest, self.meta.clone())
    }
}
