//! Host backend layout: pre-order array-of-structs.

use crate::data::SampleAccessor;
use crate::error::{Error, Result};
use crate::model::{Model, ModelMeta};
use crate::repr::{Forest, MutableTree, NodeId, TreeView};

use super::ModelInterop;

/// One node of the host layout.
///
/// Child indices are local to the node's tree. Leaves carry zero children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostNode {
    pub feature: u32,
    pub threshold: f32,
    pub left: u32,
    pub right: u32,
    pub is_leaf: bool,
    pub value: f64,
    pub observation_count: u32,
    pub impurity_decrease: f64,
}

/// Forest laid out for the host predictor.
///
/// All nodes of all trees are concatenated; tree `t` occupies
/// `nodes[tree_offsets[t]..tree_offsets[t + 1]]`, in pre-order.
#[derive(Debug, Clone, PartialEq)]
pub struct HostForest {
    nodes: Vec<HostNode>,
    tree_offsets: Vec<usize>,
    meta: ModelMeta,
}

impl HostForest {
    /// Build a host layout from raw parts.
    ///
    /// `tree_offsets` must start at 0, be non-decreasing and end at
    /// `nodes.len()`. Every tree then gets the same structural checks as
    /// [`import`](ModelInterop::import), so the predictor only ever walks
    /// acyclic trees with in-range features.
    ///
    /// # Errors
    ///
    /// [`Error::Data`] for malformed offsets or a tree count that disagrees
    /// with `meta`; [`Error::InvalidModel`] for a malformed tree.
    pub fn from_parts(nodes: Vec<HostNode>, tree_offsets: Vec<usize>, meta: ModelMeta) -> Result<Self> {
        let well_formed = tree_offsets.first() == Some(&0)
            && tree_offsets.last() == Some(&nodes.len())
            && tree_offsets.windows(2).all(|w| w[0] <= w[1]);
        if !well_formed {
            return Err(Error::data("host tree offsets do not partition the node buffer"));
        }
        let layout = Self {
            nodes,
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
    pub fn nodes(&self) -> &[HostNode] {
        &self.nodes
    }

    #[inline]
    pub fn tree_offsets(&self) -> &[usize] {
        &self.tree_offsets
    }

    #[inline]
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// View of tree `idx`.
    #[inline]
    pub fn tree(&self, idx: usize) -> HostTreeView<'_> {
        HostTreeView {
            nodes: &self.nodes[self.tree_offsets[idx]..self.tree_offsets[idx + 1]],
        }
    }

    pub fn trees(&self) -> impl Iterator<Item = HostTreeView<'_>> + '_ {
        (0..self.n_trees()).map(move |t| self.tree(t))
    }

    /// Mean leaf value over all trees, summed in tree order.
    #[inline]
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        let mut sum = 0.0f64;
        for tree in self.trees() {
            sum += tree.predict(sample);
        }
        sum / self.n_trees() as f64
    }
}

/// One tree of a [`HostForest`].
#[derive(Debug, Clone, Copy)]
pub struct HostTreeView<'a> {
    nodes: &'a [HostNode],
}

impl HostTreeView<'_> {
    #[inline]
    pub fn nodes(&self) -> &[HostNode] {
        self.nodes
    }
}

impl TreeView for HostTreeView<'_> {
    #[inline]
    fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node as usize].is_leaf
    }

    #[inline]
    fn split_index(&self, node: NodeId) -> u32 {
        self.nodes[node as usize].feature
    }

    #[inline]
    fn split_threshold(&self, node: NodeId) -> f32 {
        self.nodes[node as usize].threshold
    }

    #[inline]
    fn left_child(&self, node: NodeId) -> NodeId {
        self.nodes[node as usize].left
    }

    #[inline]
    fn right_child(&self, node: NodeId) -> NodeId {
        self.nodes[node as usize].right
    }

    #[inline]
    fn leaf_value(&self, node: NodeId) -> f64 {
        self.nodes[node as usize].value
    }
}

impl ModelInterop for HostForest {
    fn export(model: &Model) -> Self {
        let forest = model.forest();
        let mut nodes = Vec::with_capacity(forest.n_nodes());
        let mut tree_offsets = Vec::with_capacity(forest.n_trees() + 1);
        tree_offsets.push(0);

        for tree in forest.trees() {
            for node in 0..tree.n_nodes() {
                let id = node as NodeId;
                nodes.push(HostNode {
                    feature: tree.split_index(id),
                    threshold: tree.split_threshold(id),
                    left: tree.left_child(id),
                    right: tree.right_child(id),
                    is_leaf: tree.is_leaf(id),
                    value: tree.leaf_value(id),
                    observation_count: tree.observation_count(id),
                    impurity_decrease: tree.impurity_decreases()[node],
                });
            }
            tree_offsets.push(nodes.len());
        }

        Self {
            nodes,
            tree_offsets,
            meta: model.meta().clone(),
        }
    }

    fn import(&self) -> Result<Model> {
        let mut forest = Forest::with_capacity(self.n_trees());
        for (tree_idx, view) in self.trees().enumerate() {
            let mut tree = MutableTree::with_capacity(view.n_nodes());
            tree.init_root_with_num_nodes(view.n_nodes());
            for (i, node) in view.nodes().iter().enumerate() {
                let id = i as NodeId;
                if node.is_leaf {
                    tree.make_leaf(id, node.value, node.observation_count);
                } else {
                    tree.set_split(
                        id,
                        node.feature,
                        node.threshold,
                        node.impurity_decrease,
                        node.left,
                        node.right,
                    );
                    tree.set_node_stats(id, node.value, node.observation_count);
                }
            }
            let tree = tree.try_freeze().map_err(|source| Error::InvalidModel {
                tree: tree_idx,
                source,
            })?;
            forest.push_tree(tree);
        }
        Model::from_parts(forest, self.meta.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{Tree, TreeValidationError};

    fn two_level() -> Tree {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (l, r) = tree.apply_split(root, 0, 0.5, 4.0);
        let (ll, lr) = tree.apply_split(l, 1, 1.5, 1.0);
        tree.make_leaf(ll, 1.0, 2);
        tree.make_leaf(lr, 2.0, 2);
        tree.make_leaf(r, 3.0, 3);
        tree.freeze()
    }

    fn model() -> Model {
        Model::new([two_level(), Tree::leaf(0.5, 7)].into_iter().collect(), 2).unwrap()
    }

    #[test]
    fn export_is_preorder_with_local_children() {
        let host = HostForest::export(&model());
        assert_eq!(host.n_trees(), 2);
        assert_eq!(host.tree_offsets(), &[0, 5, 6]);
        let t0 = host.tree(0);
        assert_eq!(t0.nodes()[0].left, 1);
        assert_eq!(t0.nodes()[0].right, 4);
        assert!(host.tree(1).nodes()[0].is_leaf);
    }

    #[test]
    fn round_trip_is_lossless() {
        let model = model();
        let back = HostForest::export(&model).import().unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn predictions_match_model() {
        let model = model();
        let host = HostForest::export(&model);
        for row in [[0.1f32, 1.0], [0.1, 2.0], [0.7, 0.0]] {
            assert_eq!(host.predict_row(&row), model.predict_row(&row));
        }
    }

    #[test]
    fn from_parts_rejects_broken_links() {
        let host = HostForest::export(&model());
        let mut nodes = host.nodes().to_vec();
        nodes[1].right = 40;
        let err = HostForest::from_parts(nodes, host.tree_offsets().to_vec(), host.meta().clone())
            .unwrap_err();
        match err {
            Error::InvalidModel { tree, source } => {
                assert_eq!(tree, 0);
                assert!(matches!(source, TreeValidationError::ChildOutOfBounds { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_parts_rejects_cycles() {
        let host = HostForest::export(&model());
        let mut nodes = host.nodes().to_vec();
        // Inner split points back at the root.
        nodes[1].left = 0;
        let err = HostForest::from_parts(nodes, host.tree_offsets().to_vec(), host.meta().clone())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidModel {
                tree: 0,
                source: TreeValidationError::CycleDetected { .. }
            }
        ));
    }

    #[test]
    fn from_parts_rejects_features_beyond_meta() {
        let host = HostForest::export(&model());
        let mut nodes = host.nodes().to_vec();
        nodes[0].feature = 2;
        let err = HostForest::from_parts(nodes, host.tree_offsets().to_vec(), host.meta().clone())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidModel {
                source: TreeValidationError::FeatureOutOfRange { feature: 2, .. },
                ..
            }
        ));
    }

    #[test]
    fn from_parts_checks_offsets() {
        let host = HostForest::export(&model());
        let err = HostForest::from_parts(host.nodes().to_vec(), vec![0, 5], host.meta().clone());
        assert!(err.unwrap_err().is_data());
    }
}
