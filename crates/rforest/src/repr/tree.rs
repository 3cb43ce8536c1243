//! Canonical tree representation (SoA) and read-only tree interface.
//!
//! This module provides:
//! - [`Tree`]: Immutable SoA tree storage, nodes in pre-order
//! - [`TreeView`]: Read-only trait for unified tree access and traversal
//! - [`TreeValidationError`]: Structural validation errors
//!
//! For construction during training, see [`super::mutable_tree::MutableTree`].

// Allow many constructor arguments for creating trees with all their fields.
#![allow(clippy::too_many_arguments)]

use crate::data::SampleAccessor;

use super::NodeId;

/// Split comparison shared by training, OOB scoring and every backend.
///
/// A sample goes to the left child iff its feature value is strictly less
/// than the node threshold. `NaN` therefore always goes right.
#[inline(always)]
pub fn goes_left(value: f32, threshold: f32) -> bool {
    value < threshold
}

// ============================================================================
// TreeView Trait
// ============================================================================

/// Read-only view of a tree for traversal.
///
/// Provides the minimal interface needed to walk from the root to a leaf.
/// Implemented for [`Tree`] and for the per-tree views of the host
/// interop layout.
pub trait TreeView {
    /// Number of nodes in the tree.
    fn n_nodes(&self) -> usize;

    /// Check if a node is a leaf.
    fn is_leaf(&self, node: NodeId) -> bool;

    /// Feature index tested by a split node.
    fn split_index(&self, node: NodeId) -> u32;

    /// Threshold of a split node.
    fn split_threshold(&self, node: NodeId) -> f32;

    /// Left child of a split node.
    fn left_child(&self, node: NodeId) -> NodeId;

    /// Right child of a split node.
    fn right_child(&self, node: NodeId) -> NodeId;

    /// Prediction stored at a leaf.
    fn leaf_value(&self, node: NodeId) -> f64;

    /// Traverse from the root to the leaf reached by `sample`.
    #[inline]
    fn traverse_to_leaf<S: SampleAccessor + ?Sized>(&self, sample: &S) -> NodeId {
        let mut node = 0;
        while !self.is_leaf(node) {
            let fvalue = sample.feature(self.split_index(node) as usize);
            node = if goes_left(fvalue, self.split_threshold(node)) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Leaf prediction for `sample`.
    #[inline]
    fn predict<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        self.leaf_value(self.traverse_to_leaf(sample))
    }
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,
    /// Parallel node arrays disagree on the node count.
    #[error("`{field}` has {len} entries, expected {n_nodes}")]
    LengthMismatch {
        field: &'static str,
        len: usize,
        n_nodes: usize,
    },
    /// A child pointer references an out-of-bounds node.
    #[error("node {node}: {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    /// A node references itself as a child.
    #[error("node {node} references itself")]
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path.
    #[error("node {node} reached twice")]
    DuplicateVisit { node: NodeId },
    /// A cycle was detected during traversal.
    #[error("cycle through node {node}")]
    CycleDetected { node: NodeId },
    /// A node exists in storage but is unreachable from the root.
    #[error("node {node} unreachable from root")]
    UnreachableNode { node: NodeId },
    /// Nodes are reachable but not stored in pre-order.
    #[error("node {node} stored out of pre-order")]
    NotPreOrder { node: NodeId },
    /// A split tests a feature the model does not have.
    #[error("node {node} splits on feature {feature}, model has {n_features}")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },
}

// ============================================================================
// Tree
// ============================================================================

/// Structure-of-Arrays tree storage for traversal.
///
/// Nodes are stored in pre-order: the root is node 0, every split node's
/// left child immediately follows it, and the right child follows the
/// whole left subtree. Child indices are local to this tree.
///
/// Every node carries the mean target and the number of training
/// observations that reached it; for leaves the mean is the prediction.
/// Split nodes also carry the impurity decrease of their split.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_indices: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f64]>,
    observation_counts: Box<[u32]>,
    impurity_decreases: Box<[f64]>,
}

impl Tree {
    /// Create a tree from parallel arrays and validate it.
    ///
    /// Leaves must have zero `split_indices`, `split_thresholds`, children and
    /// `impurity_decreases` entries only by convention; those slots are
    /// ignored for leaves.
    ///
    /// # Errors
    ///
    /// Any [`TreeValidationError`]; in particular the nodes must already be
    /// in canonical pre-order.
    pub fn from_parts(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f64>,
        observation_counts: Vec<u32>,
        impurity_decreases: Vec<f64>,
    ) -> Result<Self, TreeValidationError> {
        let n_nodes = is_leaf.len();
        let lengths = [
            ("split_indices", split_indices.len()),
            ("split_thresholds", split_thresholds.len()),
            ("left_children", left_children.len()),
            ("right_children", right_children.len()),
            ("leaf_values", leaf_values.len()),
            ("observation_counts", observation_counts.len()),
            ("impurity_decreases", impurity_decreases.len()),
        ];
        for (field, len) in lengths {
            if len != n_nodes {
                return Err(TreeValidationError::LengthMismatch {
                    field,
                    len,
                    n_nodes,
                });
            }
        }

        let tree = Self::new_unchecked(
            split_indices,
            split_thresholds,
            left_children,
            right_children,
            is_leaf,
            leaf_values,
            observation_counts,
            impurity_decreases,
        );
        tree.validate()?;
        Ok(tree)
    }

    pub(crate) fn new_unchecked(
        split_indices: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f64>,
        observation_counts: Vec<u32>,
        impurity_decreases: Vec<f64>,
    ) -> Self {
        Self {
            split_indices: split_indices.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
            observation_counts: observation_counts.into_boxed_slice(),
            impurity_decreases: impurity_decreases.into_boxed_slice(),
        }
    }

    /// Single-leaf tree.
    pub fn leaf(value: f64, observation_count: u32) -> Self {
        Self::new_unchecked(
            vec![0],
            vec![0.0],
            vec![0],
            vec![0],
            vec![true],
            vec![value],
            vec![observation_count],
            vec![0.0],
        )
    }

    // =========================================================================
    // Raw accessors
    // =========================================================================

    #[inline]
    pub fn split_indices(&self) -> &[u32] {
        &self.split_indices
    }

    #[inline]
    pub fn split_thresholds(&self) -> &[f32] {
        &self.split_thresholds
    }

    #[inline]
    pub fn left_children(&self) -> &[u32] {
        &self.left_children
    }

    #[inline]
    pub fn right_children(&self) -> &[u32] {
        &self.right_children
    }

    #[inline]
    pub fn leaf_flags(&self) -> &[bool] {
        &self.is_leaf
    }

    /// Mean target per node (the prediction, for leaves).
    #[inline]
    pub fn leaf_values(&self) -> &[f64] {
        &self.leaf_values
    }

    #[inline]
    pub fn observation_counts(&self) -> &[u32] {
        &self.observation_counts
    }

    #[inline]
    pub fn observation_count(&self, node: NodeId) -> u32 {
        self.observation_counts[node as usize]
    }

    /// Impurity decrease per node (0 for leaves).
    #[inline]
    pub fn impurity_decreases(&self) -> &[f64] {
        &self.impurity_decreases
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&leaf| leaf).count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0 as NodeId, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(depth);
            } else {
                stack.push((self.left_child(node), depth + 1));
                stack.push((self.right_child(node), depth + 1));
            }
        }
        max_depth
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate structural invariants.
    ///
    /// Checks exactly one root, no cycles, two in-bounds children per split
    /// node, no unreachable nodes, and canonical pre-order numbering.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        // Iterative DFS with color marking.
        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        let mut stack: Vec<(NodeId, u8)> = vec![(0, 0)];
        let mut next_preorder: NodeId = 0;

        while let Some((node, phase)) = stack.pop() {
            let node_usize = node as usize;
            match phase {
                0 => {
                    match color[node_usize] {
                        0 => {}
                        1 => return Err(TreeValidationError::CycleDetected { node }),
                        _ => return Err(TreeValidationError::DuplicateVisit { node }),
                    }
                    if node != next_preorder {
                        return Err(TreeValidationError::NotPreOrder { node });
                    }
                    next_preorder += 1;

                    color[node_usize] = 1;
                    stack.push((node, 1));

                    if !self.is_leaf(node) {
                        let left = self.left_child(node);
                        let right = self.right_child(node);

                        if left == node || right == node {
                            return Err(TreeValidationError::SelfLoop { node });
                        }
                        for (side, child) in [("left", left), ("right", right)] {
                            if child as usize >= n_nodes {
                                return Err(TreeValidationError::ChildOutOfBounds {
                                    node,
                                    side,
                                    child,
                                    n_nodes,
                                });
                            }
                        }

                        stack.push((right, 0));
                        stack.push((left, 0));
                    }
                }
                _ => {
                    color[node_usize] = 2;
                }
            }
        }

        if let Some(i) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: i as NodeId });
        }

        Ok(())
    }

    /// Check that every split tests a feature below `n_features`.
    pub fn validate_features(&self, n_features: usize) -> Result<(), TreeValidationError> {
        for node in 0..self.n_nodes() as NodeId {
            if self.is_leaf(node) {
                continue;
            }
            let feature = self.split_index(node);
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features,
                });
            }
        }
        Ok(())
    }
}

impl TreeView for Tree {
    #[inline]
    fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    #[inline]
    fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    #[inline]
    fn split_index(&self, node: NodeId) -> u32 {
        self.split_indices[node as usize]
    }

    #[inline]
    fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    #[inline]
    fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    #[inline]
    fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    #[inline]
    fn leaf_value(&self, node: NodeId) -> f64 {
        self.leaf_values[node as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root: x0 < 0.5 ? (x1 < 1.0 ? 1 : 2) : 3
    fn two_level_tree() -> Tree {
        Tree::from_parts(
            vec![0, 1, 0, 0, 0],
            vec![0.5, 1.0, 0.0, 0.0, 0.0],
            vec![1, 2, 0, 0, 0],
            vec![4, 3, 0, 0, 0],
            vec![false, false, true, true, true],
            vec![2.0, 1.5, 1.0, 2.0, 3.0],
            vec![10, 6, 3, 3, 4],
            vec![4.0, 1.5, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn traversal_uses_strict_less_than() {
        let tree = two_level_tree();
        assert_eq!(tree.predict(&[0.4f32, 0.9]), 1.0);
        assert_eq!(tree.predict(&[0.4f32, 1.0]), 2.0);
        // Equal to threshold goes right.
        assert_eq!(tree.predict(&[0.5f32, 0.0]), 3.0);
        // NaN goes right.
        assert_eq!(tree.predict(&[f32::NAN, 0.0]), 3.0);
    }

    #[test]
    fn shape_statistics() {
        let tree = two_level_tree();
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
        assert_eq!(Tree::leaf(1.0, 1).depth(), 0);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = Tree::from_parts(
            vec![0],
            vec![0.0],
            vec![0],
            vec![0],
            vec![true],
            vec![],
            vec![1],
            vec![0.0],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TreeValidationError::LengthMismatch { field: "leaf_values", .. }
        ));
    }

    #[test]
    fn rejects_out_of_bounds_child() {
        let err = Tree::from_parts(
            vec![0, 0],
            vec![0.5, 0.0],
            vec![1, 0],
            vec![7, 0],
            vec![false, true],
            vec![0.0, 1.0],
            vec![2, 1],
            vec![0.0, 0.0],
        )
        .unwrap_err();
        assert!(matches!(err, TreeValidationError::ChildOutOfBounds { side: "right", .. }));
    }

    #[test]
    fn rejects_cycle_and_self_loop() {
        let self_loop = Tree::from_parts(
            vec![0, 0, 0],
            vec![0.5, 0.0, 0.0],
            vec![0, 0, 0],
            vec![1, 0, 0],
            vec![false, true, true],
            vec![0.0; 3],
            vec![1; 3],
            vec![0.0; 3],
        )
        .unwrap_err();
        assert_eq!(self_loop, TreeValidationError::SelfLoop { node: 0 });

        let shared_child = Tree::from_parts(
            vec![0, 0],
            vec![0.5, 0.0],
            vec![1, 0],
            vec![1, 0],
            vec![false, true],
            vec![0.0; 2],
            vec![1; 2],
            vec![0.0; 2],
        )
        .unwrap_err();
        assert!(matches!(
            shared_child,
            TreeValidationError::DuplicateVisit { .. } | TreeValidationError::NotPreOrder { .. }
        ));
    }

    #[test]
    fn rejects_unreachable_and_non_preorder() {
        let unreachable = Tree::from_parts(
            vec![0, 0],
            vec![0.0, 0.0],
            vec![0, 0],
            vec![0, 0],
            vec![true, true],
            vec![0.0; 2],
            vec![1; 2],
            vec![0.0; 2],
        )
        .unwrap_err();
        assert_eq!(unreachable, TreeValidationError::UnreachableNode { node: 1 });

        // Breadth-first numbering of a depth-2 tree is not pre-order.
        let bfs = Tree::from_parts(
            vec![0, 1, 0, 0, 0],
            vec![0.5, 1.0, 0.0, 0.0, 0.0],
            vec![1, 3, 0, 0, 0],
            vec![2, 4, 0, 0, 0],
            vec![false, false, true, true, true],
            vec![0.0; 5],
            vec![1; 5],
            vec![0.0; 5],
        )
        .unwrap_err();
        assert!(matches!(bfs, TreeValidationError::NotPreOrder { .. }));
    }

    #[test]
    fn feature_bound_check() {
        let tree = two_level_tree();
        tree.validate_features(2).unwrap();
        assert_eq!(
            tree.validate_features(1).unwrap_err(),
            TreeValidationError::FeatureOutOfRange {
                node: 1,
                feature: 1,
                n_features: 1
            }
        );
    }

    #[test]
    fn empty_tree_is_rejected() {
        let err = Tree::from_parts(vec![], vec![], vec![], vec![], vec![], vec![], vec![], vec![])
            .unwrap_err();
        assert_eq!(err, TreeValidationError::EmptyTree);
    }
}
