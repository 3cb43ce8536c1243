//! Training-time tree construction.

use super::{NodeId, Tree, TreeValidationError};

/// Mutable tree for use during training and import.
///
/// Supports the pattern where nodes are allocated first (placeholders) and
/// filled in later when splits or leaves are determined. Node ids are
/// allocation order; [`freeze`](Self::freeze) renumbers them into the
/// canonical pre-order of [`Tree`].
#[derive(Debug, Clone, Default)]
pub struct MutableTree {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    is_leaf: Vec<bool>,
    node_values: Vec<f64>,
    observation_counts: Vec<u32>,
    impurity_decreases: Vec<f64>,
}

impl MutableTree {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a tree with capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            split_indices: Vec::with_capacity(capacity),
            split_thresholds: Vec::with_capacity(capacity),
            left_children: Vec::with_capacity(capacity),
            right_children: Vec::with_capacity(capacity),
            is_leaf: Vec::with_capacity(capacity),
            node_values: Vec::with_capacity(capacity),
            observation_counts: Vec::with_capacity(capacity),
            impurity_decreases: Vec::with_capacity(capacity),
        }
    }

    /// Initialize the root node as a placeholder.
    ///
    /// Returns the root node ID (always 0).
    pub fn init_root(&mut self) -> NodeId {
        self.reset();
        self.allocate_node();
        0
    }

    /// Initialize the tree with a fixed number of placeholder nodes.
    ///
    /// Used by importers where node indices and child references are
    /// already known. Returns the root node ID (0).
    pub fn init_root_with_num_nodes(&mut self, num_nodes: usize) -> NodeId {
        self.reset();
        for _ in 0..num_nodes {
            self.allocate_node();
        }
        0
    }

    /// Number of allocated nodes.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Record the mean target and observation count of a node.
    pub fn set_node_stats(&mut self, node: NodeId, value: f64, observation_count: u32) {
        let idx = node as usize;
        self.node_values[idx] = value;
        self.observation_counts[idx] = observation_count;
    }

    /// Split a node, allocating its two children.
    ///
    /// Returns `(left_id, right_id)`.
    pub fn apply_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        impurity_decrease: f64,
    ) -> (NodeId, NodeId) {
        let left_id = self.allocate_node();
        let right_id = self.allocate_node();
        self.set_split(node, feature, threshold, impurity_decrease, left_id, right_id);
        (left_id, right_id)
    }

    /// Set a split on an existing node, with explicit child indices.
    pub fn set_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        impurity_decrease: f64,
        left_child: NodeId,
        right_child: NodeId,
    ) {
        let idx = node as usize;
        self.split_indices[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left_child;
        self.right_children[idx] = right_child;
        self.impurity_decreases[idx] = impurity_decrease;
        self.is_leaf[idx] = false;
    }

    /// Turn a node into a leaf predicting `value`.
    pub fn make_leaf(&mut self, node: NodeId, value: f64, observation_count: u32) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.split_indices[idx] = 0;
        self.split_thresholds[idx] = 0.0;
        self.left_children[idx] = 0;
        self.right_children[idx] = 0;
        self.impurity_decreases[idx] = 0.0;
        self.set_node_stats(node, value, observation_count);
    }

    /// Finish construction, renumbering nodes into pre-order.
    ///
    /// Nodes unreachable from the root are dropped. Children that point
    /// outside the arena are left as-is so that the returned tree fails
    /// [`Tree::validate`] instead of being silently repaired.
    pub fn freeze(self) -> Tree {
        self.freeze_impl().0
    }

    /// Finish construction of an imported tree.
    ///
    /// Like [`freeze`](Self::freeze), but every allocated node must be
    /// reachable and the result must pass [`Tree::validate`].
    pub fn try_freeze(self) -> Result<Tree, TreeValidationError> {
        let (tree, unreachable) = self.freeze_impl();
        tree.validate()?;
        match unreachable {
            Some(node) => Err(TreeValidationError::UnreachableNode { node }),
            None => Ok(tree),
        }
    }

    /// Returns the frozen tree and the first allocated node it dropped.
    fn freeze_impl(self) -> (Tree, Option<NodeId>) {
        let n = self.n_nodes();
        if n == 0 {
            let empty = Tree::new_unchecked(
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
                vec![],
            );
            return (empty, None);
        }

        // Pre-order walk; `new_id` doubles as the visited set.
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut new_id = vec![u32::MAX; n];
        let mut stack = vec![0usize];
        while let Some(old) = stack.pop() {
            if new_id[old] != u32::MAX {
                continue;
            }
            new_id[old] = order.len() as u32;
            order.push(old);
            if !self.is_leaf[old] {
                // Right first so the left subtree is numbered first.
                for child in [self.right_children[old], self.left_children[old]] {
                    let child = child as usize;
                    if child < n {
                        stack.push(child);
                    }
                }
            }
        }

        let remap = |child: u32| -> u32 {
            match new_id.get(child as usize) {
                Some(&id) if id != u32::MAX => id,
                _ => child,
            }
        };

        let m = order.len();
        let mut split_indices = Vec::with_capacity(m);
        let mut split_thresholds = Vec::with_capacity(m);
        let mut left_children = Vec::with_capacity(m);
        let mut right_children = Vec::with_capacity(m);
        let mut is_leaf = Vec::with_capacity(m);
        let mut leaf_values = Vec::with_capacity(m);
        let mut observation_counts = Vec::with_capacity(m);
        let mut impurity_decreases = Vec::with_capacity(m);

        for &old in &order {
            let leaf = self.is_leaf[old];
            split_indices.push(self.split_indices[old]);
            split_thresholds.push(self.split_thresholds[old]);
            left_children.push(if leaf { 0 } else { remap(self.left_children[old]) });
            right_children.push(if leaf { 0 } else { remap(self.right_children[old]) });
            is_leaf.push(leaf);
            leaf_values.push(self.node_values[old]);
            observation_counts.push(self.observation_counts[old]);
            impurity_decreases.push(self.impurity_decreases[old]);
        }

        let tree = Tree::new_unchecked(
            split_indices,
            split_thresholds,
            left_children,
            right_children,
            is_leaf,
            leaf_values,
            observation_counts,
            impurity_decreases,
        );
        let unreachable = new_id
            .iter()
            .position(|&id| id == u32::MAX)
            .map(|old| old as NodeId);
        (tree, unreachable)
    }

    fn allocate_node(&mut self) -> NodeId {
        let id = self.n_nodes() as NodeId;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.is_leaf.push(true);
        self.node_values.push(0.0);
        self.observation_counts.push(0);
        self.impurity_decreases.push(0.0);
        id
    }

    fn reset(&mut self) {
        self.split_indices.clear();
        self.split_thresholds.clear();
        self.left_children.clear();
        self.right_children.clear();
        self.is_leaf.clear();
        self.node_values.clear();
        self.observation_counts.clear();
        self.impurity_decreases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::TreeView;

    #[test]
    fn single_leaf() {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        tree.make_leaf(root, 2.5, 7);
        let tree = tree.freeze();
        tree.validate().unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[0.0f32]), 2.5);
        assert_eq!(tree.observation_count(0), 7);
    }

    #[test]
    fn freeze_renumbers_to_preorder() {
        // Allocation order: 0 root, 1 L, 2 R, 3 LL, 4 LR.
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (l, r) = tree.apply_split(root, 0, 0.5, 3.0);
        let (ll, lr) = tree.apply_split(l, 1, 1.0, 1.0);
        tree.make_leaf(r, 3.0, 4);
        tree.make_leaf(ll, 1.0, 3);
        tree.make_leaf(lr, 2.0, 3);
        tree.set_node_stats(root, 2.1, 10);
        tree.set_node_stats(l, 1.5, 6);

        let tree = tree.freeze();
        tree.validate().unwrap();
        // Pre-order: root, L, LL, LR, R.
        assert_eq!(tree.leaf_flags(), &[false, false, true, true, true]);
        assert_eq!(tree.left_children()[0], 1);
        assert_eq!(tree.right_children()[0], 4);
        assert_eq!(tree.left_children()[1], 2);
        assert_eq!(tree.right_children()[1], 3);
        assert_eq!(tree.leaf_values(), &[2.1, 1.5, 1.0, 2.0, 3.0]);
        assert_eq!(tree.impurity_decreases(), &[3.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(tree.predict(&[0.9f32, 0.0]), 3.0);
        assert_eq!(tree.predict(&[0.1f32, 1.5]), 2.0);
    }

    #[test]
    fn explicit_children_from_breadth_first_layout() {
        let mut tree = MutableTree::new();
        tree.init_root_with_num_nodes(5);
        tree.set_split(0, 0, 0.5, 3.0, 1, 2);
        tree.set_split(1, 1, 1.0, 1.0, 3, 4);
        tree.make_leaf(2, 3.0, 4);
        tree.make_leaf(3, 1.0, 3);
        tree.make_leaf(4, 2.0, 3);

        let tree = tree.freeze();
        tree.validate().unwrap();
        assert_eq!(tree.leaf_values()[2..], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn try_freeze_rejects_dropped_nodes() {
        let mut tree = MutableTree::new();
        tree.init_root_with_num_nodes(3);
        tree.make_leaf(0, 1.0, 1);
        assert_eq!(
            tree.clone().try_freeze().unwrap_err(),
            TreeValidationError::UnreachableNode { node: 1 }
        );
        assert_eq!(tree.freeze().n_nodes(), 1);
    }

    #[test]
    fn broken_links_survive_freeze_and_fail_validation() {
        let mut tree = MutableTree::new();
        tree.init_root_with_num_nodes(2);
        tree.set_split(0, 0, 0.5, 1.0, 1, 9);
        tree.make_leaf(1, 0.0, 1);
        assert!(tree.clone().freeze().validate().is_err());
        assert!(matches!(
            tree.try_freeze().unwrap_err(),
            TreeValidationError::ChildOutOfBounds { child: 9, .. }
        ));
    }
}
