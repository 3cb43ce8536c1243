//! Canonical forest representation (ordered collection of trees).

use crate::data::SampleAccessor;
use crate::error::{Error, Result};

use super::{Tree, TreeView};

/// Ordered collection of regression trees.
///
/// The index of a tree in the forest is its identity: it determines the
/// tree's random stream during training and the summation order during
/// inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n_trees: usize) -> Self {
        Self {
            trees: Vec::with_capacity(n_trees),
        }
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Get a reference to a specific tree.
    #[inline]
    pub fn tree(&self, idx: usize) -> &Tree {
        &self.trees[idx]
    }

    #[inline]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Total node count over all trees.
    pub fn n_nodes(&self) -> usize {
        self.trees.iter().map(|t| t.n_nodes()).sum()
    }

    /// Validate every tree, and optionally the feature indices they test.
    pub fn validate(&self, n_features: Option<usize>) -> Result<()> {
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let checked = match n_features {
                Some(n) => tree.validate().and_then(|_| tree.validate_features(n)),
                None => tree.validate(),
            };
            checked.map_err(|source| Error::InvalidModel {
                tree: tree_idx,
                source,
            })?;
        }
        Ok(())
    }

    /// Mean leaf value over all trees, summed in tree order.
    ///
    /// Returns `NaN` for an empty forest.
    pub fn predict_row<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        let mut sum = 0.0f64;
        for tree in &self.trees {
            sum += tree.predict(sample);
        }
        sum / self.trees.len() as f64
    }
}

impl FromIterator<Tree> for Forest {
    fn from_iter<I: IntoIterator<Item = Tree>>(iter: I) -> Self {
        Self {
            trees: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{MutableTree, TreeValidationError};

    fn stump(threshold: f32, left: f64, right: f64) -> Tree {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (l, r) = tree.apply_split(root, 0, threshold, 1.0);
        tree.make_leaf(l, left, 1);
        tree.make_leaf(r, right, 1);
        tree.freeze()
    }

    #[test]
    fn predict_row_is_mean_of_trees() {
        let forest: Forest = [stump(0.5, 1.0, 3.0), stump(0.2, 2.0, 4.0)]
            .into_iter()
            .collect();
        assert_eq!(forest.n_trees(), 2);
        assert_eq!(forest.predict_row(&[0.1f32]), 1.5);
        assert_eq!(forest.predict_row(&[0.3f32]), 2.5);
        assert_eq!(forest.predict_row(&[0.9f32]), 3.5);
    }

    #[test]
    fn validate_reports_tree_index() {
        let mut forest = Forest::new();
        forest.push_tree(stump(0.5, 1.0, 3.0));
        forest.validate(Some(1)).unwrap();

        // Second node is unreachable.
        let bad = Tree::new_unchecked(
            vec![0; 2],
            vec![0.0; 2],
            vec![0; 2],
            vec![0; 2],
            vec![true; 2],
            vec![0.0; 2],
            vec![1; 2],
            vec![0.0; 2],
        );
        forest.push_tree(bad);
        match forest.validate(None).unwrap_err() {
            Error::InvalidModel { tree, .. } => assert_eq!(tree, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_checks_feature_range() {
        let forest: Forest = std::iter::once(stump(0.5, 1.0, 3.0)).collect();
        match forest.validate(Some(0)).unwrap_err() {
            Error::InvalidModel { source, .. } => assert!(matches!(
                source,
                TreeValidationError::FeatureOutOfRange { feature: 0, .. }
            )),
            other => panic!("unexpected error: {other}"),
        }
    }
}
