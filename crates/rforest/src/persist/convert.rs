//! Conversion between runtime types and schema types.
//!
//! Runtime → schema conversions are infallible `From` impls. Schema →
//! runtime conversions are `TryFrom` impls that run the same structural
//! validation as model import.

use super::schema::{
    ForestSchema, ModelMetaSchema, RandomForestModelSchema, TaskKindSchema, TreeSchema,
    FORMAT_VERSION,
};
use crate::error::{Error, Result};
use crate::model::{Model, ModelMeta, TaskKind};
use crate::repr::{Forest, Tree, TreeValidationError, TreeView};

// =============================================================================
// TaskKind conversions
// =============================================================================

impl From<TaskKind> for TaskKindSchema {
    fn from(task: TaskKind) -> Self {
        match task {
            TaskKind::Regression => TaskKindSchema::Regression,
        }
    }
}

impl From<TaskKindSchema> for TaskKind {
    fn from(task: TaskKindSchema) -> Self {
        match task {
            TaskKindSchema::Regression => TaskKind::Regression,
        }
    }
}

// =============================================================================
// ModelMeta conversions
// =============================================================================

impl From<&ModelMeta> for ModelMetaSchema {
    fn from(meta: &ModelMeta) -> Self {
        Self {
            task: meta.task.into(),
            num_features: meta.n_features,
            tree_count: meta.tree_count,
            feature_names: meta.feature_names.clone(),
        }
    }
}

impl From<ModelMetaSchema> for ModelMeta {
    fn from(schema: ModelMetaSchema) -> Self {
        Self {
            task: schema.task.into(),
            n_features: schema.num_features,
            tree_count: schema.tree_count,
            feature_names: schema.feature_names,
        }
    }
}

// =============================================================================
// Tree conversions
// =============================================================================

impl From<&Tree> for TreeSchema {
    fn from(tree: &Tree) -> Self {
        Self {
            num_nodes: tree.n_nodes() as u32,
            split_indices: tree.split_indices().to_vec(),
            thresholds: tree.split_thresholds().iter().map(|&t| t as f64).collect(),
            children_left: tree.left_children().to_vec(),
            children_right: tree.right_children().to_vec(),
            is_leaf: tree.leaf_flags().to_vec(),
            node_values: tree.leaf_values().to_vec(),
            covers: tree.observation_counts().to_vec(),
            gains: tree.impurity_decreases().to_vec(),
        }
    }
}

impl TryFrom<TreeSchema> for Tree {
    type Error = TreeValidationError;

    fn try_from(schema: TreeSchema) -> std::result::Result<Self, Self::Error> {
        let n_nodes = schema.num_nodes as usize;
        if schema.is_leaf.len() != n_nodes {
            return Err(TreeValidationError::LengthMismatch {
                field: "is_leaf",
                len: schema.is_leaf.len(),
                n_nodes,
            });
        }
        Tree::from_parts(
            schema.split_indices,
            schema.thresholds.into_iter().map(|t| t as f32).collect(),
            schema.children_left,
            schema.children_right,
            schema.is_leaf,
            schema.node_values,
            schema.covers,
            schema.gains,
        )
    }
}

// =============================================================================
// Forest conversions
// =============================================================================

impl From<&Forest> for ForestSchema {
    fn from(forest: &Forest) -> Self {
        Self {
            trees: forest.trees().iter().map(TreeSchema::from).collect(),
        }
    }
}

impl TryFrom<ForestSchema> for Forest {
    type Error = Error;

    fn try_from(schema: ForestSchema) -> Result<Self> {
        schema
            .trees
            .into_iter()
            .enumerate()
            .map(|(tree, t)| {
                Tree::try_from(t).map_err(|source| Error::InvalidModel { tree, source })
            })
            .collect()
    }
}

// =============================================================================
// Model conversions
// =============================================================================

impl From<&Model> for RandomForestModelSchema {
    fn from(model: &Model) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            model_type: Self::MODEL_TYPE.to_string(),
            meta: model.meta().into(),
            forest: model.forest().into(),
        }
    }
}

impl TryFrom<RandomForestModelSchema> for Model {
    type Error = Error;

    fn try_from(schema: RandomForestModelSchema) -> Result<Self> {
        if schema.format_version != FORMAT_VERSION {
            return Err(Error::data(format!(
                "unsupported model format version {} (expected {FORMAT_VERSION})",
                schema.format_version
            )));
        }
        if schema.model_type != RandomForestModelSchema::MODEL_TYPE {
            return Err(Error::data(format!(
                "unsupported model type `{}`",
                schema.model_type
            )));
        }
        let forest = Forest::try_from(schema.forest)?;
        Model::from_parts(forest, schema.meta.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::MutableTree;

    fn sample_tree() -> Tree {
        let mut tree = MutableTree::new();
        let root = tree.init_root();
        let (l, r) = tree.apply_split(root, 0, 0.1 + 0.2, 0.75);
        tree.make_leaf(l, 1.0 / 3.0, 3);
        tree.make_leaf(r, -2.5, 1);
        tree.set_node_stats(root, 0.125, 4);
        tree.freeze()
    }

    #[test]
    fn tree_round_trip_is_exact() {
        let tree = sample_tree();
        let schema = TreeSchema::from(&tree);
        assert_eq!(schema.num_nodes, 3);
        let back = Tree::try_from(schema).unwrap();
        assert_eq!(back, tree);
        assert_eq!(
            back.split_thresholds()[0].to_bits(),
            tree.split_thresholds()[0].to_bits()
        );
    }

    #[test]
    fn tree_schema_with_wrong_node_count_is_rejected() {
        let mut schema = TreeSchema::from(&sample_tree());
        schema.num_nodes = 5;
        assert!(matches!(
            Tree::try_from(schema),
            Err(TreeValidationError::LengthMismatch { field: "is_leaf", .. })
        ));
    }

    #[test]
    fn model_schema_checks_version_and_type() {
        let model = Model::new(std::iter::once(sample_tree()).collect(), 1).unwrap();
        let schema = RandomForestModelSchema::from(&model);
        assert_eq!(Model::try_from(schema.clone()).unwrap(), model);

        let mut bad = schema.clone();
        bad.format_version = 99;
        assert!(Model::try_from(bad).unwrap_err().is_data());

        let mut bad = schema;
        bad.model_type = "gbdt".into();
        assert!(Model::try_from(bad).unwrap_err().is_data());
    }

    #[test]
    fn broken_child_link_reports_tree_index() {
        let model = Model::new([sample_tree(), sample_tree()].into_iter().collect(), 1).unwrap();
        let mut schema = RandomForestModelSchema::from(&model);
        schema.forest.trees[1].children_right[0] = 17;
        match Model::try_from(schema).unwrap_err() {
            Error::InvalidModel { tree, source } => {
                assert_eq!(tree, 1);
                assert!(matches!(source, TreeValidationError::ChildOutOfBounds { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
