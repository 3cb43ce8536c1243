//! Canonical tree and forest representations.

/// Canonical node identifier.
///
/// Internally this is just an index into the tree's SoA arrays.
pub type NodeId = u32;

pub mod forest;
pub mod mutable_tree;
pub mod tree;

pub use forest::Forest;
pub use mutable_tree::MutableTree;
pub use tree::{goes_left, Tree, TreeValidationError, TreeView};
