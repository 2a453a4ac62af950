//! Gradient-boosted tree ensemble evaluation.
//!
//! Trees are stored in SoA layout for cheap traversal. Traversal handles
//! missing values (NaN) via per-node default directions and supports both
//! numeric splits (`value < threshold` goes left) and categorical splits
//! (level index contained in the node's category set goes right).
//!
//! The ensemble is inference-only: trees arrive fully grown from the
//! training side, inside the pipeline artifact.

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Node identifier within a tree.
pub type NodeId = u32;

/// Split kind for an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    /// Numeric threshold split.
    Numeric,
    /// Categorical membership split.
    Categorical,
}

/// A single decision tree in SoA layout.
///
/// All per-node arrays have length `n_nodes`. Node 0 is the root. Leaf nodes
/// carry a value in `leaf_value`; internal nodes carry a split and two
/// children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    split_feature: Vec<u32>,
    threshold: Vec<f32>,
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_value: Vec<f32>,
    split_kind: Vec<SplitKind>,
    /// Sorted level indices that send a sample right; empty for numeric
    /// splits and leaves.
    right_categories: Vec<Vec<u32>>,
}

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    #[error("tree has no nodes")]
    EmptyTree,

    /// A per-node array has the wrong length.
    #[error("array {field} has length {got}, tree has {expected} nodes")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
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
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },

    /// A split references a feature outside the pipeline's feature count.
    #[error("node {node}: split feature {feature} out of range ({n_features} features)")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },

    /// A categorical split has an empty category set.
    #[error("node {node}: categorical split with empty category set")]
    EmptyCategories { node: NodeId },

    /// A category set is unsorted or contains duplicates.
    #[error("node {node}: category set is not sorted and unique")]
    UnsortedCategories { node: NodeId },

    /// A node was reached by more than one path (DAG or cycle).
    #[error("node {node} is reachable by more than one path")]
    DuplicateVisit { node: NodeId },

    /// A node exists in storage but is unreachable from the root.
    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },
}

impl Tree {
    /// Construct a tree from its SoA parts without validation.
    ///
    /// Callers are expected to run [`Tree::validate`] afterwards; the
    /// artifact loader and [`TreeBuilder`] both do.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        split_feature: Vec<u32>,
        threshold: Vec<f32>,
        left: Vec<NodeId>,
        right: Vec<NodeId>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_value: Vec<f32>,
        split_kind: Vec<SplitKind>,
        right_categories: Vec<Vec<u32>>,
    ) -> Self {
        Self {
            split_feature,
            threshold,
            left,
            right,
            default_left,
            is_leaf,
            leaf_value,
            split_kind,
            right_categories,
        }
    }

    /// Number of nodes (internal + leaves).
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Check if a node is a leaf.
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    /// Leaf value at a node.
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_value[node as usize]
    }

    /// Split feature index at an internal node.
    pub fn split_feature(&self, node: NodeId) -> u32 {
        self.split_feature[node as usize]
    }

    /// Split kind at an internal node.
    pub fn split_kind(&self, node: NodeId) -> SplitKind {
        self.split_kind[node as usize]
    }

    /// Split threshold at a numeric node.
    pub fn threshold(&self, node: NodeId) -> f32 {
        self.threshold[node as usize]
    }

    /// Left child of an internal node.
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left[node as usize]
    }

    /// Right child of an internal node.
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right[node as usize]
    }

    /// Default direction for missing values at a node.
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    /// Sorted level indices that go right at a categorical node.
    pub fn right_categories(&self, node: NodeId) -> &[u32] {
        &self.right_categories[node as usize]
    }

    /// Whether a level index goes right at a categorical node.
    fn category_goes_right(&self, node: NodeId, category: u32) -> bool {
        self.right_categories[node as usize]
            .binary_search(&category)
            .is_ok()
    }

    /// Traverse from the root to a leaf for one sample.
    ///
    /// NaN feature values take the node's default direction. Categorical
    /// feature values are level indices encoded as floats.
    pub fn traverse(&self, sample: ArrayView1<'_, f32>) -> NodeId {
        let mut node: NodeId = 0;

        while !self.is_leaf(node) {
            let idx = node as usize;
            let fvalue = sample[self.split_feature[idx] as usize];

            node = if fvalue.is_nan() {
                if self.default_left[idx] {
                    self.left[idx]
                } else {
                    self.right[idx]
                }
            } else {
                match self.split_kind[idx] {
                    SplitKind::Numeric => {
                        if fvalue < self.threshold[idx] {
                            self.left[idx]
                        } else {
                            self.right[idx]
                        }
                    }
                    SplitKind::Categorical => {
                        // Level indices are small non-negative integers;
                        // anything else falls in no set and goes left.
                        let goes_right = fvalue >= 0.0
                            && self.category_goes_right(node, fvalue as u32);
                        if goes_right {
                            self.right[idx]
                        } else {
                            self.left[idx]
                        }
                    }
                }
            };
        }

        node
    }

    /// Predict the leaf value for one sample.
    pub fn predict(&self, sample: ArrayView1<'_, f32>) -> f32 {
        self.leaf_value(self.traverse(sample))
    }

    /// Validate structure against a feature count.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        let arrays: [(&'static str, usize); 8] = [
            ("split_feature", self.split_feature.len()),
            ("threshold", self.threshold.len()),
            ("left", self.left.len()),
            ("right", self.right.len()),
            ("default_left", self.default_left.len()),
            ("leaf_value", self.leaf_value.len()),
            ("split_kind", self.split_kind.len()),
            ("right_categories", self.right_categories.len()),
        ];
        for (field, len) in arrays {
            if len != n_nodes {
                return Err(TreeValidationError::LengthMismatch {
                    field,
                    expected: n_nodes,
                    got: len,
                });
            }
        }

        for idx in 0..n_nodes {
            let node = idx as NodeId;
            if self.is_leaf[idx] {
                continue;
            }

            for (side, child) in [("left", self.left[idx]), ("right", self.right[idx])] {
                if child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                if child == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
            }

            if self.split_feature[idx] as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature: self.split_feature[idx],
                    n_features,
                });
            }

            if self.split_kind[idx] == SplitKind::Categorical {
                let cats = &self.right_categories[idx];
                if cats.is_empty() {
                    return Err(TreeValidationError::EmptyCategories { node });
                }
                if cats.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(TreeValidationError::UnsortedCategories { node });
                }
            }
        }

        // Every node must be reached exactly once from the root. Catches
        // cycles, shared subtrees, and orphaned storage in one walk.
        let mut visited = vec![false; n_nodes];
        let mut stack = vec![0 as NodeId];
        while let Some(node) = stack.pop() {
            let idx = node as usize;
            if visited[idx] {
                return Err(TreeValidationError::DuplicateVisit { node });
            }
            visited[idx] = true;
            if !self.is_leaf[idx] {
                stack.push(self.left[idx]);
                stack.push(self.right[idx]);
            }
        }
        if let Some(idx) = visited.iter().position(|v| !v) {
            return Err(TreeValidationError::UnreachableNode {
                node: idx as NodeId,
            });
        }

        Ok(())
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

/// Node-by-node tree assembly.
///
/// Nodes are appended in index order; children are referenced by the index
/// they will occupy. [`TreeBuilder::build`] validates the result.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
}

impl TreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a numeric split node.
    pub fn numeric_split(
        mut self,
        feature: u32,
        threshold: f32,
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        let t = &mut self.tree;
        t.split_feature.push(feature);
        t.threshold.push(threshold);
        t.left.push(left);
        t.right.push(right);
        t.default_left.push(default_left);
        t.is_leaf.push(false);
        t.leaf_value.push(0.0);
        t.split_kind.push(SplitKind::Numeric);
        t.right_categories.push(Vec::new());
        self
    }

    /// Append a categorical split node. `right_categories` must be sorted
    /// level indices; membership sends the sample right.
    pub fn categorical_split(
        mut self,
        feature: u32,
        right_categories: Vec<u32>,
        default_left: bool,
        left: NodeId,
        right: NodeId,
    ) -> Self {
        let t = &mut self.tree;
        t.split_feature.push(feature);
        t.threshold.push(0.0);
        t.left.push(left);
        t.right.push(right);
        t.default_left.push(default_left);
        t.is_leaf.push(false);
        t.leaf_value.push(0.0);
        t.split_kind.push(SplitKind::Categorical);
        t.right_categories.push(right_categories);
        self
    }

    /// Append a leaf node.
    pub fn leaf(mut self, value: f32) -> Self {
        let t = &mut self.tree;
        t.split_feature.push(0);
        t.threshold.push(0.0);
        t.left.push(0);
        t.right.push(0);
        t.default_left.push(false);
        t.is_leaf.push(true);
        t.leaf_value.push(value);
        t.split_kind.push(SplitKind::Numeric);
        t.right_categories.push(Vec::new());
        self
    }

    /// Validate and return the tree.
    pub fn build(self, n_features: usize) -> Result<Tree, TreeValidationError> {
        self.tree.validate(n_features)?;
        Ok(self.tree)
    }
}

// ============================================================================
// Forest
// ============================================================================

/// Tree ensemble: prediction is `base_score + Σ leaf values`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f32,
}

/// Validation error naming the offending tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tree {tree}: {source}")]
pub struct ForestValidationError {
    /// Index of the invalid tree.
    pub tree: usize,
    /// Underlying structural error.
    #[source]
    pub source: TreeValidationError,
}

impl Forest {
    /// Create an empty forest with a base score.
    pub fn new(base_score: f32) -> Self {
        Self {
            trees: Vec::new(),
            base_score,
        }
    }

    /// Append a tree.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Builder-style tree append.
    pub fn with_tree(mut self, tree: Tree) -> Self {
        self.push_tree(tree);
        self
    }

    /// Number of trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// The ensemble base score.
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    /// The trees in iteration order.
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Predict one sample.
    pub fn predict_row(&self, sample: ArrayView1<'_, f32>) -> f32 {
        let mut acc = self.base_score;
        for tree in &self.trees {
            acc += tree.predict(sample);
        }
        acc
    }

    /// Predict a batch.
    ///
    /// `features` is sample-major: `[n_rows, n_features]`. Returns one value
    /// per row. An empty batch yields an empty output.
    pub fn predict(&self, features: ArrayView2<'_, f32>) -> Array1<f32> {
        let mut out = Array1::zeros(features.nrows());
        for (row, slot) in features.rows().into_iter().zip(out.iter_mut()) {
            *slot = self.predict_row(row);
        }
        out
    }

    /// Validate every tree against a feature count.
    pub fn validate(&self, n_features: usize) -> Result<(), ForestValidationError> {
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|source| ForestValidationError { tree: i, source })?;
        }
        Ok(())
    }
}
