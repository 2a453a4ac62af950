//! Payload structures for the pipeline artifact.
//!
//! These structs are designed for Postcard serialization. They mirror the
//! runtime types but stay independent of them so the stored format can
//! evolve without touching inference code; new format versions add payload
//! variants rather than modifying existing ones.

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    FeatureStage, Forest, Pipeline, PipelineMeta, SplitKind, Tree,
};

use super::ArtifactError;

/// Version-tagged payload for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelinePayload {
    /// Version 1 payload format.
    V1(PipelineV1),
}

/// Version 1 payload: metadata, encoder stages, and the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineV1 {
    /// Pipeline metadata.
    pub meta: MetaPayload,
    /// Encoder stages in feature order.
    pub stages: Vec<StagePayload>,
    /// Tree ensemble.
    pub forest: ForestPayload,
}

/// Metadata payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPayload {
    /// Number of input features.
    pub n_features: u32,
    /// Feature names in training order (optional).
    pub feature_names: Option<Vec<String>>,
    /// Regressor label, e.g. "gradient_boosted_trees".
    pub model_kind: String,
}

/// Encoder stage payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StagePayload {
    /// Numeric passthrough stage.
    Numeric,
    /// Categorical stage with its vocabulary.
    Categorical {
        /// Level vocabulary; the encoded value is the level's index.
        levels: Vec<String>,
    },
}

/// Forest payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestPayload {
    /// Ensemble base score.
    pub base_score: f32,
    /// Trees in iteration order.
    pub trees: Vec<TreePayload>,
}

/// Single tree payload (SoA, one entry per node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreePayload {
    /// Split feature indices (0 for leaves).
    pub split_features: Vec<u32>,
    /// Split thresholds (0.0 for categorical splits and leaves).
    pub thresholds: Vec<f32>,
    /// Left child indices (0 for leaves).
    pub left_children: Vec<u32>,
    /// Right child indices (0 for leaves).
    pub right_children: Vec<u32>,
    /// Default direction for missing values.
    pub default_left: Vec<bool>,
    /// Whether each node is a leaf.
    pub is_leaf: Vec<bool>,
    /// Leaf values (0.0 for internal nodes).
    pub leaf_values: Vec<f32>,
    /// Split kinds (0 = numeric, 1 = categorical).
    pub split_kinds: Vec<u8>,
    /// Per-node sorted level indices that go right (empty for numeric).
    pub right_categories: Vec<Vec<u32>>,
}

impl PipelinePayload {
    /// Capture a runtime pipeline into the current payload version.
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let meta = pipeline.meta();
        Self::V1(PipelineV1 {
            meta: MetaPayload {
                n_features: meta.n_features as u32,
                feature_names: meta.feature_names.clone(),
                model_kind: meta.model_kind.clone(),
            },
            stages: pipeline
                .stages()
                .iter()
                .map(|stage| match stage {
                    FeatureStage::Numeric => StagePayload::Numeric,
                    FeatureStage::Categorical { levels } => StagePayload::Categorical {
                        levels: levels.clone(),
                    },
                })
                .collect(),
            forest: ForestPayload {
                base_score: pipeline.forest().base_score(),
                trees: pipeline.forest().trees().iter().map(tree_to_payload).collect(),
            },
        })
    }

    /// Reconstruct the runtime pipeline, re-validating every invariant.
    pub fn into_pipeline(self) -> Result<Pipeline, ArtifactError> {
        let Self::V1(v1) = self;

        let mut meta = PipelineMeta::new(v1.meta.n_features as usize)
            .with_model_kind(v1.meta.model_kind);
        if let Some(names) = v1.meta.feature_names {
            meta = meta.with_feature_names(names);
        }

        let stages = v1
            .stages
            .into_iter()
            .map(|stage| match stage {
                StagePayload::Numeric => FeatureStage::Numeric,
                StagePayload::Categorical { levels } => FeatureStage::Categorical { levels },
            })
            .collect();

        let mut forest = Forest::new(v1.forest.base_score);
        for tree in v1.forest.trees {
            forest.push_tree(tree_from_payload(tree)?);
        }

        Ok(Pipeline::from_parts(meta, stages, forest)?)
    }
}

fn tree_to_payload(tree: &Tree) -> TreePayload {
    let nodes = 0..tree.n_nodes() as u32;
    TreePayload {
        split_features: nodes.clone().map(|n| tree.split_feature(n)).collect(),
        thresholds: nodes.clone().map(|n| tree.threshold(n)).collect(),
        left_children: nodes.clone().map(|n| tree.left_child(n)).collect(),
        right_children: nodes.clone().map(|n| tree.right_child(n)).collect(),
        default_left: nodes.clone().map(|n| tree.default_left(n)).collect(),
        is_leaf: nodes.clone().map(|n| tree.is_leaf(n)).collect(),
        leaf_values: nodes.clone().map(|n| tree.leaf_value(n)).collect(),
        split_kinds: nodes
            .clone()
            .map(|n| match tree.split_kind(n) {
                SplitKind::Numeric => 0,
                SplitKind::Categorical => 1,
            })
            .collect(),
        right_categories: nodes.map(|n| tree.right_categories(n).to_vec()).collect(),
    }
}

fn tree_from_payload(payload: TreePayload) -> Result<Tree, ArtifactError> {
    let split_kinds = payload
        .split_kinds
        .iter()
        .map(|&k| match k {
            0 => Ok(SplitKind::Numeric),
            1 => Ok(SplitKind::Categorical),
            other => Err(ArtifactError::CorruptPayload(format!(
                "invalid split kind {other}"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Tree::from_parts(
        payload.split_features,
        payload.thresholds,
        payload.left_children,
        payload.right_children,
        payload.default_left,
        payload.is_leaf,
        payload.leaf_values,
        split_kinds,
        payload.right_categories,
    ))
}
