//! Pipeline metadata.
//!
//! Introspection data for operators: feature count, optional feature names,
//! and the model-kind label the training side stamped on the artifact.

use serde::{Deserialize, Serialize};

/// Shared metadata carried by a trained pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMeta {
    /// Number of input features.
    pub n_features: usize,
    /// Feature names in training order (optional).
    pub feature_names: Option<Vec<String>>,
    /// Human-readable regressor label, e.g. `"gradient_boosted_trees"`.
    pub model_kind: String,
}

impl PipelineMeta {
    /// Metadata for a regression pipeline over `n_features` inputs.
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            feature_names: None,
            model_kind: "gradient_boosted_trees".to_string(),
        }
    }

    /// Set feature names.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Set the model-kind label.
    pub fn with_model_kind(mut self, kind: impl Into<String>) -> Self {
        self.model_kind = kind.into();
        self
    }
}
