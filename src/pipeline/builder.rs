//! Hand assembly of pipelines.
//!
//! Used by the training side to package a model for saving, and by tests to
//! construct small pipelines without an artifact on disk.

use super::encode::FeatureStage;
use super::forest::Forest;
use super::meta::PipelineMeta;
use super::{BuildError, Pipeline};

/// Builder for [`Pipeline`].
///
/// Features are added in training order; [`PipelineBuilder::build`] runs the
/// same validation as artifact loading.
///
/// # Example
///
/// ```
/// use autoprice::pipeline::{Forest, Pipeline, TreeBuilder};
///
/// let tree = TreeBuilder::new()
///     .numeric_split(0, 2015.0, true, 1, 2)
///     .leaf(-500.0)
///     .leaf(500.0)
///     .build(2)
///     .unwrap();
///
/// let pipeline = Pipeline::builder()
///     .add_numeric("vehicle_year")
///     .add_categorical("wheels", &["Left wheel", "Right-hand drive"])
///     .forest(Forest::new(12_000.0).with_tree(tree))
///     .build()
///     .unwrap();
///
/// assert_eq!(pipeline.n_features(), 2);
/// ```
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    names: Vec<String>,
    stages: Vec<FeatureStage>,
    forest: Option<Forest>,
    model_kind: Option<String>,
}

impl PipelineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a numeric feature.
    pub fn add_numeric(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self.stages.push(FeatureStage::Numeric);
        self
    }

    /// Add a categorical feature with its training-time vocabulary.
    pub fn add_categorical<S: AsRef<str>>(mut self, name: impl Into<String>, levels: &[S]) -> Self {
        self.names.push(name.into());
        self.stages.push(FeatureStage::Categorical {
            levels: levels.iter().map(|l| l.as_ref().to_string()).collect(),
        });
        self
    }

    /// Set the tree ensemble.
    pub fn forest(mut self, forest: Forest) -> Self {
        self.forest = Some(forest);
        self
    }

    /// Set the model-kind label.
    pub fn model_kind(mut self, kind: impl Into<String>) -> Self {
        self.model_kind = Some(kind.into());
        self
    }

    /// Validate and build the pipeline.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        let forest = self.forest.ok_or(BuildError::NoForest)?;

        let mut meta = PipelineMeta::new(self.stages.len()).with_feature_names(self.names);
        if let Some(kind) = self.model_kind {
            meta = meta.with_model_kind(kind);
        }

        Pipeline::from_parts(meta, self.stages, forest)
    }
}
