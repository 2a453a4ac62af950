//! The trained regression pipeline: encoder stages + tree ensemble.
//!
//! A [`Pipeline`] is the runtime form of the trained artifact. It owns one
//! [`FeatureStage`] per feature (in training order) and a [`Forest`]; its one
//! job at serving time is `predict`. Pipelines are immutable after
//! construction and safe to share across threads.
//!
//! Construction goes through [`Pipeline::from_parts`] (artifact loading) or
//! [`PipelineBuilder`] (assembling a pipeline to save or test); both validate
//! the same invariants.

mod builder;
mod encode;
mod forest;
mod meta;

pub use builder::PipelineBuilder;
pub use encode::{EncodeError, FeatureStage};
pub use forest::{
    Forest, ForestValidationError, NodeId, SplitKind, Tree, TreeBuilder, TreeValidationError,
};
pub use meta::PipelineMeta;

use ndarray::{Array1, Array2, ArrayView2};

use crate::align::AlignedRow;

/// A loaded, immutable, inference-only pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    meta: PipelineMeta,
    stages: Vec<FeatureStage>,
    forest: Forest,
}

/// Validation errors for pipeline construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The pipeline has no feature stages.
    #[error("pipeline has no features")]
    NoFeatures,

    /// The builder was given no forest.
    #[error("pipeline has no forest")]
    NoForest,

    /// Stage count disagrees with the metadata's feature count.
    #[error("metadata says {expected} features, got {got} stages")]
    StageCount { expected: usize, got: usize },

    /// Feature-name count disagrees with the feature count.
    #[error("metadata says {expected} features, got {got} feature names")]
    NameCount { expected: usize, got: usize },

    /// A feature name appears more than once.
    #[error("duplicate feature name: {name:?}")]
    DuplicateFeature { name: String },

    /// A categorical stage has an empty vocabulary.
    #[error("feature {feature}: categorical stage with no levels")]
    EmptyLevels { feature: String },

    /// A categorical vocabulary contains a duplicate level.
    #[error("feature {feature}: duplicate level {level:?}")]
    DuplicateLevel { feature: String, level: String },

    /// The forest failed structural validation.
    #[error(transparent)]
    Forest(#[from] ForestValidationError),
}

/// Per-request prediction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictError {
    /// An input row has the wrong number of columns.
    #[error("pipeline expects {expected} features, row has {got}")]
    FeatureCount { expected: usize, got: usize },

    /// A cell could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl Pipeline {
    /// Assemble a pipeline from its parts, validating every invariant.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the stage count, feature names, categorical
    /// vocabularies, or forest structure are inconsistent.
    pub fn from_parts(
        meta: PipelineMeta,
        stages: Vec<FeatureStage>,
        forest: Forest,
    ) -> Result<Self, BuildError> {
        if stages.is_empty() {
            return Err(BuildError::NoFeatures);
        }
        if stages.len() != meta.n_features {
            return Err(BuildError::StageCount {
                expected: meta.n_features,
                got: stages.len(),
            });
        }
        if let Some(names) = &meta.feature_names {
            if names.len() != meta.n_features {
                return Err(BuildError::NameCount {
                    expected: meta.n_features,
                    got: names.len(),
                });
            }
            for (i, name) in names.iter().enumerate() {
                if names[..i].contains(name) {
                    return Err(BuildError::DuplicateFeature { name: name.clone() });
                }
            }
        }

        for (i, stage) in stages.iter().enumerate() {
            if let FeatureStage::Categorical { levels } = stage {
                let feature = meta
                    .feature_names
                    .as_ref()
                    .map(|names| names[i].clone())
                    .unwrap_or_else(|| i.to_string());
                if levels.is_empty() {
                    return Err(BuildError::EmptyLevels { feature });
                }
                for (j, level) in levels.iter().enumerate() {
                    if levels[..j].contains(level) {
                        return Err(BuildError::DuplicateLevel {
                            feature,
                            level: level.clone(),
                        });
                    }
                }
            }
        }

        forest.validate(meta.n_features)?;

        Ok(Self {
            meta,
            stages,
            forest,
        })
    }

    /// Start assembling a pipeline by hand.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Pipeline metadata.
    pub fn meta(&self) -> &PipelineMeta {
        &self.meta
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.meta.n_features
    }

    /// Encoder stages, in feature order.
    pub fn stages(&self) -> &[FeatureStage] {
        &self.stages
    }

    /// The tree ensemble.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Encode one aligned row into the pipeline's feature vector.
    ///
    /// Missing cells encode to NaN; the trees' default directions take over
    /// from there.
    pub fn encode_row(&self, row: &AlignedRow<'_>) -> Result<Array1<f32>, PredictError> {
        if row.len() != self.n_features() {
            return Err(PredictError::FeatureCount {
                expected: self.n_features(),
                got: row.len(),
            });
        }

        let mut encoded = Array1::zeros(self.n_features());
        for (slot, (stage, (name, cell))) in
            encoded.iter_mut().zip(self.stages.iter().zip(row.iter()))
        {
            *slot = stage.encode(name, cell)?;
        }
        Ok(encoded)
    }

    /// Predict a batch of aligned rows, one result per row.
    ///
    /// Deterministic: the same rows against the same pipeline always yield
    /// the same results.
    pub fn predict_rows(&self, rows: &[AlignedRow<'_>]) -> Result<Vec<f64>, PredictError> {
        let mut features = Array2::zeros((rows.len(), self.n_features()));
        for (mut slot, row) in features.rows_mut().into_iter().zip(rows) {
            slot.assign(&self.encode_row(row)?);
        }
        Ok(self
            .forest
            .predict(features.view())
            .iter()
            .map(|&v| v as f64)
            .collect())
    }

    /// Predict over an already-encoded feature matrix `[n_rows, n_features]`.
    pub fn predict_matrix(
        &self,
        features: ArrayView2<'_, f32>,
    ) -> Result<Array1<f32>, PredictError> {
        if features.ncols() != self.n_features() {
            return Err(PredictError::FeatureCount {
                expected: self.n_features(),
                got: features.ncols(),
            });
        }
        Ok(self.forest.predict(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align;
    use crate::record::RawRecord;
    use crate::schema::FeatureSchema;
    use ndarray::arr2;

    fn sample_pipeline() -> Pipeline {
        // year numeric, gearbox categorical {Automatic, Manual}
        let tree = TreeBuilder::new()
            .numeric_split(0, 2015.0, true, 1, 2)
            .leaf(1000.0)
            .categorical_split(1, vec![1], false, 3, 4)
            .leaf(5000.0)
            .leaf(3000.0)
            .build(2)
            .unwrap();

        Pipeline::builder()
            .add_numeric("vehicle_year")
            .add_categorical("vehicle_gearbox_type", &["Automatic", "Manual"])
            .forest(Forest::new(10_000.0).with_tree(tree))
            .build()
            .unwrap()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::from_names(&["vehicle_year", "vehicle_gearbox_type"]).unwrap()
    }

    #[test]
    fn predict_full_row() {
        let pipeline = sample_pipeline();
        let schema = schema();
        let raw = RawRecord::new()
            .with("vehicle_year", 2018i64)
            .with("vehicle_gearbox_type", "Automatic");

        let row = align(&raw, &schema);
        let preds = pipeline.predict_rows(&[row]).unwrap();
        // year >= 2015, gearbox level 0 not in {1} → left leaf 5000
        assert_eq!(preds, vec![15_000.0]);
    }

    #[test]
    fn predict_with_missing_cell() {
        let pipeline = sample_pipeline();
        let schema = schema();
        let raw = RawRecord::new().with("vehicle_gearbox_type", "Manual");

        let row = align(&raw, &schema);
        // year missing → NaN → default left at root → 1000
        let preds = pipeline.predict_rows(&[row]).unwrap();
        assert_eq!(preds, vec![11_000.0]);
    }

    #[test]
    fn unknown_level_is_an_error() {
        let pipeline = sample_pipeline();
        let schema = schema();
        let raw = RawRecord::new()
            .with("vehicle_year", 2018i64)
            .with("vehicle_gearbox_type", "Variator");

        let row = align(&raw, &schema);
        let err = pipeline.predict_rows(&[row]).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Encode(EncodeError::UnknownLevel { .. })
        ));
    }

    #[test]
    fn feature_count_mismatch() {
        let pipeline = sample_pipeline();
        let wrong = FeatureSchema::from_names(&["vehicle_year"]).unwrap();
        let row = align(&RawRecord::new(), &wrong);
        assert_eq!(
            pipeline.predict_rows(&[row]).unwrap_err(),
            PredictError::FeatureCount {
                expected: 2,
                got: 1
            }
        );

        let matrix = arr2(&[[2018.0]]);
        assert!(matches!(
            pipeline.predict_matrix(matrix.view()),
            Err(PredictError::FeatureCount { .. })
        ));
    }

    #[test]
    fn from_parts_validates() {
        let forest = Forest::new(0.0).with_tree(
            TreeBuilder::new()
                .numeric_split(0, 1.0, true, 1, 2)
                .leaf(0.0)
                .leaf(1.0)
                .build(1)
                .unwrap(),
        );

        // Stage count disagrees with meta.
        let err = Pipeline::from_parts(
            PipelineMeta::new(2),
            vec![FeatureStage::Numeric],
            forest.clone(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::StageCount {
                expected: 2,
                got: 1
            }
        );

        // Empty vocabulary.
        let err = Pipeline::from_parts(
            PipelineMeta::new(1).with_feature_names(vec!["wheels".into()]),
            vec![FeatureStage::Categorical { levels: vec![] }],
            forest.clone(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::EmptyLevels {
                feature: "wheels".into()
            }
        );

        // Forest referencing a feature the pipeline doesn't have.
        let wide_forest = Forest::new(0.0).with_tree(
            TreeBuilder::new()
                .numeric_split(7, 1.0, true, 1, 2)
                .leaf(0.0)
                .leaf(1.0)
                .build(8)
                .unwrap(),
        );
        let err =
            Pipeline::from_parts(PipelineMeta::new(1), vec![FeatureStage::Numeric], wide_forest)
                .unwrap_err();
        assert!(matches!(err, BuildError::Forest(_)));
    }

    #[test]
    fn fractional_leaf_values_accumulate() {
        use approx::assert_relative_eq;

        let t1 = TreeBuilder::new().leaf(0.1).build(1).unwrap();
        let t2 = TreeBuilder::new().leaf(0.2).build(1).unwrap();
        let pipeline = Pipeline::builder()
            .add_numeric("x")
            .forest(Forest::new(0.05).with_tree(t1).with_tree(t2))
            .build()
            .unwrap();

        let schema = FeatureSchema::from_names(&["x"]).unwrap();
        let row = align(&RawRecord::new(), &schema);
        let preds = pipeline.predict_rows(&[row]).unwrap();
        assert_relative_eq!(preds[0], 0.35, max_relative = 1e-6);
    }

    #[test]
    fn pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
