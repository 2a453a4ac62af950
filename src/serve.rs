//! Request serving: alignment, invocation, and failure classification.
//!
//! [`Estimator`] owns the two pieces of process-wide state (the trained
//! pipeline and the feature schema), loaded once at startup and immutable
//! afterwards. Each [`estimate_price`](Estimator::estimate_price) call is an
//! independent, synchronous, stateless request: align the raw record, invoke
//! the pipeline on the one-row batch, extract the single scalar.
//!
//! There are no retries. Inference is idempotent, so a failure indicates a
//! structural mismatch (unseen level, bad artifact, malformed value) that a
//! retry cannot fix. A failing request is rejected with a classified
//! [`InferenceError`]; the process and shared state remain valid for the
//! next request.

use std::path::Path;

use crate::align::{align, AlignError};
use crate::artifact::{self, ArtifactError};
use crate::pipeline::{Pipeline, PredictError};
use crate::record::RawRecord;
use crate::schema::FeatureSchema;

/// The process-wide serving state: pipeline + schema, loaded once.
///
/// `Estimator` is `Send + Sync`; concurrent callers need no locks because
/// nothing here is ever mutated after construction.
#[derive(Debug, Clone)]
pub struct Estimator {
    pipeline: Pipeline,
    schema: FeatureSchema,
}

/// Per-request inference failures.
///
/// Recoverable at the request level: convert to a user-facing message and
/// keep serving.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    /// The pipeline rejected the row (unseen level, coercion failure,
    /// feature-count mismatch).
    #[error("pipeline failure: {0}")]
    Pipeline(#[from] PredictError),

    /// The aligned row failed the defensive column check.
    #[error("alignment invariant violated: {0}")]
    Alignment(#[from] AlignError),

    /// The pipeline returned something other than one result for a
    /// one-row input.
    #[error("pipeline returned {got} results for a single-row input")]
    ResultCount { got: usize },

    /// The pipeline produced a NaN or infinite estimate.
    #[error("pipeline produced a non-finite estimate ({value})")]
    NonFinite { value: f64 },
}

impl Estimator {
    /// Assemble an estimator from already-loaded parts, cross-checking that
    /// the schema and the pipeline agree on the feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::HeaderMismatch`] when the counts disagree,
    /// or [`ArtifactError::CorruptPayload`] when the pipeline carries
    /// feature names that differ from the schema's.
    pub fn new(pipeline: Pipeline, schema: FeatureSchema) -> Result<Self, ArtifactError> {
        if pipeline.n_features() != schema.len() {
            return Err(ArtifactError::HeaderMismatch {
                header: pipeline.n_features(),
                payload: schema.len(),
            });
        }
        if let Some(names) = &pipeline.meta().feature_names {
            if names != schema.names() {
                return Err(ArtifactError::CorruptPayload(format!(
                    "pipeline feature names {:?} disagree with schema {:?}",
                    names,
                    schema.names()
                )));
            }
        }
        Ok(Self { pipeline, schema })
    }

    /// Load both artifacts and assemble the estimator.
    ///
    /// Called once at process start. Any failure here is fatal to startup:
    /// the service must not accept requests without both artifacts.
    pub fn load(
        pipeline_path: impl AsRef<Path>,
        schema_path: impl AsRef<Path>,
    ) -> Result<Self, ArtifactError> {
        let pipeline = artifact::load_pipeline(pipeline_path)?;
        let schema = artifact::load_schema(schema_path)?;
        Self::new(pipeline, schema)
    }

    /// The feature schema requests are aligned against.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// The loaded pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Estimate a price from a raw attribute record.
    ///
    /// The record may cover any subset of the schema (missing attributes
    /// fall to the pipeline's own missing-value handling) and may carry
    /// extraneous names (dropped). Exactly one valid result or one
    /// classified error; never a partial or defaulted answer.
    pub fn estimate_price(&self, raw: &RawRecord) -> Result<f64, InferenceError> {
        let row = align(raw, &self.schema);
        row.verify(&self.schema)?;

        let results = self.pipeline.predict_rows(std::slice::from_ref(&row))?;
        let [price] = results[..] else {
            return Err(InferenceError::ResultCount {
                got: results.len(),
            });
        };

        if !price.is_finite() {
            return Err(InferenceError::NonFinite { value: price });
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{EncodeError, Forest, TreeBuilder};

    fn estimator() -> Estimator {
        // mileage < 100k adds value; Tiptronic (level 0) and Variator
        // (level 3) resolve through a categorical split.
        let mileage_tree = TreeBuilder::new()
            .numeric_split(0, 100_000.0, false, 1, 2)
            .leaf(1_500.0)
            .leaf(-2_000.0)
            .build(2)
            .unwrap();
        let gearbox_tree = TreeBuilder::new()
            .categorical_split(1, vec![0, 3], true, 1, 2)
            .leaf(-400.0)
            .leaf(600.0)
            .build(2)
            .unwrap();

        let pipeline = Pipeline::builder()
            .add_numeric("current_mileage")
            .add_categorical(
                "vehicle_gearbox_type",
                &["Tiptronic", "Automatic", "Manual", "Variator"],
            )
            .forest(
                Forest::new(10_000.0)
                    .with_tree(mileage_tree)
                    .with_tree(gearbox_tree),
            )
            .build()
            .unwrap();

        let schema =
            FeatureSchema::from_names(&["current_mileage", "vehicle_gearbox_type"]).unwrap();
        Estimator::new(pipeline, schema).unwrap()
    }

    #[test]
    fn estimates_a_full_record() {
        let est = estimator();
        let raw = RawRecord::new()
            .with("current_mileage", 50_000i64)
            .with("vehicle_gearbox_type", "Tiptronic");

        // 10_000 + 1_500 + 600
        assert_eq!(est.estimate_price(&raw).unwrap(), 12_100.0);
    }

    #[test]
    fn partial_record_uses_default_directions() {
        let est = estimator();
        let raw = RawRecord::new().with("vehicle_gearbox_type", "Manual");

        // mileage missing → default right (-2_000); Manual not in {0,3} → -400
        assert_eq!(est.estimate_price(&raw).unwrap(), 7_600.0);
    }

    #[test]
    fn empty_record_still_predicts() {
        // Scenario C: all-missing row exercises the default directions.
        let est = estimator();
        // mileage NaN → default right (-2_000); gearbox NaN → default left (-400)
        assert_eq!(est.estimate_price(&RawRecord::new()).unwrap(), 7_600.0);
    }

    #[test]
    fn extraneous_names_are_ignored() {
        let est = estimator();
        let raw = RawRecord::new()
            .with("current_mileage", 50_000i64)
            .with("vehicle_gearbox_type", "Tiptronic")
            .with("vehicle_interior_color", "Beige");

        assert_eq!(est.estimate_price(&raw).unwrap(), 12_100.0);
    }

    #[test]
    fn unseen_level_is_classified() {
        let est = estimator();
        let raw = RawRecord::new().with("vehicle_gearbox_type", "CVT");

        assert!(matches!(
            est.estimate_price(&raw).unwrap_err(),
            InferenceError::Pipeline(PredictError::Encode(EncodeError::UnknownLevel { .. }))
        ));
    }

    #[test]
    fn coercion_failure_is_classified() {
        let est = estimator();
        let raw = RawRecord::new().with("current_mileage", "a lot");

        assert!(matches!(
            est.estimate_price(&raw).unwrap_err(),
            InferenceError::Pipeline(PredictError::Encode(EncodeError::NotNumeric { .. }))
        ));
    }

    #[test]
    fn inference_is_deterministic() {
        let est = estimator();
        let raw = RawRecord::new()
            .with("current_mileage", 180_000i64)
            .with("vehicle_gearbox_type", "Variator");

        let first = est.estimate_price(&raw).unwrap();
        let second = est.estimate_price(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_finite_estimate_is_an_error() {
        let tree = TreeBuilder::new().leaf(f32::INFINITY).build(1).unwrap();
        let pipeline = Pipeline::builder()
            .add_numeric("current_mileage")
            .forest(Forest::new(0.0).with_tree(tree))
            .build()
            .unwrap();
        let schema = FeatureSchema::from_names(&["current_mileage"]).unwrap();
        let est = Estimator::new(pipeline, schema).unwrap();

        assert!(matches!(
            est.estimate_price(&RawRecord::new()).unwrap_err(),
            InferenceError::NonFinite { .. }
        ));
    }

    #[test]
    fn negative_estimates_pass_through() {
        // No bounds policy at this layer.
        let tree = TreeBuilder::new().leaf(-500.0).build(1).unwrap();
        let pipeline = Pipeline::builder()
            .add_numeric("current_mileage")
            .forest(Forest::new(0.0).with_tree(tree))
            .build()
            .unwrap();
        let schema = FeatureSchema::from_names(&["current_mileage"]).unwrap();
        let est = Estimator::new(pipeline, schema).unwrap();

        assert_eq!(est.estimate_price(&RawRecord::new()).unwrap(), -500.0);
    }

    #[test]
    fn schema_pipeline_disagreement_fails_startup() {
        let tree = TreeBuilder::new().leaf(1.0).build(1).unwrap();
        let pipeline = Pipeline::builder()
            .add_numeric("current_mileage")
            .forest(Forest::new(0.0).with_tree(tree))
            .build()
            .unwrap();

        // Wrong count.
        let schema = FeatureSchema::from_names(&["a", "b"]).unwrap();
        assert!(matches!(
            Estimator::new(pipeline.clone(), schema),
            Err(ArtifactError::HeaderMismatch { .. })
        ));

        // Same count, different name.
        let schema = FeatureSchema::from_names(&["mileage"]).unwrap();
        assert!(matches!(
            Estimator::new(pipeline, schema),
            Err(ArtifactError::CorruptPayload(_))
        ));
    }

    #[test]
    fn estimator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Estimator>();
    }
}
