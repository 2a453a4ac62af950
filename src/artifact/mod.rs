//! Durable artifacts: the trained pipeline and the feature schema.
//!
//! Both are produced by the training side and loaded exactly once at process
//! start. The pipeline travels as a binary container ([`format`]) holding a
//! Postcard payload ([`payload`]); the schema travels as a JSON array of
//! feature names. Every way a load can go wrong is an [`ArtifactError`],
//! fatal to startup: serving without both artifacts is meaningless.

pub mod format;
pub mod payload;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::pipeline::{BuildError, Pipeline};
use crate::schema::{FeatureSchema, SchemaError};

pub use format::{ArtifactHeader, CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, HEADER_SIZE, MAGIC};
pub use payload::PipelinePayload;

/// Errors loading or saving artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// I/O error reading or writing an artifact file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a pipeline artifact (wrong magic).
    #[error("not a pipeline artifact")]
    NotAnArtifact,

    /// Artifact requires a newer format version.
    #[error("artifact requires format {major}.{minor} or later")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Payload checksum doesn't match; the file has rotted or been edited.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// File is shorter than its header claims.
    #[error("artifact truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Payload decoded but holds nonsense values.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Postcard decoding/encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// Schema artifact is not valid JSON.
    #[error("schema artifact is not valid JSON: {0}")]
    SchemaJson(#[from] serde_json::Error),

    /// Schema artifact decoded but violates schema invariants.
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    /// Pipeline payload decoded but fails pipeline validation.
    #[error("invalid pipeline: {0}")]
    Pipeline(#[from] BuildError),

    /// Header feature count disagrees with the payload.
    #[error("header says {header} features, payload says {payload}")]
    HeaderMismatch { header: usize, payload: usize },
}

// ============================================================================
// Pipeline artifact
// ============================================================================

/// Serialize a pipeline to artifact bytes.
pub fn pipeline_to_bytes(pipeline: &Pipeline) -> Result<Vec<u8>, ArtifactError> {
    let payload = postcard::to_allocvec(&PipelinePayload::from_pipeline(pipeline))?;
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    format::write_artifact(&mut out, pipeline.n_features() as u32, &payload)?;
    Ok(out)
}

/// Deserialize a pipeline from artifact bytes.
pub fn pipeline_from_bytes(bytes: &[u8]) -> Result<Pipeline, ArtifactError> {
    let (header, payload) = format::read_artifact(&mut &bytes[..])?;
    let decoded: PipelinePayload = postcard::from_bytes(&payload)?;
    let pipeline = decoded.into_pipeline()?;

    if header.n_features as usize != pipeline.n_features() {
        return Err(ArtifactError::HeaderMismatch {
            header: header.n_features as usize,
            payload: pipeline.n_features(),
        });
    }
    Ok(pipeline)
}

/// Save a pipeline artifact to a file.
pub fn save_pipeline(pipeline: &Pipeline, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    let bytes = pipeline_to_bytes(pipeline)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Load a pipeline artifact from a file.
///
/// Called once at startup; the result is held as read-only process-wide
/// state for the life of the service.
pub fn load_pipeline(path: impl AsRef<Path>) -> Result<Pipeline, ArtifactError> {
    let bytes = std::fs::read(path)?;
    pipeline_from_bytes(&bytes)
}

// ============================================================================
// Schema artifact
// ============================================================================

/// Save a feature schema as a JSON artifact.
pub fn save_schema(schema: &FeatureSchema, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, schema)?;
    writer.flush()?;
    Ok(())
}

/// Load the ordered feature-name list from a JSON artifact.
///
/// Called once at startup, alongside [`load_pipeline`].
pub fn load_schema(path: impl AsRef<Path>) -> Result<FeatureSchema, ArtifactError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
