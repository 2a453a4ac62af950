//! Per-feature encoder stages.
//!
//! A trained pipeline carries one stage per feature, in schema order. Each
//! stage turns an optional raw value into the `f32` the tree ensemble
//! consumes. Missing values become `f32::NAN` so the trees' default
//! directions handle them; categorical values are mapped to their
//! training-time level index, encoded as a float.

use serde::{Deserialize, Serialize};

use crate::record::AttrValue;

/// Encoder for a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureStage {
    /// Numeric feature: ints and floats pass through, text is parsed.
    Numeric,
    /// Categorical feature with a fixed training-time vocabulary.
    ///
    /// Values are matched by their canonical text form against `levels`;
    /// the encoded value is the level's index. An unseen level is an error,
    /// not a guess.
    Categorical { levels: Vec<String> },
}

/// Encoding failures. Each names the offending feature and value so the
/// request boundary can produce a usable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A numeric feature received text that does not parse as a number.
    #[error("feature {feature:?}: cannot coerce {value:?} to a number")]
    NotNumeric { feature: String, value: String },

    /// A categorical feature received a level absent from its vocabulary.
    #[error("feature {feature:?}: unknown level {value:?}")]
    UnknownLevel { feature: String, value: String },
}

impl FeatureStage {
    /// Encode one cell. `None` is the missing sentinel and encodes to NaN.
    pub fn encode(
        &self,
        feature: &str,
        value: Option<&AttrValue>,
    ) -> Result<f32, EncodeError> {
        let Some(value) = value else {
            return Ok(f32::NAN);
        };

        match self {
            Self::Numeric => value.as_f32().ok_or_else(|| EncodeError::NotNumeric {
                feature: feature.to_string(),
                value: value.to_string(),
            }),
            Self::Categorical { levels } => {
                let key = value.category_key();
                levels
                    .iter()
                    .position(|level| *level == key)
                    .map(|idx| idx as f32)
                    .ok_or_else(|| EncodeError::UnknownLevel {
                        feature: feature.to_string(),
                        value: key,
                    })
            }
        }
    }

    /// Whether this stage encodes a categorical feature.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical { .. })
    }
}
