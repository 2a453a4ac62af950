//! The canonical ordered feature-name list a pipeline was fit on.
//!
//! Order is authoritative: a trained pipeline attributes the i-th column of
//! its input to the i-th name here, so any permutation silently corrupts
//! predictions. [`FeatureSchema`] therefore guards its invariants (non-empty,
//! unique names, fixed order) at construction and is immutable afterwards.

use serde::{Deserialize, Serialize};

/// Ordered, unique feature names. Fixed at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

/// Validation errors for [`FeatureSchema`] construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The feature-name list is empty.
    #[error("feature schema is empty")]
    Empty,

    /// A feature name appears more than once.
    #[error("duplicate feature name: {name:?}")]
    DuplicateName { name: String },
}

impl FeatureSchema {
    /// Create a schema from an ordered name list.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the list is empty or contains duplicates.
    pub fn new(names: Vec<String>) -> Result<Self, SchemaError> {
        if names.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(SchemaError::DuplicateName { name: name.clone() });
            }
        }
        Ok(Self { names })
    }

    /// Convenience constructor from string slices.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, SchemaError> {
        Self::new(names.iter().map(|s| s.as_ref().to_string()).collect())
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// A schema is never empty, but clippy wants the pair.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The ordered name list.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name at a position.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Position of a name, by exact (case-sensitive) match.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Check whether a name is part of the schema.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterate names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_preserved() {
        let schema =
            FeatureSchema::from_names(&["vehicle_year", "current_mileage", "wheels"]).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(
            schema.iter().collect::<Vec<_>>(),
            vec!["vehicle_year", "current_mileage", "wheels"]
        );
        assert_eq!(schema.position("current_mileage"), Some(1));
        assert_eq!(schema.position("colour"), None);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(FeatureSchema::new(vec![]), Err(SchemaError::Empty));
    }

    #[test]
    fn rejects_duplicates() {
        let result = FeatureSchema::from_names(&["a", "b", "a"]);
        assert_eq!(
            result,
            Err(SchemaError::DuplicateName { name: "a".into() })
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let schema = FeatureSchema::from_names(&["vehicle_year"]).unwrap();
        assert!(schema.contains("vehicle_year"));
        assert!(!schema.contains("Vehicle_Year"));
    }

    #[test]
    fn json_roundtrip_is_a_bare_array() {
        let schema = FeatureSchema::from_names(&["a", "b"]).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"["a","b"]"#);

        let restored: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, schema);
    }

    #[test]
    fn json_rejects_invalid_schema() {
        let result: Result<FeatureSchema, _> = serde_json::from_str(r#"["a","a"]"#);
        assert!(result.is_err());

        let result: Result<FeatureSchema, _> = serde_json::from_str("[]");
        assert!(result.is_err());
    }
}
