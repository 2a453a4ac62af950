//! Raw attribute records as delivered by a form collaborator.
//!
//! A [`RawRecord`] is whatever the user entered: a name→value mapping with no
//! guarantee of completeness or of matching the feature schema. Values are
//! typed scalars ([`AttrValue`]), not strings, so presence and kind are
//! explicit at every step downstream.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single raw attribute value.
///
/// Untagged for serde so that JSON records read naturally:
/// `{"vehicle_year": 2018, "current_mileage": 50000.0, "wheels": "Left wheel"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Integer attribute (e.g. year, mileage).
    Int(i64),
    /// Floating-point attribute.
    Float(f64),
    /// Text attribute (e.g. manufacturer, gearbox type).
    Text(String),
}

impl AttrValue {
    /// Coerce to `f32` for a numeric feature.
    ///
    /// Integers and floats convert directly; text is parsed as a float.
    /// Returns `None` when the text does not parse.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Int(i) => Some(*i as f32),
            Self::Float(f) => Some(*f as f32),
            Self::Text(s) => s.trim().parse::<f32>().ok(),
        }
    }

    /// Canonical text form used for categorical vocabulary lookup.
    ///
    /// Text is used as-is (no trimming or case folding); integers render in
    /// decimal; floats use Rust's shortest display form.
    pub fn category_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A raw attribute record: attribute name → scalar value.
///
/// Stored as a `BTreeMap` for deterministic iteration and JSON output.
/// May contain a subset, superset, or exact match of the schema's names;
/// the aligner sorts that out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: BTreeMap<String, AttrValue>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing any previous value under that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up an attribute by exact (case-sensitive) name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Check whether an attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of attributes in the record.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, AttrValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
