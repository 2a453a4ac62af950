//! Schema alignment: reshape a raw record into the exact ordered row a
//! trained pipeline expects.
//!
//! This is the line of defense against silent corruption. A pipeline trained
//! on an ordered feature vector will happily mis-attribute values to the
//! wrong feature if the order is off, producing a plausible-looking but wrong
//! prediction with no error anywhere downstream. [`align`] therefore
//! guarantees the output row's columns equal the schema byte-for-byte:
//! order-exact, not merely set-exact.
//!
//! # Semantics
//!
//! For every schema name, in schema order:
//! - present in the record → that value;
//! - absent → an explicit missing sentinel (`None`), never zero or an empty
//!   string, so the pipeline's own missing-value handling is triggered.
//!
//! Record names outside the schema are dropped. Matching is case-sensitive;
//! a name differing only in case is extraneous, not a fuzzy match.

use crate::record::{AttrValue, RawRecord};
use crate::schema::FeatureSchema;

/// A single row whose columns are exactly the schema's names, in order.
///
/// Borrows the schema it was aligned against, so a row cannot outlive or
/// drift from the column list that gives its cells meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow<'s> {
    schema: &'s FeatureSchema,
    cells: Vec<Option<AttrValue>>,
}

/// Defensive column-equality violation.
///
/// Unreachable through [`align`]; exists so the request boundary can assert
/// the invariant instead of trusting it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignError {
    /// The row has a different number of columns than the schema.
    #[error("aligned row has {got} columns, schema has {expected}")]
    ColumnCount { expected: usize, got: usize },

    /// A column name differs from the schema at some position.
    #[error("column {index} is {got:?}, schema says {expected:?}")]
    ColumnName {
        index: usize,
        expected: String,
        got: String,
    },
}

/// Align a raw record to a feature schema.
///
/// Pure projection: no I/O, no mutation of the inputs. An empty record is
/// valid and yields an all-missing row.
pub fn align<'s>(raw: &RawRecord, schema: &'s FeatureSchema) -> AlignedRow<'s> {
    let cells = schema
        .iter()
        .map(|name| raw.get(name).cloned())
        .collect();
    AlignedRow { schema, cells }
}

impl<'s> AlignedRow<'s> {
    /// The schema this row was aligned against.
    pub fn schema(&self) -> &'s FeatureSchema {
        self.schema
    }

    /// Column names, in order. Always equal to the schema's names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.schema.iter()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Rows always have at least one column (schemas are non-empty).
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at a position. `None` is the missing-value sentinel.
    pub fn cell(&self, index: usize) -> Option<&AttrValue> {
        self.cells[index].as_ref()
    }

    /// Cell by column name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.schema.position(name).and_then(|i| self.cell(i))
    }

    /// Whether the cell at a position carries the missing sentinel.
    pub fn is_missing(&self, index: usize) -> bool {
        self.cells[index].is_none()
    }

    /// Number of missing cells.
    pub fn n_missing(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Iterate `(name, cell)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&AttrValue>)> {
        self.schema
            .iter()
            .zip(self.cells.iter().map(Option::as_ref))
    }

    /// Re-flatten into a record holding the present cells only.
    ///
    /// Aligning the result again yields an identical row: alignment is a
    /// projection, applying it twice changes nothing further.
    pub fn to_record(&self) -> RawRecord {
        self.iter()
            .filter_map(|(name, cell)| cell.map(|v| (name.to_string(), v.clone())))
            .collect()
    }

    /// Assert that this row's columns exactly equal `schema` (names and order).
    pub fn verify(&self, schema: &FeatureSchema) -> Result<(), AlignError> {
        if self.cells.len() != schema.len() {
            return Err(AlignError::ColumnCount {
                expected: schema.len(),
                got: self.cells.len(),
            });
        }
        for (index, (own, expected)) in self.columns().zip(schema.iter()).enumerate() {
            if own != expected {
                return Err(AlignError::ColumnName {
                    index,
                    expected: expected.to_string(),
                    got: own.to_string(),
                });
            }
        }
        Ok(())
    }
}
