//! The typed record shape produced by the parser.

use chrono::NaiveDateTime;

/// A single converted field value. Empty or whitespace-only tokens convert
/// to [`Value::Null`] regardless of declared field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty or whitespace-only token.
    Null,
    /// Kept verbatim.
    String(String),
    /// Parsed as a 64-bit signed integer.
    Int(i64),
    /// Parsed as a 64-bit float.
    Double(f64),
    /// Parsed timestamp; the columnar writer renders this back to text.
    Timestamp(NaiveDateTime),
}

/// One parsed line: field name to typed value, insertion order matching
/// the field definitions' `sequence`.
#[derive(Debug, Clone, Default)]
pub struct Record(Vec<(String, Value)>);

impl Record {
    /// An empty record with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append a field in parse order.
    pub fn push(&mut self, field_name: String, value: Value) {
        self.0.push((field_name, value));
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
