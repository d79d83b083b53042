//! Flat form values and records
//!
//! The form shape is a flat, ordered map of scalar values. Numeric input is
//! kept as text exactly as the user typed it; coercion back to numbers happens
//! on the way to the wire.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

static EMPTY_VALUE: FieldValue = FieldValue::Empty;

/// Field name holding the server-assigned record id
pub const ID_FIELD: &str = "id";

/// A single scalar form value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value (absent, `null`, or never set)
    #[default]
    Empty,
    /// Free text or numeric text
    Text(String),
    /// Boolean flag
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Numeric id of a record or lookup entry
    Id(i64),
}

impl FieldValue {
    /// Text value
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Whether the value counts as empty (`Empty` or blank text)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display string; empty values render as `""`
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Id(id) => id.to_string(),
        }
    }

    /// Numeric id, accepting digit-only text
    #[must_use]
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric interpretation of text or id values
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Id(id) => Some(*id as f64),
            _ => None,
        }
    }

    /// Date value
    #[inline]
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Boolean value
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Comparison used for change detection
    ///
    /// Empty and blank values are equal to each other; values of different
    /// variants compare by their display string.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => true,
            (false, false) => self == other || self.display() == other.display(),
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A flat, ordered form record
///
/// Missing fields read as [`FieldValue::Empty`]. Equality ignores field order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct FormRecord {
    fields: IndexMap<String, FieldValue>,
}

impl FormRecord {
    /// Create empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    #[inline]
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Value of a field, `Empty` when absent
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&EMPTY_VALUE)
    }

    /// Set a field value
    #[inline]
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Remove a field, returning its previous value
    #[inline]
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.shift_remove(field)
    }

    /// Whether the field is present (possibly empty)
    #[inline]
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Display text of a field
    #[inline]
    #[must_use]
    pub fn text(&self, field: &str) -> String {
        self.get(field).display()
    }

    /// Server-assigned id, `None` while not persisted
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.get(ID_FIELD).as_id()
    }

    /// Record the server-assigned id
    #[inline]
    pub fn set_id(&mut self, id: i64) {
        self.set(ID_FIELD, FieldValue::Id(id));
    }

    /// Whether every field is empty
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(FieldValue::is_empty)
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields present
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for FormRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
