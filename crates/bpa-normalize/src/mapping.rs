//! Declarative field mappings
//!
//! Each record kind is described by a static table of [`FieldMapping`]s.
//! One generic normalizer walks the table in both directions, so per-step
//! behavior lives in data rather than in bespoke functions.

use bpa_model::{FieldValue, FormRecord};

/// How a wire value is coerced into a form value and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Free text
    Text,
    /// Decimal number kept as text in the form
    Number,
    /// Decimal number constrained to `0..=100`
    Percent,
    /// Whole number kept as text in the form
    Integer,
    /// Calendar date
    Date,
    /// Boolean flag
    Bool,
    /// Numeric record/lookup id
    Id,
    /// Account type canonicalized to one of the four slots
    AccountType,
}

impl Coercion {
    /// Whether the coercion carries a numeric value
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Coercion::Number | Coercion::Percent | Coercion::Integer)
    }
}

/// Value used when the wire field is absent or `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Leave the field empty
    Empty,
    /// Boolean default
    Bool(bool),
}

impl FieldDefault {
    /// Form value for this default
    #[inline]
    #[must_use]
    pub fn value(self) -> FieldValue {
        match self {
            FieldDefault::Empty => FieldValue::Empty,
            FieldDefault::Bool(b) => FieldValue::Bool(b),
        }
    }
}

/// Reference to a label resolved by the label collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRef {
    /// Display-config id; empty when the field has no configured label
    pub config_id: &'static str,
    /// Text shown when the config id cannot be resolved
    pub fallback: &'static str,
}

/// When a field must be filled before the step may advance
#[derive(Debug, Clone, Copy)]
pub enum Requirement {
    /// Never required
    Optional,
    /// Always required
    Always,
    /// Required when the predicate holds for the current record
    When(fn(&FormRecord) -> bool),
}

impl Requirement {
    /// Evaluate against a record
    #[inline]
    #[must_use]
    pub fn applies(self, record: &FormRecord) -> bool {
        match self {
            Requirement::Optional => false,
            Requirement::Always => true,
            Requirement::When(predicate) => predicate(record),
        }
    }
}

/// One form field and where it lives on the wire
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    /// Flat form field name
    pub field: &'static str,
    /// Path into the wire object; two segments address a nested DTO
    pub wire: &'static [&'static str],
    /// Type coercion
    pub coercion: Coercion,
    /// Default when the wire value is absent
    pub default: FieldDefault,
    /// Label used in messages
    pub label: LabelRef,
    /// Required-field rule
    pub requirement: Requirement,
    /// Assigned by the server (ids); excluded from round-trip comparisons
    pub server_generated: bool,
}

impl FieldMapping {
    /// Optional field labelled by its own name
    #[must_use]
    pub const fn new(
        field: &'static str,
        wire: &'static [&'static str],
        coercion: Coercion,
    ) -> Self {
        Self {
            field,
            wire,
            coercion,
            default: FieldDefault::Empty,
            label: LabelRef {
                config_id: "",
                fallback: field,
            },
            requirement: Requirement::Optional,
            server_generated: false,
        }
    }

    /// With a configured label
    #[must_use]
    pub const fn label(self, config_id: &'static str, fallback: &'static str) -> Self {
        Self {
            label: LabelRef {
                config_id,
                fallback,
            },
            ..self
        }
    }

    /// Mark as always required
    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            requirement: Requirement::Always,
            ..self
        }
    }

    /// Mark as conditionally required
    #[must_use]
    pub const fn required_when(self, predicate: fn(&FormRecord) -> bool) -> Self {
        Self {
            requirement: Requirement::When(predicate),
            ..self
        }
    }

    /// With a default for absent wire values
    #[must_use]
    pub const fn default_to(self, default: FieldDefault) -> Self {
        Self { default, ..self }
    }

    /// Mark as server generated
    #[must_use]
    pub const fn server_generated(self) -> Self {
        Self {
            server_generated: true,
            ..self
        }
    }

    /// Whether the field lives inside a nested DTO
    #[inline]
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.wire.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(record: &FormRecord) -> bool {
        record.text("flag") == "on"
    }

    #[test]
    fn builder_sets_flags() {
        const M: FieldMapping = FieldMapping::new("name", &["reaName"], Coercion::Text)
            .label("CDL_NAME", "Name")
            .required();
        assert_eq!(M.label.config_id, "CDL_NAME");
        assert!(M.requirement.applies(&FormRecord::new()));
        assert!(!M.is_nested());
    }

    #[test]
    fn conditional_requirement() {
        let m = FieldMapping::new("x", &["x"], Coercion::Text).required_when(flagged);
        assert!(!m.requirement.applies(&FormRecord::new()));
        assert!(m.requirement.applies(&FormRecord::new().with("flag", "on")));
    }

    #[test]
    fn default_label_is_field_name() {
        let m = FieldMapping::new("amount", &["debitAmount"], Coercion::Number);
        assert_eq!(m.label.fallback, "amount");
        assert!(m.coercion.is_numeric());
    }
}
