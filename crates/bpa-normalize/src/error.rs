//! Error types for normalization

use bpa_model::RecordKind;

/// Normalization errors
///
/// Individual malformed values never fail a whole record; they normalize to
/// empty. Only structurally unusable payloads are rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Record payload was not a JSON object
    #[error("{kind} payload is not an object")]
    NotAnObject {
        /// Kind being normalized
        kind: RecordKind,
    },

    /// Collection payload was neither an array nor a `{content: [...]}` envelope
    #[error("unexpected collection envelope for {kind}")]
    UnexpectedEnvelope {
        /// Kind being normalized
        kind: RecordKind,
    },

    /// Field is not declared in the mapping table for the kind
    #[error("unknown field {field} for {kind}")]
    UnknownField {
        /// Kind being edited
        kind: RecordKind,
        /// Offending field name
        field: String,
    },
}
