//! Collection envelope flattening

use crate::error::NormalizeError;
use bpa_model::RecordKind;
use serde_json::Value;

/// Key of the paged envelope used by list endpoints
pub const CONTENT_KEY: &str = "content";

/// Flatten a list payload into an ordered list of rows
///
/// Accepts a bare array, a `{content: [...]}` page, or `null` (no rows).
///
/// # Errors
/// `NormalizeError::UnexpectedEnvelope` for any other shape
pub fn flatten_rows(kind: RecordKind, payload: &Value) -> Result<Vec<Value>, NormalizeError> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => Ok(rows.clone()),
        Value::Object(map) => match map.get(CONTENT_KEY) {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(Value::Null) => Ok(Vec::new()),
            _ => Err(NormalizeError::UnexpectedEnvelope { kind }),
        },
        _ => Err(NormalizeError::UnexpectedEnvelope { kind }),
    }
}
