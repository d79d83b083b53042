//! Generic table-driven normalizer
//!
//! [`Normalizer`] converts between the wire shape (nested DTOs, numeric ids,
//! mixed casing) and the flat form shape by walking a kind's mapping table.
//! It is pure apart from the configured UTC offset used for dates.

use crate::accounts::canonical_slot;
use crate::breakdown::{rows_from_wire, rows_into_wire};
use crate::dates::{parse_wire_date, to_wire_timestamp};
use crate::derived;
use crate::envelope::flatten_rows;
use crate::error::NormalizeError;
use crate::mapping::{Coercion, FieldMapping};
use crate::tables::{mapping, mappings};
use bpa_model::{AccountSet, AccountSlot, FieldValue, FinancialSummaryForm, FormRecord, RecordKind};
use chrono::{FixedOffset, Offset, Utc};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

/// Canonical text form of a numeric string
///
/// Integers lose leading zeros and signs, decimals take the shortest
/// representation. Non-numeric text is returned trimmed so the user's input
/// survives for validation to report.
#[must_use]
pub fn canonical_number_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return int.to_string();
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| trimmed.to_string(), |n| n.to_string())
}

/// Wire value for numeric form text: a JSON number when parseable, `null`
/// when blank, the trimmed text otherwise
#[must_use]
pub fn number_to_wire(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(trimmed.to_string()),
    }
}

/// Bidirectional wire/form converter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::utc()
    }
}

impl Normalizer {
    /// Normalizer interpreting dates at `offset`
    #[inline]
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Normalizer interpreting dates in UTC
    #[must_use]
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Configured offset
    #[inline]
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Convert one wire record into form shape
    ///
    /// Derived fields are recomputed from their inputs.
    ///
    /// # Errors
    /// `NormalizeError::NotAnObject` if `wire` is not a JSON object
    pub fn to_form(&self, kind: RecordKind, wire: &Value) -> Result<FormRecord, NormalizeError> {
        let object = wire
            .as_object()
            .ok_or(NormalizeError::NotAnObject { kind })?;

        let mut record: FormRecord = mappings(kind)
            .iter()
            .map(|m| {
                let value = match self.coerce_in(m, lookup(object, m.wire)) {
                    FieldValue::Empty => m.default.value(),
                    value => value,
                };
                (m.field.to_string(), value)
            })
            .collect();

        derived::recompute(kind, &mut record);
        Ok(record)
    }

    /// Convert a form record into wire shape
    ///
    /// Empty scalars are sent as `null`. A nested DTO whose members are all
    /// empty is omitted so the payload does not overwrite the server's link.
    #[must_use]
    pub fn to_wire(&self, kind: RecordKind, record: &FormRecord) -> Value {
        let mut object = Map::new();
        for m in mappings(kind) {
            let value = self.coerce_out(m, record.get(m.field));
            match m.wire {
                [field] => {
                    object.insert((*field).to_string(), value);
                }
                [dto, field] => {
                    if value.is_null() {
                        continue;
                    }
                    let entry = object
                        .entry((*dto).to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(nested) = entry {
                        nested.insert((*field).to_string(), value);
                    }
                }
                _ => debug!(kind = %kind, field = m.field, "unsupported wire path depth"),
            }
        }
        Value::Object(object)
    }

    /// Set one form field, recomputing derived fields when needed
    ///
    /// Account types are canonicalized on the way in.
    ///
    /// # Errors
    /// `NormalizeError::UnknownField` if the kind declares no such field
    pub fn set_field(
        &self,
        kind: RecordKind,
        record: &mut FormRecord,
        field: &str,
        value: FieldValue,
    ) -> Result<(), NormalizeError> {
        let m = mapping(kind, field).ok_or_else(|| NormalizeError::UnknownField {
            kind,
            field: field.to_string(),
        })?;

        let value = match (m.coercion, value) {
            (Coercion::AccountType, FieldValue::Text(raw)) => canonical_slot(&raw)
                .map_or(FieldValue::Empty, |slot| FieldValue::text(slot.as_str())),
            (_, value) => value,
        };
        record.set(m.field, value);

        if derived::is_derivation_input(kind, field) {
            derived::recompute(kind, record);
        }
        Ok(())
    }

    /// Flatten a collection payload and normalize every row
    ///
    /// # Errors
    /// Envelope errors, or `NotAnObject` for a non-object row
    pub fn rows_to_form(
        &self,
        kind: RecordKind,
        payload: &Value,
    ) -> Result<Vec<FormRecord>, NormalizeError> {
        flatten_rows(kind, payload)?
            .iter()
            .map(|row| self.to_form(kind, row))
            .collect()
    }

    /// Normalize an account collection into the four canonical slots
    ///
    /// Rows whose type matches no slot are dropped. When two rows resolve to
    /// the same slot the first one wins.
    ///
    /// # Errors
    /// Envelope errors, or `NotAnObject` for a non-object row
    pub fn accounts_to_form(&self, payload: &Value) -> Result<AccountSet, NormalizeError> {
        let mut set = AccountSet::empty();
        let mut filled = [false; 4];

        for row in flatten_rows(RecordKind::Account, payload)? {
            let raw_type = row
                .get(bpa_model::account::ACCOUNT_TYPE_FIELD)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let Some(slot) = canonical_slot(&raw_type) else {
                warn!(account_type = %raw_type, "dropping account with unrecognized type");
                continue;
            };
            if filled[slot.index()] {
                warn!(slot = %slot, "duplicate account for slot, keeping first");
                continue;
            }
            set.set(slot, self.to_form(RecordKind::Account, &row)?);
            filled[slot.index()] = true;
        }
        Ok(set)
    }

    /// Wire payload for one account slot
    #[must_use]
    pub fn account_to_wire(&self, slot: AccountSlot, row: &FormRecord) -> Value {
        let mut wire = self.to_wire(RecordKind::Account, row);
        if let Value::Object(object) = &mut wire {
            object.insert(
                bpa_model::account::ACCOUNT_TYPE_FIELD.to_string(),
                Value::String(slot.as_str().to_string()),
            );
        }
        wire
    }

    /// Normalize a financial summary (scalars plus breakdown table)
    ///
    /// # Errors
    /// `NormalizeError::NotAnObject` if `wire` is not a JSON object
    pub fn summary_to_form(&self, wire: &Value) -> Result<FinancialSummaryForm, NormalizeError> {
        let fields = self.to_form(RecordKind::FinancialSummary, wire)?;
        let breakdown = wire
            .as_object()
            .map(rows_from_wire)
            .unwrap_or_default();
        Ok(FinancialSummaryForm { fields, breakdown })
    }

    /// Wire payload for a financial summary
    #[must_use]
    pub fn summary_to_wire(&self, form: &FinancialSummaryForm) -> Value {
        let mut wire = self.to_wire(RecordKind::FinancialSummary, &form.fields);
        if let Value::Object(object) = &mut wire {
            rows_into_wire(&form.breakdown, object);
        }
        wire
    }

    fn coerce_in(&self, m: &FieldMapping, raw: Option<&Value>) -> FieldValue {
        let Some(raw) = raw else {
            return FieldValue::Empty;
        };
        match (m.coercion, raw) {
            (_, Value::Null) => FieldValue::Empty,
            (Coercion::Text, Value::String(s)) if s.trim().is_empty() => FieldValue::Empty,
            (Coercion::Text, Value::String(s)) => FieldValue::text(s.as_str()),
            (Coercion::Text, Value::Number(n)) => FieldValue::text(n.to_string()),
            (Coercion::Text, Value::Bool(b)) => FieldValue::text(b.to_string()),
            (Coercion::Number | Coercion::Percent | Coercion::Integer, Value::Number(n)) => {
                FieldValue::Text(canonical_number_text(&n.to_string()))
            }
            (Coercion::Number | Coercion::Percent | Coercion::Integer, Value::String(s)) => {
                match canonical_number_text(s) {
                    text if text.is_empty() => FieldValue::Empty,
                    text => FieldValue::Text(text),
                }
            }
            (Coercion::Date, Value::String(s)) => {
                parse_wire_date(s, self.offset).map_or(FieldValue::Empty, FieldValue::Date)
            }
            (Coercion::Bool, Value::Bool(b)) => FieldValue::Bool(*b),
            (Coercion::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => FieldValue::Bool(true),
                "false" => FieldValue::Bool(false),
                _ => FieldValue::Empty,
            },
            (Coercion::Bool, Value::Number(n)) => match n.as_i64() {
                Some(1) => FieldValue::Bool(true),
                Some(0) => FieldValue::Bool(false),
                _ => FieldValue::Empty,
            },
            (Coercion::Id, Value::Number(n)) => n.as_i64().map_or(FieldValue::Empty, FieldValue::Id),
            (Coercion::Id, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_or(FieldValue::Empty, FieldValue::Id),
            (Coercion::AccountType, Value::String(s)) => canonical_slot(s)
                .map_or(FieldValue::Empty, |slot| FieldValue::text(slot.as_str())),
            _ => FieldValue::Empty,
        }
    }

    fn coerce_out(&self, m: &FieldMapping, value: &FieldValue) -> Value {
        if value.is_empty() {
            return match m.default.value() {
                FieldValue::Bool(b) => Value::Bool(b),
                _ => Value::Null,
            };
        }
        match m.coercion {
            Coercion::Text => Value::String(value.display()),
            Coercion::Number | Coercion::Percent | Coercion::Integer => {
                number_to_wire(&value.display())
            }
            Coercion::Date => value
                .as_date()
                .or_else(|| parse_wire_date(&value.display(), self.offset))
                .map_or(Value::Null, |d| Value::String(to_wire_timestamp(d, self.offset))),
            Coercion::Bool => match value {
                FieldValue::Bool(b) => Value::Bool(*b),
                other => match other.display().trim().to_ascii_lowercase().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::Null,
                },
            },
            Coercion::Id => value.as_id().map_or(Value::Null, Value::from),
            Coercion::AccountType => canonical_slot(&value.display())
                .map_or(Value::Null, |slot| Value::String(slot.as_str().to_string())),
        }
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    match path {
        [field] => object.get(*field),
        [dto, field] => object.get(*dto)?.as_object()?.get(*field),
        _ => None,
    }
}
