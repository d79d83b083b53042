//! Derived form fields

use bpa_model::{FieldValue, FormRecord, RecordKind};

/// Retention percentage input
pub const RETENTION: &str = "retentionPercent";
/// Additional retention percentage input
pub const ADDITIONAL_RETENTION: &str = "additionalRetentionPercent";
/// Derived total retention percentage
pub const TOTAL_RETENTION: &str = "totalRetentionPercent";

/// Whether changing `field` on `kind` requires recomputing derived fields
#[inline]
#[must_use]
pub fn is_derivation_input(kind: RecordKind, field: &str) -> bool {
    kind == RecordKind::Details && (field == RETENTION || field == ADDITIONAL_RETENTION)
}

/// Recompute every derived field of a record
pub fn recompute(kind: RecordKind, record: &mut FormRecord) {
    if kind == RecordKind::Details {
        let total = total_retention(record.get(RETENTION), record.get(ADDITIONAL_RETENTION));
        record.set(TOTAL_RETENTION, total);
    }
}

/// Sum of the two retention inputs, rounded to two decimals
///
/// Both inputs empty (or neither numeric) clears the total instead of
/// producing `0.00`. A non-numeric input counts as zero when the other one
/// is numeric.
#[must_use]
pub fn total_retention(retention: &FieldValue, additional: &FieldValue) -> FieldValue {
    match (retention.as_f64(), additional.as_f64()) {
        (None, None) => FieldValue::Empty,
        (a, b) => {
            let sum = a.unwrap_or(0.0) + b.unwrap_or(0.0);
            FieldValue::Text(format!("{:.2}", (sum * 100.0).round() / 100.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_empty_clears_total() {
        assert_eq!(
            total_retention(&FieldValue::Empty, &FieldValue::text("")),
            FieldValue::Empty
        );
    }

    #[test]
    fn sums_and_rounds() {
        assert_eq!(
            total_retention(&FieldValue::text("5"), &FieldValue::text("2.5")),
            FieldValue::text("7.50")
        );
        assert_eq!(
            total_retention(&FieldValue::text("1.005"), &FieldValue::Empty),
            FieldValue::text("1.00")
        );
        assert_eq!(
            total_retention(&FieldValue::Empty, &FieldValue::text("10")),
            FieldValue::text("10.00")
        );
    }

    #[test]
    fn recompute_only_touches_details() {
        let mut record = FormRecord::new().with(RETENTION, "3").with(ADDITIONAL_RETENTION, "4");
        recompute(RecordKind::Fee, &mut record);
        assert!(!record.contains(TOTAL_RETENTION));
        recompute(RecordKind::Details, &mut record);
        assert_eq!(record.text(TOTAL_RETENTION), "7.00");
    }
}
