//! Change detection between current and last-persisted form data
//!
//! Comparison is shallow and field-by-field. Empty, blank and absent values
//! are all equal, and numeric fields compare by value so `"5"` and `"5.0"`
//! do not register as an edit.

use crate::tables::mapping;
use bpa_model::{AccountSet, AccountSlot, FieldValue, FormRecord, RecordKind};
use std::collections::HashSet;

/// Whether two values of one field are equal for change detection
#[must_use]
pub fn field_equivalent(kind: RecordKind, field: &str, a: &FieldValue, b: &FieldValue) -> bool {
    let numeric = mapping(kind, field).is_some_and(|m| m.coercion.is_numeric());
    if numeric {
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            return (x - y).abs() < f64::EPSILON * x.abs().max(y.abs()).max(1.0);
        }
    }
    a.equivalent(b)
}

/// Names of fields whose values differ
///
/// Considers the union of both records' fields, in `current`'s order first.
#[must_use]
pub fn changed_fields(kind: RecordKind, current: &FormRecord, persisted: &FormRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    current
        .keys()
        .chain(persisted.keys())
        .filter(|field| seen.insert(*field))
        .filter(|field| !field_equivalent(kind, field, current.get(field), persisted.get(field)))
        .map(str::to_string)
        .collect()
}

/// Whether any field differs
#[must_use]
pub fn records_differ(kind: RecordKind, current: &FormRecord, persisted: &FormRecord) -> bool {
    !changed_fields(kind, current, persisted).is_empty()
}

/// Account slots whose row differs from the persisted snapshot
#[must_use]
pub fn changed_slots(current: &AccountSet, persisted: &AccountSet) -> Vec<AccountSlot> {
    AccountSlot::ALL
        .into_iter()
        .filter(|slot| records_differ(RecordKind::Account, current.get(*slot), persisted.get(*slot)))
        .collect()
}

/// Indices of rows that need a write
///
/// A row needs a write when it has no id yet, or when the persisted row with
/// the same id differs.
#[must_use]
pub fn changed_rows(kind: RecordKind, current: &[FormRecord], persisted: &[FormRecord]) -> Vec<usize> {
    current
        .iter()
        .enumerate()
        .filter(|(_, row)| match row.id() {
            None => !row.is_blank(),
            Some(id) => persisted
                .iter()
                .find(|p| p.id() == Some(id))
                .map_or(true, |p| records_differ(kind, row, p)),
        })
        .map(|(i, _)| i)
        .collect()
}

/// Ids present in the persisted snapshot but no longer in the current rows
#[must_use]
pub fn removed_ids(current: &[FormRecord], persisted: &[FormRecord]) -> Vec<i64> {
    let live: HashSet<i64> = current.iter().filter_map(FormRecord::id).collect();
    persisted
        .iter()
        .filter_map(FormRecord::id)
        .filter(|id| !live.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn account(number: &str) -> FormRecord {
        FormRecord::new()
            .with("id", FieldValue::Id(1))
            .with("accountNumber", number)
    }

    #[test]
    fn empty_forms_are_equivalent() {
        let a = FormRecord::new().with("ibanNumber", "");
        let b = FormRecord::new().with("ibanNumber", FieldValue::Empty);
        let c = FormRecord::new();
        assert!(!records_differ(RecordKind::Account, &a, &b));
        assert!(!records_differ(RecordKind::Account, &a, &c));
    }

    #[test]
    fn numeric_fields_compare_by_value() {
        let a = FormRecord::new().with("amount", "5");
        let b = FormRecord::new().with("amount", "5.00");
        assert!(!records_differ(RecordKind::Fee, &a, &b));
        let c = FormRecord::new().with("amount", "5.01");
        assert_eq!(changed_fields(RecordKind::Fee, &a, &c), ["amount"]);
    }

    #[test]
    fn text_fields_compare_literally() {
        let a = FormRecord::new().with("accountNumber", "007");
        let b = FormRecord::new().with("accountNumber", "7");
        assert!(records_differ(RecordKind::Account, &a, &b));
    }

    #[test]
    fn one_slot_edit_yields_one_slot() {
        let mut persisted = AccountSet::empty();
        persisted.set(AccountSlot::Trust, account("T-1"));
        persisted.set(AccountSlot::Retention, account("R-1"));
        let mut current = persisted.clone();
        current.get_mut(AccountSlot::Retention).set("accountNumber", "R-2");
        assert_eq!(changed_slots(&current, &persisted), [AccountSlot::Retention]);
        assert!(changed_slots(&persisted, &persisted).is_empty());
    }

    #[test]
    fn new_and_edited_rows_need_writes() {
        let persisted = vec![
            FormRecord::new().with("id", FieldValue::Id(1)).with("reabName", "A"),
            FormRecord::new().with("id", FieldValue::Id(2)).with("beneficiaryName", "B"),
        ];
        let mut current = persisted.clone();
        current[1].set("beneficiaryName", "B2");
        current.push(FormRecord::new().with("beneficiaryName", "C"));
        current.push(FormRecord::new());
        assert_eq!(changed_rows(RecordKind::Beneficiary, &current, &persisted), [1, 2]);
    }

    #[test]
    fn removed_rows_are_reported() {
        let persisted = vec![
            FormRecord::new().with("id", FieldValue::Id(1)),
            FormRecord::new().with("id", FieldValue::Id(2)),
        ];
        let current = vec![persisted[1].clone()];
        assert_eq!(removed_ids(&current, &persisted), [1]);
    }
}
