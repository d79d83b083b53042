//! Payment plan installment numbering

use bpa_model::{FieldValue, FormRecord};

/// Form field carrying the 1-based installment number
pub const INSTALLMENT_NUMBER: &str = "installmentNumber";

/// Renumber rows to the contiguous sequence 1..=N in their current order
pub fn renumber(rows: &mut [FormRecord]) {
    for (i, row) in rows.iter_mut().enumerate() {
        row.set(INSTALLMENT_NUMBER, FieldValue::Text((i + 1).to_string()));
    }
}

/// Remove one row and renumber the remainder
///
/// Returns the removed row, or `None` if `index` is out of bounds.
pub fn remove_and_renumber(rows: &mut Vec<FormRecord>, index: usize) -> Option<FormRecord> {
    if index >= rows.len() {
        return None;
    }
    let removed = rows.remove(index);
    renumber(rows);
    Some(removed)
}

/// Next number for an appended row
#[inline]
#[must_use]
pub fn next_number(rows: &[FormRecord]) -> String {
    (rows.len() + 1).to_string()
}
