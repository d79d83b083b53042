//! Canonical account slots
//!
//! Every asset carries exactly four bank accounts. Rows are addressed by slot,
//! never by position in a wire array.

use crate::value::{FieldValue, FormRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Form field holding the canonical account type
pub const ACCOUNT_TYPE_FIELD: &str = "accountType";

/// The four fixed account categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountSlot {
    /// Trust (escrow) account
    Trust,
    /// Retention account
    Retention,
    /// Sub-construction account
    #[serde(rename = "SUBCONSTRUCTION")]
    SubConstruction,
    /// Corporate account
    Corporate,
}

impl AccountSlot {
    /// All slots in display order
    pub const ALL: [AccountSlot; 4] = [
        AccountSlot::Trust,
        AccountSlot::Retention,
        AccountSlot::SubConstruction,
        AccountSlot::Corporate,
    ];

    /// Position within an [`AccountSet`]
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountSlot::Trust => "TRUST",
            AccountSlot::Retention => "RETENTION",
            AccountSlot::SubConstruction => "SUBCONSTRUCTION",
            AccountSlot::Corporate => "CORPORATE",
        }
    }

    /// Whether the slot must be filled before the accounts step can advance
    #[inline]
    #[must_use]
    pub fn is_mandatory(self) -> bool {
        matches!(self, AccountSlot::Trust | AccountSlot::Retention)
    }
}

impl fmt::Display for AccountSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly four account rows, one per canonical slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSet {
    rows: [FormRecord; 4],
}

impl AccountSet {
    /// Four empty rows, each tagged with its slot
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rows: AccountSlot::ALL.map(Self::blank_row),
        }
    }

    /// Empty row for a slot
    #[must_use]
    pub fn blank_row(slot: AccountSlot) -> FormRecord {
        FormRecord::new().with(ACCOUNT_TYPE_FIELD, FieldValue::text(slot.as_str()))
    }

    /// Row for a slot
    #[inline]
    #[must_use]
    pub fn get(&self, slot: AccountSlot) -> &FormRecord {
        &self.rows[slot.index()]
    }

    /// Mutable row for a slot
    #[inline]
    pub fn get_mut(&mut self, slot: AccountSlot) -> &mut FormRecord {
        &mut self.rows[slot.index()]
    }

    /// Replace a slot's row; the account type is forced to the slot
    pub fn set(&mut self, slot: AccountSlot, mut row: FormRecord) {
        row.set(ACCOUNT_TYPE_FIELD, FieldValue::text(slot.as_str()));
        self.rows[slot.index()] = row;
    }

    /// Iterate `(slot, row)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (AccountSlot, &FormRecord)> {
        AccountSlot::ALL.into_iter().zip(self.rows.iter())
    }

    /// Slots whose row carries a server id
    pub fn persisted_slots(&self) -> impl Iterator<Item = AccountSlot> + '_ {
        self.iter()
            .filter(|(_, row)| row.id().is_some())
            .map(|(slot, _)| slot)
    }
}

impl Default for AccountSet {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_four_tagged_rows() {
        let set = AccountSet::empty();
        let types: Vec<String> = set.iter().map(|(_, r)| r.text(ACCOUNT_TYPE_FIELD)).collect();
        assert_eq!(types, ["TRUST", "RETENTION", "SUBCONSTRUCTION", "CORPORATE"]);
    }

    #[test]
    fn set_forces_slot_type() {
        let mut set = AccountSet::empty();
        set.set(
            AccountSlot::Corporate,
            FormRecord::new().with(ACCOUNT_TYPE_FIELD, "TRUST").with("accountNumber", "9"),
        );
        assert_eq!(set.get(AccountSlot::Corporate).text(ACCOUNT_TYPE_FIELD), "CORPORATE");
        assert_eq!(set.get(AccountSlot::Trust).text("accountNumber"), "");
    }

    #[test]
    fn mandatory_slots() {
        let mandatory: Vec<_> = AccountSlot::ALL.into_iter().filter(|s| s.is_mandatory()).collect();
        assert_eq!(mandatory, [AccountSlot::Trust, AccountSlot::Retention]);
    }
}
