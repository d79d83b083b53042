//! Account-type canonicalization
//!
//! Wire account types come in many spellings ("TRUST ACCOUNT", "Trust",
//! "sub-construction", ...). Each resolves to exactly one [`AccountSlot`] or
//! to nothing; nothing is ever appended as a fifth slot.

use bpa_model::AccountSlot;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Recognized spellings, after whitespace collapsing and upper-casing
const VARIANTS: &[(&str, AccountSlot)] = &[
    ("TRUST", AccountSlot::Trust),
    ("TRUST ACCOUNT", AccountSlot::Trust),
    ("TRUST_ACCOUNT", AccountSlot::Trust),
    ("TRUST ACC", AccountSlot::Trust),
    ("ESCROW", AccountSlot::Trust),
    ("ESCROW ACCOUNT", AccountSlot::Trust),
    ("RETENTION", AccountSlot::Retention),
    ("RETENTION ACCOUNT", AccountSlot::Retention),
    ("RETENTION_ACCOUNT", AccountSlot::Retention),
    ("RETENTION ACC", AccountSlot::Retention),
    ("SUBCONSTRUCTION", AccountSlot::SubConstruction),
    ("SUB CONSTRUCTION", AccountSlot::SubConstruction),
    ("SUB-CONSTRUCTION", AccountSlot::SubConstruction),
    ("SUB_CONSTRUCTION", AccountSlot::SubConstruction),
    ("SUBCONSTRUCTION ACCOUNT", AccountSlot::SubConstruction),
    ("SUB CONSTRUCTION ACCOUNT", AccountSlot::SubConstruction),
    ("SUB-CONSTRUCTION ACCOUNT", AccountSlot::SubConstruction),
    ("SUB_CONSTRUCTION_ACCOUNT", AccountSlot::SubConstruction),
    ("CORPORATE", AccountSlot::Corporate),
    ("CORPORATE ACCOUNT", AccountSlot::Corporate),
    ("CORPORATE_ACCOUNT", AccountSlot::Corporate),
    ("CORPORATE ACC", AccountSlot::Corporate),
];

static TABLE: Lazy<HashMap<&'static str, AccountSlot>> =
    Lazy::new(|| VARIANTS.iter().copied().collect());

/// Resolve a wire account type to its canonical slot
///
/// Matching is case-insensitive and tolerant of leading, trailing and
/// repeated whitespace.
#[must_use]
pub fn canonical_slot(raw: &str) -> Option<AccountSlot> {
    let key = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    TABLE.get(key.as_str()).copied()
}

/// All recognized spellings with their slot
#[must_use]
pub fn known_variants() -> &'static [(&'static str, AccountSlot)] {
    VARIANTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_map_to_themselves() {
        for slot in AccountSlot::ALL {
            assert_eq!(canonical_slot(slot.as_str()), Some(slot));
        }
    }

    #[test]
    fn tolerates_case_and_spacing() {
        assert_eq!(canonical_slot("Trust"), Some(AccountSlot::Trust));
        assert_eq!(canonical_slot("  trust   account "), Some(AccountSlot::Trust));
        assert_eq!(canonical_slot("Sub Construction"), Some(AccountSlot::SubConstruction));
        assert_eq!(canonical_slot("corporate\taccount"), Some(AccountSlot::Corporate));
    }

    #[test]
    fn unknown_types_resolve_to_nothing() {
        assert_eq!(canonical_slot("SAVINGS"), None);
        assert_eq!(canonical_slot(""), None);
        assert_eq!(canonical_slot("TRUSTACCOUNT"), None);
    }

    #[test]
    fn every_variant_is_already_normalized() {
        for (variant, slot) in known_variants() {
            assert_eq!(canonical_slot(variant), Some(*slot), "{variant}");
        }
    }
}
