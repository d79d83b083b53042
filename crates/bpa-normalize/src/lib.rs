//! BPA Normalize - wire/form conversion for the asset registration stepper
//!
//! Every step's data crosses two shapes:
//! - **Wire shape**: nested DTOs, numeric ids, irregular field names
//! - **Form shape**: flat [`FormRecord`](bpa_model::FormRecord)s the wizard edits
//!
//! Per-kind behavior is declared in static [`tables`] of [`FieldMapping`]s and
//! executed by one generic [`Normalizer`]. The crate also owns the derived
//! retention total, account-type canonicalization, installment numbering,
//! the 24-row financial breakdown and change detection.
//!
//! # Example
//!
//! ```rust
//! use bpa_model::RecordKind;
//! use bpa_normalize::Normalizer;
//! use serde_json::json;
//!
//! let normalizer = Normalizer::utc();
//! let wire = json!({"id": 3, "debitAmount": "0150", "feeCategoryDTO": {"id": 9}});
//! let form = normalizer.to_form(RecordKind::Fee, &wire).unwrap();
//!
//! assert_eq!(form.text("amount"), "150");
//! assert_eq!(form.text("feeCategoryId"), "9");
//! ```

#![warn(unreachable_pub)]

pub mod accounts;
pub mod breakdown;
pub mod dates;
pub mod derived;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod installments;
pub mod mapping;
pub mod normalizer;
pub mod tables;

pub use accounts::canonical_slot;
pub use breakdown::{BreakdownSpec, BREAKDOWN};
pub use diff::{changed_fields, changed_rows, changed_slots, records_differ, removed_ids};
pub use error::NormalizeError;
pub use mapping::{Coercion, FieldDefault, FieldMapping, LabelRef, Requirement};
pub use normalizer::Normalizer;
pub use tables::{mapping, mappings, parent_field};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
