//! BPA Model - shared vocabulary for the asset registration stepper
//!
//! Defines the types every other crate in the workspace speaks:
//! - Wizard steps, modes and backing record kinds
//! - Flat form values and records (the editable "form shape")
//! - The four canonical account slots
//! - The in-memory [`AssetDraft`] aggregate
//!
//! # Example
//!
//! ```rust
//! use bpa_model::{FieldValue, FormRecord, StepKind};
//!
//! let record = FormRecord::new()
//!     .with("assetName", FieldValue::text("Marina Heights"))
//!     .with("retentionPercent", FieldValue::text("5"));
//!
//! assert_eq!(record.get("assetName").display(), "Marina Heights");
//! assert_eq!(StepKind::Accounts.next(), Some(StepKind::Fees));
//! ```

#![warn(unreachable_pub)]

pub mod account;
pub mod draft;
pub mod error;
pub mod step;
pub mod value;

pub use account::{AccountSet, AccountSlot};
pub use draft::{AssetDraft, BreakdownRow, FinancialSummaryForm, UnitDraft, BREAKDOWN_ROWS};
pub use error::ModelError;
pub use step::{RecordKind, SessionId, StepKind, WizardMode};
pub use value::{FieldValue, FormRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
