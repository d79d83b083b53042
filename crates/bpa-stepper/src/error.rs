//! Error types for the stepper
//!
//! [`StepperError`] covers everything that can stop a transition:
//! - Field validation (shown inline, never as a banner)
//! - Uncommitted inline edits on the payment plan
//! - Primary backend failures for the active step
//! - Workflow submission and missing-details failures at the terminal step
//!
//! Failures of dependent unit sub-records are deliberately absent; they are
//! reported as warnings by [`crate::save::UnitSaveReport`].

use crate::config::ConfigError;
use crate::location::LocationError;
use bpa_model::{AccountSlot, ModelError, RecordKind, StepKind};
use bpa_normalize::NormalizeError;
use indexmap::IndexMap;

/// Field-level messages keyed by field path
pub type FieldErrors = IndexMap<String, String>;

/// Errors reported by backend collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Server answered with a failure status
    #[error("request failed with status {status}: {message}")]
    Status {
        /// HTTP-style status code
        status: u16,
        /// Server message
        message: String,
    },

    /// Request never completed
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be used
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Record does not exist
    #[error("record {0} not found")]
    NotFound(i64),
}

impl BackendError {
    /// Check if the same request may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::MalformedResponse(_) | Self::NotFound(_) => false,
        }
    }
}

/// Main stepper error type
#[derive(Debug, thiserror::Error)]
pub enum StepperError {
    /// Required fields missing or malformed
    #[error("{step} has {} invalid field(s)", errors.len())]
    Validation {
        /// Step that failed
        step: StepKind,
        /// Messages per field path
        errors: FieldErrors,
    },

    /// Payment plan row still open for inline editing
    #[error("installment row {} has unsaved changes; save or cancel it first", row + 1)]
    UncommittedEdit {
        /// Zero-based row index
        row: usize,
    },

    /// Create/update of the step's main record failed
    #[error("saving {step} failed: {source}")]
    Network {
        /// Step being saved or loaded
        step: StepKind,
        /// Backend failure
        source: BackendError,
    },

    /// Unit create/update failed; dependents were not attempted
    #[error("saving unit failed: {0}")]
    UnitSave(#[source] BackendError),

    /// Terminal workflow request failed
    #[error("workflow submission failed: {0}")]
    WorkflowSubmission(#[source] BackendError),

    /// Accounts save attempted with no validated rows
    #[error("no validated accounts to save")]
    NoValidatedAccounts,

    /// Account slots edited but not validated; nothing was sent
    #[error("accounts changed but not validated: {}", slot_list(.0))]
    UnvalidatedAccounts(Vec<AccountSlot>),

    /// Submit attempted before the details record exists
    #[error("asset details have not been saved")]
    DetailsNotPersisted,

    /// Child step saved before its parent asset exists
    #[error("{step} cannot be saved before the asset details")]
    MissingParentRecord {
        /// Child step
        step: StepKind,
    },

    /// Transition not allowed from the current state
    #[error("cannot {action} from {step}")]
    InvalidTransition {
        /// Attempted action
        action: &'static str,
        /// Active step
        step: StepKind,
    },

    /// Row index past the end of a collection
    #[error("{step} has no row {index}")]
    RowOutOfRange {
        /// Step owning the collection
        step: StepKind,
        /// Requested index
        index: usize,
    },

    /// No backend collaborator for a record kind
    #[error("no record service registered for {0}")]
    MissingService(RecordKind),

    /// Wire payload could not be normalized
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed wizard location
    #[error(transparent)]
    Location(#[from] LocationError),

    /// Step index or identifier outside the model
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl StepperError {
    /// Check if retrying the same action may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source, .. }
            | Self::UnitSave(source)
            | Self::WorkflowSubmission(source) => source.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error is shown next to fields rather than as a banner
    #[inline]
    #[must_use]
    pub fn is_field_level(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if the error ends the current submission attempt
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DetailsNotPersisted | Self::WorkflowSubmission(_))
    }

    /// Field messages carried by a validation error
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

fn slot_list(slots: &[AccountSlot]) -> String {
    slots
        .iter()
        .map(|slot| slot.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_retry_classification() {
        assert!(BackendError::Transport("reset".into()).is_retryable());
        assert!(BackendError::Status {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
        assert!(!BackendError::Status {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!BackendError::NotFound(4).is_retryable());
    }

    #[test]
    fn stepper_error_display() {
        let err = StepperError::UncommittedEdit { row: 2 };
        assert_eq!(
            err.to_string(),
            "installment row 3 has unsaved changes; save or cancel it first"
        );

        let mut errors = FieldErrors::new();
        errors.insert("reaName".into(), "Project Name is required".into());
        let err = StepperError::Validation {
            step: StepKind::Details,
            errors,
        };
        assert_eq!(err.to_string(), "details has 1 invalid field(s)");
        assert!(err.is_field_level());
        assert_eq!(err.field_errors().map(IndexMap::len), Some(1));
    }

    #[test]
    fn network_errors_inherit_retryability() {
        let err = StepperError::Network {
            step: StepKind::Accounts,
            source: BackendError::Transport("timeout".into()),
        };
        assert!(err.is_retryable());
        assert!(!err.is_fatal());
        assert!(StepperError::DetailsNotPersisted.is_fatal());
        assert!(!StepperError::NoValidatedAccounts.is_retryable());
    }

    #[test]
    fn unvalidated_accounts_name_their_slots() {
        let err = StepperError::UnvalidatedAccounts(vec![AccountSlot::Retention, AccountSlot::Corporate]);
        assert_eq!(
            err.to_string(),
            "accounts changed but not validated: RETENTION, CORPORATE"
        );
        assert!(!err.is_field_level());
        assert!(!err.is_retryable());
    }
}
