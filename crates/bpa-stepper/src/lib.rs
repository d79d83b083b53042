//! BPA Stepper - step orchestration for asset registration
//!
//! Drives the nine-step registration wizard:
//! - Tracks the active step and mode, publishing every committed move
//! - Validates each step before it is saved
//! - Saves only what changed, parents before children
//! - Loads and normalizes each step's data on arrival
//! - Keeps transient success and error notices
//!
//! Backends, labels, address updates and external renderers are supplied
//! through the traits in [`backend`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bpa_stepper::prelude::*;
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), StepperError> {
//! let start = WizardLocation::from_query("step=1&mode=create")?;
//! let mut wizard = StepNavigator::new(StepperConfig::default(), collaborators, start)?;
//! wizard.start().await?;
//!
//! wizard.set_field("projectName", "Marina Heights")?;
//! wizard.next().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod loader;
pub mod location;
pub mod navigator;
pub mod notify;
pub mod save;
pub mod validation;

pub use backend::{
    response_id, Collaborators, DraftStore, ExternalStepView, FallbackLabels, LabelResolver,
    LocationSink, RecordService, ServiceRegistry, WorkflowSubmitter,
};
pub use config::{ConfigError, StepperConfig};
pub use context::{OpenEdit, SharedContext, WizardContext};
pub use error::{BackendError, FieldErrors, StepperError};
pub use loader::{LoadOutcome, StepLoader};
pub use location::{LocationError, WizardLocation};
pub use navigator::{StepNavigator, NO_CHANGES_NOTICE};
pub use notify::{Notice, NoticeKind, Notifier};
pub use save::{decide, SaveOrchestrator, SaveOutcome, UnitSaveReport, WriteAction};
pub use validation::{skips_validation, ValidationGate, SKIP_VALIDATION_STEPS};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the wizard
    pub use crate::{
        Collaborators, RecordService, ServiceRegistry, StepNavigator, StepperConfig, StepperError,
        WizardLocation,
    };
    pub use bpa_model::{AccountSlot, FieldValue, FormRecord, RecordKind, StepKind, WizardMode};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
