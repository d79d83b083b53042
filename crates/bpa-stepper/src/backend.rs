//! Collaborator interfaces
//!
//! The stepper never builds requests or renders anything itself. Backend
//! access, workflow submission, address updates, labels, the local draft
//! cache and externally rendered steps all arrive through these traits.

use crate::error::{BackendError, StepperError};
use crate::location::WizardLocation;
use bpa_model::{RecordKind, StepKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// CRUD operations for one record kind
#[async_trait::async_trait]
pub trait RecordService: Send + Sync {
    /// Fetch one record
    async fn get(&self, id: i64) -> Result<Value, BackendError>;

    /// Fetch the records owned by a parent (array or `{content: [...]}`)
    async fn list(&self, parent_id: i64) -> Result<Value, BackendError>;

    /// Create a record, returning the stored record
    async fn create(&self, payload: Value) -> Result<Value, BackendError>;

    /// Replace a record, returning the stored record
    async fn update(&self, id: i64, payload: Value) -> Result<Value, BackendError>;

    /// Mark a record deleted
    async fn soft_delete(&self, id: i64) -> Result<(), BackendError>;
}

/// Terminal workflow-request collaborator
#[async_trait::async_trait]
pub trait WorkflowSubmitter: Send + Sync {
    /// Forward the details payload for approval
    async fn submit(&self, details: Value) -> Result<(), BackendError>;
}

/// Receives committed navigation
pub trait LocationSink: Send + Sync {
    /// Record a new wizard location
    fn push(&self, location: &WizardLocation);

    /// Leave the wizard entirely
    fn leave_wizard(&self);
}

/// Resolves display labels
pub trait LabelResolver: Send + Sync {
    /// Label for `config_id` in `language`, or `fallback`
    fn get_label(&self, config_id: &str, language: &str, fallback: &str) -> String;
}

/// Label resolver that always answers with the fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackLabels;

impl LabelResolver for FallbackLabels {
    fn get_label(&self, _config_id: &str, _language: &str, fallback: &str) -> String {
        fallback.to_string()
    }
}

/// Local draft cache
pub trait DraftStore: Send + Sync {
    /// Remove any cached draft under `key`
    fn clear(&self, key: &str);
}

/// Renderer for steps the stepper does not own (documents, review)
pub trait ExternalStepView: Send + Sync {
    /// Show `step` for the given asset
    fn show(&self, step: StepKind, asset_id: Option<i64>);
}

/// Record services keyed by kind
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<RecordKind, Arc<dyn RecordService>>,
}

impl ServiceRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, kind: RecordKind, service: Arc<dyn RecordService>) -> Self {
        self.register(kind, service);
        self
    }

    /// Register or replace the service for a kind
    pub fn register(&mut self, kind: RecordKind, service: Arc<dyn RecordService>) {
        self.services.insert(kind, service);
    }

    /// Service for a kind
    ///
    /// # Errors
    /// `StepperError::MissingService` if none is registered
    pub fn get(&self, kind: RecordKind) -> Result<Arc<dyn RecordService>, StepperError> {
        self.services
            .get(&kind)
            .cloned()
            .ok_or(StepperError::MissingService(kind))
    }

    /// Whether a service is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: RecordKind) -> bool {
        self.services.contains_key(&kind)
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("kinds", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything a navigator needs from its surroundings
#[derive(Clone)]
pub struct Collaborators {
    /// Backend services per record kind
    pub services: ServiceRegistry,
    /// Terminal submission
    pub workflow: Arc<dyn WorkflowSubmitter>,
    /// Address updates
    pub location: Arc<dyn LocationSink>,
    /// Draft cache
    pub drafts: Arc<dyn DraftStore>,
    /// Label lookup
    pub labels: Arc<dyn LabelResolver>,
    /// Renderer for documents and review
    pub external: Option<Arc<dyn ExternalStepView>>,
}

impl Collaborators {
    /// Collaborators with fallback labels and no external view
    #[must_use]
    pub fn new(
        services: ServiceRegistry,
        workflow: Arc<dyn WorkflowSubmitter>,
        location: Arc<dyn LocationSink>,
        drafts: Arc<dyn DraftStore>,
    ) -> Self {
        Self {
            services,
            workflow,
            location,
            drafts,
            labels: Arc::new(FallbackLabels),
            external: None,
        }
    }

    /// Set label resolver
    #[must_use]
    pub fn with_labels(mut self, labels: Arc<dyn LabelResolver>) -> Self {
        self.labels = labels;
        self
    }

    /// Set external step renderer
    #[must_use]
    pub fn with_external_view(mut self, view: Arc<dyn ExternalStepView>) -> Self {
        self.external = Some(view);
        self
    }
}

/// Server id of a stored record
///
/// Accepts numeric ids and digit strings.
#[must_use]
pub fn response_id(record: &Value) -> Option<i64> {
    match record.get(bpa_model::value::ID_FIELD)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
