//! Testing utilities for the BPA stepper workspace
//!
//! In-memory record services, recording collaborators, wire fixtures and a
//! harness wiring them into a navigator.

#![allow(missing_docs)]

use async_trait::async_trait;
use bpa_model::{FieldValue, FormRecord, RecordKind, StepKind, UnitDraft};
use bpa_stepper::{
    BackendError, Collaborators, DraftStore, ExternalStepView, LocationSink, RecordService,
    ServiceRegistry, StepNavigator, StepperConfig, WizardLocation, WorkflowSubmitter,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backend operation, used to script failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    List,
    Create,
    Update,
    SoftDelete,
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(i64),
    List(i64),
    Create(Value),
    Update(i64, Value),
    SoftDelete(i64),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Get(_) => Op::Get,
            Call::List(_) => Op::List,
            Call::Create(_) => Op::Create,
            Call::Update(..) => Op::Update,
            Call::SoftDelete(_) => Op::SoftDelete,
        }
    }

    /// Payload of a write
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Call::Create(payload) | Call::Update(_, payload) => Some(payload),
            _ => None,
        }
    }
}

/// Record service backed by a map, recording every call
#[derive(Debug)]
pub struct InMemoryRecordService {
    next_id: AtomicI64,
    records: Mutex<BTreeMap<i64, Value>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, BackendError>>,
    paged: bool,
    delay: Option<Duration>,
}

impl Default for InMemoryRecordService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordService {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Service whose first created record gets `first_id`
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            next_id: AtomicI64::new(first_id),
            records: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            paged: false,
            delay: None,
        }
    }

    /// Answer `list` with a `{content: [...]}` page
    pub fn paged(mut self) -> Self {
        self.paged = true;
        self
    }

    /// Sleep before answering writes
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Store a record under its own `id`
    pub fn seed(&self, record: Value) -> i64 {
        let id = record
            .get("id")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut record = record;
        record["id"] = json!(id);
        self.records.lock().insert(id, record);
        id
    }

    /// Fail every call of `op` until cleared
    pub fn fail(&self, op: Op, error: BackendError) {
        self.failures.lock().insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op() == op).collect()
    }

    /// Number of create, update and delete calls
    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| !matches!(c.op(), Op::Get | Op::List)).count()
    }

    pub fn record(&self, id: i64) -> Option<Value> {
        self.records.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn begin(&self, call: Call) -> Result<(), BackendError> {
        let op = call.op();
        self.calls.lock().push(call);
        match self.failures.lock().get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RecordService for InMemoryRecordService {
    async fn get(&self, id: i64) -> Result<Value, BackendError> {
        self.begin(Call::Get(id))?;
        self.record(id).ok_or(BackendError::NotFound(id))
    }

    async fn list(&self, parent_id: i64) -> Result<Value, BackendError> {
        self.begin(Call::List(parent_id))?;
        let rows: Vec<Value> = self.records.lock().values().cloned().collect();
        Ok(if self.paged {
            json!({"content": rows, "totalElements": rows.len()})
        } else {
            Value::Array(rows)
        })
    }

    async fn create(&self, payload: Value) -> Result<Value, BackendError> {
        self.begin(Call::Create(payload.clone()))?;
        self.pause().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = payload;
        stored["id"] = json!(id);
        self.records.lock().insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: i64, payload: Value) -> Result<Value, BackendError> {
        self.begin(Call::Update(id, payload.clone()))?;
        self.pause().await;
        let mut records = self.records.lock();
        if !records.contains_key(&id) {
            return Err(BackendError::NotFound(id));
        }
        let mut stored = payload;
        stored["id"] = json!(id);
        records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn soft_delete(&self, id: i64) -> Result<(), BackendError> {
        self.begin(Call::SoftDelete(id))?;
        self.records
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(BackendError::NotFound(id))
    }
}

/// Location sink remembering every push
#[derive(Debug, Default)]
pub struct RecordingLocation {
    pushes: Mutex<Vec<WizardLocation>>,
    left: AtomicBool,
}

impl RecordingLocation {
    pub fn pushes(&self) -> Vec<WizardLocation> {
        self.pushes.lock().clone()
    }

    pub fn last(&self) -> Option<WizardLocation> {
        self.pushes.lock().last().copied()
    }

    pub fn has_left(&self) -> bool {
        self.left.load(Ordering::SeqCst)
    }
}

impl LocationSink for RecordingLocation {
    fn push(&self, location: &WizardLocation) {
        self.pushes.lock().push(*location);
    }

    fn leave_wizard(&self) {
        self.left.store(true, Ordering::SeqCst);
    }
}

/// Draft cache held in memory
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: Mutex<HashMap<String, String>>,
    cleared: Mutex<Vec<String>>,
}

impl MemoryDraftStore {
    pub fn put(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Keys passed to `clear`, in order
    pub fn cleared(&self) -> Vec<String> {
        self.cleared.lock().clone()
    }
}

impl DraftStore for MemoryDraftStore {
    fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
        self.cleared.lock().push(key.to_string());
    }
}

/// External view remembering what it was asked to show
#[derive(Debug, Default)]
pub struct RecordingExternalView {
    shown: Mutex<Vec<(StepKind, Option<i64>)>>,
}

impl RecordingExternalView {
    pub fn shown(&self) -> Vec<(StepKind, Option<i64>)> {
        self.shown.lock().clone()
    }
}

impl ExternalStepView for RecordingExternalView {
    fn show(&self, step: StepKind, asset_id: Option<i64>) {
        self.shown.lock().push((step, asset_id));
    }
}

/// Workflow that accepts everything and keeps the payloads
#[derive(Debug, Default)]
pub struct AcceptingWorkflow {
    submitted: Mutex<Vec<Value>>,
}

impl AcceptingWorkflow {
    pub fn submitted(&self) -> Vec<Value> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl WorkflowSubmitter for AcceptingWorkflow {
    async fn submit(&self, details: Value) -> Result<(), BackendError> {
        self.submitted.lock().push(details);
        Ok(())
    }
}

/// Record kinds that have their own step or unit service
pub const SERVICE_KINDS: [RecordKind; 10] = [
    RecordKind::Details,
    RecordKind::Account,
    RecordKind::Fee,
    RecordKind::Beneficiary,
    RecordKind::PaymentPlan,
    RecordKind::FinancialSummary,
    RecordKind::Closure,
    RecordKind::Unit,
    RecordKind::Booking,
    RecordKind::Purchase,
];

/// Every collaborator of a navigator, all in memory
pub struct Harness {
    pub services: HashMap<RecordKind, Arc<InMemoryRecordService>>,
    pub location: Arc<RecordingLocation>,
    pub drafts: Arc<MemoryDraftStore>,
    pub external: Arc<RecordingExternalView>,
    pub workflow: Arc<dyn WorkflowSubmitter>,
    pub config: StepperConfig,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness whose services hand out distinct id ranges per kind
    pub fn new() -> Self {
        let services = SERVICE_KINDS
            .into_iter()
            .enumerate()
            .map(|(i, kind)| {
                let first_id = (i as i64 + 1) * 100;
                (kind, Arc::new(InMemoryRecordService::starting_at(first_id)))
            })
            .collect();
        Self {
            services,
            location: Arc::new(RecordingLocation::default()),
            drafts: Arc::new(MemoryDraftStore::default()),
            external: Arc::new(RecordingExternalView::default()),
            workflow: Arc::new(AcceptingWorkflow::default()),
            config: StepperConfig::default(),
        }
    }

    pub fn with_workflow(mut self, workflow: Arc<dyn WorkflowSubmitter>) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_service(mut self, kind: RecordKind, service: InMemoryRecordService) -> Self {
        self.services.insert(kind, Arc::new(service));
        self
    }

    pub fn service(&self, kind: RecordKind) -> Arc<InMemoryRecordService> {
        self.services[&kind].clone()
    }

    pub fn registry(&self) -> ServiceRegistry {
        self.services
            .iter()
            .fold(ServiceRegistry::new(), |registry, (kind, service)| {
                registry.with(*kind, service.clone())
            })
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.registry(),
            self.workflow.clone(),
            self.location.clone(),
            self.drafts.clone(),
        )
        .with_external_view(self.external.clone())
    }

    pub fn navigator(&self, start: WizardLocation) -> StepNavigator {
        StepNavigator::new(self.config.clone(), self.collaborators(), start)
            .expect("default config is valid")
    }

    /// Total writes across every service
    pub fn write_count(&self) -> usize {
        self.services.values().map(|s| s.write_count()).sum()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Details form with every unconditionally required field filled
pub fn complete_details() -> FormRecord {
    FormRecord::new()
        .with("buildPartnerId", FieldValue::Id(11))
        .with("projectReference", "REA-001")
        .with("assetName", "Marina Heights")
        .with("registrationNumber", "RERA-7781")
        .with("propertyId", FieldValue::Id(1))
        .with("startDate", date(2024, 1, 15))
        .with("completionDate", date(2026, 6, 30))
        .with("retentionPercent", "5")
        .with("additionalRetentionPercent", "2.5")
}

/// Account row that passes the mandatory checks
pub fn complete_account(number: &str) -> FormRecord {
    FormRecord::new()
        .with("accountNumber", number)
        .with("currencyCode", "AED")
        .with("ibanNumber", format!("AE07{number}"))
}

pub fn installment(percentage: &str, completion: &str) -> FormRecord {
    FormRecord::new()
        .with("installmentPercentage", percentage)
        .with("projectCompletionPercentage", completion)
}

/// Wire details as the backend returns them
pub fn details_wire(id: i64) -> Value {
    json!({
        "id": id,
        "buildPartnerDTO": {"id": 11, "bpName": "Emaar", "bpCifrera": "CIF-1"},
        "reaId": "REA-001",
        "reaName": "Marina Heights",
        "reaReraNumber": "RERA-7781",
        "reaPropertyIdDTO": {"id": 1},
        "reaStartDate": "2024-01-15T00:00:00.000Z",
        "reaCompletionDate": "2026-06-30",
        "reaRetentionPercent": 5,
        "reaAdditionalRetentionPercent": "2.50",
        "reaSpecialApproval": null
    })
}

/// Wire account with a raw type string
pub fn account_wire(id: i64, account_type: &str, number: &str) -> Value {
    json!({
        "id": id,
        "accountType": account_type,
        "accountNumber": number,
        "currencyCode": "AED",
        "realEstateAssetDTO": {"id": 1}
    })
}

pub fn unit_draft(with_booking: bool, with_purchase: bool) -> UnitDraft {
    UnitDraft {
        unit: FormRecord::new().with("unitRefId", "U-101").with("floor", "10"),
        booking: with_booking.then(|| FormRecord::new().with("bookingAmount", "25000")),
        purchase: with_purchase.then(|| FormRecord::new().with("purchasePrice", "1200000")),
    }
}

/// `unitDTO.id` of a booking or purchase payload
pub fn unit_ref(payload: &Value) -> Option<i64> {
    payload.pointer("/unitDTO/id").and_then(Value::as_i64)
}
