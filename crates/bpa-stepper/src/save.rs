//! Save orchestration
//!
//! Decides create vs. update per record, sequences parent-before-child
//! writes and sends only what changed. Each record kind has one async lock,
//! so a second save of the same step waits for the first to finish and then
//! sees its results.
//!
//! # Decision table
//!
//! | Existing id | Action |
//! |---|---|
//! | absent | create, then adopt the response id |
//! | present | update |
//!
//! The wizard mode does not change the decision; a create-mode session that
//! already saved its details updates them.

use crate::backend::{response_id, RecordService, ServiceRegistry};
use crate::context::SharedContext;
use crate::error::{BackendError, StepperError};
use bpa_model::{AccountSlot, FieldValue, FormRecord, RecordKind, StepKind, UnitDraft};
use bpa_normalize::installments::remove_and_renumber;
use bpa_normalize::tables::{ASSET_REF, UNIT_REF};
use bpa_normalize::{changed_rows, changed_slots, removed_ids, Normalizer};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Write chosen for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// POST a new record
    Create,
    /// PUT over an existing record
    Update(i64),
}

/// Choose create or update from the record's id
#[inline]
#[must_use]
pub fn decide(existing_id: Option<i64>) -> WriteAction {
    existing_id.map_or(WriteAction::Create, WriteAction::Update)
}

/// Result of saving a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A singleton record was created with this id
    Created(i64),
    /// A singleton record was updated
    Updated(i64),
    /// Rows of a collection were written
    Saved {
        /// Rows created
        created: usize,
        /// Rows updated
        updated: usize,
    },
    /// Nothing differed from the persisted snapshot; no request was sent
    NoChanges,
    /// The step has no step-level save
    Skipped,
}

/// Result of saving a unit and its dependents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSaveReport {
    /// Id of the created or updated unit
    pub unit_id: i64,
    /// Id of the saved booking, if one was sent and succeeded
    pub booking_id: Option<i64>,
    /// Id of the saved purchase, if one was sent and succeeded
    pub purchase_id: Option<i64>,
    /// Failures of dependent writes; never surfaced as errors
    pub warnings: Vec<String>,
}

/// Create/update dispatcher for every step
pub struct SaveOrchestrator {
    services: ServiceRegistry,
    normalizer: Normalizer,
    in_flight: DashMap<RecordKind, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for SaveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveOrchestrator")
            .field("services", &self.services)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl SaveOrchestrator {
    /// Orchestrator over a service registry
    #[must_use]
    pub fn new(services: ServiceRegistry, normalizer: Normalizer) -> Self {
        Self {
            services,
            normalizer,
            in_flight: DashMap::new(),
        }
    }

    /// Save the active step
    ///
    /// # Errors
    /// - `MissingParentRecord` for child steps before the details exist
    /// - `NoValidatedAccounts` for an accounts save with nothing validated
    /// - `UnvalidatedAccounts` when a changed account slot was not validated
    /// - `Network` when the backend rejects a write
    pub async fn save_step(&self, step: StepKind, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let Some(kind) = step.record_kind() else {
            return Ok(SaveOutcome::Skipped);
        };
        let lock = self.lock_for(kind);
        let _guard = lock.lock().await;

        match step {
            StepKind::Details => self.save_details(ctx).await,
            StepKind::Accounts => self.save_accounts(ctx).await,
            StepKind::PaymentPlan => self.save_payment_plan(ctx).await,
            StepKind::FinancialSummary => self.save_summary(ctx).await,
            StepKind::Closure => self.save_closure(ctx).await,
            StepKind::Documents | StepKind::Fees | StepKind::Beneficiaries | StepKind::Review => {
                debug!(step = %step, "no step-level save");
                Ok(SaveOutcome::Skipped)
            }
        }
    }

    /// Create or update one row of a collection immediately
    ///
    /// Returns the row's server id.
    ///
    /// # Errors
    /// `RowOutOfRange`, `MissingParentRecord` or `Network`
    pub async fn save_row(&self, step: StepKind, index: usize, ctx: &SharedContext) -> Result<i64, StepperError> {
        let kind = row_kind(step)?;
        let lock = self.lock_for(kind);
        let _guard = lock.lock().await;
        self.write_row(step, kind, index, ctx).await
    }

    /// Delete one row of a collection
    ///
    /// Persisted rows are soft-deleted through the backend first; the local
    /// row is removed only when that succeeds. Payment plan rows are
    /// renumbered afterwards.
    ///
    /// # Errors
    /// `RowOutOfRange` or `Network`
    pub async fn delete_row(
        &self,
        step: StepKind,
        index: usize,
        ctx: &SharedContext,
    ) -> Result<FormRecord, StepperError> {
        let kind = row_kind(step)?;
        let lock = self.lock_for(kind);
        let _guard = lock.lock().await;

        let id = {
            let c = ctx.read();
            c.draft
                .rows(kind)
                .and_then(|rows| rows.get(index))
                .map(FormRecord::id)
                .ok_or(StepperError::RowOutOfRange { step, index })?
        };

        if let Some(id) = id {
            let service = self.services.get(kind)?;
            service
                .soft_delete(id)
                .await
                .map_err(|source| network(step, source))?;
            info!(step = %step, id, "row deleted");
        }

        let mut c = ctx.write();
        let removed = if kind == RecordKind::PaymentPlan {
            if let Some(id) = id {
                c.persisted_payment_plan_retain(|row| row.id() != Some(id));
            }
            let removed = remove_and_renumber(&mut c.draft.payment_plan, index);
            if removed.is_some() {
                c.payment_row_removed(index);
            }
            removed
        } else {
            c.draft
                .rows_mut(kind)
                .filter(|rows| index < rows.len())
                .map(|rows| rows.remove(index))
        };
        removed.ok_or(StepperError::RowOutOfRange { step, index })
    }

    /// Commit a payment plan inline edit
    ///
    /// The context's in-flight guard is raised for the duration of the write
    /// so a concurrent reload cannot overwrite the row being committed.
    ///
    /// # Errors
    /// As [`save_row`](Self::save_row)
    pub async fn commit_inline_edit(&self, index: usize, ctx: &SharedContext) -> Result<i64, StepperError> {
        let in_flight = CommitInFlight::raise(ctx);
        let result = self.save_row(StepKind::PaymentPlan, index, ctx).await;
        drop(in_flight);

        if result.is_ok() {
            ctx.write().close_inline_edit();
        }
        result
    }

    /// Save a unit, then its booking and purchase
    ///
    /// The unit must succeed before any dependent is attempted. Dependent
    /// failures are logged and collected as warnings; they never fail the
    /// call.
    ///
    /// # Errors
    /// `UnitSave` when the unit itself cannot be written
    pub async fn save_unit(&self, unit: &UnitDraft, asset_id: i64) -> Result<UnitSaveReport, StepperError> {
        let lock = self.lock_for(RecordKind::Unit);
        let _guard = lock.lock().await;

        let mut record = unit.unit.clone();
        record.set(ASSET_REF, FieldValue::Id(asset_id));
        let payload = self.normalizer.to_wire(RecordKind::Unit, &record);
        let service = self.services.get(RecordKind::Unit)?;

        let response = dispatch(service.as_ref(), decide(record.id()), payload)
            .await
            .map_err(|e| {
                error!(error = %e, "unit save failed; skipping booking and purchase");
                StepperError::UnitSave(e)
            })?;
        let final_unit_id = response_id(&response)
            .or(record.id())
            .ok_or_else(|| StepperError::UnitSave(missing_id()))?;
        info!(unit_id = final_unit_id, "unit saved");

        let mut report = UnitSaveReport {
            unit_id: final_unit_id,
            ..UnitSaveReport::default()
        };

        if let Some(booking) = &unit.booking {
            match self.save_dependent(RecordKind::Booking, booking, final_unit_id).await {
                Ok(id) => report.booking_id = Some(id),
                Err(message) => report.warnings.push(message),
            }
        }
        if let Some(purchase) = &unit.purchase {
            match self.save_dependent(RecordKind::Purchase, purchase, final_unit_id).await {
                Ok(id) => report.purchase_id = Some(id),
                Err(message) => report.warnings.push(message),
            }
        }
        Ok(report)
    }

    async fn save_details(&self, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let (record, existing) = {
            let c = ctx.read();
            (c.draft.details.clone(), c.asset_id())
        };
        let id = self
            .write_record(StepKind::Details, RecordKind::Details, &record)
            .await?;
        ctx.write().draft.details.set_id(id);
        Ok(singleton_outcome(existing, id))
    }

    async fn save_accounts(&self, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let step = StepKind::Accounts;
        let asset_id = parent_id(ctx, step)?;
        let (current, persisted, validated) = {
            let c = ctx.read();
            (
                c.draft.accounts.clone(),
                c.persisted_accounts().clone(),
                c.validated_slots(),
            )
        };

        if validated.is_empty() {
            warn!("accounts save attempted with no validated rows");
            return Err(StepperError::NoValidatedAccounts);
        }

        let changed = changed_slots(&current, &persisted);
        let unvalidated: Vec<AccountSlot> = changed
            .iter()
            .copied()
            .filter(|slot| !validated.contains(slot))
            .collect();
        if !unvalidated.is_empty() {
            warn!(slots = ?unvalidated, "changed accounts are not validated");
            return Err(StepperError::UnvalidatedAccounts(unvalidated));
        }
        if changed.is_empty() {
            info!("accounts unchanged; nothing sent");
            return Ok(SaveOutcome::NoChanges);
        }

        let service = self.services.get(RecordKind::Account)?;
        let (mut created, mut updated) = (0, 0);
        for slot in changed {
            let mut row = current.get(slot).clone();
            row.set(ASSET_REF, FieldValue::Id(asset_id));
            let action = decide(row.id());
            let payload = self.normalizer.account_to_wire(slot, &row);
            let response = dispatch(service.as_ref(), action, payload)
                .await
                .map_err(|source| network(step, source))?;
            let id = adopt_id(&response, row.id()).map_err(|source| network(step, source))?;

            row.set_id(id);
            let mut c = ctx.write();
            c.draft.accounts.get_mut(slot).set_id(id);
            c.draft.accounts.get_mut(slot).set(ASSET_REF, FieldValue::Id(asset_id));
            c.record_saved_account(slot, row);
            match action {
                WriteAction::Create => created += 1,
                WriteAction::Update(_) => updated += 1,
            }
            debug!(slot = %slot, id, "account saved");
        }
        info!(created, updated, "accounts saved");
        Ok(SaveOutcome::Saved { created, updated })
    }

    async fn save_payment_plan(&self, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let step = StepKind::PaymentPlan;
        let kind = RecordKind::PaymentPlan;
        parent_id(ctx, step)?;
        let (current, persisted) = {
            let c = ctx.read();
            (c.draft.payment_plan.clone(), c.persisted_payment_plan().to_vec())
        };

        let service = self.services.get(kind)?;
        for id in removed_ids(&current, &persisted) {
            service
                .soft_delete(id)
                .await
                .map_err(|source| network(step, source))?;
            ctx.write().persisted_payment_plan_retain(|row| row.id() != Some(id));
            debug!(id, "installment soft-deleted");
        }

        let pending = changed_rows(kind, &current, &persisted);
        if pending.is_empty() {
            ctx.write().set_persisted_payment_plan(current);
            return Ok(SaveOutcome::NoChanges);
        }

        let (mut created, mut updated) = (0, 0);
        for index in pending {
            match decide(current[index].id()) {
                WriteAction::Create => created += 1,
                WriteAction::Update(_) => updated += 1,
            }
            self.write_row(step, kind, index, ctx).await?;
        }

        let mut c = ctx.write();
        let saved = c.draft.payment_plan.clone();
        c.set_persisted_payment_plan(saved);
        info!(created, updated, "payment plan saved");
        Ok(SaveOutcome::Saved { created, updated })
    }

    async fn save_summary(&self, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let step = StepKind::FinancialSummary;
        let asset_id = parent_id(ctx, step)?;
        let mut form = ctx.read().draft.financial_summary.clone();
        form.fields.set(ASSET_REF, FieldValue::Id(asset_id));
        let existing = form.fields.id();

        let payload = self.normalizer.summary_to_wire(&form);
        let service = self.services.get(RecordKind::FinancialSummary)?;
        let response = dispatch(service.as_ref(), decide(existing), payload)
            .await
            .map_err(|source| network(step, source))?;
        let id = adopt_id(&response, existing).map_err(|source| network(step, source))?;

        let mut c = ctx.write();
        c.draft.financial_summary.fields.set_id(id);
        c.draft
            .financial_summary
            .fields
            .set(ASSET_REF, FieldValue::Id(asset_id));
        info!(id, "financial summary saved");
        Ok(singleton_outcome(existing, id))
    }

    async fn save_closure(&self, ctx: &SharedContext) -> Result<SaveOutcome, StepperError> {
        let step = StepKind::Closure;
        let asset_id = parent_id(ctx, step)?;
        let mut record = ctx.read().draft.closure.clone();
        record.set(ASSET_REF, FieldValue::Id(asset_id));
        let existing = record.id();

        let id = self.write_record(step, RecordKind::Closure, &record).await?;
        let mut c = ctx.write();
        c.draft.closure.set_id(id);
        c.draft.closure.set(ASSET_REF, FieldValue::Id(asset_id));
        Ok(singleton_outcome(existing, id))
    }

    /// Write one collection row, adopting its id into the draft
    async fn write_row(
        &self,
        step: StepKind,
        kind: RecordKind,
        index: usize,
        ctx: &SharedContext,
    ) -> Result<i64, StepperError> {
        let asset_id = parent_id(ctx, step)?;
        let mut row = ctx
            .read()
            .draft
            .rows(kind)
            .and_then(|rows| rows.get(index))
            .cloned()
            .ok_or(StepperError::RowOutOfRange { step, index })?;
        row.set(ASSET_REF, FieldValue::Id(asset_id));

        let id = self.write_record(step, kind, &row).await?;

        let mut c = ctx.write();
        if let Some(target) = c.draft.rows_mut(kind).and_then(|rows| rows.get_mut(index)) {
            target.set_id(id);
            target.set(ASSET_REF, FieldValue::Id(asset_id));
        }
        if kind == RecordKind::PaymentPlan {
            row.set_id(id);
            c.upsert_persisted_payment_row(row);
        }
        Ok(id)
    }

    /// Create or update one record, returning its id
    async fn write_record(&self, step: StepKind, kind: RecordKind, record: &FormRecord) -> Result<i64, StepperError> {
        let existing = record.id();
        let action = decide(existing);
        let payload = self.normalizer.to_wire(kind, record);
        let service = self.services.get(kind)?;

        let response = dispatch(service.as_ref(), action, payload).await.map_err(|source| {
            error!(step = %step, error = %source, "save failed");
            network(step, source)
        })?;
        let id = adopt_id(&response, existing).map_err(|source| network(step, source))?;
        info!(step = %step, kind = %kind, id, ?action, "record saved");
        Ok(id)
    }

    /// Save a booking or purchase; failures become warning text
    async fn save_dependent(&self, kind: RecordKind, record: &FormRecord, unit_id: i64) -> Result<i64, String> {
        let mut record = record.clone();
        record.set(UNIT_REF, FieldValue::Id(unit_id));
        let payload = self.normalizer.to_wire(kind, &record);

        let result = match self.services.get(kind) {
            Ok(service) => dispatch(service.as_ref(), decide(record.id()), payload)
                .await
                .and_then(|response| adopt_id(&response, record.id()))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(message) = &result {
            warn!(kind = %kind, unit_id, error = %message, "dependent save failed; continuing");
        }
        result
    }

    fn lock_for(&self, kind: RecordKind) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(kind)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Raises the inline commit guard and lowers it when dropped, including when
/// the commit future is abandoned mid-write
struct CommitInFlight<'a>(&'a SharedContext);

impl<'a> CommitInFlight<'a> {
    fn raise(ctx: &'a SharedContext) -> Self {
        ctx.write().set_inline_commit_in_flight(true);
        Self(ctx)
    }
}

impl Drop for CommitInFlight<'_> {
    fn drop(&mut self) {
        self.0.write().set_inline_commit_in_flight(false);
    }
}

async fn dispatch(service: &dyn RecordService, action: WriteAction, payload: Value) -> Result<Value, BackendError> {
    match action {
        WriteAction::Create => service.create(payload).await,
        WriteAction::Update(id) => service.update(id, payload).await,
    }
}

/// Id from the response, falling back to the id the record already had
fn adopt_id(response: &Value, existing: Option<i64>) -> Result<i64, BackendError> {
    response_id(response).or(existing).ok_or_else(missing_id)
}

fn missing_id() -> BackendError {
    BackendError::MalformedResponse("response has no id".to_string())
}

fn network(step: StepKind, source: BackendError) -> StepperError {
    StepperError::Network { step, source }
}

fn singleton_outcome(existing: Option<i64>, id: i64) -> SaveOutcome {
    match existing {
        Some(_) => SaveOutcome::Updated(id),
        None => SaveOutcome::Created(id),
    }
}

fn parent_id(ctx: &SharedContext, step: StepKind) -> Result<i64, StepperError> {
    ctx.read()
        .asset_id()
        .ok_or(StepperError::MissingParentRecord { step })
}

fn row_kind(step: StepKind) -> Result<RecordKind, StepperError> {
    match step {
        StepKind::Fees => Ok(RecordKind::Fee),
        StepKind::Beneficiaries => Ok(RecordKind::Beneficiary),
        StepKind::PaymentPlan => Ok(RecordKind::PaymentPlan),
        _ => Err(StepperError::InvalidTransition {
            action: "edit rows",
            step,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_follows_id() {
        assert_eq!(decide(None), WriteAction::Create);
        assert_eq!(decide(Some(4)), WriteAction::Update(4));
    }

    #[test]
    fn adopt_prefers_response_id() {
        assert_eq!(adopt_id(&serde_json::json!({"id": 8}), Some(3)), Ok(8));
        assert_eq!(adopt_id(&serde_json::json!({}), Some(3)), Ok(3));
        assert!(adopt_id(&serde_json::json!({}), None).is_err());
    }

    #[test]
    fn only_collections_have_rows() {
        assert_eq!(row_kind(StepKind::Fees).unwrap(), RecordKind::Fee);
        assert!(row_kind(StepKind::Accounts).is_err());
    }

    #[test]
    fn outcome_reflects_prior_id() {
        assert_eq!(singleton_outcome(None, 5), SaveOutcome::Created(5));
        assert_eq!(singleton_outcome(Some(5), 5), SaveOutcome::Updated(5));
    }
}
