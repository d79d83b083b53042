//! Step data loading
//!
//! Fetches a step's records through its service, normalizes them to form
//! shape and installs them in the shared context together with the
//! persisted snapshots the diff engine compares against.

use crate::backend::ServiceRegistry;
use crate::context::SharedContext;
use crate::error::{BackendError, StepperError};
use bpa_model::{FinancialSummaryForm, FormRecord, RecordKind, StepKind};
use bpa_normalize::envelope::flatten_rows;
use bpa_normalize::Normalizer;
use serde_json::Value;
use tracing::{debug, info};

/// What a load did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Records were fetched and installed
    Loaded,
    /// Skipped while an inline edit commit is in flight
    Deferred,
    /// The details record does not exist yet; nothing to fetch
    NothingPersisted,
    /// The step's data is fetched by an external view
    External,
}

/// Fetch-and-normalize driver for every step
#[derive(Debug)]
pub struct StepLoader {
    services: ServiceRegistry,
    normalizer: Normalizer,
}

impl StepLoader {
    /// Loader over a service registry
    #[must_use]
    pub fn new(services: ServiceRegistry, normalizer: Normalizer) -> Self {
        Self {
            services,
            normalizer,
        }
    }

    /// Load one step into the context
    ///
    /// # Errors
    /// `Network` when the fetch fails, `Normalize` when the payload has an
    /// unexpected shape
    pub async fn load(&self, step: StepKind, ctx: &SharedContext) -> Result<LoadOutcome, StepperError> {
        let Some(kind) = step.record_kind() else {
            return Ok(LoadOutcome::External);
        };
        if kind == RecordKind::Document {
            return Ok(LoadOutcome::External);
        }
        let Some(asset_id) = ctx.read().asset_id() else {
            debug!(step = %step, "no persisted details; keeping draft");
            return Ok(LoadOutcome::NothingPersisted);
        };
        if step == StepKind::PaymentPlan && ctx.read().inline_commit_in_flight() {
            debug!("inline commit in flight; payment plan reload deferred");
            return Ok(LoadOutcome::Deferred);
        }

        let service = self.services.get(kind)?;
        let network = |source: BackendError| StepperError::Network { step, source };

        match step {
            StepKind::Details => {
                let wire = service.get(asset_id).await.map_err(network)?;
                let details = self.normalizer.to_form(kind, &wire)?;
                ctx.write().draft.details = details;
            }
            StepKind::Accounts => {
                let wire = service.list(asset_id).await.map_err(network)?;
                let accounts = self.normalizer.accounts_to_form(&wire)?;
                let mut c = ctx.write();
                c.draft.accounts = accounts.clone();
                c.set_persisted_accounts(accounts);
            }
            StepKind::Fees | StepKind::Beneficiaries => {
                let wire = service.list(asset_id).await.map_err(network)?;
                let rows = self.normalizer.rows_to_form(kind, &wire)?;
                if let Some(target) = ctx.write().draft.rows_mut(kind) {
                    *target = rows;
                }
            }
            StepKind::PaymentPlan => {
                let wire = service.list(asset_id).await.map_err(network)?;
                let rows = self.normalizer.rows_to_form(kind, &wire)?;
                let mut c = ctx.write();
                if c.inline_commit_in_flight() {
                    debug!("inline commit started during fetch; discarding reload");
                    return Ok(LoadOutcome::Deferred);
                }
                c.draft.payment_plan = rows.clone();
                c.set_persisted_payment_plan(rows);
            }
            StepKind::FinancialSummary => {
                let wire = service.list(asset_id).await.map_err(network)?;
                let summary = match first_row(kind, &wire)? {
                    Some(row) => self.normalizer.summary_to_form(&row)?,
                    None => FinancialSummaryForm::default(),
                };
                ctx.write().draft.financial_summary = summary;
            }
            StepKind::Closure => {
                let wire = service.list(asset_id).await.map_err(network)?;
                let closure = match first_row(kind, &wire)? {
                    Some(row) => self.normalizer.to_form(kind, &row)?,
                    None => FormRecord::new(),
                };
                ctx.write().draft.closure = closure;
            }
            StepKind::Documents | StepKind::Review => return Ok(LoadOutcome::External),
        }

        info!(step = %step, asset_id, "step loaded");
        Ok(LoadOutcome::Loaded)
    }

    /// Normalize an externally supplied document list into the draft
    ///
    /// # Errors
    /// `Normalize` when the payload has an unexpected shape
    pub fn install_documents(&self, wire: &Value, ctx: &SharedContext) -> Result<usize, StepperError> {
        let rows = self.normalizer.rows_to_form(RecordKind::Document, wire)?;
        let count = rows.len();
        ctx.write().draft.documents = rows;
        debug!(count, "documents refreshed");
        Ok(count)
    }
}

/// First row of a singleton's list payload
fn first_row(kind: RecordKind, wire: &Value) -> Result<Option<Value>, StepperError> {
    Ok(flatten_rows(kind, wire)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordService;
    use crate::context::WizardContext;
    use bpa_model::FieldValue;
    use serde_json::json;
    use std::sync::Arc;

    struct Fixed(Value);

    #[async_trait::async_trait]
    impl RecordService for Fixed {
        async fn get(&self, _id: i64) -> Result<Value, BackendError> {
            Ok(self.0.clone())
        }
        async fn list(&self, _parent_id: i64) -> Result<Value, BackendError> {
            Ok(self.0.clone())
        }
        async fn create(&self, payload: Value) -> Result<Value, BackendError> {
            Ok(payload)
        }
        async fn update(&self, _id: i64, payload: Value) -> Result<Value, BackendError> {
            Ok(payload)
        }
        async fn soft_delete(&self, _id: i64) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn loader(kind: RecordKind, wire: Value) -> StepLoader {
        let services = ServiceRegistry::new().with(kind, Arc::new(Fixed(wire)));
        StepLoader::new(services, Normalizer::utc())
    }

    fn persisted_ctx() -> SharedContext {
        let ctx = WizardContext::shared();
        ctx.write().draft.details.set("id", FieldValue::Id(7));
        ctx
    }

    #[tokio::test]
    async fn nothing_to_load_before_details_exist() {
        let l = loader(RecordKind::Fee, json!([]));
        let ctx = WizardContext::shared();
        assert_eq!(l.load(StepKind::Fees, &ctx).await.unwrap(), LoadOutcome::NothingPersisted);
        assert_eq!(l.load(StepKind::Review, &ctx).await.unwrap(), LoadOutcome::External);
    }

    #[tokio::test]
    async fn paged_payment_plan_becomes_snapshot() {
        let wire = json!({"content": [{"id": 3, "reappInstallmentNumber": 1, "reappInstallmentPercentage": 40}]});
        let l = loader(RecordKind::PaymentPlan, wire);
        let ctx = persisted_ctx();

        assert_eq!(l.load(StepKind::PaymentPlan, &ctx).await.unwrap(), LoadOutcome::Loaded);
        let c = ctx.read();
        assert_eq!(c.draft.payment_plan.len(), 1);
        assert_eq!(c.draft.payment_plan[0].text("installmentPercentage"), "40");
        assert_eq!(c.persisted_payment_plan(), c.draft.payment_plan.as_slice());
    }

    #[tokio::test]
    async fn in_flight_commit_defers_reload() {
        let l = loader(RecordKind::PaymentPlan, json!([{"id": 3}]));
        let ctx = persisted_ctx();
        ctx.write().draft.payment_plan.push(FormRecord::new().with("installmentPercentage", "55"));
        ctx.write().set_inline_commit_in_flight(true);

        assert_eq!(l.load(StepKind::PaymentPlan, &ctx).await.unwrap(), LoadOutcome::Deferred);
        assert_eq!(ctx.read().draft.payment_plan[0].text("installmentPercentage"), "55");
    }

    #[tokio::test]
    async fn missing_singleton_yields_blank_form() {
        let l = loader(RecordKind::Closure, json!([]));
        let ctx = persisted_ctx();
        ctx.write().draft.closure.set("totalPayment", "1");

        l.load(StepKind::Closure, &ctx).await.unwrap();
        assert!(ctx.read().draft.closure.is_empty());
    }

    #[tokio::test]
    async fn unexpected_envelope_is_a_normalize_error() {
        let l = loader(RecordKind::Fee, json!("oops"));
        let ctx = persisted_ctx();
        assert!(matches!(
            l.load(StepKind::Fees, &ctx).await,
            Err(StepperError::Normalize(_))
        ));
    }
}
