//! The wizard state machine
//!
//! [`StepNavigator`] owns the active step and mode and drives every
//! transition:
//! - `next` validates, saves, advances, publishes the location and loads
//! - `back` moves without validating or saving
//! - `jump_to` re-enters a step from the review in edit mode
//! - `submit` forwards the details to the approval workflow
//!
//! Field edits and row operations go through the navigator as well, so
//! view mode can reject them in one place.

use crate::backend::Collaborators;
use crate::config::StepperConfig;
use crate::context::{SharedContext, WizardContext};
use crate::error::{FieldErrors, StepperError};
use crate::loader::{LoadOutcome, StepLoader};
use crate::location::WizardLocation;
use crate::notify::Notifier;
use crate::save::{SaveOrchestrator, SaveOutcome, UnitSaveReport};
use crate::validation::ValidationGate;
use bpa_model::{AccountSlot, FieldValue, FormRecord, RecordKind, SessionId, StepKind, UnitDraft, WizardMode};
use bpa_normalize::installments::{next_number, INSTALLMENT_NUMBER};
use bpa_normalize::{NormalizeError, Normalizer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Banner text when a save found nothing to send
pub const NO_CHANGES_NOTICE: &str = "No changes to save";

/// Step-orchestration state machine for one editing session
pub struct StepNavigator {
    session: SessionId,
    config: StepperConfig,
    step: StepKind,
    mode: WizardMode,
    ctx: SharedContext,
    gate: ValidationGate,
    saver: SaveOrchestrator,
    loader: StepLoader,
    notifier: Arc<Notifier>,
    normalizer: Normalizer,
    collaborators: Collaborators,
}

impl std::fmt::Debug for StepNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepNavigator")
            .field("session", &self.session)
            .field("step", &self.step)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl StepNavigator {
    /// Navigator positioned at `start`
    ///
    /// # Errors
    /// `Config` if the configuration is invalid
    pub fn new(
        config: StepperConfig,
        collaborators: Collaborators,
        start: WizardLocation,
    ) -> Result<Self, StepperError> {
        config.validate()?;
        let normalizer = Normalizer::new(config.offset()?);

        let ctx = WizardContext::shared();
        if let Some(id) = start.asset_id {
            ctx.write().draft.details.set_id(id);
        }

        Ok(Self {
            session: SessionId::new(),
            step: start.step,
            mode: start.mode,
            ctx,
            gate: ValidationGate::new(collaborators.labels.clone(), config.language.clone()),
            saver: SaveOrchestrator::new(collaborators.services.clone(), normalizer),
            loader: StepLoader::new(collaborators.services.clone(), normalizer),
            notifier: Arc::new(Notifier::from_config(&config)),
            normalizer,
            config,
            collaborators,
        })
    }

    /// Session identifier
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Active step
    #[inline]
    #[must_use]
    pub fn step(&self) -> StepKind {
        self.step
    }

    /// Active mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    /// Shared context handle
    #[inline]
    #[must_use]
    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    /// Notice channel
    #[inline]
    #[must_use]
    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Field errors currently shown
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        self.ctx.read().field_errors().clone()
    }

    /// Current location including the persisted asset id
    #[must_use]
    pub fn location(&self) -> WizardLocation {
        let location = WizardLocation::new(self.step, self.mode);
        match self.ctx.read().asset_id() {
            Some(id) => location.with_asset_id(id),
            None => location,
        }
    }

    /// Initialize the session
    ///
    /// Create mode clears the cached draft first. With a persisted asset the
    /// details and the starting step are loaded.
    ///
    /// # Errors
    /// Load failures, which are also shown as an error notice
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step))]
    pub async fn start(&mut self) -> Result<LoadOutcome, StepperError> {
        if self.mode == WizardMode::Create {
            self.collaborators.drafts.clear(&self.config.draft_cache_key);
            debug!(key = %self.config.draft_cache_key, "cleared cached draft");
        }

        let outcome = if self.ctx.read().asset_id().is_some() {
            self.report(self.loader.load(StepKind::Details, &self.ctx).await)?;
            if self.step == StepKind::Details {
                LoadOutcome::Loaded
            } else {
                self.report(self.loader.load(self.step, &self.ctx).await)?
            }
        } else {
            LoadOutcome::NothingPersisted
        };

        self.show_external();
        info!(mode = %self.mode, "wizard started");
        Ok(outcome)
    }

    /// Validate, save and advance
    ///
    /// # Workflow
    /// 1. View mode moves without validating or saving
    /// 2. Validate the active step unless it is on the skip list
    /// 3. Save the active step
    /// 4. Advance, publish the location and load the new step
    ///
    /// Load failures after the move are shown as a notice; the move stands.
    ///
    /// # Errors
    /// `Validation`, `UncommittedEdit`, save failures, or `InvalidTransition`
    /// at the last step
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step))]
    pub async fn next(&mut self) -> Result<StepKind, StepperError> {
        let target = self.step.next().ok_or(StepperError::InvalidTransition {
            action: "advance",
            step: self.step,
        })?;

        // 1. Read-only navigation
        if self.mode.is_read_only() {
            self.move_to(target);
            self.reload_quietly().await;
            return Ok(target);
        }

        // 2. Validate
        let checked = self.gate.check(self.step, &mut self.ctx.write());
        if let Err(e) = checked {
            if !e.is_field_level() {
                self.notifier.error(e.to_string());
            }
            debug!(error = %e, "validation refused advance");
            return Err(e);
        }

        // 3. Save
        match self.saver.save_step(self.step, &self.ctx).await {
            Ok(SaveOutcome::NoChanges) => self.notifier.success(NO_CHANGES_NOTICE),
            Ok(SaveOutcome::Skipped) => {}
            Ok(outcome) => {
                info!(?outcome, "step saved");
                self.notifier.success(format!("{} saved", title(self.step)));
            }
            Err(e) => {
                error!(error = %e, "save failed; staying on step");
                self.notifier.error(e.to_string());
                return Err(e);
            }
        }

        // 4. Advance
        self.move_to(target);
        self.reload_quietly().await;
        Ok(target)
    }

    /// Move to the previous step without validating or saving
    ///
    /// # Errors
    /// `InvalidTransition` at the first step
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step))]
    pub async fn back(&mut self) -> Result<StepKind, StepperError> {
        let target = self.step.prev().ok_or(StepperError::InvalidTransition {
            action: "go back",
            step: self.step,
        })?;
        self.move_to(target);
        if self.mode.is_read_only() {
            self.reload_quietly().await;
        }
        Ok(target)
    }

    /// Jump from the review back to a step for editing
    ///
    /// Switches to edit mode and reloads the target step.
    ///
    /// # Errors
    /// `InvalidTransition` outside the review or in view mode; `Model` for
    /// an index outside the wizard
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step))]
    pub async fn jump_to(&mut self, index: usize) -> Result<StepKind, StepperError> {
        if self.step != StepKind::Review || self.mode.is_read_only() {
            return Err(StepperError::InvalidTransition {
                action: "jump",
                step: self.step,
            });
        }
        let target = StepKind::from_index(index)?;
        self.mode = WizardMode::Edit;
        self.move_to(target);
        self.reload_quietly().await;
        Ok(target)
    }

    /// Submit the asset for approval and leave the wizard
    ///
    /// # Errors
    /// - `InvalidTransition` outside the review or in view mode
    /// - `DetailsNotPersisted` when no details record exists
    /// - `WorkflowSubmission` when the workflow rejects the request; the
    ///   wizard stays on the review
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step))]
    pub async fn submit(&mut self) -> Result<(), StepperError> {
        if self.step != StepKind::Review || self.mode.is_read_only() {
            return Err(StepperError::InvalidTransition {
                action: "submit",
                step: self.step,
            });
        }

        let details = {
            let c = self.ctx.read();
            c.asset_id().map(|_| c.draft.details.clone())
        };
        let Some(details) = details else {
            let e = StepperError::DetailsNotPersisted;
            error!(error = %e, "submit refused");
            self.notifier.error(e.to_string());
            return Err(e);
        };

        let payload = self.normalizer.to_wire(RecordKind::Details, &details);
        if let Err(source) = self.collaborators.workflow.submit(payload).await {
            let e = StepperError::WorkflowSubmission(source);
            error!(error = %e, "workflow request failed");
            self.notifier.error(e.to_string());
            return Err(e);
        }

        info!(asset_id = ?details.id(), "submitted for approval");
        self.notifier.success("Submitted for approval");
        self.collaborators.location.leave_wizard();
        self.collaborators.drafts.clear(&self.config.draft_cache_key);
        self.ctx.write().reset();
        Ok(())
    }

    /// Set a field on the active singleton step (details, summary, closure)
    ///
    /// # Errors
    /// `InvalidTransition` in view mode or on a collection step;
    /// `Normalize` for an unknown field
    pub fn set_field(&self, field: &str, value: impl Into<FieldValue>) -> Result<(), StepperError> {
        self.ensure_editable("edit fields")?;
        let step = self.step;
        let not_singleton = StepperError::InvalidTransition {
            action: "edit fields",
            step,
        };
        let kind = step.record_kind().ok_or(not_singleton)?;

        let mut c = self.ctx.write();
        let record = match step {
            StepKind::Details => &mut c.draft.details,
            StepKind::FinancialSummary => &mut c.draft.financial_summary.fields,
            StepKind::Closure => &mut c.draft.closure,
            _ => {
                return Err(StepperError::InvalidTransition {
                    action: "edit fields",
                    step,
                })
            }
        };
        self.normalizer.set_field(kind, record, field, value.into())?;
        c.clear_field_error(field);
        Ok(())
    }

    /// Set one cell of the financial breakdown table
    ///
    /// `column` is one of `out`, `within`, `total`, `except`.
    ///
    /// # Errors
    /// `InvalidTransition` off the summary step or in view mode,
    /// `RowOutOfRange`, or `Normalize` for an unknown column
    pub fn set_breakdown_cell(&self, index: usize, column: &str, value: impl Into<String>) -> Result<(), StepperError> {
        self.ensure_editable("edit the breakdown")?;
        let step = self.step;
        if step != StepKind::FinancialSummary {
            return Err(StepperError::InvalidTransition {
                action: "edit the breakdown",
                step,
            });
        }

        let mut c = self.ctx.write();
        let row = c
            .draft
            .financial_summary
            .breakdown
            .get_mut(index)
            .ok_or(StepperError::RowOutOfRange { step, index })?;
        let cell = match column {
            "out" => &mut row.out,
            "within" => &mut row.within,
            "total" => &mut row.total,
            "except" => &mut row.except,
            _ => {
                return Err(NormalizeError::UnknownField {
                    kind: RecordKind::FinancialSummary,
                    field: column.to_string(),
                }
                .into())
            }
        };
        *cell = value.into();
        c.clear_field_error(&format!("breakdown.{index}.{column}"));
        Ok(())
    }

    /// Set a field on one account slot
    ///
    /// # Errors
    /// `InvalidTransition` off the accounts step or in view mode;
    /// `Normalize` for an unknown field
    pub fn set_account_field(
        &self,
        slot: AccountSlot,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), StepperError> {
        self.ensure_step(StepKind::Accounts, "edit accounts")?;
        let mut c = self.ctx.write();
        self.normalizer
            .set_field(RecordKind::Account, c.draft.accounts.get_mut(slot), field, value.into())?;
        c.clear_field_error(&format!("{slot}.{field}"));
        Ok(())
    }

    /// Validate one account slot and mark it for saving
    ///
    /// # Errors
    /// `Validation` when the slot is incomplete
    pub fn mark_account_validated(&self, slot: AccountSlot) -> Result<(), StepperError> {
        self.ensure_step(StepKind::Accounts, "validate accounts")?;
        let mut c = self.ctx.write();
        self.gate.check_account(slot, &mut c)?;
        c.mark_account_validated(slot);
        debug!(slot = %slot, "account validated");
        Ok(())
    }

    /// Append a blank row to the active collection step
    ///
    /// Payment plan rows receive the next installment number.
    ///
    /// # Errors
    /// `InvalidTransition` off a collection step or in view mode
    pub fn add_row(&self) -> Result<usize, StepperError> {
        let kind = self.row_kind("add rows")?;
        let mut c = self.ctx.write();
        let rows = c.draft.rows_mut(kind).ok_or(StepperError::InvalidTransition {
            action: "add rows",
            step: self.step,
        })?;
        let mut row = FormRecord::new();
        if kind == RecordKind::PaymentPlan {
            row.set(INSTALLMENT_NUMBER, next_number(rows));
        }
        rows.push(row);
        Ok(rows.len() - 1)
    }

    /// Set a field on one row of the active collection step
    ///
    /// # Errors
    /// `InvalidTransition`, `RowOutOfRange` or `Normalize`
    pub fn set_row_field(&self, index: usize, field: &str, value: impl Into<FieldValue>) -> Result<(), StepperError> {
        let kind = self.row_kind("edit rows")?;
        let step = self.step;
        let mut c = self.ctx.write();
        let row = c
            .draft
            .rows_mut(kind)
            .and_then(|rows| rows.get_mut(index))
            .ok_or(StepperError::RowOutOfRange { step, index })?;
        self.normalizer.set_field(kind, row, field, value.into())?;
        c.clear_field_error(&format!("{index}.{field}"));
        Ok(())
    }

    /// Validate and save one row immediately
    ///
    /// # Errors
    /// `Validation` for an incomplete row, or save failures (also shown as
    /// an error notice)
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step, index = index))]
    pub async fn save_row(&self, index: usize) -> Result<i64, StepperError> {
        self.row_kind("save rows")?;
        self.gate.check_row(self.step, index, &mut self.ctx.write())?;
        let id = self.report(self.saver.save_row(self.step, index, &self.ctx).await)?;
        self.notifier.success(format!("{} row saved", title(self.step)));
        Ok(id)
    }

    /// Delete one row of the active collection step
    ///
    /// # Errors
    /// `RowOutOfRange` or backend failures (also shown as an error notice)
    #[tracing::instrument(skip_all, fields(session = %self.session, step = %self.step, index = index))]
    pub async fn delete_row(&self, index: usize) -> Result<FormRecord, StepperError> {
        self.row_kind("delete rows")?;
        let removed = self.report(self.saver.delete_row(self.step, index, &self.ctx).await)?;
        self.notifier.success(format!("{} row deleted", title(self.step)));
        Ok(removed)
    }

    /// Open a payment plan row for inline editing
    ///
    /// Opening the row that is already open keeps its saved original.
    ///
    /// # Errors
    /// `InvalidTransition` off the payment plan, `UncommittedEdit` while
    /// another row is open, `RowOutOfRange`
    pub fn begin_inline_edit(&self, index: usize) -> Result<(), StepperError> {
        self.ensure_step(StepKind::PaymentPlan, "edit installments")?;
        let mut c = self.ctx.write();
        if let Some(open) = c.open_edit() {
            if open.row == index {
                return Ok(());
            }
            return Err(StepperError::UncommittedEdit { row: open.row });
        }
        if c.begin_inline_edit(index) {
            Ok(())
        } else {
            Err(StepperError::RowOutOfRange {
                step: StepKind::PaymentPlan,
                index,
            })
        }
    }

    /// Validate and save the open inline edit, then close it
    ///
    /// # Errors
    /// `InvalidTransition` when no row is open, `Validation`, or save
    /// failures (also shown as an error notice)
    #[tracing::instrument(skip_all, fields(session = %self.session))]
    pub async fn commit_inline_edit(&self) -> Result<i64, StepperError> {
        self.ensure_step(StepKind::PaymentPlan, "commit installments")?;
        let row = self
            .ctx
            .read()
            .open_edit()
            .map(|edit| edit.row)
            .ok_or(StepperError::InvalidTransition {
                action: "commit without an open row",
                step: self.step,
            })?;
        self.gate.check_row(StepKind::PaymentPlan, row, &mut self.ctx.write())?;
        let id = self.report(self.saver.commit_inline_edit(row, &self.ctx).await)?;
        self.notifier.success("Installment saved");
        Ok(id)
    }

    /// Discard the open inline edit, restoring the row
    pub fn cancel_inline_edit(&self) -> Option<usize> {
        let mut c = self.ctx.write();
        let row = c.cancel_inline_edit()?;
        c.clear_field_errors();
        Some(row)
    }

    /// Replace the draft's documents with an externally supplied list
    ///
    /// # Errors
    /// `Normalize` when the payload has an unexpected shape
    pub fn on_documents_changed(&self, wire: &Value) -> Result<usize, StepperError> {
        self.loader.install_documents(wire, &self.ctx)
    }

    /// Save a unit with its booking and purchase
    ///
    /// Dependent failures come back as report warnings and raise no notice.
    ///
    /// # Errors
    /// `MissingParentRecord` before the details exist, `UnitSave` when the
    /// unit itself fails
    #[tracing::instrument(skip_all, fields(session = %self.session))]
    pub async fn save_unit(&self, unit: &UnitDraft) -> Result<UnitSaveReport, StepperError> {
        self.ensure_editable("save units")?;
        let asset_id = self
            .ctx
            .read()
            .asset_id()
            .ok_or(StepperError::MissingParentRecord { step: self.step })?;
        let report = self.report(self.saver.save_unit(unit, asset_id).await)?;
        self.notifier.success("Unit saved");
        Ok(report)
    }

    fn move_to(&mut self, target: StepKind) {
        let from = self.step;
        self.step = target;
        self.ctx.write().clear_field_errors();
        let location = self.location();
        self.collaborators.location.push(&location);
        info!(from = %from, to = %target, location = %location, "step changed");
        self.show_external();
    }

    async fn reload_quietly(&self) {
        if let Err(e) = self.loader.load(self.step, &self.ctx).await {
            error!(step = %self.step, error = %e, "load failed after transition");
            self.notifier.error(e.to_string());
        }
    }

    fn show_external(&self) {
        if !matches!(self.step, StepKind::Documents | StepKind::Review) {
            return;
        }
        if let Some(view) = &self.collaborators.external {
            view.show(self.step, self.ctx.read().asset_id());
        }
    }

    /// Surface an error as a banner before handing it back
    fn report<T>(&self, result: Result<T, StepperError>) -> Result<T, StepperError> {
        result.map_err(|e| {
            if !e.is_field_level() {
                error!(step = %self.step, error = %e, "operation failed");
                self.notifier.error(e.to_string());
            }
            e
        })
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), StepperError> {
        if self.mode.is_read_only() {
            return Err(StepperError::InvalidTransition {
                action,
                step: self.step,
            });
        }
        Ok(())
    }

    fn ensure_step(&self, step: StepKind, action: &'static str) -> Result<(), StepperError> {
        self.ensure_editable(action)?;
        if self.step != step {
            return Err(StepperError::InvalidTransition {
                action,
                step: self.step,
            });
        }
        Ok(())
    }

    fn row_kind(&self, action: &'static str) -> Result<RecordKind, StepperError> {
        self.ensure_editable(action)?;
        match self.step {
            StepKind::Fees => Ok(RecordKind::Fee),
            StepKind::Beneficiaries => Ok(RecordKind::Beneficiary),
            StepKind::PaymentPlan => Ok(RecordKind::PaymentPlan),
            step => Err(StepperError::InvalidTransition { action, step }),
        }
    }
}

/// Human title of a step for notices
fn title(step: StepKind) -> &'static str {
    match step {
        StepKind::Details => "Details",
        StepKind::Documents => "Documents",
        StepKind::Accounts => "Accounts",
        StepKind::Fees => "Fees",
        StepKind::Beneficiaries => "Beneficiaries",
        StepKind::PaymentPlan => "Payment plan",
        StepKind::FinancialSummary => "Financial summary",
        StepKind::Closure => "Closure",
        StepKind::Review => "Review",
    }
}
