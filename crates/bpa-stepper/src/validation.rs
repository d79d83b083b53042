//! Per-step validation gate
//!
//! Required-field rules come from the mapping tables; malformed-value rules
//! follow each field's coercion. Failures are written to the context's field
//! errors and returned, while entered values are left untouched.
//!
//! Field error paths:
//! - `field` for singleton records
//! - `SLOT.field` for accounts (`TRUST.accountNumber`)
//! - `index.field` for row collections (`0.installmentPercentage`)
//! - `breakdown.row.column` for the financial breakdown

use crate::backend::LabelResolver;
use crate::context::WizardContext;
use crate::error::{FieldErrors, StepperError};
use bpa_model::{AccountSlot, AssetDraft, FieldValue, FormRecord, RecordKind, StepKind};
use bpa_normalize::breakdown::BREAKDOWN;
use bpa_normalize::dates::parse_wire_date;
use bpa_normalize::{mappings, Coercion, FieldMapping, LabelRef};
use chrono::{NaiveDate, Offset, Utc};
use std::sync::Arc;
use tracing::debug;

/// Steps whose records are saved through their own add/edit/delete actions
pub const SKIP_VALIDATION_STEPS: [StepKind; 3] =
    [StepKind::Documents, StepKind::Fees, StepKind::Beneficiaries];

/// Whether the step bypasses step-level validation
#[inline]
#[must_use]
pub fn skips_validation(step: StepKind) -> bool {
    SKIP_VALIDATION_STEPS.contains(&step)
}

/// Required and malformed field checks
#[derive(Clone)]
pub struct ValidationGate {
    labels: Arc<dyn LabelResolver>,
    language: String,
}

impl std::fmt::Debug for ValidationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl ValidationGate {
    /// Gate resolving labels in `language`
    #[must_use]
    pub fn new(labels: Arc<dyn LabelResolver>, language: impl Into<String>) -> Self {
        Self {
            labels,
            language: language.into(),
        }
    }

    /// Validate the active step before it is saved
    ///
    /// Clears previous field errors first. An open payment plan edit blocks
    /// before any field is examined.
    ///
    /// # Errors
    /// `UncommittedEdit` or `Validation`
    pub fn check(&self, step: StepKind, ctx: &mut WizardContext) -> Result<(), StepperError> {
        ctx.clear_field_errors();
        if skips_validation(step) {
            debug!(step = %step, "validation skipped");
            return Ok(());
        }

        if step == StepKind::PaymentPlan {
            if let Some(edit) = ctx.open_edit() {
                return Err(StepperError::UncommittedEdit { row: edit.row });
            }
        }

        let errors = self.step_errors(step, ctx);
        self.fail_with(step, errors, ctx)
    }

    /// Validate one row of a collection before it is saved on its own
    ///
    /// # Errors
    /// `Validation` with `index.field` paths
    pub fn check_row(
        &self,
        step: StepKind,
        index: usize,
        ctx: &mut WizardContext,
    ) -> Result<(), StepperError> {
        let not_rows = StepperError::InvalidTransition {
            action: "validate a row",
            step,
        };
        let kind = step.record_kind().ok_or(not_rows)?;
        let Some(rows) = ctx.draft.rows(kind) else {
            return Err(StepperError::InvalidTransition {
                action: "validate a row",
                step,
            });
        };
        let row = rows
            .get(index)
            .ok_or(StepperError::RowOutOfRange { step, index })?;
        let errors = self.record_errors(kind, row, &index.to_string());
        self.fail_with(step, errors, ctx)
    }

    /// Validate one account slot before the user marks it validated
    ///
    /// # Errors
    /// `Validation` with `SLOT.field` paths
    pub fn check_account(&self, slot: AccountSlot, ctx: &mut WizardContext) -> Result<(), StepperError> {
        let errors = self.account_errors(slot, ctx.draft.accounts.get(slot), true);
        self.fail_with(StepKind::Accounts, errors, ctx)
    }

    /// Every field error for a step's current draft
    #[must_use]
    pub fn step_errors(&self, step: StepKind, ctx: &WizardContext) -> FieldErrors {
        let draft = &ctx.draft;
        match step {
            StepKind::Details => self.details_errors(draft),
            StepKind::Accounts => AccountSlot::ALL
                .into_iter()
                .flat_map(|slot| {
                    self.account_errors(slot, draft.accounts.get(slot), slot.is_mandatory())
                })
                .collect(),
            StepKind::PaymentPlan => self.rows_errors(RecordKind::PaymentPlan, &draft.payment_plan),
            StepKind::FinancialSummary => self.summary_errors(draft),
            StepKind::Closure => self.record_errors(RecordKind::Closure, &draft.closure, ""),
            StepKind::Documents | StepKind::Fees | StepKind::Beneficiaries | StepKind::Review => {
                FieldErrors::new()
            }
        }
    }

    /// Required and malformed errors for one record
    ///
    /// `prefix` is prepended to field names with a `.` when non-empty.
    #[must_use]
    pub fn record_errors(&self, kind: RecordKind, record: &FormRecord, prefix: &str) -> FieldErrors {
        mappings(kind)
            .iter()
            .filter(|m| !m.server_generated)
            .filter_map(|m| {
                self.field_error(m, record)
                    .map(|message| (field_path(prefix, m.field), message))
            })
            .collect()
    }

    fn details_errors(&self, draft: &AssetDraft) -> FieldErrors {
        let details = &draft.details;
        let mut errors = self.record_errors(RecordKind::Details, details, "");

        let start = date_of(details.get("startDate"));
        let end = date_of(details.get("completionDate"));
        if let (Some(start), Some(end)) = (start, end) {
            if end < start && !errors.contains_key("completionDate") {
                let label = self.label_of(RecordKind::Details, "completionDate");
                errors.insert(
                    "completionDate".to_string(),
                    format!("{label} cannot be before the start date"),
                );
            }
        }
        errors
    }

    fn account_errors(&self, slot: AccountSlot, row: &FormRecord, mandatory: bool) -> FieldErrors {
        let prefix = slot.as_str();
        if mandatory {
            return self.record_errors(RecordKind::Account, row, prefix);
        }
        mappings(RecordKind::Account)
            .iter()
            .filter(|m| !m.server_generated && !row.get(m.field).is_empty())
            .filter_map(|m| {
                self.malformed(m, row.get(m.field))
                    .map(|message| (field_path(prefix, m.field), message))
            })
            .collect()
    }

    fn rows_errors(&self, kind: RecordKind, rows: &[FormRecord]) -> FieldErrors {
        rows.iter()
            .enumerate()
            .flat_map(|(i, row)| self.record_errors(kind, row, &i.to_string()))
            .collect()
    }

    fn summary_errors(&self, draft: &AssetDraft) -> FieldErrors {
        let summary = &draft.financial_summary;
        let mut errors = self.record_errors(RecordKind::FinancialSummary, &summary.fields, "");

        for (i, (spec, row)) in BREAKDOWN.iter().zip(&summary.breakdown).enumerate() {
            let cells = [
                ("out", &row.out),
                ("within", &row.within),
                ("total", &row.total),
                ("except", &row.except),
            ];
            for (column, cell) in cells {
                if !cell.trim().is_empty() && FieldValue::text(cell.as_str()).as_f64().is_none() {
                    errors.insert(
                        format!("breakdown.{i}.{column}"),
                        format!("{} must be a number", self.resolve(spec.label)),
                    );
                }
            }
        }
        errors
    }

    fn field_error(&self, m: &FieldMapping, record: &FormRecord) -> Option<String> {
        let value = record.get(m.field);
        if value.is_empty() {
            return m
                .requirement
                .applies(record)
                .then(|| format!("{} is required", self.resolve(m.label)));
        }
        self.malformed(m, value)
    }

    fn malformed(&self, m: &FieldMapping, value: &FieldValue) -> Option<String> {
        let label = || self.resolve(m.label);
        match m.coercion {
            Coercion::Number => value
                .as_f64()
                .is_none()
                .then(|| format!("{} must be a number", label())),
            Coercion::Integer => value
                .display()
                .trim()
                .parse::<i64>()
                .is_err()
                .then(|| format!("{} must be a whole number", label())),
            Coercion::Percent => match value.as_f64() {
                Some(p) if (0.0..=100.0).contains(&p) => None,
                _ => Some(format!("{} must be between 0 and 100", label())),
            },
            Coercion::Date => date_of(value)
                .is_none()
                .then(|| format!("{} must be a valid date", label())),
            Coercion::Id => value
                .as_id()
                .is_none()
                .then(|| format!("{} is invalid", label())),
            Coercion::Text | Coercion::Bool | Coercion::AccountType => None,
        }
    }

    fn label_of(&self, kind: RecordKind, field: &str) -> String {
        bpa_normalize::mapping(kind, field).map_or_else(|| field.to_string(), |m| self.resolve(m.label))
    }

    fn resolve(&self, label: LabelRef) -> String {
        self.labels
            .get_label(label.config_id, &self.language, label.fallback)
    }

    fn fail_with(
        &self,
        step: StepKind,
        errors: FieldErrors,
        ctx: &mut WizardContext,
    ) -> Result<(), StepperError> {
        if errors.is_empty() {
            return Ok(());
        }
        debug!(step = %step, count = errors.len(), "validation failed");
        ctx.extend_field_errors(&errors);
        Err(StepperError::Validation { step, errors })
    }
}

fn field_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn date_of(value: &FieldValue) -> Option<NaiveDate> {
    value
        .as_date()
        .or_else(|| parse_wire_date(&value.display(), Utc.fix()))
}
