//! The in-memory registration draft
//!
//! [`AssetDraft`] is never persisted as a whole; it composes the form shape of
//! every step for the lifetime of one editing session.

use crate::account::AccountSet;
use crate::step::RecordKind;
use crate::value::FormRecord;
use serde::Serialize;

/// Number of conceptual rows in the financial breakdown table
pub const BREAKDOWN_ROWS: usize = 24;

/// One row of the financial breakdown, all cells as display text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BreakdownRow {
    /// Amount outside escrow
    pub out: String,
    /// Amount within escrow
    pub within: String,
    /// Total amount
    pub total: String,
    /// Amount excluding capital
    pub except: String,
}

impl BreakdownRow {
    /// Whether every cell is blank
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [&self.out, &self.within, &self.total, &self.except]
            .iter()
            .all(|c| c.trim().is_empty())
    }
}

/// Financial summary form: scalar fields plus the fixed breakdown table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummaryForm {
    /// Scalar fields (id, estimates, actuals)
    pub fields: FormRecord,
    /// Exactly [`BREAKDOWN_ROWS`] rows
    pub breakdown: Vec<BreakdownRow>,
}

impl Default for FinancialSummaryForm {
    fn default() -> Self {
        Self {
            fields: FormRecord::new(),
            breakdown: vec![BreakdownRow::default(); BREAKDOWN_ROWS],
        }
    }
}

/// Aggregate of every step's form data for one asset
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AssetDraft {
    /// Root details record
    pub details: FormRecord,
    /// Document rows
    pub documents: Vec<FormRecord>,
    /// The four canonical accounts
    pub accounts: AccountSet,
    /// Fee rows
    pub fees: Vec<FormRecord>,
    /// Beneficiary rows
    pub beneficiaries: Vec<FormRecord>,
    /// Installment rows, numbered 1..N
    pub payment_plan: Vec<FormRecord>,
    /// Financial summary singleton
    pub financial_summary: FinancialSummaryForm,
    /// Closure singleton
    pub closure: FormRecord,
}

impl AssetDraft {
    /// Empty draft for a new asset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the persisted details record
    #[inline]
    #[must_use]
    pub fn asset_id(&self) -> Option<i64> {
        self.details.id()
    }

    /// Row collection backing a record kind, if it is a 0..n collection
    #[must_use]
    pub fn rows(&self, kind: RecordKind) -> Option<&Vec<FormRecord>> {
        match kind {
            RecordKind::Document => Some(&self.documents),
            RecordKind::Fee => Some(&self.fees),
            RecordKind::Beneficiary => Some(&self.beneficiaries),
            RecordKind::PaymentPlan => Some(&self.payment_plan),
            _ => None,
        }
    }

    /// Mutable row collection backing a record kind
    pub fn rows_mut(&mut self, kind: RecordKind) -> Option<&mut Vec<FormRecord>> {
        match kind {
            RecordKind::Document => Some(&mut self.documents),
            RecordKind::Fee => Some(&mut self.fees),
            RecordKind::Beneficiary => Some(&mut self.beneficiaries),
            RecordKind::PaymentPlan => Some(&mut self.payment_plan),
            _ => None,
        }
    }
}

/// A unit registration with its dependent sub-records
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UnitDraft {
    /// The unit itself
    pub unit: FormRecord,
    /// Optional booking referencing the unit
    pub booking: Option<FormRecord>,
    /// Optional purchase referencing the unit
    pub purchase: Option<FormRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn default_summary_has_fixed_rows() {
        let summary = FinancialSummaryForm::default();
        assert_eq!(summary.breakdown.len(), BREAKDOWN_ROWS);
        assert!(summary.breakdown.iter().all(BreakdownRow::is_blank));
    }

    #[test]
    fn asset_id_comes_from_details() {
        let mut draft = AssetDraft::new();
        assert_eq!(draft.asset_id(), None);
        draft.details.set("id", FieldValue::Id(7));
        assert_eq!(draft.asset_id(), Some(7));
    }

    #[test]
    fn only_collections_expose_rows() {
        let mut draft = AssetDraft::new();
        assert!(draft.rows(RecordKind::Fee).is_some());
        assert!(draft.rows(RecordKind::Closure).is_none());
        draft.rows_mut(RecordKind::PaymentPlan).unwrap().push(FormRecord::new());
        assert_eq!(draft.payment_plan.len(), 1);
    }
}
