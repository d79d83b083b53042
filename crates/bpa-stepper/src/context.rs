//! Explicit shared wizard context
//!
//! Holds the draft together with everything sibling steps need from each
//! other: last-persisted snapshots, account validation flags, field errors
//! and the payment plan's inline-edit state. Components receive it by
//! reference instead of reaching into ambient storage.

use crate::error::FieldErrors;
use bpa_model::{AccountSet, AccountSlot, AssetDraft, FormRecord};
use bpa_normalize::installments::INSTALLMENT_NUMBER;
use parking_lot::RwLock;
use std::sync::Arc;

/// Context shared between the navigator, loader and orchestrator
///
/// Guards must not be held across `.await`.
pub type SharedContext = Arc<RwLock<WizardContext>>;

/// A payment plan row open for inline editing
#[derive(Debug, Clone, PartialEq)]
pub struct OpenEdit {
    /// Zero-based row index
    pub row: usize,
    /// Row contents when the edit began
    pub original: FormRecord,
}

/// State of one editing session
#[derive(Debug, Clone, Default)]
pub struct WizardContext {
    /// Editable form data for every step
    pub draft: AssetDraft,
    persisted_accounts: AccountSet,
    persisted_payment_plan: Vec<FormRecord>,
    validated_accounts: [bool; 4],
    field_errors: FieldErrors,
    open_edit: Option<OpenEdit>,
    inline_commit_in_flight: bool,
}

impl WizardContext {
    /// Empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty context behind a shared handle
    #[must_use]
    pub fn shared() -> SharedContext {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Persisted asset id
    #[inline]
    #[must_use]
    pub fn asset_id(&self) -> Option<i64> {
        self.draft.asset_id()
    }

    /// Drop all session state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accounts as last loaded or saved
    #[inline]
    #[must_use]
    pub fn persisted_accounts(&self) -> &AccountSet {
        &self.persisted_accounts
    }

    /// Replace the persisted account snapshot
    ///
    /// Validation flags are rebuilt from the snapshot: rows that carry a
    /// server id count as validated, every other slot does not.
    pub fn set_persisted_accounts(&mut self, accounts: AccountSet) {
        self.validated_accounts = [false; 4];
        for slot in accounts.persisted_slots() {
            self.validated_accounts[slot.index()] = true;
        }
        self.persisted_accounts = accounts;
    }

    /// Record one saved account row
    pub fn record_saved_account(&mut self, slot: AccountSlot, row: FormRecord) {
        self.persisted_accounts.set(slot, row);
        self.validated_accounts[slot.index()] = true;
    }

    /// Mark a slot as validated by the user
    #[inline]
    pub fn mark_account_validated(&mut self, slot: AccountSlot) {
        self.validated_accounts[slot.index()] = true;
    }

    /// Whether a slot is validated
    #[inline]
    #[must_use]
    pub fn is_account_validated(&self, slot: AccountSlot) -> bool {
        self.validated_accounts[slot.index()]
    }

    /// Validated slots in slot order
    #[must_use]
    pub fn validated_slots(&self) -> Vec<AccountSlot> {
        AccountSlot::ALL
            .into_iter()
            .filter(|slot| self.is_account_validated(*slot))
            .collect()
    }

    /// Payment plan as last loaded or saved
    #[inline]
    #[must_use]
    pub fn persisted_payment_plan(&self) -> &[FormRecord] {
        &self.persisted_payment_plan
    }

    /// Replace the persisted payment plan snapshot
    pub fn set_persisted_payment_plan(&mut self, rows: Vec<FormRecord>) {
        self.persisted_payment_plan = rows;
    }

    /// Insert or replace one row of the persisted payment plan by id
    pub fn upsert_persisted_payment_row(&mut self, row: FormRecord) {
        let id = row.id();
        match self
            .persisted_payment_plan
            .iter_mut()
            .find(|persisted| id.is_some() && persisted.id() == id)
        {
            Some(existing) => *existing = row,
            None => self.persisted_payment_plan.push(row),
        }
    }

    /// Keep only the persisted payment plan rows matching `keep`
    pub fn persisted_payment_plan_retain(&mut self, keep: impl FnMut(&FormRecord) -> bool) {
        self.persisted_payment_plan.retain(keep);
    }

    /// Current field errors
    #[inline]
    #[must_use]
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Replace field errors
    pub fn set_field_errors(&mut self, errors: FieldErrors) {
        self.field_errors = errors;
    }

    /// Add field errors, replacing messages for paths already present
    pub fn extend_field_errors(&mut self, errors: &FieldErrors) {
        for (path, message) in errors {
            self.field_errors.insert(path.clone(), message.clone());
        }
    }

    /// Clear one field's error
    pub fn clear_field_error(&mut self, path: &str) {
        self.field_errors.shift_remove(path);
    }

    /// Clear every field error
    pub fn clear_field_errors(&mut self) {
        self.field_errors.clear();
    }

    /// Row currently open for inline editing
    #[inline]
    #[must_use]
    pub fn open_edit(&self) -> Option<&OpenEdit> {
        self.open_edit.as_ref()
    }

    /// Open a payment plan row for inline editing
    ///
    /// Returns `false` if the row does not exist.
    pub fn begin_inline_edit(&mut self, row: usize) -> bool {
        let Some(original) = self.draft.payment_plan.get(row).cloned() else {
            return false;
        };
        self.open_edit = Some(OpenEdit { row, original });
        true
    }

    /// Close the inline edit, restoring the row's original contents
    pub fn cancel_inline_edit(&mut self) -> Option<usize> {
        let edit = self.open_edit.take()?;
        if let Some(row) = self.draft.payment_plan.get_mut(edit.row) {
            *row = edit.original;
        }
        Some(edit.row)
    }

    /// Close the inline edit, keeping the row's contents
    pub fn close_inline_edit(&mut self) -> Option<usize> {
        self.open_edit.take().map(|edit| edit.row)
    }

    /// Realign the open inline edit after payment plan row `index` was
    /// removed and the rest renumbered
    ///
    /// An edit of the removed row is dropped. An edit of a later row moves up
    /// one place and its saved original takes the row's new number.
    pub fn payment_row_removed(&mut self, index: usize) {
        let Some(row) = self.open_edit.as_ref().map(|edit| edit.row) else {
            return;
        };
        if row == index {
            self.open_edit = None;
            return;
        }
        if row < index {
            return;
        }
        let number = self
            .draft
            .payment_plan
            .get(row - 1)
            .map(|current| current.get(INSTALLMENT_NUMBER).clone());
        if let Some(edit) = self.open_edit.as_mut() {
            edit.row = row - 1;
            if let Some(number) = number {
                edit.original.set(INSTALLMENT_NUMBER, number);
            }
        }
    }

    /// Whether an inline edit commit is being written
    #[inline]
    #[must_use]
    pub fn inline_commit_in_flight(&self) -> bool {
        self.inline_commit_in_flight
    }

    /// Set the inline commit guard
    #[inline]
    pub fn set_inline_commit_in_flight(&mut self, in_flight: bool) {
        self.inline_commit_in_flight = in_flight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpa_model::FieldValue;

    #[test]
    fn persisted_accounts_count_as_validated() {
        let mut ctx = WizardContext::new();
        let mut accounts = AccountSet::empty();
        accounts.get_mut(AccountSlot::Retention).set_id(5);
        ctx.set_persisted_accounts(accounts);
        assert_eq!(ctx.validated_slots(), [AccountSlot::Retention]);

        ctx.mark_account_validated(AccountSlot::Trust);
        assert_eq!(
            ctx.validated_slots(),
            [AccountSlot::Trust, AccountSlot::Retention]
        );
    }

    #[test]
    fn cancel_restores_original_row() {
        let mut ctx = WizardContext::new();
        ctx.draft
            .payment_plan
            .push(FormRecord::new().with("installmentPercentage", "10"));
        assert!(ctx.begin_inline_edit(0));
        assert!(!ctx.begin_inline_edit(3));
        ctx.draft.payment_plan[0].set("installmentPercentage", "99");

        assert_eq!(ctx.cancel_inline_edit(), Some(0));
        assert_eq!(ctx.draft.payment_plan[0].text("installmentPercentage"), "10");
        assert!(ctx.open_edit().is_none());
    }

    #[test]
    fn reloaded_accounts_replace_validation_flags() {
        let mut ctx = WizardContext::new();
        let mut accounts = AccountSet::empty();
        accounts.get_mut(AccountSlot::Trust).set_id(4);
        ctx.set_persisted_accounts(accounts);
        ctx.mark_account_validated(AccountSlot::Corporate);

        let mut reloaded = AccountSet::empty();
        reloaded.get_mut(AccountSlot::Retention).set_id(5);
        ctx.set_persisted_accounts(reloaded);
        assert_eq!(ctx.validated_slots(), [AccountSlot::Retention]);
    }

    fn plan(ctx: &mut WizardContext, ids: &[i64]) {
        ctx.draft.payment_plan = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                FormRecord::new()
                    .with("id", FieldValue::Id(*id))
                    .with(INSTALLMENT_NUMBER, (i + 1).to_string())
            })
            .collect();
    }

    #[test]
    fn removing_an_earlier_row_moves_the_open_edit_up() {
        let mut ctx = WizardContext::new();
        plan(&mut ctx, &[7, 8, 9]);
        assert!(ctx.begin_inline_edit(2));
        ctx.draft.payment_plan[2].set("installmentPercentage", "25");

        ctx.draft.payment_plan.remove(0);
        bpa_normalize::installments::renumber(&mut ctx.draft.payment_plan);
        ctx.payment_row_removed(0);

        assert_eq!(ctx.cancel_inline_edit(), Some(1));
        let rows: Vec<(Option<i64>, String)> = ctx
            .draft
            .payment_plan
            .iter()
            .map(|row| (row.id(), row.text(INSTALLMENT_NUMBER)))
            .collect();
        assert_eq!(rows, vec![(Some(8), "1".to_string()), (Some(9), "2".to_string())]);
    }

    #[test]
    fn removing_the_open_row_closes_the_edit() {
        let mut ctx = WizardContext::new();
        plan(&mut ctx, &[7, 8]);
        assert!(ctx.begin_inline_edit(0));
        ctx.payment_row_removed(1);
        assert_eq!(ctx.open_edit().map(|edit| edit.row), Some(0));

        ctx.payment_row_removed(0);
        assert!(ctx.open_edit().is_none());
    }

    #[test]
    fn persisted_rows_upsert_by_id() {
        let mut ctx = WizardContext::new();
        ctx.upsert_persisted_payment_row(FormRecord::new().with("id", FieldValue::Id(1)).with("tag", "a"));
        ctx.upsert_persisted_payment_row(FormRecord::new().with("id", FieldValue::Id(1)).with("tag", "b"));
        ctx.upsert_persisted_payment_row(FormRecord::new().with("id", FieldValue::Id(2)));
        assert_eq!(ctx.persisted_payment_plan().len(), 2);
        assert_eq!(ctx.persisted_payment_plan()[0].text("tag"), "b");

        ctx.persisted_payment_plan_retain(|row| row.id() != Some(1));
        assert_eq!(ctx.persisted_payment_plan().len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut ctx = WizardContext::new();
        ctx.draft.details.set("id", FieldValue::Id(3));
        ctx.mark_account_validated(AccountSlot::Corporate);
        ctx.set_inline_commit_in_flight(true);
        ctx.reset();
        assert_eq!(ctx.asset_id(), None);
        assert!(ctx.validated_slots().is_empty());
        assert!(!ctx.inline_commit_in_flight());
    }
}
