use async_trait::async_trait;
use bpa_model::{AccountSlot, FieldValue, RecordKind, StepKind, WizardMode};
use bpa_stepper::{
    BackendError, LoadOutcome, StepperError, WizardLocation, WorkflowSubmitter, NO_CHANGES_NOTICE,
};
use bpa_test_utils::{
    account_wire, complete_details, details_wire, AcceptingWorkflow, Call, Harness, Op,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

mock! {
    Workflow {}

    #[async_trait]
    impl WorkflowSubmitter for Workflow {
        async fn submit(&self, details: Value) -> Result<(), BackendError>;
    }
}

fn edit_at(step: StepKind) -> WizardLocation {
    WizardLocation::new(step, WizardMode::Edit).with_asset_id(1)
}

fn seeded() -> Harness {
    let h = Harness::new();
    h.service(RecordKind::Details).seed(details_wire(1));
    h
}

#[tokio::test]
async fn test_building_name_required_for_property_three() {
    let h = Harness::new();
    let mut nav = h.navigator(WizardLocation::default());
    assert_eq!(nav.start().await.unwrap(), LoadOutcome::NothingPersisted);

    nav.context().write().draft.details = complete_details();
    nav.set_field("propertyId", FieldValue::Id(3)).unwrap();

    let err = nav.next().await.unwrap_err();
    let errors = err.field_errors().expect("validation error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["buildingName"], "Building Name is required");
    assert_eq!(nav.step(), StepKind::Details);
    assert_eq!(h.write_count(), 0);

    nav.set_field("buildingName", "Tower A").unwrap();
    assert!(nav.field_errors().is_empty());
    assert_eq!(nav.next().await.unwrap(), StepKind::Documents);

    let created = h.service(RecordKind::Details).calls_of(Op::Create);
    assert_eq!(created.len(), 1);
    let payload = created[0].payload().unwrap();
    assert_eq!(payload["reaBuildingName"], json!("Tower A"));
    assert_eq!(payload["reaPropertyIdDTO"]["id"], json!(3));

    let asset_id = nav.context().read().asset_id();
    assert_eq!(asset_id, Some(100));
    assert_eq!(
        h.location.last(),
        Some(WizardLocation::new(StepKind::Documents, WizardMode::Create).with_asset_id(100))
    );
    assert_eq!(h.external.shown(), vec![(StepKind::Documents, Some(100))]);
}

#[tokio::test]
async fn test_other_properties_do_not_need_building_name() {
    let h = Harness::new();
    let mut nav = h.navigator(WizardLocation::default());
    nav.start().await.unwrap();
    nav.context().write().draft.details = complete_details();

    assert_eq!(nav.next().await.unwrap(), StepKind::Documents);
}

#[tokio::test]
async fn test_returning_to_details_updates_instead_of_creating() {
    let h = Harness::new();
    let mut nav = h.navigator(WizardLocation::default());
    nav.start().await.unwrap();
    nav.context().write().draft.details = complete_details();
    nav.next().await.unwrap();

    nav.back().await.unwrap();
    nav.set_field("assetName", "Marina Heights II").unwrap();
    nav.next().await.unwrap();

    let calls = h.service(RecordKind::Details).calls();
    assert!(matches!(calls[0], Call::Create(_)));
    assert!(matches!(calls[1], Call::Update(100, _)));
}

#[tokio::test]
async fn test_accounts_without_validated_rows_are_never_sent() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Accounts));
    nav.start().await.unwrap();

    for slot in [AccountSlot::Trust, AccountSlot::Retention] {
        nav.set_account_field(slot, "accountNumber", "1002003").unwrap();
        nav.set_account_field(slot, "currencyCode", "AED").unwrap();
    }

    let err = nav.next().await.unwrap_err();
    assert!(matches!(err, StepperError::NoValidatedAccounts));
    assert_eq!(nav.step(), StepKind::Accounts);
    assert_eq!(h.service(RecordKind::Account).write_count(), 0);
    assert_eq!(
        nav.notifier().active_error().as_deref(),
        Some("no validated accounts to save")
    );
}

#[tokio::test]
async fn test_changed_accounts_must_be_validated_before_saving() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Accounts));
    nav.start().await.unwrap();

    for slot in [AccountSlot::Trust, AccountSlot::Retention] {
        nav.set_account_field(slot, "accountNumber", "1002003").unwrap();
        nav.set_account_field(slot, "currencyCode", "AED").unwrap();
    }
    nav.mark_account_validated(AccountSlot::Trust).unwrap();

    let err = nav.next().await.unwrap_err();
    assert!(matches!(&err, StepperError::UnvalidatedAccounts(slots) if slots == &[AccountSlot::Retention]));
    assert_eq!(nav.step(), StepKind::Accounts);
    assert_eq!(h.service(RecordKind::Account).write_count(), 0);
    assert_eq!(
        nav.notifier().active_error().as_deref(),
        Some("accounts changed but not validated: RETENTION")
    );

    nav.mark_account_validated(AccountSlot::Retention).unwrap();
    assert_eq!(nav.next().await.unwrap(), StepKind::Fees);
    let creates = h.service(RecordKind::Account).calls_of(Op::Create);
    let types: Vec<Value> = creates
        .iter()
        .map(|call| call.payload().unwrap()["accountType"].clone())
        .collect();
    assert_eq!(types, vec![json!("TRUST"), json!("RETENTION")]);
    assert_eq!(creates[0].payload().unwrap()["realEstateAssetDTO"]["id"], json!(1));
}

#[tokio::test]
async fn test_incomplete_account_cannot_be_validated() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Accounts));
    nav.start().await.unwrap();
    nav.set_account_field(AccountSlot::Corporate, "accountNumber", "9").unwrap();

    let err = nav.mark_account_validated(AccountSlot::Corporate).unwrap_err();
    assert!(err.is_field_level());
    assert!(nav.field_errors().contains_key("CORPORATE.currencyCode"));
    assert!(!nav.context().read().is_account_validated(AccountSlot::Corporate));
}

#[tokio::test(start_paused = true)]
async fn test_reloaded_accounts_report_no_changes() {
    let h = seeded();
    let accounts = h.service(RecordKind::Account);
    accounts.seed(account_wire(21, "Trust Account", "1002003"));
    accounts.seed(account_wire(22, "retention", "1002004"));

    let mut nav = h.navigator(edit_at(StepKind::Accounts));
    nav.start().await.unwrap();
    assert_eq!(
        nav.context().read().validated_slots(),
        vec![AccountSlot::Trust, AccountSlot::Retention]
    );

    assert_eq!(nav.next().await.unwrap(), StepKind::Fees);
    assert_eq!(accounts.write_count(), 0);
    assert_eq!(nav.notifier().active_success().as_deref(), Some(NO_CHANGES_NOTICE));

    tokio::time::advance(Duration::from_millis(3000)).await;
    assert_eq!(nav.notifier().active_success(), None);
}

#[tokio::test]
async fn test_edited_account_is_updated_in_place() {
    let h = seeded();
    let accounts = h.service(RecordKind::Account);
    accounts.seed(account_wire(21, "TRUST", "1002003"));
    accounts.seed(account_wire(22, "RETENTION", "1002004"));

    let mut nav = h.navigator(edit_at(StepKind::Accounts));
    nav.start().await.unwrap();
    nav.set_account_field(AccountSlot::Retention, "accountNumber", "7007007").unwrap();
    nav.next().await.unwrap();

    let updates = accounts.calls_of(Op::Update);
    assert_eq!(updates.len(), 1);
    assert!(matches!(&updates[0], Call::Update(22, p) if p["accountNumber"] == json!("7007007")));
}

#[tokio::test]
async fn test_back_neither_validates_nor_saves() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Fees));
    nav.start().await.unwrap();
    let index = nav.add_row().unwrap();
    nav.set_row_field(index, "amount", "not a number").unwrap();

    assert_eq!(nav.back().await.unwrap(), StepKind::Accounts);
    assert_eq!(h.write_count(), 0);
    assert!(h.service(RecordKind::Account).calls_of(Op::List).is_empty());
    assert_eq!(h.location.last().map(|l| l.step), Some(StepKind::Accounts));
}

#[tokio::test]
async fn test_first_step_has_no_back() {
    let h = Harness::new();
    let mut nav = h.navigator(WizardLocation::default());
    assert!(matches!(
        nav.back().await,
        Err(StepperError::InvalidTransition { step: StepKind::Details, .. })
    ));
}

#[tokio::test]
async fn test_view_mode_moves_without_saving() {
    let h = seeded();
    let mut nav = h.navigator(
        WizardLocation::new(StepKind::Details, WizardMode::View).with_asset_id(1),
    );
    nav.start().await.unwrap();
    assert!(nav.set_field("assetName", "changed").is_err());

    nav.context().write().draft.details.set("projectReference", "");
    assert_eq!(nav.next().await.unwrap(), StepKind::Documents);
    assert_eq!(nav.next().await.unwrap(), StepKind::Accounts);
    assert_eq!(nav.back().await.unwrap(), StepKind::Documents);

    assert_eq!(h.write_count(), 0);
    assert_eq!(h.service(RecordKind::Account).calls_of(Op::List).len(), 1);
}

#[tokio::test]
async fn test_create_mode_clears_cached_draft() {
    let h = Harness::new();
    h.drafts.put("bpa-draft", "{}");
    let mut nav = h.navigator(WizardLocation::default());
    nav.start().await.unwrap();
    assert!(!h.drafts.contains("bpa-draft"));

    let h = seeded();
    h.drafts.put("bpa-draft", "{}");
    let mut nav = h.navigator(edit_at(StepKind::Details));
    nav.start().await.unwrap();
    assert!(h.drafts.contains("bpa-draft"));
    assert_eq!(nav.context().read().draft.details.text("assetName"), "Marina Heights");
}

#[tokio::test]
async fn test_jump_is_only_accepted_from_review() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Fees));
    assert!(nav.jump_to(0).await.is_err());

    let mut nav = h.navigator(WizardLocation::new(StepKind::Review, WizardMode::View).with_asset_id(1));
    assert!(nav.jump_to(0).await.is_err());

    let mut nav = h.navigator(WizardLocation::new(StepKind::Review, WizardMode::Create).with_asset_id(1));
    assert!(matches!(nav.jump_to(12).await, Err(StepperError::Model(_))));
    assert_eq!(nav.jump_to(2).await.unwrap(), StepKind::Accounts);
    assert_eq!(nav.mode(), WizardMode::Edit);
    assert_eq!(h.service(RecordKind::Account).calls_of(Op::List).len(), 1);
    assert_eq!(h.location.last().map(|l| l.to_query()).as_deref(), Some("step=3&mode=edit&id=1"));
}

#[tokio::test]
async fn test_submit_requires_persisted_details() {
    let mut workflow = MockWorkflow::new();
    workflow.expect_submit().times(0);
    let h = Harness::new().with_workflow(Arc::new(workflow));

    let mut nav = h.navigator(WizardLocation::new(StepKind::Review, WizardMode::Create));
    let err = nav.submit().await.unwrap_err();
    assert!(matches!(err, StepperError::DetailsNotPersisted));
    assert!(err.is_fatal());
    assert!(!h.location.has_left());
}

#[tokio::test]
async fn test_failed_workflow_keeps_wizard_on_review() {
    let mut workflow = MockWorkflow::new();
    workflow
        .expect_submit()
        .times(1)
        .returning(|_| Err(BackendError::Transport("connection reset".to_string())));
    let h = seeded().with_workflow(Arc::new(workflow));

    let mut nav = h.navigator(edit_at(StepKind::Review));
    nav.start().await.unwrap();
    let err = nav.submit().await.unwrap_err();

    assert!(matches!(err, StepperError::WorkflowSubmission(_)));
    assert_eq!(nav.step(), StepKind::Review);
    assert!(!h.location.has_left());
    assert!(nav.notifier().active_error().is_some());
    assert_eq!(nav.context().read().asset_id(), Some(1));
}

#[tokio::test]
async fn test_submit_forwards_details_and_leaves() {
    let workflow = Arc::new(AcceptingWorkflow::default());
    let h = seeded().with_workflow(workflow.clone());
    h.drafts.put("bpa-draft", "{}");

    let mut nav = h.navigator(edit_at(StepKind::Review));
    nav.start().await.unwrap();
    nav.submit().await.unwrap();

    let submitted = workflow.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["id"], json!(1));
    assert_eq!(submitted[0]["reaName"], json!("Marina Heights"));
    assert!(h.location.has_left());
    assert!(!h.drafts.contains("bpa-draft"));
    assert_eq!(nav.context().read().asset_id(), None);
}

#[tokio::test]
async fn test_submit_rejected_in_view_mode() {
    let h = seeded();
    let mut nav = h.navigator(WizardLocation::new(StepKind::Review, WizardMode::View).with_asset_id(1));
    assert!(matches!(
        nav.submit().await,
        Err(StepperError::InvalidTransition { action: "submit", .. })
    ));
}

#[tokio::test]
async fn test_open_inline_edit_blocks_advance() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    for (pct, done) in [("40", "10"), ("60", "100")] {
        let i = nav.add_row().unwrap();
        nav.set_row_field(i, "installmentPercentage", pct).unwrap();
        nav.set_row_field(i, "projectCompletionPercentage", done).unwrap();
    }
    assert_eq!(nav.context().read().draft.payment_plan[1].text("installmentNumber"), "2");

    let first_id = nav.save_row(0).await.unwrap();
    nav.begin_inline_edit(0).unwrap();
    nav.set_row_field(0, "installmentPercentage", "45").unwrap();

    let err = nav.next().await.unwrap_err();
    assert!(matches!(err, StepperError::UncommittedEdit { row: 0 }));
    assert!(nav.notifier().active_error().is_some());

    assert_eq!(nav.commit_inline_edit().await.unwrap(), first_id);
    assert!(nav.context().read().open_edit().is_none());
    assert!(!nav.context().read().inline_commit_in_flight());

    assert_eq!(nav.next().await.unwrap(), StepKind::FinancialSummary);
    let plan = h.service(RecordKind::PaymentPlan);
    assert_eq!(plan.calls_of(Op::Create).len(), 2);
    assert_eq!(plan.calls_of(Op::Update).len(), 1);
}

#[tokio::test]
async fn test_cancelled_inline_edit_restores_row() {
    let h = seeded();
    h.service(RecordKind::PaymentPlan).seed(json!({
        "id": 7,
        "reappInstallmentNumber": 1,
        "reappInstallmentPercentage": 50,
        "reappProjectCompletionPercentage": 20
    }));
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    nav.begin_inline_edit(0).unwrap();
    nav.set_row_field(0, "installmentPercentage", "500").unwrap();
    assert_eq!(nav.cancel_inline_edit(), Some(0));
    assert_eq!(nav.context().read().draft.payment_plan[0].text("installmentPercentage"), "50");

    assert_eq!(nav.next().await.unwrap(), StepKind::FinancialSummary);
    assert_eq!(h.service(RecordKind::PaymentPlan).write_count(), 0);
}

#[tokio::test]
async fn test_reopening_the_open_row_keeps_its_original() {
    let h = seeded();
    h.service(RecordKind::PaymentPlan).seed(json!({
        "id": 7,
        "reappInstallmentNumber": 1,
        "reappInstallmentPercentage": 10,
        "reappProjectCompletionPercentage": 20
    }));
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    nav.begin_inline_edit(0).unwrap();
    nav.set_row_field(0, "installmentPercentage", "99").unwrap();
    nav.begin_inline_edit(0).unwrap();
    assert_eq!(nav.cancel_inline_edit(), Some(0));

    assert_eq!(nav.context().read().draft.payment_plan[0].text("installmentPercentage"), "10");
}

fn seeded_plan() -> Harness {
    let h = seeded();
    let plan = h.service(RecordKind::PaymentPlan);
    for (id, n, pct) in [(7, 1, 30), (8, 2, 30), (9, 3, 40)] {
        plan.seed(json!({
            "id": id,
            "reappInstallmentNumber": n,
            "reappInstallmentPercentage": pct,
            "reappProjectCompletionPercentage": 30
        }));
    }
    h
}

fn plan_rows(nav: &bpa_stepper::StepNavigator) -> Vec<(Option<i64>, String, String)> {
    nav.context()
        .read()
        .draft
        .payment_plan
        .iter()
        .map(|row| {
            (
                row.id(),
                row.text("installmentNumber"),
                row.text("installmentPercentage"),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_deleting_an_earlier_row_keeps_the_open_edit_on_its_row() {
    let h = seeded_plan();
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    nav.begin_inline_edit(1).unwrap();
    nav.set_row_field(1, "installmentPercentage", "25").unwrap();
    nav.delete_row(0).await.unwrap();
    assert_eq!(nav.cancel_inline_edit(), Some(0));

    assert_eq!(
        plan_rows(&nav),
        vec![
            (Some(8), "1".to_string(), "30".to_string()),
            (Some(9), "2".to_string(), "40".to_string()),
        ]
    );

    assert_eq!(nav.next().await.unwrap(), StepKind::FinancialSummary);
    let plan = h.service(RecordKind::PaymentPlan);
    assert_eq!(plan.calls_of(Op::SoftDelete), vec![Call::SoftDelete(7)]);
    assert_eq!(plan.len(), 2);
}

#[tokio::test]
async fn test_deleting_the_open_row_closes_its_edit() {
    let h = seeded_plan();
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    nav.begin_inline_edit(2).unwrap();
    nav.delete_row(2).await.unwrap();

    assert!(nav.context().read().open_edit().is_none());
    assert_eq!(nav.next().await.unwrap(), StepKind::FinancialSummary);
}

#[tokio::test]
async fn test_deleting_installment_renumbers_remaining_rows() {
    let h = seeded();
    let plan = h.service(RecordKind::PaymentPlan);
    for (id, n) in [(7, 1), (8, 2), (9, 3)] {
        plan.seed(json!({
            "id": id,
            "reappInstallmentNumber": n,
            "reappInstallmentPercentage": 30,
            "reappProjectCompletionPercentage": 30
        }));
    }
    let mut nav = h.navigator(edit_at(StepKind::PaymentPlan));
    nav.start().await.unwrap();

    let removed = nav.delete_row(0).await.unwrap();
    assert_eq!(removed.id(), Some(7));
    assert_eq!(plan.calls_of(Op::SoftDelete), vec![Call::SoftDelete(7)]);

    let numbers: Vec<String> = nav
        .context()
        .read()
        .draft
        .payment_plan
        .iter()
        .map(|row| row.text("installmentNumber"))
        .collect();
    assert_eq!(numbers, vec!["1", "2"]);

    nav.next().await.unwrap();
    assert_eq!(plan.calls_of(Op::Update).len(), 2);
    assert_eq!(plan.calls_of(Op::SoftDelete).len(), 1);
}

#[tokio::test]
async fn test_documents_callback_replaces_rows() {
    let h = seeded();
    let nav = h.navigator(edit_at(StepKind::Documents));
    let count = nav
        .on_documents_changed(&json!({"content": [{"id": 4, "rtdDocumentName": "permit.pdf"}]}))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(nav.context().read().draft.documents[0].text("documentName"), "permit.pdf");
}

#[tokio::test]
async fn test_every_committed_move_is_published() {
    let h = seeded();
    let mut nav = h.navigator(edit_at(StepKind::Documents));
    nav.start().await.unwrap();
    nav.next().await.unwrap();
    nav.back().await.unwrap();

    let steps: Vec<StepKind> = h.location.pushes().iter().map(|l| l.step).collect();
    assert_eq!(steps, vec![StepKind::Accounts, StepKind::Documents]);
    assert!(h.location.pushes().iter().all(|l| l.asset_id == Some(1)));
}
