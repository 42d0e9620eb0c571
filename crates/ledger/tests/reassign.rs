use chrono::Utc;
use ledger::{
    Currency, IouMessageKind, Ledger, LedgerError, OriginalMessage, Report, ReportAction,
    Transaction, collections,
};
use store::{Patch, Store};

const CURRENT_USER_ID: i64 = 1;
const NEW_REPORT_ID: &str = "2";
const OLD_REPORT_ID: &str = "3";
const SELF_DM_REPORT_ID: &str = "4";

fn fresh_ledger() -> Ledger {
    Ledger::new(Store::new())
}

async fn seed_report(ledger: &Ledger, report: Report) {
    ledger
        .store()
        .set(&collections::report_key(&report.report_id), &report)
        .await
        .unwrap();
}

async fn seed_transaction(ledger: &Ledger, transaction: &Transaction) {
    ledger
        .store()
        .set(
            &collections::transaction_key(&transaction.transaction_id),
            transaction,
        )
        .await
        .unwrap();
}

async fn seed_action(ledger: &Ledger, report_id: &str, action: &ReportAction) {
    ledger
        .store()
        .merge(
            &collections::report_actions_key(report_id),
            Patch::field(action.report_action_id.clone(), Patch::set(action).unwrap()),
        )
        .await;
}

fn report_with_totals(report_id: &str, total: i64, non_reimbursable_total: i64) -> Report {
    Report {
        total,
        non_reimbursable_total,
        ..Report::expense(report_id, CURRENT_USER_ID)
    }
}

fn linking_action(
    transaction: &Transaction,
    iou_report_id: &str,
    kind: IouMessageKind,
) -> ReportAction {
    ReportAction::iou(
        CURRENT_USER_ID,
        OriginalMessage {
            iou_report_id: Some(iou_report_id.to_string()),
            iou_transaction_id: Some(transaction.transaction_id.clone()),
            amount_minor: transaction.amount_minor,
            currency: transaction.currency,
            kind,
        },
        Utc::now(),
    )
}

async fn action_linking(ledger: &Ledger, report_id: &str, transaction_id: &str) -> Option<ReportAction> {
    ledger
        .report_actions(report_id)
        .await
        .unwrap()
        .into_values()
        .find(|action| action.links_transaction(transaction_id))
}

#[tokio::test]
async fn moves_linking_action_for_unreported_transaction() {
    let ledger = fresh_ledger();
    seed_report(&ledger, Report::expense(NEW_REPORT_ID, CURRENT_USER_ID)).await;
    seed_report(&ledger, Report::self_dm(SELF_DM_REPORT_ID, CURRENT_USER_ID)).await;

    let transaction = Transaction::unreported(100, Currency::Usd, Utc::now());
    let action = linking_action(&transaction, "0", IouMessageKind::Track);
    seed_transaction(&ledger, &transaction).await;
    seed_action(&ledger, SELF_DM_REPORT_ID, &action).await;

    ledger
        .change_transactions_report(
            std::slice::from_ref(&transaction.transaction_id),
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    let moved = action_linking(&ledger, NEW_REPORT_ID, &transaction.transaction_id)
        .await
        .expect("linking action not found under the destination report");
    assert_eq!(
        moved.original_message.unwrap().iou_report_id.as_deref(),
        Some(NEW_REPORT_ID)
    );
    assert!(
        action_linking(&ledger, SELF_DM_REPORT_ID, &transaction.transaction_id)
            .await
            .is_none()
    );
    let transaction = ledger
        .transaction(&transaction.transaction_id)
        .await
        .unwrap();
    assert_eq!(transaction.report_id, NEW_REPORT_ID);
}

#[tokio::test]
async fn moves_linking_action_between_reports() {
    let ledger = fresh_ledger();
    seed_report(&ledger, Report::expense(NEW_REPORT_ID, CURRENT_USER_ID)).await;
    seed_report(&ledger, Report::expense(OLD_REPORT_ID, CURRENT_USER_ID)).await;

    let transaction = Transaction::new(OLD_REPORT_ID, 100, Currency::Usd, Utc::now());
    let action = linking_action(&transaction, OLD_REPORT_ID, IouMessageKind::Create);
    seed_transaction(&ledger, &transaction).await;
    seed_action(&ledger, OLD_REPORT_ID, &action).await;

    ledger
        .change_transactions_report(
            std::slice::from_ref(&transaction.transaction_id),
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    assert!(
        action_linking(&ledger, NEW_REPORT_ID, &transaction.transaction_id)
            .await
            .is_some()
    );
    assert!(
        action_linking(&ledger, OLD_REPORT_ID, &transaction.transaction_id)
            .await
            .is_none()
    );
    let transaction = ledger
        .transaction(&transaction.transaction_id)
        .await
        .unwrap();
    assert_eq!(transaction.report_id, NEW_REPORT_ID);
}

#[tokio::test]
async fn updates_totals_for_a_reimbursable_move() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(OLD_REPORT_ID, 1000, 200)).await;
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    let transaction = Transaction::new(OLD_REPORT_ID, 100, Currency::Usd, Utc::now());
    seed_transaction(&ledger, &transaction).await;

    ledger
        .change_transactions_report(
            std::slice::from_ref(&transaction.transaction_id),
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    let old_report = ledger.report(OLD_REPORT_ID).await.unwrap();
    assert_eq!(old_report.total, 900);
    assert_eq!(old_report.non_reimbursable_total, 200);

    let new_report = ledger.report(NEW_REPORT_ID).await.unwrap();
    assert_eq!(new_report.total, 600);
    assert_eq!(new_report.non_reimbursable_total, 100);
}

#[tokio::test]
async fn updates_totals_for_a_non_reimbursable_move() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(OLD_REPORT_ID, 1000, 200)).await;
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    let transaction = Transaction {
        reimbursable: false,
        ..Transaction::new(OLD_REPORT_ID, 100, Currency::Usd, Utc::now())
    };
    seed_transaction(&ledger, &transaction).await;

    ledger
        .change_transactions_report(
            std::slice::from_ref(&transaction.transaction_id),
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    let old_report = ledger.report(OLD_REPORT_ID).await.unwrap();
    assert_eq!(old_report.total, 900);
    assert_eq!(old_report.non_reimbursable_total, 100);

    let new_report = ledger.report(NEW_REPORT_ID).await.unwrap();
    assert_eq!(new_report.total, 600);
    assert_eq!(new_report.non_reimbursable_total, 200);
}

// Re-invoking the move is NOT safe: the second call sees the destination as
// both source and target and the destination write wins, double-applying
// the amount. At-most-once delivery is the caller's responsibility.
#[tokio::test]
async fn repeating_a_move_double_applies_the_destination_totals() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(OLD_REPORT_ID, 1000, 200)).await;
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    let transaction = Transaction::new(OLD_REPORT_ID, 100, Currency::Usd, Utc::now());
    seed_transaction(&ledger, &transaction).await;

    let ids = vec![transaction.transaction_id.clone()];
    ledger
        .change_transactions_report(&ids, NEW_REPORT_ID)
        .await
        .unwrap();
    ledger
        .change_transactions_report(&ids, NEW_REPORT_ID)
        .await
        .unwrap();

    let old_report = ledger.report(OLD_REPORT_ID).await.unwrap();
    assert_eq!(old_report.total, 900);

    let new_report = ledger.report(NEW_REPORT_ID).await.unwrap();
    assert_eq!(new_report.total, 700);
}

#[tokio::test]
async fn batch_entries_are_independent() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(OLD_REPORT_ID, 1000, 200)).await;
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    // t1 has no linking action yet; t2 does. Neither blocks the other.
    let t1 = Transaction::new(OLD_REPORT_ID, 100, Currency::Usd, Utc::now());
    let t2 = Transaction::new(OLD_REPORT_ID, 50, Currency::Usd, Utc::now());
    let action = linking_action(&t2, OLD_REPORT_ID, IouMessageKind::Create);
    seed_transaction(&ledger, &t1).await;
    seed_transaction(&ledger, &t2).await;
    seed_action(&ledger, OLD_REPORT_ID, &action).await;

    ledger
        .change_transactions_report(
            &[t1.transaction_id.clone(), t2.transaction_id.clone()],
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    assert_eq!(
        ledger.transaction(&t1.transaction_id).await.unwrap().report_id,
        NEW_REPORT_ID
    );
    assert_eq!(
        ledger.transaction(&t2.transaction_id).await.unwrap().report_id,
        NEW_REPORT_ID
    );
    assert!(
        action_linking(&ledger, NEW_REPORT_ID, &t2.transaction_id)
            .await
            .is_some()
    );

    let old_report = ledger.report(OLD_REPORT_ID).await.unwrap();
    assert_eq!(old_report.total, 850);
    let new_report = ledger.report(NEW_REPORT_ID).await.unwrap();
    assert_eq!(new_report.total, 650);
}

#[tokio::test]
async fn zero_amount_moves_without_touching_totals() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(OLD_REPORT_ID, 1000, 200)).await;
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    let transaction = Transaction::new(OLD_REPORT_ID, 0, Currency::Usd, Utc::now());
    seed_transaction(&ledger, &transaction).await;

    ledger
        .change_transactions_report(
            std::slice::from_ref(&transaction.transaction_id),
            NEW_REPORT_ID,
        )
        .await
        .unwrap();

    assert_eq!(
        ledger
            .transaction(&transaction.transaction_id)
            .await
            .unwrap()
            .report_id,
        NEW_REPORT_ID
    );
    assert_eq!(ledger.report(OLD_REPORT_ID).await.unwrap().total, 1000);
    assert_eq!(ledger.report(NEW_REPORT_ID).await.unwrap().total, 500);
}

#[tokio::test]
async fn missing_destination_report_is_rejected() {
    let ledger = fresh_ledger();
    let result = ledger
        .change_transactions_report(&["anything".to_string()], "404")
        .await;
    assert_eq!(result, Err(LedgerError::KeyNotFound("404".to_string())));
}

#[tokio::test]
async fn missing_transactions_are_skipped() {
    let ledger = fresh_ledger();
    seed_report(&ledger, report_with_totals(NEW_REPORT_ID, 500, 100)).await;

    ledger
        .change_transactions_report(&["ghost".to_string()], NEW_REPORT_ID)
        .await
        .unwrap();

    assert_eq!(ledger.report(NEW_REPORT_ID).await.unwrap().total, 500);
}
