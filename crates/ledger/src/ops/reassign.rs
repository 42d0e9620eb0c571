//! Moving transactions between expense reports.

use store::{Patch, UpdateBatch};

use crate::{
    Ledger, LedgerError, ResultLedger, Transaction, collections, reports::UNREPORTED_REPORT_ID,
};

impl Ledger {
    /// Reassigns transactions to `destination_report_id`.
    ///
    /// For each transaction this rewrites its owning report, relocates the
    /// linking IOU action into the destination's action map, and shifts
    /// both reports' cached totals by the transaction's contribution. All
    /// writes for one transaction land in a single store batch, so no
    /// observer sees the linking action in neither or both maps.
    ///
    /// Transactions are processed independently: one missing or malformed
    /// record never blocks the rest (the first error is still reported).
    ///
    /// The operation is **not** idempotent: invoking it twice with the
    /// same arguments applies the totals twice. At-most-once delivery per
    /// logical request is the caller's job.
    pub async fn change_transactions_report(
        &self,
        transaction_ids: &[String],
        destination_report_id: &str,
    ) -> ResultLedger<()> {
        // Totals aggregation is meaningless without the destination record.
        if self.find_report(destination_report_id).await?.is_none() {
            return Err(LedgerError::KeyNotFound(destination_report_id.to_string()));
        }

        let mut first_error = None;
        for transaction_id in transaction_ids {
            if let Err(err) = self
                .move_transaction(transaction_id, destination_report_id)
                .await
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn move_transaction(
        &self,
        transaction_id: &str,
        destination_report_id: &str,
    ) -> ResultLedger<()> {
        let Some(transaction) = self.find_transaction(transaction_id).await? else {
            // Record never arrived (or was already deleted); nothing to move.
            return Ok(());
        };

        let mut batch = UpdateBatch::new();

        // Relocate the linking action, when one exists. Unreported
        // transactions without an IOU action skip this step.
        if let Some((holding_report_id, action)) =
            self.find_linking_action(transaction_id).await?
        {
            let mut moved = action.clone();
            if let Some(message) = moved.original_message.as_mut() {
                message.iou_report_id = Some(destination_report_id.to_string());
            }

            batch.merge(
                collections::report_actions_key(&holding_report_id),
                Patch::field(action.report_action_id.clone(), Patch::Delete),
            );
            batch.merge(
                collections::report_actions_key(destination_report_id),
                Patch::field(moved.report_action_id.clone(), Patch::set(&moved)?),
            );
        }

        batch.merge(
            collections::transaction_key(transaction_id),
            Patch::field("report_id", Patch::set(&destination_report_id)?),
        );

        let amount = transaction.amount_minor;
        let non_reimbursable_amount = non_reimbursable_contribution(&transaction);

        if transaction.report_id != UNREPORTED_REPORT_ID
            && let Some(source) = self.find_report(&transaction.report_id).await?
        {
            batch.merge(
                collections::report_key(&source.report_id),
                totals_patch(
                    source.total - amount,
                    source.non_reimbursable_total - non_reimbursable_amount,
                )?,
            );
        }

        let destination = self.report(destination_report_id).await?;
        batch.merge(
            collections::report_key(destination_report_id),
            totals_patch(
                destination.total + amount,
                destination.non_reimbursable_total + non_reimbursable_amount,
            )?,
        );

        self.store().apply(batch).await;
        Ok(())
    }
}

fn non_reimbursable_contribution(transaction: &Transaction) -> i64 {
    if transaction.reimbursable {
        0
    } else {
        transaction.amount_minor
    }
}

fn totals_patch(total: i64, non_reimbursable_total: i64) -> ResultLedger<Patch> {
    Ok(Patch::merge([
        ("total".to_string(), Patch::set(&total)?),
        (
            "non_reimbursable_total".to_string(),
            Patch::set(&non_reimbursable_total)?,
        ),
    ]))
}
