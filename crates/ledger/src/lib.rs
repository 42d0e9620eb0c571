//! Business mutations for the expense store.
//!
//! The [`Ledger`] wraps a [`Store`] handle and issues optimistic local
//! mutations against it: reassigning transactions between expense reports
//! (keeping the reports' cached totals and linking chat actions
//! consistent) and clearing stored errors on report actions. It is a
//! fire-and-forget mutation issuer: persistence and sync failures belong
//! to the store layer and are never retried or rolled back here.

use std::collections::BTreeMap;

pub use currency::Currency;
pub use error::LedgerError;
pub use report_actions::{
    IouMessageKind, OriginalMessage, PendingAction, ReportAction, ReportActionName,
};
pub use reports::{
    ChatType, Report, ReportKind, ReportState, ReportStatus, UNREPORTED_REPORT_ID,
};
use store::Store;
pub use transactions::{Attendee, Transaction};

pub mod collections;
mod currency;
mod error;
mod ops;
mod report_actions;
mod reports;
mod transactions;

type ResultLedger<T> = Result<T, LedgerError>;

/// Handle over the store for expense-report mutations.
///
/// Cloning is cheap; all clones share the underlying store.
#[derive(Clone)]
pub struct Ledger {
    store: Store,
}

impl Ledger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns a report by id.
    pub async fn report(&self, report_id: &str) -> ResultLedger<Report> {
        self.find_report(report_id)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(report_id.to_string()))
    }

    pub async fn find_report(&self, report_id: &str) -> ResultLedger<Option<Report>> {
        Ok(self.store.get(&collections::report_key(report_id)).await?)
    }

    /// Returns a transaction by id.
    pub async fn transaction(&self, transaction_id: &str) -> ResultLedger<Transaction> {
        self.find_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound(transaction_id.to_string()))
    }

    pub async fn find_transaction(
        &self,
        transaction_id: &str,
    ) -> ResultLedger<Option<Transaction>> {
        Ok(self
            .store
            .get(&collections::transaction_key(transaction_id))
            .await?)
    }

    /// Returns a report's action map; an absent record is an empty map.
    pub async fn report_actions(
        &self,
        report_id: &str,
    ) -> ResultLedger<BTreeMap<String, ReportAction>> {
        Ok(self
            .store
            .get(&collections::report_actions_key(report_id))
            .await?
            .unwrap_or_default())
    }

    /// Finds the linking action for a transaction, wherever it is stored.
    ///
    /// Unreported expenses keep their IOU action under the submitter's
    /// self-DM, so the scan covers every report's action map, not just the
    /// transaction's current report. Returns the holding report id with
    /// the action.
    pub async fn find_linking_action(
        &self,
        transaction_id: &str,
    ) -> ResultLedger<Option<(String, ReportAction)>> {
        let action_maps = self
            .store
            .collection::<BTreeMap<String, ReportAction>>(collections::REPORT_ACTIONS)
            .await?;

        for (key, actions) in action_maps {
            let Some(report_id) = collections::id_from_key(collections::REPORT_ACTIONS, &key)
            else {
                continue;
            };
            for action in actions.values() {
                if action.links_transaction(transaction_id) {
                    return Ok(Some((report_id.to_string(), action.clone())));
                }
            }
        }
        Ok(None)
    }
}
