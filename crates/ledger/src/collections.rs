//! Store key layout.
//!
//! Every record lives under `<collection prefix><entity id>`. Report
//! actions are grouped per report: the value under a report-actions key is
//! a map from action id to the action record.

/// Prefix for [`crate::Report`] records.
pub const REPORT: &str = "report_";
/// Prefix for [`crate::Transaction`] records.
pub const TRANSACTION: &str = "transaction_";
/// Prefix for per-report action maps.
pub const REPORT_ACTIONS: &str = "report_actions_";

pub fn report_key(report_id: &str) -> String {
    format!("{REPORT}{report_id}")
}

pub fn transaction_key(transaction_id: &str) -> String {
    format!("{TRANSACTION}{transaction_id}")
}

pub fn report_actions_key(report_id: &str) -> String {
    format!("{REPORT_ACTIONS}{report_id}")
}

/// Recovers the entity id from a full store key.
pub fn id_from_key<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
    key.strip_prefix(prefix)
}
