//! Expense-report records and their cached aggregates.
//!
//! `total` and `non_reimbursable_total` are caches maintained
//! incrementally by the mutation operations (add at the destination,
//! subtract at the source); nothing here ever recomputes them from the
//! contained transactions.

use serde::{Deserialize, Serialize};

/// Sentinel report id for transactions not yet attached to any report.
pub const UNREPORTED_REPORT_ID: &str = "0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Expense,
    Chat,
    Iou,
}

/// Chat flavor for `ReportKind::Chat` rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    SelfDm,
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Open,
    Submitted,
    Approved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Submitted,
    Approved,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: String,
    pub owner_account_id: i64,
    pub kind: ReportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<ChatType>,
    pub state: ReportState,
    pub status: ReportStatus,
    /// Sum of contained transactions' amounts, in minor units.
    #[serde(default)]
    pub total: i64,
    /// Sum of contained non-reimbursable transactions' amounts.
    #[serde(default)]
    pub non_reimbursable_total: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_report_action_id: Option<String>,
}

impl Report {
    /// Creates an open expense report with zeroed totals.
    pub fn expense(report_id: impl Into<String>, owner_account_id: i64) -> Self {
        Self {
            report_id: report_id.into(),
            owner_account_id,
            kind: ReportKind::Expense,
            chat_type: None,
            state: ReportState::Open,
            status: ReportStatus::Open,
            total: 0,
            non_reimbursable_total: 0,
            parent_report_id: None,
            parent_report_action_id: None,
        }
    }

    /// Creates the self-DM chat report that holds unreported expenses.
    pub fn self_dm(report_id: impl Into<String>, owner_account_id: i64) -> Self {
        Self {
            kind: ReportKind::Chat,
            chat_type: Some(ChatType::SelfDm),
            ..Self::expense(report_id, owner_account_id)
        }
    }
}
