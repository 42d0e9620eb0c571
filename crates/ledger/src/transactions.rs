//! Expense transaction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, reports::UNREPORTED_REPORT_ID};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    /// Owning report, or [`UNREPORTED_REPORT_ID`] when not yet reported.
    pub report_id: String,
    /// Signed amount in minor currency units.
    pub amount_minor: i64,
    pub currency: Currency,
    /// Whether the amount is owed back to the submitter. Non-reimbursable
    /// amounts additionally feed the owning report's
    /// `non_reimbursable_total` cache.
    #[serde(default = "reimbursable_default")]
    pub reimbursable: bool,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    pub created: DateTime<Utc>,
}

fn reimbursable_default() -> bool {
    true
}

impl Transaction {
    /// Creates a reimbursable transaction with a fresh id.
    pub fn new(
        report_id: impl Into<String>,
        amount_minor: i64,
        currency: Currency,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4().to_string(),
            report_id: report_id.into(),
            amount_minor,
            currency,
            reimbursable: true,
            comment: String::new(),
            attendees: Vec::new(),
            created,
        }
    }

    /// Creates a transaction not yet attached to any report.
    pub fn unreported(amount_minor: i64, currency: Currency, created: DateTime<Utc>) -> Self {
        Self::new(UNREPORTED_REPORT_ID, amount_minor, currency, created)
    }

    pub fn is_unreported(&self) -> bool {
        self.report_id == UNREPORTED_REPORT_ID
    }
}
