//! Report-action (chat log) records.
//!
//! The entry that matters to reassignment is the *linking* action: an IOU
//! action whose original message references a transaction by id. It is the
//! artifact that renders the expense inline in a conversation and must
//! travel with the transaction when it changes reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Currency;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportActionName {
    Iou,
    Created,
    AddComment,
}

/// What kind of IOU event the original message describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IouMessageKind {
    Create,
    Track,
    Pay,
    Split,
}

/// Write that is still optimistic-only, not yet acknowledged remotely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    Add,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginalMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_report_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_transaction_id: Option<String>,
    pub amount_minor: i64,
    pub currency: Currency,
    pub kind: IouMessageKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportAction {
    pub report_action_id: String,
    pub action_name: ReportActionName,
    pub actor_account_id: i64,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_message: Option<OriginalMessage>,
    /// Thread report spawned from this action, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_report_id: Option<String>,
    /// Error-key to message, as reported by the sync layer.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
    #[serde(default)]
    pub is_optimistic: bool,
}

impl ReportAction {
    /// Creates an IOU action with a fresh id.
    pub fn iou(actor_account_id: i64, message: OriginalMessage, created: DateTime<Utc>) -> Self {
        Self {
            report_action_id: Uuid::new_v4().to_string(),
            action_name: ReportActionName::Iou,
            actor_account_id,
            created,
            original_message: Some(message),
            child_report_id: None,
            errors: BTreeMap::new(),
            pending_action: None,
            is_optimistic: false,
        }
    }

    /// True when this is the linking action for `transaction_id`.
    pub fn links_transaction(&self, transaction_id: &str) -> bool {
        self.original_message
            .as_ref()
            .and_then(|message| message.iou_transaction_id.as_deref())
            .is_some_and(|linked| linked == transaction_id)
    }

    /// Transaction referenced by the original message, if any.
    pub fn linked_transaction_id(&self) -> Option<&str> {
        self.original_message
            .as_ref()
            .and_then(|message| message.iou_transaction_id.as_deref())
    }

    /// True for writes that only ever existed locally; clearing their
    /// errors removes the record instead of patching it.
    pub fn is_optimistic_add(&self) -> bool {
        self.is_optimistic || self.pending_action == Some(PendingAction::Add)
    }
}
