//! Clearing stored errors on report actions.

use std::collections::{HashSet, VecDeque};

use store::{Patch, UpdateBatch};

use crate::{Ledger, ReportAction, ResultLedger, collections};

impl Ledger {
    /// Clears errors stored on one report action.
    ///
    /// Optimistic actions (local-only writes that failed) are deleted
    /// outright together with their linked transaction record. For
    /// acknowledged actions, only the named error keys are cleared, or the
    /// whole error map when `keys` is `None`.
    pub async fn clear_report_action_errors(
        &self,
        report_id: &str,
        action: &ReportAction,
        keys: Option<&[String]>,
    ) -> ResultLedger<()> {
        if action.is_optimistic_add() {
            let mut batch = UpdateBatch::new();
            batch.merge(
                collections::report_actions_key(report_id),
                Patch::field(action.report_action_id.clone(), Patch::Delete),
            );
            if let Some(transaction_id) = action.linked_transaction_id() {
                batch.remove(collections::transaction_key(transaction_id));
            }
            self.store().apply(batch).await;
            return Ok(());
        }

        let errors_patch = match keys {
            Some(keys) if keys.is_empty() => return Ok(()),
            Some(keys) => Patch::merge(
                keys.iter()
                    .map(|key| (key.clone(), Patch::Delete)),
            ),
            None => Patch::Delete,
        };

        self.store()
            .merge(
                &collections::report_actions_key(report_id),
                Patch::field(
                    action.report_action_id.clone(),
                    Patch::field("errors", errors_patch),
                ),
            )
            .await;
        Ok(())
    }

    /// Clears the action's errors and the matching error keys on every
    /// related action reachable over parent and child report links.
    ///
    /// Parent/child chains can form cycles, so traversal carries a visited
    /// set keyed by `(report id, action id)` and terminates regardless of
    /// the link structure.
    pub async fn clear_all_related_report_action_errors(
        &self,
        report_id: &str,
        action: &ReportAction,
    ) -> ResultLedger<()> {
        let error_keys: Vec<String> = action.errors.keys().cloned().collect();
        if error_keys.is_empty() {
            return Ok(());
        }

        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut queue: VecDeque<(String, ReportAction, Vec<String>)> = VecDeque::new();
        queue.push_back((report_id.to_string(), action.clone(), error_keys));

        while let Some((report_id, action, keys)) = queue.pop_front() {
            if keys.is_empty() {
                continue;
            }
            if !visited.insert((report_id.clone(), action.report_action_id.clone())) {
                continue;
            }

            self.clear_report_action_errors(&report_id, &action, Some(&keys))
                .await?;

            // The report's own parent thread action.
            if let Some(report) = self.find_report(&report_id).await?
                && let (Some(parent_report_id), Some(parent_action_id)) =
                    (report.parent_report_id, report.parent_report_action_id)
            {
                let parent_actions = self.report_actions(&parent_report_id).await?;
                if let Some(parent) = parent_actions.get(&parent_action_id) {
                    let shared = shared_keys(parent, &keys);
                    queue.push_back((parent_report_id, parent.clone(), shared));
                }
            }

            // Actions of the thread spawned from this one.
            if let Some(child_report_id) = action.child_report_id {
                for child in self.report_actions(&child_report_id).await?.values() {
                    let shared = shared_keys(child, &keys);
                    queue.push_back((child_report_id.clone(), child.clone(), shared));
                }
            }
        }

        Ok(())
    }
}

fn shared_keys(action: &ReportAction, keys: &[String]) -> Vec<String> {
    action
        .errors
        .keys()
        .filter(|key| keys.contains(key))
        .cloned()
        .collect()
}
