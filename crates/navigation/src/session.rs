//! Per-modal lifecycle against the stack and the history.
//!
//! A [`ModalSession`] is what a modal component holds while it is mounted.
//! It reproduces the open/close choreography: opening registers the modal
//! and pushes a marked history entry; a pop notification closes the modal
//! only when it owns the top of the stack; closing through any other path
//! pops the modal's own history entry so history stays balanced.

use uuid::Uuid;

use crate::{History, HistoryEntry, ModalStack};

#[derive(Clone, Debug)]
pub struct ModalSession {
    modal_id: String,
    handles_navigation_back: bool,
}

impl ModalSession {
    /// Binds a session to an explicit modal id.
    ///
    /// Sessions with `handles_navigation_back` false never touch the stack
    /// or history and close on every pop notification; they exist for
    /// modals whose dismissal is managed elsewhere.
    pub fn new(modal_id: impl Into<String>, handles_navigation_back: bool) -> Self {
        Self {
            modal_id: modal_id.into(),
            handles_navigation_back,
        }
    }

    /// Session with a generated unique id.
    pub fn generate(handles_navigation_back: bool) -> Self {
        Self::new(format!("modal-{}", Uuid::new_v4()), handles_navigation_back)
    }

    pub fn modal_id(&self) -> &str {
        &self.modal_id
    }

    /// Called when the modal becomes visible.
    pub fn shown(&self, stack: &mut ModalStack, history: &mut History) {
        if !self.handles_navigation_back {
            return;
        }
        stack.register_modal(&self.modal_id);
        history.push_state(HistoryEntry::for_modal(&self.modal_id));
    }

    /// Pop-notification handler for a user back gesture.
    ///
    /// Invokes `close` and reports true when this modal should dismiss in
    /// response; lower modals leave the event alone.
    pub fn handle_history_pop(&self, stack: &ModalStack, close: impl FnOnce()) -> bool {
        if !self.handles_navigation_back {
            close();
            return true;
        }
        stack.handle_back_navigation(&self.modal_id, close)
    }

    /// Called after the modal is gone, whatever closed it.
    ///
    /// Unregisters from the stack, then pops this modal's own history
    /// entry when it is still on top. A close initiated by a back gesture
    /// already consumed the entry, so nothing is popped twice; the popped
    /// entry is returned for the caller to swallow, never to redispatch.
    pub fn hidden(&self, stack: &mut ModalStack, history: &mut History) -> Option<HistoryEntry> {
        if self.handles_navigation_back {
            stack.unregister_modal(&self.modal_id);
        }
        if history
            .current()
            .is_some_and(|entry| entry.belongs_to(&self.modal_id))
        {
            return history.back();
        }
        None
    }
}
