//! Modal presentation bookkeeping.
//!
//! Several modals can be open at once, stacked, while the platform offers a
//! single linear back-navigation signal. [`ModalStack`] decides which modal
//! owns a given back event, [`History`] models the linear history the host
//! platform keeps, and [`ModalSession`] ties one modal's show/hide
//! lifecycle to both so a back gesture closes exactly one dialog at a time
//! regardless of nesting depth.

pub use history::{History, HistoryEntry};
pub use modal_stack::{ModalEntry, ModalStack};
pub use session::ModalSession;

mod history;
mod modal_stack;
mod session;
