//! Errors the store can produce.
//!
//! The store is in-memory, so the only failure source is converting records
//! to and from their stored JSON form.

use thiserror::Error;

/// Store custom errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("malformed record at \"{key}\": {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
