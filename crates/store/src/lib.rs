//! Reactive key-value store backing the expense ledger and its UI layers.
//!
//! Records are JSON values stored under string keys; collections share a key
//! prefix (`report_` + report id, and so on). Mutations go through [`Store::set`],
//! [`Store::merge`], or an atomic multi-key [`Store::apply`]; readers either
//! take typed snapshots or subscribe with [`Store::connect`] and receive the
//! current value plus every later change.
//!
//! The store is process-lifetime and in-memory. [`Store::init_with`] and
//! [`Store::snapshot`] move the whole key space in and out for test seeding
//! and operator tooling; durable persistence is somebody else's job.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::RwLock;

pub use error::StoreError;
pub use patch::Patch;

mod error;
mod patch;

type ResultStore<T> = Result<T, StoreError>;
type Callback = Arc<dyn Fn(&str, Option<&Value>) + Send + Sync>;

/// What a subscription watches: one exact key, or every key underneath a
/// collection prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectTarget {
    Key(String),
    Collection(String),
}

impl ConnectTarget {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::Key(watched) => watched == key,
            Self::Collection(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

/// Handle returned by [`Store::connect`], used to disconnect later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

struct Subscriber {
    target: ConnectTarget,
    callback: Callback,
}

/// A set of key mutations committed as one indivisible update.
///
/// Readers never observe a partially-applied batch, and subscribers are
/// notified once per changed key with post-commit values. This is what lets
/// a caller move a nested entry from one collection to another without any
/// observer seeing it in neither or both.
#[derive(Default)]
pub struct UpdateBatch {
    entries: Vec<(String, UpdateOp)>,
}

enum UpdateOp {
    Replace(Option<Value>),
    Patch(Patch),
}

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a full replacement of `key`.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, record: &T) -> ResultStore<()> {
        let value = serde_json::to_value(record)?;
        self.entries
            .push((key.into(), UpdateOp::Replace(Some(value))));
        Ok(())
    }

    /// Queues removal of the whole record at `key`.
    pub fn remove(&mut self, key: impl Into<String>) {
        self.entries.push((key.into(), UpdateOp::Replace(None)));
    }

    /// Queues a partial update of `key`.
    pub fn merge(&mut self, key: impl Into<String>, patch: Patch) {
        self.entries.push((key.into(), UpdateOp::Patch(patch)));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, Value>,
    subscribers: HashMap<u64, Subscriber>,
    next_connection: u64,
}

/// Shared handle to the reactive store.
///
/// Cloning is cheap; all clones observe the same key space.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the record at `key`.
    pub async fn set<T: Serialize>(&self, key: &str, record: &T) -> ResultStore<()> {
        let mut batch = UpdateBatch::new();
        batch.set(key, record)?;
        self.apply(batch).await;
        Ok(())
    }

    /// Deletes the record at `key`; absent keys are a no-op.
    pub async fn remove(&self, key: &str) {
        let mut batch = UpdateBatch::new();
        batch.remove(key);
        self.apply(batch).await;
    }

    /// Applies a partial update to the record at `key`, creating it when the
    /// patch leaves something behind.
    pub async fn merge(&self, key: &str, patch: Patch) {
        let mut batch = UpdateBatch::new();
        batch.merge(key, patch);
        self.apply(batch).await;
    }

    /// Commits every entry of `batch` as one indivisible update, then
    /// notifies subscribers of each changed key.
    pub async fn apply(&self, batch: UpdateBatch) {
        if batch.is_empty() {
            return;
        }

        let mut notifications: Vec<(Callback, String, Option<Value>)> = Vec::new();
        {
            let mut inner = self.inner.write().await;
            let mut changed: BTreeMap<String, Option<Value>> = BTreeMap::new();

            for (key, op) in batch.entries {
                let mut slot = inner.records.remove(&key);
                match op {
                    UpdateOp::Replace(value) => slot = value,
                    UpdateOp::Patch(patch) => patch.apply_to(&mut slot),
                }
                if let Some(value) = &slot {
                    inner.records.insert(key.clone(), value.clone());
                }
                changed.insert(key, slot);
            }

            for (key, value) in changed {
                for subscriber in inner.subscribers.values() {
                    if subscriber.target.matches(&key) {
                        notifications.push((
                            Arc::clone(&subscriber.callback),
                            key.clone(),
                            value.clone(),
                        ));
                    }
                }
            }
        }

        for (callback, key, value) in notifications {
            callback(&key, value.as_ref());
        }
    }

    /// Returns the raw JSON value stored at `key`.
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.inner.read().await.records.get(key).cloned()
    }

    /// Returns the typed record stored at `key`, or `None` when absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> ResultStore<Option<T>> {
        match self.get_raw(key).await {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Malformed {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Returns every raw record whose key starts with `prefix`.
    pub async fn collection_raw(&self, prefix: &str) -> BTreeMap<String, Value> {
        let inner = self.inner.read().await;
        inner
            .records
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns every typed record whose key starts with `prefix`, keyed by
    /// full store key.
    pub async fn collection<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> ResultStore<BTreeMap<String, T>> {
        let raw = self.collection_raw(prefix).await;
        let mut records = BTreeMap::new();
        for (key, value) in raw {
            let record =
                serde_json::from_value(value).map_err(|source| StoreError::Malformed {
                    key: key.clone(),
                    source,
                })?;
            records.insert(key, record);
        }
        Ok(records)
    }

    /// Subscribes `callback` to a key or collection.
    ///
    /// The callback fires immediately with whatever is currently stored
    /// (including "nothing" for an absent exact key) and again after every
    /// change committed while the subscription lives.
    pub async fn connect<F>(&self, target: ConnectTarget, callback: F) -> ConnectionId
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let mut current: Vec<(String, Option<Value>)> = Vec::new();

        let id = {
            let mut inner = self.inner.write().await;
            match &target {
                ConnectTarget::Key(key) => {
                    current.push((key.clone(), inner.records.get(key).cloned()));
                }
                ConnectTarget::Collection(prefix) => {
                    for (key, value) in &inner.records {
                        if key.starts_with(prefix.as_str()) {
                            current.push((key.clone(), Some(value.clone())));
                        }
                    }
                }
            }

            let id = inner.next_connection;
            inner.next_connection += 1;
            inner.subscribers.insert(
                id,
                Subscriber {
                    target,
                    callback: Arc::clone(&callback),
                },
            );
            ConnectionId(id)
        };

        for (key, value) in current {
            callback(&key, value.as_ref());
        }
        id
    }

    /// Drops a subscription; unknown ids are a silent no-op.
    pub async fn disconnect(&self, id: ConnectionId) {
        self.inner.write().await.subscribers.remove(&id.0);
    }

    /// Replaces the entire key space with `records` and notifies
    /// subscribers of every key that now holds a value.
    pub async fn init_with(&self, records: BTreeMap<String, Value>) {
        let mut notifications: Vec<(Callback, String, Option<Value>)> = Vec::new();
        {
            let mut inner = self.inner.write().await;
            inner.records = records
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            for (key, value) in records {
                for subscriber in inner.subscribers.values() {
                    if subscriber.target.matches(&key) {
                        notifications.push((
                            Arc::clone(&subscriber.callback),
                            key.clone(),
                            Some(value.clone()),
                        ));
                    }
                }
            }
        }
        for (callback, key, value) in notifications {
            callback(&key, value.as_ref());
        }
    }

    /// Copies the entire raw key space out, e.g. to write a snapshot file.
    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        let inner = self.inner.read().await;
        inner
            .records
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
