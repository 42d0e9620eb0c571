//! Typed partial updates.
//!
//! A [`Patch`] describes what a merge does to one position of a stored
//! record: delete it, replace it, or merge deeper into it. Deleting is a
//! first-class variant instead of a magic null payload, so a merge that
//! clears a nested entry reads as exactly that at the call site.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::StoreError;

/// Partial update applied to one stored value.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// Remove the value at this position entirely.
    Delete,
    /// Replace the value at this position.
    Set(Value),
    /// Merge field patches into the object at this position, creating the
    /// object when it is missing or not an object.
    Merge(BTreeMap<String, Patch>),
}

impl Patch {
    /// Builds a `Set` patch from any serializable record.
    pub fn set<T: Serialize>(record: &T) -> Result<Self, StoreError> {
        Ok(Self::Set(serde_json::to_value(record)?))
    }

    /// Builds a `Merge` patch from `(field, patch)` pairs.
    pub fn merge<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, Patch)>,
    {
        Self::Merge(fields.into_iter().collect())
    }

    /// Builds a `Merge` patch touching a single field.
    pub fn field(name: impl Into<String>, patch: Patch) -> Self {
        Self::Merge(BTreeMap::from([(name.into(), patch)]))
    }

    /// Applies the patch to a slot, where `None` means "no value stored".
    pub(crate) fn apply_to(self, slot: &mut Option<Value>) {
        match self {
            Self::Delete => *slot = None,
            Self::Set(value) => *slot = Some(value),
            Self::Merge(fields) => {
                if !matches!(slot, Some(Value::Object(_))) {
                    *slot = Some(Value::Object(serde_json::Map::new()));
                }
                if let Some(Value::Object(object)) = slot {
                    for (name, patch) in fields {
                        let mut entry = object.remove(&name);
                        patch.apply_to(&mut entry);
                        if let Some(value) = entry {
                            object.insert(name, value);
                        }
                    }
                }
            }
        }
    }
}
