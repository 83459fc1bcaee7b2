//! Current and previous field values
//!
//! The worker owns a [`SnapshotStore`] outright; callers only ever see cloned
//! [`Snapshot`]s.

use std::collections::BTreeMap;

use raildriver_api::FieldValue;
use serde::Serialize;

/// Field values recorded during one poll iteration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    values: BTreeMap<String, FieldValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A detected difference between two iterations
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub new: FieldValue,
    pub old: FieldValue,
}

/// Snapshot pair plus the iteration counter of a polling run
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Snapshot,
    previous: Snapshot,
    iteration: u64,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new iteration
    ///
    /// Bumps the counter and copies `current` into `previous`. Returns the
    /// new iteration number, which is 1 on the first pass.
    pub fn begin_iteration(&mut self) -> u64 {
        self.iteration += 1;
        self.previous = self.current.clone();
        self.iteration
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// First pass of a run has no baseline to compare against
    pub fn is_first_iteration(&self) -> bool {
        self.iteration <= 1
    }

    /// Store a freshly read value and report whether it changed
    ///
    /// No change is reported on the first iteration, nor when the previous
    /// snapshot has no value for `key` (the field was just subscribed or has
    /// reappeared after being dropped).
    pub fn record(&mut self, key: &str, value: FieldValue) -> Option<FieldChange> {
        let change = match self.previous.get(key) {
            Some(old) if !self.is_first_iteration() && *old != value => Some(FieldChange {
                new: value.clone(),
                old: old.clone(),
            }),
            _ => None,
        };
        self.current.insert(key, value);
        change
    }

    /// Drop a field from the current snapshot entirely
    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.current.remove(key)
    }

    /// Keep only the current entries whose key passes `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.current.values.retain(|key, _| keep(key));
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }
}
