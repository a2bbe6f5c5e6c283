//! Bounded error histories shared between utilities.
//!
//! The store maps an owner identity to its records in chronological order.
//! It is meant to be created once and shared (`Arc<LogStore>`) by every
//! utility that should see the same histories.

use crate::application::ports::Storage;
use crate::domain::record::{ErrorRecord, OwnerId};
use crate::infrastructure::storage::ShardedStorage;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Default storage backing a [`LogStore`].
pub type HistoryStorage = Arc<ShardedStorage<OwnerId, VecDeque<ErrorRecord>>>;

/// Thread-safe store of bounded, FIFO-trimmed error histories.
///
/// Appending and trimming happen inside one storage access, so readers never
/// see a history that is partially appended or partially trimmed, and a
/// history never stays above its capacity.
pub struct LogStore<S = HistoryStorage>
where
    S: Storage<OwnerId, VecDeque<ErrorRecord>>,
{
    storage: S,
}

impl LogStore {
    /// Create an empty store with the default sharded storage.
    pub fn new() -> Self {
        Self::with_storage(Arc::new(ShardedStorage::new()))
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> LogStore<S>
where
    S: Storage<OwnerId, VecDeque<ErrorRecord>>,
{
    pub fn with_storage(storage: S) -> Self {
        Self { storage }
    }

    /// Append a record to `owner`'s history, then trim the oldest records
    /// until at most `keep_entries` remain.
    ///
    /// Returns the number of records trimmed.
    pub fn append(&self, owner: OwnerId, record: ErrorRecord, keep_entries: usize) -> usize {
        self.storage.with_entry_mut(owner, VecDeque::new, |history| {
            history.push_back(record);
            let excess = history.len().saturating_sub(keep_entries);
            history.drain(..excess);
            excess
        })
    }

    /// Copies of `owner`'s records, most recent first.
    pub fn entries(&self, owner: OwnerId) -> Vec<ErrorRecord> {
        self.storage
            .read(&owner, |history| history.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy of the record with the given id, if `owner` has one.
    pub fn entry_by_id(&self, owner: OwnerId, id: &str) -> Option<ErrorRecord> {
        self.storage
            .read(&owner, |history| {
                history.iter().find(|record| record.id == id).cloned()
            })
            .flatten()
    }

    /// Number of records currently held for `owner`.
    pub fn len(&self, owner: OwnerId) -> usize {
        self.storage.read(&owner, VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self, owner: OwnerId) -> bool {
        self.len(owner) == 0
    }

    /// Drop every owner's history.
    ///
    /// Administrative reset; not part of steady-state operation.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl<S> fmt::Debug for LogStore<S>
where
    S: Storage<OwnerId, VecDeque<ErrorRecord>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore")
            .field("owners", &self.storage.len())
            .finish()
    }
}
