//! In-memory mirror store.
//!
//! Useful for unit tests and offline runs. Follows the same contracts as
//! the RocksDB backend except durability: everything is lost on drop.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{MirrorStore, StorageError, VerdictLog, unix_now};
use crate::threat::{NewVerdict, VerdictRecord};
use crate::types::{MirrorEntry, MirrorId, NewMirrorEntry};

/// In-memory implementation of [`MirrorStore`] and [`VerdictLog`].
#[derive(Default)]
pub struct InMemoryMirrorStore {
    entries: Mutex<Vec<MirrorEntry>>,
    verdicts: Mutex<Vec<VerdictRecord>>,
    actions: Mutex<BTreeMap<String, u64>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|_| StorageError::Poisoned)
}

impl InMemoryMirrorStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorStore for InMemoryMirrorStore {
    fn append(&self, entry: NewMirrorEntry) -> Result<MirrorEntry, StorageError> {
        let mut entries = lock(&self.entries)?;
        let id = MirrorId(entries.len() as u64 + 1);
        let stored = MirrorEntry::from_new(id, unix_now(), entry);
        entries.push(stored.clone());
        Ok(stored)
    }

    fn list(&self, limit: usize) -> Result<Vec<MirrorEntry>, StorageError> {
        let entries = lock(&self.entries)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    fn get(&self, id: MirrorId) -> Result<Option<MirrorEntry>, StorageError> {
        let entries = lock(&self.entries)?;
        // Ids are dense and start at 1.
        let found = id
            .0
            .checked_sub(1)
            .and_then(|idx| entries.get(idx as usize))
            .cloned();
        Ok(found)
    }

    fn count(&self) -> Result<u64, StorageError> {
        Ok(lock(&self.entries)?.len() as u64)
    }
}

impl VerdictLog for InMemoryMirrorStore {
    fn append_verdict(&self, verdict: NewVerdict) -> Result<VerdictRecord, StorageError> {
        let mut verdicts = lock(&self.verdicts)?;
        let record = VerdictRecord::from_new(verdicts.len() as u64 + 1, unix_now(), verdict);
        verdicts.push(record.clone());
        Ok(record)
    }

    fn recent_verdicts(&self, limit: usize) -> Result<Vec<VerdictRecord>, StorageError> {
        let verdicts = lock(&self.verdicts)?;
        Ok(verdicts.iter().rev().take(limit).cloned().collect())
    }

    fn verdict_count(&self) -> Result<u64, StorageError> {
        Ok(lock(&self.verdicts)?.len() as u64)
    }

    fn bump_action(&self, action: &str) -> Result<(), StorageError> {
        *lock(&self.actions)?.entry(action.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn action_counts(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        Ok(lock(&self.actions)?.clone())
    }
}
