//! Storage backends for the mirror log.
//!
//! The mirror log is append-only: entries are created once, never updated
//! and never removed. There is deliberately no uniqueness constraint on
//! `(chain, height)`; mirroring the same height twice (e.g. after a reorg)
//! yields two entries.
//!
//! This module provides:
//!
//! - the [`MirrorStore`] and [`VerdictLog`] traits,
//! - an in-memory backend ([`mem::InMemoryMirrorStore`]) for tests,
//! - a RocksDB backend ([`rocksdb::RocksDbMirrorStore`]) for durable nodes.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::threat::{NewVerdict, VerdictRecord};
use crate::types::{MirrorEntry, MirrorId, NewMirrorEntry};

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryMirrorStore;
pub use self::rocksdb::{RocksDbConfig, RocksDbMirrorStore};

/// Storage-level error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying RocksDB error.
    #[error("rocksdb: {0}")]
    RocksDb(#[from] ::rocksdb::Error),
    /// Required column family was not found.
    #[error("missing column family {0:?}")]
    MissingColumnFamily(&'static str),
    #[error("failed to encode record: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode record: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    /// A key or counter value with an unexpected length.
    #[error("corrupted {0}")]
    Corrupted(&'static str),
    /// A writer panicked while holding the append lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Append-only log of mirrored blocks.
///
/// Implementations assign ids and commit timestamps themselves; an append
/// either persists the whole entry or nothing.
pub trait MirrorStore: Send + Sync {
    /// Persists one entry and returns it with its assigned id and commit
    /// timestamp.
    fn append(&self, entry: NewMirrorEntry) -> Result<MirrorEntry, StorageError>;

    /// Returns up to `limit` most recent entries, newest first.
    fn list(&self, limit: usize) -> Result<Vec<MirrorEntry>, StorageError>;

    /// Fetches one entry by id, if present.
    fn get(&self, id: MirrorId) -> Result<Option<MirrorEntry>, StorageError>;

    /// Number of entries ever appended.
    fn count(&self) -> Result<u64, StorageError>;
}

/// Append-only log of threat verdicts, plus per-action counters.
pub trait VerdictLog: Send + Sync {
    fn append_verdict(&self, verdict: NewVerdict) -> Result<VerdictRecord, StorageError>;

    /// Returns up to `limit` most recent verdicts, newest first.
    fn recent_verdicts(&self, limit: usize) -> Result<Vec<VerdictRecord>, StorageError>;

    fn verdict_count(&self) -> Result<u64, StorageError>;

    /// Increments the counter for `action`.
    fn bump_action(&self, action: &str) -> Result<(), StorageError>;

    fn action_counts(&self) -> Result<BTreeMap<String, u64>, StorageError>;
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
