//! RocksDB-backed mirror store.
//!
//! This implementation persists the mirror log and the verdict log in a
//! RocksDB instance with dedicated column families:
//!
//! - `"mirrors"`:  maps `MirrorId` (8 bytes, big-endian) -> bincode entry,
//! - `"verdicts"`: maps verdict id (8 bytes, big-endian) -> bincode record,
//! - `"meta"`:     per-action counters under `"action/<name>"` (u64 LE).
//!
//! Big-endian keys make RocksDB's byte-wise ordering match id ordering, so
//! "newest first" is a reverse scan and the next id after a restart is the
//! last key plus one.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{MirrorStore, StorageError, VerdictLog, unix_now};
use crate::threat::{NewVerdict, VerdictRecord};
use crate::types::{MirrorEntry, MirrorId, NewMirrorEntry};

const CF_MIRRORS: &str = "mirrors";
const CF_VERDICTS: &str = "verdicts";
const CF_META: &str = "meta";
const ACTION_PREFIX: &[u8] = b"action/";

/// Configuration for [`RocksDbMirrorStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/mirror-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`MirrorStore`] and [`VerdictLog`].
pub struct RocksDbMirrorStore {
    db: DB,
    /// Next mirror id. Held for the duration of an append so ids are
    /// assigned and written in order.
    next_mirror: Mutex<u64>,
    next_verdict: Mutex<u64>,
    counters: Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|_| StorageError::Poisoned)
}

impl RocksDbMirrorStore {
    /// Opens (or creates) a store at the configured path.
    ///
    /// The `"default"` column family is also created to keep RocksDB happy,
    /// but it is not used.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(CF_MIRRORS, Options::default()),
            ColumnFamilyDescriptor::new(CF_VERDICTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        let mut store = Self {
            db,
            next_mirror: Mutex::new(1),
            next_verdict: Mutex::new(1),
            counters: Mutex::new(()),
        };
        store.next_mirror = Mutex::new(store.last_id(CF_MIRRORS)? + 1);
        store.next_verdict = Mutex::new(store.last_id(CF_VERDICTS)? + 1);

        tracing::info!(
            path = %cfg.path,
            next_mirror_id = store.peek(&store.next_mirror)?,
            "opened mirror store"
        );

        Ok(store)
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or(StorageError::MissingColumnFamily(name))
    }

    fn peek(&self, m: &Mutex<u64>) -> Result<u64, StorageError> {
        Ok(*lock(m)?)
    }

    /// Highest id stored in `cf_name`, or 0 if empty.
    fn last_id(&self, cf_name: &'static str) -> Result<u64, StorageError> {
        let cf = self.cf(cf_name)?;
        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            None => Ok(0),
            Some(item) => {
                let (key, _) = item?;
                MirrorId::from_key(&key)
                    .map(|id| id.0)
                    .ok_or(StorageError::Corrupted("record key length"))
            }
        }
    }

    /// Internal helper: encodes a record (bincode 2, standard config).
    fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, StorageError> {
        Ok(bincode::serde::encode_to_vec(record, bincode::config::standard())?)
    }

    /// Internal helper: decodes a record written by [`Self::encode`].
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
        let (record, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(record)
    }

    fn newest<T: DeserializeOwned>(&self, cf_name: &'static str, limit: usize) -> Result<Vec<T>, StorageError> {
        let cf = self.cf(cf_name)?;
        self.db
            .iterator_cf(&cf, IteratorMode::End)
            .take(limit)
            .map(|item| {
                let (_, value) = item?;
                Self::decode(&value)
            })
            .collect()
    }

    fn action_key(action: &str) -> Vec<u8> {
        let mut key = ACTION_PREFIX.to_vec();
        key.extend_from_slice(action.as_bytes());
        key
    }

    fn decode_counter(bytes: &[u8]) -> Result<u64, StorageError> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| StorageError::Corrupted("action counter length"))?;
        Ok(u64::from_le_bytes(arr))
    }
}

impl MirrorStore for RocksDbMirrorStore {
    fn append(&self, entry: NewMirrorEntry) -> Result<MirrorEntry, StorageError> {
        let cf = self.cf(CF_MIRRORS)?;
        let mut next = lock(&self.next_mirror)?;

        let stored = MirrorEntry::from_new(MirrorId(*next), unix_now(), entry);
        let bytes = Self::encode(&stored)?;
        self.db.put_cf(&cf, stored.id.to_key(), bytes)?;

        // Only advance once the write is durable in the memtable/WAL.
        *next += 1;
        Ok(stored)
    }

    fn list(&self, limit: usize) -> Result<Vec<MirrorEntry>, StorageError> {
        self.newest(CF_MIRRORS, limit)
    }

    fn get(&self, id: MirrorId) -> Result<Option<MirrorEntry>, StorageError> {
        let cf = self.cf(CF_MIRRORS)?;
        match self.db.get_cf(&cf, id.to_key())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
        }
    }

    fn count(&self) -> Result<u64, StorageError> {
        Ok(self.peek(&self.next_mirror)? - 1)
    }
}

impl VerdictLog for RocksDbMirrorStore {
    fn append_verdict(&self, verdict: NewVerdict) -> Result<VerdictRecord, StorageError> {
        let cf = self.cf(CF_VERDICTS)?;
        let mut next = lock(&self.next_verdict)?;

        let record = VerdictRecord::from_new(*next, unix_now(), verdict);
        let bytes = Self::encode(&record)?;
        self.db.put_cf(&cf, record.id.to_be_bytes(), bytes)?;

        *next += 1;
        Ok(record)
    }

    fn recent_verdicts(&self, limit: usize) -> Result<Vec<VerdictRecord>, StorageError> {
        self.newest(CF_VERDICTS, limit)
    }

    fn verdict_count(&self) -> Result<u64, StorageError> {
        Ok(self.peek(&self.next_verdict)? - 1)
    }

    fn bump_action(&self, action: &str) -> Result<(), StorageError> {
        let cf = self.cf(CF_META)?;
        let key = Self::action_key(action);

        let _guard = lock(&self.counters)?;
        let current = match self.db.get_cf(&cf, &key)? {
            None => 0,
            Some(bytes) => Self::decode_counter(&bytes)?,
        };
        self.db.put_cf(&cf, &key, (current + 1).to_le_bytes())?;
        Ok(())
    }

    fn action_counts(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        let cf = self.cf(CF_META)?;
        let mut out = BTreeMap::new();

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(ACTION_PREFIX, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            let Some(name) = key.strip_prefix(ACTION_PREFIX) else {
                break;
            };
            out.insert(
                String::from_utf8_lossy(name).into_owned(),
                Self::decode_counter(&value)?,
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnchorHash, Chain, HASH_LEN};
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> RocksDbMirrorStore {
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        RocksDbMirrorStore::open(&cfg).expect("open RocksDB")
    }

    fn dummy_entry(height: u64) -> NewMirrorEntry {
        NewMirrorEntry {
            chain: Chain::Bitcoin,
            height: Some(height),
            block_hash: Some(format!("{height:064x}")),
            anchor: AnchorHash([height as u8; HASH_LEN]),
            payload: format!("{{\"height\":{height}}}").into_bytes(),
        }
    }

    fn dummy_verdict(action: &str) -> NewVerdict {
        NewVerdict {
            tx_hash: "0xdead".to_string(),
            threat_score: 0.5,
            action: action.to_string(),
            verdict_json: format!("{{\"action\":\"{action}\"}}"),
        }
    }

    #[test]
    fn rocksdb_store_roundtrip_entry() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = open(&tmp);

        let stored = store.append(dummy_entry(42)).unwrap();
        assert_eq!(stored.id, MirrorId(1));

        let fetched = store.get(stored.id).unwrap().expect("entry should exist");
        assert_eq!(fetched, stored);
        assert!(store.get(MirrorId(2)).unwrap().is_none());
    }

    #[test]
    fn same_height_twice_yields_two_entries() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = open(&tmp);

        let a = store.append(dummy_entry(7)).unwrap();
        let b = store.append(dummy_entry(7)).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get(a.id).unwrap().unwrap().height, Some(7));
        assert_eq!(store.get(b.id).unwrap().unwrap().height, Some(7));
    }

    #[test]
    fn list_is_newest_first_across_key_byte_boundaries() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = open(&tmp);

        for h in 0..300 {
            store.append(dummy_entry(h)).unwrap();
        }

        let ids: Vec<u64> = store.list(3).unwrap().iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![300, 299, 298]);
        assert_eq!(store.list(1000).unwrap().len(), 300);
    }

    #[test]
    fn entries_and_ids_survive_reopen() {
        let tmp = TempDir::new().expect("create temp dir");

        let first = {
            let store = open(&tmp);
            store.append(dummy_entry(1)).unwrap();
            store.append(dummy_entry(2)).unwrap()
        };

        let store = open(&tmp);
        assert_eq!(store.get(first.id).unwrap().unwrap(), first);

        let third = store.append(dummy_entry(3)).unwrap();
        assert_eq!(third.id, MirrorId(3));
    }

    #[test]
    fn verdicts_and_counters_persist() {
        let tmp = TempDir::new().expect("create temp dir");

        {
            let store = open(&tmp);
            store.append_verdict(dummy_verdict("FLAG")).unwrap();
            store.bump_action("FLAG").unwrap();
            store.bump_action("FLAG").unwrap();
            store.bump_action("ALLOW").unwrap();
        }

        let store = open(&tmp);
        let second = store.append_verdict(dummy_verdict("ALLOW")).unwrap();
        assert_eq!(second.id, 2);

        let recent = store.recent_verdicts(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "ALLOW");
        assert_eq!(store.verdict_count().unwrap(), 2);

        let counts = store.action_counts().unwrap();
        assert_eq!(counts.get("FLAG"), Some(&2));
        assert_eq!(counts.get("ALLOW"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
