//! Mirror log records.

use serde::{Deserialize, Serialize};

use super::{AnchorHash, Chain};

/// Identifier assigned by the store on append. Strictly increasing, never
/// reused, starting at 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MirrorId(pub u64);

impl MirrorId {
    /// Big-endian key bytes, so that lexicographic key order in the store
    /// matches numeric id order.
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_key(key: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = key.try_into().ok()?;
        Some(MirrorId(u64::from_be_bytes(bytes)))
    }
}

impl std::fmt::Display for MirrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully-formed entry waiting to be appended.
///
/// Everything except the id and the commit timestamp is known before the
/// store is touched; the store fills in the rest atomically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMirrorEntry {
    pub chain: Chain,
    pub height: Option<u64>,
    pub block_hash: Option<String>,
    pub anchor: AnchorHash,
    /// Canonical payload bytes, stored verbatim for replay and audit.
    pub payload: Vec<u8>,
}

/// One immutable record of the append-only mirror log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
    pub id: MirrorId,
    pub chain: Chain,
    pub height: Option<u64>,
    pub block_hash: Option<String>,
    pub anchor: AnchorHash,
    /// Wall-clock time (seconds since Unix epoch) at which the store
    /// accepted the entry. Unrelated to the block's own timestamp.
    pub committed_at: u64,
    pub payload: Vec<u8>,
}

impl MirrorEntry {
    /// Assembles a stored entry from a pending one.
    pub fn from_new(id: MirrorId, committed_at: u64, new: NewMirrorEntry) -> Self {
        Self {
            id,
            chain: new.chain,
            height: new.height,
            block_hash: new.block_hash,
            anchor: new.anchor,
            committed_at,
            payload: new.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_id_keys_sort_numerically() {
        let ids = [1u64, 2, 255, 256, 70_000];
        let mut keys: Vec<[u8; 8]> = ids.iter().map(|i| MirrorId(*i).to_key()).collect();
        keys.sort();
        let back: Vec<u64> = keys
            .iter()
            .map(|k| MirrorId::from_key(k).unwrap().0)
            .collect();
        assert_eq!(back, ids);
    }

    #[test]
    fn mirror_id_from_key_rejects_short_keys() {
        assert!(MirrorId::from_key(b"tip").is_none());
    }
}
