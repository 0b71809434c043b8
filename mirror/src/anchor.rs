//! Anchor commitment over canonical payloads.
//!
//! The anchor is `SHA-256(SHA-256(payload))`, the same double hash Bitcoin
//! uses for block and transaction ids. It commits to one canonical payload
//! as a whole; it is not a Merkle root over the block's transactions.

use sha2::{Digest, Sha256};

use crate::types::{AnchorHash, HASH_LEN};

/// Single SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 of `data`. Used for synthetic ids in the mock
/// fetcher.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Computes the anchor hash of a canonical payload.
pub fn commit(payload: &[u8]) -> AnchorHash {
    AnchorHash(sha256(&sha256(payload)))
}
