//! Core domain types used by the mirror pipeline.
//!
//! This module defines the chain identifier, the strongly-typed anchor hash,
//! and the block/entry records that flow between fetch adapters, the
//! canonical encoder, and the storage backends. As elsewhere in the crate,
//! the goal is to avoid "naked" byte buffers and strings in public APIs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Block descriptors as produced by fetch adapters.
pub mod block;
/// Persisted mirror log records.
pub mod entry;

pub use block::ChainBlockDescriptor;
pub use entry::{MirrorEntry, MirrorId, NewMirrorEntry};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// External chain that can be mirrored.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Ethereum,
}

impl Chain {
    /// Stable lowercase name, used in canonical payloads, URLs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" => Ok(Chain::Bitcoin),
            "ethereum" => Ok(Chain::Ethereum),
            other => Err(format!("unknown chain: {other}")),
        }
    }
}

/// Strongly-typed anchor hash: `SHA-256(SHA-256(canonical_payload))`.
///
/// This is a single-leaf commitment over one canonical block summary. It is
/// a tamper-evident fingerprint only; no proof of inclusion for individual
/// transactions can be derived from it. The HTTP surface still exposes it
/// under the legacy field name `merkle_root`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AnchorHash(pub [u8; HASH_LEN]);

impl AnchorHash {
    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding, always 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string (no `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(AnchorHash(out))
    }
}

impl fmt::Display for AnchorHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
