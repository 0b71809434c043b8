//! Temporal-lock puzzle descriptors and their fixed-width encoding.
//!
//! Downstream consumers (a Substrate pallet among them) parse the puzzle as
//! three fixed-size SCALE primitives laid out back to back:
//!
//! | bytes      | field              | encoding        |
//! |------------|--------------------|-----------------|
//! | `[0, 8)`   | `reveal_time`      | `u64` LE        |
//! | `[8, 12)`  | `hash_chain_depth` | `u32` LE        |
//! | `[12, 44)` | `initial_hash`     | 32 raw bytes    |
//!
//! Fixed-size integers and arrays carry no length prefix in SCALE, so the
//! encoding is always exactly [`TEMPORAL_LOCK_LEN`] bytes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{HASH_LEN, MirrorEntry};

/// Encoded size of a [`TemporalLockPuzzle`].
pub const TEMPORAL_LOCK_LEN: usize = 8 + 4 + HASH_LEN;

/// Delay between an entry's commit time and its derived reveal time.
pub const REVEAL_DELAY_SECS: u64 = 300;

/// Hash-chain depth used for puzzles derived from mirror entries.
pub const HASH_CHAIN_DEPTH: u32 = 1000;

/// Errors raised while normalizing or decoding puzzle fields.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid initial_hash: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid {field}: {reason}")]
    Field { field: &'static str, reason: String },
    #[error("temporal lock must be exactly 44 bytes, got {0}")]
    Length(usize),
}

/// Reveal-time puzzle descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalLockPuzzle {
    pub reveal_time: u64,
    pub hash_chain_depth: u32,
    pub initial_hash: [u8; HASH_LEN],
}

/// JSON view of a puzzle, as returned over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PuzzleJson {
    pub reveal_time: u64,
    pub hash_chain_depth: u32,
    pub initial_hash: String,
}

/// The 44 encoded bytes plus the text forms served to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodedTemporalLock(pub [u8; TEMPORAL_LOCK_LEN]);

impl EncodedTemporalLock {
    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Standard (padded) base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl TemporalLockPuzzle {
    /// Builds a puzzle from a hex initial hash, normalizing it with
    /// [`normalize_initial_hash`].
    pub fn from_hex_hash(
        reveal_time: u64,
        hash_chain_depth: u32,
        initial_hash: &str,
    ) -> Result<Self, EncodingError> {
        Ok(Self {
            reveal_time,
            hash_chain_depth,
            initial_hash: normalize_initial_hash(initial_hash)?,
        })
    }

    /// Derives the puzzle for a stored mirror entry.
    ///
    /// Pure function of `committed_at` and the anchor: nothing is persisted,
    /// so the result always tracks the entry it was derived from.
    pub fn derive(entry: &MirrorEntry) -> Self {
        Self {
            reveal_time: entry.committed_at.wrapping_add(REVEAL_DELAY_SECS),
            hash_chain_depth: HASH_CHAIN_DEPTH,
            initial_hash: entry.anchor.0,
        }
    }

    /// Parses a loosely-typed JSON object with `reveal_time`,
    /// `hash_chain_depth` and `initial_hash`.
    ///
    /// Missing integer fields default to 0 and a missing `initial_hash` to
    /// the empty string. Integers are wrapped to their fixed width rather
    /// than rejected: negative values become their two's complement and
    /// `hash_chain_depth` keeps its low 32 bits. Fractional numbers are
    /// truncated toward zero; decimal strings are accepted, and booleans
    /// count as 1 and 0. Arrays, objects and `null` are rejected.
    pub fn from_json(value: &Value) -> Result<Self, EncodingError> {
        let reveal_time = wrapped_int(value.get("reveal_time"), "reveal_time")?;
        let hash_chain_depth = wrapped_int(value.get("hash_chain_depth"), "hash_chain_depth")? as u32;

        let initial_hash = match value.get("initial_hash") {
            None => "",
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(EncodingError::Field {
                    field: "initial_hash",
                    reason: format!("expected hex string, got {other}"),
                });
            }
        };

        Self::from_hex_hash(reveal_time, hash_chain_depth, initial_hash)
    }

    /// Encodes the puzzle into its 44-byte little-endian layout.
    pub fn encode(&self) -> EncodedTemporalLock {
        let mut out = [0u8; TEMPORAL_LOCK_LEN];
        out[0..8].copy_from_slice(&self.reveal_time.to_le_bytes());
        out[8..12].copy_from_slice(&self.hash_chain_depth.to_le_bytes());
        out[12..].copy_from_slice(&self.initial_hash);
        EncodedTemporalLock(out)
    }

    /// Parses the 44-byte layout produced by [`TemporalLockPuzzle::encode`].
    pub fn decode(data: &[u8]) -> Result<Self, EncodingError> {
        if data.len() != TEMPORAL_LOCK_LEN {
            return Err(EncodingError::Length(data.len()));
        }

        let mut reveal = [0u8; 8];
        reveal.copy_from_slice(&data[0..8]);

        let mut depth = [0u8; 4];
        depth.copy_from_slice(&data[8..12]);

        let mut initial_hash = [0u8; HASH_LEN];
        initial_hash.copy_from_slice(&data[12..]);

        Ok(Self {
            reveal_time: u64::from_le_bytes(reveal),
            hash_chain_depth: u32::from_le_bytes(depth),
            initial_hash,
        })
    }

    pub fn to_json(&self) -> PuzzleJson {
        PuzzleJson {
            reveal_time: self.reveal_time,
            hash_chain_depth: self.hash_chain_depth,
            initial_hash: hex::encode(self.initial_hash),
        }
    }
}

/// Normalizes a hex initial hash into exactly 32 bytes.
///
/// An optional `0x` prefix is stripped, the digits are right-padded with
/// ASCII `'0'` up to 64 characters, and only the first 32 decoded bytes are
/// kept when the value is longer. Non-hex characters (and odd-length input
/// longer than 64 digits) fail with [`EncodingError::InvalidHex`].
pub fn normalize_initial_hash(input: &str) -> Result<[u8; HASH_LEN], EncodingError> {
    let digits = input.strip_prefix("0x").unwrap_or(input);

    let mut padded = String::with_capacity(digits.len().max(HASH_LEN * 2));
    padded.push_str(digits);
    while padded.len() < HASH_LEN * 2 {
        padded.push('0');
    }

    let bytes = hex::decode(&padded)?;

    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&bytes[..HASH_LEN]);
    Ok(out)
}

fn wrapped_int(value: Option<&Value>, field: &'static str) -> Result<u64, EncodingError> {
    let invalid = |reason: String| EncodingError::Field { field, reason };

    match value {
        None => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                Ok(v)
            } else if let Some(v) = n.as_i64() {
                Ok(v as u64)
            } else if let Some(v) = n.as_f64() {
                Ok(v.trunc() as i128 as u64)
            } else {
                Err(invalid(format!("unsupported number {n}")))
            }
        }
        Some(Value::Bool(b)) => Ok(u64::from(*b)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i128>()
            .map(|v| v as u64)
            .map_err(|e| invalid(format!("{s:?} is not an integer: {e}"))),
        Some(other) => Err(invalid(format!("expected integer, got {other}"))),
    }
}
