//! Canonical payload encoding.
//!
//! The canonical payload is the byte string every anchor is computed over,
//! so it has to be identical across processes, platforms and time for the
//! same logical block. It is compact JSON with a fixed key set serialized
//! in sorted key order:
//!
//! ```json
//! {"chain":"bitcoin","hash":"…","height":1,"time":2,"tx":["a","b"],"tx_count":2}
//! ```
//!
//! - transaction identifiers are sorted ascending before encoding,
//! - `tx_count` is always derived from the sorted list, never copied from
//!   upstream data,
//! - there are no floating-point fields and no whitespace,
//! - absent `height`/`hash`/`time` are written as `null`; rejecting such
//!   blocks is the caller's job.

use serde::Serialize;

use crate::types::ChainBlockDescriptor;

/// Wire shape of the canonical payload.
///
/// Field declaration order is the serialization order, and it must stay
/// alphabetical.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    chain: &'a str,
    hash: Option<&'a str>,
    height: Option<u64>,
    time: Option<u64>,
    tx: Vec<&'a str>,
    tx_count: usize,
}

/// Encodes `block` into its canonical payload bytes.
///
/// Pure: no clock reads, no randomness. Two descriptors that differ only in
/// the order of their transaction identifiers encode to the same bytes.
///
/// # Panics
///
/// Panics if JSON serialization fails. This is considered a programming
/// error: the payload only contains strings, integers and `null`.
pub fn canonical_payload(block: &ChainBlockDescriptor) -> Vec<u8> {
    let mut tx: Vec<&str> = block.tx.iter().map(String::as_str).collect();
    tx.sort_unstable();

    let canonical = CanonicalBlock {
        chain: block.chain.as_str(),
        hash: block.hash.as_deref(),
        height: block.height,
        time: block.time,
        tx_count: tx.len(),
        tx,
    };

    serde_json::to_vec(&canonical).expect("canonical payload should always serialize to JSON")
}
