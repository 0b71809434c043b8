// mirror/src/types/block.rs

//! Block descriptors produced by fetch adapters.
//!
//! A [`ChainBlockDescriptor`] is an ephemeral, chain-agnostic summary of one
//! external block. It is never persisted as-is: the canonical encoder turns
//! it into bytes, and only those bytes (plus a few indexed columns) reach
//! the mirror log.

use serde::{Deserialize, Serialize};

use super::Chain;

/// Summary of one block on an external chain.
///
/// Upstream sources are not fully trusted, so `height`, `hash` and `time`
/// are optional. The only structural requirement is that `height` and
/// `hash` are never both absent (see [`ChainBlockDescriptor::is_addressable`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBlockDescriptor {
    /// Chain the block was fetched from.
    pub chain: Chain,
    /// Block height (number), if the upstream reported one.
    pub height: Option<u64>,
    /// Block hash in the chain-native hex form.
    pub hash: Option<String>,
    /// Block timestamp in seconds since Unix epoch, as reported upstream.
    pub time: Option<u64>,
    /// Transaction identifiers, in whatever order the upstream returned them.
    ///
    /// Empty for adapters that do not fetch transaction identifiers.
    pub tx: Vec<String>,
}

impl ChainBlockDescriptor {
    /// Returns `true` if the block can be located again upstream, i.e. at
    /// least one of height and hash is present.
    pub fn is_addressable(&self) -> bool {
        self.height.is_some() || self.hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_without_height_and_hash_is_not_addressable() {
        let mut block = ChainBlockDescriptor {
            chain: Chain::Bitcoin,
            height: None,
            hash: None,
            time: Some(1),
            tx: Vec::new(),
        };
        assert!(!block.is_addressable());

        block.height = Some(7);
        assert!(block.is_addressable());

        block.height = None;
        block.hash = Some("00ff".to_string());
        assert!(block.is_addressable());
    }
}
