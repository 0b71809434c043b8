//! Deterministic synthetic Bitcoin blocks.
//!
//! For a seed `s` (seconds since Unix epoch by default):
//!
//! - `hash   = sha256_hex("block-{s}")`
//! - `tx[i]  = sha256_hex("tx-{s}-{i}")` for `i` in `1..=5`
//! - `height = s % 1_000_000`, `time = s`
//!
//! With [`MockSeed::Clock`] two fetches within the same second return the
//! same block and fetches in different seconds diverge. Tests should use
//! [`MockSeed::Fixed`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{ChainFetcher, FetchError};
use crate::anchor::sha256_hex;
use crate::types::{Chain, ChainBlockDescriptor};

const MOCK_TX_COUNT: u64 = 5;
const MOCK_HEIGHT_MODULUS: u64 = 1_000_000;

/// Where the mock takes its seed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockSeed {
    /// Current wall-clock second.
    Clock,
    /// Fixed seed, for reproducible tests.
    Fixed(u64),
}

/// Offline stand-in for [`super::BitcoinRpcFetcher`].
#[derive(Clone, Debug)]
pub struct MockBitcoinFetcher {
    seed: MockSeed,
}

impl MockBitcoinFetcher {
    pub fn new(seed: MockSeed) -> Self {
        Self { seed }
    }

    /// Builds the synthetic block for `seed`.
    pub fn block_for(seed: u64) -> ChainBlockDescriptor {
        let tx = (1..=MOCK_TX_COUNT)
            .map(|i| sha256_hex(format!("tx-{seed}-{i}").as_bytes()))
            .collect();

        ChainBlockDescriptor {
            chain: Chain::Bitcoin,
            height: Some(seed % MOCK_HEIGHT_MODULUS),
            hash: Some(sha256_hex(format!("block-{seed}").as_bytes())),
            time: Some(seed),
            tx,
        }
    }

    fn current_seed(&self) -> u64 {
        match self.seed {
            MockSeed::Fixed(seed) => seed,
            MockSeed::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_secs(),
        }
    }
}

#[async_trait]
impl ChainFetcher for MockBitcoinFetcher {
    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    async fn fetch_head(&self) -> Result<ChainBlockDescriptor, FetchError> {
        Ok(Self::block_for(self.current_seed()))
    }
}
