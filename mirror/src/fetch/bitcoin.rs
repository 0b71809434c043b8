//! Bitcoin Core JSON-RPC adapter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::rpc::{JsonRpcClient, RpcVersion};
use super::{ChainFetcher, FetchError};
use crate::types::{Chain, ChainBlockDescriptor};

/// `getblock` verbosity. Level 1 returns transaction ids as strings; level 2
/// returns full transaction objects, which we also accept.
const GETBLOCK_VERBOSITY: u8 = 1;

/// Reads the best block from a Bitcoin Core node.
pub struct BitcoinRpcFetcher {
    rpc: Option<JsonRpcClient>,
}

/// The subset of `getblock` we care about.
#[derive(Debug, Deserialize)]
struct BitcoinBlock {
    hash: Option<String>,
    height: Option<u64>,
    time: Option<u64>,
    #[serde(default)]
    tx: Vec<TxRef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TxRef {
    Id(String),
    Full { txid: String },
}

impl TxRef {
    fn into_id(self) -> String {
        match self {
            TxRef::Id(id) => id,
            TxRef::Full { txid } => txid,
        }
    }
}

impl BitcoinRpcFetcher {
    /// Creates an adapter for `endpoint`. With `None`, every fetch fails with
    /// [`FetchError::Configuration`].
    pub fn new(endpoint: Option<&str>, timeout: Duration) -> Result<Self, FetchError> {
        let rpc = endpoint
            .map(|url| JsonRpcClient::new(url, RpcVersion::V1, timeout))
            .transpose()?;
        Ok(Self { rpc })
    }

    fn rpc(&self) -> Result<&JsonRpcClient, FetchError> {
        self.rpc
            .as_ref()
            .ok_or_else(|| FetchError::Configuration("BITCOIN_RPC_URL not set".to_string()))
    }
}

#[async_trait]
impl ChainFetcher for BitcoinRpcFetcher {
    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    async fn fetch_head(&self) -> Result<ChainBlockDescriptor, FetchError> {
        let rpc = self.rpc()?;

        let best: String = rpc.call("getbestblockhash", json!([])).await?;
        tracing::debug!(best = %best, endpoint = rpc.endpoint(), "bitcoin best block");

        let block: BitcoinBlock = rpc
            .call("getblock", json!([best, GETBLOCK_VERBOSITY]))
            .await?;

        Ok(ChainBlockDescriptor {
            chain: Chain::Bitcoin,
            height: block.height,
            hash: block.hash,
            time: block.time,
            tx: block.tx.into_iter().map(TxRef::into_id).collect(),
        })
    }
}
