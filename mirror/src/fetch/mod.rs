//! Chain fetch adapters.
//!
//! A fetch adapter produces one [`ChainBlockDescriptor`] for the current
//! head of an external chain. Adapters never touch the mirror store; they
//! either return a descriptor or fail.
//!
//! - [`BitcoinRpcFetcher`]: Bitcoin Core JSON-RPC (`getbestblockhash` then
//!   `getblock`),
//! - [`EthereumRpcFetcher`]: Ethereum node JSON-RPC (`eth_getBlockByNumber`),
//!   without transaction identifiers,
//! - [`MockBitcoinFetcher`]: deterministic synthetic blocks for tests and
//!   offline runs.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Chain, ChainBlockDescriptor};

pub mod bitcoin;
pub mod ethereum;
pub mod mock;
pub mod rpc;

pub use bitcoin::BitcoinRpcFetcher;
pub use ethereum::EthereumRpcFetcher;
pub use mock::{MockBitcoinFetcher, MockSeed};
pub use rpc::{JsonRpcClient, RpcVersion};

/// Errors that can occur while fetching a block from an upstream chain.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A required endpoint is not configured (or not usable). Not retried.
    #[error("{0}")]
    Configuration(String),
    /// The upstream was unreachable or answered with a non-success status
    /// or an RPC error object. Safe to retry.
    #[error("{method}: {message}")]
    Transport {
        method: String,
        status: Option<u16>,
        message: String,
    },
    /// The upstream answered, but not with something we can interpret.
    #[error("{method}: malformed response: {message}")]
    Protocol { method: String, message: String },
}

/// Source of block descriptors for one chain.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    /// Chain this adapter reads from.
    fn chain(&self) -> Chain;

    /// Fetches a descriptor of the chain's current head block.
    async fn fetch_head(&self) -> Result<ChainBlockDescriptor, FetchError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Tiny JSON-RPC test server built on hyper.

    use std::convert::Infallible;
    use std::sync::Arc;

    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::{Request, Response, body::Incoming, header, server::conn::http1, service::service_fn};
    use hyper_util::rt::TokioIo;
    use serde_json::Value;
    use tokio::net::TcpListener;

    /// One request as seen by the test server.
    pub struct RecordedCall {
        pub authorization: Option<String>,
        pub body: Value,
    }

    /// Spawns a server answering every POST with `handler(call)` and returns
    /// its base URL.
    pub async fn spawn_rpc_server<F>(handler: F) -> String
    where
        F: Fn(RecordedCall) -> (u16, Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let handler = handler.clone();
                        async move {
                            let authorization = req
                                .headers()
                                .get(header::AUTHORIZATION)
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string);
                            let body = match req.into_body().collect().await {
                                Ok(collected) => collected.to_bytes(),
                                Err(_) => Bytes::new(),
                            };
                            let body = serde_json::from_slice(&body).unwrap_or(Value::Null);

                            let (status, reply) = handler(RecordedCall { authorization, body });
                            let resp = Response::builder()
                                .status(status)
                                .header(header::CONTENT_TYPE, "application/json")
                                .body(Full::new(Bytes::from(reply.to_string())))
                                .expect("valid test response");
                            Ok::<_, Infallible>(resp)
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        format!("http://{addr}")
    }
}
