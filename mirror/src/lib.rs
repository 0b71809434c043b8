//! Mirror library crate.
//!
//! This crate provides the building blocks for mirroring block headers
//! from upstream chains into a local, append-only log with verifiable
//! anchors:
//!
//! - strongly-typed domain types (`types`),
//! - the canonical payload encoder (`canonical`),
//! - the double SHA-256 anchor committer (`anchor`),
//! - upstream fetch adapters (`fetch`),
//! - storage backends (`storage`),
//! - the 44-byte temporal-lock codec (`temporal`),
//! - the external threat-scoring interface (`threat`),
//! - Prometheus-based metrics (`metrics`),
//! - configuration (`config`) and the orchestrating façade (`service`).
//!
//! Binaries such as the HTTP gateway compose these pieces around a
//! [`MirrorService`].

pub mod anchor;
pub mod canonical;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod temporal;
pub mod threat;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ConfigError, MetricsConfig, MirrorConfig, ThreatScorerConfig, UpstreamConfig};

// Re-export the façade.
pub use service::{MirrorError, MirrorReceipt, MirrorService, ServiceStats, TemporalLockView};

// Re-export the pipeline stages.
pub use anchor::commit;
pub use canonical::canonical_payload;
pub use fetch::{
    BitcoinRpcFetcher, ChainFetcher, EthereumRpcFetcher, FetchError, MockBitcoinFetcher, MockSeed,
};
pub use temporal::{EncodedTemporalLock, EncodingError, PuzzleJson, TemporalLockPuzzle};

// Re-export storage backends.
pub use storage::{
    InMemoryMirrorStore, MirrorStore, RocksDbConfig, RocksDbMirrorStore, StorageError, VerdictLog,
};

// Re-export the threat-scoring interface and the HTTP client.
pub use threat::{HttpThreatScorer, ScoringError, ThreatScorer, ThreatVerdict, VerdictRecord};

// Re-export metrics registry and mirror metrics.
pub use metrics::{MetricsRegistry, MirrorMetrics, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default store backend.
pub type DefaultMirrorStore = RocksDbMirrorStore;

/// Type alias for the façade as run by a durable node.
pub type DefaultMirrorService = MirrorService<DefaultMirrorStore>;
