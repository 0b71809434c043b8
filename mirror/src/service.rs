//! Mirror service façade.
//!
//! The service wires together:
//!
//! - one [`ChainFetcher`] per chain,
//! - the canonical encoder and the anchor committer,
//! - a store implementing [`MirrorStore`] and [`VerdictLog`],
//! - an optional [`ThreatScorer`] and an optional [`MetricsRegistry`].
//!
//! Each call to [`MirrorService::mirror_once`] is exactly one attempt: no
//! retries, no backoff. A failed fetch leaves the store untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::anchor::commit;
use crate::canonical::canonical_payload;
use crate::config::MirrorConfig;
use crate::fetch::{
    BitcoinRpcFetcher, ChainFetcher, EthereumRpcFetcher, FetchError, MockBitcoinFetcher, MockSeed,
};
use crate::metrics::MetricsRegistry;
use crate::storage::{MirrorStore, StorageError, VerdictLog};
use crate::temporal::{EncodedTemporalLock, TemporalLockPuzzle};
use crate::threat::{HttpThreatScorer, NewVerdict, ScoringError, ThreatScorer, VerdictRecord};
use crate::types::{AnchorHash, Chain, MirrorEntry, MirrorId, NewMirrorEntry};

/// Errors surfaced by the façade.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    /// No entry with this id.
    #[error("not found")]
    NotFound(MirrorId),
    /// The adapter returned a block with neither height nor hash.
    #[error("{0} adapter returned a block with neither height nor hash")]
    MalformedBlock(Chain),
}

/// Result of one successful mirror cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorReceipt {
    pub id: MirrorId,
    pub anchor: AnchorHash,
}

/// Puzzle derived from a stored entry plus its 44-byte encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalLockView {
    pub puzzle: TemporalLockPuzzle,
    pub encoded: EncodedTemporalLock,
}

/// Counts served by `GET /stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub mirrors: u64,
    pub verdicts: u64,
    pub actions: BTreeMap<String, u64>,
}

/// Orchestrates fetch → canonicalize → commit → append.
///
/// Generic over the storage backend `S`; see
/// [`DefaultMirrorService`](crate::DefaultMirrorService) for the RocksDB
/// instantiation used by the gateway binary.
pub struct MirrorService<S> {
    store: S,
    fetchers: HashMap<Chain, Arc<dyn ChainFetcher>>,
    scorer: Option<Arc<dyn ThreatScorer>>,
    metrics: Option<Arc<MetricsRegistry>>,
    /// Present only when per-chain fetch exclusion is enabled.
    chain_locks: Option<HashMap<Chain, Mutex<()>>>,
}

impl<S> MirrorService<S>
where
    S: MirrorStore + VerdictLog,
{
    /// Creates a service with no adapters, no scorer and no metrics.
    pub fn new(store: S) -> Self {
        Self {
            store,
            fetchers: HashMap::new(),
            scorer: None,
            metrics: None,
            chain_locks: None,
        }
    }

    /// Builds the adapters and scorer described by `cfg` around `store`.
    ///
    /// Unconfigured adapters are still registered: they fail with a
    /// configuration error when used, so callers get a precise message.
    pub fn from_config(cfg: &MirrorConfig, store: S) -> Result<Self, MirrorError> {
        let upstream = &cfg.upstream;

        let bitcoin: Arc<dyn ChainFetcher> = if upstream.mock_bitcoin {
            Arc::new(MockBitcoinFetcher::new(MockSeed::Clock))
        } else {
            Arc::new(BitcoinRpcFetcher::new(
                upstream.bitcoin_rpc_url.as_deref(),
                upstream.rpc_timeout,
            )?)
        };
        let ethereum = Arc::new(EthereumRpcFetcher::new(
            upstream.web3_url.as_deref(),
            upstream.rpc_timeout,
        )?);

        let mut service = Self::new(store)
            .with_fetcher(bitcoin)
            .with_fetcher(ethereum)
            .serialize_fetches(cfg.serialize_fetches);

        if let Some(url) = &cfg.threat.base_url {
            let scorer = HttpThreatScorer::new(url.clone(), cfg.threat.timeout)?;
            service = service.with_scorer(Arc::new(scorer));
        }

        tracing::info!(
            mock_bitcoin = upstream.mock_bitcoin,
            serialize_fetches = cfg.serialize_fetches,
            threat_scorer = cfg.threat.base_url.is_some(),
            "mirror service configured"
        );

        Ok(service)
    }

    /// Registers `fetcher` for the chain it reports, replacing any previous
    /// adapter for that chain.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ChainFetcher>) -> Self {
        self.fetchers.insert(fetcher.chain(), fetcher);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ThreatScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enables or disables per-chain fetch exclusion.
    pub fn serialize_fetches(mut self, enabled: bool) -> Self {
        self.chain_locks = enabled.then(|| {
            [Chain::Bitcoin, Chain::Ethereum]
                .into_iter()
                .map(|chain| (chain, Mutex::new(())))
                .collect()
        });
        self
    }

    /// Runs one fetch → canonicalize → commit → append cycle for `chain`.
    pub async fn mirror_once(&self, chain: Chain) -> Result<MirrorReceipt, MirrorError> {
        let fetcher = self.fetchers.get(&chain).ok_or_else(|| {
            FetchError::Configuration(format!("no {chain} adapter registered"))
        })?;

        let _guard = match self.chain_locks.as_ref().and_then(|locks| locks.get(&chain)) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let start = Instant::now();
        let result = self.run_cycle(fetcher.as_ref()).await;

        if let Some(metrics) = &self.metrics {
            let labels = [chain.as_str()];
            match &result {
                Ok(_) => {
                    metrics
                        .mirror
                        .fetch_seconds
                        .observe(start.elapsed().as_secs_f64());
                    metrics.mirror.entries_appended.with_label_values(&labels).inc();
                }
                Err(_) => metrics.mirror.fetch_failures.with_label_values(&labels).inc(),
            }
        }

        match result {
            Ok(entry) => {
                tracing::info!(
                    chain = %chain,
                    id = %entry.id,
                    height = ?entry.height,
                    anchor = %entry.anchor,
                    "mirrored block"
                );
                Ok(MirrorReceipt {
                    id: entry.id,
                    anchor: entry.anchor,
                })
            }
            Err(e) => {
                tracing::warn!(chain = %chain, error = %e, "mirror cycle failed");
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, fetcher: &dyn ChainFetcher) -> Result<MirrorEntry, MirrorError> {
        let block = fetcher.fetch_head().await?;
        if !block.is_addressable() {
            return Err(MirrorError::MalformedBlock(block.chain));
        }

        let payload = canonical_payload(&block);
        let anchor = commit(&payload);

        let entry = self.store.append(NewMirrorEntry {
            chain: block.chain,
            height: block.height,
            block_hash: block.hash,
            anchor,
            payload,
        })?;
        Ok(entry)
    }

    /// Up to `limit` most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<MirrorEntry>, MirrorError> {
        Ok(self.store.list(limit)?)
    }

    pub fn entry(&self, id: MirrorId) -> Result<MirrorEntry, MirrorError> {
        self.store.get(id)?.ok_or(MirrorError::NotFound(id))
    }

    /// Derives and encodes the temporal-lock puzzle for entry `id`.
    ///
    /// Nothing is written: the puzzle is recomputed from the stored entry on
    /// every call.
    pub fn temporal_lock(&self, id: MirrorId) -> Result<TemporalLockView, MirrorError> {
        let entry = self.entry(id)?;
        let puzzle = TemporalLockPuzzle::derive(&entry);
        Ok(TemporalLockView {
            puzzle,
            encoded: puzzle.encode(),
        })
    }

    /// Scores `tx` and records the verdict.
    ///
    /// The verdict record is the primary write and fails the call. The
    /// per-action counter is bookkeeping: a failure there is logged and
    /// ignored.
    pub async fn record_transaction(&self, tx: &Value) -> Result<VerdictRecord, MirrorError> {
        let scorer = self
            .scorer
            .as_ref()
            .ok_or_else(|| ScoringError::Configuration("THREAT_SCORER_URL not configured".to_string()))?;

        let verdict = scorer.score(tx).await?;
        let record = self.store.append_verdict(NewVerdict::new(tx, &verdict))?;

        if let Err(e) = self.store.bump_action(&record.action) {
            tracing::warn!(action = %record.action, error = %e, "failed to update action counter");
        }
        if let Some(metrics) = &self.metrics {
            metrics.mirror.verdicts_recorded.inc();
        }

        tracing::info!(
            id = record.id,
            tx_hash = %record.tx_hash,
            action = %record.action,
            threat_score = record.threat_score,
            "recorded verdict"
        );
        Ok(record)
    }

    pub fn recent_verdicts(&self, limit: usize) -> Result<Vec<VerdictRecord>, MirrorError> {
        Ok(self.store.recent_verdicts(limit)?)
    }

    pub fn stats(&self) -> Result<ServiceStats, MirrorError> {
        Ok(ServiceStats {
            mirrors: self.store.count()?,
            verdicts: self.store.verdict_count()?,
            actions: self.store.action_counts()?,
        })
    }
}
