//! Threat-scoring intake.
//!
//! The scoring algorithm itself lives in an external service; this crate
//! only sees the narrow [`ThreatScorer`] capability ("score this
//! transaction, return a verdict") and persists the verdict verbatim.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod http;

pub use http::HttpThreatScorer;

/// Errors that can occur while contacting the scoring service.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// No scoring service configured.
    #[error("{0}")]
    Configuration(String),
    /// Transport-level error (e.g. HTTP failure, timeout, non-2xx status).
    #[error("threat scorer unreachable: {0}")]
    Transport(String),
    /// The scoring service returned a malformed or unexpected response.
    #[error("threat scorer returned a malformed verdict: {0}")]
    Protocol(String),
}

/// Verdict for one transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreatVerdict {
    pub threat_score: f64,
    pub action: String,
    /// Full response as returned by the scorer.
    pub raw: Value,
}

impl ThreatVerdict {
    /// Extracts the typed fields from a raw scorer response, keeping the
    /// response itself untouched.
    pub fn from_raw(raw: Value) -> Result<Self, ScoringError> {
        let threat_score = raw
            .get("threat_score")
            .and_then(Value::as_f64)
            .ok_or_else(|| ScoringError::Protocol("missing numeric threat_score".to_string()))?;
        let action = raw
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ScoringError::Protocol("missing string action".to_string()))?
            .to_string();

        Ok(Self {
            threat_score,
            action,
            raw,
        })
    }
}

/// Abstract scoring capability.
#[async_trait]
pub trait ThreatScorer: Send + Sync {
    async fn score(&self, tx: &Value) -> Result<ThreatVerdict, ScoringError>;
}

/// A verdict waiting to be appended to the verdict log.
#[derive(Clone, Debug, PartialEq)]
pub struct NewVerdict {
    pub tx_hash: String,
    pub threat_score: f64,
    pub action: String,
    /// Scorer response, serialized as JSON text.
    pub verdict_json: String,
}

impl NewVerdict {
    /// Builds the log record for `verdict` on transaction `tx`.
    ///
    /// The transaction hash is taken from `tx["hash"]`, falling back to
    /// `"unknown"`.
    pub fn new(tx: &Value, verdict: &ThreatVerdict) -> Self {
        let tx_hash = tx
            .get("hash")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        Self {
            tx_hash,
            threat_score: verdict.threat_score,
            action: verdict.action.clone(),
            verdict_json: verdict.raw.to_string(),
        }
    }
}

/// One stored verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub id: u64,
    pub tx_hash: String,
    pub threat_score: f64,
    pub action: String,
    pub verdict_json: String,
    pub recorded_at: u64,
}

impl VerdictRecord {
    pub fn from_new(id: u64, recorded_at: u64, new: NewVerdict) -> Self {
        Self {
            id,
            tx_hash: new.tx_hash,
            threat_score: new.threat_score,
            action: new.action,
            verdict_json: new.verdict_json,
            recorded_at,
        }
    }

    /// The stored scorer response as JSON. Falls back to the raw text if it
    /// no longer parses.
    pub fn verdict(&self) -> Value {
        serde_json::from_str(&self.verdict_json)
            .unwrap_or_else(|_| Value::String(self.verdict_json.clone()))
    }
}
