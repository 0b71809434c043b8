//! HTTP-based threat scorer client.
//!
//! Talks to the external scoring service with a single JSON call:
//!
//! ```json
//! POST /score
//! {"hash": "0xdeadbeef", "from": "0x1", "features": {"gas_price_deviation": 10}}
//!
//! Response:
//! {"threat_score": 0.91, "action": "FLAG", "target": "0xdeadbeef"}
//! ```
//!
//! Anything beyond `threat_score` and `action` is kept verbatim in
//! [`ThreatVerdict::raw`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{ScoringError, ThreatScorer, ThreatVerdict};

/// HTTP-based threat scorer.
pub struct HttpThreatScorer {
    base_url: String,
    client: Client,
}

impl HttpThreatScorer {
    /// Constructs a scorer pointing at `base_url` (without trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        // Avoid accidental double slashes.
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ThreatScorer for HttpThreatScorer {
    async fn score(&self, tx: &Value) -> Result<ThreatVerdict, ScoringError> {
        let url = self.endpoint("/score");

        let resp = self
            .client
            .post(&url)
            .json(tx)
            .send()
            .await
            .map_err(|e| ScoringError::Transport(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScoringError::Transport(format!(
                "scoring service returned HTTP status {status}"
            )));
        }

        let raw = resp
            .json::<Value>()
            .await
            .map_err(|e| ScoringError::Protocol(format!("failed to parse JSON response: {e}")))?;

        ThreatVerdict::from_raw(raw)
    }
}
