use std::collections::BTreeMap;

use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use serde_json::Value;

use mirror::{MirrorStore, VerdictLog, VerdictRecord};

use super::{LIST_LIMIT, parse_json};
use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub mirrors: u64,
    pub verdicts: u64,
    pub actions: BTreeMap<String, u64>,
}

/// One row of `GET /verdicts`.
#[derive(Debug, Serialize)]
pub struct VerdictView {
    pub id: u64,
    pub tx_hash: String,
    pub threat_score: f64,
    pub action: String,
    pub verdict: Value,
    pub recorded_at: u64,
}

impl From<VerdictRecord> for VerdictView {
    fn from(record: VerdictRecord) -> Self {
        Self {
            verdict: record.verdict(),
            id: record.id,
            tx_hash: record.tx_hash,
            threat_score: record.threat_score,
            action: record.action,
            recorded_at: record.recorded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerdictList {
    pub verdicts: Vec<VerdictView>,
}

/// `POST /transaction`
///
/// Scores the posted transaction and returns the scorer's verdict verbatim.
pub async fn submit<S>(
    State(state): State<SharedState<S>>,
    body: Bytes,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let tx = parse_json(&body)?;
    if !tx.is_object() {
        return Err(ApiError::InvalidJson);
    }
    let record = state.service.record_transaction(&tx).await?;
    Ok(Json(TransactionResponse {
        result: record.verdict(),
    }))
}

/// `GET /stats`
pub async fn stats<S>(State(state): State<SharedState<S>>) -> Result<Json<StatsResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let stats = state.service.stats()?;
    Ok(Json(StatsResponse {
        mirrors: stats.mirrors,
        verdicts: stats.verdicts,
        actions: stats.actions,
    }))
}

/// `GET /verdicts`
pub async fn verdicts<S>(State(state): State<SharedState<S>>) -> Result<Json<VerdictList>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let verdicts = state
        .service
        .recent_verdicts(LIST_LIMIT)?
        .into_iter()
        .map(VerdictView::from)
        .collect();
    Ok(Json(VerdictList { verdicts }))
}
