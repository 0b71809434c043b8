use axum::{Json, extract::State};
use serde::Serialize;

use mirror::{Chain, MirrorEntry, MirrorStore, VerdictLog};

use super::LIST_LIMIT;
use crate::error::ApiError;
use crate::state::SharedState;

/// One row of `GET /mirrors`.
///
/// `merkle_root` is the anchor hash and `timestamp` the commit time; both
/// names are kept for existing clients.
#[derive(Debug, Serialize)]
pub struct MirrorView {
    pub id: u64,
    pub chain: Chain,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub merkle_root: String,
    pub timestamp: u64,
}

impl From<MirrorEntry> for MirrorView {
    fn from(entry: MirrorEntry) -> Self {
        Self {
            id: entry.id.0,
            chain: entry.chain,
            block_number: entry.height,
            block_hash: entry.block_hash,
            merkle_root: entry.anchor.to_hex(),
            timestamp: entry.committed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MirrorList {
    pub mirrors: Vec<MirrorView>,
}

/// Response body for a successful fetch cycle.
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub status: &'static str,
    pub merkle_root: String,
    pub id: u64,
}

/// `GET /mirrors`
///
/// Newest first, capped at [`LIST_LIMIT`].
pub async fn list<S>(State(state): State<SharedState<S>>) -> Result<Json<MirrorList>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let mirrors = state
        .service
        .recent(LIST_LIMIT)?
        .into_iter()
        .map(MirrorView::from)
        .collect();
    Ok(Json(MirrorList { mirrors }))
}

/// `POST /mirror/bitcoin/fetch`
pub async fn fetch_bitcoin<S>(
    State(state): State<SharedState<S>>,
) -> Result<Json<FetchResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    fetch(&state, Chain::Bitcoin).await
}

/// `POST /mirror/ethereum/fetch`
pub async fn fetch_ethereum<S>(
    State(state): State<SharedState<S>>,
) -> Result<Json<FetchResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    fetch(&state, Chain::Ethereum).await
}

async fn fetch<S>(state: &SharedState<S>, chain: Chain) -> Result<Json<FetchResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let receipt = state.service.mirror_once(chain).await?;
    Ok(Json(FetchResponse {
        status: "ok",
        merkle_root: receipt.anchor.to_hex(),
        id: receipt.id.0,
    }))
}
