//! HTTP gateway over the mirror pipeline.
//!
//! Routes:
//!
//! - `GET /` and `GET /health`
//! - `GET /mirrors`
//! - `POST /mirror/bitcoin/fetch`, `POST /mirror/ethereum/fetch`
//! - `GET /mirror/{id}/temporal`
//! - `POST /encode_temporal_lock`
//! - `POST /transaction`, `GET /verdicts`, `GET /stats`
//!
//! The binary in `main.rs` wires a RocksDB-backed [`mirror::MirrorService`]
//! into [`router`]; tests do the same with the in-memory store.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

use mirror::{MirrorStore, VerdictLog};
use routes::{health, mirrors, root, temporal, threat};

pub use config::GatewayConfig;
pub use error::ApiError;
pub use state::{AppState, SharedState};

/// Builds the gateway router around `state`.
pub fn router<S>(state: SharedState<S>) -> Router
where
    S: MirrorStore + VerdictLog + 'static,
{
    Router::new()
        .route("/", get(root::index::<S>))
        .route("/health", get(health::health))
        .route("/mirrors", get(mirrors::list::<S>))
        .route("/mirror/bitcoin/fetch", post(mirrors::fetch_bitcoin::<S>))
        .route("/mirror/ethereum/fetch", post(mirrors::fetch_ethereum::<S>))
        .route("/mirror/{id}/temporal", get(temporal::entry_lock::<S>))
        .route("/encode_temporal_lock", post(temporal::encode))
        .route("/transaction", post(threat::submit::<S>))
        .route("/verdicts", get(threat::verdicts::<S>))
        .route("/stats", get(threat::stats::<S>))
        .with_state(state)
}
