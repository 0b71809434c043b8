use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::SharedState;

/// Routes served by the gateway, as listed by `GET /`.
pub const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /mirrors",
    "POST /mirror/bitcoin/fetch",
    "POST /mirror/ethereum/fetch",
    "GET /mirror/{id}/temporal",
    "POST /encode_temporal_lock",
    "POST /transaction",
    "GET /verdicts",
    "GET /stats",
];

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
    pub mock_bitcoin: bool,
}

/// `GET /`
pub async fn index<S>(State(state): State<SharedState<S>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "mirror-gateway",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
        mock_bitcoin: state.mock_bitcoin,
    })
}
