//! Mapping of pipeline errors onto HTTP responses.
//!
//! Every error body is a JSON object with an `"error"` field.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use mirror::{EncodingError, FetchError, MirrorError, ScoringError};

/// Errors returned by the gateway handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Mirror(#[from] MirrorError),
    /// Request body is not JSON (or not the JSON shape a handler needs).
    #[error("invalid json")]
    InvalidJson,
    /// Caller-supplied temporal-lock fields could not be encoded.
    #[error("encode_failed")]
    EncodeFailed(EncodingError),
    /// Unknown route parameter (chain name or entry id).
    #[error("not found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Mirror(e) => mirror_status(e),
            ApiError::InvalidJson | ApiError::EncodeFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

fn mirror_status(err: &MirrorError) -> StatusCode {
    match err {
        MirrorError::Fetch(FetchError::Configuration(_))
        | MirrorError::Scoring(ScoringError::Configuration(_)) => StatusCode::BAD_REQUEST,
        MirrorError::NotFound(_) => StatusCode::NOT_FOUND,
        MirrorError::Fetch(_)
        | MirrorError::Scoring(_)
        | MirrorError::Storage(_)
        | MirrorError::MalformedBlock(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            ApiError::EncodeFailed(detail) => json!({
                "error": "encode_failed",
                "detail": detail.to_string(),
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
