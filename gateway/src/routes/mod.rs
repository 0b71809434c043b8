//! HTTP handlers, one module per resource.

pub mod health;
pub mod mirrors;
pub mod root;
pub mod temporal;
pub mod threat;

use axum::body::Bytes;
use serde_json::Value;

use crate::error::ApiError;

/// Default page size for list endpoints.
pub const LIST_LIMIT: usize = 100;

/// Parses a raw request body as JSON, mapping any failure to
/// [`ApiError::InvalidJson`].
pub(crate) fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)
}
