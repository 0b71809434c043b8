//! Shared application state.

use std::sync::Arc;

use mirror::MirrorService;

/// Shared state held by the request handlers.
///
/// This is wrapped in an [`Arc`] and passed to handlers via Axum's `State`
/// extractor. Generic over the store so tests can run against the
/// in-memory backend.
pub struct AppState<S> {
    /// The mirror pipeline (adapters + store + scorer + metrics).
    pub service: MirrorService<S>,
    /// Whether the Bitcoin adapter is the synthetic one.
    pub mock_bitcoin: bool,
}

impl<S> AppState<S> {
    pub fn new(service: MirrorService<S>, mock_bitcoin: bool) -> Self {
        Self {
            service,
            mock_bitcoin,
        }
    }
}

/// Thread-safe alias for `AppState`.
pub type SharedState<S> = Arc<AppState<S>>;
