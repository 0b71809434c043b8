//! Gateway binary.
//!
//! Embeds a RocksDB-backed `MirrorService`, a Prometheus metrics exporter
//! on `/metrics`, and serves the HTTP API built by
//! [`mirror_gateway::router`].

use std::sync::Arc;

use tokio::signal;

use mirror::{
    DefaultMirrorService, MetricsRegistry, MirrorConfig, MirrorService, RocksDbMirrorStore,
    run_prometheus_http_server,
};
use mirror_gateway::{AppState, GatewayConfig, SharedState, router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "mirror_gateway=info,mirror=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let gateway_cfg = GatewayConfig::from_env().map_err(|e| e.to_string())?;
    let mirror_cfg = MirrorConfig::from_env().map_err(|e| e.to_string())?;

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if mirror_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = mirror_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage + service
    // ---------------------------

    let store = RocksDbMirrorStore::open(&mirror_cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e}",
            mirror_cfg.storage.path
        )
    })?;

    let service: DefaultMirrorService = MirrorService::from_config(&mirror_cfg, store)
        .map_err(|e| format!("failed to configure mirror service: {e}"))?
        .with_metrics(metrics);

    if mirror_cfg.upstream.mock_bitcoin {
        tracing::warn!("MOCK_BITCOIN is set: bitcoin fetches return synthetic blocks");
    }

    let app_state: SharedState<RocksDbMirrorStore> =
        Arc::new(AppState::new(service, mirror_cfg.upstream.mock_bitcoin));

    // ---------------------------
    // axum 0.8 server
    // ---------------------------

    let app = router(app_state);

    tracing::info!("mirror gateway listening on http://{}", gateway_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(gateway_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", gateway_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
