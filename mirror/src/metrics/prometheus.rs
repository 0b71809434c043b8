//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed mirror metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Mirror pipeline metrics.
///
/// These are registered into a [`Registry`] and updated by the façade.
#[derive(Clone)]
pub struct MirrorMetrics {
    /// Latency of one full fetch → commit → append cycle, in seconds.
    pub fetch_seconds: Histogram,
    /// Entries appended to the mirror log, by chain.
    pub entries_appended: IntCounterVec,
    /// Fetch cycles that failed before anything was stored, by chain.
    pub fetch_failures: IntCounterVec,
    /// Threat verdicts recorded.
    pub verdicts_recorded: IntCounter,
}

impl MirrorMetrics {
    /// Registers mirror metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        // Upstream RPC dominates; buckets go up to the default RPC timeout.
        let fetch_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mirror_fetch_seconds",
                "Time to fetch, canonicalize, commit and store one block in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )?;
        registry.register(Box::new(fetch_seconds.clone()))?;

        let entries_appended = IntCounterVec::new(
            Opts::new(
                "mirror_entries_appended",
                "Total number of entries appended to the mirror log",
            ),
            &["chain"],
        )?;
        registry.register(Box::new(entries_appended.clone()))?;

        let fetch_failures = IntCounterVec::new(
            Opts::new(
                "mirror_fetch_failures",
                "Total number of fetch cycles that failed without storing an entry",
            ),
            &["chain"],
        )?;
        registry.register(Box::new(fetch_failures.clone()))?;

        let verdicts_recorded = IntCounter::with_opts(Opts::new(
            "mirror_verdicts_recorded",
            "Total number of threat verdicts persisted",
        ))?;
        registry.register(Box::new(verdicts_recorded.clone()))?;

        Ok(Self {
            fetch_seconds,
            entries_appended,
            fetch_failures,
            verdicts_recorded,
        })
    }
}

/// Wrapper around a Prometheus registry and the mirror metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub mirror: MirrorMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the mirror metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("node".to_string()), None)?;
        let mirror = MirrorMetrics::register(&registry)?;
        Ok(Self { registry, mirror })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (status, content_type, body) = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => (
            StatusCode::OK,
            "text/plain; version=0.0.4",
            Bytes::from(metrics.gather_text()),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            "text/plain",
            Bytes::from_static(b"not found"),
        ),
    };

    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn mirror_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = MirrorMetrics::register(&registry).expect("register metrics");

        metrics.fetch_seconds.observe(0.123);
        metrics.entries_appended.with_label_values(&["bitcoin"]).inc();
        metrics.fetch_failures.with_label_values(&["ethereum"]).inc();
        metrics.verdicts_recorded.inc();

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.mirror.fetch_seconds.observe(0.01);
        let text = registry.gather_text();
        assert!(text.contains("mirror_fetch_seconds"));
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Registry::new();
        MirrorMetrics::register(&registry).expect("first registration");
        assert!(MirrorMetrics::register(&registry).is_err());
    }
}
