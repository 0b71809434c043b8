use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt; // for oneshot

use mirror::{
    Chain, ChainBlockDescriptor, ChainFetcher, EthereumRpcFetcher, FetchError, InMemoryMirrorStore,
    MirrorService, MirrorStore, MockBitcoinFetcher, MockSeed, RocksDbConfig, RocksDbMirrorStore,
    ScoringError, ThreatScorer, ThreatVerdict, VerdictLog,
};
use mirror_gateway::{AppState, router};

struct DownBitcoin;

#[async_trait]
impl ChainFetcher for DownBitcoin {
    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    async fn fetch_head(&self) -> Result<ChainBlockDescriptor, FetchError> {
        Err(FetchError::Transport {
            method: "getbestblockhash".to_string(),
            status: Some(502),
            message: "HTTP status 502 Bad Gateway".to_string(),
        })
    }
}

struct StubScorer;

#[async_trait]
impl ThreatScorer for StubScorer {
    async fn score(&self, tx: &Value) -> Result<ThreatVerdict, ScoringError> {
        let action = if tx["value"].as_u64().unwrap_or(0) > 1_000 {
            "FLAG"
        } else {
            "ALLOW"
        };
        ThreatVerdict::from_raw(json!({"threat_score": 0.4, "action": action}))
    }
}

fn app_with<S>(service: MirrorService<S>, mock_bitcoin: bool) -> Router
where
    S: MirrorStore + VerdictLog + 'static,
{
    router(Arc::new(AppState::new(service, mock_bitcoin)))
}

/// Mock Bitcoin with a fixed seed, unconfigured Ethereum, stub scorer.
fn mock_app() -> Router {
    let service = MirrorService::new(InMemoryMirrorStore::new())
        .with_fetcher(Arc::new(MockBitcoinFetcher::new(MockSeed::Fixed(1_700_000_000))))
        .with_fetcher(Arc::new(
            EthereumRpcFetcher::new(None, Duration::from_secs(1)).unwrap(),
        ))
        .with_scorer(Arc::new(StubScorer));
    app_with(service, true)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Body>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if body.is_some() {
        req = req.header("content-type", "application/json");
    }
    let req = req.body(body.unwrap_or_else(Body::empty)).unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(Body::from(body.to_string()))).await
}

#[tokio::test]
async fn failed_fetch_leaves_no_entry() {
    let service = MirrorService::new(InMemoryMirrorStore::new()).with_fetcher(Arc::new(DownBitcoin));
    let app = app_with(service, false);

    let (status, body) = send(&app, "POST", "/mirror/bitcoin/fetch", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("502"));

    let (status, body) = send(&app, "GET", "/mirrors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"mirrors": []}));
}

#[tokio::test]
async fn unconfigured_ethereum_is_a_client_error() {
    let app = mock_app();
    let (status, body) = send(&app, "POST", "/mirror/ethereum/fetch", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "WEB3_URL not configured"}));
}

#[tokio::test]
async fn same_height_fetched_twice_gives_two_entries() {
    let app = mock_app();

    let (status, first) = send(&app, "POST", "/mirror/bitcoin/fetch", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "ok");
    assert_eq!(first["merkle_root"].as_str().unwrap().len(), 64);

    let (_, second) = send(&app, "POST", "/mirror/bitcoin/fetch", None).await;
    assert_eq!(first["merkle_root"], second["merkle_root"]);

    let (_, body) = send(&app, "GET", "/mirrors", None).await;
    let mirrors = body["mirrors"].as_array().unwrap();
    assert_eq!(mirrors.len(), 2);

    // Newest first.
    assert_eq!(mirrors[0]["id"], second["id"]);
    assert_eq!(mirrors[1]["id"], first["id"]);
    assert_ne!(mirrors[0]["id"], mirrors[1]["id"]);
    assert_eq!(mirrors[0]["block_number"], mirrors[1]["block_number"]);
    assert_eq!(mirrors[0]["chain"], "bitcoin");
    assert_eq!(mirrors[0]["block_number"], 1_700_000_000u64 % 1_000_000);

    for id in [&first["id"], &second["id"]] {
        let (status, _) = send(&app, "GET", &format!("/mirror/{id}/temporal"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn temporal_lock_is_derived_from_stored_entry() {
    let app = mock_app();
    let (_, fetched) = send(&app, "POST", "/mirror/bitcoin/fetch", None).await;

    let (_, list) = send(&app, "GET", "/mirrors", None).await;
    let entry = &list["mirrors"][0];

    let (status, body) = send(&app, "GET", &format!("/mirror/{}/temporal", fetched["id"]), None).await;
    assert_eq!(status, StatusCode::OK);

    let puzzle = &body["puzzle"];
    assert_eq!(
        puzzle["reveal_time"].as_u64().unwrap(),
        entry["timestamp"].as_u64().unwrap() + 300
    );
    assert_eq!(puzzle["hash_chain_depth"], 1000);
    assert_eq!(puzzle["initial_hash"], entry["merkle_root"]);

    let scale_hex = body["scale_hex"].as_str().unwrap();
    assert!(scale_hex.starts_with("0x"));
    assert_eq!(scale_hex.len(), 2 + 88);
    assert!(scale_hex.ends_with(entry["merkle_root"].as_str().unwrap()));
    assert_eq!(&scale_hex[18..26], "e8030000");
    assert_eq!(body["scale_b64"].as_str().unwrap().len(), 60);
}

#[tokio::test]
async fn unknown_entry_is_404() {
    let app = mock_app();

    let (status, body) = send(&app, "GET", "/mirror/999/temporal", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not found"}));

    let (status, _) = send(&app, "GET", "/mirror/abc/temporal", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn encode_temporal_lock_reference_layout() {
    let app = mock_app();
    let fields = json!({
        "reveal_time": 1_670_000_000u64,
        "hash_chain_depth": 1000,
        "initial_hash": format!("0x{}", "ab".repeat(32)),
    });
    let expected = format!("0x802d8a6300000000e8030000{}", "ab".repeat(32));

    let (status, nested) = post_json(&app, "/encode_temporal_lock", json!({"temporal_lock": fields.clone()})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nested["scale_hex"], expected.as_str());

    let (status, flat) = post_json(&app, "/encode_temporal_lock", fields).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flat, nested);
}

#[tokio::test]
async fn encode_temporal_lock_defaults_missing_fields_to_zero() {
    let app = mock_app();
    let (status, body) = post_json(&app, "/encode_temporal_lock", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scale_hex"], format!("0x{}", "00".repeat(44)).as_str());
}

#[tokio::test]
async fn encode_temporal_lock_rejects_bad_input() {
    let app = mock_app();

    let (status, body) = send(&app, "POST", "/encode_temporal_lock", Some(Body::from("{not json"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid json"}));

    let (status, body) = post_json(
        &app,
        "/encode_temporal_lock",
        json!({"temporal_lock": {"initial_hash": "0xnothex"}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "encode_failed");
    assert!(body["detail"].as_str().unwrap().contains("initial_hash"));
}

#[tokio::test]
async fn encode_temporal_lock_rejects_non_object_nested_value() {
    let app = mock_app();

    for nested in [json!("0xabab"), json!(42), json!([1, 2, 3])] {
        let (status, body) = post_json(
            &app,
            "/encode_temporal_lock",
            json!({"temporal_lock": nested, "reveal_time": 7}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "encode_failed");
        assert!(body["detail"].as_str().unwrap().contains("temporal_lock"));
    }

    let (status, body) = post_json(
        &app,
        "/encode_temporal_lock",
        json!({"temporal_lock": null, "reveal_time": 7}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["scale_hex"].as_str().unwrap().starts_with("0x0700000000000000"));
}

#[tokio::test]
async fn transaction_intake_records_verdicts() {
    let app = mock_app();

    let (status, body) = post_json(&app, "/transaction", json!({"hash": "0xa", "value": 5_000})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"result": {"threat_score": 0.4, "action": "FLAG"}}));

    post_json(&app, "/transaction", json!({"hash": "0xb", "value": 1})).await;
    post_json(&app, "/transaction", json!({"hash": "0xc", "value": 9_999})).await;
    send(&app, "POST", "/mirror/bitcoin/fetch", None).await;

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats, json!({"mirrors": 1, "verdicts": 3, "actions": {"ALLOW": 1, "FLAG": 2}}));

    let (_, list) = send(&app, "GET", "/verdicts", None).await;
    let verdicts = list["verdicts"].as_array().unwrap();
    assert_eq!(verdicts.len(), 3);
    assert_eq!(verdicts[0]["tx_hash"], "0xc");
    assert_eq!(verdicts[0]["verdict"]["action"], "FLAG");
}

#[tokio::test]
async fn transaction_without_scorer_is_a_client_error() {
    let service = MirrorService::new(InMemoryMirrorStore::new());
    let app = app_with(service, false);

    let (status, body) = post_json(&app, "/transaction", json!({"hash": "0x1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "THREAT_SCORER_URL not configured"}));
}

#[tokio::test]
async fn index_and_health() {
    let app = mock_app();

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "mirror-gateway");
    assert_eq!(body["mock_bitcoin"], true);
    assert!(body["endpoints"].as_array().unwrap().len() >= 9);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn rocksdb_backed_entries_survive_restart() {
    let dir = tempdir().unwrap();
    let cfg = RocksDbConfig {
        path: dir.path().join("mirror-db").to_string_lossy().into_owned(),
        create_if_missing: true,
    };
    let fetcher = Arc::new(MockBitcoinFetcher::new(MockSeed::Fixed(86_400)));

    let first_root = {
        let store = RocksDbMirrorStore::open(&cfg).unwrap();
        let app = app_with(MirrorService::new(store).with_fetcher(fetcher.clone()), true);
        let (status, body) = send(&app, "POST", "/mirror/bitcoin/fetch", None).await;
        assert_eq!(status, StatusCode::OK);
        body["merkle_root"].clone()
    };

    let store = RocksDbMirrorStore::open(&cfg).unwrap();
    let app = app_with(MirrorService::new(store).with_fetcher(fetcher), true);
    send(&app, "POST", "/mirror/bitcoin/fetch", None).await;

    let (_, list) = send(&app, "GET", "/mirrors", None).await;
    let mirrors = list["mirrors"].as_array().unwrap();
    assert_eq!(mirrors.len(), 2);
    assert_eq!(mirrors[0]["id"], 2);
    assert_eq!(mirrors[1]["id"], 1);
    assert_eq!(mirrors[1]["merkle_root"], first_root);
}
