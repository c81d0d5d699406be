// tests/test_history_api.rs


use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;

use plantcare::history::{ScanRecord, ScanStats, ScanStore, ValidationMode};
use plantcare::server::db::{self, PoolSettings};
use plantcare::AppState;
use test_helpers::{app_for, create_test_app, create_test_state, create_test_store, scan_body, send};

#[tokio::test]
async fn test_empty_table_reports_zeros() {
    let app = create_test_app(ValidationMode::Strict).await;

    let (status, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats, json!({"totalScans": 0, "healthyPlants": 0, "diseasedPlants": 0}));

    let (status, history) = send(&app, "GET", "/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_create_then_stats_scenario() {
    let app = create_test_app(ValidationMode::Strict).await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/history",
        Some(scan_body("Tomato", "Tomato Healthy", 97.5)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created, json!({"id": 1}));

    let (_, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(stats, json!({"totalScans": 1, "healthyPlants": 1, "diseasedPlants": 0}));
}

#[tokio::test]
async fn test_history_round_trips_newest_first() {
    let app = create_test_app(ValidationMode::Strict).await;
    let submitted = vec![
        scan_body("Tomato", "Tomato Healthy", 97.5),
        scan_body("Tomato", "Tomato Late Blight", 72.25),
        scan_body("Corn", "Common Rust", 66.0),
        scan_body("Apple", "Apple healthy", 99.0),
    ];
    for body in &submitted {
        let (status, _) = send(&app, "POST", "/api/history", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, history) = send(&app, "GET", "/api/history", None).await;
    let records: Vec<ScanRecord> = serde_json::from_value(history.clone()).unwrap();
    assert_eq!(records.len(), submitted.len());

    for (record, body) in records.iter().zip(submitted.iter().rev()) {
        assert_eq!(record.plant_name.as_deref(), body["plant_name"].as_str());
        assert_eq!(record.disease_name.as_deref(), body["disease_name"].as_str());
        assert_eq!(record.confidence, body["confidence"].as_f64());
        assert_eq!(record.image_url.as_deref(), body["image_url"].as_str());

        // remedies come back as the JSON text they were stored as
        let remedies: Value = serde_json::from_str(record.remedies.as_deref().unwrap()).unwrap();
        assert_eq!(remedies, body["remedies"]);
        assert!(record.diagnosis().is_some());
    }

    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]), "ids not newest first: {ids:?}");
    assert!(records.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    // wire shape uses the column names and hides the encoding tag
    let first = history[0].as_object().unwrap();
    for key in ["id", "plant_name", "disease_name", "confidence", "image_url", "remedies", "created_at"] {
        assert!(first.contains_key(key), "missing {key}");
    }
    assert!(!first.contains_key("remedies_encoding"));

    let (_, stats) = send(&app, "GET", "/api/stats", None).await;
    let stats: ScanStats = serde_json::from_value(stats).unwrap();
    assert_eq!(stats.total_scans, records.len() as i64);
    assert_eq!(stats.healthy_plants, 2);
    assert_eq!(stats.diseased_plants, 2);
    assert_eq!(stats.healthy_plants + stats.diseased_plants, stats.total_scans);
    assert_eq!(ScanStats::from_records(&records), stats);
}

#[tokio::test]
async fn test_identical_submissions_create_distinct_rows() {
    let app = create_test_app(ValidationMode::Strict).await;
    let body = scan_body("Pepper", "Bacterial Spot", 80.0);

    let (_, a) = send(&app, "POST", "/api/history", Some(body.clone())).await;
    let (_, b) = send(&app, "POST", "/api/history", Some(body)).await;

    assert_ne!(a["id"], b["id"]);
    let (_, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(stats["totalScans"], 2);
}

#[tokio::test]
async fn test_strict_mode_rejects_bad_input() {
    let app = create_test_app(ValidationMode::Strict).await;

    let out_of_range = scan_body("Tomato", "Tomato Healthy", 140.0);
    let (status, error) = send(&app, "POST", "/api/history", Some(out_of_range)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error_code"], "BAD_REQUEST");
    assert!(error["message"].as_str().unwrap().contains("confidence"));

    let mut missing = scan_body("Tomato", "Tomato Healthy", 90.0);
    missing.as_object_mut().unwrap().remove("disease_name");
    let (status, error) = send(&app, "POST", "/api/history", Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["message"].as_str().unwrap().contains("disease_name"));

    let (_, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(stats["totalScans"], 0);
}

#[tokio::test]
async fn test_lenient_mode_stores_partial_records() {
    let app = create_test_app(ValidationMode::Lenient).await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/history",
        Some(json!({"plant_name": "Mystery", "confidence": 140.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);

    let (_, history) = send(&app, "GET", "/api/history", None).await;
    assert_eq!(history[0]["plant_name"], "Mystery");
    assert_eq!(history[0]["confidence"], 140.0);
    assert_eq!(history[0]["disease_name"], Value::Null);
    assert_eq!(history[0]["remedies"], Value::Null);

    let (_, stats) = send(&app, "GET", "/api/stats", None).await;
    assert_eq!(stats, json!({"totalScans": 1, "healthyPlants": 0, "diseasedPlants": 1}));
}

#[tokio::test]
async fn test_lenient_mode_keeps_explicit_null_remedies() {
    let store = create_test_store().await;
    let app = app_for(AppState::new(store.clone(), ValidationMode::Lenient));

    let (status, _) = send(&app, "POST", "/api/history", Some(json!({"plant_name": "Absent"}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        "POST",
        "/api/history",
        Some(json!({"plant_name": "Explicit", "remedies": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let records = store.list().await.unwrap();
    assert_eq!(records[0].plant_name.as_deref(), Some("Explicit"));
    assert_eq!(records[0].remedies.as_deref(), Some("null"));
    assert_eq!(records[1].plant_name.as_deref(), Some("Absent"));
    assert!(records[1].remedies.is_none());
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let store = create_test_store().await;
    let app = app_for(AppState::new(store.clone(), ValidationMode::Strict));
    store.close().await;

    let (status, error) = send(
        &app,
        "POST",
        "/api/history",
        Some(scan_body("Tomato", "Tomato Healthy", 97.5)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"], true);
    assert_eq!(error["error_code"], "STORAGE_ERROR");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_test_app(ValidationMode::Lenient).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/history")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, error) = send(
        &app,
        "POST",
        "/api/history",
        Some(json!({"plant_name": "Tomato", "confidence": "very"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], true);
}

#[tokio::test]
async fn test_body_limit() {
    let state = create_test_state(ValidationMode::Strict).await;
    let app = plantcare::api::http::http_router(Arc::new(state), 1024);

    let mut body = scan_body("Tomato", "Tomato Healthy", 97.5);
    body["image_url"] = json!(format!("data:image/jpeg;base64,{}", "A".repeat(4096)));
    let (status, error) = send(&app, "POST", "/api/history", Some(body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error["error_code"], "PAYLOAD_TOO_LARGE");

    // the default limit admits multi-megabyte data URLs
    let app = create_test_app(ValidationMode::Strict).await;
    let mut body = scan_body("Tomato", "Tomato Healthy", 97.5);
    let image = format!("data:image/jpeg;base64,{}", "A".repeat(5 * 1024 * 1024));
    body["image_url"] = json!(image);
    let (status, _) = send(&app, "POST", "/api/history", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, history) = send(&app, "GET", "/api/history", None).await;
    assert_eq!(history[0]["image_url"].as_str().unwrap().len(), image.len());
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("concurrent.db").display());
    let settings = PoolSettings {
        max_connections: 5,
        ..PoolSettings::default()
    };
    let pool = db::create_optimized_pool(&url, &settings).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let store = ScanStore::new(pool);
    let app = app_for(AppState::new(store.clone(), ValidationMode::Strict));

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..50 {
        let app = app.clone();
        tasks.spawn(async move {
            let disease = if i % 5 == 0 { "Tomato Healthy" } else { "Tomato Late Blight" };
            let (status, created) = send(&app, "POST", "/api/history", Some(scan_body("Tomato", disease, 75.0))).await;
            assert_eq!(status, StatusCode::OK);
            created["id"].as_i64().unwrap()
        });
    }

    let mut ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        ids.push(result.unwrap());
    }

    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 50);

    let records = store.list().await.unwrap();
    assert_eq!(records.len(), 50);
    let listed: HashSet<i64> = records.iter().map(|r| r.id).collect();
    assert_eq!(listed, unique);

    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=50).collect::<Vec<i64>>());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats, ScanStats { total_scans: 50, healthy_plants: 10, diseased_plants: 40 });

    store.close().await;
}

#[tokio::test]
async fn test_health_reports_schema_and_version_header() {
    let app = create_test_app(ValidationMode::Strict).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-api-version").unwrap(),
        plantcare::api::http::API_VERSION
    );

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["schema_version"].as_i64().unwrap() >= 1);
    assert_eq!(health["diagnosis_provider"], Value::Null);
}
