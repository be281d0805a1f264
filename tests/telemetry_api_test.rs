// Integration tests for telemetry ingestion and listing

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use greenhouse::api::{create_app, AppContext};
use greenhouse::config::{new_runtime_config, RuntimeConfig};
use greenhouse::engine::DashboardEngine;
use greenhouse::model::{NewGreenhouse, NewReading, NewSensor, SensorId};
use greenhouse::store::SqliteStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app() -> (Router, Arc<SqliteStore>, SensorId) {
    let store = Arc::new(SqliteStore::open(":memory:").unwrap());
    let gh = store
        .create_greenhouse(
            &NewGreenhouse {
                name: "North".to_string(),
                location: None,
            },
            Utc::now(),
        )
        .unwrap();
    let sensor = store
        .create_sensor(
            &NewSensor {
                greenhouse_id: gh.id,
                device_key: "esp32-a1".to_string(),
                sensor_type: "ambient".to_string(),
                name: None,
                expected_interval_s: Some(60),
            },
            Utc::now(),
        )
        .unwrap();

    let runtime_config = new_runtime_config(RuntimeConfig::default());
    let engine = DashboardEngine::new(store.clone(), store.clone(), runtime_config.clone());
    let app = create_app(AppContext {
        engine: Arc::new(engine),
        store: store.clone(),
        runtime_config,
        max_alert_limit: 500,
        api_key: None,
    });
    (app, store, sensor.id)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn backfill(store: &SqliteStore, sensor_id: SensorId, hours_ago: i64, temp: f64) {
    store
        .append_reading(
            sensor_id,
            &NewReading {
                received_at: Utc::now() - Duration::hours(hours_ago),
                temp_c: Some(temp),
                hum_pct: Some(60.0),
                rssi: None,
                uptime_s: None,
                raw: json!({ "temp": temp }),
            },
        )
        .unwrap();
}

#[tokio::test]
async fn test_ingest_makes_sensor_active() {
    let (app, _store, sensor_id) = create_test_app();

    let (_, body) = send(&app, "GET", "/dashboard/quick-summary", None).await;
    assert_eq!(body["data"]["active_sensors"], 0);

    let (status, body) = send(
        &app,
        "POST",
        "/telemetry/ambient",
        Some(json!({
            "sensor_id": sensor_id,
            "temp_c": 24.5,
            "hum_pct": 61.0,
            "rssi": -71,
            "uptime_s": 86400,
            "raw": { "t": 24.5, "h": 61.0, "fw": "2.1.0" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sensor_id"], sensor_id);
    assert_eq!(body["data"]["raw"]["fw"], "2.1.0");
    let reading_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = send(&app, "GET", "/dashboard/quick-summary", None).await;
    assert_eq!(body["data"]["active_sensors"], 1);
    assert_eq!(body["data"]["uptime_rate"], 100);

    let (status, body) = send(&app, "GET", &format!("/telemetry/ambient/{}", reading_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rssi"], -71);

    let (_, body) = send(&app, "GET", &format!("/sensors/{}", sensor_id), None).await;
    assert!(body["data"]["last_seen_at"].is_string());
}

#[tokio::test]
async fn test_ingest_validation() {
    let (app, _store, sensor_id) = create_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/telemetry/ambient",
        Some(json!({ "sensor_id": sensor_id, "temp_c": 20.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "sensor_id and raw are required");

    let (status, _) = send(
        &app,
        "POST",
        "/telemetry/ambient",
        Some(json!({ "sensor_id": 4242, "raw": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_and_paging() {
    let (app, store, sensor_id) = create_test_app();
    for h in 1..=5 {
        backfill(&store, sensor_id, h, 20.0 + h as f64);
    }

    let (status, body) = send(&app, "GET", "/telemetry/ambient", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["temp_c"], 21.0);

    let uri = format!("/telemetry/ambient?sensor_id={}&limit=2&offset=1", sensor_id);
    let (_, body) = send(&app, "GET", &uri, None).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["temp_c"], 22.0);

    let start = (Utc::now() - Duration::minutes(150)).to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let uri = format!("/telemetry/ambient?start_date={}", start);
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/telemetry/ambient?start_date=last-week", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/telemetry/ambient?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sensor_measurements() {
    let (app, store, sensor_id) = create_test_app();
    for h in 1..=3 {
        backfill(&store, sensor_id, h, 18.0);
    }

    let uri = format!("/sensors/{}/measurements?limit=2", sensor_id);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sensor"]["device_key"], "esp32-a1");
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["measurements"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/sensors/31337/measurements", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_reading_keeps_last_seen() {
    let (app, store, sensor_id) = create_test_app();
    backfill(&store, sensor_id, 1, 19.0);
    let reading_id = store.latest(sensor_id).unwrap().unwrap().id;
    let before = store.sensor(sensor_id).unwrap().unwrap().last_seen_at;

    let (status, _) = send(&app, "DELETE", &format!("/telemetry/ambient/{}", reading_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/telemetry/ambient/{}", reading_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let after = store.sensor(sensor_id).unwrap().unwrap().last_seen_at;
    assert_eq!(before, after);

    let (status, _) = send(&app, "DELETE", &format!("/telemetry/ambient/{}", reading_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
