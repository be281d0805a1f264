// Integration tests for the optional x-api-key layer

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use greenhouse::api::{create_app, AppContext};
use greenhouse::config::{new_runtime_config, RuntimeConfig};
use greenhouse::engine::DashboardEngine;
use greenhouse::store::SqliteStore;
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app(api_key: Option<&str>) -> Router {
    let store = Arc::new(SqliteStore::open(":memory:").unwrap());
    let runtime_config = new_runtime_config(RuntimeConfig::default());
    let engine = DashboardEngine::new(store.clone(), store.clone(), runtime_config.clone());
    create_app(AppContext {
        engine: Arc::new(engine),
        store,
        runtime_config,
        max_alert_limit: 500,
        api_key: api_key.map(|k| k.to_string()),
    })
}

async fn status_of(app: Router, method: &str, uri: &str, key: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    let body = if method == "PUT" {
        builder = builder.header("Content-Type", "application/json");
        Body::from(r#"{"recent_alert_limit": 5}"#)
    } else {
        Body::empty()
    };

    app.oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_no_key_configured_is_open() {
    let app = create_test_app(None);
    assert_eq!(
        status_of(app, "GET", "/dashboard/summary", None).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_missing_key_rejected() {
    let app = create_test_app(Some("gh-key"));
    assert_eq!(
        status_of(app, "GET", "/dashboard/summary", None).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let app = create_test_app(Some("gh-key"));
    assert_eq!(
        status_of(app, "GET", "/greenhouses", Some("nope")).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_correct_key_accepted() {
    let app = create_test_app(Some("gh-key"));
    assert_eq!(
        status_of(app, "GET", "/views/offline-alerts", Some("gh-key")).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_unauthorized_body() {
    let app = create_test_app(Some("gh-key"));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard/home")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_health_skips_key() {
    let app = create_test_app(Some("gh-key"));
    assert_eq!(
        status_of(app, "GET", "/health", None).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_admin_put_requires_key() {
    let app = create_test_app(Some("gh-key"));
    assert_eq!(
        status_of(app.clone(), "PUT", "/api/admin/config", None).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_of(app, "PUT", "/api/admin/config", Some("gh-key")).await,
        StatusCode::OK
    );
}
