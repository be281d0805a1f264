// HTTP API: dashboard, views, registry management, telemetry and admin

pub mod admin;
pub mod auth_middleware;
pub mod dashboard;
pub mod error;
pub mod registry;
pub mod telemetry;
pub mod views;

pub use admin::{create_admin_router, AdminAppState};
pub use auth_middleware::{require_api_key, ApiKeyState};
pub use dashboard::{create_dashboard_router, DashboardAppState};
pub use error::ApiError;
pub use registry::{create_registry_router, RegistryAppState};
pub use telemetry::{create_telemetry_router, TelemetryAppState};
pub use views::create_views_router;

use crate::config::SharedRuntimeConfig;
use crate::engine::DashboardEngine;
use crate::store::SqliteStore;
use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// Everything the routers need, built once in `main`
pub struct AppContext {
    pub engine: Arc<DashboardEngine>,
    pub store: Arc<SqliteStore>,
    pub runtime_config: SharedRuntimeConfig,
    pub max_alert_limit: usize,
    pub api_key: Option<String>,
}

/// GET /health, never behind the API key
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Merge every router and apply the API key layer (health stays open).
pub fn create_app(ctx: AppContext) -> Router {
    let dashboard_state = Arc::new(DashboardAppState {
        engine: Arc::clone(&ctx.engine),
        max_alert_limit: ctx.max_alert_limit,
    });
    let registry_state = Arc::new(RegistryAppState {
        store: Arc::clone(&ctx.store),
        engine: Arc::clone(&ctx.engine),
    });
    let telemetry_state = Arc::new(TelemetryAppState {
        store: Arc::clone(&ctx.store),
        engine: Arc::clone(&ctx.engine),
    });
    let admin_state = AdminAppState {
        runtime_config: ctx.runtime_config,
        max_alert_limit: ctx.max_alert_limit,
    };
    let key_state = Arc::new(ApiKeyState {
        api_key: ctx.api_key,
    });

    Router::new()
        .merge(create_dashboard_router(dashboard_state.clone()))
        .merge(create_views_router(dashboard_state))
        .merge(create_registry_router(registry_state))
        .merge(create_telemetry_router(telemetry_state))
        .merge(create_admin_router(admin_state))
        .layer(middleware::from_fn_with_state(key_state, require_api_key))
        .merge(create_health_router())
}
