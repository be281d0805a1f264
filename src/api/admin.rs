use super::error::{data, ApiError, Data};
use crate::config::{RuntimeConfig, SharedRuntimeConfig};
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// State for the admin API.
#[derive(Clone)]
pub struct AdminAppState {
    pub runtime_config: SharedRuntimeConfig,
    /// Upper bound accepted for `recent_alert_limit`
    pub max_alert_limit: usize,
}

/// Partial update body; only fields present in the request are changed.
#[derive(Deserialize)]
pub struct RuntimeConfigUpdate {
    pub delayed_multiplier: Option<f64>,
    pub recent_alert_limit: Option<usize>,
}

pub fn create_admin_router(state: AdminAppState) -> Router {
    Router::new()
        .route("/api/admin/config", get(get_config).put(put_config))
        .with_state(Arc::new(state))
}

/// GET /api/admin/config
async fn get_config(State(state): State<Arc<AdminAppState>>) -> Json<Data<RuntimeConfig>> {
    let cfg = state
        .runtime_config
        .read()
        .expect("RuntimeConfig lock poisoned")
        .clone();
    data(cfg)
}

/// PUT /api/admin/config
///
/// The update is validated as a whole before it is stored; a rejected
/// update leaves the running config untouched.
async fn put_config(
    State(state): State<Arc<AdminAppState>>,
    Json(update): Json<RuntimeConfigUpdate>,
) -> Result<Json<Data<RuntimeConfig>>, ApiError> {
    let mut cfg = state
        .runtime_config
        .write()
        .expect("RuntimeConfig lock poisoned");

    let mut next = cfg.clone();
    if let Some(v) = update.delayed_multiplier {
        next.delayed_multiplier = v;
    }
    if let Some(v) = update.recent_alert_limit {
        next.recent_alert_limit = v;
    }

    next.validate()?;
    if next.recent_alert_limit > state.max_alert_limit {
        return Err(ApiError::BadRequest(format!(
            "recent_alert_limit must not exceed {}",
            state.max_alert_limit
        )));
    }

    info!(
        delayed_multiplier = next.delayed_multiplier,
        recent_alert_limit = next.recent_alert_limit,
        "Runtime config updated"
    );
    *cfg = next.clone();
    Ok(data(next))
}
