use super::error::{data, ApiError, Data};
use crate::engine::{Alert, DashboardEngine, FleetSummary, GreenhouseSummary, HomeDashboard, QuickSummary};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for the dashboard and views APIs
pub struct DashboardAppState {
    pub engine: Arc<DashboardEngine>,
    /// Upper bound for client-supplied alert limits
    pub max_alert_limit: usize,
}

#[derive(Deserialize)]
pub struct GreenhouseParams {
    pub sensor_type: Option<String>,
}

#[derive(Deserialize)]
pub struct AlertParams {
    pub limit: Option<usize>,
}

pub fn create_dashboard_router(state: Arc<DashboardAppState>) -> Router {
    Router::new()
        .route("/dashboard/summary", get(get_summary))
        .route("/dashboard/greenhouses", get(get_greenhouses))
        .route("/dashboard/alerts/recent", get(get_recent_alerts))
        .route("/dashboard/quick-summary", get(get_quick_summary))
        .route("/dashboard/home", get(get_home))
        .with_state(state)
}

/// GET /dashboard/summary
async fn get_summary(
    State(state): State<Arc<DashboardAppState>>,
) -> Result<Json<Data<FleetSummary>>, ApiError> {
    Ok(data(state.engine.fleet_summary(Utc::now()).await?))
}

/// GET /dashboard/greenhouses?sensor_type=ambient
async fn get_greenhouses(
    State(state): State<Arc<DashboardAppState>>,
    Query(params): Query<GreenhouseParams>,
) -> Result<Json<Data<Vec<GreenhouseSummary>>>, ApiError> {
    let sensor_type = params.sensor_type.filter(|t| !t.trim().is_empty());
    let rows = state
        .engine
        .greenhouse_summaries(Utc::now(), sensor_type.as_deref())
        .await?;
    Ok(data(rows))
}

/// GET /dashboard/alerts/recent?limit=N
///
/// `limit` is clamped to the configured maximum; omitted means the runtime
/// default.
async fn get_recent_alerts(
    State(state): State<Arc<DashboardAppState>>,
    Query(params): Query<AlertParams>,
) -> Result<Json<Data<Vec<Alert>>>, ApiError> {
    let limit = params.limit.map(|l| l.min(state.max_alert_limit));
    Ok(data(state.engine.recent_alerts(Utc::now(), limit).await?))
}

/// GET /dashboard/quick-summary
async fn get_quick_summary(
    State(state): State<Arc<DashboardAppState>>,
) -> Result<Json<Data<QuickSummary>>, ApiError> {
    Ok(data(state.engine.quick_summary(Utc::now()).await?))
}

/// GET /dashboard/home
async fn get_home(
    State(state): State<Arc<DashboardAppState>>,
) -> Result<Json<Data<HomeDashboard>>, ApiError> {
    Ok(data(state.engine.home(Utc::now()).await?))
}
