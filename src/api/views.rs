use super::dashboard::DashboardAppState;
use super::error::{data, ApiError, Data};
use crate::engine::{Alert, LastTelemetry, SensorOverview};
use crate::model::{GreenhouseId, SensorFilter, SensorId};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct OverviewParams {
    pub greenhouse_id: Option<GreenhouseId>,
}

/// Read-only joined views over sensors and their latest telemetry
pub fn create_views_router(state: Arc<DashboardAppState>) -> Router {
    Router::new()
        .route("/views/last-telemetry", get(list_last_telemetry))
        .route("/views/last-telemetry/:sensor_id", get(get_last_telemetry))
        .route("/views/sensor-overview", get(get_sensor_overview))
        .route("/views/offline-alerts", get(get_offline_alerts))
        .with_state(state)
}

/// GET /views/last-telemetry?greenhouse_id=&sensor_type=
async fn list_last_telemetry(
    State(state): State<Arc<DashboardAppState>>,
    Query(filter): Query<SensorFilter>,
) -> Result<Json<Data<Vec<LastTelemetry>>>, ApiError> {
    Ok(data(state.engine.last_telemetry(&filter).await?))
}

/// GET /views/last-telemetry/:sensor_id
async fn get_last_telemetry(
    State(state): State<Arc<DashboardAppState>>,
    Path(sensor_id): Path<SensorId>,
) -> Result<Json<Data<LastTelemetry>>, ApiError> {
    Ok(data(state.engine.last_telemetry_for_sensor(sensor_id).await?))
}

/// GET /views/sensor-overview?greenhouse_id=
async fn get_sensor_overview(
    State(state): State<Arc<DashboardAppState>>,
    Query(params): Query<OverviewParams>,
) -> Result<Json<Data<Vec<SensorOverview>>>, ApiError> {
    let rows = state
        .engine
        .sensor_overview(Utc::now(), params.greenhouse_id)
        .await?;
    Ok(data(rows))
}

/// GET /views/offline-alerts
///
/// Every DELAYED or OFFLINE sensor, most recently seen first.
async fn get_offline_alerts(
    State(state): State<Arc<DashboardAppState>>,
) -> Result<Json<Data<Vec<Alert>>>, ApiError> {
    Ok(data(state.engine.offline_alerts(Utc::now()).await?))
}
