use super::error::{data, ApiError, Data};
use super::telemetry::ReadingParams;
use crate::engine::{DashboardEngine, SensorMeasurements};
use crate::error::EngineError;
use crate::model::{
    Greenhouse, GreenhouseId, GreenhouseUpdate, Heartbeat, HeartbeatState, NewGreenhouse,
    NewSensor, Sensor, SensorFilter, SensorHeartbeat, SensorId, SensorUpdate,
};
use crate::store::SqliteStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Shared state for greenhouse and sensor management
pub struct RegistryAppState {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<DashboardEngine>,
}

/// Body of PUT /sensors/:id/heartbeat
#[derive(Deserialize)]
pub struct HeartbeatBody {
    pub status: HeartbeatState,
}

pub fn create_registry_router(state: Arc<RegistryAppState>) -> Router {
    Router::new()
        .route("/greenhouses", get(list_greenhouses).post(create_greenhouse))
        .route(
            "/greenhouses/:id",
            get(get_greenhouse)
                .put(update_greenhouse)
                .delete(delete_greenhouse),
        )
        .route("/greenhouses/:id/sensors", get(list_greenhouse_sensors))
        .route("/sensors", get(list_sensors).post(create_sensor))
        .route("/sensors/device/:device_key", get(get_sensor_by_device))
        .route(
            "/sensors/:id",
            get(get_sensor).put(update_sensor).delete(delete_sensor),
        )
        .route("/sensors/:id/measurements", get(get_measurements))
        .route(
            "/sensors/:id/heartbeat",
            get(get_heartbeat).put(put_heartbeat).delete(delete_heartbeat),
        )
        .route("/heartbeats", get(list_heartbeats))
        .with_state(state)
}

// ── Greenhouses ─────────────────────────────────────────────────────────────

async fn list_greenhouses(
    State(state): State<Arc<RegistryAppState>>,
) -> Result<Json<Data<Vec<Greenhouse>>>, ApiError> {
    let greenhouses = state
        .store
        .greenhouses()
        .map_err(|e| ApiError::from_store("list_greenhouses", e))?;
    Ok(data(greenhouses))
}

async fn create_greenhouse(
    State(state): State<Arc<RegistryAppState>>,
    Json(body): Json<NewGreenhouse>,
) -> Result<(StatusCode, Json<Data<Greenhouse>>), ApiError> {
    let greenhouse = state
        .store
        .create_greenhouse(&body, Utc::now())
        .map_err(|e| ApiError::from_store("create_greenhouse", e))?;

    info!(greenhouse_id = greenhouse.id, name = %greenhouse.name, "Greenhouse created");
    Ok((StatusCode::CREATED, data(greenhouse)))
}

async fn get_greenhouse(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<GreenhouseId>,
) -> Result<Json<Data<Greenhouse>>, ApiError> {
    state
        .store
        .greenhouse(id)
        .map_err(|e| ApiError::from_store("get_greenhouse", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("greenhouse", id).into())
}

async fn update_greenhouse(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<GreenhouseId>,
    Json(body): Json<GreenhouseUpdate>,
) -> Result<Json<Data<Greenhouse>>, ApiError> {
    state
        .store
        .update_greenhouse(id, &body)
        .map_err(|e| ApiError::from_store("update_greenhouse", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("greenhouse", id).into())
}

/// DELETE /greenhouses/:id, cascading to sensors and their telemetry
async fn delete_greenhouse(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<GreenhouseId>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store
        .delete_greenhouse(id)
        .map_err(|e| ApiError::from_store("delete_greenhouse", e))?;
    if !deleted {
        return Err(EngineError::not_found("greenhouse", id).into());
    }

    info!(greenhouse_id = id, "Greenhouse deleted");
    Ok(Json(json!({ "message": "greenhouse deleted" })))
}

async fn list_greenhouse_sensors(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<GreenhouseId>,
) -> Result<Json<Data<Vec<Sensor>>>, ApiError> {
    if state
        .store
        .greenhouse(id)
        .map_err(|e| ApiError::from_store("get_greenhouse", e))?
        .is_none()
    {
        return Err(EngineError::not_found("greenhouse", id).into());
    }

    let sensors = state
        .store
        .sensors(&SensorFilter::greenhouse(id))
        .map_err(|e| ApiError::from_store("list_sensors", e))?;
    Ok(data(sensors))
}

// ── Sensors ─────────────────────────────────────────────────────────────────

/// GET /sensors?greenhouse_id=&sensor_type=
async fn list_sensors(
    State(state): State<Arc<RegistryAppState>>,
    Query(filter): Query<SensorFilter>,
) -> Result<Json<Data<Vec<Sensor>>>, ApiError> {
    let sensors = state
        .store
        .sensors(&filter)
        .map_err(|e| ApiError::from_store("list_sensors", e))?;
    Ok(data(sensors))
}

async fn create_sensor(
    State(state): State<Arc<RegistryAppState>>,
    Json(body): Json<NewSensor>,
) -> Result<(StatusCode, Json<Data<Sensor>>), ApiError> {
    let sensor = state
        .store
        .create_sensor(&body, Utc::now())
        .map_err(|e| ApiError::from_store("create_sensor", e))?;

    info!(
        sensor_id = sensor.id,
        greenhouse_id = sensor.greenhouse_id,
        device_key = %sensor.device_key,
        expected_interval_s = sensor.expected_interval_s,
        "Sensor registered"
    );
    Ok((StatusCode::CREATED, data(sensor)))
}

async fn get_sensor(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
) -> Result<Json<Data<Sensor>>, ApiError> {
    state
        .store
        .sensor(id)
        .map_err(|e| ApiError::from_store("get_sensor", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("sensor", id).into())
}

async fn get_sensor_by_device(
    State(state): State<Arc<RegistryAppState>>,
    Path(device_key): Path<String>,
) -> Result<Json<Data<Sensor>>, ApiError> {
    state
        .store
        .sensor_by_device_key(&device_key)
        .map_err(|e| ApiError::from_store("get_sensor_by_device_key", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("sensor", device_key).into())
}

async fn update_sensor(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
    Json(body): Json<SensorUpdate>,
) -> Result<Json<Data<Sensor>>, ApiError> {
    state
        .store
        .update_sensor(id, &body)
        .map_err(|e| ApiError::from_store("update_sensor", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("sensor", id).into())
}

async fn delete_sensor(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store
        .delete_sensor(id)
        .map_err(|e| ApiError::from_store("delete_sensor", e))?;
    if !deleted {
        return Err(EngineError::not_found("sensor", id).into());
    }

    info!(sensor_id = id, "Sensor deleted");
    Ok(Json(json!({ "message": "sensor deleted" })))
}

/// GET /sensors/:id/measurements?start_date=&end_date=&limit=&offset=
async fn get_measurements(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
    Query(params): Query<ReadingParams>,
) -> Result<Json<Data<SensorMeasurements>>, ApiError> {
    let query = params.into_query()?;
    Ok(data(state.engine.sensor_measurements(id, query).await?))
}

// ── Heartbeats ──────────────────────────────────────────────────────────────

async fn list_heartbeats(
    State(state): State<Arc<RegistryAppState>>,
) -> Result<Json<Data<Vec<SensorHeartbeat>>>, ApiError> {
    let heartbeats = state
        .store
        .heartbeats()
        .map_err(|e| ApiError::from_store("list_heartbeats", e))?;
    Ok(data(heartbeats))
}

/// GET /sensors/:id/heartbeat, 404 for an unknown sensor or one never reported
async fn get_heartbeat(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
) -> Result<Json<Data<Heartbeat>>, ApiError> {
    if state
        .store
        .sensor(id)
        .map_err(|e| ApiError::from_store("get_sensor", e))?
        .is_none()
    {
        return Err(EngineError::not_found("sensor", id).into());
    }

    state
        .store
        .heartbeat(id)
        .map_err(|e| ApiError::from_store("get_heartbeat", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("heartbeat", id).into())
}

/// PUT /sensors/:id/heartbeat {"status": "online" | "offline"}
async fn put_heartbeat(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
    Json(body): Json<HeartbeatBody>,
) -> Result<Json<Data<Heartbeat>>, ApiError> {
    let heartbeat = state
        .store
        .set_heartbeat(id, body.status, Utc::now())
        .map_err(|e| ApiError::from_store("set_heartbeat", e))?;

    info!(sensor_id = id, status = heartbeat.state.as_str(), "Heartbeat updated");
    Ok(data(heartbeat))
}

async fn delete_heartbeat(
    State(state): State<Arc<RegistryAppState>>,
    Path(id): Path<SensorId>,
) -> Result<Json<Value>, ApiError> {
    let cleared = state
        .store
        .clear_heartbeat(id)
        .map_err(|e| ApiError::from_store("clear_heartbeat", e))?;
    if !cleared {
        return Err(EngineError::not_found("heartbeat", id).into());
    }

    Ok(Json(json!({ "message": "heartbeat cleared" })))
}
