use super::error::{data, ApiError, Data};
use crate::engine::DashboardEngine;
use crate::error::EngineError;
use crate::model::{NewReading, Reading, ReadingId, ReadingQuery, SensorId};
use crate::store::{SqliteStore, TelemetryStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Shared state for telemetry ingestion and listing
pub struct TelemetryAppState {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<DashboardEngine>,
}

/// Body of POST /telemetry/ambient
#[derive(Debug, Deserialize)]
pub struct AmbientReading {
    pub sensor_id: SensorId,
    pub temp_c: Option<f64>,
    pub hum_pct: Option<f64>,
    pub rssi: Option<i64>,
    pub uptime_s: Option<i64>,
    /// Device payload as received; required
    pub raw: Option<Value>,
}

/// Filter and paging parameters shared by telemetry listings
#[derive(Debug, Default, Deserialize)]
pub struct ReadingParams {
    pub sensor_id: Option<SensorId>,
    /// RFC 3339, inclusive
    pub start_date: Option<String>,
    /// RFC 3339, inclusive
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadingParams {
    pub fn into_query(self) -> Result<ReadingQuery, EngineError> {
        let query = ReadingQuery {
            sensor_id: self.sensor_id,
            start_time: parse_date("start_date", self.start_date.as_deref())?,
            end_time: parse_date("end_date", self.end_date.as_deref())?,
            limit: self.limit,
            offset: self.offset,
        };
        query.validate()?;
        Ok(query)
    }
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, EngineError> {
    match value {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                EngineError::invalid(format!("invalid `{}` timestamp (expected RFC 3339)", field))
            }),
    }
}

pub fn create_telemetry_router(state: Arc<TelemetryAppState>) -> Router {
    Router::new()
        .route(
            "/telemetry/ambient",
            get(list_readings).post(ingest_reading),
        )
        .route(
            "/telemetry/ambient/:id",
            get(get_reading).delete(delete_reading),
        )
        .with_state(state)
}

/// POST /telemetry/ambient
///
/// Stamps `received_at` with the server clock and advances the sensor's
/// `last_seen_at` in the same transaction.
async fn ingest_reading(
    State(state): State<Arc<TelemetryAppState>>,
    Json(body): Json<AmbientReading>,
) -> Result<(StatusCode, Json<Data<Reading>>), ApiError> {
    let raw = body
        .raw
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::BadRequest("sensor_id and raw are required".to_string()))?;

    let reading = state
        .store
        .append(
            body.sensor_id,
            NewReading {
                received_at: Utc::now(),
                temp_c: body.temp_c,
                hum_pct: body.hum_pct,
                rssi: body.rssi,
                uptime_s: body.uptime_s,
                raw,
            },
        )
        .await
        .map_err(|e| ApiError::from_store("append", e))?;

    info!(
        sensor_id = reading.sensor_id,
        reading_id = reading.id,
        temp_c = ?reading.temp_c,
        hum_pct = ?reading.hum_pct,
        "Reading accepted"
    );

    Ok((StatusCode::CREATED, data(reading)))
}

/// GET /telemetry/ambient?sensor_id=&start_date=&end_date=&limit=&offset=
async fn list_readings(
    State(state): State<Arc<TelemetryAppState>>,
    Query(params): Query<ReadingParams>,
) -> Result<Json<Data<Vec<Reading>>>, ApiError> {
    let query = params.into_query()?;
    Ok(data(state.engine.readings(&query).await?))
}

/// GET /telemetry/ambient/:id
async fn get_reading(
    State(state): State<Arc<TelemetryAppState>>,
    Path(id): Path<ReadingId>,
) -> Result<Json<Data<Reading>>, ApiError> {
    state
        .store
        .reading(id)
        .map_err(|e| ApiError::from_store("reading", e))?
        .map(data)
        .ok_or_else(|| EngineError::not_found("reading", id).into())
}

/// DELETE /telemetry/ambient/:id
///
/// Never rewinds the sensor's `last_seen_at`.
async fn delete_reading(
    State(state): State<Arc<TelemetryAppState>>,
    Path(id): Path<ReadingId>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store
        .delete_reading(id)
        .map_err(|e| ApiError::from_store("delete_reading", e))?;
    if !deleted {
        return Err(EngineError::not_found("reading", id).into());
    }

    info!(reading_id = id, "Reading deleted");
    Ok(Json(json!({ "message": "reading deleted" })))
}
