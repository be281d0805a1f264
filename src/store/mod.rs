//! Read/write seams between the engine and persistence.
//!
//! The engine depends only on [`Registry`] and [`TelemetryStore`]. It never
//! holds a connection itself: a store handle is built by the caller and
//! injected at construction.
//!
//! ```text
//!  Registry ──────┐
//!                 ├──> DashboardEngine ──> summaries / alerts
//!  TelemetryStore ┘
//! ```

use crate::model::{
    Greenhouse, GreenhouseId, NewReading, Reading, ReadingQuery, Sensor, SensorFilter, SensorId,
};
use anyhow::Result;
use async_trait::async_trait;

mod sqlite;

pub use sqlite::SqliteStore;

/// Greenhouse and sensor lookups.
#[async_trait]
pub trait Registry: Send + Sync {
    /// All greenhouses ordered by id
    async fn list_greenhouses(&self) -> Result<Vec<Greenhouse>>;

    async fn get_greenhouse(&self, id: GreenhouseId) -> Result<Option<Greenhouse>>;

    /// Sensors matching `filter`, ordered by id
    async fn list_sensors(&self, filter: &SensorFilter) -> Result<Vec<Sensor>>;

    async fn get_sensor(&self, id: SensorId) -> Result<Option<Sensor>>;
}

/// Time-ordered telemetry per sensor.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Reading with the greatest `received_at` for the sensor
    async fn latest_reading(&self, sensor_id: SensorId) -> Result<Option<Reading>>;

    /// Readings matching `query`, newest first
    async fn readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>>;

    /// Persist a reading and advance the sensor's `last_seen_at` in the same
    /// transaction. Fails with `EngineError::NotFound` for an unknown sensor.
    async fn append(&self, sensor_id: SensorId, reading: NewReading) -> Result<Reading>;
}
