// Registry and telemetry entities

mod query;

pub use query::{ReadingQuery, SensorFilter};

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type GreenhouseId = i64;
pub type SensorId = i64;
pub type ReadingId = i64;

/// Lower bound for a sensor's expected reporting interval (seconds)
pub const MIN_EXPECTED_INTERVAL_S: u32 = 60;
/// Upper bound for a sensor's expected reporting interval (seconds)
pub const MAX_EXPECTED_INTERVAL_S: u32 = 86_400;
/// Interval assigned when a sensor is registered without one
pub const DEFAULT_EXPECTED_INTERVAL_S: u32 = 300;

/// A greenhouse owning a set of sensors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Greenhouse {
    pub id: GreenhouseId,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewGreenhouse {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Partial update; absent fields are left unchanged, an explicit `null`
/// location clears it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GreenhouseUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
}

/// Distinguishes a field sent as `null` (`Some(None)`) from one left out
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Explicitly reported heartbeat flag (legacy liveness source)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatState {
    Online,
    Offline,
}

impl HeartbeatState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeartbeatState::Online => "online",
            HeartbeatState::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(HeartbeatState::Online),
            "offline" => Some(HeartbeatState::Offline),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub state: HeartbeatState,
    pub updated_at: DateTime<Utc>,
}

/// A heartbeat listed alongside the sensor it belongs to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorHeartbeat {
    pub sensor_id: SensorId,
    #[serde(flatten)]
    pub heartbeat: Heartbeat,
}

/// A deployed sensor. Read-only input to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub greenhouse_id: GreenhouseId,
    /// Unique and immutable once assigned
    pub device_key: String,
    pub sensor_type: String,
    pub name: Option<String>,
    pub expected_interval_s: u32,
    /// Time of the most recent accepted reading; None = never reported
    pub last_seen_at: Option<DateTime<Utc>>,
    pub heartbeat: Option<Heartbeat>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewSensor {
    pub greenhouse_id: GreenhouseId,
    pub device_key: String,
    pub sensor_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expected_interval_s: Option<u32>,
}

impl NewSensor {
    /// Check required fields and resolve the interval default.
    pub fn validate(&self) -> Result<u32, EngineError> {
        if self.device_key.trim().is_empty() {
            return Err(EngineError::invalid("device_key must not be empty"));
        }
        if self.sensor_type.trim().is_empty() {
            return Err(EngineError::invalid("sensor_type must not be empty"));
        }
        validate_expected_interval(
            self.expected_interval_s
                .unwrap_or(DEFAULT_EXPECTED_INTERVAL_S),
        )
    }
}

/// Partial update. `device_key` is absent since it never changes; an
/// explicit `null` name clears it.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SensorUpdate {
    pub greenhouse_id: Option<GreenhouseId>,
    pub sensor_type: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    pub expected_interval_s: Option<u32>,
}

/// Reject intervals outside [60, 86400] seconds.
pub fn validate_expected_interval(interval_s: u32) -> Result<u32, EngineError> {
    if !(MIN_EXPECTED_INTERVAL_S..=MAX_EXPECTED_INTERVAL_S).contains(&interval_s) {
        return Err(EngineError::invalid(format!(
            "expected_interval_s must be between {} and {} (got {})",
            MIN_EXPECTED_INTERVAL_S, MAX_EXPECTED_INTERVAL_S, interval_s
        )));
    }
    Ok(interval_s)
}

/// Immutable telemetry row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub sensor_id: SensorId,
    pub received_at: DateTime<Utc>,
    pub temp_c: Option<f64>,
    pub hum_pct: Option<f64>,
    pub rssi: Option<i64>,
    pub uptime_s: Option<i64>,
    /// Original device payload, kept for audit
    pub raw: Value,
}

impl Reading {
    /// Temperature and humidity, only when both were reported.
    pub fn climate(&self) -> Option<(f64, f64)> {
        match (self.temp_c, self.hum_pct) {
            (Some(t), Some(h)) => Some((t, h)),
            _ => None,
        }
    }
}

/// Reading to be appended; `received_at` is stamped by the ingestion path.
#[derive(Clone, Debug)]
pub struct NewReading {
    pub received_at: DateTime<Utc>,
    pub temp_c: Option<f64>,
    pub hum_pct: Option<f64>,
    pub rssi: Option<i64>,
    pub uptime_s: Option<i64>,
    pub raw: Value,
}
