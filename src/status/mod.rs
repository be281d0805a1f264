// Sensor liveness classification
//
// Status is never stored: it is recomputed on every read from the sensor's
// last contact, its expected interval and an injected evaluation time.

mod policy;

pub use policy::{HeartbeatPolicy, PolicyKind, StatusPolicy, ThresholdPolicy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Multiplier of the expected interval after which a delayed sensor is offline
pub const DEFAULT_DELAYED_MULTIPLIER: f64 = 2.0;

/// Freshness window for explicitly reported heartbeats (seconds)
pub const DEFAULT_HEARTBEAT_WINDOW_SECONDS: i64 = 600;

/// Derived liveness of a sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Delayed,
    Offline,
}

impl Status {
    /// Delayed and offline sensors need operator attention.
    pub fn is_alert(self) -> bool {
        !matches!(self, Status::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Delayed => "DELAYED",
            Status::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve with the default 2x threshold.
pub fn resolve(
    last_seen_at: Option<DateTime<Utc>>,
    expected_interval_s: u32,
    now: DateTime<Utc>,
) -> Status {
    ThresholdPolicy::default().classify(last_seen_at, expected_interval_s, now)
}

/// Seconds between `since` and `now`, clamped at zero for clock skew.
///
/// Microsecond resolution, so any overrun past a threshold counts.
pub fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let delta = now - since;
    match delta.num_microseconds() {
        Some(micros) => micros.max(0) as f64 / 1_000_000.0,
        None => delta.num_milliseconds().max(0) as f64 / 1000.0,
    }
}

/// Whole minutes since `since`, rounded to the nearest minute.
pub fn minutes_since(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    since.map(|t| (elapsed_seconds(t, now) / 60.0 + 0.5).floor() as i64)
}
