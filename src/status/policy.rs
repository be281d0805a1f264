use super::{elapsed_seconds, Status, DEFAULT_DELAYED_MULTIPLIER, DEFAULT_HEARTBEAT_WINDOW_SECONDS};
use crate::error::EngineError;
use crate::model::{HeartbeatState, Sensor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strategy for deriving a sensor's status at a given instant.
///
/// Implementations must be pure: the same sensor and `now` always give the
/// same status.
pub trait StatusPolicy: Send + Sync {
    fn resolve(&self, sensor: &Sensor, now: DateTime<Utc>) -> Status;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

/// Which strategy the service runs with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Three-state classification from last contact and expected interval
    #[default]
    Threshold,
    /// Legacy two-state classification from an explicit heartbeat flag
    Heartbeat,
}

/// Canonical policy: ACTIVE up to 1x the expected interval, DELAYED up to
/// `delayed_multiplier` x, OFFLINE beyond that or when never seen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdPolicy {
    delayed_multiplier: f64,
}

impl ThresholdPolicy {
    pub fn new(delayed_multiplier: f64) -> Result<Self, EngineError> {
        if !delayed_multiplier.is_finite() || delayed_multiplier < 1.0 {
            return Err(EngineError::invalid(format!(
                "delayed multiplier must be a finite number >= 1.0 (got {})",
                delayed_multiplier
            )));
        }
        Ok(Self { delayed_multiplier })
    }

    pub fn delayed_multiplier(&self) -> f64 {
        self.delayed_multiplier
    }

    /// Both thresholds are inclusive on the low side: exactly 1x is ACTIVE,
    /// exactly `multiplier` x is DELAYED.
    pub fn classify(
        &self,
        last_seen_at: Option<DateTime<Utc>>,
        expected_interval_s: u32,
        now: DateTime<Utc>,
    ) -> Status {
        let Some(last_seen_at) = last_seen_at else {
            return Status::Offline;
        };

        let elapsed = elapsed_seconds(last_seen_at, now);
        let interval = f64::from(expected_interval_s);

        if elapsed <= interval {
            Status::Active
        } else if elapsed <= interval * self.delayed_multiplier {
            Status::Delayed
        } else {
            Status::Offline
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            delayed_multiplier: DEFAULT_DELAYED_MULTIPLIER,
        }
    }
}

impl StatusPolicy for ThresholdPolicy {
    fn resolve(&self, sensor: &Sensor, now: DateTime<Utc>) -> Status {
        self.classify(sensor.last_seen_at, sensor.expected_interval_s, now)
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}

/// Legacy policy: a sensor is ACTIVE only while its explicit heartbeat says
/// `online` and was refreshed within the window. Never yields DELAYED.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeartbeatPolicy {
    window_seconds: i64,
}

impl HeartbeatPolicy {
    pub fn new(window_seconds: i64) -> Result<Self, EngineError> {
        if window_seconds <= 0 {
            return Err(EngineError::invalid(format!(
                "heartbeat window must be positive (got {})",
                window_seconds
            )));
        }
        Ok(Self { window_seconds })
    }
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_HEARTBEAT_WINDOW_SECONDS,
        }
    }
}

impl StatusPolicy for HeartbeatPolicy {
    fn resolve(&self, sensor: &Sensor, now: DateTime<Utc>) -> Status {
        match &sensor.heartbeat {
            Some(hb) if hb.state == HeartbeatState::Online => {
                if elapsed_seconds(hb.updated_at, now) <= self.window_seconds as f64 {
                    Status::Active
                } else {
                    Status::Offline
                }
            }
            _ => Status::Offline,
        }
    }

    fn name(&self) -> &'static str {
        "heartbeat"
    }
}
