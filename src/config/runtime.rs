use super::GreenhouseConfig;
use crate::error::EngineError;
use crate::status::ThresholdPolicy;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Runtime-configurable policy knobs. Changes via PUT /api/admin/config take
/// effect on the next request without restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub delayed_multiplier: f64,
    pub recent_alert_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_config(&GreenhouseConfig::default())
    }
}

impl RuntimeConfig {
    pub fn from_config(config: &GreenhouseConfig) -> Self {
        Self {
            delayed_multiplier: config.status.delayed_multiplier,
            recent_alert_limit: config.dashboard.recent_alert_limit,
        }
    }

    /// Override with env vars where set and parseable.
    pub fn with_env(mut self) -> Self {
        if let Ok(v) = std::env::var("GREENHOUSE_DELAYED_MULTIPLIER") {
            if let Ok(m) = v.parse::<f64>() {
                self.delayed_multiplier = m;
            }
        }
        if let Ok(v) = std::env::var("GREENHOUSE_RECENT_ALERT_LIMIT") {
            if let Ok(n) = v.parse::<usize>() {
                self.recent_alert_limit = n;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        ThresholdPolicy::new(self.delayed_multiplier)?;
        Ok(())
    }
}

pub type SharedRuntimeConfig = Arc<RwLock<RuntimeConfig>>;

pub fn new_runtime_config(initial: RuntimeConfig) -> SharedRuntimeConfig {
    Arc::new(RwLock::new(initial))
}
