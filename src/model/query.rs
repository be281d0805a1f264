use super::{GreenhouseId, SensorId};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Structured sensor selection. Every field narrows the result (AND logic).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SensorFilter {
    pub greenhouse_id: Option<GreenhouseId>,
    pub sensor_type: Option<String>,
}

impl SensorFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn greenhouse(id: GreenhouseId) -> Self {
        Self {
            greenhouse_id: Some(id),
            sensor_type: None,
        }
    }

    pub fn with_type(mut self, sensor_type: Option<String>) -> Self {
        self.sensor_type = sensor_type;
        self
    }
}

/// Structured telemetry query. Stores translate it into their own query
/// language; results are always newest-first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadingQuery {
    pub sensor_id: Option<SensorId>,
    /// Inclusive lower bound on `received_at`
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `received_at`
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ReadingQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn for_sensor(sensor_id: SensorId) -> Self {
        Self {
            sensor_id: Some(sensor_id),
            ..Default::default()
        }
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(limit) = self.limit {
            if limit == 0 || limit > Self::MAX_LIMIT {
                return Err(EngineError::invalid(format!(
                    "limit must be between 1 and {} (got {})",
                    Self::MAX_LIMIT,
                    limit
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(EngineError::invalid(
                    "start_date must not be after end_date",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_default_limit() {
        let query = ReadingQuery::for_sensor(4);
        assert_eq!(query.effective_limit(), 100);
        assert_eq!(query.effective_offset(), 0);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_limit_out_of_range_rejected() {
        let mut query = ReadingQuery::for_sensor(4);
        query.limit = Some(0);
        assert!(query.validate().is_err());
        query.limit = Some(ReadingQuery::MAX_LIMIT + 1);
        assert!(query.validate().is_err());
        query.limit = Some(ReadingQuery::MAX_LIMIT);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let now = Utc::now();
        let query = ReadingQuery {
            start_time: Some(now),
            end_time: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(
            query.validate(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sensor_filter_builders() {
        let filter = SensorFilter::greenhouse(2).with_type(Some("ambient".to_string()));
        assert_eq!(filter.greenhouse_id, Some(2));
        assert_eq!(filter.sensor_type.as_deref(), Some("ambient"));
        assert_eq!(SensorFilter::all(), SensorFilter::default());
    }
}
