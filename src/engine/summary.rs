use crate::model::{GreenhouseId, Reading, Sensor, SensorId};
use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Fleet-wide dashboard cards
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FleetSummary {
    pub total_greenhouses: usize,
    pub sensors_active: usize,
    pub sensors_delayed: usize,
    pub sensors_offline: usize,
    /// Always `sensors_delayed + sensors_offline`
    pub active_alerts: usize,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
}

/// One row per greenhouse
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GreenhouseSummary {
    pub id: GreenhouseId,
    pub name: String,
    pub location: Option<String>,
    pub avg_temperature: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub sensor_count: usize,
    pub has_alert: bool,
}

/// A sensor currently DELAYED or OFFLINE
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    pub sensor_id: SensorId,
    pub sensor_name: Option<String>,
    pub device_key: String,
    pub greenhouse_id: GreenhouseId,
    pub greenhouse_name: String,
    pub status: Status,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub minutes_since_last_seen: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuickSummary {
    /// Integer percentage of ACTIVE sensors
    pub uptime_rate: u32,
    pub active_sensors: usize,
    pub total_sensors: usize,
}

/// Latest reading per sensor, joined with its greenhouse
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LastTelemetry {
    pub sensor_id: SensorId,
    pub device_key: String,
    pub sensor_name: Option<String>,
    pub sensor_type: String,
    pub greenhouse_id: GreenhouseId,
    pub greenhouse_name: String,
    pub received_at: Option<DateTime<Utc>>,
    pub temp_c: Option<f64>,
    pub hum_pct: Option<f64>,
    pub rssi: Option<i64>,
    pub uptime_s: Option<i64>,
    pub raw: Option<Value>,
}

impl LastTelemetry {
    pub(crate) fn new(sensor: &Sensor, greenhouse_name: &str, latest: Option<&Reading>) -> Self {
        Self {
            sensor_id: sensor.id,
            device_key: sensor.device_key.clone(),
            sensor_name: sensor.name.clone(),
            sensor_type: sensor.sensor_type.clone(),
            greenhouse_id: sensor.greenhouse_id,
            greenhouse_name: greenhouse_name.to_string(),
            received_at: latest.map(|r| r.received_at),
            temp_c: latest.and_then(|r| r.temp_c),
            hum_pct: latest.and_then(|r| r.hum_pct),
            rssi: latest.and_then(|r| r.rssi),
            uptime_s: latest.and_then(|r| r.uptime_s),
            raw: latest.map(|r| r.raw.clone()),
        }
    }
}

/// Resolved status next to the latest reading
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorOverview {
    pub sensor_id: SensorId,
    pub device_key: String,
    pub sensor_name: Option<String>,
    pub greenhouse_id: GreenhouseId,
    pub greenhouse_name: String,
    pub status: Status,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_telemetry_at: Option<DateTime<Utc>>,
    pub temp_c: Option<f64>,
    pub hum_pct: Option<f64>,
    pub rssi: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorMeasurements {
    pub sensor: Sensor,
    pub measurements: Vec<Reading>,
    pub total: usize,
}

/// Everything the home screen needs in one payload
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HomeDashboard {
    pub summary: FleetSummary,
    pub greenhouses: Vec<GreenhouseSummary>,
    pub recent_alerts: Vec<Alert>,
    pub quick_summary: QuickSummary,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct StatusCounts {
    pub active: usize,
    pub delayed: usize,
    pub offline: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Active => self.active += 1,
            Status::Delayed => self.delayed += 1,
            Status::Offline => self.offline += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.active + self.delayed + self.offline
    }
}

/// Running mean over latest readings that carry both temperature and
/// humidity. Readings missing either value are skipped entirely.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ClimateAverage {
    temp_sum: f64,
    hum_sum: f64,
    count: usize,
}

impl ClimateAverage {
    pub fn add(&mut self, reading: &Reading) {
        if let Some((temp, hum)) = reading.climate() {
            self.temp_sum += temp;
            self.hum_sum += hum;
            self.count += 1;
        }
    }

    /// (avg_temperature, avg_humidity), rounded to one decimal
    pub fn finish(&self) -> (Option<f64>, Option<f64>) {
        if self.count == 0 {
            return (None, None);
        }
        let n = self.count as f64;
        (
            Some(round_one_decimal(self.temp_sum / n)),
            Some(round_one_decimal(self.hum_sum / n)),
        )
    }
}

/// Round half away from zero to one decimal place.
///
/// The scaled value is first snapped to 1e-6 so binary artefacts such as
/// `2.25 * 10 = 22.499999...` round the way the decimal reads.
pub fn round_one_decimal(value: f64) -> f64 {
    let scaled = (value * 10.0 * 1e6).round() / 1e6;
    scaled.round() / 10.0
}

/// `round(100 * active / total)`, 0 for an empty fleet.
pub fn uptime_rate(active: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * active as f64 / total as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(temp: Option<f64>, hum: Option<f64>) -> Reading {
        Reading {
            id: 1,
            sensor_id: 1,
            received_at: Utc::now(),
            temp_c: temp,
            hum_pct: hum,
            rssi: None,
            uptime_s: None,
            raw: json!({}),
        }
    }

    #[test]
    fn test_round_one_decimal() {
        assert_eq!(round_one_decimal(21.44), 21.4);
        assert_eq!(round_one_decimal(21.45), 21.5);
        assert_eq!(round_one_decimal(1.15), 1.2);
        assert_eq!(round_one_decimal(2.25), 2.3);
        assert_eq!(round_one_decimal(-3.45), -3.5);
        assert_eq!(round_one_decimal(60.0), 60.0);
    }

    #[test]
    fn test_uptime_rate() {
        assert_eq!(uptime_rate(0, 0), 0);
        assert_eq!(uptime_rate(7, 10), 70);
        assert_eq!(uptime_rate(1, 8), 13);
        assert_eq!(uptime_rate(2, 3), 67);
        assert_eq!(uptime_rate(3, 3), 100);
    }

    #[test]
    fn test_climate_average_skips_partial_readings() {
        let mut avg = ClimateAverage::default();
        avg.add(&reading(Some(20.0), Some(50.0)));
        avg.add(&reading(Some(23.0), Some(61.0)));
        avg.add(&reading(Some(99.0), None));
        avg.add(&reading(None, Some(1.0)));

        assert_eq!(avg.finish(), (Some(21.5), Some(55.5)));
    }

    #[test]
    fn test_climate_average_empty_is_null() {
        let avg = ClimateAverage::default();
        assert_eq!(avg.finish(), (None, None));
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        for status in [Status::Active, Status::Offline, Status::Delayed, Status::Offline] {
            counts.record(status);
        }
        assert_eq!(counts.active, 1);
        assert_eq!(counts.delayed, 1);
        assert_eq!(counts.offline, 2);
        assert_eq!(counts.total(), 4);
    }
}
