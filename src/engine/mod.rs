// Liveness aggregation over the registry and telemetry store

mod ranker;
mod summary;

pub use ranker::rank;
pub use summary::{
    round_one_decimal, uptime_rate, Alert, FleetSummary, GreenhouseSummary, HomeDashboard,
    LastTelemetry, QuickSummary, SensorMeasurements, SensorOverview,
};

use crate::config::SharedRuntimeConfig;
use crate::error::EngineError;
use crate::model::{
    Greenhouse, GreenhouseId, Reading, ReadingQuery, Sensor, SensorFilter, SensorId,
};
use crate::status::{minutes_since, HeartbeatPolicy, PolicyKind, StatusPolicy, ThresholdPolicy};
use crate::store::{Registry, TelemetryStore};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use summary::{ClimateAverage, StatusCounts};
use tracing::{debug, warn};


/// Stateless aggregation engine.
///
/// Every operation reads a fresh snapshot from the injected stores and
/// takes the evaluation time as an argument; nothing here reads a clock.
/// A failed read fails the whole operation, partial aggregates are never
/// returned.
///
/// Snapshot consistency is best-effort: the sensor list and the per-sensor
/// latest readings are separate reads, so a reading appended between them
/// can show up in averages before it shows up in status.
pub struct DashboardEngine {
    registry: Arc<dyn Registry>,
    telemetry: Arc<dyn TelemetryStore>,
    runtime_config: SharedRuntimeConfig,
    policy_kind: PolicyKind,
    heartbeat: HeartbeatPolicy,
}

impl DashboardEngine {
    /// Create an engine using the threshold policy.
    pub fn new(
        registry: Arc<dyn Registry>,
        telemetry: Arc<dyn TelemetryStore>,
        runtime_config: SharedRuntimeConfig,
    ) -> Self {
        Self {
            registry,
            telemetry,
            runtime_config,
            policy_kind: PolicyKind::Threshold,
            heartbeat: HeartbeatPolicy::default(),
        }
    }

    /// Switch the liveness strategy.
    pub fn with_policy(
        mut self,
        kind: PolicyKind,
        heartbeat_window_seconds: i64,
    ) -> Result<Self, EngineError> {
        self.policy_kind = kind;
        self.heartbeat = HeartbeatPolicy::new(heartbeat_window_seconds)?;
        Ok(self)
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy_kind
    }

    /// Policy for one request, built from the current runtime multiplier.
    pub fn policy(&self) -> Result<Box<dyn StatusPolicy>, EngineError> {
        match self.policy_kind {
            PolicyKind::Threshold => {
                let multiplier = self
                    .runtime_config
                    .read()
                    .expect("RuntimeConfig lock poisoned")
                    .delayed_multiplier;
                Ok(Box::new(ThresholdPolicy::new(multiplier)?))
            }
            PolicyKind::Heartbeat => Ok(Box::new(self.heartbeat)),
        }
    }

    /// Cap used by `recent_alerts` when the caller gives none
    pub fn default_alert_limit(&self) -> usize {
        self.runtime_config
            .read()
            .expect("RuntimeConfig lock poisoned")
            .recent_alert_limit
    }

    // ── Store reads ─────────────────────────────────────────────────────────

    async fn greenhouses(&self) -> Result<Vec<Greenhouse>, EngineError> {
        self.registry
            .list_greenhouses()
            .await
            .map_err(|e| EngineError::from_store("list_greenhouses", e))
    }

    async fn sensors(&self, filter: &SensorFilter) -> Result<Vec<Sensor>, EngineError> {
        self.registry
            .list_sensors(filter)
            .await
            .map_err(|e| EngineError::from_store("list_sensors", e))
    }

    async fn sensor(&self, id: SensorId) -> Result<Sensor, EngineError> {
        self.registry
            .get_sensor(id)
            .await
            .map_err(|e| EngineError::from_store("get_sensor", e))?
            .ok_or_else(|| EngineError::not_found("sensor", id))
    }

    async fn greenhouse(&self, id: GreenhouseId) -> Result<Greenhouse, EngineError> {
        self.registry
            .get_greenhouse(id)
            .await
            .map_err(|e| EngineError::from_store("get_greenhouse", e))?
            .ok_or_else(|| EngineError::not_found("greenhouse", id))
    }

    /// Latest reading per sensor, index-aligned with `sensors`.
    async fn latest_readings(&self, sensors: &[Sensor]) -> Result<Vec<Option<Reading>>, EngineError> {
        try_join_all(sensors.iter().map(|s| self.telemetry.latest_reading(s.id)))
            .await
            .map_err(|e| EngineError::from_store("latest_reading", e))
    }

    // ── Dashboard ───────────────────────────────────────────────────────────

    pub async fn fleet_summary(&self, now: DateTime<Utc>) -> Result<FleetSummary, EngineError> {
        let policy = self.policy()?;
        let all = SensorFilter::all();
        let (greenhouses, sensors) = futures::try_join!(self.greenhouses(), self.sensors(&all))?;
        let latest = self.latest_readings(&sensors).await?;

        let mut counts = StatusCounts::default();
        for sensor in &sensors {
            counts.record(policy.resolve(sensor, now));
        }

        let mut climate = ClimateAverage::default();
        for reading in latest.iter().flatten() {
            climate.add(reading);
        }
        let (avg_temperature, avg_humidity) = climate.finish();

        debug!(
            policy = policy.name(),
            sensors = sensors.len(),
            active = counts.active,
            "Computed fleet summary"
        );

        Ok(FleetSummary {
            total_greenhouses: greenhouses.len(),
            sensors_active: counts.active,
            sensors_delayed: counts.delayed,
            sensors_offline: counts.offline,
            active_alerts: counts.delayed + counts.offline,
            avg_temperature,
            avg_humidity,
        })
    }

    /// One row per greenhouse ordered by id. `sensor_type` restricts which
    /// sensors are counted, averaged and checked for alerts.
    pub async fn greenhouse_summaries(
        &self,
        now: DateTime<Utc>,
        sensor_type: Option<&str>,
    ) -> Result<Vec<GreenhouseSummary>, EngineError> {
        let policy = self.policy()?;
        let filter = SensorFilter::all().with_type(sensor_type.map(str::to_string));
        let (mut greenhouses, sensors) =
            futures::try_join!(self.greenhouses(), self.sensors(&filter))?;
        let latest = self.latest_readings(&sensors).await?;

        #[derive(Default)]
        struct Rollup {
            sensor_count: usize,
            has_alert: bool,
            climate: ClimateAverage,
        }

        let mut rollups: HashMap<GreenhouseId, Rollup> = HashMap::new();
        for (sensor, reading) in sensors.iter().zip(&latest) {
            let rollup = rollups.entry(sensor.greenhouse_id).or_default();
            rollup.sensor_count += 1;
            if policy.resolve(sensor, now).is_alert() {
                rollup.has_alert = true;
            }
            if let Some(reading) = reading {
                rollup.climate.add(reading);
            }
        }

        greenhouses.sort_by_key(|g| g.id);
        Ok(greenhouses
            .into_iter()
            .map(|g| {
                let rollup = rollups.remove(&g.id).unwrap_or_default();
                let (avg_temperature, avg_humidity) = rollup.climate.finish();
                GreenhouseSummary {
                    id: g.id,
                    name: g.name,
                    location: g.location,
                    avg_temperature,
                    avg_humidity,
                    sensor_count: rollup.sensor_count,
                    has_alert: rollup.has_alert,
                }
            })
            .collect())
    }

    /// Unranked alert candidates.
    async fn alerts(&self, now: DateTime<Utc>) -> Result<Vec<Alert>, EngineError> {
        let policy = self.policy()?;
        let all = SensorFilter::all();
        let (greenhouses, sensors) = futures::try_join!(self.greenhouses(), self.sensors(&all))?;
        let names: HashMap<GreenhouseId, String> =
            greenhouses.into_iter().map(|g| (g.id, g.name)).collect();

        Ok(sensors
            .into_iter()
            .filter_map(|sensor| {
                let status = policy.resolve(&sensor, now);
                if !status.is_alert() {
                    return None;
                }
                let Some(greenhouse_name) = names.get(&sensor.greenhouse_id) else {
                    warn!(
                        sensor_id = sensor.id,
                        greenhouse_id = sensor.greenhouse_id,
                        "Sensor references unknown greenhouse, skipping alert"
                    );
                    return None;
                };
                Some(Alert {
                    sensor_id: sensor.id,
                    sensor_name: sensor.name,
                    device_key: sensor.device_key,
                    greenhouse_id: sensor.greenhouse_id,
                    greenhouse_name: greenhouse_name.clone(),
                    status,
                    last_seen_at: sensor.last_seen_at,
                    minutes_since_last_seen: minutes_since(sensor.last_seen_at, now),
                })
            })
            .collect())
    }

    /// Most recently seen alerts first, capped at `limit` (default from
    /// runtime config).
    pub async fn recent_alerts(
        &self,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<Alert>, EngineError> {
        let limit = limit.unwrap_or_else(|| self.default_alert_limit());
        Ok(rank(self.alerts(now).await?, Some(limit)))
    }

    /// Every alert, ranked, unbounded.
    pub async fn offline_alerts(&self, now: DateTime<Utc>) -> Result<Vec<Alert>, EngineError> {
        Ok(rank(self.alerts(now).await?, None))
    }

    pub async fn quick_summary(&self, now: DateTime<Utc>) -> Result<QuickSummary, EngineError> {
        let policy = self.policy()?;
        let sensors = self.sensors(&SensorFilter::all()).await?;

        let mut counts = StatusCounts::default();
        for sensor in &sensors {
            counts.record(policy.resolve(sensor, now));
        }

        Ok(QuickSummary {
            uptime_rate: uptime_rate(counts.active, counts.total()),
            active_sensors: counts.active,
            total_sensors: counts.total(),
        })
    }

    /// All home-screen aggregates evaluated at the same instant.
    pub async fn home(&self, now: DateTime<Utc>) -> Result<HomeDashboard, EngineError> {
        let (summary, greenhouses, recent_alerts, quick_summary) = futures::try_join!(
            self.fleet_summary(now),
            self.greenhouse_summaries(now, None),
            self.recent_alerts(now, None),
            self.quick_summary(now),
        )?;

        Ok(HomeDashboard {
            summary,
            greenhouses,
            recent_alerts,
            quick_summary,
        })
    }

    // ── Views ───────────────────────────────────────────────────────────────

    /// Latest reading for every sensor matching `filter`, ordered by sensor id.
    pub async fn last_telemetry(
        &self,
        filter: &SensorFilter,
    ) -> Result<Vec<LastTelemetry>, EngineError> {
        let (greenhouses, sensors) = futures::try_join!(self.greenhouses(), self.sensors(filter))?;
        let latest = self.latest_readings(&sensors).await?;
        let names: HashMap<GreenhouseId, String> =
            greenhouses.into_iter().map(|g| (g.id, g.name)).collect();

        Ok(sensors
            .iter()
            .zip(&latest)
            .filter_map(|(sensor, reading)| {
                let name = names.get(&sensor.greenhouse_id)?;
                Some(LastTelemetry::new(sensor, name, reading.as_ref()))
            })
            .collect())
    }

    pub async fn last_telemetry_for_sensor(
        &self,
        sensor_id: SensorId,
    ) -> Result<LastTelemetry, EngineError> {
        let sensor = self.sensor(sensor_id).await?;
        let (greenhouse, latest) = futures::try_join!(self.greenhouse(sensor.greenhouse_id), async {
            self.telemetry
                .latest_reading(sensor.id)
                .await
                .map_err(|e| EngineError::from_store("latest_reading", e))
        })?;

        Ok(LastTelemetry::new(&sensor, &greenhouse.name, latest.as_ref()))
    }

    /// Per-sensor status and latest reading, optionally for one greenhouse.
    pub async fn sensor_overview(
        &self,
        now: DateTime<Utc>,
        greenhouse_id: Option<GreenhouseId>,
    ) -> Result<Vec<SensorOverview>, EngineError> {
        let policy = self.policy()?;
        let filter = SensorFilter {
            greenhouse_id,
            sensor_type: None,
        };
        let (greenhouses, sensors) = futures::try_join!(self.greenhouses(), self.sensors(&filter))?;
        if let Some(id) = greenhouse_id {
            if !greenhouses.iter().any(|g| g.id == id) {
                return Err(EngineError::not_found("greenhouse", id));
            }
        }
        let latest = self.latest_readings(&sensors).await?;
        let names: HashMap<GreenhouseId, String> =
            greenhouses.into_iter().map(|g| (g.id, g.name)).collect();

        Ok(sensors
            .iter()
            .zip(&latest)
            .filter_map(|(sensor, reading)| {
                let greenhouse_name = names.get(&sensor.greenhouse_id)?.clone();
                Some(SensorOverview {
                    sensor_id: sensor.id,
                    device_key: sensor.device_key.clone(),
                    sensor_name: sensor.name.clone(),
                    greenhouse_id: sensor.greenhouse_id,
                    greenhouse_name,
                    status: policy.resolve(sensor, now),
                    last_seen_at: sensor.last_seen_at,
                    last_telemetry_at: reading.as_ref().map(|r| r.received_at),
                    temp_c: reading.as_ref().and_then(|r| r.temp_c),
                    hum_pct: reading.as_ref().and_then(|r| r.hum_pct),
                    rssi: reading.as_ref().and_then(|r| r.rssi),
                })
            })
            .collect())
    }

    /// Telemetry page for `query`, newest first.
    pub async fn readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>, EngineError> {
        query.validate()?;
        self.telemetry
            .readings(query)
            .await
            .map_err(|e| EngineError::from_store("readings", e))
    }

    /// A sensor together with a page of its readings.
    pub async fn sensor_measurements(
        &self,
        sensor_id: SensorId,
        mut query: ReadingQuery,
    ) -> Result<SensorMeasurements, EngineError> {
        query.validate()?;
        query.sensor_id = Some(sensor_id);
        let sensor = self.sensor(sensor_id).await?;
        let measurements = self.readings(&query).await?;

        Ok(SensorMeasurements {
            total: measurements.len(),
            sensor,
            measurements,
        })
    }
}
