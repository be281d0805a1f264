//! Registry and telemetry persistence using SQLite.
//!
//! # Schema
//! ```sql
//! CREATE TABLE greenhouses (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     name TEXT NOT NULL,
//!     location TEXT,
//!     created_at TEXT NOT NULL          -- RFC 3339, millisecond precision
//! );
//! CREATE TABLE sensors (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     greenhouse_id INTEGER NOT NULL,   -- ON DELETE CASCADE
//!     device_key TEXT NOT NULL UNIQUE,
//!     sensor_type TEXT NOT NULL,
//!     name TEXT,
//!     expected_interval_s INTEGER NOT NULL,
//!     last_seen_at TEXT,
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE telemetry (...);         -- append-only
//! CREATE TABLE sensor_heartbeats (...); -- legacy explicit status
//! ```
//!
//! Timestamps are written with a fixed width so that lexical order in
//! SQLite matches chronological order.

use super::{Registry, TelemetryStore};
use crate::error::EngineError;
use crate::model::{
    validate_expected_interval, Greenhouse, GreenhouseId, GreenhouseUpdate, Heartbeat,
    HeartbeatState, NewGreenhouse, NewReading, NewSensor, Reading, ReadingId, ReadingQuery,
    Sensor, SensorFilter, SensorHeartbeat, SensorId, SensorUpdate,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const SENSOR_COLUMNS: &str = "s.id, s.greenhouse_id, s.device_key, s.sensor_type, s.name, \
     s.expected_interval_s, s.last_seen_at, s.created_at, h.status, h.updated_at";

const READING_COLUMNS: &str = "id, sensor_id, received_at, temp_c, hum_pct, rssi, uptime_s, raw";

/// SQLite-backed registry and telemetry store.
///
/// The connection is wrapped in a Mutex; every operation takes the lock for
/// the duration of one statement or transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database and ensures the schema exists.
    ///
    /// Pass `":memory:"` for a throwaway store.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        info!(path = %path.display(), "Greenhouse store ready");
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS greenhouses (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL,
                location   TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sensors (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                greenhouse_id       INTEGER NOT NULL
                                    REFERENCES greenhouses(id) ON DELETE CASCADE,
                device_key          TEXT NOT NULL UNIQUE,
                sensor_type         TEXT NOT NULL,
                name                TEXT,
                expected_interval_s INTEGER NOT NULL
                                    CHECK (expected_interval_s BETWEEN 60 AND 86400),
                last_seen_at        TEXT,
                created_at          TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sensors_greenhouse ON sensors(greenhouse_id);

            CREATE TABLE IF NOT EXISTS telemetry (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                sensor_id   INTEGER NOT NULL REFERENCES sensors(id) ON DELETE CASCADE,
                received_at TEXT NOT NULL,
                temp_c      REAL,
                hum_pct     REAL,
                rssi        INTEGER,
                uptime_s    INTEGER,
                raw         TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_telemetry_sensor_time
                ON telemetry(sensor_id, received_at DESC);

            CREATE TABLE IF NOT EXISTS sensor_heartbeats (
                sensor_id  INTEGER PRIMARY KEY REFERENCES sensors(id) ON DELETE CASCADE,
                status     TEXT NOT NULL CHECK (status IN ('online', 'offline')),
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .context("Failed to create greenhouse schema")?;
        Ok(())
    }

    // ── Greenhouses ─────────────────────────────────────────────────────────

    pub fn create_greenhouse(&self, new: &NewGreenhouse, now: DateTime<Utc>) -> Result<Greenhouse> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(EngineError::invalid("name must not be empty").into());
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO greenhouses (name, location, created_at) VALUES (?1, ?2, ?3)",
            params![name, new.location, format_ts(now)],
        )
        .context("Failed to insert greenhouse")?;
        let id = conn.last_insert_rowid();
        Self::greenhouse_by_id(&conn, id)?
            .ok_or_else(|| anyhow!("Greenhouse {} vanished after insert", id))
    }

    pub fn greenhouses(&self) -> Result<Vec<Greenhouse>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, location, created_at FROM greenhouses ORDER BY id")
            .context("Failed to prepare greenhouse query")?;
        let rows = stmt
            .query_map([], greenhouse_row)
            .context("Failed to query greenhouses")?;

        let mut greenhouses = Vec::new();
        for row in rows {
            greenhouses.push(row.context("Failed to read greenhouse row")?.into_greenhouse()?);
        }
        Ok(greenhouses)
    }

    pub fn greenhouse(&self, id: GreenhouseId) -> Result<Option<Greenhouse>> {
        let conn = self.conn.lock().unwrap();
        Self::greenhouse_by_id(&conn, id)
    }

    fn greenhouse_by_id(conn: &Connection, id: GreenhouseId) -> Result<Option<Greenhouse>> {
        conn.query_row(
            "SELECT id, name, location, created_at FROM greenhouses WHERE id = ?1",
            params![id],
            greenhouse_row,
        )
        .optional()
        .with_context(|| format!("Failed to load greenhouse {}", id))?
        .map(GreenhouseRow::into_greenhouse)
        .transpose()
    }

    /// Returns None when the greenhouse does not exist.
    pub fn update_greenhouse(
        &self,
        id: GreenhouseId,
        update: &GreenhouseUpdate,
    ) -> Result<Option<Greenhouse>> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(EngineError::invalid("name must not be empty").into());
            }
        }

        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE greenhouses
                 SET name = COALESCE(?2, name),
                     location = CASE WHEN ?3 THEN ?4 ELSE location END
                 WHERE id = ?1",
                params![
                    id,
                    update.name.as_deref().map(str::trim),
                    update.location.is_some(),
                    update.location.clone().flatten(),
                ],
            )
            .with_context(|| format!("Failed to update greenhouse {}", id))?;
        if changed == 0 {
            return Ok(None);
        }
        Self::greenhouse_by_id(&conn, id)
    }

    /// Deletes the greenhouse and, by cascade, its sensors and their telemetry.
    pub fn delete_greenhouse(&self, id: GreenhouseId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM greenhouses WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete greenhouse {}", id))?;
        Ok(deleted > 0)
    }

    // ── Sensors ─────────────────────────────────────────────────────────────

    pub fn create_sensor(&self, new: &NewSensor, now: DateTime<Utc>) -> Result<Sensor> {
        let interval = new.validate()?;

        let conn = self.conn.lock().unwrap();
        if Self::greenhouse_by_id(&conn, new.greenhouse_id)?.is_none() {
            return Err(EngineError::not_found("greenhouse", new.greenhouse_id).into());
        }
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM sensors WHERE device_key = ?1",
                params![new.device_key],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to check device_key")?;
        if taken.is_some() {
            return Err(EngineError::invalid(format!(
                "device_key '{}' is already registered",
                new.device_key
            ))
            .into());
        }

        conn.execute(
            "INSERT INTO sensors
                 (greenhouse_id, device_key, sensor_type, name, expected_interval_s, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.greenhouse_id,
                new.device_key,
                new.sensor_type,
                new.name,
                interval,
                format_ts(now),
            ],
        )
        .context("Failed to insert sensor")?;
        let id = conn.last_insert_rowid();
        Self::sensor_by_id(&conn, id)?.ok_or_else(|| anyhow!("Sensor {} vanished after insert", id))
    }

    pub fn sensors(&self, filter: &SensorFilter) -> Result<Vec<Sensor>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {SENSOR_COLUMNS}
             FROM sensors s LEFT JOIN sensor_heartbeats h ON h.sensor_id = s.id
             WHERE (?1 IS NULL OR s.greenhouse_id = ?1)
               AND (?2 IS NULL OR s.sensor_type = ?2)
             ORDER BY s.id"
        );
        let mut stmt = conn.prepare(&sql).context("Failed to prepare sensor query")?;
        let rows = stmt
            .query_map(params![filter.greenhouse_id, filter.sensor_type], sensor_row)
            .context("Failed to query sensors")?;

        let mut sensors = Vec::new();
        for row in rows {
            sensors.push(row.context("Failed to read sensor row")?.into_sensor()?);
        }
        Ok(sensors)
    }

    pub fn sensor(&self, id: SensorId) -> Result<Option<Sensor>> {
        let conn = self.conn.lock().unwrap();
        Self::sensor_by_id(&conn, id)
    }

    pub fn sensor_by_device_key(&self, device_key: &str) -> Result<Option<Sensor>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {SENSOR_COLUMNS}
             FROM sensors s LEFT JOIN sensor_heartbeats h ON h.sensor_id = s.id
             WHERE s.device_key = ?1"
        );
        conn.query_row(&sql, params![device_key], sensor_row)
            .optional()
            .with_context(|| format!("Failed to load sensor with device_key {}", device_key))?
            .map(SensorRow::into_sensor)
            .transpose()
    }

    fn sensor_by_id(conn: &Connection, id: SensorId) -> Result<Option<Sensor>> {
        let sql = format!(
            "SELECT {SENSOR_COLUMNS}
             FROM sensors s LEFT JOIN sensor_heartbeats h ON h.sensor_id = s.id
             WHERE s.id = ?1"
        );
        conn.query_row(&sql, params![id], sensor_row)
            .optional()
            .with_context(|| format!("Failed to load sensor {}", id))?
            .map(SensorRow::into_sensor)
            .transpose()
    }

    /// Returns None when the sensor does not exist.
    pub fn update_sensor(&self, id: SensorId, update: &SensorUpdate) -> Result<Option<Sensor>> {
        if let Some(interval) = update.expected_interval_s {
            validate_expected_interval(interval)?;
        }
        if let Some(sensor_type) = &update.sensor_type {
            if sensor_type.trim().is_empty() {
                return Err(EngineError::invalid("sensor_type must not be empty").into());
            }
        }

        let conn = self.conn.lock().unwrap();
        if let Some(greenhouse_id) = update.greenhouse_id {
            if Self::greenhouse_by_id(&conn, greenhouse_id)?.is_none() {
                return Err(EngineError::not_found("greenhouse", greenhouse_id).into());
            }
        }
        let changed = conn
            .execute(
                "UPDATE sensors SET
                     greenhouse_id = COALESCE(?2, greenhouse_id),
                     sensor_type = COALESCE(?3, sensor_type),
                     name = CASE WHEN ?4 THEN ?5 ELSE name END,
                     expected_interval_s = COALESCE(?6, expected_interval_s)
                 WHERE id = ?1",
                params![
                    id,
                    update.greenhouse_id,
                    update.sensor_type,
                    update.name.is_some(),
                    update.name.clone().flatten(),
                    update.expected_interval_s,
                ],
            )
            .with_context(|| format!("Failed to update sensor {}", id))?;
        if changed == 0 {
            return Ok(None);
        }
        Self::sensor_by_id(&conn, id)
    }

    pub fn delete_sensor(&self, id: SensorId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM sensors WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete sensor {}", id))?;
        Ok(deleted > 0)
    }

    // ── Heartbeats (legacy explicit status) ─────────────────────────────────

    /// Upsert the explicit heartbeat flag for a sensor.
    pub fn set_heartbeat(
        &self,
        sensor_id: SensorId,
        state: HeartbeatState,
        now: DateTime<Utc>,
    ) -> Result<Heartbeat> {
        let conn = self.conn.lock().unwrap();
        if Self::sensor_by_id(&conn, sensor_id)?.is_none() {
            return Err(EngineError::not_found("sensor", sensor_id).into());
        }
        conn.execute(
            "INSERT INTO sensor_heartbeats (sensor_id, status, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(sensor_id) DO UPDATE SET
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![sensor_id, state.as_str(), format_ts(now)],
        )
        .with_context(|| format!("Failed to store heartbeat for sensor {}", sensor_id))?;

        Ok(Heartbeat {
            state,
            updated_at: parse_ts(&format_ts(now))?,
        })
    }

    /// Returns None when no heartbeat has been reported for the sensor.
    pub fn heartbeat(&self, sensor_id: SensorId) -> Result<Option<Heartbeat>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT status, updated_at FROM sensor_heartbeats WHERE sensor_id = ?1",
            params![sensor_id],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
        .with_context(|| format!("Failed to load heartbeat for sensor {}", sensor_id))?
        .map(|(status, updated_at)| heartbeat_from_columns(sensor_id, &status, &updated_at))
        .transpose()
    }

    /// Every stored heartbeat, most recently updated first.
    pub fn heartbeats(&self) -> Result<Vec<SensorHeartbeat>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT sensor_id, status, updated_at FROM sensor_heartbeats
                 ORDER BY updated_at DESC, sensor_id",
            )
            .context("Failed to prepare heartbeat query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, SensorId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("Failed to query heartbeats")?;

        let mut heartbeats = Vec::new();
        for row in rows {
            let (sensor_id, status, updated_at) = row.context("Failed to read heartbeat row")?;
            heartbeats.push(SensorHeartbeat {
                sensor_id,
                heartbeat: heartbeat_from_columns(sensor_id, &status, &updated_at)?,
            });
        }
        Ok(heartbeats)
    }

    pub fn clear_heartbeat(&self, sensor_id: SensorId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM sensor_heartbeats WHERE sensor_id = ?1",
                params![sensor_id],
            )
            .with_context(|| format!("Failed to clear heartbeat for sensor {}", sensor_id))?;
        Ok(deleted > 0)
    }

    // ── Telemetry ───────────────────────────────────────────────────────────

    pub fn append_reading(&self, sensor_id: SensorId, new: &NewReading) -> Result<Reading> {
        let raw = serde_json::to_string(&new.raw).context("Failed to encode raw payload")?;
        let received_at = format_ts(new.received_at);

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM sensors WHERE id = ?1",
                params![sensor_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up sensor")?;
        if exists.is_none() {
            return Err(EngineError::not_found("sensor", sensor_id).into());
        }

        tx.execute(
            "INSERT INTO telemetry (sensor_id, received_at, temp_c, hum_pct, rssi, uptime_s, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                sensor_id,
                received_at,
                new.temp_c,
                new.hum_pct,
                new.rssi,
                new.uptime_s,
                raw,
            ],
        )
        .context("Failed to insert reading")?;
        let id = tx.last_insert_rowid();

        // last_seen_at only moves forward
        tx.execute(
            "UPDATE sensors SET last_seen_at = ?2
             WHERE id = ?1 AND (last_seen_at IS NULL OR last_seen_at < ?2)",
            params![sensor_id, received_at],
        )
        .context("Failed to advance last_seen_at")?;

        tx.commit().context("Failed to commit reading")?;

        Ok(Reading {
            id,
            sensor_id,
            received_at: parse_ts(&received_at)?,
            temp_c: new.temp_c,
            hum_pct: new.hum_pct,
            rssi: new.rssi,
            uptime_s: new.uptime_s,
            raw: new.raw.clone(),
        })
    }

    pub fn latest(&self, sensor_id: SensorId) -> Result<Option<Reading>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM telemetry
             WHERE sensor_id = ?1
             ORDER BY received_at DESC, id DESC
             LIMIT 1"
        );
        conn.query_row(&sql, params![sensor_id], reading_row)
            .optional()
            .with_context(|| format!("Failed to load latest reading for sensor {}", sensor_id))?
            .map(ReadingRow::into_reading)
            .transpose()
    }

    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        query.validate()?;

        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {READING_COLUMNS} FROM telemetry
             WHERE (?1 IS NULL OR sensor_id = ?1)
               AND (?2 IS NULL OR received_at >= ?2)
               AND (?3 IS NULL OR received_at <= ?3)
             ORDER BY received_at DESC, id DESC
             LIMIT ?4 OFFSET ?5"
        );
        let mut stmt = conn.prepare(&sql).context("Failed to prepare telemetry query")?;
        let rows = stmt
            .query_map(
                params![
                    query.sensor_id,
                    query.start_time.map(format_ts),
                    query.end_time.map(format_ts),
                    query.effective_limit(),
                    query.effective_offset(),
                ],
                reading_row,
            )
            .context("Failed to query telemetry")?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row.context("Failed to read telemetry row")?.into_reading()?);
        }
        Ok(readings)
    }

    pub fn reading(&self, id: ReadingId) -> Result<Option<Reading>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {READING_COLUMNS} FROM telemetry WHERE id = ?1");
        conn.query_row(&sql, params![id], reading_row)
            .optional()
            .with_context(|| format!("Failed to load reading {}", id))?
            .map(ReadingRow::into_reading)
            .transpose()
    }

    /// Administrative removal; does not rewind the sensor's `last_seen_at`.
    pub fn delete_reading(&self, id: ReadingId) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM telemetry WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete reading {}", id))?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl Registry for SqliteStore {
    async fn list_greenhouses(&self) -> Result<Vec<Greenhouse>> {
        self.greenhouses()
    }

    async fn get_greenhouse(&self, id: GreenhouseId) -> Result<Option<Greenhouse>> {
        self.greenhouse(id)
    }

    async fn list_sensors(&self, filter: &SensorFilter) -> Result<Vec<Sensor>> {
        self.sensors(filter)
    }

    async fn get_sensor(&self, id: SensorId) -> Result<Option<Sensor>> {
        self.sensor(id)
    }
}

#[async_trait]
impl TelemetryStore for SqliteStore {
    async fn latest_reading(&self, sensor_id: SensorId) -> Result<Option<Reading>> {
        self.latest(sensor_id)
    }

    async fn readings(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        self.query_readings(query)
    }

    async fn append(&self, sensor_id: SensorId, reading: NewReading) -> Result<Reading> {
        self.append_reading(sensor_id, &reading)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────
//
// rusqlite closures can only fail with rusqlite::Error, so rows are read as
// raw columns first and converted (timestamp / JSON parsing) afterwards.

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .with_context(|| format!("Invalid stored timestamp '{}'", s))
}

fn heartbeat_from_columns(sensor_id: SensorId, status: &str, updated_at: &str) -> Result<Heartbeat> {
    Ok(Heartbeat {
        state: HeartbeatState::parse(status).ok_or_else(|| {
            anyhow!("Invalid heartbeat status '{}' for sensor {}", status, sensor_id)
        })?,
        updated_at: parse_ts(updated_at)?,
    })
}

struct GreenhouseRow {
    id: GreenhouseId,
    name: String,
    location: Option<String>,
    created_at: String,
}

fn greenhouse_row(row: &Row<'_>) -> rusqlite::Result<GreenhouseRow> {
    Ok(GreenhouseRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl GreenhouseRow {
    fn into_greenhouse(self) -> Result<Greenhouse> {
        Ok(Greenhouse {
            id: self.id,
            name: self.name,
            location: self.location,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

struct SensorRow {
    id: SensorId,
    greenhouse_id: GreenhouseId,
    device_key: String,
    sensor_type: String,
    name: Option<String>,
    expected_interval_s: u32,
    last_seen_at: Option<String>,
    created_at: String,
    heartbeat_status: Option<String>,
    heartbeat_updated_at: Option<String>,
}

fn sensor_row(row: &Row<'_>) -> rusqlite::Result<SensorRow> {
    Ok(SensorRow {
        id: row.get(0)?,
        greenhouse_id: row.get(1)?,
        device_key: row.get(2)?,
        sensor_type: row.get(3)?,
        name: row.get(4)?,
        expected_interval_s: row.get(5)?,
        last_seen_at: row.get(6)?,
        created_at: row.get(7)?,
        heartbeat_status: row.get(8)?,
        heartbeat_updated_at: row.get(9)?,
    })
}

impl SensorRow {
    fn into_sensor(self) -> Result<Sensor> {
        let heartbeat = match (self.heartbeat_status, self.heartbeat_updated_at) {
            (Some(status), Some(updated_at)) => {
                Some(heartbeat_from_columns(self.id, &status, &updated_at)?)
            }
            _ => None,
        };

        Ok(Sensor {
            id: self.id,
            greenhouse_id: self.greenhouse_id,
            device_key: self.device_key,
            sensor_type: self.sensor_type,
            name: self.name,
            expected_interval_s: self.expected_interval_s,
            last_seen_at: self.last_seen_at.as_deref().map(parse_ts).transpose()?,
            heartbeat,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

struct ReadingRow {
    id: ReadingId,
    sensor_id: SensorId,
    received_at: String,
    temp_c: Option<f64>,
    hum_pct: Option<f64>,
    rssi: Option<i64>,
    uptime_s: Option<i64>,
    raw: String,
}

fn reading_row(row: &Row<'_>) -> rusqlite::Result<ReadingRow> {
    Ok(ReadingRow {
        id: row.get(0)?,
        sensor_id: row.get(1)?,
        received_at: row.get(2)?,
        temp_c: row.get(3)?,
        hum_pct: row.get(4)?,
        rssi: row.get(5)?,
        uptime_s: row.get(6)?,
        raw: row.get(7)?,
    })
}

impl ReadingRow {
    fn into_reading(self) -> Result<Reading> {
        Ok(Reading {
            id: self.id,
            sensor_id: self.sensor_id,
            received_at: parse_ts(&self.received_at)?,
            temp_c: self.temp_c,
            hum_pct: self.hum_pct,
            rssi: self.rssi,
            uptime_s: self.uptime_s,
            raw: serde_json::from_str(&self.raw)
                .with_context(|| format!("Invalid raw payload for reading {}", self.id))?,
        })
    }
}
