use super::*;
use crate::model::{Heartbeat, HeartbeatState, Sensor};
use chrono::{Duration, TimeZone};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn sensor(last_seen_at: Option<DateTime<Utc>>, interval: u32) -> Sensor {
    Sensor {
        id: 1,
        greenhouse_id: 1,
        device_key: "esp32-01".to_string(),
        sensor_type: "ambient".to_string(),
        name: Some("Bench A".to_string()),
        expected_interval_s: interval,
        last_seen_at,
        heartbeat: None,
        created_at: now() - Duration::days(30),
    }
}

#[test]
fn test_hourly_sensor_scenarios() {
    let now = now();
    assert_eq!(resolve(Some(now - Duration::seconds(3000)), 3600, now), Status::Active);
    assert_eq!(resolve(Some(now - Duration::seconds(5000)), 3600, now), Status::Delayed);
    assert_eq!(resolve(Some(now - Duration::seconds(8000)), 3600, now), Status::Offline);
}

#[test]
fn test_never_seen_is_offline_for_any_interval() {
    for interval in [60, 300, 3600, 86_400] {
        assert_eq!(resolve(None, interval, now()), Status::Offline);
    }
}

#[test]
fn test_exact_interval_is_active() {
    let now = now();
    assert_eq!(resolve(Some(now - Duration::seconds(300)), 300, now), Status::Active);
    assert_eq!(
        resolve(Some(now - Duration::milliseconds(300_001)), 300, now),
        Status::Delayed
    );
}

#[test]
fn test_sub_millisecond_overrun_is_delayed() {
    let now = now();
    let last = now - Duration::seconds(300) - Duration::microseconds(500);
    assert_eq!(resolve(Some(last), 300, now), Status::Delayed);
    assert!(elapsed_seconds(last, now) > 300.0);

    let last = now - Duration::seconds(600) - Duration::microseconds(1);
    assert_eq!(resolve(Some(last), 300, now), Status::Offline);
}

#[test]
fn test_exact_double_interval_is_delayed() {
    let now = now();
    assert_eq!(resolve(Some(now - Duration::seconds(600)), 300, now), Status::Delayed);
    assert_eq!(
        resolve(Some(now - Duration::milliseconds(600_001)), 300, now),
        Status::Offline
    );
}

#[test]
fn test_future_contact_clamped_to_active() {
    let now = now();
    assert_eq!(resolve(Some(now + Duration::minutes(5)), 60, now), Status::Active);
}

#[test]
fn test_custom_multiplier() {
    let now = now();
    let policy = ThresholdPolicy::new(3.0).unwrap();
    let last = Some(now - Duration::seconds(250));
    assert_eq!(policy.classify(last, 100, now), Status::Delayed);
    assert_eq!(resolve(last, 100, now), Status::Offline);
    assert_eq!(policy.classify(Some(now - Duration::seconds(301)), 100, now), Status::Offline);
}

#[test]
fn test_multiplier_of_one_never_delays() {
    let now = now();
    let policy = ThresholdPolicy::new(1.0).unwrap();
    assert_eq!(policy.classify(Some(now - Duration::seconds(61)), 60, now), Status::Offline);
}

#[test]
fn test_invalid_multiplier_rejected() {
    assert!(ThresholdPolicy::new(0.5).is_err());
    assert!(ThresholdPolicy::new(f64::NAN).is_err());
    assert!(ThresholdPolicy::new(f64::INFINITY).is_err());
}

#[test]
fn test_threshold_policy_reads_sensor_fields() {
    let now = now();
    let policy = ThresholdPolicy::default();
    let s = sensor(Some(now - Duration::seconds(90)), 60);
    assert_eq!(policy.resolve(&s, now), Status::Delayed);
    assert_eq!(policy.name(), "threshold");
}

#[test]
fn test_heartbeat_policy() {
    let now = now();
    let policy = HeartbeatPolicy::default();

    // Heartbeat policy ignores last_seen_at entirely
    let mut s = sensor(Some(now), 60);
    assert_eq!(policy.resolve(&s, now), Status::Offline);

    s.heartbeat = Some(Heartbeat {
        state: HeartbeatState::Online,
        updated_at: now - Duration::minutes(10),
    });
    assert_eq!(policy.resolve(&s, now), Status::Active);

    s.heartbeat = Some(Heartbeat {
        state: HeartbeatState::Online,
        updated_at: now - Duration::minutes(11),
    });
    assert_eq!(policy.resolve(&s, now), Status::Offline);

    s.heartbeat = Some(Heartbeat {
        state: HeartbeatState::Offline,
        updated_at: now,
    });
    assert_eq!(policy.resolve(&s, now), Status::Offline);
}

#[test]
fn test_heartbeat_window_must_be_positive() {
    assert!(HeartbeatPolicy::new(0).is_err());
    assert!(HeartbeatPolicy::new(60).is_ok());
}

#[test]
fn test_minutes_since_rounds_to_nearest() {
    let now = now();
    assert_eq!(minutes_since(None, now), None);
    assert_eq!(minutes_since(Some(now - Duration::seconds(89)), now), Some(1));
    assert_eq!(minutes_since(Some(now - Duration::seconds(90)), now), Some(2));
    assert_eq!(minutes_since(Some(now - Duration::seconds(8000)), now), Some(133));
    assert_eq!(minutes_since(Some(now + Duration::seconds(120)), now), Some(0));
}

#[test]
fn test_status_serialization() {
    assert_eq!(serde_json::to_string(&Status::Delayed).unwrap(), "\"DELAYED\"");
    assert!(Status::Offline.is_alert());
    assert!(!Status::Active.is_alert());
    assert_eq!(Status::Active.to_string(), "ACTIVE");
}
