use super::summary::Alert;
use std::cmp::Ordering;

/// Order alerts most-recently-seen first and truncate to `limit`.
///
/// Sensors that never reported sort last. Ties fall back to ascending
/// sensor id, so ranking an already ranked list is a no-op. `None` keeps
/// every alert; `Some(0)` keeps none.
pub fn rank(mut alerts: Vec<Alert>, limit: Option<usize>) -> Vec<Alert> {
    alerts.sort_by(compare);
    if let Some(limit) = limit {
        alerts.truncate(limit);
    }
    alerts
}

fn compare(a: &Alert, b: &Alert) -> Ordering {
    let by_recency = match (a.last_seen_at, b.last_seen_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_recency.then_with(|| a.sensor_id.cmp(&b.sensor_id))
}
