use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the unix epoch (0 if the clock is before the epoch).
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}

/// Milliseconds as a float, for latency figures.
pub(crate) fn millis_f64(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
