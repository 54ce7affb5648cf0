use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as fractional seconds since the Unix epoch,
/// with microsecond resolution.
///
/// Falls back to `0.0` if the system clock reads before the epoch.
pub fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}
