use chrono::Utc;

/// Seconds since the Unix epoch, millisecond precision.
pub fn epoch_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
