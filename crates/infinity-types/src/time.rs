use chrono::{DateTime, Utc};

/// Wall-clock timestamp attached to records.
///
/// Records persist timestamps as epoch milliseconds, so values produced by
/// [`now`] are truncated to millisecond precision up front and survive a
/// round-trip through the store unchanged.
pub type Timestamp = DateTime<Utc>;

/// The current time at millisecond precision.
pub fn now() -> Timestamp {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
