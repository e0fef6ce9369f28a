//! Live-estimate classification
//!
//! The feed has no closing-time signal, so a valuation that has not moved
//! for longer than the threshold (10 minutes by default) is assumed to be
//! the settled close. This is an approximation of market-close detection:
//! a feed stall during trading hours is also reported as settled.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default age after which a valuation counts as settled
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// `true` while the valuation is a live intraday estimate.
///
/// Exactly `threshold` old still counts as live; future timestamps are live.
pub fn classify(source_timestamp: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    let age_ms = (now - source_timestamp).num_milliseconds();
    age_ms <= threshold.as_millis() as i64
}
