use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of "now" in Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Utc::now().timestamp_millis())
}

/// A clock frozen at `now_ms`.
pub fn fixed_clock(now_ms: i64) -> Clock {
    Arc::new(move || now_ms)
}

/// RFC 3339 rendering of a clock reading, for human-facing files.
pub fn rfc3339(now_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .to_rfc3339()
}
