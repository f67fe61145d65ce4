//! Wall-clock timestamp helper.
//!
//! Every event carries two distinct timestamps: `ts_event_ns`, the
//! logical/simulated time the event represents, and `ts_created_ns`, the
//! real wall-clock instant the event object was instantiated. This module
//! is the single source for the latter, so no constructor site is tempted
//! to just copy the logical timestamp across.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time, in nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ns_is_positive_and_monotonic_enough_to_order_two_calls() {
        let first = now_ns();
        let second = now_ns();
        assert!(first > 0);
        assert!(second >= first);
    }
}
