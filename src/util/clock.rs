//! Wall-clock minute alignment
//!
//! Computes how long to wait so that the first batch of a stream starts just
//! after the next full minute of wall-clock time. Aligning starts to minute
//! boundaries makes per-minute ingestion rates reproducible across runs.

use chrono::{DateTime, TimeDelta, Timelike, Utc};
use std::time::Duration;

/// Added past the boundary so that the wait never lands just before it
pub const ALIGNMENT_EPSILON: Duration = Duration::from_millis(1);

/// Source of wall-clock time
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system's UTC clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl WallClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The next instant strictly after `now` whose sub-minute component is zero
///
/// A leap second (`nanosecond() >= 1e9`) belongs to the minute it ends.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        - TimeDelta::seconds(now.second() as i64)
        - TimeDelta::nanoseconds(now.nanosecond() as i64);
    truncated + TimeDelta::minutes(1)
}

/// Delay from `now` until just past the next minute boundary
///
/// Always strictly positive: an instant exactly on a boundary waits for the
/// following one, so the result lies in `(ε, 60s + ε]`.
pub fn delay_to_next_minute(now: DateTime<Utc>) -> Duration {
    let until_boundary = (next_minute_boundary(now) - now)
        .to_std()
        .unwrap_or(Duration::ZERO);
    until_boundary + ALIGNMENT_EPSILON
}
