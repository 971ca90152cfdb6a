//! Wall-clock rotation timing.
//!
//! Segments rotate at instants that are whole multiples of the profile
//! interval measured from the top of the current hour. All writers sharing an
//! interval therefore rotate at identical wall-clock boundaries, no matter
//! when they were started, which keeps segments correlatable across profiles.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Wall-clock abstraction.
///
/// This trait allows swapping implementations (system time vs manual for tests).
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock using `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually controlled clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + ChronoDuration::from_std(by).unwrap_or(ChronoDuration::zero());
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returns the next rotation instant for the given interval.
///
/// The result is the smallest multiple of `interval`, measured from the top
/// of the hour containing `now`, that lies strictly after `now`. An interval
/// that does not divide the hour evenly still rotates on its own grid; the
/// grid restarts at every hour boundary.
pub fn next_rotation_time(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval_ms = interval.as_millis().max(1) as i64;

    let secs_into_hour = now.timestamp().rem_euclid(3600);
    let subsec_ms = i64::from(now.timestamp_subsec_millis());
    let hour_start =
        now - ChronoDuration::seconds(secs_into_hour) - ChronoDuration::milliseconds(subsec_ms);

    let elapsed_ms = secs_into_hour * 1000 + subsec_ms;
    let slots = elapsed_ms / interval_ms + 1;
    hour_start + ChronoDuration::milliseconds(slots * interval_ms)
}

/// Time remaining from `now` until the next rotation instant.
pub fn delay_until_rotation(now: DateTime<Utc>, interval: Duration) -> Duration {
    (next_rotation_time(now, interval) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
