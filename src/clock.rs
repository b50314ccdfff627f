//! Time source behind presence bookkeeping and message stamping,
//! abstracted so tests can drive expiry without sleeping.

use std::fmt::Debug;
use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> OffsetDateTime;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Hand-driven clock for tests. Time only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::new(datetime!(2024-05-01 12:00 UTC));
        assert_eq!(clock.now(), clock.now());

        clock.advance(Duration::seconds(11));
        assert_eq!(clock.now(), datetime!(2024-05-01 12:00:11 UTC));

        clock.set(datetime!(2024-05-01 13:00 UTC));
        assert_eq!(clock.now(), datetime!(2024-05-01 13:00 UTC));
    }
}
