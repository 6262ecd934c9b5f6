use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

/// Source of wall-clock time. Timestamps are absolute; `today` is the
/// calendar date used to key per-day statistics.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

/// Reads the system clock; days roll over at local midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to. Clones share the same instant, so a
/// test can hand one copy to a [`crate::Trainer`] and keep another to advance it.
/// Days roll over at UTC midnight.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.set(instant);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn today(&self) -> NaiveDate {
        self.now.get().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::start_time;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(start_time());
        let handle = clock.clone();
        handle.advance(Duration::hours(30));
        assert_eq!(clock.now(), start_time() + Duration::hours(30));
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }
}
