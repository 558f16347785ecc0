//! Wall-clock time source.
//!
//! The clock is only ever used for subtraction: remaining time is
//! `end_time - now`, never a decremented counter.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used to bucket focus history.
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can hand one clone to a
/// controller and advance another. Days are bucketed in UTC so results do
/// not depend on the host timezone.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Rc::new(Cell::new(start.timestamp_millis())),
        }
    }

    pub fn at_epoch_ms(ms: i64) -> Self {
        Self {
            millis: Rc::new(Cell::new(ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.set(self.millis.get() + by.num_milliseconds());
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.set(at.timestamp_millis());
    }
}

/// Starts at 2025-12-07T09:00:00Z.
impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch_ms(1_765_098_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis.get())
            .single()
            .unwrap_or_default()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        let before = clock.now();
        other.advance_secs(90);
        assert_eq!((clock.now() - before).num_seconds(), 90);
    }

    #[test]
    fn manual_clock_day_rolls_over() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 7, 23, 59, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 12, 7).unwrap());
        clock.advance_secs(120);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 12, 8).unwrap());
    }
}
