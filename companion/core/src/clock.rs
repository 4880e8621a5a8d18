//! Wall Clock
//!
//! The history is day-scoped and every turn carries a time of day, so the
//! core needs "now" in local time. Reading it through [`Clock`] lets hosts
//! run on the system clock while tests move time forward explicitly.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta};
use parking_lot::Mutex;

/// Source of the current local time
pub trait Clock: Send + Sync {
    /// Current local date and time
    fn now(&self) -> DateTime<Local>;

    /// Current calendar date
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Current time of day
    fn time_of_day(&self) -> NaiveTime {
        self.now().time()
    }
}

/// Clock backed by the operating system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to
///
/// Useful for driving day rollover deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock forward (or backward, for a negative delta)
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Jump to an absolute time
    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}
