//! Wall clock abstraction
//!
//! Progress timestamps and log throttling read time through [`Clock`] so
//! tests can drive them deterministically.

use chrono::{DateTime, Duration, Local};
use std::cell::Cell;
use std::rc::Rc;

/// Source of the current local time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<DateTime<Local>>>);

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.advance(Duration::milliseconds(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.0.get()
    }
}
