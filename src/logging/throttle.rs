//! Rate limiting for repetitive log lines

use crate::clock::Clock;
use chrono::{DateTime, Duration, Local};
use std::rc::Rc;

/// Default spacing between throttled messages
pub const DEFAULT_INTERVAL_MS: i64 = 1000;

/// Lets a message through at most once per interval
pub struct Throttle {
    clock: Rc<dyn Clock>,
    interval: Duration,
    last: Option<DateTime<Local>>,
}

impl Throttle {
    pub fn new(clock: Rc<dyn Clock>, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            last: None,
        }
    }

    /// One message per second
    pub fn per_second(clock: Rc<dyn Clock>) -> Self {
        Self::new(clock, Duration::milliseconds(DEFAULT_INTERVAL_MS))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check whether a message may be emitted now, and if so start a new
    /// interval
    pub fn ready(&mut self) -> bool {
        let now = self.clock.now();
        match self.last {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Let the next message through regardless of timing
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("last", &self.last)
            .finish()
    }
}
