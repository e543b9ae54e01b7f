//! Idle-time driver for the aggregate scheduler
//!
//! The host loop calls [`IdleDriver::on_runnable`] when work shows up and
//! [`IdleDriver::on_idle`] whenever it has nothing better to do. Each idle
//! callback runs one scheduler step and reports whether it wants to be
//! called again.

use crate::clock::{Clock, SystemClock};
use crate::domain::task::AggregateScheduler;
use crate::logging::Throttle;
use chrono::Duration;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Status widgets the driver updates
pub trait StatusDisplay {
    /// Busy spinner on or off
    fn set_busy(&mut self, busy: bool);

    /// Progress tooltip; `None` clears it
    fn set_progress(&mut self, text: Option<&str>);

    /// Sensitivity of the "stop" action
    fn set_stop_enabled(&mut self, enabled: bool);
}

/// What the idle callback asks of the host loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleAction {
    /// Call again on the next idle tick
    Continue,
    /// Disarm the callback
    Stop,
}

/// Drives the scheduler from the host's idle callback
pub struct IdleDriver {
    armed: bool,
    status: Option<Weak<RefCell<dyn StatusDisplay>>>,
    clock: Rc<dyn Clock>,
    progress_log: Throttle,
    last_progress: Option<String>,
}

impl Default for IdleDriver {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock))
    }
}

impl IdleDriver {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            armed: false,
            status: None,
            progress_log: Throttle::per_second(Rc::clone(&clock)),
            clock,
            last_progress: None,
        }
    }

    /// Change how often progress is written to the log
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_log = Throttle::new(Rc::clone(&self.clock), interval);
        self
    }

    /// Attach the status widgets
    ///
    /// Only a weak reference is kept; updates are skipped once the
    /// widgets are gone.
    pub fn bind_status(&mut self, status: &Rc<RefCell<dyn StatusDisplay>>) {
        self.status = Some(Rc::downgrade(status));
    }

    /// Whether an idle callback is armed
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Last progress text shown, with its timestamp
    pub fn last_progress(&self) -> Option<&str> {
        self.last_progress.as_deref()
    }

    /// Work became available
    ///
    /// Returns true if the host should arm its idle callback now.
    pub fn on_runnable(&mut self, scheduler: &AggregateScheduler) -> bool {
        if self.armed || !scheduler.has_pending() {
            return false;
        }
        self.armed = true;
        self.with_status(|status| {
            status.set_busy(true);
            status.set_stop_enabled(true);
        });
        tracing::info!(queues = scheduler.queue_count(), "Background work started");
        true
    }

    /// One idle tick: run a single scheduler step
    pub fn on_idle(&mut self, scheduler: &mut AggregateScheduler) -> IdleAction {
        if !self.armed {
            return IdleAction::Stop;
        }

        if let Some(text) = scheduler.iterate() {
            let stamped = format!("[{}] {}", self.clock.now().format("%H:%M:%S"), text);
            self.with_status(|status| status.set_progress(Some(&stamped)));
            if self.progress_log.ready() {
                tracing::info!(progress = %stamped, "Background progress");
            }
            self.last_progress = Some(stamped);
        }

        if scheduler.has_pending() {
            IdleAction::Continue
        } else {
            self.finish();
            IdleAction::Stop
        }
    }

    /// Disarm and return the status widgets to their idle look
    pub fn finish(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.last_progress = None;
        self.progress_log.reset();
        self.with_status(|status| {
            status.set_busy(false);
            status.set_progress(None);
            status.set_stop_enabled(false);
        });
        tracing::info!("Background work finished");
    }

    fn with_status(&self, update: impl FnOnce(&mut dyn StatusDisplay)) {
        let Some(weak) = &self.status else {
            return;
        };
        match weak.upgrade() {
            Some(status) => update(&mut *status.borrow_mut()),
            None => tracing::trace!("Status display gone; skipping update"),
        }
    }
}

impl std::fmt::Debug for IdleDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleDriver")
            .field("armed", &self.armed)
            .field("has_status", &self.status.is_some())
            .field("last_progress", &self.last_progress)
            .finish()
    }
}
