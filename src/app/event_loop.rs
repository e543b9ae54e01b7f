//! Main Event Loop
//!
//! A deterministic cooperative loop standing in for the toolkit's: queued
//! events are always handled first, and the idle callback runs one
//! scheduler step only when no event is waiting.

use std::collections::VecDeque;

use crate::app::idle::IdleAction;
use crate::app::window::{AppWindow, WindowEvent};
use crate::request::ComparisonRequest;
use crate::tab_manager::TabId;
use crate::window_state::WindowFlags;

/// Safety valve for runaway sessions
const DEFAULT_MAX_TICKS: usize = 1_000_000;

/// Input the host feeds into the loop
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Open(ComparisonRequest),
    NewComparison,
    Activate(TabId),
    CloseTab(TabId),
    CloseCurrent,
    CloseWindow,
    /// Stop background work in the focused document
    Stop,
    Resize { width: i32, height: i32 },
    WindowState(WindowFlags),
}

/// Why [`MainLoop::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The window closed
    Closed,
    /// No events left and no background work
    Idle,
    /// The tick limit was hit
    TickLimit,
}

/// Cooperative event loop
#[derive(Debug)]
pub struct MainLoop {
    events: VecDeque<AppEvent>,
    max_ticks: usize,
    ticks: usize,
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl MainLoop {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            max_ticks: DEFAULT_MAX_TICKS,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Queue an event behind any already waiting
    pub fn push(&mut self, event: AppEvent) {
        self.events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Ticks run so far
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Run until the window closes or there is nothing left to do
    ///
    /// Window notifications are passed to `on_event` as they happen.
    pub fn run<F>(&mut self, window: &mut AppWindow, mut on_event: F) -> LoopExit
    where
        F: FnMut(WindowEvent),
    {
        tracing::debug!(queued = self.events.len(), "Main loop started");
        let exit = loop {
            if self.ticks >= self.max_ticks {
                tracing::warn!(ticks = self.ticks, "Main loop hit its tick limit");
                break LoopExit::TickLimit;
            }

            let progressed = self.tick(window);
            for event in window.take_events() {
                on_event(event);
            }

            if window.is_closed() {
                break LoopExit::Closed;
            }
            if !progressed {
                break LoopExit::Idle;
            }
        };
        tracing::debug!(ticks = self.ticks, ?exit, "Main loop finished");
        exit
    }

    /// One iteration: pump signals, then one event or one idle step
    ///
    /// Returns false when there was nothing to do.
    pub fn tick(&mut self, window: &mut AppWindow) -> bool {
        self.ticks += 1;
        window.pump_signals();

        if let Some(event) = self.events.pop_front() {
            self.dispatch(window, event);
            // handlers may have queued signals or work
            window.pump_signals();
            return true;
        }

        if window.wants_idle() {
            if window.on_idle() == IdleAction::Stop {
                tracing::trace!("Idle callback disarmed");
            }
            return true;
        }
        false
    }

    fn dispatch(&mut self, window: &mut AppWindow, event: AppEvent) {
        tracing::trace!(?event, "Dispatching event");
        let result = match event {
            AppEvent::Open(request) => window.open(&request).map(|_| ()),
            AppEvent::NewComparison => window.new_comparison().map(|_| ()),
            AppEvent::Activate(id) => window.activate(id),
            AppEvent::CloseTab(id) => window.close_tab(id).map(|_| ()),
            AppEvent::CloseCurrent => window.close_current().map(|_| ()),
            AppEvent::CloseWindow => {
                let decision = window.request_close();
                tracing::debug!(?decision, "Close requested");
                Ok(())
            }
            AppEvent::Stop => {
                window.stop();
                Ok(())
            }
            AppEvent::Resize { width, height } => {
                window.on_resize(width, height);
                Ok(())
            }
            AppEvent::WindowState(flags) => {
                window.on_window_state(flags);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to handle event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        CloseResponse, Document, DocumentFactory, DocumentHandle, DocumentKind,
    };
    use crate::domain::task::{QueueHandle, SchedulerQueue, Step, TaskFn};
    use crate::request::ComparisonTarget;
    use crate::tab_manager::TabEvent;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Document whose queue runs a task of `steps` steps, logging each one
    struct Counting {
        queue: QueueHandle,
    }

    impl Document for Counting {
        fn kind(&self) -> DocumentKind {
            DocumentKind::Folder
        }

        fn label(&self) -> String {
            "folder".to_string()
        }

        fn queue(&self) -> Option<QueueHandle> {
            Some(self.queue.clone())
        }

        fn request_close(&mut self) -> CloseResponse {
            CloseResponse::Ok
        }
    }

    struct Factory {
        steps: Rc<Cell<usize>>,
        order: Rc<RefCell<Vec<&'static str>>>,
    }

    impl DocumentFactory for Factory {
        fn new_comparison(&self) -> DocumentHandle {
            Rc::new(RefCell::new(Counting {
                queue: SchedulerQueue::new().shared(),
            }))
        }

        fn create(&self, _target: &ComparisonTarget) -> DocumentHandle {
            let queue = SchedulerQueue::new().shared();
            let steps = Rc::clone(&self.steps);
            let order = Rc::clone(&self.order);
            let mut remaining = 3;
            queue.borrow_mut().add_task(TaskFn::new("scan", move || {
                if remaining == 0 {
                    return Ok(Step::Completed);
                }
                remaining -= 1;
                steps.set(steps.get() + 1);
                order.borrow_mut().push("step");
                Ok(Step::progress("scanning"))
            }));
            Rc::new(RefCell::new(Counting { queue }))
        }
    }

    fn window() -> (AppWindow, Rc<Cell<usize>>, Rc<RefCell<Vec<&'static str>>>) {
        let steps = Rc::new(Cell::new(0));
        let order = Rc::new(RefCell::new(Vec::new()));
        let factory = Factory {
            steps: Rc::clone(&steps),
            order: Rc::clone(&order),
        };
        (AppWindow::new(Box::new(factory)), steps, order)
    }

    #[test]
    fn test_runs_background_work_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let (mut window, steps, _) = window();
        let mut main_loop = MainLoop::new();
        main_loop.push(AppEvent::Open(ComparisonRequest::new([dir.path()])));

        let exit = main_loop.run(&mut window, |_| {});
        assert_eq!(exit, LoopExit::Idle);
        assert_eq!(steps.get(), 3);
        assert!(!window.is_busy());
    }

    #[test]
    fn test_events_run_before_idle_steps() {
        let dir = tempfile::tempdir().unwrap();
        let (mut window, _, order) = window();
        let mut main_loop = MainLoop::new();
        main_loop.push(AppEvent::Open(ComparisonRequest::new([dir.path()])));
        main_loop.push(AppEvent::NewComparison);

        let mut seen = Vec::new();
        main_loop.run(&mut window, |event| {
            if let WindowEvent::Tab(TabEvent::Added(_)) = event {
                seen.push(order.borrow().len());
            }
        });

        // both tabs were added before the first scan step
        assert_eq!(seen, vec![0, 0]);
    }

    #[test]
    fn test_close_window_ends_loop() {
        let (mut window, _, _) = window();
        let mut main_loop = MainLoop::new();
        main_loop.push(AppEvent::NewComparison);
        main_loop.push(AppEvent::CloseWindow);
        main_loop.push(AppEvent::NewComparison);

        let mut closed = false;
        let exit = main_loop.run(&mut window, |event| closed |= event == WindowEvent::Closed);
        assert_eq!(exit, LoopExit::Closed);
        assert!(closed);
        assert_eq!(main_loop.pending_events(), 1);
    }

    #[test]
    fn test_tick_limit() {
        let (mut window, _, _) = window();
        window
            .add_document(Rc::new(RefCell::new(Counting {
                queue: {
                    let queue = SchedulerQueue::new().shared();
                    queue
                        .borrow_mut()
                        .add_task(TaskFn::new("forever", || Ok(Step::pending())));
                    queue
                },
            })))
            .unwrap();

        let mut main_loop = MainLoop::new().with_max_ticks(10);
        assert_eq!(main_loop.run(&mut window, |_| {}), LoopExit::TickLimit);
        assert_eq!(main_loop.ticks(), 10);
    }

    #[test]
    fn test_invalid_open_is_logged_not_fatal() {
        let (guard, logs) = crate::logging::capture(32);
        let (mut window, _, _) = window();
        let mut main_loop = MainLoop::new();
        main_loop.push(AppEvent::Open(ComparisonRequest::default()));

        assert_eq!(main_loop.run(&mut window, |_| {}), LoopExit::Idle);
        drop(guard);
        assert_eq!(logs.matching("Failed to handle event").len(), 1);
    }
}
