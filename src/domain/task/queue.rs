//! Scheduler Queue
//!
//! Per-document collection of tasks. Exactly one task is current at a
//! time and it keeps running, step after step, until it completes or
//! fails; the discipline only decides which pending task is promoted next.

use super::model::{Step, StepResult, StopSignal, Task};
use crate::error::TaskError;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared handle to a queue, held by its document and by the scheduler
pub type QueueHandle = Rc<RefCell<SchedulerQueue>>;

/// Order in which pending tasks are promoted to current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueDiscipline {
    /// Submission order
    #[default]
    Fifo,
    /// Most recently submitted first
    Lifo,
}

/// What a single resumption of a queue did
#[derive(Debug)]
pub enum QueueStep {
    /// The queue had nothing to run
    Idle,
    /// The current task ran one step and has more to do
    Suspended {
        task: String,
        progress: Option<String>,
    },
    /// The current task finished
    Completed { task: String },
    /// The current task failed and was discarded
    Failed { task: String, error: TaskError },
}

/// LIFO/FIFO task queue belonging to one document
#[derive(Debug, Default)]
pub struct SchedulerQueue {
    discipline: QueueDiscipline,
    /// Task that has started and not yet finished
    current: Option<Box<dyn Task>>,
    /// Set while the current task is checked out for a step
    in_flight: bool,
    /// Tasks waiting to start; the front runs next
    pending: VecDeque<Box<dyn Task>>,
    /// Bumped by `remove_all_tasks` so a checked-out task is not put back
    epoch: u64,
    stop: StopSignal,
    /// Raised whenever work is added, cleared by the owning scheduler
    runnable: Option<Rc<Cell<bool>>>,
}

impl SchedulerQueue {
    /// Create an empty queue that runs tasks in submission order
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with the given discipline
    pub fn with_discipline(discipline: QueueDiscipline) -> Self {
        Self {
            discipline,
            ..Self::default()
        }
    }

    /// Wrap the queue in a shareable handle
    pub fn shared(self) -> QueueHandle {
        Rc::new(RefCell::new(self))
    }

    /// Submit a task
    pub fn add_task<T: Task + 'static>(&mut self, task: T) {
        self.add_boxed(Box::new(task));
    }

    /// Submit an already boxed task
    pub fn add_boxed(&mut self, task: Box<dyn Task>) {
        tracing::trace!(task = task.name(), "Task queued");
        match self.discipline {
            QueueDiscipline::Fifo => self.pending.push_back(task),
            QueueDiscipline::Lifo => self.pending.push_front(task),
        }
        self.notify();
    }

    /// Submit a task that starts as soon as the current one finishes
    pub fn add_task_front<T: Task + 'static>(&mut self, task: T) {
        let task: Box<dyn Task> = Box::new(task);
        tracing::trace!(task = task.name(), "Task queued at front");
        self.pending.push_front(task);
        self.notify();
    }

    /// Drop every task, including the current one, without resuming it
    pub fn remove_all_tasks(&mut self) {
        let dropped = self.len();
        self.current = None;
        self.pending.clear();
        self.epoch += 1;
        self.stop.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Removed all queued tasks");
        }
    }

    /// Cooperative stop: drop tasks that have not started and ask the
    /// current one to wind down on its next resumption
    pub fn stop(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        if self.current.is_some() || self.in_flight {
            self.stop.request();
        }
        tracing::debug!(dropped, "Stop requested");
    }

    /// Stop flag observed by this queue's tasks
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Check whether any task is unfinished
    #[must_use]
    pub fn tasks_pending(&self) -> bool {
        self.in_flight || self.current.is_some() || !self.pending.is_empty()
    }

    /// Number of unfinished tasks, current one included
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.in_flight || self.current.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.tasks_pending()
    }

    pub(crate) fn set_notifier(&mut self, flag: Option<Rc<Cell<bool>>>) {
        self.runnable = flag;
    }

    fn notify(&self) {
        if let Some(flag) = &self.runnable {
            flag.set(true);
        }
    }

    fn checkout(&mut self) -> Option<(Box<dyn Task>, u64)> {
        if self.in_flight {
            return None;
        }
        let task = match self.current.take() {
            Some(task) => task,
            None => {
                let task = self.pending.pop_front()?;
                // a stop aimed at the previous task does not carry over
                self.stop.clear();
                task
            }
        };
        self.in_flight = true;
        Some((task, self.epoch))
    }

    fn checkin(&mut self, task: Box<dyn Task>, epoch: u64, result: StepResult) -> QueueStep {
        self.in_flight = false;
        let name = task.name().to_string();
        let outcome = match result {
            Ok(Step::Suspended(progress)) => {
                if epoch == self.epoch {
                    self.current = Some(task);
                }
                QueueStep::Suspended {
                    task: name,
                    progress,
                }
            }
            Ok(Step::Completed) => QueueStep::Completed { task: name },
            Err(error) => QueueStep::Failed { task: name, error },
        };
        if !self.tasks_pending() {
            self.stop.clear();
        }
        outcome
    }
}

/// Advance the current task of `handle` by one step
///
/// The queue is not borrowed while the step runs, so a task may submit
/// follow-up work to, or clear, its own queue.
pub fn resume(handle: &QueueHandle) -> QueueStep {
    let checked_out = handle.borrow_mut().checkout();
    let Some((mut task, epoch)) = checked_out else {
        return QueueStep::Idle;
    };
    let result = task.step();
    handle.borrow_mut().checkin(task, epoch, result)
}
