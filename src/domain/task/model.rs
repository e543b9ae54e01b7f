//! Task Model
//!
//! A task is a state-holding step function. The scheduler resumes it one
//! bounded quantum at a time until it reports completion, so a long scan
//! never holds the interactive thread for more than a single step.

use crate::error::TaskError;
use std::cell::Cell;
use std::rc::Rc;

/// Outcome of one resumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// More work remains, optionally with a human-readable progress message
    Suspended(Option<String>),
    /// The task is finished and must not be resumed again
    Completed,
}

impl Step {
    /// Suspend without reporting progress
    #[must_use]
    pub fn pending() -> Self {
        Step::Suspended(None)
    }

    /// Suspend with a progress message
    #[must_use]
    pub fn progress(message: impl Into<String>) -> Self {
        Step::Suspended(Some(message.into()))
    }

    /// Check if the task reported completion
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Step::Completed)
    }
}

/// Result of one resumption
pub type StepResult = Result<Step, TaskError>;

/// A resumable unit of background work
///
/// Implementations keep whatever state they need between calls to
/// [`Task::step`]. Nothing is called when a task is dropped before
/// completion.
pub trait Task {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Perform one bounded quantum of work
    fn step(&mut self) -> StepResult;
}

impl std::fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name()).finish()
    }
}

/// Task backed by a closure that is called once per step
pub struct TaskFn<F> {
    name: String,
    f: F,
}

impl<F> TaskFn<F>
where
    F: FnMut() -> StepResult,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Task for TaskFn<F>
where
    F: FnMut() -> StepResult,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self) -> StepResult {
        (self.f)()
    }
}

/// Task that runs a closure exactly once and completes
pub struct OnceTask<F> {
    name: String,
    f: Option<F>,
}

impl<F> OnceTask<F>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f: Some(f),
        }
    }
}

impl<F> Task for OnceTask<F>
where
    F: FnOnce() -> Result<(), TaskError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self) -> StepResult {
        if let Some(f) = self.f.take() {
            f()?;
        }
        Ok(Step::Completed)
    }
}

/// Task that yields one step per iterator item
///
/// Each item is the progress message for that step. The task completes
/// when the iterator is exhausted.
pub struct IterTask<I> {
    name: String,
    iter: I,
}

impl<I> IterTask<I>
where
    I: Iterator<Item = Option<String>>,
{
    pub fn new(name: impl Into<String>, iter: I) -> Self {
        Self {
            name: name.into(),
            iter,
        }
    }
}

impl<I> Task for IterTask<I>
where
    I: Iterator<Item = Option<String>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self) -> StepResult {
        Ok(match self.iter.next() {
            Some(progress) => Step::Suspended(progress),
            None => Step::Completed,
        })
    }
}

/// Cooperative stop flag shared between a queue and the tasks it runs
///
/// Setting the flag never interrupts a step; a task sees it on its next
/// resumption and decides how to wind down.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Rc<Cell<bool>>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running tasks to stop
    pub fn request(&self) {
        self.0.set(true);
    }

    /// Withdraw a stop request
    pub fn clear(&self) {
        self.0.set(false);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}
