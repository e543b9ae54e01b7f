//! Aggregate Scheduler
//!
//! Registry of every document's task queue. Each call to
//! [`AggregateScheduler::iterate`] advances exactly one step of one task,
//! which keeps the interactive thread responsive no matter how much
//! background work is queued.

use super::queue::{self, QueueHandle, QueueStep};
use crate::document::DocumentId;
use crate::error::{SchedulerError, SchedulerResult};
use std::cell::Cell;
use std::rc::Rc;

/// Scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Registered queues
    pub queues: usize,
    /// Steps executed since creation
    pub steps: u64,
    /// Tasks that ran to completion
    pub completed: u64,
    /// Tasks discarded after a failed step
    pub failed: u64,
}

#[derive(Debug)]
struct Entry {
    owner: DocumentId,
    queue: QueueHandle,
    /// Removed automatically once drained
    transient: bool,
}

/// Set of per-document queues, served most-recently-registered first
#[derive(Debug, Default)]
pub struct AggregateScheduler {
    entries: Vec<Entry>,
    runnable: Rc<Cell<bool>>,
    stats: SchedulerStats,
}

impl AggregateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document's queue
    pub fn add_queue(&mut self, owner: DocumentId, queue: QueueHandle) -> SchedulerResult<()> {
        self.insert(owner, queue, false)
    }

    /// Register a queue that is dropped automatically, once, when it drains
    ///
    /// Used for work owned by a document that never gets a tab.
    pub fn add_transient_queue(
        &mut self,
        owner: DocumentId,
        queue: QueueHandle,
    ) -> SchedulerResult<()> {
        self.insert(owner, queue, true)
    }

    fn insert(&mut self, owner: DocumentId, queue: QueueHandle, transient: bool) -> SchedulerResult<()> {
        if self.contains(owner) {
            return Err(SchedulerError::DuplicateQueue(owner));
        }

        {
            let mut q = queue.borrow_mut();
            q.set_notifier(Some(Rc::clone(&self.runnable)));
            if q.tasks_pending() {
                self.runnable.set(true);
            }
        }

        self.entries.push(Entry {
            owner,
            queue,
            transient,
        });
        tracing::debug!(
            document = %owner,
            transient,
            queues = self.entries.len(),
            "Queue registered"
        );
        Ok(())
    }

    /// Unregister a document's queue, discarding its unfinished tasks
    pub fn remove_queue(&mut self, owner: DocumentId) -> SchedulerResult<QueueHandle> {
        let position = self
            .entries
            .iter()
            .position(|e| e.owner == owner)
            .ok_or(SchedulerError::UnknownQueue(owner))?;

        let entry = self.entries.remove(position);
        Self::detach(&entry);
        tracing::debug!(
            document = %owner,
            queues = self.entries.len(),
            "Queue unregistered"
        );
        Ok(entry.queue)
    }

    fn detach(entry: &Entry) {
        let mut q = entry.queue.borrow_mut();
        q.set_notifier(None);
        q.remove_all_tasks();
    }

    /// Check if a queue is registered for `owner`
    #[must_use]
    pub fn contains(&self, owner: DocumentId) -> bool {
        self.entries.iter().any(|e| e.owner == owner)
    }

    /// Number of registered queues
    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.entries.len()
    }

    /// Check whether any registered queue has an unfinished task
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|e| e.queue.borrow().tasks_pending())
    }

    /// Advance one step of one task
    ///
    /// The most recently registered queue with pending work is served.
    /// A failing step is logged and its task discarded; other queues are
    /// untouched. Returns the progress message of the step, if any.
    pub fn iterate(&mut self) -> Option<String> {
        let index = self
            .entries
            .iter()
            .rposition(|e| e.queue.borrow().tasks_pending())?;
        let owner = self.entries[index].owner;
        let handle = Rc::clone(&self.entries[index].queue);

        let progress = match queue::resume(&handle) {
            QueueStep::Idle => None,
            QueueStep::Suspended { progress, .. } => {
                self.stats.steps += 1;
                progress
            }
            QueueStep::Completed { task } => {
                self.stats.steps += 1;
                self.stats.completed += 1;
                tracing::trace!(document = %owner, task = %task, "Task completed");
                None
            }
            QueueStep::Failed { task, error } => {
                self.stats.steps += 1;
                self.stats.failed += 1;
                tracing::warn!(
                    document = %owner,
                    task = %task,
                    error = %error,
                    "Background task failed; discarding it"
                );
                None
            }
        };

        self.reap_transient(owner, &handle);
        progress
    }

    fn reap_transient(&mut self, owner: DocumentId, handle: &QueueHandle) {
        if handle.borrow().tasks_pending() {
            return;
        }
        // The step itself may have unregistered the queue, so look it up again.
        if let Some(position) = self
            .entries
            .iter()
            .position(|e| e.owner == owner && e.transient)
        {
            let entry = self.entries.remove(position);
            Self::detach(&entry);
            tracing::debug!(document = %owner, "Transient queue drained and removed");
        }
    }

    /// Cooperatively stop every registered queue
    pub fn stop_all(&mut self) {
        for entry in &self.entries {
            entry.queue.borrow_mut().stop();
        }
    }

    /// Report, and reset, whether work was submitted since the last call
    pub fn take_runnable(&self) -> bool {
        self.runnable.replace(false)
    }

    /// Get scheduler statistics
    #[must_use]
    pub fn statistics(&self) -> SchedulerStats {
        SchedulerStats {
            queues: self.entries.len(),
            ..self.stats
        }
    }
}
