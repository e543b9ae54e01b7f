//! Background Tasks
//!
//! Resumable task model, per-document queues, and the aggregate scheduler.

pub mod model;
pub mod queue;
pub mod scheduler;

pub use model::{IterTask, OnceTask, Step, StepResult, StopSignal, Task, TaskFn};
pub use queue::{QueueDiscipline, QueueHandle, QueueStep, SchedulerQueue};
pub use scheduler::{AggregateScheduler, SchedulerStats};
