//! `diffdeck` Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::DocumentId;
use crate::tab_manager::TabError;

/// Top-level error type for `diffdeck`
#[derive(Error, Debug)]
pub enum DiffDeckError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid comparison request: {0}")]
    Request(#[from] RequestError),

    #[error("Tab error: {0}")]
    Tab(#[from] TabError),
}

/// Failure raised from inside a task step
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task '{task}' failed: {reason}")]
    StepFailed { task: String, reason: String },
}

impl TaskError {
    /// Shorthand for a step failure with a plain reason
    pub fn failed(task: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StepFailed {
            task: task.into(),
            reason: reason.into(),
        }
    }
}

/// Queue registration errors
///
/// Both variants are caller errors: every document queue is added once
/// and removed once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Queue for document {0} is already registered")]
    DuplicateQueue(DocumentId),

    #[error("No queue registered for document {0}")]
    UnknownQueue(DocumentId),
}

/// Malformed comparison requests, rejected before any document is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("No paths given")]
    NoPaths,

    #[error("Cannot compare more than three paths (got {0})")]
    TooManyPaths(usize),

    #[error("Cannot compare a non-existent file: {0}")]
    Missing(PathBuf),

    #[error("Cannot compare a mixture of files and directories")]
    MixedKinds,

    #[error("Need three files to auto-merge, got {0}")]
    MergeNeedsThree(usize),

    #[error("Cannot auto-merge directories")]
    MergeDirectories,

    #[error("Failed to expand path '{path}': {reason}")]
    Expand { path: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for `diffdeck` operations
pub type Result<T> = std::result::Result<T, DiffDeckError>;

/// Result type alias for Scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Result type alias for Request validation
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Result type alias for Config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
