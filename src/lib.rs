//! diffdeck core
//!
//! The non-visual half of a multi-document comparison window:
//! - a cooperative scheduler that runs long comparisons one step at a time
//!   on the interactive thread
//! - tab bookkeeping that ties each document's work queue to its tab
//! - close negotiation across documents that may veto or still be saving

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod demo;
pub mod document;
pub mod domain;
pub mod error;
pub mod logging;
pub mod request;
pub mod tab_manager;
pub mod window_state;

pub use app::{AppWindow, CloseDecision, MainLoop};
pub use document::{CloseResponse, Document, DocumentFactory, DocumentId, DocumentKind};
pub use error::{DiffDeckError, Result};
pub use request::ComparisonRequest;
