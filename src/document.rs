//! Document contract
//!
//! Everything the window core needs from an open comparison: its kind,
//! its background queue, its answer to a close request, and the signals
//! it raises back at the window. Concrete documents (file diffs, folder
//! scans, version-control browsers) live in the host.

use crate::domain::task::QueueHandle;
use crate::request::{ComparisonRequest, ComparisonTarget};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of comparison a document shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Placeholder tab for choosing what to compare
    NewComparison,
    /// Two- or three-way file comparison
    File,
    /// Three-way automatic merge
    Merge,
    /// Directory comparison
    Folder,
    /// Version-control working copy browser
    VersionControl,
}

impl DocumentKind {
    /// Browsing views that hold no unsaved edits
    #[must_use]
    pub fn is_passive(self) -> bool {
        matches!(self, DocumentKind::Folder | DocumentKind::VersionControl)
    }

    #[must_use]
    pub fn is_placeholder(self) -> bool {
        matches!(self, DocumentKind::NewComparison)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::NewComparison => "new comparison",
            DocumentKind::File => "file",
            DocumentKind::Merge => "merge",
            DocumentKind::Folder => "folder",
            DocumentKind::VersionControl => "version control",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    #[default]
    Active,
    /// A close was accepted and is waiting on an asynchronous save
    Closing,
    Closed,
}

/// A document's answer to a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResponse {
    /// Close now
    Ok,
    /// Veto the close
    Cancel,
    /// Close later, once an asynchronous save finishes
    Apply,
}

/// Signals a document raises at its window
#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    /// A file on disk was written; other documents may want to reload
    FileChanged(PathBuf),
    /// Open another comparison
    NewComparison(ComparisonRequest),
    StateChanged {
        old: DocumentState,
        new: DocumentState,
    },
    /// The document asks to be removed with the given response
    CloseRequest(CloseResponse),
}

/// A signal tagged with the document that raised it
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSignal {
    pub source: DocumentId,
    pub kind: SignalKind,
}

pub type SignalSender = mpsc::UnboundedSender<DocumentSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<DocumentSignal>;

/// Per-document handle for raising signals
#[derive(Debug, Clone)]
pub struct SignalEmitter {
    id: DocumentId,
    tx: SignalSender,
}

impl SignalEmitter {
    pub fn new(id: DocumentId, tx: SignalSender) -> Self {
        Self { id, tx }
    }

    /// ID the window assigned to this document
    pub fn id(&self) -> DocumentId {
        self.id
    }

    fn emit(&self, kind: SignalKind) {
        let signal = DocumentSignal {
            source: self.id,
            kind,
        };
        if self.tx.send(signal).is_err() {
            tracing::trace!(document = %self.id, "Window gone; dropping signal");
        }
    }

    pub fn file_changed(&self, path: impl Into<PathBuf>) {
        self.emit(SignalKind::FileChanged(path.into()));
    }

    pub fn new_comparison(&self, request: ComparisonRequest) {
        self.emit(SignalKind::NewComparison(request));
    }

    pub fn state_changed(&self, old: DocumentState, new: DocumentState) {
        self.emit(SignalKind::StateChanged { old, new });
    }

    pub fn close_request(&self, response: CloseResponse) {
        self.emit(SignalKind::CloseRequest(response));
    }
}

/// An open comparison, as seen by the window
pub trait Document {
    fn kind(&self) -> DocumentKind;

    /// Tab label
    fn label(&self) -> String;

    /// Background queue, if the document runs any work
    fn queue(&self) -> Option<QueueHandle> {
        None
    }

    /// Called once when the document is registered with a window
    fn attach(&mut self, emitter: SignalEmitter) {
        let _ = emitter;
    }

    /// Ask whether the document may close
    ///
    /// May prompt the user. Returning [`CloseResponse::Apply`] promises a
    /// later `CloseRequest` signal once the pending save resolves.
    fn request_close(&mut self) -> CloseResponse;

    /// Another document wrote `path`
    fn on_file_changed(&mut self, path: &Path) {
        let _ = path;
    }

    /// The document's tab gained focus
    fn on_focus_in(&mut self) {}

    /// Stop running work; defaults to a cooperative stop of the queue
    fn stop(&mut self) {
        if let Some(queue) = self.queue() {
            queue.borrow_mut().stop();
        }
    }
}

/// Shared handle to a document
pub type DocumentHandle = Rc<RefCell<dyn Document>>;

/// Builds concrete documents for validated comparison targets
pub trait DocumentFactory {
    /// Placeholder "new comparison" document
    fn new_comparison(&self) -> DocumentHandle;

    /// Document for a resolved comparison target
    fn create(&self, target: &ComparisonTarget) -> DocumentHandle;
}
