//! In-memory documents for the `diffdeck` binary and integration tests
//!
//! They do no real comparison work. Browsing views scan a fake listing one
//! entry per step, and documents can be told to answer a close request
//! with an OK, a veto, or an asynchronous save.

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::document::{
    CloseResponse, Document, DocumentFactory, DocumentHandle, DocumentKind, DocumentState,
    SignalEmitter,
};
use crate::domain::task::{IterTask, QueueHandle, SchedulerQueue, Step, TaskFn};
use crate::request::ComparisonTarget;

/// How a demo document answers a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseBehavior {
    Ok,
    Cancel,
    /// Answer APPLY and close once a save of `steps` steps has run
    SaveThenClose { steps: usize },
}

/// A fake comparison document
pub struct DemoDocument {
    kind: DocumentKind,
    label: String,
    queue: QueueHandle,
    emitter: Option<SignalEmitter>,
    on_close: CloseBehavior,
    state: Rc<Cell<DocumentState>>,
    /// Raised to make the pending save give up
    save_abandoned: Option<Rc<Cell<bool>>>,
    reloads: usize,
}

impl DemoDocument {
    pub fn new(kind: DocumentKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            queue: SchedulerQueue::new().shared(),
            emitter: None,
            on_close: CloseBehavior::Ok,
            state: Rc::new(Cell::new(DocumentState::Active)),
            save_abandoned: None,
            reloads: 0,
        }
    }

    #[must_use]
    pub fn with_close_behavior(mut self, behavior: CloseBehavior) -> Self {
        self.on_close = behavior;
        self
    }

    /// Queue a scan that reports one fake entry per step
    pub fn scan(&self, root: &Path, entries: usize) {
        let root = root.display().to_string();
        let steps = (0..entries).map(move |i| Some(format!("Scanning {root}/entry-{i}")));
        self.queue.borrow_mut().add_task(IterTask::new("scan", steps));
    }

    pub fn state(&self) -> DocumentState {
        self.state.get()
    }

    /// Times another document's save made this one reload
    pub fn reloads(&self) -> usize {
        self.reloads
    }

    pub fn emitter(&self) -> Option<&SignalEmitter> {
        self.emitter.as_ref()
    }

    /// Give up on a save started by a close request and stay open
    ///
    /// Returns false when no save is in progress.
    pub fn abandon_save(&mut self) -> bool {
        if self.state.get() != DocumentState::Closing {
            return false;
        }
        if let Some(abandoned) = self.save_abandoned.take() {
            abandoned.set(true);
        }
        self.state.set(DocumentState::Active);
        if let Some(emitter) = &self.emitter {
            emitter.state_changed(DocumentState::Closing, DocumentState::Active);
        }
        tracing::debug!(label = %self.label, "Save abandoned");
        true
    }

    fn begin_save(&mut self, steps: usize) -> CloseResponse {
        let Some(emitter) = self.emitter.clone() else {
            tracing::warn!(label = %self.label, "Document not attached; closing without save");
            return CloseResponse::Ok;
        };
        if self.state.get() == DocumentState::Closing {
            return CloseResponse::Apply;
        }

        self.state.set(DocumentState::Closing);
        emitter.state_changed(DocumentState::Active, DocumentState::Closing);

        let abandoned = Rc::new(Cell::new(false));
        self.save_abandoned = Some(Rc::clone(&abandoned));

        let state = Rc::clone(&self.state);
        let label = self.label.clone();
        let mut remaining = steps;
        self.queue.borrow_mut().add_task_front(TaskFn::new("save", move || {
            if abandoned.get() {
                return Ok(Step::Completed);
            }
            if remaining > 0 {
                remaining -= 1;
                return Ok(Step::progress(format!("Saving {label}")));
            }
            state.set(DocumentState::Closed);
            emitter.state_changed(DocumentState::Closing, DocumentState::Closed);
            emitter.file_changed(label.clone());
            emitter.close_request(CloseResponse::Ok);
            Ok(Step::Completed)
        }));
        CloseResponse::Apply
    }
}

impl Document for DemoDocument {
    fn kind(&self) -> DocumentKind {
        self.kind
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn queue(&self) -> Option<QueueHandle> {
        Some(self.queue.clone())
    }

    fn attach(&mut self, emitter: SignalEmitter) {
        self.emitter = Some(emitter);
    }

    fn request_close(&mut self) -> CloseResponse {
        match self.on_close {
            CloseBehavior::Ok => CloseResponse::Ok,
            CloseBehavior::Cancel => CloseResponse::Cancel,
            CloseBehavior::SaveThenClose { steps } => self.begin_save(steps),
        }
    }

    fn on_file_changed(&mut self, path: &Path) {
        tracing::debug!(label = %self.label, path = %path.display(), "Reloading after external save");
        self.reloads += 1;
    }
}

/// Builds [`DemoDocument`]s and keeps a handle to each one
#[derive(Clone)]
pub struct DemoFactory {
    scan_entries: usize,
    behaviors: HashMap<DocumentKind, CloseBehavior>,
    created: Rc<RefCell<Vec<Rc<RefCell<DemoDocument>>>>>,
}

impl Default for DemoFactory {
    fn default() -> Self {
        Self {
            scan_entries: 5,
            behaviors: HashMap::from([(DocumentKind::Merge, CloseBehavior::SaveThenClose { steps: 2 })]),
            created: Rc::default(),
        }
    }
}

impl DemoFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scan_entries(mut self, entries: usize) -> Self {
        self.scan_entries = entries;
        self
    }

    #[must_use]
    pub fn with_close_behavior(mut self, kind: DocumentKind, behavior: CloseBehavior) -> Self {
        self.behaviors.insert(kind, behavior);
        self
    }

    /// Every document built so far, oldest first
    pub fn created(&self) -> Vec<Rc<RefCell<DemoDocument>>> {
        self.created.borrow().clone()
    }

    fn build(&self, kind: DocumentKind, label: String) -> Rc<RefCell<DemoDocument>> {
        let behavior = self.behaviors.get(&kind).copied().unwrap_or(CloseBehavior::Ok);
        let document = Rc::new(RefCell::new(
            DemoDocument::new(kind, label).with_close_behavior(behavior),
        ));
        self.created.borrow_mut().push(Rc::clone(&document));
        document
    }
}

impl DocumentFactory for DemoFactory {
    fn new_comparison(&self) -> DocumentHandle {
        self.build(DocumentKind::NewComparison, "New comparison".to_string())
    }

    fn create(&self, target: &ComparisonTarget) -> DocumentHandle {
        let paths = target.paths();
        let label = paths
            .iter()
            .map(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect::<Vec<_>>()
            .join(" : ");

        // browsers only start work on their own when asked to; a single
        // file is always diffed against its repository
        let scan = match target {
            ComparisonTarget::Folder { auto_compare, .. }
            | ComparisonTarget::VersionControl { auto_compare, .. } => *auto_compare,
            ComparisonTarget::SingleFile(_) => true,
            ComparisonTarget::File { .. } | ComparisonTarget::Merge { .. } => false,
        };

        let document = self.build(target.kind(), label);
        if scan {
            if let Some(root) = paths.first() {
                document.borrow().scan(root, self.scan_entries);
            }
        }
        document
    }
}
