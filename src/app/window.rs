//! Application window core
//!
//! [`AppWindow`] wires the tab manager, the aggregate scheduler, the idle
//! driver and the close coordinator together. Documents talk back to it
//! through a signal channel that the host loop pumps between events.

use std::collections::HashMap;
use std::rc::Rc;
use std::cell::RefCell;

use tokio::sync::mpsc;

use crate::app::close::{CloseCoordinator, CloseDecision};
use crate::app::idle::{IdleAction, IdleDriver, StatusDisplay};
use crate::document::{
    CloseResponse, DocumentFactory, DocumentHandle, DocumentId, DocumentSignal, SignalEmitter,
    SignalKind, SignalReceiver, SignalSender,
};
use crate::domain::task::{AggregateScheduler, SchedulerStats};
use crate::error::Result;
use crate::request::{ComparisonRequest, ComparisonTarget, FsProbe, PathProbe};
use crate::tab_manager::{RemoveOutcome, TabEvent, TabId, TabManager, TabManagerConfig};
use crate::window_state::{WindowFlags, WindowGeometry};

/// Notifications for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Tab(TabEvent),
    /// The window finished closing and can be destroyed
    Closed,
}

/// One comparison window
pub struct AppWindow {
    tabs: TabManager,
    scheduler: AggregateScheduler,
    idle: IdleDriver,
    close: CloseCoordinator,
    factory: Box<dyn DocumentFactory>,
    probe: Box<dyn PathProbe>,
    signals_tx: SignalSender,
    signals_rx: SignalReceiver,
    /// Documents without a tab, kept alive while their queue runs
    transient: HashMap<DocumentId, DocumentHandle>,
    geometry: WindowGeometry,
    events: Vec<WindowEvent>,
    closed: bool,
}

impl AppWindow {
    pub fn new(factory: Box<dyn DocumentFactory>) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            tabs: TabManager::default(),
            scheduler: AggregateScheduler::new(),
            idle: IdleDriver::default(),
            close: CloseCoordinator::new(),
            factory,
            probe: Box::new(FsProbe),
            signals_tx,
            signals_rx,
            transient: HashMap::new(),
            geometry: WindowGeometry::default(),
            events: Vec::new(),
            closed: false,
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn PathProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_tab_config(mut self, config: TabManagerConfig) -> Self {
        self.tabs = TabManager::new(config);
        self
    }

    #[must_use]
    pub fn with_idle_driver(mut self, idle: IdleDriver) -> Self {
        self.idle = idle;
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: WindowGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Attach the busy spinner, progress text and stop action
    pub fn bind_status(&mut self, status: &Rc<RefCell<dyn StatusDisplay>>) {
        self.idle.bind_status(status);
    }

    /// Add a document as a new tab
    pub fn add_document(&mut self, document: DocumentHandle) -> Result<TabId> {
        let id = self
            .tabs
            .add(document, &mut self.scheduler, &self.signals_tx)?;
        self.sync_tab_events();
        Ok(id)
    }

    /// Open a "new comparison" placeholder tab
    pub fn new_comparison(&mut self) -> Result<TabId> {
        let document = self.factory.new_comparison();
        self.add_document(document)
    }

    /// Validate and open a comparison
    ///
    /// Returns the new tab, or `None` when a single file was opened
    /// without one.
    pub fn open(&mut self, request: &ComparisonRequest) -> Result<Option<TabId>> {
        let target = request.resolve(self.probe.as_ref())?;
        tracing::info!(kind = %target.kind(), paths = ?target.paths(), "Opening comparison");

        if !target.has_tab() {
            self.open_transient(&target)?;
            return Ok(None);
        }

        let document = self.factory.create(&target);
        let id = self.add_document(document)?;
        if request.focus {
            self.tabs.activate(id)?;
            self.sync_tab_events();
        }
        Ok(Some(id))
    }

    fn open_transient(&mut self, target: &ComparisonTarget) -> Result<()> {
        let id = DocumentId::new();
        let document = self.factory.create(target);
        let queue = {
            let mut doc = document.borrow_mut();
            doc.attach(SignalEmitter::new(id, self.signals_tx.clone()));
            doc.queue()
        };

        // a drained transient queue is only reaped after a step, so an idle
        // one would never be released
        match queue.filter(|queue| queue.borrow().tasks_pending()) {
            Some(queue) => {
                self.scheduler.add_transient_queue(id, queue)?;
                self.transient.insert(id, document);
            }
            None => tracing::debug!(document = %id, "Single file open has no background work"),
        }
        Ok(())
    }

    /// Ask one tab to close and act on its answer
    pub fn close_tab(&mut self, id: TabId) -> Result<RemoveOutcome> {
        let document = self
            .tabs
            .document(id)
            .ok_or(crate::tab_manager::TabError::NotFound(id))?;
        let response = document.borrow_mut().request_close();
        self.remove_document(id, response)
    }

    /// Close the focused tab, if any
    pub fn close_current(&mut self) -> Result<Option<RemoveOutcome>> {
        match self.tabs.current() {
            Some(id) => self.close_tab(id).map(Some),
            None => Ok(None),
        }
    }

    /// Apply a document's close response
    ///
    /// Removing the last tab while a window close is pending closes the
    /// window.
    pub fn remove_document(&mut self, id: TabId, response: CloseResponse) -> Result<RemoveOutcome> {
        let outcome = self
            .tabs
            .remove(id, response, &mut self.scheduler, &mut self.close)?;
        self.sync_tab_events();

        if let RemoveOutcome::Removed {
            reissue_close: true,
            ..
        } = outcome
        {
            tracing::debug!("Last tab gone with close pending; closing window");
            self.request_close();
        }
        Ok(outcome)
    }

    /// Close the window, negotiating with every open document
    pub fn request_close(&mut self) -> CloseDecision {
        if self.closed {
            return CloseDecision::Close;
        }

        let decision = self.close.request_close(&mut self.tabs, &mut self.scheduler);
        self.sync_tab_events();

        if decision == CloseDecision::Close {
            self.closed = true;
            self.scheduler.stop_all();
            self.idle.finish();
            self.events.push(WindowEvent::Closed);
            tracing::info!("Window closed");
        }
        decision
    }

    /// Stop background work in the focused document
    pub fn stop(&mut self) {
        if let Some(document) = self.tabs.current().and_then(|id| self.tabs.document(id)) {
            document.borrow_mut().stop();
        }
    }

    /// Stop background work everywhere, tab-less documents included
    pub fn stop_all(&mut self) {
        self.tabs.stop_all();
        self.scheduler.stop_all();
    }

    /// Handle every queued document signal, then notify the idle driver
    /// if new work arrived
    ///
    /// Returns true if the host should arm its idle callback.
    pub fn pump_signals(&mut self) -> bool {
        while let Ok(signal) = self.signals_rx.try_recv() {
            self.handle_signal(signal);
        }
        self.reap_transient();

        if self.scheduler.take_runnable() {
            self.idle.on_runnable(&self.scheduler)
        } else {
            false
        }
    }

    fn handle_signal(&mut self, signal: DocumentSignal) {
        let DocumentSignal { source, kind } = signal;
        let from_tab = self.tabs.get(source).is_some();

        match kind {
            SignalKind::FileChanged(path) => {
                tracing::debug!(document = %source, path = %path.display(), "File changed");
                self.tabs.broadcast_file_changed(source, &path);
            }
            SignalKind::NewComparison(request) => {
                if let Err(e) = self.open(&request) {
                    tracing::warn!(document = %source, error = %e, "Requested comparison rejected");
                }
            }
            SignalKind::StateChanged { old, new } if from_tab => {
                if let Err(e) =
                    self.tabs
                        .document_state_changed(source, old, new, &mut self.close)
                {
                    tracing::warn!(document = %source, error = %e, "State change for unknown tab");
                }
            }
            SignalKind::CloseRequest(response) if from_tab => {
                if let Err(e) = self.remove_document(source, response) {
                    tracing::warn!(document = %source, error = %e, "Failed to remove document");
                }
            }
            SignalKind::StateChanged { .. } | SignalKind::CloseRequest(_) => {
                tracing::trace!(document = %source, "Ignoring signal from document without a tab");
            }
        }
    }

    fn reap_transient(&mut self) {
        let scheduler = &self.scheduler;
        self.transient.retain(|id, _| scheduler.contains(*id));
    }

    /// One idle tick; see [`IdleDriver::on_idle`]
    pub fn on_idle(&mut self) -> IdleAction {
        let action = self.idle.on_idle(&mut self.scheduler);
        self.reap_transient();
        action
    }

    /// Whether the idle callback is armed
    pub fn wants_idle(&self) -> bool {
        self.idle.is_armed()
    }

    /// Work in progress
    pub fn is_busy(&self) -> bool {
        self.idle.is_armed()
    }

    pub fn progress(&self) -> Option<&str> {
        self.idle.last_progress()
    }

    /// Take pending notifications, oldest first
    pub fn take_events(&mut self) -> Vec<WindowEvent> {
        self.sync_tab_events();
        std::mem::take(&mut self.events)
    }

    fn sync_tab_events(&mut self) {
        self.events
            .extend(self.tabs.drain_events().into_iter().map(WindowEvent::Tab));
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn should_close(&self) -> bool {
        self.close.should_close()
    }

    pub fn tabs(&self) -> &TabManager {
        &self.tabs
    }

    /// Focus a tab
    pub fn activate(&mut self, id: TabId) -> Result<()> {
        self.tabs.activate(id)?;
        self.sync_tab_events();
        Ok(())
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.statistics()
    }

    /// Number of documents running without a tab
    pub fn transient_count(&self) -> usize {
        self.transient.len()
    }

    /// Sender documents created outside the window can use
    pub fn signal_sender(&self) -> SignalSender {
        self.signals_tx.clone()
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn on_resize(&mut self, width: i32, height: i32) -> bool {
        self.geometry.on_resize(width, height)
    }

    pub fn on_window_state(&mut self, flags: WindowFlags) -> bool {
        self.geometry.on_state(flags)
    }
}

impl std::fmt::Debug for AppWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppWindow")
            .field("tabs", &self.tabs.len())
            .field("queues", &self.scheduler.queue_count())
            .field("transient", &self.transient.len())
            .field("busy", &self.idle.is_armed())
            .field("should_close", &self.close.should_close())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentKind};
    use crate::domain::task::{IterTask, OnceTask, QueueHandle, SchedulerQueue};
    use crate::error::{DiffDeckError, RequestError};
    use crate::request::PathKind;
    use std::path::Path;

    struct Probe;

    impl PathProbe for Probe {
        fn probe(&self, path: &Path) -> PathKind {
            match path.extension() {
                Some(_) => PathKind::File,
                None if path.starts_with("missing") => PathKind::Missing,
                None => PathKind::Directory,
            }
        }
    }

    struct Doc {
        kind: DocumentKind,
        queue: QueueHandle,
        emitter: Option<SignalEmitter>,
    }

    impl Document for Doc {
        fn kind(&self) -> DocumentKind {
            self.kind
        }

        fn label(&self) -> String {
            self.kind.to_string()
        }

        fn queue(&self) -> Option<QueueHandle> {
            Some(self.queue.clone())
        }

        fn attach(&mut self, emitter: SignalEmitter) {
            self.emitter = Some(emitter);
        }

        fn request_close(&mut self) -> CloseResponse {
            CloseResponse::Ok
        }
    }

    #[derive(Default)]
    struct Factory {
        created: Rc<RefCell<Vec<Rc<RefCell<Doc>>>>>,
        idle_browsers: bool,
    }

    impl Factory {
        fn make(&self, kind: DocumentKind) -> DocumentHandle {
            let queue = SchedulerQueue::new().shared();
            if kind == DocumentKind::VersionControl && !self.idle_browsers {
                queue
                    .borrow_mut()
                    .add_task(IterTask::new("scan", vec![Some("scanning".to_string())].into_iter()));
            }
            let doc = Rc::new(RefCell::new(Doc {
                kind,
                queue,
                emitter: None,
            }));
            self.created.borrow_mut().push(Rc::clone(&doc));
            doc
        }
    }

    impl DocumentFactory for Factory {
        fn new_comparison(&self) -> DocumentHandle {
            self.make(DocumentKind::NewComparison)
        }

        fn create(&self, target: &ComparisonTarget) -> DocumentHandle {
            self.make(target.kind())
        }
    }

    fn window() -> (AppWindow, Rc<RefCell<Vec<Rc<RefCell<Doc>>>>>) {
        let factory = Factory::default();
        let created = Rc::clone(&factory.created);
        let window = AppWindow::new(Box::new(factory)).with_probe(Box::new(Probe));
        (window, created)
    }

    #[test]
    fn test_open_adds_tab_for_comparison() {
        let (mut window, _) = window();
        let id = window
            .open(&ComparisonRequest::new(["a.txt", "b.txt"]))
            .unwrap()
            .unwrap();

        assert_eq!(window.tabs().current(), Some(id));
        assert_eq!(
            window.take_events(),
            vec![
                WindowEvent::Tab(TabEvent::Added(id)),
                WindowEvent::Tab(TabEvent::FocusChanged(Some(id))),
            ]
        );
    }

    #[test]
    fn test_invalid_request_builds_nothing() {
        let (mut window, created) = window();
        let err = window
            .open(&ComparisonRequest::new(["left", "a.txt"]))
            .unwrap_err();

        assert!(matches!(err, DiffDeckError::Request(RequestError::MixedKinds)));
        assert!(created.borrow().is_empty());
        assert!(window.tabs().is_empty());
    }

    #[test]
    fn test_single_file_runs_without_tab_then_drops() {
        let (mut window, _) = window();
        assert_eq!(window.open(&ComparisonRequest::new(["a.txt"])).unwrap(), None);
        assert!(window.tabs().is_empty());
        assert_eq!(window.transient_count(), 1);

        assert!(window.pump_signals());
        while window.on_idle() == IdleAction::Continue {}
        window.pump_signals();

        assert_eq!(window.transient_count(), 0);
        assert!(!window.is_busy());
    }

    #[test]
    fn test_single_file_without_work_is_not_kept() {
        let factory = Factory {
            idle_browsers: true,
            ..Factory::default()
        };
        let created = Rc::clone(&factory.created);
        let mut window = AppWindow::new(Box::new(factory)).with_probe(Box::new(Probe));

        assert_eq!(window.open(&ComparisonRequest::new(["a.txt"])).unwrap(), None);
        assert_eq!(created.borrow().len(), 1);
        assert_eq!(window.transient_count(), 0);
        assert_eq!(window.scheduler_stats().queues, 0);
        assert!(!window.pump_signals());
    }

    #[test]
    fn test_focus_flag_overrides_policy() {
        let (mut window, _) = window();
        let first = window
            .open(&ComparisonRequest::new(["a.txt", "b.txt"]))
            .unwrap()
            .unwrap();
        let second = window
            .open(&ComparisonRequest::new(["a.txt", "c.txt"]))
            .unwrap()
            .unwrap();
        assert_eq!(window.tabs().current(), Some(first));

        let third = window
            .open(&ComparisonRequest::new(["b.txt", "c.txt"]).with_focus(true))
            .unwrap()
            .unwrap();
        assert_eq!(window.tabs().current(), Some(third));
        assert_ne!(second, third);
    }

    #[test]
    fn test_document_signals_are_routed() {
        let (mut window, created) = window();
        window.open(&ComparisonRequest::new(["left"])).unwrap();
        let browser = Rc::clone(&created.borrow()[0]);

        let emitter = browser.borrow().emitter.clone().unwrap();
        emitter.new_comparison(ComparisonRequest::new(["a.txt", "b.txt"]));
        window.pump_signals();
        assert_eq!(window.tabs().len(), 2);

        // the browser still has focus, so the diff it spawned took it
        let diff_id = window.tabs().ids()[1];
        assert_eq!(window.tabs().current(), Some(diff_id));

        emitter.close_request(CloseResponse::Ok);
        window.pump_signals();
        assert_eq!(window.tabs().ids(), vec![diff_id]);
    }

    #[test]
    fn test_pending_work_arms_idle_once() {
        let (mut window, created) = window();
        window.new_comparison().unwrap();
        let queue = created.borrow()[0].borrow().queue.clone();

        assert!(!window.pump_signals());
        queue.borrow_mut().add_task(OnceTask::new("load", || Ok(())));
        assert!(window.pump_signals());
        assert!(window.is_busy());

        queue.borrow_mut().add_task(OnceTask::new("more", || Ok(())));
        assert!(!window.pump_signals());
    }

    #[test]
    fn test_close_empty_window() {
        let (mut window, _) = window();
        assert_eq!(window.request_close(), CloseDecision::Close);
        assert!(window.is_closed());
        assert_eq!(window.take_events(), vec![WindowEvent::Closed]);
    }
}
