//! Tab management for diffdeck windows
//!
//! Owns the ordered list of open documents and keeps three things in step
//! with it:
//! - the aggregate scheduler, which holds one queue per tab that runs work
//! - focus, including the explicit "no current document" state
//! - the event outbox the host drains to update its tab strip

use std::path::Path;
use thiserror::Error;

use crate::app::close::CloseCoordinator;
use crate::document::{
    CloseResponse, DocumentHandle, DocumentId, DocumentKind, DocumentState, SignalEmitter,
    SignalSender,
};
use crate::domain::task::AggregateScheduler;
use crate::error::SchedulerError;

/// Tabs are identified by the document they show
pub type TabId = DocumentId;

/// One open document
pub struct Tab {
    pub id: TabId,
    pub kind: DocumentKind,
    pub label: String,
    pub state: DocumentState,
    document: DocumentHandle,
    /// Whether the document's queue is registered with the scheduler
    has_queue: bool,
}

impl Tab {
    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }

    pub fn has_queue(&self) -> bool {
        self.has_queue
    }
}

impl std::fmt::Debug for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tab")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("has_queue", &self.has_queue)
            .finish()
    }
}

/// When a newly added tab takes focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPolicy {
    /// Only when the user is on a browsing view or opened a placeholder;
    /// starting several diffs from a folder view does not cycle through
    /// each of them
    #[default]
    Conservative,
    /// Every new tab
    Always,
}

/// Configuration for tab manager
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TabManagerConfig {
    /// Maximum number of tabs (0 = unlimited)
    pub max_tabs: usize,
    pub focus_policy: FocusPolicy,
}

impl TabManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tabs(mut self, max_tabs: usize) -> Self {
        self.max_tabs = max_tabs;
        self
    }

    pub fn with_focus_policy(mut self, policy: FocusPolicy) -> Self {
        self.focus_policy = policy;
        self
    }
}

/// Errors that can occur during tab operations
#[derive(Debug, Error)]
pub enum TabError {
    #[error("Maximum number of tabs ({0}) reached")]
    MaxTabsReached(usize),

    #[error("Tab not found: {0}")]
    NotFound(TabId),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Event notifications for the host's tab strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    Added(TabId),
    Removed(TabId),
    /// `None` means there is no current document
    FocusChanged(Option<TabId>),
}

/// What [`TabManager::remove`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The document vetoed; nothing changed
    Kept,
    /// The document is saving; the window should close once it finishes
    Deferred,
    Removed {
        remaining: usize,
        /// The last tab went away while a window close was pending
        reissue_close: bool,
    },
}

/// Tab manager for handling all tab operations
#[derive(Debug, Default)]
pub struct TabManager {
    tabs: Vec<Tab>,
    current: Option<TabId>,
    config: TabManagerConfig,
    events: Vec<TabEvent>,
}

impl TabManager {
    pub fn new(config: TabManagerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Append a document as a new tab
    ///
    /// Registers its queue, hands it a signal emitter and applies the
    /// focus policy. The first tab of an empty window always gets focus.
    pub fn add(
        &mut self,
        document: DocumentHandle,
        scheduler: &mut AggregateScheduler,
        signals: &SignalSender,
    ) -> Result<TabId, TabError> {
        if self.config.max_tabs > 0 && self.tabs.len() >= self.config.max_tabs {
            return Err(TabError::MaxTabsReached(self.config.max_tabs));
        }

        let id = TabId::new();
        let (kind, label, queue) = {
            let mut doc = document.borrow_mut();
            doc.attach(SignalEmitter::new(id, signals.clone()));
            (doc.kind(), doc.label(), doc.queue())
        };

        let has_queue = match queue {
            Some(queue) => {
                scheduler.add_queue(id, queue)?;
                true
            }
            None => false,
        };

        let take_focus = match self.current_tab() {
            None => true,
            Some(current) => {
                self.config.focus_policy == FocusPolicy::Always
                    || current.kind.is_passive()
                    || kind.is_placeholder()
            }
        };

        self.tabs.push(Tab {
            id,
            kind,
            label,
            state: DocumentState::Active,
            document,
            has_queue,
        });
        self.events.push(TabEvent::Added(id));
        tracing::debug!(tab = %id, %kind, total = self.tabs.len(), "Added tab");

        if take_focus {
            self.set_current(Some(id))?;
        }
        Ok(id)
    }

    /// Act on a document's close response
    ///
    /// CANCEL leaves everything alone and APPLY only records that the
    /// window should close later. OK unregisters the queue, moves focus to
    /// a neighbour if needed and drops the tab.
    pub fn remove(
        &mut self,
        id: TabId,
        response: CloseResponse,
        scheduler: &mut AggregateScheduler,
        close: &mut CloseCoordinator,
    ) -> Result<RemoveOutcome, TabError> {
        let position = self.position(id).ok_or(TabError::NotFound(id))?;

        match response {
            CloseResponse::Cancel => {
                tracing::debug!(tab = %id, "Close cancelled");
                return Ok(RemoveOutcome::Kept);
            }
            CloseResponse::Apply => {
                tracing::debug!(tab = %id, "Close deferred until save completes");
                close.defer();
                return Ok(RemoveOutcome::Deferred);
            }
            CloseResponse::Ok => {}
        }

        if self.tabs[position].has_queue {
            scheduler.remove_queue(id)?;
        }

        if self.current == Some(id) {
            let neighbour = self
                .tabs
                .get(position + 1)
                .or_else(|| position.checked_sub(1).and_then(|i| self.tabs.get(i)))
                .map(|tab| tab.id);
            if neighbour.is_some() {
                self.set_current(neighbour)?;
            }
        }

        self.tabs.remove(position);
        self.events.push(TabEvent::Removed(id));
        tracing::debug!(tab = %id, remaining = self.tabs.len(), "Removed tab");

        if self.tabs.is_empty() {
            // switching away from the last tab never happens on its own
            self.set_current(None)?;
        }

        Ok(RemoveOutcome::Removed {
            remaining: self.tabs.len(),
            reissue_close: self.tabs.is_empty() && close.should_close(),
        })
    }

    /// Change focus; `None` leaves the window with no current document
    pub fn set_current(&mut self, id: Option<TabId>) -> Result<(), TabError> {
        if let Some(id) = id {
            if self.position(id).is_none() {
                return Err(TabError::NotFound(id));
            }
        }
        if self.current == id {
            return Ok(());
        }

        self.current = id;
        self.events.push(TabEvent::FocusChanged(id));
        tracing::trace!(tab = ?id, "Focus changed");

        if let Some(tab) = self.current_tab() {
            tab.document.borrow_mut().on_focus_in();
        }
        Ok(())
    }

    pub fn activate(&mut self, id: TabId) -> Result<(), TabError> {
        self.set_current(Some(id))
    }

    pub fn current(&self) -> Option<TabId> {
        self.current
    }

    pub fn current_tab(&self) -> Option<&Tab> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn document(&self, id: TabId) -> Option<DocumentHandle> {
        self.get(id).map(|tab| tab.document.clone())
    }

    pub fn position(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    /// Tab IDs, left to right
    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|tab| tab.id).collect()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Move a tab to a new position
    pub fn move_tab(&mut self, id: TabId, new_index: usize) {
        if let Some(current_pos) = self.position(id) {
            if current_pos != new_index && new_index < self.tabs.len() {
                let tab = self.tabs.remove(current_pos);
                self.tabs.insert(new_index, tab);
                tracing::debug!(tab = %id, from = current_pos, to = new_index, "Moved tab");
            }
        }
    }

    /// Tell every document except `source` that `path` was written
    pub fn broadcast_file_changed(&self, source: TabId, path: &Path) {
        for tab in self.tabs.iter().filter(|tab| tab.id != source) {
            tab.document.borrow_mut().on_file_changed(path);
        }
    }

    /// Record a document's lifecycle change and let the coordinator react
    pub fn document_state_changed(
        &mut self,
        id: TabId,
        old: DocumentState,
        new: DocumentState,
        close: &mut CloseCoordinator,
    ) -> Result<(), TabError> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|tab| tab.id == id)
            .ok_or(TabError::NotFound(id))?;
        tab.state = new;
        tracing::debug!(tab = %id, ?old, ?new, "Document state changed");
        close.on_state_changed(old, new);
        Ok(())
    }

    /// Stop background work in every document
    pub fn stop_all(&self) {
        for tab in &self.tabs {
            tab.document.borrow_mut().stop();
        }
    }

    /// Take pending events, oldest first
    pub fn drain_events(&mut self) -> Vec<TabEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &TabManagerConfig {
        &self.config
    }
}
