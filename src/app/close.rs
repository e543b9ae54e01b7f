//! Window close negotiation
//!
//! A window close asks every open document, right to left, whether it may
//! close. Documents answer OK, CANCEL or APPLY (close once an asynchronous
//! save finishes). A single CANCEL aborts the whole close. APPLY keeps the
//! window open with `should_close` set, so that the window closes itself
//! when the last saving document finally goes away.

use crate::document::{CloseResponse, DocumentState};
use crate::domain::task::AggregateScheduler;
use crate::tab_manager::{TabId, TabManager};

/// Outcome of one close attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseDecision {
    /// Every document agreed and none remain
    Close,
    /// A document vetoed; nothing was removed
    Abort { vetoed_by: Vec<TabId> },
    /// Some documents are still saving or could not be removed
    Defer { pending: Vec<TabId> },
}

/// Persistent close state spanning several close attempts
#[derive(Debug, Default)]
pub struct CloseCoordinator {
    should_close: bool,
}

impl CloseCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the window closes once the remaining documents are gone
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// A document answered APPLY
    pub(crate) fn defer(&mut self) {
        self.should_close = true;
    }

    /// A document changed lifecycle state
    ///
    /// Falling back from Closing to Active means its save was abandoned,
    /// which also abandons the pending window close.
    pub fn on_state_changed(&mut self, old: DocumentState, new: DocumentState) {
        if self.should_close && old == DocumentState::Closing && new == DocumentState::Active {
            tracing::debug!("Document left closing state; window close abandoned");
            self.should_close = false;
        }
    }

    /// Run one close attempt across every open tab
    ///
    /// Each tab is focused before it is asked, so any prompt it shows is
    /// in front of the user. Responses are collected before anything is
    /// removed.
    pub fn request_close(
        &mut self,
        tabs: &mut TabManager,
        scheduler: &mut AggregateScheduler,
    ) -> CloseDecision {
        let mut responses = Vec::with_capacity(tabs.len());
        for id in tabs.ids().into_iter().rev() {
            let Some(document) = tabs.document(id) else {
                continue;
            };
            if let Err(e) = tabs.activate(id) {
                tracing::debug!(tab = %id, error = %e, "Could not focus tab before closing");
            }
            let response = document.borrow_mut().request_close();
            tracing::debug!(tab = %id, ?response, "Close response");
            responses.push((id, response));
        }

        let vetoed_by: Vec<TabId> = responses
            .iter()
            .filter(|(_, response)| *response == CloseResponse::Cancel)
            .map(|(id, _)| *id)
            .collect();
        if !vetoed_by.is_empty() {
            self.should_close = false;
            tracing::info!(vetoes = vetoed_by.len(), "Window close cancelled");
            return CloseDecision::Abort { vetoed_by };
        }

        // removals below must not see a stale flag, or the last one would
        // re-enter this close
        self.should_close = false;

        let mut pending = Vec::new();
        for (id, response) in responses {
            match response {
                CloseResponse::Ok => {
                    if let Err(e) = tabs.remove(id, CloseResponse::Ok, scheduler, self) {
                        tracing::warn!(tab = %id, error = %e, "Failed to remove tab during close");
                    }
                }
                CloseResponse::Apply => pending.push(id),
                CloseResponse::Cancel => {}
            }
        }

        if pending.is_empty() && tabs.is_empty() {
            tracing::info!("All documents closed");
            return CloseDecision::Close;
        }

        self.should_close = true;
        let leftover: Vec<TabId> = tabs
            .ids()
            .into_iter()
            .filter(|id| !pending.contains(id))
            .collect();
        pending.extend(leftover);
        tracing::info!(pending = pending.len(), "Window close deferred");
        CloseDecision::Defer { pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentKind, SignalReceiver, SignalSender};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::sync::mpsc;

    struct Scripted {
        name: &'static str,
        response: CloseResponse,
        asked: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Document for Scripted {
        fn kind(&self) -> DocumentKind {
            DocumentKind::File
        }

        fn label(&self) -> String {
            self.name.to_string()
        }

        fn request_close(&mut self) -> CloseResponse {
            self.asked.borrow_mut().push(self.name);
            self.response
        }
    }

    struct Fixture {
        tabs: TabManager,
        scheduler: AggregateScheduler,
        close: CloseCoordinator,
        asked: Rc<RefCell<Vec<&'static str>>>,
        tx: SignalSender,
        _rx: SignalReceiver,
    }

    impl Fixture {
        fn with(docs: &[(&'static str, CloseResponse)]) -> (Self, Vec<TabId>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut fx = Self {
                tabs: TabManager::default(),
                scheduler: AggregateScheduler::new(),
                close: CloseCoordinator::new(),
                asked: Rc::new(RefCell::new(Vec::new())),
                tx,
                _rx: rx,
            };
            let ids = docs
                .iter()
                .map(|&(name, response)| {
                    let doc = Rc::new(RefCell::new(Scripted {
                        name,
                        response,
                        asked: Rc::clone(&fx.asked),
                    }));
                    fx.tabs.add(doc, &mut fx.scheduler, &fx.tx).unwrap()
                })
                .collect();
            (fx, ids)
        }

        fn close(&mut self) -> CloseDecision {
            self.close.request_close(&mut self.tabs, &mut self.scheduler)
        }
    }

    #[test]
    fn test_tabs_asked_right_to_left() {
        let (mut fx, _) = Fixture::with(&[
            ("a", CloseResponse::Ok),
            ("b", CloseResponse::Ok),
            ("c", CloseResponse::Ok),
        ]);

        fx.close();
        assert_eq!(*fx.asked.borrow(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_all_ok_closes_window() {
        let (mut fx, _) = Fixture::with(&[("a", CloseResponse::Ok), ("b", CloseResponse::Ok)]);

        assert_eq!(fx.close(), CloseDecision::Close);
        assert!(fx.tabs.is_empty());
        assert!(!fx.close.should_close());
    }

    #[test]
    fn test_any_cancel_removes_nothing() {
        let (mut fx, ids) = Fixture::with(&[
            ("a", CloseResponse::Ok),
            ("b", CloseResponse::Cancel),
            ("c", CloseResponse::Ok),
        ]);

        assert_eq!(
            fx.close(),
            CloseDecision::Abort {
                vetoed_by: vec![ids[1]],
            }
        );
        assert_eq!(fx.tabs.len(), 3);
        assert!(!fx.close.should_close());
    }

    #[test]
    fn test_cancel_clears_earlier_pending_close() {
        let (mut fx, ids) = Fixture::with(&[("a", CloseResponse::Cancel)]);
        fx.close.defer();

        assert!(matches!(fx.close(), CloseDecision::Abort { .. }));
        assert!(!fx.close.should_close());
        assert_eq!(fx.tabs.ids(), ids);
    }

    #[test]
    fn test_apply_defers_and_removes_the_rest() {
        let (mut fx, ids) = Fixture::with(&[
            ("a", CloseResponse::Ok),
            ("b", CloseResponse::Apply),
            ("c", CloseResponse::Ok),
        ]);

        assert_eq!(
            fx.close(),
            CloseDecision::Defer {
                pending: vec![ids[1]],
            }
        );
        assert_eq!(fx.tabs.ids(), vec![ids[1]]);
        assert!(fx.close.should_close());
    }

    #[test]
    fn test_pending_lists_each_saving_tab_once() {
        let (mut fx, ids) = Fixture::with(&[
            ("a", CloseResponse::Apply),
            ("b", CloseResponse::Ok),
            ("c", CloseResponse::Apply),
        ]);

        assert_eq!(
            fx.close(),
            CloseDecision::Defer {
                pending: vec![ids[2], ids[0]],
            }
        );
        assert_eq!(fx.tabs.ids(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn test_empty_window_closes() {
        let (mut fx, _) = Fixture::with(&[]);
        assert_eq!(fx.close(), CloseDecision::Close);
    }

    #[test]
    fn test_state_reset_only_when_save_abandoned() {
        let mut close = CloseCoordinator::new();
        close.defer();

        close.on_state_changed(DocumentState::Active, DocumentState::Closing);
        assert!(close.should_close());

        close.on_state_changed(DocumentState::Closing, DocumentState::Closed);
        assert!(close.should_close());

        close.on_state_changed(DocumentState::Closing, DocumentState::Active);
        assert!(!close.should_close());
    }
}
