//! View notifications emitted by browsers
//!
//! Sessions queue these while handling a message; the engine drains and
//! broadcasts them after each processing cycle.

use canopy_core::{BrowserKind, ContainerKey, Identity};
use serde::Serialize;

use super::state::BrowserState;
use super::BrowserId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowserEvent {
    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// A browser tab was created
    BrowserOpened {
        browser: BrowserId,
        kind: BrowserKind,
    },

    StateChanged {
        browser: BrowserId,
        from: BrowserState,
        to: BrowserState,
    },

    // ─────────────────────────────────────────────────────────
    // Tree changes
    // ─────────────────────────────────────────────────────────
    /// Children were loaded under a node that had none yet
    NodesInserted {
        browser: BrowserId,
        parent: Option<Identity>,
        count: usize,
    },

    /// A refresh scope was rebuilt from fresh data
    NodesReplaced {
        browser: BrowserId,
        scope: Option<Identity>,
        count: usize,
    },

    /// An item count arrived and was written to every mirror of the key
    CountUpdated {
        browser: BrowserId,
        key: ContainerKey,
        value: i64,
        nodes: usize,
    },

    // ─────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────
    SelectionChanged {
        browser: BrowserId,
        selected: Vec<Identity>,
    },

    /// Some candidates were dropped to keep the selection homogeneous
    SelectionRestricted {
        browser: BrowserId,
        dropped: Vec<Identity>,
    },

    /// Search results changed
    SearchResults {
        browser: BrowserId,
        query: String,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────
    // Failures
    // ─────────────────────────────────────────────────────────
    LoadFailed {
        browser: BrowserId,
        target: Option<Identity>,
        message: String,
    },

    /// One count of a batch failed; the batch stays open for the others
    CountFailed {
        browser: BrowserId,
        key: ContainerKey,
        message: String,
    },

    /// An operation was rejected
    Fault {
        browser: Option<BrowserId>,
        operation: String,
        message: String,
        recoverable: bool,
    },
}

impl BrowserEvent {
    /// Short label for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            BrowserEvent::BrowserOpened { .. } => "browser_opened",
            BrowserEvent::StateChanged { .. } => "state_changed",
            BrowserEvent::NodesInserted { .. } => "nodes_inserted",
            BrowserEvent::NodesReplaced { .. } => "nodes_replaced",
            BrowserEvent::CountUpdated { .. } => "count_updated",
            BrowserEvent::SelectionChanged { .. } => "selection_changed",
            BrowserEvent::SelectionRestricted { .. } => "selection_restricted",
            BrowserEvent::SearchResults { .. } => "search_results",
            BrowserEvent::LoadFailed { .. } => "load_failed",
            BrowserEvent::CountFailed { .. } => "count_failed",
            BrowserEvent::Fault { .. } => "fault",
        }
    }

    pub fn browser(&self) -> Option<BrowserId> {
        match self {
            BrowserEvent::BrowserOpened { browser, .. }
            | BrowserEvent::StateChanged { browser, .. }
            | BrowserEvent::NodesInserted { browser, .. }
            | BrowserEvent::NodesReplaced { browser, .. }
            | BrowserEvent::CountUpdated { browser, .. }
            | BrowserEvent::SelectionChanged { browser, .. }
            | BrowserEvent::SelectionRestricted { browser, .. }
            | BrowserEvent::SearchResults { browser, .. }
            | BrowserEvent::LoadFailed { browser, .. }
            | BrowserEvent::CountFailed { browser, .. } => Some(*browser),
            BrowserEvent::Fault { browser, .. } => *browser,
        }
    }
}
