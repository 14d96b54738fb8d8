//! Message types for the application (TEA pattern)

use canopy_core::{BrowserKind, ContainerKey, DisplayMode, NodeData, NodeId, SortOptions};

use crate::browser::{BrowserId, CounterId, LoaderId, NodeRef};

/// All possible messages in the application
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Browser Management
    // ─────────────────────────────────────────────────────────
    /// Open a browser tab and start loading its root
    OpenBrowser { kind: BrowserKind },

    /// Focus a browser tab
    SelectBrowser { browser: BrowserId },

    /// Discard a browser and close its tab
    CloseBrowser { browser: BrowserId },

    // ─────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────
    /// Load the root on first activation, refresh afterwards
    Activate { browser: BrowserId },

    Refresh { browser: BrowserId },

    Expand { browser: BrowserId, node: NodeRef },

    Collapse { browser: BrowserId, node: NodeRef },

    /// Cancel the running load
    Cancel { browser: BrowserId },

    /// Discard the browser but keep its tab
    Discard { browser: BrowserId },

    /// Count items below a node, or below the root when `node` is `None`
    CountItems {
        browser: BrowserId,
        node: Option<NodeRef>,
    },

    Select {
        browser: BrowserId,
        nodes: Vec<NodeRef>,
        add: bool,
    },

    SelectAllSiblings { browser: BrowserId },

    ClearSelection { browser: BrowserId },

    Search { browser: BrowserId, text: String },

    NextFound { browser: BrowserId },

    PreviousFound { browser: BrowserId },

    /// Switch the refresh scope of every browser
    SetDisplayMode { mode: DisplayMode },

    SetSortOptions {
        browser: BrowserId,
        sort: SortOptions,
    },

    // ─────────────────────────────────────────────────────────
    // Store Completions
    // ─────────────────────────────────────────────────────────
    /// One scope of a root or refresh load finished
    ChildrenFetched {
        browser: BrowserId,
        loader: LoaderId,
        scope: NodeId,
        result: Result<Vec<NodeData>, String>,
    },

    LeavesFetched {
        browser: BrowserId,
        loader: LoaderId,
        result: Result<Vec<NodeData>, String>,
    },

    CountFetched {
        browser: BrowserId,
        counter: CounterId,
        key: ContainerKey,
        result: Result<i64, String>,
    },

    /// A count batch ran past its deadline
    CountTimedOut {
        browser: BrowserId,
        counter: CounterId,
    },

    Quit,
}

impl Message {
    /// Browser the message is addressed to, if any
    pub fn browser(&self) -> Option<BrowserId> {
        match self {
            Message::OpenBrowser { .. } | Message::SetDisplayMode { .. } | Message::Quit => None,
            Message::SelectBrowser { browser }
            | Message::CloseBrowser { browser }
            | Message::Activate { browser }
            | Message::Refresh { browser }
            | Message::Expand { browser, .. }
            | Message::Collapse { browser, .. }
            | Message::Cancel { browser }
            | Message::Discard { browser }
            | Message::CountItems { browser, .. }
            | Message::Select { browser, .. }
            | Message::SelectAllSiblings { browser }
            | Message::ClearSelection { browser }
            | Message::Search { browser, .. }
            | Message::NextFound { browser }
            | Message::PreviousFound { browser }
            | Message::SetSortOptions { browser, .. }
            | Message::ChildrenFetched { browser, .. }
            | Message::LeavesFetched { browser, .. }
            | Message::CountFetched { browser, .. }
            | Message::CountTimedOut { browser, .. } => Some(*browser),
        }
    }
}
