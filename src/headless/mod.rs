//! Headless mode - NDJSON event output driven by stdin commands
//!
//! Every browser event the engine broadcasts is written to stdout as one
//! JSON object per line, stamped with a millisecond timestamp. Runner
//! events (startup, rejected commands, tree dumps, shutdown) share the
//! same `event` tag.
//!
//! # Example Output
//!
//! ```json
//! {"event":"started","fixture":"store.json","timestamp":1704700001000}
//! {"event":"browser_opened","browser":1,"kind":"projects","timestamp":1704700001002}
//! {"event":"state_changed","browser":1,"from":"new","to":"loading_data","timestamp":1704700001003}
//! ```

pub mod commands;
pub mod runner;

use std::io::{self, Write};

use canopy_app::{BrowserEvent, BrowserId, BrowserSession};
use canopy_core::{Identity, NodeKind, UNKNOWN_COUNT};
use chrono::Utc;
use serde::Serialize;
use tracing::error;

/// One visible row of a tree dump
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeLine {
    pub depth: usize,
    pub kind: NodeKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    pub expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub selected: bool,
}

/// Events produced by the runner itself
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    Started {
        fixture: Option<String>,
        timestamp: i64,
    },

    /// A stdin line could not be parsed
    CommandRejected {
        input: String,
        message: String,
        timestamp: i64,
    },

    /// Visible rows of a browser, answer to `show`
    Tree {
        browser: BrowserId,
        nodes: Vec<TreeLine>,
        timestamp: i64,
    },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    pub fn emit(&self) {
        write_line(self);
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn started(fixture: Option<String>) -> Self {
        Self::Started {
            fixture,
            timestamp: Self::now(),
        }
    }

    pub fn command_rejected(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandRejected {
            input: input.into(),
            message: message.into(),
            timestamp: Self::now(),
        }
    }

    pub fn tree(browser: BrowserId, nodes: Vec<TreeLine>) -> Self {
        Self::Tree {
            browser,
            nodes,
            timestamp: Self::now(),
        }
    }

    pub fn shutdown() -> Self {
        Self::Shutdown {
            timestamp: Self::now(),
        }
    }
}

/// A browser event with the emission time attached
#[derive(Debug, Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    event: &'a BrowserEvent,
    timestamp: i64,
}

/// Write a browser event to stdout.
pub fn emit_browser_event(event: &BrowserEvent) {
    write_line(&Stamped {
        event,
        timestamp: HeadlessEvent::now(),
    });
}

/// Flatten the visible part of a browser tree, root first.
pub fn tree_lines(session: &BrowserSession) -> Vec<TreeLine> {
    let Ok(tree) = session.tree() else {
        return Vec::new();
    };
    tree.visible_nodes(tree.root())
        .into_iter()
        .filter_map(|(id, depth)| {
            let node = tree.get(id)?;
            Some(TreeLine {
                depth,
                kind: node.kind(),
                name: node.name().to_string(),
                identity: node.identity(),
                expanded: node.expanded,
                count: (node.number_items != UNKNOWN_COUNT).then_some(node.number_items),
                selected: session.selection().contains(id),
            })
        })
        .collect()
}

fn write_line<T: Serialize>(value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize headless event: {}", e);
            return;
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", json) {
        error!("Failed to write headless event to stdout: {}", e);
        return;
    }
    if let Err(e) = stdout.flush() {
        error!("Failed to flush headless stdout: {}", e);
    }
}
