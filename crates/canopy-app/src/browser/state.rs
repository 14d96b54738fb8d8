//! Browser lifecycle states

use std::fmt;

use serde::Serialize;

/// Lifecycle state of one browser.
///
/// `New → LoadingData → Ready`, `Ready ⇄ LoadingLeaves`,
/// `Ready ⇄ CountingItems`, and any state `→ Discarded`, which is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserState {
    #[default]
    New,
    LoadingData,
    Ready,
    LoadingLeaves,
    CountingItems,
    Discarded,
}

impl BrowserState {
    pub fn is_loading(&self) -> bool {
        matches!(self, BrowserState::LoadingData | BrowserState::LoadingLeaves)
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, BrowserState::Discarded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserState::New => "new",
            BrowserState::LoadingData => "loading_data",
            BrowserState::Ready => "ready",
            BrowserState::LoadingLeaves => "loading_leaves",
            BrowserState::CountingItems => "counting_items",
            BrowserState::Discarded => "discarded",
        }
    }
}

impl fmt::Display for BrowserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
