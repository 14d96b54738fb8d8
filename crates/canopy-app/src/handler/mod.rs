//! Handler module - TEA update function and browser handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `browser`: Navigation and completion handlers for one browser

pub(crate) mod browser;
pub(crate) mod update;

#[cfg(test)]
mod tests;

use crate::browser::{BrowserId, StoreCommand};
use crate::message::Message;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Start or cancel store work on behalf of a browser
    RunStoreCommands {
        browser: BrowserId,
        commands: Vec<StoreCommand>,
    },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }

    /// Run `commands` for `browser`, or nothing when there are none.
    pub fn commands(browser: BrowserId, commands: Vec<StoreCommand>) -> Self {
        if commands.is_empty() {
            Self::none()
        } else {
            Self::action(UpdateAction::RunStoreCommands { browser, commands })
        }
    }
}
