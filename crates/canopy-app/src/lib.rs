//! canopy-app - Browser state machine and orchestration for Canopy
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! hierarchy browser: per-tab [`BrowserSession`]s own their trees and decide
//! what to fetch, the handler routes messages to them, and the [`Engine`]
//! runs store fetches as background tasks and broadcasts [`BrowserEvent`]s.

pub mod actions;
pub mod browser;
pub mod browser_manager;
pub mod config;
pub mod engine;
pub mod handler;
pub mod message;
pub mod process;
pub mod signals;
pub mod sorting;
pub mod state;

// Re-export primary types
pub use browser::{
    BrowserEvent, BrowserId, BrowserSession, BrowserState, NodeRef, SessionOptions, StoreCommand,
};
pub use browser_manager::{BrowserManager, MAX_BROWSERS};
pub use engine::Engine;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use sorting::DefaultComparator;
pub use state::AppState;
