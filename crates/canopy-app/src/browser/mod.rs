//! Per-tab browser state: tree, loaders, counters and selection

mod command;
mod counter;
mod events;
mod loader;
pub mod reconcile;
mod selection;
mod session;
mod state;

pub use command::{Completion, NodeRef, StoreCommand};
pub use counter::{ContainerCounter, CountReport, CounterId};
pub use events::BrowserEvent;
pub use loader::{LoadKind, LoaderHandle, LoaderId, LoaderSlot};
pub use selection::{SelectionChange, SelectionTracker};
pub use session::{BrowserSession, SessionOptions};
pub use state::BrowserState;

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a browser tab
pub type BrowserId = u64;

static BROWSER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique browser ID
pub fn next_browser_id() -> BrowserId {
    BROWSER_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
