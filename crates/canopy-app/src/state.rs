//! Application state (Model in TEA pattern)

use std::sync::Arc;

use canopy_core::NodeComparator;

use crate::browser::{BrowserEvent, SessionOptions};
use crate::browser_manager::BrowserManager;
use crate::config::Settings;
use crate::sorting::DefaultComparator;

/// Complete application state
pub struct AppState {
    /// Open browsers
    pub browsers: BrowserManager,

    /// Loaded settings
    pub settings: Settings,

    /// Comparator every new browser orders its children with
    pub comparator: Arc<dyn NodeComparator>,

    /// Set once a quit was requested
    should_quit: bool,

    /// Events not tied to a live browser (faults, closed tabs)
    outbox: Vec<BrowserEvent>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("browsers", &self.browsers)
            .field("settings", &self.settings)
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            browsers: BrowserManager::new(),
            settings,
            comparator: Arc::new(DefaultComparator),
            should_quit: false,
            outbox: Vec::new(),
        }
    }

    /// Options a newly opened browser starts with
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from_settings(&self.settings)
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn push_event(&mut self, event: BrowserEvent) {
        self.outbox.push(event);
    }

    /// Collect every queued event: app-level first, then per browser in tab
    /// order.
    pub fn drain_events(&mut self) -> Vec<BrowserEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        for id in self.browsers.ids() {
            if let Some(browser) = self.browsers.get_mut(id) {
                events.extend(browser.drain_events());
            }
        }
        events
    }
}
