//! Engine - orchestration state shared by every frontend
//!
//! The Engine owns the TEA state, the message channel, the fetch task map,
//! the shutdown signal and the store. After each processing cycle it drains
//! the events browsers queued and broadcasts them to subscribers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use canopy_store::StoreClient;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{info, warn};

use crate::actions::{self, TaskMap};
use crate::browser::BrowserEvent;
use crate::config::{self, Settings};
use crate::message::Message;
use crate::process;
use crate::signals;
use crate::state::AppState;

/// Orchestration engine for the hierarchy browser.
///
/// Generic over the store so tests can run against the fixture store.
pub struct Engine<S> {
    /// TEA application state (the Model)
    pub state: AppState,

    /// Sender half of the unified message channel.
    /// Clone this to give to input sources (stdin reader, signal handler).
    pub msg_tx: mpsc::Sender<Message>,

    /// Receiver half of the unified message channel.
    pub msg_rx: mpsc::Receiver<Message>,

    /// Fetch tasks by browser and loader/counter
    pub tasks: TaskMap,

    /// Sender for the shutdown signal. Send `true` to initiate shutdown.
    pub shutdown_tx: watch::Sender<bool>,

    /// Receiver for the shutdown signal. Clone for background tasks.
    pub shutdown_rx: watch::Receiver<bool>,

    /// Directory holding `.canopy/`
    pub config_dir: PathBuf,

    store: Arc<S>,

    /// Subscribers receive every BrowserEvent after each processing cycle.
    event_tx: broadcast::Sender<BrowserEvent>,
}

impl<S> Engine<S>
where
    S: StoreClient + Sync + 'static,
{
    /// Create an Engine rooted at `config_dir`.
    ///
    /// Initializes `.canopy/` (non-fatal on failure), loads settings and
    /// spawns the signal handler. Must be called inside a tokio runtime.
    pub fn new(config_dir: PathBuf, store: S) -> Self {
        if let Err(e) = config::init_config_dir(&config_dir) {
            warn!("Failed to initialize .canopy directory: {}", e);
        }
        let settings = config::load_settings(&config_dir);

        let engine = Self::with_settings(config_dir, settings, store);
        signals::spawn_signal_handler(engine.msg_tx.clone());
        engine
    }

    /// Create an Engine with explicit settings, touching neither the disk
    /// nor signal handlers.
    pub fn with_settings(config_dir: PathBuf, settings: Settings, store: S) -> Self {
        let state = AppState::with_settings(settings.validated());
        let (msg_tx, msg_rx) = mpsc::channel::<Message>(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(256);

        Self {
            state,
            msg_tx,
            msg_rx,
            tasks: actions::new_task_map(),
            shutdown_tx,
            shutdown_rx,
            config_dir,
            store: Arc::new(store),
            event_tx,
        }
    }

    /// Subscribe to browser events.
    ///
    /// If the subscriber falls behind (buffer full), older events are
    /// dropped. Use `broadcast::error::RecvError::Lagged` to detect this.
    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.event_tx.subscribe()
    }

    /// Process a single message through the TEA update cycle, then
    /// broadcast the events it produced.
    pub fn process_message(&mut self, msg: Message) {
        process::process_message(&mut self.state, msg, &self.msg_tx, &self.store, &self.tasks);
        for event in self.state.drain_events() {
            self.emit(event);
        }
    }

    /// Drain and process all pending messages from the channel.
    ///
    /// Returns the number of messages processed.
    pub fn drain_pending_messages(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            count += 1;
        }
        count
    }

    /// Process messages as they arrive until none shows up for `idle`.
    ///
    /// Returns the number of messages processed.
    pub async fn process_until_idle(&mut self, idle: Duration) -> usize {
        let mut count = 0;
        while let Ok(Some(msg)) = tokio::time::timeout(idle, self.msg_rx.recv()).await {
            self.process_message(msg);
            count += 1;
            if self.should_quit() {
                break;
            }
        }
        count
    }

    /// Get a clone of the message sender for spawning input sources.
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Get a clone of the shutdown receiver for background tasks.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Check if the application should quit.
    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Initiate shutdown: signal background readers, abort fetches.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        let aborted = actions::abort_all(&self.tasks);
        info!("Engine shut down, {} fetch task(s) aborted", aborted);
    }

    /// Broadcast an event. No subscribers is not an error.
    fn emit(&self, event: BrowserEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::BrowserKind;
    use canopy_store::test_utils::sample_store;
    use canopy_store::FixtureStore;

    fn engine() -> Engine<FixtureStore> {
        Engine::with_settings(PathBuf::from("."), Settings::default(), sample_store())
    }

    #[tokio::test]
    async fn test_open_browser_reaches_ready() {
        let mut engine = engine();
        let mut events = engine.subscribe();

        engine.process_message(Message::OpenBrowser {
            kind: BrowserKind::Projects,
        });
        engine.process_until_idle(Duration::from_millis(200)).await;

        let browser = engine.state.browsers.selected().unwrap();
        assert_eq!(browser.state(), crate::browser::BrowserState::Ready);

        let first = events.recv().await.unwrap();
        assert_eq!(first.event_type(), "browser_opened");
    }

    #[tokio::test]
    async fn test_quit_stops_processing() {
        let mut engine = engine();
        engine.msg_sender().send(Message::Quit).await.unwrap();
        let processed = engine.process_until_idle(Duration::from_millis(50)).await;
        assert_eq!(processed, 1);
        assert!(engine.should_quit());
    }

    #[tokio::test]
    async fn test_shutdown_signals_and_clears_tasks() {
        let mut engine = engine();
        engine.process_message(Message::OpenBrowser {
            kind: BrowserKind::Tags,
        });
        let mut shutdown = engine.shutdown_receiver();
        engine.shutdown().await;
        assert!(*shutdown.borrow_and_update());
        assert!(engine.tasks.lock().unwrap().is_empty());
    }
}
