//! Headless mode runner - main event loop without a frontend
//!
//! A blocking thread reads stdin and forwards parsed commands; the loop
//! feeds them to the engine alongside fetch completions and writes every
//! broadcast browser event to stdout.

use std::path::PathBuf;
use std::time::Duration;

use canopy_app::{BrowserEvent, Engine, Message};
use canopy_core::prelude::*;
use canopy_core::{BrowserKind, DisplayMode};
use canopy_store::StoreClient;
use tokio::sync::{broadcast, mpsc};

use super::commands::Command;
use super::{emit_browser_event, tree_lines, HeadlessEvent};

/// Idle period after stdin closes before the runner exits.
const DRAIN_IDLE: Duration = Duration::from_millis(500);

/// What to do before reading stdin
#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    /// Name reported in the `started` event
    pub fixture: Option<String>,
    pub display_mode: Option<DisplayMode>,
    /// Browsers opened at startup, in order
    pub open: Vec<BrowserKind>,
}

/// Run in headless mode against `store`.
pub async fn run_headless<S>(config_dir: PathBuf, store: S, options: HeadlessOptions) -> Result<()>
where
    S: StoreClient + Sync + 'static,
{
    info!("═══════════════════════════════════════════════════════");
    info!("Canopy starting in HEADLESS mode");
    info!("Config: {}", config_dir.display());
    info!("═══════════════════════════════════════════════════════");

    let mut engine = Engine::new(config_dir, store);
    let mut events = engine.subscribe();
    HeadlessEvent::started(options.fixture.clone()).emit();

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(64);
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(cmd_tx);
    });

    if let Some(mode) = options.display_mode {
        engine.process_message(Message::SetDisplayMode { mode });
    }
    for kind in options.open {
        engine.process_message(Message::OpenBrowser { kind });
    }
    flush_events(&mut events);

    loop {
        if engine.should_quit() {
            info!("Quit requested");
            break;
        }

        tokio::select! {
            Some(msg) = engine.msg_rx.recv() => {
                engine.process_message(msg);
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => run_command(&mut engine, cmd).await,
                None => {
                    info!("Stdin closed, draining pending fetches");
                    engine.process_until_idle(DRAIN_IDLE).await;
                    flush_events(&mut events);
                    break;
                }
            },
        }

        flush_events(&mut events);
    }

    engine.shutdown().await;
    HeadlessEvent::shutdown().emit();
    info!("Canopy headless mode exiting");
    Ok(())
}

async fn run_command<S>(engine: &mut Engine<S>, cmd: Command)
where
    S: StoreClient + Sync + 'static,
{
    match cmd {
        Command::Send(msg) => engine.process_message(msg),
        Command::Show(browser) => match engine.state.browsers.get(browser) {
            Some(session) => HeadlessEvent::tree(browser, tree_lines(session)).emit(),
            None => {
                HeadlessEvent::command_rejected(
                    format!("show {browser}"),
                    format!("no browser {browser}"),
                )
                .emit();
            }
        },
        Command::Wait(idle) => {
            let processed = engine.process_until_idle(idle).await;
            debug!("Waited out {} message(s)", processed);
        }
        Command::Nothing => {}
    }
}

/// Write every event broadcast since the last call.
fn flush_events(events: &mut broadcast::Receiver<BrowserEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => emit_browser_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!("Headless output lagged, {} event(s) dropped", skipped);
            }
            Err(_) => break,
        }
    }
}

/// Read stdin lines, forwarding parsed commands (blocking version)
fn spawn_stdin_reader_blocking(cmd_tx: mpsc::Sender<Command>) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match line.parse::<Command>() {
            Ok(cmd) => {
                let quit = matches!(cmd, Command::Send(Message::Quit));
                if cmd_tx.blocking_send(cmd).is_err() || quit {
                    break;
                }
            }
            Err(e) => {
                warn!("Rejected stdin command '{}': {}", line.trim(), e);
                HeadlessEvent::command_rejected(line.trim(), e.to_string()).emit();
            }
        }
    }

    info!("Stdin reader exiting");
}
