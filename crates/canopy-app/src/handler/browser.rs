//! Browser handlers: lifecycle, navigation dispatch and fault reporting

use canopy_core::prelude::*;
use canopy_core::{BrowserKind, DisplayMode};

use crate::browser::{BrowserEvent, BrowserId, BrowserSession, Completion, StoreCommand};
use crate::message::Message;
use crate::state::AppState;

use super::UpdateResult;

/// Open a browser and queue its first activation.
pub fn handle_open(state: &mut AppState, kind: BrowserKind) -> UpdateResult {
    let options = state.session_options();
    let comparator = state.comparator.clone();
    match state.browsers.create(kind, options, comparator) {
        Ok(browser) => {
            info!("Opened {} browser {}", kind, browser);
            state.push_event(BrowserEvent::BrowserOpened { browser, kind });
            UpdateResult::message(Message::Activate { browser })
        }
        Err(e) => {
            report_fault(state, None, "open_browser", &e);
            UpdateResult::none()
        }
    }
}

pub fn handle_select_browser(state: &mut AppState, browser: BrowserId) -> UpdateResult {
    if !state.browsers.select_by_id(browser) {
        let e = Error::not_found(format!("browser {browser}"));
        report_fault(state, Some(browser), "select_browser", &e);
    }
    UpdateResult::none()
}

/// Discard (if still live) and remove a browser.
pub fn handle_close(state: &mut AppState, browser: BrowserId) -> UpdateResult {
    let Some(session) = state.browsers.get_mut(browser) else {
        let e = Error::not_found(format!("browser {browser}"));
        report_fault(state, Some(browser), "close_browser", &e);
        return UpdateResult::none();
    };

    let commands = if session.state().is_discarded() {
        Vec::new()
    } else {
        match session.discard() {
            Ok(commands) => commands,
            Err(e) => {
                report_fault(state, Some(browser), "close_browser", &e);
                return UpdateResult::none();
            }
        }
    };

    // Flush what the discard emitted before the session goes away.
    if let Some(mut removed) = state.browsers.remove(browser) {
        for event in removed.drain_events() {
            state.push_event(event);
        }
    }
    info!("Closed browser {}", browser);
    UpdateResult::commands(browser, commands)
}

pub fn handle_display_mode(state: &mut AppState, mode: DisplayMode) -> UpdateResult {
    state.settings.browser.display_mode = mode;
    state.browsers.set_display_mode(mode);
    debug!("Display mode set to {:?}", mode);
    UpdateResult::none()
}

/// Run a navigation operation against one browser, turning its commands
/// into an action and its error into a fault event.
pub fn run<F>(state: &mut AppState, browser: BrowserId, operation: &str, op: F) -> UpdateResult
where
    F: FnOnce(&mut BrowserSession) -> Result<Vec<StoreCommand>>,
{
    let result = match state.browsers.require_mut(browser) {
        Ok(session) => op(session),
        Err(e) => Err(e),
    };
    match result {
        Ok(commands) => UpdateResult::commands(browser, commands),
        Err(e) => {
            report_fault(state, Some(browser), operation, &e);
            UpdateResult::none()
        }
    }
}

/// Feed a fetch completion to a browser. Completions for closed browsers
/// are dropped.
pub fn complete<F>(state: &mut AppState, browser: BrowserId, operation: &str, op: F) -> UpdateResult
where
    F: FnOnce(&mut BrowserSession) -> Result<Completion>,
{
    let Some(session) = state.browsers.get_mut(browser) else {
        trace!("Dropping {} for closed browser {}", operation, browser);
        return UpdateResult::none();
    };
    match op(session) {
        Ok(completion) => UpdateResult::commands(browser, completion.into_commands()),
        Err(e) => {
            report_fault(state, Some(browser), operation, &e);
            UpdateResult::none()
        }
    }
}

/// Log a rejected operation and queue a fault event for observers.
pub fn report_fault(state: &mut AppState, browser: Option<BrowserId>, operation: &str, e: &Error) {
    let recoverable = e.is_recoverable();
    if e.is_contract_violation() {
        error!("{} rejected: {}", operation, e);
    } else {
        warn!("{} failed: {}", operation, e);
    }
    state.push_event(BrowserEvent::Fault {
        browser,
        operation: operation.to_string(),
        message: e.to_string(),
        recoverable,
    });
}
