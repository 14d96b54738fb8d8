//! Main update function - handles state transitions (TEA pattern)

use crate::message::Message;
use crate::state::AppState;

use super::{browser, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.request_quit();
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Browser Management
        // ─────────────────────────────────────────────────────────
        Message::OpenBrowser { kind } => browser::handle_open(state, kind),
        Message::SelectBrowser { browser } => browser::handle_select_browser(state, browser),
        Message::CloseBrowser { browser } => browser::handle_close(state, browser),

        // ─────────────────────────────────────────────────────────
        // Navigation
        // ─────────────────────────────────────────────────────────
        Message::Activate { browser } => {
            browser::run(state, browser, "activate", |session| session.activate())
        }
        Message::Refresh { browser } => {
            browser::run(state, browser, "refresh", |session| session.refresh())
        }
        Message::Expand { browser, node } => browser::run(state, browser, "expand", |session| {
            let id = session.resolve(&node)?;
            session.expand(id)
        }),
        Message::Collapse { browser, node } => {
            browser::run(state, browser, "collapse", |session| {
                let id = session.resolve(&node)?;
                session.collapse(id)
            })
        }
        Message::Cancel { browser } => {
            browser::run(state, browser, "cancel", |session| session.cancel())
        }
        Message::Discard { browser } => {
            browser::run(state, browser, "discard", |session| session.discard())
        }
        Message::CountItems { browser, node } => {
            browser::run(state, browser, "count_container_items", |session| {
                let id = match node {
                    Some(node) => session.resolve(&node)?,
                    None => session.tree()?.root(),
                };
                session.count_container_items(id)
            })
        }
        Message::Select {
            browser,
            nodes,
            add,
        } => browser::run(state, browser, "select", |session| {
            let ids = nodes
                .iter()
                .map(|node| session.resolve(node))
                .collect::<canopy_core::Result<Vec<_>>>()?;
            session.select(&ids, add)?;
            Ok(Vec::new())
        }),
        Message::SelectAllSiblings { browser } => {
            browser::run(state, browser, "select_all_siblings", |session| {
                session.select_all_siblings()?;
                Ok(Vec::new())
            })
        }
        Message::ClearSelection { browser } => {
            browser::run(state, browser, "clear_selection", |session| {
                session.clear_selection()?;
                Ok(Vec::new())
            })
        }
        Message::Search { browser, text } => browser::run(state, browser, "search", |session| {
            session.search(&text)?;
            Ok(Vec::new())
        }),
        Message::NextFound { browser } => {
            browser::run(state, browser, "next_found", |session| {
                session.next_found()?;
                Ok(Vec::new())
            })
        }
        Message::PreviousFound { browser } => {
            browser::run(state, browser, "previous_found", |session| {
                session.previous_found()?;
                Ok(Vec::new())
            })
        }
        Message::SetDisplayMode { mode } => browser::handle_display_mode(state, mode),
        Message::SetSortOptions { browser, sort } => {
            browser::run(state, browser, "set_sort_options", |session| {
                session.set_sort_options(sort)?;
                Ok(Vec::new())
            })
        }

        // ─────────────────────────────────────────────────────────
        // Store Completions
        // ─────────────────────────────────────────────────────────
        Message::ChildrenFetched {
            browser,
            loader,
            scope,
            result,
        } => browser::complete(state, browser, "children_loaded", |session| {
            session.children_loaded(loader, scope, result)
        }),
        Message::LeavesFetched {
            browser,
            loader,
            result,
        } => browser::complete(state, browser, "set_leaves", |session| {
            session.set_leaves(loader, result)
        }),
        Message::CountFetched {
            browser,
            counter,
            key,
            result,
        } => browser::complete(state, browser, "count_reported", |session| {
            session.count_reported(counter, key, result)
        }),
        Message::CountTimedOut { browser, counter } => {
            browser::complete(state, browser, "count_timed_out", |session| {
                session.count_timed_out(counter)
            })
        }
    }
}
