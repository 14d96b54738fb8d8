//! Tests for handler module

use super::*;
use crate::browser::{BrowserEvent, BrowserState, NodeRef};
use crate::message::Message;
use crate::state::AppState;
use canopy_core::{BrowserKind, DisplayMode, Identity, NodeData, NodeKind};
use canopy_store::test_utils::{dataset, project};

/// Open a browser and run its activation, returning the browser id and
/// the commands the activation produced.
fn open(state: &mut AppState, kind: BrowserKind) -> (BrowserId, Vec<StoreCommand>) {
    let result = update(state, Message::OpenBrowser { kind });
    let Some(Message::Activate { browser }) = result.message else {
        panic!("open should queue an activation");
    };
    let result = update(state, Message::Activate { browser });
    let Some(UpdateAction::RunStoreCommands { commands, .. }) = result.action else {
        panic!("activation should fetch the root");
    };
    (browser, commands)
}

/// Answer the root fetch with two projects.
fn load_root(state: &mut AppState, browser: BrowserId, commands: Vec<StoreCommand>) {
    for command in commands {
        if let StoreCommand::FetchChildren { loader, scope, .. } = command {
            update(
                state,
                Message::ChildrenFetched {
                    browser,
                    loader,
                    scope,
                    result: Ok(vec![
                        NodeData::new(project(1, "Alpha")),
                        NodeData::new(project(2, "Beta")),
                    ]),
                },
            );
        }
    }
}

fn faults(state: &mut AppState) -> Vec<(String, bool)> {
    state
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            BrowserEvent::Fault {
                operation,
                recoverable,
                ..
            } => Some((operation, recoverable)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_quit_message_sets_should_quit() {
    let mut state = AppState::new();
    assert!(!state.should_quit());
    update(&mut state, Message::Quit);
    assert!(state.should_quit());
}

#[test]
fn test_open_browser_emits_opened_and_loads() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);

    assert_eq!(commands.len(), 1);
    let events = state.drain_events();
    assert!(matches!(
        events[0],
        BrowserEvent::BrowserOpened {
            kind: BrowserKind::Projects,
            ..
        }
    ));
    assert_eq!(
        state.browsers.get(browser).unwrap().state(),
        BrowserState::LoadingData
    );
}

#[test]
fn test_root_load_issues_count_batch() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);
    let StoreCommand::FetchChildren { loader, scope, .. } = commands[0].clone() else {
        panic!("expected children fetch");
    };

    let result = update(
        &mut state,
        Message::ChildrenFetched {
            browser,
            loader,
            scope,
            result: Ok(vec![NodeData::new(project(1, "Alpha"))]),
        },
    );
    let Some(UpdateAction::RunStoreCommands { commands, .. }) = result.action else {
        panic!("expected count batch");
    };
    assert!(matches!(commands[0], StoreCommand::FetchCounts { .. }));
    assert_eq!(
        state.browsers.get(browser).unwrap().state(),
        BrowserState::CountingItems
    );
}

#[test]
fn test_expand_by_identity_requests_leaves() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);
    load_root(&mut state, browser, commands);

    // Counting still running; expand is allowed there.
    let result = update(
        &mut state,
        Message::Expand {
            browser,
            node: NodeRef::Identity(Identity::new(NodeKind::Project, 1)),
        },
    );
    let Some(UpdateAction::RunStoreCommands { commands, .. }) = result.action else {
        panic!("expected leaves fetch");
    };
    let Some(StoreCommand::FetchLeaves { loader, request }) = commands.last().cloned() else {
        panic!("expected leaves fetch");
    };
    assert_eq!(request.node, Identity::new(NodeKind::Project, 1));

    update(
        &mut state,
        Message::LeavesFetched {
            browser,
            loader,
            result: Ok(vec![NodeData::new(dataset(10, "Control"))]),
        },
    );
    let session = state.browsers.get(browser).unwrap();
    let tree = session.tree().unwrap();
    let found = tree.find_by_identity(&Identity::new(NodeKind::Dataset, 10), tree.root());
    assert_eq!(found.len(), 1);
}

#[test]
fn test_invalid_state_is_reported_as_unrecoverable_fault() {
    let mut state = AppState::new();
    let (browser, _commands) = open(&mut state, BrowserKind::Projects);
    state.drain_events();

    // Still loading the root.
    let result = update(&mut state, Message::Activate { browser });
    assert!(result.action.is_none());
    assert_eq!(faults(&mut state), vec![("activate".to_string(), false)]);
}

#[test]
fn test_unknown_node_is_recoverable_fault() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);
    load_root(&mut state, browser, commands);
    state.drain_events();

    update(
        &mut state,
        Message::Select {
            browser,
            nodes: vec![NodeRef::Identity(Identity::new(NodeKind::Image, 404))],
            add: false,
        },
    );
    assert_eq!(faults(&mut state), vec![("select".to_string(), true)]);
}

#[test]
fn test_unknown_browser_is_fault() {
    let mut state = AppState::new();
    update(&mut state, Message::Refresh { browser: 9_999_999 });
    assert_eq!(faults(&mut state), vec![("refresh".to_string(), true)]);
}

#[test]
fn test_completion_for_closed_browser_is_dropped() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);

    let result = update(&mut state, Message::CloseBrowser { browser });
    let Some(UpdateAction::RunStoreCommands { commands: cancels, .. }) = result.action else {
        panic!("closing a loading browser should cancel its fetch");
    };
    assert!(matches!(cancels[0], StoreCommand::CancelLoad { .. }));
    assert!(state.browsers.get(browser).is_none());
    state.drain_events();

    load_root(&mut state, browser, commands);
    assert!(faults(&mut state).is_empty());
}

#[test]
fn test_select_and_search() {
    let mut state = AppState::new();
    let (browser, commands) = open(&mut state, BrowserKind::Projects);
    load_root(&mut state, browser, commands);
    state.drain_events();

    update(
        &mut state,
        Message::Search {
            browser,
            text: "beta".into(),
        },
    );
    update(&mut state, Message::NextFound { browser });
    let session = state.browsers.get(browser).unwrap();
    assert_eq!(
        session.selection().identities(session.tree().unwrap()),
        vec![Identity::new(NodeKind::Project, 2)]
    );

    let events = state.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, BrowserEvent::SearchResults { found: 1, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, BrowserEvent::SelectionChanged { .. })));
}

#[test]
fn test_display_mode_applies_to_all_browsers() {
    let mut state = AppState::new();
    open(&mut state, BrowserKind::Projects);
    open(&mut state, BrowserKind::Admin);

    update(
        &mut state,
        Message::SetDisplayMode {
            mode: DisplayMode::GroupDisplay,
        },
    );
    assert_eq!(state.settings.browser.display_mode, DisplayMode::GroupDisplay);
    assert!(state
        .browsers
        .iter()
        .all(|b| b.options().display_mode == DisplayMode::GroupDisplay));
}
