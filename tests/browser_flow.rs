//! End-to-end browser flows through the engine and the headless helpers
//!
//! These drive a real [`Engine`] against fixture stores, letting the fetch
//! tasks run on the tokio runtime.

use std::path::PathBuf;
use std::time::Duration;

use canopy::headless::commands::Command;
use canopy::headless::tree_lines;
use canopy_app::config::Settings;
use canopy_app::{BrowserEvent, BrowserState, Engine, Message};
use canopy_core::{BrowserKind, Identity, NodeKind};
use canopy_store::test_utils::sample_store;
use canopy_store::{FixtureStore, StoreClient};
use tokio::sync::broadcast;

const IDLE: Duration = Duration::from_millis(200);

fn engine<S>(store: S) -> Engine<S>
where
    S: StoreClient + Sync + 'static,
{
    Engine::with_settings(PathBuf::from("."), Settings::default(), store)
}

/// Feed a headless command line to the engine and let fetches finish.
async fn send<S>(engine: &mut Engine<S>, line: &str)
where
    S: StoreClient + Sync + 'static,
{
    match line.parse::<Command>() {
        Ok(Command::Send(msg)) => engine.process_message(msg),
        other => panic!("'{line}' did not parse to a message: {other:?}"),
    }
    engine.process_until_idle(IDLE).await;
}

fn collect(events: &mut broadcast::Receiver<BrowserEvent>) -> Vec<BrowserEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

fn first_browser<S>(engine: &Engine<S>) -> u64
where
    S: StoreClient + Sync + 'static,
{
    engine.state.browsers.selected_id().expect("a browser is open")
}

#[tokio::test]
async fn test_projects_browser_loads_and_counts() {
    let mut engine = engine(sample_store());
    let mut events = engine.subscribe();

    send(&mut engine, "open projects").await;
    let browser = first_browser(&engine);
    let session = engine.state.browsers.get(browser).unwrap();
    assert_eq!(session.state(), BrowserState::Ready);

    let lines = tree_lines(session);
    assert_eq!(lines.len(), 4, "root plus three top-level containers");
    assert_eq!(lines[0].kind, NodeKind::Root);
    assert!(lines[1..].iter().all(|l| l.depth == 1));

    let shared = lines
        .iter()
        .find(|l| l.identity == Some(Identity::new(NodeKind::Dataset, 42)))
        .expect("top-level dataset 42");
    assert_eq!(shared.count, Some(3));

    let states: Vec<BrowserState> = collect(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            BrowserEvent::StateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            BrowserState::LoadingData,
            BrowserState::CountingItems,
            BrowserState::Ready
        ]
    );
}

#[tokio::test]
async fn test_expand_reveals_second_mirror() {
    let mut engine = engine(sample_store());
    send(&mut engine, "open projects").await;
    let browser = first_browser(&engine);

    send(&mut engine, &format!("expand {browser} project:2")).await;

    let session = engine.state.browsers.get(browser).unwrap();
    let tree = session.tree().unwrap();
    let mirrors = tree.find_by_identity(&Identity::new(NodeKind::Dataset, 42), tree.root());
    assert_eq!(mirrors.len(), 2);
    assert!(tree_lines(session)
        .iter()
        .any(|l| l.depth == 2 && l.name == "Shared"));
}

#[tokio::test]
async fn test_search_selects_matches_in_turn() {
    let mut engine = engine(sample_store());
    send(&mut engine, "open projects").await;
    let browser = first_browser(&engine);

    send(&mut engine, &format!("search {browser} alpha")).await;
    send(&mut engine, &format!("next {browser}")).await;

    let session = engine.state.browsers.get(browser).unwrap();
    assert_eq!(
        session.selection().identities(session.tree().unwrap()),
        vec![Identity::new(NodeKind::Project, 1)]
    );
    assert!(tree_lines(session).iter().any(|l| l.selected && l.name == "Alpha"));
}

#[tokio::test]
async fn test_failing_root_load_reports_and_recovers() {
    let store = FixtureStore::from_json(
        r#"{
            "roots": { "tags": [ { "payload": {"kind": "tag", "id": 1, "name": "Live"} } ] },
            "failing": [ {"kind": "root", "id": 0} ]
        }"#,
    )
    .unwrap();
    let mut engine = engine(store);
    let mut events = engine.subscribe();

    send(&mut engine, "open tags").await;
    let browser = first_browser(&engine);

    let events = collect(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, BrowserEvent::LoadFailed { target: None, .. })));
    let session = engine.state.browsers.get(browser).unwrap();
    assert!(!session.state().is_loading());
}

#[tokio::test]
async fn test_close_browser_drops_it() {
    let mut engine = engine(sample_store());
    send(&mut engine, "open tags").await;
    send(&mut engine, "open screens").await;
    assert_eq!(engine.state.browsers.len(), 2);

    let browser = first_browser(&engine);
    engine.process_message(Message::CloseBrowser { browser });
    assert_eq!(engine.state.browsers.len(), 1);
    assert!(engine.state.browsers.get(browser).is_none());
}
