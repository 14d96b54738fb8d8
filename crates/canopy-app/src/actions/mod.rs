//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Every fetch runs in its own tokio task and reports back through the
//! message channel. Tasks are tracked per browser and per loader/counter id,
//! so a cancel command can abort exactly the work it supersedes.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_store::StoreClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::browser::{BrowserId, CounterId, LoaderId, StoreCommand};
use crate::config::LoadingSettings;
use crate::handler::UpdateAction;
use crate::message::Message;

mod count;
mod load;

/// What a tracked task is working for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskTag {
    Load(LoaderId),
    Count(CounterId),
}

/// Convenience type alias for fetch task tracking
pub type TaskMap = Arc<std::sync::Mutex<HashMap<(BrowserId, TaskTag), Vec<JoinHandle<()>>>>>;

pub fn new_task_map() -> TaskMap {
    Arc::new(std::sync::Mutex::new(HashMap::new()))
}

/// Execute an action by spawning background tasks
pub fn handle_action<S>(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    store: Arc<S>,
    tasks: TaskMap,
    loading: &LoadingSettings,
) where
    S: StoreClient + Sync + 'static,
{
    match action {
        UpdateAction::RunStoreCommands { browser, commands } => {
            for command in commands {
                run_command(browser, command, &msg_tx, &store, &tasks, loading);
            }
        }
    }
}

fn run_command<S>(
    browser: BrowserId,
    command: StoreCommand,
    msg_tx: &mpsc::Sender<Message>,
    store: &Arc<S>,
    tasks: &TaskMap,
    loading: &LoadingSettings,
) where
    S: StoreClient + Sync + 'static,
{
    match command {
        StoreCommand::FetchChildren {
            loader,
            scope,
            request,
        } => {
            let handle = load::spawn_children(
                browser,
                loader,
                scope,
                request,
                store.clone(),
                msg_tx.clone(),
                loading.fetch_timeout(),
            );
            track(tasks, browser, TaskTag::Load(loader), handle);
        }

        StoreCommand::FetchLeaves { loader, request } => {
            let handle = load::spawn_leaves(
                browser,
                loader,
                request,
                store.clone(),
                msg_tx.clone(),
                loading.fetch_timeout(),
            );
            track(tasks, browser, TaskTag::Load(loader), handle);
        }

        StoreCommand::FetchCounts { counter, keys } => {
            let handle = count::spawn_counts(
                browser,
                counter,
                keys,
                store.clone(),
                msg_tx.clone(),
                loading.count_concurrency,
                loading.count_timeout(),
            );
            track(tasks, browser, TaskTag::Count(counter), handle);
        }

        StoreCommand::CancelLoad { loader } => {
            abort(tasks, browser, TaskTag::Load(loader));
        }

        StoreCommand::CancelCount { counter } => {
            abort(tasks, browser, TaskTag::Count(counter));
        }
    }
}

/// Remember a task, dropping handles of tasks that already finished.
fn track(tasks: &TaskMap, browser: BrowserId, tag: TaskTag, handle: JoinHandle<()>) {
    match tasks.lock() {
        Ok(mut map) => {
            map.retain(|_, handles| {
                handles.retain(|h| !h.is_finished());
                !handles.is_empty()
            });
            map.entry((browser, tag)).or_default().push(handle);
        }
        Err(e) => {
            warn!("Task map poisoned, {:?} for browser {} untracked: {}", tag, browser, e);
        }
    }
}

/// Abort every task running for `tag`. Results already queued in the
/// channel are filtered out by the browser as stale.
fn abort(tasks: &TaskMap, browser: BrowserId, tag: TaskTag) {
    let handles = match tasks.lock() {
        Ok(mut map) => map.remove(&(browser, tag)).unwrap_or_default(),
        Err(e) => {
            warn!("Task map poisoned, cannot abort {:?}: {}", tag, e);
            return;
        }
    };
    if handles.is_empty() {
        trace!("Nothing to abort for {:?} of browser {}", tag, browser);
        return;
    }
    debug!("Aborting {} task(s) for {:?} of browser {}", handles.len(), tag, browser);
    for handle in handles {
        handle.abort();
    }
}

/// Abort everything still tracked. Used on shutdown.
pub fn abort_all(tasks: &TaskMap) -> usize {
    let drained: Vec<JoinHandle<()>> = match tasks.lock() {
        Ok(mut map) => map.drain().flat_map(|(_, handles)| handles).collect(),
        Err(e) => {
            warn!("Task map poisoned on shutdown: {}", e);
            return 0;
        }
    };
    let count = drained.len();
    for handle in drained {
        handle.abort();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{LoadKind, LoaderSlot};
    use canopy_core::{BrowserKind, ContainerKey, Identity, NodeKind, Payload, Tree};
    use canopy_store::test_utils::{sample_store, slow_store};
    use canopy_store::ChildrenRequest;
    use std::time::Duration;

    fn loader_id() -> LoaderId {
        LoaderSlot::default().issue(LoadKind::Root, None).0.id
    }

    fn root_scope() -> canopy_core::NodeId {
        Tree::new(Payload::Root {
            label: "projects".into(),
        })
        .root()
    }

    fn tracked(tasks: &TaskMap) -> usize {
        tasks.lock().unwrap().values().map(Vec::len).sum()
    }

    #[tokio::test]
    async fn test_fetch_children_reports_back() {
        let (tx, mut rx) = mpsc::channel(8);
        let tasks = new_task_map();
        let loader = loader_id();
        let action = UpdateAction::RunStoreCommands {
            browser: 1,
            commands: vec![StoreCommand::FetchChildren {
                loader,
                scope: root_scope(),
                request: ChildrenRequest::root(BrowserKind::Projects),
            }],
        };

        handle_action(action, tx, Arc::new(sample_store()), tasks.clone(), &LoadingSettings::default());
        assert_eq!(tracked(&tasks), 1);

        match rx.recv().await {
            Some(Message::ChildrenFetched {
                browser: 1,
                loader: got,
                result: Ok(nodes),
                ..
            }) => {
                assert_eq!(got, loader);
                assert_eq!(nodes.len(), 3);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_aborts_slow_fetch() {
        let (tx, mut rx) = mpsc::channel(8);
        let tasks = new_task_map();
        let loader = loader_id();
        let store = Arc::new(slow_store(5_000));
        let fetch = UpdateAction::RunStoreCommands {
            browser: 1,
            commands: vec![StoreCommand::FetchChildren {
                loader,
                scope: root_scope(),
                request: ChildrenRequest::root(BrowserKind::Projects),
            }],
        };
        let cancel = UpdateAction::RunStoreCommands {
            browser: 1,
            commands: vec![StoreCommand::CancelLoad { loader }],
        };

        handle_action(fetch, tx.clone(), store.clone(), tasks.clone(), &LoadingSettings::default());
        handle_action(cancel, tx, store, tasks.clone(), &LoadingSettings::default());

        assert_eq!(tracked(&tasks), 0);
        let got = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(got.is_err(), "aborted fetch must not report");
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let (tx, mut rx) = mpsc::channel(8);
        let loading = LoadingSettings {
            fetch_timeout_secs: 1,
            ..LoadingSettings::default()
        };
        let action = UpdateAction::RunStoreCommands {
            browser: 1,
            commands: vec![StoreCommand::FetchChildren {
                loader: loader_id(),
                scope: root_scope(),
                request: ChildrenRequest::root(BrowserKind::Projects),
            }],
        };
        handle_action(action, tx, Arc::new(slow_store(3_000)), new_task_map(), &loading);

        match rx.recv().await {
            Some(Message::ChildrenFetched { result: Err(e), .. }) => {
                assert!(e.contains("timed out"), "{e}");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_counts_report_each_key() {
        let (tx, mut rx) = mpsc::channel(8);
        let counter = CounterId(1);
        let keys = vec![
            ContainerKey::Object(Identity::new(NodeKind::Dataset, 42)),
            ContainerKey::Object(Identity::new(NodeKind::Dataset, 404)),
        ];
        let action = UpdateAction::RunStoreCommands {
            browser: 2,
            commands: vec![StoreCommand::FetchCounts { counter, keys }],
        };
        handle_action(action, tx, Arc::new(sample_store()), new_task_map(), &LoadingSettings::default());

        let mut results = HashMap::new();
        for _ in 0..2 {
            match rx.recv().await {
                Some(Message::CountFetched { key, result, .. }) => {
                    results.insert(key, result);
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(
            results[&ContainerKey::Object(Identity::new(NodeKind::Dataset, 42))],
            Ok(3)
        );
        assert!(results[&ContainerKey::Object(Identity::new(NodeKind::Dataset, 404))].is_err());
    }

    #[tokio::test]
    async fn test_count_batch_deadline_sends_timeout() {
        let (tx, mut rx) = mpsc::channel(8);
        let loading = LoadingSettings {
            count_timeout_ms: 100,
            ..LoadingSettings::default()
        };
        let counter = CounterId(9);
        let action = UpdateAction::RunStoreCommands {
            browser: 3,
            commands: vec![StoreCommand::FetchCounts {
                counter,
                keys: vec![ContainerKey::Index {
                    kind: NodeKind::TimeBucket,
                    index: 5,
                    owner: None,
                }],
            }],
        };
        handle_action(action, tx, Arc::new(slow_store(2_000)), new_task_map(), &loading);

        match rx.recv().await {
            Some(Message::CountTimedOut { browser: 3, counter: got }) => assert_eq!(got, counter),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_count_still_ends_at_deadline() {
        let (tx, mut rx) = mpsc::channel(8);
        let loading = LoadingSettings {
            count_timeout_ms: 100,
            ..LoadingSettings::default()
        };
        let counter = CounterId(4);
        let missing = ContainerKey::Object(Identity::new(NodeKind::Dataset, 404));
        let action = UpdateAction::RunStoreCommands {
            browser: 3,
            commands: vec![StoreCommand::FetchCounts {
                counter,
                keys: vec![missing],
            }],
        };
        handle_action(action, tx, Arc::new(sample_store()), new_task_map(), &loading);

        match rx.recv().await {
            Some(Message::CountFetched { key, result: Err(_), .. }) => assert_eq!(key, missing),
            other => panic!("unexpected message: {other:?}"),
        }
        match rx.recv().await {
            Some(Message::CountTimedOut { browser: 3, counter: got }) => assert_eq!(got, counter),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
