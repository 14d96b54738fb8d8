//! Children and leaves fetch tasks

use std::sync::Arc;
use std::time::Duration;

use canopy_core::{NodeData, NodeId};
use canopy_store::{ChildrenRequest, LeavesRequest, StoreClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::{BrowserId, LoaderId};
use crate::message::Message;

/// Fetch the children of one refresh scope.
pub(super) fn spawn_children<S>(
    browser: BrowserId,
    loader: LoaderId,
    scope: NodeId,
    request: ChildrenRequest,
    store: Arc<S>,
    msg_tx: mpsc::Sender<Message>,
    timeout: Duration,
) -> JoinHandle<()>
where
    S: StoreClient + Sync + 'static,
{
    tokio::spawn(async move {
        let what = format!("children of {:?} ({})", request.container, loader);
        let result = settle(
            tokio::time::timeout(timeout, store.fetch_children(request)).await,
            &what,
            timeout,
        );
        let msg = Message::ChildrenFetched {
            browser,
            loader,
            scope,
            result,
        };
        if msg_tx.send(msg).await.is_err() {
            debug!("Engine gone, dropping {}", what);
        }
    })
}

/// Fetch the children of an expanded node.
pub(super) fn spawn_leaves<S>(
    browser: BrowserId,
    loader: LoaderId,
    request: LeavesRequest,
    store: Arc<S>,
    msg_tx: mpsc::Sender<Message>,
    timeout: Duration,
) -> JoinHandle<()>
where
    S: StoreClient + Sync + 'static,
{
    tokio::spawn(async move {
        let what = format!("leaves of {} ({})", request.node, loader);
        let result = settle(
            tokio::time::timeout(timeout, store.fetch_leaves(request)).await,
            &what,
            timeout,
        );
        let msg = Message::LeavesFetched {
            browser,
            loader,
            result,
        };
        if msg_tx.send(msg).await.is_err() {
            debug!("Engine gone, dropping {}", what);
        }
    })
}

/// Flatten a timed fetch into the message payload.
fn settle(
    outcome: Result<canopy_core::Result<Vec<NodeData>>, tokio::time::error::Elapsed>,
    what: &str,
    timeout: Duration,
) -> Result<Vec<NodeData>, String> {
    match outcome {
        Ok(Ok(nodes)) => {
            debug!("Fetched {} node(s) for {}", nodes.len(), what);
            Ok(nodes)
        }
        Ok(Err(e)) => {
            warn!("Fetching {} failed: {}", what, e);
            Err(e.to_string())
        }
        Err(_) => {
            warn!("Fetching {} timed out after {}s", what, timeout.as_secs());
            Err(format!("{what} timed out after {}s", timeout.as_secs()))
        }
    }
}
