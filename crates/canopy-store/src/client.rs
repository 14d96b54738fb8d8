//! Store client contract.
//!
//! The browser never talks to the repository directly: every fetch goes
//! through a [`StoreClient`], injected at engine construction. Calls are
//! async, deliver exactly one completion each, and may be abandoned (the
//! caller aborts the task and ignores any late result).

use canopy_core::prelude::*;
use canopy_core::{BrowserKind, ContainerKey, Identity, NodeData};
use serde::{Deserialize, Serialize};

/// Request for the top-level children of a browser, or of one container
/// during a refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildrenRequest {
    pub browser: BrowserKind,

    /// Container whose children are reloaded. `None` loads the browser root.
    pub container: Option<Identity>,

    /// Nodes the caller wants returned with their own children nested, so
    /// expansion can be restored in one round trip.
    #[serde(default)]
    pub expanded: Vec<Identity>,

    /// Return groups with their experimenters already nested (admin browser).
    #[serde(default)]
    pub include_members: bool,
}

impl ChildrenRequest {
    pub fn root(browser: BrowserKind) -> Self {
        Self {
            browser,
            container: None,
            expanded: Vec::new(),
            include_members: browser == BrowserKind::Admin,
        }
    }
}

/// Request for the children of one expanded node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeavesRequest {
    pub browser: BrowserKind,
    pub node: Identity,

    /// Experimenter or group the node belongs to, if any. Scopes bucket
    /// contents to one user.
    #[serde(default)]
    pub owner: Option<Identity>,
}

/// Asynchronous access to the remote repository.
///
/// Implement [`StoreClient`]; the local variant is derived for callers that
/// do not need `Send` futures.
#[trait_variant::make(StoreClient: Send)]
pub trait LocalStoreClient {
    /// Top-level nodes of a browser, or the children of a container.
    async fn fetch_children(&self, request: ChildrenRequest) -> Result<Vec<NodeData>>;

    /// Children of one node, fetched when it is expanded.
    async fn fetch_leaves(&self, request: LeavesRequest) -> Result<Vec<NodeData>>;

    /// Number of items held by one container.
    async fn fetch_container_count(&self, key: ContainerKey) -> Result<i64>;
}
