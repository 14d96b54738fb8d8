//! In-memory store backed by a JSON fixture file.
//!
//! Used by the headless runner and by tests. The fixture lists the top-level
//! nodes of each browser with their full subtrees; requests are answered by
//! cutting that data at the depth the request asks for.
//!
//! ```json
//! {
//!   "roots": {
//!     "projects": [
//!       { "payload": {"kind": "project", "id": 1, "name": "Alpha"},
//!         "children": [ { "payload": {"kind": "dataset", "id": 10, "name": "Control"} } ] }
//!     ]
//!   },
//!   "buckets": { "5": [ { "payload": {"kind": "image", "id": 500, "name": "stray.tif"} } ] },
//!   "latency_ms": 20,
//!   "failing": [ {"kind": "dataset", "id": 11} ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use canopy_core::prelude::*;
use canopy_core::{BrowserKind, ContainerKey, Identity, NodeData, NodeKind, Payload};
use serde::{Deserialize, Serialize};

use crate::client::{ChildrenRequest, LeavesRequest, StoreClient};

/// One node of a fixture, with its complete subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureNode {
    pub payload: Payload,

    #[serde(default)]
    pub children: Vec<FixtureNode>,

    /// Item count reported by the store. Defaults to the number of children.
    #[serde(default)]
    pub count: Option<i64>,

    /// Experimenter id owning this node. Only consulted for bucket contents.
    #[serde(default)]
    pub owner: Option<i64>,

    #[serde(default = "default_selectable")]
    pub selectable: bool,
}

fn default_selectable() -> bool {
    true
}

impl FixtureNode {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            children: Vec::new(),
            count: None,
            owner: None,
            selectable: true,
        }
    }

    pub fn with_children(payload: Payload, children: Vec<FixtureNode>) -> Self {
        Self {
            children,
            ..Self::new(payload)
        }
    }

    pub fn owned_by(mut self, experimenter: i64) -> Self {
        self.owner = Some(experimenter);
        self
    }

    fn item_count(&self) -> i64 {
        self.count.unwrap_or(self.children.len() as i64)
    }

    /// Convert to [`NodeData`], nesting children only where asked.
    fn to_node_data(&self, expanded: &[Identity], include_members: bool) -> NodeData {
        let identity = self.payload.identity();
        let nest = identity.is_some_and(|i| expanded.contains(&i))
            || (include_members && self.payload.kind() == NodeKind::Group);
        let children = nest.then(|| {
            self.children
                .iter()
                .map(|c| c.to_node_data(expanded, include_members))
                .collect()
        });
        NodeData {
            payload: self.payload.clone(),
            number_items: self.count.unwrap_or(canopy_core::UNKNOWN_COUNT),
            selectable: self.selectable,
            children,
        }
    }

    fn find(&self, identity: &Identity) -> Option<&FixtureNode> {
        if self.payload.identity().as_ref() == Some(identity) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(identity))
    }
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub roots: HashMap<BrowserKind, Vec<FixtureNode>>,

    /// Contents of each time bucket, keyed by period index.
    #[serde(default)]
    pub buckets: HashMap<u32, Vec<FixtureNode>>,

    /// Contents of each file bucket, keyed by bucket index.
    #[serde(default)]
    pub file_buckets: HashMap<u32, Vec<FixtureNode>>,

    /// Artificial delay applied to every call.
    #[serde(default)]
    pub latency_ms: u64,

    /// Identities whose fetches fail. `root:0` fails root loads.
    #[serde(default)]
    pub failing: Vec<Identity>,
}

/// [`StoreClient`] serving a [`Fixture`].
#[derive(Debug, Clone)]
pub struct FixtureStore {
    fixture: Fixture,
}

impl FixtureStore {
    pub fn from_fixture(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let fixture: Fixture =
            serde_json::from_str(json).map_err(|e| Error::fixture(e.to_string()))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Load a fixture file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json(&content)?;
        info!(
            "Loaded fixture {} ({} browsers)",
            path.display(),
            store.fixture.roots.len()
        );
        Ok(store)
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    async fn delay(&self) {
        if self.fixture.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fixture.latency_ms)).await;
        }
    }

    fn check_failing(&self, identity: &Identity) -> Result<()> {
        if self.fixture.failing.contains(identity) {
            return Err(Error::fetch_failed(format!("fixture marks {identity} as failing")));
        }
        Ok(())
    }

    fn roots(&self, browser: BrowserKind) -> &[FixtureNode] {
        self.fixture
            .roots
            .get(&browser)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn find_in(&self, browser: BrowserKind, identity: &Identity) -> Option<&FixtureNode> {
        self.roots(browser).iter().find_map(|n| n.find(identity))
    }

    fn find_anywhere(&self, identity: &Identity) -> Option<&FixtureNode> {
        self.fixture
            .roots
            .values()
            .flatten()
            .find_map(|n| n.find(identity))
    }

    fn bucket_contents(
        buckets: &HashMap<u32, Vec<FixtureNode>>,
        index: i64,
        owner: Option<Identity>,
    ) -> Vec<NodeData> {
        let owner_id = owner
            .filter(|o| o.kind == NodeKind::Experimenter)
            .map(|o| o.id);
        u32::try_from(index)
            .ok()
            .and_then(|i| buckets.get(&i))
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|n| match (n.owner, owner_id) {
                        (Some(node_owner), Some(wanted)) => node_owner == wanted,
                        _ => true,
                    })
                    .map(|n| n.to_node_data(&[], false))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl StoreClient for FixtureStore {
    async fn fetch_children(&self, request: ChildrenRequest) -> Result<Vec<NodeData>> {
        self.delay().await;
        let convert = |nodes: &[FixtureNode]| {
            nodes
                .iter()
                .map(|n| n.to_node_data(&request.expanded, request.include_members))
                .collect::<Vec<_>>()
        };
        match request.container {
            None => {
                self.check_failing(&Identity::new(NodeKind::Root, 0))?;
                Ok(convert(self.roots(request.browser)))
            }
            Some(container) => {
                self.check_failing(&container)?;
                let node = self
                    .find_in(request.browser, &container)
                    .ok_or_else(|| Error::not_found(format!("{container} in fixture")))?;
                Ok(convert(&node.children))
            }
        }
    }

    async fn fetch_leaves(&self, request: LeavesRequest) -> Result<Vec<NodeData>> {
        self.delay().await;
        self.check_failing(&request.node)?;
        match request.node.kind {
            NodeKind::TimeBucket => Ok(Self::bucket_contents(
                &self.fixture.buckets,
                request.node.id,
                request.owner,
            )),
            NodeKind::FileBucket => Ok(Self::bucket_contents(
                &self.fixture.file_buckets,
                request.node.id,
                request.owner,
            )),
            _ => {
                let node = self
                    .find_in(request.browser, &request.node)
                    .ok_or_else(|| Error::not_found(format!("{} in fixture", request.node)))?;
                Ok(node
                    .children
                    .iter()
                    .map(|c| c.to_node_data(&[], false))
                    .collect())
            }
        }
    }

    async fn fetch_container_count(&self, key: ContainerKey) -> Result<i64> {
        self.delay().await;
        match key {
            ContainerKey::Object(identity) => {
                self.check_failing(&identity)?;
                self.find_anywhere(&identity)
                    .map(FixtureNode::item_count)
                    .ok_or_else(|| Error::not_found(format!("{identity} in fixture")))
            }
            ContainerKey::Index { kind, index, owner } => {
                let buckets = match kind {
                    NodeKind::FileBucket => &self.fixture.file_buckets,
                    _ => &self.fixture.buckets,
                };
                Ok(Self::bucket_contents(buckets, i64::from(index), owner).len() as i64)
            }
        }
    }
}
