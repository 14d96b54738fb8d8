//! Store work requested by a browser
//!
//! Browser operations never touch the store themselves. They return
//! [`StoreCommand`]s which the action layer turns into background tasks.

use std::fmt;
use std::str::FromStr;

use canopy_core::{ContainerKey, Error, Identity, NodeId};
use canopy_store::{ChildrenRequest, LeavesRequest};

use super::counter::CounterId;
use super::loader::LoaderId;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Load the children of one refresh scope (the root on first load)
    FetchChildren {
        loader: LoaderId,
        scope: NodeId,
        request: ChildrenRequest,
    },

    /// Load the children of an expanded node
    FetchLeaves {
        loader: LoaderId,
        request: LeavesRequest,
    },

    /// Fetch one count per key, reporting each as it arrives
    FetchCounts {
        counter: CounterId,
        keys: Vec<ContainerKey>,
    },

    /// Abort every fetch issued under this loader
    CancelLoad { loader: LoaderId },

    /// Abort a count batch
    CancelCount { counter: CounterId },
}

/// Result of feeding a fetch completion to a browser.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Merged; may request follow-up work
    Applied(Vec<StoreCommand>),
    /// Result of a superseded or cancelled fetch, ignored
    Stale,
}

impl Completion {
    pub fn is_stale(&self) -> bool {
        matches!(self, Completion::Stale)
    }

    pub fn into_commands(self) -> Vec<StoreCommand> {
        match self {
            Completion::Applied(commands) => commands,
            Completion::Stale => Vec::new(),
        }
    }
}

/// How a caller names a node: by handle, or by identity when it only knows
/// the domain object (the first visible mirror is used).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Id(NodeId),
    Identity(Identity),
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

impl From<Identity> for NodeRef {
    fn from(identity: Identity) -> Self {
        NodeRef::Identity(identity)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "{id}"),
            NodeRef::Identity(identity) => write!(f, "{identity}"),
        }
    }
}

impl FromStr for NodeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Identity>().map(NodeRef::Identity)
    }
}
