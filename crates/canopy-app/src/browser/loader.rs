//! Loader handles
//!
//! A [`LoaderHandle`] stands for one in-flight fetch. A browser keeps at most
//! one active handle in its [`LoaderSlot`]; issuing a new one supersedes the
//! previous, and a completion is only applied if it carries the active id.

use std::fmt;

use canopy_core::NodeId;
use serde::Serialize;

/// Per-browser, monotonically increasing loader id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoaderId(u64);

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// What a loader fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    /// First load of the browser root
    Root,
    /// Children of one expanded node
    Leaves,
    /// Reload of the refresh scopes, with reconciliation
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderHandle {
    pub id: LoaderId,
    pub kind: LoadKind,
    /// Node the fetch is scoped to, for leaves loads
    pub target: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct LoaderSlot {
    next_id: u64,
    active: Option<LoaderHandle>,
}

impl LoaderSlot {
    /// Issue a new handle. Returns it with the handle it superseded, if any.
    pub fn issue(
        &mut self,
        kind: LoadKind,
        target: Option<NodeId>,
    ) -> (LoaderHandle, Option<LoaderHandle>) {
        self.next_id += 1;
        let handle = LoaderHandle {
            id: LoaderId(self.next_id),
            kind,
            target,
        };
        let superseded = self.active.replace(handle);
        (handle, superseded)
    }

    /// Drop the active handle; its result will be ignored.
    pub fn cancel(&mut self) -> Option<LoaderHandle> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&LoaderHandle> {
        self.active.as_ref()
    }

    pub fn is_active(&self, id: LoaderId) -> bool {
        self.active.is_some_and(|h| h.id == id)
    }

    /// Take the active handle if `id` names it.
    pub fn complete(&mut self, id: LoaderId) -> Option<LoaderHandle> {
        if self.is_active(id) {
            self.active.take()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_supersedes_previous() {
        let mut slot = LoaderSlot::default();
        let (first, none) = slot.issue(LoadKind::Root, None);
        assert!(none.is_none());
        let (second, superseded) = slot.issue(LoadKind::Refresh, None);
        assert_eq!(superseded, Some(first));
        assert!(second.id > first.id);
        assert!(!slot.is_active(first.id));
        assert!(slot.is_active(second.id));
    }

    #[test]
    fn test_complete_only_accepts_active_id() {
        let mut slot = LoaderSlot::default();
        let (first, _) = slot.issue(LoadKind::Root, None);
        let (second, _) = slot.issue(LoadKind::Root, None);
        assert!(slot.complete(first.id).is_none());
        assert_eq!(slot.complete(second.id), Some(second));
        assert!(slot.active().is_none());
    }

    #[test]
    fn test_ids_keep_increasing_after_cancel() {
        let mut slot = LoaderSlot::default();
        let (first, _) = slot.issue(LoadKind::Leaves, None);
        slot.cancel();
        let (second, _) = slot.issue(LoadKind::Leaves, None);
        assert_ne!(first.id, second.id);
    }
}
