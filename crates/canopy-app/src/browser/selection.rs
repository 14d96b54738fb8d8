//! Selection tracking with homogeneity enforcement
//!
//! A multi-selection only ever holds nodes sharing one [`SelectionKey`]
//! (same kind; tags and tag sets also the same namespace). Candidates that
//! would break that are dropped one by one and reported back, so the caller
//! can tell the user the selection was restricted.

use canopy_core::prelude::*;
use canopy_core::{Identity, NodeId, SelectionKey, Tree};

/// What a selection call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub changed: bool,
    /// Dropped because their kind differs from the existing selection
    pub restricted: Vec<NodeId>,
    /// Dropped because they cannot be selected (placeholders, locked nodes)
    pub rejected: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    /// Selected nodes in selection order; the last one is the anchor.
    selected: Vec<NodeId>,
}

impl SelectionTracker {
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn last(&self) -> Option<NodeId> {
        self.selected.last().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn identities(&self, tree: &Tree) -> Vec<Identity> {
        self.selected
            .iter()
            .filter_map(|id| tree.get(*id).and_then(|n| n.identity()))
            .collect()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    /// Forget nodes that no longer exist.
    pub fn retain_live(&mut self, tree: &Tree) -> bool {
        let before = self.selected.len();
        self.selected.retain(|id| tree.contains(*id));
        before != self.selected.len()
    }

    /// Select `candidates`, replacing the selection unless `add` is set.
    ///
    /// Every candidate must resolve, otherwise nothing changes and
    /// `NotFound` is returned.
    pub fn select(
        &mut self,
        tree: &Tree,
        candidates: &[NodeId],
        add: bool,
    ) -> Result<SelectionChange> {
        for id in candidates {
            tree.node(*id)?;
        }

        let before = self.selected.clone();
        if !add {
            self.selected.clear();
        }

        let mut change = SelectionChange::default();
        let mut key = self.key(tree);
        for &id in candidates {
            let node = tree.node(id)?;
            if !node.selectable || node.is_placeholder() {
                change.rejected.push(id);
                continue;
            }
            let candidate_key = node.payload.selection_key();
            match &key {
                Some(existing) if *existing != candidate_key => {
                    change.restricted.push(id);
                    continue;
                }
                Some(_) => {}
                None => key = Some(candidate_key),
            }
            // Re-selecting moves the node to the anchor position.
            self.selected.retain(|s| *s != id);
            self.selected.push(id);
        }

        if !change.restricted.is_empty() {
            debug!(
                "selection restricted to homogeneous type, dropped {} node(s)",
                change.restricted.len()
            );
        }
        change.changed = before != self.selected;
        Ok(change)
    }

    /// Select the siblings of the anchor that share its key or, if the
    /// anchor is expanded, its children instead.
    pub fn select_all_siblings(&mut self, tree: &Tree) -> Result<SelectionChange> {
        let anchor = self
            .last()
            .ok_or_else(|| Error::not_found("selection anchor"))?;
        let node = tree.node(anchor)?;

        if node.expanded && node.children_loaded {
            let children = tree.real_children(anchor);
            if !children.is_empty() {
                return self.select(tree, &children, false);
            }
        }

        let key = node.payload.selection_key();
        let mut siblings: Vec<NodeId> = tree
            .siblings(anchor)
            .into_iter()
            .filter(|id| {
                *id != anchor
                    && tree
                        .get(*id)
                        .is_some_and(|n| n.payload.selection_key() == key)
            })
            .collect();
        // The anchor goes last so it stays the anchor.
        siblings.push(anchor);
        self.select(tree, &siblings, false)
    }

    /// Replace the selection with already-resolved nodes (refresh restore).
    pub fn restore(&mut self, tree: &Tree, nodes: &[NodeId]) -> SelectionChange {
        let live: Vec<NodeId> = nodes.iter().copied().filter(|id| tree.contains(*id)).collect();
        match self.select(tree, &live, false) {
            Ok(change) => change,
            Err(e) => {
                debug!("selection restore failed: {}", e);
                self.selected.clear();
                SelectionChange {
                    changed: true,
                    ..SelectionChange::default()
                }
            }
        }
    }

    fn key(&self, tree: &Tree) -> Option<SelectionKey> {
        self.selected
            .first()
            .and_then(|id| tree.get(*id))
            .map(|n| n.payload.selection_key())
    }
}
