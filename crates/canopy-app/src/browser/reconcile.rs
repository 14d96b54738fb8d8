//! Refresh reconciliation
//!
//! Before a scope is reloaded its expansion and selection are captured by
//! identity in a [`Snapshot`]. Once fresh data arrives, [`apply`] rebuilds
//! the scope's children, re-expands the captured nodes top-down and reports
//! which nodes the selection and the count batch should be re-pointed at.

use std::collections::{BTreeMap, HashSet};

use canopy_core::prelude::*;
use canopy_core::{order_node_data, Identity, NodeComparator, NodeData, NodeId, SortOptions, Tree};

/// Expansion and selection of one scope, by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Every expanded node below the scope
    pub expanded: Vec<Identity>,
    /// Expanded nodes grouped by the top-level child they live under
    pub expanded_by_top: BTreeMap<Identity, Vec<Identity>>,
    /// Selected nodes, anchor last
    pub selected: Vec<Identity>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty() && self.selected.is_empty()
    }
}

/// Capture the expansion below `scope` and the given selection.
pub fn snapshot(tree: &Tree, scope: NodeId, selected: Vec<Identity>) -> Snapshot {
    let mut snap = Snapshot {
        selected,
        ..Snapshot::default()
    };
    for top in tree.real_children(scope) {
        let Some(top_identity) = tree.get(top).and_then(|n| n.identity()) else {
            continue;
        };
        let expanded: Vec<Identity> = tree
            .breadth_first(top)
            .into_iter()
            .filter_map(|id| tree.get(id))
            .filter(|n| n.expanded && n.children_loaded)
            .filter_map(|n| n.identity())
            .collect();
        if !expanded.is_empty() {
            snap.expanded.extend(expanded.iter().copied());
            snap.expanded_by_top.insert(top_identity, expanded);
        }
    }
    snap
}

/// What [`apply`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// New top-level children of the scope
    pub inserted: Vec<NodeId>,
    /// Nodes re-expanded from the snapshot
    pub expanded: Vec<NodeId>,
    /// Nodes matching the snapshot's selection, anchor last
    pub selection: Vec<NodeId>,
}

/// Rebuild the children of `scope` from `fresh` and restore the snapshot.
///
/// A node captured as expanded whose fresh data arrives unloaded stays
/// collapsed. Selection is matched tree-wide; identities that no longer
/// exist are dropped.
pub fn apply(
    tree: &mut Tree,
    scope: NodeId,
    fresh: Vec<NodeData>,
    snapshot: &Snapshot,
    comparator: &dyn NodeComparator,
    options: SortOptions,
) -> Result<Reconciled> {
    let ordered = order_node_data(fresh, comparator, options);
    let inserted = tree.replace_children(scope, ordered)?;

    let mut expanded = Vec::new();
    for top in &inserted {
        let Some(top_identity) = tree.get(*top).and_then(|n| n.identity()) else {
            continue;
        };
        let Some(wanted) = snapshot.expanded_by_top.get(&top_identity) else {
            continue;
        };
        let wanted: HashSet<&Identity> = wanted.iter().collect();
        // Breadth-first, so a parent is re-expanded before its children.
        for id in tree.breadth_first(*top) {
            let Some(node) = tree.get_mut(id) else {
                continue;
            };
            let Some(identity) = node.identity() else {
                continue;
            };
            if wanted.contains(&identity) && node.children_loaded {
                node.expanded = true;
                expanded.push(id);
            }
        }
    }

    let root = tree.root();
    let selection = snapshot
        .selected
        .iter()
        .filter_map(|identity| tree.find_by_identity(identity, root).into_iter().next())
        .collect();

    trace!(
        "reconciled {}: {} children, {} re-expanded",
        scope,
        inserted.len(),
        expanded.len()
    );
    Ok(Reconciled {
        inserted,
        expanded,
        selection,
    })
}

/// Container nodes visible under `scope` (inclusive) that carry a count key.
pub fn count_targets(tree: &Tree, scope: NodeId) -> Vec<NodeId> {
    tree.visible_nodes(scope)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| {
            tree.get(*id)
                .is_some_and(|n| n.payload.count_key().is_some())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorting::DefaultComparator;
    use canopy_core::{NodeKind, Payload};

    fn project(id: i64) -> Payload {
        Payload::Project {
            id,
            name: format!("project-{id}"),
        }
    }

    fn dataset(id: i64) -> Payload {
        Payload::Dataset {
            id,
            name: format!("dataset-{id}"),
        }
    }

    fn image(id: i64) -> NodeData {
        NodeData::new(Payload::Image {
            id,
            name: format!("image-{id}"),
            acquired: None,
        })
    }

    /// Store answer with project 1 / dataset 10 nested and loaded.
    fn fresh() -> Vec<NodeData> {
        vec![
            NodeData::with_children(
                project(1),
                vec![NodeData::with_children(dataset(10), vec![image(100), image(101)])],
            ),
            NodeData::new(project(2)),
        ]
    }

    fn find(tree: &Tree, kind: NodeKind, id: i64) -> NodeId {
        tree.find_by_identity(&Identity::new(kind, id), tree.root())[0]
    }

    fn expanded_tree() -> Tree {
        let mut tree = Tree::new(Payload::Root {
            label: "projects".into(),
        });
        tree.replace_children(tree.root(), fresh()).unwrap();
        for (kind, id) in [(NodeKind::Project, 1), (NodeKind::Dataset, 10)] {
            let node = find(&tree, kind, id);
            tree.node_mut(node).unwrap().expanded = true;
        }
        tree
    }

    #[test]
    fn test_snapshot_groups_expansion_by_top_node() {
        let tree = expanded_tree();
        let snap = snapshot(&tree, tree.root(), vec![]);
        let p1 = Identity::new(NodeKind::Project, 1);
        assert_eq!(snap.expanded.len(), 2);
        assert_eq!(snap.expanded_by_top[&p1].len(), 2);
        assert!(!snap.expanded_by_top.contains_key(&Identity::new(NodeKind::Project, 2)));
    }

    #[test]
    fn test_apply_restores_expansion_and_selection() {
        let mut tree = expanded_tree();
        let image = Identity::new(NodeKind::Image, 101);
        let snap = snapshot(&tree, tree.root(), vec![image]);

        let root = tree.root();
        let result = apply(
            &mut tree,
            root,
            fresh(),
            &snap,
            &DefaultComparator,
            SortOptions::default(),
        )
        .unwrap();

        assert_eq!(result.inserted.len(), 2);
        assert_eq!(result.expanded.len(), 2);
        assert_eq!(result.selection.len(), 1);
        assert_eq!(tree.node(result.selection[0]).unwrap().identity(), Some(image));
        assert!(tree.placeholder_invariant_holds());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut tree = expanded_tree();
        let snap = snapshot(&tree, tree.root(), vec![Identity::new(NodeKind::Dataset, 10)]);
        let shape = |tree: &Tree| {
            tree.visible_nodes(tree.root())
                .into_iter()
                .map(|(id, depth)| (tree.node(id).unwrap().identity(), depth))
                .collect::<Vec<_>>()
        };

        let root = tree.root();
        apply(&mut tree, root, fresh(), &snap, &DefaultComparator, SortOptions::default())
            .unwrap();
        let first = shape(&tree);
        let again = snapshot(&tree, tree.root(), snap.selected.clone());
        apply(&mut tree, root, fresh(), &again, &DefaultComparator, SortOptions::default())
            .unwrap();

        assert_eq!(again, snap);
        assert_eq!(shape(&tree), first);
    }

    #[test]
    fn test_unloaded_fresh_node_stays_collapsed() {
        let mut tree = expanded_tree();
        let snap = snapshot(&tree, tree.root(), vec![]);
        // Store returns project 1 without nested children this time.
        let fresh = vec![NodeData::new(project(1)), NodeData::new(project(2))];

        let root = tree.root();
        let result = apply(&mut tree, root, fresh, &snap, &DefaultComparator, SortOptions::default())
            .unwrap();
        assert!(result.expanded.is_empty());
        let p1 = find(&tree, NodeKind::Project, 1);
        assert!(!tree.node(p1).unwrap().expanded);
    }

    #[test]
    fn test_missing_selection_falls_back_to_none() {
        let mut tree = expanded_tree();
        let snap = snapshot(&tree, tree.root(), vec![Identity::new(NodeKind::Image, 999)]);
        let root = tree.root();
        let result = apply(&mut tree, root, fresh(), &snap, &DefaultComparator, SortOptions::default())
            .unwrap();
        assert!(result.selection.is_empty());
    }

    #[test]
    fn test_count_targets_only_visible_containers() {
        let mut tree = expanded_tree();
        tree.node_mut(tree.root()).unwrap().expanded = true;
        let targets = count_targets(&tree, tree.root());
        // projects 1 and 2, dataset 10; images and the root carry no key
        assert_eq!(targets.len(), 3);
    }
}
