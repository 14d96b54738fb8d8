//! Container item-count aggregation
//!
//! One count batch fans out a fetch per [`ContainerKey`]. The same logical
//! container can appear several times in a tree (a dataset shown under two
//! groups), so each key maps to every node mirroring it and a result is
//! applied to all of them at once.
//!
//! Only a value marks a key processed. A key whose fetch failed stays open,
//! so the batch never reports done on partial data; the browser ends it
//! through its count deadline or a cancel.

use std::collections::{HashMap, HashSet};
use std::fmt;

use canopy_core::{ContainerKey, Identity, NodeId, NodeKind, Tree};
use serde::Serialize;

/// Per-browser count batch id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CounterId(pub(crate) u64);

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Outcome of one [`ContainerCounter::report_result`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountReport {
    /// Value written to these (still live) nodes
    Applied(Vec<NodeId>),
    /// Key was already processed; nothing changed
    Duplicate,
    /// Key is not part of this batch
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ContainerCounter {
    id: CounterId,
    targets: HashMap<ContainerKey, Vec<NodeId>>,
    processed: HashSet<ContainerKey>,
}

impl ContainerCounter {
    pub fn new(id: CounterId, targets: HashMap<ContainerKey, Vec<NodeId>>) -> Self {
        Self {
            id,
            targets,
            processed: HashSet::new(),
        }
    }

    /// Batch over the positional buckets of one owner, keyed by symbolic
    /// index.
    pub fn for_indices(
        id: CounterId,
        kind: NodeKind,
        owner: Option<Identity>,
        indices: Vec<(u32, Vec<NodeId>)>,
    ) -> Self {
        let targets = indices
            .into_iter()
            .map(|(index, nodes)| (ContainerKey::Index { kind, index, owner }, nodes))
            .collect();
        Self::new(id, targets)
    }

    pub fn id(&self) -> CounterId {
        self.id
    }

    /// Number of registered keys.
    pub fn total(&self) -> usize {
        self.targets.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn keys(&self) -> Vec<ContainerKey> {
        self.targets.keys().copied().collect()
    }

    /// Whether `key` is registered in this batch.
    pub fn contains(&self, key: &ContainerKey) -> bool {
        self.targets.contains_key(key)
    }

    pub fn is_processed(&self, key: &ContainerKey) -> bool {
        self.processed.contains(key)
    }

    pub fn is_done(&self) -> bool {
        self.processed.len() == self.targets.len()
    }

    /// Write `value` to every node registered under `key` and mark it
    /// processed. Nodes freed since registration are skipped.
    pub fn report_result(&mut self, tree: &mut Tree, key: ContainerKey, value: i64) -> CountReport {
        let Some(nodes) = self.targets.get(&key) else {
            return CountReport::Unknown;
        };
        if !self.processed.insert(key) {
            return CountReport::Duplicate;
        }
        let applied = nodes
            .iter()
            .copied()
            .filter(|id| match tree.get_mut(*id) {
                Some(node) => {
                    node.number_items = value;
                    true
                }
                None => false,
            })
            .collect();
        CountReport::Applied(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{Identity, NodeData, NodeKind, Payload};

    fn mirrored_tree() -> (Tree, Vec<NodeId>) {
        let mut tree = Tree::new(Payload::Root {
            label: "admin".into(),
        });
        let shared = || {
            NodeData::new(Payload::Dataset {
                id: 42,
                name: "shared".into(),
            })
        };
        tree.replace_children(
            tree.root(),
            vec![
                NodeData::with_children(
                    Payload::Group {
                        id: 1,
                        name: "a".into(),
                    },
                    vec![shared()],
                ),
                NodeData::with_children(
                    Payload::Group {
                        id: 2,
                        name: "b".into(),
                    },
                    vec![shared()],
                ),
            ],
        )
        .unwrap();
        let mirrors = tree.find_by_identity(&Identity::new(NodeKind::Dataset, 42), tree.root());
        (tree, mirrors)
    }

    fn key42() -> ContainerKey {
        ContainerKey::Object(Identity::new(NodeKind::Dataset, 42))
    }

    #[test]
    fn test_result_applies_to_every_mirror() {
        let (mut tree, mirrors) = mirrored_tree();
        assert_eq!(mirrors.len(), 2);
        let mut counter = ContainerCounter::new(CounterId(1), HashMap::from([(key42(), mirrors.clone())]));

        let report = counter.report_result(&mut tree, key42(), 7);
        assert_eq!(report, CountReport::Applied(mirrors.clone()));
        for id in mirrors {
            assert_eq!(tree.node(id).unwrap().number_items, 7);
        }
        assert!(counter.is_done());
    }

    #[test]
    fn test_duplicate_report_is_noop() {
        let (mut tree, mirrors) = mirrored_tree();
        let mut counter = ContainerCounter::new(CounterId(1), HashMap::from([(key42(), mirrors.clone())]));
        counter.report_result(&mut tree, key42(), 7);
        assert_eq!(counter.report_result(&mut tree, key42(), 9), CountReport::Duplicate);
        assert_eq!(tree.node(mirrors[0]).unwrap().number_items, 7);
        assert_eq!(counter.processed_count(), 1);
    }

    #[test]
    fn test_unknown_key_does_not_count_toward_done() {
        let (mut tree, mirrors) = mirrored_tree();
        let mut counter = ContainerCounter::new(CounterId(1), HashMap::from([(key42(), mirrors)]));
        let other = ContainerKey::Object(Identity::new(NodeKind::Dataset, 1));
        assert_eq!(counter.report_result(&mut tree, other, 3), CountReport::Unknown);
        assert!(!counter.is_done());
    }

    fn bucket(index: u32, owner: i64) -> ContainerKey {
        ContainerKey::Index {
            kind: NodeKind::TimeBucket,
            index,
            owner: Some(Identity::new(NodeKind::Experimenter, owner)),
        }
    }

    #[test]
    fn test_index_batch_done_only_when_every_index_reports() {
        let (mut tree, mirrors) = mirrored_tree();
        let owner = Some(Identity::new(NodeKind::Experimenter, 5));
        let mut counter = ContainerCounter::for_indices(
            CounterId(2),
            NodeKind::TimeBucket,
            owner,
            vec![(0, vec![]), (5, vec![])],
        );
        assert_eq!(counter.total(), 2);
        assert!(counter.contains(&bucket(0, 5)));
        assert!(!counter.contains(&bucket(0, 6)));

        counter.report_result(&mut tree, bucket(5, 5), 1);
        assert!(counter.is_processed(&bucket(5, 5)));
        assert!(!counter.is_done());
        // Same index, other owner: a different container.
        assert_eq!(counter.report_result(&mut tree, bucket(0, 6), 1), CountReport::Unknown);
        assert!(!counter.is_done());

        counter.report_result(&mut tree, bucket(0, 5), 0);
        assert!(counter.is_done());
        assert_eq!(tree.node(mirrors[0]).unwrap().number_items, -1);
    }

    #[test]
    fn test_freed_nodes_are_skipped() {
        let (mut tree, mirrors) = mirrored_tree();
        let mut counter = ContainerCounter::new(CounterId(1), HashMap::from([(key42(), mirrors.clone())]));
        let group = tree.parent(mirrors[0]).unwrap();
        tree.remove_child(group, mirrors[0]).unwrap();

        let report = counter.report_result(&mut tree, key42(), 7);
        assert_eq!(report, CountReport::Applied(vec![mirrors[1]]));
    }
}
