//! Ordering policy for fetched children.
//!
//! Children are first partitioned by [`Tier`] (container-like, leaf-like,
//! then screens/plates/buckets), each partition is sorted with the injected
//! [`NodeComparator`], and the partitions are concatenated in tier order.
//! The tier boundary is never crossed, whatever the sort direction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::payload::{Payload, Tier};
use crate::tree::NodeData;

/// Comparison collaborator supplied by the presentation layer.
#[cfg_attr(test, mockall::automock)]
pub trait NodeComparator: Send + Sync {
    /// Order two payloads of the same tier, by name or by date.
    fn compare(&self, a: &Payload, b: &Payload, by_date: bool) -> Ordering;
}

/// Direction and key used within each tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    pub by_date: bool,
    pub descending: bool,
}

/// Partition `items` by tier, sort each partition, concatenate.
///
/// Placeholders have no tier and are dropped; they never belong in a list of
/// fetched children. The sort is stable, so equal items keep their input
/// order and the result is deterministic.
pub fn order_children<T, F>(
    items: Vec<T>,
    payload_of: F,
    comparator: &dyn NodeComparator,
    options: SortOptions,
) -> Vec<T>
where
    F: Fn(&T) -> &Payload,
{
    let mut containers = Vec::new();
    let mut leaves = Vec::new();
    let mut trailing = Vec::new();

    for item in items {
        match payload_of(&item).tier() {
            Some(Tier::Container) => containers.push(item),
            Some(Tier::Leaf) => leaves.push(item),
            Some(Tier::Trailing) => trailing.push(item),
            None => tracing::debug!("order_children: dropping placeholder"),
        }
    }

    for bucket in [&mut containers, &mut leaves, &mut trailing] {
        bucket.sort_by(|a, b| {
            let ord = comparator.compare(payload_of(a), payload_of(b), options.by_date);
            if options.descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    containers.extend(leaves);
    containers.extend(trailing);
    containers
}

/// Apply [`order_children`] to fetched data at every loaded level.
pub fn order_node_data(
    items: Vec<NodeData>,
    comparator: &dyn NodeComparator,
    options: SortOptions,
) -> Vec<NodeData> {
    order_children(items, |d| &d.payload, comparator, options)
        .into_iter()
        .map(|mut data| {
            data.children = data
                .children
                .map(|children| order_node_data(children, comparator, options));
            data
        })
        .collect()
}
