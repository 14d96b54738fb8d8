//! # Browser Tree
//!
//! The in-memory node graph behind one browser. Nodes live in an arena and
//! are addressed by generational [`NodeId`] handles: children are owned by
//! their parent's child list, the parent link is a plain index, so upward
//! walks are O(1) and there are no ownership cycles.
//!
//! ## Placeholder invariant
//!
//! A node whose children have not been materialized (`children_loaded ==
//! false`) has exactly one placeholder child ("Loading…" or "Empty") and no
//! real children. A loaded node has only real children, possibly none. Every
//! structural operation here preserves that.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::payload::{Identity, NodeKind, Payload, PlaceholderKind};

/// Item count of a node that has not been counted or cannot be.
pub const UNKNOWN_COUNT: i64 = -1;

fn unknown_count() -> i64 {
    UNKNOWN_COUNT
}

fn default_true() -> bool {
    true
}

// ============================================================================
// NodeId
// ============================================================================

/// Stable handle to a node. A handle to a freed node never resolves, even
/// after its slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

// ============================================================================
// NodeData
// ============================================================================

/// Fetched data for one node, as delivered by the store.
///
/// `children: None` means the children were not fetched, so the node is
/// materialized with a placeholder. `Some(vec)` means loaded, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub payload: Payload,

    #[serde(default = "unknown_count")]
    pub number_items: i64,

    #[serde(default = "default_true")]
    pub selectable: bool,

    #[serde(default)]
    pub children: Option<Vec<NodeData>>,
}

impl NodeData {
    /// Unloaded node with an unknown item count.
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            number_items: UNKNOWN_COUNT,
            selectable: true,
            children: None,
        }
    }

    /// Node whose children are already known.
    pub fn with_children(payload: Payload, children: Vec<NodeData>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(payload)
        }
    }

    pub fn with_count(mut self, number_items: i64) -> Self {
        self.number_items = number_items;
        self
    }
}

// ============================================================================
// TreeNode
// ============================================================================

/// A node of the browser tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub payload: Payload,
    pub expanded: bool,
    pub children_loaded: bool,
    pub selectable: bool,
    /// Item count, [`UNKNOWN_COUNT`] when unknown or not applicable.
    pub number_items: i64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    fn new(payload: Payload, parent: Option<NodeId>) -> Self {
        let selectable = !payload.is_placeholder();
        Self {
            payload,
            expanded: false,
            children_loaded: false,
            selectable,
            number_items: UNKNOWN_COUNT,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles, placeholder included.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn identity(&self) -> Option<Identity> {
        self.payload.identity()
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn name(&self) -> &str {
        self.payload.name()
    }

    pub fn is_placeholder(&self) -> bool {
        self.payload.is_placeholder()
    }
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<TreeNode>,
}

/// Arena-backed tree owned by exactly one browser.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    len: usize,
}

impl Tree {
    /// Create a tree whose root is unloaded (it shows a "Loading…" marker).
    pub fn new(root: Payload) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            len: 0,
        };
        tree.root = tree.alloc(TreeNode::new(root, None));
        tree.push_placeholder(tree.root, PlaceholderKind::Loading);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root and placeholders included. Never zero.
    pub fn node_count(&self) -> usize {
        self.len
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Like [`Tree::get`], failing with `NotFound` for a stale handle.
    pub fn node(&self, id: NodeId) -> Result<&TreeNode> {
        self.get(id)
            .ok_or_else(|| Error::not_found(format!("node {id}")))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut TreeNode> {
        self.get_mut(id)
            .ok_or_else(|| Error::not_found(format!("node {id}")))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children that are not placeholders.
    pub fn real_children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| self.get(*c).is_some_and(|c| !c.is_placeholder()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Other real children of this node's parent, in order. The node itself
    /// is included so callers keep positional context.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self.real_children(parent),
            None => vec![id],
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Structural operations
    // ─────────────────────────────────────────────────────────────

    /// Append a node (and its fetched subtree) under `parent`.
    ///
    /// Adding a real child to an unloaded parent drops the placeholder and
    /// marks the parent loaded.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> Result<NodeId> {
        if !self.node(parent)?.children_loaded {
            self.clear_children(parent);
            self.node_mut(parent)?.children_loaded = true;
        }
        let child = self.build(parent, data);
        self.node_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// Detach and free `child` and its subtree.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let node = self.node(child)?;
        if node.parent != Some(parent) {
            return Err(Error::not_found(format!("{child} under {parent}")));
        }
        if node.is_placeholder() {
            return Err(Error::invalid_state(
                "remove_child",
                "target is the placeholder of an unloaded node",
            ));
        }
        self.node_mut(parent)?.children.retain(|c| *c != child);
        self.free_subtree(child);
        Ok(())
    }

    /// Replace every child of `parent` with freshly built nodes, in the
    /// given order. The parent ends up loaded.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeData>,
    ) -> Result<Vec<NodeId>> {
        self.node(parent)?;
        self.clear_children(parent);
        let ids: Vec<NodeId> = children
            .into_iter()
            .map(|data| self.build(parent, data))
            .collect();
        let node = self.node_mut(parent)?;
        node.children = ids.clone();
        node.children_loaded = true;
        Ok(ids)
    }

    /// Collapse-and-reset: free the children, mark the node unloaded and put
    /// a placeholder back.
    pub fn reset_children(&mut self, id: NodeId) -> Result<()> {
        let number_items = self.node(id)?.number_items;
        self.clear_children(id);
        let node = self.node_mut(id)?;
        node.children_loaded = false;
        node.expanded = false;
        let marker = if number_items == 0 {
            PlaceholderKind::Empty
        } else {
            PlaceholderKind::Loading
        };
        self.push_placeholder(id, marker);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// Pre-order walk of `scope` and everything below it, placeholders
    /// excluded.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if node.is_placeholder() {
                continue;
            }
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Every node under `scope` (inclusive) whose identity matches.
    pub fn find_by_identity(&self, identity: &Identity, scope: NodeId) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.get(*id).and_then(|n| n.identity()).as_ref() == Some(identity))
            .collect()
    }

    /// Walk up from `id` (inclusive) to the closest experimenter or group.
    pub fn owner_of(&self, id: NodeId) -> Result<NodeId> {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = self.node(cur)?;
            if matches!(node.kind(), NodeKind::Experimenter | NodeKind::Group) {
                return Ok(cur);
            }
            current = node.parent;
        }
        Err(Error::not_found(format!("owner of {id}")))
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(cur) = current {
            out.push(cur);
            current = self.parent(cur);
        }
        out
    }

    /// Whether `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// Flat list of visible `(node, depth)` pairs below `scope` through
    /// expanded nodes. `scope` itself is depth 0.
    pub fn visible_nodes(&self, scope: NodeId) -> Vec<(NodeId, usize)> {
        let mut out = Vec::new();
        let mut stack = vec![(scope, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push((id, depth));
            if node.expanded {
                stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        out
    }

    /// Breadth-first list of nodes under `scope` (inclusive), so every
    /// parent precedes its children.
    pub fn breadth_first(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([scope]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.get(id) else { continue };
            if node.is_placeholder() {
                continue;
            }
            out.push(id);
            queue.extend(node.children.iter().copied());
        }
        out
    }

    /// Check the placeholder invariant on every live node.
    pub fn placeholder_invariant_holds(&self) -> bool {
        self.descendants(self.root).into_iter().all(|id| {
            let Some(node) = self.get(id) else {
                return false;
            };
            let placeholders = node
                .children
                .iter()
                .filter(|c| self.get(**c).is_some_and(|c| c.is_placeholder()))
                .count();
            if node.children_loaded {
                placeholders == 0
            } else {
                placeholders == 1 && node.children.len() == 1
            }
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Arena internals
    // ─────────────────────────────────────────────────────────────

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(cur.index as usize)
                .filter(|s| s.generation == cur.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(cur.index);
                self.len -= 1;
                stack.extend(node.children);
            }
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
    }

    fn push_placeholder(&mut self, parent: NodeId, marker: PlaceholderKind) {
        let placeholder = self.alloc(TreeNode::new(
            Payload::Placeholder { marker },
            Some(parent),
        ));
        if let Some(node) = self.get_mut(parent) {
            node.children.push(placeholder);
        }
    }

    fn build(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let mut node = TreeNode::new(data.payload, Some(parent));
        node.number_items = data.number_items;
        node.selectable = data.selectable && !node.is_placeholder();
        let can_have_children = node.payload.can_have_children();
        let id = self.alloc(node);
        let children = match data.children {
            None if !can_have_children => Some(Vec::new()),
            other => other,
        };
        match children {
            Some(children) => {
                let ids: Vec<NodeId> = children
                    .into_iter()
                    .map(|child| self.build(id, child))
                    .collect();
                if let Some(node) = self.get_mut(id) {
                    node.children = ids;
                    node.children_loaded = true;
                }
            }
            None => {
                let marker = if data.number_items == 0 {
                    PlaceholderKind::Empty
                } else {
                    PlaceholderKind::Loading
                };
                self.push_placeholder(id, marker);
            }
        }
        id
    }
}

// ============================================================================
// Tests
// ============================================================================
