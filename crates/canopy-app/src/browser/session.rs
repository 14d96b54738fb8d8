//! Browser session - the state machine behind one explorer tab
//!
//! Navigation operations validate against the current [`BrowserState`],
//! mutate the tree synchronously and return the [`StoreCommand`]s needed to
//! fetch what is missing. Fetch completions come back through the
//! `*_loaded` / `count_reported` methods, which check the loader or counter
//! id before touching anything; a result for a superseded id is reported as
//! [`Completion::Stale`] and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::prelude::*;
use canopy_core::{
    order_node_data, BrowserKind, ContainerKey, DisplayMode, Identity, NodeComparator, NodeData,
    NodeId, NodeKind, Payload, SortOptions, Tree,
};
use canopy_store::{ChildrenRequest, LeavesRequest};

use super::command::{Completion, NodeRef, StoreCommand};
use super::counter::{ContainerCounter, CountReport, CounterId};
use super::events::BrowserEvent;
use super::loader::{LoadKind, LoaderHandle, LoaderId, LoaderSlot};
use super::reconcile::{self, Snapshot};
use super::selection::{SelectionChange, SelectionTracker};
use super::state::BrowserState;
use super::BrowserId;
use crate::config::Settings;

/// Per-browser presentation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub display_mode: DisplayMode,
    pub sort: SortOptions,
    pub auto_count: bool,
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            display_mode: settings.browser.display_mode,
            sort: settings.browser.sort_options(),
            auto_count: settings.behavior.auto_count_on_expand,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// One refresh scope waiting for its data.
#[derive(Debug)]
struct ScopeLoad {
    node: NodeId,
    snapshot: Snapshot,
    result: Option<Vec<NodeData>>,
}

/// Root or refresh load in flight: results are buffered until every scope
/// has answered, so a failure leaves the tree untouched.
#[derive(Debug)]
struct LoadPlan {
    loader: LoaderId,
    scopes: Vec<ScopeLoad>,
}

pub struct BrowserSession {
    id: BrowserId,
    kind: BrowserKind,
    state: BrowserState,
    tree: Tree,
    selection: SelectionTracker,
    loader: LoaderSlot,
    plan: Option<LoadPlan>,
    counter: Option<ContainerCounter>,
    next_counter: u64,
    found: Vec<NodeId>,
    found_cursor: Option<usize>,
    options: SessionOptions,
    comparator: Arc<dyn NodeComparator>,

    /// Whether the tab is currently shown
    pub displayed: bool,

    /// Whether the tab is the focused one
    pub selected: bool,

    events: Vec<BrowserEvent>,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("nodes", &self.tree.node_count())
            .field("loader", &self.loader.active())
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    pub fn new(
        id: BrowserId,
        kind: BrowserKind,
        options: SessionOptions,
        comparator: Arc<dyn NodeComparator>,
    ) -> Self {
        Self {
            id,
            kind,
            state: BrowserState::New,
            tree: Tree::new(Self::root_payload(kind)),
            selection: SelectionTracker::default(),
            loader: LoaderSlot::default(),
            plan: None,
            counter: None,
            next_counter: 0,
            found: Vec::new(),
            found_cursor: None,
            options,
            comparator,
            displayed: false,
            selected: false,
            events: Vec::new(),
        }
    }

    fn root_payload(kind: BrowserKind) -> Payload {
        Payload::Root {
            label: kind.as_str().to_string(),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────

    pub fn id(&self) -> BrowserId {
        self.id
    }

    pub fn kind(&self) -> BrowserKind {
        self.kind
    }

    pub fn state(&self) -> BrowserState {
        self.state
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// The tree, for presentation. Rejected once discarded.
    pub fn tree(&self) -> Result<&Tree> {
        self.require_live("tree")?;
        Ok(&self.tree)
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn active_loader(&self) -> Option<&LoaderHandle> {
        self.loader.active()
    }

    pub fn active_counter(&self) -> Option<&ContainerCounter> {
        self.counter.as_ref()
    }

    pub fn found_nodes(&self) -> &[NodeId] {
        &self.found
    }

    pub fn found_cursor(&self) -> Option<usize> {
        self.found_cursor
    }

    pub fn drain_events(&mut self) -> Vec<BrowserEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resolve a node reference. An identity resolves to its first visible
    /// mirror, or to its first mirror anywhere if none is visible.
    pub fn resolve(&self, node: &NodeRef) -> Result<NodeId> {
        self.require_live("resolve")?;
        match node {
            NodeRef::Id(id) => self.tree.node(*id).map(|_| *id),
            NodeRef::Identity(identity) => {
                let root = self.tree.root();
                let mirrors = self.tree.find_by_identity(identity, root);
                let visible = self
                    .tree
                    .visible_nodes(root)
                    .into_iter()
                    .map(|(id, _)| id)
                    .find(|id| mirrors.contains(id));
                visible
                    .or_else(|| mirrors.first().copied())
                    .ok_or_else(|| Error::not_found(format!("{identity} in {} browser", self.kind)))
            }
        }
    }

    // ─────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────

    /// First activation loads the root; later activations refresh.
    pub fn activate(&mut self) -> Result<Vec<StoreCommand>> {
        match self.state {
            BrowserState::New => {
                let root = self.tree.root();
                self.tree.node_mut(root)?.expanded = true;
                info!("{} browser {}: loading root", self.kind, self.id);
                Ok(self.start_load(LoadKind::Root, vec![root]))
            }
            BrowserState::Ready | BrowserState::CountingItems => self.refresh(),
            other => Err(Error::invalid_state("activate", other)),
        }
    }

    /// Reload every refresh scope, keeping expansion and selection.
    pub fn refresh(&mut self) -> Result<Vec<StoreCommand>> {
        self.require("refresh", &[BrowserState::Ready, BrowserState::CountingItems])?;
        let scopes = self.refresh_scopes();
        debug!(
            "{} browser {}: refreshing {} scope(s) by {:?}",
            self.kind,
            self.id,
            scopes.len(),
            self.options.display_mode
        );
        Ok(self.start_load(LoadKind::Refresh, scopes))
    }

    /// Nodes of the display mode's scope kind, outermost only. Falls back to
    /// the root when the tree has none.
    fn refresh_scopes(&self) -> Vec<NodeId> {
        let root = self.tree.root();
        let kind = self.options.display_mode.scope_kind();
        let candidates: Vec<NodeId> = self
            .tree
            .breadth_first(root)
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(|n| n.kind() == kind))
            .collect();
        let scopes: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|id| {
                !self
                    .tree
                    .ancestors(*id)
                    .iter()
                    .any(|a| candidates.contains(a))
            })
            .collect();
        if scopes.is_empty() {
            vec![root]
        } else {
            scopes
        }
    }

    fn start_load(&mut self, kind: LoadKind, scopes: Vec<NodeId>) -> Vec<StoreCommand> {
        let mut commands = Vec::new();
        let (handle, superseded) = self.loader.issue(kind, None);
        if let Some(old) = superseded {
            debug!("{} superseded by {}", old.id, handle.id);
            commands.push(StoreCommand::CancelLoad { loader: old.id });
        }

        let root = self.tree.root();
        let selected = self.selection.identities(&self.tree);
        let mut loads = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let snapshot = reconcile::snapshot(&self.tree, scope, selected.clone());
            let container = if scope == root {
                None
            } else {
                self.tree.get(scope).and_then(|n| n.identity())
            };
            commands.push(StoreCommand::FetchChildren {
                loader: handle.id,
                scope,
                request: ChildrenRequest {
                    browser: self.kind,
                    container,
                    expanded: snapshot.expanded.clone(),
                    include_members: self.kind == BrowserKind::Admin,
                },
            });
            loads.push(ScopeLoad {
                node: scope,
                snapshot,
                result: None,
            });
        }

        self.plan = Some(LoadPlan {
            loader: handle.id,
            scopes: loads,
        });
        self.settle();
        commands
    }

    /// Completion of one scope of a root or refresh load.
    pub fn children_loaded(
        &mut self,
        loader: LoaderId,
        scope: NodeId,
        result: std::result::Result<Vec<NodeData>, String>,
    ) -> Result<Completion> {
        if self.state.is_discarded() || !self.loader.is_active(loader) {
            debug!("{} browser {}: discarding stale result of {}", self.kind, self.id, loader);
            return Ok(Completion::Stale);
        }
        if !self.plan.as_ref().is_some_and(|p| p.loader == loader) {
            return Ok(Completion::Stale);
        }

        let nodes = match result {
            Ok(nodes) => nodes,
            Err(message) => {
                warn!("{} browser {}: load {} failed: {}", self.kind, self.id, loader, message);
                self.plan = None;
                self.loader.cancel();
                self.emit(BrowserEvent::LoadFailed {
                    browser: self.id,
                    target: None,
                    message,
                });
                self.settle();
                // Sibling scopes of the same loader are still running.
                return Ok(Completion::Applied(vec![StoreCommand::CancelLoad { loader }]));
            }
        };

        let Some(plan) = self.plan.as_mut() else {
            return Ok(Completion::Stale);
        };
        let Some(slot) = plan
            .scopes
            .iter_mut()
            .find(|s| s.node == scope && s.result.is_none())
        else {
            debug!("{} answered twice or is not part of {}", scope, loader);
            return Ok(Completion::Stale);
        };
        slot.result = Some(nodes);
        if plan.scopes.iter().any(|s| s.result.is_none()) {
            return Ok(Completion::Applied(Vec::new()));
        }

        let Some(plan) = self.plan.take() else {
            return Ok(Completion::Stale);
        };
        let Some(handle) = self.loader.complete(loader) else {
            return Ok(Completion::Stale);
        };
        self.merge_plan(handle, plan)
    }

    fn merge_plan(&mut self, handle: LoaderHandle, plan: LoadPlan) -> Result<Completion> {
        let root = self.tree.root();
        let mut selection = Vec::new();

        for scope in plan.scopes {
            if !self.tree.contains(scope.node) {
                debug!("scope {} vanished before merge", scope.node);
                continue;
            }
            let fresh = scope.result.unwrap_or_default();
            let reconciled = reconcile::apply(
                &mut self.tree,
                scope.node,
                fresh,
                &scope.snapshot,
                self.comparator.as_ref(),
                self.options.sort,
            )?;
            self.scaffold_buckets(scope.node)?;

            let scope_identity = (scope.node != root)
                .then(|| self.tree.get(scope.node).and_then(|n| n.identity()))
                .flatten();
            let count = reconciled.inserted.len();
            let event = match handle.kind {
                LoadKind::Root => BrowserEvent::NodesInserted {
                    browser: self.id,
                    parent: scope_identity,
                    count,
                },
                LoadKind::Refresh | LoadKind::Leaves => BrowserEvent::NodesReplaced {
                    browser: self.id,
                    scope: scope_identity,
                    count,
                },
            };
            self.emit(event);
            // Later scopes may free nodes matched by earlier ones, so only
            // the last reconciliation's selection is kept.
            selection = reconciled.selection;
        }

        let change = self.selection.restore(&self.tree, &selection);
        self.report_selection(change);
        self.found.retain(|id| self.tree.contains(*id));
        if self.found_cursor.is_some_and(|c| c >= self.found.len()) {
            self.found_cursor = None;
        }

        info!(
            "{} browser {}: {:?} load {} merged ({} nodes)",
            self.kind,
            self.id,
            handle.kind,
            handle.id,
            self.tree.node_count()
        );
        let targets = reconcile::count_targets(&self.tree, root);
        Ok(Completion::Applied(self.issue_count(targets)))
    }

    /// Put the browser's synthetic buckets under every experimenter below
    /// `scope` that has no real children.
    fn scaffold_buckets(&mut self, scope: NodeId) -> Result<()> {
        let buckets = self.kind.scaffold_buckets();
        if buckets.is_empty() {
            return Ok(());
        }
        let bare: Vec<NodeId> = self
            .tree
            .breadth_first(scope)
            .into_iter()
            .filter(|id| {
                self.tree.get(*id).is_some_and(|n| n.kind() == NodeKind::Experimenter)
                    && self.tree.real_children(*id).is_empty()
            })
            .collect();
        for experimenter in bare {
            let children = buckets.iter().cloned().map(NodeData::new).collect();
            self.tree.replace_children(experimenter, children)?;
        }
        Ok(())
    }

    /// Expand a node, loading its children if they are not there yet.
    pub fn expand(&mut self, node: NodeId) -> Result<Vec<StoreCommand>> {
        self.require("expand", &[BrowserState::Ready, BrowserState::CountingItems])?;
        let target = self.tree.node(node)?;
        if target.is_placeholder() {
            return Err(Error::invalid_state("expand", "target is a placeholder"));
        }
        if !target.payload.can_have_children() {
            return Ok(Vec::new());
        }
        let identity = target
            .identity()
            .ok_or_else(|| Error::not_found(format!("identity of {node}")))?;

        if target.children_loaded {
            self.tree.node_mut(node)?.expanded = true;
            return Ok(self.auto_count(node));
        }

        self.tree.node_mut(node)?.expanded = true;
        let owner = self.owner_identity(node);

        let mut commands = Vec::new();
        let (handle, superseded) = self.loader.issue(LoadKind::Leaves, Some(node));
        if let Some(old) = superseded {
            commands.push(StoreCommand::CancelLoad { loader: old.id });
        }
        debug!("{} browser {}: {} loads leaves of {}", self.kind, self.id, handle.id, identity);
        commands.push(StoreCommand::FetchLeaves {
            loader: handle.id,
            request: LeavesRequest {
                browser: self.kind,
                node: identity,
                owner,
            },
        });
        self.settle();
        Ok(commands)
    }

    /// Completion of a leaves load.
    pub fn set_leaves(
        &mut self,
        loader: LoaderId,
        result: std::result::Result<Vec<NodeData>, String>,
    ) -> Result<Completion> {
        if self.state.is_discarded() || !self.loader.is_active(loader) {
            debug!("{} browser {}: discarding stale leaves of {}", self.kind, self.id, loader);
            return Ok(Completion::Stale);
        }
        if self.state != BrowserState::LoadingLeaves {
            return Err(Error::invalid_state("set_leaves", self.state));
        }
        let Some(handle) = self.loader.complete(loader) else {
            return Ok(Completion::Stale);
        };
        let Some(target) = handle.target.filter(|t| self.tree.contains(*t)) else {
            self.settle();
            return Ok(Completion::Stale);
        };
        let parent = self.tree.get(target).and_then(|n| n.identity());

        let commands = match result {
            Ok(nodes) => {
                let ordered = order_node_data(nodes, self.comparator.as_ref(), self.options.sort);
                let inserted = self.tree.replace_children(target, ordered)?;
                self.tree.node_mut(target)?.expanded = true;
                if self.selection.retain_live(&self.tree) {
                    self.report_selection(SelectionChange {
                        changed: true,
                        ..SelectionChange::default()
                    });
                }
                self.emit(BrowserEvent::NodesInserted {
                    browser: self.id,
                    parent,
                    count: inserted.len(),
                });
                self.settle();
                self.auto_count(target)
            }
            Err(message) => {
                warn!("{} browser {}: leaves of {:?} failed: {}", self.kind, self.id, parent, message);
                self.tree.node_mut(target)?.expanded = false;
                self.emit(BrowserEvent::LoadFailed {
                    browser: self.id,
                    target: parent,
                    message,
                });
                self.settle();
                Vec::new()
            }
        };
        Ok(Completion::Applied(commands))
    }

    /// Collapse a node, cancelling a leaves load running at or below it.
    pub fn collapse(&mut self, node: NodeId) -> Result<Vec<StoreCommand>> {
        self.require_live("collapse")?;
        self.tree.node_mut(node)?.expanded = false;

        let mut commands = Vec::new();
        if let Some(handle) = self.loader.active().copied() {
            let targets_node = handle.kind == LoadKind::Leaves
                && handle.target.is_some_and(|t| self.tree.is_within(t, node));
            if targets_node {
                debug!("collapse of {} cancels {}", node, handle.id);
                self.loader.cancel();
                commands.push(StoreCommand::CancelLoad { loader: handle.id });
            }
        }
        self.settle();
        Ok(commands)
    }

    /// Cancel the running load.
    pub fn cancel(&mut self) -> Result<Vec<StoreCommand>> {
        self.require("cancel", &[BrowserState::LoadingData, BrowserState::LoadingLeaves])?;
        let mut commands = Vec::new();
        if let Some(handle) = self.loader.cancel() {
            if let Some(target) = handle.target {
                if let Some(node) = self.tree.get_mut(target) {
                    if !node.children_loaded {
                        node.expanded = false;
                    }
                }
            }
            info!("{} browser {}: cancelled {}", self.kind, self.id, handle.id);
            commands.push(StoreCommand::CancelLoad { loader: handle.id });
        }
        self.plan = None;
        self.settle();
        Ok(commands)
    }

    /// Tear the browser down. Terminal.
    pub fn discard(&mut self) -> Result<Vec<StoreCommand>> {
        self.require_live("discard")?;
        let mut commands = Vec::new();
        if let Some(handle) = self.loader.cancel() {
            commands.push(StoreCommand::CancelLoad { loader: handle.id });
        }
        if let Some(counter) = self.counter.take() {
            commands.push(StoreCommand::CancelCount {
                counter: counter.id(),
            });
        }
        self.plan = None;
        self.selection.clear();
        self.found.clear();
        self.found_cursor = None;
        self.tree = Tree::new(Self::root_payload(self.kind));
        self.set_state(BrowserState::Discarded);
        info!("{} browser {} discarded", self.kind, self.id);
        Ok(commands)
    }

    // ─────────────────────────────────────────────────────────
    // Counting
    // ─────────────────────────────────────────────────────────

    /// Count the items of every container visible under `node` (inclusive).
    /// Replaces any batch already running.
    pub fn count_container_items(&mut self, node: NodeId) -> Result<Vec<StoreCommand>> {
        self.require_live("count_container_items")?;
        if self.state == BrowserState::LoadingLeaves {
            return Err(Error::invalid_state("count_container_items", self.state));
        }
        self.tree.node(node)?;
        let targets = reconcile::count_targets(&self.tree, node);
        Ok(self.issue_count(targets))
    }

    fn auto_count(&mut self, node: NodeId) -> Vec<StoreCommand> {
        if !self.options.auto_count {
            return Vec::new();
        }
        let targets: Vec<NodeId> = self
            .tree
            .real_children(node)
            .into_iter()
            .filter(|id| {
                self.tree
                    .get(*id)
                    .is_some_and(|n| n.payload.count_key().is_some())
            })
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }
        self.issue_count(targets)
    }

    fn issue_count(&mut self, targets: Vec<NodeId>) -> Vec<StoreCommand> {
        let mut commands = Vec::new();
        if let Some(old) = self.counter.take() {
            debug!("count batch {} replaced", old.id());
            commands.push(StoreCommand::CancelCount { counter: old.id() });
        }

        let root = self.tree.root();
        let mut keyed: HashMap<ContainerKey, Vec<NodeId>> = HashMap::new();
        for id in targets {
            let Some(key) = self.tree.get(id).and_then(|n| n.payload.count_key()) else {
                continue;
            };
            let (key, mirrors) = match key {
                ContainerKey::Object(identity) => (key, self.tree.find_by_identity(&identity, root)),
                ContainerKey::Index { .. } => (key.owned_by(self.owner_identity(id)), vec![id]),
            };
            let nodes = keyed.entry(key).or_default();
            for mirror in mirrors {
                if !nodes.contains(&mirror) {
                    nodes.push(mirror);
                }
            }
        }

        if !keyed.is_empty() {
            self.next_counter += 1;
            let counter = ContainerCounter::new(CounterId(self.next_counter), keyed);
            debug!(
                "{} browser {}: count batch {} over {} key(s)",
                self.kind,
                self.id,
                counter.id(),
                counter.total()
            );
            commands.push(StoreCommand::FetchCounts {
                counter: counter.id(),
                keys: counter.keys(),
            });
            self.counter = Some(counter);
        }
        self.settle();
        commands
    }

    /// One count of a batch arrived (or failed).
    pub fn count_reported(
        &mut self,
        counter: CounterId,
        key: ContainerKey,
        result: std::result::Result<i64, String>,
    ) -> Result<Completion> {
        if self.state.is_discarded() {
            return Ok(Completion::Stale);
        }
        let Some(active) = self.counter.as_mut().filter(|c| c.id() == counter) else {
            trace!("discarding count of {} for stale batch {}", key, counter);
            return Ok(Completion::Stale);
        };

        let value = match result {
            Ok(value) => value,
            Err(message) => {
                if !active.contains(&key) || active.is_processed(&key) {
                    return Ok(Completion::Stale);
                }
                // The key stays open; the batch deadline or a cancel ends it.
                warn!("count of {} failed: {}", key, message);
                self.emit(BrowserEvent::CountFailed {
                    browser: self.id,
                    key,
                    message,
                });
                return Ok(Completion::Applied(Vec::new()));
            }
        };
        let nodes = match active.report_result(&mut self.tree, key, value) {
            CountReport::Applied(nodes) => nodes.len(),
            CountReport::Duplicate | CountReport::Unknown => return Ok(Completion::Stale),
        };
        let done = active.is_done();

        self.emit(BrowserEvent::CountUpdated {
            browser: self.id,
            key,
            value,
            nodes,
        });
        if done {
            debug!("count batch {} done", counter);
            self.counter = None;
            self.settle();
        }
        Ok(Completion::Applied(Vec::new()))
    }

    /// The batch ran past its deadline; give up on the missing keys.
    pub fn count_timed_out(&mut self, counter: CounterId) -> Result<Completion> {
        let Some(active) = self.counter.as_ref().filter(|c| c.id() == counter) else {
            return Ok(Completion::Stale);
        };
        warn!(
            "count batch {} timed out with {}/{} keys",
            counter,
            active.processed_count(),
            active.total()
        );
        self.counter = None;
        self.settle();
        Ok(Completion::Applied(vec![StoreCommand::CancelCount { counter }]))
    }

    // ─────────────────────────────────────────────────────────
    // Selection & search
    // ─────────────────────────────────────────────────────────

    pub fn select(&mut self, nodes: &[NodeId], add: bool) -> Result<()> {
        self.require_live("select")?;
        let change = self.selection.select(&self.tree, nodes, add)?;
        self.report_selection(change);
        Ok(())
    }

    pub fn select_all_siblings(&mut self) -> Result<()> {
        self.require_live("select_all_siblings")?;
        let change = self.selection.select_all_siblings(&self.tree)?;
        self.report_selection(change);
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        self.require_live("clear_selection")?;
        if self.selection.clear() {
            self.report_selection(SelectionChange {
                changed: true,
                ..SelectionChange::default()
            });
        }
        Ok(())
    }

    /// Find every node whose name contains `text`, ignoring case. Returns the
    /// number of matches; an empty query clears the results.
    pub fn search(&mut self, text: &str) -> Result<usize> {
        self.require_live("search")?;
        let needle = text.trim().to_lowercase();
        let root = self.tree.root();
        self.found = if needle.is_empty() {
            Vec::new()
        } else {
            self.tree
                .descendants(root)
                .into_iter()
                .filter(|id| *id != root)
                .filter(|id| {
                    self.tree
                        .get(*id)
                        .is_some_and(|n| n.name().to_lowercase().contains(&needle))
                })
                .collect()
        };
        self.found_cursor = None;
        self.emit(BrowserEvent::SearchResults {
            browser: self.id,
            query: text.to_string(),
            found: self.found.len(),
        });
        Ok(self.found.len())
    }

    /// Move to the next search match (wrapping) and select it.
    pub fn next_found(&mut self) -> Result<Option<NodeId>> {
        self.step_found(true)
    }

    /// Move to the previous search match (wrapping) and select it.
    pub fn previous_found(&mut self) -> Result<Option<NodeId>> {
        self.step_found(false)
    }

    fn step_found(&mut self, forward: bool) -> Result<Option<NodeId>> {
        self.require_live("find")?;
        self.found.retain(|id| self.tree.contains(*id));
        let len = self.found.len();
        if len == 0 {
            self.found_cursor = None;
            return Ok(None);
        }
        let cursor = match (self.found_cursor, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(c), true) => (c + 1) % len,
            (Some(c), false) => (c + len - 1) % len,
        };
        self.found_cursor = Some(cursor);
        let node = self.found[cursor];

        // Reveal the match.
        for ancestor in self.tree.ancestors(node) {
            if let Some(n) = self.tree.get_mut(ancestor) {
                n.expanded = true;
            }
        }
        let change = self.selection.select(&self.tree, &[node], false)?;
        self.report_selection(change);
        Ok(Some(node))
    }

    // ─────────────────────────────────────────────────────────
    // Presentation options
    // ─────────────────────────────────────────────────────────

    /// Takes effect on the next refresh.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<()> {
        self.require_live("set_display_mode")?;
        self.options.display_mode = mode;
        Ok(())
    }

    /// Takes effect on the next load.
    pub fn set_sort_options(&mut self, sort: SortOptions) -> Result<()> {
        self.require_live("set_sort_options")?;
        self.options.sort = sort;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────

    fn require(&self, operation: &str, allowed: &[BrowserState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::invalid_state(operation, self.state))
        }
    }

    fn require_live(&self, operation: &str) -> Result<()> {
        if self.state.is_discarded() {
            Err(Error::invalid_state(operation, self.state))
        } else {
            Ok(())
        }
    }

    /// Derive the state from what is still running: an active loader wins,
    /// then an unfinished count batch, otherwise Ready.
    fn settle(&mut self) {
        if self.state.is_discarded() {
            return;
        }
        let next = match self.loader.active().map(|h| h.kind) {
            Some(LoadKind::Root | LoadKind::Refresh) => BrowserState::LoadingData,
            Some(LoadKind::Leaves) => BrowserState::LoadingLeaves,
            None if self.counter.as_ref().is_some_and(|c| !c.is_done()) => {
                BrowserState::CountingItems
            }
            None if self.state == BrowserState::New => BrowserState::New,
            None => BrowserState::Ready,
        };
        self.set_state(next);
    }

    fn set_state(&mut self, next: BrowserState) {
        if self.state == next {
            return;
        }
        debug!("{} browser {}: {} -> {}", self.kind, self.id, self.state, next);
        let from = std::mem::replace(&mut self.state, next);
        self.emit(BrowserEvent::StateChanged {
            browser: self.id,
            from,
            to: next,
        });
    }

    fn report_selection(&mut self, change: SelectionChange) {
        if !change.restricted.is_empty() {
            let dropped = change
                .restricted
                .iter()
                .filter_map(|id| self.tree.get(*id).and_then(|n| n.identity()))
                .collect();
            self.emit(BrowserEvent::SelectionRestricted {
                browser: self.id,
                dropped,
            });
        }
        if change.changed {
            self.emit(BrowserEvent::SelectionChanged {
                browser: self.id,
                selected: self.selection.identities(&self.tree),
            });
        }
    }

    /// Identity of the experimenter or group owning `node`, if any.
    fn owner_identity(&self, node: NodeId) -> Option<Identity> {
        self.tree
            .owner_of(node)
            .ok()
            .and_then(|id| self.tree.get(id))
            .and_then(|n| n.identity())
    }

    fn emit(&mut self, event: BrowserEvent) {
        self.events.push(event);
    }
}
