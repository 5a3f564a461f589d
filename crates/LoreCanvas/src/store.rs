//! # Graph State Store
//!
//! The mutable editing buffer. Every edit that changes the graph updates three things
//! in one step: the buffer itself, the [`PendingChangeSet`], and the undo history.
//! Purely visual changes (selection, measured sizes, intermediate drag frames) touch
//! neither the change set nor the history.

use bitflags::bitflags;
use std::collections::{HashMap, HashSet};

use crate::changes::PendingChangeSet;
use crate::config::EditorConfig;
use crate::error::GraphError;
use crate::history::HistoryManager;
use crate::model::{Connection, Edge, EdgeData, EdgeId, GraphBuffer, Node, NodeId, NodePatch, Position};
use crate::remap::IdMapping;
use crate::validator::{CandidateEdge, ConnectionSuggestion, ConnectionValidator, ValidationReport};

bitflags! {
    /// Which persisted blobs a mutation touched since they were last drained.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Dirty: u8 {
        const NODES = 1 << 0;
        const EDGES = 1 << 1;
        const PENDING = 1 << 2;
    }
}

/// The single selected entity, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Node(NodeId),
    Edge(EdgeId),
}

/// A node event coming from the canvas host.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeChange {
    /// The node moved. `dragging` is true for every intermediate frame of a drag and
    /// false for the frame that ends it.
    Position {
        id: NodeId,
        position: Position,
        dragging: bool,
    },
    Select {
        id: NodeId,
        selected: bool,
    },
    /// The host measured the node. Visual only.
    Dimensions {
        id: NodeId,
    },
    Remove {
        id: NodeId,
    },
}

/// An edge event coming from the canvas host.
#[derive(Clone, Debug, PartialEq)]
pub enum EdgeChange {
    Select { id: EdgeId, selected: bool },
    Remove { id: EdgeId },
}

/// The payload of a bulk commit plus the change set it drains.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitBatch {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// The pending set as it stood when the commit began.
    pub in_flight: PendingChangeSet,
}

#[derive(Clone, Debug)]
pub struct GraphStateStore {
    buffer: GraphBuffer,
    pending: PendingChangeSet,
    history: HistoryManager,
    config: EditorConfig,
    selection: Option<Selection>,
    /// Position of each node when its current drag started.
    drag_origins: HashMap<NodeId, Position>,
    /// The change set drained by a bulk commit that has not resolved yet.
    committing: Option<PendingChangeSet>,
    dirty: Dirty,
}

impl Default for GraphStateStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl GraphStateStore {
    pub fn new(config: EditorConfig) -> Self {
        Self::from_parts(GraphBuffer::default(), PendingChangeSet::default(), config)
    }

    /// Builds a store around an existing buffer, e.g. one hydrated from the cache.
    pub fn from_parts(buffer: GraphBuffer, pending: PendingChangeSet, config: EditorConfig) -> Self {
        Self {
            history: HistoryManager::new(config.history_limit, buffer.clone()),
            buffer,
            pending,
            config,
            selection: None,
            drag_origins: HashMap::new(),
            committing: None,
            dirty: Dirty::empty(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.buffer.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.buffer.edges
    }

    pub fn buffer(&self) -> &GraphBuffer {
        &self.buffer
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.buffer.node(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.buffer.edge(id)
    }

    pub fn pending(&self) -> &PendingChangeSet {
        &self.pending
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// True while anything, including an unresolved commit, has not reached the
    /// remote store.
    pub fn has_unsaved_changes(&self) -> bool {
        self.pending.has_unsaved_changes()
            || self
                .committing
                .as_ref()
                .is_some_and(PendingChangeSet::has_unsaved_changes)
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.config.snap_to_grid = snap;
    }

    /// Returns and resets the set of blobs touched since the last call.
    pub fn take_dirty(&mut self) -> Dirty {
        std::mem::take(&mut self.dirty)
    }

    /// A validator over the current snapshot.
    pub fn validator(&self) -> ConnectionValidator<'_> {
        ConnectionValidator::new(&self.buffer.nodes, &self.buffer.edges)
    }

    pub fn check_connection(&self, candidate: &CandidateEdge) -> ValidationReport {
        self.validator().check(candidate)
    }

    pub fn suggest_connections(&self, node: &NodeId) -> Vec<ConnectionSuggestion> {
        self.validator().suggest_connections(node)
    }

    fn record(&mut self, dirty: Dirty) {
        self.dirty |= dirty;
        self.history.push_snapshot(&self.buffer);
        self.reconcile_selection();
    }

    fn reconcile_selection(&mut self) {
        let still_there = match &self.selection {
            Some(Selection::Node(id)) => self.buffer.contains_node(id),
            Some(Selection::Edge(id)) => self.buffer.contains_edge(id),
            None => true,
        };
        if !still_there {
            self.selection = None;
        }
    }

    // --- Node edits ---

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.buffer.contains_node(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        let id = node.id.clone();
        self.buffer.nodes.push(node);
        self.pending.node_added(&id);
        self.record(Dirty::NODES | Dirty::PENDING);
        Ok(id)
    }

    /// Applies `patch`; returns false if it changed nothing.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> Result<bool, GraphError> {
        let node = self
            .buffer
            .node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        if !patch.apply_to(node) {
            return Ok(false);
        }
        self.pending.node_updated(id);
        self.record(Dirty::NODES | Dirty::PENDING);
        Ok(true)
    }

    /// Deletes a node together with every edge touching it.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Node, GraphError> {
        let node = self.remove_node_tracked(id)?;
        self.record(Dirty::all());
        Ok(node)
    }

    fn remove_node_tracked(&mut self, id: &NodeId) -> Result<Node, GraphError> {
        let node = self
            .buffer
            .remove_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        for edge in self.buffer.remove_incident_edges(id) {
            self.pending.edge_deleted(&edge.id);
        }
        self.pending.node_deleted(id);
        self.drag_origins.remove(id);
        Ok(node)
    }

    /// Applies a batch of canvas node events.
    ///
    /// Drag frames only move the node; the change is recorded once, when the drag
    /// ends somewhere other than where it started.
    pub fn apply_node_changes(&mut self, changes: impl IntoIterator<Item = NodeChange>) {
        let mut touched = Dirty::empty();
        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging,
                } => {
                    let snap = self.config.snap_to_grid.then_some(self.config.grid_size);
                    let Some(node) = self.buffer.node_mut(&id) else {
                        continue;
                    };
                    if dragging {
                        self.drag_origins.entry(id).or_insert(node.position);
                        node.position = position;
                        continue;
                    }
                    let origin = self.drag_origins.remove(&id).unwrap_or(node.position);
                    let end = snap.map_or(position, |grid| position.snapped(grid));
                    node.position = end;
                    if end != origin {
                        self.pending.node_updated(&id);
                        touched |= Dirty::NODES | Dirty::PENDING;
                    }
                }
                NodeChange::Select { id, selected } => {
                    if selected {
                        self.selection = Some(Selection::Node(id));
                    } else if self.selection == Some(Selection::Node(id)) {
                        self.selection = None;
                    }
                }
                NodeChange::Dimensions { .. } => {}
                NodeChange::Remove { id } => {
                    if self.remove_node_tracked(&id).is_ok() {
                        touched |= Dirty::all();
                    }
                }
            }
        }
        if !touched.is_empty() {
            self.record(touched);
        }
    }

    // --- Edge edits ---

    /// Validates and adds a new edge.
    ///
    /// Without explicit `data` the edge takes the rule's suggested type.
    pub fn commit_edge(
        &mut self,
        connection: Connection,
        data: Option<EdgeData>,
    ) -> Result<EdgeId, GraphError> {
        let candidate = CandidateEdge::new(connection.source.clone(), connection.target.clone())
            .bidirectional(data.as_ref().is_some_and(|d| d.bidirectional));
        let suggested = self.validator().validate(&candidate)?;

        let edge = Edge {
            id: EdgeId::generate(),
            source: connection.source,
            target: connection.target,
            source_handle: connection.source_handle,
            target_handle: connection.target_handle,
            data: data.unwrap_or_else(|| EdgeData::new(suggested)),
        };
        let id = edge.id.clone();
        self.buffer.edges.push(edge);
        self.pending.edge_added(&id);
        self.record(Dirty::EDGES | Dirty::PENDING);
        Ok(id)
    }

    /// Replaces the payload of an edge; returns false if it was unchanged.
    pub fn update_edge(&mut self, id: &EdgeId, data: EdgeData) -> Result<bool, GraphError> {
        let edge = self
            .buffer
            .edge_mut(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))?;
        if edge.data == data {
            return Ok(false);
        }
        edge.data = data;
        self.pending.edge_updated(id);
        self.record(Dirty::EDGES | Dirty::PENDING);
        Ok(true)
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .buffer
            .remove_edge(id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.clone()))?;
        self.pending.edge_deleted(id);
        self.record(Dirty::EDGES | Dirty::PENDING);
        Ok(edge)
    }

    pub fn apply_edge_changes(&mut self, changes: impl IntoIterator<Item = EdgeChange>) {
        let mut touched = false;
        for change in changes {
            match change {
                EdgeChange::Select { id, selected } => {
                    if selected {
                        self.selection = Some(Selection::Edge(id));
                    } else if self.selection == Some(Selection::Edge(id)) {
                        self.selection = None;
                    }
                }
                EdgeChange::Remove { id } => {
                    if self.buffer.remove_edge(&id).is_some() {
                        self.pending.edge_deleted(&id);
                        touched = true;
                    }
                }
            }
        }
        if touched {
            self.record(Dirty::EDGES | Dirty::PENDING);
        }
    }

    /// Deletes whatever is selected. Returns false if nothing was.
    pub fn delete_selection(&mut self) -> bool {
        match self.selection.clone() {
            Some(Selection::Node(id)) => self.delete_node(&id).is_ok(),
            Some(Selection::Edge(id)) => self.delete_edge(&id).is_ok(),
            None => false,
        }
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        let restored = snapshot.clone();
        self.restore(restored);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        let restored = snapshot.clone();
        self.restore(restored);
        true
    }

    fn restore(&mut self, restored: GraphBuffer) {
        let before = std::mem::replace(&mut self.buffer, restored);
        self.pending.restored(&before, &self.buffer);
        self.drag_origins.clear();
        self.dirty = Dirty::all();
        self.reconcile_selection();
    }

    // --- Sync hooks ---

    /// Replaces the whole buffer with state loaded from the remote store.
    pub fn replace_all(&mut self, buffer: GraphBuffer) {
        self.buffer = buffer;
        self.pending.clear();
        self.committing = None;
        self.history.reset(&self.buffer);
        self.selection = None;
        self.drag_origins.clear();
        self.dirty = Dirty::all();
    }

    /// Swaps acknowledged temporary ids for canonical ones everywhere.
    ///
    /// Returns canonical ids whose node was deleted locally while its creation was in
    /// flight; they are recorded as deletions.
    pub fn apply_id_mapping(&mut self, mapping: &IdMapping) -> Vec<NodeId> {
        let mut orphaned = Vec::new();
        for (temp, canonical) in mapping.iter() {
            match self.buffer.node_mut(temp) {
                Some(node) => {
                    node.id = canonical.clone();
                    self.pending.node_promoted(temp, canonical);
                }
                None => {
                    self.pending.deleted_nodes.insert(canonical.clone());
                    orphaned.push(canonical.clone());
                }
            }
        }
        mapping.apply_to_edges(&mut self.buffer.edges);
        self.history.remap(mapping);

        let remapped = match &self.selection {
            Some(Selection::Node(id)) => mapping.get(id).cloned(),
            _ => None,
        };
        if let Some(canonical) = remapped {
            self.selection = Some(Selection::Node(canonical));
        }
        self.drag_origins = std::mem::take(&mut self.drag_origins)
            .into_iter()
            .map(|(id, pos)| (mapping.get(&id).cloned().unwrap_or(id), pos))
            .collect();

        self.dirty |= Dirty::all();
        orphaned
    }

    /// Starts a bulk commit.
    ///
    /// The payload leaves out deleted ids and anything still carrying a temporary id.
    /// The pending set is drained into the commit; what the payload could not carry
    /// stays pending for the next one. Until [`complete_commit`](Self::complete_commit)
    /// or [`abort_commit`](Self::abort_commit), the drained set is still reported by
    /// [`durable_pending`](Self::durable_pending).
    pub fn begin_commit(&mut self) -> CommitBatch {
        let mut in_flight = std::mem::take(&mut self.pending);
        if let Some(earlier) = self.committing.take() {
            in_flight.absorb(earlier);
        }

        let nodes: Vec<Node> = self
            .buffer
            .nodes
            .iter()
            .filter(|n| !n.id.is_temporary() && !in_flight.deleted_nodes.contains(&n.id))
            .cloned()
            .collect();
        let included: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();

        let mut edges = Vec::new();
        for edge in &self.buffer.edges {
            if in_flight.deleted_edges.contains(&edge.id) {
                continue;
            }
            if included.contains(&edge.source) && included.contains(&edge.target) {
                edges.push(edge.clone());
            } else if in_flight.updated_edges.contains(&edge.id) {
                self.pending.updated_edges.insert(edge.id.clone());
            } else {
                self.pending.new_edges.insert(edge.id.clone());
            }
        }
        for node in &self.buffer.nodes {
            if node.id.is_temporary() {
                self.pending.new_nodes.insert(node.id.clone());
            }
        }

        self.committing = Some(in_flight.clone());
        self.dirty |= Dirty::PENDING;
        CommitBatch {
            nodes,
            edges,
            in_flight,
        }
    }

    pub fn is_committing(&self) -> bool {
        self.committing.is_some()
    }

    /// The bulk commit was accepted: the drained set is gone and the current state
    /// becomes the only history entry.
    pub fn complete_commit(&mut self) {
        self.committing = None;
        self.history.reset(&self.buffer);
        self.dirty |= Dirty::PENDING;
    }

    /// The bulk commit failed: everything it drained is queued again.
    pub fn abort_commit(&mut self) {
        if let Some(in_flight) = self.committing.take() {
            self.pending.absorb(in_flight);
            self.dirty |= Dirty::PENDING;
        }
    }

    /// What must survive a restart: the pending set plus any commit still in flight.
    pub fn durable_pending(&self) -> PendingChangeSet {
        let mut durable = self.pending.clone();
        if let Some(in_flight) = &self.committing {
            durable.absorb(in_flight.clone());
        }
        durable
    }

    // --- Optimistic single-entity operations ---

    /// Applies a patch that is being pushed to the remote store directly.
    ///
    /// Recorded in history but not in the pending set.
    pub fn update_node_untracked(
        &mut self,
        id: &NodeId,
        patch: &NodePatch,
    ) -> Result<bool, GraphError> {
        let node = self
            .buffer
            .node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        if !patch.apply_to(node) {
            return Ok(false);
        }
        self.record(Dirty::NODES);
        Ok(true)
    }

    /// Removes a node whose deletion is being pushed to the remote store directly.
    ///
    /// Returns the node and its incident edges.
    pub fn remove_node_untracked(&mut self, id: &NodeId) -> Result<(Node, Vec<Edge>), GraphError> {
        let node = self
            .buffer
            .remove_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        let edges = self.buffer.remove_incident_edges(id);
        self.pending.updated_nodes.remove(id);
        for edge in &edges {
            self.pending.new_edges.remove(&edge.id);
            self.pending.updated_edges.remove(&edge.id);
        }
        self.drag_origins.remove(id);
        self.record(Dirty::all());
        Ok((node, edges))
    }

    /// Puts a node (and edges whose endpoints both exist) back as they were.
    pub fn restore_node(&mut self, node: Node, edges: Vec<Edge>) {
        match self.buffer.node_mut(&node.id) {
            Some(existing) => *existing = node,
            None => self.buffer.nodes.push(node),
        }
        for edge in edges {
            let endpoints_exist =
                self.buffer.contains_node(&edge.source) && self.buffer.contains_node(&edge.target);
            if endpoints_exist && !self.buffer.contains_edge(&edge.id) {
                self.buffer.edges.push(edge);
            }
        }
        self.record(Dirty::NODES | Dirty::EDGES);
    }

    /// Queues a node for the next bulk commit without changing it.
    pub fn mark_node_updated(&mut self, id: &NodeId) {
        if self.buffer.contains_node(id) {
            self.pending.node_updated(id);
            self.dirty |= Dirty::PENDING;
        }
    }
}
