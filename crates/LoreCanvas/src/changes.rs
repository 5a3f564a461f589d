//! # Change Tracking
//!
//! The accumulated diff between the last successful sync and the current buffer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::{EdgeId, GraphBuffer, NodeId};

/// Six id sets describing what still has to reach the remote store.
///
/// `new_*` and `deleted_*` never share an id: deleting something that was never
/// synced simply forgets it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChangeSet {
    #[serde(default)]
    pub new_nodes: BTreeSet<NodeId>,
    #[serde(default)]
    pub updated_nodes: BTreeSet<NodeId>,
    #[serde(default)]
    pub deleted_nodes: BTreeSet<NodeId>,
    #[serde(default)]
    pub new_edges: BTreeSet<EdgeId>,
    #[serde(default)]
    pub updated_edges: BTreeSet<EdgeId>,
    #[serde(default)]
    pub deleted_edges: BTreeSet<EdgeId>,
}

impl PendingChangeSet {
    pub fn has_unsaved_changes(&self) -> bool {
        !(self.new_nodes.is_empty()
            && self.updated_nodes.is_empty()
            && self.deleted_nodes.is_empty()
            && self.new_edges.is_empty()
            && self.updated_edges.is_empty()
            && self.deleted_edges.is_empty())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn node_added(&mut self, id: &NodeId) {
        self.deleted_nodes.remove(id);
        if id.is_temporary() {
            self.new_nodes.insert(id.clone());
        } else {
            self.updated_nodes.insert(id.clone());
        }
    }

    pub fn node_updated(&mut self, id: &NodeId) {
        if !self.new_nodes.contains(id) {
            self.updated_nodes.insert(id.clone());
        }
    }

    pub fn node_deleted(&mut self, id: &NodeId) {
        self.new_nodes.remove(id);
        self.updated_nodes.remove(id);
        if !id.is_temporary() {
            self.deleted_nodes.insert(id.clone());
        }
    }

    pub fn edge_added(&mut self, id: &EdgeId) {
        self.deleted_edges.remove(id);
        self.new_edges.insert(id.clone());
    }

    pub fn edge_updated(&mut self, id: &EdgeId) {
        if !self.new_edges.contains(id) {
            self.updated_edges.insert(id.clone());
        }
    }

    pub fn edge_deleted(&mut self, id: &EdgeId) {
        self.updated_edges.remove(id);
        if !self.new_edges.remove(id) {
            self.deleted_edges.insert(id.clone());
        }
    }

    /// A temporary node was acknowledged remotely under `canonical`.
    ///
    /// It no longer needs creating, but the bulk write still has to carry it.
    pub fn node_promoted(&mut self, temp: &NodeId, canonical: &NodeId) {
        let was_new = self.new_nodes.remove(temp);
        let was_updated = self.updated_nodes.remove(temp);
        if was_new || was_updated {
            self.updated_nodes.insert(canonical.clone());
        }
    }

    /// Records a history jump from `before` to `restored`.
    ///
    /// Every restored node is marked changed rather than computing a precise diff.
    /// Nodes that only exist locally are queued for creation again.
    pub fn restored(&mut self, before: &GraphBuffer, restored: &GraphBuffer) {
        for node in &before.nodes {
            if !restored.contains_node(&node.id) {
                self.node_deleted(&node.id);
            }
        }
        for edge in &before.edges {
            if !restored.contains_edge(&edge.id) {
                self.edge_deleted(&edge.id);
            }
        }
        for node in &restored.nodes {
            self.deleted_nodes.remove(&node.id);
            if node.id.is_temporary() {
                self.new_nodes.insert(node.id.clone());
            } else {
                self.updated_nodes.insert(node.id.clone());
            }
        }
        for edge in &restored.edges {
            if self.deleted_edges.remove(&edge.id) {
                self.updated_edges.insert(edge.id.clone());
            } else if !before.contains_edge(&edge.id) {
                self.edge_updated(&edge.id);
            }
        }
    }

    /// Merges an earlier in-flight set back in after a failed commit.
    ///
    /// Anything deleted since the commit began stays deleted.
    pub fn absorb(&mut self, earlier: PendingChangeSet) {
        for id in earlier.new_nodes {
            if !self.deleted_nodes.contains(&id) {
                self.new_nodes.insert(id);
            }
        }
        for id in earlier.updated_nodes {
            if !self.deleted_nodes.contains(&id) && !self.new_nodes.contains(&id) {
                self.updated_nodes.insert(id);
            }
        }
        for id in earlier.deleted_nodes {
            if !self.new_nodes.contains(&id) {
                self.updated_nodes.remove(&id);
                self.deleted_nodes.insert(id);
            }
        }
        for id in earlier.new_edges {
            if !self.deleted_edges.contains(&id) {
                self.updated_edges.remove(&id);
                self.new_edges.insert(id);
            }
        }
        for id in earlier.updated_edges {
            if !self.deleted_edges.contains(&id) && !self.new_edges.contains(&id) {
                self.updated_edges.insert(id);
            }
        }
        for id in earlier.deleted_edges {
            if !self.new_edges.contains(&id) {
                self.updated_edges.remove(&id);
                self.deleted_edges.insert(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.new_nodes.len()
            + self.updated_nodes.len()
            + self.deleted_nodes.len()
            + self.new_edges.len()
            + self.updated_edges.len()
            + self.deleted_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_unsaved_changes()
    }
}
