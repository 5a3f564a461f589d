//! # Optimistic Operations
//!
//! Single-entity edits that are applied locally first and pushed to the remote store
//! right away. Each one is tracked as `Pending -> Committed | RolledBack`; a rollback
//! is computed from the recorded pre-operation snapshot and the store as it is *now*,
//! never from state captured when the operation started.

use lore_canvas::{Edge, GraphStateStore, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationState {
    Pending,
    Committed,
    RolledBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    UpdateNode,
    DeleteNode,
}

/// The entity as it was before the operation touched it.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    pub node: Node,
    /// Incident edges removed together with the node.
    pub edges: Vec<Edge>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: Uuid,
    pub entity: NodeId,
    pub kind: OperationKind,
    pub before: EntitySnapshot,
    /// The value the operation wrote locally; `None` for deletions.
    pub optimistic: Option<Node>,
    pub state: OperationState,
}

impl Operation {
    pub fn update(before: Node, optimistic: Node) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity: before.id.clone(),
            kind: OperationKind::UpdateNode,
            before: EntitySnapshot {
                node: before,
                edges: Vec::new(),
            },
            optimistic: Some(optimistic),
            state: OperationState::Pending,
        }
    }

    pub fn delete(before: Node, edges: Vec<Edge>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity: before.id.clone(),
            kind: OperationKind::DeleteNode,
            before: EntitySnapshot {
                node: before,
                edges,
            },
            optimistic: None,
            state: OperationState::Pending,
        }
    }
}

/// Operations still waiting on the remote store, keyed by id.
///
/// Settling an operation removes it; the outcome travels on the event bus.
#[derive(Debug, Default)]
pub struct OperationLedger {
    operations: HashMap<Uuid, Operation>,
}

impl OperationLedger {
    pub fn record(&mut self, operation: Operation) -> Uuid {
        let id = operation.id;
        self.operations.insert(id, operation);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&Operation> {
        self.operations.get(id)
    }

    pub fn state(&self, id: &Uuid) -> Option<OperationState> {
        self.get(id).map(|op| op.state)
    }

    /// Takes a pending operation out of the ledger, moved to `state`.
    ///
    /// Returns `None` if the operation was already settled.
    pub fn settle(&mut self, id: &Uuid, state: OperationState) -> Option<Operation> {
        let mut op = self.operations.remove(id)?;
        op.state = state;
        Some(op)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Undoes `operation` against the current store.
///
/// An update is reverted only if the node still holds the optimistic value; if the
/// user edited it since, that edit wins and is queued for the next bulk save instead.
/// A deletion is reverted only if nothing has reused the id. Returns true if the
/// pre-operation snapshot was restored.
pub fn rollback(operation: &Operation, store: &mut GraphStateStore) -> bool {
    let before = &operation.before;
    match operation.kind {
        OperationKind::UpdateNode => match store.node(&operation.entity) {
            Some(current) if Some(current) == operation.optimistic.as_ref() => {
                store.restore_node(before.node.clone(), Vec::new());
                true
            }
            Some(_) => {
                store.mark_node_updated(&operation.entity);
                false
            }
            None => false,
        },
        OperationKind::DeleteNode => {
            if store.node(&operation.entity).is_some() {
                return false;
            }
            store.restore_node(before.node.clone(), before.edges.clone());
            true
        }
    }
}
