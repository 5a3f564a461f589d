use async_trait::async_trait;
use chrono::Utc;
use lore_canvas::{Edge, GraphBuffer, Node, NodeId, NodeKind};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

use super::{CreateNodeRequest, RemoteStore, UpdateNodeRequest};
use crate::error::RemoteError;

#[derive(Default)]
struct State {
    map: GraphBuffer,
    next_id: u64,
    failing_names: HashSet<String>,
    failing_entities: HashSet<NodeId>,
    failing_replaces: usize,
    replace_gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
struct Calls {
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    replaces: AtomicUsize,
}

/// In-process [`RemoteStore`] with sequential ids and failure injection.
///
/// Canonical ids are assigned in call order, so concurrent creates polled in
/// buffer order get predictable ids.
#[derive(Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
    calls: Calls,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    /// A store whose first canonical id is `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        let store = Self::default();
        store.lock().next_id = first_id;
        store
    }

    /// Seeds the stored map.
    pub fn with_map(self, map: GraphBuffer) -> Self {
        self.lock().map = map;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    /// Creates of nodes with this name fail with a 500.
    pub fn fail_creates_named(&self, name: impl Into<String>) {
        self.lock().failing_names.insert(name.into());
    }

    pub fn allow_creates_named(&self, name: &str) {
        self.lock().failing_names.remove(name);
    }

    /// Updates and deletes of this node fail with a 500.
    pub fn fail_operations_on(&self, id: impl Into<NodeId>) {
        self.lock().failing_entities.insert(id.into());
    }

    /// The next `count` bulk writes fail with a 503.
    pub fn fail_next_replaces(&self, count: usize) {
        self.lock().failing_replaces = count;
    }

    /// Every call fails with [`RemoteError::Unavailable`] while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Bulk writes wait for a permit on the returned semaphore before landing.
    pub fn gate_replaces(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.lock().replace_gate = Some(gate.clone());
        gate
    }

    /// The map as currently stored.
    pub fn snapshot(&self) -> GraphBuffer {
        self.lock().map.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls.creates.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.calls.updates.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.deletes.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.calls.replaces.load(Ordering::SeqCst)
    }
}

fn rejected(status: u16, body: &str) -> RemoteError {
    RemoteError::Status {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list_nodes(&self, kind: Option<NodeKind>) -> Result<Vec<Node>, RemoteError> {
        self.ensure_online()?;
        Ok(self
            .lock()
            .map
            .nodes
            .iter()
            .filter(|n| kind.is_none_or(|k| n.kind == k))
            .cloned()
            .collect())
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<Node, RemoteError> {
        self.calls.creates.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let mut state = self.lock();
        if state.failing_names.contains(&request.name) {
            return Err(rejected(500, "create rejected"));
        }

        let id = state.next_id;
        state.next_id += 1;
        let now = Utc::now().to_rfc3339();
        let node = Node {
            id: NodeId::new(id.to_string()),
            kind: request.kind,
            name: request.name.clone(),
            description: request.description.clone(),
            position: request.position.unwrap_or_default(),
            connection_direction: request.connection_direction.unwrap_or_default(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        state.map.nodes.push(node.clone());
        Ok(node)
    }

    async fn update_node(
        &self,
        id: &NodeId,
        patch: &UpdateNodeRequest,
    ) -> Result<Node, RemoteError> {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let mut state = self.lock();
        if state.failing_entities.contains(id) {
            return Err(rejected(500, "update rejected"));
        }
        let node = state
            .map
            .node_mut(id)
            .ok_or_else(|| rejected(404, "node not found"))?;
        patch.apply_to(node);
        node.updated_at = Some(Utc::now().to_rfc3339());
        Ok(node.clone())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<(), RemoteError> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let mut state = self.lock();
        if state.failing_entities.contains(id) {
            return Err(rejected(500, "delete rejected"));
        }
        state
            .map
            .remove_node(id)
            .ok_or_else(|| rejected(404, "node not found"))?;
        state.map.remove_incident_edges(id);
        Ok(())
    }

    async fn list_edges(&self) -> Result<Vec<Edge>, RemoteError> {
        self.ensure_online()?;
        Ok(self.lock().map.edges.clone())
    }

    async fn replace_map(&self, map: &GraphBuffer) -> Result<(), RemoteError> {
        self.calls.replaces.fetch_add(1, Ordering::SeqCst);
        let gate = self.lock().replace_gate.clone();
        if let Some(gate) = gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| RemoteError::Unavailable("gate closed".into()))?;
        }
        self.ensure_online()?;

        let mut state = self.lock();
        if state.failing_replaces > 0 {
            state.failing_replaces -= 1;
            return Err(rejected(503, "bulk write rejected"));
        }
        state.map = map.clone();
        Ok(())
    }

    async fn health(&self) -> Result<bool, RemoteError> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }
}
