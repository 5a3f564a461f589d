use chrono::{DateTime, Utc};
use lore_canvas::{IdMapping, NodeId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Observable sync activity.
///
/// Broadcast on the [`SyncEventBus`]; a notification layer turns these into toasts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SyncEvent {
    SaveStarted {
        /// Number of nodes that still need a canonical id.
        creates: usize,
    },
    /// One node could not be created; it will be retried on the next save.
    NodeCreateFailed {
        node_id: NodeId,
        name: String,
        error: String,
    },
    SaveSucceeded {
        saved_at: DateTime<Utc>,
        id_mapping: IdMapping,
    },
    /// The bulk write failed. Nothing was discarded.
    SaveFailed { error: String },
    OperationCommitted { operation_id: Uuid, node_id: NodeId },
    OperationRolledBack {
        operation_id: Uuid,
        node_id: NodeId,
        error: String,
        /// False when a later edit superseded the optimistic value and was kept.
        restored: bool,
    },
    /// The cache held nothing usable, so the map was fetched from the remote store.
    RemoteLoadRequested,
}

/// A broadcast sender for sync events.
///
/// Sending never fails the caller: with no subscribers the event is dropped.
#[derive(Clone, Debug)]
pub struct SyncEventBus(pub broadcast::Sender<SyncEvent>);

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SyncEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self(tx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.0.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        let _ = self.0.send(event);
    }
}
