use lore_canvas::{EditorConfig, GraphBuffer, GraphStateStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::api::RemoteStore;
use crate::error::SyncError;
use crate::events::{SyncEvent, SyncEventBus};
use crate::persistence::{Hydration, PersistenceBridge};

/// The single owner of the editing buffer.
///
/// Every mutation goes through [`mutate`](Self::mutate), which mirrors whatever it
/// touched to the local cache. The lock is never held across a network call.
#[derive(Clone)]
pub struct EditorSession {
    store: Arc<Mutex<GraphStateStore>>,
    bridge: Arc<PersistenceBridge>,
}

impl EditorSession {
    /// Hydrates from the cache, falling back to the remote store when the cache is
    /// empty or unreadable, then applies persisted settings.
    pub async fn open(
        bridge: Arc<PersistenceBridge>,
        remote: &dyn RemoteStore,
        config: EditorConfig,
        events: &SyncEventBus,
    ) -> Result<Self, SyncError> {
        let mut store = match bridge.hydrate().await {
            Hydration::Cached { buffer, pending } => {
                GraphStateStore::from_parts(buffer, pending, config)
            }
            Hydration::NeedsRemote => GraphStateStore::new(config),
        };

        if bridge.take_remote_load_request() {
            events.emit(SyncEvent::RemoteLoadRequested);
            let map = remote.load_map().await.map_err(SyncError::LoadFailed)?;
            info!(
                nodes = map.nodes.len(),
                edges = map.edges.len(),
                "Loaded map from remote store"
            );
            store.replace_all(map);
        }

        let settings = bridge.load_settings().await;
        if let Some(snap) = settings.snap_to_grid {
            store.set_snap_to_grid(snap);
        }

        let dirty = store.take_dirty();
        bridge.mirror(&store, dirty);

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            bridge,
        })
    }

    /// Wraps an already-built store. Nothing is mirrored until the first mutation.
    pub fn from_store(store: GraphStateStore, bridge: Arc<PersistenceBridge>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            bridge,
        }
    }

    pub fn bridge(&self) -> &Arc<PersistenceBridge> {
        &self.bridge
    }

    /// Runs `f` against the store and mirrors the blobs it touched.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut GraphStateStore) -> R) -> R {
        let mut store = self.store.lock().await;
        let result = f(&mut store);
        let dirty = store.take_dirty();
        if !dirty.is_empty() {
            self.bridge.mirror(&store, dirty);
        }
        result
    }

    pub async fn read<R>(&self, f: impl FnOnce(&GraphStateStore) -> R) -> R {
        let store = self.store.lock().await;
        f(&store)
    }

    pub async fn snapshot(&self) -> GraphBuffer {
        self.read(|store| store.buffer().clone()).await
    }

    pub async fn has_unsaved_changes(&self) -> bool {
        self.read(GraphStateStore::has_unsaved_changes).await
    }

    pub async fn set_snap_to_grid(&self, snap: bool) {
        self.mutate(|store| store.set_snap_to_grid(snap)).await;
        self.bridge.save_snap_to_grid(snap);
    }
}
