//! # Persistence Bridge
//!
//! Hydrates the editing buffer from the local cache at startup and mirrors every
//! subsequent change back to it. Mirroring never blocks and never fails the caller.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lore_canvas::{Dirty, Edge, GraphBuffer, GraphStateStore, Node, PendingChangeSet};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{CacheStore, CacheWriter, keys};

/// Outcome of startup hydration.
#[derive(Clone, Debug, PartialEq)]
pub enum Hydration {
    Cached {
        buffer: GraphBuffer,
        pending: PendingChangeSet,
    },
    /// The cache held nothing usable; the map must come from the remote store.
    NeedsRemote,
}

/// User settings persisted next to the graph. `None` means never set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredSettings {
    pub snap_to_grid: Option<bool>,
    pub auto_save_enabled: Option<bool>,
    pub auto_save_interval: Option<Duration>,
    pub last_saved: Option<DateTime<Utc>>,
}

pub struct PersistenceBridge {
    cache: Arc<dyn CacheStore>,
    writer: CacheWriter,
    remote_load_requested: AtomicBool,
}

impl PersistenceBridge {
    /// Wraps `cache` and starts its background writer. Needs a tokio runtime.
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            writer: CacheWriter::spawn(cache.clone()),
            cache,
            remote_load_requested: AtomicBool::new(false),
        }
    }

    pub async fn hydrate(&self) -> Hydration {
        match self.read_cached().await {
            Ok(Some((buffer, pending))) => {
                debug!(
                    nodes = buffer.nodes.len(),
                    edges = buffer.edges.len(),
                    pending = pending.len(),
                    "Hydrated from local cache"
                );
                Hydration::Cached { buffer, pending }
            }
            Ok(None) => {
                self.remote_load_requested.store(true, Ordering::SeqCst);
                Hydration::NeedsRemote
            }
            Err(e) => {
                warn!(error = %e, "Local cache is unreadable; loading from remote");
                self.remote_load_requested.store(true, Ordering::SeqCst);
                Hydration::NeedsRemote
            }
        }
    }

    /// True exactly once after a hydration that fell back to the remote store.
    pub fn take_remote_load_request(&self) -> bool {
        self.remote_load_requested.swap(false, Ordering::SeqCst)
    }

    async fn read_cached(&self) -> Result<Option<(GraphBuffer, PendingChangeSet)>> {
        let (Some(nodes), Some(edges)) = (
            self.cache.get(keys::NODES).await?,
            self.cache.get(keys::EDGES).await?,
        ) else {
            return Ok(None);
        };
        let nodes: Vec<Node> = serde_json::from_str(&nodes).context("cached nodes are corrupt")?;
        let mut edges: Vec<Edge> =
            serde_json::from_str(&edges).context("cached edges are corrupt")?;

        let pending = match self.cache.get(keys::PENDING_CHANGES).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Cached pending changes are corrupt; starting clean");
                PendingChangeSet::default()
            }),
            Ok(None) => PendingChangeSet::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read cached pending changes");
                PendingChangeSet::default()
            }
        };

        if nodes.is_empty() && edges.is_empty() && !pending.has_unsaved_changes() {
            return Ok(None);
        }

        let before = edges.len();
        edges.retain(|e| {
            nodes.iter().any(|n| n.id == e.source) && nodes.iter().any(|n| n.id == e.target)
        });
        if edges.len() != before {
            warn!(dropped = before - edges.len(), "Dropped cached edges with missing endpoints");
        }

        Ok(Some((GraphBuffer::new(nodes, edges), pending)))
    }

    /// Enqueues the blobs named by `dirty`.
    pub fn mirror(&self, store: &GraphStateStore, dirty: Dirty) {
        if dirty.contains(Dirty::NODES) {
            self.write_json(keys::NODES, store.nodes());
        }
        if dirty.contains(Dirty::EDGES) {
            self.write_json(keys::EDGES, store.edges());
        }
        if dirty.contains(Dirty::PENDING) {
            self.write_json(keys::PENDING_CHANGES, &store.durable_pending());
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.writer.set(key, json),
            Err(e) => warn!(key, error = %e, "Failed to serialise cache entry"),
        }
    }

    pub async fn load_settings(&self) -> StoredSettings {
        StoredSettings {
            snap_to_grid: self.read_setting(keys::SNAP_TO_GRID).await,
            auto_save_enabled: self.read_setting(keys::AUTO_SAVE_ENABLED).await,
            auto_save_interval: self
                .read_setting::<u64>(keys::AUTO_SAVE_INTERVAL)
                .await
                .map(Duration::from_millis),
            last_saved: self.read_setting(keys::LAST_SAVED).await,
        }
    }

    async fn read_setting<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read setting");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(key, error = %e, "Ignoring corrupt setting"))
            .ok()
    }

    pub fn save_snap_to_grid(&self, snap: bool) {
        self.write_json(keys::SNAP_TO_GRID, &snap);
    }

    pub fn save_auto_save(&self, enabled: bool, interval: Duration) {
        self.write_json(keys::AUTO_SAVE_ENABLED, &enabled);
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.write_json(keys::AUTO_SAVE_INTERVAL, &millis);
    }

    pub fn record_last_saved(&self, at: DateTime<Utc>) {
        self.write_json(keys::LAST_SAVED, &at);
    }

    /// Waits until every mirror write queued so far has been attempted.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Number of cache writes that failed. They are logged and otherwise ignored.
    pub fn write_failures(&self) -> usize {
        self.writer.failures()
    }
}
