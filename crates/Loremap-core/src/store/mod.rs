//! # Local Cache
//!
//! A string-keyed blob store that survives restarts. The editor writes to it on every
//! change and reads it back once, at startup.

pub mod memory;
pub mod sqlite;
pub mod writer;

use async_trait::async_trait;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use writer::CacheWriter;

/// Cache keys. Values are JSON.
pub mod keys {
    pub const NODES: &str = "nodes";
    pub const EDGES: &str = "edges";
    pub const PENDING_CHANGES: &str = "pendingChanges";
    pub const SNAP_TO_GRID: &str = "snapToGrid";
    pub const AUTO_SAVE_ENABLED: &str = "autoSaveEnabled";
    pub const AUTO_SAVE_INTERVAL: &str = "autoSaveInterval";
    pub const LAST_SAVED: &str = "lastSaved";
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}
