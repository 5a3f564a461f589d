//! # Loremap Core Library
//!
//! The async side of the world-graph editor: remote sync, the local durable cache,
//! optimistic single-entity operations and the auto-save timer. The editing buffer
//! itself lives in `lore_canvas`.
//!

pub mod api;
pub mod autosave;
pub mod config;
pub mod error;
pub mod events;
pub mod optimistic;
pub mod persistence;
pub mod session;
pub mod store;
pub mod sync;

pub use api::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
pub use autosave::{AutoSaveHandle, AutoSaveScheduler, AutoSaveSettings};
pub use config::SyncConfig;
pub use error::{RemoteError, SyncError};
pub use events::{SyncEvent, SyncEventBus};
pub use persistence::{Hydration, PersistenceBridge, StoredSettings};
pub use session::EditorSession;
pub use store::{CacheStore, MemoryCache, SqliteCache};
pub use sync::{CommandOutcome, SaveOutcome, SaveReport, SkipReason, SyncCoordinator};
