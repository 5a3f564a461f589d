//! # LoreCanvas
//!
//! `lore_canvas` is the synchronous heart of the world-graph editor: the typed graph
//! model, the connection rule table, the change tracker and the undo history, all
//! composed by [`GraphStateStore`]. It performs no I/O; persistence and remote sync
//! live in `loremap_core`.
//!
//! ## Core Architecture
//! - **Model (`src/model.rs`)**: Nodes, edges and the serializable buffer.
//! - **Rules (`src/rules.rs`)**: The ordered connection policy table.
//! - **Validator (`src/validator.rs`)**: Pure rule evaluation over a buffer snapshot.
//! - **Store (`src/store.rs`)**: The editing buffer that keeps history and the
//!   pending change set in step with every mutation.

pub mod changes;
pub mod config;
pub mod error;
pub mod history;
pub mod input;
pub mod model;
pub mod remap;
pub mod rules;
pub mod store;
pub mod validator;

// Re-exports for convenience
pub use changes::PendingChangeSet;
pub use config::EditorConfig;
pub use error::{GraphError, ValidationError};
pub use history::HistoryManager;
pub use input::{EditorCommand, Key, ModifiersState, command_for};
pub use model::{
    Connection, ConnectionDirection, ConnectionKind, ConnectionType, CustomColor, Edge, EdgeData,
    EdgeId, GraphBuffer, HandleSide, Node, NodeId, NodeKind, NodePatch, Position, Strength,
};
pub use remap::IdMapping;
pub use rules::{ConnectionRule, DEFAULT_RULES, TypeMatcher};
pub use store::{CommitBatch, Dirty, EdgeChange, GraphStateStore, NodeChange, Selection};
pub use validator::{CandidateEdge, ConnectionSuggestion, ConnectionValidator, ValidationReport};
