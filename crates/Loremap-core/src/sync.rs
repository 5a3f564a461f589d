//! # Sync Coordinator
//!
//! Pushes the local buffer to the remote store. A save runs in two phases:
//!
//! 1. Every node still carrying a temporary id is created remotely. Creates are
//!    independent; failures are collected, not fatal.
//! 2. The acknowledged ids are swapped in everywhere and the whole map is written with
//!    one bulk replace.
//!
//! At most one save runs at a time. A trigger that arrives while saving is dropped,
//! not queued: whatever it would have saved is still pending for the next one.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use lore_canvas::{EditorCommand, GraphBuffer, GraphError, IdMapping, Node, NodeId, NodePatch};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::{CreateNodeRequest, RemoteStore};
use crate::error::{RemoteError, SyncError};
use crate::events::{SyncEvent, SyncEventBus};
use crate::optimistic::{Operation, OperationLedger, OperationState, rollback};
use crate::session::EditorSession;

/// A node whose creation failed during a save. It stays queued.
#[derive(Clone, Debug, PartialEq)]
pub struct FailedCreate {
    pub node_id: NodeId,
    pub name: String,
    pub error: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaveReport {
    pub saved_at: DateTime<Utc>,
    /// Temporary ids acknowledged during this save.
    pub id_mapping: IdMapping,
    pub failed_creates: Vec<FailedCreate>,
    pub nodes_written: usize,
    pub edges_written: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NothingToSave,
    AlreadySaving,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    Saved(SaveReport),
    Skipped(SkipReason),
}

impl SaveOutcome {
    pub fn report(&self) -> Option<&SaveReport> {
        match self {
            SaveOutcome::Saved(report) => Some(report),
            SaveOutcome::Skipped(_) => None,
        }
    }
}

/// What a keyboard command did.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Save(SaveOutcome),
    /// An edit command; false if there was nothing to apply.
    Applied(bool),
}

/// Holds the saving flag for the lifetime of one save.
struct SavingGuard<'a>(&'a AtomicBool);

impl<'a> SavingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    session: EditorSession,
    remote: Arc<dyn RemoteStore>,
    events: SyncEventBus,
    saving: AtomicBool,
    ledger: Mutex<OperationLedger>,
}

impl SyncCoordinator {
    pub fn new(session: EditorSession, remote: Arc<dyn RemoteStore>, events: SyncEventBus) -> Self {
        Self {
            session,
            remote,
            events,
            saving: AtomicBool::new(false),
            ledger: Mutex::new(OperationLedger::default()),
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn events(&self) -> &SyncEventBus {
        &self.events
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    fn ledger(&self) -> MutexGuard<'_, OperationLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State of an operation still in flight; `None` once it has settled.
    pub fn operation_state(&self, id: &Uuid) -> Option<OperationState> {
        self.ledger().state(id)
    }

    /// Number of optimistic operations awaiting the remote store.
    pub fn pending_operations(&self) -> usize {
        self.ledger().len()
    }

    /// Saves if there is anything to save and no other save is running.
    pub async fn save(&self) -> Result<SaveOutcome, SyncError> {
        if !self.session.has_unsaved_changes().await {
            return Ok(SaveOutcome::Skipped(SkipReason::NothingToSave));
        }
        let Some(_guard) = SavingGuard::acquire(&self.saving) else {
            debug!("Save already in progress; trigger dropped");
            return Ok(SaveOutcome::Skipped(SkipReason::AlreadySaving));
        };

        // Phase 1: canonical ids for every local-only node, in buffer order.
        let drafts: Vec<Node> = self
            .session
            .read(|store| {
                store
                    .nodes()
                    .iter()
                    .filter(|n| store.pending().new_nodes.contains(&n.id))
                    .cloned()
                    .collect()
            })
            .await;
        self.events.emit(SyncEvent::SaveStarted {
            creates: drafts.len(),
        });

        let results = join_all(drafts.iter().map(|node| async move {
            let request = CreateNodeRequest::from(node);
            (node, self.remote.create_node(&request).await)
        }))
        .await;

        let mut id_mapping = IdMapping::new();
        let mut failed_creates = Vec::new();
        for (node, result) in results {
            match result {
                Ok(created) => id_mapping.insert(node.id.clone(), created.id),
                Err(e) => {
                    warn!(node_id = %node.id, name = %node.name, error = %e, "Failed to create node; will retry on next save");
                    self.events.emit(SyncEvent::NodeCreateFailed {
                        node_id: node.id.clone(),
                        name: node.name.clone(),
                        error: e.to_string(),
                    });
                    failed_creates.push(FailedCreate {
                        node_id: node.id.clone(),
                        name: node.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Phase 2: swap ids in (mirrored to the cache by the session), then one bulk write.
        let batch = self
            .session
            .mutate(|store| {
                if !id_mapping.is_empty() {
                    for orphan in store.apply_id_mapping(&id_mapping) {
                        debug!(node_id = %orphan, "Node deleted while its create was in flight");
                    }
                }
                store.begin_commit()
            })
            .await;
        let payload = GraphBuffer::new(batch.nodes, batch.edges);

        match self.remote.replace_map(&payload).await {
            Ok(()) => {
                self.session.mutate(|store| store.complete_commit()).await;
                let saved_at = Utc::now();
                self.session.bridge().record_last_saved(saved_at);
                info!(
                    created = id_mapping.len(),
                    failed = failed_creates.len(),
                    nodes = payload.nodes.len(),
                    edges = payload.edges.len(),
                    "Map saved"
                );
                self.events.emit(SyncEvent::SaveSucceeded {
                    saved_at,
                    id_mapping: id_mapping.clone(),
                });
                Ok(SaveOutcome::Saved(SaveReport {
                    saved_at,
                    id_mapping,
                    failed_creates,
                    nodes_written: payload.nodes.len(),
                    edges_written: payload.edges.len(),
                }))
            }
            Err(e) => {
                error!(error = %e, "Bulk save failed; pending changes kept");
                self.session.mutate(|store| store.abort_commit()).await;
                self.events.emit(SyncEvent::SaveFailed {
                    error: e.to_string(),
                });
                Err(SyncError::SaveFailed(e))
            }
        }
    }

    /// Dispatches a keyboard command.
    pub async fn handle_command(&self, command: EditorCommand) -> Result<CommandOutcome, SyncError> {
        let applied = match command {
            EditorCommand::Save => return self.save().await.map(CommandOutcome::Save),
            EditorCommand::Undo => self.session.mutate(|store| store.undo()).await,
            EditorCommand::Redo => self.session.mutate(|store| store.redo()).await,
            EditorCommand::DeleteSelection => {
                self.session.mutate(|store| store.delete_selection()).await
            }
        };
        Ok(CommandOutcome::Applied(applied))
    }

    /// Applies `patch` locally and pushes it straight to the remote store.
    ///
    /// Reverted if the remote store refuses it.
    pub async fn update_node_remote(&self, id: &NodeId, patch: NodePatch) -> Result<Node, SyncError> {
        if id.is_temporary() {
            return Err(SyncError::TemporaryEntity(id.clone()));
        }
        let op_id = self
            .session
            .mutate(|store| -> Result<Uuid, SyncError> {
                let before = store
                    .node(id)
                    .cloned()
                    .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
                store.update_node_untracked(id, &patch)?;
                let optimistic = store.node(id).cloned().unwrap_or_else(|| before.clone());
                Ok(self.ledger().record(Operation::update(before, optimistic)))
            })
            .await?;

        match self.remote.update_node(id, &patch).await {
            Ok(node) => {
                self.commit_operation(op_id, id);
                Ok(node)
            }
            Err(e) => Err(self.rollback_operation(op_id, id, e).await),
        }
    }

    /// Removes a node locally and deletes it on the remote store right away.
    ///
    /// Reinstated, with its edges, if the remote store refuses it.
    pub async fn delete_node_remote(&self, id: &NodeId) -> Result<(), SyncError> {
        if id.is_temporary() {
            return Err(SyncError::TemporaryEntity(id.clone()));
        }
        let op_id = self
            .session
            .mutate(|store| -> Result<Uuid, SyncError> {
                let (node, edges) = store.remove_node_untracked(id)?;
                Ok(self.ledger().record(Operation::delete(node, edges)))
            })
            .await?;

        match self.remote.delete_node(id).await {
            Ok(()) => {
                self.commit_operation(op_id, id);
                Ok(())
            }
            // Already gone remotely: the local state is what we wanted.
            Err(e) if e.is_not_found() => {
                self.commit_operation(op_id, id);
                Ok(())
            }
            Err(e) => Err(self.rollback_operation(op_id, id, e).await),
        }
    }

    fn commit_operation(&self, op_id: Uuid, id: &NodeId) {
        self.ledger().settle(&op_id, OperationState::Committed);
        self.events.emit(SyncEvent::OperationCommitted {
            operation_id: op_id,
            node_id: id.clone(),
        });
    }

    async fn rollback_operation(&self, op_id: Uuid, id: &NodeId, e: RemoteError) -> SyncError {
        let operation = self.ledger().settle(&op_id, OperationState::RolledBack);
        let restored = match operation {
            Some(operation) => {
                self.session
                    .mutate(|store| rollback(&operation, store))
                    .await
            }
            None => false,
        };
        warn!(node_id = %id, error = %e, restored, "Remote operation failed; rolled back");
        self.events.emit(SyncEvent::OperationRolledBack {
            operation_id: op_id,
            node_id: id.clone(),
            error: e.to_string(),
            restored,
        });
        SyncError::OperationFailed {
            entity: id.clone(),
            source: e,
        }
    }
}
