use lore_canvas::{GraphError, NodeId};
use thiserror::Error;

/// Failures talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote store answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("remote store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid remote url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }
}

/// Errors surfaced by the sync engine.
///
/// Partial create failures are not errors: they are reported in the save report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The bulk write failed. Every pending change is still queued.
    #[error("save failed: {0}")]
    SaveFailed(#[source] RemoteError),
    #[error("loading the map failed: {0}")]
    LoadFailed(#[source] RemoteError),
    #[error("remote operation on {entity} failed: {source}")]
    OperationFailed {
        entity: NodeId,
        #[source]
        source: RemoteError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("node {0} has not been saved yet")]
    TemporaryEntity(NodeId),
}
