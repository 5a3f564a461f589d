use crate::model::{EdgeId, NodeId};
use thiserror::Error;

/// Why a candidate connection was refused.
///
/// Resolved at the point of the attempted edit; these never reach the pending-change pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cannot connect a node to itself")]
    SelfLoop,
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Connection already exists")]
    AlreadyConnected,
    #[error("Maximum connections reached ({max})")]
    MaxConnectionsReached { max: usize },
}

impl ValidationError {
    pub fn max_connections_reached(&self) -> bool {
        matches!(self, ValidationError::MaxConnectionsReached { .. })
    }
}

/// Errors raised by buffer mutations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("connection rejected: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid custom color {0:?}")]
    InvalidColor(String),
}
