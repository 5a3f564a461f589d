//! # Remote Store
//!
//! The REST backend that owns canonical node ids and the authoritative copy of the map.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use lore_canvas::{ConnectionDirection, Edge, GraphBuffer, Node, NodeId, NodeKind, Position};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

pub use http::HttpRemoteStore;
pub use lore_canvas::NodePatch as UpdateNodeRequest;
pub use memory::MemoryRemoteStore;

/// Body of `POST /nodes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_direction: Option<ConnectionDirection>,
}

impl From<&Node> for CreateNodeRequest {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            kind: node.kind,
            description: node.description.clone(),
            position: Some(node.position),
            connection_direction: Some(node.connection_direction),
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET /nodes[?type=]`
    async fn list_nodes(&self, kind: Option<NodeKind>) -> Result<Vec<Node>, RemoteError>;

    /// `POST /nodes`. Returns the node under its canonical id.
    async fn create_node(&self, request: &CreateNodeRequest) -> Result<Node, RemoteError>;

    /// `PUT /nodes/{id}` with a partial body.
    async fn update_node(
        &self,
        id: &NodeId,
        patch: &UpdateNodeRequest,
    ) -> Result<Node, RemoteError>;

    /// `DELETE /nodes/{id}`
    async fn delete_node(&self, id: &NodeId) -> Result<(), RemoteError>;

    /// `GET /edges`
    async fn list_edges(&self) -> Result<Vec<Edge>, RemoteError>;

    /// `PUT /map`: replaces the whole stored map with `map`.
    async fn replace_map(&self, map: &GraphBuffer) -> Result<(), RemoteError>;

    /// `GET /health`
    async fn health(&self) -> Result<bool, RemoteError>;

    /// Fetches nodes and edges together.
    async fn load_map(&self) -> Result<GraphBuffer, RemoteError> {
        let (nodes, edges) = futures::try_join!(self.list_nodes(None), self.list_edges())?;
        Ok(GraphBuffer::new(nodes, edges))
    }
}
