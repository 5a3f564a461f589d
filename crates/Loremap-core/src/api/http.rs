use async_trait::async_trait;
use lore_canvas::{Edge, GraphBuffer, Node, NodeId, NodeKind};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{CreateNodeRequest, RemoteStore, UpdateNodeRequest};
use crate::config::SyncConfig;
use crate::error::RemoteError;

/// [`RemoteStore`] over the JSON REST API.
#[derive(Clone, Debug)]
pub struct HttpRemoteStore {
    client: Client,
    base: Url,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::Unavailable(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Unavailable(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RemoteError> {
        Ok(Self::send(request).await?.json::<T>().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_nodes(&self, kind: Option<NodeKind>) -> Result<Vec<Node>, RemoteError> {
        let mut request = self.client.get(self.endpoint(&["nodes"])?);
        if let Some(kind) = kind {
            request = request.query(&[("type", kind.as_str())]);
        }
        Self::send_json(request).await
    }

    async fn create_node(&self, body: &CreateNodeRequest) -> Result<Node, RemoteError> {
        debug!(name = %body.name, kind = %body.kind, "POST /nodes");
        Self::send_json(self.client.post(self.endpoint(&["nodes"])?).json(body)).await
    }

    async fn update_node(
        &self,
        id: &NodeId,
        patch: &UpdateNodeRequest,
    ) -> Result<Node, RemoteError> {
        let url = self.endpoint(&["nodes", id.as_str()])?;
        Self::send_json(self.client.put(url).json(patch)).await
    }

    async fn delete_node(&self, id: &NodeId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["nodes", id.as_str()])?;
        Self::send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list_edges(&self) -> Result<Vec<Edge>, RemoteError> {
        Self::send_json(self.client.get(self.endpoint(&["edges"])?)).await
    }

    async fn replace_map(&self, map: &GraphBuffer) -> Result<(), RemoteError> {
        debug!(nodes = map.nodes.len(), edges = map.edges.len(), "PUT /map");
        Self::send(self.client.put(self.endpoint(&["map"])?).json(map)).await?;
        Ok(())
    }

    async fn health(&self) -> Result<bool, RemoteError> {
        let response = self.client.get(self.endpoint(&["health"])?).send().await?;
        Ok(response.status().is_success())
    }
}
