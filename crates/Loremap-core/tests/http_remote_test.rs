use lore_canvas::{GraphBuffer, GraphStateStore, Node, NodeId, NodeKind, NodePatch, Position};
use loremap_core::api::CreateNodeRequest;
use loremap_core::{
    EditorSession, HttpRemoteStore, MemoryCache, PersistenceBridge, RemoteError, RemoteStore,
    SaveOutcome, SyncCoordinator, SyncEventBus,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn node_json(id: &str, kind: &str, name: &str) -> serde_json::Value {
    json!({ "id": id, "type": kind, "name": name, "position": { "x": 0.0, "y": 0.0 } })
}

async fn setup() -> (MockServer, HttpRemoteStore) {
    let server = MockServer::start().await;
    let store = HttpRemoteStore::new(&format!("{}/api", server.uri()), Duration::from_secs(5))
        .expect("valid base url");
    (server, store)
}

#[tokio::test]
async fn test_list_nodes_filters_by_type() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/nodes"))
        .and(query_param("type", "city"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([node_json("3", "city", "Port")])))
        .expect(1)
        .mount(&server)
        .await;

    let nodes = store.list_nodes(Some(NodeKind::City)).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, NodeId::from("3"));
    assert_eq!(nodes[0].kind, NodeKind::City);
}

#[tokio::test]
async fn test_create_node_returns_canonical_id() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/nodes"))
        .and(body_partial_json(json!({ "name": "Aria", "type": "character" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(node_json("42", "character", "Aria")))
        .expect(1)
        .mount(&server)
        .await;

    let draft = Node::draft(NodeKind::Character, "Aria", Position::new(10.0, 20.0));
    let created = store.create_node(&CreateNodeRequest::from(&draft)).await.unwrap();
    assert_eq!(created.id, NodeId::from("42"));
    assert!(!created.id.is_temporary());
}

#[tokio::test]
async fn test_update_sends_partial_body() {
    let (server, store) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/api/nodes/42"))
        .and(body_partial_json(json!({ "name": "Harbor" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_json("42", "city", "Harbor")))
        .mount(&server)
        .await;

    let patch = NodePatch {
        name: Some("Harbor".into()),
        ..Default::default()
    };
    let node = store.update_node(&NodeId::from("42"), &patch).await.unwrap();
    assert_eq!(node.name, "Harbor");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/edges"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/nodes/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    match store.list_edges().await {
        Err(RemoteError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    let err = store.delete_node(&NodeId::from("9")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_replace_map_and_health() {
    let (server, store) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/api/map"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    store.replace_map(&GraphBuffer::default()).await.unwrap();
    assert!(!store.health().await.unwrap());
}

#[tokio::test]
async fn test_load_map_fetches_nodes_and_edges() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            node_json("1", "character", "Aria"),
            node_json("2", "faction", "Order"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/edges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "e1",
            "source": "1",
            "target": "2",
            "sourceHandle": "1-right",
            "targetHandle": "2-left",
            "data": { "type": "membership", "strength": "strong" }
        }])))
        .mount(&server)
        .await;

    let map = store.load_map().await.unwrap();
    assert_eq!(map.nodes.len(), 2);
    assert_eq!(map.edges[0].source_handle.as_deref(), Some("1-right"));
}

#[tokio::test]
async fn test_save_over_http() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/nodes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(node_json("42", "event", "Flood")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/map"))
        .and(body_partial_json(json!({ "nodes": [{ "id": "42", "name": "Flood" }] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = Arc::new(PersistenceBridge::new(Arc::new(MemoryCache::new())));
    let session = EditorSession::from_store(GraphStateStore::default(), bridge);
    session
        .mutate(|s| s.add_node(Node::new("temp_1", NodeKind::Event, "Flood")))
        .await
        .unwrap();
    let coordinator = SyncCoordinator::new(session, Arc::new(store), SyncEventBus::default());

    let outcome = coordinator.save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));
    assert_eq!(coordinator.session().snapshot().await.nodes[0].id, NodeId::from("42"));
}
