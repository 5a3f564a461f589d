use lore_canvas::{
    Connection, ConnectionType, Edge, EdgeData, EdgeId, EditorConfig, GraphBuffer, Node, NodeId,
    NodeKind, PendingChangeSet, Position,
};
use loremap_core::store::keys;
use loremap_core::{
    EditorSession, Hydration, MemoryCache, MemoryRemoteStore, PersistenceBridge, SqliteCache,
    SyncError, SyncEvent, SyncEventBus,
};
use std::sync::Arc;
use std::time::Duration;

fn bridge(cache: &MemoryCache) -> Arc<PersistenceBridge> {
    Arc::new(PersistenceBridge::new(Arc::new(cache.clone())))
}

fn sample_map() -> GraphBuffer {
    let nodes = vec![
        Node::new("1", NodeKind::Character, "Aria"),
        Node::new("2", NodeKind::City, "Port").at(Position::new(200.0, 0.0)),
    ];
    let edges = vec![Edge {
        id: EdgeId::new("e1"),
        source: NodeId::from("1"),
        target: NodeId::from("2"),
        source_handle: None,
        target_handle: None,
        data: EdgeData::new(ConnectionType::Residence),
    }];
    GraphBuffer::new(nodes, edges)
}

#[tokio::test]
async fn test_empty_cache_requests_remote_load_once() {
    let cache = MemoryCache::new();
    let bridge = bridge(&cache);

    assert_eq!(bridge.hydrate().await, Hydration::NeedsRemote);
    assert!(bridge.take_remote_load_request());
    assert!(!bridge.take_remote_load_request());
}

#[tokio::test]
async fn test_empty_blobs_without_pending_count_as_empty_cache() {
    let cache = MemoryCache::new();
    cache.insert(keys::NODES, "[]");
    cache.insert(keys::EDGES, "[]");

    assert_eq!(bridge(&cache).hydrate().await, Hydration::NeedsRemote);
}

#[tokio::test]
async fn test_corrupt_graph_blob_falls_back_to_remote() {
    let cache = MemoryCache::new();
    cache.insert(keys::NODES, "{not json");
    cache.insert(keys::EDGES, "[]");
    let bridge = bridge(&cache);

    assert_eq!(bridge.hydrate().await, Hydration::NeedsRemote);
    assert!(bridge.take_remote_load_request());
}

#[tokio::test]
async fn test_corrupt_pending_blob_starts_clean() {
    let map = sample_map();
    let cache = MemoryCache::new();
    cache.insert(keys::NODES, serde_json::to_string(&map.nodes).unwrap());
    cache.insert(keys::EDGES, serde_json::to_string(&map.edges).unwrap());
    cache.insert(keys::PENDING_CHANGES, "[1, 2");
    let bridge = bridge(&cache);

    match bridge.hydrate().await {
        Hydration::Cached { buffer, pending } => {
            assert_eq!(buffer, map);
            assert_eq!(pending, PendingChangeSet::default());
        }
        Hydration::NeedsRemote => panic!("graph blobs were valid"),
    }
    assert!(!bridge.take_remote_load_request());
}

#[tokio::test]
async fn test_dangling_cached_edges_are_dropped() {
    let map = sample_map();
    let cache = MemoryCache::new();
    cache.insert(keys::NODES, serde_json::to_string(&map.nodes[..1]).unwrap());
    cache.insert(keys::EDGES, serde_json::to_string(&map.edges).unwrap());

    match bridge(&cache).hydrate().await {
        Hydration::Cached { buffer, .. } => {
            assert_eq!(buffer.nodes.len(), 1);
            assert!(buffer.edges.is_empty());
        }
        Hydration::NeedsRemote => panic!("nodes were cached"),
    }
}

#[tokio::test]
async fn test_open_loads_remote_when_cache_is_empty() {
    let cache = MemoryCache::new();
    let remote = MemoryRemoteStore::default().with_map(sample_map());
    let events = SyncEventBus::default();
    let mut rx = events.subscribe();

    let session = EditorSession::open(bridge(&cache), &remote, EditorConfig::default(), &events)
        .await
        .unwrap();

    assert_eq!(session.snapshot().await, sample_map());
    assert!(!session.has_unsaved_changes().await);
    assert_eq!(rx.try_recv().unwrap(), SyncEvent::RemoteLoadRequested);

    // The loaded map is mirrored so the next start hydrates locally
    session.bridge().flush().await;
    let reopened = PersistenceBridge::new(Arc::new(cache.clone()));
    assert!(matches!(reopened.hydrate().await, Hydration::Cached { .. }));
}

#[tokio::test]
async fn test_open_prefers_cache_over_remote() {
    let cache = MemoryCache::new();
    let first = EditorSession::open(
        bridge(&cache),
        &MemoryRemoteStore::default().with_map(sample_map()),
        EditorConfig::default(),
        &SyncEventBus::default(),
    )
    .await
    .unwrap();
    first
        .mutate(|store| store.add_node(Node::new("temp_9", NodeKind::Event, "Flood")))
        .await
        .unwrap();
    first.bridge().flush().await;

    let offline = MemoryRemoteStore::default();
    offline.set_offline(true);
    let second = EditorSession::open(bridge(&cache), &offline, EditorConfig::default(), &SyncEventBus::default())
        .await
        .unwrap();

    assert_eq!(second.snapshot().await.nodes.len(), 3);
    let pending = second.read(|s| s.pending().clone()).await;
    assert!(pending.new_nodes.contains(&NodeId::from("temp_9")));
}

#[tokio::test]
async fn test_open_fails_when_remote_load_fails() {
    let remote = MemoryRemoteStore::default();
    remote.set_offline(true);

    let result = EditorSession::open(
        bridge(&MemoryCache::new()),
        &remote,
        EditorConfig::default(),
        &SyncEventBus::default(),
    )
    .await;

    assert!(matches!(result, Err(SyncError::LoadFailed(_))));
}

#[tokio::test]
async fn test_mutations_are_mirrored_with_pending_changes() {
    let cache = MemoryCache::new();
    let session = EditorSession::open(
        bridge(&cache),
        &MemoryRemoteStore::default().with_map(sample_map()),
        EditorConfig::default(),
        &SyncEventBus::default(),
    )
    .await
    .unwrap();

    session
        .mutate(|store| {
            store.add_node(Node::new("temp_1", NodeKind::Faction, "Order"))?;
            store.commit_edge(Connection::new("1", "temp_1"), None)
        })
        .await
        .unwrap();
    session.bridge().flush().await;

    let pending: PendingChangeSet =
        serde_json::from_str(&cache.peek(keys::PENDING_CHANGES).unwrap()).unwrap();
    assert!(pending.new_nodes.contains(&NodeId::from("temp_1")));
    assert_eq!(pending.new_edges.len(), 1);
    assert!(cache.peek(keys::NODES).unwrap().contains("temp_1"));
    assert_eq!(
        serde_json::from_str::<Vec<serde_json::Value>>(&cache.peek(keys::EDGES).unwrap())
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_cache_write_failures_never_block_editing() {
    let cache = MemoryCache::new();
    let session = EditorSession::open(
        bridge(&cache),
        &MemoryRemoteStore::default().with_map(sample_map()),
        EditorConfig::default(),
        &SyncEventBus::default(),
    )
    .await
    .unwrap();
    session.bridge().flush().await;
    cache.fail_writes(true);

    session
        .mutate(|store| store.add_node(Node::new("temp_1", NodeKind::Location, "Crown")))
        .await
        .unwrap();
    session.bridge().flush().await;

    assert!(session.bridge().write_failures() > 0);
    assert_eq!(session.snapshot().await.nodes.len(), 3);
    assert!(!cache.peek(keys::NODES).unwrap().contains("Crown"));
}

#[tokio::test]
async fn test_settings_round_trip() {
    let cache = MemoryCache::new();
    let bridge = bridge(&cache);
    assert_eq!(bridge.load_settings().await, Default::default());

    bridge.save_snap_to_grid(true);
    bridge.save_auto_save(false, Duration::from_secs(45));
    bridge.flush().await;

    let settings = bridge.load_settings().await;
    assert_eq!(settings.snap_to_grid, Some(true));
    assert_eq!(settings.auto_save_enabled, Some(false));
    assert_eq!(settings.auto_save_interval, Some(Duration::from_secs(45)));
    assert_eq!(settings.last_saved, None);
}

#[tokio::test]
async fn test_oversized_interval_saturates() {
    let cache = MemoryCache::new();
    let bridge = bridge(&cache);

    bridge.save_auto_save(true, Duration::MAX);
    bridge.flush().await;

    assert_eq!(cache.peek(keys::AUTO_SAVE_INTERVAL), Some(u64::MAX.to_string()));
    assert_eq!(
        bridge.load_settings().await.auto_save_interval,
        Some(Duration::from_millis(u64::MAX))
    );
}

#[tokio::test]
async fn test_corrupt_setting_is_ignored() {
    let cache = MemoryCache::new();
    cache.insert(keys::SNAP_TO_GRID, "maybe");

    assert_eq!(bridge(&cache).load_settings().await.snap_to_grid, None);
}

#[tokio::test]
async fn test_open_applies_persisted_snap_to_grid() {
    let cache = MemoryCache::new();
    let remote = MemoryRemoteStore::default().with_map(sample_map());
    let first = EditorSession::open(bridge(&cache), &remote, EditorConfig::default(), &SyncEventBus::default())
        .await
        .unwrap();
    first.set_snap_to_grid(true).await;
    first.bridge().flush().await;

    let second = EditorSession::open(bridge(&cache), &remote, EditorConfig::default(), &SyncEventBus::default())
        .await
        .unwrap();
    assert!(second.read(|s| s.config().snap_to_grid).await);
}

#[tokio::test]
async fn test_sqlite_cache_survives_a_restart() {
    let cache = SqliteCache::new("sqlite::memory:").await.unwrap();
    let first = PersistenceBridge::new(Arc::new(cache.clone()));
    let session = EditorSession::open(
        Arc::new(first),
        &MemoryRemoteStore::default().with_map(sample_map()),
        EditorConfig::default(),
        &SyncEventBus::default(),
    )
    .await
    .unwrap();
    session
        .mutate(|store| store.add_node(Node::new("temp_1", NodeKind::Location, "Vault")))
        .await
        .unwrap();
    session.bridge().flush().await;

    let reopened = PersistenceBridge::new(Arc::new(cache));
    match reopened.hydrate().await {
        Hydration::Cached { buffer, pending } => {
            assert_eq!(buffer, session.snapshot().await);
            assert!(pending.new_nodes.contains(&NodeId::from("temp_1")));
        }
        Hydration::NeedsRemote => panic!("sqlite cache should hydrate"),
    }
}
