use lore_canvas::{
    Connection, EditorConfig, GraphBuffer, GraphStateStore, Node, NodeId, NodeKind, NodePatch,
    Position,
};

fn seeded() -> GraphStateStore {
    let buffer = GraphBuffer::new(
        vec![
            Node::new("1", NodeKind::City, "Harbor"),
            Node::new("2", NodeKind::City, "Ridge").at(Position::new(200.0, 0.0)),
        ],
        vec![],
    );
    GraphStateStore::from_parts(buffer, Default::default(), EditorConfig::default())
}

#[test]
fn test_undo_redo_round_trip() {
    let mut store = seeded();
    let initial = store.buffer().clone();

    // 1. Three recorded edits
    let draft = store
        .add_node(Node::draft(NodeKind::Character, "Aria", Position::new(10.0, 10.0)))
        .unwrap();
    store
        .update_node(
            &NodeId::from("1"),
            &NodePatch {
                name: Some("Old Harbor".into()),
                ..Default::default()
            },
        )
        .unwrap();
    store.commit_edge(Connection::new("1", "2"), None).unwrap();
    let edited = store.buffer().clone();
    assert_eq!(store.history().len(), 4);

    // --- UNDO ---
    assert!(store.undo());
    assert!(store.edges().is_empty());
    assert!(store.undo());
    assert_eq!(store.node(&NodeId::from("1")).unwrap().name, "Harbor");
    assert!(store.undo());
    assert_eq!(store.buffer(), &initial);
    assert!(store.node(&draft).is_none());
    assert!(!store.undo());

    // --- REDO ---
    assert!(store.redo());
    assert!(store.redo());
    assert!(store.redo());
    assert_eq!(store.buffer(), &edited);
    assert!(!store.redo());
}

#[test]
fn test_undo_of_local_add_forgets_the_pending_create() {
    let mut store = seeded();
    let draft = store
        .add_node(Node::draft(NodeKind::Faction, "Guild", Position::default()))
        .unwrap();
    assert!(store.pending().new_nodes.contains(&draft));

    store.undo();
    assert!(!store.pending().new_nodes.contains(&draft));
    assert!(store.pending().deleted_nodes.is_empty());

    // Redo brings it back as a node to create
    store.redo();
    assert!(store.pending().new_nodes.contains(&draft));
}

#[test]
fn test_undo_of_synced_delete_clears_the_deletion() {
    let mut store = seeded();
    let id = NodeId::from("2");
    store.delete_node(&id).unwrap();
    assert!(store.pending().deleted_nodes.contains(&id));

    store.undo();
    assert!(store.node(&id).is_some());
    assert!(!store.pending().deleted_nodes.contains(&id));
    assert!(store.pending().updated_nodes.contains(&id));
}

#[test]
fn test_edit_after_undo_discards_redo() {
    let mut store = seeded();
    store
        .update_node(
            &NodeId::from("1"),
            &NodePatch {
                name: Some("A".into()),
                ..Default::default()
            },
        )
        .unwrap();
    store.undo();
    store
        .update_node(
            &NodeId::from("1"),
            &NodePatch {
                name: Some("B".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!store.history().can_redo());
    assert!(!store.redo());
    assert_eq!(store.node(&NodeId::from("1")).unwrap().name, "B");
}

#[test]
fn test_history_is_bounded_by_config() {
    let config = EditorConfig {
        history_limit: 3,
        ..Default::default()
    };
    let mut store = GraphStateStore::new(config);
    for i in 0..6 {
        store
            .add_node(Node::new(format!("{i}"), NodeKind::Event, "e"))
            .unwrap();
    }
    assert_eq!(store.history().len(), 3);

    assert!(store.undo());
    assert!(store.undo());
    assert!(!store.undo());
    // Oldest reachable state still holds the first three nodes
    assert_eq!(store.nodes().len(), 4);
}

#[test]
fn test_noop_patch_records_nothing() {
    let mut store = seeded();
    let changed = store
        .update_node(
            &NodeId::from("1"),
            &NodePatch {
                name: Some("Harbor".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!changed);
    assert_eq!(store.history().len(), 1);
    assert!(!store.has_unsaved_changes());
}
