use lore_canvas::{
    CandidateEdge, ConnectionType, ConnectionValidator, Edge, EdgeData, EdgeId, Node, NodeId,
    NodeKind, ValidationError,
};

fn edge(id: &str, source: &str, target: &str, ty: ConnectionType) -> Edge {
    Edge {
        id: EdgeId::from(id),
        source: NodeId::from(source),
        target: NodeId::from(target),
        source_handle: None,
        target_handle: None,
        data: EdgeData::new(ty),
    }
}

fn world() -> Vec<Node> {
    vec![
        Node::new("aria", NodeKind::Character, "Aria"),
        Node::new("bren", NodeKind::Character, "Bren"),
        Node::new("f1", NodeKind::Faction, "Wardens"),
        Node::new("f2", NodeKind::Faction, "Tide Guild"),
        Node::new("f3", NodeKind::Faction, "Ash Court"),
        Node::new("f4", NodeKind::Faction, "Lantern Order"),
        Node::new("port", NodeKind::City, "Port"),
        Node::new("keep", NodeKind::City, "Keep"),
        Node::new("siege", NodeKind::Event, "Siege"),
        Node::new("well", NodeKind::Location, "Old Well"),
        Node::new("gate", NodeKind::Location, "Gate"),
    ]
}

#[test]
fn test_self_loop_is_rejected() {
    let nodes = world();
    let validator = ConnectionValidator::new(&nodes, &[]);
    assert_eq!(
        validator.validate(&CandidateEdge::new("aria", "aria")),
        Err(ValidationError::SelfLoop)
    );
}

#[test]
fn test_unknown_endpoint_is_rejected() {
    let nodes = world();
    let validator = ConnectionValidator::new(&nodes, &[]);
    assert_eq!(
        validator.validate(&CandidateEdge::new("aria", "ghost")),
        Err(ValidationError::UnknownNode(NodeId::from("ghost")))
    );
}

#[test]
fn test_membership_cardinality() {
    let nodes = world();
    let mut edges = Vec::new();

    // A character may join three factions...
    for (i, faction) in ["f1", "f2", "f3"].iter().enumerate() {
        let validator = ConnectionValidator::new(&nodes, &edges);
        let suggested = validator
            .validate(&CandidateEdge::new("aria", *faction))
            .unwrap();
        assert_eq!(suggested, ConnectionType::Membership);
        edges.push(edge(&format!("e{i}"), "aria", faction, suggested));
    }

    // ...but not a fourth
    let validator = ConnectionValidator::new(&nodes, &edges);
    let report = validator.check(&CandidateEdge::new("aria", "f4"));
    assert!(!report.is_valid);
    assert!(report.max_connections_reached);
    assert_eq!(report.suggested_type, None);

    // Another character is unaffected
    assert!(validator.check(&CandidateEdge::new("bren", "f4")).is_valid);
}

#[test]
fn test_residence_limit_ignores_unrelated_edges() {
    let nodes = world();
    let edges = vec![
        edge("e1", "aria", "f1", ConnectionType::Membership),
        edge("e2", "aria", "siege", ConnectionType::Participation),
    ];
    let validator = ConnectionValidator::new(&nodes, &edges);
    assert_eq!(
        validator.validate(&CandidateEdge::new("aria", "port")),
        Ok(ConnectionType::Residence)
    );

    let edges = vec![edge("e1", "aria", "port", ConnectionType::Residence)];
    let validator = ConnectionValidator::new(&nodes, &edges);
    assert_eq!(
        validator.validate(&CandidateEdge::new("aria", "keep")),
        Err(ValidationError::MaxConnectionsReached { max: 1 })
    );
}

#[test]
fn test_trade_is_directional() {
    let nodes = world();
    let edges = vec![edge("e1", "port", "keep", ConnectionType::Trade)];
    let validator = ConnectionValidator::new(&nodes, &edges);

    assert_eq!(
        validator.validate(&CandidateEdge::new("port", "keep")),
        Err(ValidationError::AlreadyConnected)
    );
    assert_eq!(
        validator.validate(&CandidateEdge::new("keep", "port")),
        Ok(ConnectionType::Trade)
    );
}

#[test]
fn test_friendship_exists_both_ways() {
    let nodes = world();
    let edges = vec![edge("e1", "aria", "bren", ConnectionType::Friendship)];
    let validator = ConnectionValidator::new(&nodes, &edges);
    assert_eq!(
        validator.validate(&CandidateEdge::new("bren", "aria")),
        Err(ValidationError::AlreadyConnected)
    );
}

#[test]
fn test_event_happens_in_one_place() {
    let nodes = world();
    let edges = vec![edge("e1", "siege", "well", ConnectionType::Location)];
    let validator = ConnectionValidator::new(&nodes, &edges);
    let report = validator.check(&CandidateEdge::new("siege", "gate"));
    assert!(report.max_connections_reached);
    assert_eq!(report.reason.as_deref(), Some("Maximum connections reached (1)"));
}

#[test]
fn test_wildcard_rules_and_fallback() {
    let nodes = world();
    let validator = ConnectionValidator::new(&nodes, &[]);

    // faction -> location resolves through the any -> location rule
    assert_eq!(
        validator.validate(&CandidateEdge::new("f1", "well")),
        Ok(ConnectionType::Location)
    );
    // location -> city has no rule at all
    assert_eq!(
        validator.validate(&CandidateEdge::new("well", "port")),
        Ok(ConnectionType::Custom)
    );
}

#[test]
fn test_suggestions_skip_self_and_full_targets() {
    let nodes = world();
    let edges = vec![edge("e1", "aria", "port", ConnectionType::Residence)];
    let validator = ConnectionValidator::new(&nodes, &edges);
    let suggestions = validator.suggest_connections(&NodeId::from("aria"));

    let targets: Vec<&str> = suggestions.iter().map(|s| s.target.as_str()).collect();
    assert!(!targets.contains(&"aria"));
    assert!(!targets.contains(&"port"));
    assert!(!targets.contains(&"keep"));
    assert!(targets.contains(&"f1"));

    let bren = suggestions
        .iter()
        .find(|s| s.target.as_str() == "bren")
        .unwrap();
    assert_eq!(bren.suggested_type, ConnectionType::Friendship);
}

#[test]
fn test_reversed_membership_respects_cap() {
    let mut nodes = world();
    nodes.push(Node::new("cora", NodeKind::Character, "Cora"));
    nodes.push(Node::new("dax", NodeKind::Character, "Dax"));
    let mut edges = Vec::new();

    // faction -> character resolves to the character -> faction rule when drawn both ways
    for (i, member) in ["aria", "bren", "cora"].iter().enumerate() {
        let validator = ConnectionValidator::new(&nodes, &edges);
        let candidate = CandidateEdge::new("f1", *member).bidirectional(true);
        assert_eq!(validator.validate(&candidate), Ok(ConnectionType::Membership));
        let mut e = edge(&format!("m{i}"), "f1", member, ConnectionType::Membership);
        e.data = EdgeData::new(ConnectionType::Membership).bidirectional(true);
        edges.push(e);
    }

    let validator = ConnectionValidator::new(&nodes, &edges);
    let fourth = CandidateEdge::new("f1", "dax").bidirectional(true);
    assert_eq!(
        validator.validate(&fourth),
        Err(ValidationError::MaxConnectionsReached { max: 3 })
    );
    assert!(validator.check(&fourth).max_connections_reached);

    // the faction's own alliances are a different kind at the far end
    edges.push(edge("a1", "f1", "f2", ConnectionType::Alliance));
    let validator = ConnectionValidator::new(&nodes, &edges);
    assert!(validator.validate(&CandidateEdge::new("f1", "f3")).is_ok());
}
