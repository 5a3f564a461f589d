//! # Core Data Models
//!
//! This module defines the world graph: typed nodes (characters, factions, cities,
//! events, locations) and the typed relationships between them.
//!
//! Every entity is identified by a string id. Ids minted on the client carry the
//! [`TEMP_ID_PREFIX`] until the remote store acknowledges them and hands back a
//! canonical id.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GraphError;

/// Prefix reserved for client-minted node ids that the remote store has never seen.
pub const TEMP_ID_PREFIX: &str = "temp_";

const EDGE_ID_PREFIX: &str = "edge_";

/// Identifier of a Node.
///
/// Either temporary (`temp_...`, minted locally) or canonical (assigned by the remote store).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh temporary id.
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    /// True if the remote store has not yet acknowledged this id.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of an Edge.
///
/// Edge ids are client-minted and stable; the bulk map write accepts them verbatim.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("{EDGE_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The kind of world entity a node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Character,
    Faction,
    City,
    Event,
    Location,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Character,
        NodeKind::Faction,
        NodeKind::City,
        NodeKind::Event,
        NodeKind::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Character => "character",
            NodeKind::Faction => "faction",
            NodeKind::City => "city",
            NodeKind::Event => "event",
            NodeKind::Location => "location",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// World-space position of a node (top-left corner).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rounds the position to the nearest multiple of `grid`.
    pub fn snapped(self, grid: f32) -> Self {
        if grid <= 0.0 {
            return self;
        }
        let v = Vec2::from(self);
        ((v / grid).round() * grid).into()
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Position> for Vec2 {
    fn from(p: Position) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// Which sides of a node expose connection handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDirection {
    #[default]
    All,
    Vertical,
    Horizontal,
}

impl ConnectionDirection {
    pub fn sides(&self) -> &'static [HandleSide] {
        match self {
            ConnectionDirection::All => &[
                HandleSide::Top,
                HandleSide::Right,
                HandleSide::Bottom,
                HandleSide::Left,
            ],
            ConnectionDirection::Vertical => &[HandleSide::Top, HandleSide::Bottom],
            ConnectionDirection::Horizontal => &[HandleSide::Left, HandleSide::Right],
        }
    }
}

/// A connection point on one side of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandleSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleSide::Top => "top",
            HandleSide::Right => "right",
            HandleSide::Bottom => "bottom",
            HandleSide::Left => "left",
        }
    }
}

/// Builds the handle identifier for `side` of `node`: `"{nodeId}-{side}"`.
///
/// The node id is embedded so that handles stay unique across nodes; it has to be
/// rewritten whenever the node id changes (see [`crate::remap`]).
pub fn handle_id(node: &NodeId, side: HandleSide) -> String {
    format!("{}-{}", node, side.as_str())
}

/// A Node in the world graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub connection_direction: ConnectionDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: None,
            position: Position::default(),
            connection_direction: ConnectionDirection::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// A brand new node with a freshly minted temporary id.
    pub fn draft(kind: NodeKind, name: impl Into<String>, position: Position) -> Self {
        Self::new(NodeId::temporary(), kind, name).at(position)
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_direction(mut self, direction: ConnectionDirection) -> Self {
        self.connection_direction = direction;
        self
    }

    pub fn handle(&self, side: HandleSide) -> Option<String> {
        self.connection_direction
            .sides()
            .contains(&side)
            .then(|| handle_id(&self.id, side))
    }
}

/// A partial update to a node. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    /// `Some(None)` clears the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_direction: Option<ConnectionDirection>,
}

impl NodePatch {
    /// Applies the patch, returning true if anything actually changed.
    pub fn apply_to(&self, node: &mut Node) -> bool {
        let before = node.clone();
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(description) = &self.description {
            node.description = description.clone();
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(direction) = self.connection_direction {
            node.connection_direction = direction;
        }
        *node != before
    }
}

/// Relationship type between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Friendship,
    Family,
    Romance,
    Rivalry,
    Alliance,
    Enmity,
    Membership,
    Leadership,
    Residence,
    Participation,
    Control,
    Trade,
    Location,
    Custom,
}

/// Strength of a relationship.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    #[default]
    Moderate,
    Strong,
}

/// A validated `#rgb` / `#rrggbb` color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomColor(String);

impl CustomColor {
    pub fn parse(value: impl Into<String>) -> Result<Self, GraphError> {
        let value = value.into();
        let hex = value.strip_prefix('#').unwrap_or_default();
        let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
        if valid {
            Ok(Self(value.to_ascii_lowercase()))
        } else {
            Err(GraphError::InvalidColor(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CustomColor {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CustomColor> for String {
    fn from(color: CustomColor) -> Self {
        color.0
    }
}

/// The type-specific part of an edge payload.
///
/// Keyed by `type` on the wire. Only `custom` carries presentation overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionKind {
    Friendship,
    Family,
    Romance,
    Rivalry,
    Alliance,
    Enmity,
    Membership,
    Leadership,
    Residence,
    Participation,
    Control,
    Trade,
    Location,
    Custom {
        #[serde(
            rename = "customColor",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        color: Option<CustomColor>,
        #[serde(
            rename = "customIconName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        icon_name: Option<String>,
    },
}

impl ConnectionKind {
    pub fn custom(color: Option<CustomColor>, icon_name: Option<String>) -> Self {
        ConnectionKind::Custom { color, icon_name }
    }

    pub fn connection_type(&self) -> ConnectionType {
        match self {
            ConnectionKind::Friendship => ConnectionType::Friendship,
            ConnectionKind::Family => ConnectionType::Family,
            ConnectionKind::Romance => ConnectionType::Romance,
            ConnectionKind::Rivalry => ConnectionType::Rivalry,
            ConnectionKind::Alliance => ConnectionType::Alliance,
            ConnectionKind::Enmity => ConnectionType::Enmity,
            ConnectionKind::Membership => ConnectionType::Membership,
            ConnectionKind::Leadership => ConnectionType::Leadership,
            ConnectionKind::Residence => ConnectionType::Residence,
            ConnectionKind::Participation => ConnectionType::Participation,
            ConnectionKind::Control => ConnectionType::Control,
            ConnectionKind::Trade => ConnectionType::Trade,
            ConnectionKind::Location => ConnectionType::Location,
            ConnectionKind::Custom { .. } => ConnectionType::Custom,
        }
    }
}

impl From<ConnectionType> for ConnectionKind {
    fn from(ty: ConnectionType) -> Self {
        match ty {
            ConnectionType::Friendship => ConnectionKind::Friendship,
            ConnectionType::Family => ConnectionKind::Family,
            ConnectionType::Romance => ConnectionKind::Romance,
            ConnectionType::Rivalry => ConnectionKind::Rivalry,
            ConnectionType::Alliance => ConnectionKind::Alliance,
            ConnectionType::Enmity => ConnectionKind::Enmity,
            ConnectionType::Membership => ConnectionKind::Membership,
            ConnectionType::Leadership => ConnectionKind::Leadership,
            ConnectionType::Residence => ConnectionKind::Residence,
            ConnectionType::Participation => ConnectionKind::Participation,
            ConnectionType::Control => ConnectionKind::Control,
            ConnectionType::Trade => ConnectionKind::Trade,
            ConnectionType::Location => ConnectionKind::Location,
            ConnectionType::Custom => ConnectionKind::Custom {
                color: None,
                icon_name: None,
            },
        }
    }
}

/// Payload of an edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(flatten)]
    pub kind: ConnectionKind,
    #[serde(default)]
    pub strength: Strength,
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EdgeData {
    pub fn new(kind: impl Into<ConnectionKind>) -> Self {
        Self {
            kind: kind.into(),
            strength: Strength::default(),
            bidirectional: false,
            animated: false,
            label: None,
            description: None,
        }
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.kind.connection_type()
    }

    pub fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    pub fn with_strength(mut self, strength: Strength) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A typed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    pub data: EdgeData,
}

impl Edge {
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }
}

/// A connection request from the host: two endpoints and optional handles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_handles(mut self, source: HandleSide, target: HandleSide) -> Self {
        self.source_handle = Some(handle_id(&self.source, source));
        self.target_handle = Some(handle_id(&self.target, target));
        self
    }
}

/// The full (nodes, edges) buffer. Also the unit of a history snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBuffer {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphBuffer {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| &e.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// Removes a node and returns it, leaving incident edges in place.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| &n.id == id)?;
        Some(self.nodes.remove(idx))
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| &e.id == id)?;
        Some(self.edges.remove(idx))
    }

    /// Removes every edge touching `node` and returns them.
    pub fn remove_incident_edges(&mut self, node: &NodeId) -> Vec<Edge> {
        let (removed, kept) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.touches(node));
        self.edges = kept;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_json_uses_camel_case_and_type_key() {
        let node = Node::new("42", NodeKind::Character, "Aria")
            .with_direction(ConnectionDirection::Vertical);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "character");
        assert_eq!(json["connectionDirection"], "vertical");
        assert_eq!(json["position"]["x"], 0.0);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn edge_data_is_tagged_by_type() {
        let data = EdgeData::new(ConnectionType::Alliance).bidirectional(true);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "alliance");
        assert_eq!(json["strength"], "moderate");
        assert!(json.get("customColor").is_none());

        let custom = EdgeData::new(ConnectionKind::custom(
            Some(CustomColor::parse("#FFAA00").unwrap()),
            Some("sword".into()),
        ));
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["type"], "custom");
        assert_eq!(json["customColor"], "#ffaa00");
        assert_eq!(json["customIconName"], "sword");

        let back: EdgeData = serde_json::from_value(json).unwrap();
        assert_eq!(back, custom);
    }

    #[test]
    fn invalid_custom_color_is_rejected_on_read() {
        let json = serde_json::json!({ "type": "custom", "customColor": "blue" });
        assert!(serde_json::from_value::<EdgeData>(json).is_err());
        assert!(CustomColor::parse("#abc").is_ok());
        assert!(CustomColor::parse("#abcd").is_err());
    }

    #[test]
    fn temporary_ids_are_recognised() {
        assert!(NodeId::temporary().is_temporary());
        assert!(!NodeId::from("42").is_temporary());
    }

    #[test]
    fn handles_follow_connection_direction() {
        let node = Node::new("7", NodeKind::City, "Vel")
            .with_direction(ConnectionDirection::Horizontal);
        assert_eq!(node.handle(HandleSide::Left).as_deref(), Some("7-left"));
        assert_eq!(node.handle(HandleSide::Top), None);
    }

    #[test]
    fn snapping_rounds_to_grid() {
        let p = Position::new(22.0, 37.0).snapped(15.0);
        assert_eq!(p, Position::new(15.0, 30.0));
    }
}
