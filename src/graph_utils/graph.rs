use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Basic type aliases for clarity
pub type NodeId = String;
pub type EdgeId = String;
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Visual type of a node. The set is closed; anything else is coerced at the
/// parsing boundary (see `sources::llm`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    #[default]
    Concept,
    Document,
    Event,
    Person,
    Place,
    Date,
    Group,
    SubConcept,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        NodeType::Concept,
        NodeType::Document,
        NodeType::Event,
        NodeType::Person,
        NodeType::Place,
        NodeType::Date,
        NodeType::Group,
        NodeType::SubConcept,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Concept => "concept",
            NodeType::Document => "document",
            NodeType::Event => "event",
            NodeType::Person => "person",
            NodeType::Place => "place",
            NodeType::Date => "date",
            NodeType::Group => "group",
            NodeType::SubConcept => "subConcept",
        }
    }

    // Lenient: ignores case and '-'/'_' so "sub-concept" and "SubConcept" both parse.
    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .flat_map(|c| c.to_lowercase())
            .collect();
        NodeType::ALL.into_iter().find(|t| t.as_str().to_lowercase() == norm)
    }

    /// Type given to a node created by hand from its category tag.
    pub fn for_category(category: &str) -> Self {
        match category {
            "event" => NodeType::Event,
            "person" => NodeType::Person,
            _ => NodeType::Concept,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeType {
    #[default]
    Default,
    Dashed,
    Glowing,
    Timeline,
    Hierarchical,
    Network,
    Bidirectional,
    Gradient,
}

impl EdgeType {
    pub const ALL: [EdgeType; 8] = [
        EdgeType::Default,
        EdgeType::Dashed,
        EdgeType::Glowing,
        EdgeType::Timeline,
        EdgeType::Hierarchical,
        EdgeType::Network,
        EdgeType::Bidirectional,
        EdgeType::Gradient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Default => "default",
            EdgeType::Dashed => "dashed",
            EdgeType::Glowing => "glowing",
            EdgeType::Timeline => "timeline",
            EdgeType::Hierarchical => "hierarchical",
            EdgeType::Network => "network",
            EdgeType::Bidirectional => "bidirectional",
            EdgeType::Gradient => "gradient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase();
        EdgeType::ALL.into_iter().find(|t| t.as_str() == norm)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "small" => Some(SizeClass::Small),
            "medium" => Some(SizeClass::Medium),
            "large" => Some(SizeClass::Large),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl NodeData {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self { label: label.into(), ..Default::default() }
    }

    /// Raw `metadata.date` when it is a non-empty string.
    pub fn date(&self) -> Option<&str> {
        self.metadata
            .get("date")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub opacity: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub kind: NodeType,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    // Written by search highlighting; absent means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<NodeStyle>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeType, position: Position, data: NodeData) -> Self {
        Self { id: id.into(), kind, position, data, parent_id: None, style: None }
    }

    pub fn opacity(&self) -> f32 {
        self.style.map(|s| s.opacity).unwrap_or(1.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    #[serde(rename = "arrow")]
    Arrow,
    #[serde(rename = "arrowclosed")]
    ArrowClosed,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl Marker {
    pub fn closed() -> Self {
        Self { kind: MarkerKind::ArrowClosed, width: None, height: None }
    }

    pub fn closed_sized(size: f32) -> Self {
        Self { kind: MarkerKind::ArrowClosed, width: Some(size), height: Some(size) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EdgeData {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type", default)]
    pub kind: EdgeType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "EdgeData::is_empty")]
    pub data: EdgeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<Marker>,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>, kind: EdgeType) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            animated: false,
            data: EdgeData::default(),
            marker_start: None,
            marker_end: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = Some(label.into());
        self
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }

    pub fn with_marker_end(mut self, marker: Marker) -> Self {
        self.marker_end = Some(marker);
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.data.label.as_deref()
    }
}

/// The graph store: ordered nodes and edges. Order matters to the layouts
/// (radial and timeline tie-breaks follow array order).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    // Insert a node if its id is free
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    // Insert an edge if its id is free and both ends exist
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.edges.iter().any(|e| e.id == edge.id) {
            return false;
        }
        if !self.contains_node(&edge.source) || !self.contains_node(&edge.target) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.edges.len() }

    pub fn count_edges_of(&self, kind: EdgeType) -> usize {
        self.edges.iter().filter(|e| e.kind == kind).count()
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    // Edges whose source or target is not in the store
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let ids = self.node_ids();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.edges.iter().filter(|e| e.source == id || e.target == id).count()
    }

    /// Axis-aligned (min, max) corners of all node positions.
    pub fn bounds(&self) -> Option<(Position, Position)> {
        let first = self.nodes.first()?.position;
        let (mut min, mut max) = (first, first);
        for n in &self.nodes[1..] {
            min.x = min.x.min(n.position.x);
            min.y = min.y.min(n.position.y);
            max.x = max.x.max(n.position.x);
            max.y = max.y.max(n.position.y);
        }
        Some((min, max))
    }

    pub fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = format!("node-{}", Uuid::now_v7());
            if !self.contains_node(&id) {
                return id;
            }
        }
    }

    // Ids that appear more than once; empty for a well-formed store
    pub fn duplicate_node_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for n in &self.nodes {
            if !seen.insert(n.id.as_str()) {
                dups.push(n.id.as_str());
            }
        }
        dups
    }
}
