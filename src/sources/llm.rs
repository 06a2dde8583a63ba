//! Request/response contract of the graph-synthesis cloud function, and the
//! validation pass that turns its best-effort JSON into a well-formed graph.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::historical::{Timeline, TimelineEvent};
use crate::graph_utils::graph::{
    Edge, EdgeData, EdgeType, Graph, Marker, Metadata, Node, NodeData, NodeType, Position, SizeClass,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SynthesisRequest {
    Historical {
        timelines: Vec<Timeline>,
        events: Vec<TimelineEvent>,
    },
    Text {
        #[serde(rename = "userText")]
        user_text: String,
    },
}

/// What the validation pass had to repair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoercionReport {
    pub coerced_node_types: usize,
    pub coerced_edge_types: usize,
    pub generated_ids: usize,
    pub dropped_nodes: usize,
    pub dropped_edges: usize,
    pub placed_nodes: usize,
}

// Outermost {...} span, for replies that wrap the JSON in prose or code fences
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

/// Parse a synthesizer reply. Returns `None` when nothing usable (no node
/// array, or no nodes survive validation) is found.
pub fn parse_graph_response(body: &str) -> Option<(Graph, CoercionReport)> {
    let value = match serde_json::from_str::<Value>(body.trim()) {
        Ok(Value::String(inner)) => extract_object(&inner)?,
        Ok(v @ Value::Object(_)) => v,
        _ => extract_object(body)?,
    };
    if let Some(err) = value.get("error").and_then(Value::as_str) {
        log::warn!("synthesizer reported an error: {}", err);
        return None;
    }
    let (graph, report) = coerce_graph(&value)?;
    if graph.nodes.is_empty() { None } else { Some((graph, report)) }
}

fn extract_object(text: &str) -> Option<Value> {
    let m = JSON_OBJECT.find(text)?;
    serde_json::from_str(m.as_str()).ok()
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

// Ids may arrive as numbers
fn id_field(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn grid_position(i: usize) -> Position {
    Position::new(100.0 + (i % 5) as f64 * 220.0, 100.0 + (i / 5) as f64 * 180.0)
}

fn position_field(v: &Value) -> Option<Position> {
    let p = v.get("position")?;
    let x = p.get("x")?.as_f64()?;
    let y = p.get("y")?.as_f64()?;
    (x.is_finite() && y.is_finite()).then(|| Position::new(x, y))
}

fn coerce_node(v: &Value, index: usize, report: &mut CoercionReport) -> Node {
    let id = id_field(v, "id").unwrap_or_else(|| {
        report.generated_ids += 1;
        format!("node-{}", index + 1)
    });

    let kind = match str_field(v, "type").and_then(NodeType::parse) {
        Some(k) => k,
        None => {
            report.coerced_node_types += 1;
            log::debug!("node {}: type {:?} coerced to concept", id, v.get("type"));
            NodeType::Concept
        }
    };

    let position = position_field(v).unwrap_or_else(|| {
        report.placed_nodes += 1;
        grid_position(index)
    });

    let empty = Value::Null;
    let d = v.get("data").unwrap_or(&empty);
    let mut metadata: Metadata = d
        .get("metadata")
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    // Importance is sometimes nested in metadata instead of data
    let importance = d
        .get("importance")
        .and_then(Value::as_f64)
        .or_else(|| metadata.get("importance").and_then(Value::as_f64));
    metadata.retain(|_, v| !v.is_null());

    let label = str_field(d, "label")
        .or_else(|| str_field(v, "label"))
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());

    let data = NodeData {
        id: Some(id.clone()),
        label,
        description: str_field(d, "description").map(str::to_string),
        category: str_field(d, "category").map(str::to_string),
        size: str_field(d, "size").and_then(SizeClass::parse),
        importance,
        metadata,
    };
    let mut node = Node::new(id, kind, position, data);
    node.parent_id = id_field(v, "parentId");
    node
}

fn coerce_edge(v: &Value, index: usize, report: &mut CoercionReport) -> Option<Edge> {
    let source = id_field(v, "source")?;
    let target = id_field(v, "target")?;
    let id = id_field(v, "id").unwrap_or_else(|| {
        report.generated_ids += 1;
        format!("edge-{}", index + 1)
    });
    let kind = match v.get("type") {
        None | Some(Value::Null) => EdgeType::Default,
        Some(t) => t.as_str().and_then(EdgeType::parse).unwrap_or_else(|| {
            report.coerced_edge_types += 1;
            EdgeType::Default
        }),
    };
    let label = v
        .get("data")
        .and_then(|d| str_field(d, "label"))
        .or_else(|| str_field(v, "label"))
        .map(str::to_string);
    let marker = |key: &str| v.get(key).and_then(|m| serde_json::from_value::<Marker>(m.clone()).ok());
    Some(Edge {
        id,
        source,
        target,
        kind,
        animated: v.get("animated").and_then(Value::as_bool).unwrap_or(false),
        data: EdgeData { label },
        marker_start: marker("markerStart"),
        marker_end: marker("markerEnd"),
    })
}

/// Validation step: invalid or missing node types become `concept`, unknown
/// edge types `default`; duplicate ids and edges with a missing endpoint are
/// dropped; nodes without a usable position are put on a grid.
pub fn coerce_graph(value: &Value) -> Option<(Graph, CoercionReport)> {
    let raw_nodes = value.get("nodes")?.as_array()?;
    let mut report = CoercionReport::default();
    let mut graph = Graph::new();

    for (i, rn) in raw_nodes.iter().enumerate() {
        if !rn.is_object() {
            report.dropped_nodes += 1;
            continue;
        }
        let node = coerce_node(rn, i, &mut report);
        if !graph.insert_node(node) {
            report.dropped_nodes += 1;
        }
    }

    let raw_edges = value.get("edges").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut seen_edge_ids: HashSet<String> = HashSet::new();
    for (i, re) in raw_edges.iter().enumerate() {
        let Some(mut edge) = coerce_edge(re, i, &mut report) else {
            report.dropped_edges += 1;
            continue;
        };
        if !seen_edge_ids.insert(edge.id.clone()) {
            edge.id = format!("{}-{}", edge.id, i + 1);
            seen_edge_ids.insert(edge.id.clone());
        }
        if !graph.insert_edge(edge) {
            report.dropped_edges += 1;
        }
    }

    if report != CoercionReport::default() {
        log::info!("synthesized graph repaired: {:?}", report);
    }
    Some((graph, report))
}
