use serde::{Deserialize, Serialize};
use serde_json::json;
use time::macros::format_description;

use crate::graph_utils::graph::{Edge, EdgeType, Graph, Marker, Node, NodeData, NodeType, Position, SizeClass};
use crate::layout::timeline::parse_date;

/// Row of the `timelines` collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Row of the `timeline_events` collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    #[serde(default)]
    pub timeline_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub timelines: Vec<Timeline>,
    pub events: Vec<TimelineEvent>,
}

pub fn timeline_node_id(timeline_id: &str) -> String {
    format!("timeline-{}", timeline_id)
}

pub fn event_node_id(event_id: &str) -> String {
    format!("event-{}", event_id)
}

/// ISO `YYYY-MM-DD` when the date parses, otherwise the trimmed input.
pub fn normalize_date(raw: &str) -> String {
    let fmt = format_description!("[year]-[month]-[day]");
    parse_date(raw)
        .and_then(|d| d.format(fmt).ok())
        .unwrap_or_else(|| raw.trim().to_string())
}

fn non_empty(s: &str, fallback: &str) -> String {
    let t = s.trim();
    if t.is_empty() { fallback.to_string() } else { t.to_string() }
}

/// Deterministic graph for when the synthesizer is unavailable: one node per
/// timeline, one per event, `contains` links from timeline to event and a
/// `followed by` chain through each timeline's events in date order.
pub fn simple_visualization(data: &HistoricalData) -> Graph {
    let mut graph = Graph::new();

    for (i, t) in data.timelines.iter().enumerate() {
        let id = timeline_node_id(&t.id);
        let node = Node::new(
            id.clone(),
            NodeType::Concept,
            Position::new(100.0, 100.0 + i as f64 * 200.0),
            NodeData {
                id: Some(id),
                label: non_empty(&t.title, "Timeline"),
                description: Some(t.description.clone().unwrap_or_default()),
                category: Some("primary".into()),
                size: Some(SizeClass::Large),
                ..Default::default()
            },
        );
        graph.insert_node(node);
    }

    for (i, ev) in data.events.iter().enumerate() {
        let id = event_node_id(&ev.id);
        let mut data = NodeData {
            id: Some(id.clone()),
            label: non_empty(&ev.title, "Event"),
            description: Some(ev.description.clone().unwrap_or_default()),
            category: Some("event".into()),
            size: Some(SizeClass::Medium),
            ..Default::default()
        };
        let date = ev.date.as_deref().map(normalize_date).unwrap_or_default();
        data.metadata.insert("date".into(), json!(date));
        data.metadata.insert(
            "category".into(),
            json!(ev.category.clone().filter(|c| !c.is_empty()).unwrap_or_else(|| "historical".into())),
        );
        let position = Position::new(400.0 + (i % 3) as f64 * 200.0, 100.0 + (i / 3) as f64 * 150.0);
        graph.insert_node(Node::new(id, NodeType::Event, position, data));
    }

    // Links are only added when both ends made it into the graph
    for ev in &data.events {
        if let Some(tid) = ev.timeline_id.as_deref().filter(|t| !t.is_empty()) {
            let edge = Edge::new(
                format!("edge-timeline-{}-event-{}", tid, ev.id),
                timeline_node_id(tid),
                event_node_id(&ev.id),
                EdgeType::Timeline,
            )
            .animated()
            .with_marker_end(Marker::closed())
            .with_label("contains");
            graph.insert_edge(edge);
        }
    }

    for (_, mut events) in events_by_timeline(&data.events) {
        events.sort_by_key(|e| e.date.as_deref().and_then(parse_date));
        for pair in events.windows(2) {
            let edge = Edge::new(
                format!("edge-chrono-{}-{}", pair[0].id, pair[1].id),
                event_node_id(&pair[0].id),
                event_node_id(&pair[1].id),
                EdgeType::Dashed,
            )
            .animated()
            .with_label("followed by");
            graph.insert_edge(edge);
        }
    }

    graph
}

// Grouped in order of first appearance
fn events_by_timeline(events: &[TimelineEvent]) -> Vec<(&str, Vec<&TimelineEvent>)> {
    let mut groups: Vec<(&str, Vec<&TimelineEvent>)> = Vec::new();
    for ev in events {
        let Some(tid) = ev.timeline_id.as_deref().filter(|t| !t.is_empty()) else { continue };
        match groups.iter_mut().find(|(k, _)| *k == tid) {
            Some((_, list)) => list.push(ev),
            None => groups.push((tid, vec![ev])),
        }
    }
    groups
}
