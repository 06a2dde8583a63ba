use serde_json::json;

use super::graph::{Edge, EdgeType, Graph, Marker, Metadata, Node, NodeData, NodeType, Position, SizeClass};

fn concept(id: &str, kind: NodeType, x: f64, y: f64, label: &str, category: &str, importance: f64) -> Node {
    let data = NodeData {
        label: label.to_string(),
        category: Some(category.to_string()),
        importance: Some(importance),
        ..Default::default()
    };
    Node::new(id, kind, Position::new(x, y), data)
}

fn system_meta(created: &str) -> Metadata {
    let mut m = Metadata::new();
    m.insert("createdDate".into(), json!(created));
    m.insert("author".into(), json!("System"));
    m
}

fn hierarchical(id: &str, source: &str, target: &str, marker: f32) -> Edge {
    Edge::new(id, source, target, EdgeType::Hierarchical).with_marker_end(Marker::closed_sized(marker))
}

/// Starting diagram shown when there is no saved session.
pub fn seed_graph() -> Graph {
    let mut main = concept("node-1", NodeType::Concept, 250.0, 150.0, "Main Concept", "primary", 1.0);
    main.data.description = Some("The central concept of the visualization".into());
    main.data.size = Some(SizeClass::Large);
    main.data.metadata = system_meta("2023-10-15");

    let mut related_a = concept("node-2", NodeType::Concept, 100.0, 300.0, "Related Concept A", "secondary", 0.8);
    related_a.data.description = Some("A concept related to the main concept".into());
    related_a.data.metadata = system_meta("2023-10-16");

    let mut related_b = concept("node-3", NodeType::Concept, 400.0, 300.0, "Related Concept B", "tertiary", 0.8);
    related_b.data.description = Some("Another concept related to the main concept".into());
    related_b.data.metadata = system_meta("2023-10-16");

    let mut connected = concept("node-8", NodeType::Concept, 600.0, 200.0, "Connected Concept", "quaternary", 0.7);
    connected.data.description = Some("A concept connected through a network relationship".into());

    let group = Node::new("node-9", NodeType::Group, Position::new(500.0, 500.0), NodeData::labeled("Grouped Concepts"));

    let mut grouped_a = concept("node-10", NodeType::Concept, 50.0, 50.0, "Grouped A", "success", 0.7);
    grouped_a.parent_id = Some("node-9".into());
    let mut grouped_b = concept("node-11", NodeType::Concept, 200.0, 100.0, "Grouped B", "info", 0.7);
    grouped_b.parent_id = Some("node-9".into());

    let nodes = vec![
        main,
        related_a,
        related_b,
        concept("node-4", NodeType::SubConcept, 50.0, 450.0, "Subconcept A1", "secondary", 0.6),
        concept("node-5", NodeType::SubConcept, 175.0, 450.0, "Subconcept A2", "secondary", 0.6),
        concept("node-6", NodeType::SubConcept, 350.0, 450.0, "Subconcept B1", "tertiary", 0.6),
        concept("node-7", NodeType::SubConcept, 475.0, 450.0, "Subconcept B2", "tertiary", 0.6),
        connected,
        group,
        grouped_a,
        grouped_b,
    ];

    let edges = vec![
        hierarchical("edge-1-2", "node-1", "node-2", 20.0).with_label("Parent-Child"),
        hierarchical("edge-1-3", "node-1", "node-3", 20.0).with_label("Parent-Child"),
        hierarchical("edge-2-4", "node-2", "node-4", 15.0),
        hierarchical("edge-2-5", "node-2", "node-5", 15.0),
        hierarchical("edge-3-6", "node-3", "node-6", 15.0),
        hierarchical("edge-3-7", "node-3", "node-7", 15.0),
        Edge::new("edge-1-8", "node-1", "node-8", EdgeType::Network).animated().with_label("Related"),
        Edge::new("edge-8-3", "node-8", "node-3", EdgeType::Network).animated(),
        Edge::new("edge-3-10", "node-3", "node-10", EdgeType::Network),
        Edge::new("edge-7-11", "node-7", "node-11", EdgeType::Network),
    ];

    Graph::from_parts(nodes, edges)
}
