//! Layout engine.
//!
//! Every algorithm is a synchronous function over the current node and edge
//! arrays. Layouts only ever write `Node::position` (the timeline layout also
//! rebuilds its own chronological edge chain); ids and payloads are untouched.
//! Malformed input never fails: dangling edges are ignored and unparseable
//! dates count as undated.

pub mod hierarchical;
pub mod radial;
pub mod random;
pub mod timeline;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::{Graph, Position};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    // Uniform random scatter; there is no spring/repulsion simulation behind the name.
    #[default]
    Force,
    Hierarchical,
    Radial,
    Timeline,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 4] = [LayoutKind::Force, LayoutKind::Hierarchical, LayoutKind::Radial, LayoutKind::Timeline];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutKind::Force => "force",
            LayoutKind::Hierarchical => "hierarchical",
            LayoutKind::Radial => "radial",
            LayoutKind::Timeline => "timeline",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            LayoutKind::Force => "Force",
            LayoutKind::Hierarchical => "Hierarchical",
            LayoutKind::Radial => "Radial",
            LayoutKind::Timeline => "Timeline",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_lowercase();
        LayoutKind::ALL
            .into_iter()
            .find(|k| k.as_str() == norm || (norm == "random" && *k == LayoutKind::Force))
            .ok_or_else(|| anyhow::anyhow!("unknown layout '{}' (expected force, hierarchical, radial or timeline)", s))
    }
}

/// Geometry constants for every algorithm, plus the optional scatter seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub seed: Option<u64>,
    pub scatter_width: f64,
    pub scatter_height: f64,
    pub radial_center: Position,
    pub radial_radius: f64,
    pub tree_width: f64,
    pub level_gap: f64,
    pub timeline_start_x: f64,
    pub timeline_step: f64,
    pub timeline_center_y: f64,
    pub timeline_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: None,
            scatter_width: 800.0,
            scatter_height: 600.0,
            radial_center: Position::new(500.0, 400.0),
            radial_radius: 300.0,
            tree_width: 1000.0,
            level_gap: 200.0,
            timeline_start_x: 100.0,
            timeline_step: 200.0,
            timeline_center_y: 300.0,
            timeline_offset: 100.0,
        }
    }
}

/// What a layout pass did, for status reporting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub kind: LayoutKind,
    pub positioned: usize,
    // Nodes the pass could not reach (hierarchical cycles without a root)
    pub untouched: usize,
    pub chronological_edges: usize,
}

pub fn apply_layout(graph: &mut Graph, kind: LayoutKind, config: &LayoutConfig) -> LayoutReport {
    let mut report = LayoutReport { kind, ..Default::default() };
    match kind {
        LayoutKind::Force => {
            let positions = random::scatter(graph.nodes.len(), config);
            write_positions(graph, &positions);
            report.positioned = positions.len();
        }
        LayoutKind::Radial => {
            let positions = radial::ring(graph.nodes.len(), config.radial_center, config.radial_radius);
            write_positions(graph, &positions);
            report.positioned = positions.len();
        }
        LayoutKind::Hierarchical => {
            let placed = hierarchical::place(&graph.nodes, &graph.edges, config);
            for node in graph.nodes.iter_mut() {
                if let Some(slot) = placed.get(&node.id) {
                    node.position = slot.position;
                }
            }
            report.positioned = placed.len();
            report.untouched = graph.nodes.len() - placed.len();
        }
        LayoutKind::Timeline => {
            let order = timeline::chronological_order(&graph.nodes);
            for (rank, &idx) in order.iter().enumerate() {
                graph.nodes[idx].position = timeline::slot_position(rank, config);
            }
            report.chronological_edges = timeline::relink(graph, &order);
            report.positioned = order.len();
        }
    }
    log::debug!(
        "applied {} layout: {} positioned, {} untouched",
        kind,
        report.positioned,
        report.untouched
    );
    report
}

fn write_positions(graph: &mut Graph, positions: &[Position]) {
    for (node, pos) in graph.nodes.iter_mut().zip(positions) {
        node.position = *pos;
    }
}
