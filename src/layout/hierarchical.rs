use std::collections::{HashMap, HashSet};

use super::LayoutConfig;
use crate::graph_utils::graph::{Edge, Node, NodeId, Position};

/// Where the tree walk put a node: its depth, the horizontal span it owns
/// (fractions of the full width) and the resulting position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Slot {
    pub level: usize,
    pub span: (f64, f64),
    pub position: Position,
}

// Nodes with no incoming edge, in array order. Edges with a missing endpoint do not count.
pub fn roots<'a>(nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let has_incoming: HashSet<&str> = edges
        .iter()
        .filter(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
        .map(|e| e.target.as_str())
        .collect();
    nodes.iter().filter(|n| !has_incoming.contains(n.id.as_str())).collect()
}

/// Top-down placement from the roots. Nodes that are never reached (members
/// of a cycle with no root above it) are absent from the result and keep
/// whatever position they had.
pub fn place(nodes: &[Node], edges: &[Edge], config: &LayoutConfig) -> HashMap<NodeId, Slot> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for e in edges {
        if ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()) {
            children.entry(e.source.as_str()).or_default().push(e.target.as_str());
        }
    }

    let roots = roots(nodes, edges);
    let root_count = roots.len() as f64;

    // Depth-first with an explicit stack; the visited set is what stops cycles.
    let mut stack: Vec<(&str, usize, f64, f64)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(i, n)| (n.id.as_str(), 0usize, i as f64 / root_count, (i + 1) as f64 / root_count))
        .collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut placed: HashMap<NodeId, Slot> = HashMap::new();

    while let Some((id, level, lo, hi)) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let center = (lo + hi) / 2.0;
        let position = Position::new(center * config.tree_width, level as f64 * config.level_gap);
        placed.insert(id.to_string(), Slot { level, span: (lo, hi), position });

        if let Some(kids) = children.get(id) {
            let width = (hi - lo) / kids.len() as f64;
            for (j, kid) in kids.iter().enumerate().rev() {
                if visited.contains(kid) {
                    continue;
                }
                let kid_lo = lo + j as f64 * width;
                stack.push((*kid, level + 1, kid_lo, kid_lo + width));
            }
        }
    }

    placed
}
