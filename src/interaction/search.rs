use crate::graph_utils::graph::{Node, NodeId, NodeStyle};

pub const DIMMED_OPACITY: f32 = 0.2;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub matched: Vec<NodeId>,
    pub dimmed: Vec<NodeId>,
}

// Case-insensitive containment in label or description.
pub fn matches(node: &Node, needle_lower: &str) -> bool {
    node.data.label.to_lowercase().contains(needle_lower)
        || node
            .data
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(needle_lower))
            .unwrap_or(false)
}

/// Mark every node matched (opaque) or dimmed. An empty query clears all
/// dimming. Depends only on the query and each node's own text.
pub fn highlight(nodes: &mut [Node], query: &str) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();
    if query.is_empty() {
        for node in nodes.iter_mut() {
            node.style = None;
            outcome.matched.push(node.id.clone());
        }
        return outcome;
    }
    let needle = query.to_lowercase();
    for node in nodes.iter_mut() {
        if matches(node, &needle) {
            node.style = Some(NodeStyle { opacity: 1.0 });
            outcome.matched.push(node.id.clone());
        } else {
            node.style = Some(NodeStyle { opacity: DIMMED_OPACITY });
            outcome.dimmed.push(node.id.clone());
        }
    }
    outcome
}

pub fn is_dimmed(node: &Node) -> bool {
    node.opacity() < 1.0
}
