use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use super::LayoutConfig;
use crate::graph_utils::graph::{Edge, EdgeType, Graph, Marker, Node, Position};

pub const CHRONOLOGICAL_LABEL: &str = "chronological";

/// Parse the date forms found in node metadata: ISO dates, RFC 3339
/// timestamps (with or without offset), US `M/D/YYYY` and bare years.
pub fn parse_date(raw: &str) -> Option<Date> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let iso = format_description!("[year]-[month]-[day]");
    if let Ok(d) = Date::parse(s, iso) {
        return Some(d);
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt.date());
    }
    // Timestamps without an offset: the leading date is enough
    if let Some(head) = s.get(..10)
        && s.as_bytes().get(10) == Some(&b'T')
        && let Ok(d) = Date::parse(head, iso)
    {
        return Some(d);
    }
    let us = format_description!("[month padding:none]/[day padding:none]/[year]");
    if let Ok(d) = Date::parse(s, us) {
        return Some(d);
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.len() <= 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i32>().ok().and_then(|y| Date::from_calendar_date(y, Month::January, 1).ok());
    }
    None
}

pub fn node_date(node: &Node) -> Option<Date> {
    node.data.date().and_then(parse_date)
}

/// Indices into `nodes` in ascending date order. Undated nodes come first;
/// ties keep array order.
pub fn chronological_order(nodes: &[Node]) -> Vec<usize> {
    let keys: Vec<Option<Date>> = nodes.iter().map(node_date).collect();
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| keys[i]);
    order
}

// Consecutive along x, alternating above (even rank) and below (odd rank) the center line.
pub fn slot_position(rank: usize, config: &LayoutConfig) -> Position {
    let x = config.timeline_start_x + rank as f64 * config.timeline_step;
    let y = if rank % 2 == 0 {
        config.timeline_center_y - config.timeline_offset
    } else {
        config.timeline_center_y + config.timeline_offset
    };
    Position::new(x, y)
}

pub fn chain_edges(nodes: &[Node], order: &[usize]) -> Vec<Edge> {
    order
        .windows(2)
        .map(|pair| {
            let (a, b) = (&nodes[pair[0]].id, &nodes[pair[1]].id);
            Edge::new(format!("timeline-{}-{}", a, b), a.clone(), b.clone(), EdgeType::Timeline)
                .animated()
                .with_marker_end(Marker::closed())
                .with_label(CHRONOLOGICAL_LABEL)
        })
        .collect()
}

/// Drop every `timeline` edge and append a fresh chain along `order`.
/// Returns the number of chain edges written.
pub fn relink(graph: &mut Graph, order: &[usize]) -> usize {
    let chain = chain_edges(&graph.nodes, order);
    let before = graph.edges.len();
    graph.edges.retain(|e| e.kind != EdgeType::Timeline);
    log::debug!(
        "timeline relink: removed {} edges, adding {}",
        before - graph.edges.len(),
        chain.len()
    );
    let added = chain.len();
    graph.edges.extend(chain);
    added
}
