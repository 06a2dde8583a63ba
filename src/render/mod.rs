//! Render adapter: maps node and edge types to visual variants.
//!
//! Nothing here paints; it produces plain descriptions (`NodeVisual`,
//! `EdgeVisual`) in world coordinates that the egui front end draws. The theme
//! travels in `RenderContext` instead of living in global state.

pub mod edge;
pub mod node;
pub mod palette;
pub mod theme;

use std::collections::HashMap;

use crate::graph_utils::graph::{Edge, EdgeId, EdgeType, Graph, Node, NodeType};
use edge::{EdgeVisual, Endpoints};
use node::{HandleKind, NodeVisual};
use theme::Theme;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderContext {
    pub theme: Theme,
    pub node_scale: f32,
    pub edge_thickness: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { theme: Theme::Light, node_scale: 1.0, edge_thickness: 1.0 }
    }
}

pub type NodeRenderer = fn(&Node, &RenderContext) -> NodeVisual;
pub type EdgeRenderer = fn(&Edge, Endpoints, &RenderContext, bool) -> EdgeVisual;

/// Type -> renderer tables with a default variant for anything unregistered.
#[derive(Clone)]
pub struct RenderRegistry {
    nodes: HashMap<NodeType, NodeRenderer>,
    edges: HashMap<EdgeType, EdgeRenderer>,
    node_fallback: NodeRenderer,
    edge_fallback: EdgeRenderer,
}

impl Default for RenderRegistry {
    fn default() -> Self {
        let mut r = Self::empty();
        r.register_node(NodeType::Concept, node::concept);
        r.register_node(NodeType::Document, node::document);
        r.register_node(NodeType::Event, node::event);
        r.register_node(NodeType::Person, node::person);
        r.register_node(NodeType::Place, node::place);
        r.register_edge(EdgeType::Dashed, edge::dashed);
        r.register_edge(EdgeType::Glowing, edge::glowing);
        r.register_edge(EdgeType::Timeline, edge::timeline);
        r.register_edge(EdgeType::Hierarchical, edge::hierarchical);
        r.register_edge(EdgeType::Network, edge::network);
        r.register_edge(EdgeType::Bidirectional, edge::bidirectional);
        r.register_edge(EdgeType::Gradient, edge::gradient);
        r
    }
}

impl RenderRegistry {
    // No registered variants; everything renders with the fallbacks
    pub fn empty() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            node_fallback: node::fallback,
            edge_fallback: edge::plain,
        }
    }

    pub fn register_node(&mut self, kind: NodeType, renderer: NodeRenderer) {
        self.nodes.insert(kind, renderer);
    }

    pub fn register_edge(&mut self, kind: EdgeType, renderer: EdgeRenderer) {
        self.edges.insert(kind, renderer);
    }

    pub fn has_node_renderer(&self, kind: NodeType) -> bool {
        self.nodes.contains_key(&kind)
    }

    pub fn render_node(&self, node: &Node, ctx: &RenderContext) -> NodeVisual {
        let f = self.nodes.get(&node.kind).copied().unwrap_or(self.node_fallback);
        f(node, ctx)
    }

    pub fn render_edge(&self, edge: &Edge, source: &NodeVisual, target: &NodeVisual, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
        let ends = Endpoints {
            from: source.handle(HandleKind::Source).pos,
            to: target.handle(HandleKind::Target).pos,
        };
        let f = self.edges.get(&edge.kind).copied().unwrap_or(self.edge_fallback);
        f(edge, ends, ctx, hovered)
    }
}

/// Everything needed to draw one frame. Edges with a missing endpoint are skipped.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub nodes: Vec<NodeVisual>,
    pub edges: Vec<EdgeVisual>,
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&NodeVisual> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeVisual> {
        self.edges.iter().find(|e| e.id == id)
    }
}

pub fn build_scene(graph: &Graph, registry: &RenderRegistry, ctx: &RenderContext, hovered_edge: Option<&EdgeId>) -> Scene {
    let nodes: Vec<NodeVisual> = graph.nodes.iter().map(|n| registry.render_node(n, ctx)).collect();
    let index: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, v)| (v.id.as_str(), i)).collect();
    let edges = graph
        .edges
        .iter()
        .filter_map(|e| {
            let s = index.get(e.source.as_str())?;
            let t = index.get(e.target.as_str())?;
            let hovered = hovered_edge == Some(&e.id);
            Some(registry.render_edge(e, &nodes[*s], &nodes[*t], ctx, hovered))
        })
        .collect();
    Scene { nodes, edges }
}
