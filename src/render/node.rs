use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};

use super::RenderContext;
use super::palette::{self, Swatch};
use crate::graph_utils::graph::{Node, NodeData, NodeId, NodeType, SizeClass};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeShape {
    RoundedBox,
    Document,
    EventCard,
    Circle,
    Pin,
    Plain,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleKind {
    Source,
    Target,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleSide {
    Top,
    Bottom,
}

/// Fixed connection point on a node body, in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Handle {
    pub kind: HandleKind,
    pub side: HandleSide,
    pub pos: Pos2,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeVisual {
    pub id: NodeId,
    pub kind: NodeType,
    pub shape: NodeShape,
    // World rect; a node's position is its top-left corner
    pub rect: Rect,
    pub swatch: Swatch,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub caption: Option<String>,
    pub opacity: f32,
    pub handles: [Handle; 2],
}

impl NodeVisual {
    pub fn handle(&self, kind: HandleKind) -> &Handle {
        match kind {
            HandleKind::Target => &self.handles[0],
            HandleKind::Source => &self.handles[1],
        }
    }
}

/// Edge length of a concept box. A non-zero importance wins over the size
/// class: below 5 is small, below 8 medium, else large.
pub fn node_size(data: &NodeData) -> f32 {
    if let Some(importance) = data.importance.filter(|i| *i != 0.0 && i.is_finite()) {
        return if importance < 5.0 { 120.0 } else if importance < 8.0 { 160.0 } else { 200.0 };
    }
    match data.size {
        Some(SizeClass::Small) => 120.0,
        Some(SizeClass::Large) => 200.0,
        Some(SizeClass::Medium) | None => 160.0,
    }
}

fn build(node: &Node, ctx: &RenderContext, shape: NodeShape, size: Vec2, swatch: Swatch, handle_color: Color32) -> NodeVisual {
    let min = pos2(node.position.x as f32, node.position.y as f32);
    let rect = Rect::from_min_size(min, size * ctx.node_scale);
    let handles = [
        Handle { kind: HandleKind::Target, side: HandleSide::Top, pos: rect.center_top(), color: handle_color },
        Handle { kind: HandleKind::Source, side: HandleSide::Bottom, pos: rect.center_bottom(), color: handle_color },
    ];
    NodeVisual {
        id: node.id.clone(),
        kind: node.kind,
        shape,
        rect,
        swatch,
        title: node.data.label.clone(),
        description: node.data.description.clone().filter(|d| !d.is_empty()),
        icon: None,
        badge: None,
        caption: None,
        opacity: node.opacity(),
        handles,
    }
}

const HANDLE_GRAY: Color32 = Color32::from_rgb(0x6b, 0x72, 0x80);

pub fn concept(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let side = node_size(&node.data);
    let swatch = palette::category_swatch(node.data.category.as_deref(), ctx.theme);
    build(node, ctx, NodeShape::RoundedBox, Vec2::splat(side), swatch, HANDLE_GRAY)
}

pub fn document(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let swatch = palette::fixed_swatch(0xffffff, 0x9ca3af, 0x1f2937, ctx.theme);
    let mut v = build(node, ctx, NodeShape::Document, vec2(180.0, 120.0), swatch, HANDLE_GRAY);
    v.icon = Some("≡".into());
    v
}

pub fn event(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let swatch = palette::fixed_swatch(0xfffbeb, 0xf59e0b, 0x92400e, ctx.theme);
    let mut v = build(node, ctx, NodeShape::EventCard, vec2(200.0, 110.0), swatch, palette::AMBER);
    v.badge = Some(node.data.category.clone().filter(|c| !c.is_empty()).unwrap_or_else(|| "Event".into()));
    v.caption = node.data.date().map(str::to_string);
    v
}

pub fn person(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let swatch = palette::fixed_swatch(0xeff6ff, 0x60a5fa, 0x1e3a8a, ctx.theme);
    let mut v = build(node, ctx, NodeShape::Circle, Vec2::splat(180.0), swatch, Color32::from_rgb(0x60, 0xa5, 0xfa));
    // Initial of the label as the avatar glyph
    v.icon = node.data.label.chars().next().map(|c| c.to_uppercase().collect());
    v
}

pub fn place(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let swatch = palette::fixed_swatch(0xecfdf5, 0x10b981, 0x065f46, ctx.theme);
    let mut v = build(node, ctx, NodeShape::Pin, vec2(160.0, 100.0), swatch, Color32::from_rgb(0x10, 0xb9, 0x81));
    v.icon = Some("⌖".into());
    v
}

/// Variant for any type without a registered renderer.
pub fn fallback(node: &Node, ctx: &RenderContext) -> NodeVisual {
    let swatch = palette::category_swatch(None, ctx.theme);
    build(node, ctx, NodeShape::Plain, vec2(150.0, 40.0), swatch, HANDLE_GRAY)
}
