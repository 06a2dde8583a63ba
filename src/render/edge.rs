use egui::{Color32, Pos2, pos2};

use super::RenderContext;
use super::palette;
use crate::graph_utils::graph::{Edge, EdgeId, EdgeType, Marker, MarkerKind};

const BEZIER_SAMPLES: usize = 32;
const BEZIER_CURVATURE: f32 = 0.25;
const STEP_OFFSET: f32 = 20.0;
const STEP_RADIUS: f32 = 5.0;
// Collapsed labels keep this many characters before the ellipsis
pub const LABEL_COLLAPSED_CHARS: usize = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CurveKind {
    Bezier,
    SmoothStep,
}

/// Source handle and target handle of one edge, world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Endpoints {
    pub from: Pos2,
    pub to: Pos2,
}

impl Endpoints {
    pub fn midpoint(&self) -> Pos2 {
        pos2((self.from.x + self.to.x) / 2.0, (self.from.y + self.to.y) / 2.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeLabel {
    pub text: String,
    pub anchor: Pos2,
    pub expanded: bool,
    pub background: Color32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeVisual {
    pub id: EdgeId,
    pub kind: EdgeType,
    pub curve: CurveKind,
    pub points: Vec<Pos2>,
    pub width: f32,
    pub color: Color32,
    // Second stop of a color gradient along the path
    pub gradient_to: Option<Color32>,
    // (dash, gap) lengths
    pub dash: Option<(f32, f32)>,
    pub glow: bool,
    pub animated: bool,
    pub marker_start: Option<Marker>,
    pub marker_end: Option<Marker>,
    pub label: Option<EdgeLabel>,
}

// Distance the bezier control point is pulled away from its handle.
fn control_offset(distance: f32) -> f32 {
    if distance >= 0.0 {
        0.5 * distance
    } else {
        BEZIER_CURVATURE * 25.0 * (-distance).sqrt()
    }
}

/// Cubic bezier leaving the source downward and entering the target from above.
pub fn bezier_path(ends: Endpoints) -> Vec<Pos2> {
    let Endpoints { from, to } = ends;
    let dy = to.y - from.y;
    let c1 = pos2(from.x, from.y + control_offset(dy));
    let c2 = pos2(to.x, to.y - control_offset(dy));
    (0..=BEZIER_SAMPLES)
        .map(|i| {
            let t = i as f32 / BEZIER_SAMPLES as f32;
            let u = 1.0 - t;
            let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            pos2(
                a * from.x + b * c1.x + c * c2.x + d * to.x,
                a * from.y + b * c1.y + c * c2.y + d * to.y,
            )
        })
        .collect()
}

/// Orthogonal path with rounded corners. When the target sits below the
/// source the turn happens halfway down; otherwise the path steps out by a
/// fixed offset on both ends and crosses over at the horizontal midpoint.
pub fn smooth_step_path(ends: Endpoints) -> Vec<Pos2> {
    let Endpoints { from, to } = ends;
    let mut corners = vec![from];
    if to.y >= from.y + 2.0 * STEP_OFFSET {
        let mid_y = (from.y + to.y) / 2.0;
        corners.push(pos2(from.x, mid_y));
        corners.push(pos2(to.x, mid_y));
    } else {
        let mid_x = (from.x + to.x) / 2.0;
        let below = from.y + STEP_OFFSET;
        let above = to.y - STEP_OFFSET;
        corners.push(pos2(from.x, below));
        corners.push(pos2(mid_x, below));
        corners.push(pos2(mid_x, above));
        corners.push(pos2(to.x, above));
    }
    corners.push(to);
    corners.dedup();
    round_corners(&corners, STEP_RADIUS)
}

fn round_corners(points: &[Pos2], radius: f32) -> Vec<Pos2> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for w in points.windows(3) {
        let (a, b, c) = (w[0], w[1], w[2]);
        let r = radius.min(a.distance(b) / 2.0).min(b.distance(c) / 2.0);
        if r <= f32::EPSILON {
            out.push(b);
            continue;
        }
        let p1 = b + (a - b).normalized() * r;
        let p2 = b + (c - b).normalized() * r;
        for k in 0..=4 {
            let t = k as f32 / 4.0;
            let u = 1.0 - t;
            out.push(pos2(
                u * u * p1.x + 2.0 * u * t * b.x + t * t * p2.x,
                u * u * p1.y + 2.0 * u * t * b.y + t * t * p2.y,
            ));
        }
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

pub fn path_for(curve: CurveKind, ends: Endpoints) -> Vec<Pos2> {
    match curve {
        CurveKind::Bezier => bezier_path(ends),
        CurveKind::SmoothStep => smooth_step_path(ends),
    }
}

/// Label text as displayed: collapsed labels are cut with an ellipsis,
/// hovering expands them to the full text.
pub fn label_text(label: &str, expanded: bool) -> String {
    if expanded || label.chars().count() <= LABEL_COLLAPSED_CHARS {
        return label.to_string();
    }
    let mut cut: String = label.chars().take(LABEL_COLLAPSED_CHARS - 1).collect();
    cut.push('…');
    cut
}

fn base(edge: &Edge, ends: Endpoints, curve: CurveKind, color: Color32, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let label = edge.label().filter(|l| !l.is_empty()).map(|l| EdgeLabel {
        text: label_text(l, hovered),
        anchor: ends.midpoint(),
        expanded: hovered,
        background: ctx.theme.label_background(),
        color: ctx.theme.label_text(),
    });
    EdgeVisual {
        id: edge.id.clone(),
        kind: edge.kind,
        curve,
        points: path_for(curve, ends),
        width: 1.5 * ctx.edge_thickness,
        color,
        gradient_to: None,
        dash: None,
        glow: false,
        animated: edge.animated,
        marker_start: edge.marker_start,
        marker_end: edge.marker_end,
        label,
    }
}

pub fn plain(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    base(edge, ends, CurveKind::Bezier, ctx.theme.edge_color(), ctx, hovered)
}

pub fn dashed(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let mut v = base(edge, ends, CurveKind::Bezier, ctx.theme.edge_color(), ctx, hovered);
    v.dash = Some((5.0, 5.0));
    v.animated = true;
    v
}

pub fn glowing(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let mut v = base(edge, ends, CurveKind::SmoothStep, palette::GRADIENT_START, ctx, hovered);
    v.glow = true;
    v
}

pub fn timeline(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let mut v = base(edge, ends, CurveKind::Bezier, palette::AMBER, ctx, hovered);
    v.width = 2.0 * ctx.edge_thickness;
    if v.animated {
        v.dash = Some((8.0, 4.0));
    }
    v
}

pub fn hierarchical(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    base(edge, ends, CurveKind::SmoothStep, palette::SLATE, ctx, hovered)
}

pub fn network(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    base(edge, ends, CurveKind::Bezier, palette::INDIGO, ctx, hovered)
}

pub fn bidirectional(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let mut v = base(edge, ends, CurveKind::Bezier, ctx.theme.edge_color(), ctx, hovered);
    let closed = Marker { kind: MarkerKind::ArrowClosed, width: None, height: None };
    v.marker_start = v.marker_start.or(Some(closed));
    v.marker_end = v.marker_end.or(Some(closed));
    v
}

pub fn gradient(edge: &Edge, ends: Endpoints, ctx: &RenderContext, hovered: bool) -> EdgeVisual {
    let mut v = base(edge, ends, CurveKind::Bezier, palette::GRADIENT_START, ctx, hovered);
    v.gradient_to = Some(palette::GRADIENT_END);
    v
}
