use std::collections::VecDeque;
use std::time::{Duration, Instant};

use egui::{Pos2, Vec2, pos2, vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::search::{self, SearchOutcome};
use crate::graph_utils::graph::{Graph, Node, NodeData, NodeId, NodeType, Position, SizeClass};
use crate::layout::{self, LayoutConfig, LayoutKind, LayoutReport};
use crate::render::RenderContext;
use crate::render::theme::Theme;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 4.0;
pub const ZOOM_STEP: f32 = 1.2;
// Fraction of the node bounds added around a fitted view
pub const FIT_PADDING: f32 = 0.2;
// World-space size assumed for a node when fitting the view
const NODE_EXTENT: f32 = 160.0;
const MAX_NOTICES: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient status message shown to the user (toast).
#[derive(Clone, Debug)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub level: NoticeLevel,
    pub posted: Instant,
}

/// Viewer state that survives between frames and sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub theme: Theme,
    pub selected: Option<NodeId>,
    pub layout: LayoutKind,
    // Percent sliders as shown in the control panel
    pub node_size: u8,
    pub edge_thickness: u8,
    pub show_minimap: bool,
    pub show_grid: bool,
    pub pan: (f32, f32),
    pub zoom: f32,
    pub search: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            selected: None,
            layout: LayoutKind::Force,
            node_size: 50,
            edge_thickness: 30,
            show_minimap: true,
            show_grid: true,
            pan: (0.0, 0.0),
            zoom: 1.0,
            search: String::new(),
        }
    }
}

impl ViewState {
    pub fn render_context(&self) -> RenderContext {
        RenderContext {
            theme: self.theme,
            // 50% is the natural node size; 30..=100 maps to 0.8..=1.5
            node_scale: 0.5 + self.node_size.clamp(30, 100) as f32 / 100.0,
            // 30% is a 1.0 multiplier
            edge_thickness: self.edge_thickness.clamp(10, 100) as f32 / 30.0,
        }
    }

    // World -> screen, relative to the canvas' top-left corner
    pub fn to_screen(&self, world: Pos2, canvas_min: Pos2) -> Pos2 {
        pos2(
            canvas_min.x + world.x * self.zoom + self.pan.0,
            canvas_min.y + world.y * self.zoom + self.pan.1,
        )
    }

    pub fn to_world(&self, screen: Pos2, canvas_min: Pos2) -> Pos2 {
        pos2(
            (screen.x - canvas_min.x - self.pan.0) / self.zoom,
            (screen.y - canvas_min.y - self.pan.1) / self.zoom,
        )
    }
}

/// Fields of the "create node" dialog.
#[derive(Clone, Debug, PartialEq)]
pub struct NewNodePayload {
    pub label: String,
    pub description: Option<String>,
    pub category: String,
    pub size: SizeClass,
    // Only meaningful for event nodes
    pub date: Option<String>,
}

impl Default for NewNodePayload {
    fn default() -> Self {
        Self {
            label: String::new(),
            description: None,
            category: "primary".into(),
            size: SizeClass::Medium,
            date: None,
        }
    }
}

/// Owns the graph and the view, and implements the UI action surface.
pub struct Visualizer {
    pub graph: Graph,
    pub view: ViewState,
    pub layout_config: LayoutConfig,
    notices: VecDeque<Notice>,
    rng: StdRng,
}

impl Visualizer {
    pub fn new(graph: Graph, layout_config: LayoutConfig) -> Self {
        let rng = match layout_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { graph, view: ViewState::default(), layout_config, notices: VecDeque::new(), rng }
    }

    pub fn with_view(mut self, view: ViewState) -> Self {
        self.view = view;
        if let Some(sel) = &self.view.selected
            && !self.graph.contains_node(sel)
        {
            self.view.selected = None;
        }
        self
    }

    pub fn notify(&mut self, level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) {
        let notice = Notice { title: title.into(), description: description.into(), level, posted: Instant::now() };
        match level {
            NoticeLevel::Info => log::info!("{}: {}", notice.title, notice.description),
            NoticeLevel::Warning => log::warn!("{}: {}", notice.title, notice.description),
            NoticeLevel::Error => log::error!("{}: {}", notice.title, notice.description),
        }
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    // Drop notices older than `ttl`
    pub fn expire_notices(&mut self, now: Instant, ttl: Duration) {
        self.notices.retain(|n| now.saturating_duration_since(n.posted) < ttl);
    }

    pub fn render_context(&self) -> RenderContext {
        self.view.render_context()
    }

    pub fn change_layout(&mut self, kind: LayoutKind) -> LayoutReport {
        let report = layout::apply_layout(&mut self.graph, kind, &self.layout_config);
        self.view.layout = kind;
        self.notify(NoticeLevel::Info, "Layout Updated", format!("Applied {} layout to the visualization.", kind));
        report
    }

    /// Create a node from the dialog payload at a random spot around the
    /// origin. Returns `None` (and changes nothing) for a blank label.
    pub fn add_node(&mut self, payload: NewNodePayload) -> Option<NodeId> {
        let label = payload.label.trim();
        if label.is_empty() {
            self.notify(NoticeLevel::Warning, "Node Not Created", "A node needs a label.");
            return None;
        }
        let id = self.graph.fresh_node_id();
        let kind = NodeType::for_category(&payload.category);
        let mut data = NodeData {
            id: Some(id.clone()),
            label: label.to_string(),
            description: payload.description.filter(|d| !d.trim().is_empty()),
            category: Some(payload.category.clone()),
            size: Some(payload.size),
            ..Default::default()
        };
        if kind == NodeType::Event
            && let Some(date) = payload.date.filter(|d| !d.trim().is_empty())
        {
            data.metadata.insert("date".into(), json!(date.trim()));
        }
        let spot = layout::random::scatter_with(&mut self.rng, 1, -400.0..400.0, -300.0..300.0);
        let position = spot.first().copied().unwrap_or(Position::ORIGIN);
        let mut node = Node::new(id.clone(), kind, position, data);
        if !self.view.search.is_empty() {
            search::highlight(std::slice::from_mut(&mut node), &self.view.search);
        }
        self.graph.insert_node(node);
        self.notify(NoticeLevel::Info, "Node Created", format!("Created new node \"{}\"", label));
        Some(id)
    }

    pub fn search_text(&mut self, query: &str) -> SearchOutcome {
        self.view.search = query.to_string();
        let outcome = search::highlight(&mut self.graph.nodes, query);
        if !query.is_empty() {
            self.notify(NoticeLevel::Info, "Search Results", format!("Highlighting nodes matching \"{}\"", query));
        }
        outcome
    }

    // Unknown ids leave the selection alone
    pub fn select_node(&mut self, id: &str) -> bool {
        if self.graph.contains_node(id) {
            self.view.selected = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.view.selected = None;
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.view.selected.as_deref().and_then(|id| self.graph.node(id))
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.view.theme = self.view.theme.toggled();
        self.view.theme
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom = (self.view.zoom * ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom = (self.view.zoom / ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Fit every node into a viewport of `viewport` pixels with padding.
    pub fn reset_view(&mut self, viewport: Vec2) {
        let Some((min, max)) = self.graph.bounds() else {
            self.view.zoom = 1.0;
            self.view.pan = (viewport.x / 2.0, viewport.y / 2.0);
            return;
        };
        let lo = pos2(min.x as f32, min.y as f32);
        let hi = pos2(max.x as f32 + NODE_EXTENT, max.y as f32 + NODE_EXTENT);
        let size = vec2((hi.x - lo.x).max(1.0), (hi.y - lo.y).max(1.0)) * (1.0 + FIT_PADDING);
        let zoom = (viewport.x / size.x).min(viewport.y / size.y).clamp(MIN_ZOOM, MAX_ZOOM);
        let center = pos2((lo.x + hi.x) / 2.0, (lo.y + hi.y) / 2.0);
        self.view.zoom = zoom;
        self.view.pan = (viewport.x / 2.0 - center.x * zoom, viewport.y / 2.0 - center.y * zoom);
        self.notify(NoticeLevel::Info, "View Reset", "Visualization has been centered and zoomed to fit all elements.");
    }

    /// Bulk replacement from an external source. Keeps the active search
    /// applied and drops a selection that no longer exists.
    pub fn replace_graph(&mut self, graph: Graph) {
        self.graph = graph;
        if !self.view.search.is_empty() {
            search::highlight(&mut self.graph.nodes, &self.view.search);
        }
        if let Some(sel) = &self.view.selected
            && !self.graph.contains_node(sel)
        {
            self.view.selected = None;
        }
    }
}
