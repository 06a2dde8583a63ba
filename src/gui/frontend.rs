use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Vec2, pos2, vec2};

use crate::graph_utils::graph::{EdgeId, Graph, MarkerKind, NodeId, SizeClass};
use crate::interaction::controller::{MAX_ZOOM, MIN_ZOOM, NewNodePayload, NoticeLevel, ViewState, Visualizer};
use crate::layout::{LayoutConfig, LayoutKind};
use crate::persistence::persist::{self, AppStateFile};
use crate::persistence::settings::AppSettings;
use crate::render::edge::EdgeVisual;
use crate::render::node::{NodeShape, NodeVisual};
use crate::render::palette;
use crate::render::theme::Theme;
use crate::render::{RenderRegistry, Scene, build_scene};
use crate::sources::{DataSources, GraphOutcome, Provenance};

const NOTICE_TTL: Duration = Duration::from_secs(4);
const AUTOSAVE_EVERY: Duration = Duration::from_secs(30);
const EDGE_HOVER_PX: f32 = 6.0;
const MINIMAP_SIZE: Vec2 = Vec2::new(200.0, 140.0);
const CATEGORIES: [&str; 11] = [
    "primary", "secondary", "tertiary", "quaternary", "success", "warning", "danger", "info", "event", "person", "place",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Job {
    Historical,
    Text,
}

struct WorkerReply {
    job: Job,
    result: anyhow::Result<GraphOutcome>,
}

// Text buffers behind the "Add Node" window
struct NodeForm {
    label: String,
    description: String,
    category: String,
    size: SizeClass,
    date: String,
}

impl Default for NodeForm {
    fn default() -> Self {
        Self {
            label: String::new(),
            description: String::new(),
            category: "primary".into(),
            size: SizeClass::Medium,
            date: String::new(),
        }
    }
}

impl NodeForm {
    fn payload(&self) -> NewNodePayload {
        let opt = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        NewNodePayload {
            label: self.label.clone(),
            description: opt(&self.description),
            category: self.category.clone(),
            size: self.size,
            date: opt(&self.date),
        }
    }
}

pub struct VisualizerApp {
    vis: Visualizer,
    registry: RenderRegistry,
    settings: AppSettings,
    // Canvas interaction
    last_canvas_rect: Option<Rect>,
    dragging: Option<NodeId>,
    hovered_edge: Option<EdgeId>,
    fit_pending: bool,
    // Windows
    show_add_node: bool,
    node_form: NodeForm,
    show_text_window: bool,
    text_input: String,
    show_import_window: bool,
    import_path: String,
    // Background collaborator call
    worker_rx: Option<Receiver<WorkerReply>>,
    busy_since: Option<Instant>,
    dirty: bool,
    last_save: Instant,
}

impl VisualizerApp {
    pub fn new(graph: Graph, settings: AppSettings) -> Self {
        let config = LayoutConfig { seed: settings.layout_seed, ..Default::default() };
        let view = ViewState {
            theme: Theme::from_dark(settings.dark_mode),
            show_minimap: settings.show_minimap,
            show_grid: settings.show_grid,
            ..Default::default()
        };
        Self::with_visualizer(Visualizer::new(graph, config).with_view(view), settings)
    }

    pub fn from_state(state: AppStateFile, settings: AppSettings) -> Self {
        let config = LayoutConfig { seed: settings.layout_seed, ..Default::default() };
        let mut app = Self::with_visualizer(Visualizer::new(state.graph, config).with_view(state.view), settings);
        // Restored views keep their pan/zoom
        app.fit_pending = false;
        app
    }

    fn with_visualizer(vis: Visualizer, settings: AppSettings) -> Self {
        Self {
            vis,
            registry: RenderRegistry::default(),
            settings,
            last_canvas_rect: None,
            dragging: None,
            hovered_edge: None,
            fit_pending: true,
            show_add_node: false,
            node_form: NodeForm::default(),
            show_text_window: false,
            text_input: String::new(),
            show_import_window: false,
            import_path: String::new(),
            worker_rx: None,
            busy_since: None,
            dirty: false,
            last_save: Instant::now(),
        }
    }

    fn viewport(&self) -> Vec2 {
        self.last_canvas_rect.map(|r| r.size()).unwrap_or(vec2(1300.0, 710.0))
    }

    fn save_now(&mut self) {
        let state = AppStateFile::new(&self.vis.graph, &self.vis.view);
        match persist::save_active(&state) {
            Ok(path) => {
                self.dirty = false;
                self.last_save = Instant::now();
                self.vis.notify(NoticeLevel::Info, "Saved", format!("Saved to {}", path.display()));
            }
            Err(e) => self.vis.notify(NoticeLevel::Error, "Save Failed", format!("{:#}", e)),
        }
    }

    // Quiet periodic save; failures are only logged
    fn autosave_if_due(&mut self) {
        if !self.dirty || self.last_save.elapsed() < AUTOSAVE_EVERY || self.dragging.is_some() {
            return;
        }
        let state = AppStateFile::new(&self.vis.graph, &self.vis.view);
        match persist::save_active(&state) {
            Ok(path) => log::debug!("autosaved to {}", path.display()),
            Err(e) => log::warn!("autosave failed: {:#}", e),
        }
        self.dirty = false;
        self.last_save = Instant::now();
    }

    fn save_versioned_now(&mut self) {
        let state = AppStateFile::new(&self.vis.graph, &self.vis.view);
        match persist::save_versioned(&state) {
            Ok(path) => self.vis.notify(NoticeLevel::Info, "Saved", format!("Saved version {}", path.display())),
            Err(e) => self.vis.notify(NoticeLevel::Error, "Save Failed", format!("{:#}", e)),
        }
    }

    fn load_latest(&mut self) {
        match persist::load_active() {
            Ok(Some(state)) => {
                self.vis.replace_graph(state.graph);
                self.fit_pending = true;
                self.vis.notify(NoticeLevel::Info, "Loaded", "Restored the last saved visualization.");
            }
            Ok(None) => self.vis.notify(NoticeLevel::Warning, "Nothing to Load", "No saved state found."),
            Err(e) => self.vis.notify(NoticeLevel::Error, "Load Failed", format!("{:#}", e)),
        }
    }

    fn load_version(&mut self, path: PathBuf) {
        match persist::load_from_path(&path) {
            Ok(state) => {
                self.vis.replace_graph(state.graph);
                self.fit_pending = true;
                self.dirty = true;
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                self.vis.notify(NoticeLevel::Info, "Loaded", format!("Restored version {}", name));
            }
            Err(e) => self.vis.notify(NoticeLevel::Error, "Load Failed", format!("{:#}", e)),
        }
    }

    fn export_json(&mut self) {
        let path = self.settings.export_dir().join("visualization.json");
        match persist::export_graph_json(&self.vis.graph, &path) {
            Ok(()) => self.vis.notify(NoticeLevel::Info, "Exported", format!("Wrote {}", path.display())),
            Err(e) => self.vis.notify(NoticeLevel::Error, "Export Failed", format!("{:#}", e)),
        }
    }

    fn export_csv(&mut self) {
        let path = persist::default_export_path(&self.settings, "csv");
        match persist::export_nodes_csv(&self.vis.graph, &path) {
            Ok(()) => self.vis.notify(NoticeLevel::Info, "Exported", format!("Wrote {}", path.display())),
            Err(e) => self.vis.notify(NoticeLevel::Error, "Export Failed", format!("{:#}", e)),
        }
    }

    fn import_json(&mut self, path: PathBuf) {
        match persist::import_graph_json(&path) {
            Ok(graph) => {
                let n = graph.node_count();
                self.vis.replace_graph(graph);
                self.fit_pending = true;
                self.dirty = true;
                self.vis.notify(NoticeLevel::Info, "Imported", format!("Loaded {} nodes from {}", n, path.display()));
            }
            Err(e) => self.vis.notify(NoticeLevel::Error, "Import Failed", format!("{:#}", e)),
        }
    }

    // Runs the collaborator call off the UI thread; the reply is picked up in `poll_worker`.
    fn spawn_job(&mut self, job: Job, ctx: &egui::Context) {
        if self.worker_rx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let settings = self.settings.clone();
        let config = self.vis.layout_config.clone();
        let text = self.text_input.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let sources = DataSources::from_settings(&settings);
            let result = match job {
                Job::Historical => sources.visualize_historical(&config),
                Job::Text => Ok(sources.visualize_text(&text)),
            };
            let _ = tx.send(WorkerReply { job, result });
            ctx.request_repaint();
        });
        self.worker_rx = Some(rx);
        self.busy_since = Some(Instant::now());
    }

    fn poll_worker(&mut self) {
        let Some(rx) = &self.worker_rx else { return };
        let reply = match rx.try_recv() {
            Ok(reply) => reply,
            Err(mpsc::TryRecvError::Empty) => return,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.worker_rx = None;
                self.busy_since = None;
                self.vis.notify(NoticeLevel::Error, "Request Failed", "The background worker stopped unexpectedly.");
                return;
            }
        };
        self.worker_rx = None;
        self.busy_since = None;
        match reply.result {
            Ok(outcome) => {
                let (nodes, edges) = (outcome.graph.node_count(), outcome.graph.edge_count());
                if let Some(reason) = &outcome.fallback_reason {
                    self.vis.notify(NoticeLevel::Warning, "Using Local Fallback", reason.clone());
                }
                self.vis.replace_graph(outcome.graph);
                if reply.job == Job::Historical && outcome.provenance == Provenance::Fallback {
                    self.vis.view.layout = LayoutKind::Timeline;
                }
                self.fit_pending = true;
                self.dirty = true;
                let how = match outcome.provenance {
                    Provenance::Synthesized => "generated",
                    Provenance::Fallback => "built locally",
                };
                self.vis.notify(
                    NoticeLevel::Info,
                    "Visualization Updated",
                    format!("Graph {} with {} nodes and {} edges.", how, nodes, edges),
                );
            }
            Err(e) => self.vis.notify(NoticeLevel::Error, "Data Load Failed", format!("{:#}", e)),
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S))) {
                self.save_now();
            }
            ui.horizontal(|ui| {
                ui.label("HistoViz");

                ui.menu_button("File", |ui| {
                    if ui.button("Save").clicked() {
                        self.save_now();
                        ui.close();
                    }
                    if ui.button("Save Version").clicked() {
                        self.save_versioned_now();
                        ui.close();
                    }
                    if ui.button("Load Latest").clicked() {
                        self.load_latest();
                        ui.close();
                    }
                    ui.menu_button("Versions", |ui| {
                        let versions = persist::list_versions_in(&self.settings.autosave_dir()).unwrap_or_else(|e| {
                            log::warn!("listing versions failed: {:#}", e);
                            Vec::new()
                        });
                        if versions.is_empty() {
                            ui.weak("No saved versions");
                        }
                        for path in versions.into_iter().take(20) {
                            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                            if ui.button(name).clicked() {
                                self.load_version(path);
                                ui.close();
                            }
                        }
                    });
                    ui.separator();
                    if ui.button("Export JSON").clicked() {
                        self.export_json();
                        ui.close();
                    }
                    if ui.button("Export Nodes CSV").clicked() {
                        self.export_csv();
                        ui.close();
                    }
                    if ui.button("Import JSON…").clicked() {
                        self.show_import_window = true;
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("Layout", |ui| {
                    for kind in LayoutKind::ALL {
                        if ui.selectable_label(self.vis.view.layout == kind, kind.title()).clicked() {
                            self.vis.change_layout(kind);
                            self.dirty = true;
                            ui.close();
                        }
                    }
                });

                ui.menu_button("Data", |ui| {
                    let busy = self.worker_rx.is_some();
                    if ui.add_enabled(!busy, egui::Button::new("Visualize Historical Data")).clicked() {
                        self.spawn_job(Job::Historical, ctx);
                        ui.close();
                    }
                    if ui.add_enabled(!busy, egui::Button::new("Visualize Text…")).clicked() {
                        self.show_text_window = true;
                        ui.close();
                    }
                });

                if ui.button("Add Node").clicked() {
                    self.show_add_node = true;
                }
                if ui.button("−").on_hover_text("Zoom out").clicked() {
                    self.vis.zoom_out();
                }
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    self.vis.zoom_in();
                }
                if ui.button("Fit").on_hover_text("Reset view").clicked() {
                    self.vis.reset_view(self.viewport());
                }
                let theme_label = if self.vis.view.theme.is_dark() { "☀" } else { "☾" };
                if ui.button(theme_label).on_hover_text("Toggle theme").clicked() {
                    self.vis.toggle_theme();
                    self.dirty = true;
                }

                ui.separator();
                let mut query = self.vis.view.search.clone();
                let resp = ui.add(egui::TextEdit::singleline(&mut query).hint_text("Search nodes…").desired_width(180.0));
                if resp.changed() {
                    self.vis.search_text(&query);
                }

                if let Some(since) = self.busy_since {
                    ui.spinner();
                    ui.small(format!("working {}s", since.elapsed().as_secs()));
                }
            });
        });
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("details").default_width(260.0).show(ctx, |ui| {
            ui.heading("Controls");
            ui.add(egui::Slider::new(&mut self.vis.view.node_size, 30..=100).text("Node size %"));
            ui.add(egui::Slider::new(&mut self.vis.view.edge_thickness, 10..=100).text("Edge thickness %"));
            ui.checkbox(&mut self.vis.view.show_minimap, "Minimap");
            ui.checkbox(&mut self.vis.view.show_grid, "Grid");
            ui.small(format!(
                "{} nodes · {} edges · zoom {:.2}x",
                self.vis.graph.node_count(),
                self.vis.graph.edge_count(),
                self.vis.view.zoom
            ));
            ui.separator();

            let Some(node) = self.vis.selected_node().cloned() else {
                ui.weak("Select a node to see its details.");
                return;
            };
            ui.horizontal(|ui| {
                ui.heading(&node.data.label);
                if ui.small_button("✕").clicked() {
                    self.vis.clear_selection();
                }
            });
            ui.monospace(&node.id);
            ui.label(format!("Type: {}", node.kind.as_str()));
            if let Some(cat) = &node.data.category {
                ui.label(format!("Category: {}", cat));
            }
            if let Some(desc) = &node.data.description
                && !desc.is_empty()
            {
                ui.label(desc);
            }
            ui.small(format!("Position: ({:.0}, {:.0})", node.position.x, node.position.y));
            ui.small(format!("Connections: {}", self.vis.graph.degree(&node.id)));
            if !node.data.metadata.is_empty() {
                ui.separator();
                egui::Grid::new("node_meta").num_columns(2).striped(true).show(ui, |ui| {
                    for (k, v) in &node.data.metadata {
                        ui.label(k);
                        match v.as_str() {
                            Some(s) => ui.label(s),
                            None => ui.label(v.to_string()),
                        };
                        ui.end_row();
                    }
                });
            }
        });
    }

    fn windows(&mut self, ctx: &egui::Context) {
        if self.show_add_node {
            let mut open = true;
            let mut submit = false;
            egui::Window::new("Add Node").open(&mut open).resizable(false).collapsible(false).show(ctx, |ui| {
                ui.label("Label");
                ui.text_edit_singleline(&mut self.node_form.label);
                ui.label("Description");
                ui.text_edit_multiline(&mut self.node_form.description);
                egui::ComboBox::from_label("Category")
                    .selected_text(self.node_form.category.clone())
                    .show_ui(ui, |ui| {
                        for c in CATEGORIES {
                            ui.selectable_value(&mut self.node_form.category, c.to_string(), c);
                        }
                    });
                ui.horizontal(|ui| {
                    ui.label("Size");
                    ui.selectable_value(&mut self.node_form.size, SizeClass::Small, "small");
                    ui.selectable_value(&mut self.node_form.size, SizeClass::Medium, "medium");
                    ui.selectable_value(&mut self.node_form.size, SizeClass::Large, "large");
                });
                if self.node_form.category == "event" {
                    ui.label("Date");
                    ui.add(egui::TextEdit::singleline(&mut self.node_form.date).hint_text("YYYY-MM-DD"));
                }
                if ui.button("Create").clicked() {
                    submit = true;
                }
            });
            if submit && let Some(id) = self.vis.add_node(self.node_form.payload()) {
                self.vis.select_node(&id);
                self.node_form = NodeForm::default();
                self.dirty = true;
                open = false;
            }
            self.show_add_node = open;
        }

        if self.show_text_window {
            let mut open = true;
            let mut run = false;
            egui::Window::new("Visualize Text").open(&mut open).default_width(420.0).show(ctx, |ui| {
                ui.label("Paste a passage; people, places, dates and documents become nodes.");
                ui.add(egui::TextEdit::multiline(&mut self.text_input).desired_rows(10).desired_width(f32::INFINITY));
                let ready = !self.text_input.trim().is_empty() && self.worker_rx.is_none();
                if ui.add_enabled(ready, egui::Button::new("Visualize")).clicked() {
                    run = true;
                }
            });
            if run {
                self.spawn_job(Job::Text, ctx);
                open = false;
            }
            self.show_text_window = open;
        }

        if self.show_import_window {
            let mut open = true;
            let mut chosen = None;
            egui::Window::new("Import JSON").open(&mut open).collapsible(false).show(ctx, |ui| {
                ui.label("Path to a {nodes, edges} JSON file");
                ui.text_edit_singleline(&mut self.import_path);
                if ui.add_enabled(!self.import_path.trim().is_empty(), egui::Button::new("Import")).clicked() {
                    chosen = Some(PathBuf::from(self.import_path.trim()));
                }
            });
            if let Some(path) = chosen {
                self.import_json(path);
                open = false;
            }
            self.show_import_window = open;
        }
    }

    fn notices(&mut self, ctx: &egui::Context) {
        self.vis.expire_notices(Instant::now(), NOTICE_TTL);
        if self.vis.notices().next().is_none() {
            return;
        }
        egui::Area::new(egui::Id::new("notices"))
            .anchor(Align2::RIGHT_BOTTOM, vec2(-16.0, -16.0))
            .show(ctx, |ui| {
                for n in self.vis.notices() {
                    let accent = match n.level {
                        NoticeLevel::Info => Color32::from_rgb(59, 130, 246),
                        NoticeLevel::Warning => Color32::from_rgb(234, 179, 8),
                        NoticeLevel::Error => Color32::from_rgb(239, 68, 68),
                    };
                    egui::Frame::popup(ui.style()).stroke(Stroke::new(1.0, accent)).show(ui, |ui| {
                        ui.set_max_width(320.0);
                        ui.label(egui::RichText::new(&n.title).strong().color(accent));
                        ui.label(&n.description);
                    });
                }
            });
        ctx.request_repaint_after(Duration::from_millis(250));
    }

    fn canvas(&mut self, ctx: &egui::Context) {
        let theme = self.vis.view.theme;
        let frame = egui::Frame::NONE.fill(theme.canvas_background());
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            self.last_canvas_rect = Some(available);
            if self.fit_pending {
                self.vis.reset_view(available.size());
                self.fit_pending = false;
            }
            let bg_resp = ui.allocate_rect(available, Sense::click_and_drag());
            let painter = ui.painter_at(available);

            if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.vis.clear_selection();
            }

            // Zoom with scroll, keeping the world point under the cursor fixed
            if bg_resp.hovered() {
                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0
                    && let Some(mouse) = ui.ctx().pointer_hover_pos()
                {
                    let before = self.vis.view.to_world(mouse, available.min);
                    let factor = (1.0 + scroll * 0.001).clamp(0.9, 1.1);
                    self.vis.view.zoom = (self.vis.view.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
                    let after = self.vis.view.to_screen(before, available.min);
                    self.vis.view.pan.0 += mouse.x - after.x;
                    self.vis.view.pan.1 += mouse.y - after.y;
                }
            }

            if self.vis.view.show_grid {
                draw_grid(&painter, available, &self.vis.view);
            }

            let rctx = self.vis.render_context();
            let scene = build_scene(&self.vis.graph, &self.registry, &rctx, self.hovered_edge.as_ref());
            let view = self.vis.view.clone();
            let to_screen = |p: Pos2| view.to_screen(p, available.min);
            let time = ui.input(|i| i.time) as f32;

            let mut any_animated = false;
            for e in &scene.edges {
                any_animated |= e.animated;
                draw_edge(&painter, e, &to_screen, view.zoom, time, theme);
            }

            let mut clicked_node: Option<NodeId> = None;
            let mut node_dragged = false;
            for n in &scene.nodes {
                let rect = Rect::from_min_max(to_screen(n.rect.min), to_screen(n.rect.max));
                let resp = ui.allocate_rect(rect, Sense::click_and_drag());
                if resp.dragged() {
                    node_dragged = true;
                    self.dragging = Some(n.id.clone());
                    let delta = resp.drag_delta() / view.zoom;
                    if let Some(node) = self.vis.graph.node_mut(&n.id) {
                        node.position.x += delta.x as f64;
                        node.position.y += delta.y as f64;
                        self.dirty = true;
                    }
                }
                if resp.clicked() {
                    clicked_node = Some(n.id.clone());
                }
                let selected = self.vis.view.selected.as_deref() == Some(n.id.as_str());
                draw_node(&painter, n, rect, view.zoom, selected, theme);
            }
            if !node_dragged {
                self.dragging = None;
                let delta = bg_resp.drag_delta();
                if delta != Vec2::ZERO {
                    self.vis.view.pan.0 += delta.x;
                    self.vis.view.pan.1 += delta.y;
                }
            }
            if let Some(id) = clicked_node {
                self.vis.select_node(&id);
            } else if bg_resp.clicked() {
                self.vis.clear_selection();
            }

            // Hovered edge expands its label on the next frame
            self.hovered_edge = ui
                .ctx()
                .pointer_hover_pos()
                .filter(|p| available.contains(*p))
                .and_then(|p| nearest_edge(&scene, p, &to_screen));

            if self.vis.view.show_minimap {
                draw_minimap(&painter, available, &self.vis.graph, &scene, &view, theme);
            }
            if any_animated {
                ui.ctx().request_repaint_after(Duration::from_millis(33));
            }
        });
    }
}

fn draw_grid(painter: &egui::Painter, rect: Rect, view: &ViewState) {
    let gap = view.theme.grid_gap() * view.zoom;
    if gap < 6.0 {
        return;
    }
    let color = view.theme.grid_color();
    let ox = (rect.min.x + view.pan.0).rem_euclid(gap);
    let oy = (rect.min.y + view.pan.1).rem_euclid(gap);
    let mut y = rect.min.y + oy;
    while y < rect.max.y {
        let mut x = rect.min.x + ox;
        while x < rect.max.x {
            painter.circle_filled(pos2(x, y), 1.0, color);
            x += gap;
        }
        y += gap;
    }
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()), mix(a.a(), b.a()))
}

fn draw_arrow(painter: &egui::Painter, tip: Pos2, from: Pos2, size: f32, kind: MarkerKind, color: Color32) {
    let dir = (tip - from).normalized();
    if !dir.x.is_finite() || !dir.y.is_finite() {
        return;
    }
    let normal = vec2(-dir.y, dir.x);
    let base = tip - dir * size;
    let left = base + normal * size * 0.5;
    let right = base - normal * size * 0.5;
    match kind {
        MarkerKind::ArrowClosed => painter.add(Shape::convex_polygon(vec![tip, left, right], color, Stroke::NONE)),
        MarkerKind::Arrow => {
            painter.line_segment([left, tip], Stroke::new(1.5, color));
            painter.line_segment([right, tip], Stroke::new(1.5, color))
        }
    };
}

fn draw_edge(painter: &egui::Painter, e: &EdgeVisual, to_screen: &impl Fn(Pos2) -> Pos2, zoom: f32, time: f32, theme: Theme) {
    let pts: Vec<Pos2> = e.points.iter().map(|p| to_screen(*p)).collect();
    if pts.len() < 2 {
        return;
    }
    let width = (e.width * zoom).max(0.5);
    if e.glow {
        painter.add(Shape::line(pts.clone(), Stroke::new(width * 4.0, e.color.gamma_multiply(0.25))));
    }
    match (e.dash, e.gradient_to) {
        (Some((dash, gap)), _) => {
            // Dashes march along the path when animated
            let offset = if e.animated { (time * 20.0).rem_euclid(dash + gap) } else { 0.0 };
            painter.extend(Shape::dashed_line_with_offset(
                &pts,
                Stroke::new(width, e.color),
                &[dash * zoom],
                &[gap * zoom],
                offset * zoom,
            ));
        }
        (None, Some(end)) => {
            let n = (pts.len() - 1) as f32;
            for (i, seg) in pts.windows(2).enumerate() {
                painter.line_segment([seg[0], seg[1]], Stroke::new(width, lerp_color(e.color, end, i as f32 / n)));
            }
        }
        (None, None) => {
            painter.add(Shape::line(pts.clone(), Stroke::new(width, e.color)));
        }
    }
    let arrow = (8.0 * zoom).clamp(4.0, 16.0);
    if let Some(m) = e.marker_end {
        let size = m.width.map(|w| w * 0.5 * zoom).unwrap_or(arrow);
        let color = e.gradient_to.unwrap_or(e.color);
        draw_arrow(painter, pts[pts.len() - 1], pts[pts.len() - 2], size, m.kind, color);
    }
    if let Some(m) = e.marker_start {
        let size = m.width.map(|w| w * 0.5 * zoom).unwrap_or(arrow);
        draw_arrow(painter, pts[0], pts[1], size, m.kind, e.color);
    }
    if let Some(label) = &e.label {
        let font = FontId::proportional((12.0 * zoom).clamp(9.0, 18.0));
        let galley = painter.layout_no_wrap(label.text.clone(), font, label.color);
        let center = to_screen(label.anchor);
        let pad = vec2(6.0, 3.0);
        let rect = Rect::from_center_size(center, galley.size() + pad * 2.0);
        painter.rect_filled(rect, 4.0, label.background);
        painter.rect_stroke(rect, 4.0, Stroke::new(1.0, theme.grid_color()), egui::StrokeKind::Inside);
        painter.galley(rect.min + pad, galley, label.color);
    }
}

fn draw_node(painter: &egui::Painter, n: &NodeVisual, rect: Rect, zoom: f32, selected: bool, theme: Theme) {
    let fade = |c: Color32| c.gamma_multiply(n.opacity);
    let fill = fade(n.swatch.fill);
    let text = fade(n.swatch.text);
    let stroke_w = if selected { 3.0 } else { 1.5 };
    let stroke_color = if selected { palette::AMBER } else { fade(n.swatch.stroke) };
    let stroke = Stroke::new(stroke_w, stroke_color);
    let font = |size: f32| FontId::proportional((size * zoom).clamp(6.0, 28.0));

    match n.shape {
        NodeShape::Circle => {
            let r = rect.width().min(rect.height()) / 2.0;
            painter.circle_filled(rect.center(), r, fill);
            painter.circle_stroke(rect.center(), r, stroke);
        }
        NodeShape::Plain => {
            painter.rect_filled(rect, 3.0, fade(theme.label_background()));
            painter.rect_stroke(rect, 3.0, stroke, egui::StrokeKind::Inside);
        }
        _ => {
            painter.rect_filled(rect, 8.0 * zoom, fill);
            painter.rect_stroke(rect, 8.0 * zoom, stroke, egui::StrokeKind::Inside);
        }
    }

    let mut y = rect.min.y + 8.0 * zoom;
    if let Some(badge) = &n.badge {
        painter.text(pos2(rect.min.x + 8.0 * zoom, y), Align2::LEFT_TOP, badge, font(10.0), fade(n.swatch.stroke));
        y += 14.0 * zoom;
    }
    if let Some(icon) = &n.icon {
        let at = if n.shape == NodeShape::Circle { rect.center() - vec2(0.0, 18.0 * zoom) } else { pos2(rect.center().x, y + 8.0 * zoom) };
        painter.text(at, Align2::CENTER_CENTER, icon, font(20.0), text);
        y += 22.0 * zoom;
    }
    let title_at = if n.shape == NodeShape::Circle { rect.center() + vec2(0.0, 8.0 * zoom) } else { pos2(rect.center().x, y.max(rect.center().y - 6.0 * zoom)) };
    painter.text(title_at, Align2::CENTER_CENTER, &n.title, font(14.0), text);
    if let Some(caption) = &n.caption {
        painter.text(pos2(rect.center().x, rect.max.y - 10.0 * zoom), Align2::CENTER_BOTTOM, caption, font(10.0), text);
    } else if let Some(desc) = &n.description
        && n.shape != NodeShape::Circle
        && zoom > 0.6
    {
        let short: String = desc.chars().take(40).collect();
        painter.text(pos2(rect.center().x, rect.max.y - 10.0 * zoom), Align2::CENTER_BOTTOM, short, font(10.0), text.gamma_multiply(0.8));
    }
    for h in &n.handles {
        let at = pos2(rect.center().x, if h.pos.y <= n.rect.center().y { rect.min.y } else { rect.max.y });
        painter.circle_filled(at, (4.0 * zoom).clamp(2.0, 6.0), fade(h.color));
    }
}

fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

fn nearest_edge(scene: &Scene, pointer: Pos2, to_screen: &impl Fn(Pos2) -> Pos2) -> Option<EdgeId> {
    let mut best: Option<(f32, &EdgeId)> = None;
    for e in &scene.edges {
        let pts: Vec<Pos2> = e.points.iter().map(|p| to_screen(*p)).collect();
        for seg in pts.windows(2) {
            let d = point_segment_distance(pointer, seg[0], seg[1]);
            if d <= EDGE_HOVER_PX && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, &e.id));
            }
        }
    }
    best.map(|(_, id)| id.clone())
}

fn draw_minimap(painter: &egui::Painter, canvas: Rect, graph: &Graph, scene: &Scene, view: &ViewState, theme: Theme) {
    let Some((min, max)) = graph.bounds() else { return };
    let frame = Rect::from_min_size(canvas.max - MINIMAP_SIZE - vec2(12.0, 12.0), MINIMAP_SIZE);
    painter.rect_filled(frame, 4.0, theme.minimap_mask());
    painter.rect_stroke(frame, 4.0, Stroke::new(1.0, theme.grid_color()), egui::StrokeKind::Inside);

    let world = Rect::from_min_max(pos2(min.x as f32, min.y as f32), pos2(max.x as f32 + 200.0, max.y as f32 + 200.0));
    let scale = (frame.width() / world.width()).min(frame.height() / world.height());
    let map = |p: Pos2| frame.min + (p - world.min) * scale;
    for n in &scene.nodes {
        let category = graph.node(&n.id).and_then(|g| g.data.category.as_deref());
        let r = Rect::from_min_max(map(n.rect.min), map(n.rect.max));
        painter.rect_filled(r, 1.0, palette::minimap_color(category).gamma_multiply(n.opacity));
    }
    // Visible part of the canvas
    let a = map(view.to_world(canvas.min, canvas.min));
    let b = map(view.to_world(canvas.max, canvas.min));
    let visible = Rect::from_min_max(a, b).intersect(frame);
    if visible.is_positive() {
        painter.rect_stroke(visible, 0.0, Stroke::new(1.5, palette::INDIGO), egui::StrokeKind::Inside);
    }
}

impl eframe::App for VisualizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(if self.vis.view.theme.is_dark() { egui::Visuals::dark() } else { egui::Visuals::light() });
        self.poll_worker();
        self.top_bar(ctx);
        self.side_panel(ctx);
        self.windows(ctx);
        self.canvas(ctx);
        self.notices(ctx);
        self.autosave_if_due();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let state = AppStateFile::new(&self.vis.graph, &self.vis.view);
        if let Err(e) = persist::save_active(&state) {
            log::error!("autosave on exit failed: {:#}", e);
        }
        let mut settings = self.settings.clone();
        settings.dark_mode = self.vis.view.theme.is_dark();
        settings.show_minimap = self.vis.view.show_minimap;
        settings.show_grid = self.vis.view.show_grid;
        if settings != self.settings
            && let Err(e) = settings.save()
        {
            log::warn!("saving settings failed: {:#}", e);
        }
    }
}
