use std::collections::HashSet;
use std::f64::consts::TAU;

use egui::vec2;
use serde_json::json;

use histoviz::graph_utils::graph::{Edge, EdgeType, Graph, Node, NodeData, NodeType, Position};
use histoviz::graph_utils::seed::seed_graph;
use histoviz::interaction::controller::{MAX_ZOOM, MIN_ZOOM, NewNodePayload, NoticeLevel, Visualizer};
use histoviz::interaction::search;
use histoviz::layout::{self, LayoutConfig, LayoutKind, hierarchical, radial, timeline};
use histoviz::render::edge::label_text;
use histoviz::render::node::{HandleKind, NodeShape, node_size};
use histoviz::render::theme::Theme;
use histoviz::render::{RenderContext, RenderRegistry, build_scene};

fn node(id: &str) -> Node {
    Node::new(id, NodeType::Concept, Position::ORIGIN, NodeData::labeled(id.to_uppercase()))
}

fn dated(id: &str, date: Option<&str>) -> Node {
    let mut n = Node::new(id, NodeType::Event, Position::ORIGIN, NodeData::labeled(id));
    if let Some(d) = date {
        n.data.metadata.insert("date".into(), json!(d));
    }
    n
}

fn edge(source: &str, target: &str, kind: EdgeType) -> Edge {
    Edge::new(format!("e-{}-{}", source, target), source, target, kind)
}

fn seeded() -> LayoutConfig {
    LayoutConfig { seed: Some(7), ..Default::default() }
}

#[test]
fn graph_rejects_duplicate_nodes_and_dangling_edges() {
    let mut g = Graph::new();
    assert!(g.insert_node(node("a")));
    assert!(!g.insert_node(node("a")), "duplicate id must be refused");
    assert!(g.insert_node(node("b")));
    assert!(g.insert_edge(edge("a", "b", EdgeType::Default)));
    assert!(!g.insert_edge(edge("a", "missing", EdgeType::Default)));
    assert!(!g.insert_edge(edge("a", "b", EdgeType::Network)), "edge ids are unique");
    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.degree("a"), 1);
}

#[test]
fn seed_graph_is_consistent() {
    let g = seed_graph();
    assert_eq!(g.node_count(), 11);
    assert_eq!(g.edge_count(), 10);
    assert!(g.duplicate_node_ids().is_empty());
    assert!(g.dangling_edges().is_empty());
    assert_eq!(g.count_edges_of(EdgeType::Hierarchical), 6);
    assert_eq!(g.count_edges_of(EdgeType::Network), 4);
}

#[test]
fn layout_kind_parses_names_and_rejects_unknown() {
    assert_eq!("radial".parse::<LayoutKind>().ok(), Some(LayoutKind::Radial));
    assert_eq!("Timeline".parse::<LayoutKind>().ok(), Some(LayoutKind::Timeline));
    assert_eq!("force".parse::<LayoutKind>().ok(), Some(LayoutKind::Force));
    assert!("spiral".parse::<LayoutKind>().is_err());
}

#[test]
fn radial_spacing_is_even_and_sums_to_full_turn() {
    for n in [1usize, 3, 7, 12] {
        let step = radial::angle_step(n);
        assert!((step * n as f64 - TAU).abs() < 1e-9);
    }
    let mut g = seed_graph();
    let cfg = LayoutConfig::default();
    layout::apply_layout(&mut g, LayoutKind::Radial, &cfg);
    let c = cfg.radial_center;
    let angles: Vec<f64> = g.nodes.iter().map(|n| (n.position.y - c.y).atan2(n.position.x - c.x).rem_euclid(TAU)).collect();
    for n in &g.nodes {
        let r = ((n.position.x - c.x).powi(2) + (n.position.y - c.y).powi(2)).sqrt();
        assert!((r - cfg.radial_radius).abs() < 1e-6);
    }
    let step = radial::angle_step(g.node_count());
    for (i, a) in angles.iter().enumerate() {
        let expected = (i as f64 * step).rem_euclid(TAU);
        let diff = (a - expected).abs();
        assert!(diff < 1e-6 || (TAU - diff) < 1e-6, "node {} at {} expected {}", i, a, expected);
    }
    // Node 0 sits on the positive x axis
    assert!((g.nodes[0].position.x - (c.x + cfg.radial_radius)).abs() < 1e-9);
}

#[test]
fn force_layout_is_reproducible_with_a_seed_and_stays_in_bounds() {
    let mut a = seed_graph();
    let mut b = seed_graph();
    layout::apply_layout(&mut a, LayoutKind::Force, &seeded());
    layout::apply_layout(&mut b, LayoutKind::Force, &seeded());
    assert_eq!(a, b);
    for n in &a.nodes {
        assert!((0.0..800.0).contains(&n.position.x));
        assert!((0.0..600.0).contains(&n.position.y));
    }
}

#[test]
fn hierarchical_gives_distinct_slots_in_acyclic_graphs() {
    let mut g = Graph::new();
    for id in ["root", "a", "b", "c", "a1", "a2", "b1", "other"] {
        g.insert_node(node(id));
    }
    for (s, t) in [("root", "a"), ("root", "b"), ("root", "c"), ("a", "a1"), ("a", "a2"), ("b", "b1"), ("c", "b1")] {
        g.insert_edge(edge(s, t, EdgeType::Hierarchical));
    }
    let cfg = LayoutConfig::default();
    let slots = hierarchical::place(&g.nodes, &g.edges, &cfg);
    assert_eq!(slots.len(), g.node_count(), "every node is reachable from a root");

    let mut seen = HashSet::new();
    for slot in slots.values() {
        let key = (slot.level, (slot.position.x * 1000.0).round() as i64);
        assert!(seen.insert(key), "two nodes share slot {:?}", key);
        assert!((slot.position.y - slot.level as f64 * cfg.level_gap).abs() < 1e-9);
    }
    assert_eq!(slots["root"].level, 0);
    assert_eq!(slots["other"].level, 0);
    assert_eq!(slots["a1"].level, 2);
    // Children split their parent's span
    let a = slots["a"].span;
    let a1 = slots["a1"].span;
    assert!(a1.0 >= a.0 && a1.1 <= a.1);
}

#[test]
fn hierarchical_terminates_on_cycles_and_leaves_unreached_nodes_alone() {
    let mut g = Graph::new();
    for id in ["r", "x", "y", "p", "q"] {
        g.insert_node(node(id));
    }
    if let Some(p) = g.node_mut("p") {
        p.position = Position::new(-5.0, -5.0);
    }
    g.insert_edge(edge("r", "x", EdgeType::Default));
    g.insert_edge(edge("x", "y", EdgeType::Default));
    g.insert_edge(edge("y", "x", EdgeType::Default));
    // p <-> q has no root above it
    g.insert_edge(edge("p", "q", EdgeType::Default));
    g.insert_edge(edge("q", "p", EdgeType::Default));

    let report = layout::apply_layout(&mut g, LayoutKind::Hierarchical, &LayoutConfig::default());
    assert_eq!(report.positioned, 3);
    assert_eq!(report.untouched, 2);
    assert_eq!(g.node("p").map(|n| n.position), Some(Position::new(-5.0, -5.0)));
}

#[test]
fn hierarchical_ignores_edges_to_missing_nodes() {
    let mut g = Graph::from_parts(vec![node("a"), node("b")], vec![edge("ghost", "a", EdgeType::Default)]);
    g.edges.push(edge("a", "b", EdgeType::Default));
    let roots = hierarchical::roots(&g.nodes, &g.edges);
    assert_eq!(roots.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
    let report = layout::apply_layout(&mut g, LayoutKind::Hierarchical, &LayoutConfig::default());
    assert_eq!(report.untouched, 0);
}

#[test]
fn parse_date_accepts_common_forms() {
    let ymd = |y, m: u8, d| timeline::parse_date(&format!("{:04}-{:02}-{:02}", y, m, d));
    assert_eq!(timeline::parse_date("1776-07-04"), ymd(1776, 7, 4));
    assert_eq!(timeline::parse_date("1969-07-20T20:17:40Z"), ymd(1969, 7, 20));
    assert_eq!(timeline::parse_date("1969-07-20T20:17:40"), ymd(1969, 7, 20));
    assert_eq!(timeline::parse_date("7/4/1776"), ymd(1776, 7, 4));
    assert_eq!(timeline::parse_date("1492"), ymd(1492, 1, 1));
    assert_eq!(timeline::parse_date("sometime"), None);
    assert_eq!(timeline::parse_date("  "), None);
}

#[test]
fn timeline_orders_by_date_with_undated_first() {
    let mut g = Graph::new();
    g.insert_node(dated("late", Some("1945-05-08")));
    g.insert_node(dated("none", None));
    g.insert_node(dated("early", Some("1066-10-14")));
    g.insert_node(dated("bad", Some("not a date")));
    g.insert_node(dated("mid", Some("1789")));
    g.insert_edge(edge("late", "early", EdgeType::Network));
    g.insert_edge(edge("early", "mid", EdgeType::Timeline));
    let ids_before: Vec<String> = g.nodes.iter().map(|n| n.id.clone()).collect();

    let cfg = LayoutConfig::default();
    let report = layout::apply_layout(&mut g, LayoutKind::Timeline, &cfg);

    // Array order is unchanged; only positions move
    assert_eq!(g.nodes.iter().map(|n| n.id.clone()).collect::<Vec<_>>(), ids_before);
    let x = |id: &str| g.node(id).map(|n| n.position.x).unwrap_or(f64::NAN);
    let y = |id: &str| g.node(id).map(|n| n.position.y).unwrap_or(f64::NAN);
    // Undated ones keep array order among themselves
    assert_eq!(x("none"), 100.0);
    assert_eq!(x("bad"), 300.0);
    assert_eq!(x("early"), 500.0);
    assert_eq!(x("mid"), 700.0);
    assert_eq!(x("late"), 900.0);
    assert_eq!(y("none"), 200.0);
    assert_eq!(y("bad"), 400.0);
    assert_eq!(y("early"), 200.0);

    assert_eq!(report.chronological_edges, 4);
    assert_eq!(g.count_edges_of(EdgeType::Timeline), 4);
    assert_eq!(g.count_edges_of(EdgeType::Network), 1);
    let chain = g.edge("timeline-early-mid").expect("chain edge");
    assert!(chain.animated);
    assert_eq!(chain.label(), Some(timeline::CHRONOLOGICAL_LABEL));
    assert!(chain.marker_end.is_some());
}

#[test]
fn timeline_relayout_replaces_previous_chain() {
    let mut g = seed_graph();
    let others = g.edge_count();
    let cfg = LayoutConfig::default();
    layout::apply_layout(&mut g, LayoutKind::Timeline, &cfg);
    layout::apply_layout(&mut g, LayoutKind::Timeline, &cfg);
    assert_eq!(g.count_edges_of(EdgeType::Timeline), g.node_count() - 1);
    assert_eq!(g.edge_count(), others + g.node_count() - 1);
}

#[test]
fn timeline_on_tiny_graphs() {
    let mut empty = Graph::new();
    assert_eq!(layout::apply_layout(&mut empty, LayoutKind::Timeline, &LayoutConfig::default()).chronological_edges, 0);
    let mut one = Graph::from_parts(vec![dated("solo", Some("2001-09-11"))], vec![]);
    layout::apply_layout(&mut one, LayoutKind::Timeline, &LayoutConfig::default());
    assert_eq!(one.edge_count(), 0);
    assert_eq!(one.nodes[0].position, Position::new(100.0, 200.0));
}

#[test]
fn search_is_case_insensitive_and_idempotent() {
    let mut g = seed_graph();
    let target = g.nodes[0].data.label.to_uppercase();
    let first = search::highlight(&mut g.nodes, &target);
    let snapshot = g.clone();
    let second = search::highlight(&mut g.nodes, &target);
    assert_eq!(first, second);
    assert_eq!(snapshot, g);
    assert!(first.matched.contains(&g.nodes[0].id));
    for n in &g.nodes {
        let expected = if first.matched.contains(&n.id) { 1.0 } else { search::DIMMED_OPACITY };
        assert_eq!(n.opacity(), expected);
    }
}

#[test]
fn search_matches_description_and_empty_query_clears() {
    let mut nodes = vec![node("a"), node("b")];
    nodes[1].data.description = Some("Signed at Versailles".into());
    let out = search::highlight(&mut nodes, "versailles");
    assert_eq!(out.matched, vec!["b".to_string()]);
    assert!(search::is_dimmed(&nodes[0]));

    let cleared = search::highlight(&mut nodes, "");
    assert!(cleared.dimmed.is_empty());
    assert!(nodes.iter().all(|n| n.style.is_none()));
}

#[test]
fn node_size_prefers_importance_over_size_class() {
    let mut d = NodeData::labeled("x");
    assert_eq!(node_size(&d), 160.0);
    d.size = Some(histoviz::graph_utils::graph::SizeClass::Small);
    assert_eq!(node_size(&d), 120.0);
    d.importance = Some(9.0);
    assert_eq!(node_size(&d), 200.0);
    d.importance = Some(6.0);
    assert_eq!(node_size(&d), 160.0);
    d.importance = Some(0.0);
    assert_eq!(node_size(&d), 120.0);
}

#[test]
fn render_registry_falls_back_for_unregistered_types() {
    let registry = RenderRegistry::default();
    let ctx = RenderContext::default();
    let mut group = node("g");
    group.kind = NodeType::Group;
    let v = registry.render_node(&group, &ctx);
    assert_eq!(v.shape, NodeShape::Plain);

    let mut person = node("ada lovelace");
    person.kind = NodeType::Person;
    let v = registry.render_node(&person, &ctx);
    assert_eq!(v.shape, NodeShape::Circle);
    assert_eq!(v.icon.as_deref(), Some("A"));
    assert!(v.handle(HandleKind::Target).pos.y < v.handle(HandleKind::Source).pos.y);

    let mut empty = RenderRegistry::empty();
    empty.register_node(NodeType::Person, histoviz::render::node::person);
    assert!(empty.has_node_renderer(NodeType::Person));
    assert_eq!(empty.render_node(&node("c"), &ctx).shape, NodeShape::Plain);
}

#[test]
fn scene_skips_dangling_edges_and_expands_hovered_labels() {
    let long = "a label that is definitely longer than the limit";
    let mut g = Graph::from_parts(vec![node("a"), node("b")], vec![]);
    g.insert_edge(edge("a", "b", EdgeType::Bidirectional).with_label(long));
    g.edges.push(edge("a", "ghost", EdgeType::Default));
    let registry = RenderRegistry::default();
    let ctx = RenderContext { theme: Theme::Dark, ..Default::default() };

    let scene = build_scene(&g, &registry, &ctx, None);
    assert_eq!(scene.edges.len(), 1);
    let e = &scene.edges[0];
    assert!(e.marker_start.is_some() && e.marker_end.is_some());
    let label = e.label.as_ref().expect("label");
    assert!(label.text.ends_with('…'));
    assert_eq!(label.text.chars().count(), 24);

    let hovered = build_scene(&g, &registry, &ctx, Some(&"e-a-b".to_string()));
    assert_eq!(hovered.edges[0].label.as_ref().map(|l| l.text.as_str()), Some(long));
    assert_eq!(label_text("short", false), "short");
}

#[test]
fn controller_add_node_assigns_type_and_rejects_blank_labels() {
    let mut vis = Visualizer::new(Graph::new(), seeded());
    assert!(vis.add_node(NewNodePayload { label: "   ".into(), ..Default::default() }).is_none());
    assert_eq!(vis.graph.node_count(), 0);
    assert_eq!(vis.latest_notice().map(|n| n.level), Some(NoticeLevel::Warning));

    let id = vis
        .add_node(NewNodePayload {
            label: "Fall of Rome".into(),
            category: "event".into(),
            date: Some("476-09-04".into()),
            ..Default::default()
        })
        .expect("node created");
    let n = vis.graph.node(&id).expect("stored");
    assert_eq!(n.kind, NodeType::Event);
    assert_eq!(n.data.date(), Some("476-09-04"));
    assert!((-400.0..400.0).contains(&n.position.x));
    assert!((-300.0..300.0).contains(&n.position.y));

    let other = vis.add_node(NewNodePayload { label: "Caesar".into(), category: "person".into(), ..Default::default() });
    assert_ne!(other.as_deref(), Some(id.as_str()));
    assert_eq!(other.and_then(|i| vis.graph.node(&i).map(|n| n.kind)), Some(NodeType::Person));
    assert_eq!(vis.latest_notice().map(|n| n.title.as_str()), Some("Node Created"));
}

#[test]
fn controller_selection_theme_and_zoom() {
    let mut vis = Visualizer::new(seed_graph(), seeded());
    assert!(vis.select_node("node-1"));
    assert!(!vis.select_node("nope"));
    assert_eq!(vis.view.selected.as_deref(), Some("node-1"));
    vis.clear_selection();
    assert!(vis.selected_node().is_none());

    assert_eq!(vis.toggle_theme(), Theme::Dark);
    assert_eq!(vis.toggle_theme(), Theme::Light);

    for _ in 0..50 {
        vis.zoom_in();
    }
    assert_eq!(vis.view.zoom, MAX_ZOOM);
    for _ in 0..50 {
        vis.zoom_out();
    }
    assert_eq!(vis.view.zoom, MIN_ZOOM);
}

#[test]
fn controller_reset_view_fits_the_graph() {
    let mut vis = Visualizer::new(seed_graph(), seeded());
    let viewport = vec2(1200.0, 800.0);
    vis.reset_view(viewport);
    let (min, max) = vis.graph.bounds().expect("non-empty");
    let origin = egui::Pos2::ZERO;
    let lo = vis.view.to_screen(egui::pos2(min.x as f32, min.y as f32), origin);
    let hi = vis.view.to_screen(egui::pos2(max.x as f32, max.y as f32), origin);
    assert!(lo.x >= 0.0 && lo.y >= 0.0);
    assert!(hi.x <= viewport.x && hi.y <= viewport.y);
    assert_eq!(vis.latest_notice().map(|n| n.title.as_str()), Some("View Reset"));
}

#[test]
fn controller_keeps_search_across_layout_and_replacement() {
    let mut vis = Visualizer::new(seed_graph(), seeded());
    vis.select_node("node-2");
    let out = vis.search_text("zzz-no-match");
    assert!(out.matched.is_empty());
    vis.change_layout(LayoutKind::Radial);
    assert!(vis.graph.nodes.iter().all(search::is_dimmed));
    assert_eq!(vis.view.layout, LayoutKind::Radial);

    vis.replace_graph(Graph::from_parts(vec![node("fresh")], vec![]));
    assert!(vis.graph.nodes.iter().all(search::is_dimmed));
    assert!(vis.view.selected.is_none());
}
