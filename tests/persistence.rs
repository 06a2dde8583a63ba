use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use histoviz::graph_utils::graph::{Edge, EdgeType, Graph, Marker, Node, NodeData, NodeType, Position};
use histoviz::graph_utils::seed::seed_graph;
use histoviz::interaction::controller::ViewState;
use histoviz::interaction::search;
use histoviz::layout::{self, LayoutConfig, LayoutKind};
use histoviz::persistence::persist::{self, AppStateFile};
use histoviz::persistence::settings::AppSettings;
use histoviz::sources::historical::{HistoricalData, Timeline, TimelineEvent, simple_visualization};
use histoviz::sources::supabase::SupabaseClient;

fn node(id: &str) -> Node {
    Node::new(id, NodeType::Concept, Position::new(0.0, 0.0), NodeData::labeled(id))
}

#[test]
fn graph_json_survives_export_and_import() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("visualization.json");
    let graph = seed_graph();
    persist::export_graph_json(&graph, &path).expect("export");
    let back = persist::import_graph_json(&path).expect("import");
    assert_eq!(back, graph);

    // Exchange format uses React Flow field names
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert!(v["nodes"][0].get("type").is_some());
    assert!(v["nodes"][0]["data"].get("label").is_some());
    assert!(v["edges"].as_array().is_some_and(|e| !e.is_empty()));
}

// Timeline chain (animated, markers, labels), search styles, dates,
// importance, parent ids and both marker ends.
fn decorated_graph() -> Graph {
    let data = HistoricalData {
        timelines: vec![Timeline { id: "t1".into(), title: "Reformation".into(), ..Default::default() }],
        events: vec![
            TimelineEvent {
                id: "e1".into(),
                timeline_id: Some("t1".into()),
                title: "Ninety-five Theses".into(),
                date: Some("1517-10-31".into()),
                ..Default::default()
            },
            TimelineEvent {
                id: "e2".into(),
                timeline_id: Some("t1".into()),
                title: "Diet of Worms".into(),
                description: Some("Luther refuses to recant".into()),
                date: Some("1521".into()),
                category: Some("council".into()),
                ..Default::default()
            },
        ],
    };
    let mut g = simple_visualization(&data);
    layout::apply_layout(&mut g, LayoutKind::Timeline, &LayoutConfig::default());
    search::highlight(&mut g.nodes, "worms");
    if let Some(n) = g.node_mut("event-e1") {
        n.data.importance = Some(8.5);
        n.parent_id = Some("timeline-t1".into());
    }
    let mut both = Edge::new("both-ends", "event-e1", "event-e2", EdgeType::Bidirectional).with_marker_end(Marker::closed_sized(12.0));
    both.marker_start = Some(Marker::closed());
    g.insert_edge(both);
    g
}

#[test]
fn decorated_graph_survives_export_and_import() {
    let graph = decorated_graph();
    assert!(graph.nodes.iter().any(|n| n.style.is_some_and(|s| s.opacity < 1.0)));
    assert!(graph.edges.iter().any(|e| e.animated && e.marker_end.is_some()));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("visualization.json");
    persist::export_graph_json(&graph, &path).expect("export");
    let back = persist::import_graph_json(&path).expect("import");
    assert_eq!(back, graph);

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    let e1 = v["nodes"].as_array().and_then(|ns| ns.iter().find(|n| n["id"] == "event-e1")).expect("e1");
    assert_eq!(e1["parentId"], "timeline-t1");
    assert_eq!(e1["data"]["importance"], 8.5);
    assert_eq!(e1["data"]["metadata"]["date"], "1517-10-31");
    assert_eq!(e1["style"]["opacity"].as_f64().map(|o| (o * 10.0).round()), Some(2.0));
    let both = v["edges"].as_array().and_then(|es| es.iter().find(|e| e["id"] == "both-ends")).expect("edge");
    assert_eq!(both["markerStart"]["type"], "arrowclosed");
    assert_eq!(both["markerEnd"]["width"], 12.0);

    // The autosave format carries the same fields
    let ron_path = dir.path().join("state.ron");
    persist::save_to_path(&AppStateFile::new(&graph, &ViewState::default()), &ron_path).expect("save");
    assert_eq!(persist::load_from_path(&ron_path).expect("load").graph, graph);
}

#[test]
fn import_rejects_duplicate_ids_and_dangling_edges() {
    let dup = Graph::from_parts(vec![node("a"), node("a")], vec![]);
    let text = serde_json::to_string(&dup).expect("json");
    let err = persist::graph_from_json(&text).expect_err("duplicate ids");
    assert!(err.to_string().contains("duplicate node ids: a"));

    let dangling = Graph::from_parts(vec![node("a")], vec![Edge::new("e", "a", "ghost", EdgeType::Default)]);
    let text = serde_json::to_string(&dangling).expect("json");
    assert!(persist::graph_from_json(&text).is_err());

    assert!(persist::graph_from_json("[1, 2, 3]").is_err());
    // Missing optional fields take their defaults
    let g = persist::graph_from_json(r#"{"nodes": [{"id": "x", "data": {"label": "X"}}]}"#).expect("minimal");
    assert_eq!(g.nodes[0].kind, NodeType::Concept);
    assert!(g.edges.is_empty());
}

#[test]
fn state_file_round_trips_through_ron() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.ron");
    let view = ViewState { layout: LayoutKind::Radial, search: "paris".into(), zoom: 1.5, ..Default::default() };
    let state = AppStateFile::new(&seed_graph(), &view);
    persist::save_to_path(&state, &path).expect("save");
    assert!(!dir.path().join("state.ron.tmp").exists());

    let loaded = persist::load_from_path(&path).expect("load");
    assert_eq!(loaded.graph, state.graph);
    assert_eq!(loaded.view.layout, LayoutKind::Radial);
    assert_eq!(loaded.view.search, "paris");
    assert_eq!(loaded.view.zoom, 1.5);
}

#[test]
fn state_without_view_loads_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("old.ron");
    fs::write(&path, "(graph: (nodes: [], edges: []))").expect("write");
    let loaded = persist::load_from_path(&path).expect("load");
    assert_eq!(loaded.view, ViewState::default());
    assert!(persist::load_from_path(&dir.path().join("missing.ron")).is_err());
}

#[test]
fn versions_are_listed_newest_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["state_20240101_120000.ron", "state_20250301_080000.ron", "state.ron", "notes.txt"] {
        fs::write(dir.path().join(name), "").expect("write");
    }
    let names: Vec<String> = persist::list_versions_in(dir.path())
        .expect("list")
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(names, vec!["state_20250301_080000.ron", "state_20240101_120000.ron"]);
    assert!(persist::list_versions_in(&dir.path().join("absent")).expect("empty").is_empty());
}

#[test]
fn node_table_export_has_header_and_degrees() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nodes.csv");
    let mut g = Graph::from_parts(vec![node("a"), node("b")], vec![]);
    g.insert_edge(Edge::new("e1", "a", "b", EdgeType::Network));
    persist::export_nodes_csv(&g, &path).expect("export");
    let text = fs::read_to_string(&path).expect("read");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("id,type,label,category,date,x,y,degree"));
    assert_eq!(lines.next(), Some("a,concept,a,,,0.0,0.0,1"));
    assert_eq!(lines.count(), 1);
}

#[test]
fn default_export_path_uses_override() {
    let settings = AppSettings { export_override: Some(PathBuf::from("/data/out")), ..Default::default() };
    let p = persist::default_export_path(&settings, "json");
    assert!(p.starts_with("/data/out"));
    let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(name.starts_with("graph_") && name.ends_with(".json"));
}

#[test]
fn settings_defaults() {
    let s = AppSettings::default();
    assert_eq!(s.function_name, "process-historical-data");
    assert_eq!(s.request_timeout_secs, 60);
    assert!(s.show_minimap && s.show_grid && !s.dark_mode);
    assert!(!s.has_remote());
    assert!(s.export_dir().ends_with("HistoViz/exports"));

    // Older settings files lack the newer fields
    let old: AppSettings = serde_json::from_str(r#"{"autosave_override": "/tmp/x"}"#).expect("json");
    assert_eq!(old.autosave_dir(), PathBuf::from("/tmp/x"));
    assert_eq!(old.function_name, "process-historical-data");
    assert!(old.show_grid);
}

#[test]
fn environment_overrides_win_and_blanks_are_ignored() {
    let mut s = AppSettings { supabase_url: Some("https://old.example".into()), ..Default::default() };
    s.apply_overrides(|key| match key {
        "SUPABASE_URL" => Some("  ".into()),
        "SUPABASE_ANON_KEY" => Some("anon".into()),
        "HISTOVIZ_FUNCTION" => Some("synthesize".into()),
        "HISTOVIZ_CSV_DIR" => Some("/srv/records".into()),
        _ => None,
    });
    assert_eq!(s.supabase_url.as_deref(), Some("https://old.example"));
    assert_eq!(s.supabase_anon_key.as_deref(), Some("anon"));
    assert_eq!(s.function_name, "synthesize");
    assert_eq!(s.csv_store_dir, Some(PathBuf::from("/srv/records")));
    assert!(s.has_remote());
}

#[test]
fn supabase_endpoints() {
    let c = SupabaseClient::new("https://abc.supabase.co/", "key", "process-historical-data", Duration::from_secs(5))
        .expect("client");
    assert_eq!(c.table_url("timelines"), "https://abc.supabase.co/rest/v1/timelines?select=*");
    assert_eq!(c.function_url(), "https://abc.supabase.co/functions/v1/process-historical-data");

    assert!(SupabaseClient::from_settings(&AppSettings::default()).is_err());
}
