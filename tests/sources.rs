use std::cell::RefCell;
use std::fs;

use anyhow::anyhow;

use histoviz::graph_utils::graph::{EdgeType, NodeType};
use histoviz::layout::LayoutConfig;
use histoviz::sources::csv_store::CsvTimelineStore;
use histoviz::sources::extract::extract_entities;
use histoviz::sources::historical::{HistoricalData, Timeline, TimelineEvent, normalize_date, simple_visualization};
use histoviz::sources::llm::{SynthesisRequest, parse_graph_response};
use histoviz::sources::{GraphSynthesizer, Provenance, TimelineStore, visualize_historical, visualize_text};

struct Canned(Result<String, String>, RefCell<Vec<String>>);

impl Canned {
    fn ok(body: &str) -> Self {
        Canned(Ok(body.to_string()), RefCell::new(Vec::new()))
    }
    fn failing() -> Self {
        Canned(Err("503 Service Unavailable".into()), RefCell::new(Vec::new()))
    }
}

impl GraphSynthesizer for Canned {
    fn synthesize(&self, request: &SynthesisRequest) -> anyhow::Result<String> {
        self.1.borrow_mut().push(serde_json::to_string(request)?);
        self.0.clone().map_err(|e| anyhow!(e))
    }
}

struct BrokenStore;

impl TimelineStore for BrokenStore {
    fn load_historical(&self) -> anyhow::Result<HistoricalData> {
        Err(anyhow!("connection refused"))
    }
}

fn sample_data() -> HistoricalData {
    HistoricalData {
        timelines: vec![Timeline { id: "t1".into(), title: "American Revolution".into(), ..Default::default() }],
        events: vec![
            TimelineEvent {
                id: "e2".into(),
                timeline_id: Some("t1".into()),
                title: "Declaration".into(),
                date: Some("1776-07-04".into()),
                ..Default::default()
            },
            TimelineEvent {
                id: "e1".into(),
                timeline_id: Some("t1".into()),
                title: "Lexington".into(),
                date: Some("4/19/1775".into()),
                category: Some("battle".into()),
                ..Default::default()
            },
            TimelineEvent { id: "e3".into(), title: "Orphan".into(), ..Default::default() },
        ],
    }
}

#[test]
fn llm_response_is_extracted_and_coerced() {
    let body = r#"Here is the graph you asked for:
```json
{"nodes": [
  {"id": "a", "type": "hero", "position": {"x": 10, "y": 20}, "data": {"label": "Alpha"}},
  {"id": "b", "type": "event", "data": {"label": "Beta", "metadata": {"date": "1900", "importance": 7}}},
  {"id": "a", "type": "concept", "data": {"label": "Duplicate"}},
  {"type": "person", "data": {}}
 ],
 "edges": [
  {"id": "e1", "source": "a", "target": "b", "type": "wavy", "label": "leads to"},
  {"id": "e2", "source": "a", "target": "nowhere"},
  {"source": "b", "target": "a", "type": "network"}
 ]}
```"#;
    let (graph, report) = parse_graph_response(body).expect("usable graph");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(report.dropped_nodes, 1);
    assert_eq!(report.coerced_node_types, 1);
    assert_eq!(report.dropped_edges, 1);
    assert_eq!(report.coerced_edge_types, 1);
    assert_eq!(report.generated_ids, 2);

    let a = graph.node("a").expect("a");
    assert_eq!(a.kind, NodeType::Concept);
    assert_eq!(a.data.label, "Alpha");
    assert_eq!((a.position.x, a.position.y), (10.0, 20.0));
    let b = graph.node("b").expect("b");
    assert_eq!(b.data.importance, Some(7.0));
    assert_eq!(b.data.date(), Some("1900"));
    // Missing label falls back to the id
    let generated = &graph.nodes[2];
    assert_eq!(generated.kind, NodeType::Person);
    assert_eq!(generated.data.label, generated.id);

    assert_eq!(graph.edge("e1").map(|e| e.kind), Some(EdgeType::Default));
    assert_eq!(graph.edge("e1").and_then(|e| e.label()), Some("leads to"));
    assert!(graph.dangling_edges().is_empty());
    assert!(graph.duplicate_node_ids().is_empty());
}

#[test]
fn llm_error_or_empty_response_is_unusable() {
    assert!(parse_graph_response(r#"{"error": "quota exceeded"}"#).is_none());
    assert!(parse_graph_response(r#"{"nodes": [], "edges": []}"#).is_none());
    assert!(parse_graph_response("I could not do that.").is_none());
    // A JSON string holding the object is unwrapped
    let wrapped = serde_json::to_string(r#"{"nodes":[{"id":"x","type":"place","data":{"label":"Rome"}}]}"#).expect("json");
    let (g, _) = parse_graph_response(&wrapped).expect("usable");
    assert_eq!(g.nodes[0].kind, NodeType::Place);
}

#[test]
fn synthesis_requests_use_the_function_payload_shape() {
    let text = serde_json::to_value(SynthesisRequest::Text { user_text: "hello".into() }).expect("json");
    assert_eq!(text, serde_json::json!({"userText": "hello"}));
    let hist = serde_json::to_value(SynthesisRequest::Historical { timelines: vec![], events: vec![] }).expect("json");
    assert!(hist.get("timelines").is_some() && hist.get("events").is_some());
}

#[test]
fn fallback_generator_shape() {
    let g = simple_visualization(&sample_data());
    assert_eq!(g.node_count(), 4);
    let t = g.node("timeline-t1").expect("timeline node");
    assert_eq!(t.kind, NodeType::Concept);
    assert_eq!((t.position.x, t.position.y), (100.0, 100.0));

    let e2 = g.node("event-e2").expect("first event");
    assert_eq!((e2.position.x, e2.position.y), (400.0, 100.0));
    let orphan = g.node("event-e3").expect("third event");
    assert_eq!((orphan.position.x, orphan.position.y), (800.0, 100.0));
    let lex = g.node("event-e1").expect("lexington");
    assert_eq!(lex.data.date(), Some("1775-04-19"));
    assert_eq!(lex.data.metadata.get("category").and_then(|v| v.as_str()), Some("battle"));
    assert_eq!(e2.data.metadata.get("category").and_then(|v| v.as_str()), Some("historical"));

    // Contains edges for events with a timeline, chronological link in date order
    assert_eq!(g.count_edges_of(EdgeType::Timeline), 2);
    assert!(g.edge("edge-timeline-t1-event-e1").is_some());
    assert!(g.edge("edge-chrono-e1-e2").is_some(), "Lexington precedes the Declaration");
    assert!(g.dangling_edges().is_empty());
}

#[test]
fn historical_pipeline_falls_back_when_synthesis_fails() {
    let synth = Canned::failing();
    let outcome = visualize_historical(&sample_data(), Some(&synth), &LayoutConfig::default()).expect("store is fine");
    assert_eq!(outcome.provenance, Provenance::Fallback);
    assert!(outcome.fallback_reason.as_deref().is_some_and(|r| r.contains("503")));
    assert!(synth.1.borrow()[0].contains("\"timelines\""));

    // Timeline layout replaced the contains edges with one chain
    let g = &outcome.graph;
    assert_eq!(g.count_edges_of(EdgeType::Timeline), g.node_count() - 1);
    assert_eq!(g.count_edges_of(EdgeType::Dashed), 1);
    let x = |id: &str| g.node(id).map(|n| n.position.x).unwrap_or(f64::NAN);
    assert!(x("event-e1") < x("event-e2"));
}

#[test]
fn historical_pipeline_keeps_synthesized_graph_as_returned() {
    let synth = Canned::ok(
        r#"{"nodes":[
            {"id":"t","type":"concept","position":{"x":11,"y":22},"data":{"label":"Revolution"}},
            {"id":"a","type":"event","position":{"x":300,"y":40},"data":{"label":"A","metadata":{"date":"1800"}}},
            {"id":"b","type":"event","data":{"label":"B","metadata":{"date":"1700"}}}],
           "edges":[{"id":"contains-t-a","source":"t","target":"a","type":"timeline","animated":true,"label":"contains"}]}"#,
    );
    let outcome = visualize_historical(&sample_data(), Some(&synth), &LayoutConfig::default()).expect("ok");
    assert_eq!(outcome.provenance, Provenance::Synthesized);
    let g = &outcome.graph;
    let contains = g.edge("contains-t-a").expect("synthesized timeline edge kept");
    assert_eq!(contains.label(), Some("contains"));
    assert_eq!(g.edge_count(), 1);
    assert!(g.edge("timeline-b-a").is_none());
    let t = g.node("t").expect("t");
    assert_eq!((t.position.x, t.position.y), (11.0, 22.0));
    let a = g.node("a").expect("a");
    assert_eq!((a.position.x, a.position.y), (300.0, 40.0));
    // Only the node without a position was placed on the grid
    assert_eq!(outcome.coercion.placed_nodes, 1);
    let b = g.node("b").expect("b");
    assert_eq!((b.position.x, b.position.y), (540.0, 100.0));
}

#[test]
fn historical_pipeline_propagates_store_errors() {
    let err = visualize_historical(&BrokenStore, None, &LayoutConfig::default()).expect_err("store fails");
    assert!(format!("{:#}", err).contains("connection refused"));
}

#[test]
fn text_pipeline_without_synthesizer_extracts_entities() {
    let outcome = visualize_text("In 1815, Napoleon Bonaparte was defeated at Waterloo.", None);
    assert_eq!(outcome.provenance, Provenance::Fallback);
    let g = &outcome.graph;
    assert!(g.nodes.iter().any(|n| n.kind == NodeType::Event));
    assert!(g.nodes.iter().any(|n| n.kind == NodeType::Person && n.data.label == "Napoleon Bonaparte"));
    assert!(g.nodes.iter().any(|n| n.kind == NodeType::Place && n.data.label == "Waterloo"));
}

#[test]
fn extraction_links_entities_to_their_sentence_event() {
    let text = "On July 4, 1776, the Declaration of Independence was signed in Philadelphia by John Hancock. \
                The Treaty of Paris was signed in 1783.";
    let (g, summary) = extract_entities(text);
    assert_eq!(summary.events, 2);
    assert_eq!(summary.documents, 2);
    assert!(summary.people >= 1);
    assert_eq!(summary.places, 1);

    let date = g.node("date-july-4-1776").expect("date node");
    assert_eq!(date.data.date(), Some("1776-07-04"));
    let events: Vec<_> = g.nodes.iter().filter(|n| n.kind == NodeType::Event).collect();
    assert_eq!(events[0].data.date(), Some("1776-07-04"));
    assert_eq!(events[1].data.date(), Some("1783-01-01"));

    let label_of = |source: &str, target: &str| {
        g.edges.iter().find(|e| e.source == source && e.target == target).and_then(|e| e.label().map(str::to_string))
    };
    let ev = &events[0].id;
    assert_eq!(label_of(ev, "date-july-4-1776").as_deref(), Some("occurred on"));
    assert_eq!(label_of("person-john-hancock", ev).as_deref(), Some("involved in"));
    assert_eq!(label_of(ev, "place-philadelphia").as_deref(), Some("took place in"));
    assert_eq!(label_of(ev, "document-declaration-of-independence").as_deref(), Some("documented by"));
    assert!(g.dangling_edges().is_empty());
    assert!(g.duplicate_node_ids().is_empty());
}

#[test]
fn extraction_without_entities_yields_one_concept() {
    let (g, summary) = extract_entities("nothing notable here");
    assert_eq!(g.node_count(), 1);
    assert_eq!(g.nodes[0].kind, NodeType::Concept);
    assert_eq!(summary.events, 0);
    assert_eq!(extract_entities("   ").0.node_count(), 0);
}

#[test]
fn csv_store_reads_both_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("timelines.csv"),
        "id,title,description,start_date,end_date\nt1,Industrial Age,,1760-01-01,1840-01-01\n",
    )
    .expect("write");
    fs::write(
        dir.path().join("timeline_events.csv"),
        "id,timeline_id,title,description,date,category\n\
         e1,t1,Spinning Jenny,,1764-01-01,invention\n\
         e2,t1,Steam Engine,\"Watt's improved, separate condenser\",1769-01-05,\n",
    )
    .expect("write");

    let data = CsvTimelineStore::new(dir.path()).load_historical().expect("load");
    assert_eq!(data.timelines.len(), 1);
    assert_eq!(data.timelines[0].title, "Industrial Age");
    assert_eq!(data.timelines[0].description, None);
    assert_eq!(data.events.len(), 2);
    assert_eq!(data.events[1].description.as_deref(), Some("Watt's improved, separate condenser"));
    assert_eq!(data.events[1].category, None);
    assert_eq!(data.events[0].timeline_id.as_deref(), Some("t1"));
}

#[test]
fn csv_store_missing_directory_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = CsvTimelineStore::new(dir.path().join("absent"));
    assert!(store.load_historical().is_err());
}

#[test]
fn dates_normalize_to_iso_or_pass_through() {
    assert_eq!(normalize_date("7/4/1776"), "1776-07-04");
    assert_eq!(normalize_date(" 1492 "), "1492-01-01");
    assert_eq!(normalize_date("  circa 1200 "), "circa 1200");
}
