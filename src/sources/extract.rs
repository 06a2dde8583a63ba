//! Rule-based entity extraction for free text, used when the synthesizer is
//! unavailable. Pattern matching only: dates, documents, places, people, and
//! one event per sentence that carries a date.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::historical::normalize_date;
use crate::graph_utils::graph::{Edge, EdgeType, Graph, Node, NodeData, NodeType, Position, SizeClass};

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December";

static SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?]?").expect("static regex"));

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("static regex"));
static MONTH_DAY_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b(?:{})\s+\d{{1,2}},?\s+\d{{3,4}}\b", MONTHS)).expect("static regex"));
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b\d{{1,2}}\s+(?:{})\s+\d{{3,4}}\b", MONTHS)).expect("static regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:1[0-9]{3}|20[0-9]{2})\b").expect("static regex"));

static DOCUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Z][a-z]+\s+)*(?:Treaty|Declaration|Charter|Constitution|Edict|Proclamation|Accords?|Manifesto|Act|Code|Bill|Magna Carta)\b(?:\s+of(?:\s+the)?(?:\s+[A-Z][a-zA-Z'-]+)+)?",
    )
    .expect("static regex")
});
static PLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:in|at|from|to|near|across|into|toward|towards)\s+((?:the\s+)?[A-Z][a-zA-Z'-]+(?:\s+[A-Z][a-zA-Z'-]+)*)")
        .expect("static regex")
});
static TITLED_PERSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:King|Queen|President|Emperor|Empress|General|Admiral|Sir|Lord|Lady|Pope|Prince|Princess|Saint)\s+[A-Z][a-z]+(?:\s+(?:[A-Z]\.\s+)?[A-Z][a-z]+)*",
    )
    .expect("static regex")
});
static NAME_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z]\.)?(?:\s+[A-Z][a-z]+){1,2}\b").expect("static regex"));

// Capitalized words that start phrases but never names
const STOPWORDS: &[&str] = &[
    "The", "A", "An", "In", "On", "At", "By", "After", "Before", "During", "This", "That", "These", "Those", "His",
    "Her", "Their", "Its", "It", "When", "While", "Then", "Later", "Meanwhile", "From", "To", "With", "Under", "And",
    "But", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

const EVENT_LABEL_CHARS: usize = 60;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub events: usize,
    pub dates: usize,
    pub people: usize,
    pub places: usize,
    pub documents: usize,
}

struct Builder {
    graph: Graph,
    by_key: HashMap<(NodeType, String), String>,
    column_fill: HashMap<NodeType, usize>,
    summary: ExtractionSummary,
}

fn slug(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

fn column(kind: NodeType) -> f64 {
    match kind {
        NodeType::Event => 0.0,
        NodeType::Date => 1.0,
        NodeType::Person => 2.0,
        NodeType::Place => 3.0,
        NodeType::Document => 4.0,
        _ => 5.0,
    }
}

fn is_month(word: &str) -> bool {
    MONTHS.split('|').any(|m| m == word)
}

impl Builder {
    fn new() -> Self {
        Self { graph: Graph::new(), by_key: HashMap::new(), column_fill: HashMap::new(), summary: ExtractionSummary::default() }
    }

    // Returns the id of the node for (kind, label), creating it on first sight.
    fn entity(&mut self, kind: NodeType, label: &str, data: NodeData) -> String {
        let key = (kind, label.to_lowercase());
        if let Some(id) = self.by_key.get(&key) {
            return id.clone();
        }
        let mut id = format!("{}-{}", kind.as_str().to_lowercase(), slug(label));
        let mut n = 2;
        while self.graph.contains_node(&id) {
            id = format!("{}-{}-{}", kind.as_str().to_lowercase(), slug(label), n);
            n += 1;
        }
        let row = self.column_fill.entry(kind).or_insert(0);
        let position = Position::new(100.0 + column(kind) * 250.0, 100.0 + *row as f64 * 150.0);
        *row += 1;
        let mut data = data;
        data.id = Some(id.clone());
        data.label = label.to_string();
        self.graph.insert_node(Node::new(id.clone(), kind, position, data));
        self.by_key.insert(key, id.clone());
        match kind {
            NodeType::Event => self.summary.events += 1,
            NodeType::Date => self.summary.dates += 1,
            NodeType::Person => self.summary.people += 1,
            NodeType::Place => self.summary.places += 1,
            NodeType::Document => self.summary.documents += 1,
            _ => {}
        }
        id
    }

    fn link(&mut self, source: &str, target: &str, kind: EdgeType, label: &str) {
        let id = format!("edge-{}-{}", source, target);
        if self.graph.edge(&id).is_none() {
            self.graph.insert_edge(Edge::new(id, source, target, kind).with_label(label));
        }
    }
}

struct Claims(Vec<(usize, usize)>);

impl Claims {
    fn free(&self, start: usize, end: usize) -> bool {
        self.0.iter().all(|&(s, e)| end <= s || start >= e)
    }
    fn take(&mut self, start: usize, end: usize) {
        self.0.push((start, end));
    }
}

fn first_date(sentence: &str) -> Option<String> {
    for re in [&*ISO_DATE, &*MONTH_DAY_YEAR, &*DAY_MONTH_YEAR, &*YEAR] {
        if let Some(m) = re.find(sentence) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

// "July 4, 1776" / "4 July 1776" -> ISO; years and ISO dates go through the shared parser
fn date_key(raw: &str) -> String {
    let cleaned = raw.replace(',', "");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    let month_index = |w: &str| MONTHS.split('|').position(|m| m == w).map(|i| i + 1);
    let iso = match parts.as_slice() {
        [m, d, y] if month_index(m).is_some() => month_index(m).map(|mi| format!("{}/{}/{}", mi, d, y)),
        [d, m, y] if month_index(m).is_some() => month_index(m).map(|mi| format!("{}/{}/{}", mi, d, y)),
        _ => None,
    };
    normalize_date(iso.as_deref().unwrap_or(raw))
}

fn event_label(sentence: &str) -> String {
    let s = sentence.trim().trim_end_matches(['.', '!', '?']);
    if s.chars().count() <= EVENT_LABEL_CHARS {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(EVENT_LABEL_CHARS - 1).collect();
    cut.push('…');
    cut
}

fn clean_place(raw: &str) -> &str {
    raw.strip_prefix("the ").unwrap_or(raw).trim()
}

/// Build a graph of the entities found in `text`. Never fails; text with no
/// recognizable entity yields a single concept node carrying the text.
pub fn extract_entities(text: &str) -> (Graph, ExtractionSummary) {
    let mut b = Builder::new();

    for m in SENTENCE.find_iter(text) {
        let sentence = m.as_str();
        if sentence.trim().is_empty() {
            continue;
        }
        let mut claims = Claims(Vec::new());
        let mut found: Vec<(NodeType, String, usize, usize)> = Vec::new();

        for d in DOCUMENT.find_iter(sentence) {
            let label = d.as_str().strip_prefix("The ").unwrap_or(d.as_str()).trim();
            if label.split_whitespace().count() >= 2 && claims.free(d.start(), d.end()) {
                claims.take(d.start(), d.end());
                found.push((NodeType::Document, label.to_string(), d.start(), d.end()));
            }
        }
        for re in [&*ISO_DATE, &*MONTH_DAY_YEAR, &*DAY_MONTH_YEAR, &*YEAR] {
            for d in re.find_iter(sentence) {
                if claims.free(d.start(), d.end()) {
                    claims.take(d.start(), d.end());
                    found.push((NodeType::Date, d.as_str().to_string(), d.start(), d.end()));
                }
            }
        }
        for c in TITLED_PERSON.find_iter(sentence) {
            if claims.free(c.start(), c.end()) {
                claims.take(c.start(), c.end());
                found.push((NodeType::Person, c.as_str().to_string(), c.start(), c.end()));
            }
        }
        for c in PLACE.captures_iter(sentence) {
            let Some(g) = c.get(1) else { continue };
            let label = clean_place(g.as_str());
            let first = label.split_whitespace().next().unwrap_or_default();
            if is_month(first) || STOPWORDS.contains(&first) || !claims.free(g.start(), g.end()) {
                continue;
            }
            claims.take(g.start(), g.end());
            found.push((NodeType::Place, label.to_string(), g.start(), g.end()));
        }
        for c in NAME_PAIR.find_iter(sentence) {
            let first = c.as_str().split_whitespace().next().unwrap_or_default();
            if STOPWORDS.contains(&first) || is_month(first) || !claims.free(c.start(), c.end()) {
                continue;
            }
            claims.take(c.start(), c.end());
            found.push((NodeType::Person, c.as_str().to_string(), c.start(), c.end()));
        }
        found.sort_by_key(|f| f.2);

        let event_id = first_date(sentence).map(|raw| {
            let mut data = NodeData {
                description: Some(sentence.trim().to_string()),
                category: Some("event".into()),
                size: Some(SizeClass::Medium),
                ..Default::default()
            };
            data.metadata.insert("date".into(), json!(date_key(&raw)));
            b.entity(NodeType::Event, &event_label(sentence), data)
        });

        for (kind, label, _, _) in found {
            let (label, data) = match kind {
                NodeType::Date => {
                    let iso = date_key(&label);
                    let mut data = NodeData::default();
                    data.metadata.insert("date".into(), json!(iso.clone()));
                    (label, data)
                }
                NodeType::Person => (label, NodeData { category: Some("person".into()), ..Default::default() }),
                NodeType::Place => (label, NodeData { category: Some("place".into()), ..Default::default() }),
                _ => (label, NodeData::default()),
            };
            let id = b.entity(kind, &label, data);
            if let Some(ev) = &event_id {
                match kind {
                    NodeType::Date => b.link(ev, &id, EdgeType::Dashed, "occurred on"),
                    NodeType::Person => b.link(&id, ev, EdgeType::Network, "involved in"),
                    NodeType::Place => b.link(ev, &id, EdgeType::Network, "took place in"),
                    NodeType::Document => b.link(ev, &id, EdgeType::Default, "documented by"),
                    _ => {}
                }
            }
        }
    }

    if b.graph.nodes.is_empty() && !text.trim().is_empty() {
        let data = NodeData {
            description: Some(text.trim().to_string()),
            category: Some("primary".into()),
            ..Default::default()
        };
        b.entity(NodeType::Concept, &event_label(text), data);
    }

    log::info!("text extraction: {:?}", b.summary);
    (b.graph, b.summary)
}
