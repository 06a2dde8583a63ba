//! External data: the historical record store, the graph synthesizer, and
//! the local fallbacks used when either is unavailable.

pub mod csv_store;
pub mod extract;
pub mod historical;
pub mod llm;
pub mod supabase;

use crate::graph_utils::graph::Graph;
use crate::layout::{self, LayoutConfig, LayoutKind};
use crate::persistence::settings::AppSettings;
use csv_store::CsvTimelineStore;
use historical::HistoricalData;
use llm::{CoercionReport, SynthesisRequest};
use supabase::SupabaseClient;

/// Read-only access to `timelines` and `timeline_events`.
pub trait TimelineStore {
    fn load_historical(&self) -> anyhow::Result<HistoricalData>;
}

/// Turns historical records or free text into a graph. Returns the raw reply
/// body; validation happens in [`llm::parse_graph_response`].
pub trait GraphSynthesizer {
    fn synthesize(&self, request: &SynthesisRequest) -> anyhow::Result<String>;
}

// Already-loaded records act as a store
impl TimelineStore for HistoricalData {
    fn load_historical(&self) -> anyhow::Result<HistoricalData> {
        Ok(self.clone())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    Synthesized,
    Fallback,
}

#[derive(Clone, Debug)]
pub struct GraphOutcome {
    pub graph: Graph,
    pub provenance: Provenance,
    pub coercion: CoercionReport,
    // Why the fallback was used, if it was
    pub fallback_reason: Option<String>,
}

impl GraphOutcome {
    fn fallback(graph: Graph, reason: String) -> Self {
        log::warn!("using local fallback: {}", reason);
        Self { graph, provenance: Provenance::Fallback, coercion: CoercionReport::default(), fallback_reason: Some(reason) }
    }
}

fn try_synthesize(synth: Option<&dyn GraphSynthesizer>, request: &SynthesisRequest) -> Result<(Graph, CoercionReport), String> {
    let Some(synth) = synth else {
        return Err("no graph synthesizer configured".to_string());
    };
    let body = synth.synthesize(request).map_err(|e| format!("graph synthesis failed: {:#}", e))?;
    llm::parse_graph_response(&body).ok_or_else(|| "graph synthesis returned no usable graph".to_string())
}

/// Load the historical records and turn them into a graph. Store errors
/// propagate. A synthesized graph is kept as returned; when synthesis fails
/// the [`historical::simple_visualization`] graph is laid out on the timeline.
pub fn visualize_historical(
    store: &dyn TimelineStore,
    synth: Option<&dyn GraphSynthesizer>,
    config: &LayoutConfig,
) -> anyhow::Result<GraphOutcome> {
    let data = store.load_historical()?;
    log::info!("loaded {} timelines, {} events", data.timelines.len(), data.events.len());
    let request = SynthesisRequest::Historical { timelines: data.timelines.clone(), events: data.events.clone() };
    let outcome = match try_synthesize(synth, &request) {
        Ok((graph, coercion)) => GraphOutcome { graph, provenance: Provenance::Synthesized, coercion, fallback_reason: None },
        Err(reason) => {
            let mut graph = historical::simple_visualization(&data);
            layout::apply_layout(&mut graph, LayoutKind::Timeline, config);
            GraphOutcome::fallback(graph, reason)
        }
    };
    Ok(outcome)
}

/// Free text to graph. Never fails: without a working synthesizer the
/// rule-based extractor is used.
pub fn visualize_text(text: &str, synth: Option<&dyn GraphSynthesizer>) -> GraphOutcome {
    let request = SynthesisRequest::Text { user_text: text.to_string() };
    match try_synthesize(synth, &request) {
        Ok((graph, coercion)) => GraphOutcome { graph, provenance: Provenance::Synthesized, coercion, fallback_reason: None },
        Err(reason) => GraphOutcome::fallback(extract::extract_entities(text).0, reason),
    }
}

/// Collaborators configured by the settings. A CSV directory, when set, is
/// the record store even if a hosted backend is configured.
#[derive(Default)]
pub struct DataSources {
    pub store: Option<Box<dyn TimelineStore + Send>>,
    pub synthesizer: Option<Box<dyn GraphSynthesizer + Send>>,
}

impl DataSources {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let remote = |what: &str| {
            if !settings.has_remote() {
                return None;
            }
            SupabaseClient::from_settings(settings)
                .map_err(|e| log::warn!("{} unavailable: {:#}", what, e))
                .ok()
        };
        let store: Option<Box<dyn TimelineStore + Send>> = match &settings.csv_store_dir {
            Some(dir) => Some(Box::new(CsvTimelineStore::new(dir.clone()))),
            None => remote("record store").map(|c| Box::new(c) as Box<dyn TimelineStore + Send>),
        };
        let synthesizer = remote("graph synthesizer").map(|c| Box::new(c) as Box<dyn GraphSynthesizer + Send>);
        Self { store, synthesizer }
    }

    fn synth(&self) -> Option<&dyn GraphSynthesizer> {
        self.synthesizer.as_deref().map(|s| s as &dyn GraphSynthesizer)
    }

    pub fn visualize_historical(&self, config: &LayoutConfig) -> anyhow::Result<GraphOutcome> {
        let store = self
            .store
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no historical data source configured (set SUPABASE_URL/SUPABASE_ANON_KEY or HISTOVIZ_CSV_DIR)"))?;
        visualize_historical(store, self.synth(), config)
    }

    pub fn visualize_text(&self, text: &str) -> GraphOutcome {
        visualize_text(text, self.synth())
    }
}
