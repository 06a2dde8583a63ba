use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;

use super::TimelineStore;
use super::historical::{HistoricalData, Timeline, TimelineEvent};

pub const TIMELINES_FILE: &str = "timelines.csv";
pub const EVENTS_FILE: &str = "timeline_events.csv";

/// Offline store: a directory holding `timelines.csv` and
/// `timeline_events.csv` with the same columns as the hosted tables.
#[derive(Clone, Debug)]
pub struct CsvTimelineStore {
    dir: PathBuf,
}

impl CsvTimelineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, rec) in reader.deserialize().enumerate() {
        // header is line 1
        rows.push(rec.with_context(|| format!("{} line {}", path.display(), i + 2))?);
    }
    Ok(rows)
}

impl TimelineStore for CsvTimelineStore {
    fn load_historical(&self) -> anyhow::Result<HistoricalData> {
        let timelines: Vec<Timeline> = read_rows(&self.dir.join(TIMELINES_FILE))?;
        let events_path = self.dir.join(EVENTS_FILE);
        // A store may hold timelines only
        let events: Vec<TimelineEvent> = if events_path.exists() { read_rows(&events_path)? } else { Vec::new() };
        log::debug!("csv store {}: {} timelines, {} events", self.dir.display(), timelines.len(), events.len());
        Ok(HistoricalData { timelines, events })
    }
}
