use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, bail};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use super::settings::AppSettings;
use crate::graph_utils::graph::Graph;
use crate::interaction::controller::ViewState;

/// Everything restored on the next start: the graph and how it was viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppStateFile {
    pub graph: Graph,
    #[serde(default)]
    pub view: ViewState,
}

impl AppStateFile {
    pub fn new(graph: &Graph, view: &ViewState) -> Self {
        Self { graph: graph.clone(), view: view.clone() }
    }
}

static SETTINGS_OVERRIDE: OnceLock<AppSettings> = OnceLock::new();

pub fn set_settings_override(settings: AppSettings) {
    let _ = SETTINGS_OVERRIDE.set(settings);
}

fn autosave_dir() -> PathBuf {
    if let Some(settings) = SETTINGS_OVERRIDE.get() {
        return settings.autosave_dir();
    }
    AppSettings::load().unwrap_or_default().autosave_dir()
}

pub fn active_state_path() -> PathBuf {
    autosave_dir().join("state.ron")
}

fn timestamp() -> String {
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::now_utc().format(fmt).unwrap_or_else(|_| "unknown".to_string())
}

pub fn versioned_state_path_now() -> PathBuf {
    autosave_dir().join(format!("state_{}.ron", timestamp()))
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(data)?;
        f.flush()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

pub fn save_to_path(state: &AppStateFile, path: &Path) -> anyhow::Result<()> {
    let pretty = PrettyConfig::new().separate_tuple_members(true).enumerate_arrays(true);
    let s = ron::ser::to_string_pretty(state, pretty)?;
    atomic_write(path, s.as_bytes())?;
    log::debug!("saved state ({} nodes) to {}", state.graph.node_count(), path.display());
    Ok(())
}

pub fn save_active(state: &AppStateFile) -> anyhow::Result<PathBuf> {
    let path = active_state_path();
    save_to_path(state, &path)?;
    Ok(path)
}

pub fn save_versioned(state: &AppStateFile) -> anyhow::Result<PathBuf> {
    let path = versioned_state_path_now();
    save_to_path(state, &path)?;
    Ok(path)
}

pub fn load_active() -> anyhow::Result<Option<AppStateFile>> {
    let path = active_state_path();
    if !path.exists() {
        return Ok(None);
    }
    load_from_path(&path).map(Some)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppStateFile> {
    let buf = read_text(path)?;
    let state: AppStateFile = ron::from_str(&buf).with_context(|| format!("parsing {}", path.display()))?;
    Ok(state)
}

pub fn list_versions_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = Vec::new();
    if dir.exists() {
        for e in fs::read_dir(dir)? {
            let p = e?.path();
            if let Some(name) = p.file_name().and_then(|s| s.to_str())
                && name.starts_with("state_")
                && name.ends_with(".ron")
            {
                entries.push(p);
            }
        }
    }
    // newest first, the timestamp sorts lexically
    entries.sort();
    entries.reverse();
    Ok(entries)
}

/// Serialize to the `{ "nodes": [...], "edges": [...] }` exchange format.
pub fn graph_to_json(graph: &Graph) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Parse the exchange format, rejecting duplicate node ids and edges that
/// point at missing nodes.
pub fn graph_from_json(text: &str) -> anyhow::Result<Graph> {
    let graph: Graph = serde_json::from_str(text).context("graph JSON does not match the node/edge format")?;
    let dups = graph.duplicate_node_ids();
    if !dups.is_empty() {
        bail!("duplicate node ids: {}", dups.join(", "));
    }
    if let Some(e) = graph.dangling_edges().first() {
        bail!("edge {} references a missing node ({} -> {})", e.id, e.source, e.target);
    }
    Ok(graph)
}

pub fn export_graph_json(graph: &Graph, path: &Path) -> anyhow::Result<()> {
    atomic_write(path, graph_to_json(graph)?.as_bytes())?;
    log::info!("exported {} nodes, {} edges to {}", graph.node_count(), graph.edge_count(), path.display());
    Ok(())
}

pub fn import_graph_json(path: &Path) -> anyhow::Result<Graph> {
    graph_from_json(&read_text(path)?).with_context(|| format!("importing {}", path.display()))
}

#[derive(Serialize)]
struct NodeRow<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    label: &'a str,
    category: &'a str,
    date: &'a str,
    x: f64,
    y: f64,
    degree: usize,
}

/// Flat node table for spreadsheets.
pub fn export_nodes_csv(graph: &Graph, path: &Path) -> anyhow::Result<()> {
    let mut w = csv::Writer::from_writer(Vec::new());
    for n in &graph.nodes {
        w.serialize(NodeRow {
            id: &n.id,
            kind: n.kind.as_str(),
            label: &n.data.label,
            category: n.data.category.as_deref().unwrap_or_default(),
            date: n.data.date().unwrap_or_default(),
            x: n.position.x,
            y: n.position.y,
            degree: graph.degree(&n.id),
        })?;
    }
    let bytes = w.into_inner().map_err(|e| anyhow::anyhow!("flushing csv: {}", e))?;
    atomic_write(path, &bytes)?;
    Ok(())
}

/// `{export_dir}/graph_<timestamp>.<ext>`
pub fn default_export_path(settings: &AppSettings, ext: &str) -> PathBuf {
    settings.export_dir().join(format!("graph_{}.{}", timestamp(), ext))
}
