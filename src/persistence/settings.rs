use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const APP_DIR: &str = "HistoViz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // If None, use OS default autosave directory
    #[serde(default)]
    pub autosave_override: Option<PathBuf>,
    // If None, use OS temporary directory for exports
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // Hosted data store and cloud function (Supabase)
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default = "AppSettings::default_function_name")]
    pub function_name: String,
    #[serde(default = "AppSettings::default_timeout")]
    pub request_timeout_secs: u64,
    // Offline historical records (timelines.csv, timeline_events.csv)
    #[serde(default)]
    pub csv_store_dir: Option<PathBuf>,
    // Viewer preferences restored on start
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "AppSettings::enabled")]
    pub show_minimap: bool,
    #[serde(default = "AppSettings::enabled")]
    pub show_grid: bool,
    // Fixed seed makes the force layout and node placement reproducible
    #[serde(default)]
    pub layout_seed: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            autosave_override: None,
            export_override: None,
            supabase_url: None,
            supabase_anon_key: None,
            function_name: Self::default_function_name(),
            request_timeout_secs: Self::default_timeout(),
            csv_store_dir: None,
            dark_mode: false,
            show_minimap: true,
            show_grid: true,
            layout_seed: None,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/HistoViz
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/HistoViz or ~/.config/HistoViz
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join(APP_DIR);
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join(APP_DIR);
        }
    }

    fn autosave_default_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            let tmp = std::env::var_os("TMPDIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
            return tmp.join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                return PathBuf::from(local).join(APP_DIR).join("Autosave");
            }
            if let Ok(temp) = std::env::var("TEMP") {
                return PathBuf::from(temp).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_STATE_HOME/histoviz or ~/.local/state/histoviz, else /tmp/HistoViz
            if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
                return PathBuf::from(xdg).join("histoviz");
            }
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(home).join(".local").join("state").join("histoviz");
            }
            return PathBuf::from("/tmp").join(APP_DIR);
        }
    }

    /// Settings file merged with the environment. A missing file yields defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        let mut settings = if path.exists() {
            let mut f = fs::File::open(&path)?;
            let mut s = String::new();
            f.read_to_string(&mut s)?;
            serde_json::from_str(&s)?
        } else {
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Environment wins over the settings file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(url) = get("SUPABASE_URL") {
            self.supabase_url = Some(url);
        }
        if let Some(key) = get("SUPABASE_ANON_KEY") {
            self.supabase_anon_key = Some(key);
        }
        if let Some(name) = get("HISTOVIZ_FUNCTION") {
            self.function_name = name;
        }
        if let Some(dir) = get("HISTOVIZ_CSV_DIR") {
            self.csv_store_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn has_remote(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_anon_key.is_some()
    }

    pub fn autosave_dir(&self) -> PathBuf {
        if let Some(p) = &self.autosave_override { return p.clone(); }
        Self::autosave_default_dir()
    }

    /// {temp_dir}/HistoViz/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(APP_DIR);
        p.push("exports");
        p
    }

    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub(crate) fn default_function_name() -> String { "process-historical-data".to_string() }
    pub(crate) fn default_timeout() -> u64 { 60 }
    fn enabled() -> bool { true }
}
