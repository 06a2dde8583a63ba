//! Blocking client for the hosted backend: PostgREST tables for the
//! historical records and an edge function for graph synthesis.

use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use super::historical::{HistoricalData, Timeline, TimelineEvent};
use super::llm::SynthesisRequest;
use super::{GraphSynthesizer, TimelineStore};
use crate::persistence::settings::AppSettings;

pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    function: String,
}

impl SupabaseClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>, function: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build().context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            function: function.into(),
        })
    }

    pub fn from_settings(settings: &AppSettings) -> anyhow::Result<Self> {
        let url = settings.supabase_url.clone().ok_or_else(|| anyhow!("SUPABASE_URL is not configured"))?;
        let key = settings.supabase_anon_key.clone().ok_or_else(|| anyhow!("SUPABASE_ANON_KEY is not configured"))?;
        Self::new(url, key, settings.function_name.clone(), Duration::from_secs(settings.request_timeout_secs))
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}?select=*", self.base_url, table)
    }

    pub fn function_url(&self) -> String {
        format!("{}/functions/v1/{}", self.base_url, self.function)
    }

    fn select<T: DeserializeOwned>(&self, table: &str) -> anyhow::Result<Vec<T>> {
        let url = self.table_url(table);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
            .send()
            .with_context(|| format!("Failed to fetch {}", table))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("{} query failed ({}): {}", table, status, body.chars().take(200).collect::<String>()));
        }
        let rows: Vec<T> = response.json().with_context(|| format!("Malformed {} rows", table))?;
        log::debug!("fetched {} rows from {}", rows.len(), table);
        Ok(rows)
    }
}

impl TimelineStore for SupabaseClient {
    fn load_historical(&self) -> anyhow::Result<HistoricalData> {
        let timelines: Vec<Timeline> = self.select("timelines")?;
        let events: Vec<TimelineEvent> = self.select("timeline_events")?;
        Ok(HistoricalData { timelines, events })
    }
}

impl GraphSynthesizer for SupabaseClient {
    fn synthesize(&self, request: &SynthesisRequest) -> anyhow::Result<String> {
        let response = self
            .http
            .post(self.function_url())
            .bearer_auth(&self.anon_key)
            .header("apikey", &self.anon_key)
            .json(request)
            .send()
            .context("Failed to call graph function")?;
        let status = response.status();
        let body = response.text().context("Failed to read graph function response")?;
        if !status.is_success() {
            return Err(anyhow!("graph function failed ({}): {}", status, body.chars().take(200).collect::<String>()));
        }
        Ok(body)
    }
}
