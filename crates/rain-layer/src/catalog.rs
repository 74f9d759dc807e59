//! Radar catalog fetching and source template resolution.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rain_common::{format_template, RainError, RainResult, SourcePreset};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// Something that can produce a source's catalog document.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_catalog(&self, url: &str) -> RainResult<Value>;
}

/// Fetches catalogs over HTTP.
pub struct HttpCatalogClient {
    client: Client,
}

impl HttpCatalogClient {
    pub fn new(timeout: Duration) -> RainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rain-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RainError::Catalog(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn fetch_catalog(&self, url: &str) -> RainResult<Value> {
        debug!(url = %url, "Fetching catalog");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RainError::Catalog(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RainError::Catalog(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RainError::Catalog(format!("Invalid catalog JSON: {e}")))
    }
}

/// Serves one fixed catalog document regardless of URL.
#[derive(Debug, Clone)]
pub struct StaticCatalogClient {
    catalog: Value,
}

impl StaticCatalogClient {
    pub fn new(catalog: Value) -> Self {
        Self { catalog }
    }

    pub fn from_file(path: impl AsRef<Path>) -> RainResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let catalog = serde_json::from_str(&content)
            .map_err(|e| RainError::Catalog(format!("Invalid catalog JSON: {e}")))?;
        Ok(Self::new(catalog))
    }
}

#[async_trait]
impl CatalogClient for StaticCatalogClient {
    async fn fetch_catalog(&self, _url: &str) -> RainResult<Value> {
        Ok(self.catalog.clone())
    }
}

/// A source preset with its templates filled in from one catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSource {
    /// Tile URLs with only the host's `{z}/{x}/{y}` placeholders left.
    pub tiles: Vec<String>,
    /// Formatted timestamp template, as text.
    pub raw_timestamp: String,
    /// The timestamp as a number when it parses as one.
    pub timestamp: Option<i64>,
    pub fetched_at: DateTime<Utc>,
}

impl ResolvedSource {
    /// Frame time, reading the timestamp as Unix seconds.
    pub fn frame_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Format a preset's tile and timestamp templates against `catalog`.
///
/// Any template field the catalog lacks fails the whole resolution.
pub fn resolve_source(preset: &SourcePreset, catalog: &Value) -> RainResult<ResolvedSource> {
    let tiles = preset
        .tiles
        .iter()
        .map(|t| format_template(t, catalog))
        .collect::<RainResult<Vec<_>>>()?;
    let raw_timestamp = format_template(&preset.timestamp, catalog)?;
    let timestamp = raw_timestamp.trim().parse::<f64>().ok().map(|t| t as i64);

    Ok(ResolvedSource {
        tiles,
        raw_timestamp,
        timestamp,
        fetched_at: Utc::now(),
    })
}
