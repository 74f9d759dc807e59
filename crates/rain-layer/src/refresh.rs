//! Periodic catalog refresh.
//!
//! The fetch runs on the tokio runtime; the resolved source travels back over
//! a channel and is applied on the render thread the next time the layer
//! renders, so the scene is only ever touched from one thread.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rain_common::{RainResult, SourcePreset};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, instrument};

use crate::catalog::{resolve_source, CatalogClient, ResolvedSource};
use crate::host::SourceGeneration;
use crate::metrics::LayerMetrics;

/// Fired every time the layer installs a fresh raster source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshEvent {
    pub layer_id: String,
    pub source: String,
    pub generation: SourceGeneration,
    /// Catalog frame timestamp, when it is numeric.
    pub timestamp: Option<i64>,
    pub raw_timestamp: String,
    pub fetched_at: DateTime<Utc>,
}

/// Fetch a source's catalog and format its templates.
#[instrument(skip(client, preset), fields(catalog = %preset.catalog))]
pub async fn fetch_source(
    client: &dyn CatalogClient,
    source: &str,
    preset: &SourcePreset,
) -> RainResult<ResolvedSource> {
    let catalog = client.fetch_catalog(&preset.catalog).await?;
    resolve_source(preset, &catalog)
}

/// Background task refreshing one source on its preset interval.
///
/// Aborted when dropped.
#[derive(Debug)]
pub(crate) struct RefreshTask {
    handle: JoinHandle<()>,
    receiver: mpsc::Receiver<ResolvedSource>,
}

impl RefreshTask {
    pub(crate) fn spawn(
        runtime: &Handle,
        client: Arc<dyn CatalogClient>,
        source: String,
        preset: SourcePreset,
        metrics: Arc<LayerMetrics>,
    ) -> Self {
        let (tx, receiver) = mpsc::channel(4);
        let period = preset.interval();

        let handle = runtime.spawn(async move {
            // First tick fires immediately
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match fetch_source(client.as_ref(), &source, &preset).await {
                    Ok(resolved) => {
                        if tx.send(resolved).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        metrics.record_refresh_error();
                        error!(source = %source, error = %e, "Catalog refresh failed");
                    }
                }
            }
        });

        Self { handle, receiver }
    }

    /// Newest resolved source waiting to be applied, skipping older ones.
    pub(crate) fn take_latest(&mut self) -> Option<ResolvedSource> {
        let mut latest = None;
        while let Ok(resolved) = self.receiver.try_recv() {
            latest = Some(resolved);
        }
        latest
    }

    pub(crate) fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
