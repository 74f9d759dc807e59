//! Layer counters, mirrored into the `metrics` facade.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use serde::Serialize;

/// Counters for one layer instance.
#[derive(Debug, Default)]
pub struct LayerMetrics {
    pub tiles_loaded: AtomicU64,
    pub tiles_skipped: AtomicU64,
    pub tiles_unloaded: AtomicU64,
    pub meshes_created: AtomicU64,
    pub meshes_disposed: AtomicU64,
    pub instances_created: AtomicU64,
    pub refreshes: AtomicU64,
    pub refresh_errors: AtomicU64,
    pub frames: AtomicU64,
}

impl LayerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tile_loaded(&self, meshes: usize, instances: usize) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
        self.meshes_created.fetch_add(meshes as u64, Ordering::Relaxed);
        self.instances_created.fetch_add(instances as u64, Ordering::Relaxed);
        counter!("rain_overlay_tiles_synthesized_total").increment(1);
        counter!("rain_overlay_instances_total").increment(instances as u64);
    }

    /// A load that produced nothing: no texture, stale source, or empty tile.
    pub fn record_tile_skipped(&self) {
        self.tiles_skipped.fetch_add(1, Ordering::Relaxed);
        counter!("rain_overlay_tiles_skipped_total").increment(1);
    }

    pub fn record_tile_unloaded(&self, meshes: usize) {
        self.tiles_unloaded.fetch_add(1, Ordering::Relaxed);
        self.meshes_disposed.fetch_add(meshes as u64, Ordering::Relaxed);
        counter!("rain_overlay_tiles_unloaded_total").increment(1);
    }

    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        counter!("rain_overlay_refreshes_total").increment(1);
    }

    /// Meshes freed in bulk: on removal, or when a source swap drops the old
    /// source's tiles.
    pub fn record_teardown(&self, meshes: usize) {
        self.meshes_disposed.fetch_add(meshes as u64, Ordering::Relaxed);
    }

    pub fn record_refresh_error(&self) {
        self.refresh_errors.fetch_add(1, Ordering::Relaxed);
        counter!("rain_overlay_refresh_errors_total").increment(1);
    }

    pub fn record_frame(&self, instances: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        gauge!("rain_overlay_frame_instances").set(instances as f64);
    }

    pub fn snapshot(&self) -> LayerStats {
        LayerStats {
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            tiles_skipped: self.tiles_skipped.load(Ordering::Relaxed),
            tiles_unloaded: self.tiles_unloaded.load(Ordering::Relaxed),
            meshes_created: self.meshes_created.load(Ordering::Relaxed),
            meshes_disposed: self.meshes_disposed.load(Ordering::Relaxed),
            instances_created: self.instances_created.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_errors: self.refresh_errors.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LayerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayerStats {
    pub tiles_loaded: u64,
    pub tiles_skipped: u64,
    pub tiles_unloaded: u64,
    pub meshes_created: u64,
    pub meshes_disposed: u64,
    pub instances_created: u64,
    pub refreshes: u64,
    pub refresh_errors: u64,
    pub frames: u64,
}
