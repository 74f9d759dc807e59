//! Per-instance layer options.

use rain_common::Color;
use serde::{Deserialize, Serialize};

/// Options one layer instance is created with.
///
/// Deserializes from JSON with every field but `id` optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOptions {
    /// Host layer id; also the anchor the hidden raster layer is inserted below.
    pub id: String,

    /// Source preset name
    #[serde(default = "default_source")]
    pub source: String,

    /// Scale preset name
    #[serde(default = "default_scale")]
    pub scale: String,

    #[serde(default = "default_particle_color")]
    pub rain_color: Color,

    #[serde(default = "default_particle_color")]
    pub snow_color: Color,

    /// Opacity of the intensity boxes
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f32,

    /// Request a repaint after every frame to keep particles falling
    #[serde(default = "default_repaint")]
    pub repaint: bool,

    #[serde(default)]
    pub min_zoom: f64,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// Fixed seed for particle jitter; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_source() -> String {
    "rainviewer".to_string()
}

fn default_scale() -> String {
    "noaa".to_string()
}

fn default_particle_color() -> Color {
    Color::WHITE
}

fn default_fill_opacity() -> f32 {
    0.1
}

fn default_repaint() -> bool {
    true
}

fn default_max_zoom() -> f64 {
    24.0
}

impl LayerOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: default_source(),
            scale: default_scale(),
            rain_color: default_particle_color(),
            snow_color: default_particle_color(),
            fill_opacity: default_fill_opacity(),
            repaint: default_repaint(),
            min_zoom: 0.0,
            max_zoom: default_max_zoom(),
            seed: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Layer id must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.fill_opacity) {
            return Err(format!("fill_opacity {} outside 0..=1", self.fill_opacity));
        }
        if self.min_zoom > self.max_zoom {
            return Err("min_zoom must not exceed max_zoom".to_string());
        }
        Ok(())
    }
}
