//! Source and color-scale presets.
//!
//! Scale presets are JSON (`config/scales.json`), source presets are YAML
//! (`config/sources.yaml`). Both files are embedded as defaults and can be
//! overridden from a configuration directory at runtime.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::color::Color;
use crate::error::{RainError, RainResult};

const DEFAULT_SCALES: &str = include_str!("../../../config/scales.json");
const DEFAULT_SOURCES: &str = include_str!("../../../config/sources.yaml");

// ============================================================================
// Scales
// ============================================================================

/// Root scale configuration: named color scales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConfig {
    #[serde(default = "default_version")]
    pub version: String,

    pub scales: HashMap<String, ScalePreset>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// How a scale's breakpoint values map to class thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// A stop's value is the threshold itself.
    #[default]
    Leading,
    /// The threshold sits halfway between a stop and the next one.
    Center,
}

/// A named color scale: ordered value/color stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalePreset {
    #[serde(default)]
    pub name: Option<String>,

    /// Unit label for display
    #[serde(default)]
    pub units: Option<String>,

    #[serde(default)]
    pub align: Alignment,

    pub scale: Vec<ScaleStop>,
}

/// A single stop in a color scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleStop {
    pub value: f64,
    pub color: Color,
}

impl ScalePreset {
    pub fn validate(&self) -> Result<(), String> {
        if self.scale.is_empty() {
            return Err("Scale must have at least 1 stop".to_string());
        }
        for pair in self.scale.windows(2) {
            if pair[1].value <= pair[0].value {
                return Err("Scale stops must be in ascending value order".to_string());
            }
        }
        if self.scale.iter().any(|s| !s.value.is_finite()) {
            return Err("Scale stop values must be finite".to_string());
        }
        Ok(())
    }
}

impl ScaleConfig {
    /// The scales bundled with the crate.
    pub fn builtin() -> RainResult<Self> {
        Self::from_json(DEFAULT_SCALES)
    }

    pub fn from_json(json: &str) -> RainResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RainResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading scale presets");
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Look up a scale by name. Unknown names are fatal for the caller.
    pub fn get(&self, name: &str) -> RainResult<&ScalePreset> {
        self.scales
            .get(name)
            .ok_or_else(|| RainError::UnknownScale(name.to_string()))
    }

    pub fn validate(&self) -> RainResult<()> {
        for (name, preset) in &self.scales {
            preset.validate().map_err(|message| RainError::InvalidScale {
                name: name.clone(),
                message,
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Root source configuration: named raster data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub sources: HashMap<String, SourcePreset>,
}

/// A raster radar source and the catalog that enumerates its frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePreset {
    #[serde(default)]
    pub name: String,

    /// Catalog JSON endpoint
    pub catalog: String,

    /// Tile URL templates, interpolated against the catalog
    pub tiles: Vec<String>,

    /// Template that yields the frame timestamp from the catalog
    pub timestamp: String,

    /// Seconds between catalog refreshes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    #[serde(default)]
    pub minzoom: u32,

    #[serde(default = "default_maxzoom")]
    pub maxzoom: u32,

    #[serde(default)]
    pub attribution: Option<String>,

    /// Discrete color table; present means tiles are decoded by color index.
    #[serde(default)]
    pub colors: Option<Vec<Color>>,
}

fn default_interval() -> u64 {
    300
}

fn default_tile_size() -> u32 {
    256
}

fn default_maxzoom() -> u32 {
    22
}

impl SourcePreset {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tiles.is_empty() {
            return Err("Source must have at least 1 tile template".to_string());
        }
        if self.interval_secs == 0 {
            return Err("Refresh interval must be positive".to_string());
        }
        if self.minzoom > self.maxzoom {
            return Err("minzoom must not exceed maxzoom".to_string());
        }
        if matches!(&self.colors, Some(colors) if colors.is_empty()) {
            return Err("Color table must not be empty".to_string());
        }
        Ok(())
    }
}

impl SourceConfig {
    /// The sources bundled with the crate.
    pub fn builtin() -> RainResult<Self> {
        Self::from_yaml(DEFAULT_SOURCES)
    }

    pub fn from_yaml(yaml: &str) -> RainResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> RainResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading source presets");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn get(&self, name: &str) -> RainResult<&SourcePreset> {
        self.sources
            .get(name)
            .ok_or_else(|| RainError::UnknownSource(name.to_string()))
    }

    pub fn validate(&self) -> RainResult<()> {
        for (name, preset) in &self.sources {
            preset.validate().map_err(|message| RainError::InvalidSource {
                name: name.clone(),
                message,
            })?;
        }
        Ok(())
    }
}

/// Load `scales.json` and `sources.yaml` from `dir`, falling back to the
/// bundled presets for any file that is absent.
pub fn load_presets(dir: impl AsRef<Path>) -> RainResult<(ScaleConfig, SourceConfig)> {
    let dir = dir.as_ref();

    let scales_path = dir.join("scales.json");
    let scales = if scales_path.exists() {
        ScaleConfig::from_file(&scales_path)?
    } else {
        ScaleConfig::builtin()?
    };

    let sources_path = dir.join("sources.yaml");
    let sources = if sources_path.exists() {
        SourceConfig::from_file(&sources_path)?
    } else {
        SourceConfig::builtin()?
    };

    info!(
        scales = scales.scales.len(),
        sources = sources.sources.len(),
        dir = %dir.display(),
        "Loaded presets"
    );
    Ok((scales, sources))
}
