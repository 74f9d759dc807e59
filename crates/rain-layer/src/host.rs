//! The slice of the map host the layer talks to.

use std::collections::{BTreeMap, HashMap};

use rain_common::{RainError, RainResult, TileCoord};
use scene::TextureHandle;
use serde::Serialize;

/// Identifies one installation of the layer's raster source.
///
/// Every catalog refresh installs a new generation; tiles remember which
/// generation loaded them so late callbacks from a replaced source can be
/// told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceGeneration(pub u64);

/// A raster tile as the host hands it to the load/unload hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTile {
    pub coord: TileCoord,
    pub generation: SourceGeneration,
    /// Rendered texture, once the host has one.
    pub texture: Option<TextureHandle>,
}

impl HostTile {
    pub fn new(coord: TileCoord, generation: SourceGeneration) -> Self {
        Self {
            coord,
            generation,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self
    }
}

/// A raster source definition with fully formatted tile URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterSourceSpec {
    pub id: String,
    pub generation: SourceGeneration,
    pub tiles: Vec<String>,
    pub tile_size: u32,
    pub minzoom: u32,
    pub maxzoom: u32,
    pub attribution: Option<String>,
}

/// A raster style layer drawing a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterLayerSpec {
    pub id: String,
    pub source: String,
    pub opacity: f32,
}

/// Map operations the layer consumes.
///
/// The host forwards zoom changes by calling `RainLayer::handle_zoom`.
pub trait MapHost {
    /// Current camera zoom.
    fn zoom(&self) -> f64;

    fn has_source(&self, id: &str) -> bool;

    fn add_source(&mut self, spec: RasterSourceSpec) -> RainResult<()>;

    fn remove_source(&mut self, id: &str) -> RainResult<()>;

    fn has_layer(&self, id: &str) -> bool;

    /// Add a layer, inserted below `before` when given.
    fn add_layer(&mut self, spec: RasterLayerSpec, before: Option<&str>) -> RainResult<()>;

    fn remove_layer(&mut self, id: &str) -> RainResult<()>;

    fn set_layer_zoom_range(&mut self, id: &str, min: f64, max: f64) -> RainResult<()>;

    fn trigger_repaint(&mut self);
}

/// A map host that only keeps books: used by the headless viewer and tests.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    pub zoom: f64,
    pub sources: HashMap<String, RasterSourceSpec>,
    /// Layer ids bottom to top.
    pub layers: Vec<String>,
    pub layer_specs: HashMap<String, RasterLayerSpec>,
    pub zoom_ranges: BTreeMap<String, (f64, f64)>,
    pub repaints: usize,
}

impl HeadlessHost {
    pub fn new(zoom: f64) -> Self {
        Self {
            zoom,
            ..Self::default()
        }
    }

    /// Register a custom layer the way the host would before calling `on_add`.
    pub fn push_layer(&mut self, id: &str) {
        self.layers.push(id.to_string());
    }

    pub fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l == id)
    }

    pub fn source(&self, id: &str) -> Option<&RasterSourceSpec> {
        self.sources.get(id)
    }
}

impl MapHost for HeadlessHost {
    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, spec: RasterSourceSpec) -> RainResult<()> {
        if self.sources.contains_key(&spec.id) {
            return Err(RainError::Host(format!("source '{}' already exists", spec.id)));
        }
        self.sources.insert(spec.id.clone(), spec);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> RainResult<()> {
        if self.layer_specs.values().any(|l| l.source == id) {
            return Err(RainError::Host(format!("source '{id}' is still in use")));
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RainError::Host(format!("no source '{id}'")))
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer_index(id).is_some()
    }

    fn add_layer(&mut self, spec: RasterLayerSpec, before: Option<&str>) -> RainResult<()> {
        if self.has_layer(&spec.id) {
            return Err(RainError::Host(format!("layer '{}' already exists", spec.id)));
        }
        if !self.sources.contains_key(&spec.source) {
            return Err(RainError::Host(format!("no source '{}'", spec.source)));
        }
        let index = match before {
            Some(before) => self
                .layer_index(before)
                .ok_or_else(|| RainError::Host(format!("no layer '{before}'")))?,
            None => self.layers.len(),
        };
        self.layers.insert(index, spec.id.clone());
        self.layer_specs.insert(spec.id.clone(), spec);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> RainResult<()> {
        let index = self
            .layer_index(id)
            .ok_or_else(|| RainError::Host(format!("no layer '{id}'")))?;
        self.layers.remove(index);
        self.layer_specs.remove(id);
        Ok(())
    }

    fn set_layer_zoom_range(&mut self, id: &str, min: f64, max: f64) -> RainResult<()> {
        if !self.has_layer(id) {
            return Err(RainError::Host(format!("no layer '{id}'")));
        }
        self.zoom_ranges.insert(id.to_string(), (min, max));
        Ok(())
    }

    fn trigger_repaint(&mut self) {
        self.repaints += 1;
    }
}
