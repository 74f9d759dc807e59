//! The custom layer the map host drives.

use std::sync::Arc;
use std::time::Duration;

use nalgebra::Matrix4;
use rain_common::{RainError, RainResult, ScaleConfig, SourceConfig, SourcePreset};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::{decode_tile, synthesize_tile, DecodeMode, Palette, TileGeometry};
use scene::{GpuDevice, Materials, MeshId, Scene};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, HttpCatalogClient, ResolvedSource};
use crate::host::{HostTile, MapHost, RasterLayerSpec, RasterSourceSpec, SourceGeneration};
use crate::metrics::{LayerMetrics, LayerStats};
use crate::options::LayerOptions;
use crate::refresh::{fetch_source, RefreshEvent, RefreshTask};
use crate::registry::{TileEntry, TileRegistry};

const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);
const REFRESH_EVENT_CAPACITY: usize = 16;

/// Everything the layer owns while attached to a map. Released as a unit;
/// nothing outlives it.
#[derive(Debug)]
struct LayerResources {
    refresh: Option<RefreshTask>,
    registry: TileRegistry,
    scene: Scene,
    materials: Materials,
    rng: StdRng,
    installed: Option<SourceGeneration>,
}

impl LayerResources {
    /// Tear down in a fixed order: stop the refresh task so no new source can
    /// arrive, forget the registered tiles, then free every GPU buffer.
    /// Returns the number of meshes released.
    fn release(mut self, device: &mut dyn GpuDevice) -> usize {
        if let Some(task) = self.refresh.take() {
            task.abort();
        }
        let tiles = self.registry.drain().len();
        let meshes = self.scene.clear(device);
        debug!(tiles, meshes, "Released layer resources");
        meshes
    }
}

/// Animated precipitation layer.
pub struct RainLayer {
    options: LayerOptions,
    source: SourcePreset,
    palette: Palette,
    decode_mode: DecodeMode,
    client: Arc<dyn CatalogClient>,
    events: broadcast::Sender<RefreshEvent>,
    metrics: Arc<LayerMetrics>,
    resources: Option<LayerResources>,
    next_generation: u64,
}

impl RainLayer {
    /// Resolve the layer's source and scale presets.
    ///
    /// Unknown presets and invalid options fail here; a layer that constructs
    /// can always attach.
    pub fn new(
        options: LayerOptions,
        scales: &ScaleConfig,
        sources: &SourceConfig,
    ) -> RainResult<Self> {
        options.validate().map_err(RainError::InvalidOptions)?;
        let source = sources.get(&options.source)?.clone();
        let palette = Palette::resolve(scales, &options.scale)?;
        let decode_mode = DecodeMode::for_color_table(source.colors.as_deref());
        let client: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(CATALOG_TIMEOUT)?);
        let (events, _) = broadcast::channel(REFRESH_EVENT_CAPACITY);

        info!(
            layer = %options.id,
            source = %options.source,
            scale = %options.scale,
            breakpoints = palette.breakpoints().len(),
            indexed = !decode_mode.has_categories(),
            "Created rain layer"
        );

        Ok(Self {
            options,
            source,
            palette,
            decode_mode,
            client,
            events,
            metrics: Arc::new(LayerMetrics::new()),
            resources: None,
            next_generation: 0,
        })
    }

    /// Replace the HTTP catalog client.
    pub fn with_catalog_client(mut self, client: Arc<dyn CatalogClient>) -> Self {
        self.client = client;
        self
    }

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn source(&self) -> &SourcePreset {
        &self.source
    }

    /// Id of the hidden raster source and layer this layer installs.
    pub fn raster_id(&self) -> String {
        format!("{}-{}", self.options.id, self.options.source)
    }

    /// Receive `refresh` events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> Arc<LayerMetrics> {
        self.metrics.clone()
    }

    pub fn stats(&self) -> LayerStats {
        self.metrics.snapshot()
    }

    pub fn is_attached(&self) -> bool {
        self.resources.is_some()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.resources.as_ref().map(|r| &r.scene)
    }

    pub fn registry(&self) -> Option<&TileRegistry> {
        self.resources.as_ref().map(|r| &r.registry)
    }

    /// Generation of the raster source currently installed on the host.
    pub fn current_generation(&self) -> Option<SourceGeneration> {
        self.resources.as_ref().and_then(|r| r.installed)
    }

    // ========================================================================
    // Host lifecycle
    // ========================================================================

    /// Attach to a map: build the scene and start refreshing the source.
    ///
    /// The refresh task needs a tokio runtime; without one the layer still
    /// works but only refreshes through [`RainLayer::refresh_now`].
    pub fn on_add(&mut self, host: &mut dyn MapHost) -> RainResult<()> {
        if self.resources.is_some() {
            return Err(RainError::Host(format!(
                "layer '{}' is already attached",
                self.options.id
            )));
        }

        let mut scene = Scene::new();
        let base_zoom = scene.set_zoom(host.zoom());

        if let Err(e) =
            host.set_layer_zoom_range(&self.options.id, self.options.min_zoom, self.options.max_zoom)
        {
            warn!(layer = %self.options.id, error = %e, "Could not set layer zoom range");
        }

        let refresh = match Handle::try_current() {
            Ok(runtime) => Some(RefreshTask::spawn(
                &runtime,
                self.client.clone(),
                self.options.source.clone(),
                self.source.clone(),
                self.metrics.clone(),
            )),
            Err(_) => {
                warn!(layer = %self.options.id, "No async runtime, periodic refresh disabled");
                None
            }
        };

        let rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        self.resources = Some(LayerResources {
            refresh,
            registry: TileRegistry::new(),
            scene,
            materials: Materials::new(
                self.options.fill_opacity,
                self.options.rain_color,
                self.options.snow_color,
            ),
            rng,
            installed: None,
        });

        info!(layer = %self.options.id, base_zoom, "Layer added");
        Ok(())
    }

    /// Detach from the map, releasing every GPU resource and the raster
    /// source. Calling it on a detached layer does nothing.
    pub fn on_remove(&mut self, host: &mut dyn MapHost, device: &mut dyn GpuDevice) -> RainResult<()> {
        let Some(resources) = self.resources.take() else {
            return Ok(());
        };
        let meshes = resources.release(device);
        self.metrics.record_teardown(meshes);

        self.remove_raster(host)?;
        info!(layer = %self.options.id, meshes, "Layer removed");
        Ok(())
    }

    /// Zoom-change notification from the host.
    pub fn handle_zoom(&mut self, zoom: f64) {
        if let Some(resources) = self.resources.as_mut() {
            resources.scene.set_zoom(zoom);
        }
    }

    // ========================================================================
    // Tile hooks
    // ========================================================================

    /// Wrap the host's tile load: run `base`, synthesize meshes for the tile
    /// if it succeeded, and hand back `base`'s result untouched.
    pub fn load_tile<E, F>(&mut self, device: &mut dyn GpuDevice, tile: &HostTile, base: F) -> Result<(), E>
    where
        F: FnOnce(&HostTile) -> Result<(), E>,
    {
        let result = base(tile);
        if result.is_ok() {
            self.synthesize(device, tile);
        }
        result
    }

    /// Wrap the host's tile unload: run `base`, dispose the tile's meshes, and
    /// hand back `base`'s result untouched.
    pub fn unload_tile<E, F>(&mut self, device: &mut dyn GpuDevice, tile: &HostTile, base: F) -> Result<(), E>
    where
        F: FnOnce(&HostTile) -> Result<(), E>,
    {
        let result = base(tile);
        self.dispose(device, tile);
        result
    }

    fn synthesize(&mut self, device: &mut dyn GpuDevice, tile: &HostTile) {
        let Some(resources) = self.resources.as_mut() else {
            return;
        };
        let key = tile.coord.cache_key();

        if resources.installed != Some(tile.generation) {
            debug!(tile = %key, generation = tile.generation.0, "Tile from a replaced source");
            self.metrics.record_tile_skipped();
            return;
        }
        if resources.registry.contains(&key) {
            return;
        }
        let Some(group) = tile.coord.zoom_group() else {
            self.metrics.record_tile_skipped();
            return;
        };
        let Some(image) = tile.texture.and_then(|t| device.read_texture(t)) else {
            debug!(tile = %key, "Tile texture not readable yet");
            self.metrics.record_tile_skipped();
            return;
        };

        let grid = decode_tile(&image, &self.decode_mode);
        let geometry = synthesize_tile(
            &tile.coord,
            &grid,
            &self.palette,
            self.decode_mode.has_categories(),
            &mut resources.rng,
        );
        let instances = instance_count(&geometry);

        let meshes = match attach_geometry(&mut resources.scene, device, group, &geometry) {
            Ok(meshes) => meshes,
            Err(e) => {
                warn!(tile = %key, error = %e, "Failed to upload tile meshes");
                self.metrics.record_tile_skipped();
                return;
            }
        };

        debug!(tile = %key, group, meshes = meshes.len(), instances, "Tile meshes attached");
        self.metrics.record_tile_loaded(meshes.len(), instances);
        resources.registry.insert(TileEntry {
            coord: tile.coord,
            generation: tile.generation,
            meshes,
        });
    }

    fn dispose(&mut self, device: &mut dyn GpuDevice, tile: &HostTile) {
        let Some(resources) = self.resources.as_mut() else {
            return;
        };
        let key = tile.coord.cache_key();
        let Some(entry) = resources.registry.remove(&key, tile.generation) else {
            return;
        };
        for id in &entry.meshes {
            resources.scene.remove(&mut *device, *id);
        }
        debug!(tile = %key, meshes = entry.meshes.len(), "Tile meshes disposed");
        self.metrics.record_tile_unloaded(entry.meshes.len());
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Draw one frame at `now_ms` (host clock, milliseconds) with the host's
    /// projection matrix. Applies any refreshed source first.
    pub fn render(
        &mut self,
        host: &mut dyn MapHost,
        device: &mut dyn GpuDevice,
        projection: &Matrix4<f64>,
        now_ms: f64,
    ) -> RainResult<()> {
        if let Err(e) = self.poll_refresh(host, device) {
            warn!(layer = %self.options.id, error = %e, "Failed to apply refreshed source");
        }

        let resources = self.resources.as_mut().ok_or(RainError::NotAttached)?;
        let zoom = host.zoom();
        resources
            .materials
            .update(now_ms, resources.scene.base_zoom(), zoom);

        let frame = resources
            .scene
            .collect_frame(*projection, &resources.materials);
        device.draw(&frame)?;
        self.metrics.record_frame(frame.instance_count());

        if self.options.repaint {
            host.trigger_repaint();
        }
        Ok(())
    }

    // ========================================================================
    // Source refresh
    // ========================================================================

    /// Apply the newest source the background task resolved, if any.
    pub fn poll_refresh(
        &mut self,
        host: &mut dyn MapHost,
        device: &mut dyn GpuDevice,
    ) -> RainResult<Option<RefreshEvent>> {
        let latest = self
            .resources
            .as_mut()
            .and_then(|r| r.refresh.as_mut())
            .and_then(RefreshTask::take_latest);
        match latest {
            Some(resolved) => self.apply_source(host, device, resolved).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the catalog now and swap the source in.
    ///
    /// On failure the current source stays installed.
    pub async fn refresh_now(
        &mut self,
        host: &mut dyn MapHost,
        device: &mut dyn GpuDevice,
    ) -> RainResult<RefreshEvent> {
        if self.resources.is_none() {
            return Err(RainError::NotAttached);
        }
        let client = self.client.clone();
        let resolved = match fetch_source(client.as_ref(), &self.options.source, &self.source).await {
            Ok(resolved) => resolved,
            Err(e) => {
                self.metrics.record_refresh_error();
                return Err(e);
            }
        };
        self.apply_source(host, device, resolved)
    }

    /// Swap the raster source for a freshly resolved one.
    ///
    /// The old source's meshes are disposed with it; tiles the host still
    /// delivers for it afterwards are ignored by generation.
    pub fn apply_source(
        &mut self,
        host: &mut dyn MapHost,
        device: &mut dyn GpuDevice,
        resolved: ResolvedSource,
    ) -> RainResult<RefreshEvent> {
        if self.resources.is_none() {
            return Err(RainError::NotAttached);
        }
        self.remove_raster(host)?;

        let raster_id = self.raster_id();
        self.next_generation += 1;
        let generation = SourceGeneration(self.next_generation);

        let resources = self.resources.as_mut().ok_or(RainError::NotAttached)?;
        resources.installed = None;
        let mut disposed = 0;
        for entry in resources.registry.drain() {
            for id in &entry.meshes {
                resources.scene.remove(&mut *device, *id);
            }
            disposed += entry.meshes.len();
        }
        self.metrics.record_teardown(disposed);

        host.add_source(RasterSourceSpec {
            id: raster_id.clone(),
            generation,
            tiles: resolved.tiles.clone(),
            tile_size: self.source.tile_size,
            minzoom: self.source.minzoom,
            maxzoom: self.source.maxzoom,
            attribution: self.source.attribution.clone(),
        })?;
        let before = host
            .has_layer(&self.options.id)
            .then_some(self.options.id.as_str());
        host.add_layer(
            RasterLayerSpec {
                id: raster_id.clone(),
                source: raster_id.clone(),
                opacity: 0.0,
            },
            before,
        )?;
        resources.installed = Some(generation);

        let event = RefreshEvent {
            layer_id: self.options.id.clone(),
            source: self.options.source.clone(),
            generation,
            timestamp: resolved.timestamp,
            raw_timestamp: resolved.raw_timestamp,
            fetched_at: resolved.fetched_at,
        };
        self.metrics.record_refresh();
        // No subscribers is fine
        let _ = self.events.send(event.clone());

        info!(
            layer = %self.options.id,
            source = %raster_id,
            generation = generation.0,
            timestamp = ?event.timestamp,
            disposed,
            "Raster source refreshed"
        );
        Ok(event)
    }

    fn remove_raster(&self, host: &mut dyn MapHost) -> RainResult<()> {
        let raster_id = self.raster_id();
        if host.has_layer(&raster_id) {
            host.remove_layer(&raster_id)?;
        }
        if host.has_source(&raster_id) {
            host.remove_source(&raster_id)?;
        }
        Ok(())
    }
}

fn instance_count(geometry: &TileGeometry) -> usize {
    geometry.fill.as_ref().map_or(0, |f| f.instance_count())
        + geometry.particles().map(|p| p.instance_count()).sum::<usize>()
}

/// Upload a tile's meshes into `group`, all or nothing.
fn attach_geometry(
    scene: &mut Scene,
    device: &mut dyn GpuDevice,
    group: usize,
    geometry: &TileGeometry,
) -> RainResult<Vec<MeshId>> {
    let mut meshes = Vec::with_capacity(geometry.mesh_count());
    match attach_each(scene, device, group, geometry, &mut meshes) {
        Ok(()) => Ok(meshes),
        Err(e) => {
            for id in meshes {
                scene.remove(&mut *device, id);
            }
            Err(e)
        }
    }
}

fn attach_each(
    scene: &mut Scene,
    device: &mut dyn GpuDevice,
    group: usize,
    geometry: &TileGeometry,
    meshes: &mut Vec<MeshId>,
) -> RainResult<()> {
    if let Some(fill) = &geometry.fill {
        meshes.push(scene.attach_fill(&mut *device, group, fill)?);
    }
    for particles in geometry.particles() {
        meshes.push(scene.attach_particles(&mut *device, group, particles)?);
    }
    Ok(())
}
