//! Layer lifecycle tests against the headless host and device.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use image::RgbaImage;
use nalgebra::Matrix4;
use rain_common::{RainError, RainResult, ScaleConfig, SourceConfig, TileCoord};
use rain_layer::{
    resolve_source, HeadlessHost, HostTile, LayerOptions, MapHost, RainLayer, SourceGeneration,
    StaticCatalogClient,
};
use scene::{
    BufferData, BufferId, BufferKind, GpuDevice, HeadlessDevice, MeshKind, RenderFrame,
    TextureHandle,
};
use test_utils::{
    rainviewer_catalog, split_phase_tile, tiles, uniform_raw_tile, LATEST_FRAME_TIME,
    SCALES_JSON, SOURCES_YAML,
};

struct Harness {
    layer: RainLayer,
    host: HeadlessHost,
    device: HeadlessDevice,
}

fn presets() -> (ScaleConfig, SourceConfig) {
    (
        ScaleConfig::from_json(SCALES_JSON).unwrap(),
        SourceConfig::from_yaml(SOURCES_YAML).unwrap(),
    )
}

fn options() -> LayerOptions {
    LayerOptions::new("rain")
        .with_source("test")
        .with_scale("steps")
        .with_seed(11)
}

/// An attached layer with its first source installed.
fn harness(zoom: f64) -> Harness {
    let (scales, sources) = presets();
    let mut layer = RainLayer::new(options(), &scales, &sources)
        .unwrap()
        .with_catalog_client(Arc::new(StaticCatalogClient::new(rainviewer_catalog())));
    let mut host = HeadlessHost::new(zoom);
    host.push_layer("rain");
    let mut device = HeadlessDevice::new();

    layer.on_add(&mut host).unwrap();
    let resolved = resolve_source(layer.source(), &rainviewer_catalog()).unwrap();
    layer.apply_source(&mut host, &mut device, resolved).unwrap();

    Harness {
        layer,
        host,
        device,
    }
}

impl Harness {
    fn tile(&mut self, z: u32, x: u32, y: u32, image: image::RgbaImage) -> HostTile {
        let texture = self.device.insert_texture(image);
        HostTile::new(TileCoord::new(z, x, y), self.layer.current_generation().unwrap())
            .with_texture(texture)
    }

    fn load(&mut self, tile: &HostTile) -> Result<(), String> {
        self.layer.load_tile(&mut self.device, tile, |_| Ok::<(), String>(()))
    }

    fn unload(&mut self, tile: &HostTile) -> Result<(), String> {
        self.layer.unload_tile(&mut self.device, tile, |_| Ok::<(), String>(()))
    }

    fn group_len(&self, level: usize) -> usize {
        self.layer.scene().unwrap().group(level).unwrap().len()
    }

    fn registered(&self) -> usize {
        self.layer.registry().unwrap().len()
    }
}

/// Headless device that also notes every buffer and texture call, in order,
/// into a journal the test can share with the base hooks.
struct JournalDevice {
    inner: HeadlessDevice,
    journal: Rc<RefCell<Vec<&'static str>>>,
}

impl GpuDevice for JournalDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> RainResult<BufferId> {
        self.journal.borrow_mut().push("upload");
        self.inner.create_buffer(kind, data)
    }

    fn release_buffer(&mut self, id: BufferId) {
        self.journal.borrow_mut().push("release");
        self.inner.release_buffer(id)
    }

    fn read_texture(&mut self, texture: TextureHandle) -> Option<RgbaImage> {
        self.journal.borrow_mut().push("read");
        self.inner.read_texture(texture)
    }

    fn draw(&mut self, frame: &RenderFrame) -> RainResult<()> {
        self.inner.draw(frame)
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_unknown_presets_are_fatal() {
    let (scales, sources) = presets();

    let err = RainLayer::new(options().with_scale("missing"), &scales, &sources)
        .err()
        .unwrap();
    assert!(matches!(err, RainError::UnknownScale(_)));
    assert!(err.is_fatal());

    let err = RainLayer::new(options().with_source("missing"), &scales, &sources)
        .err()
        .unwrap();
    assert!(matches!(err, RainError::UnknownSource(_)));
}

#[test]
fn test_invalid_options_are_fatal() {
    let (scales, sources) = presets();
    let mut bad = options();
    bad.fill_opacity = 2.0;
    assert!(matches!(
        RainLayer::new(bad, &scales, &sources),
        Err(RainError::InvalidOptions(_))
    ));
}

// ============================================================================
// Attach / detach
// ============================================================================

#[test]
fn test_on_add_sets_zoom_group_and_range() {
    let h = harness(7.6);
    let scene = h.layer.scene().unwrap();
    assert_eq!(scene.base_zoom(), 8);
    assert_eq!(h.host.zoom_ranges.get("rain"), Some(&(0.0, 24.0)));
}

#[test]
fn test_source_installed_below_layer_hidden() {
    let h = harness(3.0);
    let raster_id = h.layer.raster_id();
    assert_eq!(h.host.layers, vec![raster_id.clone(), "rain".to_string()]);
    assert_eq!(h.host.layer_specs[&raster_id].opacity, 0.0);
    assert_eq!(
        h.host.source(&raster_id).unwrap().tiles,
        vec!["https://tilecache.rainviewer.com/v2/radar/1700000600/256/{z}/{x}/{y}/0/0_1.png".to_string()]
    );
}

#[test]
fn test_double_attach_is_rejected() {
    let mut h = harness(3.0);
    assert!(h.layer.on_add(&mut h.host).is_err());
}

#[test]
fn test_on_remove_releases_everything() {
    let mut h = harness(3.0);
    for (x, y) in [(0, 0), (1, 0), (1, 1)] {
        let tile = h.tile(4, x, y, split_phase_tile(16, 16, 60));
        h.load(&tile).unwrap();
    }
    assert!(h.device.live_buffers() > 0);

    h.layer.on_remove(&mut h.host, &mut h.device).unwrap();
    assert!(!h.layer.is_attached());
    assert_eq!(h.device.live_buffers(), 0);
    assert_eq!(h.device.stale_releases, 0);
    assert_eq!(h.host.layers, vec!["rain".to_string()]);
    assert!(h.host.sources.is_empty());

    // Second removal and late hooks are no-ops
    h.layer.on_remove(&mut h.host, &mut h.device).unwrap();
    let tile = HostTile::new(TileCoord::new(4, 0, 0), SourceGeneration(1));
    assert!(h.unload(&tile).is_ok());
}

// ============================================================================
// Tile hooks
// ============================================================================

#[test]
fn test_load_then_unload_round_trip() {
    let mut h = harness(3.0);
    let before = (h.group_len(3), h.registered(), h.device.live_buffers());

    let tile = h.tile(4, 2, 3, split_phase_tile(16, 16, 60));
    h.load(&tile).unwrap();
    assert_eq!(h.group_len(3), 3);
    assert_eq!(h.registered(), 1);

    h.unload(&tile).unwrap();
    assert_eq!((h.group_len(3), h.registered(), h.device.live_buffers()), before);

    // Unloading again is harmless
    h.unload(&tile).unwrap();
    assert_eq!(h.device.stale_releases, 0);
}

#[test]
fn test_reentrant_load_does_not_duplicate() {
    let mut h = harness(3.0);
    let tile = h.tile(5, 9, 9, uniform_raw_tile(8, 8, 70, false));

    h.load(&tile).unwrap();
    let buffers = h.device.live_buffers();
    h.load(&tile).unwrap();
    h.load(&tile).unwrap();

    assert_eq!(h.group_len(4), 2);
    assert_eq!(h.device.live_buffers(), buffers);
    assert_eq!(h.layer.stats().tiles_loaded, 1);
}

#[test]
fn test_base_result_is_forwarded() {
    let mut h = harness(3.0);
    let tile = h.tile(5, 1, 1, uniform_raw_tile(8, 8, 70, false));

    let result = h
        .layer
        .load_tile(&mut h.device, &tile, |_| Err::<(), _>("network down"));
    assert_eq!(result, Err("network down"));
    // Failed base load: nothing synthesized
    assert_eq!(h.registered(), 0);

    h.load(&tile).unwrap();
    let result = h
        .layer
        .unload_tile(&mut h.device, &tile, |_| Err::<(), _>(42));
    assert_eq!(result, Err(42));
    // Augmentation still ran
    assert_eq!(h.registered(), 0);
    assert_eq!(h.device.live_buffers(), 0);
}

#[test]
fn test_base_runs_before_augmentation() {
    let mut h = harness(3.0);
    let tile = h.tile(5, 1, 1, uniform_raw_tile(8, 8, 70, false));

    let journal = Rc::new(RefCell::new(Vec::new()));
    let mut device = JournalDevice {
        inner: std::mem::take(&mut h.device),
        journal: journal.clone(),
    };

    let log = journal.clone();
    h.layer
        .load_tile(&mut device, &tile, move |_| {
            log.borrow_mut().push("base");
            Ok::<(), ()>(())
        })
        .unwrap();
    assert_eq!(h.registered(), 1);
    {
        let entries = journal.borrow();
        assert_eq!(entries.first(), Some(&"base"));
        assert_eq!(entries.get(1), Some(&"read"));
        assert!(entries.contains(&"upload"));
    }

    journal.borrow_mut().clear();
    let log = journal.clone();
    h.layer
        .unload_tile(&mut device, &tile, move |_| {
            log.borrow_mut().push("base");
            Ok::<(), ()>(())
        })
        .unwrap();
    assert_eq!(h.registered(), 0);
    let entries = journal.borrow();
    assert_eq!(entries.first(), Some(&"base"));
    assert!(entries.len() > 1 && entries[1..].iter().all(|e| *e == "release"));
}

#[test]
fn test_tile_without_texture_is_skipped() {
    let mut h = harness(3.0);
    let generation = h.layer.current_generation().unwrap();
    let tile = HostTile::new(TileCoord::new(4, 1, 1), generation);

    h.load(&tile).unwrap();
    assert_eq!(h.registered(), 0);
    assert_eq!(h.layer.stats().tiles_skipped, 1);
}

#[test]
fn test_empty_tile_registers_without_meshes() {
    let mut h = harness(3.0);
    let tile = h.tile(4, 1, 1, uniform_raw_tile(8, 8, 10, false));

    h.load(&tile).unwrap();
    assert_eq!(h.registered(), 1);
    assert_eq!(h.group_len(3), 0);
    h.unload(&tile).unwrap();
    assert_eq!(h.registered(), 0);
}

#[test]
fn test_zoom_zero_tiles_have_no_group() {
    let mut h = harness(0.0);
    let (z, x, y) = tiles::WORLD;
    let tile = h.tile(z, x, y, uniform_raw_tile(8, 8, 70, false));
    h.load(&tile).unwrap();
    assert_eq!(h.registered(), 0);
}

// ============================================================================
// Zoom and rendering
// ============================================================================

#[test]
fn test_zoom_change_switches_visible_group() {
    let mut h = harness(3.0);
    h.layer.handle_zoom(7.6);
    let scene = h.layer.scene().unwrap();
    let visible: Vec<usize> = scene.visible_groups().map(|g| g.level()).collect();
    assert_eq!(visible, vec![8]);
}

#[test]
fn test_render_draws_visible_group_and_repaints() {
    let mut h = harness(4.0);
    let tile = h.tile(5, 3, 3, split_phase_tile(16, 16, 60));
    h.load(&tile).unwrap();

    h.layer
        .render(&mut h.host, &mut h.device, &Matrix4::identity(), 10_000.0)
        .unwrap();

    let frame = h.device.last_frame().unwrap();
    assert_eq!(frame.group, 4);
    assert_eq!(frame.commands.len(), 3);
    assert_eq!(frame.commands[0].kind, MeshKind::Fill);
    assert!((frame.materials.rain.time - 6.0).abs() < 1e-4);
    assert!((frame.materials.snow.time - 1.5).abs() < 1e-4);
    assert_eq!(frame.materials.rain.scale, 1.0);
    assert_eq!(h.host.repaints, 1);
    assert_eq!(h.layer.stats().frames, 1);
}

#[test]
fn test_render_scale_tracks_fractional_zoom() {
    let mut h = harness(7.6);
    h.host.zoom = 7.6;
    h.layer
        .render(&mut h.host, &mut h.device, &Matrix4::identity(), 0.0)
        .unwrap();
    let scale = h.device.last_frame().unwrap().materials.rain.scale;
    assert!((scale - 2f32.powf(0.4)).abs() < 1e-5);
}

#[test]
fn test_render_without_repaint() {
    let (scales, sources) = presets();
    let mut opts = options();
    opts.repaint = false;
    let mut layer = RainLayer::new(opts, &scales, &sources).unwrap();
    let mut host = HeadlessHost::new(2.0);
    let mut device = HeadlessDevice::new();
    layer.on_add(&mut host).unwrap();
    layer
        .render(&mut host, &mut device, &Matrix4::identity(), 0.0)
        .unwrap();
    assert_eq!(host.repaints, 0);
}

#[test]
fn test_render_detached_fails() {
    let (scales, sources) = presets();
    let mut layer = RainLayer::new(options(), &scales, &sources).unwrap();
    let mut host = HeadlessHost::new(2.0);
    let mut device = HeadlessDevice::new();
    assert!(matches!(
        layer.render(&mut host, &mut device, &Matrix4::identity(), 0.0),
        Err(RainError::NotAttached)
    ));
}

// ============================================================================
// Source swaps
// ============================================================================

#[test]
fn test_source_swap_disposes_old_tiles_and_ignores_late_callbacks() {
    let mut h = harness(3.0);
    let old = h.tile(4, 1, 1, uniform_raw_tile(8, 8, 70, false));
    h.load(&old).unwrap();
    assert_eq!(h.group_len(3), 2);

    let resolved = resolve_source(h.layer.source(), &rainviewer_catalog()).unwrap();
    let event = h
        .layer
        .apply_source(&mut h.host, &mut h.device, resolved)
        .unwrap();
    assert_eq!(event.generation.0, 2);
    assert_eq!(h.group_len(3), 0);
    assert_eq!(h.device.live_buffers(), 0);
    let stats = h.layer.stats();
    assert_eq!(stats.meshes_created, 2);
    assert_eq!(stats.meshes_disposed, stats.meshes_created);
    assert_eq!(h.host.sources.len(), 1);

    // A late load from the old source is abandoned
    h.load(&old).unwrap();
    assert_eq!(h.registered(), 0);

    // The same position from the new source loads, and the old unload can't touch it
    let fresh = h.tile(4, 1, 1, uniform_raw_tile(8, 8, 70, false));
    h.load(&fresh).unwrap();
    h.unload(&old).unwrap();
    assert_eq!(h.registered(), 1);
    assert_eq!(h.group_len(3), 2);
}

#[test]
fn test_refresh_event_carries_timestamp() {
    let mut h = harness(3.0);
    let mut events = h.layer.subscribe();
    let resolved = resolve_source(h.layer.source(), &rainviewer_catalog()).unwrap();
    h.layer
        .apply_source(&mut h.host, &mut h.device, resolved)
        .unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.layer_id, "rain");
    assert_eq!(event.timestamp, Some(LATEST_FRAME_TIME));
}

#[tokio::test]
async fn test_refresh_now_swaps_source() {
    let mut h = harness(3.0);
    let mut events = h.layer.subscribe();

    let event = h
        .layer
        .refresh_now(&mut h.host, &mut h.device)
        .await
        .unwrap();
    assert_eq!(event.timestamp, Some(LATEST_FRAME_TIME));
    assert_eq!(events.recv().await.unwrap(), event);
    assert!(h.host.has_source(&h.layer.raster_id()));
}

#[tokio::test]
async fn test_failed_refresh_keeps_current_source() {
    let (scales, sources) = presets();
    let mut layer = RainLayer::new(options(), &scales, &sources)
        .unwrap()
        .with_catalog_client(Arc::new(StaticCatalogClient::new(test_utils::empty_catalog())));
    let mut host = HeadlessHost::new(3.0);
    host.push_layer("rain");
    let mut device = HeadlessDevice::new();
    layer.on_add(&mut host).unwrap();

    let resolved = resolve_source(layer.source(), &rainviewer_catalog()).unwrap();
    layer.apply_source(&mut host, &mut device, resolved).unwrap();
    let generation = layer.current_generation();

    let err = layer.refresh_now(&mut host, &mut device).await.unwrap_err();
    assert!(matches!(err, RainError::TemplateField(_)));
    assert_eq!(layer.current_generation(), generation);
    assert!(host.has_source(&layer.raster_id()));

    layer.on_remove(&mut host, &mut device).unwrap();
}

#[tokio::test]
async fn test_background_refresh_applies_on_render() {
    let (scales, sources) = presets();
    let mut layer = RainLayer::new(options(), &scales, &sources)
        .unwrap()
        .with_catalog_client(Arc::new(StaticCatalogClient::new(rainviewer_catalog())));
    let mut host = HeadlessHost::new(3.0);
    host.push_layer("rain");
    let mut device = HeadlessDevice::new();
    layer.on_add(&mut host).unwrap();

    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        layer
            .render(&mut host, &mut device, &Matrix4::identity(), 0.0)
            .unwrap();
        if layer.current_generation().is_some() {
            break;
        }
    }
    assert!(layer.current_generation().is_some());
    assert!(host.has_source(&layer.raster_id()));

    layer.on_remove(&mut host, &mut device).unwrap();
    assert!(!host.has_source(&layer.raster_id()));
}
