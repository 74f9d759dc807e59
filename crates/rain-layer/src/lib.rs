//! Precipitation overlay layer.
//!
//! [`RainLayer`] is the custom layer a map host drives: it wraps the host's
//! raster tile load/unload hooks to synthesize rain and snow meshes, keeps the
//! zoom groups in step with the camera, animates the particle uniforms every
//! frame, and periodically swaps its raster source for the newest catalog
//! frame.

pub mod catalog;
pub mod host;
pub mod layer;
pub mod metrics;
pub mod options;
pub mod refresh;
pub mod registry;

pub use catalog::{resolve_source, CatalogClient, HttpCatalogClient, ResolvedSource, StaticCatalogClient};
pub use host::{HeadlessHost, HostTile, MapHost, RasterLayerSpec, RasterSourceSpec, SourceGeneration};
pub use layer::RainLayer;
pub use metrics::{LayerMetrics, LayerStats};
pub use options::LayerOptions;
pub use refresh::RefreshEvent;
pub use registry::{TileEntry, TileRegistry};
