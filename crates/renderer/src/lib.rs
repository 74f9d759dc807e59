//! Tile decoding and instanced geometry synthesis for the precipitation overlay.
//!
//! The pipeline runs once per loaded tile:
//! - [`decode`]: RGBA pixels to an intensity grid
//! - [`palette`]: scale presets to classification breakpoints
//! - [`synth`]: intensity grid to fill and particle instance data
//!
//! Everything here is CPU-side and GPU-agnostic; uploading the result is the
//! scene crate's job.

pub mod decode;
pub mod geometry;
pub mod palette;
pub mod synth;

pub use decode::{decode_tile, DecodeMode, IntensityGrid, Sample};
pub use geometry::{GeometryDescriptor, RAIN_STREAK, SNOW_FLAKE, UNIT_BOX};
pub use palette::{Breakpoint, Palette, VALUE_BIAS};
pub use synth::{
    particle_count, resolution_for_zoom, synthesize_tile, FillInstance, FillMesh, ParticleKind,
    ParticleMesh, TileGeometry,
};
