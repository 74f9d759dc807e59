//! Common types and utilities shared across the rain-overlay crates.

pub mod color;
pub mod config;
pub mod error;
pub mod template;
pub mod tile;

pub use color::Color;
pub use config::{
    load_presets, Alignment, ScaleConfig, ScalePreset, ScaleStop, SourceConfig, SourcePreset,
};
pub use error::{RainError, RainResult};
pub use template::{format_template, resolve_path};
pub use tile::TileCoord;
