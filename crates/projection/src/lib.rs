//! Coordinate transformations for slippy-map tiles.
//!
//! Implements the Web-Mercator math from scratch; the only external
//! dependency is `nalgebra` for the resulting model matrices.

pub mod mercator;

pub use mercator::{lng_lat_to_mercator, tile_to_lng_lat, MercatorBounds, MercatorCoord};
