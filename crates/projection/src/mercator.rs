//! Web-Mercator projection in normalized world units.
//!
//! World space spans `[0, 1]` on both axes: `x` grows eastward from the
//! antimeridian, `y` grows southward from the northern Mercator limit. This is
//! the space the host map hands its projection matrix in, so meshes placed
//! here line up with the base map without further conversion.

use std::f64::consts::PI;

use nalgebra::{Matrix4, Vector3};
use rain_common::TileCoord;

/// A point in normalized Mercator world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorCoord {
    pub x: f64,
    pub y: f64,
}

/// Project longitude/latitude (degrees) to normalized Mercator coordinates.
pub fn lng_lat_to_mercator(lng: f64, lat: f64) -> MercatorCoord {
    let x = (180.0 + lng) / 360.0;
    let y = (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0;
    MercatorCoord { x, y }
}

/// Longitude/latitude (degrees) of the north-west corner of tile `(x, y)` at
/// zoom `z`. Passing `x + 1` / `y + 1` yields the opposite corner.
pub fn tile_to_lng_lat(z: u32, x: f64, y: f64) -> (f64, f64) {
    let n = 2f64.powi(z as i32);
    let lng = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lng, lat)
}

/// A tile's footprint in Mercator world space: origin plus extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorBounds {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

impl MercatorBounds {
    /// Footprint of a slippy-map tile.
    pub fn for_tile(tile: &TileCoord) -> Self {
        let (lng1, lat1) = tile_to_lng_lat(tile.z, tile.x as f64, tile.y as f64);
        let (lng2, lat2) = tile_to_lng_lat(tile.z, tile.x as f64 + 1.0, tile.y as f64 + 1.0);
        let c1 = lng_lat_to_mercator(lng1, lat1);
        let c2 = lng_lat_to_mercator(lng2, lat2);

        Self {
            x: c1.x,
            y: c1.y,
            dx: c2.x - c1.x,
            dy: c2.y - c1.y,
        }
    }

    /// Model matrix mapping tile-local unit space onto this footprint.
    ///
    /// Local `[0,1]` x/y map onto the tile; local z is scaled by `z_scale`
    /// (world units) and stays anchored at the map plane.
    pub fn model_matrix(&self, z_scale: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(self.x, self.y, 0.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(self.dx, self.dy, z_scale))
    }

    /// True when a world-space point lies inside the footprint.
    pub fn contains(&self, point: MercatorCoord) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.dx
            && point.y >= self.y
            && point.y <= self.y + self.dy
    }
}
