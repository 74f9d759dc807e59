//! Slippy-map tile coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RainError;

/// Highest zoom level a tile (and a zoom group) can have.
pub const MAX_ZOOM: u32 = 24;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Position key used by the tile registry (`"{z}/{x}/{y}"`).
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Number of tiles along one axis at this zoom level.
    pub fn tiles_per_axis(&self) -> f64 {
        2f64.powi(self.z as i32)
    }

    /// Index of the zoom group meshes synthesized for this tile belong to.
    ///
    /// Raster tiles are rendered one zoom level below their own `z`, so a tile
    /// at `z` feeds group `z - 1`. Zoom 0 tiles have no group.
    pub fn zoom_group(&self) -> Option<usize> {
        if self.z == 0 || self.z > MAX_ZOOM + 1 {
            return None;
        }
        Some(self.z as usize - 1)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = RainError;

    /// Parse `"z/x/y"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RainError::Internal(format!("Invalid tile coordinate: {}", s));
        let mut parts = s.trim().split('/');
        let mut next = || -> Result<u32, RainError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u32>()
                .map_err(|_| invalid())
        };
        let coord = TileCoord::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        let n = 1u64 << coord.z.min(31);
        if coord.x as u64 >= n || coord.y as u64 >= n {
            return Err(invalid());
        }
        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(TileCoord::new(5, 17, 11).cache_key(), "5/17/11");
    }

    #[test]
    fn test_zoom_group_is_one_below() {
        assert_eq!(TileCoord::new(1, 0, 0).zoom_group(), Some(0));
        assert_eq!(TileCoord::new(8, 3, 4).zoom_group(), Some(7));
        assert_eq!(TileCoord::new(0, 0, 0).zoom_group(), None);
    }

    #[test]
    fn test_parse_tile_coord() {
        let t: TileCoord = "3/5/2".parse().unwrap();
        assert_eq!(t, TileCoord::new(3, 5, 2));
        assert!("3/8/2".parse::<TileCoord>().is_err());
        assert!("3/5".parse::<TileCoord>().is_err());
        assert!("3/5/2/1".parse::<TileCoord>().is_err());
    }
}
