//! Tile textures read from a directory of `{z}_{x}_{y}.png` files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use rain_common::TileCoord;
use tracing::{debug, warn};

/// One decoded tile image and the position it was saved for.
pub struct TileFile {
    pub coord: TileCoord,
    pub image: RgbaImage,
}

/// Parse a `{z}_{x}_{y}.png` file name.
pub fn parse_tile_name(name: &str) -> Option<TileCoord> {
    let stem = name.strip_suffix(".png")?;
    stem.replace('_', "/").parse().ok()
}

/// Read every tile image in `dir`, ordered by zoom then position.
///
/// Files that don't follow the naming scheme are skipped.
pub fn load_tile_dir(dir: &Path) -> Result<Vec<TileFile>> {
    let mut tiles = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let Some(coord) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_tile_name)
        else {
            warn!(path = %path.display(), "Skipping file without a z_x_y.png name");
            continue;
        };

        let image = image::open(&path)
            .with_context(|| format!("decoding {}", path.display()))?
            .to_rgba8();
        debug!(tile = %coord, width = image.width(), height = image.height(), "Read tile");
        tiles.push(TileFile { coord, image });
    }

    tiles.sort_by_key(|t| (t.coord.z, t.coord.x, t.coord.y));
    Ok(tiles)
}
