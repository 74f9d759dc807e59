//! Synthetic radar tile generators.
//!
//! Tiles come out as `image::RgbaImage`, the same type the GPU readback path
//! hands to the decoder, so tests exercise the real decode path.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

/// Bias between scale values and raw red-channel intensities.
pub const RAW_BIAS: u8 = 32;

/// Frozen flag of the raw encoding.
pub const FROZEN_FLAG: u8 = 0x80;

/// Encodes one raw pixel: red low 7 bits carry `raw`, bit 7 the frozen flag.
///
/// `raw` is the biased value (scale value + 32), clamped to 7 bits.
pub fn raw_pixel(raw: u8, frozen: bool) -> Rgba<u8> {
    let mut red = raw.min(0x7f);
    if frozen {
        red |= FROZEN_FLAG;
    }
    Rgba([red, 0, 0, 255])
}

/// Creates a tile where every pixel carries the same raw value.
///
/// # Example
///
/// ```
/// use test_utils::uniform_raw_tile;
///
/// let tile = uniform_raw_tile(4, 4, 100, false);
/// assert_eq!(tile.dimensions(), (4, 4));
/// assert_eq!(tile.get_pixel(3, 3).0[0], 100);
/// ```
pub fn uniform_raw_tile(width: u32, height: u32, raw: u8, frozen: bool) -> RgbaImage {
    RgbaImage::from_pixel(width, height, raw_pixel(raw, frozen))
}

/// Creates a tile whose raw value ramps left to right from `from` to `to`.
///
/// Useful for checking that cells on either side of a palette threshold are
/// classified differently.
pub fn raw_gradient_tile(width: u32, height: u32, from: u8, to: u8) -> RgbaImage {
    let span = to as f64 - from as f64;
    RgbaImage::from_fn(width, height, |x, _| {
        let t = if width > 1 { x as f64 / (width - 1) as f64 } else { 0.0 };
        raw_pixel((from as f64 + span * t).round() as u8, false)
    })
}

/// Creates a tile whose left half is liquid and right half frozen.
pub fn split_phase_tile(width: u32, height: u32, raw: u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| raw_pixel(raw, x >= width / 2))
}

/// Creates an indexed tile painted with one RGB color everywhere.
pub fn uniform_indexed_tile(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Writes tiles as `{z}_{x}_{y}.png` into `dir`, the layout the headless
/// viewer reads.
pub fn write_png_tiles(
    dir: &Path,
    tiles: &[((u32, u32, u32), RgbaImage)],
) -> image::ImageResult<Vec<PathBuf>> {
    tiles
        .iter()
        .map(|((z, x, y), img)| {
            let path = dir.join(format!("{z}_{x}_{y}.png"));
            img.save(&path)?;
            Ok(path)
        })
        .collect()
}
