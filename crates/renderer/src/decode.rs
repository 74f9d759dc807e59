//! Intensity decoding of rendered radar tiles.
//!
//! Two encodings are supported:
//! - **Raw**: the red channel carries the value. The low 7 bits are the biased
//!   intensity, bit 7 flags frozen precipitation (snow).
//! - **Indexed**: the source paints a discrete color table; a pixel's value
//!   is the index of the table entry its RGB matches exactly.

use image::RgbaImage;
use rain_common::color::{pack_rgb, Color};
use rayon::prelude::*;

/// Mask for the intensity bits of a raw-encoded red channel.
pub const INTENSITY_MASK: u8 = 0x7f;
/// Frozen-precipitation flag of a raw-encoded red channel.
pub const FROZEN_BIT: u8 = 0x80;

/// Value left in a cell when an indexed pixel matches no table color.
pub const MISS_SENTINEL: u32 = 0;

/// One decoded pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub value: u32,
    pub frozen: bool,
}

/// How pixels are turned into samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeMode {
    Raw,
    /// Packed `0xRRGGBB` reference colors; position in the list is the value.
    Indexed(Vec<u32>),
}

impl DecodeMode {
    /// Indexed when the source defines a color table, raw otherwise.
    pub fn for_color_table(colors: Option<&[Color]>) -> Self {
        match colors {
            Some(colors) => DecodeMode::Indexed(colors.iter().map(Color::packed_rgb).collect()),
            None => DecodeMode::Raw,
        }
    }

    /// Whether samples can carry the frozen flag.
    pub fn has_categories(&self) -> bool {
        matches!(self, DecodeMode::Raw)
    }

    #[inline]
    fn decode_pixel(&self, px: &[u8]) -> Sample {
        match self {
            DecodeMode::Raw => Sample {
                value: (px[0] & INTENSITY_MASK) as u32,
                frozen: px[0] & FROZEN_BIT != 0,
            },
            DecodeMode::Indexed(table) => {
                let packed = pack_rgb(px[0], px[1], px[2]);
                let value = table
                    .iter()
                    .position(|&c| c == packed)
                    .map_or(MISS_SENTINEL, |i| i as u32);
                Sample {
                    value,
                    frozen: false,
                }
            }
        }
    }
}

/// Per-pixel samples of one tile, row-major, same dimensions as the texture.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    width: usize,
    height: usize,
    samples: Vec<Sample>,
}

impl IntensityGrid {
    pub fn new(width: usize, height: usize, samples: Vec<Sample>) -> Self {
        assert_eq!(samples.len(), width * height, "sample count must match dimensions");
        Self {
            width,
            height,
            samples,
        }
    }

    /// A grid filled with one sample, mostly useful for tests.
    pub fn filled(width: usize, height: usize, sample: Sample) -> Self {
        Self::new(width, height, vec![sample; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Sample> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.samples.get(y * self.width + x).copied()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

/// Decode a tile's RGBA pixels. Dimensions come from the image itself.
pub fn decode_tile(image: &RgbaImage, mode: &DecodeMode) -> IntensityGrid {
    let (width, height) = image.dimensions();
    let samples: Vec<Sample> = image
        .as_raw()
        .par_chunks_exact(4)
        .map(|px| mode.decode_pixel(px))
        .collect();

    IntensityGrid::new(width as usize, height as usize, samples)
}
