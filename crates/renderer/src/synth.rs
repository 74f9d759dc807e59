//! Instanced geometry synthesis for one tile.
//!
//! A decoded tile is resampled onto a coarser grid whose resolution shrinks
//! with zoom. Every cell at or above the palette cut-off yields one colored
//! box instance (the fill) and an intensity-proportional number of particle
//! instances. All instance data lives in tile-local unit space; the mesh model
//! matrix maps it onto the tile's Mercator footprint.

use nalgebra::{Matrix4, Vector3};
use projection::MercatorBounds;
use rain_common::{Color, TileCoord};
use rand::Rng;
use tracing::debug;

use crate::decode::IntensityGrid;
use crate::geometry::{GeometryDescriptor, RAIN_STREAK, SNOW_FLAKE};
use crate::palette::Palette;

/// Sampling resolution per axis at zoom 1.
pub const BASE_RESOLUTION: usize = 64;

/// Zoom at which particle counts start being multiplied up.
const PARTICLE_BOOST_ZOOM: u32 = 14;

/// Grid sampling resolution per axis for zoom `z`, halving every 3 levels.
///
/// Never drops below one cell, so very deep zooms still sample the tile.
pub fn resolution_for_zoom(z: u32) -> usize {
    let exponent = -(z.max(1) as f64 - 1.0) / 3.0;
    let res = (BASE_RESOLUTION as f64 * 2f64.powf(exponent)).floor() as usize;
    res.max(1)
}

/// Vertical scale of tile meshes, shrinking with zoom so overlapping levels
/// don't z-fight.
pub fn vertical_scale(z: u32) -> f64 {
    2f64.powi(10i32.saturating_sub(z as i32).max(0)) * 0.0002
}

/// Particle instances for a cell holding `value` against cut-off `threshold`.
///
/// Density doubles every 10 raw units above the cut-off and is multiplied by
/// `z - 14` past zoom 15 to make up for the sparse grid.
pub fn particle_count(value: f64, threshold: f64, z: u32) -> usize {
    if value < threshold {
        return 0;
    }
    let per_cell = 2f64.powf((value - threshold) / 10.0).ceil() as usize;
    let boost = z.saturating_sub(PARTICLE_BOOST_ZOOM).max(1) as usize;
    per_cell * boost
}

/// One box of the fill mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillInstance {
    /// Tile-local transform of the unit box.
    pub matrix: Matrix4<f32>,
    pub color: Color,
}

/// Instanced boxes shading one tile by intensity class.
#[derive(Debug, Clone, PartialEq)]
pub struct FillMesh {
    pub instances: Vec<FillInstance>,
    /// Tile-local to world transform.
    pub model: Matrix4<f64>,
    /// Sampling resolution `(x, y)` the instances were laid out on.
    pub resolution: (usize, usize),
}

impl FillMesh {
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Draw position relative to the tile's particle meshes.
    pub fn render_order(&self) -> i32 {
        0
    }
}

/// Particle pool a sample contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Rain,
    Snow,
}

impl ParticleKind {
    pub fn geometry(&self) -> &'static GeometryDescriptor {
        match self {
            ParticleKind::Rain => &RAIN_STREAK,
            ParticleKind::Snow => &SNOW_FLAKE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleKind::Rain => "rain",
            ParticleKind::Snow => "snow",
        }
    }
}

/// Instanced streaks for one particle pool of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleMesh {
    pub kind: ParticleKind,
    /// Per-instance `(x, y, phase)`: jittered tile-local position plus the
    /// fall-animation phase, all in `[0, 1)`.
    pub offsets: Vec<[f32; 3]>,
    pub model: Matrix4<f64>,
    /// Local vertex bounds say nothing about where instances end up.
    pub frustum_culled: bool,
}

impl ParticleMesh {
    pub fn instance_count(&self) -> usize {
        self.offsets.len()
    }

    /// Particles draw after the fill.
    pub fn render_order(&self) -> i32 {
        1
    }
}

/// Everything synthesized for one tile. Absent meshes had no instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileGeometry {
    pub fill: Option<FillMesh>,
    pub rain: Option<ParticleMesh>,
    pub snow: Option<ParticleMesh>,
}

impl TileGeometry {
    pub fn is_empty(&self) -> bool {
        self.mesh_count() == 0
    }

    pub fn mesh_count(&self) -> usize {
        self.fill.is_some() as usize + self.rain.is_some() as usize + self.snow.is_some() as usize
    }

    pub fn particles(&self) -> impl Iterator<Item = &ParticleMesh> {
        self.rain.iter().chain(self.snow.iter())
    }
}

/// Nearest-centroid index into a source axis of `len` samples.
#[inline]
fn centroid(cell: usize, resolution: usize, len: usize) -> usize {
    let idx = ((cell as f64 + 0.5) / resolution as f64 * len as f64).floor() as usize;
    idx.min(len.saturating_sub(1))
}

/// Synthesize the fill and particle meshes for one decoded tile.
///
/// With `categories` off every particle goes to the rain pool; with it on,
/// frozen samples feed the snow pool instead.
pub fn synthesize_tile<R: Rng>(
    tile: &TileCoord,
    grid: &IntensityGrid,
    palette: &Palette,
    categories: bool,
    rng: &mut R,
) -> TileGeometry {
    if grid.is_empty() {
        return TileGeometry::default();
    }

    let res = resolution_for_zoom(tile.z);
    let (res_x, res_y) = (res, res);
    let threshold = palette.lowest_threshold();
    // Boxes sit on the map plane; draw order and the fill material's disabled
    // depth write keep particles on top.
    let model = MercatorBounds::for_tile(tile).model_matrix(vertical_scale(tile.z));

    let mut fill = Vec::new();
    let mut rain = Vec::new();
    let mut snow = Vec::new();

    for y in 0..res_y {
        let sy = centroid(y, res_y, grid.height());
        for x in 0..res_x {
            let sx = centroid(x, res_x, grid.width());
            let Some(sample) = grid.get(sx, sy) else {
                continue;
            };
            let value = sample.value as f64;
            if value < threshold {
                continue;
            }

            if let Some(color) = palette.classify(value).and_then(|b| palette.color(b)) {
                let matrix = Matrix4::new_translation(&Vector3::new(
                    x as f32 / res_x as f32,
                    y as f32 / res_y as f32,
                    0.0,
                )) * Matrix4::new_nonuniform_scaling(&Vector3::new(
                    1.0 / res_x as f32,
                    1.0 / res_y as f32,
                    1.0,
                ));
                fill.push(FillInstance { matrix, color });
            }

            let pool = if categories && sample.frozen {
                &mut snow
            } else {
                &mut rain
            };
            for _ in 0..particle_count(value, threshold, tile.z) {
                pool.push([
                    (x as f32 + rng.gen::<f32>()) / res_x as f32,
                    (y as f32 + rng.gen::<f32>()) / res_y as f32,
                    rng.gen::<f32>(),
                ]);
            }
        }
    }

    let particles = |kind, offsets: Vec<[f32; 3]>| {
        (!offsets.is_empty()).then(|| ParticleMesh {
            kind,
            offsets,
            model,
            frustum_culled: false,
        })
    };

    let geometry = TileGeometry {
        fill: (!fill.is_empty()).then(|| FillMesh {
            instances: fill,
            model,
            resolution: (res_x, res_y),
        }),
        rain: particles(ParticleKind::Rain, rain),
        snow: particles(ParticleKind::Snow, snow),
    };

    debug!(
        tile = %tile,
        resolution = res,
        fill = geometry.fill.as_ref().map_or(0, FillMesh::instance_count),
        rain = geometry.rain.as_ref().map_or(0, ParticleMesh::instance_count),
        snow = geometry.snow.as_ref().map_or(0, ParticleMesh::instance_count),
        "Synthesized tile geometry"
    );

    geometry
}
