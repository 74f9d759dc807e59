//! Per-layer materials and their animation uniforms.

use rain_common::Color;
use renderer::ParticleKind;
use serde::Serialize;

/// Time uniform rate of falling rain, per millisecond.
pub const RAIN_TIME_RATE: f64 = 0.0006;
/// Snow falls four times slower than rain.
pub const SNOW_TIME_RATE: f64 = 0.00015;

/// Zoom past which particle density steps down one extra level.
const SCALE_STEP_ZOOM: f64 = 10.5;

/// Density scale between discrete zoom-group switches.
///
/// `2^(base - zoom - (zoom >= 10.5 ? 1 : 0))`
pub fn scale_uniform(base_zoom: usize, zoom: f64) -> f32 {
    let step = if zoom >= SCALE_STEP_ZOOM { 1.0 } else { 0.0 };
    2f64.powf(base_zoom as f64 - zoom - step) as f32
}

/// Lit, per-instance colored material of the fill boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillMaterial {
    pub opacity: f32,
    pub transparent: bool,
    /// Boxes never occlude particles.
    pub depth_write: bool,
}

impl FillMaterial {
    pub fn new(opacity: f32) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            transparent: true,
            depth_write: false,
        }
    }
}

/// Unlit streak material animated by `time` and `scale` uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParticleMaterial {
    #[serde(skip)]
    pub kind: ParticleKind,
    pub color: Color,
    pub time: f32,
    pub scale: f32,
    pub double_sided: bool,
}

impl ParticleMaterial {
    pub fn new(kind: ParticleKind, color: Color) -> Self {
        Self {
            kind,
            color,
            time: 0.0,
            scale: 1.0,
            double_sided: true,
        }
    }

    pub fn time_rate(&self) -> f64 {
        match self.kind {
            ParticleKind::Rain => RAIN_TIME_RATE,
            ParticleKind::Snow => SNOW_TIME_RATE,
        }
    }
}

/// The three materials one layer instance renders with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Materials {
    pub fill: FillMaterial,
    pub rain: ParticleMaterial,
    pub snow: ParticleMaterial,
}

impl Materials {
    pub fn new(fill_opacity: f32, rain_color: Color, snow_color: Color) -> Self {
        Self {
            fill: FillMaterial::new(fill_opacity),
            rain: ParticleMaterial::new(ParticleKind::Rain, rain_color),
            snow: ParticleMaterial::new(ParticleKind::Snow, snow_color),
        }
    }

    /// Advance the animation uniforms for a frame drawn at `now_ms`.
    pub fn update(&mut self, now_ms: f64, base_zoom: usize, zoom: f64) {
        let scale = scale_uniform(base_zoom, zoom);
        for material in [&mut self.rain, &mut self.snow] {
            material.time = (now_ms * material.time_rate()) as f32;
            material.scale = scale;
        }
    }

    pub fn particle(&self, kind: ParticleKind) -> &ParticleMaterial {
        match kind {
            ParticleKind::Rain => &self.rain,
            ParticleKind::Snow => &self.snow,
        }
    }
}
