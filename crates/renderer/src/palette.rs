//! Classification palettes built from scale presets.

use rain_common::{Alignment, Color, RainError, RainResult, ScaleConfig, ScalePreset};

/// Offset between scale values and decoded raw intensities.
pub const VALUE_BIAS: f64 = 32.0;

/// A class boundary and the color of the class that ends at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub threshold: f64,
    pub color: Color,
}

/// Ordered breakpoints with strictly increasing thresholds.
///
/// Breakpoint 0 only sets the cut-off: values below it are not
/// precipitation. A value `v >= threshold[0]` belongs to the first bucket
/// `p >= 1` with `v < threshold[p]` and is drawn in `color[p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    breakpoints: Vec<Breakpoint>,
}

impl Palette {
    pub fn from_preset(preset: &ScalePreset) -> Result<Self, String> {
        preset.validate()?;

        let stops = &preset.scale;
        let breakpoints = stops
            .iter()
            .enumerate()
            .map(|(i, stop)| {
                let value = match preset.align {
                    Alignment::Center => {
                        let next = stops.get(i + 1).map_or(f64::INFINITY, |s| s.value);
                        (stop.value + next) / 2.0
                    }
                    Alignment::Leading => stop.value,
                };
                Breakpoint {
                    threshold: value + VALUE_BIAS,
                    color: stop.color,
                }
            })
            .collect();

        Ok(Self { breakpoints })
    }

    /// Resolve a named scale. Unknown or invalid scales are fatal.
    pub fn resolve(scales: &ScaleConfig, name: &str) -> RainResult<Self> {
        let preset = scales.get(name)?;
        Self::from_preset(preset).map_err(|message| RainError::InvalidScale {
            name: name.to_string(),
            message,
        })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// The cut-off below which nothing is drawn.
    pub fn lowest_threshold(&self) -> f64 {
        self.breakpoints[0].threshold
    }

    /// Bucket index for a raw value, or `None` when the value is below the
    /// cut-off or at/above the last finite threshold.
    pub fn classify(&self, value: f64) -> Option<usize> {
        if value < self.lowest_threshold() {
            return None;
        }
        self.breakpoints
            .iter()
            .skip(1)
            .position(|bp| value < bp.threshold)
            .map(|i| i + 1)
    }

    pub fn color(&self, bucket: usize) -> Option<Color> {
        self.breakpoints.get(bucket).map(|bp| bp.color)
    }
}
