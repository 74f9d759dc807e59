//! Scene lights for the lit fill material.

use nalgebra::Vector3;
use rain_common::Color;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionalLight {
    /// Unit vector pointing from the scene towards the light.
    pub direction: [f32; 3],
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lighting {
    pub directional: DirectionalLight,
    pub ambient: AmbientLight,
}

impl Default for Lighting {
    /// Light from the south, high above the map, plus a soft ambient fill.
    fn default() -> Self {
        let direction = Vector3::new(0.0f32, -70.0, 100.0).normalize();
        Self {
            directional: DirectionalLight {
                direction: [direction.x, direction.y, direction.z],
                color: Color::WHITE,
                intensity: 1.0,
            },
            ambient: AmbientLight {
                color: Color::WHITE,
                intensity: 0.4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_direction_is_normalized() {
        let [x, y, z] = Lighting::default().directional.direction;
        assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-6);
        assert!(y < 0.0 && z > 0.0);
    }
}
