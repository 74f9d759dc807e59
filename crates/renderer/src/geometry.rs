//! Constant vertex/index data shared by every layer instance.
//!
//! These are plain descriptors; each layer uploads its own GPU copies.

/// Immutable indexed geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryDescriptor {
    pub positions: &'static [[f32; 3]],
    /// Per-vertex normals; empty for unlit geometry.
    pub normals: &'static [[f32; 3]],
    pub indices: &'static [u16],
}

impl GeometryDescriptor {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Unit box spanning `[0,1]` on every axis, four vertices per face.
pub const UNIT_BOX: GeometryDescriptor = GeometryDescriptor {
    positions: &[
        // +x
        [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0],
        // -x
        [0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0],
        // +y
        [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0],
        // -y
        [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0],
        // +z
        [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0],
        // -z
        [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0],
    ],
    normals: &[
        [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0, -1.0], [0.0, 0.0, -1.0],
    ],
    indices: &[
        0, 1, 2, 2, 1, 3,
        4, 5, 6, 6, 5, 7,
        8, 9, 10, 10, 9, 11,
        12, 13, 14, 14, 13, 15,
        16, 17, 18, 18, 17, 19,
        20, 21, 22, 22, 21, 23,
    ],
};

/// Rain streak: long and thin along z. Front, left and top faces only; the
/// particle material is double-sided.
pub const RAIN_STREAK: GeometryDescriptor = GeometryDescriptor {
    positions: &[
        // Front
        [-0.002, 0.002, 0.01], [0.002, 0.002, 0.01], [-0.002, 0.002, -0.01], [0.002, 0.002, -0.01],
        // Left
        [-0.002, -0.002, 0.01], [-0.002, 0.002, 0.01], [-0.002, -0.002, -0.01], [-0.002, 0.002, -0.01],
        // Top
        [-0.002, 0.002, 0.01], [0.002, 0.002, 0.01], [-0.002, -0.002, 0.01], [0.002, -0.002, 0.01],
    ],
    normals: &[],
    indices: &[0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7, 8, 9, 10, 10, 9, 11],
};

/// Snow flake: short and flat, wider than a streak but barely any height.
pub const SNOW_FLAKE: GeometryDescriptor = GeometryDescriptor {
    positions: &[
        // Front
        [-0.003, 0.003, 0.0015], [0.003, 0.003, 0.0015], [-0.003, 0.003, -0.0015], [0.003, 0.003, -0.0015],
        // Left
        [-0.003, -0.003, 0.0015], [-0.003, 0.003, 0.0015], [-0.003, -0.003, -0.0015], [-0.003, 0.003, -0.0015],
        // Top
        [-0.003, 0.003, 0.0015], [0.003, 0.003, 0.0015], [-0.003, -0.003, 0.0015], [0.003, -0.003, 0.0015],
    ],
    normals: &[],
    indices: &[0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7, 8, 9, 10, 10, 9, 11],
};
