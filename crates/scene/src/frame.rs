//! One frame's worth of draw commands.

use nalgebra::Matrix4;

use crate::device::BufferId;
use crate::lighting::Lighting;
use crate::material::Materials;
use crate::mesh::{MeshId, MeshKind};

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    pub mesh: MeshId,
    pub kind: MeshKind,
    /// Host projection times the mesh model matrix.
    pub transform: Matrix4<f64>,
    pub instance_count: usize,
    pub index_count: usize,
    pub render_order: i32,
    pub frustum_culled: bool,
    pub buffers: Vec<BufferId>,
}

/// Everything the device needs to draw the visible zoom group.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub projection: Matrix4<f64>,
    pub group: usize,
    pub materials: Materials,
    pub lighting: Lighting,
    /// Sorted by render order: fill boxes, then particles.
    pub commands: Vec<DrawCommand>,
}

impl RenderFrame {
    pub fn instance_count(&self) -> usize {
        self.commands.iter().map(|c| c.instance_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
