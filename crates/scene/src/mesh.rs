//! GPU-resident meshes and their exactly-once disposal.

use nalgebra::Matrix4;
use rain_common::RainResult;
use renderer::{FillMesh, GeometryDescriptor, ParticleKind, ParticleMesh, UNIT_BOX};
use tracing::warn;

use crate::device::{BufferData, BufferId, BufferKind, GpuDevice};

/// Scene-unique mesh identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Fill,
    Particles(ParticleKind),
}

/// A mesh whose buffers live on the GPU.
///
/// Each mesh owns every buffer it draws with, geometry included, so releasing
/// one mesh can never pull buffers out from under another.
#[derive(Debug)]
pub struct SceneMesh {
    pub id: MeshId,
    pub kind: MeshKind,
    /// Zoom group this mesh is parented to. Fixed at creation.
    pub group: usize,
    pub model: Matrix4<f64>,
    pub instance_count: usize,
    pub index_count: usize,
    pub render_order: i32,
    pub frustum_culled: bool,
    buffers: Vec<BufferId>,
    disposed: bool,
}

/// Collects buffers while a mesh uploads and frees them again if any upload
/// fails, so a half-built mesh never leaks.
struct Upload<'d, D: GpuDevice + ?Sized> {
    device: &'d mut D,
    buffers: Vec<BufferId>,
}

impl<'d, D: GpuDevice + ?Sized> Upload<'d, D> {
    fn new(device: &'d mut D) -> Self {
        Self {
            device,
            buffers: Vec::new(),
        }
    }

    fn push(&mut self, kind: BufferKind, data: BufferData<'_>) -> RainResult<()> {
        match self.device.create_buffer(kind, data) {
            Ok(id) => {
                self.buffers.push(id);
                Ok(())
            }
            Err(e) => {
                for id in self.buffers.drain(..) {
                    self.device.release_buffer(id);
                }
                Err(e)
            }
        }
    }

    fn geometry(&mut self, geometry: &GeometryDescriptor) -> RainResult<()> {
        let positions: Vec<f32> = geometry.positions.iter().flatten().copied().collect();
        self.push(BufferKind::Position, BufferData::F32(&positions))?;
        if !geometry.normals.is_empty() {
            let normals: Vec<f32> = geometry.normals.iter().flatten().copied().collect();
            self.push(BufferKind::Normal, BufferData::F32(&normals))?;
        }
        self.push(BufferKind::Index, BufferData::U16(geometry.indices))
    }

    fn finish(self) -> Vec<BufferId> {
        self.buffers
    }
}

impl SceneMesh {
    /// Upload a fill mesh: box geometry plus per-instance matrices and colors.
    pub fn upload_fill<D: GpuDevice + ?Sized>(
        device: &mut D,
        id: MeshId,
        group: usize,
        fill: &FillMesh,
    ) -> RainResult<Self> {
        let matrices: Vec<f32> = fill
            .instances
            .iter()
            .flat_map(|i| i.matrix.as_slice().to_vec())
            .collect();
        let colors: Vec<f32> = fill
            .instances
            .iter()
            .flat_map(|i| i.color.to_rgb_f32())
            .collect();

        let mut upload = Upload::new(device);
        upload.geometry(&UNIT_BOX)?;
        upload.push(BufferKind::InstanceMatrix, BufferData::F32(&matrices))?;
        upload.push(BufferKind::InstanceColor, BufferData::F32(&colors))?;

        Ok(Self {
            id,
            kind: MeshKind::Fill,
            group,
            model: fill.model,
            instance_count: fill.instance_count(),
            index_count: UNIT_BOX.index_count(),
            render_order: fill.render_order(),
            frustum_culled: true,
            buffers: upload.finish(),
            disposed: false,
        })
    }

    /// Upload a particle mesh: streak geometry plus per-instance offsets.
    pub fn upload_particles<D: GpuDevice + ?Sized>(
        device: &mut D,
        id: MeshId,
        group: usize,
        particles: &ParticleMesh,
    ) -> RainResult<Self> {
        let geometry = particles.kind.geometry();
        let offsets: Vec<f32> = particles.offsets.iter().flatten().copied().collect();

        let mut upload = Upload::new(device);
        upload.geometry(geometry)?;
        upload.push(BufferKind::InstanceOffset, BufferData::F32(&offsets))?;

        Ok(Self {
            id,
            kind: MeshKind::Particles(particles.kind),
            group,
            model: particles.model,
            instance_count: particles.instance_count(),
            index_count: geometry.index_count(),
            render_order: particles.render_order(),
            frustum_culled: particles.frustum_culled,
            buffers: upload.finish(),
            disposed: false,
        })
    }

    pub fn buffers(&self) -> &[BufferId] {
        &self.buffers
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every buffer. Only the first call does anything; returns
    /// whether this call released.
    pub fn dispose<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> bool {
        if self.disposed {
            warn!(mesh = self.id.0, "Mesh already disposed");
            return false;
        }
        for id in self.buffers.drain(..) {
            device.release_buffer(id);
        }
        self.disposed = true;
        true
    }
}
