//! The per-layer scene: zoom groups, resident meshes and lights.

use std::collections::BTreeMap;

use metrics::{counter, gauge};
use nalgebra::Matrix4;
use rain_common::{RainError, RainResult};
use renderer::{FillMesh, ParticleMesh};
use tracing::debug;

use crate::device::GpuDevice;
use crate::frame::{DrawCommand, RenderFrame};
use crate::group::{ZoomGroup, ZOOM_GROUP_COUNT};
use crate::lighting::Lighting;
use crate::material::Materials;
use crate::mesh::{MeshId, SceneMesh};

/// Zoom groups plus the meshes parented to them.
///
/// Exactly one group is visible at a time. Meshes in hidden groups stay
/// uploaded so switching back is free.
#[derive(Debug)]
pub struct Scene {
    groups: Vec<ZoomGroup>,
    meshes: BTreeMap<MeshId, SceneMesh>,
    next_id: u64,
    base_zoom: usize,
    pub lighting: Lighting,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            groups: (0..ZOOM_GROUP_COUNT).map(ZoomGroup::new).collect(),
            meshes: BTreeMap::new(),
            next_id: 0,
            base_zoom: 0,
            lighting: Lighting::default(),
        };
        scene.groups[0].set_visible(true);
        scene
    }

    /// Show only the group for `round(zoom)`. Returns the new base zoom.
    pub fn set_zoom(&mut self, zoom: f64) -> usize {
        let base = if zoom.is_finite() {
            (zoom.round().max(0.0) as usize).min(ZOOM_GROUP_COUNT - 1)
        } else {
            self.base_zoom
        };
        for group in &mut self.groups {
            let level = group.level();
            group.set_visible(level == base);
        }
        if base != self.base_zoom {
            debug!(zoom, base_zoom = base, "Switched visible zoom group");
        }
        self.base_zoom = base;
        base
    }

    pub fn base_zoom(&self) -> usize {
        self.base_zoom
    }

    pub fn group(&self, level: usize) -> Option<&ZoomGroup> {
        self.groups.get(level)
    }

    pub fn groups(&self) -> &[ZoomGroup] {
        &self.groups
    }

    pub fn visible_groups(&self) -> impl Iterator<Item = &ZoomGroup> {
        self.groups.iter().filter(|g| g.is_visible())
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.get(&id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn allocate_id(&mut self, group: usize) -> RainResult<MeshId> {
        if group >= ZOOM_GROUP_COUNT {
            return Err(RainError::Internal(format!("zoom group {group} out of range")));
        }
        let id = MeshId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    fn insert(&mut self, mesh: SceneMesh) -> MeshId {
        let id = mesh.id;
        self.groups[mesh.group].add(id);
        self.meshes.insert(id, mesh);
        gauge!("rain_overlay_live_meshes").set(self.meshes.len() as f64);
        id
    }

    /// Upload a fill mesh and parent it to `group`.
    pub fn attach_fill<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        group: usize,
        fill: &FillMesh,
    ) -> RainResult<MeshId> {
        let id = self.allocate_id(group)?;
        let mesh = SceneMesh::upload_fill(device, id, group, fill)?;
        Ok(self.insert(mesh))
    }

    /// Upload a particle mesh and parent it to `group`.
    pub fn attach_particles<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        group: usize,
        particles: &ParticleMesh,
    ) -> RainResult<MeshId> {
        let id = self.allocate_id(group)?;
        let mesh = SceneMesh::upload_particles(device, id, group, particles)?;
        Ok(self.insert(mesh))
    }

    /// Detach a mesh from its group and release its buffers. Unknown ids are
    /// a no-op.
    pub fn remove<D: GpuDevice + ?Sized>(&mut self, device: &mut D, id: MeshId) -> bool {
        let Some(mut mesh) = self.meshes.remove(&id) else {
            return false;
        };
        self.groups[mesh.group].remove(id);
        if mesh.dispose(device) {
            counter!("rain_overlay_meshes_disposed_total").increment(1);
        }
        gauge!("rain_overlay_live_meshes").set(self.meshes.len() as f64);
        true
    }

    /// Dispose every mesh. Returns how many were released.
    pub fn clear<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> usize {
        let meshes = std::mem::take(&mut self.meshes);
        let count = meshes.len();
        for (_, mut mesh) in meshes {
            mesh.dispose(device);
        }
        for group in &mut self.groups {
            group.clear();
        }
        counter!("rain_overlay_meshes_disposed_total").increment(count as u64);
        gauge!("rain_overlay_live_meshes").set(0.0);
        count
    }

    /// Draw commands for the visible group, fill before particles.
    pub fn collect_frame(&self, projection: Matrix4<f64>, materials: &Materials) -> RenderFrame {
        let mut commands: Vec<DrawCommand> = self
            .visible_groups()
            .flat_map(|g| g.children().iter())
            .filter_map(|id| self.meshes.get(id))
            .map(|mesh| DrawCommand {
                mesh: mesh.id,
                kind: mesh.kind,
                transform: projection * mesh.model,
                instance_count: mesh.instance_count,
                index_count: mesh.index_count,
                render_order: mesh.render_order,
                frustum_culled: mesh.frustum_culled,
                buffers: mesh.buffers().to_vec(),
            })
            .collect();
        commands.sort_by_key(|c| (c.render_order, c.mesh));

        RenderFrame {
            projection,
            group: self.base_zoom,
            materials: *materials,
            lighting: self.lighting,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_only_group_zero_visible() {
        let scene = Scene::new();
        assert_eq!(scene.groups().len(), 25);
        let visible: Vec<usize> = scene.visible_groups().map(|g| g.level()).collect();
        assert_eq!(visible, vec![0]);
    }

    #[test]
    fn test_fractional_zoom_rounds() {
        let mut scene = Scene::new();
        assert_eq!(scene.set_zoom(7.6), 8);
        let visible: Vec<usize> = scene.visible_groups().map(|g| g.level()).collect();
        assert_eq!(visible, vec![8]);

        assert_eq!(scene.set_zoom(7.4), 7);
        assert!(!scene.group(8).unwrap().is_visible());
    }

    #[test]
    fn test_zoom_is_clamped_to_group_range() {
        let mut scene = Scene::new();
        assert_eq!(scene.set_zoom(30.0), 24);
        assert_eq!(scene.set_zoom(-2.0), 0);
        assert_eq!(scene.set_zoom(f64::NAN), 0);
    }
}
