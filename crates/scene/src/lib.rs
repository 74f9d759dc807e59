//! Scene graph for the precipitation overlay.
//!
//! Meshes synthesized by the `renderer` crate are uploaded through a
//! [`GpuDevice`] and parented into one of 25 [`ZoomGroup`]s. Only the group
//! matching the rounded camera zoom is drawn; the rest stay resident.

pub mod device;
pub mod frame;
pub mod group;
pub mod headless;
pub mod lighting;
pub mod material;
pub mod mesh;
pub mod scene;

pub use device::{BufferData, BufferId, BufferKind, GpuDevice, TextureHandle};
pub use frame::{DrawCommand, RenderFrame};
pub use group::{ZoomGroup, ZOOM_GROUP_COUNT};
pub use headless::{BufferRecord, HeadlessDevice};
pub use lighting::{AmbientLight, DirectionalLight, Lighting};
pub use material::{scale_uniform, FillMaterial, Materials, ParticleMaterial};
pub use mesh::{MeshId, MeshKind, SceneMesh};
pub use scene::Scene;
