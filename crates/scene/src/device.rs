//! The seam between the scene and whatever GPU backend hosts it.

use image::RgbaImage;
use rain_common::RainResult;

use crate::frame::RenderFrame;

/// Opaque GPU buffer handle issued by a [`GpuDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Opaque handle of a host-rendered tile texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// What a buffer holds, so the backend can bind it to the right attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Position,
    Normal,
    Index,
    /// Per-instance 4x4 column-major transforms
    InstanceMatrix,
    /// Per-instance RGB colors
    InstanceColor,
    /// Per-instance `(x, y, phase)` particle offsets
    InstanceOffset,
}

/// Typed buffer contents.
#[derive(Debug, Clone, Copy)]
pub enum BufferData<'a> {
    F32(&'a [f32]),
    U16(&'a [u16]),
}

impl BufferData<'_> {
    pub fn len(&self) -> usize {
        match self {
            BufferData::F32(d) => d.len(),
            BufferData::U16(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        match self {
            BufferData::F32(d) => std::mem::size_of_val(*d),
            BufferData::U16(d) => std::mem::size_of_val(*d),
        }
    }
}

/// GPU operations the overlay needs from its host.
///
/// Every call happens on the host's render thread.
pub trait GpuDevice {
    /// Upload a buffer and return its handle.
    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> RainResult<BufferId>;

    /// Free a buffer. Releasing an unknown handle is a no-op.
    fn release_buffer(&mut self, id: BufferId);

    /// Read back a tile texture's RGBA pixels. `None` when the texture is not
    /// (yet) available.
    fn read_texture(&mut self, texture: TextureHandle) -> Option<RgbaImage>;

    /// Submit one frame.
    fn draw(&mut self, frame: &RenderFrame) -> RainResult<()>;
}
