//! An in-memory [`GpuDevice`] for headless runs and tests.
//!
//! Buffers are bookkeeping only. Textures are whatever images were registered
//! with [`HeadlessDevice::insert_texture`].

use std::collections::{BTreeMap, HashMap};

use image::RgbaImage;
use rain_common::{RainError, RainResult};
use tracing::warn;

use crate::device::{BufferData, BufferId, BufferKind, GpuDevice, TextureHandle};
use crate::frame::RenderFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub kind: BufferKind,
    pub len: usize,
    pub bytes: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_buffer: u64,
    next_texture: u64,
    live: BTreeMap<BufferId, BufferRecord>,
    textures: HashMap<TextureHandle, RgbaImage>,
    /// Fail uploads once this many buffers are live.
    buffer_limit: Option<usize>,
    pub created: usize,
    pub released: usize,
    /// Releases of handles that were not live.
    pub stale_releases: usize,
    pub texture_reads: usize,
    pub frames: Vec<RenderFrame>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses uploads past `limit` live buffers.
    pub fn with_buffer_limit(limit: usize) -> Self {
        Self {
            buffer_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Register a tile image and get the handle that reads it back.
    pub fn insert_texture(&mut self, image: RgbaImage) -> TextureHandle {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, image);
        handle
    }

    pub fn remove_texture(&mut self, handle: TextureHandle) -> Option<RgbaImage> {
        self.textures.remove(&handle)
    }

    pub fn live_buffers(&self) -> usize {
        self.live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|b| b.bytes).sum()
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferRecord> {
        self.live.get(&id)
    }

    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.frames.last()
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> RainResult<BufferId> {
        if self.buffer_limit.is_some_and(|limit| self.live.len() >= limit) {
            return Err(RainError::Gpu("out of buffer memory".to_string()));
        }
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.live.insert(
            id,
            BufferRecord {
                kind,
                len: data.len(),
                bytes: data.byte_len(),
            },
        );
        self.created += 1;
        Ok(id)
    }

    fn release_buffer(&mut self, id: BufferId) {
        if self.live.remove(&id).is_some() {
            self.released += 1;
        } else {
            warn!(buffer = id.0, "Release of unknown buffer");
            self.stale_releases += 1;
        }
    }

    fn read_texture(&mut self, texture: TextureHandle) -> Option<RgbaImage> {
        self.texture_reads += 1;
        self.textures.get(&texture).cloned()
    }

    fn draw(&mut self, frame: &RenderFrame) -> RainResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}
