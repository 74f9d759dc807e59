//! Zoom groups: one visibility container per integer zoom level.

use crate::mesh::MeshId;

/// Levels 0 through 24.
pub const ZOOM_GROUP_COUNT: usize = 25;

#[derive(Debug, Clone, Default)]
pub struct ZoomGroup {
    level: usize,
    visible: bool,
    children: Vec<MeshId>,
}

impl ZoomGroup {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            visible: false,
            children: Vec::new(),
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn add(&mut self, id: MeshId) {
        self.children.push(id);
    }

    pub(crate) fn remove(&mut self, id: MeshId) -> bool {
        match self.children.iter().position(|&c| c == id) {
            Some(idx) => {
                self.children.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.children.clear();
    }

    pub fn children(&self) -> &[MeshId] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
