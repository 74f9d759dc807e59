//! Tracks which tile positions already own meshes.

use std::collections::HashMap;

use rain_common::TileCoord;
use scene::MeshId;

use crate::host::SourceGeneration;

/// Live state of one synthesized tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEntry {
    pub coord: TileCoord,
    pub generation: SourceGeneration,
    /// Meshes parented for this tile; empty when the tile had nothing to draw.
    pub meshes: Vec<MeshId>,
}

/// Position key (`"z/x/y"`) to tile state.
#[derive(Debug, Default)]
pub struct TileRegistry {
    entries: HashMap<String, TileEntry>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&TileEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, entry: TileEntry) {
        self.entries.insert(entry.coord.cache_key(), entry);
    }

    /// Remove the entry at `key` if it was loaded by `generation`.
    pub fn remove(&mut self, key: &str, generation: SourceGeneration) -> Option<TileEntry> {
        match self.entries.get(key) {
            Some(entry) if entry.generation == generation => self.entries.remove(key),
            _ => None,
        }
    }

    /// Take every entry, leaving the registry empty.
    pub fn drain(&mut self) -> Vec<TileEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mesh_count(&self) -> usize {
        self.entries.values().map(|e| e.meshes.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
