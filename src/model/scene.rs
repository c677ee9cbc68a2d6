// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Non-owning mesh references
//!
//! The resection model never owns anatomical meshes. It stores
//! [`MeshHandle`]s and resolves them through a [`MeshLookup`] at rebuild
//! time; a handle whose mesh is gone resolves to `None`.

use crate::geometry::Mesh;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identifier of a mesh owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

impl fmt::Display for MeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Host object table
pub trait MeshLookup {
    /// Current mesh behind `handle`, `None` if it was deleted
    fn resolve(&self, handle: MeshHandle) -> Option<Arc<Mesh>>;
}

/// In-memory object table
#[derive(Debug, Default, Clone)]
pub struct MeshScene {
    meshes: AHashMap<MeshHandle, Arc<Mesh>>,
    next_id: u64,
}

impl MeshScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh and hand out a fresh handle
    pub fn insert(&mut self, mesh: Mesh) -> MeshHandle {
        self.next_id += 1;
        let handle = MeshHandle(self.next_id);
        self.meshes.insert(handle, Arc::new(mesh));
        handle
    }

    /// Swap the geometry behind an existing handle
    pub fn replace(&mut self, handle: MeshHandle, mesh: Mesh) -> bool {
        match self.meshes.get_mut(&handle) {
            Some(slot) => {
                *slot = Arc::new(mesh);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, handle: MeshHandle) -> Option<Arc<Mesh>> {
        self.meshes.remove(&handle)
    }

    pub fn contains(&self, handle: MeshHandle) -> bool {
        self.meshes.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshLookup for MeshScene {
    fn resolve(&self, handle: MeshHandle) -> Option<Arc<Mesh>> {
        self.meshes.get(&handle).cloned()
    }
}
