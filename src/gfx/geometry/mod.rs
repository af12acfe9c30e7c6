//! # Procedural Geometry
//!
//! Closed primitive shapes used as stand-in assets when exercising the
//! pipeline without model files on disk.

pub mod primitives;

pub use primitives::*;

use crate::gfx::scene::object::Mesh;

/// Generated triangle geometry, one normal per vertex.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flattens into the layout [`Mesh::new`] takes.
    pub fn into_mesh(self) -> Mesh {
        let positions = self.vertices.into_iter().flatten().collect();
        let normals = self.normals.into_iter().flatten().collect();
        Mesh::new(positions, normals, self.indices)
    }
}
