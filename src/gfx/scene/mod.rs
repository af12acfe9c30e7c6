//! # Scene Management Module
//!
//! The per-asset render state: objects with their meshes and transforms,
//! one orbit camera, the lights and the world background.
//!
//! ## Key Components
//!
//! - [`Scene`] - container rebuilt for every asset
//! - [`Object`] / [`Mesh`] - geometry with a world transform
//! - [`Aabb`] and [`normalize_objects`] - bounds and canonical rescaling
//! - [`Vertex3D`] - the vertex layout shared with the GPU

pub mod bounds;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use bounds::{compute_world_bbox, normalize_objects, Aabb, Normalization};
pub use object::{Mesh, Object};
pub use scene::Scene;
pub use vertex::Vertex3D;
