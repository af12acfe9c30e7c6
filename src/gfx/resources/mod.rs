//! GPU resources owned by the offscreen renderer.

pub mod texture_resource;

pub use texture_resource::TextureResource;
