//! # Graphics Module
//!
//! Everything between an imported mesh and a finished frame.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Z-up orbit camera that always looks at the origin
//! - **Scene Management** ([`scene`]) - objects, bounds and normalization, the per-asset [`Scene`]
//! - **Lighting** ([`lighting`]) - light rigs and the shared shading model
//! - **Rendering** ([`rendering`]) - wgpu offscreen renderer and CPU rasterizer
//! - **Resources** ([`resources`]) - offscreen render targets
//! - **Geometry** ([`geometry`]) - procedural primitives
//!
//! [`Scene`]: scene::Scene

pub mod camera;
pub mod geometry;
pub mod lighting;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::{Frame, Renderer};
pub use scene::{Object, Scene};
