// src/lib.rs
//! Orbitviews
//!
//! Headless multi-view dataset renderer. Every asset listed in a `uid -> path`
//! manifest is imported, normalized to a unit box at the origin and rendered
//! from seven orbit poses (one condition view, six target views) into
//! `<output_root>/<uid>/000.png .. 006.png`.

pub mod config;
pub mod error;
pub mod gfx;
pub mod import;
pub mod manifest;
pub mod pipeline;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use config::{PolicyKind, Preset, RenderSettings};
pub use error::PipelineError;
pub use pipeline::driver::{BatchDriver, BatchOptions, BatchReport};
