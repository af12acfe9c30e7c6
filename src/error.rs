//! Error types for the render pipeline
//!
//! Every per-uid failure is expressed as one of these enums and contained at
//! the batch driver boundary. None of them aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn an asset file into geometry.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("asset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported asset format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to load OBJ {}: {source}", .path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to load glTF {}: {source}", .path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("asset contains no triangle meshes: {}", .0.display())]
    NoMeshes(PathBuf),
}

/// Failure to bring imported geometry to the canonical unit box.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("no geometry to normalize")]
    Empty,

    #[error("degenerate geometry: bounding box max extent is {0}")]
    Degenerate(f32),
}

/// Failure inside a renderer or while writing a view to disk.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to create GPU device: {0}")]
    Device(String),

    #[error("frame readback failed: {0}")]
    Readback(String),

    #[error("renderer has no prepared scene")]
    NotPrepared,

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure reading or writing a JSON manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure while processing one uid.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("output directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected failure: {0}")]
    Panicked(String),
}
