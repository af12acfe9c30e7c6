//! # Asset import
//!
//! Turns one asset file into a single rigid [`Object`]. Every mesh fragment
//! of the file is loaded with its node transform, converted from the Y-up
//! convention both formats use to the Z-up world the cameras orbit in, and
//! merged into one object that keeps one mesh per material color.
//!
//! Supported formats: Wavefront OBJ (`.obj`) and glTF (`.gltf`, `.glb`).

mod gltf_loader;
mod obj_loader;

use std::path::Path;

use cgmath::Matrix4;

use crate::{error::ImportError, gfx::scene::Object};

/// Maps `(x, y, z)` in a Y-up file to `(x, -z, y)` in the Z-up world.
#[rustfmt::skip]
pub const Y_UP_TO_Z_UP: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, -1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
);

/// Loads `path` and merges everything it contains into one object.
///
/// Fails with [`ImportError::NoMeshes`] when the file parses but yields no
/// triangles.
pub fn import_asset(path: &Path) -> Result<Object, ImportError> {
    if !path.is_file() {
        return Err(ImportError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut fragments = match extension.as_str() {
        "obj" => obj_loader::load(path)?,
        "gltf" | "glb" => gltf_loader::load(path)?,
        _ => {
            return Err(ImportError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    for fragment in &mut fragments {
        fragment.transform = Y_UP_TO_Z_UP * fragment.transform;
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let fragment_count = fragments.len();
    let object = Object::merge(name, fragments);
    if object.triangle_count() == 0 {
        return Err(ImportError::NoMeshes(path.to_path_buf()));
    }

    log::debug!(
        "imported {}: {} fragment(s), {} triangles",
        path.display(),
        fragment_count,
        object.triangle_count()
    );
    Ok(object)
}
