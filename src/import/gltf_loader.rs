use std::path::Path;

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    error::ImportError,
    gfx::scene::{Mesh, Object},
};

/// One object per triangle primitive reachable from the default scene, with
/// the accumulated node transform.
///
/// Only the document and its buffers are read. Images are never loaded, so a
/// missing or undecodable texture does not fail the import.
pub(super) fn load(path: &Path) -> Result<Vec<Object>, ImportError> {
    let gltf_error = |source| ImportError::Gltf {
        path: path.to_path_buf(),
        source,
    };
    let ::gltf::Gltf { document, blob } = ::gltf::Gltf::open(path).map_err(gltf_error)?;
    let buffers = ::gltf::import_buffers(&document, path.parent(), blob).map_err(gltf_error)?;

    let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    else {
        return Ok(Vec::new());
    };

    let mut objects = Vec::new();
    for node in scene.nodes() {
        visit_node(&node, Matrix4::identity(), &buffers, &mut objects);
    }
    Ok(objects)
}

fn visit_node(
    node: &::gltf::Node<'_>,
    parent: Matrix4<f32>,
    buffers: &[::gltf::buffer::Data],
    out: &mut Vec<Object>,
) {
    let transform = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = node.name().or(mesh.name()).unwrap_or("mesh").to_string();
        for primitive in mesh.primitives() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                log::debug!("{name}: skipping {:?} primitive", primitive.mode());
                continue;
            }
            if let Some(mut object) = read_primitive(&name, &primitive, buffers) {
                object.transform = transform;
                out.push(object);
            }
        }
    }

    for child in node.children() {
        visit_node(&child, transform, buffers, out);
    }
}

fn read_primitive(
    name: &str,
    primitive: &::gltf::Primitive<'_>,
    buffers: &[::gltf::buffer::Data],
) -> Option<Object> {
    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<f32> = reader.read_positions()?.flatten().collect();
    let normals: Vec<f32> = reader
        .read_normals()
        .map(|iter| iter.flatten().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..(positions.len() / 3) as u32).collect(),
    };

    if indices.len() < 3 {
        return None;
    }

    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();

    let mesh = Mesh::new(positions, normals, indices).with_base_color(base_color);
    Some(Object::new(name, vec![mesh]))
}
