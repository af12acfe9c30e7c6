use std::path::Path;

use crate::{
    error::ImportError,
    gfx::scene::{object::DEFAULT_BASE_COLOR, Mesh, Object},
};

/// One object per OBJ model, colored by its material's diffuse term.
pub(super) fn load(path: &Path) -> Result<Vec<Object>, ImportError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| ImportError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    // A missing or broken .mtl only costs us the colors.
    let materials = materials.unwrap_or_else(|err| {
        log::warn!("{}: ignoring materials ({err})", path.display());
        Vec::new()
    });

    let objects = models
        .into_iter()
        .filter(|model| !model.mesh.indices.is_empty())
        .map(|model| {
            let base_color = model
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .and_then(|mtl| {
                    mtl.diffuse
                        .map(|[r, g, b]| [r, g, b, mtl.dissolve.unwrap_or(1.0)])
                })
                .unwrap_or(DEFAULT_BASE_COLOR);

            let mesh = Mesh::new(model.mesh.positions, model.mesh.normals, model.mesh.indices)
                .with_base_color(base_color);
            Object::new(model.name, vec![mesh])
        })
        .collect();

    Ok(objects)
}
