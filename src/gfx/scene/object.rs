use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

use super::{bounds::Aabb, vertex::Vertex3D};

/// Light gray used when an asset carries no usable material color.
pub const DEFAULT_BASE_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Indexed triangle geometry in object-local space with one material color.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    pub base_color: [f32; 4],
}

impl Mesh {
    /// Builds a mesh from flat `xyz` arrays.
    ///
    /// When `normals` does not carry one normal per position, smooth vertex
    /// normals are computed from the faces instead.
    pub fn new(positions: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            Self::calculate_vertex_normals(&positions, &indices)
        };

        let vertices = positions
            .chunks_exact(3)
            .zip(normals.chunks_exact(3))
            .map(|(p, n)| Vertex3D {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
            })
            .collect();

        Self {
            vertices,
            indices,
            base_color: DEFAULT_BASE_COLOR,
        }
    }

    pub fn with_base_color(mut self, color: [f32; 4]) -> Self {
        self.base_color = color;
        self
    }

    /// Area-weighted average of adjacent face normals, per vertex.
    ///
    /// Vertices only touched by zero-area faces keep a zero normal.
    pub fn calculate_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
        let vertex_count = positions.len() / 3;
        let mut accum = vec![Vector3::new(0.0f32, 0.0, 0.0); vertex_count];
        let at = |i: usize| {
            Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2])
        };

        for triangle in indices.chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            // Unnormalized cross product weights by triangle area.
            let face = (at(i1) - at(i0)).cross(at(i2) - at(i0));
            for i in [i0, i1, i2] {
                accum[i] += face;
            }
        }

        accum
            .into_iter()
            .flat_map(|n| {
                let len = n.magnitude();
                let n = if len > 0.0 { n / len } else { n };
                [n.x, n.y, n.z]
            })
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Box around vertices referenced by at least one triangle.
    ///
    /// Out-of-range indices are ignored.
    pub fn local_bounds(&self) -> Option<Aabb> {
        let used = self.indices.len() - self.indices.len() % 3;
        Aabb::from_points(
            self.indices[..used]
                .iter()
                .filter_map(|&i| self.vertices.get(i as usize))
                .map(|v| v.position),
        )
    }

    /// Copy with `matrix` applied to positions and normals.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Mesh {
        let normal_matrix = normal_matrix(matrix);
        let vertices = self
            .vertices
            .iter()
            .map(|v| {
                let p = matrix * Vector4::new(v.position[0], v.position[1], v.position[2], 1.0);
                let n = normal_matrix * Vector3::from(v.normal);
                let n = if n.magnitude2() > 0.0 { n.normalize() } else { n };
                Vertex3D {
                    position: [p.x / p.w, p.y / p.w, p.z / p.w],
                    normal: n.into(),
                }
            })
            .collect();

        Mesh {
            vertices,
            indices: self.indices.clone(),
            base_color: self.base_color,
        }
    }

    /// Appends `other`, offsetting its indices.
    pub fn append(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }
}

/// Inverse transpose of the upper 3x3, falling back to the 3x3 itself for
/// singular matrices.
pub fn normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let m = Matrix3::from_cols(matrix.x.truncate(), matrix.y.truncate(), matrix.z.truncate());
    m.invert().map(|inv| inv.transpose()).unwrap_or(m)
}

/// A renderable object: meshes sharing one world transform.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub transform: Matrix4<f32>,
}

impl Object {
    /// Create a new Object with identity transformation
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>) -> Self {
        Self {
            name: name.into(),
            meshes,
            transform: Matrix4::identity(),
        }
    }

    /// Paints every mesh with `color`.
    pub fn with_base_color(mut self, color: [f32; 4]) -> Self {
        for mesh in &mut self.meshes {
            mesh.base_color = color;
        }
        self
    }

    /// Collapses several fragments into one rigid object.
    ///
    /// Each fragment's transform is baked into its vertices and the result
    /// has an identity transform. Meshes of equal color are concatenated,
    /// so the merged object keeps one mesh per distinct material color in
    /// first-seen order.
    pub fn merge(name: impl Into<String>, fragments: Vec<Object>) -> Object {
        let mut merged: Vec<Mesh> = Vec::new();
        for fragment in &fragments {
            for mesh in &fragment.meshes {
                let baked = mesh.transformed(&fragment.transform);
                match merged.iter_mut().find(|m| m.base_color == baked.base_color) {
                    Some(target) => target.append(&baked),
                    None => merged.push(baked),
                }
            }
        }

        Object::new(name, merged)
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Union of the mesh bounds in object space.
    pub fn local_bounds(&self) -> Option<Aabb> {
        self.meshes
            .iter()
            .filter_map(Mesh::local_bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    /// Local bounds' corners carried through `transform`.
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.local_bounds().map(|b| b.transformed(&self.transform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_cube;

    #[test]
    fn test_missing_normals_are_computed() {
        // One triangle in the XY plane, counter-clockwise seen from +Z.
        let mesh = Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            Vec::new(),
            vec![0, 1, 2],
        );
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn test_merge_bakes_transforms() {
        let mut a = Object::new("a", vec![generate_cube().into_mesh()]);
        a.transform = Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0));
        let b = Object::new("b", vec![generate_cube().into_mesh()]);

        let merged = Object::merge("ab", vec![a, b]);
        assert_eq!(merged.meshes.len(), 1);
        assert_eq!(merged.triangle_count(), 24);
        assert_eq!(merged.transform, Matrix4::identity());
        assert_eq!(merged.meshes[0].base_color, DEFAULT_BASE_COLOR);

        let bounds = merged.world_bounds().unwrap();
        assert!((bounds.min.x + 0.5).abs() < 1e-6);
        assert!((bounds.max.x - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_merge_keeps_one_mesh_per_color() {
        let red = [1.0, 0.0, 0.0, 1.0];
        let blue = [0.0, 0.0, 1.0, 1.0];
        let a = Object::new("a", vec![generate_cube().into_mesh()]).with_base_color(red);
        let mut b = Object::new("b", vec![generate_cube().into_mesh()]).with_base_color(blue);
        b.transform = Matrix4::from_translation(Vector3::new(0.0, 3.0, 0.0));
        let c = Object::new("c", vec![generate_cube().into_mesh()]).with_base_color(red);

        let merged = Object::merge("abc", vec![a, b, c]);
        assert_eq!(merged.meshes.len(), 2);
        assert_eq!(merged.meshes[0].base_color, red);
        assert_eq!(merged.meshes[0].triangle_count(), 24);
        assert_eq!(merged.meshes[1].base_color, blue);
        assert_eq!(merged.meshes[1].triangle_count(), 12);

        let blue_bounds = merged.meshes[1].local_bounds().unwrap();
        assert!((blue_bounds.min.y - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_unreferenced_vertices_do_not_grow_bounds() {
        let mesh = Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 50.0, 50.0, 50.0],
            Vec::new(),
            vec![0, 1, 2],
        );
        let bounds = mesh.local_bounds().unwrap();
        assert_eq!(bounds.max.x, 1.0);
        assert_eq!(bounds.max.z, 0.0);
    }

    #[test]
    fn test_transformed_normals_stay_unit_under_scale() {
        let mesh = generate_cube().into_mesh();
        let squashed = mesh.transformed(&Matrix4::from_nonuniform_scale(4.0, 1.0, 0.25));
        for v in &squashed.vertices {
            let n = Vector3::from(v.normal);
            assert!((n.magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_mesh_without_triangles_has_no_bounds() {
        let mesh = Mesh::new(vec![0.0, 0.0, 0.0], Vec::new(), Vec::new());
        assert!(mesh.local_bounds().is_none());
        assert!(Object::new("empty", vec![mesh]).world_bounds().is_none());
    }
}
