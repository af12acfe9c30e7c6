//! CPU rasterizer
//!
//! Renders in two passes. The visibility pass rasterizes every triangle into
//! a supersampled buffer holding the nearest depth and triangle id per
//! sample. The resolve pass shades those samples with
//! [`lighting::shade`](crate::gfx::lighting::shade) and averages them into
//! pixels.
//!
//! Supersampling uses an `n x n` grid per pixel with `n = ceil(sqrt(samples))`
//! capped at 4. With adaptive sampling, a pixel whose samples all hit the same
//! triangle is shaded once at its center. Triangles reaching behind the
//! camera are dropped rather than clipped; the orbit keeps the asset well in
//! front of the near plane.

use cgmath::{Matrix4, Vector3};

use super::{linear_to_srgb, to_u8, Frame, RenderBackend, Renderer};
use crate::{
    error::RenderError,
    gfx::{
        camera::Camera,
        lighting::{shade, Light, World},
        scene::{object::normal_matrix, Scene},
    },
};

/// Largest supersampling grid edge.
pub const MAX_GRID: u32 = 4;

const MIN_CLIP_W: f32 = 1e-5;
const EMPTY: u32 = u32::MAX;

/// Samples per pixel edge for a requested sample count.
pub fn sample_grid(samples: u32) -> u32 {
    ((samples.max(1) as f32).sqrt().ceil() as u32).clamp(1, MAX_GRID)
}

/// A triangle baked into world space with its object's color.
struct WorldTriangle {
    positions: [Vector3<f32>; 3],
    normals: [Vector3<f32>; 3],
    color: [f32; 3],
}

/// A projected triangle in sample-grid coordinates.
struct ScreenTriangle {
    xy: [[f32; 2]; 3],
    depth: [f32; 3],
    inv_w: [f32; 3],
    area: f32,
    source: usize,
}

impl ScreenTriangle {
    /// Screen-space barycentric weights of `p`.
    fn barycentric(&self, p: [f32; 2]) -> [f32; 3] {
        let [a, b, c] = self.xy;
        [
            edge(b, c, p) / self.area,
            edge(c, a, p) / self.area,
            edge(a, b, p) / self.area,
        ]
    }

    /// Barycentric weights corrected for perspective.
    fn perspective_weights(&self, p: [f32; 2]) -> [f32; 3] {
        let b = self.barycentric(p);
        let w = [b[0] * self.inv_w[0], b[1] * self.inv_w[1], b[2] * self.inv_w[2]];
        let sum = w[0] + w[1] + w[2];
        if sum.abs() < f32::EPSILON {
            return b;
        }
        [w[0] / sum, w[1] / sum, w[2] / sum]
    }
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Renders on the CPU. Always available.
pub struct SoftwareRenderer {
    backend: RenderBackend,
    triangles: Option<Vec<WorldTriangle>>,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self {
            backend: RenderBackend::CpuFallback,
            triangles: None,
        }
    }

    fn project(
        triangles: &[WorldTriangle],
        view_proj: &Matrix4<f32>,
        extent: f32,
    ) -> Vec<ScreenTriangle> {
        triangles
            .iter()
            .enumerate()
            .filter_map(|(source, tri)| {
                let mut xy = [[0.0; 2]; 3];
                let mut depth = [0.0; 3];
                let mut inv_w = [0.0; 3];
                for (i, p) in tri.positions.iter().enumerate() {
                    let clip = view_proj * p.extend(1.0);
                    if clip.w <= MIN_CLIP_W {
                        return None;
                    }
                    let ndc = clip.truncate() / clip.w;
                    xy[i] = [(ndc.x * 0.5 + 0.5) * extent, (0.5 - ndc.y * 0.5) * extent];
                    depth[i] = ndc.z;
                    inv_w[i] = 1.0 / clip.w;
                }
                let area = edge(xy[0], xy[1], xy[2]);
                if area.abs() < 1e-9 {
                    return None;
                }
                Some(ScreenTriangle {
                    xy,
                    depth,
                    inv_w,
                    area,
                    source,
                })
            })
            .collect()
    }

    /// Nearest depth and triangle index per sample, `extent x extent`.
    fn visibility(screen: &[ScreenTriangle], extent: u32) -> Vec<(f32, u32)> {
        let mut buffer = vec![(f32::INFINITY, EMPTY); (extent * extent) as usize];
        let max = extent as f32;

        for (id, tri) in screen.iter().enumerate() {
            let xs = tri.xy.map(|p| p[0]);
            let ys = tri.xy.map(|p| p[1]);
            let x0 = xs.iter().cloned().fold(f32::INFINITY, f32::min).max(0.0).floor() as u32;
            let y0 = ys.iter().cloned().fold(f32::INFINITY, f32::min).max(0.0).floor() as u32;
            let x1 = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max).min(max - 1.0).ceil();
            let y1 = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max).min(max - 1.0).ceil();
            if x1 < 0.0 || y1 < 0.0 {
                continue;
            }
            let (x1, y1) = (x1 as u32, y1 as u32);

            for y in y0..=y1.min(extent - 1) {
                for x in x0..=x1.min(extent - 1) {
                    let p = [x as f32 + 0.5, y as f32 + 0.5];
                    let b = tri.barycentric(p);
                    if b[0] < 0.0 || b[1] < 0.0 || b[2] < 0.0 {
                        continue;
                    }
                    let z = b[0] * tri.depth[0] + b[1] * tri.depth[1] + b[2] * tri.depth[2];
                    if !(0.0..=1.0).contains(&z) {
                        continue;
                    }
                    let slot = &mut buffer[(y * extent + x) as usize];
                    if z < slot.0 {
                        *slot = (z, id as u32);
                    }
                }
            }
        }

        buffer
    }
}

/// Everything the resolve pass needs to shade one sample.
struct ShadeContext<'a> {
    screen: &'a [ScreenTriangle],
    world_tris: &'a [WorldTriangle],
    eye: Vector3<f32>,
    lights: &'a [Light],
    world: &'a World,
}

impl ShadeContext<'_> {
    fn shade_at(&self, id: u32, p: [f32; 2]) -> [f32; 3] {
        let tri = &self.screen[id as usize];
        let src = &self.world_tris[tri.source];
        let w = tri.perspective_weights(p);
        let position = src.positions[0] * w[0] + src.positions[1] * w[1] + src.positions[2] * w[2];
        let normal = src.normals[0] * w[0] + src.normals[1] * w[1] + src.normals[2] * w[2];
        shade(src.color, position, normal, self.eye, self.lights, self.world)
    }
}

impl Renderer for SoftwareRenderer {
    fn backend(&self) -> &RenderBackend {
        &self.backend
    }

    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let mut triangles = Vec::with_capacity(scene.triangle_count());
        for object in &scene.objects {
            let normal_matrix = normal_matrix(&object.transform);
            let to_world = |p: [f32; 3]| {
                let h = object.transform * Vector3::from(p).extend(1.0);
                h.truncate() / h.w
            };
            for mesh in &object.meshes {
                let color = [mesh.base_color[0], mesh.base_color[1], mesh.base_color[2]];
                let vertex = |i: u32| mesh.vertices.get(i as usize);
                for tri in mesh.indices.chunks_exact(3) {
                    let (Some(a), Some(b), Some(c)) =
                        (vertex(tri[0]), vertex(tri[1]), vertex(tri[2]))
                    else {
                        continue;
                    };
                    triangles.push(WorldTriangle {
                        positions: [a.position, b.position, c.position].map(to_world),
                        normals: [a.normal, b.normal, c.normal]
                            .map(|n| normal_matrix * Vector3::from(n)),
                        color,
                    });
                }
            }
        }
        log::debug!("software renderer: baked {} triangles", triangles.len());
        self.triangles = Some(triangles);
        Ok(())
    }

    fn render(&mut self, scene: &Scene) -> Result<Frame, RenderError> {
        let world_tris = self.triangles.as_deref().ok_or(RenderError::NotPrepared)?;
        let settings = &scene.settings;
        let size = settings.resolution.max(1);
        let grid = sample_grid(settings.samples);
        let extent = size * grid;
        let per_pixel = (grid * grid) as f32;

        let view_proj = scene.camera.build_view_projection_matrix();
        let screen = Self::project(world_tris, &view_proj, extent as f32);
        let visibility = Self::visibility(&screen, extent);

        let ctx = ShadeContext {
            screen: &screen,
            world_tris,
            eye: scene.camera.eye,
            lights: &scene.lights,
            world: &scene.world,
        };

        // Linear RGB plus coverage, straight alpha.
        let mut linear = vec![[0.0f32; 4]; (size * size) as usize];
        let mut ids = Vec::with_capacity((grid * grid) as usize);
        for py in 0..size {
            for px in 0..size {
                ids.clear();
                for sy in 0..grid {
                    for sx in 0..grid {
                        let (x, y) = (px * grid + sx, py * grid + sy);
                        let id = visibility[(y * extent + x) as usize].1;
                        if id != EMPTY {
                            ids.push((id, [x as f32 + 0.5, y as f32 + 0.5]));
                        }
                    }
                }
                if ids.is_empty() {
                    continue;
                }

                let uniform =
                    ids.len() as f32 == per_pixel && ids.iter().all(|(id, _)| *id == ids[0].0);
                let rgb = if settings.adaptive_sampling && uniform {
                    let center = [
                        (px as f32 + 0.5) * grid as f32,
                        (py as f32 + 0.5) * grid as f32,
                    ];
                    ctx.shade_at(ids[0].0, center)
                } else {
                    let mut sum = [0.0f32; 3];
                    for (id, p) in &ids {
                        let c = ctx.shade_at(*id, *p);
                        sum[0] += c[0];
                        sum[1] += c[1];
                        sum[2] += c[2];
                    }
                    let n = ids.len() as f32;
                    [sum[0] / n, sum[1] / n, sum[2] / n]
                };

                let coverage = ids.len() as f32 / per_pixel;
                linear[(py * size + px) as usize] = [rgb[0], rgb[1], rgb[2], coverage];
            }
        }

        if settings.denoise {
            linear = denoise(&linear, size);
        }
        if !settings.transparent_background {
            composite_over(&mut linear, scene.world.color);
        }

        let pixels = linear
            .iter()
            .flat_map(|p| {
                [
                    to_u8(linear_to_srgb(p[0])),
                    to_u8(linear_to_srgb(p[1])),
                    to_u8(linear_to_srgb(p[2])),
                    to_u8(p[3]),
                ]
            })
            .collect();

        Ok(Frame {
            width: size,
            height: size,
            pixels,
        })
    }
}

/// 3x3 smoothing of color weighted by neighbor coverage. Coverage itself is
/// left untouched so silhouettes stay sharp.
fn denoise(src: &[[f32; 4]], size: u32) -> Vec<[f32; 4]> {
    let mut out = src.to_vec();
    let size = size as i64;
    for y in 0..size {
        for x in 0..size {
            let center = src[(y * size + x) as usize];
            if center[3] <= 0.0 {
                continue;
            }
            let mut acc = [0.0f32; 3];
            let mut weight = 0.0f32;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= size || ny >= size {
                        continue;
                    }
                    let n = src[(ny * size + nx) as usize];
                    let w = if dx == 0 && dy == 0 { 4.0 * n[3] } else { n[3] };
                    acc[0] += n[0] * w;
                    acc[1] += n[1] * w;
                    acc[2] += n[2] * w;
                    weight += w;
                }
            }
            if weight > 0.0 {
                out[(y * size + x) as usize] =
                    [acc[0] / weight, acc[1] / weight, acc[2] / weight, center[3]];
            }
        }
    }
    out
}

/// Flattens straight-alpha pixels onto an opaque background.
fn composite_over(pixels: &mut [[f32; 4]], background: [f32; 3]) {
    for p in pixels.iter_mut() {
        let a = p[3];
        for c in 0..3 {
            p[c] = p[c] * a + background[c] * (1.0 - a);
        }
        p[3] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Preset,
        gfx::{
            geometry::generate_cube,
            scene::{normalize_objects, Object},
        },
        pipeline::poses::CameraPose,
    };

    fn cube_scene(resolution: u32, samples: u32) -> Scene {
        let mut settings = Preset::ThreePoint256.settings();
        settings.resolution = resolution;
        settings.samples = samples;
        settings.denoise = false;
        let mut scene = Scene::new(settings);
        scene.add_object(Object::new("cube", vec![generate_cube().into_mesh()]));
        normalize_objects(&mut scene.objects, 1.0).unwrap();
        scene.set_camera_pose(&CameraPose::new(30.0, 20.0, 2.2));
        scene
    }

    #[test]
    fn test_sample_grid() {
        assert_eq!(sample_grid(0), 1);
        assert_eq!(sample_grid(1), 1);
        assert_eq!(sample_grid(4), 2);
        assert_eq!(sample_grid(5), 3);
        assert_eq!(sample_grid(24), 4);
        assert_eq!(sample_grid(32), 4);
    }

    #[test]
    fn test_render_without_prepare_fails() {
        let scene = cube_scene(8, 1);
        let mut renderer = SoftwareRenderer::new();
        assert!(matches!(renderer.render(&scene), Err(RenderError::NotPrepared)));
    }

    #[test]
    fn test_cube_is_centered_and_background_transparent() {
        let scene = cube_scene(32, 4);
        let mut renderer = SoftwareRenderer::new();
        renderer.prepare(&scene).unwrap();
        let frame = renderer.render(&scene).unwrap();

        assert_eq!((frame.width, frame.height), (32, 32));
        assert_eq!(frame.pixels.len(), 32 * 32 * 4);
        assert_eq!(frame.pixel(16, 16)[3], 255);
        assert_eq!(frame.pixel(0, 0)[3], 0);
        assert_eq!(frame.pixel(31, 31)[3], 0);
        let coverage = frame.coverage();
        assert!(coverage > 0.1 && coverage < 0.9, "coverage {coverage}");
    }

    #[test]
    fn test_adaptive_sampling_matches_full_sampling() {
        let mut scene = cube_scene(24, 16);
        let mut renderer = SoftwareRenderer::new();
        renderer.prepare(&scene).unwrap();

        scene.settings.adaptive_sampling = true;
        let adaptive = renderer.render(&scene).unwrap();
        scene.settings.adaptive_sampling = false;
        let full = renderer.render(&scene).unwrap();

        let max_diff = adaptive
            .pixels
            .iter()
            .zip(&full.pixels)
            .map(|(a, b)| (*a as i32 - *b as i32).abs())
            .max()
            .unwrap();
        assert!(max_diff <= 6, "max channel difference {max_diff}");
    }

    #[test]
    fn test_opaque_background_uses_world_color() {
        let mut scene = cube_scene(16, 1);
        scene.settings.transparent_background = false;
        let mut renderer = SoftwareRenderer::new();
        renderer.prepare(&scene).unwrap();
        let frame = renderer.render(&scene).unwrap();

        assert!(frame.pixels.chunks_exact(4).all(|p| p[3] == 255));
        let bg = to_u8(linear_to_srgb(scene.world.color[0]));
        assert_eq!(frame.pixel(0, 0), [bg, bg, bg, 255]);
    }

    #[test]
    fn test_each_mesh_keeps_its_color() {
        let stacked = |z: f32, color: [f32; 4]| {
            let mut part = Object::new("part", vec![generate_cube().into_mesh()]);
            part.transform = Matrix4::from_translation(Vector3::new(0.0, 0.0, z));
            part.with_base_color(color)
        };
        let merged = Object::merge(
            "stack",
            vec![stacked(0.6, [1.0, 0.0, 0.0, 1.0]), stacked(-0.6, [0.0, 0.0, 1.0, 1.0])],
        );

        let mut scene = cube_scene(32, 1);
        scene.objects = vec![merged];
        normalize_objects(&mut scene.objects, 1.0).unwrap();
        let mut renderer = SoftwareRenderer::new();
        renderer.prepare(&scene).unwrap();
        let frame = renderer.render(&scene).unwrap();

        let opaque = || frame.pixels.chunks_exact(4).filter(|p| p[3] == 255);
        assert!(opaque().any(|p| p[0] > 0 && p[2] == 0), "no red pixels");
        assert!(opaque().any(|p| p[2] > 0 && p[0] == 0), "no blue pixels");
    }

    #[test]
    fn test_denoise_keeps_coverage() {
        let mut scene = cube_scene(16, 4);
        let mut renderer = SoftwareRenderer::new();
        renderer.prepare(&scene).unwrap();
        let plain = renderer.render(&scene).unwrap();
        scene.settings.denoise = true;
        let smoothed = renderer.render(&scene).unwrap();

        let alpha = |f: &Frame| f.pixels.chunks_exact(4).map(|p| p[3]).collect::<Vec<_>>();
        assert_eq!(alpha(&plain), alpha(&smoothed));
    }
}
