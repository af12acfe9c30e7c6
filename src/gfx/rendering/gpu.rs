//! Offscreen wgpu renderer
//!
//! Draws a scene into a (optionally 4x multisampled) sRGB color target,
//! copies the resolved image into a mappable buffer and blocks until the
//! pixels are back on the host.

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use super::{
    backend::{new_instance, request_hardware_adapter},
    linear_to_srgb, to_u8, AdapterSummary, Frame, RenderBackend, Renderer,
};
use crate::{
    error::RenderError,
    gfx::{
        camera::{camera_utils::convert_matrix4_to_array, Camera},
        lighting::{EXPOSURE, MAX_LIGHTS},
        resources::TextureResource,
        scene::{object::normal_matrix, Mesh, Object, Scene, Vertex3D},
    },
    wgpu_utils::{padded_bytes_per_row, UniformBuffer},
};

const MSAA_SAMPLES: u32 = 4;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuLight {
    /// xyz = position, w = energy in watts
    position_energy: [f32; 4],
    color: [f32; 4],
}

/// Per-view uniform block. MUST match `FrameUniforms` in orbit.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    world: [f32; 4],
    /// x = light count, y = exposure
    params: [f32; 4],
    lights: [GpuLight; MAX_LIGHTS],
}

impl FrameUniforms {
    pub fn from_scene(scene: &Scene) -> Self {
        let mut lights = [GpuLight {
            position_energy: [0.0; 4],
            color: [0.0; 4],
        }; MAX_LIGHTS];
        let count = scene.lights.len().min(MAX_LIGHTS);
        if scene.lights.len() > MAX_LIGHTS {
            log::warn!("scene has {} lights, only {MAX_LIGHTS} are used", scene.lights.len());
        }
        for (slot, light) in lights.iter_mut().zip(&scene.lights) {
            let p = light.position;
            slot.position_energy = [p.x, p.y, p.z, light.energy];
            slot.color = [light.color[0], light.color[1], light.color[2], 1.0];
        }

        let eye = scene.camera.eye;
        let w = scene.world;
        Self {
            view_proj: convert_matrix4_to_array(scene.camera.build_view_projection_matrix()),
            eye: [eye.x, eye.y, eye.z, 1.0],
            world: [w.color[0], w.color[1], w.color[2], w.strength],
            params: [count as f32, EXPOSURE, 0.0, 0.0],
            lights,
        }
    }
}

/// Per-mesh uniform block. MUST match `ObjectUniforms` in orbit.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    base_color: [f32; 4],
}

impl ObjectUniforms {
    fn new(object: &Object, mesh: &Mesh) -> Self {
        let normal = Matrix4::from(normal_matrix(&object.transform));
        Self {
            model: convert_matrix4_to_array(object.transform),
            normal: convert_matrix4_to_array(normal),
            base_color: mesh.base_color,
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    // Keeps the buffer behind `bind_group` alive.
    _uniforms: UniformBuffer<ObjectUniforms>,
    bind_group: wgpu::BindGroup,
}

/// Attachments for one resolution and sample count.
struct RenderTargets {
    size: u32,
    sample_count: u32,
    msaa: Option<TextureResource>,
    resolve: TextureResource,
    depth: TextureResource,
    readback: wgpu::Buffer,
    padded_row: u32,
}

impl RenderTargets {
    fn new(device: &wgpu::Device, size: u32, sample_count: u32) -> Self {
        let extent = (size, size);
        let msaa = (sample_count > 1).then(|| {
            TextureResource::create_msaa_target(device, extent, sample_count, "msaa_color")
        });
        let padded_row = padded_bytes_per_row(size, 4);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_row * size) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            size,
            sample_count,
            msaa,
            resolve: TextureResource::create_readback_target(device, extent, "resolved_color"),
            depth: TextureResource::create_depth_texture(
                device,
                extent,
                sample_count,
                "depth_texture",
            ),
            readback,
            padded_row,
        }
    }
}

/// Hardware renderer. Device, queue and pipelines live for the whole batch;
/// geometry is replaced on every `prepare`.
pub struct GpuRenderer {
    backend: RenderBackend,
    device: wgpu::Device,
    queue: wgpu::Queue,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    object_layout: wgpu::BindGroupLayout,
    frame_ubo: UniformBuffer<FrameUniforms>,
    frame_bind_group: wgpu::BindGroup,
    pipeline: Option<(u32, wgpu::RenderPipeline)>,
    targets: Option<RenderTargets>,
    meshes: Option<Vec<GpuMesh>>,
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl GpuRenderer {
    /// Opens a device on the hardware adapter described by `summary`.
    pub fn new(summary: AdapterSummary) -> Result<Self, RenderError> {
        let instance = new_instance();
        let adapter = request_hardware_adapter(&instance).ok_or_else(|| {
            RenderError::Adapter(format!("adapter '{}' disappeared", summary.name))
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Orbit Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RenderError::Device(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Orbit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("orbit.wgsl").into()),
        });

        let frame_layout = uniform_layout(&device, "Frame Bind Group Layout");
        let object_layout = uniform_layout(&device, "Object Bind Group Layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Orbit Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let frame_ubo =
            UniformBuffer::<FrameUniforms>::new_with_data(&device, &bytemuck::Zeroable::zeroed());
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_ubo.binding_resource(),
            }],
        });

        log::info!(
            "gpu renderer: samples map to 1x or {MSAA_SAMPLES}x MSAA, \
             adaptive_sampling and denoise are ignored"
        );

        Ok(Self {
            backend: RenderBackend::Accelerated(summary),
            device,
            queue,
            shader,
            pipeline_layout,
            object_layout,
            frame_ubo,
            frame_bind_group,
            pipeline: None,
            targets: None,
            meshes: None,
        })
    }

    fn ensure_pipeline(&mut self, sample_count: u32) {
        if matches!(&self.pipeline, Some((count, _)) if *count == sample_count) {
            return;
        }
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Orbit Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex3D::desc()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TextureResource::COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Asset winding is not trustworthy.
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: TextureResource::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });
        self.pipeline = Some((sample_count, pipeline));
    }

    fn ensure_targets(&mut self, size: u32, sample_count: u32) {
        if matches!(&self.targets, Some(t) if t.size == size && t.sample_count == sample_count) {
            return;
        }
        self.targets = Some(RenderTargets::new(&self.device, size, sample_count));
    }

    fn upload_mesh(&self, object: &Object, mesh: &Mesh) -> GpuMesh {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let uniforms =
            UniformBuffer::new_with_data(&self.device, &ObjectUniforms::new(object, mesh));
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding_resource(),
            }],
        });

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            _uniforms: uniforms,
            bind_group,
        }
    }

    /// Maps the readback buffer and strips row padding.
    fn read_pixels(&self, targets: &RenderTargets) -> Result<Vec<u8>, RenderError> {
        let slice = targets.readback.slice(..);
        let (tx, rx) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        match futures::executor::block_on(rx) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderError::Readback(e.to_string())),
            Err(_) => return Err(RenderError::Readback("map callback was dropped".into())),
        }

        let row = (targets.size * 4) as usize;
        let mut pixels = Vec::with_capacity(row * targets.size as usize);
        {
            let mapped = slice.get_mapped_range();
            for chunk in mapped.chunks(targets.padded_row as usize) {
                pixels.extend_from_slice(&chunk[..row]);
            }
        }
        targets.readback.unmap();
        Ok(pixels)
    }
}

impl Renderer for GpuRenderer {
    fn backend(&self) -> &RenderBackend {
        &self.backend
    }

    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let meshes = scene
            .objects
            .iter()
            .flat_map(|object| object.meshes.iter().map(move |mesh| (object, mesh)))
            .filter(|(_, mesh)| !mesh.indices.is_empty())
            .map(|(object, mesh)| self.upload_mesh(object, mesh))
            .collect();
        self.meshes = Some(meshes);
        Ok(())
    }

    fn render(&mut self, scene: &Scene) -> Result<Frame, RenderError> {
        if self.meshes.is_none() {
            return Err(RenderError::NotPrepared);
        }
        let settings = &scene.settings;
        let size = settings.resolution.max(1);
        let sample_count = if settings.samples > 1 { MSAA_SAMPLES } else { 1 };
        self.ensure_pipeline(sample_count);
        self.ensure_targets(size, sample_count);
        self.frame_ubo
            .update_content(&self.queue, &FrameUniforms::from_scene(scene));

        let (Some(meshes), Some(targets), Some((_, pipeline))) =
            (&self.meshes, &self.targets, &self.pipeline)
        else {
            return Err(RenderError::NotPrepared);
        };

        let clear = if settings.transparent_background {
            wgpu::Color::TRANSPARENT
        } else {
            let c = scene.world.color;
            wgpu::Color {
                r: c[0] as f64,
                g: c[1] as f64,
                b: c[2] as f64,
                a: 1.0,
            }
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Orbit Encoder"),
            });

        {
            let (view, resolve_target) = match &targets.msaa {
                Some(msaa) => (&msaa.view, Some(&targets.resolve.view)),
                None => (&targets.resolve.view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Orbit Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for mesh in meshes {
                render_pass.set_bind_group(1, &mesh.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.resolve.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &targets.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(targets.padded_row),
                    rows_per_image: Some(size),
                },
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let mut pixels = self.read_pixels(targets)?;
        if settings.transparent_background {
            unpremultiply(&mut pixels);
        }
        log::debug!("gpu frame {size}x{size} ({sample_count}x MSAA)");

        Ok(Frame {
            width: size,
            height: size,
            pixels,
        })
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Resolving against a transparent clear leaves edge colors premultiplied.
/// Converts them to straight alpha, working in linear space.
fn unpremultiply(pixels: &mut [u8]) {
    for p in pixels.chunks_exact_mut(4) {
        let a = p[3];
        if a == 0 || a == 255 {
            continue;
        }
        let alpha = a as f32 / 255.0;
        for c in &mut p[..3] {
            let linear = srgb_to_linear(*c as f32 / 255.0) / alpha;
            *c = to_u8(linear_to_srgb(linear));
        }
    }
}
