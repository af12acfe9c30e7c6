//! Typed uniform buffers
use std::marker::PhantomData;

/// A GPU uniform buffer holding exactly one `Content`.
///
/// Remembers the last bytes it uploaded and skips identical writes, which
/// matters when the same frame data is pushed once per view.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    previous_content: Vec<u8>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Short type name for labels, e.g. `FrameUniforms`.
    fn name() -> &'static str {
        let type_name = std::any::type_name::<Content>();
        type_name.rsplit("::").next().unwrap_or(type_name)
    }

    /// Allocates the buffer and uploads `initial` in one step.
    pub fn new_with_data(device: &wgpu::Device, initial: &Content) -> Self {
        let bytes = bytemuck::bytes_of(initial);
        let buffer = wgpu::util::DeviceExt::create_buffer_init(
            device,
            &wgpu::util::BufferInitDescriptor {
                label: Some(&format!("UniformBuffer: {}", Self::name())),
                contents: bytes,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        UniformBuffer {
            buffer,
            content_type: PhantomData,
            previous_content: bytes.to_vec(),
        }
    }

    /// Writes `content` unless it matches the last upload.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: &Content) {
        let new_content = bytemuck::bytes_of(content);
        if self.previous_content == new_content {
            return;
        }
        queue.write_buffer(&self.buffer, 0, new_content);
        self.previous_content = new_content.to_vec();
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}
