use glam::Mat4;
use wgpu::BufferUsages;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    pub model: Mat4,
}

impl Instance {
    pub fn descriptor() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
        ];

        wgpu::VertexBufferLayout {
            array_stride: size_of::<Instance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Per-frame instance list backed by a GPU buffer that grows on demand.
pub struct InstanceBuffer {
    label: String,
    instances: Vec<Instance>,
    buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: usize = 16;

    pub fn new(device: &wgpu::Device, label: impl Into<String>) -> Self {
        let label = label.into();
        let buffer = Self::create_buffer(device, &label, Self::INITIAL_CAPACITY);

        Self {
            label,
            instances: Vec::new(),
            buffer,
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    fn create_buffer(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (size_of::<Instance>() * capacity) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn len(&self) -> u32 {
        self.instances.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.instances.len() > self.capacity {
            self.capacity = self.instances.len().next_power_of_two();
            self.buffer = Self::create_buffer(device, &self.label, self.capacity);
        }

        if !self.instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.instances));
        }
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(1, self.buffer.slice(..));
    }
}
