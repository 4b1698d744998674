use std::collections::HashSet;
use std::mem::offset_of;

use glam::Vec4;
use id_arena::{Arena, Id};
use wgpu::util::DeviceExt;

use crate::{
    model::{MaterialData, Model, ModelPrimitive, Vertex},
    rendering::{
        instance::{Instance, InstanceBuffer},
        render_common::RenderCommon,
        texture::Texture,
    },
    scene_graph::Scene,
    selection::SelectionSet,
};

pub type RenderModelId = Id<RenderModel>;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color: Vec4,
}

pub struct RenderMaterial {
    _uniform_buffer: wgpu::Buffer,
    _texture: Option<Texture>,
    pub bind_group: wgpu::BindGroup,
}

impl RenderMaterial {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        common: &RenderCommon,
        material: &MaterialData,
        label: &str,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Material uniform ({label})")),
            contents: bytemuck::cast_slice(&[MaterialUniform {
                base_color: material.base_color_factor,
            }]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let texture = material
            .base_color_texture
            .as_ref()
            .map(|image| {
                Texture::from_image(device, queue, image, &format!("{label} (BaseColor)"))
            });

        let view = texture
            .as_ref()
            .map(Texture::view)
            .unwrap_or_else(|| common.white_texture.view());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group ({label})")),
            layout: &common.material_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&common.sampler),
                },
            ],
        });

        Self {
            _uniform_buffer: uniform_buffer,
            _texture: texture,
            bind_group,
        }
    }
}

pub struct RenderPrimitive {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub material: RenderMaterial,
}

impl RenderPrimitive {
    fn from_primitive(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        common: &RenderCommon,
        model: &Model,
        primitive: &ModelPrimitive,
    ) -> Self {
        let label = format!("{}, primitive {}", model.name, primitive.index);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Vertex buffer ({label})")),
            contents: bytemuck::cast_slice(&primitive.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Index buffer ({label})")),
            contents: bytemuck::cast_slice(&primitive.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: primitive.indices.len() as u32,
            material: RenderMaterial::new(device, queue, common, &primitive.material, &label),
        }
    }
}

pub struct RenderModel {
    pub primitives: Vec<RenderPrimitive>,
    pub instances: InstanceBuffer,
    /// Instances belonging to the outline selection.
    pub selected_instances: InstanceBuffer,
}

impl RenderModel {
    pub fn from_model(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        common: &RenderCommon,
        model: &Model,
    ) -> Self {
        let primitives = model
            .primitives
            .iter()
            .map(|primitive| {
                RenderPrimitive::from_primitive(device, queue, common, model, primitive)
            })
            .collect();

        RenderModel {
            primitives,
            instances: InstanceBuffer::new(device, format!("Instance buffer ({})", model.name)),
            selected_instances: InstanceBuffer::new(
                device,
                format!("Selected instance buffer ({})", model.name),
            ),
        }
    }

    pub fn draw_instances(&self, render_pass: &mut wgpu::RenderPass<'_>, with_materials: bool) {
        self.draw(render_pass, &self.instances, with_materials);
    }

    pub fn draw_selected(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        self.draw(render_pass, &self.selected_instances, false);
    }

    fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        instances: &InstanceBuffer,
        with_materials: bool,
    ) {
        if instances.is_empty() {
            return;
        }

        instances.bind(render_pass);

        for primitive in &self.primitives {
            if with_materials {
                render_pass.set_bind_group(1, &primitive.material.bind_group, &[]);
            }
            render_pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..primitive.num_indices, 0, 0..instances.len());
        }
    }
}

/// Rebuilds every model's instance lists from the scene's world matrices.
pub fn gather_instances(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    scene: &Scene,
    selection: &SelectionSet,
    render_models: &mut Arena<RenderModel>,
) {
    for (_, render_model) in render_models.iter_mut() {
        render_model.instances.clear();
        render_model.selected_instances.clear();
    }

    let highlighted = selection
        .objects()
        .iter()
        .flat_map(|&id| scene.subtree(id))
        .collect::<HashSet<_>>();

    for (object_id, object) in scene.objects.iter() {
        let Some(render_model_id) = object
            .model_id
            .and_then(|model_id| scene.get_model(model_id))
            .and_then(|scene_model| scene_model.render_model)
        else {
            continue;
        };

        let Some(render_model) = render_models.get_mut(render_model_id) else {
            continue;
        };

        let instance = Instance {
            model: *object.transform.get_world_matrix(),
        };

        render_model.instances.push(instance);
        if highlighted.contains(&object_id) {
            render_model.selected_instances.push(instance);
        }
    }

    for (_, render_model) in render_models.iter_mut() {
        render_model.instances.upload(device, queue);
        render_model.selected_instances.upload(device, queue);
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, tex_coords) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

// Body panels are open shells and must render from both sides.
pub const MODEL_PRIMITIVE_STATE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Ccw,
    cull_mode: None,
    polygon_mode: wgpu::PolygonMode::Fill,
    unclipped_depth: false,
    conservative: false,
};
