use glam::Vec4;
use id_arena::Arena;
use wgpu::{
    util::DeviceExt, Device, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    ShaderSource,
};
use winit::dpi::PhysicalSize;

use crate::{
    config::OutlineConfig,
    rendering::{
        instance::Instance,
        render_common::RenderCommon,
        render_model::{RenderModel, MODEL_PRIMITIVE_STATE, RENDER_MODEL_VBL},
        shader_loader::{PipelineCache, PipelineCacheBuilder, PipelineId, ShaderDefinition},
        texture::{RenderTarget, OUTLINE_MASK_FORMAT},
    },
};

const MASK_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Outline mask shader",
    path: "outline_mask.wgsl",
};

const EDGE_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Outline edge shader",
    path: "outline_edge.wgsl",
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OutlineParams {
    visible_edge_color: Vec4,
    hidden_edge_color: Vec4,
    edge_strength: f32,
    edge_thickness: f32,
    _padding: [f32; 2],
}

impl From<&OutlineConfig> for OutlineParams {
    fn from(config: &OutlineConfig) -> Self {
        Self {
            visible_edge_color: config.visible_edge_color,
            hidden_edge_color: config.hidden_edge_color,
            edge_strength: config.edge_strength,
            edge_thickness: config.edge_thickness,
            _padding: [0.0; 2],
        }
    }
}

/// Outlines the selected objects in two steps. The mask step draws the selected instances into
/// a single channel target, 1.0 where the surface is visible and 0.5 where it's hidden behind
/// other geometry. The edge step then paints the pixels just outside the mask over the frame.
pub struct OutlinePass {
    mask_pipeline: PipelineId,
    edge_pipeline: PipelineId,
    mask: RenderTarget,
    params_buffer: wgpu::Buffer,
    depth_bind_group_layout: wgpu::BindGroupLayout,
    depth_bind_group: wgpu::BindGroup,
    edge_bind_group_layout: wgpu::BindGroupLayout,
    edge_bind_group: wgpu::BindGroup,
}

impl OutlinePass {
    pub fn create(
        device: &wgpu::Device,
        common: &RenderCommon,
        cache_builder: &mut PipelineCacheBuilder,
        config: &OutlineConfig,
        size: PhysicalSize<u32>,
        scene_depth: &wgpu::TextureView,
    ) -> Self {
        let surface_format = common.surface_format();
        let mask = RenderTarget::new(device, size, OUTLINE_MASK_FORMAT, "Outline mask");

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Outline params"),
            contents: bytemuck::cast_slice(&[OutlineParams::from(config)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let depth_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Outline depth bind group layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                }],
            });

        let edge_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Outline edge bind group layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            });

        let mask_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Outline mask pipeline layout"),
            bind_group_layouts: &[&common.camera_bind_group_layout, &depth_bind_group_layout],
            push_constant_ranges: &[],
        });

        let edge_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Outline edge pipeline layout"),
            bind_group_layouts: &[&edge_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mask_pipeline = cache_builder.add_shader(
            MASK_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(shader_def.name),
                        source: ShaderSource::Wgsl(source.into()),
                    });

                    // Max blending keeps the visible value when a hidden fragment lands later.
                    let max_blend = wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Max,
                    };

                    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Outline mask render pipeline"),
                        layout: Some(&mask_layout),
                        vertex: wgpu::VertexState {
                            module: &shader,
                            entry_point: Some("vs_main"),
                            buffers: &[RENDER_MODEL_VBL, Instance::descriptor()],
                            compilation_options: PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: OUTLINE_MASK_FORMAT,
                                blend: Some(wgpu::BlendState {
                                    color: max_blend,
                                    alpha: max_blend,
                                }),
                                write_mask: wgpu::ColorWrites::RED,
                            })],
                            compilation_options: PipelineCompilationOptions::default(),
                        }),
                        primitive: MODEL_PRIMITIVE_STATE,
                        depth_stencil: None,
                        multisample: MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    });

                    Ok(pipeline)
                },
            ),
        );

        let edge_pipeline = cache_builder.add_shader(
            EDGE_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(shader_def.name),
                        source: ShaderSource::Wgsl(source.into()),
                    });

                    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Outline edge render pipeline"),
                        layout: Some(&edge_layout),
                        vertex: wgpu::VertexState {
                            module: &shader,
                            entry_point: Some("vs_main"),
                            buffers: &[],
                            compilation_options: PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: surface_format,
                                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            compilation_options: PipelineCompilationOptions::default(),
                        }),
                        primitive: wgpu::PrimitiveState::default(),
                        depth_stencil: None,
                        multisample: MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    });

                    Ok(pipeline)
                },
            ),
        );

        let depth_bind_group =
            create_depth_bind_group(device, &depth_bind_group_layout, scene_depth);
        let edge_bind_group =
            create_edge_bind_group(device, &edge_bind_group_layout, &params_buffer, &mask);

        Self {
            mask_pipeline,
            edge_pipeline,
            mask,
            params_buffer,
            depth_bind_group_layout,
            depth_bind_group,
            edge_bind_group_layout,
            edge_bind_group,
        }
    }

    /// The scene depth view changes on resize too, so the caller hands in the new one.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        scene_depth: &wgpu::TextureView,
    ) {
        self.mask.resize(device, size);
        self.depth_bind_group =
            create_depth_bind_group(device, &self.depth_bind_group_layout, scene_depth);
        self.edge_bind_group = create_edge_bind_group(
            device,
            &self.edge_bind_group_layout,
            &self.params_buffer,
            &self.mask,
        );
    }

    /// Does nothing when no model has selected instances.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        pipeline_cache: &PipelineCache,
        common: &RenderCommon,
        render_models: &Arena<RenderModel>,
    ) {
        let has_selection = render_models
            .iter()
            .any(|(_, render_model)| !render_model.selected_instances.is_empty());

        if !has_selection {
            return;
        }

        let (Some(mask_pipeline), Some(edge_pipeline)) = (
            pipeline_cache.get(self.mask_pipeline),
            pipeline_cache.get(self.edge_pipeline),
        ) else {
            return;
        };

        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Outline mask pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.mask.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(mask_pipeline);
            render_pass.set_bind_group(0, &common.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.depth_bind_group, &[]);

            for (_, render_model) in render_models.iter() {
                render_model.draw_selected(&mut render_pass);
            }
        }

        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Outline edge pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(edge_pipeline);
        render_pass.set_bind_group(0, &self.edge_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

fn create_depth_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    scene_depth: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Outline depth bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(scene_depth),
        }],
    })
}

fn create_edge_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    params_buffer: &wgpu::Buffer,
    mask: &RenderTarget,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Outline edge bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(mask.view()),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_the_uniform_layout() {
        // Two vec4s, two f32s and padding up to the 16 byte struct alignment.
        assert_eq!(size_of::<OutlineParams>(), 48);
    }

    #[test]
    fn params_come_from_config() {
        let config = OutlineConfig::default();
        let params = OutlineParams::from(&config);

        assert_eq!(params.visible_edge_color, config.visible_edge_color);
        assert_eq!(params.hidden_edge_color, config.hidden_edge_color);
        assert_eq!(params.edge_strength, 3.0);
        assert_eq!(params.edge_thickness, 2.0);
    }
}
