use glam::Vec4;
use id_arena::Arena;
use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    ShaderSource, StencilState,
};

use crate::rendering::{
    axes::AXIS_VBL,
    instance::Instance,
    render_common::RenderCommon,
    render_model::{RenderModel, MODEL_PRIMITIVE_STATE, RENDER_MODEL_VBL},
    shader_loader::{PipelineCache, PipelineCacheBuilder, PipelineId, ShaderDefinition},
    texture::DEPTH_FORMAT,
};

const MODEL_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Model shader",
    path: "model.wgsl",
};

const BACKGROUND_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Background shader",
    path: "background.wgsl",
};

const AXES_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Axes shader",
    path: "axes.wgsl",
};

pub struct SceneTextureViews<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

/// What the scene pass draws this frame.
pub struct SceneDrawList<'a> {
    pub background: Option<&'a RenderModel>,
    pub models: &'a Arena<RenderModel>,
    /// Vertex buffer and vertex count of the axes helper.
    pub axes: Option<(&'a wgpu::Buffer, u32)>,
}

/// Clears the frame, then draws the background sphere, the car and the axes helper.
pub struct ScenePass {
    model_pipeline: PipelineId,
    background_pipeline: PipelineId,
    axes_pipeline: PipelineId,
    clear_color: wgpu::Color,
}

impl ScenePass {
    pub fn create(
        device: &wgpu::Device,
        common: &RenderCommon,
        cache_builder: &mut PipelineCacheBuilder,
        clear_color: Vec4,
    ) -> Self {
        let surface_format = common.surface_format();

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh pipeline layout"),
            bind_group_layouts: &[
                &common.camera_bind_group_layout,
                &common.material_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let axes_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Axes pipeline layout"),
            bind_group_layouts: &[&common.camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let model_layout = mesh_layout.clone();
        let model_pipeline = cache_builder.add_shader(
            MODEL_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    Ok(create_mesh_pipeline(
                        device,
                        shader_def,
                        source,
                        &model_layout,
                        surface_format,
                        true,
                    ))
                },
            ),
        );

        // The sphere sits far behind the car; it only needs to not cover it.
        let background_pipeline = cache_builder.add_shader(
            BACKGROUND_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    Ok(create_mesh_pipeline(
                        device,
                        shader_def,
                        source,
                        &mesh_layout,
                        surface_format,
                        false,
                    ))
                },
            ),
        );

        let axes_pipeline = cache_builder.add_shader(
            AXES_SHADER,
            Box::new(
                move |device: &Device, shader_def: &ShaderDefinition, source: &str| {
                    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(shader_def.name),
                        source: ShaderSource::Wgsl(source.into()),
                    });

                    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Axes render pipeline"),
                        layout: Some(&axes_layout),
                        vertex: wgpu::VertexState {
                            module: &shader,
                            entry_point: Some("vs_main"),
                            buffers: &[AXIS_VBL],
                            compilation_options: PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &shader,
                            entry_point: Some("fs_main"),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: surface_format,
                                blend: Some(wgpu::BlendState::REPLACE),
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                            compilation_options: PipelineCompilationOptions::default(),
                        }),
                        primitive: wgpu::PrimitiveState {
                            topology: wgpu::PrimitiveTopology::LineList,
                            ..Default::default()
                        },
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DEPTH_FORMAT,
                            depth_write_enabled: true,
                            depth_compare: wgpu::CompareFunction::Less,
                            stencil: StencilState::default(),
                            bias: DepthBiasState::default(),
                        }),
                        multisample: MultisampleState::default(),
                        multiview: None,
                        cache: None,
                    });

                    Ok(pipeline)
                },
            ),
        );

        Self {
            model_pipeline,
            background_pipeline,
            axes_pipeline,
            clear_color: wgpu::Color {
                r: clear_color.x as f64,
                g: clear_color.y as f64,
                b: clear_color.z as f64,
                a: clear_color.w as f64,
            },
        }
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        texture_views: &SceneTextureViews,
        pipeline_cache: &PipelineCache,
        common: &RenderCommon,
        draw_list: &SceneDrawList,
    ) {
        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: texture_views.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: texture_views.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, &common.camera_bind_group, &[]);

        if let (Some(background), Some(pipeline)) = (
            draw_list.background,
            pipeline_cache.get(self.background_pipeline),
        ) {
            render_pass.set_pipeline(pipeline);
            background.draw_instances(&mut render_pass, true);
        }

        if let Some(pipeline) = pipeline_cache.get(self.model_pipeline) {
            render_pass.set_pipeline(pipeline);
            for (_, render_model) in draw_list.models.iter() {
                render_model.draw_instances(&mut render_pass, true);
            }
        }

        if let (Some((buffer, vertex_count)), Some(pipeline)) =
            (draw_list.axes, pipeline_cache.get(self.axes_pipeline))
        {
            render_pass.set_pipeline(pipeline);
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }
    }
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    shader_def: &ShaderDefinition,
    source: &str,
    layout: &wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
    depth_write_enabled: bool,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader_def.name),
        source: ShaderSource::Wgsl(source.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(shader_def.name),
        layout: Some(layout),
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
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: MODEL_PRIMITIVE_STATE,
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
