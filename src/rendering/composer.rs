use id_arena::Arena;
use winit::dpi::PhysicalSize;

use crate::{
    config::ViewerConfig,
    rendering::{
        passes::{
            outline_pass::OutlinePass,
            scene_pass::{SceneDrawList, ScenePass, SceneTextureViews},
        },
        render_common::RenderCommon,
        render_model::RenderModel,
        shader_loader::{PipelineCache, PipelineCacheBuilder},
    },
};

/// Runs the frame's passes in order: the scene itself, then the selection outline on top.
pub struct Composer {
    scene_pass: ScenePass,
    outline_pass: OutlinePass,
}

impl Composer {
    pub fn create(
        device: &wgpu::Device,
        common: &RenderCommon,
        cache_builder: &mut PipelineCacheBuilder,
        config: &ViewerConfig,
        size: PhysicalSize<u32>,
        depth: &wgpu::TextureView,
    ) -> Self {
        let scene_pass =
            ScenePass::create(device, common, cache_builder, config.background.clear_color);
        let outline_pass = OutlinePass::create(
            device,
            common,
            cache_builder,
            &config.outline,
            size,
            depth,
        );

        Self {
            scene_pass,
            outline_pass,
        }
    }

    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        depth: &wgpu::TextureView,
    ) {
        self.outline_pass.resize(device, size, depth);
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        texture_views: &SceneTextureViews,
        pipeline_cache: &PipelineCache,
        common: &RenderCommon,
        draw_list: &SceneDrawList,
        render_models: &Arena<RenderModel>,
    ) {
        self.scene_pass
            .render(encoder, texture_views, pipeline_cache, common, draw_list);
        self.outline_pass.render(
            encoder,
            texture_views.color,
            pipeline_cache,
            common,
            render_models,
        );
    }
}
