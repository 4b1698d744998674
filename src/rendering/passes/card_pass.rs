use imgui::DrawData;
use imgui_wgpu::{Renderer, RendererConfig};
use wgpu::{CommandEncoder, RenderPassDescriptor, TextureView};

/// Draws the imgui frame holding the info card over the composited scene.
pub struct CardPass {
    renderer: Renderer,
}

impl CardPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
        imgui_context: &mut imgui::Context,
    ) -> Self {
        let config = RendererConfig {
            texture_format: output_format,
            ..Default::default()
        };

        Self {
            renderer: Renderer::new(imgui_context, device, queue, config),
        }
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut CommandEncoder,
        output: &TextureView,
        draw_data: &DrawData,
    ) -> anyhow::Result<()> {
        // imgui-wgpu can't handle a frame without draw lists
        // https://github.com/imgui-rs/imgui-rs/issues/325
        if draw_data.draw_lists_count() == 0 {
            return Ok(());
        }

        let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Info card pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
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

        self.renderer
            .render(draw_data, queue, device, &mut render_pass)
            .map_err(|error| anyhow::anyhow!("Failed to draw the info card: {:?}", error))
    }
}
