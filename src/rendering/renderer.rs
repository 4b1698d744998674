use std::sync::Arc;

use anyhow::Context;
use glam::Mat4;
use id_arena::Arena;
use wgpu::{util::DeviceExt, CommandEncoderDescriptor};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::CameraUniform,
    config::ViewerConfig,
    rendering::{
        axes::axis_lines,
        background_sphere::inverted_sphere,
        composer::Composer,
        instance::Instance,
        passes::{
            card_pass::CardPass,
            scene_pass::{SceneDrawList, SceneTextureViews},
        },
        render_common::RenderCommon,
        render_model::{gather_instances, RenderModel},
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
        texture::{RenderTarget, DEPTH_FORMAT},
    },
    scene_graph::Scene,
    viewer::ViewerState,
};

struct AxesMesh {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: RenderTarget,
    camera_uniform: CameraUniform,

    render_models: Arena<RenderModel>,
    background: RenderModel,
    axes: Option<AxesMesh>,

    shader_loader: ShaderLoader,
    composer: Composer,
    card_pass: CardPass,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        state: &ViewerState,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();
        let config = &state.config;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let common = Arc::new(RenderCommon::new(&device, &queue, &adapter, &surface, size));
        let depth_texture = RenderTarget::new(&device, size, DEPTH_FORMAT, "Depth texture");

        let mut cache_builder = PipelineCacheBuilder::new();
        let composer = Composer::create(
            &device,
            &common,
            &mut cache_builder,
            config,
            size,
            depth_texture.view(),
        );

        let shader_loader =
            ShaderLoader::new(&device, cache_builder, &config.assets.shader_directory())?;

        let background = create_background(&device, &queue, &common, config)?;
        let axes = config
            .show_axes
            .then(|| create_axes(&device, config.axes_length));

        let card_pass = CardPass::new(&device, &queue, common.surface_format(), imgui_context);

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            camera_uniform: CameraUniform::default(),
            render_models: Arena::new(),
            background,
            axes,
            shader_loader,
            composer,
            card_pass,
        })
    }

    /// Uploads scene models that don't have GPU buffers yet.
    pub fn sync_models(&mut self, scene: &mut Scene) {
        for (_, scene_model) in scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(
                &self.device,
                &self.queue,
                &self.common,
                &scene_model.model,
            );
            scene_model.render_model = Some(self.render_models.alloc(render_model));

            log::info!(
                "Uploaded model {} with {} primitives",
                scene_model.model.name,
                scene_model.model.primitives.len()
            );
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;

        {
            let mut config = self
                .common
                .output_surface_config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            config.width = new_size.width;
            config.height = new_size.height;
            self.surface.configure(&self.device, &config);
        }

        self.depth_texture.resize(&self.device, new_size);
        self.composer
            .resize(&self.device, new_size, self.depth_texture.view());
    }

    pub fn render(
        &mut self,
        state: &ViewerState,
        imgui_context: &mut imgui::Context,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.camera_uniform.update(&state.camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);

        gather_instances(
            &self.device,
            &self.queue,
            &state.scene,
            &state.selection,
            &mut self.render_models,
        );

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.composer.render(
            &mut encoder,
            &SceneTextureViews {
                color: &view,
                depth: self.depth_texture.view(),
            },
            &self.shader_loader.cache,
            &self.common,
            &SceneDrawList {
                background: Some(&self.background),
                models: &self.render_models,
                axes: self
                    .axes
                    .as_ref()
                    .map(|axes| (&axes.buffer, axes.vertex_count)),
            },
            &self.render_models,
        );

        let draw_data = imgui_context.render();
        if let Err(error) = self
            .card_pass
            .render(&self.device, &self.queue, &mut encoder, &view, draw_data)
        {
            log::error!("{:?}", error);
        }

        self.queue.submit([encoder.finish()]);
        output.present();

        Ok(())
    }
}

/// A missing or broken background image leaves the sphere white instead of failing startup.
fn create_background(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    common: &RenderCommon,
    config: &ViewerConfig,
) -> anyhow::Result<RenderModel> {
    let path = config.assets.background_path();
    let image = match image::open(&path) {
        Ok(image) => Some(Arc::new(image.to_rgba8())),
        Err(error) => {
            log::warn!("Failed to load background {}: {}", path.display(), error);
            None
        }
    };

    let model = inverted_sphere(&config.background, image)?;
    let mut render_model = RenderModel::from_model(device, queue, common, &model);
    render_model.instances.push(Instance {
        model: Mat4::IDENTITY,
    });
    render_model.instances.upload(device, queue);

    Ok(render_model)
}

fn create_axes(device: &wgpu::Device, length: f32) -> AxesMesh {
    let vertices = axis_lines(length);
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Axes vertex buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    AxesMesh {
        buffer,
        vertex_count: vertices.len() as u32,
    }
}
