use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{config::ViewerConfig, engine, rendering::renderer::Renderer, viewer::ViewerState};

/// Pixel deltas from touchpads are converted to wheel notches at this rate.
const PIXELS_PER_SCROLL_STEP: f32 = 100.0;

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    renderer: Option<Renderer>,
    viewer: ViewerState,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn from_viewer(viewer: ViewerState) -> Self {
        Self {
            renderer: None,
            viewer,
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(window: &Window) -> ImguiState {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        ImguiState { context, platform }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes().with_title("carview");
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let mut imgui = Self::setup_imgui(&window);
        let renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &self.viewer,
            &mut imgui.context,
        ))?;

        let size = window.inner_size();
        self.viewer
            .on_resize(Vec2::new(size.width as f32, size.height as f32));

        self.imgui = Some(imgui);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(renderer), Some(imgui)) = (self.renderer.as_mut(), self.imgui.as_mut()) else {
            return;
        };

        let now = Instant::now();
        imgui
            .context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        renderer.window.request_redraw();

        engine::update(&mut self.viewer, now);
        renderer.sync_models(&mut self.viewer.scene);

        if let Err(error) = imgui
            .platform
            .prepare_frame(imgui.context.io_mut(), &renderer.window)
        {
            log::error!("Failed to prepare Imgui frame: {}", error);
            return;
        }

        let ui = imgui.context.new_frame();
        self.viewer.info_card.draw(ui);
        imgui.platform.prepare_render(ui, &renderer.window);

        match renderer.render(&self.viewer, &mut imgui.context) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(renderer.size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }
    }

    fn wants_mouse(&self) -> bool {
        self.imgui
            .as_ref()
            .is_some_and(|imgui| imgui.context.io().want_capture_mouse)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(error) = self.init(event_loop) {
            log::error!("Failed to initialize renderer: {:?}", error);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(*new_size);
                }
                self.viewer
                    .on_resize(Vec2::new(new_size.width as f32, new_size.height as f32));
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.viewer
                    .on_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let pressed = *state == ElementState::Pressed;
                if !self.wants_mouse() {
                    self.viewer.on_primary_button(pressed);
                } else if !pressed {
                    // Clicks on the card don't pick, but a drag released over it still ends.
                    self.viewer.orbit.end_drag();
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !self.wants_mouse() => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => {
                        position.y as f32 / PIXELS_PER_SCROLL_STEP
                    }
                };
                self.viewer.on_scroll(steps);
            }
            _ => (),
        }

        if let (Some(renderer), Some(imgui)) = (self.renderer.as_ref(), self.imgui.as_mut()) {
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                &renderer.window,
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    let mut viewer = ViewerState::new(config, Vec2::new(1.0, 1.0));
    viewer.start_loading();

    let mut app = App::from_viewer(viewer);
    event_loop.run_app(&mut app)?;

    Ok(())
}
