use std::time::Instant;

use glam::Vec2;

use crate::{
    animation::{
        director::{build_reveal_timeline, prepare_entrance},
        timeline::Timeline,
    },
    camera::Camera,
    config::ViewerConfig,
    info_card::InfoCard,
    loader::{LoadEvent, ModelLoader},
    orbit_controls::OrbitControls,
    parts::PartRefs,
    picker::{screen_to_ndc, Picker},
    scene_graph::Scene,
    selection::SelectionSet,
};

struct Reveal {
    parts: PartRefs,
    origin: Instant,
    timeline: Timeline,
}

/// Everything the viewer knows about the scene, passed explicitly into every event handler.
pub struct ViewerState {
    pub config: ViewerConfig,
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub scene: Scene,
    pub selection: SelectionSet,
    pub info_card: InfoCard,
    loader: ModelLoader,
    picker: Picker,
    reveal: Option<Reveal>,
    viewport: Vec2,
    cursor: Vec2,
}

impl ViewerState {
    pub fn new(config: ViewerConfig, viewport: Vec2) -> Self {
        let camera = Camera::from_config(&config.camera, viewport);

        Self {
            config,
            camera,
            orbit: OrbitControls::new(),
            scene: Scene::new(),
            selection: SelectionSet::new(),
            info_card: InfoCard::new(),
            loader: ModelLoader::new(),
            picker: Picker::new(),
            reveal: None,
            viewport,
            cursor: Vec2::ZERO,
        }
    }

    pub fn start_loading(&mut self) {
        let path = self.config.assets.model_path();
        self.info_card.status = Some(format!("Loading {}…", path.display()));
        self.loader.start(path);
    }

    pub fn update(&mut self, now: Instant) {
        match self.loader.poll(&mut self.scene) {
            Some(LoadEvent::Ready(parts)) => self.on_model_ready(parts, now),
            Some(LoadEvent::Failed(message)) => self.info_card.status = Some(message),
            None => {}
        }

        let running = self
            .reveal
            .as_mut()
            .filter(|reveal| !reveal.timeline.is_finished());

        if let Some(reveal) = running {
            let time = now.saturating_duration_since(reveal.origin).as_secs_f32();
            reveal.timeline.advance(time, &mut self.scene, &mut self.camera);

            if reveal.timeline.is_finished() {
                log::info!("Reveal finished after {:.1} s", time);
            }
        }
    }

    fn on_model_ready(&mut self, parts: PartRefs, now: Instant) {
        prepare_entrance(&mut self.scene, &parts);
        let timeline = build_reveal_timeline(&self.scene, &parts, &self.config.animation);
        log::info!("Starting reveal, {:.1} s long", timeline.duration());

        self.selection.set(parts.outlined_engine_parts(&self.scene));
        self.info_card.status = None;

        self.reveal = Some(Reveal {
            parts,
            origin: now,
            timeline,
        });
    }

    pub fn on_resize(&mut self, size: Vec2) {
        if size.x <= 0.0 || size.y <= 0.0 {
            return;
        }

        self.viewport = size;
        self.camera.set_aspect(size);
    }

    pub fn on_cursor_moved(&mut self, position: Vec2) {
        self.cursor = position;

        if self.orbit.is_dragging() {
            self.orbit.drag(&mut self.camera, position, self.viewport.y);
        }

        let Some(reveal) = &self.reveal else {
            return;
        };

        let ndc = screen_to_ndc(position, self.viewport);
        self.picker.pointer_move(
            &self.scene,
            &self.camera,
            ndc,
            &reveal.parts.engine_parts,
            &mut self.selection,
        );
    }

    pub fn on_primary_button(&mut self, pressed: bool) {
        if pressed {
            self.orbit.begin_drag(self.cursor);
        } else {
            self.orbit.end_drag();
            self.on_click();
        }
    }

    pub fn on_click(&mut self) {
        if self.reveal.is_none() {
            return;
        }

        self.picker.click(&self.scene, &mut self.info_card);
    }

    pub fn on_scroll(&mut self, steps: f32) {
        self.orbit.zoom(&mut self.camera, steps);
    }
}
