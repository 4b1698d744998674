use glam::{Vec2, Vec3};

use crate::camera::Camera;

/// Rotates the camera around its target on drag and dollies it on scroll.
///
/// Every gesture starts from the camera's current eye, so the controls cooperate with anything
/// else that moves the camera in between (such as the reveal timeline).
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    dragging: bool,
    last_cursor: Option<Vec2>,
}

const POLAR_EPSILON: f32 = 1e-3;

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 0.95,
            min_distance: 0.5,
            max_distance: 400.0,
            dragging: false,
            last_cursor: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self, cursor: Vec2) {
        self.dragging = true;
        self.last_cursor = Some(cursor);
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.last_cursor = None;
    }

    /// One full window height of drag rotates by 2π, matching OrbitControls' default feel.
    pub fn drag(&mut self, camera: &mut Camera, cursor: Vec2, viewport_height: f32) {
        if !self.dragging || viewport_height <= 0.0 {
            return;
        }

        let Some(last) = self.last_cursor.replace(cursor) else {
            return;
        };

        let delta = (cursor - last) * std::f32::consts::TAU * self.rotate_speed / viewport_height;
        self.rotate(camera, -delta.x, -delta.y);
    }

    pub fn rotate(&self, camera: &mut Camera, azimuth_delta: f32, polar_delta: f32) {
        let offset = camera.eye - camera.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let azimuth = offset.x.atan2(offset.z) + azimuth_delta;
        let polar = ((offset.y / radius).clamp(-1.0, 1.0).acos() + polar_delta)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        camera.eye = camera.target + spherical_to_offset(radius, polar, azimuth);
    }

    /// Positive `steps` zoom in.
    pub fn zoom(&self, camera: &mut Camera, steps: f32) {
        let offset = camera.eye - camera.target;
        let distance = (offset.length() * self.zoom_speed.powf(steps))
            .clamp(self.min_distance, self.max_distance);

        if let Some(direction) = offset.try_normalize() {
            camera.eye = camera.target + direction * distance;
        }
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

fn spherical_to_offset(radius: f32, polar: f32, azimuth: f32) -> Vec3 {
    let sin_polar = polar.sin();
    Vec3::new(
        radius * sin_polar * azimuth.sin(),
        radius * polar.cos(),
        radius * sin_polar * azimuth.cos(),
    )
}
