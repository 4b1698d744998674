use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::{config::CameraConfig, math::ray::Ray};

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, resolution: Vec2) -> Self {
        let mut camera = Self {
            eye: config.initial_eye,
            target: config.target,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            near: config.near,
            far: config.far,
        };
        camera.set_aspect(resolution);
        camera
    }

    /// Ignores degenerate sizes so a minimized window doesn't produce a NaN projection.
    pub fn set_aspect(&mut self, resolution: Vec2) {
        if resolution.x > 0.0 && resolution.y > 0.0 {
            self.aspect = resolution.x / resolution.y;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn get_vp_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Maps a point in normalized device coordinates (with wgpu's 0..1 depth) to world space.
    pub fn unproject(&self, ndc: Vec3) -> Vec3 {
        self.get_vp_matrix().inverse().project_point3(ndc)
    }

    /// Ray starting at the eye and passing through `ndc` on the screen.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let through = self.unproject(ndc.extend(0.5));
        Ray::new(self.eye, through - self.eye)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
    eye: Vec4,
}

impl CameraUniform {
    pub fn update(&mut self, camera: &Camera) {
        self.view_proj = camera.get_vp_matrix();
        self.eye = camera.eye.extend(1.0);
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let config = CameraConfig {
            initial_eye: Vec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        };
        Camera::from_config(&config, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn aspect_follows_resolution() {
        let mut camera = camera();
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);

        camera.set_aspect(Vec2::new(1920.0, 1080.0));
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);

        camera.set_aspect(Vec2::new(0.0, 1080.0));
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn center_ray_points_at_target() {
        let ray = camera().ray_from_ndc(Vec2::ZERO);

        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 5.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn corner_rays_diverge_towards_their_corner() {
        let camera = camera();
        let top_right = camera.ray_from_ndc(Vec2::new(1.0, 1.0));
        let bottom_left = camera.ray_from_ndc(Vec2::new(-1.0, -1.0));

        assert!(top_right.direction.x > 0.0 && top_right.direction.y > 0.0);
        assert!(bottom_left.direction.x < 0.0 && bottom_left.direction.y < 0.0);
    }

    #[test]
    fn unproject_inverts_projection() {
        let camera = camera();
        let world = Vec3::new(0.5, -0.25, 1.0);
        let ndc = camera.get_vp_matrix().project_point3(world);

        assert!((camera.unproject(ndc) - world).length() < 1e-3);
    }
}
