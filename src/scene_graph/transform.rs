use glam::{EulerRot, Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// Local transform of a scene graph node with cached local and world matrices.
///
/// Rotation is kept as XYZ Euler angles rather than a quaternion so that it can be animated
/// through several full turns, e.g. from `-8π` back to `0`.
#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Vec3,
    scale: Vec3,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn from_parts(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let mut transform = Self::from_translation(translation);
        transform.set_rotation_quat(rotation);
        transform.set_scale(scale);
        transform
    }

    pub fn get_local_matrix(&self) -> Ref<'_, Mat4> {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                self.scale,
                self.rotation_quat(),
                self.translation,
            );

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    pub fn get_world_matrix(&self) -> Ref<'_, Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    /// Euler angles in radians, applied in XYZ order.
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn set_rotation_quat(&mut self, rotation: Quat) {
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        self.set_rotation(Vec3::new(x, y, z));
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate_local();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_matrix_follows_setters() {
        let mut transform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            transform.get_local_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 2.0, 3.0)
        );

        transform.set_scale(Vec3::splat(2.0));
        let point = transform.get_local_matrix().transform_point3(Vec3::X);
        assert!((point - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn full_turns_are_preserved_in_euler_angles() {
        let mut transform = Transform::default();
        transform.set_rotation(Vec3::new(0.0, -std::f32::consts::PI * 8.0, 0.0));

        assert_eq!(transform.rotation().y, -std::f32::consts::PI * 8.0);
        let point = transform.get_local_matrix().transform_point3(Vec3::X);
        assert!((point - Vec3::X).length() < 1e-4);
    }

    #[test]
    fn quaternion_round_trips_through_euler() {
        let rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(0.3);
        let transform = Transform::from_parts(Vec3::ZERO, rotation, Vec3::ONE);

        assert!(transform.rotation_quat().angle_between(rotation) < 1e-4);
    }

    #[test]
    fn setters_mark_world_dirty() {
        let mut transform = Transform::default();
        transform.set_world_matrix(Mat4::IDENTITY);
        assert!(!transform.is_world_dirty());

        transform.set_translation(Vec3::Y);
        assert!(transform.is_world_dirty());
    }
}
