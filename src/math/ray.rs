use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Transforms the ray by an affine matrix. The direction is left unnormalized so that ray
    /// parameters stay comparable between the two spaces.
    pub fn transform(&self, matrix: &Mat4) -> Ray {
        Ray {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    /// Möller–Trumbore, without backface culling.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
        const EPSILON: f32 = 1e-7;

        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let determinant = edge1.dot(p);

        if determinant.abs() < EPSILON {
            return None;
        }

        let inverse_determinant = 1.0 / determinant;
        let s = self.origin - a;
        let u = s.dot(p) * inverse_determinant;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inverse_determinant;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inverse_determinant;
        (t > EPSILON).then_some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Vec3 = Vec3::new(-1.0, -1.0, 0.0);
    const B: Vec3 = Vec3::new(1.0, -1.0, 0.0);
    const C: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    #[test]
    fn hits_triangle_from_either_side() {
        let front = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let back = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);

        assert!((front.intersect_triangle(A, B, C).unwrap() - 3.0).abs() < 1e-5);
        assert!((back.intersect_triangle(A, B, C).unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn misses_outside_and_parallel() {
        let outside = Ray::new(Vec3::new(2.0, 2.0, 3.0), Vec3::NEG_Z);
        assert!(outside.intersect_triangle(A, B, C).is_none());

        let parallel = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::X);
        assert!(parallel.intersect_triangle(A, B, C).is_none());

        let pointing_away = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Z);
        assert!(pointing_away.intersect_triangle(A, B, C).is_none());
    }

    #[test]
    fn transformed_ray_keeps_parameters() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let to_local = Mat4::from_scale(Vec3::splat(0.5));
        let local = ray.transform(&to_local);

        let t_local = local
            .intersect_triangle(A * 0.5, B * 0.5, C * 0.5)
            .unwrap();
        assert!((ray.at(t_local).z).abs() < 1e-5);
    }
}
