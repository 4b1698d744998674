use glam::Vec3;

use crate::math::ray::Ray;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<AABB> {
        let mut points = points.into_iter();
        let first = points.next()?;

        Some(points.fold(AABB::new(first, first), |aabb, point| AABB {
            min: aabb.min.min(point),
            max: aabb.max.max(point),
        }))
    }

    /// Slab test. Returns the ray parameter of the entry point, or 0 when the origin is inside.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inverse_direction = ray.direction.recip();

        let t1 = (self.min - ray.origin) * inverse_direction;
        let t2 = (self.max - ray.origin) * inverse_direction;

        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();

        if t_far < 0.0 || t_near > t_far {
            return None;
        }

        Some(t_near.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_spans_all_points() {
        let aabb = AABB::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
        ])
        .unwrap();

        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 4.0));
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn ray_hits_box_in_front() {
        let aabb = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        let t = aabb.intersect_ray(&ray).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_box_behind_or_beside() {
        let aabb = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));

        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(aabb.intersect_ray(&behind).is_none());

        let beside = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(aabb.intersect_ray(&beside).is_none());
    }

}
