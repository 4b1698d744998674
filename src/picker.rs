use std::collections::HashSet;

use glam::{Mat4, Vec2};
use rayon::prelude::*;

use crate::{
    camera::Camera,
    info_card::InfoCard,
    math::ray::Ray,
    model::Model,
    scene_graph::{ObjectId, Scene},
    selection::SelectionSet,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub object: ObjectId,
    pub distance: f32,
}

/// Window position in physical pixels to normalized device coordinates, +Y up.
pub fn screen_to_ndc(position: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(
        position.x / size.x * 2.0 - 1.0,
        -(position.y / size.y) * 2.0 + 1.0,
    )
}

/// Intersects the ray with every mesh in the subtrees of `roots`.
///
/// Hits are sorted nearest first (ties by object id) so callers can rely on index 0.
pub fn intersect_objects(scene: &Scene, ray: &Ray, roots: &[ObjectId]) -> Vec<Hit> {
    let mut visited = HashSet::new();
    let mut meshes: Vec<(ObjectId, Mat4, &Model)> = Vec::new();
    for &root in roots {
        for id in scene.subtree(root) {
            if !visited.insert(id) {
                continue;
            }

            let Some(model_id) = scene.get_object(id).and_then(|object| object.model_id) else {
                continue;
            };

            if let Some(scene_model) = scene.get_model(model_id) {
                meshes.push((id, scene.world_matrix(id), &scene_model.model));
            }
        }
    }

    let mut hits = meshes
        .par_iter()
        .filter_map(|&(id, world, model)| intersect_model(ray, id, &world, model))
        .collect::<Vec<Hit>>();

    hits.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.object.index().cmp(&b.object.index()))
    });

    hits
}

fn intersect_model(ray: &Ray, id: ObjectId, world: &Mat4, model: &Model) -> Option<Hit> {
    // Collapsed objects (scale zero during the entrance) have no usable inverse.
    let inverse = world.inverse();
    if !inverse.is_finite() {
        return None;
    }

    let local_ray = ray.transform(&inverse);
    model.bounds.intersect_ray(&local_ray)?;

    let t = model
        .primitives
        .iter()
        .flat_map(|primitive| primitive.triangles())
        .filter_map(|[a, b, c]| local_ray.intersect_triangle(a, b, c))
        .min_by(f32::total_cmp)?;

    let point = world.transform_point3(local_ray.at(t));

    Some(Hit {
        object: id,
        distance: point.distance(ray.origin),
    })
}

/// Hover highlighting and click labelling for a set of pickable objects.
#[derive(Debug, Default)]
pub struct Picker {
    /// `None` until the first pointer move.
    last_hits: Option<Vec<Hit>>,
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nearest(&self) -> Option<&Hit> {
        self.last_hits.as_ref().and_then(|hits| hits.first())
    }

    pub fn pointer_move(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        ndc: Vec2,
        candidates: &[ObjectId],
        selection: &mut SelectionSet,
    ) {
        let ray = camera.ray_from_ndc(ndc);
        let hits = intersect_objects(scene, &ray, candidates);

        match hits.first() {
            Some(nearest) => {
                log::debug!(
                    "Hovering {}",
                    scene.name(nearest.object).unwrap_or("<unnamed>")
                );
                selection.set([nearest.object]);
            }
            None => selection.clear(),
        }

        self.last_hits = Some(hits);
    }

    /// Writes the name of the most recently hovered part into the card. Leaves the card alone
    /// when the last move hit nothing or there has been no move yet.
    pub fn click(&self, scene: &Scene, card: &mut InfoCard) -> bool {
        let Some(name) = self.nearest().and_then(|hit| scene.name(hit.object)) else {
            return false;
        };

        card.show_part(name);
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        config::CameraConfig,
        model::tests::quad_model,
        scene_graph::{Object3D, SceneModel},
    };

    struct Fixture {
        scene: Scene,
        camera: Camera,
        group: ObjectId,
        near: ObjectId,
        far: ObjectId,
    }

    /// Two quads facing a camera at z = 5: "far" at z = 0 (large), "near" at z = 1 (small).
    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let group = scene.add_object(Object3D::named("parts"));

        let far_model = scene.add_model(SceneModel::new(quad_model("far_mesh", 2.0)));
        let mut far = Object3D::named("far");
        far.model_id = Some(far_model);
        let far = scene.add_child(group, far);

        let near_model = scene.add_model(SceneModel::new(quad_model("near_mesh", 0.5)));
        let mut near = Object3D::named("near");
        near.model_id = Some(near_model);
        near.transform.set_translation(Vec3::new(0.0, 0.0, 1.0));
        let near = scene.add_child(group, near);

        scene.late_update();

        let config = CameraConfig {
            initial_eye: Vec3::new(0.0, 0.0, 5.0),
            ..Default::default()
        };
        let camera = Camera::from_config(&config, Vec2::new(800.0, 800.0));

        Fixture {
            scene,
            camera,
            group,
            near,
            far,
        }
    }

    #[test]
    fn ndc_maps_corners_and_center() {
        let size = Vec2::new(800.0, 600.0);

        assert_eq!(screen_to_ndc(Vec2::ZERO, size), Vec2::new(-1.0, 1.0));
        assert_eq!(screen_to_ndc(size, size), Vec2::new(1.0, -1.0));
        assert_eq!(screen_to_ndc(size * 0.5, size), Vec2::ZERO);
    }

    #[test]
    fn hits_are_sorted_nearest_first() {
        let f = fixture();
        let ray = f.camera.ray_from_ndc(Vec2::ZERO);
        let hits = intersect_objects(&f.scene, &ray, &[f.group]);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].object, f.near);
        assert_eq!(hits[1].object, f.far);
        assert!((hits[0].distance - 4.0).abs() < 1e-3);
        assert!((hits[1].distance - 5.0).abs() < 1e-3);
    }

    #[test]
    fn move_over_parts_selects_only_the_nearest() {
        let f = fixture();
        let mut picker = Picker::new();
        let mut selection = SelectionSet::new();
        selection.set([f.far]);

        picker.pointer_move(&f.scene, &f.camera, Vec2::ZERO, &[f.group], &mut selection);

        assert_eq!(selection.objects(), &[f.near]);
    }

    #[test]
    fn move_beside_the_small_part_selects_the_large_one() {
        let f = fixture();
        let mut picker = Picker::new();
        let mut selection = SelectionSet::new();

        // Aim at (1, 0, 0): outside the near quad, inside the far one.
        let ndc = f.camera.get_vp_matrix().project_point3(Vec3::X);
        picker.pointer_move(&f.scene, &f.camera, ndc.truncate(), &[f.group], &mut selection);

        assert_eq!(selection.objects(), &[f.far]);
    }

    #[test]
    fn move_into_empty_space_clears_selection() {
        let f = fixture();
        let mut picker = Picker::new();
        let mut selection = SelectionSet::new();
        selection.set([f.near, f.far]);

        picker.pointer_move(
            &f.scene,
            &f.camera,
            Vec2::new(0.95, 0.95),
            &[f.group],
            &mut selection,
        );

        assert!(selection.is_empty());
        assert!(picker.nearest().is_none());
    }

    #[test]
    fn click_before_any_move_keeps_the_card() {
        let f = fixture();
        let picker = Picker::new();
        let mut card = InfoCard::new();
        let before = card.clone();

        assert!(!picker.click(&f.scene, &mut card));
        assert_eq!(card, before);
    }

    #[test]
    fn click_after_a_miss_keeps_the_card() {
        let f = fixture();
        let mut picker = Picker::new();
        let mut selection = SelectionSet::new();
        let mut card = InfoCard::new();

        picker.pointer_move(&f.scene, &f.camera, Vec2::ZERO, &[f.group], &mut selection);
        picker.click(&f.scene, &mut card);
        assert_eq!(card.title, "near");

        picker.pointer_move(
            &f.scene,
            &f.camera,
            Vec2::new(-0.95, 0.95),
            &[f.group],
            &mut selection,
        );
        assert!(!picker.click(&f.scene, &mut card));
        assert_eq!(card.title, "near");
        assert_eq!(card.description, "near");
    }

    #[test]
    fn collapsed_objects_are_not_pickable() {
        let mut f = fixture();
        f.scene
            .modify_transform(f.group, |transform| transform.set_scale(Vec3::ZERO));

        let ray = f.camera.ray_from_ndc(Vec2::ZERO);
        assert!(intersect_objects(&f.scene, &ray, &[f.group]).is_empty());
    }

    #[test]
    fn tiny_nested_scales_stay_pickable() {
        let mut scene = Scene::new();
        let outer = scene.add_object(Object3D::named("outer"));
        scene.modify_transform(outer, |transform| transform.set_scale(Vec3::splat(0.01)));
        let inner = scene.add_child(outer, Object3D::named("inner"));
        scene.modify_transform(inner, |transform| transform.set_scale(Vec3::splat(0.01)));

        // Half size 5000 scaled by 0.0001 leaves a 1x1 quad at the origin.
        let model = scene.add_model(SceneModel::new(quad_model("bolt_mesh", 5000.0)));
        let mut bolt = Object3D::named("bolt");
        bolt.model_id = Some(model);
        let bolt = scene.add_child(inner, bolt);

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hits = intersect_objects(&scene, &ray, &[outer]);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object, bolt);
        assert!((hits[0].distance - 5.0).abs() < 1e-3);
    }

    #[test]
    fn overlapping_roots_report_each_object_once() {
        let f = fixture();
        let ray = f.camera.ray_from_ndc(Vec2::ZERO);
        let hits = intersect_objects(&f.scene, &ray, &[f.group, f.near, f.group]);

        let objects = hits.iter().map(|hit| hit.object).collect::<Vec<_>>();
        assert_eq!(objects, [f.near, f.far]);
    }
}
