use glam::{Mat4, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::model::{Buffers, Images, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    gltf_mesh_to_model: HashMap<usize, Option<SceneModelId>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            gltf_mesh_to_model: HashMap::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent));
        object_id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.objects.get(id).map(|object| object.name.as_str())
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects
            .get(id)
            .map(|object| object.child_ids.as_slice())
            .unwrap_or(&[])
    }

    fn root_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id)
    }

    /// Depth-first search below `root_id`, visiting children in their stored order. Returns the
    /// first exact name match.
    pub fn find_in_subtree(&self, root_id: ObjectId, name: &str) -> Option<ObjectId> {
        let object = self.objects.get(root_id)?;

        if object.name == name {
            return Some(root_id);
        }

        object
            .child_ids
            .iter()
            .find_map(|&child_id| self.find_in_subtree(child_id, name))
    }

    /// The object itself followed by all of its descendants, in depth-first pre-order.
    pub fn subtree(&self, root_id: ObjectId) -> Vec<ObjectId> {
        let mut result = Vec::new();
        let mut stack = vec![root_id];

        while let Some(id) = stack.pop() {
            let Some(object) = self.objects.get(id) else {
                continue;
            };

            result.push(id);
            stack.extend(object.child_ids.iter().rev().copied());
        }

        result
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    pub fn get_model(&self, id: SceneModelId) -> Option<&SceneModel> {
        self.models.get(id)
    }

    /// Moves all objects and models of `other` into this scene and returns the new id of every
    /// moved object. Hierarchy and model links are rewritten to the new ids.
    pub fn merge(&mut self, other: Scene) -> HashMap<ObjectId, ObjectId> {
        let model_ids: HashMap<SceneModelId, SceneModelId> = other
            .models
            .into_iter()
            .map(|(old_id, model)| (old_id, self.add_model(model)))
            .collect();

        let object_ids: HashMap<ObjectId, ObjectId> = other
            .objects
            .into_iter()
            .map(|(old_id, object)| (old_id, self.add_object(object)))
            .collect();

        for &new_id in object_ids.values() {
            let Some(object) = self.objects.get_mut(new_id) else {
                continue;
            };

            object.parent_id = object
                .parent_id
                .and_then(|id| object_ids.get(&id).copied());
            object.child_ids = object
                .child_ids
                .iter()
                .filter_map(|id| object_ids.get(id).copied())
                .collect();
            object.model_id = object.model_id.and_then(|id| model_ids.get(&id).copied());
            object.transform.invalidate_world();
        }

        object_ids
    }

    /// Spawns every root node of a glTF scene under a new group object, which is returned.
    pub fn spawn_gltf_scene(
        &mut self,
        buffers: Buffers,
        images: Images,
        scene: &gltf::Scene,
    ) -> anyhow::Result<ObjectId> {
        let group = Object3D::named(scene.name().unwrap_or("Scene"));
        let group_id = self.add_object(group);

        for node in scene.nodes() {
            self.spawn_gltf_node(buffers, images, &node, group_id)?;
        }

        Ok(group_id)
    }

    fn spawn_gltf_node(
        &mut self,
        buffers: Buffers,
        images: Images,
        node: &gltf::Node,
        parent: ObjectId,
    ) -> anyhow::Result<ObjectId> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let (translation, rotation, scale) = node.transform().decomposed();

        let mut object = Object3D::named(node_name.clone());
        object.transform = Transform::from_parts(
            translation.into(),
            glam::Quat::from_array(rotation),
            Vec3::from(scale),
        );

        if let Some(mesh) = node.mesh() {
            let mesh_index = mesh.index();

            let model_id = match self.gltf_mesh_to_model.get(&mesh_index).copied() {
                Some(model_id) => model_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model_id = Model::from_gltf(mesh_name, mesh, buffers, images)?
                        .map(|model| self.add_model(SceneModel::new(model)));
                    self.gltf_mesh_to_model.insert(mesh_index, model_id);

                    model_id
                }
            };

            object.model_id = model_id;
        }

        let object_id = self.add_child(parent, object);

        for child in node.children() {
            self.spawn_gltf_node(buffers, images, &child, object_id)?;
        }

        Ok(object_id)
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        for root_id in self.root_ids() {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        let local_matrix = *object.transform.get_local_matrix();
        let changed = parent_changed || object.transform.is_world_dirty();

        if changed {
            object
                .transform
                .set_world_matrix(parent_world_matrix * local_matrix);
        }

        let world_matrix = *object.transform.get_world_matrix();
        for &child_id in &object.child_ids {
            self.update_object_transform_recursive(child_id, world_matrix, changed);
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|child| child.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
        }

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    /// Applies `f` to an object's transform and invalidates the subtree below it.
    pub fn modify_transform(&mut self, object_id: ObjectId, f: impl FnOnce(&mut Transform)) {
        if let Some(object) = self.objects.get_mut(object_id) {
            f(&mut object.transform);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    /// World matrix computed from the current local transforms, independent of the per-frame
    /// cache.
    pub fn world_matrix(&self, object_id: ObjectId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.objects.get(object_id);

        while let Some(object) = current {
            matrix = *object.transform.get_local_matrix() * matrix;
            current = object.parent_id.and_then(|id| self.objects.get(id));
        }

        matrix
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::quad_model;

    fn sample_scene() -> (Scene, ObjectId, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::named("root"));
        let left = scene.add_child(root, Object3D::named("left"));
        let right = scene.add_child(root, Object3D::named("right"));
        (scene, root, left, right)
    }

    #[test]
    fn name_lookup_is_depth_first() {
        let (mut scene, root, left, right) = sample_scene();
        let nested = scene.add_child(left, Object3D::named("target"));
        let other = scene.add_child(right, Object3D::named("target"));

        assert_eq!(scene.find_in_subtree(root, "target"), Some(nested));
        assert_eq!(scene.find_in_subtree(right, "target"), Some(other));
        assert_eq!(scene.find_in_subtree(root, "root"), Some(root));
        assert_eq!(scene.find_in_subtree(left, "right"), None);
    }

    #[test]
    fn merge_moves_hierarchy_and_models() {
        let (mut scene, root, _, _) = sample_scene();

        let mut other = Scene::new();
        let group = other.add_object(Object3D::named("group"));
        let mut part = Object3D::named("part");
        part.model_id = Some(other.add_model(SceneModel::new(quad_model("quad", 1.0))));
        let part = other.add_child(group, part);
        other.modify_transform(group, |transform| transform.set_translation(Vec3::X));

        let moved = scene.merge(other);
        let group = moved[&group];
        let part = moved[&part];

        assert_eq!(scene.objects.len(), 5);
        assert_eq!(scene.models.len(), 1);
        assert_eq!(scene.name(group), Some("group"));
        assert_eq!(scene.children(group), &[part]);
        assert_eq!(scene.get_object(part).unwrap().parent_id, Some(group));
        assert_eq!(scene.find_in_subtree(root, "part"), None);

        let model_id = scene.get_object(part).unwrap().model_id.unwrap();
        assert_eq!(scene.get_model(model_id).unwrap().model.name, "quad");

        scene.late_update();
        let world = *scene.get_object_transform(part).unwrap().get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::X);
    }

    #[test]
    fn meshes_without_triangles_spawn_as_empty_nodes() {
        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0, 1] }],
            "nodes": [{ "name": "markers", "mesh": 0 }, { "name": "hood" }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "mode": 0 }] }],
            "buffers": [{
                "byteLength": 36,
                "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
            }],
            "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [0.0, 0.0, 0.0]
            }]
        }"#;
        let (document, buffers, _) = gltf::import_slice(json.as_bytes()).unwrap();
        let gltf_scene = document.default_scene().unwrap();

        let mut scene = Scene::new();
        let group = scene.spawn_gltf_scene(&buffers, &[], &gltf_scene).unwrap();

        let markers = scene.find_in_subtree(group, "markers").unwrap();
        assert_eq!(scene.get_object(markers).unwrap().model_id, None);
        assert!(scene.find_in_subtree(group, "hood").is_some());
        assert_eq!(scene.models.len(), 0);
    }

    #[test]
    fn subtree_is_pre_order() {
        let (mut scene, root, left, right) = sample_scene();
        let nested = scene.add_child(left, Object3D::named("nested"));

        assert_eq!(scene.subtree(root), vec![root, left, nested, right]);
        assert_eq!(scene.subtree(right), vec![right]);
    }

    #[test]
    fn reparenting_moves_child_between_lists() {
        let (mut scene, root, left, right) = sample_scene();
        scene.set_object_parent(right, Some(left));

        assert_eq!(scene.children(root), &[left]);
        assert_eq!(scene.children(left), &[right]);
    }

    #[test]
    fn world_matrices_compose_parent_transforms() {
        let (mut scene, root, left, _) = sample_scene();
        scene.modify_transform(root, |transform| transform.set_translation(Vec3::X));
        scene.modify_transform(left, |transform| transform.set_translation(Vec3::Y));
        scene.late_update();

        let world = *scene
            .get_object_transform(left)
            .unwrap()
            .get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(scene.world_matrix(left), world);
    }

    #[test]
    fn parent_changes_propagate_on_late_update() {
        let (mut scene, root, left, _) = sample_scene();
        scene.late_update();

        scene.modify_transform(root, |transform| transform.set_scale(Vec3::splat(2.0)));
        scene.modify_transform(left, |transform| transform.set_translation(Vec3::X));
        scene.late_update();

        let world = *scene
            .get_object_transform(left)
            .unwrap()
            .get_world_matrix();
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
    }
}
