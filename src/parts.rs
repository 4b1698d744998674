use thiserror::Error;

use crate::scene_graph::{ObjectId, Scene};

pub const FRONT_WHEEL: &str = "Cylinder001";
pub const BACK_WHEEL: &str = "Cylinder000";
pub const UNDERBODY: &str = "underbody";
pub const ENGINE: &str = "v8_engineglb";
pub const BODY_ROOT: &str = "Root";

/// How many first-child hops separate the engine node from the group holding its parts.
const ENGINE_PARTS_DEPTH: usize = 4;

/// Engine parts that stay out of the initial outline.
pub const OUTLINE_EXCLUDED_PARTS: [&str; 2] = ["qq", "ww"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartLookupError {
    #[error("no object named {0:?} in the loaded model")]
    MissingNode(&'static str),
    #[error("{parent:?} has no first child at depth {depth}")]
    MissingChild { parent: String, depth: usize },
}

/// Handles to the named parts of the car, resolved once after loading.
#[derive(Debug, Clone)]
pub struct PartRefs {
    pub car: ObjectId,
    pub wheel_front: ObjectId,
    pub wheel_back: ObjectId,
    pub underbody: ObjectId,
    pub engine: ObjectId,
    pub body_panels: Vec<ObjectId>,
    pub engine_parts: Vec<ObjectId>,
}

impl PartRefs {
    pub fn resolve(scene: &Scene, car: ObjectId) -> Result<Self, PartLookupError> {
        let find = |name: &'static str| {
            scene
                .find_in_subtree(car, name)
                .ok_or(PartLookupError::MissingNode(name))
        };

        let wheel_front = find(FRONT_WHEEL)?;
        let wheel_back = find(BACK_WHEEL)?;
        let underbody = find(UNDERBODY)?;
        let engine = find(ENGINE)?;
        let body_root = find(BODY_ROOT)?;

        let body_panels = scene
            .children(body_root)
            .iter()
            .copied()
            .filter(|&id| {
                !matches!(
                    scene.name(id),
                    Some(FRONT_WHEEL) | Some(BACK_WHEEL) | Some(UNDERBODY)
                )
            })
            .collect();

        let mut parts_group = engine;
        for depth in 0..ENGINE_PARTS_DEPTH {
            parts_group = scene.children(parts_group).first().copied().ok_or_else(|| {
                PartLookupError::MissingChild {
                    parent: scene.name(parts_group).unwrap_or_default().to_string(),
                    depth,
                }
            })?;
        }

        Ok(Self {
            car,
            wheel_front,
            wheel_back,
            underbody,
            engine,
            body_panels,
            engine_parts: scene.children(parts_group).to_vec(),
        })
    }

    pub fn outlined_engine_parts<'a>(
        &'a self,
        scene: &'a Scene,
    ) -> impl Iterator<Item = ObjectId> + 'a {
        self.engine_parts.iter().copied().filter(|&id| {
            scene
                .name(id)
                .map_or(true, |name| !OUTLINE_EXCLUDED_PARTS.contains(&name))
        })
    }
}
