use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver, TryRecvError},
        Arc,
    },
    thread,
};

use thiserror::Error;

use crate::{
    model::image_to_rgba,
    parts::{PartLookupError, PartRefs},
    scene_graph::Scene,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to import {}: {source}", .path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("{} doesn't contain any scenes", .0.display())]
    NoScene(PathBuf),
    #[error("failed to build scene from {}: {reason:#}", .path.display())]
    Spawn { path: PathBuf, reason: anyhow::Error },
    #[error(transparent)]
    Parts(#[from] PartLookupError),
    #[error("model loader thread stopped before finishing")]
    WorkerGone,
}

pub struct ImportedGltf {
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
}

pub enum LoadState {
    Unloaded,
    Loading {
        path: PathBuf,
        receiver: Receiver<Result<ImportedGltf, LoadError>>,
    },
    Ready(PartRefs),
    Failed(String),
}

/// What changed during a [`ModelLoader::poll`] call.
#[derive(Debug)]
pub enum LoadEvent {
    Ready(PartRefs),
    Failed(String),
}

/// Imports a glTF file on a worker thread and spawns it into the scene once it arrives.
pub struct ModelLoader {
    state: LoadState,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self {
            state: LoadState::Unloaded,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Starting again while a load is in flight or finished is a no-op.
    pub fn start(&mut self, path: impl AsRef<Path>) {
        if !matches!(self.state, LoadState::Unloaded) {
            return;
        }

        let path = path.as_ref().to_path_buf();
        let (sender, receiver) = mpsc::channel();
        let worker_path = path.clone();

        log::info!("Loading model {}", path.display());

        thread::spawn(move || {
            let result = gltf::import(&worker_path)
                .map(|(document, buffers, images)| ImportedGltf {
                    document,
                    buffers,
                    images,
                })
                .map_err(|source| LoadError::Import {
                    path: worker_path.clone(),
                    source,
                });

            // The viewer may have shut down already.
            let _ = sender.send(result);
        });

        self.state = LoadState::Loading { path, receiver };
    }

    /// Non-blocking. Spawns the model into `scene` when the worker has finished.
    pub fn poll(&mut self, scene: &mut Scene) -> Option<LoadEvent> {
        let LoadState::Loading { path, receiver } = &self.state else {
            return None;
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(LoadError::WorkerGone),
        };

        let path = path.clone();
        match result.and_then(|imported| spawn_into_scene(scene, &path, imported)) {
            Ok(parts) => {
                log::info!(
                    "Model {} ready: {} body panels, {} engine parts",
                    path.display(),
                    parts.body_panels.len(),
                    parts.engine_parts.len()
                );
                self.state = LoadState::Ready(parts.clone());
                Some(LoadEvent::Ready(parts))
            }
            Err(error) => {
                let message = error.to_string();
                log::error!("Failed to load model: {}", message);
                self.state = LoadState::Failed(message.clone());
                Some(LoadEvent::Failed(message))
            }
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_into_scene(
    scene: &mut Scene,
    path: &Path,
    imported: ImportedGltf,
) -> Result<PartRefs, LoadError> {
    let gltf_scene = imported
        .document
        .default_scene()
        .or_else(|| imported.document.scenes().next())
        .ok_or_else(|| LoadError::NoScene(path.to_path_buf()))?;

    let images = imported
        .images
        .iter()
        .map(|image| image_to_rgba(image).map(Arc::new))
        .collect::<Vec<_>>();

    let spawn_error = |reason: anyhow::Error| LoadError::Spawn {
        path: path.to_path_buf(),
        reason,
    };

    // Nothing reaches `scene` unless the whole model spawns and its parts resolve.
    let mut staging = Scene::new();
    let car = staging
        .spawn_gltf_scene(&imported.buffers, &images, &gltf_scene)
        .map_err(spawn_error)?;
    PartRefs::resolve(&staging, car)?;

    let car = scene
        .merge(staging)
        .get(&car)
        .copied()
        .ok_or_else(|| spawn_error(anyhow::anyhow!("model root was lost while merging")))?;

    PartRefs::resolve(scene, car).map_err(LoadError::from)
}
