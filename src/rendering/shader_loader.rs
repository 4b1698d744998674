use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Receiver},
        Arc, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use id_arena::{Arena, Id};
use naga::{
    back::wgsl::WriterFlags,
    valid::{Capabilities, ValidationFlags},
};
use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
};
use notify_debouncer_mini::{
    new_debouncer_opt,
    notify::{RecommendedWatcher, RecursiveMode, Watcher},
    DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::PollType;

const SHARED_MODULES_FOLDER: &str = "shared";

pub type PipelineFactory = Box<
    dyn Sync
        + Send
        + Fn(&wgpu::Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
>;

#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    pub name: &'static str,
    pub path: &'static str,
}

struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

pub type PipelineId = Id<PipelineSlot>;

#[derive(Default)]
pub struct PipelineSlot(Option<wgpu::RenderPipeline>);

/// Collects shader/pipeline pairs while passes are being created.
pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineSlot>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    pub fn add_shader(&mut self, def: ShaderDefinition, factory: PipelineFactory) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineSlot::default());
        self.shaders.alloc(ShaderEntry {
            pipeline_id,
            def,
            factory,
        });
        pipeline_id
    }
}

pub struct PipelineCache {
    pipelines: Arena<PipelineSlot>,
}

impl PipelineCache {
    /// `None` only if the initial compilation of that shader was skipped, which
    /// [`ShaderLoader::new`] doesn't allow.
    pub fn get(&self, id: PipelineId) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(id).and_then(|slot| slot.0.as_ref())
    }

    fn set(&mut self, id: PipelineId, pipeline: wgpu::RenderPipeline) {
        if let Some(slot) = self.pipelines.get_mut(id) {
            slot.0 = Some(pipeline);
        }
    }
}

/// Compiles every registered shader up front, then recompiles on file changes from a watcher
/// thread. Rebuilt pipelines are swapped in by [`ShaderLoader::load_pending_shaders`].
pub struct ShaderLoader {
    pub cache: PipelineCache,
    receiver: Receiver<(&'static str, PipelineId, wgpu::RenderPipeline)>,
    _debouncer: Option<Debouncer<RecommendedWatcher>>,
}

impl ShaderLoader {
    pub fn new(
        device: &wgpu::Device,
        builder: PipelineCacheBuilder,
        shader_folder: &Path,
    ) -> anyhow::Result<Self> {
        let shader_folder = shader_folder
            .canonicalize()
            .with_context(|| format!("Shader folder {} not found", shader_folder.display()))?;

        let composer = create_composer(&shader_folder.join(SHARED_MODULES_FOLDER))?;
        let composer = Arc::new(RwLock::new(composer));

        let mut cache = PipelineCache {
            pipelines: builder.pipelines,
        };

        for (_, shader) in builder.shaders.iter() {
            let pipeline = compile_file(device, &shader_folder, shader, &composer)
                .with_context(|| format!("Failed to compile shader: {}", shader.def.name))?;
            cache.set(shader.pipeline_id, pipeline);
        }

        let (sender, receiver) = mpsc::channel();
        let debouncer = watch_shaders(
            device.clone(),
            shader_folder,
            Arc::new(builder.shaders),
            composer,
            sender,
        );

        Ok(Self {
            cache,
            receiver,
            _debouncer: debouncer,
        })
    }

    pub fn load_pending_shaders(&mut self) {
        while let Ok((name, pipeline_id, pipeline)) = self.receiver.try_recv() {
            log::info!("Shader reloaded: {}", name);
            self.cache.set(pipeline_id, pipeline);
        }
    }
}

/// Hot reload is a convenience; if the watcher can't start the viewer still runs.
fn watch_shaders(
    device: wgpu::Device,
    shader_folder: PathBuf,
    shaders: Arc<Arena<ShaderEntry>>,
    composer: Arc<RwLock<Composer>>,
    sender: mpsc::Sender<(&'static str, PipelineId, wgpu::RenderPipeline)>,
) -> Option<Debouncer<RecommendedWatcher>> {
    let watched_folder = shader_folder.clone();

    let debouncer = new_debouncer_opt::<_, RecommendedWatcher>(
        notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
        move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(error) => {
                    log::warn!("Error watching shader folder: {}", error);
                    return;
                }
            };

            for event in events {
                if event.kind != DebouncedEventKind::Any {
                    continue;
                }

                for (_, shader) in shaders
                    .iter()
                    .filter(|(_, shader)| event.path.ends_with(shader.def.path))
                {
                    match compile_file(&device, &shader_folder, shader, &composer) {
                        Ok(pipeline) => {
                            if sender
                                .send((shader.def.name, shader.pipeline_id, pipeline))
                                .is_err()
                            {
                                return;
                            }
                        }
                        Err(error) => log::error!("Failed to reload shader: {:?}", error),
                    }
                }
            }
        },
    );

    let mut debouncer = match debouncer {
        Ok(debouncer) => debouncer,
        Err(error) => {
            log::warn!("Shader hot reload disabled: {}", error);
            return None;
        }
    };

    if let Err(error) = debouncer
        .watcher()
        .watch(&watched_folder, RecursiveMode::Recursive)
    {
        log::warn!("Shader hot reload disabled: {}", error);
        return None;
    }

    Some(debouncer)
}

fn compile_file(
    device: &wgpu::Device,
    shader_folder: &Path,
    shader: &ShaderEntry,
    composer: &RwLock<Composer>,
) -> anyhow::Result<wgpu::RenderPipeline> {
    let path = shader_folder.join(shader.def.path);
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read shader file {}", path.display()))?;
    let file_path = path.to_string_lossy().to_string();

    let module = {
        let mut composer = composer
            .write()
            .map_err(|_| anyhow::anyhow!("Shader composer lock poisoned"))?;

        composer
            .make_naga_module(NagaModuleDescriptor {
                file_path: &file_path,
                source: &source,
                ..Default::default()
            })
            .context("Failed to create Naga module from shader code")?
    };

    // wgpu validates again internally; this pass only produces the info needed for writing.
    let info = naga::valid::Validator::new(ValidationFlags::empty(), Capabilities::all())
        .validate(&module)
        .context("Failed to validate Naga module")?;

    let wgsl = naga::back::wgsl::write_string(&module, &info, WriterFlags::empty())
        .context("Failed to convert Naga module to WGSL string")?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = (shader.factory)(device, &shader.def, &wgsl);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation")?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(anyhow::anyhow!(
            "Shader compilation failed for {}: {}",
            shader.def.name,
            error
        ));
    }

    pipeline
}

fn create_composer(shared_folder: &Path) -> anyhow::Result<Composer> {
    let mut composer = Composer::default();

    let entries = std::fs::read_dir(shared_folder).with_context(|| {
        format!(
            "Failed to read shared shader modules in {}",
            shared_folder.display()
        )
    })?;

    let mut paths = entries
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to list shared shader modules")?;
    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "wgsl"));
    paths.sort();

    for path in paths {
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shared shader module {}", path.display()))?;
        let file_path = path.to_string_lossy().to_string();

        composer
            .add_composable_module(ComposableModuleDescriptor {
                source: &source,
                file_path: &file_path,
                language: ShaderLanguage::Wgsl,
                ..Default::default()
            })
            .with_context(|| format!("Failed to add shared shader module: {}", file_path))?;
    }

    Ok(composer)
}
