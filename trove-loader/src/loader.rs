use crate::cache::{CachedModel, ModelCache};
use crate::config::ModelLoaderConfiguration;
use crate::error::{LoadError, LoadResult};
use crate::load_queue::LoadQueue;
use crate::parser::ParserRegistry;
use crate::resolver::ModelPathResolver;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use trove_base::{HashSet, Model, ModelName};

/// Called once per model to build engine-side resources (GPU buffers, display lists, ...) from
/// it. Runs on the thread of the first non-preload `load_model` that returns the model, never on
/// the load queue's worker.
///
/// Failures belong to the hook. A panic is caught and logged by the loader, the model stays
/// cached and the hook is not run for it again. The hook must not load the model it was called
/// for: concurrent first loads of a model wait for the hook to return, including a load made
/// from inside the hook, which would never finish.
pub trait PostLoadHook: Send + Sync {
    fn on_model_loaded(
        &self,
        model: &Model,
    );
}

//
// Everything guarded by the shared lock. The cache and the set of names currently being parsed
// live under one mutex so that "is it cached or already being loaded?" and "claim it" happen
// atomically.
//
#[derive(Default)]
pub struct LoadState {
    cache: ModelCache,
    // Names some thread has claimed and is currently resolving/parsing
    in_flight: HashSet<ModelName>,
}

impl LoadState {
    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn is_cached(
        &self,
        name: &str,
    ) -> bool {
        self.cache.contains(&ModelName::normalize(name))
    }

    pub fn is_in_flight(
        &self,
        name: &str,
    ) -> bool {
        self.in_flight.contains(&*ModelName::normalize(name))
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

// State of one init()..kill() session, shared with the load queue's worker thread
pub(crate) struct LoaderShared {
    registry: ParserRegistry,
    resolver: Arc<dyn ModelPathResolver>,
    post_load_hook: Option<Arc<dyn PostLoadHook>>,
    state: Mutex<LoadState>,
    // Signalled whenever a name leaves the in-flight set
    load_finished: Condvar,
}

enum CacheLookup<'a> {
    Cached(Arc<CachedModel>),
    Claimed(InFlightLoad<'a>),
}

// Marks a name as being loaded by the current thread. If it is dropped without finish() being
// called (error or panic), the name is released so a waiting thread can try instead.
struct InFlightLoad<'a> {
    shared: &'a LoaderShared,
    name: ModelName,
    finished: bool,
}

impl InFlightLoad<'_> {
    fn finish(
        mut self,
        state: &mut LoadState,
    ) {
        state.in_flight.remove(&self.name);
        self.finished = true;
        self.shared.load_finished.notify_all();
    }
}

impl Drop for InFlightLoad<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.shared.lock_state();
            state.in_flight.remove(&self.name);
            self.shared.load_finished.notify_all();
        }
    }
}

impl LoaderShared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        // Parsing happens outside the lock, so a panic can't leave the state half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The create-or-fetch routine shared by load_model() and the load queue
    #[profiling::function]
    pub(crate) fn load(
        &self,
        name: &str,
        preload: bool,
    ) -> LoadResult<Arc<Model>> {
        let key = ModelName::normalize(name);
        if key.is_empty() {
            return Err(LoadError::AssetNotFound(ModelName::new("")));
        }

        let cached = match self.find_or_claim(&key) {
            CacheLookup::Cached(cached) => cached,
            CacheLookup::Claimed(claim) => self.create_model(claim, name.trim())?,
        };

        if !preload {
            if let Some(post_load_hook) = &self.post_load_hook {
                cached.run_post_load(|model| {
                    profiling::scope!("PostLoadHook::on_model_loaded");
                    log::debug!("Running post-load hook for {:?}", model.name);
                    // Unwinding out of the Once would poison it for every later load
                    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        post_load_hook.on_model_loaded(model)
                    }));
                    if result.is_err() {
                        log::error!("Post-load hook panicked for {:?}", model.name);
                    }
                });
            }
        }

        Ok(cached.model().clone())
    }

    fn find_or_claim(
        &self,
        key: &str,
    ) -> CacheLookup<'_> {
        let mut state = self.lock_state();
        loop {
            if let Some(cached) = state.cache.find(key) {
                return CacheLookup::Cached(cached.clone());
            }

            if !state.in_flight.contains(key) {
                let name = ModelName::new(key);
                state.in_flight.insert(name.clone());
                return CacheLookup::Claimed(InFlightLoad {
                    shared: self,
                    name,
                    finished: false,
                });
            }

            // Another thread is parsing it, wait for that rather than parsing it twice
            log::trace!("Waiting for in-flight load of {:?}", key);
            state = self
                .load_finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    // requested_name is the caller's spelling of claim.name, it is what gets resolved
    fn create_model(
        &self,
        claim: InFlightLoad<'_>,
        requested_name: &str,
    ) -> LoadResult<Arc<CachedModel>> {
        let name = claim.name.clone();
        log::debug!("Cache miss for {:?}", name);

        let path = self
            .resolver
            .resolve(requested_name, self.registry.extensions())
            .ok_or_else(|| LoadError::AssetNotFound(name.clone()))?;

        // Models are also cached under the path they were loaded from, the file may already be
        // loaded under a different name
        let alias = Some(ModelName::from_path(&path)).filter(|path_name| *path_name != name);
        if let Some(alias) = &alias {
            let mut state = self.lock_state();
            if let Some(cached) = state.cache.find(alias.as_str()).cloned() {
                log::debug!("{:?} resolved to already loaded {:?}", name, alias);
                state.cache.add_alias(name, cached.id());
                claim.finish(&mut state);
                return Ok(cached);
            }
        }

        let extension = path
            .extension()
            .map(|extension| extension.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let (format, parser) =
            self.registry
                .lookup(&extension)
                .ok_or_else(|| LoadError::UnsupportedFormat {
                    name: name.clone(),
                    extension: extension.clone(),
                })?;

        log::debug!("Parsing {:?} from {:?} as {}", name, path, format.name());
        let mut model = {
            profiling::scope!("ModelParser::parse");
            parser
                .parse(&path)
                .map_err(|error| LoadError::ParseFailure {
                    name: name.clone(),
                    path: path.clone(),
                    error,
                })?
        };
        model.path = path;
        model.format = format;

        let mut state = self.lock_state();
        let (cached, _inserted) = state.cache.insert(name, alias, model);
        claim.finish(&mut state);
        Ok(cached)
    }
}

/// Loads models by name, caches them for the rest of the session and preloads them on a
/// background thread.
///
/// One loader is created by the renderer and lives as long as it does. [`ModelLoader::init`]
/// starts a session with a set of parsers, [`ModelLoader::kill`] ends it and frees every model.
/// Loading is done through `&self`, so a loader can be shared between threads by reference
/// (for example with `std::thread::scope`) while the owner keeps control of init/kill.
pub struct ModelLoader {
    resolver: Arc<dyn ModelPathResolver>,
    post_load_hook: Option<Arc<dyn PostLoadHook>>,
    worker_thread_name: String,

    // Both are None outside of an init()..kill() session
    shared: Option<Arc<LoaderShared>>,
    load_queue: Option<LoadQueue>,
}

impl ModelLoader {
    pub fn new(resolver: Arc<dyn ModelPathResolver>) -> Self {
        ModelLoader {
            resolver,
            post_load_hook: None,
            worker_thread_name: crate::config::DEFAULT_WORKER_THREAD_NAME.to_string(),
            shared: None,
            load_queue: None,
        }
    }

    pub fn from_configuration(configuration: &ModelLoaderConfiguration) -> Self {
        let mut loader = Self::new(Arc::new(configuration.path_resolver()));
        loader.worker_thread_name = configuration.worker_thread_name.clone();
        loader
    }

    /// Sets the hook run for newly loaded models. Takes effect at the next `init()`.
    pub fn set_post_load_hook(
        &mut self,
        post_load_hook: Arc<dyn PostLoadHook>,
    ) {
        if self.shared.is_some() {
            log::warn!("Post-load hook set on an initialized ModelLoader, it is used after the next init()");
        }
        self.post_load_hook = Some(post_load_hook);
    }

    /// Starts a session: takes ownership of the parsers, creates an empty cache and starts the
    /// load queue's worker thread. Calling it on an initialized loader kills the previous
    /// session first.
    pub fn init(
        &mut self,
        registry: ParserRegistry,
    ) -> LoadResult<()> {
        if self.shared.is_some() {
            log::warn!("ModelLoader initialized twice, killing the previous session");
            self.kill();
        }

        if registry.is_empty() {
            log::warn!("ModelLoader initialized without any parsers, preloading is disabled");
        }

        log::info!(
            "ModelLoader init with {} parsers for extensions {:?}",
            registry.len(),
            registry.extensions()
        );

        let shared = Arc::new(LoaderShared {
            registry,
            resolver: self.resolver.clone(),
            post_load_hook: self.post_load_hook.clone(),
            state: Mutex::new(LoadState::default()),
            load_finished: Condvar::new(),
        });

        let load_queue = LoadQueue::start(shared.clone(), &self.worker_thread_name)
            .map_err(|error| LoadError::WorkerSpawnFailed(Arc::new(error)))?;

        self.shared = Some(shared);
        self.load_queue = Some(load_queue);
        Ok(())
    }

    /// Ends the session: waits for the load queue to finish everything that was queued, then
    /// frees every cached model and drops the parsers. Does nothing if not initialized.
    ///
    /// Models handed out earlier stay alive only as long as the caller keeps them, they are no
    /// longer reachable through the loader.
    pub fn kill(&mut self) {
        if let Some(mut load_queue) = self.load_queue.take() {
            load_queue.join();
        }

        if let Some(shared) = self.shared.take() {
            let freed = shared.lock_state().cache.clear();
            log::info!("ModelLoader killed, freed {} models", freed);
        }
    }

    /// Finishes everything queued and stops the worker thread without ending the session. Later
    /// preloads are ignored, `load_model` keeps working on the calling thread.
    pub fn stop_preloading(&mut self) {
        if let Some(load_queue) = &mut self.load_queue {
            load_queue.join();
        }
    }

    /// True if initialized with at least one parser
    pub fn is_valid(&self) -> bool {
        self.shared
            .as_ref()
            .map_or(false, |shared| !shared.registry.is_empty())
    }

    /// Returns the model for `name`, parsing it on this thread if it isn't cached yet.
    ///
    /// With `preload` set, the post-load hook is not run. It will run on the first later call
    /// without `preload`.
    pub fn load_model(
        &self,
        name: &str,
        preload: bool,
    ) -> LoadResult<Arc<Model>> {
        self.shared
            .as_ref()
            .ok_or(LoadError::NotInitialized)?
            .load(name, preload)
    }

    /// Queues `name` to be loaded on the worker thread. Failures are logged by the worker, the
    /// model becomes available through a later `load_model` cache hit. Ignored after
    /// `stop_preloading()`.
    ///
    /// Returns `NotInitialized` outside of a session and `NoParsers` if the session was started
    /// with an empty registry.
    pub fn preload_model(
        &self,
        name: &str,
    ) -> LoadResult<()> {
        let load_queue = self
            .load_queue
            .as_ref()
            .ok_or(LoadError::NotInitialized)?;
        if !self.is_valid() {
            log::warn!("Preload of {:?} rejected, the loader has no parsers", name);
            return Err(LoadError::NoParsers);
        }

        load_queue.push(name);
        Ok(())
    }

    /// Resolves `name` to a file without loading it
    pub fn find_model_path(
        &self,
        name: &str,
    ) -> LoadResult<PathBuf> {
        let extensions = self
            .shared
            .as_ref()
            .map(|shared| shared.registry.extensions())
            .unwrap_or(&[]);

        self.resolver
            .resolve(name.trim(), extensions)
            .ok_or_else(|| LoadError::AssetNotFound(ModelName::new(name)))
    }

    /// Returns the model if it is already cached, never loads
    pub fn find_model(
        &self,
        name: &str,
    ) -> Option<Arc<Model>> {
        let state = self.grab_lock()?;
        let cached = state.cache.find(&ModelName::normalize(name))?;
        Some(cached.model().clone())
    }

    /// Number of distinct models cached this session
    pub fn model_count(&self) -> usize {
        self.grab_lock().map_or(0, |state| state.cache.len())
    }

    pub fn models(&self) -> Vec<Arc<Model>> {
        self.grab_lock()
            .map(|state| state.cache.all().cloned().collect())
            .unwrap_or_default()
    }

    /// Names queued for preloading that the worker has not finished yet
    pub fn pending_preloads(&self) -> usize {
        self.load_queue
            .as_ref()
            .map_or(0, |load_queue| load_queue.pending_count())
    }

    pub fn load_queue(&self) -> Option<&LoadQueue> {
        self.load_queue.as_ref()
    }

    /// Takes the lock shared by the cache and the load queue. Loads on every thread block until
    /// the guard is dropped.
    pub fn grab_lock(&self) -> Option<MutexGuard<'_, LoadState>> {
        self.shared.as_ref().map(|shared| shared.lock_state())
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        self.kill();
    }
}
