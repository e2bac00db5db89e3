//! Wallpaper engine actor.
//!
//! The engine owns every piece of per-mount state: the procedural dispatch,
//! the applied background and video, resource handles and timers. It reacts
//! to session changes, viewport resizes, worker events and handle commands,
//! one at a time, from a single tokio task.
//!
//! # Loads
//!
//! Procedural modes render synchronously. File, slideshow and remote modes run
//! as spawned tasks tagged with a generation number. A result whose generation
//! is no longer current is discarded and any resource handle it created is
//! released.
//!
//! # Panic Recovery
//!
//! Handlers run inside `catch_unwind`. A panicking handler is logged and the
//! engine keeps processing messages.

mod handle;
mod load;
mod messages;

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
pub use handle::{EngineError, EngineHandle};
pub use messages::{EngineMessage, EngineState};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use self::load::{LoadPlan, Loader};
use self::messages::InternalEvent;
use super::background::{build_background, build_video};
use super::decode::{ImageDecoder, PngTranscoder};
use super::mode::{RendererKind, ResolveContext, WallpaperMode, resolve};
use super::procedural::{DispatchOutcome, ProceduralDispatch};
use super::remote::RemoteDailyFetcher;
use super::renderers::panic_message;
use super::shared::SharedState;
use super::slideshow::SlideshowCache;
use super::worker::{ThreadWorkerSpawner, WorkerEvent, WorkerSpawner};
use crate::config::{EngineSettings, api_keys, get_config};
use crate::constants::{APOD_DEMO_KEY, MILLISECONDS_IN_DAY};
use crate::error::BackdropError;
use crate::platform::display::{DisplayEnvironment, StaticDisplay, is_top_level};
use crate::platform::fs::FileStore;
use crate::platform::net::HttpClient;
use crate::platform::resources::{ResourceStore, is_handle};
use crate::platform::session::{SessionSnapshot, SessionStore, WallpaperFit};
use crate::platform::surface::{HostSurface, Rect};
use crate::platform::time::{Clock, SystemClock};

/// Channel buffer size for engine commands.
const CHANNEL_BUFFER_SIZE: usize = 64;

/// Collaborators handed to [`WallpaperEngine::mount`].
pub struct EngineDeps {
    /// Engine settings.
    pub settings: EngineSettings,
    /// Session store holding the selector.
    pub session: Arc<dyn SessionStore>,
    /// Host rendering region.
    pub surface: Arc<dyn HostSurface>,
    /// Platform display flags and theme.
    pub display: Arc<dyn DisplayEnvironment>,
    /// File store for user files and the slideshow manifest.
    pub files: Arc<dyn FileStore>,
    /// HTTP client for the daily remote image.
    pub http: Arc<dyn HttpClient>,
    /// Render worker factory.
    pub workers: Arc<dyn WorkerSpawner>,
    /// Decoder for formats the surface cannot show.
    pub decoder: Arc<dyn ImageDecoder>,
    /// Live resource handles.
    pub resources: ResourceStore,
    /// Time source for the daily refresh.
    pub clock: Arc<dyn Clock>,
    /// Process-lifetime state.
    pub shared: Arc<SharedState>,
    /// Key for the daily remote endpoint.
    pub api_key: String,
}

impl EngineDeps {
    /// Default collaborators around the four a host must provide.
    #[must_use]
    pub fn new(
        session: Arc<dyn SessionStore>,
        surface: Arc<dyn HostSurface>,
        files: Arc<dyn FileStore>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            settings: EngineSettings::default(),
            session,
            surface,
            display: Arc::new(StaticDisplay::default()),
            files,
            http,
            workers: Arc::new(ThreadWorkerSpawner),
            decoder: Arc::new(PngTranscoder),
            resources: ResourceStore::new(),
            clock: Arc::new(SystemClock),
            shared: Arc::new(SharedState::new()),
            api_key: APOD_DEMO_KEY.to_string(),
        }
    }

    /// Uses the global configuration and its API keys.
    #[must_use]
    pub fn with_global_config(mut self) -> Self {
        self.settings = get_config().clone();
        self.api_key = api_keys().nasa_api_key().to_string();
        self
    }

    /// Uses `settings`.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `display`.
    #[must_use]
    pub fn with_display(mut self, display: Arc<dyn DisplayEnvironment>) -> Self {
        self.display = display;
        self
    }

    /// Uses `workers`.
    #[must_use]
    pub fn with_workers(mut self, workers: Arc<dyn WorkerSpawner>) -> Self {
        self.workers = workers;
        self
    }

    /// Uses `decoder`.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Uses `resources`.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceStore) -> Self {
        self.resources = resources;
        self
    }

    /// Uses `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shares `shared` with other engines of this process.
    #[must_use]
    pub fn with_shared(mut self, shared: Arc<SharedState>) -> Self {
        self.shared = shared;
        self
    }

    /// Uses `api_key` for the daily remote endpoint.
    #[must_use]
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }
}

#[derive(Default)]
struct Timers {
    slideshow: Option<JoinHandle<()>>,
    daily: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel_slideshow(&mut self) {
        if let Some(timer) = self.slideshow.take() {
            timer.abort();
        }
    }

    fn cancel_daily(&mut self) {
        if let Some(timer) = self.daily.take() {
            timer.abort();
        }
    }

    fn daily_armed(&self) -> bool { self.daily.as_ref().is_some_and(|timer| !timer.is_finished()) }
}

/// Sends `event` after `delay`.
fn schedule(delay: Duration, sender: mpsc::UnboundedSender<InternalEvent>, event: InternalEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = sender.send(event);
    })
}

/// What woke the engine loop.
enum Wake {
    Command(Option<EngineMessage>),
    Internal(InternalEvent),
    Worker(WorkerEvent),
    Session(bool),
    Resize(Result<Rect, broadcast::error::RecvError>),
}

/// The wallpaper engine actor.
pub struct WallpaperEngine {
    settings: EngineSettings,
    session: Arc<dyn SessionStore>,
    surface: Arc<dyn HostSurface>,
    display: Arc<dyn DisplayEnvironment>,
    resources: ResourceStore,
    loader: Loader,
    dispatch: ProceduralDispatch,

    receiver: mpsc::Receiver<EngineMessage>,
    session_rx: watch::Receiver<SessionSnapshot>,
    resize_rx: broadcast::Receiver<Rect>,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    session_open: bool,
    resize_open: bool,

    generation: u64,
    loading: Option<u64>,
    background_handle: Option<String>,
    video_handle: Option<String>,
    timers: Timers,
    state: EngineState,
    settle_waiters: Vec<oneshot::Sender<EngineState>>,
}

impl WallpaperEngine {
    /// Mounts an engine on the current tokio runtime and returns its handle.
    ///
    /// The session selector is loaded immediately when the session is ready.
    #[must_use]
    pub fn mount(deps: EngineDeps) -> EngineHandle {
        let EngineDeps {
            settings,
            session,
            surface,
            display,
            files,
            http,
            workers,
            decoder,
            resources,
            clock,
            shared,
            api_key,
        } = deps;

        tracing::debug!(folder = %settings.pictures_folder, "mounting wallpaper engine");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let loader = Loader {
            slideshow: Arc::new(SlideshowCache::new(
                Arc::clone(&files),
                Arc::clone(&shared),
                &settings.pictures_folder,
                &settings.slideshow_file,
            )),
            remote: Arc::new(RemoteDailyFetcher::new(
                Arc::clone(&http),
                clock,
                &settings.remote_endpoint,
                &api_key,
                settings.hd_width_threshold,
            )),
            files,
            http,
            decoder,
            resources: resources.clone(),
        };
        let dispatch = ProceduralDispatch::new(
            Arc::clone(&surface),
            workers,
            shared,
            settings.device_pixel_ratio,
        );

        let engine = Self {
            session_rx: session.subscribe(),
            resize_rx: surface.subscribe_resize(),
            settings,
            session,
            surface,
            display,
            resources,
            loader,
            dispatch,
            receiver,
            internal_tx,
            internal_rx,
            session_open: true,
            resize_open: true,
            generation: 0,
            loading: None,
            background_handle: None,
            video_handle: None,
            timers: Timers::default(),
            state: EngineState::Idle,
            settle_waiters: Vec::new(),
        };

        tokio::spawn(engine.run());

        EngineHandle::new(sender)
    }

    async fn run(mut self) {
        tracing::trace!("wallpaper engine loop starting");
        self.guarded("Mount", Self::load);
        self.release_settled();

        loop {
            let wake = tokio::select! {
                biased;
                Some(event) = self.internal_rx.recv() => Wake::Internal(event),
                event = self.dispatch.next_worker_event() => Wake::Worker(event),
                changed = self.session_rx.changed(), if self.session_open => Wake::Session(changed.is_ok()),
                resized = self.resize_rx.recv(), if self.resize_open => Wake::Resize(resized),
                msg = self.receiver.recv() => Wake::Command(msg),
            };

            match wake {
                Wake::Command(None) => {
                    tracing::debug!("engine handles dropped, exiting");
                    break;
                }
                Wake::Command(Some(EngineMessage::Shutdown)) => {
                    tracing::debug!("engine received shutdown message");
                    break;
                }
                Wake::Command(Some(msg)) => {
                    let name = msg.name();
                    self.guarded(name, |engine| engine.handle_message(msg));
                }
                Wake::Internal(event) => self.guarded("Internal", |engine| engine.handle_internal(event)),
                Wake::Worker(event) => self.guarded("Worker", |engine| engine.on_worker_event(&event)),
                Wake::Session(true) => self.guarded("Session", Self::load),
                Wake::Session(false) => {
                    tracing::debug!("session store dropped, ignoring further changes");
                    self.session_open = false;
                }
                Wake::Resize(Ok(bounds)) => {
                    self.dispatch.resize(bounds);
                }
                Wake::Resize(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::trace!(skipped, "resize notifications lagged");
                    self.dispatch.resize(self.surface.bounds());
                }
                Wake::Resize(Err(broadcast::error::RecvError::Closed)) => {
                    self.resize_open = false;
                }
            }

            self.release_settled();
        }

        self.teardown();
    }

    /// Runs `handler` and recovers from a panic inside it.
    fn guarded(&mut self, name: &str, handler: impl FnOnce(&mut Self)) {
        if let Err(panic_info) = catch_unwind(AssertUnwindSafe(|| handler(self))) {
            tracing::error!(
                handler = name,
                panic = %panic_message(panic_info.as_ref()),
                "engine recovered from panic"
            );
        }
    }

    fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Reload => self.load(),
            EngineMessage::RefreshConfig => self.refresh_config(),
            EngineMessage::ViewportResized => {
                self.dispatch.resize(self.surface.bounds());
            }
            EngineMessage::State { respond_to } => {
                let _ = respond_to.send(self.current_state());
            }
            EngineMessage::Settle { respond_to } => self.settle_waiters.push(respond_to),
            // Shutdown handled in run()
            EngineMessage::Shutdown => {}
        }
    }

    fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::Loaded { generation, result } => self.on_loaded(generation, result),
            InternalEvent::SlideshowTick { generation } if generation == self.generation => {
                tracing::debug!("rotating slideshow");
                self.load();
            }
            InternalEvent::SlideshowTick { .. } => {}
            InternalEvent::DailyRefresh => {
                if matches!(self.resolve_current(), WallpaperMode::RemoteDaily { .. }) {
                    tracing::debug!("refreshing daily image");
                    self.load();
                }
            }
        }
    }

    fn current_state(&self) -> EngineState {
        if self.loading.is_some() { EngineState::Resolving } else { self.state }
    }

    fn release_settled(&mut self) {
        if self.settle_waiters.is_empty() || self.loading.is_some() {
            return;
        }
        if self.session_open && self.session_rx.has_changed().unwrap_or(false) {
            return;
        }

        let state = self.current_state();
        for waiter in self.settle_waiters.drain(..) {
            let _ = waiter.send(state);
        }
    }

    fn resolve_context(&self) -> ResolveContext {
        ResolveContext {
            reduced_motion: self.display.prefers_reduced_motion(),
            top_level: is_top_level(self.display.as_ref()),
        }
    }

    fn resolve_current(&self) -> WallpaperMode {
        let selector = self.session_rx.borrow().selector.clone();
        resolve(&selector, self.resolve_context())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    fn load(&mut self) {
        self.timers.cancel_slideshow();
        self.generation += 1;
        self.loading = None;

        let snapshot = self.session_rx.borrow_and_update().clone();
        if !snapshot.loaded {
            tracing::trace!("session not loaded yet");
            return;
        }
        if self.settings.disabled {
            tracing::debug!("wallpaper disabled");
            self.timers.cancel_daily();
            self.clear_surface();
            self.state = EngineState::Idle;
            return;
        }

        let mode = resolve(&snapshot.selector, self.resolve_context());
        tracing::debug!(selector = %snapshot.selector, generation = self.generation, "loading wallpaper");

        if !matches!(mode, WallpaperMode::RemoteDaily { .. }) {
            self.timers.cancel_daily();
        }

        match mode {
            WallpaperMode::Procedural { kind, config } => {
                self.clear_media();
                let outcome = self.dispatch.render(kind, &config, false);
                self.on_dispatch(outcome);
            }
            WallpaperMode::Default => {
                tracing::info!(selector = %snapshot.selector, "unknown wallpaper selector");
                self.fall_back();
            }
            WallpaperMode::File { path, media } => {
                self.spawn_load(move |loader| async move { loader.file(&path, media).await });
            }
            WallpaperMode::Slideshow => {
                let current = self.surface.current_background_url();
                let origin = self.display.origin();
                self.spawn_load(move |loader| async move {
                    loader.slideshow(current.as_deref(), &origin).await
                });
            }
            WallpaperMode::RemoteDaily { .. } => {
                let current = self.surface.current_background_url();
                let view_width = self.display.view_width();
                let selector = snapshot.selector;
                self.spawn_load(move |loader| async move {
                    loader.remote(&selector, view_width, current.as_deref()).await
                });
            }
        }
    }

    /// Re-renders the active procedural mode, keeping its surface.
    fn refresh_config(&mut self) {
        match self.resolve_current() {
            WallpaperMode::Procedural { kind, config } if self.dispatch.active().is_some() => {
                let outcome = self.dispatch.render(kind, &config, true);
                self.on_dispatch(outcome);
            }
            _ => self.load(),
        }
    }

    fn spawn_load<F, Fut>(&mut self, load: F)
    where
        F: FnOnce(Loader) -> Fut,
        Fut: Future<Output = Result<LoadPlan, BackdropError>> + Send + 'static,
    {
        self.dispatch.teardown();
        self.remove_video();
        self.surface.set_preload_hint(None);

        let generation = self.generation;
        let sender = self.internal_tx.clone();
        let task = load(self.loader.clone());
        self.loading = Some(generation);

        tokio::spawn(async move {
            let result = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic_info| {
                    Err(BackdropError::EngineError(panic_message(panic_info.as_ref())))
                });
            let _ = sender.send(InternalEvent::Loaded { generation, result });
        });
    }

    fn on_loaded(&mut self, generation: u64, result: Result<LoadPlan, BackdropError>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "discarding stale load");
            if let Ok(plan) = &result
                && let Some(handle) = plan.handle()
            {
                self.resources.revoke(handle);
            }
            return;
        }

        self.loading = None;
        match result {
            Ok(plan) => self.apply(plan),
            Err(err) => {
                tracing::warn!(error = %err, "wallpaper load failed");
                self.fall_back();
            }
        }
    }

    fn apply(&mut self, plan: LoadPlan) {
        match plan {
            LoadPlan::Image { handle } => {
                let fit = self.session_rx.borrow().fit;
                self.set_background(&handle, fit);
                self.state = EngineState::FileActive { video: false };
            }
            LoadPlan::Video { handle } => {
                self.clear_background();
                self.surface.mount_video(build_video(&handle));
                self.video_handle = Some(handle);
                self.state = EngineState::FileActive { video: true };
            }
            LoadPlan::Slideshow { url, preload } => {
                self.set_background(&url, WallpaperFit::Fill);
                self.surface.set_preload_hint(preload);
                self.arm_slideshow();
                self.state = EngineState::SlideshowActive;
            }
            LoadPlan::Remote { url, selector } => {
                if let Some(selector) = selector {
                    self.session.set_wallpaper(&selector, Some(WallpaperFit::Fit));
                }
                self.set_background(&url, WallpaperFit::Fit);
                self.arm_daily();
                self.state = EngineState::RemoteActive;
            }
            LoadPlan::RemoteUnchanged => {
                if !self.timers.daily_armed() {
                    self.arm_daily();
                }
                self.state = EngineState::RemoteActive;
            }
            LoadPlan::Fallback => self.fall_back(),
        }
    }

    fn on_worker_event(&mut self, event: &WorkerEvent) {
        if let Some(outcome) = self.dispatch.on_worker_event(event) {
            self.on_dispatch(outcome);
        }
    }

    fn on_dispatch(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Degrade(selector) => self.switch_selector(selector),
            DispatchOutcome::Failed => {
                tracing::error!("no renderer could draw the wallpaper");
                self.state = EngineState::Idle;
            }
            DispatchOutcome::Offscreen | DispatchOutcome::SameThread | DispatchOutcome::Builtin => {
                self.state = self
                    .dispatch
                    .active()
                    .map_or(EngineState::Idle, |(kind, offscreen)| EngineState::ProceduralActive {
                        kind,
                        offscreen,
                    });
            }
        }
    }

    fn fall_back(&mut self) { self.switch_selector(RendererKind::PRIMARY.name()); }

    /// Writes `selector` to the session. The resulting change triggers the next load.
    fn switch_selector(&mut self, selector: &str) {
        tracing::info!(selector, "switching wallpaper");
        self.state = EngineState::Idle;
        self.session.set_wallpaper(selector, None);
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn arm_slideshow(&mut self) {
        self.timers.cancel_slideshow();
        let delay = Duration::from_millis(self.settings.slideshow_interval_ms);
        let event = InternalEvent::SlideshowTick {
            generation: self.generation,
        };
        self.timers.slideshow = Some(schedule(delay, self.internal_tx.clone(), event));
    }

    fn arm_daily(&mut self) {
        self.timers.cancel_daily();
        let delay = Duration::from_millis(MILLISECONDS_IN_DAY);
        self.timers.daily = Some(schedule(delay, self.internal_tx.clone(), InternalEvent::DailyRefresh));
    }

    // ========================================================================
    // Surface
    // ========================================================================

    fn set_background(&mut self, url: &str, fit: WallpaperFit) {
        let top_level = is_top_level(self.display.as_ref());
        let background = build_background(url, fit, &self.display.theme(), top_level);
        self.surface.set_background(background);

        let previous = self.background_handle.take();
        if let Some(previous) = previous.filter(|previous| previous != url) {
            self.resources.revoke(&previous);
        }
        self.background_handle = is_handle(url).then(|| url.to_string());
    }

    fn clear_background(&mut self) {
        self.surface.clear_background();
        if let Some(handle) = self.background_handle.take() {
            self.resources.revoke(&handle);
        }
    }

    fn remove_video(&mut self) {
        self.surface.remove_video();
        if let Some(handle) = self.video_handle.take() {
            self.resources.revoke(&handle);
        }
    }

    /// Removes backgrounds, videos and their handles.
    fn clear_media(&mut self) {
        self.clear_background();
        self.remove_video();
        self.surface.set_preload_hint(None);
    }

    /// Removes everything the engine put on the surface.
    fn clear_surface(&mut self) {
        self.dispatch.teardown();
        self.clear_media();
    }

    fn teardown(&mut self) {
        self.timers.cancel_slideshow();
        self.timers.cancel_daily();
        self.generation += 1;
        self.loading = None;
        self.clear_surface();
        self.state = EngineState::Idle;
        tracing::debug!("wallpaper engine stopped");
    }
}
