//! Shared harness for engine integration tests.
//!
//! Mounts a [`WallpaperEngine`] over in-memory collaborators and keeps clones
//! of each so tests can drive the session and inspect the surface.

#![allow(dead_code)]

use std::sync::Arc;

use backdrop::config::EngineSettings;
use backdrop::platform::display::StaticDisplay;
use backdrop::platform::fs::MemoryFileStore;
use backdrop::platform::net::StubHttpClient;
use backdrop::platform::resources::ResourceStore;
use backdrop::platform::session::MemorySessionStore;
use backdrop::platform::surface::MemorySurface;
use backdrop::platform::time::{Clock, FixedClock};
use backdrop::wallpaper::worker::ScriptedWorkers;
use backdrop::{EngineDeps, EngineHandle, SharedState, WallpaperEngine};
use chrono::{TimeZone, Utc};

pub const ENDPOINT: &str = "https://api.nasa.gov/planetary/apod";

/// Collaborators of one mounted engine.
pub struct Harness {
    pub session: MemorySessionStore,
    pub surface: MemorySurface,
    pub files: MemoryFileStore,
    pub http: StubHttpClient,
    pub workers: ScriptedWorkers,
    pub resources: ResourceStore,
    pub shared: Arc<SharedState>,
    pub clock: Arc<FixedClock>,
    pub handle: EngineHandle,
}

/// Builder for [`Harness`].
pub struct Setup {
    selector: String,
    files: MemoryFileStore,
    http: StubHttpClient,
    offscreen: bool,
    display: StaticDisplay,
    settings: EngineSettings,
    shared: Arc<SharedState>,
}

impl Setup {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            files: MemoryFileStore::new(),
            http: StubHttpClient::new(),
            offscreen: true,
            display: StaticDisplay::default(),
            settings: EngineSettings::default(),
            shared: Arc::new(SharedState::new()),
        }
    }

    pub fn files(mut self, files: MemoryFileStore) -> Self {
        self.files = files;
        self
    }

    pub fn http(mut self, http: StubHttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn offscreen(mut self, offscreen: bool) -> Self {
        self.offscreen = offscreen;
        self
    }

    pub fn display(mut self, display: StaticDisplay) -> Self {
        self.display = display;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn shared(mut self, shared: Arc<SharedState>) -> Self {
        self.shared = shared;
        self
    }

    pub fn mount(self) -> Harness {
        let session = MemorySessionStore::loaded(&self.selector);
        let surface = MemorySurface::new(1280.0, 720.0);
        let workers = ScriptedWorkers::new(self.offscreen);
        let resources = ResourceStore::new();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 9, 15, 0, 0).unwrap()));

        let deps = EngineDeps::new(
            Arc::new(session.clone()),
            Arc::new(surface.clone()),
            Arc::new(self.files.clone()),
            Arc::new(self.http.clone()),
        )
        .with_settings(self.settings)
        .with_display(Arc::new(self.display))
        .with_workers(Arc::new(workers.clone()))
        .with_resources(resources.clone())
        .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .with_shared(Arc::clone(&self.shared));

        Harness {
            handle: WallpaperEngine::mount(deps),
            session,
            surface,
            files: self.files,
            http: self.http,
            workers,
            resources,
            shared: self.shared,
            clock,
        }
    }
}

/// Pictures folder with `names` as images.
pub fn pictures(names: &[&str]) -> MemoryFileStore {
    let files = MemoryFileStore::new();
    files.add_dir("/Users/Public/Pictures");
    for name in names {
        files.add_file(&format!("/Users/Public/Pictures/{name}"), name.as_bytes().to_vec());
    }
    files
}
