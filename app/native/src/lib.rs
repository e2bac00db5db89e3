//! Backdrop - a desktop wallpaper engine.
//!
//! The engine shows one of several mutually exclusive wallpaper modes on a
//! host surface: a procedural renderer drawing off the engine thread, a still
//! image, a looping video, a rotating slideshow, or a daily remote image. When
//! a pipeline fails it downgrades to a safer mode instead of surfacing errors.
//!
//! Hosts provide the collaborators in [`platform`] (file store, session store,
//! surface, HTTP client) and mount a [`WallpaperEngine`]. In-memory versions of
//! every collaborator are exported so the engine can run headless.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;
pub mod schema;
pub mod wallpaper;

pub use error::BackdropError;
pub use wallpaper::{EngineDeps, EngineHandle, EngineState, SharedState, WallpaperEngine};
