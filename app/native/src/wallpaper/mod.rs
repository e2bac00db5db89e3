//! Wallpaper subsystem.
//!
//! A session selector string picks exactly one mode. [`mode`] classifies it,
//! [`engine`] loads and applies it, and the remaining modules implement the
//! individual pipelines:
//!
//! - [`procedural`] - off-thread or same-thread renderers ([`renderers`], [`worker`])
//! - [`slideshow`] - rotating pictures folder
//! - [`remote`] - one remote image per day
//! - [`background`] and [`decode`] - applying files to the host surface

pub mod background;
pub mod decode;
pub mod engine;
pub mod mode;
pub mod procedural;
pub mod remote;
pub mod renderers;
pub mod shared;
pub mod slideshow;
pub mod worker;

pub use engine::{EngineDeps, EngineError, EngineHandle, EngineMessage, EngineState, WallpaperEngine};
pub use mode::{MediaKind, RendererConfig, RendererKind, ResolveContext, WallpaperMode, resolve};
pub use shared::SharedState;
