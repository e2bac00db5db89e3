//! Message types for the wallpaper engine.
//!
//! - `EngineMessage` - commands and queries sent through an [`EngineHandle`](super::EngineHandle)
//! - `InternalEvent` - completions and timer ticks the engine sends itself
//! - `EngineState` - what a state query reports

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::BackdropError;
use crate::wallpaper::mode::RendererKind;

use super::load::LoadPlan;

// ============================================================================
// Engine Messages
// ============================================================================

/// Messages sent to the engine.
#[derive(Debug)]
pub enum EngineMessage {
    /// Re-resolve the session selector and load it.
    Reload,

    /// Re-render the active procedural mode in place.
    RefreshConfig,

    /// The host viewport changed size.
    ViewportResized,

    /// Report the current state.
    State { respond_to: oneshot::Sender<EngineState> },

    /// Report the state once no load is pending and the session is quiet.
    Settle { respond_to: oneshot::Sender<EngineState> },

    /// Tear everything down and stop.
    Shutdown,
}

impl EngineMessage {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reload => "Reload",
            Self::RefreshConfig => "RefreshConfig",
            Self::ViewportResized => "ViewportResized",
            Self::State { .. } => "State",
            Self::Settle { .. } => "Settle",
            Self::Shutdown => "Shutdown",
        }
    }
}

// ============================================================================
// Internal Events
// ============================================================================

/// Events produced by tasks the engine spawned.
#[derive(Debug)]
pub(crate) enum InternalEvent {
    /// An asynchronous load finished.
    Loaded {
        generation: u64,
        result: Result<LoadPlan, BackdropError>,
    },

    /// The slideshow interval elapsed.
    SlideshowTick { generation: u64 },

    /// A day passed since the last remote fetch.
    DailyRefresh,
}

// ============================================================================
// Engine State
// ============================================================================

/// What the engine is currently showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EngineState {
    /// Nothing is shown, or the session is not ready.
    #[default]
    Idle,

    /// A load is in flight.
    Resolving,

    /// A procedural renderer is drawing.
    ProceduralActive {
        /// Renderer.
        kind: RendererKind,
        /// Whether it draws on a worker.
        offscreen: bool,
    },

    /// A user file is shown.
    FileActive {
        /// Whether the file is a video.
        video: bool,
    },

    /// The slideshow is rotating.
    SlideshowActive,

    /// The daily remote image is shown.
    RemoteActive,
}

impl EngineState {
    /// Whether anything is shown.
    #[must_use]
    pub const fn is_active(self) -> bool { !matches!(self, Self::Idle | Self::Resolving) }
}
