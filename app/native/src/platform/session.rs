//! Session state contract.
//!
//! The session owns the wallpaper selector string and its fit policy. The
//! engine reads snapshots, watches for changes, and writes back through
//! [`SessionStore::set_wallpaper`] when it downgrades to a safer mode.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// How a still image is laid out on the host surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperFit {
    /// Scale to cover the whole region, cropping overflow.
    #[default]
    Fill,
    /// Scale to fit entirely inside the region.
    Fit,
    /// Stretch to the region on both axes.
    Stretch,
    /// Natural size, centered.
    Center,
    /// Natural size, repeated.
    Tile,
}

impl WallpaperFit {
    /// Lowercase name, as stored by the session.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Fit => "fit",
            Self::Stretch => "stretch",
            Self::Center => "center",
            Self::Tile => "tile",
        }
    }
}

impl fmt::Display for WallpaperFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for WallpaperFit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fill" => Ok(Self::Fill),
            "fit" => Ok(Self::Fit),
            "stretch" => Ok(Self::Stretch),
            "center" => Ok(Self::Center),
            "tile" => Ok(Self::Tile),
            other => Err(format!("unknown wallpaper fit: {other}")),
        }
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Whether the session has finished loading.
    pub loaded: bool,
    /// Wallpaper selector string.
    pub selector: String,
    /// Fit policy for still images.
    pub fit: WallpaperFit,
}

/// Host session store.
pub trait SessionStore: Send + Sync {
    /// Current session values.
    fn snapshot(&self) -> SessionSnapshot;

    /// Subscribes to session changes.
    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;

    /// Replaces the selector, and the fit when one is given.
    fn set_wallpaper(&self, selector: &str, fit: Option<WallpaperFit>);
}

/// Session store kept in memory.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sender: Arc<watch::Sender<SessionSnapshot>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self { Self::new(SessionSnapshot::default()) }
}

impl MemorySessionStore {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: SessionSnapshot) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a loaded session with `selector` and the default fit.
    #[must_use]
    pub fn loaded(selector: &str) -> Self {
        Self::new(SessionSnapshot {
            loaded: true,
            selector: selector.to_string(),
            fit: WallpaperFit::default(),
        })
    }

    /// Flips the readiness flag.
    pub fn set_loaded(&self, loaded: bool) {
        self.sender.send_if_modified(|snapshot| {
            let changed = snapshot.loaded != loaded;
            snapshot.loaded = loaded;
            changed
        });
    }

    /// Every selector written through `set_wallpaper`, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> { self.history.lock().clone() }
}

impl SessionStore for MemorySessionStore {
    fn snapshot(&self) -> SessionSnapshot { self.sender.borrow().clone() }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> { self.sender.subscribe() }

    fn set_wallpaper(&self, selector: &str, fit: Option<WallpaperFit>) {
        self.history.lock().push(selector.to_string());
        self.sender.send_if_modified(|snapshot| {
            let fit = fit.unwrap_or(snapshot.fit);
            let changed = snapshot.selector != selector || snapshot.fit != fit;
            snapshot.selector = selector.to_string();
            snapshot.fit = fit;
            changed
        });
    }
}
