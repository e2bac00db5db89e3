//! Platform collaborators for Backdrop.
//!
//! The wallpaper engine never talks to the host directly. Everything it
//! consumes goes through the contracts in this module:
//!
//! - [`fs`] - file store used for slideshow discovery and File-mode reads
//! - [`session`] - selector and fit storage with change notifications
//! - [`surface`] - the host region, its canvas, video and background
//! - [`display`] - motion preference, frame ancestry and theme colors
//! - [`net`] - HTTP fetches for the daily remote image
//! - [`resources`] - `blob:` handles for decoded buffers
//! - [`time`] - wall clock and the reference time zone
//!
//! Each contract ships with an in-memory implementation so hosts can run the
//! engine headless.

pub mod display;
pub mod fs;
pub mod net;
pub mod path;
pub mod resources;
pub mod session;
pub mod surface;
pub mod thread;
pub mod time;

pub use display::{DisplayEnvironment, FrameAncestry, StaticDisplay, ThemeColors, is_top_level};
pub use fs::{DiskFileStore, FileStat, FileStore, FileStoreError, MemoryFileStore};
pub use net::{HttpClient, HttpError, ReqwestClient, StubHttpClient};
pub use resources::ResourceStore;
pub use session::{MemorySessionStore, SessionSnapshot, SessionStore, WallpaperFit};
pub use surface::{Background, Canvas, HostSurface, MemorySurface, Rect, VideoElement};
pub use thread::spawn_named_thread;
pub use time::{Clock, FixedClock, SystemClock};
