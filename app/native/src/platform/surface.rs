//! Host rendering surface contract.
//!
//! The surface is the mountable region behind the desktop. It can hold one
//! drawable [`Canvas`], one looping [`VideoElement`], and a CSS-like
//! [`Background`]. Resize notifications are delivered over a broadcast
//! subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Buffered resize notifications per subscriber.
const RESIZE_CHANNEL_CAPACITY: usize = 16;

/// Bounding box of the host region, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rect anchored at the origin.
    #[must_use]
    pub const fn sized(width: f64, height: f64) -> Self {
        Self { x: 0.0, y: 0.0, width, height }
    }

    /// Whole-pixel dimensions, clamped at zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.max(0.0).round() as u32, self.height.max(0.0).round() as u32)
    }
}

/// A drawing context could not be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to execute 'getContext': canvas {width}x{height} has no drawable area")]
pub struct ContextError {
    /// Canvas width at the time of the call.
    pub width: u32,
    /// Canvas height at the time of the call.
    pub height: u32,
}

/// Pixel storage behind a canvas, packed as `0x00RRGGBB`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pixels {
    width: u32,
    height: u32,
    data: Vec<u32>,
    caption: Option<String>,
}

impl Pixels {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
            caption: None,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 { self.width }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 { self.height }

    /// Reallocates the buffer, clearing its contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self {
            caption: self.caption.take(),
            ..Self::new(width, height)
        };
    }

    /// Fills the whole buffer with `color`.
    pub fn fill(&mut self, color: u32) { self.data.fill(color); }

    /// Writes one pixel. Out-of-range coordinates are ignored.
    pub fn put(&mut self, x: u32, y: u32, color: u32) {
        if x < self.width && y < self.height {
            self.data[y as usize * self.width as usize + x as usize] = color;
        }
    }

    /// Reads one pixel.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        (x < self.width && y < self.height)
            .then(|| self.data[y as usize * self.width as usize + x as usize])
    }

    /// Text drawn over the pixels, if any.
    #[must_use]
    pub fn caption(&self) -> Option<&str> { self.caption.as_deref() }

    /// Sets the overlay text.
    pub fn set_caption(&mut self, caption: impl Into<String>) { self.caption = Some(caption.into()); }
}

static NEXT_CANVAS_ID: AtomicU64 = AtomicU64::new(1);

/// Drawable surface mounted inside the host region.
///
/// Cloning shares the same pixels, so a canvas can be handed to a render
/// worker while the host keeps presenting it.
#[derive(Debug, Clone)]
pub struct Canvas {
    id: u64,
    pixels: Arc<Mutex<Pixels>>,
}

impl Canvas {
    /// Creates a canvas with the given pixel resolution.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: NEXT_CANVAS_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Arc::new(Mutex::new(Pixels::new(width, height))),
        }
    }

    /// Process-unique identifier.
    #[must_use]
    pub const fn id(&self) -> u64 { self.id }

    /// Current pixel resolution.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        let pixels = self.pixels.lock();
        (pixels.width, pixels.height)
    }

    /// Locks the pixels for drawing.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] when the canvas has zero area.
    pub fn context(&self) -> Result<MutexGuard<'_, Pixels>, ContextError> {
        let pixels = self.pixels.lock();

        if pixels.width == 0 || pixels.height == 0 {
            return Err(ContextError {
                width: pixels.width,
                height: pixels.height,
            });
        }

        Ok(pixels)
    }

    /// Copy of the current pixels.
    #[must_use]
    pub fn pixels(&self) -> Pixels { self.pixels.lock().clone() }
}

impl PartialEq for Canvas {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

/// Looping video mounted behind the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoElement {
    /// Video source URL or resource handle.
    pub src: String,
    /// Starts playing without interaction.
    pub autoplay: bool,
    /// Shows playback controls.
    pub controls: bool,
    /// Disables picture-in-picture.
    pub disable_picture_in_picture: bool,
    /// Disables casting to remote devices.
    pub disable_remote_playback: bool,
    /// Restarts when playback ends.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Plays without sound.
    pub muted: bool,
    /// Plays inside the page rather than fullscreen.
    pub plays_inline: bool,
    /// Inline style declarations.
    pub style: Vec<(String, String)>,
}

/// CSS-like background applied to the host region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    /// Image URL or resource handle.
    pub url: String,
    /// Position, optionally followed by `/ size`.
    pub position_size: String,
    /// `repeat` or `no-repeat`.
    pub repeat: String,
    /// Always `fixed`.
    pub attachment: String,
    /// Background origin box.
    pub origin: String,
    /// Background clip box.
    pub clip: String,
    /// Backdrop color painted under the image.
    pub color: String,
    /// Blend mode, only set when embedded.
    pub blend_mode: Option<String>,
}

impl Background {
    /// Shorthand `background` value.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!(
            "url(\"{}\") {} {} {} {} {} {}",
            self.url.replace('"', "\\\""),
            self.position_size,
            self.repeat,
            self.attachment,
            self.origin,
            self.clip,
            self.color
        )
    }
}

/// Host region that wallpapers render into.
pub trait HostSurface: Send + Sync {
    /// Current bounding box.
    fn bounds(&self) -> Rect;

    /// Creates and mounts a canvas sized to the region, replacing any other.
    fn create_canvas(&self) -> Canvas;

    /// Removes the mounted canvas. Returns whether one was mounted.
    fn remove_canvas(&self) -> bool;

    /// Sets the displayed size of the canvas without touching its pixels.
    fn resize_canvas_presentation(&self, width: f64, height: f64);

    /// Mounts a video behind foreground content, replacing any other.
    fn mount_video(&self, video: VideoElement);

    /// Removes the mounted video. Returns whether one was mounted.
    fn remove_video(&self) -> bool;

    /// Applies a background.
    fn set_background(&self, background: Background);

    /// Clears the background image, keeping nothing.
    fn clear_background(&self);

    /// URL of the applied background image, if any.
    fn current_background_url(&self) -> Option<String>;

    /// Replaces the preload hint. `None` removes it.
    fn set_preload_hint(&self, url: Option<String>);

    /// Subscribes to resize notifications.
    fn subscribe_resize(&self) -> broadcast::Receiver<Rect>;
}

/// Observable state of a [`MemorySurface`].
#[derive(Debug, Clone, Default)]
pub struct SurfaceSnapshot {
    /// Bounding box.
    pub bounds: Rect,
    /// Mounted canvas.
    pub canvas: Option<Canvas>,
    /// Displayed canvas size.
    pub canvas_presentation: Option<(f64, f64)>,
    /// Canvases created so far.
    pub canvases_created: usize,
    /// Mounted video.
    pub video: Option<VideoElement>,
    /// Applied background.
    pub background: Option<Background>,
    /// Backgrounds applied so far.
    pub backgrounds_applied: usize,
    /// Outstanding preload hint.
    pub preload_hint: Option<String>,
}

/// Surface kept in memory, for headless hosts and tests.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceSnapshot>>,
    resize: broadcast::Sender<Rect>,
}

impl MemorySurface {
    /// Creates a surface of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        let (resize, _) = broadcast::channel(RESIZE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SurfaceSnapshot {
                bounds: Rect::sized(width, height),
                ..SurfaceSnapshot::default()
            })),
            resize,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SurfaceSnapshot { self.state.lock().clone() }

    /// Changes the bounds and notifies subscribers.
    pub fn resize(&self, bounds: Rect) {
        self.state.lock().bounds = bounds;
        // No subscribers is fine.
        let _ = self.resize.send(bounds);
    }
}

impl HostSurface for MemorySurface {
    fn bounds(&self) -> Rect { self.state.lock().bounds }

    fn create_canvas(&self) -> Canvas {
        let mut state = self.state.lock();
        let (width, height) = state.bounds.pixel_size();
        let canvas = Canvas::new(width, height);

        state.canvas = Some(canvas.clone());
        state.canvas_presentation = Some((state.bounds.width, state.bounds.height));
        state.canvases_created += 1;
        canvas
    }

    fn remove_canvas(&self) -> bool {
        let mut state = self.state.lock();
        state.canvas_presentation = None;
        state.canvas.take().is_some()
    }

    fn resize_canvas_presentation(&self, width: f64, height: f64) {
        let mut state = self.state.lock();
        if state.canvas.is_some() {
            state.canvas_presentation = Some((width, height));
        }
    }

    fn mount_video(&self, video: VideoElement) { self.state.lock().video = Some(video); }

    fn remove_video(&self) -> bool { self.state.lock().video.take().is_some() }

    fn set_background(&self, background: Background) {
        let mut state = self.state.lock();
        state.background = Some(background);
        state.backgrounds_applied += 1;
    }

    fn clear_background(&self) { self.state.lock().background = None; }

    fn current_background_url(&self) -> Option<String> {
        self.state.lock().background.as_ref().map(|background| background.url.clone())
    }

    fn set_preload_hint(&self, url: Option<String>) { self.state.lock().preload_hint = url; }

    fn subscribe_resize(&self) -> broadcast::Receiver<Rect> { self.resize.subscribe() }
}
