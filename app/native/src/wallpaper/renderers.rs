//! Built-in procedural renderers and their static registry.
//!
//! Renderers are opaque: the engine only knows their [`RendererKind`] and the
//! [`RendererConfig`] it built. Each built-in paints straight into a canvas
//! pixel buffer.

use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;

use super::mode::{GlyphConfig, RendererConfig, RendererKind, WavesConfig};
use crate::platform::surface::{Canvas, ContextError, Pixels};

/// Text shown by the literal-text builtin.
pub const BUILTIN_TEXT: &str = "L33T";

/// Errors raised while rendering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The drawing context could not be obtained.
    #[error("{0}")]
    Context(String),
    /// The renderer panicked while drawing.
    #[error("Renderer failed: {0}")]
    Failed(String),
}

impl From<ContextError> for RenderError {
    fn from(err: ContextError) -> Self { Self::Context(err.to_string()) }
}

/// A procedural renderer bound to one canvas at a time.
pub trait Renderer: Send {
    /// Renderer identity.
    fn kind(&self) -> RendererKind;

    /// Draws `config` onto `canvas`, replacing any previous config.
    ///
    /// # Errors
    ///
    /// Returns an error when the canvas cannot be drawn on.
    fn render(&mut self, canvas: &Canvas, config: &RendererConfig) -> Result<(), RenderError>;

    /// Changes the canvas resolution and redraws.
    ///
    /// # Errors
    ///
    /// Returns an error when the canvas cannot be drawn on.
    fn resize(&mut self, canvas: &Canvas, width: u32, height: u32) -> Result<(), RenderError>;

    /// Teardown hook, run before the renderer is dropped.
    fn destroy(&mut self) {}
}

/// Runs one renderer call, turning a panic into [`RenderError::Failed`].
///
/// # Errors
///
/// Returns the call's own error, or `Failed` if it panicked.
pub fn guarded(call: impl FnOnce() -> Result<(), RenderError>) -> Result<(), RenderError> {
    catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|panic_info| Err(RenderError::Failed(panic_message(panic_info.as_ref()))))
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    panic_info
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_info.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Constructor stored in the registry.
pub type RendererFactory = fn() -> Box<dyn Renderer>;

type Paint = fn(&mut Pixels, &RendererConfig);

/// Renderer that repaints its whole canvas from a paint function.
struct PixelRenderer {
    kind: RendererKind,
    paint: Paint,
    config: RendererConfig,
}

impl PixelRenderer {
    fn boxed(kind: RendererKind, paint: Paint) -> Box<dyn Renderer> {
        Box::new(Self {
            kind,
            paint,
            config: RendererConfig::None,
        })
    }
}

impl Renderer for PixelRenderer {
    fn kind(&self) -> RendererKind { self.kind }

    fn render(&mut self, canvas: &Canvas, config: &RendererConfig) -> Result<(), RenderError> {
        let mut pixels = canvas.context()?;
        self.config = config.clone();
        (self.paint)(&mut pixels, &self.config);
        Ok(())
    }

    fn resize(&mut self, canvas: &Canvas, width: u32, height: u32) -> Result<(), RenderError> {
        let mut pixels = canvas.context()?;
        if (pixels.width(), pixels.height()) != (width, height) {
            pixels.resize(width, height);
            (self.paint)(&mut pixels, &self.config);
        }
        Ok(())
    }

    fn destroy(&mut self) { tracing::trace!(renderer = %self.kind, "renderer destroyed"); }
}

/// Literal-text banner for renderers without a module.
struct TextBanner {
    text: String,
}

impl Renderer for TextBanner {
    fn kind(&self) -> RendererKind { RendererKind::L33t }

    fn render(&mut self, canvas: &Canvas, _config: &RendererConfig) -> Result<(), RenderError> {
        let mut pixels = canvas.context()?;
        pixels.fill(0x00_0000);
        pixels.set_caption(self.text.clone());
        Ok(())
    }

    fn resize(&mut self, canvas: &Canvas, width: u32, height: u32) -> Result<(), RenderError> {
        canvas.context()?.resize(width, height);
        self.render(canvas, &RendererConfig::None)
    }
}

fn waves_module() -> Box<dyn Renderer> { PixelRenderer::boxed(RendererKind::Vanta, paint_waves) }

fn glyphs_module() -> Box<dyn Renderer> { PixelRenderer::boxed(RendererKind::Matrix, paint_glyphs) }

fn hexells_module() -> Box<dyn Renderer> { PixelRenderer::boxed(RendererKind::Hexells, paint_hexells) }

fn landscape_module() -> Box<dyn Renderer> {
    PixelRenderer::boxed(RendererKind::CoastalLandscape, paint_landscape)
}

/// Same-thread module for `kind`, if one exists.
#[must_use]
pub fn same_thread_module(kind: RendererKind) -> Option<RendererFactory> {
    match kind {
        RendererKind::Vanta => Some(waves_module),
        RendererKind::Matrix => Some(glyphs_module),
        RendererKind::Hexells => Some(hexells_module),
        RendererKind::CoastalLandscape => Some(landscape_module),
        RendererKind::L33t => None,
    }
}

/// Worker module for `kind`, if the renderer can run off the engine thread.
#[must_use]
pub fn worker_module(kind: RendererKind) -> Option<RendererFactory> {
    if kind.is_worker_capable() { same_thread_module(kind) } else { None }
}

/// Minimal literal-text renderer.
#[must_use]
pub fn text_banner(text: &str) -> Box<dyn Renderer> {
    Box::new(TextBanner {
        text: text.to_string(),
    })
}

fn scale(color: u32, factor: f64) -> u32 {
    let factor = factor.clamp(0.0, 1.0);
    let channel = |shift: u32| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (f64::from((color >> shift) & 0xff) * factor).round() as u32;
        value.min(0xff) << shift
    };
    channel(16) | channel(8) | channel(0)
}

/// Cheap positional hash for stable pseudo-random layouts.
const fn hash(a: u32, b: u32) -> u32 {
    let mut h = a.wrapping_mul(0x9e37_79b1) ^ b.wrapping_mul(0x85eb_ca77);
    h ^= h >> 15;
    h = h.wrapping_mul(0xc2b2_ae3d);
    h ^ (h >> 13)
}

#[allow(clippy::cast_precision_loss)]
fn paint_waves(pixels: &mut Pixels, config: &RendererConfig) {
    let waves = match config {
        RendererConfig::Waves(waves) => waves.clone(),
        _ => WavesConfig::default(),
    };
    let amplitude = (waves.wave_height / 40.0).clamp(0.0, 1.0);
    let frequency = 0.02 * waves.zoom.max(0.1);
    let highlight = (waves.shininess / 100.0).clamp(0.0, 1.0);

    for y in 0..pixels.height() {
        for x in 0..pixels.width() {
            if waves.wireframe && x % 16 != 0 && y % 16 != 0 {
                pixels.put(x, y, 0);
                continue;
            }
            let height = (f64::from(x) * frequency + waves.wave_speed).sin()
                * (f64::from(y) * frequency * 1.5).cos();
            let shade = 0.55 + 0.45 * height * amplitude + highlight * height.max(0.0).powi(8);
            pixels.put(x, y, scale(waves.color, shade));
        }
    }
}

fn paint_glyphs(pixels: &mut Pixels, config: &RendererConfig) {
    let glyphs = match config {
        RendererConfig::Glyphs(glyphs) => glyphs.clone(),
        _ => GlyphConfig {
            animation_speed: 1.0,
            volumetric: false,
            fall_speed: None,
            forward_speed: None,
        },
    };
    let (width, height) = (pixels.width(), pixels.height());
    pixels.fill(0);

    for column in (0..width).step_by(8) {
        let seed = hash(column, 0x4d41_5458);
        let head = seed % height;
        let depth = if glyphs.volumetric { 0.35 + f64::from(seed % 65) / 100.0 } else { 1.0 };
        let trail = (height / 3).max(1);

        for step in 0..trail {
            let y = (head + height - step) % height;
            let fade = depth * (1.0 - f64::from(step) / f64::from(trail));
            pixels.put(column, y, scale(0x00_ff41, fade));
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn paint_hexells(pixels: &mut Pixels, _config: &RendererConfig) {
    const SIZE: f64 = 24.0;
    let row_height = SIZE * 0.866;

    for y in 0..pixels.height() {
        let row = (f64::from(y) / row_height) as u32;
        let offset = if row % 2 == 1 { SIZE / 2.0 } else { 0.0 };

        for x in 0..pixels.width() {
            let column = ((f64::from(x) + offset) / SIZE) as u32;
            let cell = hash(column, row);
            pixels.put(x, y, 0x20_2020 | (cell & 0x7f_7f7f));
        }
    }
}

fn paint_landscape(pixels: &mut Pixels, _config: &RendererConfig) {
    let height = pixels.height();
    let horizon = height * 55 / 100;
    let shore = height * 80 / 100;

    for y in 0..height {
        let color = if y < horizon {
            scale(0x87_ceeb, 0.6 + 0.4 * f64::from(y) / f64::from(horizon.max(1)))
        } else if y < shore {
            0x1e_5f8c
        } else {
            0xd8_c08a
        };
        for x in 0..pixels.width() {
            pixels.put(x, y, color);
        }
    }
}
