//! Selector classification.
//!
//! A wallpaper selector is a single string owned by the session. Its first
//! token names the mode, and the remaining tokens carry mode parameters:
//!
//! | Selector                  | Mode                               |
//! |---------------------------|------------------------------------|
//! | `VANTA [WIREFRAME]`       | procedural waves                   |
//! | `MATRIX 2D`, `MATRIX 3D`  | procedural glyph rain              |
//! | `HEXELLS`                 | procedural hex cells               |
//! | `COASTAL_LANDSCAPE`       | procedural landscape               |
//! | `L33T`                    | literal-text banner                |
//! | `SLIDESHOW`               | rotating pictures folder           |
//! | `APOD [<date>] [<url>]`   | daily remote image                 |
//! | `/path/to/file.ext`       | file image or video                |
//! | anything else             | default, the primary renderer      |
//!
//! Resolution is pure: the same selector and [`ResolveContext`] always yield
//! the same [`WallpaperMode`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{REDUCED_MOTION_PERCENT, is_video_path};

/// Selector keyword for the slideshow.
pub const SLIDESHOW_KEYWORD: &str = "SLIDESHOW";

/// Selector keyword for the daily remote image.
pub const REMOTE_KEYWORD: &str = "APOD";

/// Variant suffix that forces the wireframe look.
const WIREFRAME_VARIANT: &str = "WIREFRAME";

/// Glyph fall speed while embedded.
const EMBEDDED_FALL_SPEED: f64 = -0.09;

/// Glyph forward speed while embedded.
const EMBEDDED_FORWARD_SPEED: f64 = -0.25;

/// Procedural renderers, keyed by selector name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RendererKind {
    /// Shaded wave field. The primary renderer.
    Vanta,
    /// Glyph rain.
    Matrix,
    /// Hexagonal cell field.
    Hexells,
    /// Banded landscape.
    CoastalLandscape,
    /// Literal-text banner.
    L33t,
}

impl RendererKind {
    /// Renderer used whenever anything else fails.
    pub const PRIMARY: Self = Self::Vanta;

    /// Every renderer.
    pub const ALL: [Self; 5] = [
        Self::Vanta,
        Self::Matrix,
        Self::Hexells,
        Self::CoastalLandscape,
        Self::L33t,
    ];

    /// Looks up a renderer by selector name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Selector name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vanta => "VANTA",
            Self::Matrix => "MATRIX",
            Self::Hexells => "HEXELLS",
            Self::CoastalLandscape => "COASTAL_LANDSCAPE",
            Self::L33t => "L33T",
        }
    }

    /// Whether the renderer can run on a render worker.
    #[must_use]
    pub const fn is_worker_capable(self) -> bool { matches!(self, Self::Vanta | Self::Matrix) }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Parameters of the wave renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WavesConfig {
    /// Base color, `0xRRGGBB`.
    pub color: u32,
    /// Specular strength.
    pub shininess: f64,
    /// Wave amplitude.
    pub wave_height: f64,
    /// Wave motion speed.
    pub wave_speed: f64,
    /// Camera zoom.
    pub zoom: f64,
    /// Draw grid lines only.
    pub wireframe: bool,
}

impl Default for WavesConfig {
    fn default() -> Self {
        Self {
            color: 0x0e_2748,
            shininess: 35.0,
            wave_height: 20.0,
            wave_speed: 0.25,
            zoom: 0.88,
            wireframe: false,
        }
    }
}

/// Parameters of the glyph renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphConfig {
    /// Animation speed multiplier.
    pub animation_speed: f64,
    /// Render columns at varying depth.
    pub volumetric: bool,
    /// Vertical speed override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fall_speed: Option<f64>,
    /// Depth speed override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_speed: Option<f64>,
}

/// Per-mode parameter bag, built fresh on every load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "renderer", rename_all = "camelCase")]
pub enum RendererConfig {
    /// Wave renderer parameters.
    Waves(WavesConfig),
    /// Glyph renderer parameters.
    Glyphs(GlyphConfig),
    /// Renderer takes no parameters.
    None,
}

impl RendererConfig {
    /// Motion-related speed fields, for assertions and diagnostics.
    #[must_use]
    pub const fn motion_speed(&self) -> Option<f64> {
        match self {
            Self::Waves(waves) => Some(waves.wave_speed),
            Self::Glyphs(glyphs) => Some(glyphs.animation_speed),
            Self::None => None,
        }
    }
}

/// Whether a File-mode path is a still image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Looping video.
    Video,
}

/// Resolved wallpaper mode.
#[derive(Debug, Clone, PartialEq)]
pub enum WallpaperMode {
    /// Pluggable renderer.
    Procedural {
        /// Renderer.
        kind: RendererKind,
        /// Renderer parameters.
        config: RendererConfig,
    },
    /// Rotating pictures folder.
    Slideshow,
    /// Daily remote image.
    RemoteDaily {
        /// Date stamp of the last fetch.
        date: Option<NaiveDate>,
        /// URL from the last fetch.
        url: Option<String>,
    },
    /// User file.
    File {
        /// Virtual path.
        path: String,
        /// Image or video.
        media: MediaKind,
    },
    /// Unknown selector.
    Default,
}

/// Platform flags that influence resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveContext {
    /// The platform asks for reduced motion.
    pub reduced_motion: bool,
    /// The host is the top-level frame.
    pub top_level: bool,
}

impl Default for ResolveContext {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            top_level: true,
        }
    }
}

impl ResolveContext {
    /// Multiplier applied to motion speeds.
    #[must_use]
    pub const fn motion_factor(self) -> f64 { if self.reduced_motion { REDUCED_MOTION_PERCENT } else { 1.0 } }
}

/// First token of a selector.
#[must_use]
pub fn selector_name(selector: &str) -> &str { selector.split_whitespace().next().unwrap_or_default() }

/// Classifies `selector`.
#[must_use]
pub fn resolve(selector: &str, context: ResolveContext) -> WallpaperMode {
    let selector = selector.trim();
    let name = selector_name(selector);

    if selector.starts_with('/') {
        let media = if is_video_path(selector) { MediaKind::Video } else { MediaKind::Image };
        return WallpaperMode::File {
            path: selector.to_string(),
            media,
        };
    }

    if selector == SLIDESHOW_KEYWORD {
        return WallpaperMode::Slideshow;
    }

    if name == REMOTE_KEYWORD {
        return parse_remote(selector);
    }

    match RendererKind::from_name(name) {
        Some(kind) => WallpaperMode::Procedural {
            kind,
            config: renderer_config(kind, selector, context),
        },
        None => WallpaperMode::Default,
    }
}

fn renderer_config(kind: RendererKind, selector: &str, context: ResolveContext) -> RendererConfig {
    let variant = selector.split_whitespace().nth(1).unwrap_or_default();

    match kind {
        RendererKind::Vanta => {
            let base = WavesConfig::default();
            RendererConfig::Waves(WavesConfig {
                wave_speed: base.wave_speed * context.motion_factor(),
                wireframe: variant == WIREFRAME_VARIANT || !context.top_level,
                ..base
            })
        }
        RendererKind::Matrix => RendererConfig::Glyphs(GlyphConfig {
            animation_speed: context.motion_factor(),
            volumetric: selector.ends_with("3D"),
            fall_speed: (!context.top_level).then_some(EMBEDDED_FALL_SPEED),
            forward_speed: (!context.top_level).then_some(EMBEDDED_FORWARD_SPEED),
        }),
        RendererKind::Hexells | RendererKind::CoastalLandscape | RendererKind::L33t => {
            RendererConfig::None
        }
    }
}

/// Parses `APOD` parameters. Date and URL may appear in either order.
fn parse_remote(selector: &str) -> WallpaperMode {
    let mut date = None;
    let mut url = None;

    for token in selector.split_whitespace().skip(1) {
        match NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            Ok(parsed) if date.is_none() => date = Some(parsed),
            _ if url.is_none() && token.contains("://") => url = Some(token.to_string()),
            _ => tracing::trace!(token, "ignoring remote selector token"),
        }
    }

    WallpaperMode::RemoteDaily { date, url }
}

/// Builds the selector recorded after a remote fetch.
#[must_use]
pub fn remote_selector(date: &str, url: &str) -> String { format!("{REMOTE_KEYWORD} {date} {url}") }

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: ResolveContext = ResolveContext {
        reduced_motion: false,
        top_level: true,
    };

    fn waves(mode: &WallpaperMode) -> &WavesConfig {
        match mode {
            WallpaperMode::Procedural {
                config: RendererConfig::Waves(waves),
                ..
            } => waves,
            other => panic!("expected waves, got {other:?}"),
        }
    }

    fn glyphs(mode: &WallpaperMode) -> &GlyphConfig {
        match mode {
            WallpaperMode::Procedural {
                config: RendererConfig::Glyphs(glyphs),
                ..
            } => glyphs,
            other => panic!("expected glyphs, got {other:?}"),
        }
    }

    #[test]
    fn test_vanta_resolves_to_primary() {
        let mode = resolve("VANTA", TOP);
        assert!(matches!(mode, WallpaperMode::Procedural { kind: RendererKind::Vanta, .. }));
        assert!(!waves(&mode).wireframe);
    }

    #[test]
    fn test_wireframe_variant() {
        assert!(waves(&resolve("VANTA WIREFRAME", TOP)).wireframe);
    }

    #[test]
    fn test_embedded_forces_wireframe() {
        let embedded = ResolveContext {
            top_level: false,
            ..TOP
        };
        assert!(waves(&resolve("VANTA", embedded)).wireframe);
    }

    #[test]
    fn test_reduced_motion_scales_every_procedural_speed() {
        let reduced = ResolveContext {
            reduced_motion: true,
            ..TOP
        };

        for selector in ["VANTA", "VANTA WIREFRAME", "MATRIX 2D", "MATRIX 3D"] {
            let normal = resolve(selector, TOP);
            let slow = resolve(selector, reduced);
            let (Some(normal), Some(slow)) = (
                config_of(&normal).motion_speed(),
                config_of(&slow).motion_speed(),
            ) else {
                panic!("{selector} has no motion speed");
            };
            assert!((slow - normal * REDUCED_MOTION_PERCENT).abs() < f64::EPSILON, "{selector}");
        }
    }

    fn config_of(mode: &WallpaperMode) -> &RendererConfig {
        match mode {
            WallpaperMode::Procedural { config, .. } => config,
            other => panic!("expected procedural, got {other:?}"),
        }
    }

    #[test]
    fn test_matrix_variants() {
        assert!(glyphs(&resolve("MATRIX 3D", TOP)).volumetric);
        assert!(!glyphs(&resolve("MATRIX 2D", TOP)).volumetric);
        assert_eq!(glyphs(&resolve("MATRIX 2D", TOP)).fall_speed, None);
    }

    #[test]
    fn test_matrix_embedded_perturbs_directions() {
        let embedded = ResolveContext {
            top_level: false,
            ..TOP
        };
        let config = glyphs(&resolve("MATRIX 3D", embedded)).clone();
        assert_eq!(config.fall_speed, Some(-0.09));
        assert_eq!(config.forward_speed, Some(-0.25));
    }

    #[test]
    fn test_resolution_is_pure() {
        for selector in ["VANTA", "MATRIX 3D", "SLIDESHOW", "APOD 2024-01-09", "/a.mp4", "?"] {
            assert_eq!(resolve(selector, TOP), resolve(selector, TOP));
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(resolve("SLIDESHOW", TOP), WallpaperMode::Slideshow);
        assert_eq!(resolve("SLIDESHOW extra", TOP), WallpaperMode::Default);
        assert_eq!(resolve("", TOP), WallpaperMode::Default);
        assert_eq!(resolve("NOT_A_RENDERER", TOP), WallpaperMode::Default);
        assert!(matches!(
            resolve("L33T", TOP),
            WallpaperMode::Procedural {
                kind: RendererKind::L33t,
                config: RendererConfig::None
            }
        ));
    }

    #[test]
    fn test_remote_selector_parsing() {
        assert_eq!(resolve("APOD", TOP), WallpaperMode::RemoteDaily { date: None, url: None });

        let expected = WallpaperMode::RemoteDaily {
            date: NaiveDate::from_ymd_opt(2024, 1, 9),
            url: Some("https://apod.nasa.gov/a.jpg".to_string()),
        };
        assert_eq!(resolve("APOD 2024-01-09 https://apod.nasa.gov/a.jpg", TOP), expected);
        assert_eq!(resolve("APOD https://apod.nasa.gov/a.jpg 2024-01-09", TOP), expected);
        assert_eq!(
            resolve(&remote_selector("2024-01-09", "https://apod.nasa.gov/a.jpg"), TOP),
            expected
        );
    }

    #[test]
    fn test_file_classification_is_exclusive() {
        assert_eq!(
            resolve("/Users/Public/Videos/Loop.MP4", TOP),
            WallpaperMode::File {
                path: "/Users/Public/Videos/Loop.MP4".to_string(),
                media: MediaKind::Video
            }
        );
        assert_eq!(
            resolve("/Users/Public/Pictures/a.jpg", TOP),
            WallpaperMode::File {
                path: "/Users/Public/Pictures/a.jpg".to_string(),
                media: MediaKind::Image
            }
        );
    }

    #[test]
    fn test_worker_capability() {
        assert!(RendererKind::Vanta.is_worker_capable());
        assert!(RendererKind::Matrix.is_worker_capable());
        assert!(!RendererKind::Hexells.is_worker_capable());
        assert!(!RendererKind::L33t.is_worker_capable());
    }
}
