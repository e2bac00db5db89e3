//! Background and video descriptions for the host surface.

use crate::platform::display::ThemeColors;
use crate::platform::session::WallpaperFit;
use crate::platform::surface::{Background, VideoElement};

/// Blend mode applied when hosted inside another frame.
pub const EMBEDDED_BLEND_MODE: &str = "difference";

/// Position and size shorthand for `fit`.
#[must_use]
pub const fn position_size(fit: WallpaperFit) -> &'static str {
    match fit {
        WallpaperFit::Fill => "center center / cover",
        WallpaperFit::Fit => "center center / contain",
        WallpaperFit::Stretch => "center center / 100% 100%",
        WallpaperFit::Center => "center center",
        WallpaperFit::Tile => "50% 50%",
    }
}

/// Repeat policy for `fit`.
#[must_use]
pub const fn repeat(fit: WallpaperFit) -> &'static str {
    match fit {
        WallpaperFit::Tile => "repeat",
        _ => "no-repeat",
    }
}

/// Describes a still-image background.
///
/// Top-level hosts paint the theme background under the image. Embedded hosts
/// paint the text color and blend with `difference` so the preview stays
/// legible against the parent.
#[must_use]
pub fn build_background(url: &str, fit: WallpaperFit, theme: &ThemeColors, top_level: bool) -> Background {
    Background {
        url: url.to_string(),
        position_size: position_size(fit).to_string(),
        repeat: repeat(fit).to_string(),
        attachment: "fixed".to_string(),
        origin: "border-box".to_string(),
        clip: "border-box".to_string(),
        color: if top_level { theme.background.clone() } else { theme.text.clone() },
        blend_mode: (!top_level).then(|| EMBEDDED_BLEND_MODE.to_string()),
    }
}

/// Describes a muted, looping, full-bleed video.
#[must_use]
pub fn build_video(src: &str) -> VideoElement {
    let style = [
        ("position", "absolute"),
        ("inset", "0"),
        ("width", "100%"),
        ("height", "100%"),
        ("object-fit", "cover"),
        ("object-position", "center center"),
        ("z-index", "-1"),
    ];

    VideoElement {
        src: src.to_string(),
        autoplay: true,
        controls: false,
        disable_picture_in_picture: true,
        disable_remote_playback: true,
        looping: true,
        muted: true,
        plays_inline: true,
        style: style.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_table() {
        assert_eq!(position_size(WallpaperFit::Fill), "center center / cover");
        assert_eq!(position_size(WallpaperFit::Fit), "center center / contain");
        assert_eq!(position_size(WallpaperFit::Stretch), "center center / 100% 100%");
        assert_eq!(position_size(WallpaperFit::Center), "center center");
        assert_eq!(position_size(WallpaperFit::Tile), "50% 50%");
        assert_eq!(repeat(WallpaperFit::Tile), "repeat");
        assert_eq!(repeat(WallpaperFit::Center), "no-repeat");
    }

    #[test]
    fn test_top_level_background_uses_theme_background() {
        let background =
            build_background("blob:backdrop/1", WallpaperFit::Fill, &ThemeColors::default(), true);
        assert_eq!(background.color, "#000");
        assert_eq!(background.blend_mode, None);
        assert_eq!(background.attachment, "fixed");
        assert_eq!(
            background.to_css(),
            "url(\"blob:backdrop/1\") center center / cover no-repeat fixed border-box border-box #000"
        );
    }

    #[test]
    fn test_embedded_background_blends() {
        let background = build_background("/a.png", WallpaperFit::Tile, &ThemeColors::default(), false);
        assert_eq!(background.color, "#fff");
        assert_eq!(background.blend_mode.as_deref(), Some("difference"));
        assert_eq!(background.repeat, "repeat");
    }

    #[test]
    fn test_video_is_muted_looping_and_covering() {
        let video = build_video("/clip.webm");
        assert!(video.muted && video.autoplay && video.looping && video.plays_inline);
        assert!(!video.controls);
        assert!(video.disable_picture_in_picture && video.disable_remote_playback);
        assert!(video.style.contains(&("object-fit".to_string(), "cover".to_string())));
        assert!(video.style.contains(&("z-index".to_string(), "-1".to_string())));
    }
}
