//! Application-wide constants.
//!
//! Well-known paths, timing values, and extension tables shared by the
//! wallpaper pipelines.

/// Application identifier, used for config directories and thread names.
pub const APP_ID: &str = "backdrop";

/// Folder scanned for slideshow images.
pub const PICTURES_FOLDER: &str = "/Users/Public/Pictures";

/// Manifest file name, stored inside [`PICTURES_FOLDER`].
pub const SLIDESHOW_FILE: &str = "slideshow.json";

/// Delay between slideshow rotations.
pub const SLIDESHOW_TIMEOUT_IN_MILLISECONDS: u64 = 15_000;

/// One calendar day.
pub const MILLISECONDS_IN_DAY: u64 = 86_400_000;

/// Motion multiplier applied when the platform asks for reduced motion.
pub const REDUCED_MOTION_PERCENT: f64 = 0.1;

/// Viewport width above which the high-resolution remote image is preferred.
pub const HD_WIDTH_THRESHOLD: u32 = 1024;

/// Astronomy picture of the day endpoint.
pub const APOD_ENDPOINT: &str = "https://api.nasa.gov/planetary/apod";

/// Key used when no API key is configured.
pub const APOD_DEMO_KEY: &str = "DEMO_KEY";

/// Thumbnail host for video-hosting pages.
pub const YOUTUBE_THUMBNAIL_BASE: &str = "https://i.ytimg.com/vi";

/// Error marker emitted by render workers.
pub const WORKER_ERROR_TYPE: &str = "[error]";

/// Substring identifying a drawing-context acquisition failure.
pub const CONTEXT_FAILURE_MARKER: &str = "getContext";

/// Extensions that render as still images.
pub const IMAGE_FILE_EXTENSIONS: &[&str] = &[
    ".apng", ".avif", ".bmp", ".cur", ".gif", ".ico", ".jfif", ".jif", ".jpe", ".jpeg", ".jpg",
    ".jxl", ".pjp", ".pjpeg", ".png", ".qoi", ".svg", ".tif", ".tiff", ".webp", ".xbm",
];

/// Image extensions never picked for the slideshow.
pub const UNSUPPORTED_SLIDESHOW_EXTENSIONS: &[&str] = &[".ani", ".cur", ".ico"];

/// Extensions that render as looping video.
pub const VIDEO_FILE_EXTENSIONS: &[&str] =
    &[".m4v", ".mkv", ".mov", ".mp4", ".ogm", ".ogv", ".webm"];

/// Returns the lowercase extension of `path`, including the leading dot.
///
/// Returns an empty string when the last path segment has no extension.
#[must_use]
pub fn get_extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);

    match name.rfind('.') {
        Some(index) if index > 0 => name[index..].to_lowercase(),
        _ => String::new(),
    }
}

/// Whether `path` has a still-image extension.
#[must_use]
pub fn is_image_path(path: &str) -> bool { IMAGE_FILE_EXTENSIONS.contains(&get_extension(path).as_str()) }

/// Whether `path` has a video extension.
#[must_use]
pub fn is_video_path(path: &str) -> bool { VIDEO_FILE_EXTENSIONS.contains(&get_extension(path).as_str()) }

/// Whether `path` can take part in the slideshow rotation.
#[must_use]
pub fn is_slideshow_candidate(path: &str) -> bool {
    let extension = get_extension(path);

    IMAGE_FILE_EXTENSIONS.contains(&extension.as_str())
        && !UNSUPPORTED_SLIDESHOW_EXTENSIONS.contains(&extension.as_str())
}
