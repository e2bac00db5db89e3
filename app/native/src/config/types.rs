//! Configuration types for Backdrop.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{
    APOD_ENDPOINT, APP_ID, HD_WIDTH_THRESHOLD, PICTURES_FOLDER, SLIDESHOW_FILE,
    SLIDESHOW_TIMEOUT_IN_MILLISECONDS,
};

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Disables wallpaper loading entirely. Useful while debugging hosts.
    pub disabled: bool,

    /// Folder scanned for slideshow images.
    pub pictures_folder: String,

    /// Manifest file name inside `pictures_folder`.
    pub slideshow_file: String,

    /// Milliseconds between slideshow rotations.
    pub slideshow_interval_ms: u64,

    /// Viewport width above which the high-resolution remote image is used.
    pub hd_width_threshold: u32,

    /// Endpoint returning the daily remote image description.
    pub remote_endpoint: String,

    /// Path to an environment file containing API keys.
    ///
    /// Supported keys:
    /// - `NASA_API_KEY` - key for the daily remote image endpoint
    ///
    /// The path can be relative to the config file directory, absolute, or
    /// start with `~`.
    pub api_keys: String,

    /// Device pixel ratio forwarded to render workers.
    pub device_pixel_ratio: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            pictures_folder: PICTURES_FOLDER.to_string(),
            slideshow_file: SLIDESHOW_FILE.to_string(),
            slideshow_interval_ms: SLIDESHOW_TIMEOUT_IN_MILLISECONDS,
            hd_width_threshold: HD_WIDTH_THRESHOLD,
            remote_endpoint: APOD_ENDPOINT.to_string(),
            api_keys: String::new(),
            device_pixel_ratio: 1.0,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at ~/.config/backdrop/config.json"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/backdrop/config.jsonc` or `config.json`
/// 2. `~/.config/backdrop/config.jsonc` or `config.json`
/// 3. the platform config directory (`dirs::config_dir()`)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut push_dir = |dir: PathBuf| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join(APP_ID));
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join(APP_ID));
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join(APP_ID));
    }

    paths
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config_from_path(path: &Path) -> Result<(EngineSettings, PathBuf), ConfigError> {
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let settings: EngineSettings = serde_json::from_reader(reader)?;

    Ok((settings, path.to_path_buf()))
}

/// Loads the configuration from the first existing default location.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if no file exists, or a read/parse error.
pub fn load_config() -> Result<(EngineSettings, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}
