//! Configuration module for Backdrop.
//!
//! Settings are read once from a JSONC file and cached for the lifetime of the
//! process. Hosts embedding the engine can also build [`EngineSettings`]
//! directly and skip the global entirely.

pub mod env;
pub mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{ConfigError, EngineSettings, config_paths, load_config, load_config_from_path};

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<EngineSettings> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override.
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// Must be called before `init()` or `get_config()` to take effect.
///
/// Returns `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Loads the configuration from disk, falling back to defaults.
fn load_or_default() -> EngineSettings {
    let result = CUSTOM_CONFIG_PATH.get().map_or_else(load_config, |path| load_config_from_path(path));

    let mut settings = match result {
        Ok((settings, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            let _ = CONFIG_PATH.set(path);
            settings
        }
        Err(ConfigError::NotFound) => EngineSettings::default(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            EngineSettings::default()
        }
    };

    if env::disable_flag_from_env() {
        settings.disabled = true;
    }

    settings
}

/// Initializes and returns the global configuration instance.
///
/// Idempotent: later calls return the same instance.
pub fn init() -> &'static EngineSettings { CONFIG.get_or_init(load_or_default) }

/// Returns the global configuration instance, initializing it if necessary.
pub fn get_config() -> &'static EngineSettings { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }

/// Loads API keys referenced by the global configuration.
#[must_use]
pub fn api_keys() -> env::ApiKeys {
    let config_dir = get_config_path()
        .and_then(|path| path.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    env::load_api_keys(&get_config().api_keys, &config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_is_stable() {
        let first: *const EngineSettings = get_config();
        let second: *const EngineSettings = init();
        assert_eq!(first, second);
    }

    #[test]
    fn test_api_keys_default_to_demo() {
        // No api key file is configured in the test environment.
        if get_config().api_keys.is_empty() {
            assert_eq!(api_keys().nasa_api_key(), crate::constants::APOD_DEMO_KEY);
        }
    }
}
