//! Environment file parsing utilities.
//!
//! API keys are read from `.env` files instead of the configuration file so
//! the configuration can be shared without leaking secrets.
//!
//! Uses the `dotenvy` crate for `.env` parsing.

use std::collections::HashMap;
use std::path::Path;

use crate::constants::APOD_DEMO_KEY;
use crate::platform::path::expand_and_resolve;

/// Environment variable names.
pub mod keys {
    /// Key for the daily remote image endpoint.
    pub const NASA_API_KEY: &str = "NASA_API_KEY";

    /// Forces the debug-disable flag when set to `1` or `true`.
    pub const DISABLE_WALLPAPER: &str = "BACKDROP_DISABLE_WALLPAPER";

    /// Log filter directive.
    pub const LOG: &str = "BACKDROP_LOG";
}

/// Parses an environment file and returns a map of key-value pairs.
///
/// Returns an empty map if the file doesn't exist or can't be read.
#[must_use]
pub fn parse_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(err) => {
            if path.exists() {
                tracing::warn!(path = %path.display(), error = %err, "failed to read env file");
            }
            HashMap::new()
        }
    }
}

/// Container for API keys loaded from an environment file.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Key for the daily remote image endpoint.
    pub nasa_api_key: Option<String>,
}

impl ApiKeys {
    /// Returns the remote image key, falling back to the public demo key.
    #[must_use]
    pub fn nasa_api_key(&self) -> &str {
        self.nasa_api_key.as_deref().filter(|key| !key.is_empty()).unwrap_or(APOD_DEMO_KEY)
    }
}

/// Loads API keys from an environment file.
///
/// # Arguments
///
/// * `api_keys_path` - Path to the env file (can be relative or absolute)
/// * `config_dir` - Directory containing the config file (for resolving relative paths)
#[must_use]
pub fn load_api_keys(api_keys_path: &str, config_dir: &Path) -> ApiKeys {
    if api_keys_path.is_empty() {
        return ApiKeys::default();
    }

    let resolved_path = expand_and_resolve(api_keys_path, config_dir);
    let env_vars = parse_env_file(&resolved_path);

    ApiKeys {
        nasa_api_key: env_vars.get(keys::NASA_API_KEY).cloned(),
    }
}

/// Whether the process environment forces wallpapers off.
#[must_use]
pub fn disable_flag_from_env() -> bool {
    std::env::var(keys::DISABLE_WALLPAPER)
        .is_ok_and(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_env_file_basic() {
        let temp_dir = TempDir::new().unwrap();
        let env_path = temp_dir.path().join(".env");

        let mut file = fs::File::create(&env_path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "NASA_API_KEY=abc123").unwrap();

        let result = parse_env_file(&env_path);
        assert_eq!(result.get("NASA_API_KEY"), Some(&"abc123".to_string()));
    }

    #[test]
    fn test_parse_env_file_missing_returns_empty() {
        let result = parse_env_file(Path::new("/nonexistent/dir/.env"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_load_api_keys_relative_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("secrets.env"), "NASA_API_KEY=relative_key\n").unwrap();

        let keys = load_api_keys("secrets.env", temp_dir.path());
        assert_eq!(keys.nasa_api_key(), "relative_key");
    }

    #[test]
    fn test_empty_path_uses_demo_key() {
        let keys = load_api_keys("", Path::new("/tmp"));
        assert_eq!(keys.nasa_api_key(), APOD_DEMO_KEY);
    }
}
