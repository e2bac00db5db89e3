//! Path helpers.
//!
//! Two kinds of paths flow through Backdrop: host paths (config and env files on
//! the real disk, expanded shell-style) and virtual POSIX paths inside the
//! file store (always `/`-separated, joined by concatenation).

use std::path::{Path, PathBuf};

use url::Url;

/// Expands a leading `~` and resolves relative paths against `base_dir`.
///
/// Absolute and home-relative paths ignore `base_dir`. An empty or blank
/// input yields an empty path.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());

    if expanded.is_absolute() { expanded } else { base_dir.join(expanded) }
}

/// Joins a virtual directory and an entry name with a single `/`.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');

    if dir.is_empty() { format!("/{name}") } else { format!("{dir}/{name}") }
}

/// Rewrites a site-root-relative path (`/Users/...`) into an absolute URL on `origin`.
///
/// Anything that is not site-root-relative is returned unchanged, as is the
/// input when `origin` cannot be parsed.
#[must_use]
pub fn absolutize(path: &str, origin: &str) -> String {
    if !path.starts_with('/') || path.starts_with("//") {
        return path.to_string();
    }

    match Url::parse(origin).and_then(|base| base.join(path)) {
        Ok(url) => url.to_string(),
        Err(err) => {
            tracing::debug!(origin, error = %err, "origin is not a valid url, keeping path");
            path.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_and_resolve_empty() {
        assert_eq!(expand_and_resolve("  ", Path::new("/base")), PathBuf::new());
    }

    #[test]
    fn test_expand_and_resolve_relative() {
        let result = expand_and_resolve(" .env ", Path::new("/config/dir"));
        assert_eq!(result, PathBuf::from("/config/dir/.env"));
    }

    #[test]
    fn test_expand_and_resolve_absolute_ignores_base() {
        let result = expand_and_resolve("/etc/backdrop.env", Path::new("/config/dir"));
        assert_eq!(result, PathBuf::from("/etc/backdrop.env"));
    }

    #[test]
    fn test_expand_and_resolve_tilde() {
        let result = expand_and_resolve("~/secrets/.env", Path::new("/base/dir"));
        let display = result.to_string_lossy();
        assert!(!display.starts_with('~'));
        assert!(!display.contains("/base/dir"));
        assert!(display.ends_with("secrets/.env"));
    }

    #[test]
    fn test_join_collapses_separators() {
        assert_eq!(join("/Users/Public/Pictures/", "/a.png"), "/Users/Public/Pictures/a.png");
        assert_eq!(join("/", "a.png"), "/a.png");
        assert_eq!(join("", "a.png"), "/a.png");
    }

    #[test]
    fn test_absolutize_site_root_path() {
        assert_eq!(
            absolutize("/Users/Public/Pictures/a b.png", "http://localhost:3000"),
            "http://localhost:3000/Users/Public/Pictures/a%20b.png"
        );
    }

    #[test]
    fn test_absolutize_leaves_urls_alone() {
        assert_eq!(absolutize("https://x.test/a.png", "http://localhost"), "https://x.test/a.png");
        assert_eq!(absolutize("//cdn.test/a.png", "http://localhost"), "//cdn.test/a.png");
        assert_eq!(absolutize("/a.png", "not an origin"), "/a.png");
    }
}
