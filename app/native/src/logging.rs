//! Logging initialization using the `tracing` crate.
//!
//! Hosts that already install a subscriber can skip this module entirely; the
//! engine only emits `tracing` events.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::env::keys;

/// Filter used when neither the caller nor `BACKDROP_LOG` provides one.
pub const DEFAULT_FILTER: &str = "warn,backdrop=info";

/// Builds the filter from `filter`, then `BACKDROP_LOG`, then [`DEFAULT_FILTER`].
fn build_filter(filter: Option<&str>) -> EnvFilter {
    if let Some(directives) = filter
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return filter;
    }

    EnvFilter::try_from_env(keys::LOG).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global tracing subscriber.
///
/// The level can be controlled with the `BACKDROP_LOG` environment variable,
/// for example `BACKDROP_LOG=backdrop=debug`. Returns `false` when a
/// subscriber was already installed, in which case nothing changes.
pub fn init(filter: Option<&str>) -> bool {
    let layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(build_filter(filter))
        .with(layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("logging initialized");
    }

    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_filter_wins() {
        let filter = build_filter(Some("backdrop=trace"));
        assert_eq!(filter.to_string(), "backdrop=trace");
    }

    #[test]
    fn test_invalid_filter_is_ignored() {
        let filter = build_filter(Some("backdrop=loudest"));
        assert_ne!(filter.to_string(), "backdrop=loudest");
    }

    #[test]
    fn test_second_init_is_a_no_op() {
        init(Some("off"));
        assert!(!init(Some("off")));
    }
}
