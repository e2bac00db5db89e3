//! Display environment: motion preference, frame ancestry, origin, viewport
//! width and theme colors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Colors supplied by the theme provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    /// Desktop background color.
    pub background: String,
    /// Foreground text color.
    pub text: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            background: "#000".to_string(),
            text: "#fff".to_string(),
        }
    }
}

/// Where the host sits in the frame hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAncestry {
    /// No parent frame.
    TopLevel,
    /// Hosted inside a parent frame whose origin could be read.
    Embedded {
        /// Origin of the top-most frame.
        parent_origin: String,
    },
}

/// The parent frame could not be inspected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Blocked reading parent frame: {0}")]
pub struct FrameAccessError(pub String);

/// Display properties read at load time.
pub trait DisplayEnvironment: Send + Sync {
    /// Whether the platform asks for reduced motion.
    fn prefers_reduced_motion(&self) -> bool;

    /// Frame hierarchy. Cross-origin parents may refuse the read.
    ///
    /// # Errors
    ///
    /// Returns [`FrameAccessError`] when the parent frame cannot be inspected.
    fn frame_ancestry(&self) -> Result<FrameAncestry, FrameAccessError>;

    /// Origin that site-root-relative paths resolve against.
    fn origin(&self) -> String;

    /// Viewport width in CSS pixels.
    fn view_width(&self) -> f64;

    /// Current theme colors.
    fn theme(&self) -> ThemeColors;
}

/// Whether the host is the top-level frame.
///
/// Any parent frame, readable or not, makes the host embedded.
#[must_use]
pub fn is_top_level(display: &dyn DisplayEnvironment) -> bool {
    match display.frame_ancestry() {
        Ok(FrameAncestry::TopLevel) => true,
        Ok(FrameAncestry::Embedded { parent_origin }) => {
            tracing::trace!(%parent_origin, "host is embedded");
            false
        }
        Err(err) => {
            tracing::debug!(error = %err, "treating unreadable parent frame as embedded");
            false
        }
    }
}

/// Fixed display environment.
#[derive(Debug, Clone)]
pub struct StaticDisplay {
    /// Reduced-motion preference.
    pub reduced_motion: bool,
    /// Frame ancestry, or the message of a blocked read.
    pub ancestry: Result<FrameAncestry, String>,
    /// Page origin.
    pub origin: String,
    /// Viewport width.
    pub view_width: f64,
    /// Theme colors.
    pub theme: ThemeColors,
}

impl Default for StaticDisplay {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            ancestry: Ok(FrameAncestry::TopLevel),
            origin: "http://localhost".to_string(),
            view_width: 1920.0,
            theme: ThemeColors::default(),
        }
    }
}

impl StaticDisplay {
    /// Sets the reduced-motion preference.
    #[must_use]
    pub const fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    /// Embeds the host under `parent_origin`.
    #[must_use]
    pub fn embedded_in(mut self, parent_origin: &str) -> Self {
        self.ancestry = Ok(FrameAncestry::Embedded {
            parent_origin: parent_origin.to_string(),
        });
        self
    }

    /// Makes the parent frame unreadable.
    #[must_use]
    pub fn with_blocked_parent(mut self) -> Self {
        self.ancestry = Err("cross-origin frame".to_string());
        self
    }
}

impl DisplayEnvironment for StaticDisplay {
    fn prefers_reduced_motion(&self) -> bool { self.reduced_motion }

    fn frame_ancestry(&self) -> Result<FrameAncestry, FrameAccessError> {
        self.ancestry.clone().map_err(FrameAccessError)
    }

    fn origin(&self) -> String { self.origin.clone() }

    fn view_width(&self) -> f64 { self.view_width }

    fn theme(&self) -> ThemeColors { self.theme.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_by_default() {
        assert!(is_top_level(&StaticDisplay::default()));
    }

    #[test]
    fn test_any_parent_is_embedded() {
        let same_origin = StaticDisplay::default().embedded_in("http://localhost");
        let other_origin = StaticDisplay::default().embedded_in("https://elsewhere.test");
        assert!(!is_top_level(&same_origin));
        assert!(!is_top_level(&other_origin));
    }

    #[test]
    fn test_blocked_parent_read_fails_safe() {
        assert!(!is_top_level(&StaticDisplay::default().with_blocked_parent()));
    }
}
