//! Error types for Backdrop.
//!
//! Every subsystem owns a focused error enum. [`BackdropError`] unifies them for
//! hosts that want a single, serializable error type.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::platform::fs::FileStoreError;
use crate::platform::net::HttpError;
use crate::wallpaper::decode::DecodeError;
use crate::wallpaper::engine::EngineError;
use crate::wallpaper::remote::RemoteError;
use crate::wallpaper::renderers::RenderError;
use crate::wallpaper::slideshow::SlideshowError;
use crate::wallpaper::worker::ChannelError;

/// Errors that can surface from the wallpaper subsystem.
///
/// Tagged as `{ "kind": ..., "message": ... }` when serialized.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum BackdropError {
    /// File store operation failed.
    #[error("File store error: {0}")]
    FileStoreError(String),
    /// Network request failed.
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Rendering failed.
    #[error("Render error: {0}")]
    RenderError(String),
    /// Slideshow manifest could not be produced or read.
    #[error("Slideshow error: {0}")]
    SlideshowError(String),
    /// Image decoding failed.
    #[error("Decode error: {0}")]
    DecodeError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Engine communication error.
    #[error("Engine error: {0}")]
    EngineError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for BackdropError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<FileStoreError> for BackdropError {
    fn from(err: FileStoreError) -> Self { Self::FileStoreError(err.to_string()) }
}

impl From<HttpError> for BackdropError {
    fn from(err: HttpError) -> Self { Self::NetworkError(err.to_string()) }
}

impl From<RemoteError> for BackdropError {
    fn from(err: RemoteError) -> Self { Self::NetworkError(err.to_string()) }
}

impl From<RenderError> for BackdropError {
    fn from(err: RenderError) -> Self { Self::RenderError(err.to_string()) }
}

impl From<ChannelError> for BackdropError {
    fn from(err: ChannelError) -> Self { Self::RenderError(err.to_string()) }
}

impl From<SlideshowError> for BackdropError {
    fn from(err: SlideshowError) -> Self { Self::SlideshowError(err.to_string()) }
}

impl From<DecodeError> for BackdropError {
    fn from(err: DecodeError) -> Self { Self::DecodeError(err.to_string()) }
}

impl From<ConfigError> for BackdropError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<EngineError> for BackdropError {
    fn from(err: EngineError) -> Self { Self::EngineError(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_error_conversion() {
        let err: BackdropError = FileStoreError::NotFound("/x".to_string()).into();
        assert!(matches!(err, BackdropError::FileStoreError(_)));
        assert!(err.to_string().contains("/x"));
    }

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BackdropError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_render_error_display() {
        let err: BackdropError = RenderError::Context("getContext failed".to_string()).into();
        let msg = err.to_string();
        assert!(msg.contains("Render error"));
        assert!(msg.contains("getContext"));
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = BackdropError::SlideshowError("manifest unreadable".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"SlideshowError\""));
        assert!(json.contains("manifest unreadable"));
    }
}
