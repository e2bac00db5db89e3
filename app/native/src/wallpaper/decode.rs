//! Image decoding for formats a display surface cannot show directly.

use std::io::Cursor;

use futures::future::BoxFuture;
use image::ImageFormat;
use thiserror::Error;

/// Errors raised while decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The bytes are not a valid image of the expected format.
    #[error("Failed to decode {extension} image: {message}")]
    Invalid {
        /// Extension the bytes were decoded as.
        extension: String,
        /// Decoder message.
        message: String,
    },
    /// The decode task was cancelled.
    #[error("Decode task failed: {0}")]
    Task(String),
}

/// Converts file bytes into something displayable, keyed by extension.
pub trait ImageDecoder: Send + Sync {
    /// Returns re-encoded bytes, or `None` when the raw bytes can be shown as-is.
    fn decode<'a>(
        &'a self,
        extension: &'a str,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, DecodeError>>;
}

/// Format that needs re-encoding for `extension`.
#[must_use]
pub fn format_needing_decode(extension: &str) -> Option<ImageFormat> {
    match extension {
        ".bmp" => Some(ImageFormat::Bmp),
        ".qoi" => Some(ImageFormat::Qoi),
        ".tif" | ".tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Decoder backed by the `image` crate. Re-encodes to PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngTranscoder;

fn transcode(extension: &str, format: ImageFormat, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let invalid = |err: image::ImageError| DecodeError::Invalid {
        extension: extension.to_string(),
        message: err.to_string(),
    };

    let decoded = image::load_from_memory_with_format(data, format).map_err(invalid)?;
    let mut png = Cursor::new(Vec::new());
    decoded.write_to(&mut png, ImageFormat::Png).map_err(invalid)?;

    Ok(png.into_inner())
}

impl ImageDecoder for PngTranscoder {
    fn decode<'a>(
        &'a self,
        extension: &'a str,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<Option<Vec<u8>>, DecodeError>> {
        Box::pin(async move {
            let Some(format) = format_needing_decode(extension) else {
                return Ok(None);
            };

            let extension = extension.to_string();
            let data = data.to_vec();
            let png = tokio::task::spawn_blocking(move || transcode(&extension, format, &data))
                .await
                .map_err(|err| DecodeError::Task(err.to_string()))??;

            Ok(Some(png))
        })
    }
}
