//! Asynchronous loads for file, slideshow and remote modes.
//!
//! A load only gathers what to show. The engine applies the resulting
//! [`LoadPlan`] once it has checked the load is still current, so a stale load
//! never touches the surface.

use std::sync::Arc;

use crate::constants::get_extension;
use crate::error::BackdropError;
use crate::platform::fs::FileStore;
use crate::platform::net::HttpClient;
use crate::platform::resources::ResourceStore;
use crate::wallpaper::decode::ImageDecoder;
use crate::wallpaper::mode::{MediaKind, remote_selector};
use crate::wallpaper::remote::{RemoteDailyFetcher, RemoteOutcome};
use crate::wallpaper::slideshow::SlideshowCache;

/// What a finished load wants shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadPlan {
    /// Show a still image from a resource handle.
    Image { handle: String },

    /// Play a video from a resource handle.
    Video { handle: String },

    /// Show the next slideshow image and schedule the one after.
    Slideshow { url: String, preload: Option<String> },

    /// Show a remote image. `selector` is recorded in the session when set.
    Remote { url: String, selector: Option<String> },

    /// The remote image is already shown.
    RemoteUnchanged,

    /// Nothing could be shown; switch to the primary renderer.
    Fallback,
}

impl LoadPlan {
    /// Resource handle the plan owns, if any.
    pub(crate) fn handle(&self) -> Option<&str> {
        match self {
            Self::Image { handle } | Self::Video { handle } => Some(handle),
            _ => None,
        }
    }
}

/// Dependencies shared by every load.
#[derive(Clone)]
pub(crate) struct Loader {
    pub files: Arc<dyn FileStore>,
    pub http: Arc<dyn HttpClient>,
    pub decoder: Arc<dyn ImageDecoder>,
    pub resources: ResourceStore,
    pub slideshow: Arc<SlideshowCache>,
    pub remote: Arc<RemoteDailyFetcher>,
}

impl Loader {
    /// Reads a user file into a resource handle, decoding when needed.
    pub(crate) async fn file(&self, path: &str, media: MediaKind) -> Result<LoadPlan, BackdropError> {
        let data = self.files.read_file(path).await?;

        if data.is_empty() {
            tracing::warn!(path, "wallpaper file is empty");
            return Ok(LoadPlan::Fallback);
        }

        match media {
            MediaKind::Video => Ok(LoadPlan::Video {
                handle: self.resources.create(data),
            }),
            MediaKind::Image => {
                let extension = get_extension(path);
                let bytes = match self.decoder.decode(&extension, &data).await? {
                    Some(decoded) => {
                        tracing::debug!(path, extension = %extension, "decoded wallpaper image");
                        decoded
                    }
                    None => data,
                };
                Ok(LoadPlan::Image {
                    handle: self.resources.create(bytes),
                })
            }
        }
    }

    /// Picks the next slideshow image, writing the manifest on first use.
    pub(crate) async fn slideshow(&self, current: Option<&str>, origin: &str) -> Result<LoadPlan, BackdropError> {
        self.slideshow.ensure_manifest().await?;
        let next = self.slideshow.next_image(current, origin).await?;

        if next.url.is_empty() {
            tracing::info!("slideshow has no images");
            return Ok(LoadPlan::Fallback);
        }

        Ok(LoadPlan::Slideshow {
            url: next.url,
            preload: next.preload,
        })
    }

    /// Refreshes the daily remote image.
    ///
    /// A fresh image is probed when it has an alternative; the URL that
    /// actually loads is shown and recorded.
    pub(crate) async fn remote(
        &self,
        selector: &str,
        view_width: f64,
        current: Option<&str>,
    ) -> Result<LoadPlan, BackdropError> {
        match self.remote.refresh(selector, view_width).await? {
            RemoteOutcome::UpToDate { url: Some(url) } if current != Some(url.as_str()) => {
                Ok(LoadPlan::Remote { url, selector: None })
            }
            RemoteOutcome::UpToDate { .. } => Ok(LoadPlan::RemoteUnchanged),
            RemoteOutcome::Fetched(image) => {
                let url = match image.fallback {
                    Some(fallback) => match self.http.probe(&image.url).await {
                        Ok(true) => image.url,
                        Ok(false) => {
                            tracing::debug!(url = %image.url, "remote image unavailable, using alternative");
                            fallback
                        }
                        Err(err) => {
                            tracing::debug!(error = %err, "remote image probe failed, using alternative");
                            fallback
                        }
                    },
                    None => image.url,
                };

                Ok(LoadPlan::Remote {
                    selector: Some(remote_selector(&image.date, &url)),
                    url,
                })
            }
        }
    }
}
