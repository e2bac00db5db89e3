//! Daily remote image.
//!
//! The astronomy picture endpoint publishes one image per day. The date of
//! the last fetch is embedded in the selector, so a refresh on the same day in
//! US Eastern time issues no request at all.

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::mode::{ResolveContext, WallpaperMode, resolve};
use crate::constants::YOUTUBE_THUMBNAIL_BASE;
use crate::platform::net::{HttpClient, HttpError};
use crate::platform::time::{Clock, date_stamp, eastern_today};

static YOUTUBE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/|v/)|youtu\.be/)([\w-]{11})").ok()
});

/// Errors raised while refreshing the daily image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The request failed.
    #[error(transparent)]
    Http(#[from] HttpError),
    /// The configured endpoint is not a URL.
    #[error("Invalid remote endpoint {0}")]
    Endpoint(String),
    /// The response was not a picture description.
    #[error("Unexpected remote payload: {0}")]
    Payload(String),
    /// The response carried no image URL.
    #[error("Remote payload has no image")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    date: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    hdurl: String,
}

/// A freshly fetched daily image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    /// Publication date stamp.
    pub date: String,
    /// URL to display.
    pub url: String,
    /// URL to display if `url` fails a probe.
    pub fallback: Option<String>,
}

/// Result of [`RemoteDailyFetcher::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Already fetched today. Carries the URL recorded in the selector.
    UpToDate {
        /// Recorded URL.
        url: Option<String>,
    },
    /// Fetched a new image.
    Fetched(RemoteImage),
}

/// Whether `url` points at a video-hosting page.
#[must_use]
pub fn is_youtube_url(url: &str) -> bool { url.contains("youtube.com") || url.contains("youtu.be") }

/// Video id inside a video-hosting URL.
#[must_use]
pub fn youtube_id(url: &str) -> Option<&str> {
    YOUTUBE_ID
        .as_ref()?
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str())
}

/// Fetches and memoizes one image per calendar day.
pub struct RemoteDailyFetcher {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    endpoint: String,
    api_key: String,
    hd_width_threshold: f64,
}

impl RemoteDailyFetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new(
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        endpoint: &str,
        api_key: &str,
        hd_width_threshold: u32,
    ) -> Self {
        Self {
            http,
            clock,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            hd_width_threshold: f64::from(hd_width_threshold),
        }
    }

    /// Today in the reference time zone.
    #[must_use]
    pub fn today(&self) -> NaiveDate { eastern_today(self.clock.now()) }

    fn request_url(&self) -> Result<String, RemoteError> {
        let mut url = Url::parse(&self.endpoint).map_err(|_| RemoteError::Endpoint(self.endpoint.clone()))?;
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url.into())
    }

    /// Fetches today's image unless `selector` already records it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload has no image.
    pub async fn refresh(&self, selector: &str, view_width: f64) -> Result<RemoteOutcome, RemoteError> {
        let (date, recorded_url) = match resolve(selector, ResolveContext::default()) {
            WallpaperMode::RemoteDaily { date, url } => (date, url),
            _ => (None, None),
        };
        let today = self.today();

        if date == Some(today) {
            tracing::debug!(date = %today, "daily image already fetched");
            return Ok(RemoteOutcome::UpToDate { url: recorded_url });
        }

        let body = self.http.get_json(&self.request_url()?).await?;
        let payload: Payload =
            serde_json::from_value(body).map_err(|err| RemoteError::Payload(err.to_string()))?;

        let image = self.choose(payload, view_width, today)?;
        tracing::info!(date = %image.date, url = %image.url, "fetched daily image");
        Ok(RemoteOutcome::Fetched(image))
    }

    fn choose(&self, payload: Payload, view_width: f64, today: NaiveDate) -> Result<RemoteImage, RemoteError> {
        let Payload { date, url, hdurl } = payload;

        if url.is_empty() && hdurl.is_empty() {
            return Err(RemoteError::Empty);
        }

        let preferred = if view_width > self.hd_width_threshold { &hdurl } else { &url };
        let chosen = if preferred.is_empty() {
            if url.is_empty() { hdurl.clone() } else { url.clone() }
        } else {
            preferred.clone()
        };

        let video_id = youtube_id(&chosen).filter(|_| is_youtube_url(&chosen)).map(str::to_string);

        let (display, fallback) = match video_id {
            Some(id) => (
                format!("{YOUTUBE_THUMBNAIL_BASE}/{id}/maxresdefault.jpg"),
                Some(format!("{YOUTUBE_THUMBNAIL_BASE}/{id}/hqdefault.jpg")),
            ),
            None if !url.is_empty() && !hdurl.is_empty() && url != hdurl => {
                let other = if chosen == url { hdurl } else { url };
                (chosen, Some(other))
            }
            None => (chosen, None),
        };

        let date = if date.is_empty() { date_stamp(today) } else { date };

        Ok(RemoteImage {
            date,
            url: display,
            fallback,
        })
    }
}
