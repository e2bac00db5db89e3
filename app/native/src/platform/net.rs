//! Network fetch capability.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;

/// Request timeout for JSON fetches and probes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors reported by an [`HttpClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The request could not be sent or the connection failed.
    #[error("Request to {url} failed: {message}")]
    Request {
        /// Requested URL.
        url: String,
        /// Transport message.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },
    /// The body was not valid JSON.
    #[error("Invalid JSON from {url}: {message}")]
    Body {
        /// Requested URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

/// Boxed future returned by [`HttpClient`] operations.
pub type HttpFuture<'a, T> = BoxFuture<'a, Result<T, HttpError>>;

/// Minimal HTTP capability used by the daily remote image.
pub trait HttpClient: Send + Sync {
    /// GETs `url` and parses the body as JSON.
    fn get_json<'a>(&'a self, url: &'a str) -> HttpFuture<'a, serde_json::Value>;

    /// GETs `url` and reports whether the response status was a success.
    ///
    /// The body is ignored.
    fn probe<'a>(&'a self, url: &'a str) -> HttpFuture<'a, bool>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("backdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| HttpError::Request {
                url: String::new(),
                message: err.to_string(),
            })?;

        Ok(Self { client })
    }
}

fn request_error(url: &str, err: &reqwest::Error) -> HttpError {
    HttpError::Request {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl HttpClient for ReqwestClient {
    fn get_json<'a>(&'a self, url: &'a str) -> HttpFuture<'a, serde_json::Value> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|err| request_error(url, &err))?;

            if !response.status().is_success() {
                return Err(HttpError::Status {
                    url: url.to_string(),
                    status: response.status().as_u16(),
                });
            }

            response.json().await.map_err(|err| HttpError::Body {
                url: url.to_string(),
                message: err.to_string(),
            })
        })
    }

    fn probe<'a>(&'a self, url: &'a str) -> HttpFuture<'a, bool> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|err| request_error(url, &err))?;
            Ok(response.status().is_success())
        })
    }
}

#[derive(Debug, Default)]
struct StubState {
    json: Vec<(String, Result<serde_json::Value, HttpError>)>,
    probes: Vec<(String, bool)>,
    requests: Vec<String>,
}

/// Scripted [`HttpClient`] that records every request.
///
/// Responses are matched by URL prefix, first registration wins. Unmatched
/// JSON requests fail with a 404 status, unmatched probes succeed.
#[derive(Debug, Clone, Default)]
pub struct StubHttpClient {
    state: Arc<Mutex<StubState>>,
}

impl StubHttpClient {
    /// Creates a stub with no scripted responses.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Answers JSON requests starting with `prefix` with `body`.
    #[must_use]
    pub fn with_json(self, prefix: &str, body: serde_json::Value) -> Self {
        self.state.lock().json.push((prefix.to_string(), Ok(body)));
        self
    }

    /// Fails JSON requests starting with `prefix` with `error`.
    #[must_use]
    pub fn with_json_error(self, prefix: &str, error: HttpError) -> Self {
        self.state.lock().json.push((prefix.to_string(), Err(error)));
        self
    }

    /// Answers probes of URLs starting with `prefix` with `ok`.
    #[must_use]
    pub fn with_probe(self, prefix: &str, ok: bool) -> Self {
        self.state.lock().probes.push((prefix.to_string(), ok));
        self
    }

    /// Every URL requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> { self.state.lock().requests.clone() }

    /// Number of requests so far.
    #[must_use]
    pub fn request_count(&self) -> usize { self.state.lock().requests.len() }
}

impl HttpClient for StubHttpClient {
    fn get_json<'a>(&'a self, url: &'a str) -> HttpFuture<'a, serde_json::Value> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.requests.push(url.to_string());

            state
                .json
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                .map_or_else(
                    || {
                        Err(HttpError::Status {
                            url: url.to_string(),
                            status: 404,
                        })
                    },
                    |(_, response)| response.clone(),
                )
        })
    }

    fn probe<'a>(&'a self, url: &'a str) -> HttpFuture<'a, bool> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.requests.push(url.to_string());

            Ok(state
                .probes
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix.as_str()))
                .is_none_or(|(_, ok)| *ok))
        })
    }
}
