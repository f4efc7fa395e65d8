//! HTTP client abstraction for testability

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the HTTP transport.
///
/// These are transport-level failures only. Whether a well-formed response
/// means "found" or "not found" is decided by the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a non-success status. `body` is whatever
    /// could be read of the response, possibly empty.
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Connection, DNS or TLS failure.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The response body could not be read.
    #[error("failed to read response from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes or an error.
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        (**self).get(url)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for Box<T> {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        (**self).get(url)
    }
}

/// Real HTTP client implementation using reqwest.
///
/// Every request carries the configured `User-Agent`. The timeout is
/// optional: `None` leaves the request unbounded.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    timeout: Option<Duration>,
}

impl ReqwestClient {
    /// Creates a client without a request timeout.
    pub fn new(user_agent: &str) -> Result<Self, HttpError> {
        Self::build(user_agent, None)
    }

    /// Creates a client that aborts requests after `timeout`.
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        Self::build(user_agent, Some(timeout))
    }

    fn build(user_agent: &str, timeout: Option<Duration>) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                }
            } else {
                HttpError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: response.text().unwrap_or_default(),
            });
        }

        response.bytes().map(|b| b.to_vec()).map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                }
            } else {
                HttpError::Body {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}
