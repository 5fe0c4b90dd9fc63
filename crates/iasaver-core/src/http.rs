//! HTTP collaborator used for the remote rule list and the archive endpoints.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the HTTP collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response was received (DNS, connect, TLS, timeout...).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::Client(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase for the status, if known.
    pub status_text: String,
    /// Response body as text.
    pub body: String,
    /// URL reached after following redirects.
    pub final_url: String,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues a GET and returns whatever response arrives, success or not.
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// [`HttpClient`] backed by `reqwest`.
///
/// The client keeps no cookie store, so page requests are anonymous.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("IASaver/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
            final_url,
        })
    }
}
