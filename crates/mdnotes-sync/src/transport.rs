//! Carrying out requests against a WebDAV server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::error::TransportError;
use crate::pipeline::TaskOutcome;
use crate::settings::{SyncSettings, normalize_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A server's answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
}

impl Response {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

impl From<Response> for TaskOutcome {
    fn from(response: Response) -> Self {
        TaskOutcome::Status {
            code: response.status,
            reason: response.reason,
        }
    }
}

/// The two WebDAV operations a sync run needs.
///
/// Paths are relative to the server's base URL. An `Err` means the request never got an answer;
/// any HTTP status, including errors, is an `Ok` response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a collection (`MKCOL`).
    async fn create_directory(&self, remote_path: &str) -> Result<Response, TransportError>;

    /// Store a file (`PUT`).
    async fn upload(&self, remote_path: &str, body: Vec<u8>) -> Result<Response, TransportError>;
}

/// [`Transport`] over HTTP with Basic authentication.
///
/// Remote paths are split at `/` and every segment is percent-encoded, so names containing `#`,
/// `?`, `%` or spaces reach the server unchanged.
#[derive(Debug, Clone)]
pub struct WebDavClient {
    client: Client,
    base_url: Url,
    mkcol: Method,
    username: String,
    password: String,
}

impl WebDavClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, TransportError> {
        let raw_url = normalize_url(&settings.url);
        let base_url = match Url::parse(&raw_url) {
            Ok(url) if !url.cannot_be_a_base() => url,
            Ok(_) => {
                return Err(TransportError::InvalidUrl {
                    url: raw_url,
                    reason: "URL cannot have a path".to_string(),
                });
            }
            Err(e) => {
                return Err(TransportError::InvalidUrl {
                    url: raw_url,
                    reason: e.to_string(),
                });
            }
        };
        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|e| TransportError::InvalidMethod(e.to_string()))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url,
            mkcol,
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The base URL extended by the segments of `remote_path`. A trailing `/` is kept.
    pub fn url(&self, remote_path: &str) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot have a path".to_string(),
            })?
            .pop_if_empty()
            .extend(remote_path.split('/'));
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, TransportError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "response");
        Ok(Response::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl Transport for WebDavClient {
    async fn create_directory(&self, remote_path: &str) -> Result<Response, TransportError> {
        let request = self.client.request(self.mkcol.clone(), self.url(remote_path)?);
        self.send(request).await
    }

    async fn upload(&self, remote_path: &str, body: Vec<u8>) -> Result<Response, TransportError> {
        let request = self
            .client
            .put(self.url(remote_path)?)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body);
        self.send(request).await
    }
}
