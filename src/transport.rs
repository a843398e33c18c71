//! HTTP transport for RPC calls.
//!
//! The transport knows nothing about contracts or wire literals. It POSTs a
//! pre-serialized body to `https://host:port<path>` and hands back the raw
//! response text.
//!
//! # Request shape
//!
//! ```text
//! POST https://host:port/path
//! Content-Type: application/json
//! X-API-Key: <key>
//! cache-control: no-cache
//!
//! [arg1, arg2, ...]
//! ```

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use thiserror::Error;
use url::Url;

use crate::options::{ConfigError, RpcOptions};

/// Header carrying the access key.
const API_KEY_HEADER: &str = "x-api-key";

/// Transport-level error types.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured host/port do not form a valid origin.
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] ConfigError),

    /// The API key cannot be sent as a header value.
    #[error("Invalid API key header value")]
    InvalidKey,

    /// Building the HTTP client failed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request timed out waiting for response.
    #[error("Request to {path} timed out after {secs}s")]
    Timeout { path: String, secs: u64 },

    /// Connection, TLS or body read failure.
    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Something that can POST a body to a path and return the reply text.
///
/// Object safe so clients can hold an `Arc<dyn Transport>`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `path` and return the response body verbatim.
    ///
    /// `None` means no request body is attached.
    async fn post(&self, path: &str, body: Option<String>) -> Result<String, TransportError>;
}

/// [`Transport`] over HTTPS using a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    origin: Url,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Build a client for the endpoint described by `options`.
    ///
    /// Certificate validation is skipped unless `options.verify` is set.
    pub fn new(options: &RpcOptions) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            HeaderValue::from_str(&options.key).map_err(|_| TransportError::InvalidKey)?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            client,
            origin: options.origin()?,
            timeout_secs: options.timeout.as_secs(),
        })
    }

    /// Full URL for a request path.
    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.origin.as_str().trim_end_matches('/'), path)
    }

    fn request_error(&self, path: &str, source: reqwest::Error) -> TransportError {
        if source.is_timeout() {
            TransportError::Timeout {
                path: path.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            TransportError::Request {
                path: path.to_string(),
                source,
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Option<String>) -> Result<String, TransportError> {
        let url = self.url_for(path);
        tracing::debug!(%url, body = body.as_deref().unwrap_or(""), "POST");

        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(path, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "Server returned non-success status");
        }

        response.text().await.map_err(|e| self.request_error(path, e))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_url_for_appends_path() {
        let transport = HttpTransport::new(&RpcOptions::new("localhost", 3000, "key")).unwrap();
        assert_eq!(transport.url_for("/kont"), "https://localhost:3000/kont");
        assert_eq!(
            transport.url_for("/stdlib/formatCurrency"),
            "https://localhost:3000/stdlib/formatCurrency"
        );
    }

    #[test]
    fn test_new_rejects_bad_key() {
        let result = HttpTransport::new(&RpcOptions::new("localhost", 3000, "bad\nkey"));
        assert!(matches!(result, Err(TransportError::InvalidKey)));
    }

    #[test]
    fn test_new_rejects_bad_host() {
        let result = HttpTransport::new(&RpcOptions::new("bad host", 3000, "key"));
        assert!(matches!(result, Err(TransportError::Endpoint(_))));
    }

    #[test]
    fn test_timeout_recorded() {
        let opts = RpcOptions::new("localhost", 3000, "key").with_timeout(Duration::from_secs(9));
        let transport = HttpTransport::new(&opts).unwrap();
        assert_eq!(transport.timeout_secs, 9);
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Timeout {
            path: "/kont".to_string(),
            secs: 5,
        };
        assert_eq!(err.to_string(), "Request to /kont timed out after 5s");
        assert_eq!(
            TransportError::InvalidKey.to_string(),
            "Invalid API key header value"
        );
    }

    #[tokio::test]
    #[ignore] // Requires loopback networking with port 9 closed
    async fn test_unreachable_server_is_request_error() {
        // Port 9 (discard) on loopback is expected to refuse connections.
        let opts = RpcOptions::new("127.0.0.1", 9, "key").with_timeout(Duration::from_secs(2));
        let transport = HttpTransport::new(&opts).unwrap();
        let result = transport.post("/ping", None).await;
        assert!(result.is_err());
    }
}
