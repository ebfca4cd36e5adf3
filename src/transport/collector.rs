//! Remote collector client.
//!
//! A submission is a single-shot POST. Only HTTP 200 counts as success; the
//! client never retries on its own.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

use super::envelope::{FORM_CONTENT_TYPE, FormBody};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one submission.
const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Collector Trait
// ============================================================================

/// Network capability that delivers one encrypted batch.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Submits the form body.
    ///
    /// # Errors
    ///
    /// - [`Error::CollectorStatus`] for any status other than 200
    /// - [`Error::Http`] for network errors and timeouts
    async fn submit(&self, body: &FormBody) -> Result<()>;
}

// ============================================================================
// HttpCollector
// ============================================================================

/// Collector reached over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: Client,
    endpoint: Url,
}

impl HttpCollector {
    /// Creates a collector client with the default 30s timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is not a valid URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_SUBMIT_TIMEOUT)
    }

    /// Creates a collector client with a custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is not a valid URL
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid collector endpoint: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn submit(&self, body: &FormBody) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.encode())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%status, endpoint = %self.endpoint, "Collector rejected batch");
            return Err(Error::collector_status(status.as_u16()));
        }

        debug!(endpoint = %self.endpoint, "Batch delivered");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one request with `status_line`, returning the raw request text.
    async fn serve_once(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}/collect", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.expect("read");
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length: ")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            stream.write_all(response.as_bytes()).await.expect("write");
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(HttpCollector::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_submit_posts_form_body() {
        let (url, server) = serve_once("HTTP/1.1 200 OK").await;
        let collector = HttpCollector::new(&url).unwrap();

        let body = FormBody::new("abc", "-_x").with_version("0.1.0");
        collector.submit(&body).await.expect("submit");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /collect"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/x-www-form-urlencoded")
        );
        assert!(request.ends_with("id=abc&batch=-_x&version=0.1.0"));
    }

    #[tokio::test]
    async fn test_submit_non_200_is_error() {
        let (url, server) = serve_once("HTTP/1.1 503 Service Unavailable").await;
        let collector = HttpCollector::new(&url).unwrap();

        let err = collector.submit(&FormBody::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, Error::CollectorStatus { status: 503 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/collect", listener.local_addr().unwrap());
        drop(listener);

        let collector = HttpCollector::with_timeout(&url, Duration::from_secs(2)).unwrap();
        let err = collector.submit(&FormBody::new("a", "b")).await.unwrap_err();
        assert!(err.is_transmission_error());
    }
}
