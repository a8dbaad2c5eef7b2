//! Boundary to the authenticated session that carries requests.
//!
//! Authentication, cookies, and retry policy live with the caller. The sync
//! core only needs to POST a JSON body and read back a JSON document.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;

use crate::error::TransportError;

/// POST capability used by the fetcher and resolver.
///
/// Implementations must not retry on their own account; any error they return
/// fails the current refresh.
#[async_trait]
pub trait ZoneTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T: ZoneTransport + ?Sized> ZoneTransport for std::sync::Arc<T> {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        (**self).post_json(url, body).await
    }
}

/// `reqwest`-backed transport.
///
/// Pass a client that already carries the session's cookie store, or extra
/// headers through `with_headers`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            headers: HeaderMap::new(),
        }
    }

    /// Build a transport with its own client and request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

#[async_trait]
impl ZoneTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        // The database endpoints expect a JSON body labelled as plain text.
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status,
                body: error_excerpt(&body),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|error| {
            TransportError::envelope(format!(
                "response is not JSON ({error}): {}",
                error_excerpt(&text)
            ))
        })
    }
}

/// First 180 characters of a response body, for error messages.
fn error_excerpt(body: &str) -> String {
    body.trim().chars().take(180).collect()
}
