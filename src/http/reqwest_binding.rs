//! [`reqwest`]-backed [`HttpBinding`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};
use url::Url;

use crate::cookie::{CookieStore, MemoryCookieJar};
use crate::error::{Error, Result};
use crate::transport::TransportOptions;

use super::{HeaderMap, HttpBinding, HttpResponse, Method};

// ============================================================================
// ReqwestBinding
// ============================================================================

/// HTTP binding using a shared [`reqwest::Client`].
///
/// Cloning is cheap; clones share the connection pool and cookie store.
#[derive(Clone, Default)]
pub struct ReqwestBinding {
    client: reqwest::Client,
    cookies: Option<Arc<dyn CookieStore>>,
}

impl ReqwestBinding {
    /// Creates a binding with a default client and no cookie store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a binding whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reqwest`] if the client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            cookies: None,
        }
    }

    /// Attaches a cookie store consulted around every request.
    #[must_use]
    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    /// Creates a binding configured from transport options.
    ///
    /// A fresh [`MemoryCookieJar`] is attached when
    /// `enable_polling_cookies` is set.
    #[must_use]
    pub fn from_options(options: &TransportOptions) -> Self {
        let binding = Self::new();
        if options.enable_polling_cookies {
            binding.with_cookie_store(Arc::new(MemoryCookieJar::new()))
        } else {
            binding
        }
    }

    /// Returns `true` if a cookie store is attached.
    #[inline]
    #[must_use]
    pub fn has_cookie_store(&self) -> bool {
        self.cookies.is_some()
    }

    async fn execute(
        &self,
        method: Method,
        uri: &str,
        headers: &HeaderMap,
        body: Option<String>,
    ) -> Result<HttpResponse> {
        let url = Url::parse(uri)?;

        let mut request_headers = headers.clone();
        if let Some(store) = &self.cookies {
            request_headers.extend(store.load_for_request(&url));
        }

        let mut builder = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        }
        .headers(request_headers);

        if let Some(body) = body {
            builder = builder.body(body);
        }

        trace!(method = method.as_str(), %url, "Sending request");

        let response = builder.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();

        if let Some(store) = &self.cookies {
            store.save_from_response(&url, &response_headers);
        }

        if !status.is_success() {
            debug!(method = method.as_str(), status = status.as_u16(), "Request failed");
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                headers: response_headers,
            });
        }

        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }
}

impl std::fmt::Debug for ReqwestBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestBinding")
            .field("cookies", &self.cookies.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpBinding for ReqwestBinding {
    async fn poll(&self, uri: &str, headers: &HeaderMap) -> Result<HttpResponse> {
        self.execute(Method::Get, uri, headers, None).await
    }

    async fn write(&self, uri: &str, headers: &HeaderMap, body: String) -> Result<HttpResponse> {
        self.execute(Method::Post, uri, headers, Some(body)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
