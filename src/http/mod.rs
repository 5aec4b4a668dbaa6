//! HTTP binding capability.
//!
//! The polling transport never performs I/O itself: it produces requests
//! that an [`HttpBinding`] executes. This module defines that boundary and
//! the fixed header surface of every request.
//!
//! # Header Surface
//!
//! | Header | Requests | Value |
//! |--------|----------|-------|
//! | `Accept` | all | `*/*` |
//! | `Content-type` | POST | `text/plain;charset=UTF-8` |
//!
//! Caller-supplied extra headers are merged afterwards and replace
//! same-named defaults. Header names are case-insensitive ([`HeaderMap`]).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `reqwest_binding` | [`reqwest`]-backed binding (feature `reqwest`) |

// ============================================================================
// Imports
// ============================================================================

use ::http::header::{ACCEPT, CONTENT_TYPE};
use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// reqwest-backed binding.
#[cfg(feature = "reqwest")]
pub mod reqwest_binding;

// ============================================================================
// Re-exports
// ============================================================================

pub use ::http::{HeaderMap, HeaderName, HeaderValue};
#[cfg(feature = "reqwest")]
pub use reqwest_binding::ReqwestBinding;

// ============================================================================
// Constants
// ============================================================================

/// Content type of every POST body.
pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

// ============================================================================
// Method
// ============================================================================

/// HTTP method used by the polling transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Long-poll read.
    Get,
    /// Payload write.
    Post,
}

impl Method {
    /// Returns the method name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

// ============================================================================
// HttpResponse
// ============================================================================

/// A completed HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: HeaderMap,

    /// Response body text (a payload wire unit for polls).
    pub body: String,
}

// ============================================================================
// HttpBinding
// ============================================================================

/// Executes single poll and write exchanges.
///
/// Implementations own connection pooling, TLS, timeouts and cookie
/// persistence. A non-success status must be reported as
/// [`Error::HttpStatus`](crate::Error::HttpStatus), carrying the response
/// headers.
#[async_trait]
pub trait HttpBinding: Send + Sync + 'static {
    /// Issues a long-lived GET. The response body is a payload.
    async fn poll(&self, uri: &str, headers: &HeaderMap) -> Result<HttpResponse>;

    /// Issues a POST carrying an encoded payload.
    async fn write(&self, uri: &str, headers: &HeaderMap, body: String) -> Result<HttpResponse>;
}

// ============================================================================
// Request Headers
// ============================================================================

/// Builds the headers for one request.
#[must_use]
pub fn request_headers(method: Method, extra_headers: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if method == Method::Post {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    }
    // Replaces every value of a same-named default.
    headers.extend(extra_headers.clone());
    headers
}

// ============================================================================
// Tests
// ============================================================================
