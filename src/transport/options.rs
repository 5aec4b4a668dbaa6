//! Transport configuration.
//!
//! # Example
//!
//! ```ignore
//! use engineio_polling::TransportOptions;
//!
//! let options = TransportOptions::new("chat.example.com")
//!     .with_secure(true)
//!     .with_query("token", "abc")
//!     .with_timestamp_requests(true)
//!     .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer t"))
//!     .with_polling_cookies(true);
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{Error, Result};
use crate::http::{HeaderMap, HeaderName, HeaderValue};

// ============================================================================
// Constants
// ============================================================================

/// Default Engine.IO endpoint path.
pub const DEFAULT_PATH: &str = "/engine.io/";

/// Default cache-busting query parameter name.
pub const DEFAULT_TIMESTAMP_PARAM: &str = "t";

/// Engine.IO protocol revision announced in the query.
pub const PROTOCOL_VERSION: &str = "4";

// ============================================================================
// TransportOptions
// ============================================================================

/// Polling transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransportOptions {
    /// Server host name or IP address.
    pub host: String,

    /// Server port; `None` uses the scheme default.
    pub port: Option<u16>,

    /// Endpoint path.
    pub path: String,

    /// Query parameters, in order.
    pub query: Vec<(String, String)>,

    /// Use `https`.
    pub secure: bool,

    /// Add a cache-busting parameter to every request.
    pub timestamp_requests: bool,

    /// Name of the cache-busting parameter.
    pub timestamp_param: String,

    /// Headers added to every request, overriding defaults.
    #[serde(deserialize_with = "deserialize_headers")]
    pub extra_headers: HeaderMap,

    /// Persist cookies across polling requests.
    pub enable_polling_cookies: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            path: DEFAULT_PATH.to_string(),
            query: vec![
                ("EIO".to_string(), PROTOCOL_VERSION.to_string()),
                ("transport".to_string(), "polling".to_string()),
            ],
            secure: false,
            timestamp_requests: false,
            timestamp_param: DEFAULT_TIMESTAMP_PARAM.to_string(),
            extra_headers: HeaderMap::new(),
            enable_polling_cookies: false,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportOptions {
    /// Creates options for `host` with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Parses options from a server URL such as `https://host:8443/socket/?k=v`.
    ///
    /// The scheme selects `secure`, a non-root path replaces the default
    /// path, and query pairs are added to the default query.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL is malformed
    /// - [`Error::Config`] if the URL has no host or an unsupported scheme
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;

        let secure = match url.scheme() {
            "http" | "ws" => false,
            "https" | "wss" => true,
            other => return Err(Error::config(format!("unsupported scheme: {other}"))),
        };

        let host = url
            .host_str()
            .ok_or_else(|| Error::config("URL has no host"))?
            .trim_start_matches('[')
            .trim_end_matches(']');

        let mut options = Self::new(host).with_secure(secure);
        options.port = url.port();

        if url.path() != "/" {
            options.path = url.path().to_string();
        }

        for (key, value) in url.query_pairs() {
            options = options.with_query(key, value);
        }

        Ok(options)
    }

    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportOptions {
    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the endpoint path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets a query parameter, replacing an existing one with the same key.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        match self.query.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    /// Enables or disables `https`.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Enables or disables cache-busting parameters.
    #[inline]
    #[must_use]
    pub fn with_timestamp_requests(mut self, enabled: bool) -> Self {
        self.timestamp_requests = enabled;
        self
    }

    /// Sets the cache-busting parameter name.
    #[inline]
    #[must_use]
    pub fn with_timestamp_param(mut self, param: impl Into<String>) -> Self {
        self.timestamp_param = param.into();
        self
    }

    /// Adds a header sent with every request, replacing any previous value.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    /// Enables or disables cookie persistence.
    #[inline]
    #[must_use]
    pub fn with_polling_cookies(mut self, enabled: bool) -> Self {
        self.enable_polling_cookies = enabled;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty, the path does not
    /// start with `/`, or the timestamp parameter name is empty while
    /// timestamps are enabled.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }

        if !self.path.starts_with('/') {
            return Err(Error::config(format!(
                "path must start with '/': {}",
                self.path
            )));
        }

        if self.timestamp_requests && self.timestamp_param.is_empty() {
            return Err(Error::config("timestamp parameter name must not be empty"));
        }

        Ok(())
    }

    /// Returns the value of a query parameter.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// Reads `{"Name": ["value", ...]}` into a header map.
fn deserialize_headers<'de, D>(deserializer: D) -> std::result::Result<HeaderMap, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
    let mut headers = HeaderMap::new();
    for (name, values) in raw {
        let name = HeaderName::try_from(name.as_str()).map_err(D::Error::custom)?;
        for value in values {
            let value = HeaderValue::try_from(value).map_err(D::Error::custom)?;
            headers.append(name.clone(), value);
        }
    }
    Ok(headers)
}

// ============================================================================
// Tests
// ============================================================================
