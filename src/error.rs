//! Error types for the Engine.IO polling client.
//!
//! This module defines all error types used throughout the crate.
//!
//! Note that malformed wire data is *not* an error at this level: the codec
//! degrades it to an [`PacketType::Error`](crate::protocol::PacketType::Error)
//! packet so callers always observe a uniform packet stream.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use engineio_polling::{Packet, PacketType, Result};
//!
//! async fn example(connection: &PollingConnection) -> Result<()> {
//!     connection.send(vec![Packet::text(PacketType::Message, "hello")]).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Url`] |
//! | Protocol violation | [`Error::NotOpen`], [`Error::NotWritable`], [`Error::Unsendable`] |
//! | Transport I/O | [`Error::Http`], [`Error::HttpStatus`], `Error::Reqwest` |
//! | Event loop | [`Error::ConnectionClosed`], [`Error::ChannelClosed`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use ::http::HeaderMap;
use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::protocol::PacketType;
use crate::transport::ReadyState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when transport options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // Protocol Violations
    // ========================================================================
    /// Send attempted while the transport is not open.
    ///
    /// Packets may only be written after the handshake completed.
    #[error("Transport not open (state: {state})")]
    NotOpen {
        /// State the transport was in when the send was attempted.
        state: ReadyState,
    },

    /// Send attempted while a previous write is still in flight.
    ///
    /// Callers must wait for the `drain` event before writing again.
    #[error("Transport not writable: previous write has not drained")]
    NotWritable,

    /// Send attempted with a packet that never goes on the wire.
    ///
    /// `error` packets only report local decode failures.
    #[error("Packet type {packet_type} cannot be sent")]
    Unsendable {
        /// Type of the rejected packet.
        packet_type: PacketType,
    },

    // ========================================================================
    // Transport I/O Errors
    // ========================================================================
    /// HTTP exchange failed before a response was received.
    #[error("HTTP error: {message}")]
    Http {
        /// Description of the failure.
        message: String,
    },

    /// HTTP exchange completed with a non-success status code.
    #[error("HTTP status {status}")]
    HttpStatus {
        /// Response status code.
        status: u16,

        /// Headers of the failed response.
        headers: HeaderMap,
    },

    /// Error raised by the reqwest client.
    #[cfg(feature = "reqwest")]
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    // ========================================================================
    // Event Loop Errors
    // ========================================================================
    /// The connection event loop has terminated.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-open error for the given state.
    #[inline]
    pub fn not_open(state: ReadyState) -> Self {
        Self::NotOpen { state }
    }

    /// Creates an HTTP error.
    #[inline]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Creates an HTTP status error without response headers.
    #[inline]
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// Returns the response headers of a failed HTTP exchange, if any.
    #[must_use]
    pub fn response_headers(&self) -> Option<&HeaderMap> {
        match self {
            Self::HttpStatus { headers, .. } => Some(headers),
            _ => None,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error is a caller-side protocol violation.
    #[inline]
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::NotOpen { .. } | Self::NotWritable | Self::Unsendable { .. }
        )
    }

    /// Returns `true` if this error came from the HTTP binding.
    #[inline]
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        #[cfg(feature = "reqwest")]
        if matches!(self, Self::Reqwest(_)) {
            return true;
        }
        matches!(self, Self::Http { .. } | Self::HttpStatus { .. })
    }

    /// Returns `true` if the event loop is gone.
    #[inline]
    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::ChannelClosed(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::http("connection reset");
        assert_eq!(err.to_string(), "HTTP error: connection reset");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("host must not be empty");
        assert_eq!(err.to_string(), "Configuration error: host must not be empty");
    }

    #[test]
    fn test_not_open_display() {
        let err = Error::not_open(ReadyState::Opening);
        assert_eq!(err.to_string(), "Transport not open (state: opening)");
    }

    #[test]
    fn test_is_protocol_violation() {
        assert!(Error::NotWritable.is_protocol_violation());
        assert!(Error::not_open(ReadyState::Closed).is_protocol_violation());
        assert!(!Error::http_status(500).is_protocol_violation());
    }

    #[test]
    fn test_unsendable_display() {
        let err = Error::Unsendable {
            packet_type: PacketType::Error,
        };
        assert!(err.is_protocol_violation());
        assert_eq!(err.to_string(), "Packet type error cannot be sent");
    }

    #[test]
    fn test_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("set-cookie", ::http::HeaderValue::from_static("io=1"));
        let err = Error::HttpStatus {
            status: 400,
            headers,
        };
        let cookie = err.response_headers().and_then(|h| h.get("set-cookie"));
        assert_eq!(cookie.map(|v| v.as_bytes()), Some(&b"io=1"[..]));
        assert!(Error::http("reset").response_headers().is_none());
    }

    #[test]
    fn test_is_io_error() {
        assert!(Error::http("reset").is_io_error());
        assert!(Error::http_status(502).is_io_error());
        assert!(!Error::NotWritable.is_io_error());
    }

    #[test]
    fn test_is_connection_closed() {
        assert!(Error::ConnectionClosed.is_connection_closed());
        assert!(!Error::config("x").is_connection_closed());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
