//! Transport events and I/O actions.
//!
//! Transports are sans-io: they emit [`Event`]s upward and [`Action`]s for
//! the driver to execute against an [`HttpBinding`](crate::http::HttpBinding).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Error;
use crate::http::HeaderMap;
use crate::protocol::Packet;

// ============================================================================
// Event
// ============================================================================

/// Event observed on a transport.
///
/// Events are delivered in emission order.
#[derive(Debug, Clone)]
pub enum Event {
    /// Handshake completed; the transport is open and writable.
    Open,

    /// A decoded packet, in payload order.
    Packet(Packet),

    /// The transport closed. Terminal.
    Close,

    /// An I/O failure. Non-fatal; the transport state is unchanged.
    Error {
        /// Context such as `"xhr poll error"`.
        message: String,
        /// Underlying failure.
        cause: Option<Arc<Error>>,
    },

    /// The previous write completed; the transport is writable again.
    Drain,

    /// A poll request was issued.
    Poll,

    /// A poll response was fully processed.
    PollComplete,

    /// Headers of a request about to be sent, after the request headers hook ran.
    RequestHeaders(HeaderMap),

    /// Headers of a completed response, including failed statuses.
    ResponseHeaders(HeaderMap),
}

impl Event {
    /// Returns the event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Packet(_) => "packet",
            Self::Close => "close",
            Self::Error { .. } => "error",
            Self::Drain => "drain",
            Self::Poll => "poll",
            Self::PollComplete => "pollComplete",
            Self::RequestHeaders(_) => "requestHeaders",
            Self::ResponseHeaders(_) => "responseHeaders",
        }
    }

    /// Returns the packet if this is a [`Event::Packet`].
    #[inline]
    #[must_use]
    pub fn as_packet(&self) -> Option<&Packet> {
        match self {
            Self::Packet(packet) => Some(packet),
            _ => None,
        }
    }
}

// ============================================================================
// Action
// ============================================================================

/// I/O requested by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue a long-poll GET.
    Poll {
        /// Request URI.
        uri: String,
        /// Request headers.
        headers: HeaderMap,
    },

    /// POST an encoded payload.
    Write {
        /// Request URI.
        uri: String,
        /// Request headers.
        headers: HeaderMap,
        /// Encoded payload.
        body: String,
    },
}

impl Action {
    /// Returns the request URI.
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Poll { uri, .. } | Self::Write { uri, .. } => uri,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketType;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::Open.name(), "open");
        assert_eq!(Event::PollComplete.name(), "pollComplete");
        assert_eq!(
            Event::ResponseHeaders(HeaderMap::new()).name(),
            "responseHeaders"
        );
    }

    #[test]
    fn test_as_packet() {
        let event = Event::Packet(Packet::text(PacketType::Message, "hi"));
        assert_eq!(
            event.as_packet().and_then(Packet::text_data),
            Some("hi")
        );
        assert!(Event::Drain.as_packet().is_none());
    }

    #[test]
    fn test_action_uri() {
        let action = Action::Write {
            uri: "http://localhost/engine.io/".to_string(),
            headers: HeaderMap::new(),
            body: "41".to_string(),
        };
        assert_eq!(action.uri(), "http://localhost/engine.io/");
    }
}
