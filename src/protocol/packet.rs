//! Packet types.
//!
//! A [`Packet`] is the atomic protocol unit: a [`PacketType`] plus optional
//! text or binary data.
//!
//! # Packet Types
//!
//! | Type | Ordinal | Purpose |
//! |------|---------|---------|
//! | `Open` | 0 | Handshake from server |
//! | `Close` | 1 | Transport close request |
//! | `Ping` | 2 | Heartbeat probe |
//! | `Pong` | 3 | Heartbeat reply |
//! | `Message` | 4 | Application data |
//! | `Upgrade` | 5 | Transport upgrade |
//! | `Noop` | 6 | No-op (flushes a pending poll) |
//! | `Error` | - | Local decode failure, never transmitted |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Diagnostic text carried by packets that failed to decode.
pub const PARSER_ERROR: &str = "parser error";

// ============================================================================
// PacketType
// ============================================================================

/// Engine.IO packet type.
///
/// Ordinals are the wire encoding and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Handshake packet sent by the server.
    Open,
    /// Close request.
    Close,
    /// Heartbeat probe.
    Ping,
    /// Heartbeat reply.
    Pong,
    /// Application message.
    Message,
    /// Transport upgrade.
    Upgrade,
    /// No-op.
    Noop,
    /// Decode failure marker. Client-only; has no wire ordinal.
    Error,
}

impl PacketType {
    /// Returns the wire ordinal, or `None` for [`PacketType::Error`].
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> Option<u8> {
        match self {
            Self::Open => Some(0),
            Self::Close => Some(1),
            Self::Ping => Some(2),
            Self::Pong => Some(3),
            Self::Message => Some(4),
            Self::Upgrade => Some(5),
            Self::Noop => Some(6),
            Self::Error => None,
        }
    }

    /// Looks up a packet type by wire ordinal.
    #[inline]
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Message),
            5 => Some(Self::Upgrade),
            6 => Some(Self::Noop),
            _ => None,
        }
    }

    /// Returns the lowercase protocol name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PacketData
// ============================================================================

/// Packet payload: either text or opaque bytes, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketData {
    /// UTF-8 text data.
    Text(String),
    /// Raw binary data.
    Binary(Vec<u8>),
}

impl PacketData {
    /// Returns the text, if this is text data.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the bytes, if this is binary data.
    #[inline]
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Binary(bytes) => Some(bytes),
        }
    }

    /// Returns `true` for binary data.
    #[inline]
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

impl From<String> for PacketData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PacketData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for PacketData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for PacketData {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

// ============================================================================
// Packet
// ============================================================================

/// An Engine.IO packet.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    data: Option<PacketData>,
}

impl Packet {
    /// Creates a packet with optional data.
    #[inline]
    #[must_use]
    pub fn new(packet_type: PacketType, data: Option<PacketData>) -> Self {
        Self { packet_type, data }
    }

    /// Creates a packet without data.
    #[inline]
    #[must_use]
    pub fn empty(packet_type: PacketType) -> Self {
        Self::new(packet_type, None)
    }

    /// Creates a text packet.
    ///
    /// Any displayable value is coerced to its text form, so
    /// `Packet::text(PacketType::Message, 1)` carries `"1"`.
    #[inline]
    #[must_use]
    pub fn text(packet_type: PacketType, data: impl fmt::Display) -> Self {
        Self::new(packet_type, Some(PacketData::Text(data.to_string())))
    }

    /// Creates a binary packet.
    #[inline]
    #[must_use]
    pub fn binary(packet_type: PacketType, data: impl Into<Vec<u8>>) -> Self {
        Self::new(packet_type, Some(PacketData::Binary(data.into())))
    }

    /// Creates the packet produced by any decode failure.
    #[inline]
    #[must_use]
    pub fn parser_error() -> Self {
        Self::text(PacketType::Error, PARSER_ERROR)
    }

    /// Returns the packet type.
    #[inline]
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Returns the packet data, if any.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&PacketData> {
        self.data.as_ref()
    }

    /// Returns the text data, if the packet carries text.
    #[inline]
    #[must_use]
    pub fn text_data(&self) -> Option<&str> {
        self.data.as_ref().and_then(PacketData::as_text)
    }

    /// Returns the binary data, if the packet carries bytes.
    #[inline]
    #[must_use]
    pub fn binary_data(&self) -> Option<&[u8]> {
        self.data.as_ref().and_then(PacketData::as_binary)
    }

    /// Returns `true` if the packet carries binary data.
    #[inline]
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.data.as_ref().is_some_and(PacketData::is_binary)
    }

    /// Returns `true` if this is a decode failure marker.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.packet_type == PacketType::Error
    }

    /// Consumes the packet, returning its data.
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Option<PacketData> {
        self.data
    }
}

// ============================================================================
// Tests
// ============================================================================
