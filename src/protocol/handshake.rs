//! Handshake document carried by the server's `open` packet.
//!
//! # Format
//!
//! ```json
//! {
//!   "sid": "lv_VI97HAXpY6yYWAAAC",
//!   "upgrades": ["websocket"],
//!   "pingInterval": 25000,
//!   "pingTimeout": 20000,
//!   "maxPayload": 1000000
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

use super::packet::{Packet, PacketType};

// ============================================================================
// Handshake
// ============================================================================

/// Session parameters announced by the server on open.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Session id, sent back as the `sid` query parameter.
    pub sid: String,

    /// Transports the session may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,

    /// Server ping interval in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,

    /// Server ping timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,

    /// Maximum payload size in bytes accepted by the server.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Parses the handshake from an `open` packet.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the packet is not a text `open` packet
    /// - [`Error::Json`] if the document is malformed
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        if packet.packet_type() != PacketType::Open {
            return Err(Error::config(format!(
                "expected open packet, got {}",
                packet.packet_type()
            )));
        }

        let text = packet
            .text_data()
            .ok_or_else(|| Error::config("open packet carries no handshake"))?;

        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if the server offers the named upgrade.
    #[inline]
    #[must_use]
    pub fn can_upgrade_to(&self, transport: &str) -> bool {
        self.upgrades
            .iter()
            .any(|upgrade| upgrade.eq_ignore_ascii_case(transport))
    }

    /// Returns the ping interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval)
    }

    /// Returns the ping timeout as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout)
    }
}

// ============================================================================
// Tests
// ============================================================================
