//! Engine.IO protocol types and codec.
//!
//! This module defines the packet model and the wire codec shared by all
//! transports.
//!
//! # Protocol Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | `Packet` | Both | Atomic protocol unit |
//! | Payload | Both | Ordered batch of packets sent as one HTTP body |
//! | `Handshake` | Server → Client | Session parameters in the `open` packet |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Packet and payload encode/decode |
//! | `handshake` | Open packet document |
//! | `packet` | Packet and PacketType |

// ============================================================================
// Submodules
// ============================================================================

/// Packet and payload encode/decode.
pub mod codec;

/// Handshake document.
pub mod handshake;

/// Packet types.
pub mod packet;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{
    EncodedPacket, RECORD_SEPARATOR, decode_binary_packet, decode_packet, decode_payload,
    decode_payload_to_vec, decode_text_packet, encode_packet, encode_payload,
};
pub use handshake::Handshake;
pub use packet::{PARSER_ERROR, Packet, PacketData, PacketType};
