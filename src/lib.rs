//! Engine.IO polling client - packet codec and long-polling transport.
//!
//! This library implements the client side of the Engine.IO transport
//! protocol over HTTP long-polling.
//!
//! # Architecture
//!
//! The client is split into a pure core and pluggable I/O:
//!
//! - **Codec**: Stateless packet and payload encode/decode; never fails
//! - **Transport**: Sans-io state machine emitting events and HTTP actions
//! - **Connection**: Tokio event loop executing actions through an [`HttpBinding`]
//!
//! Key design principles:
//!
//! - One event loop task owns all transport state
//! - At most one poll and one write in flight
//! - Malformed wire data surfaces as `error` packets, I/O failures as events
//! - Cookie persistence is an explicit [`MemoryCookieJar`], never global
//!
//! # Quick Start
//!
//! ```no_run
//! use engineio_polling::{Event, Packet, PacketType, PollingConnection, Result, TransportOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = TransportOptions::from_url("http://localhost:3000")?;
//!     let connection = PollingConnection::with_reqwest(options)?;
//!
//!     connection.set_event_handler(Box::new(|event| {
//!         if let Event::Packet(packet) = event {
//!             println!("received {}", packet.packet_type());
//!         }
//!     }));
//!     connection.open()?;
//!
//!     // Once the `open` event has fired:
//!     connection
//!         .send(vec![Packet::text(PacketType::Message, "hello")])
//!         .await?;
//!
//!     connection.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cookie`] | Cookie store capability and in-memory jar |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | HTTP binding capability and header surface |
//! | [`protocol`] | Packets, payload codec, handshake |
//! | [`transport`] | Polling state machine and event loop |
//!
//! # Features
//!
//! - **`reqwest`** (default): [`ReqwestBinding`] HTTP binding

// ============================================================================
// Modules
// ============================================================================

/// Cookie persistence.
///
/// [`CookieStore`] is consulted around every request; [`MemoryCookieJar`]
/// is the bundled implementation.
pub mod cookie;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// HTTP binding capability.
///
/// The transport performs no I/O itself; an [`HttpBinding`] executes its
/// requests.
pub mod http;

/// Engine.IO protocol types and codec.
pub mod protocol;

/// Transport layer.
///
/// Long-polling state machine and the event loop that drives it.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Cookie types
pub use cookie::{CookieStore, MemoryCookieJar};

// Error types
pub use error::{Error, Result};

// HTTP types
pub use crate::http::{HeaderMap, HeaderName, HeaderValue, HttpBinding, HttpResponse, Method};
#[cfg(feature = "reqwest")]
pub use crate::http::ReqwestBinding;

// Protocol types
pub use protocol::{
    Handshake, Packet, PacketData, PacketType, decode_packet, decode_payload, encode_packet,
    encode_payload,
};

// Transport types
pub use transport::{
    Event, EventHandler, PollingConnection, PollingTransport, ReadyState, RequestHeadersHook,
    Transport, TransportOptions,
};
