//! Transport layer.
//!
//! Turns logical packets into HTTP long-poll exchanges.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  commands   ┌──────────────────────────┐
//! │  PollingConnection   │────────────►│  event loop task         │
//! │  (Rust API, clones)  │◄────────────│  owns PollingTransport   │
//! └──────────────────────┘   events    └────────────┬─────────────┘
//!                                          actions  │  ▲ completions
//!                                                   ▼  │
//!                                      ┌──────────────────────────┐
//!                                      │  HttpBinding (spawned)   │
//!                                      └──────────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `PollingConnection::new` - Validate options and spawn the event loop
//! 2. `PollingConnection::open` - Issue the first poll
//! 3. Server `open` packet - Transport becomes writable, `sid` joins the query
//! 4. `PollingConnection::send` - One POST per batch, `drain` when done
//! 5. `PollingConnection::close` - Close packet, then `close` event
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `base` | `ReadyState`, `TransportCore`, `Transport` trait |
//! | `connection` | Event loop and public handle |
//! | `event` | Events and I/O actions |
//! | `options` | `TransportOptions` |
//! | `polling` | Long-polling state machine |
//! | `uri` | Request URI construction |
//! | `yeast` | Cache-busting ids |

// ============================================================================
// Submodules
// ============================================================================

/// Shared transport state machine.
pub mod base;

/// Polling connection and event loop.
pub mod connection;

/// Events and actions.
pub mod event;

/// Transport configuration.
pub mod options;

/// Long-polling transport.
pub mod polling;

/// Request URI construction.
pub mod uri;

/// Cache-busting ids.
pub mod yeast;

// ============================================================================
// Re-exports
// ============================================================================

pub use base::{ReadyState, Transport, TransportCore};
pub use connection::{EventHandler, PollingConnection};
pub use event::{Action, Event};
pub use options::TransportOptions;
pub use polling::{PauseCallback, PollingTransport, RequestHeadersHook};
pub use yeast::Yeast;
