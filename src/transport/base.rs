//! Shared transport state machine.
//!
//! Every concrete transport composes a [`TransportCore`] and implements the
//! [`Transport`] hooks; the lifecycle itself lives in the trait's provided
//! methods.
//!
//! # States
//!
//! ```text
//! Opening ──open packet──► Open ──pause──► Paused
//!    │                      │
//!    └──────── close ───────┴────────────► Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Packet;

use super::event::{Action, Event};

// ============================================================================
// ReadyState
// ============================================================================

/// Transport lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadyState {
    /// Handshake in flight.
    #[default]
    Opening,
    /// Handshake completed.
    Open,
    /// Parked by the pause protocol.
    Paused,
    /// Terminal.
    Closed,
}

impl ReadyState {
    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransportCore
// ============================================================================

/// State shared by all transport variants.
#[derive(Debug)]
pub struct TransportCore {
    name: &'static str,
    ready_state: ReadyState,
    writable: bool,
    started: bool,
    events: VecDeque<Event>,
    actions: VecDeque<Action>,
}

impl TransportCore {
    /// Creates a core in [`ReadyState::Opening`].
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ready_state: ReadyState::Opening,
            writable: false,
            started: false,
            events: VecDeque::new(),
            actions: VecDeque::new(),
        }
    }

    /// Returns the transport name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Sets the current state.
    #[inline]
    pub fn set_ready_state(&mut self, state: ReadyState) {
        if self.ready_state != state {
            trace!(transport = self.name, from = %self.ready_state, to = %state, "State change");
            self.ready_state = state;
        }
    }

    /// Returns `true` if a new write may be issued.
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Sets the writable flag.
    #[inline]
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    /// Queues an event.
    #[inline]
    pub fn emit(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Queues an I/O action.
    #[inline]
    pub fn push_action(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    /// Handshake completed.
    pub fn on_open(&mut self) {
        debug!(transport = self.name, "Transport open");
        self.set_ready_state(ReadyState::Open);
        self.writable = true;
        self.emit(Event::Open);
    }

    /// Transport closed.
    pub fn on_close(&mut self) {
        debug!(transport = self.name, "Transport closed");
        self.set_ready_state(ReadyState::Closed);
        self.emit(Event::Close);
    }

    /// Dispatches a decoded packet.
    #[inline]
    pub fn on_packet(&mut self, packet: Packet) {
        self.emit(Event::Packet(packet));
    }

    /// Reports an I/O failure.
    pub fn on_error(&mut self, message: &str, cause: Error) {
        debug!(transport = self.name, error = %cause, "{message}");
        self.emit(Event::Error {
            message: message.to_string(),
            cause: Some(Arc::new(cause)),
        });
    }
}

// ============================================================================
// Transport
// ============================================================================

/// A physical transport.
///
/// Implementors provide the hooks; the lifecycle methods are provided.
pub trait Transport {
    /// Returns the shared core.
    fn core(&self) -> &TransportCore;

    /// Returns the shared core mutably.
    fn core_mut(&mut self) -> &mut TransportCore;

    /// Starts the handshake.
    fn do_open(&mut self);

    /// Performs the variant's close.
    ///
    /// Returns `false` if the close was deferred; the variant then closes
    /// the core itself once it can.
    fn do_close(&mut self) -> bool;

    /// Issues one outbound write of `packets`.
    fn write(&mut self, packets: Vec<Packet>);

    /// Builds the connection URI.
    fn uri(&mut self) -> String;

    /// Returns the transport name.
    fn name(&self) -> &'static str {
        self.core().name()
    }

    /// Returns the current state.
    fn ready_state(&self) -> ReadyState {
        self.core().ready_state()
    }

    /// Returns `true` if a new write may be issued.
    fn is_writable(&self) -> bool {
        self.core().is_writable()
    }

    /// Opens the transport. Only the first call has an effect.
    fn open(&mut self) {
        let core = self.core_mut();
        if core.started || core.ready_state != ReadyState::Opening {
            return;
        }
        core.started = true;
        self.do_open();
    }

    /// Closes the transport if it is opening or open.
    fn close(&mut self) {
        if !matches!(self.ready_state(), ReadyState::Opening | ReadyState::Open) {
            return;
        }
        if self.do_close() {
            self.core_mut().on_close();
        }
    }

    /// Sends packets as one write.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsendable`] if the batch holds an `error` packet
    /// - [`Error::NotOpen`] unless the transport is open
    /// - [`Error::NotWritable`] while a previous write has not drained
    fn send(&mut self, packets: Vec<Packet>) -> Result<()> {
        if let Some(packet) = packets.iter().find(|packet| packet.is_error()) {
            return Err(Error::Unsendable {
                packet_type: packet.packet_type(),
            });
        }

        match self.ready_state() {
            ReadyState::Open if self.is_writable() => {
                self.write(packets);
                Ok(())
            }
            ReadyState::Open => Err(Error::NotWritable),
            state => Err(Error::not_open(state)),
        }
    }

    /// Pops the next queued event.
    fn next_event(&mut self) -> Option<Event> {
        self.core_mut().events.pop_front()
    }

    /// Pops the next queued action.
    fn next_action(&mut self) -> Option<Action> {
        self.core_mut().actions.pop_front()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketType;

    /// Minimal variant that opens and writes synchronously.
    struct Loopback {
        core: TransportCore,
        written: Vec<Vec<Packet>>,
    }

    impl Loopback {
        fn new() -> Self {
            Self {
                core: TransportCore::new("loopback"),
                written: Vec::new(),
            }
        }
    }

    impl Transport for Loopback {
        fn core(&self) -> &TransportCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut TransportCore {
            &mut self.core
        }

        fn do_open(&mut self) {
            self.core.on_open();
        }

        fn do_close(&mut self) -> bool {
            true
        }

        fn write(&mut self, packets: Vec<Packet>) {
            self.core.set_writable(false);
            self.written.push(packets);
        }

        fn uri(&mut self) -> String {
            "loopback://".to_string()
        }
    }

    fn drain_events(transport: &mut impl Transport) -> Vec<&'static str> {
        std::iter::from_fn(|| transport.next_event())
            .map(|event| event.name())
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let transport = Loopback::new();
        assert_eq!(transport.ready_state(), ReadyState::Opening);
        assert!(!transport.is_writable());
        assert_eq!(transport.name(), "loopback");
    }

    #[test]
    fn test_open_runs_once() {
        let mut transport = Loopback::new();
        transport.open();
        transport.open();
        assert_eq!(transport.ready_state(), ReadyState::Open);
        assert_eq!(drain_events(&mut transport), vec!["open"]);
    }

    #[test]
    fn test_send_requires_open() {
        let mut transport = Loopback::new();
        let err = transport
            .send(vec![Packet::text(PacketType::Message, "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotOpen {
                state: ReadyState::Opening
            }
        ));
    }

    #[test]
    fn test_send_requires_writable() {
        let mut transport = Loopback::new();
        transport.open();

        transport
            .send(vec![Packet::text(PacketType::Message, "a")])
            .expect("first send");
        let err = transport
            .send(vec![Packet::text(PacketType::Message, "b")])
            .unwrap_err();

        assert!(matches!(err, Error::NotWritable));
        assert_eq!(transport.written.len(), 1);
    }

    #[test]
    fn test_send_rejects_error_packet() {
        let mut transport = Loopback::new();
        transport.open();

        let err = transport
            .send(vec![
                Packet::text(PacketType::Message, "a"),
                Packet::parser_error(),
            ])
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Unsendable {
                packet_type: PacketType::Error
            }
        ));
        assert!(transport.written.is_empty());
        assert!(transport.is_writable());
    }

    #[test]
    fn test_close_is_terminal() {
        let mut transport = Loopback::new();
        transport.open();
        transport.close();
        transport.close();

        assert_eq!(transport.ready_state(), ReadyState::Closed);
        assert_eq!(drain_events(&mut transport), vec!["open", "close"]);
        assert!(transport.send(Vec::new()).is_err());
    }

    #[test]
    fn test_open_after_close_is_noop() {
        let mut transport = Loopback::new();
        transport.close();
        transport.open();
        assert_eq!(transport.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_ready_state_display() {
        assert_eq!(ReadyState::Opening.to_string(), "opening");
        assert_eq!(ReadyState::Paused.to_string(), "paused");
    }
}
