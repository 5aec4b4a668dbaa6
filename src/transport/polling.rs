//! HTTP long-polling transport.
//!
//! # Cycle
//!
//! ```text
//! open ─► poll ─► response ─► decode batch ─► dispatch ─► pollComplete ─► poll …
//!                                                  │
//! send ─► write (writable = false) ─► response ─► drain (writable = true)
//! ```
//!
//! At most one poll and one write are in flight. The transport performs no
//! I/O: [`Action`]s are executed by the driver, which reports completions
//! back through the `on_*` methods.
//!
//! Outgoing headers pass through the [`RequestHeadersHook`] before the
//! `requestHeaders` event is emitted and the action is queued.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::http::{HeaderMap, Method, request_headers};
use crate::protocol::{Handshake, Packet, PacketType, decode_payload, encode_payload};

use super::base::{ReadyState, Transport, TransportCore};
use super::event::{Action, Event};
use super::options::TransportOptions;
use super::uri::build_uri;
use super::yeast::Yeast;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked once a pause completes.
pub type PauseCallback = Box<dyn FnOnce() + Send>;

/// Hook that may rewrite the headers of every outgoing request.
pub type RequestHeadersHook = Arc<dyn Fn(Method, &mut HeaderMap) + Send + Sync>;

/// An in-progress pause.
struct PendingPause {
    /// Outstanding poll and write completions.
    pending_waits: u8,
    callbacks: Vec<PauseCallback>,
}

// ============================================================================
// PollingTransport
// ============================================================================

/// Long-polling transport.
pub struct PollingTransport {
    core: TransportCore,
    options: TransportOptions,
    query: Vec<(String, String)>,
    yeast: Yeast,
    handshake: Option<Handshake>,
    request_headers_hook: Option<RequestHeadersHook>,

    /// A poll request is in flight.
    polling: bool,
    /// A write request is in flight.
    writing: bool,

    pending_pause: Option<PendingPause>,
    close_on_open: bool,
    pending_close_write: bool,
}

impl PollingTransport {
    /// Transport name.
    pub const NAME: &'static str = "polling";

    /// Creates a transport in [`ReadyState::Opening`].
    #[must_use]
    pub fn new(options: TransportOptions) -> Self {
        let query = options.query.clone();
        Self {
            core: TransportCore::new(Self::NAME),
            options,
            query,
            yeast: Yeast::new(),
            handshake: None,
            request_headers_hook: None,
            polling: false,
            writing: false,
            pending_pause: None,
            close_on_open: false,
            pending_close_write: false,
        }
    }

    /// Returns the transport options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Returns the handshake, once received.
    #[inline]
    #[must_use]
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    /// Returns `true` while a poll is in flight.
    #[inline]
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Installs a hook run on the headers of every later request.
    pub fn set_request_headers_hook(&mut self, hook: RequestHeadersHook) {
        self.request_headers_hook = Some(hook);
    }

    /// Removes the request headers hook.
    pub fn clear_request_headers_hook(&mut self) {
        self.request_headers_hook = None;
    }

    fn outgoing_headers(&self, method: Method) -> HeaderMap {
        let mut headers = request_headers(method, &self.options.extra_headers);
        if let Some(hook) = &self.request_headers_hook {
            hook(method, &mut headers);
        }
        headers
    }

    // ========================================================================
    // Pause
    // ========================================================================

    /// Pauses the transport.
    ///
    /// The state becomes [`ReadyState::Paused`] immediately. `on_pause` runs
    /// once the in-flight poll has completed and the in-flight write has
    /// drained, or right away if neither is outstanding. On a closed
    /// transport `on_pause` runs right away and the state is unchanged.
    pub fn pause(&mut self, on_pause: impl FnOnce() + Send + 'static) {
        if self.core.ready_state() == ReadyState::Closed {
            on_pause();
            return;
        }

        self.core.set_ready_state(ReadyState::Paused);

        if let Some(pending) = &mut self.pending_pause {
            pending.callbacks.push(Box::new(on_pause));
            return;
        }

        let mut pending_waits = 0;
        if self.polling {
            trace!("Pause waiting for poll to complete");
            pending_waits += 1;
        }
        if self.writing {
            trace!("Pause waiting for write to drain");
            pending_waits += 1;
        }

        if pending_waits == 0 {
            debug!("Paused");
            on_pause();
            return;
        }

        self.pending_pause = Some(PendingPause {
            pending_waits,
            callbacks: vec![Box::new(on_pause)],
        });
    }

    /// Counts down one outstanding wait of a pending pause.
    fn settle_pause_wait(&mut self) {
        let Some(pending) = &mut self.pending_pause else {
            return;
        };

        pending.pending_waits = pending.pending_waits.saturating_sub(1);
        if pending.pending_waits > 0 {
            return;
        }

        if let Some(pending) = self.pending_pause.take() {
            debug!("Paused");
            for callback in pending.callbacks {
                callback();
            }
        }
    }

    // ========================================================================
    // Poll Cycle
    // ========================================================================

    fn poll(&mut self) {
        trace!("Polling");
        self.polling = true;

        let uri = self.uri();
        let headers = self.outgoing_headers(Method::Get);
        self.core.emit(Event::RequestHeaders(headers.clone()));
        self.core.push_action(Action::Poll { uri, headers });
        self.core.emit(Event::Poll);
    }

    /// Handles a poll response body.
    pub fn on_poll_data(&mut self, body: &str) {
        if self.core.ready_state() == ReadyState::Closed {
            trace!(len = body.len(), "Ignoring poll response after close");
            self.polling = false;
            self.settle_pause_wait();
            return;
        }

        trace!(len = body.len(), "Poll response");
        decode_payload(body, |packet, _, _| self.handle_packet(packet));

        self.polling = false;
        if self.core.ready_state() != ReadyState::Closed {
            self.core.emit(Event::PollComplete);

            if self.core.ready_state() == ReadyState::Open {
                self.poll();
            } else {
                trace!(state = %self.core.ready_state(), "Not polling");
            }
        }

        self.settle_pause_wait();
    }

    /// Handles a failed poll request.
    pub fn on_poll_error(&mut self, cause: Error) {
        self.polling = false;
        self.core.on_error("xhr poll error", cause);
        self.settle_pause_wait();
    }

    /// Dispatches one decoded packet. Returns `false` to stop the batch.
    fn handle_packet(&mut self, packet: Packet) -> bool {
        let packet_type = packet.packet_type();

        if self.core.ready_state() == ReadyState::Opening && packet_type == PacketType::Open {
            self.capture_handshake(&packet);
            self.core.on_open();
        }

        if packet_type == PacketType::Close {
            debug!("Server closed transport");
            self.core.on_close();
            return false;
        }

        self.core.on_packet(packet);

        if self.close_on_open && self.core.ready_state() == ReadyState::Open {
            debug!("Performing deferred close");
            self.close_on_open = false;
            self.write_close();
            self.core.on_close();
            return false;
        }

        true
    }

    fn capture_handshake(&mut self, packet: &Packet) {
        match Handshake::from_packet(packet) {
            Ok(handshake) => {
                debug!(sid = %handshake.sid, "Handshake received");
                self.query.retain(|(key, _)| key != "sid");
                self.query.push(("sid".to_string(), handshake.sid.clone()));
                self.handshake = Some(handshake);
            }
            Err(e) => warn!(error = %e, "Open packet without usable handshake"),
        }
    }

    // ========================================================================
    // Write Cycle
    // ========================================================================

    fn write_payload(&mut self, packets: &[Packet]) {
        self.core.set_writable(false);
        self.writing = true;

        let body = encode_payload(packets);
        trace!(count = packets.len(), len = body.len(), "Writing");

        let uri = self.uri();
        let headers = self.outgoing_headers(Method::Post);
        self.core.emit(Event::RequestHeaders(headers.clone()));
        self.core.push_action(Action::Write { uri, headers, body });
    }

    fn write_close(&mut self) {
        self.write_payload(&[Packet::empty(PacketType::Close)]);
    }

    /// Handles a completed write.
    pub fn on_write_complete(&mut self) {
        self.writing = false;
        self.core.set_writable(true);
        self.core.emit(Event::Drain);

        if self.pending_close_write {
            self.pending_close_write = false;
            self.write_close();
        }

        self.settle_pause_wait();
    }

    /// Handles a failed write. The transport stays not writable.
    pub fn on_write_error(&mut self, cause: Error) {
        self.writing = false;
        self.core.on_error("xhr post error", cause);

        if self.pending_close_write {
            debug!("Dropping close packet after failed write");
            self.pending_close_write = false;
        }

        self.settle_pause_wait();
    }

    /// Reports the headers of a completed response.
    pub fn on_response_headers(&mut self, headers: HeaderMap) {
        self.core.emit(Event::ResponseHeaders(headers));
    }
}

// ============================================================================
// Transport Implementation
// ============================================================================

impl Transport for PollingTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransportCore {
        &mut self.core
    }

    fn do_open(&mut self) {
        debug!(host = %self.options.host, "Opening polling transport");
        self.poll();
    }

    fn do_close(&mut self) -> bool {
        if self.core.ready_state() != ReadyState::Open {
            debug!("Transport not open yet, deferring close");
            self.close_on_open = true;
            return false;
        }

        if self.writing {
            debug!("Write in flight, sending close after drain");
            self.pending_close_write = true;
        } else {
            self.write_close();
        }
        true
    }

    fn write(&mut self, packets: Vec<Packet>) {
        self.write_payload(&packets);
    }

    fn uri(&mut self) -> String {
        let mut query = self.query.clone();
        if self.options.timestamp_requests {
            query.push((self.options.timestamp_param.clone(), self.yeast.next_id()));
        }

        build_uri(
            self.options.secure,
            &self.options.host,
            self.options.port,
            &self.options.path,
            &query,
        )
    }
}

impl std::fmt::Debug for PollingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingTransport")
            .field("ready_state", &self.core.ready_state())
            .field("writable", &self.core.is_writable())
            .field("polling", &self.polling)
            .field("writing", &self.writing)
            .field("paused", &self.pending_pause.is_some())
            .field("request_headers_hook", &self.request_headers_hook.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
