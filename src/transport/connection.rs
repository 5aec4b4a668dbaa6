//! Polling connection and event loop.
//!
//! The connection spawns a tokio task that owns the [`PollingTransport`]
//! and is the only place its state changes. The task handles:
//!
//! - Commands from the Rust API (open, send, pause, close, shutdown)
//! - Completions of HTTP requests running on spawned tasks
//! - Execution of the transport's queued actions
//! - Event handler callbacks
//!
//! The request headers hook runs on the loop task before a request is
//! spawned, so it may add, replace or remove outgoing headers.
//!
//! Each loop turn applies one input, executes the resulting actions, then
//! dispatches the resulting events in order.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::http::{HeaderMap, HttpBinding, HttpResponse, Method};
use crate::protocol::{Handshake, Packet};

use super::base::{ReadyState, Transport};
use super::event::{Action, Event};
use super::options::TransportOptions;
use super::polling::{PollingTransport, RequestHeadersHook};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called on the event loop task for each transport event, in order.
/// Must not block and must not call [`PollingConnection::set_event_handler`]
/// or [`PollingConnection::clear_event_handler`].
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// Shared binding handle.
type SharedBinding = Arc<dyn HttpBinding>;

/// Hook slot shared with the event loop.
type SharedHook = Arc<Mutex<Option<RequestHeadersHook>>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Start the handshake.
    Open,
    /// Write packets.
    Send {
        packets: Vec<Packet>,
        response_tx: oneshot::Sender<Result<()>>,
    },
    /// Pause and report when settled.
    Pause { response_tx: oneshot::Sender<()> },
    /// Close gracefully.
    Close,
    /// Stop the event loop.
    Shutdown,
}

/// Result of a spawned HTTP request.
enum IoCompletion {
    Poll(Result<HttpResponse>),
    Write(Result<HttpResponse>),
}

// ============================================================================
// PollingConnection
// ============================================================================

/// Engine.IO connection over HTTP long-polling.
///
/// # Thread Safety
///
/// `PollingConnection` is `Send + Sync` and cheap to clone; clones share
/// the event loop. The loop stops on [`shutdown`](Self::shutdown) or when
/// every clone has been dropped.
///
/// # Example
///
/// ```ignore
/// let connection = PollingConnection::new(options, ReqwestBinding::new())?;
/// connection.set_event_handler(Box::new(|event| println!("{}", event.name())));
/// connection.open()?;
/// ```
pub struct PollingConnection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Transport state mirrored after every loop turn.
    ready_state: Arc<Mutex<ReadyState>>,
    /// Handshake mirrored once received.
    handshake: Arc<Mutex<Option<Handshake>>>,
    /// Event handler (shared with event loop).
    event_handler: Arc<Mutex<Option<EventHandler>>>,
    /// Request headers hook (shared with event loop).
    request_headers_hook: SharedHook,
}

impl Clone for PollingConnection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            ready_state: Arc::clone(&self.ready_state),
            handshake: Arc::clone(&self.handshake),
            event_handler: Arc::clone(&self.event_handler),
            request_headers_hook: Arc::clone(&self.request_headers_hook),
        }
    }
}

impl PollingConnection {
    /// Creates a connection without opening it.
    ///
    /// Spawns the event loop task, so this must be called within a tokio
    /// runtime. Register a handler before calling [`open`](Self::open) to
    /// observe every event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn new(options: TransportOptions, binding: impl HttpBinding) -> Result<Self> {
        options.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let ready_state = Arc::new(Mutex::new(ReadyState::Opening));
        let handshake = Arc::new(Mutex::new(None));
        let event_handler: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));
        let request_headers_hook: SharedHook = Arc::new(Mutex::new(None));

        let mut transport = PollingTransport::new(options);
        let installed = Arc::clone(&request_headers_hook);
        transport.set_request_headers_hook(Arc::new(
            move |method: Method, headers: &mut HeaderMap| {
                // Cloned out so the hook runs without the slot locked.
                let hook = installed.lock().clone();
                if let Some(hook) = hook {
                    hook(method, headers);
                }
            },
        ));
        let binding: SharedBinding = Arc::new(binding);

        tokio::spawn(Self::run_event_loop(
            transport,
            binding,
            command_rx,
            Arc::clone(&ready_state),
            Arc::clone(&handshake),
            Arc::clone(&event_handler),
        ));

        Ok(Self {
            command_tx,
            ready_state,
            handshake,
            event_handler,
            request_headers_hook,
        })
    }

    /// Creates a connection using a [`ReqwestBinding`](crate::http::ReqwestBinding)
    /// configured from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(options: TransportOptions) -> Result<Self> {
        let binding = crate::http::ReqwestBinding::from_options(&options);
        Self::new(options, binding)
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        let mut guard = self.event_handler.lock();
        *guard = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        let mut guard = self.event_handler.lock();
        *guard = None;
    }

    /// Sets a hook that edits the headers of every later request.
    ///
    /// Runs on the event loop task right before the request is issued; the
    /// `requestHeaders` event reports the edited headers.
    pub fn set_request_headers_hook(
        &self,
        hook: impl Fn(Method, &mut HeaderMap) + Send + Sync + 'static,
    ) {
        *self.request_headers_hook.lock() = Some(Arc::new(hook));
    }

    /// Clears the request headers hook.
    pub fn clear_request_headers_hook(&self) {
        *self.request_headers_hook.lock() = None;
    }

    /// Starts the handshake. Only the first call has an effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub fn open(&self) -> Result<()> {
        self.command(ConnectionCommand::Open)
    }

    /// Sends packets as one payload.
    ///
    /// Resolves once the write has been issued, not when it drains.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsendable`] if the batch holds an `error` packet
    /// - [`Error::NotOpen`] unless the transport is open
    /// - [`Error::NotWritable`] while a previous write has not drained
    /// - [`Error::ConnectionClosed`] if the event loop has stopped
    pub async fn send(&self, packets: Vec<Packet>) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();

        self.command(ConnectionCommand::Send {
            packets,
            response_tx,
        })?;

        response_rx.await?
    }

    /// Pauses the transport and waits until no request is in flight.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has stopped
    /// - [`Error::ChannelClosed`] if the loop stops before the pause settles
    pub async fn pause(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command(ConnectionCommand::Pause { response_tx })?;
        response_rx.await?;
        Ok(())
    }

    /// Closes the transport, sending a close packet once open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has stopped.
    pub fn close(&self) -> Result<()> {
        self.command(ConnectionCommand::Close)
    }

    /// Stops the event loop without a close handshake.
    ///
    /// In-flight requests are abandoned.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Returns the transport state as of the last loop turn.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.ready_state.lock()
    }

    /// Returns the handshake, once received.
    #[must_use]
    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().clone()
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.command_tx.is_closed()
    }

    fn command(&self, command: ConnectionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Event loop that owns the transport.
    async fn run_event_loop(
        mut transport: PollingTransport,
        binding: SharedBinding,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        ready_state: Arc<Mutex<ReadyState>>,
        handshake: Arc<Mutex<Option<Handshake>>>,
        event_handler: Arc<Mutex<Option<EventHandler>>>,
    ) {
        let (io_tx, mut io_rx) = mpsc::unbounded_channel();

        loop {
            tokio::select! {
                // Completions from spawned requests
                Some(completion) = io_rx.recv() => {
                    Self::handle_completion(&mut transport, completion);
                }

                // Commands from Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Open) => transport.open(),

                        Some(ConnectionCommand::Send { packets, response_tx }) => {
                            let _ = response_tx.send(transport.send(packets));
                        }

                        Some(ConnectionCommand::Pause { response_tx }) => {
                            transport.pause(move || {
                                let _ = response_tx.send(());
                            });
                        }

                        Some(ConnectionCommand::Close) => transport.close(),

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }

            Self::execute_actions(&mut transport, &binding, &io_tx);

            *ready_state.lock() = transport.ready_state();
            if let Some(received) = transport.handshake() {
                let mut guard = handshake.lock();
                if guard.is_none() {
                    *guard = Some(received.clone());
                }
            }

            Self::dispatch_events(&mut transport, &event_handler);
        }

        *ready_state.lock() = ReadyState::Closed;

        // In-flight requests are abandoned; their completions have no receiver.
        command_rx.close();

        debug!("Event loop terminated");
    }

    /// Feeds a request completion into the transport.
    fn handle_completion(transport: &mut PollingTransport, completion: IoCompletion) {
        match completion {
            IoCompletion::Poll(Ok(response)) => {
                trace!(status = response.status, "Poll completed");
                transport.on_response_headers(response.headers);
                transport.on_poll_data(&response.body);
            }
            IoCompletion::Poll(Err(e)) => {
                Self::report_failed_response(transport, &e);
                transport.on_poll_error(e);
            }
            IoCompletion::Write(Ok(response)) => {
                trace!(status = response.status, "Write completed");
                transport.on_response_headers(response.headers);
                transport.on_write_complete();
            }
            IoCompletion::Write(Err(e)) => {
                Self::report_failed_response(transport, &e);
                transport.on_write_error(e);
            }
        }
    }

    /// Reports the headers of a response rejected for its status.
    fn report_failed_response(transport: &mut PollingTransport, error: &Error) {
        if let Some(headers) = error.response_headers() {
            transport.on_response_headers(headers.clone());
        }
    }

    /// Spawns a request for every queued action.
    fn execute_actions(
        transport: &mut PollingTransport,
        binding: &SharedBinding,
        io_tx: &mpsc::UnboundedSender<IoCompletion>,
    ) {
        while let Some(action) = transport.next_action() {
            let binding = Arc::clone(binding);
            let io_tx = io_tx.clone();

            match action {
                Action::Poll { uri, headers } => {
                    trace!(%uri, "GET");
                    tokio::spawn(async move {
                        let result = binding.poll(&uri, &headers).await;
                        let _ = io_tx.send(IoCompletion::Poll(result));
                    });
                }
                Action::Write { uri, headers, body } => {
                    trace!(%uri, len = body.len(), "POST");
                    tokio::spawn(async move {
                        let result = binding.write(&uri, &headers, body).await;
                        let _ = io_tx.send(IoCompletion::Write(result));
                    });
                }
            }
        }
    }

    /// Delivers queued events to the handler.
    fn dispatch_events(
        transport: &mut PollingTransport,
        event_handler: &Arc<Mutex<Option<EventHandler>>>,
    ) {
        let handler = event_handler.lock();
        while let Some(event) = transport.next_event() {
            match *handler {
                Some(ref handler) => handler(event),
                None => trace!(event = event.name(), "No event handler"),
            }
        }
    }
}

impl std::fmt::Debug for PollingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingConnection")
            .field("ready_state", &self.ready_state())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
