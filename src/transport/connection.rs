//! WebSocket connection and event loop.
//!
//! [`WsConnection`] spawns one tokio task that owns the socket:
//!
//! - Connects (state `Connecting` → `Open`)
//! - Forwards queued outbound frames
//! - Delivers inbound frames and lifecycle changes to a [`TransportHandler`]
//! - Runs the close handshake (state `Closing` → `Closed`)
//!
//! Frames queued while the handshake is still running are flushed once the
//! connection opens. Dropping the handle closes the connection.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Once};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};

use super::state::SharedReadyState;
use super::{
    CloseEvent, InboundFrame, OutboundFrame, ReadyState, Transport, TransportEvent,
    TransportHandler,
};

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the peer's close frame carried no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a frame.
    Send(OutboundFrame),
    /// Start the close handshake.
    Close,
}

// ============================================================================
// WsConnection
// ============================================================================

/// WebSocket connection to the transcription service.
///
/// # Thread Safety
///
/// `WsConnection` is `Send + Sync`. All operations are non-blocking: they
/// enqueue onto the event loop and return.
pub struct WsConnection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Ready state (shared with event loop).
    state: Arc<SharedReadyState>,
}

impl WsConnection {
    /// Starts connecting and returns immediately.
    ///
    /// Must be called from within a tokio runtime. Connection failures are
    /// reported to `handler` as [`TransportEvent::Error`] followed by
    /// [`TransportEvent::Close`].
    pub fn open(request: Request, handler: TransportHandler) -> Self {
        install_crypto_provider();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(SharedReadyState::new(ReadyState::Connecting));

        tokio::spawn(Self::run_event_loop(
            request,
            command_rx,
            Arc::clone(&state),
            handler,
        ));

        Self { command_tx, state }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        request: Request,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        state: Arc<SharedReadyState>,
        handler: TransportHandler,
    ) {
        debug!(uri = %request.uri(), "Connecting");

        let ws_stream = match connect_async(request).await {
            Ok((ws_stream, response)) => {
                info!(status = %response.status(), "WebSocket connection established");
                ws_stream
            }
            Err(e) => {
                error!(error = %e, "WebSocket connect failed");
                state.set(ReadyState::Closed);
                handler(TransportEvent::Error(format!("connect failed: {e}")));
                handler(TransportEvent::Close(CloseEvent::abnormal(e.to_string())));
                return;
            }
        };

        state.set(ReadyState::Open);
        handler(TransportEvent::Open);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut close_event = None;
        let mut accepting_commands = true;

        loop {
            tokio::select! {
                // Incoming frames from the service
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Text frame received");
                            handler(TransportEvent::Message(InboundFrame::Text(
                                text.as_str().to_owned(),
                            )));
                        }

                        Some(Ok(Message::Binary(bytes))) => {
                            trace!(len = bytes.len(), "Binary frame received");
                            handler(TransportEvent::Message(InboundFrame::Binary(bytes.to_vec())));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            state.set(ReadyState::Closing);
                            close_event = Some(Self::close_event_from(frame));
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            handler(TransportEvent::Error(e.to_string()));
                            close_event = Some(CloseEvent::abnormal(e.to_string()));
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ping/Pong are answered by tungstenite
                        _ => {}
                    }
                }

                // Commands from the client
                command = command_rx.recv(), if accepting_commands => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            let len = frame.len();
                            if let Err(e) = ws_write.send(Self::to_message(frame)).await {
                                warn!(error = %e, "Failed to send frame");
                                handler(TransportEvent::Error(e.to_string()));
                            } else {
                                trace!(len, "Frame sent");
                            }
                        }

                        // None: every handle was dropped
                        Some(ConnectionCommand::Close) | None => {
                            debug!("Starting close handshake");
                            state.set(ReadyState::Closing);
                            accepting_commands = false;
                            if let Err(e) = ws_write.close().await {
                                debug!(error = %e, "Close frame not sent");
                            }
                        }
                    }
                }
            }
        }

        // Flushes the reply to a remote close frame
        let _ = ws_write.close().await;
        state.set(ReadyState::Closed);

        let close_event = close_event.unwrap_or_else(|| CloseEvent::abnormal(""));
        info!(code = close_event.code, reason = %close_event.reason, "WebSocket connection closed");
        handler(TransportEvent::Close(close_event));
    }

    /// Converts an outbound frame to a tungstenite message.
    fn to_message(frame: OutboundFrame) -> Message {
        match frame {
            OutboundFrame::Text(text) => Message::Text(text.into()),
            OutboundFrame::Binary(bytes) => Message::Binary(bytes.into()),
        }
    }

    /// Builds the close event for a remote close frame.
    fn close_event_from(frame: Option<CloseFrame>) -> CloseEvent {
        match frame {
            Some(frame) => CloseEvent::new(u16::from(frame.code), frame.reason.as_str()),
            None => CloseEvent::new(NO_STATUS_CLOSE_CODE, ""),
        }
    }
}

/// Installs the ring TLS provider for `wss://` unless one is already set.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("TLS crypto provider already installed");
        }
    });
}

impl Transport for WsConnection {
    #[inline]
    fn ready_state(&self) -> ReadyState {
        self.state.get()
    }

    fn send(&self, frame: OutboundFrame) -> Result<()> {
        if matches!(self.state.get(), ReadyState::Closing | ReadyState::Closed) {
            return Err(Error::ConnectionClosed);
        }

        self.command_tx
            .send(ConnectionCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Close);
    }
}

// ============================================================================
// Tests
// ============================================================================
