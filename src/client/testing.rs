//! In-memory transport for client tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::{OutboundFrame, ReadyState, Transport, TransportEvent, TransportHandler};

use super::core::LiveClient;
use super::events::LiveEvent;

// ============================================================================
// RecordingTransport
// ============================================================================

/// Transport that records outbound frames and never touches the network.
#[derive(Clone)]
pub(crate) struct RecordingTransport {
    state: Arc<Mutex<ReadyState>>,
    sent: Arc<Mutex<Vec<OutboundFrame>>>,
    close_calls: Arc<AtomicUsize>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ReadyState::Connecting)),
            sent: Arc::new(Mutex::new(Vec::new())),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn set_state(&self, state: ReadyState) {
        *self.state.lock() = state;
    }

    pub(crate) fn sent(&self) -> Vec<OutboundFrame> {
        self.sent.lock().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }

    fn send(&self, frame: OutboundFrame) -> Result<()> {
        if matches!(self.ready_state(), ReadyState::Closing | ReadyState::Closed) {
            return Err(Error::ConnectionClosed);
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A client wired to a [`RecordingTransport`], with the relay handler
/// exposed so tests can inject transport events.
pub(crate) struct Harness {
    pub client: LiveClient,
    pub transport: RecordingTransport,
    handler: Arc<Mutex<Option<TransportHandler>>>,
}

impl Harness {
    pub(crate) fn connect() -> Self {
        let transport = RecordingTransport::new();
        let handler = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&handler);
        let recording = transport.clone();
        let client = LiveClient::builder()
            .api_key("test-key")
            .connect_with(move |_request, relay| {
                *slot.lock() = Some(relay);
                recording
            })
            .expect("connect");

        Self {
            client,
            transport,
            handler,
        }
    }

    /// Marks the transport open and delivers `Open`.
    pub(crate) fn open(&self) {
        self.transport.set_state(ReadyState::Open);
        self.deliver(TransportEvent::Open);
    }

    pub(crate) fn deliver(&self, event: TransportEvent) {
        let handler = self.handler.lock();
        if let Some(handler) = handler.as_ref() {
            handler(event);
        }
    }

    pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<LiveEvent>) -> Vec<LiveEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}
