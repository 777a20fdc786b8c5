//! Live transcription session handle.
//!
//! A [`LiveClient`] is cheap to clone; clones share one transport and one
//! emitter. The session ends when [`close`](LiveClient::close) is called or
//! the service closes the socket.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use listen_live::{LiveClient, LiveSchema};
//!
//! let client = LiveClient::builder()
//!     .api_key("dg-key")
//!     .schema(LiveSchema::new().model("nova-2").interim_results(true))
//!     .connect()?;
//!
//! client.emitter().on_transcript(|t| {
//!     if let Some(text) = t.transcript() {
//!         println!("{text}");
//!     }
//! });
//!
//! client.wait_for_open(Duration::from_secs(10)).await?;
//! client.send(audio_chunk)?;
//! client.finish()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, SubscriptionId};
use crate::protocol::{ConfigOptions, ControlMessage};
use crate::transport::{OutboundFrame, ReadyState, Transport};

use super::builder::LiveClientBuilder;
use super::emitter::EventEmitter;
use super::events::{EMPTY_CHUNK_WARNING, LiveEvent, LiveEventKind, WarningEvent};
use super::options::{ClientOptions, LiveSchema};

// ============================================================================
// AudioChunk
// ============================================================================

/// One piece of caller data to stream.
///
/// Binary chunks are audio; text chunks are passed through as text frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioChunk {
    /// Sent as a text frame.
    Text(String),
    /// Sent as a binary frame.
    Binary(Vec<u8>),
}

impl AudioChunk {
    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for AudioChunk {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for AudioChunk {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for AudioChunk {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for AudioChunk {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a session.
struct LiveClientInner {
    /// Session identifier.
    session_id: SessionId,
    /// Endpoint URL, including query.
    url: Url,
    /// Underlying connection.
    transport: Box<dyn Transport>,
    /// Event handlers.
    emitter: Arc<EventEmitter>,
}

// ============================================================================
// LiveClient
// ============================================================================

/// Handle to one live transcription session.
#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<LiveClientInner>,
}

impl fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveClient")
            .field("session_id", &self.inner.session_id)
            .field("url", &self.inner.url.as_str())
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// LiveClient - Construction
// ============================================================================

impl LiveClient {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> LiveClientBuilder {
        LiveClientBuilder::new()
    }

    /// Starts a session with `options` and `schema`.
    ///
    /// Shorthand for `LiveClient::builder().options(..).schema(..).connect()`.
    /// Handlers registered after this returns may miss `Open`; prefer the
    /// builder or [`wait_for_open`](Self::wait_for_open).
    ///
    /// # Errors
    ///
    /// See [`LiveClientBuilder::connect`].
    pub fn connect(options: ClientOptions, schema: LiveSchema) -> Result<Self> {
        Self::builder().options(options).schema(schema).connect()
    }

    /// Assembles a client from connected parts.
    pub(crate) fn from_parts(
        session_id: SessionId,
        url: Url,
        transport: Box<dyn Transport>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            inner: Arc::new(LiveClientInner {
                session_id,
                url,
                transport,
                emitter,
            }),
        }
    }
}

// ============================================================================
// LiveClient - Accessors
// ============================================================================

impl LiveClient {
    /// Returns the session identifier.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    /// Returns the endpoint URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the session's event emitter.
    #[inline]
    #[must_use]
    pub fn emitter(&self) -> &EventEmitter {
        &self.inner.emitter
    }

    /// Returns the transport's ready state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner.transport.ready_state()
    }

    /// Returns `true` if the connection is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ready_state().is_open()
    }
}

// ============================================================================
// LiveClient - Streaming
// ============================================================================

impl LiveClient {
    /// Sends one chunk of caller data.
    ///
    /// An empty binary chunk is not sent: a [`LiveEvent::Warning`] is
    /// emitted instead, because the service reads an empty frame as end of
    /// stream. Use [`finish`](Self::finish) to end the stream.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionNotOpen`] if the connection is not open
    /// - [`Error::ConnectionClosed`] if the transport refused the frame
    pub fn send(&self, chunk: impl Into<AudioChunk>) -> Result<()> {
        let state = self.ready_state();
        if !state.is_open() {
            return Err(Error::connection_not_open(state));
        }

        let frame = match chunk.into() {
            AudioChunk::Text(text) => OutboundFrame::Text(text),
            AudioChunk::Binary(bytes) if bytes.is_empty() => {
                warn!(session_id = %self.inner.session_id, "Empty audio chunk not sent");
                self.inner
                    .emitter
                    .emit(&LiveEvent::Warning(WarningEvent::new(EMPTY_CHUNK_WARNING)));
                return Ok(());
            }
            AudioChunk::Binary(bytes) => OutboundFrame::Binary(bytes),
        };

        trace!(session_id = %self.inner.session_id, len = frame.len(), "Sending chunk");
        self.inner.transport.send(frame)
    }

    /// Reconfigures processing mid-stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized or queued.
    pub fn configure(&self, processors: ConfigOptions) -> Result<()> {
        self.send_control(&ControlMessage::Configure { processors })
    }

    /// Keeps an idle stream alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn keep_alive(&self) -> Result<()> {
        self.send_control(&ControlMessage::KeepAlive)
    }

    /// Flushes buffered audio into final results.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn finalize(&self) -> Result<()> {
        self.send_control(&ControlMessage::Finalize)
    }

    /// Tells the service no more audio is coming.
    ///
    /// The service sends remaining results, then closes the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be queued.
    pub fn finish(&self) -> Result<()> {
        self.send_control(&ControlMessage::CloseStream)
    }

    /// Closes the connection without waiting for remaining results.
    ///
    /// Idempotent. A [`LiveEvent::Close`] follows once the handshake ends.
    pub fn close(&self) {
        debug!(session_id = %self.inner.session_id, "Closing session");
        self.inner.transport.close();
    }

    /// Serializes a control message and writes it as a text frame.
    ///
    /// Control messages skip the ready-state check; the transport queues
    /// them while connecting and rejects them once closing.
    fn send_control(&self, message: &ControlMessage) -> Result<()> {
        let json = message.to_json()?;
        debug!(
            session_id = %self.inner.session_id,
            message_type = message.type_name(),
            "Sending control message"
        );
        self.inner.transport.send(OutboundFrame::Text(json))
    }
}

// ============================================================================
// LiveClient - Waiting
// ============================================================================

impl LiveClient {
    /// Returns a channel receiving every subsequent event.
    ///
    /// The channel ends after it delivers [`LiveEvent::Close`], so
    /// `while let Some(event) = rx.recv().await` terminates with the session.
    /// A dropped receiver unregisters its handler on the next emitted event.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LiveEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Arc::new(Mutex::new(Some(tx)));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let emitter = Arc::downgrade(&self.inner.emitter);

        let forward = Arc::clone(&sender);
        let id_slot = Arc::clone(&slot);
        let id = self.inner.emitter.on_any(move |event| {
            {
                let mut tx = forward.lock();
                let delivered = tx
                    .as_ref()
                    .is_some_and(|tx| tx.send(event.clone()).is_ok());
                if delivered && event.kind() != LiveEventKind::Close {
                    return;
                }
                tx.take();
            }

            if let (Some(emitter), Some(id)) = (emitter.upgrade(), *id_slot.lock()) {
                trace!(subscription = %id, "Subscription ended");
                emitter.off(id);
            }
        });
        *slot.lock() = Some(id);

        // Ended before the id was stored
        if sender.lock().is_none() {
            self.inner.emitter.off(id);
        }

        rx
    }

    /// Waits until the connection opens.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if not open within `timeout_duration`
    /// - [`Error::ConnectionClosed`] if the connection closed first
    pub async fn wait_for_open(&self, timeout_duration: Duration) -> Result<()> {
        match self.ready_state() {
            ReadyState::Open => return Ok(()),
            ReadyState::Closing | ReadyState::Closed => return Err(Error::ConnectionClosed),
            ReadyState::Connecting => {}
        }

        let (tx, rx) = oneshot::channel::<Result<()>>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let tx_clone = Arc::clone(&tx);
        let id = self.inner.emitter.on_any(move |event| {
            let outcome = match event {
                LiveEvent::Open(_) => Ok(()),
                LiveEvent::Close(close) => {
                    debug!(code = close.code, "Closed before opening");
                    Err(Error::ConnectionClosed)
                }
                _ => return,
            };
            if let Some(tx) = tx_clone.lock().take() {
                let _ = tx.send(outcome);
            }
        });

        // The transport may have moved on before the handler was registered
        match self.ready_state() {
            ReadyState::Open => {
                self.inner.emitter.off(id);
                return Ok(());
            }
            ReadyState::Closed => {
                self.inner.emitter.off(id);
                return Err(Error::ConnectionClosed);
            }
            ReadyState::Connecting | ReadyState::Closing => {}
        }

        let result = timeout(timeout_duration, rx).await;
        self.inner.emitter.off(id);

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::connection("Session dropped while waiting")),
            Err(_) => Err(Error::connection_timeout(
                u64::try_from(timeout_duration.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    use crate::client::testing::Harness;
    use crate::transport::{CloseEvent, InboundFrame, TransportEvent};

    fn text_frame(frame: &OutboundFrame) -> Value {
        match frame {
            OutboundFrame::Text(text) => serde_json::from_str(text).expect("json"),
            OutboundFrame::Binary(_) => panic!("expected text frame"),
        }
    }

    #[test]
    fn test_send_requires_open() {
        let harness = Harness::connect();
        let err = harness.client.send(vec![1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::ConnectionNotOpen {
                state: ReadyState::Connecting
            }
        ));
        assert!(harness.transport.sent().is_empty());
    }

    #[test]
    fn test_send_binary_and_text() {
        let harness = Harness::connect();
        harness.open();

        harness.client.send(vec![1u8, 2, 3]).expect("binary");
        harness.client.send("hello").expect("text");

        assert_eq!(
            harness.transport.sent(),
            vec![
                OutboundFrame::Binary(vec![1, 2, 3]),
                OutboundFrame::Text("hello".into())
            ]
        );
    }

    #[test]
    fn test_empty_chunk_emits_warning_without_sending() {
        let harness = Harness::connect();
        let mut events = harness.client.subscribe();
        harness.open();

        harness.client.send(Vec::new()).expect("empty chunk is not an error");
        assert!(harness.transport.sent().is_empty());

        let events = Harness::drain(&mut events);
        assert_eq!(events.len(), 2);
        match &events[1] {
            LiveEvent::Warning(warning) => assert_eq!(warning.message, EMPTY_CHUNK_WARNING),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_control_messages() {
        let harness = Harness::connect();
        harness.open();

        let mut processors = ConfigOptions::new();
        processors.insert("numerals".into(), json!(true));

        harness.client.configure(processors).expect("configure");
        harness.client.keep_alive().expect("keep alive");
        harness.client.finalize().expect("finalize");
        harness.client.finish().expect("finish");

        let sent: Vec<Value> = harness.transport.sent().iter().map(text_frame).collect();
        assert_eq!(
            sent,
            vec![
                json!({"type": "Configure", "processors": {"numerals": true}}),
                json!({"type": "KeepAlive"}),
                json!({"type": "Finalize"}),
                json!({"type": "CloseStream"}),
            ]
        );
    }

    #[test]
    fn test_finish_is_sent_regardless_of_state() {
        let harness = Harness::connect();
        harness.client.finish().expect("queued while connecting");
        assert_eq!(
            harness.transport.sent(),
            vec![OutboundFrame::Text(r#"{"type":"CloseStream"}"#.into())]
        );
    }

    #[test]
    fn test_close_delegates_to_transport() {
        let harness = Harness::connect();
        harness.open();
        harness.client.close();
        harness.client.close();
        assert_eq!(harness.transport.close_calls(), 2);
    }

    #[test]
    fn test_frames_reach_emitter() {
        let harness = Harness::connect();
        let mut events = harness.client.subscribe();

        harness.open();
        harness.deliver(TransportEvent::Message(InboundFrame::Text(
            r#"{"type":"Transcript","is_final":true}"#.into(),
        )));
        harness.deliver(TransportEvent::Close(CloseEvent::new(1000, "")));

        let kinds: Vec<_> = Harness::drain(&mut events)
            .iter()
            .map(LiveEvent::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                LiveEventKind::Open,
                LiveEventKind::Transcript,
                LiveEventKind::Close
            ]
        );
    }

    #[tokio::test]
    async fn test_subscription_ends_after_close() {
        let harness = Harness::connect();
        let mut events = harness.client.subscribe();

        harness.open();
        harness.deliver(TransportEvent::Close(CloseEvent::new(1000, "")));

        let kinds: Vec<_> = Harness::drain(&mut events)
            .iter()
            .map(LiveEvent::kind)
            .collect();
        assert_eq!(kinds, vec![LiveEventKind::Open, LiveEventKind::Close]);

        let next = tokio::time::timeout(Duration::from_millis(200), events.recv())
            .await
            .expect("channel closed");
        assert!(next.is_none());
        assert_eq!(harness.client.emitter().listener_count(), 0);
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let harness = Harness::connect();
        for _ in 0..100 {
            drop(harness.client.subscribe());
        }
        let mut live = harness.client.subscribe();
        assert_eq!(harness.client.emitter().listener_count(), 101);

        harness.open();
        assert_eq!(harness.client.emitter().listener_count(), 1);
        assert_eq!(Harness::drain(&mut live).len(), 1);
    }

    #[test]
    fn test_debug_hides_transport() {
        let harness = Harness::connect();
        let debug = format!("{:?}", harness.client);
        assert!(debug.contains("LiveClient"));
        assert!(debug.contains("Connecting"));
    }

    #[tokio::test]
    async fn test_wait_for_open_resolves_on_open() {
        let harness = Harness::connect();
        let client = harness.client.clone();

        let waiter = tokio::spawn(async move { client.wait_for_open(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        harness.open();

        waiter.await.expect("join").expect("opened");
        assert_eq!(harness.client.emitter().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_open_fails_on_close() {
        let harness = Harness::connect();
        let client = harness.client.clone();

        let waiter = tokio::spawn(async move { client.wait_for_open(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        harness.transport.set_state(ReadyState::Closed);
        harness.deliver(TransportEvent::Close(CloseEvent::abnormal("refused")));

        let err = waiter.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_wait_for_open_times_out() {
        let harness = Harness::connect();
        let err = harness
            .client
            .wait_for_open(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_wait_for_open_settles_without_waiting() {
        let harness = Harness::connect();
        harness.open();
        tokio_test::assert_ok!(tokio_test::block_on(
            harness.client.wait_for_open(Duration::from_millis(1))
        ));

        harness.transport.set_state(ReadyState::Closed);
        tokio_test::assert_err!(tokio_test::block_on(
            harness.client.wait_for_open(Duration::from_secs(5))
        ));
    }

    #[test]
    fn test_audio_chunk_conversions() {
        assert_eq!(AudioChunk::from("a"), AudioChunk::Text("a".into()));
        assert_eq!(AudioChunk::from(&[1u8, 2][..]), AudioChunk::Binary(vec![1, 2]));
        assert!(AudioChunk::from(Vec::new()).is_empty());
    }
}
