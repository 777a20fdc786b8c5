//! Builder pattern for live sessions.
//!
//! Handlers registered on the builder are in place before the transport
//! starts, so no early event (including `Open`) can be missed.
//!
//! # Example
//!
//! ```ignore
//! use listen_live::{LiveClient, LiveEventKind};
//!
//! let client = LiveClient::builder()
//!     .api_key("dg-key")
//!     .option("model", "nova-2")
//!     .on(LiveEventKind::Transcript, |event| println!("{event:?}"))
//!     .connect()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tracing::info;

use crate::error::Result;
use crate::identifiers::SessionId;
use crate::transport::{Transport, TransportHandler, WsConnection};

use super::core::LiveClient;
use super::emitter::EventEmitter;
use super::events::{LiveEvent, LiveEventKind};
use super::options::{ClientOptions, LiveSchema};
use super::relay::Relay;

// ============================================================================
// LiveClientBuilder
// ============================================================================

/// Builder for a [`LiveClient`].
///
/// Use [`LiveClient::builder()`] to create one.
#[derive(Debug, Default)]
pub struct LiveClientBuilder {
    /// Endpoint and credentials.
    options: ClientOptions,
    /// Transcription options.
    schema: LiveSchema,
    /// Handlers registered before connecting.
    emitter: EventEmitter,
}

// ============================================================================
// LiveClientBuilder - Configuration
// ============================================================================

impl LiveClientBuilder {
    /// Creates a builder with default options and no credentials.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the connection options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Authenticates with an API key.
    #[inline]
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.options = self.options.with_api_key(key);
        self
    }

    /// Authenticates with an access token.
    #[inline]
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.options = self.options.with_access_token(token);
        self
    }

    /// Sets the base URL.
    #[inline]
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options = self.options.with_base_url(base_url);
        self
    }

    /// Replaces the transcription schema.
    #[inline]
    #[must_use]
    pub fn schema(mut self, schema: LiveSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Sets one transcription option.
    #[inline]
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.schema.insert(key, value);
        self
    }

    /// Replaces the emitter, keeping handlers registered on it.
    #[inline]
    #[must_use]
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    /// Returns the emitter, for typed registration before connecting.
    #[inline]
    #[must_use]
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Registers a handler for one event kind.
    #[must_use]
    pub fn on<F>(self, kind: LiveEventKind, handler: F) -> Self
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        self.emitter.on(kind, handler);
        self
    }

    /// Registers a handler for every event.
    #[must_use]
    pub fn on_any<F>(self, handler: F) -> Self
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        self.emitter.on_any(handler);
        self
    }
}

// ============================================================================
// LiveClientBuilder - Connect
// ============================================================================

impl LiveClientBuilder {
    /// Starts a session over a websocket and returns immediately.
    ///
    /// Must be called from within a tokio runtime. Wait for
    /// [`LiveEvent::Open`] (or use [`LiveClient::wait_for_open`]) before
    /// sending audio. Connection failures arrive as an `Error` event
    /// followed by a `Close` event.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if credentials are missing
    ///   or the URL cannot be built
    /// - [`Error::Url`](crate::Error::Url) if the URL is malformed
    pub fn connect(self) -> Result<LiveClient> {
        self.connect_with(WsConnection::open)
    }

    /// Starts a session over a caller-supplied transport.
    ///
    /// `open` receives the handshake request and the handler that relays
    /// transport events into this session's emitter.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub fn connect_with<T, F>(self, open: F) -> Result<LiveClient>
    where
        T: Transport + 'static,
        F: FnOnce(Request, TransportHandler) -> T,
    {
        let (url, request) = self.options.live_request(&self.schema)?;

        let session_id = SessionId::generate();
        let emitter = Arc::new(self.emitter);
        let relay = Relay::new(session_id, url.clone(), Arc::clone(&emitter));

        let transport = open(request, Box::new(move |event| relay.handle(event)));

        info!(
            %session_id,
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
            "Live session started"
        );

        Ok(LiveClient::from_parts(
            session_id,
            url,
            Box::new(transport),
            emitter,
        ))
    }
}
