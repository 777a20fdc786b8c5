//! listen-live - Streaming speech-to-text client.
//!
//! This library streams audio to a live transcription service over a
//! WebSocket and delivers results as typed events.
//!
//! # Architecture
//!
//! ```text
//! LiveClient ──send()──► Transport (WsConnection) ──frames──► service
//!      ▲                        │
//!      │                  TransportEvent
//!  EventEmitter ◄──LiveEvent── Relay (classify JSON by "type")
//! ```
//!
//! Key design principles:
//!
//! - One [`LiveClient`] per session; clones share the connection
//! - Inbound frames are classified by their `type` field into closed,
//!   typed events; unknown types are dropped silently
//! - A bad frame produces an `Error` event and never ends the session
//! - The transport is a trait, so sessions can run over any websocket
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use listen_live::{LiveClient, LiveSchema, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = LiveClient::builder()
//!         .api_key("dg-key")
//!         .schema(LiveSchema::new().model("nova-2").interim_results(true))
//!         .connect()?;
//!
//!     client.emitter().on_transcript(|t| {
//!         if let Some(text) = t.transcript() {
//!             println!("{text}");
//!         }
//!     });
//!
//!     client.wait_for_open(Duration::from_secs(10)).await?;
//!     client.send(vec![0u8; 3200])?;
//!     client.finish()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Session handle, builder, options, events |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | WebSocket transport layer |
//!
//! # Configuration
//!
//! [`ClientOptions::from_env`] reads `DEEPGRAM_API_KEY`,
//! `DEEPGRAM_ACCESS_TOKEN` and `DEEPGRAM_API_URL`.

// ============================================================================
// Modules
// ============================================================================

/// Live transcription client.
///
/// - [`LiveClient`] - Session handle
/// - [`EventEmitter`] - Handler registry
/// - [`ClientOptions`] / [`LiveSchema`] - Connection and transcription options
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire message types.
///
/// Outbound control messages and inbound server messages.
pub mod protocol;

/// WebSocket transport layer.
///
/// The [`Transport`] contract and its tokio-tungstenite implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    AudioChunk, ClientOptions, Credentials, ErrorEvent, EventEmitter, LiveClient,
    LiveClientBuilder, LiveEvent, LiveEventKind, LiveSchema, OpenEvent, Relay, WarningEvent,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SessionId, SubscriptionId};

// Protocol types
pub use protocol::{
    Alternative, Channel, ConfigOptions, ControlMessage, MetadataEvent, ServerMessage,
    SpeechStartedEvent, TranscriptEvent, UtteranceEndEvent, Word,
};

// Transport types
pub use transport::{
    CloseEvent, InboundFrame, OutboundFrame, ReadyState, Transport, TransportEvent,
    TransportHandler, WsConnection,
};
