//! Live transcription client.
//!
//! This module provides the session-facing types:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`LiveClient`] | Session handle: send audio, control messages, close |
//! | [`LiveClientBuilder`] | Options, schema and early handlers |
//! | [`EventEmitter`] | Per-kind handler registry |
//! | [`Relay`] | Transport callbacks to typed events |
//! | [`ClientOptions`] / [`LiveSchema`] | Endpoint and transcription options |
//!
//! # Example
//!
//! ```no_run
//! use listen_live::{LiveClient, LiveSchema, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = LiveClient::builder()
//!     .api_key("dg-key")
//!     .schema(LiveSchema::new().model("nova-2"))
//!     .connect()?;
//!
//! client.emitter().on_transcript(|t| {
//!     if let Some(text) = t.transcript() {
//!         println!("{text}");
//!     }
//! });
//!
//! client.wait_for_open(std::time::Duration::from_secs(10)).await?;
//! client.send(vec![0u8; 3200])?;
//! client.finish()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Session builder.
pub mod builder;

/// Session handle.
pub mod core;

/// Event handler registry.
pub mod emitter;

/// Consumer-facing event types.
pub mod events;

/// Connection options and transcription schema.
pub mod options;

/// Transport-to-event relay.
pub mod relay;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::LiveClientBuilder;
pub use core::{AudioChunk, LiveClient};
pub use emitter::EventEmitter;
pub use events::{ErrorEvent, LiveEvent, LiveEventKind, OpenEvent, WarningEvent};
pub use options::{ClientOptions, Credentials, LiveSchema};
pub use relay::Relay;
