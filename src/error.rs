//! Error types for listen-live.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use listen_live::{Error, Result};
//!
//! fn push(client: &LiveClient, chunk: Vec<u8>) -> Result<()> {
//!     match client.send(chunk) {
//!         Err(Error::ConnectionNotOpen { state }) => {
//!             tracing::debug!(?state, "dropping chunk");
//!             Ok(())
//!         }
//!         other => other,
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::ConnectionNotOpen`] |
//! | Frames | [`Error::MalformedFrame`], [`Error::InvalidPayload`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |
//!
//! Frame errors never reach the caller as return values: the relay reports
//! them through [`LiveEvent::Error`](crate::LiveEvent::Error).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::ReadyState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options cannot produce a valid request.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out waiting for the connection to open.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The transport task has terminated.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Audio was sent while the transport was not open.
    ///
    /// Wait for [`LiveEvent::Open`](crate::LiveEvent::Open) or check
    /// `ready_state()` before sending audio.
    #[error("Connection not open (state: {state})")]
    ConnectionNotOpen {
        /// Ready state observed at send time.
        state: ReadyState,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Inbound frame is not valid JSON (or not UTF-8).
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Parser diagnostic.
        message: String,
    },

    /// Inbound frame has a known `type` but fields of the wrong shape.
    #[error("Invalid {message_type} payload: {source}")]
    InvalidPayload {
        /// The frame's `type` discriminator.
        message_type: &'static str,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a connection-not-open error.
    #[inline]
    pub fn connection_not_open(state: ReadyState) -> Self {
        Self::ConnectionNotOpen { state }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(message_type: &'static str, source: serde_json::Error) -> Self {
        Self::InvalidPayload {
            message_type,
            source,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ConnectionNotOpen { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error describes a bad inbound frame.
    #[inline]
    #[must_use]
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame { .. } | Self::InvalidPayload { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing api key");
        assert_eq!(err.to_string(), "Configuration error: missing api key");
    }

    #[test]
    fn test_connection_not_open_display() {
        let err = Error::connection_not_open(ReadyState::Connecting);
        assert_eq!(err.to_string(), "Connection not open (state: connecting)");
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("x").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::connection_not_open(ReadyState::Closed).is_connection_error());
        assert!(Error::connection_timeout(10).is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(!Error::ConnectionClosed.is_timeout());
    }

    #[test]
    fn test_is_frame_error() {
        let json_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        assert!(Error::invalid_payload("Transcript", json_err).is_frame_error());
        assert!(Error::malformed_frame("eof").is_frame_error());
        assert!(!Error::ConnectionClosed.is_frame_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
