//! WebSocket transport layer.
//!
//! This module defines the contract the live client needs from a
//! bidirectional connection, plus the tokio-tungstenite implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  LiveClient     │                              │  Transcription  │
//! │                 │         WebSocket            │  Service        │
//! │  WsConnection   │◄────────────────────────────►│                 │
//! │  (event loop)   │     wss://host/v1/listen     │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `WsConnection::open` - Spawn the event loop, state `Connecting`
//! 2. Handshake succeeds - state `Open`, [`TransportEvent::Open`]
//! 3. Frames flow both ways - [`TransportEvent::Message`]
//! 4. Either side closes - state `Closing` then `Closed`, [`TransportEvent::Close`]
//!
//! [`TransportEvent::Error`] may fire in any state without a transition.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `state` | Ready state |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Transport ready state.
pub mod state;

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsConnection;
pub use state::ReadyState;

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the connection ends without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

// ============================================================================
// Frames
// ============================================================================

/// A frame written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

impl OutboundFrame {
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

/// A frame read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame, expected to hold UTF-8 text.
    Binary(Vec<u8>),
}

// ============================================================================
// CloseEvent
// ============================================================================

/// Details of a closed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close event for a connection that dropped without a close frame.
    #[inline]
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(ABNORMAL_CLOSE_CODE, reason)
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle callbacks delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake completed.
    Open,
    /// A frame arrived.
    Message(InboundFrame),
    /// The connection closed. Delivered once.
    Close(CloseEvent),
    /// A transport-level failure.
    Error(String),
}

/// Transport event callback.
///
/// Called from the transport's event loop for each lifecycle event.
pub type TransportHandler = Box<dyn Fn(TransportEvent) + Send + Sync>;

// ============================================================================
// Transport
// ============================================================================

/// A websocket-like bidirectional connection.
///
/// Implementations own their I/O; none of these methods may block.
pub trait Transport: Send + Sync {
    /// Returns the current ready state.
    fn ready_state(&self) -> ReadyState;

    /// Queues a frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if
    /// the connection can no longer accept frames.
    fn send(&self, frame: OutboundFrame) -> Result<()>;

    /// Starts the close handshake. Idempotent.
    fn close(&self);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_frame_len() {
        assert_eq!(OutboundFrame::Text("abc".into()).len(), 3);
        assert!(OutboundFrame::Binary(Vec::new()).is_empty());
        assert!(!OutboundFrame::Binary(vec![0]).is_empty());
    }

    #[test]
    fn test_abnormal_close() {
        let event = CloseEvent::abnormal("reset");
        assert_eq!(event.code, 1006);
        assert_eq!(event.reason, "reset");
    }
}
