//! Transport ready state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

// ============================================================================
// ReadyState
// ============================================================================

/// Readiness of a websocket-like transport.
///
/// Values match the browser `WebSocket.readyState` constants.
///
/// ```text
/// Connecting ──► Open ──► Closing ──► Closed
///      │                                ▲
///      └────────────────────────────────┘  (connect failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting = 0,
    /// Frames can be exchanged.
    Open = 1,
    /// Close handshake in progress.
    Closing = 2,
    /// Connection is gone.
    Closed = 3,
}

impl ReadyState {
    /// Converts from the numeric representation.
    ///
    /// Values above 3 map to [`ReadyState::Closed`].
    #[inline]
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Returns `true` if frames can be sent.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SharedReadyState
// ============================================================================

/// Ready state shared between a transport handle and its event loop.
#[derive(Debug)]
pub(crate) struct SharedReadyState(AtomicU8);

impl SharedReadyState {
    /// Creates a shared state starting at `state`.
    #[inline]
    pub(crate) const fn new(state: ReadyState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Reads the current state.
    #[inline]
    pub(crate) fn get(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores a new state.
    #[inline]
    pub(crate) fn set(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================
