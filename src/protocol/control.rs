//! Outbound control messages.
//!
//! Every control message is one self-contained JSON text frame with a
//! `type` discriminator:
//!
//! | type | fields |
//! |------|--------|
//! | `Configure` | `processors`: arbitrary object |
//! | `KeepAlive` | none |
//! | `CloseStream` | none |
//! | `Finalize` | none |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Arbitrary key/value processor configuration sent with `Configure`.
pub type ConfigOptions = Map<String, Value>;

// ============================================================================
// ControlMessage
// ============================================================================

/// A control message from local end to the transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Reconfigure processing mid-stream.
    Configure {
        /// Processor options, forwarded verbatim.
        processors: ConfigOptions,
    },

    /// Keeps an idle stream from timing out server-side.
    KeepAlive,

    /// Signals that no more audio will be sent.
    CloseStream,

    /// Flushes buffered audio into final results without ending the stream.
    Finalize,
}

impl ControlMessage {
    /// Returns the wire discriminator.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "Configure",
            Self::KeepAlive => "KeepAlive",
            Self::CloseStream => "CloseStream",
            Self::Finalize => "Finalize",
        }
    }

    /// Serializes to the JSON text sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if a processor value
    /// cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
