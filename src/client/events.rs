//! Consumer-facing event types.
//!
//! One closed enum, [`LiveEvent`], covers everything a session can emit.
//! [`LiveEventKind`] is its fieldless mirror, used to subscribe to one kind.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::Error;
use crate::identifiers::SessionId;
use crate::protocol::{
    MetadataEvent, ServerMessage, SpeechStartedEvent, TranscriptEvent, UtteranceEndEvent,
};
use crate::transport::{CloseEvent, InboundFrame};

// ============================================================================
// Constants
// ============================================================================

/// Error message for inbound frames that are not JSON.
pub const PARSE_FAILURE_MESSAGE: &str = "Unable to parse frame as JSON";

/// Error message for recognized frames whose fields have the wrong shape.
pub const DECODE_FAILURE_MESSAGE: &str = "Unable to decode frame payload";

/// Warning emitted instead of sending an empty binary chunk.
pub const EMPTY_CHUNK_WARNING: &str = "Empty audio chunk was not sent. \
     If you meant to end the stream, call finish() to send a CloseStream message.";

// ============================================================================
// LiveEventKind
// ============================================================================

/// Event kinds, for per-kind subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveEventKind {
    Open,
    Close,
    Error,
    Warning,
    Metadata,
    Transcript,
    UtteranceEnd,
    SpeechStarted,
}

impl LiveEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Close,
        Self::Error,
        Self::Warning,
        Self::Metadata,
        Self::Transcript,
        Self::UtteranceEnd,
        Self::SpeechStarted,
    ];

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Close => "Close",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Metadata => "Metadata",
            Self::Transcript => "Transcript",
            Self::UtteranceEnd => "UtteranceEnd",
            Self::SpeechStarted => "SpeechStarted",
        }
    }
}

impl fmt::Display for LiveEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// The connection opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEvent {
    /// Session that opened.
    pub session_id: SessionId,
    /// URL the session connected to.
    pub url: Url,
}

/// A recoverable failure: a bad inbound frame or a transport error.
///
/// Never terminates the session by itself.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// Human-readable summary.
    pub message: String,
    /// The offending frame, for frame errors.
    pub frame: Option<InboundFrame>,
    /// Underlying error, for frame errors.
    pub error: Option<Arc<Error>>,
}

impl ErrorEvent {
    /// Error event for an inbound frame that could not be handled.
    #[must_use]
    pub fn frame(frame: InboundFrame, error: Error) -> Self {
        let message = match error {
            Error::InvalidPayload { .. } => DECODE_FAILURE_MESSAGE,
            _ => PARSE_FAILURE_MESSAGE,
        };

        Self {
            message: message.to_string(),
            frame: Some(frame),
            error: Some(Arc::new(error)),
        }
    }

    /// Error event reported by the transport.
    #[inline]
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            frame: None,
            error: None,
        }
    }
}

/// Non-fatal advice for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningEvent {
    /// Warning text.
    pub message: String,
}

impl WarningEvent {
    /// Creates a warning.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// LiveEvent
// ============================================================================

/// Every event a live session can emit.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// Connection opened; audio may be sent.
    Open(OpenEvent),
    /// Connection closed.
    Close(CloseEvent),
    /// Recoverable error.
    Error(ErrorEvent),
    /// Non-fatal warning.
    Warning(WarningEvent),
    /// Session metadata.
    Metadata(MetadataEvent),
    /// Transcription result.
    Transcript(TranscriptEvent),
    /// End of utterance.
    UtteranceEnd(UtteranceEndEvent),
    /// Speech detected.
    SpeechStarted(SpeechStartedEvent),
}

impl LiveEvent {
    /// Returns this event's kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> LiveEventKind {
        match self {
            Self::Open(_) => LiveEventKind::Open,
            Self::Close(_) => LiveEventKind::Close,
            Self::Error(_) => LiveEventKind::Error,
            Self::Warning(_) => LiveEventKind::Warning,
            Self::Metadata(_) => LiveEventKind::Metadata,
            Self::Transcript(_) => LiveEventKind::Transcript,
            Self::UtteranceEnd(_) => LiveEventKind::UtteranceEnd,
            Self::SpeechStarted(_) => LiveEventKind::SpeechStarted,
        }
    }
}

impl From<ServerMessage> for LiveEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Metadata(e) => Self::Metadata(e),
            ServerMessage::Transcript(e) => Self::Transcript(e),
            ServerMessage::UtteranceEnd(e) => Self::UtteranceEnd(e),
            ServerMessage::SpeechStarted(e) => Self::SpeechStarted(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::Classified;

    #[test]
    fn test_server_message_kind_matches_type_name() {
        for text in [
            r#"{"type":"Metadata"}"#,
            r#"{"type":"Transcript"}"#,
            r#"{"type":"UtteranceEnd"}"#,
            r#"{"type":"SpeechStarted"}"#,
        ] {
            let Classified::Message(message) = ServerMessage::classify(text).expect("classify")
            else {
                panic!("expected message for {text}");
            };
            let type_name = message.type_name();
            assert_eq!(LiveEvent::from(message).kind().as_str(), type_name);
        }
    }

    #[test]
    fn test_frame_error_messages() {
        let frame = InboundFrame::Text("not-json".into());
        let event = ErrorEvent::frame(frame.clone(), Error::malformed_frame("expected value"));
        assert_eq!(event.message, PARSE_FAILURE_MESSAGE);
        assert_eq!(event.frame, Some(frame));

        let json_err = serde_json::from_str::<bool>("1").unwrap_err();
        let event = ErrorEvent::frame(
            InboundFrame::Text("{}".into()),
            Error::invalid_payload("Transcript", json_err),
        );
        assert_eq!(event.message, DECODE_FAILURE_MESSAGE);
    }

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<_> = LiveEventKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), LiveEventKind::ALL.len());
    }
}
