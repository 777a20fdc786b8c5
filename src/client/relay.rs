//! Transport-to-event relay.
//!
//! [`Relay`] turns transport lifecycle callbacks into [`LiveEvent`]s:
//!
//! | Transport event | Emitted |
//! |-----------------|---------|
//! | `Open` | [`LiveEvent::Open`] |
//! | `Close` | [`LiveEvent::Close`] |
//! | `Error` | [`LiveEvent::Error`] |
//! | `Message` (recognized `type`) | the matching typed event |
//! | `Message` (bad JSON / bad payload) | [`LiveEvent::Error`] |
//! | `Message` (unknown or no `type`) | nothing |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::identifiers::SessionId;
use crate::protocol::{Classified, ServerMessage};
use crate::transport::{InboundFrame, TransportEvent};

use super::emitter::EventEmitter;
use super::events::{ErrorEvent, LiveEvent, OpenEvent};

// ============================================================================
// Relay
// ============================================================================

/// Relays one transport's callbacks to an [`EventEmitter`].
#[derive(Debug, Clone)]
pub struct Relay {
    session_id: SessionId,
    url: Url,
    emitter: Arc<EventEmitter>,
}

impl Relay {
    /// Creates a relay for one session.
    #[inline]
    #[must_use]
    pub fn new(session_id: SessionId, url: Url, emitter: Arc<EventEmitter>) -> Self {
        Self {
            session_id,
            url,
            emitter,
        }
    }

    /// Handles one transport lifecycle event.
    pub fn handle(&self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                debug!(session_id = %self.session_id, "Session open");
                self.emitter.emit(&LiveEvent::Open(OpenEvent {
                    session_id: self.session_id,
                    url: self.url.clone(),
                }));
            }

            TransportEvent::Close(close) => {
                debug!(
                    session_id = %self.session_id,
                    code = close.code,
                    reason = %close.reason,
                    "Session closed"
                );
                self.emitter.emit(&LiveEvent::Close(close));
            }

            TransportEvent::Error(message) => {
                warn!(session_id = %self.session_id, error = %message, "Transport error");
                self.emitter
                    .emit(&LiveEvent::Error(ErrorEvent::transport(message)));
            }

            TransportEvent::Message(frame) => self.dispatch_frame(frame),
        }
    }

    /// Classifies one inbound frame and emits the result.
    pub fn dispatch_frame(&self, frame: InboundFrame) {
        let classified = match &frame {
            InboundFrame::Text(text) => ServerMessage::classify(text),
            InboundFrame::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => ServerMessage::classify(text),
                Err(e) => Err(Error::malformed_frame(e.to_string())),
            },
        };

        match classified {
            Ok(Classified::Message(message)) => {
                trace!(
                    session_id = %self.session_id,
                    message_type = message.type_name(),
                    "Frame dispatched"
                );
                self.emitter.emit(&LiveEvent::from(message));
            }

            Ok(Classified::Unrecognized { message_type }) => {
                trace!(
                    session_id = %self.session_id,
                    ?message_type,
                    "Unrecognized frame dropped"
                );
            }

            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to handle frame");
                self.emitter
                    .emit(&LiveEvent::Error(ErrorEvent::frame(frame, e)));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::client::events::{DECODE_FAILURE_MESSAGE, LiveEventKind, PARSE_FAILURE_MESSAGE};
    use crate::transport::CloseEvent;

    fn recording_relay() -> (Relay, Arc<Mutex<Vec<LiveEvent>>>) {
        let emitter = Arc::new(EventEmitter::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        emitter.on_any(move |event| s.lock().push(event.clone()));

        let url = Url::parse("wss://example.test/v1/listen").expect("url");
        (Relay::new(SessionId::generate(), url, emitter), seen)
    }

    fn text(frame: &str) -> TransportEvent {
        TransportEvent::Message(InboundFrame::Text(frame.to_string()))
    }

    #[test]
    fn test_transcript_frame_emits_one_transcript() {
        let (relay, seen) = recording_relay();
        relay.handle(text(r#"{"type":"Transcript","text":"hello"}"#));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            LiveEvent::Transcript(event) => {
                assert_eq!(event.raw(), &json!({"type": "Transcript", "text": "hello"}));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_each_recognized_type_maps_to_its_kind() {
        let (relay, seen) = recording_relay();
        for (frame, kind) in [
            (r#"{"type":"Metadata"}"#, LiveEventKind::Metadata),
            (r#"{"type":"Transcript"}"#, LiveEventKind::Transcript),
            (r#"{"type":"UtteranceEnd"}"#, LiveEventKind::UtteranceEnd),
            (r#"{"type":"SpeechStarted"}"#, LiveEventKind::SpeechStarted),
        ] {
            relay.handle(text(frame));
            let last = seen.lock().pop().expect("event emitted");
            assert_eq!(last.kind(), kind);
            assert!(seen.lock().is_empty());
        }
    }

    #[test]
    fn test_malformed_frame_emits_one_error() {
        let (relay, seen) = recording_relay();
        relay.handle(text("not-json"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            LiveEvent::Error(event) => {
                assert_eq!(event.message, PARSE_FAILURE_MESSAGE);
                assert_eq!(event.frame, Some(InboundFrame::Text("not-json".into())));
                assert!(event.error.as_ref().is_some_and(|e| e.is_frame_error()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_mistyped_payload_emits_decode_error() {
        let (relay, seen) = recording_relay();
        relay.handle(text(r#"{"type":"UtteranceEnd","last_word_end":"late"}"#));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            LiveEvent::Error(e) if e.message == DECODE_FAILURE_MESSAGE
        ));
    }

    #[test]
    fn test_unknown_and_missing_type_emit_nothing() {
        let (relay, seen) = recording_relay();
        relay.handle(text(r#"{"type":"Results","channel":{}}"#));
        relay.handle(text(r#"{"text":"no type"}"#));
        relay.handle(text("[1,2,3]"));

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_binary_frames_are_decoded_as_text() {
        let (relay, seen) = recording_relay();
        relay.handle(TransportEvent::Message(InboundFrame::Binary(
            br#"{"type":"SpeechStarted","timestamp":1.0}"#.to_vec(),
        )));
        relay.handle(TransportEvent::Message(InboundFrame::Binary(vec![0xff, 0xfe])));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind(), LiveEventKind::SpeechStarted);
        assert_eq!(seen[1].kind(), LiveEventKind::Error);
    }

    #[test]
    fn test_lifecycle_events_are_relayed() {
        let (relay, seen) = recording_relay();
        relay.handle(TransportEvent::Open);
        relay.handle(TransportEvent::Error("reset by peer".into()));
        relay.handle(TransportEvent::Close(CloseEvent::new(1000, "bye")));

        let seen = seen.lock();
        let kinds: Vec<_> = seen.iter().map(LiveEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![LiveEventKind::Open, LiveEventKind::Error, LiveEventKind::Close]
        );

        match &seen[0] {
            LiveEvent::Open(open) => assert_eq!(open.url.path(), "/v1/listen"),
            other => panic!("unexpected event: {other:?}"),
        }
        match &seen[1] {
            LiveEvent::Error(error) => {
                assert_eq!(error.message, "reset by peer");
                assert!(error.frame.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
