//! Inbound server message types.
//!
//! Server frames are JSON objects discriminated by a `type` field. Four
//! discriminators are recognized; anything else is accepted on the wire and
//! dropped.
//!
//! # Message Types
//!
//! | `type` | Payload |
//! |--------|---------|
//! | `Metadata` | [`MetadataEvent`] |
//! | `Transcript` | [`TranscriptEvent`] |
//! | `UtteranceEnd` | [`UtteranceEndEvent`] |
//! | `SpeechStarted` | [`SpeechStartedEvent`] |
//!
//! Discriminators are disjoint strings, so classification is an exclusive
//! match: one frame yields at most one message.
//!
//! Every payload field is optional on the wire, and an explicit `null` reads
//! the same as an absent field. A field that is present with the wrong JSON
//! type fails the decode with [`Error::InvalidPayload`].

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Name of the discriminator field on inbound frames.
pub const DISCRIMINATOR_FIELD: &str = "type";

// ============================================================================
// Payload Trait
// ============================================================================

/// Implemented by payloads that keep the parsed frame alongside typed fields.
trait Payload: DeserializeOwned {
    /// Wire discriminator for this payload.
    const TYPE_NAME: &'static str;

    /// Stores the full parsed frame.
    fn set_raw(&mut self, raw: Value);
}

/// Decodes a typed payload, keeping `value` as the raw frame.
fn decode<T: Payload>(value: Value) -> Result<T> {
    let mut payload =
        T::deserialize(&value).map_err(|e| Error::invalid_payload(T::TYPE_NAME, e))?;
    payload.set_raw(value);
    Ok(payload)
}

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> StdResult<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// MetadataEvent
// ============================================================================

/// Session metadata, sent once the service accepts the stream and again when
/// it closes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetadataEvent {
    /// Service-assigned request ID.
    pub request_id: Option<String>,
    /// Hash of the received audio.
    pub sha256: Option<String>,
    /// Creation timestamp.
    pub created: Option<String>,
    /// Audio duration in seconds.
    pub duration: Option<f64>,
    /// Number of audio channels.
    pub channels: Option<u32>,
    /// Model UUIDs used for the session.
    #[serde(deserialize_with = "null_as_default")]
    pub models: Vec<String>,
    /// Per-model details keyed by model UUID.
    #[serde(deserialize_with = "null_as_default")]
    pub model_info: Map<String, Value>,
    #[serde(skip)]
    raw: Value,
}

impl MetadataEvent {
    /// Returns the full parsed frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Payload for MetadataEvent {
    const TYPE_NAME: &'static str = "Metadata";

    fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }
}

// ============================================================================
// TranscriptEvent
// ============================================================================

/// A transcription result, interim or final.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranscriptEvent {
    /// `[channel, total_channels]`.
    #[serde(deserialize_with = "null_as_default")]
    pub channel_index: Vec<u32>,
    /// Duration of the audio segment in seconds.
    pub duration: Option<f64>,
    /// Segment start offset in seconds.
    pub start: Option<f64>,
    /// The segment will not be revised.
    #[serde(deserialize_with = "null_as_default")]
    pub is_final: bool,
    /// The speaker paused (endpoint detected).
    #[serde(deserialize_with = "null_as_default")]
    pub speech_final: bool,
    /// Result was produced by a `Finalize` request.
    #[serde(deserialize_with = "null_as_default")]
    pub from_finalize: bool,
    /// Recognition alternatives.
    pub channel: Option<Channel>,
    #[serde(skip)]
    raw: Value,
}

impl TranscriptEvent {
    /// Returns the full parsed frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the best alternative, if any.
    #[must_use]
    pub fn best(&self) -> Option<&Alternative> {
        self.channel.as_ref()?.alternatives.first()
    }

    /// Returns the best alternative's transcript text.
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        self.best().map(|a| a.transcript.as_str())
    }
}

impl Payload for TranscriptEvent {
    const TYPE_NAME: &'static str = "Transcript";

    fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }
}

/// Alternatives for one audio channel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Channel {
    /// Alternatives, best first.
    #[serde(deserialize_with = "null_as_default")]
    pub alternatives: Vec<Alternative>,
}

/// One recognition hypothesis.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Alternative {
    /// Transcript text.
    #[serde(deserialize_with = "null_as_default")]
    pub transcript: String,
    /// Confidence in `[0, 1]`.
    #[serde(deserialize_with = "null_as_default")]
    pub confidence: f64,
    /// Word-level timing.
    #[serde(deserialize_with = "null_as_default")]
    pub words: Vec<Word>,
}

/// A recognized word.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Word {
    /// Raw word.
    #[serde(deserialize_with = "null_as_default")]
    pub word: String,
    /// Start offset in seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub start: f64,
    /// End offset in seconds.
    #[serde(deserialize_with = "null_as_default")]
    pub end: f64,
    /// Confidence in `[0, 1]`.
    #[serde(deserialize_with = "null_as_default")]
    pub confidence: f64,
    /// Word with punctuation/casing applied, when requested.
    pub punctuated_word: Option<String>,
    /// Speaker index, when diarization is on.
    pub speaker: Option<u32>,
}

// ============================================================================
// UtteranceEndEvent
// ============================================================================

/// A gap in speech long enough to end an utterance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UtteranceEndEvent {
    /// `[channel, total_channels]`.
    #[serde(deserialize_with = "null_as_default")]
    pub channel: Vec<u32>,
    /// End of the last word before the gap, in seconds.
    pub last_word_end: Option<f64>,
    #[serde(skip)]
    raw: Value,
}

impl UtteranceEndEvent {
    /// Returns the full parsed frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Payload for UtteranceEndEvent {
    const TYPE_NAME: &'static str = "UtteranceEnd";

    fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }
}

// ============================================================================
// SpeechStartedEvent
// ============================================================================

/// Voice activity detected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeechStartedEvent {
    /// `[channel, total_channels]`.
    #[serde(deserialize_with = "null_as_default")]
    pub channel: Vec<u32>,
    /// Offset of the detected speech in seconds.
    pub timestamp: Option<f64>,
    #[serde(skip)]
    raw: Value,
}

impl SpeechStartedEvent {
    /// Returns the full parsed frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Payload for SpeechStartedEvent {
    const TYPE_NAME: &'static str = "SpeechStarted";

    fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// A recognized inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// `type: "Metadata"`.
    Metadata(MetadataEvent),
    /// `type: "Transcript"`.
    Transcript(TranscriptEvent),
    /// `type: "UtteranceEnd"`.
    UtteranceEnd(UtteranceEndEvent),
    /// `type: "SpeechStarted"`.
    SpeechStarted(SpeechStartedEvent),
}

/// Result of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// One of the recognized discriminators.
    Message(ServerMessage),
    /// Valid JSON whose `type` is absent or unknown.
    Unrecognized {
        /// The discriminator value, if it was a string.
        message_type: Option<String>,
    },
}

impl ServerMessage {
    /// Parses and classifies a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedFrame`] if `text` is not valid JSON
    /// - [`Error::InvalidPayload`] if a recognized payload has mistyped fields
    pub fn classify(text: &str) -> Result<Classified> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))?;
        Self::classify_value(value)
    }

    /// Classifies an already-parsed frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPayload`] if a recognized payload has mistyped
    /// fields.
    pub fn classify_value(value: Value) -> Result<Classified> {
        let message_type = value.get(DISCRIMINATOR_FIELD).and_then(Value::as_str);

        let message = match message_type {
            Some("Metadata") => Self::Metadata(decode(value)?),
            Some("Transcript") => Self::Transcript(decode(value)?),
            Some("UtteranceEnd") => Self::UtteranceEnd(decode(value)?),
            Some("SpeechStarted") => Self::SpeechStarted(decode(value)?),
            other => {
                return Ok(Classified::Unrecognized {
                    message_type: other.map(str::to_string),
                });
            }
        };

        Ok(Classified::Message(message))
    }

    /// Returns the wire discriminator.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Metadata(_) => MetadataEvent::TYPE_NAME,
            Self::Transcript(_) => TranscriptEvent::TYPE_NAME,
            Self::UtteranceEnd(_) => UtteranceEndEvent::TYPE_NAME,
            Self::SpeechStarted(_) => SpeechStartedEvent::TYPE_NAME,
        }
    }

    /// Returns the full parsed frame.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        match self {
            Self::Metadata(e) => e.raw(),
            Self::Transcript(e) => e.raw(),
            Self::UtteranceEnd(e) => e.raw(),
            Self::SpeechStarted(e) => e.raw(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
