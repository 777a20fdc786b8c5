//! Wire message types.
//!
//! This module defines the JSON frames exchanged with the transcription
//! service.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`ControlMessage`] | Local → Remote | Stream control (`Configure`, `KeepAlive`, `CloseStream`, `Finalize`) |
//! | [`ServerMessage`] | Remote → Local | Results and notifications |
//!
//! Audio itself is not wrapped: binary chunks go out as raw binary frames.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `control` | Outbound control messages |
//! | `event` | Inbound server messages and classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound control messages.
pub mod control;

/// Inbound server messages.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use control::{ConfigOptions, ControlMessage};
pub use event::{
    Alternative, Channel, Classified, MetadataEvent, ServerMessage, SpeechStartedEvent,
    TranscriptEvent, UtteranceEndEvent, Word,
};
