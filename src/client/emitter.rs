//! Typed publish/subscribe registry for [`LiveEvent`]s.
//!
//! Handlers registered for a specific [`LiveEventKind`] run before catch-all
//! handlers; within each group they run in registration order. Handlers run
//! synchronously on the emitting thread (for [`WsConnection`] that is the
//! connection's event loop task), so keep them short and hand heavy work off
//! to a channel.
//!
//! The registry lock is released before handlers run, so a handler may
//! register or remove handlers, including itself.
//!
//! [`WsConnection`]: crate::transport::WsConnection

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::identifiers::SubscriptionId;
use crate::protocol::{MetadataEvent, SpeechStartedEvent, TranscriptEvent, UtteranceEndEvent};
use crate::transport::CloseEvent;

use super::events::{ErrorEvent, LiveEvent, LiveEventKind, OpenEvent, WarningEvent};

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
type SharedHandler = Arc<dyn Fn(&LiveEvent) + Send + Sync>;

/// Handlers in registration order.
type HandlerList = Vec<(SubscriptionId, SharedHandler)>;

/// Registered handlers.
#[derive(Default)]
struct Registry {
    /// Handlers for one kind.
    by_kind: FxHashMap<LiveEventKind, HandlerList>,
    /// Handlers for every event.
    any: HandlerList,
}

// ============================================================================
// EventEmitter
// ============================================================================

/// Registry of event handlers keyed by [`LiveEventKind`].
///
/// # Example
///
/// ```ignore
/// let emitter = EventEmitter::new();
/// emitter.on_transcript(|t| {
///     if let Some(text) = t.transcript() {
///         println!("{text}");
///     }
/// });
/// ```
#[derive(Default)]
pub struct EventEmitter {
    registry: Mutex<Registry>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventEmitter {
    /// Creates an emitter with no handlers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event kind.
    pub fn on<F>(&self, kind: LiveEventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.registry
            .lock()
            .by_kind
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Registers a handler for every event.
    pub fn on_any<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.registry.lock().any.push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut guard = self.registry.lock();
        let registry = &mut *guard;

        let lists = registry
            .by_kind
            .values_mut()
            .chain(std::iter::once(&mut registry.any));
        for list in lists {
            if let Some(pos) = list.iter().position(|(entry, _)| *entry == id) {
                list.remove(pos);
                return true;
            }
        }

        false
    }

    /// Removes every handler.
    pub fn clear(&self) {
        let mut registry = self.registry.lock();
        registry.by_kind.clear();
        registry.any.clear();
    }

    /// Returns the total number of registered handlers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        let registry = self.registry.lock();
        registry.by_kind.values().map(Vec::len).sum::<usize>() + registry.any.len()
    }

    /// Returns `true` if any handler would receive an event of `kind`.
    #[must_use]
    pub fn has_listeners(&self, kind: LiveEventKind) -> bool {
        let registry = self.registry.lock();
        !registry.any.is_empty()
            || registry
                .by_kind
                .get(&kind)
                .is_some_and(|list| !list.is_empty())
    }

    /// Delivers `event` to every matching handler.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &LiveEvent) -> usize {
        let handlers: Vec<SharedHandler> = {
            let registry = self.registry.lock();
            registry
                .by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(registry.any.iter())
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };

        for handler in &handlers {
            handler(event);
        }

        handlers.len()
    }
}

// ============================================================================
// Typed Registration
// ============================================================================

impl EventEmitter {
    /// Registers a handler for [`LiveEvent::Open`].
    pub fn on_open<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&OpenEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Open, move |event| {
            if let LiveEvent::Open(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::Close`].
    pub fn on_close<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Close, move |event| {
            if let LiveEvent::Close(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::Error`].
    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Error, move |event| {
            if let LiveEvent::Error(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::Warning`].
    pub fn on_warning<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&WarningEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Warning, move |event| {
            if let LiveEvent::Warning(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::Metadata`].
    pub fn on_metadata<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&MetadataEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Metadata, move |event| {
            if let LiveEvent::Metadata(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::Transcript`].
    pub fn on_transcript<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&TranscriptEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::Transcript, move |event| {
            if let LiveEvent::Transcript(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::UtteranceEnd`].
    pub fn on_utterance_end<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&UtteranceEndEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::UtteranceEnd, move |event| {
            if let LiveEvent::UtteranceEnd(e) = event {
                handler(e);
            }
        })
    }

    /// Registers a handler for [`LiveEvent::SpeechStarted`].
    pub fn on_speech_started<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SpeechStartedEvent) + Send + Sync + 'static,
    {
        self.on(LiveEventKind::SpeechStarted, move |event| {
            if let LiveEvent::SpeechStarted(e) = event {
                handler(e);
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
