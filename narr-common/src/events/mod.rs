//! Event types for the narration sync engine
//!
//! Provides the renderer-facing event enum and the EventBus that carries it.

mod playback_types;

pub use playback_types::{ClockId, PlaybackState, SequenceTrack};

use crate::timing::Hit;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Sync engine events
///
/// Emitted by the playback session as its published state changes. Events are
/// informational: renderers and debug overlays consume them, no engine
/// component reads them back for control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// Active token changed
    ///
    /// Triggers:
    /// - Renderer: move word highlight
    HitChanged {
        /// Chunk the hit belongs to
        chunk_id: String,
        /// New hit (None when no token is active)
        hit: Option<Hit>,
        /// Effective track time the hit was resolved at
        time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active sentence changed
    ///
    /// Triggers:
    /// - Renderer: sentence-level UI state and progressive reveal
    SentenceChanged {
        chunk_id: String,
        sentence_index: usize,
        /// Effective chunk-relative time
        chunk_time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Sequence plan position advanced or was applied by a user command
    ///
    /// Triggers:
    /// - Renderer: "which language is playing" indicator
    SequenceAdvanced {
        plan_index: usize,
        sentence_index: usize,
        track: SequenceTrack,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cross-track segment requested; host is reloading its source
    TrackSwitchRequested {
        track: SequenceTrack,
        target_time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pending seek applied after the host signalled ready
    PendingSeekApplied {
        track: SequenceTrack,
        time: f64,
        resumed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Time update jumped far enough to be treated as an implicit seek
    LargeSeekDetected {
        from: f64,
        to: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Sync controller attached to a host clock
    ClockAttached {
        clock_id: ClockId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Sync controller detached from its host clock
    ClockDetached {
        clock_id: ClockId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SyncEvent {
    /// Variant name, as used for the serde `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::HitChanged { .. } => "HitChanged",
            SyncEvent::RateChanged { .. } => "RateChanged",
            SyncEvent::SentenceChanged { .. } => "SentenceChanged",
            SyncEvent::SequenceAdvanced { .. } => "SequenceAdvanced",
            SyncEvent::TrackSwitchRequested { .. } => "TrackSwitchRequested",
            SyncEvent::PendingSeekApplied { .. } => "PendingSeekApplied",
            SyncEvent::LargeSeekDetected { .. } => "LargeSeekDetected",
            SyncEvent::ClockAttached { .. } => "ClockAttached",
            SyncEvent::ClockDetached { .. } => "ClockDetached",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus for one playback session
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// Publishing never needs a runtime, so the single-threaded engine can emit
/// from inside host callbacks.
///
/// # Examples
///
/// ```
/// use narr_common::events::{EventBus, SyncEvent};
///
/// let event_bus = EventBus::new(64);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SyncEvent::RateChanged {
///     rate: 1.5,
///     timestamp: chrono::Utc::now(),
/// });
///
/// match rx.try_recv() {
///     Ok(SyncEvent::RateChanged { rate, .. }) => assert_eq!(rate, 1.5),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///   (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SyncEvent,
    ) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
