//! Sync controller
//!
//! Keeps the published hit (active token) and playback rate in step with a
//! host clock.
//!
//! **States:**
//! - *Idle*: no clock attached; notifications are not drained
//! - *Attached*: subscribed to one host clock's time, seek and rate events
//!
//! **Transitions:** `start(media)` detaches any previous clock and attaches
//! the new one (no-op for the clock already attached); `stop()` unsubscribes
//! and returns to Idle. Each event class has a named handler:
//! [`SyncController::on_time_update`], [`SyncController::on_seek`] and
//! [`SyncController::on_rate_change`].
//!
//! Handlers never fail. Missing payloads, non-finite times and detached
//! elements all degrade to "no active hit"; nothing is retried because the
//! host's next notification re-derives everything.

use super::clock::{coerce_media_time, effective_time, MediaClock};
use super::diagnostics::SyncDiagnostics;
use super::search::{find_nearest_token, is_large_seek};
use crate::config::SyncTuning;
use crate::host::{ClockEvent, HostMedia};
use crate::sequence::TransitionState;
use narr_common::events::{ClockId, EventBus, SyncEvent};
use narr_common::timing::{Hit, TrackTimingPayload};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Reported controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Attached(ClockId),
}

/// Live subscription to one host clock
struct Attachment {
    clock_id: ClockId,
    rx: broadcast::Receiver<ClockEvent>,
}

pub struct SyncController {
    attachment: Option<Attachment>,

    /// Timing payload for the track currently playing
    payload: Option<Arc<TrackTimingPayload>>,

    /// Published hit
    hit: Option<Hit>,

    /// Search hint; cleared on seeks so the next search is a full one
    hint: Option<Hit>,

    /// Last raw media time seen
    last_time: f64,

    rate: f64,
    diagnostics: SyncDiagnostics,
    tuning: SyncTuning,
    bus: EventBus,
}

impl SyncController {
    pub fn new(tuning: SyncTuning, bus: EventBus) -> Self {
        Self {
            attachment: None,
            payload: None,
            hit: None,
            hint: None,
            last_time: 0.0,
            rate: 1.0,
            diagnostics: SyncDiagnostics::default(),
            tuning,
            bus,
        }
    }

    pub fn state(&self) -> SyncState {
        match &self.attachment {
            Some(a) => SyncState::Attached(a.clock_id),
            None => SyncState::Idle,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Attach to a host clock
    ///
    /// Returns false (and does nothing) when this clock is already attached.
    pub fn start(&mut self, media: &dyn HostMedia) -> bool {
        let clock_id = media.id();
        if self.attachment.as_ref().map(|a| a.clock_id) == Some(clock_id) {
            return false;
        }
        self.stop();

        let clock = MediaClock::new(media);
        self.last_time = clock.media_time();
        self.rate = clock.playback_rate();
        self.hint = self.hit;
        self.attachment = Some(Attachment {
            clock_id,
            rx: media.subscribe(),
        });

        info!("Sync controller attached to clock {} at {:.3}s", clock_id, self.last_time);
        self.bus.emit_lossy(SyncEvent::ClockAttached {
            clock_id,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Detach from the current clock, if any
    pub fn stop(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            info!("Sync controller detached from clock {}", attachment.clock_id);
            self.hint = None;
            self.bus.emit_lossy(SyncEvent::ClockDetached {
                clock_id: attachment.clock_id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Replace the timing payload; the hit and hint reset with it
    pub fn set_payload(&mut self, payload: Option<Arc<TrackTimingPayload>>) {
        self.payload = payload;
        self.hint = None;
        self.publish(None, 0.0);
    }

    pub fn payload(&self) -> Option<&Arc<TrackTimingPayload>> {
        self.payload.as_ref()
    }

    /// Receive the next host notification
    ///
    /// Time, seek and rate notifications are handled here before being
    /// returned; the caller routes every notification onward. Returns None
    /// when idle or when nothing is queued.
    pub fn next_event(&mut self, transition: &TransitionState) -> Option<ClockEvent> {
        loop {
            let received = self.attachment.as_mut()?.rx.try_recv();
            match received {
                Ok(event) => {
                    match event {
                        ClockEvent::TimeUpdate(time) => self.on_time_update(time, transition),
                        ClockEvent::Seeked(time) => self.on_seek(time, transition),
                        ClockEvent::RateChanged(rate) => self.on_rate_change(rate),
                        _ => {}
                    }
                    return Some(event);
                }
                Err(TryRecvError::Lagged(count)) => {
                    warn!("Sync controller lagged, {} host notification(s) lost", count);
                    self.diagnostics.record_lagged(count);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    warn!("Host clock closed its notification channel");
                    self.stop();
                    return None;
                }
            }
        }
    }

    /// Periodic time notification (raw media seconds)
    pub fn on_time_update(&mut self, raw_time: f64, transition: &TransitionState) {
        let time = coerce_media_time(raw_time);

        // Host time is transient while a seek or source change settles
        if transition.in_progress() {
            self.last_time = time;
            return;
        }

        if is_large_seek(self.last_time, time, self.tuning.large_seek_threshold_secs) {
            debug!("Large seek {:.3}s -> {:.3}s, discarding hint", self.last_time, time);
            self.diagnostics.record_large_seek();
            self.bus.emit_lossy(SyncEvent::LargeSeekDetected {
                from: self.last_time,
                to: time,
                timestamp: chrono::Utc::now(),
            });
            self.hint = None;
            self.publish(None, time);
        }

        self.resolve(time, true);
        self.last_time = time;
    }

    /// Explicit seek notification (raw media seconds)
    pub fn on_seek(&mut self, raw_time: f64, transition: &TransitionState) {
        let time = coerce_media_time(raw_time);
        self.hint = None;
        self.publish(None, time);
        self.last_time = time;

        // The pending seek's own Seeked resolves once the new source is live
        if transition.has_pending_seek() {
            return;
        }
        self.resolve(time, false);
    }

    /// Rate change notification; non-finite or non-positive rates ignored
    pub fn on_rate_change(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            debug!("Ignoring invalid playback rate {}", rate);
            return;
        }
        if rate != self.rate {
            self.rate = rate;
            self.bus.emit_lossy(SyncEvent::RateChanged {
                rate,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Run the search and publish the result
    ///
    /// With `guard` set, a hit that would sort before the published one is
    /// discarded as jitter.
    fn resolve(&mut self, raw_time: f64, guard: bool) {
        let payload = match self.payload.as_ref() {
            Some(p) if !p.is_empty() => Arc::clone(p),
            _ => {
                if self.hit.is_some() {
                    self.diagnostics.record_dropped_frame();
                    self.publish(None, raw_time);
                }
                self.hint = None;
                return;
            }
        };

        let time = effective_time(raw_time, payload.track_offset(), payload.tempo_factor());
        match find_nearest_token(&payload, time, self.hint) {
            None => {
                self.hint = None;
                self.publish(None, time);
            }
            Some(found) => {
                if guard && self.hit.is_some_and(|current| found < current) {
                    debug!(
                        "Discarding backward hit {} < {:?} at {:.3}s",
                        found.segment_index, self.hit, time
                    );
                    self.diagnostics.record_drift_correction();
                    return;
                }
                self.hint = Some(found);
                self.publish(Some(found), time);
            }
        }
    }

    fn publish(&mut self, hit: Option<Hit>, time: f64) {
        if self.hit == hit {
            return;
        }
        self.hit = hit;
        let chunk_id = self
            .payload
            .as_ref()
            .map(|p| p.chunk_id().to_string())
            .unwrap_or_default();
        self.bus.emit_lossy(SyncEvent::HitChanged {
            chunk_id,
            hit,
            time,
            timestamp: chrono::Utc::now(),
        });
    }

    pub fn current_hit(&self) -> Option<Hit> {
        self.hit
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn last_time(&self) -> f64 {
        self.last_time
    }

    pub fn diagnostics(&self) -> SyncDiagnostics {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ScriptedMedia;
    use narr_common::timing::{Lane, SchemaVersion, Token, TrackType};

    fn tok(i: u32, t0: f64, t1: f64) -> Token {
        Token {
            id: format!("t{}", i),
            sentence_id: 0,
            token_index: i,
            lane: Lane::Original,
            text: String::new(),
            t0,
            t1,
        }
    }

    fn two_token_payload() -> Arc<TrackTimingPayload> {
        Arc::new(TrackTimingPayload::new(
            TrackType::Original,
            "chunk",
            vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)],
            vec![],
            0.0,
            1.0,
            SchemaVersion::V2,
        ))
    }

    fn ten_token_payload() -> Arc<TrackTimingPayload> {
        Arc::new(TrackTimingPayload::new(
            TrackType::Original,
            "chunk",
            (0..10).map(|i| tok(i, i as f64, i as f64 + 1.0)).collect(),
            vec![],
            0.0,
            1.0,
            SchemaVersion::V2,
        ))
    }

    fn controller() -> SyncController {
        SyncController::new(SyncTuning::default(), EventBus::new(64))
    }

    fn drain(sync: &mut SyncController, transition: &TransitionState) -> usize {
        let mut count = 0;
        while sync.next_event(transition).is_some() {
            count += 1;
        }
        count
    }

    #[test]
    fn test_start_and_stop() {
        let media = ScriptedMedia::new(16);
        let mut sync = controller();
        assert_eq!(sync.state(), SyncState::Idle);

        assert!(sync.start(&media));
        assert_eq!(sync.state(), SyncState::Attached(media.id()));

        // Same clock twice is a no-op
        assert!(!sync.start(&media));

        sync.stop();
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn test_start_replaces_previous_clock() {
        let first = ScriptedMedia::new(16);
        let mut second = ScriptedMedia::new(16);
        second.set_time_silently(7.5);

        let mut sync = controller();
        sync.start(&first);
        assert!(sync.start(&second));
        assert_eq!(sync.state(), SyncState::Attached(second.id()));
        assert_eq!(sync.last_time(), 7.5);
    }

    #[test]
    fn test_idle_controller_drains_nothing() {
        let mut media = ScriptedMedia::new(16);
        let mut sync = controller();
        media.advance_to(1.0);
        assert!(sync.next_event(&TransitionState::new()).is_none());
    }

    #[test]
    fn test_time_update_inside_token() {
        let mut media = ScriptedMedia::new(16);
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(two_token_payload()));
        sync.start(&media);

        media.advance_to(1.5);
        assert_eq!(drain(&mut sync, &transition), 1);
        assert_eq!(sync.current_hit(), Some(Hit { segment_index: 1, token_index: 1 }));
    }

    #[test]
    fn test_large_jump_past_end_clears_hit() {
        let mut media = ScriptedMedia::new(16);
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(two_token_payload()));
        sync.start(&media);

        media.advance_to(0.9);
        drain(&mut sync, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(0));

        media.advance_to(3.0);
        drain(&mut sync, &transition);
        assert_eq!(sync.current_hit(), None);
        assert_eq!(sync.diagnostics().large_seeks, 1);
    }

    #[test]
    fn test_small_jitter_does_not_clear_or_regress() {
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));

        sync.on_time_update(5.2, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(5));
        let seeks_before = sync.diagnostics().large_seeks;

        // Jittery sample slightly behind the boundary
        sync.on_time_update(4.95, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(5));
        assert_eq!(sync.diagnostics().drift_corrections, 1);
        assert_eq!(sync.diagnostics().large_seeks, seeks_before);
    }

    #[test]
    fn test_large_backward_jump_allowed() {
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));

        sync.on_time_update(8.5, &transition);
        sync.on_time_update(1.5, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(1));
        assert_eq!(sync.diagnostics().drift_corrections, 0);
    }

    #[test]
    fn test_seek_moves_backward_without_guard() {
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));

        sync.on_time_update(5.5, &transition);
        sync.on_seek(4.5, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(4));
        assert_eq!(sync.last_time(), 4.5);
        assert_eq!(sync.diagnostics().drift_corrections, 0);
    }

    #[test]
    fn test_missing_payload_drops_frame() {
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));
        sync.on_time_update(2.5, &transition);
        assert!(sync.current_hit().is_some());

        // Payload swapped for an empty one without resetting through set_payload
        sync.payload = Some(Arc::new(TrackTimingPayload::new(
            TrackType::Original,
            "chunk",
            vec![],
            vec![],
            0.0,
            1.0,
            SchemaVersion::V2,
        )));
        sync.on_time_update(2.6, &transition);
        assert_eq!(sync.current_hit(), None);
        assert_eq!(sync.diagnostics().dropped_frames, 1);

        // Nothing published: nothing to drop
        sync.on_time_update(2.7, &transition);
        assert_eq!(sync.diagnostics().dropped_frames, 1);
    }

    #[test]
    fn test_non_finite_time_degrades() {
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));
        sync.on_seek(f64::NAN, &transition);
        assert_eq!(sync.last_time(), 0.0);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(0));
    }

    #[test]
    fn test_rate_change() {
        let mut sync = controller();
        sync.on_rate_change(1.5);
        assert_eq!(sync.rate(), 1.5);
        sync.on_rate_change(0.0);
        sync.on_rate_change(f64::NAN);
        sync.on_rate_change(-2.0);
        assert_eq!(sync.rate(), 1.5);
    }

    #[test]
    fn test_transition_suspends_time_updates() {
        let mut sync = controller();
        let mut transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));
        sync.on_time_update(5.5, &transition);
        let seeks_before = sync.diagnostics().large_seeks;

        transition.mark_manual_seek(std::time::Instant::now(), 2);
        sync.on_time_update(0.0, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(5));
        assert_eq!(sync.diagnostics().large_seeks, seeks_before);
        assert_eq!(sync.last_time(), 0.0);
    }

    #[test]
    fn test_tempo_and_offset_applied() {
        let mut sync = controller();
        let transition = TransitionState::new();
        // Effective = (raw - 1) / 2
        sync.set_payload(Some(Arc::new(TrackTimingPayload::new(
            TrackType::Translated,
            "chunk",
            (0..10).map(|i| tok(i, i as f64, i as f64 + 1.0)).collect(),
            vec![],
            1.0,
            2.0,
            SchemaVersion::V2,
        ))));

        sync.on_seek(8.0, &transition);
        assert_eq!(sync.current_hit().map(|h| h.segment_index), Some(3));
    }

    #[test]
    fn test_hit_events_published() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut sync = SyncController::new(SyncTuning::default(), bus);
        let transition = TransitionState::new();
        sync.set_payload(Some(ten_token_payload()));

        sync.on_time_update(0.5, &transition);
        sync.on_time_update(0.6, &transition);
        sync.on_time_update(1.2, &transition);

        let hits: Vec<Option<usize>> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                SyncEvent::HitChanged { hit, .. } => Some(hit.map(|h| h.segment_index)),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_lagged_subscription_counted() {
        let mut media = ScriptedMedia::new(2);
        let mut sync = controller();
        let transition = TransitionState::new();
        sync.start(&media);
        for i in 0..5 {
            media.advance_to(i as f64 * 0.1);
        }
        let drained = drain(&mut sync, &transition);
        assert_eq!(drained, 2);
        assert_eq!(sync.diagnostics().lagged_events, 3);
    }
}
