//! Transition-in-progress state
//!
//! One owned value describing whether the session is between "a seek or
//! track switch was issued" and "the host has settled". The sequence
//! controller owns it; the sync controller and timeline resolver read it by
//! shared reference and suspend their corrective writes while it reports a
//! transition.
//!
//! **Phases:**
//! - Cross-track: `pending_seek` is set until the host's `SourceReady`
//!   arrives for the same track and target time.
//! - Same-track: the seek is applied immediately and a short frame countdown
//!   keeps the transition open until the host's time has caught up.

use narr_common::events::SequenceTrack;
use std::time::{Duration, Instant};
use tracing::debug;

/// Target times closer than this are the same request
const TARGET_TIME_TOLERANCE_SECS: f64 = 1e-6;

/// Seek waiting for the host to finish loading another track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSeek {
    pub track: SequenceTrack,
    /// Target time handed to the host with the load request
    pub requested_time: f64,
    /// Raw media time to seek to once the source is ready
    pub time: f64,
    /// Resume playback after the seek
    pub auto_play: bool,
}

impl PendingSeek {
    pub fn new(track: SequenceTrack, time: f64, auto_play: bool) -> Self {
        Self {
            track,
            requested_time: time,
            time,
            auto_play,
        }
    }

    /// Whether a ready signal answers this request
    pub fn matches(&self, track: SequenceTrack, time: f64) -> bool {
        self.track == track && (self.requested_time - time).abs() < TARGET_TIME_TOLERANCE_SECS
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransitionState {
    pending_seek: Option<PendingSeek>,
    settle_frames: u8,
    last_manual_seek: Option<Instant>,
    last_track_switch: Option<Instant>,
}

impl TransitionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_seek(&self) -> Option<&PendingSeek> {
        self.pending_seek.as_ref()
    }

    pub fn has_pending_seek(&self) -> bool {
        self.pending_seek.is_some()
    }

    /// True while a cross-track load or same-track settle is outstanding
    pub fn in_progress(&self) -> bool {
        self.pending_seek.is_some() || self.settle_frames > 0
    }

    pub fn last_manual_seek(&self) -> Option<Instant> {
        self.last_manual_seek
    }

    /// Record a cross-track request; the newest request always wins
    ///
    /// Returns the superseded pending seek, if any.
    pub fn begin_track_switch(&mut self, pending: PendingSeek, now: Instant) -> Option<PendingSeek> {
        let superseded = self.pending_seek.replace(pending);
        if let Some(old) = &superseded {
            debug!(
                "Pending seek to {:.3}s on {} superseded by {:.3}s on {}",
                old.time, old.track, pending.time, pending.track
            );
        }
        self.settle_frames = 0;
        self.last_track_switch = Some(now);
        superseded
    }

    /// Move an outstanding cross-track seek to a new target time
    ///
    /// The load request already sent to the host keeps its original target,
    /// so the ready signal still matches. Returns false when nothing is
    /// pending.
    pub fn retarget_pending(&mut self, time: f64) -> bool {
        match self.pending_seek.as_mut() {
            Some(pending) => {
                pending.time = time;
                true
            }
            None => false,
        }
    }

    /// Take the pending seek if a ready signal matches it
    ///
    /// Stale or redundant ready signals return None and leave state alone.
    pub fn complete_pending(&mut self, track: SequenceTrack, target_time: f64) -> Option<PendingSeek> {
        let pending = self.pending_seek?;
        if !pending.matches(track, target_time) {
            return None;
        }
        self.pending_seek = None;
        Some(pending)
    }

    /// Record a manual seek that was applied immediately
    pub fn mark_manual_seek(&mut self, now: Instant, settle_frames: u8) {
        self.last_manual_seek = Some(now);
        self.settle_frames = settle_frames;
    }

    /// Advance the settle countdown by one animation frame
    ///
    /// Returns true when this frame closed the transition.
    pub fn on_frame(&mut self) -> bool {
        if self.settle_frames == 0 {
            return false;
        }
        self.settle_frames -= 1;
        self.settle_frames == 0 && self.pending_seek.is_none()
    }

    /// Whether a manual seek happened less than `window` before `now`
    pub fn within_post_seek_window(&self, now: Instant, window: Duration) -> bool {
        self.last_manual_seek
            .map(|t| now.saturating_duration_since(t) < window)
            .unwrap_or(false)
    }

    /// Whether a track switch is outstanding or happened less than `window` ago
    pub fn recently_switched_track(&self, now: Instant, window: Duration) -> bool {
        self.pending_seek.is_some()
            || self
                .last_track_switch
                .map(|t| now.saturating_duration_since(t) < window)
                .unwrap_or(false)
    }

    /// Forget everything (new plan or chunk)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
