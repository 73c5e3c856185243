//! Sequence playback controller
//!
//! Drives alternating-track playback through a [`SequencePlan`]: advances
//! to the next segment when the current one ends, performs the two-phase
//! track switch handshake with the host, and handles user skips and token
//! seeks.
//!
//! **Apply-segment protocol:**
//! - Different track: record a pending seek, ask the host to load the other
//!   track, and wait for its ready signal
//! - Same track: seek immediately and open a short settle window
//! - Same track while it is still loading: retarget the pending seek
//!
//! The controller owns the session's [`TransitionState`] and lends it to the
//! other components by shared reference.

use super::plan::{SequencePlan, SequenceSegment};
use super::transition::{PendingSeek, TransitionState};
use crate::config::SequenceTuning;
use crate::host::HostMedia;
use narr_common::events::{EventBus, PlaybackState, SequenceTrack, SyncEvent};
use narr_common::timing::Lane;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Lanes currently shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibleLanes {
    pub original: bool,
    pub translation: bool,
}

impl Default for VisibleLanes {
    fn default() -> Self {
        Self {
            original: true,
            translation: true,
        }
    }
}

impl VisibleLanes {
    /// Track a skip should land on
    ///
    /// Both lanes visible: the original track (canonical sentence start).
    /// One lane visible: that lane's track. Neither: no preference.
    pub fn preferred_track(&self) -> Option<SequenceTrack> {
        match (self.original, self.translation) {
            (true, _) => Some(SequenceTrack::Original),
            (false, true) => Some(SequenceTrack::Translation),
            (false, false) => None,
        }
    }
}

/// Skip direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Previous,
    Next,
}

/// Seek issued to the host by a controller operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedSeek {
    pub track: SequenceTrack,
    /// Raw target time on `track`
    pub time: f64,
    /// Sentence being moved to, when the plan knows it
    pub sentence_index: Option<usize>,
    /// Waiting for the host to load `track`
    pub pending: bool,
}

pub struct SequencePlaybackController {
    plan: SequencePlan,
    current_index: usize,
    current_track: SequenceTrack,

    /// Resume playback after a track switch
    auto_play: bool,

    state: PlaybackState,
    transition: TransitionState,
    tuning: SequenceTuning,
    bus: EventBus,
}

impl SequencePlaybackController {
    pub fn new(tuning: SequenceTuning, bus: EventBus) -> Self {
        Self {
            plan: SequencePlan::empty(),
            current_index: 0,
            current_track: SequenceTrack::Original,
            auto_play: false,
            state: PlaybackState::Paused,
            transition: TransitionState::new(),
            tuning,
            bus,
        }
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_segment(&self) -> Option<&SequenceSegment> {
        self.plan.get(self.current_index)
    }

    pub fn current_track(&self) -> SequenceTrack {
        self.current_track
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    /// Host playback state as last reported
    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    /// Alternating two-track sequence is driving playback
    pub fn is_sequence_active(&self) -> bool {
        self.plan.is_alternating()
    }

    /// Track a single-track session plays (ignored once a plan exists)
    pub fn set_current_track(&mut self, track: SequenceTrack) {
        self.current_track = track;
    }

    /// Replace the plan
    ///
    /// For the same chunk the position re-resolves to the previously active
    /// sentence (on the current track if possible), else index 0. A new chunk
    /// starts at index 0 on the first segment's track and forgets any
    /// transition in flight.
    pub fn set_plan(&mut self, plan: SequencePlan) {
        let same_chunk = !self.plan.is_empty() && self.plan.chunk_id() == plan.chunk_id();
        let previous_sentence = self.current_segment().map(|s| s.sentence_index);

        if same_chunk {
            self.current_index = previous_sentence
                .and_then(|sentence| {
                    plan.find(sentence, self.current_track)
                        .or_else(|| plan.first_for_sentence(sentence))
                })
                .unwrap_or(0);
        } else {
            self.current_index = 0;
            self.transition.clear();
            if let Some(first) = plan.get(0) {
                self.current_track = first.track;
            }
        }

        info!(
            "Sequence plan for {}: {} segment(s), alternating={}, index={}",
            plan.chunk_id(),
            plan.len(),
            plan.is_alternating(),
            self.current_index
        );
        self.plan = plan;
    }

    /// Apply the current segment if it is on another track than the one loaded
    ///
    /// Needed after a plan rebuild removed the playing track.
    pub fn realign(&mut self, media: &mut dyn HostMedia, now: Instant) -> Option<AppliedSeek> {
        let segment = *self.current_segment()?;
        if segment.track == self.current_track {
            return None;
        }
        Some(self.apply_segment(segment, media, now))
    }

    /// Host started playing
    pub fn on_playing(&mut self) {
        self.state = PlaybackState::Playing;
        self.auto_play = true;
    }

    /// Host paused
    ///
    /// A pause while a track loads is the host's own doing and does not
    /// change whether playback resumes afterwards.
    pub fn on_paused(&mut self) {
        self.state = PlaybackState::Paused;
        if !self.transition.has_pending_seek() {
            self.auto_play = false;
        }
    }

    /// Animation frame tick; returns true when a same-track seek settled
    pub fn on_frame(&mut self) -> bool {
        self.transition.on_frame()
    }

    /// Advance to the next segment once the current one has ended
    ///
    /// Only while playing with no transition in flight. Single-track plans
    /// only follow the time; playback continues on its own.
    pub fn maybe_advance(
        &mut self,
        media_time: f64,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        if !self.is_playing() || self.transition.in_progress() || self.plan.is_empty() {
            return None;
        }
        self.resolve_index(media_time);
        if !self.is_sequence_active() {
            return None;
        }

        let segment = *self.current_segment()?;
        if segment.track != self.current_track {
            return None;
        }
        let next_index = self.current_index + 1;
        if media_time < segment.end - self.tuning.segment_end_epsilon_secs {
            return None;
        }
        let next = *self.plan.get(next_index)?;

        debug!(
            "Segment {} ended at {:.3}s, advancing to sentence {} on {}",
            self.current_index, media_time, next.sentence_index, next.track
        );
        Some(self.move_to(next_index, next, media, now))
    }

    /// Keep the plan index in step with the media time on the current track
    fn resolve_index(&mut self, media_time: f64) {
        let epsilon = self.tuning.window_epsilon_secs;
        if let Some(segment) = self.current_segment() {
            if segment.track == self.current_track && segment.window_contains(media_time, epsilon) {
                return;
            }
        }

        let by_sentence = self
            .current_segment()
            .map(|s| s.sentence_index)
            .and_then(|sentence| self.plan.find(sentence, self.current_track))
            .filter(|&i| {
                self.plan
                    .get(i)
                    .is_some_and(|s| s.window_contains(media_time, epsilon))
            });
        let resolved = by_sentence.or_else(|| self.plan.index_for_time(self.current_track, media_time));

        if let Some(index) = resolved {
            if index != self.current_index {
                debug!(
                    "Plan index {} -> {} for {:.3}s on {}",
                    self.current_index, index, media_time, self.current_track
                );
                self.current_index = index;
            }
        }
    }

    fn move_to(
        &mut self,
        index: usize,
        segment: SequenceSegment,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> AppliedSeek {
        self.current_index = index;
        self.bus.emit_lossy(SyncEvent::SequenceAdvanced {
            plan_index: index,
            sentence_index: segment.sentence_index,
            track: segment.track,
            timestamp: chrono::Utc::now(),
        });
        self.apply_segment(segment, media, now)
    }

    /// Start playing a segment
    pub fn apply_segment(
        &mut self,
        segment: SequenceSegment,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> AppliedSeek {
        if segment.track != self.current_track {
            let pending = PendingSeek::new(segment.track, segment.start, self.auto_play || self.is_playing());
            self.auto_play = pending.auto_play;
            self.transition.begin_track_switch(pending, now);
            self.current_track = segment.track;
            media.load_track(segment.track, segment.start);

            debug!(
                "Switching to {} at {:.3}s (auto_play={})",
                segment.track, segment.start, pending.auto_play
            );
            self.bus.emit_lossy(SyncEvent::TrackSwitchRequested {
                track: segment.track,
                target_time: segment.start,
                timestamp: chrono::Utc::now(),
            });
            return AppliedSeek {
                track: segment.track,
                time: segment.start,
                sentence_index: Some(segment.sentence_index),
                pending: true,
            };
        }

        // The host is still loading this track; its ready signal applies the seek
        if self.transition.retarget_pending(segment.start) {
            debug!(
                "Retargeted pending seek on {} to {:.3}s",
                segment.track, segment.start
            );
            return AppliedSeek {
                track: segment.track,
                time: segment.start,
                sentence_index: Some(segment.sentence_index),
                pending: true,
            };
        }

        let was_playing = self.is_playing() || media.is_playing();
        self.seek_host(segment.start, media, now);
        if was_playing && !media.is_playing() {
            media.play();
        }
        AppliedSeek {
            track: segment.track,
            time: segment.start,
            sentence_index: Some(segment.sentence_index),
            pending: false,
        }
    }

    fn seek_host(&mut self, time: f64, media: &mut dyn HostMedia, now: Instant) {
        media.seek(time);
        self.transition
            .mark_manual_seek(now, self.tuning.seek_settle_frames);
    }

    /// Host finished loading a track
    ///
    /// Applies the pending seek when the signal answers it; stale and
    /// redundant signals are ignored. Returns the seek applied.
    pub fn on_source_ready(
        &mut self,
        track: SequenceTrack,
        target_time: f64,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<PendingSeek> {
        let Some(pending) = self.transition.complete_pending(track, target_time) else {
            warn!(
                "Ignoring stale ready signal for {} at {:.3}s",
                track, target_time
            );
            return None;
        };

        self.seek_host(pending.time, media, now);
        if pending.auto_play {
            media.play();
        }
        debug!(
            "Applied pending seek to {:.3}s on {} (resumed={})",
            pending.time, pending.track, pending.auto_play
        );
        self.bus.emit_lossy(SyncEvent::PendingSeekApplied {
            track: pending.track,
            time: pending.time,
            resumed: pending.auto_play,
            timestamp: chrono::Utc::now(),
        });
        Some(pending)
    }

    /// Plain time seek in the current track
    ///
    /// While a track is still loading, the pending seek is retargeted
    /// instead.
    pub fn seek(&mut self, time: f64, media: &mut dyn HostMedia, now: Instant) -> AppliedSeek {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let pending = self.transition.retarget_pending(time);
        if !pending {
            self.seek_host(time, media, now);
        }

        let sentence_index = self
            .plan
            .index_for_time(self.current_track, time)
            .map(|index| {
                self.current_index = index;
                self.plan.segments()[index].sentence_index
            });

        AppliedSeek {
            track: self.current_track,
            time,
            sentence_index,
            pending,
        }
    }

    /// Skip to the adjacent sentence
    ///
    /// Returns None at either end of the plan or without a plan.
    pub fn skip_sentence(
        &mut self,
        direction: SkipDirection,
        visible: VisibleLanes,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        if self.plan.is_empty() {
            return None;
        }
        if !self.transition.has_pending_seek() {
            self.resolve_index(media.current_time());
        }

        let current = *self.current_segment()?;
        let target = self
            .plan
            .adjacent_sentence(current.sentence_index, direction == SkipDirection::Next)?;
        let preferred = visible.preferred_track().unwrap_or(self.current_track);
        let index = self
            .plan
            .find(target, preferred)
            .or_else(|| self.plan.first_for_sentence(target))?;
        let segment = *self.plan.get(index)?;

        debug!(
            "Skip {:?} from sentence {} to {} on {}",
            direction, current.sentence_index, target, segment.track
        );
        Some(self.move_to(index, segment, media, now))
    }

    /// Seek to a clicked token
    ///
    /// `time` is the token's raw time on its lane's track. Lanes without a
    /// track of their own seek within the current track.
    pub fn seek_to_token(
        &mut self,
        sentence_index: usize,
        lane: Lane,
        time: f64,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        let Some(track) = SequenceTrack::for_lane(lane) else {
            return Some(self.seek(time, media, now));
        };

        let Some(index) = self.plan.find(sentence_index, track) else {
            if track == self.current_track {
                return Some(self.seek(time, media, now));
            }
            debug!(
                "No {} segment for sentence {}, ignoring token seek",
                track, sentence_index
            );
            return None;
        };

        let segment = self.plan.get(index)?.starting_at(time);
        if track == self.current_track && !self.transition.has_pending_seek() {
            self.current_index = index;
            let mut applied = self.seek(time, media, now);
            applied.sentence_index = Some(sentence_index);
            return Some(applied);
        }
        Some(self.move_to(index, segment, media, now))
    }
}
