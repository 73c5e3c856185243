//! Playback session
//!
//! One session per playback surface. It owns the sync controller, the
//! sentence timeline resolver and the sequence controller together with the
//! chunk's payloads, and routes host notifications to them one at a time in
//! arrival order. Nothing here is process-wide; dropping the session detaches
//! it from its clock.

use crate::config::SyncConfig;
use crate::host::{ClockEvent, HostMedia};
use crate::sequence::{
    build_sequence_plan, AppliedSeek, EnabledTracks, SequencePlaybackController, SkipDirection,
    TrackPreferences, VisibleLanes,
};
use crate::sync::clock::{coerce_media_time, effective_time, raw_time, MediaClock};
use crate::sync::{SyncController, SyncDiagnostics};
use crate::timeline::{
    build_runtime_entries, GuardContext, SentenceRuntimeEntry, SentenceSource,
    SentenceTimelineResolver,
};
use narr_common::chunk::ChunkMetadata;
use narr_common::events::{EventBus, PlaybackState, SequenceTrack, SyncEvent};
use narr_common::timing::{Hit, Lane, TrackTimingPayload, TrackType};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Payloads of one chunk, by track
#[derive(Debug, Clone, Default)]
pub struct TrackPayloads {
    pub original: Option<Arc<TrackTimingPayload>>,
    pub translated: Option<Arc<TrackTimingPayload>>,
    pub combined: Option<Arc<TrackTimingPayload>>,
}

impl TrackPayloads {
    pub fn from_payloads(payloads: impl IntoIterator<Item = TrackTimingPayload>) -> Self {
        let mut set = Self::default();
        for payload in payloads {
            set.insert(payload);
        }
        set
    }

    /// Store a payload in its track's slot, replacing any previous one
    pub fn insert(&mut self, payload: TrackTimingPayload) {
        let slot = match payload.track_type() {
            TrackType::Original => &mut self.original,
            TrackType::Translated => &mut self.translated,
            TrackType::OriginalTranslated => &mut self.combined,
        };
        *slot = Some(Arc::new(payload));
    }

    pub fn for_track(&self, track: SequenceTrack) -> Option<&Arc<TrackTimingPayload>> {
        match track {
            SequenceTrack::Original => self.original.as_ref(),
            SequenceTrack::Translation => self.translated.as_ref(),
        }
    }
}

/// Renderer view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub chunk_id: Option<String>,
    pub hit: Option<Hit>,
    pub rate: f64,
    pub sentence_index: Option<usize>,
    /// Effective time on the active track
    pub chunk_time: f64,
    /// Fraction of the chunk played, 0..=1
    pub progress: f64,
    pub track: SequenceTrack,
    /// Position in the sequence plan, None without a plan
    pub plan_index: Option<usize>,
    pub plan_len: usize,
    pub sequence_active: bool,
    /// A track switch is waiting for the host
    pub pending: bool,
    pub state: PlaybackState,
    pub diagnostics: SyncDiagnostics,
}

pub struct PlaybackSession {
    bus: EventBus,
    chunk: Option<ChunkMetadata>,
    payloads: TrackPayloads,
    preferences: TrackPreferences,
    visible: VisibleLanes,

    /// Payload the sync controller is searching
    active: Option<Arc<TrackTimingPayload>>,
    runtime: Vec<SentenceRuntimeEntry>,

    sync: SyncController,
    timeline: SentenceTimelineResolver,
    sequence: SequencePlaybackController,
}

impl PlaybackSession {
    pub fn new(config: &SyncConfig) -> Self {
        let bus = EventBus::new(config.events.capacity);
        Self {
            sync: SyncController::new(config.sync.clone(), bus.clone()),
            timeline: SentenceTimelineResolver::new(config.timeline.clone(), bus.clone()),
            sequence: SequencePlaybackController::new(config.sequence.clone(), bus.clone()),
            bus,
            chunk: None,
            payloads: TrackPayloads::default(),
            preferences: TrackPreferences::default(),
            visible: VisibleLanes::default(),
            active: None,
            runtime: Vec::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Attach to a host clock (no-op when already attached to it)
    pub fn attach(&mut self, media: &dyn HostMedia) -> bool {
        self.sync.start(media)
    }

    pub fn detach(&mut self) {
        self.sync.stop();
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn timeline(&self) -> &SentenceTimelineResolver {
        &self.timeline
    }

    pub fn sequence(&self) -> &SequencePlaybackController {
        &self.sequence
    }

    pub fn chunk(&self) -> Option<&ChunkMetadata> {
        self.chunk.as_ref()
    }

    pub fn current_track(&self) -> SequenceTrack {
        self.sequence.current_track()
    }

    pub fn active_payload(&self) -> Option<&Arc<TrackTimingPayload>> {
        self.active.as_ref()
    }

    pub fn runtime_entries(&self) -> &[SentenceRuntimeEntry] {
        &self.runtime
    }

    /// Load a chunk with its payloads
    ///
    /// The host is expected to have [`Self::current_track`] loaded, or to
    /// load it, once this returns.
    pub fn load_chunk(&mut self, chunk: ChunkMetadata, payloads: TrackPayloads) {
        info!(
            "Loading chunk {} ({} sentence(s), original={} translation={} combined={})",
            chunk.chunk_id,
            chunk.sentence_count(),
            payloads.original.is_some(),
            payloads.translated.is_some(),
            payloads.combined.is_some()
        );
        self.payloads = payloads;
        self.chunk = Some(chunk);
        self.rebuild_plan();
    }

    /// Replace or add one track's payload for the loaded chunk
    pub fn set_payload(&mut self, payload: TrackTimingPayload) {
        self.payloads.insert(payload);
        self.refresh_active_payload();
    }

    /// Change which tracks the user wants to hear
    pub fn set_track_preferences(
        &mut self,
        preferences: TrackPreferences,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        if preferences == self.preferences {
            return None;
        }
        self.preferences = preferences;
        self.rebuild_plan();
        let applied = self.sequence.realign(media, now)?;
        self.after_seek(applied, media);
        Some(applied)
    }

    pub fn set_visible_lanes(&mut self, visible: VisibleLanes) {
        self.visible = visible;
    }

    pub fn visible_lanes(&self) -> VisibleLanes {
        self.visible
    }

    fn rebuild_plan(&mut self) {
        let Some(chunk) = &self.chunk else {
            return;
        };
        let enabled = EnabledTracks::resolve(chunk.availability, self.preferences);
        let plan = build_sequence_plan(chunk, enabled);

        // Single-track sessions follow whichever track is enabled
        if plan.is_empty() {
            if let Some(track) = enabled.tracks().next() {
                self.sequence.set_current_track(track);
            }
        }
        self.sequence.set_plan(plan);
        self.refresh_active_payload();
    }

    /// Point the sync controller and resolver at the current track's payload
    fn refresh_active_payload(&mut self) {
        let track = self.sequence.current_track();
        let dedicated = self.payloads.for_track(track).cloned();
        let is_dedicated = dedicated.is_some();
        let active = dedicated.or_else(|| self.payloads.combined.clone());

        let unchanged = match (&self.active, &active) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            debug!(
                "Active payload now {}",
                active
                    .as_ref()
                    .map(|p| p.track_type().to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            self.sync.set_payload(active.clone());
            self.active = active;
        }

        if let Some(chunk) = &self.chunk {
            let source = SentenceSource::for_track(
                chunk,
                is_dedicated.then_some(track),
                self.active.as_deref(),
            );
            self.timeline.set_source(&chunk.chunk_id, source);
            self.runtime = self
                .active
                .as_deref()
                .map(|p| build_runtime_entries(p, Some(chunk)))
                .unwrap_or_default();
        }
    }

    fn active_offset_tempo(&self) -> (f64, f64) {
        self.active
            .as_deref()
            .map(|p| (p.track_offset(), p.tempo_factor()))
            .unwrap_or((0.0, 1.0))
    }

    /// Effective duration for sentence apportionment
    fn effective_duration(&self, media: &dyn HostMedia) -> f64 {
        let (offset, tempo) = self.active_offset_tempo();
        let duration = MediaClock::new(media).effective_duration(offset, tempo);
        if duration > 0.0 {
            duration
        } else {
            self.active.as_deref().map(|p| p.duration()).unwrap_or(0.0)
        }
    }

    /// Drain and route every queued host notification
    ///
    /// Attaches to `media` first if needed. Returns the number of
    /// notifications handled.
    pub fn pump(&mut self, media: &mut dyn HostMedia, now: Instant) -> usize {
        self.sync.start(&*media);

        let mut handled = 0;
        while let Some(event) = self.sync.next_event(self.sequence.transition()) {
            self.route(event, media, now);
            handled += 1;
        }
        handled
    }

    fn route(&mut self, event: ClockEvent, media: &mut dyn HostMedia, now: Instant) {
        match event {
            ClockEvent::TimeUpdate(time) => {
                let time = coerce_media_time(time);
                if let Some(applied) = self.sequence.maybe_advance(time, media, now) {
                    self.after_seek(applied, media);
                    return;
                }
                self.update_timeline(time, media, now);
            }
            ClockEvent::Seeked(time) => {
                self.update_timeline(coerce_media_time(time), media, now);
            }
            ClockEvent::RateChanged(_) => {}
            ClockEvent::Playing => self.sequence.on_playing(),
            ClockEvent::Paused => self.sequence.on_paused(),
            ClockEvent::SourceReady { track, target_time } => {
                self.sequence.on_source_ready(track, target_time, media, now);
            }
            ClockEvent::Frame => {
                if self.sequence.on_frame() {
                    debug!("Seek settled");
                }
            }
        }
    }

    fn update_timeline(&mut self, raw: f64, media: &dyn HostMedia, now: Instant) {
        let (offset, tempo) = self.active_offset_tempo();
        let time = effective_time(raw, offset, tempo);
        let duration = self.effective_duration(media);
        let ctx = GuardContext {
            transition: self.sequence.transition(),
            sequence_active: self.sequence.is_sequence_active(),
            now,
        };
        self.timeline.update(time, duration, &ctx);
    }

    /// Reflect a controller seek in the displayed state right away
    fn after_seek(&mut self, applied: AppliedSeek, media: &dyn HostMedia) {
        if applied.pending {
            self.refresh_active_payload();
        }
        let (offset, tempo) = self.active_offset_tempo();
        let time = effective_time(applied.time, offset, tempo);

        let sentence = applied.sentence_index.or_else(|| {
            let duration = self.effective_duration(media);
            self.timeline.candidate(time, duration).map(|c| c.index)
        });
        if let Some(index) = sentence {
            self.timeline.force_index(index, time);
        }
    }

    pub fn play(&mut self, media: &mut dyn HostMedia) {
        media.play();
    }

    pub fn pause(&mut self, media: &mut dyn HostMedia) {
        media.pause();
    }

    /// User seek to a raw time on the current track
    pub fn seek(&mut self, time: f64, media: &mut dyn HostMedia, now: Instant) -> AppliedSeek {
        let applied = self.sequence.seek(time, media, now);
        self.after_seek(applied, media);
        applied
    }

    /// User skip to the adjacent sentence
    pub fn skip_sentence(
        &mut self,
        direction: SkipDirection,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        let applied = self
            .sequence
            .skip_sentence(direction, self.visible, media, now)?;
        self.after_seek(applied, media);
        Some(applied)
    }

    /// User clicked a token
    ///
    /// `segment_index` indexes the token list of `lane`'s own track payload
    /// when there is one, otherwise the active payload's.
    pub fn seek_to_token(
        &mut self,
        segment_index: usize,
        lane: Lane,
        media: &mut dyn HostMedia,
        now: Instant,
    ) -> Option<AppliedSeek> {
        let dedicated = SequenceTrack::for_lane(lane)
            .and_then(|track| self.payloads.for_track(track))
            .cloned();
        let payload = dedicated.clone().or_else(|| self.active.clone())?;
        let token = payload.token(segment_index)?;
        let time = raw_time(token.t0, payload.track_offset(), payload.tempo_factor());

        let sentence = self.chunk.as_ref().and_then(|chunk| {
            chunk
                .sentences
                .iter()
                .position(|s| s.sentence_index as i64 == token.sentence_id)
        });

        let own_track = SequenceTrack::for_lane(lane).filter(|_| dedicated.is_some());
        let applied = match (own_track, sentence) {
            (Some(_), Some(sentence)) => self
                .sequence
                .seek_to_token(sentence, lane, time, media, now)?,
            // Token time is on a track that is not playing
            (Some(track), None) if track != self.sequence.current_track() => return None,
            _ => self.sequence.seek(time, media, now),
        };
        self.after_seek(applied, media);
        Some(applied)
    }

    /// Tokens of `lane` revealed in the displayed sentence
    pub fn revealed_tokens(&self, lane: Lane) -> usize {
        self.timeline
            .current_index()
            .and_then(|index| self.runtime.get(index))
            .map(|entry| entry.revealed_tokens(lane, self.timeline.chunk_time()))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let plan = self.sequence.plan();
        SessionSnapshot {
            chunk_id: self.chunk.as_ref().map(|c| c.chunk_id.clone()),
            hit: self.sync.current_hit(),
            rate: self.sync.rate(),
            sentence_index: self.timeline.current_index(),
            chunk_time: self.timeline.chunk_time(),
            progress: self.timeline.progress(),
            track: self.sequence.current_track(),
            plan_index: (!plan.is_empty()).then(|| self.sequence.current_index()),
            plan_len: plan.len(),
            sequence_active: self.sequence.is_sequence_active(),
            pending: self.sequence.transition().has_pending_seek(),
            state: self.sequence.playback_state(),
            diagnostics: self.sync.diagnostics(),
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.sync.stop();
    }
}
