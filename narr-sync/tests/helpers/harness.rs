//! Session harness
//!
//! A [`PlaybackSession`] attached to a [`ScriptedMedia`] host, with a
//! virtual clock for the time-window guards.

use narr_common::chunk::ChunkMetadata;
use narr_common::events::{SequenceTrack, SyncEvent};
use narr_sync::config::SyncConfig;
use narr_sync::replay::ScriptedMedia;
use narr_sync::sequence::{SkipDirection, TrackPreferences};
use narr_sync::{PlaybackSession, SessionSnapshot, TrackPayloads};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use super::fixtures::{ORIGINAL_RANGES, TRANSLATION_RANGES};

pub struct Harness {
    pub session: PlaybackSession,
    pub media: ScriptedMedia,
    pub now: Instant,
    pub events: broadcast::Receiver<SyncEvent>,
}

impl Harness {
    pub fn new(chunk: ChunkMetadata, payloads: TrackPayloads) -> Self {
        Self::with_config(&SyncConfig::default(), chunk, payloads)
    }

    pub fn with_config(config: &SyncConfig, chunk: ChunkMetadata, payloads: TrackPayloads) -> Self {
        let mut session = PlaybackSession::new(config);
        let events = session.subscribe();
        session.load_chunk(chunk, payloads);

        let mut media = ScriptedMedia::new(config.events.capacity);
        media.set_track_duration(SequenceTrack::Original, ORIGINAL_RANGES[2].1);
        media.set_track_duration(SequenceTrack::Translation, TRANSLATION_RANGES[2].1);
        media.set_loaded_track(session.current_track());
        session.attach(&media);

        Self {
            session,
            media,
            now: Instant::now(),
            events,
        }
    }

    /// Route everything the host has emitted
    pub fn pump(&mut self) -> usize {
        self.session.pump(&mut self.media, self.now)
    }

    pub fn wait(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
    }

    /// Time update followed by enough frames to settle a same-track seek
    pub fn tick(&mut self, time: f64) {
        self.media.advance_to(time);
        self.pump();
        self.frames(2);
    }

    pub fn frames(&mut self, count: usize) {
        for _ in 0..count {
            self.media.frame();
        }
        self.pump();
    }

    pub fn play(&mut self) {
        self.session.play(&mut self.media);
        self.pump();
    }

    pub fn pause(&mut self) {
        self.session.pause(&mut self.media);
        self.pump();
    }

    pub fn seek(&mut self, time: f64) {
        self.session.seek(time, &mut self.media, self.now);
        self.pump();
    }

    pub fn skip(&mut self, direction: SkipDirection) -> bool {
        let applied = self
            .session
            .skip_sentence(direction, &mut self.media, self.now)
            .is_some();
        self.pump();
        applied
    }

    /// Finish an outstanding track load; false when none was outstanding
    pub fn ready(&mut self) -> bool {
        let finished = self.media.finish_load().is_some();
        self.pump();
        finished
    }

    pub fn set_preferences(&mut self, original: bool, translation: bool) {
        self.session.set_track_preferences(
            TrackPreferences {
                original,
                translation,
            },
            &mut self.media,
            self.now,
        );
        self.pump();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// `(sentence, track)` the session is on
    pub fn position(&self) -> (Option<usize>, SequenceTrack) {
        let snapshot = self.snapshot();
        (snapshot.sentence_index, snapshot.track)
    }

    pub fn take_events(&mut self) -> Vec<SyncEvent> {
        drain_events(&mut self.events)
    }
}

/// Everything queued on an event receiver
pub fn drain_events(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}
