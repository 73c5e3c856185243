//! Trace replay
//!
//! Replays a recorded sequence of host notifications and user commands
//! through a [`PlaybackSession`] attached to a scripted host, one line of
//! resolved state per step. Time is virtual: `wait` steps advance the clock
//! the guards see without sleeping.

use crate::error::{Error, Result};
use crate::host::{ClockEvent, HostMedia};
use crate::sequence::SkipDirection;
use crate::session::{PlaybackSession, SessionSnapshot};
use narr_common::events::{ClockId, SequenceTrack};
use narr_common::human_time::{format_media_time, format_rate};
use narr_common::timing::Lane;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::debug;

/// Command received by a scripted host
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    Seek(f64),
    LoadTrack {
        track: SequenceTrack,
        target_time: f64,
    },
}

/// In-process host media element driven by a script
///
/// Commands are recorded and answered the way a real element would:
/// `seek` emits `Seeked`, `play`/`pause` emit `Playing`/`Paused`, and
/// `load_track` resets the clock to 0 until [`ScriptedMedia::finish_load`]
/// emits `SourceReady`.
pub struct ScriptedMedia {
    id: ClockId,
    time: f64,
    rate: f64,
    duration: f64,
    playing: bool,
    track: Option<SequenceTrack>,
    pending_load: Option<(SequenceTrack, f64)>,
    track_durations: HashMap<SequenceTrack, f64>,
    commands: Vec<MediaCommand>,
    tx: broadcast::Sender<ClockEvent>,
}

impl ScriptedMedia {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            id: ClockId::new(),
            time: 0.0,
            rate: 1.0,
            duration: 0.0,
            playing: false,
            track: None,
            pending_load: None,
            track_durations: HashMap::new(),
            commands: Vec::new(),
            tx,
        }
    }

    /// Emit a notification to subscribers
    pub fn emit(&self, event: ClockEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Move the clock and emit a time update
    pub fn advance_to(&mut self, time: f64) {
        self.time = time;
        self.emit(ClockEvent::TimeUpdate(time));
    }

    /// Change the rate and emit a rate change
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.emit(ClockEvent::RateChanged(rate));
    }

    pub fn frame(&self) {
        self.emit(ClockEvent::Frame);
    }

    /// Complete an outstanding `load_track`
    pub fn finish_load(&mut self) -> Option<(SequenceTrack, f64)> {
        let (track, target_time) = self.pending_load.take()?;
        self.emit(ClockEvent::SourceReady { track, target_time });
        Some((track, target_time))
    }

    pub fn set_time_silently(&mut self, time: f64) {
        self.time = time;
    }

    pub fn set_rate_silently(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn set_playing_silently(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    /// Duration reported after loading `track`
    pub fn set_track_duration(&mut self, track: SequenceTrack, duration: f64) {
        self.track_durations.insert(track, duration);
    }

    /// Mark a track as already loaded
    pub fn set_loaded_track(&mut self, track: SequenceTrack) {
        self.track = Some(track);
        self.duration = self.track_durations.get(&track).copied().unwrap_or(0.0);
    }

    pub fn loaded_track(&self) -> Option<SequenceTrack> {
        self.track
    }

    pub fn pending_load(&self) -> Option<(SequenceTrack, f64)> {
        self.pending_load
    }

    pub fn commands(&self) -> &[MediaCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl HostMedia for ScriptedMedia {
    fn id(&self) -> ClockId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn subscribe(&self) -> broadcast::Receiver<ClockEvent> {
        self.tx.subscribe()
    }

    fn play(&mut self) {
        self.commands.push(MediaCommand::Play);
        self.playing = true;
        self.emit(ClockEvent::Playing);
    }

    fn pause(&mut self) {
        self.commands.push(MediaCommand::Pause);
        self.playing = false;
        self.emit(ClockEvent::Paused);
    }

    fn seek(&mut self, time: f64) {
        self.commands.push(MediaCommand::Seek(time));
        self.time = time;
        self.emit(ClockEvent::Seeked(time));
    }

    fn load_track(&mut self, track: SequenceTrack, target_time: f64) {
        self.commands.push(MediaCommand::LoadTrack { track, target_time });
        if self.playing {
            self.playing = false;
            self.emit(ClockEvent::Paused);
        }
        self.time = 0.0;
        self.track = Some(track);
        self.duration = self.track_durations.get(&track).copied().unwrap_or(0.0);
        self.pending_load = Some((track, target_time));
    }
}

/// One step of a recorded trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum TraceStep {
    /// Host time update
    Time { t: f64 },
    /// User seek on the current track
    Seek { t: f64 },
    /// Host rate change
    Rate { rate: f64 },
    /// User pressed play
    Play,
    /// User pressed pause
    Pause,
    /// Host finished loading the requested track
    Ready,
    /// Animation frame
    Frame,
    /// User skipped a sentence
    Skip { direction: TraceSkip },
    /// User clicked a token
    Click { segment: usize, lane: Lane },
    /// Wall-clock time passes
    Wait { ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceSkip {
    Next,
    Previous,
}

impl From<TraceSkip> for SkipDirection {
    fn from(skip: TraceSkip) -> Self {
        match skip {
            TraceSkip::Next => SkipDirection::Next,
            TraceSkip::Previous => SkipDirection::Previous,
        }
    }
}

/// Parse a JSON trace (an array of steps)
pub fn parse_trace(json: &str) -> Result<Vec<TraceStep>> {
    serde_json::from_str(json).map_err(|e| Error::Trace(e.to_string()))
}

/// Resolved state after one step
#[derive(Debug, Clone, Serialize)]
pub struct ReplayLine {
    pub step_index: usize,
    pub step: TraceStep,
    pub media_time: f64,
    pub snapshot: SessionSnapshot,
}

impl std::fmt::Display for ReplayLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.snapshot;
        let hit = match s.hit {
            Some(hit) => format!("{}/{}", hit.segment_index, hit.token_index),
            None => "-".to_string(),
        };
        let sentence = s
            .sentence_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        let plan = match s.plan_index {
            Some(i) => format!("{}/{}", i, s.plan_len),
            None => "-".to_string(),
        };
        write!(
            f,
            "{:>4} {:<10} media={} chunk={} hit={} sentence={} track={} plan={} rate={} {}{}",
            self.step_index,
            step_name(&self.step),
            format_media_time(self.media_time),
            format_media_time(s.chunk_time),
            hit,
            sentence,
            s.track,
            plan,
            format_rate(s.rate),
            s.state,
            if s.pending { " (loading)" } else { "" }
        )
    }
}

fn step_name(step: &TraceStep) -> &'static str {
    match step {
        TraceStep::Time { .. } => "time",
        TraceStep::Seek { .. } => "seek",
        TraceStep::Rate { .. } => "rate",
        TraceStep::Play => "play",
        TraceStep::Pause => "pause",
        TraceStep::Ready => "ready",
        TraceStep::Frame => "frame",
        TraceStep::Skip { .. } => "skip",
        TraceStep::Click { .. } => "click",
        TraceStep::Wait { .. } => "wait",
    }
}

/// Session plus scripted host, stepped through a trace
pub struct TraceReplay {
    session: PlaybackSession,
    media: ScriptedMedia,
    now: Instant,

    /// Animation frames emitted after each time update
    frames_per_update: u8,
}

impl TraceReplay {
    /// Attach `session` to `media` with the session's current track loaded
    pub fn new(mut session: PlaybackSession, mut media: ScriptedMedia) -> Self {
        media.set_loaded_track(session.current_track());
        session.attach(&media);
        Self {
            session,
            media,
            now: Instant::now(),
            frames_per_update: 1,
        }
    }

    /// Frames a host renders between two time updates (0 for traces that
    /// record frames explicitly)
    pub fn with_frames_per_update(mut self, frames: u8) -> Self {
        self.frames_per_update = frames;
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn media(&self) -> &ScriptedMedia {
        &self.media
    }

    /// Apply one step and report the resulting state
    pub fn step(&mut self, step_index: usize, step: &TraceStep) -> ReplayLine {
        debug!("Replay step {}: {:?}", step_index, step);
        let now = self.now;
        match step {
            TraceStep::Time { t } => {
                self.media.advance_to(*t);
                for _ in 0..self.frames_per_update {
                    self.media.frame();
                }
            }
            TraceStep::Seek { t } => {
                self.session.seek(*t, &mut self.media, now);
            }
            TraceStep::Rate { rate } => self.media.set_rate(*rate),
            TraceStep::Play => self.session.play(&mut self.media),
            TraceStep::Pause => self.session.pause(&mut self.media),
            TraceStep::Ready => {
                if self.media.finish_load().is_none() {
                    debug!("Ready step with no load outstanding");
                }
            }
            TraceStep::Frame => self.media.frame(),
            TraceStep::Skip { direction } => {
                self.session
                    .skip_sentence((*direction).into(), &mut self.media, now);
            }
            TraceStep::Click { segment, lane } => {
                self.session
                    .seek_to_token(*segment, *lane, &mut self.media, now);
            }
            TraceStep::Wait { ms } => self.now += Duration::from_millis(*ms),
        }
        self.session.pump(&mut self.media, self.now);

        ReplayLine {
            step_index,
            step: step.clone(),
            media_time: self.media.current_time(),
            snapshot: self.session.snapshot(),
        }
    }

    /// Apply every step in order
    pub fn run(&mut self, steps: &[TraceStep]) -> Vec<ReplayLine> {
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| self.step(i, step))
            .collect()
    }
}
