//! Host media element interface
//!
//! The engine never decodes audio. It drives, and listens to, a host media
//! element that already exposes a continuous playback clock and discrete
//! notifications. Notifications are delivered over a broadcast channel that
//! the host owns; the engine subscribes and drains it from inside the host's
//! callback context.

use narr_common::events::{ClockId, SequenceTrack};
use tokio::sync::broadcast;

/// Notification emitted by a host media element
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// Periodic playback time (raw media seconds)
    TimeUpdate(f64),

    /// Seek completed at this raw media time
    Seeked(f64),

    /// Playback rate changed
    RateChanged(f64),

    /// Playback started or resumed
    Playing,

    /// Playback paused
    Paused,

    /// Source requested through [`HostMedia::load_track`] finished loading
    ///
    /// `target_time` echoes the argument given to `load_track` so stale
    /// completions can be told apart from the current one.
    SourceReady {
        track: SequenceTrack,
        target_time: f64,
    },

    /// Animation frame tick
    Frame,
}

/// Host playback element
///
/// Query methods may return garbage (NaN, negative rates, zero durations);
/// [`crate::sync::clock::MediaClock`] coerces them before anything else
/// sees them.
pub trait HostMedia {
    /// Stable identity of this element
    fn id(&self) -> ClockId;

    /// Raw current playback time in seconds
    fn current_time(&self) -> f64;

    /// Playback rate multiplier
    fn playback_rate(&self) -> f64;

    /// Duration of the loaded source in seconds, 0 when unknown
    fn duration(&self) -> f64;

    /// Whether the element is currently playing
    fn is_playing(&self) -> bool;

    /// Subscribe to this element's notifications
    fn subscribe(&self) -> broadcast::Receiver<ClockEvent>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Set the current time; the element answers with [`ClockEvent::Seeked`]
    fn seek(&mut self, time: f64);

    /// Begin loading another track's audio
    ///
    /// The element answers with [`ClockEvent::SourceReady`] once the new
    /// source can accept a seek.
    fn load_track(&mut self, track: SequenceTrack, target_time: f64);
}
