//! Playback-related type definitions
//!
//! Supporting types shared by the engine and its event stream.

use crate::timing::{Lane, TrackType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Independently playable track used by alternating-track sequences
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SequenceTrack {
    Original,
    Translation,
}

impl SequenceTrack {
    /// Timing payload type carrying this track's tokens
    pub fn track_type(self) -> TrackType {
        match self {
            SequenceTrack::Original => TrackType::Original,
            SequenceTrack::Translation => TrackType::Translated,
        }
    }

    /// Track a payload type belongs to; combined audio has none
    pub fn from_track_type(track_type: TrackType) -> Option<Self> {
        match track_type {
            TrackType::Original => Some(SequenceTrack::Original),
            TrackType::Translated => Some(SequenceTrack::Translation),
            TrackType::OriginalTranslated => None,
        }
    }

    /// Dedicated audio track for a lane, if the lane has one
    ///
    /// Transliteration has no audio of its own.
    pub fn for_lane(lane: Lane) -> Option<Self> {
        match lane {
            Lane::Original => Some(SequenceTrack::Original),
            Lane::Translation => Some(SequenceTrack::Translation),
            Lane::Transliteration => None,
        }
    }
}

impl std::fmt::Display for SequenceTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceTrack::Original => write!(f, "original"),
            SequenceTrack::Translation => write!(f, "translation"),
        }
    }
}

/// Identity of one host media element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClockId(pub Uuid);

impl ClockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
