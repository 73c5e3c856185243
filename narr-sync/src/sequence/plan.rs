//! Sequence planner
//!
//! Builds the ordered list of segments for alternating-track playback:
//! for each sentence, its original-track range, then its translation-track
//! range. Plans are immutable; any change to the chunk, track availability
//! or enablement produces a new plan.

use narr_common::chunk::{ChunkMetadata, TrackAvailability};
use narr_common::events::SequenceTrack;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One planned unit of playback
///
/// `start`/`end` are raw seconds on `track`'s own timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceSegment {
    pub sentence_index: usize,
    pub track: SequenceTrack,
    pub start: f64,
    pub end: f64,
}

impl SequenceSegment {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// `start - epsilon <= time <= end + epsilon`
    pub fn window_contains(&self, time: f64, epsilon: f64) -> bool {
        time >= self.start - epsilon && time <= self.end + epsilon
    }

    /// Copy starting somewhere else (e.g. at a clicked token)
    pub fn starting_at(&self, start: f64) -> Self {
        Self { start, ..*self }
    }
}

/// Tracks the user wants to hear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPreferences {
    #[serde(default = "default_true")]
    pub original: bool,
    #[serde(default = "default_true")]
    pub translation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TrackPreferences {
    fn default() -> Self {
        Self {
            original: true,
            translation: true,
        }
    }
}

/// Tracks both available for the chunk and enabled by the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnabledTracks {
    pub original: bool,
    pub translation: bool,
}

impl EnabledTracks {
    pub fn resolve(availability: TrackAvailability, preferences: TrackPreferences) -> Self {
        Self {
            original: availability.original && preferences.original,
            translation: availability.translation && preferences.translation,
        }
    }

    pub fn both(&self) -> bool {
        self.original && self.translation
    }

    pub fn none(&self) -> bool {
        !self.original && !self.translation
    }

    pub fn contains(&self, track: SequenceTrack) -> bool {
        match track {
            SequenceTrack::Original => self.original,
            SequenceTrack::Translation => self.translation,
        }
    }

    /// Enabled tracks in plan order
    pub fn tracks(&self) -> impl Iterator<Item = SequenceTrack> {
        let original = self.original.then_some(SequenceTrack::Original);
        let translation = self.translation.then_some(SequenceTrack::Translation);
        original.into_iter().chain(translation)
    }
}

/// Ordered segment list for one chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePlan {
    chunk_id: String,
    enabled: EnabledTracks,
    segments: Vec<SequenceSegment>,
}

impl SequencePlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk_id
    }

    pub fn enabled(&self) -> EnabledTracks {
        self.enabled
    }

    pub fn segments(&self) -> &[SequenceSegment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&SequenceSegment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Non-empty and alternating between two tracks
    pub fn is_alternating(&self) -> bool {
        !self.is_empty() && self.enabled.both()
    }

    /// Index of the segment for `(sentence, track)`
    pub fn find(&self, sentence_index: usize, track: SequenceTrack) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.sentence_index == sentence_index && s.track == track)
    }

    /// First segment of a sentence on any track
    pub fn first_for_sentence(&self, sentence_index: usize) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.sentence_index == sentence_index)
    }

    /// Segment of `track` playing at `time`
    ///
    /// The last segment of the track that has started, so trailing gaps
    /// belong to the preceding segment. None when the track has no segment
    /// or time precedes all of them.
    pub fn index_for_time(&self, track: SequenceTrack, time: f64) -> Option<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.track == track && s.start <= time)
            .map(|(i, _)| i)
            .last()
            .or_else(|| self.segments.iter().position(|s| s.track == track))
    }

    /// Sentence adjacent to `sentence_index` in plan order
    pub fn adjacent_sentence(&self, sentence_index: usize, forward: bool) -> Option<usize> {
        let mut sentences: Vec<usize> = Vec::new();
        for segment in &self.segments {
            if sentences.last() != Some(&segment.sentence_index) {
                sentences.push(segment.sentence_index);
            }
        }
        let position = sentences.iter().position(|&s| s == sentence_index)?;
        if forward {
            sentences.get(position + 1).copied()
        } else {
            position.checked_sub(1).and_then(|p| sentences.get(p).copied())
        }
    }
}

/// Build the plan for a chunk
///
/// Sentences are indexed by their position in the chunk. Ranges that are
/// missing or invalid produce no segment.
pub fn build_sequence_plan(chunk: &ChunkMetadata, enabled: EnabledTracks) -> SequencePlan {
    let mut segments = Vec::new();

    for (sentence_index, sentence) in chunk.sentences.iter().enumerate() {
        for track in enabled.tracks() {
            let range = match track {
                SequenceTrack::Original => sentence.original,
                SequenceTrack::Translation => sentence.translation,
            };
            match range {
                Some(range) if range.is_valid() => segments.push(SequenceSegment {
                    sentence_index,
                    track,
                    start: range.start,
                    end: range.end,
                }),
                Some(range) => debug!(
                    "Dropping invalid {} range {:?} for sentence {} of {}",
                    track, range, sentence_index, chunk.chunk_id
                ),
                None => {}
            }
        }
    }

    debug!(
        "Built sequence plan for {}: {} segment(s), original={} translation={}",
        chunk.chunk_id,
        segments.len(),
        enabled.original,
        enabled.translation
    );

    SequencePlan {
        chunk_id: chunk.chunk_id.clone(),
        enabled,
        segments,
    }
}
