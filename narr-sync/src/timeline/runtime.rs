//! Sentence runtime entries
//!
//! Per-sentence timing derived from one track's payload: the effective time
//! span of each sentence and, per lane, the times at which its tokens are
//! revealed.

use narr_common::chunk::{ChunkMetadata, TimeRange};
use narr_common::timing::{Lane, TrackTimingPayload};

/// Token reveal times for one lane of one sentence
#[derive(Debug, Clone, PartialEq)]
pub struct LaneReveal {
    pub lane: Lane,
    /// Sorted token start times (effective seconds)
    pub times: Vec<f64>,
}

/// Resolved timing for one sentence of a chunk
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceRuntimeEntry {
    /// Position within the chunk
    pub index: usize,

    /// Sentence id carried by the tokens
    pub sentence_id: i64,

    pub sentence_number: Option<u32>,

    /// Earliest token start (effective seconds)
    pub start: f64,

    /// Latest token end (effective seconds)
    pub end: f64,

    reveal: Vec<LaneReveal>,
}

impl SentenceRuntimeEntry {
    pub fn span(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub fn reveal(&self, lane: Lane) -> Option<&LaneReveal> {
        self.reveal.iter().find(|r| r.lane == lane)
    }

    pub fn lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        self.reveal.iter().map(|r| r.lane)
    }

    /// Token count of a lane in this sentence
    pub fn token_count(&self, lane: Lane) -> usize {
        self.reveal(lane).map(|r| r.times.len()).unwrap_or(0)
    }

    /// Number of a lane's tokens revealed at `time`
    ///
    /// A token is revealed once playback reaches its start.
    pub fn revealed_tokens(&self, lane: Lane, time: f64) -> usize {
        if !time.is_finite() {
            return 0;
        }
        self.reveal(lane)
            .map(|r| r.times.partition_point(|&t| t <= time))
            .unwrap_or(0)
    }
}

/// Group a payload's tokens into sentence entries
///
/// Sentences appear in order of their first token. Sentence numbers are
/// taken from the chunk metadata at the same position when it is supplied.
pub fn build_runtime_entries(
    payload: &TrackTimingPayload,
    chunk: Option<&ChunkMetadata>,
) -> Vec<SentenceRuntimeEntry> {
    let mut entries: Vec<SentenceRuntimeEntry> = Vec::new();

    for token in payload.tokens() {
        let position = match entries.iter().position(|e| e.sentence_id == token.sentence_id) {
            Some(position) => position,
            None => {
                let index = entries.len();
                entries.push(SentenceRuntimeEntry {
                    index,
                    sentence_id: token.sentence_id,
                    sentence_number: chunk
                        .and_then(|c| c.sentences.get(index))
                        .and_then(|s| s.sentence_number),
                    start: token.t0,
                    end: token.t1,
                    reveal: Vec::new(),
                });
                index
            }
        };

        let entry = &mut entries[position];
        entry.start = entry.start.min(token.t0);
        entry.end = entry.end.max(token.t1);
        match entry.reveal.iter_mut().find(|r| r.lane == token.lane) {
            Some(reveal) => reveal.times.push(token.t0),
            None => entry.reveal.push(LaneReveal {
                lane: token.lane,
                times: vec![token.t0],
            }),
        }
    }

    for entry in &mut entries {
        for reveal in &mut entry.reveal {
            reveal.times.sort_by(f64::total_cmp);
        }
    }
    entries
}
