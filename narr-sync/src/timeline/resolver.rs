//! Sentence timeline resolver
//!
//! Maps the active track's effective time to the displayed sentence index
//! and the fraction of progress through the chunk.
//!
//! **Sources:**
//! - Explicit: per-sentence effective spans (chunk metadata ranges for the
//!   playing track, or spans grouped from the track's own tokens)
//! - Weighted: total duration apportioned across sentences by weight, used
//!   only when explicit spans are unavailable
//!
//! Candidates pass through [`super::guard::check_sentence_change`] before
//! they replace the displayed index.

use super::guard::{check_sentence_change, GuardContext, GuardVerdict};
use super::runtime::build_runtime_entries;
use crate::config::TimelineTuning;
use crate::sync::clock::effective_time;
use narr_common::chunk::{ChunkMetadata, TimeRange};
use narr_common::events::{EventBus, SequenceTrack, SyncEvent};
use narr_common::timing::TrackTimingPayload;
use tracing::debug;

/// Where sentence boundaries come from
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceSource {
    /// Effective time span per sentence
    Explicit(Vec<TimeRange>),
    /// Apportionment weight per sentence
    Weighted(Vec<f64>),
}

impl SentenceSource {
    /// Pick the best available source for the track being played
    ///
    /// Prefers the chunk's ranges for `track` (when every sentence has a
    /// valid one), then spans grouped from `payload` (when they line up with
    /// the chunk's sentences), then weights.
    pub fn for_track(
        chunk: &ChunkMetadata,
        track: Option<SequenceTrack>,
        payload: Option<&TrackTimingPayload>,
    ) -> Self {
        let (offset, tempo) = payload
            .map(|p| (p.track_offset(), p.tempo_factor()))
            .unwrap_or((0.0, 1.0));

        if let Some(track) = track {
            let ranges: Option<Vec<TimeRange>> = chunk
                .sentences
                .iter()
                .map(|s| match track {
                    SequenceTrack::Original => s.original,
                    SequenceTrack::Translation => s.translation,
                })
                .map(|r| r.filter(TimeRange::is_valid))
                .collect();
            if let Some(ranges) = ranges.filter(|r| !r.is_empty()) {
                return SentenceSource::Explicit(
                    ranges
                        .into_iter()
                        .map(|r| {
                            TimeRange::new(
                                effective_time(r.start, offset, tempo),
                                effective_time(r.end, offset, tempo),
                            )
                        })
                        .collect(),
                );
            }
        }

        if let Some(payload) = payload {
            let entries = build_runtime_entries(payload, Some(chunk));
            if !entries.is_empty() && entries.len() == chunk.sentence_count() {
                return SentenceSource::Explicit(entries.iter().map(|e| e.span()).collect());
            }
        }

        SentenceSource::Weighted(chunk.weights())
    }

    pub fn len(&self) -> usize {
        match self {
            SentenceSource::Explicit(spans) => spans.len(),
            SentenceSource::Weighted(weights) => weights.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, SentenceSource::Explicit(_))
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        1.0
    }
}

fn sanitize_time(time: f64) -> f64 {
    if time.is_finite() && time > 0.0 {
        time
    } else {
        0.0
    }
}

/// `clamp(time / duration, 0, 1)`, snapped to 1 above `snap_threshold`
///
/// Unknown (non-positive) durations give 0.
pub fn chunk_progress(time: f64, duration: f64, snap_threshold: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    let progress = (sanitize_time(time) / duration).clamp(0.0, 1.0);
    if progress > snap_threshold {
        1.0
    } else {
        progress
    }
}

/// First index whose cumulative weight exceeds `progress × total`
///
/// Falls back to the last index when none does. None only for no sentences.
pub fn weighted_sentence_index(weights: &[f64], progress: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().copied().map(sanitize_weight).sum();
    let target = progress.clamp(0.0, 1.0) * total;

    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().copied().map(sanitize_weight).enumerate() {
        cumulative += weight;
        if cumulative > target {
            return Some(index);
        }
    }
    Some(weights.len() - 1)
}

/// Spans implied by apportioning `duration` across weights
pub fn weighted_spans(weights: &[f64], duration: f64) -> Vec<TimeRange> {
    let total: f64 = weights.iter().copied().map(sanitize_weight).sum();
    if total <= 0.0 || !duration.is_finite() || duration <= 0.0 {
        return vec![TimeRange::new(0.0, 0.0); weights.len()];
    }

    let mut spans = Vec::with_capacity(weights.len());
    let mut cumulative = 0.0;
    for weight in weights.iter().copied().map(sanitize_weight) {
        let start = cumulative / total * duration;
        cumulative += weight;
        spans.push(TimeRange::new(start, cumulative / total * duration));
    }
    spans
}

/// Last sentence whose span has started at `time` (first sentence if none)
pub fn explicit_sentence_index(spans: &[TimeRange], time: f64) -> Option<usize> {
    if spans.is_empty() {
        return None;
    }
    let time = sanitize_time(time);
    Some(spans.partition_point(|s| s.start <= time).saturating_sub(1))
}

/// Unguarded candidate for one time sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentenceCandidate {
    pub index: usize,
    pub progress: f64,
}

pub struct SentenceTimelineResolver {
    chunk_id: String,
    source: SentenceSource,

    /// Displayed sentence index
    current_index: usize,

    /// Effective chunk time of the last sample
    chunk_time: f64,

    progress: f64,
    tuning: TimelineTuning,
    bus: EventBus,
}

impl SentenceTimelineResolver {
    pub fn new(tuning: TimelineTuning, bus: EventBus) -> Self {
        Self {
            chunk_id: String::new(),
            source: SentenceSource::Weighted(Vec::new()),
            current_index: 0,
            chunk_time: 0.0,
            progress: 0.0,
            tuning,
            bus,
        }
    }

    /// Replace the sentence source for a chunk
    ///
    /// A new chunk resets to sentence 0. The same chunk keeps the displayed
    /// index (clamped), since only the track being measured changed.
    pub fn set_source(&mut self, chunk_id: &str, source: SentenceSource) {
        if self.chunk_id != chunk_id {
            self.chunk_id = chunk_id.to_string();
            self.current_index = 0;
            self.chunk_time = 0.0;
            self.progress = 0.0;
        }
        self.current_index = self.current_index.min(source.len().saturating_sub(1));
        debug!(
            "Sentence source for {}: {} sentence(s), explicit={}",
            chunk_id,
            source.len(),
            source.is_explicit()
        );
        self.source = source;
    }

    pub fn source(&self) -> &SentenceSource {
        &self.source
    }

    pub fn sentence_count(&self) -> usize {
        self.source.len()
    }

    /// Displayed sentence index; None for a chunk without sentences
    pub fn current_index(&self) -> Option<usize> {
        if self.source.is_empty() {
            None
        } else {
            Some(self.current_index)
        }
    }

    pub fn chunk_time(&self) -> f64 {
        self.chunk_time
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Compute the candidate index without touching state
    pub fn candidate(&self, time: f64, duration: f64) -> Option<SentenceCandidate> {
        let time = sanitize_time(time);
        match &self.source {
            SentenceSource::Explicit(spans) => {
                let total = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    spans.iter().map(|s| s.end).fold(0.0, f64::max)
                };
                explicit_sentence_index(spans, time).map(|index| SentenceCandidate {
                    index,
                    progress: chunk_progress(time, total, self.tuning.progress_snap_threshold),
                })
            }
            SentenceSource::Weighted(weights) => {
                let progress = chunk_progress(time, duration, self.tuning.progress_snap_threshold);
                weighted_sentence_index(weights, progress)
                    .map(|index| SentenceCandidate { index, progress })
            }
        }
    }

    /// Resolve a time sample and apply the guards
    ///
    /// Chunk time and progress always follow the sample; the sentence index
    /// only moves when the guards accept the candidate.
    pub fn update(&mut self, time: f64, duration: f64, ctx: &GuardContext<'_>) -> GuardVerdict {
        let time = sanitize_time(time);
        let Some(candidate) = self.candidate(time, duration) else {
            return GuardVerdict::Unchanged;
        };
        self.chunk_time = time;
        self.progress = candidate.progress;

        let spans = match &self.source {
            SentenceSource::Explicit(spans) => spans.clone(),
            SentenceSource::Weighted(weights) => weighted_spans(weights, duration),
        };
        let verdict = check_sentence_change(
            self.current_index,
            candidate.index,
            time,
            &spans,
            ctx,
            &self.tuning,
        );
        match verdict {
            GuardVerdict::Accept => self.set_index(candidate.index),
            GuardVerdict::Reject(reason) => {
                debug!(
                    "Sentence change {} -> {} at {:.3}s rejected: {:?}",
                    self.current_index, candidate.index, time, reason
                );
            }
            GuardVerdict::Unchanged => {}
        }
        verdict
    }

    /// Move the displayed index directly, bypassing the guards
    ///
    /// Used when a segment is applied so the old sentence never flashes
    /// while the seek is in flight.
    pub fn force_index(&mut self, index: usize, time: f64) {
        if self.source.is_empty() {
            return;
        }
        self.chunk_time = sanitize_time(time);
        self.set_index(index.min(self.source.len() - 1));
    }

    fn set_index(&mut self, index: usize) {
        if index == self.current_index {
            return;
        }
        debug!("Active sentence {} -> {}", self.current_index, index);
        self.current_index = index;
        self.bus.emit_lossy(SyncEvent::SentenceChanged {
            chunk_id: self.chunk_id.clone(),
            sentence_index: index,
            chunk_time: self.chunk_time,
            timestamp: chrono::Utc::now(),
        });
    }
}
