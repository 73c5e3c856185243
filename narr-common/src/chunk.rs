//! Chunk and sentence metadata
//!
//! The sequence-plan precursor supplied by the metadata layer: an ordered
//! sentence list with per-track time ranges, plus which audio tracks the
//! chunk actually has.

use serde::{Deserialize, Serialize};

/// Closed time range in seconds on one track's own timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Finite and not inverted
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.end >= self.start
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One sentence of a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSentence {
    /// Zero-based position within the chunk
    pub sentence_index: usize,

    /// Book-wide sentence number, when the metadata layer knows it
    #[serde(default)]
    pub sentence_number: Option<u32>,

    /// Display text (weight fallback)
    #[serde(default)]
    pub text: String,

    /// Explicit apportionment weight for the duration fallback
    #[serde(default)]
    pub weight: Option<f64>,

    /// Range on the original-language track
    #[serde(default)]
    pub original: Option<TimeRange>,

    /// Range on the translation track
    #[serde(default)]
    pub translation: Option<TimeRange>,
}

impl ChunkSentence {
    /// Duration apportionment weight
    ///
    /// Explicit weight, else word count of the text, else 1. Non-finite or
    /// non-positive values become 1 so every sentence stays reachable.
    pub fn weight(&self) -> f64 {
        let raw = self
            .weight
            .unwrap_or_else(|| self.text.split_whitespace().count() as f64);
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            1.0
        }
    }
}

/// Audio tracks present for a chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAvailability {
    #[serde(default)]
    pub original: bool,
    #[serde(default)]
    pub translation: bool,
    /// Single combined-audio track carrying both lanes
    #[serde(default)]
    pub combined: bool,
}

/// Everything the engine needs to know about a chunk besides token timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub chunk_id: String,
    pub sentences: Vec<ChunkSentence>,
    #[serde(default)]
    pub availability: TrackAvailability,
}

impl ChunkMetadata {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Weights in sentence order
    pub fn weights(&self) -> Vec<f64> {
        self.sentences.iter().map(ChunkSentence::weight).collect()
    }
}
