//! Token timing data model
//!
//! Per-track timing payloads that drive word highlighting. A payload is an
//! immutable, canonical snapshot of one audio track's token timing for one
//! chunk of narration:
//!
//! - tokens sorted by `(t0, t1, sentence_id, token_index, id)`
//! - pause intervals sorted by start time
//! - a sanitized track offset and tempo factor
//!
//! # Ingestion
//!
//! Upstream metadata arrives in one of two JSON shapes. Both are resolved
//! exactly once through [`TimingDocument`] so the engine only ever sees
//! [`TrackTimingPayload`]:
//!
//! ```rust
//! use narr_common::timing::{SchemaVersion, TrackTimingPayload};
//!
//! let json = r#"{
//!     "version": "2",
//!     "chunkId": "chunk-7",
//!     "trackType": "original",
//!     "tokens": [
//!         {"id": "w1", "sentenceId": 0, "tokenIndex": 0, "lane": "original", "text": "Hola", "t0": 0.0, "t1": 0.4},
//!         {"id": "w0", "sentenceId": 0, "tokenIndex": 1, "lane": "original", "text": "mundo", "t0": 0.4, "t1": 0.9}
//!     ],
//!     "tempoFactor": 1.25
//! }"#;
//!
//! let payload = TrackTimingPayload::from_json(json).unwrap();
//! assert_eq!(payload.version(), SchemaVersion::V2);
//! assert_eq!(payload.len(), 2);
//! assert_eq!(payload.tempo_factor(), 1.25);
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// Pauses starting within this distance of the running trailing end extend it
const PAUSE_JOIN_TOLERANCE_SECS: f64 = 0.001;

/// Linguistic variant a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Original,
    Transliteration,
    Translation,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lane::Original => write!(f, "original"),
            Lane::Transliteration => write!(f, "transliteration"),
            Lane::Translation => write!(f, "translation"),
        }
    }
}

/// Why a pause interval exists (diagnostics and rendering only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseReason {
    Silence,
    Tempo,
    Gap,
}

/// Audio track a payload describes
///
/// `OriginalTranslated` is a single combined-audio track carrying both
/// lanes sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Original,
    Translated,
    OriginalTranslated,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Original => write!(f, "original"),
            TrackType::Translated => write!(f, "translated"),
            TrackType::OriginalTranslated => write!(f, "original_translated"),
        }
    }
}

/// Schema the payload was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Legacy millisecond word lists
    V1,
    /// Current token/pause shape
    V2,
}

/// Smallest highlightable unit
///
/// Times are track-local seconds on the effective (offset and tempo
/// corrected) axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub sentence_id: i64,
    pub token_index: u32,
    pub lane: Lane,
    pub text: String,
    pub t0: f64,
    pub t1: f64,
}

impl Token {
    pub fn duration(&self) -> f64 {
        (self.t1 - self.t0).max(0.0)
    }
}

/// Composite token order: `(t0, t1, sentence_id, token_index, id)`
///
/// Zero-duration tokens frequently share timestamps, so every key takes part
/// in the comparison and the result is total.
pub fn compare_tokens(a: &Token, b: &Token) -> Ordering {
    a.t0.total_cmp(&b.t0)
        .then_with(|| a.t1.total_cmp(&b.t1))
        .then_with(|| a.sentence_id.cmp(&b.sentence_id))
        .then_with(|| a.token_index.cmp(&b.token_index))
        .then_with(|| a.id.cmp(&b.id))
}

/// Span with no active token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PauseInterval {
    pub t0: f64,
    pub t1: f64,
    pub reason: PauseReason,
}

/// Currently active token
///
/// `segment_index` is the position in the payload's sorted token list, so
/// ordering hits by it is the same as ordering their tokens by
/// [`compare_tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    pub segment_index: usize,
    pub token_index: u32,
}

/// Coerce a tempo factor to a usable divisor (non-finite or `<= 0` → 1)
pub fn sanitize_tempo_factor(tempo_factor: f64) -> f64 {
    if tempo_factor.is_finite() && tempo_factor > 0.0 {
        tempo_factor
    } else {
        1.0
    }
}

/// Coerce a track offset (non-finite → 0)
pub fn sanitize_offset(offset: f64) -> f64 {
    if offset.is_finite() {
        offset
    } else {
        0.0
    }
}

/// One track's complete, canonical timing for one chunk
#[derive(Debug, Clone)]
pub struct TrackTimingPayload {
    track_type: TrackType,
    chunk_id: String,
    tokens: Vec<Token>,
    pauses: Vec<PauseInterval>,
    track_offset: f64,
    tempo_factor: f64,
    version: SchemaVersion,
    /// Latest token end extended through contiguous trailing pauses
    trailing_end: f64,
}

impl TrackTimingPayload {
    /// Build a canonical payload
    ///
    /// Tokens with non-finite times are dropped, `t1 < t0` is clamped to
    /// `t1 = t0`, and tokens are sorted by the composite order. Offset and
    /// tempo factor are sanitized.
    pub fn new(
        track_type: TrackType,
        chunk_id: impl Into<String>,
        mut tokens: Vec<Token>,
        mut pauses: Vec<PauseInterval>,
        track_offset: f64,
        tempo_factor: f64,
        version: SchemaVersion,
    ) -> Self {
        let chunk_id = chunk_id.into();

        let before = tokens.len();
        tokens.retain(|t| t.t0.is_finite() && t.t1.is_finite());
        if tokens.len() != before {
            warn!(
                "Dropped {} token(s) with non-finite times from chunk {} ({})",
                before - tokens.len(),
                chunk_id,
                track_type
            );
        }
        for token in &mut tokens {
            if token.t1 < token.t0 {
                token.t1 = token.t0;
            }
        }
        tokens.sort_by(compare_tokens);

        pauses.retain(|p| p.t0.is_finite() && p.t1.is_finite() && p.t1 >= p.t0);
        pauses.sort_by(|a, b| a.t0.total_cmp(&b.t0).then_with(|| a.t1.total_cmp(&b.t1)));

        let trailing_end = compute_trailing_end(&tokens, &pauses);

        Self {
            track_type,
            chunk_id,
            tokens,
            pauses,
            track_offset: sanitize_offset(track_offset),
            tempo_factor: sanitize_tempo_factor(tempo_factor),
            version,
            trailing_end,
        }
    }

    /// Parse either JSON schema and canonicalize
    pub fn from_json(json: &str) -> Result<Self> {
        let document: TimingDocument = serde_json::from_str(json)?;
        Ok(document.into_payload())
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn chunk_id(&self) -> &str {
        &self.chunk_id
    }

    /// Tokens in composite order
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, segment_index: usize) -> Option<&Token> {
        self.tokens.get(segment_index)
    }

    /// Token a hit points at, if the hit is still in range
    pub fn hit_token(&self, hit: Hit) -> Option<&Token> {
        self.tokens.get(hit.segment_index)
    }

    pub fn pauses(&self) -> &[PauseInterval] {
        &self.pauses
    }

    pub fn track_offset(&self) -> f64 {
        self.track_offset
    }

    pub fn tempo_factor(&self) -> f64 {
        self.tempo_factor
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Time at which the last token stops being highlighted
    ///
    /// The latest `t1` of any token, extended through any pause intervals
    /// that continue it without a gap. `0.0` for an empty payload.
    pub fn trailing_end(&self) -> f64 {
        self.trailing_end
    }

    /// Effective duration covered by this payload's tokens and pauses
    pub fn duration(&self) -> f64 {
        let pause_end = self.pauses.iter().map(|p| p.t1).fold(0.0, f64::max);
        self.trailing_end.max(pause_end)
    }
}

fn compute_trailing_end(tokens: &[Token], pauses: &[PauseInterval]) -> f64 {
    let Some(last) = tokens.last() else {
        return 0.0;
    };

    // An earlier, longer token may still be sounding after the last one ends
    let mut end = tokens.iter().map(|t| t.t1).fold(last.t1, f64::max);

    for pause in pauses {
        if pause.t1 <= end {
            continue;
        }
        if pause.t0 <= end + PAUSE_JOIN_TOLERANCE_SECS && pause.t0 >= last.t0 {
            end = pause.t1;
        }
    }
    end
}

// ============================================================================
// Wire schemas
// ============================================================================

/// Timing JSON as delivered by the metadata layer, tagged by `version`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "version")]
pub enum TimingDocument {
    #[serde(rename = "1")]
    V1(LegacyTimingDocument),
    #[serde(rename = "2")]
    V2(CurrentTimingDocument),
}

impl TimingDocument {
    /// Resolve into the canonical payload shape
    pub fn into_payload(self) -> TrackTimingPayload {
        match self {
            TimingDocument::V1(doc) => {
                let tokens = doc
                    .words
                    .into_iter()
                    .map(|w| {
                        let lane = w.lane.unwrap_or(Lane::Original);
                        Token {
                            id: w.id.unwrap_or_else(|| {
                                format!("{}-{}-{}", w.sentence_idx, w.word_idx, lane)
                            }),
                            sentence_id: w.sentence_idx,
                            token_index: w.word_idx,
                            lane,
                            text: w.text,
                            t0: w.start_ms / 1000.0,
                            t1: w.end_ms / 1000.0,
                        }
                    })
                    .collect();
                TrackTimingPayload::new(
                    doc.track_type,
                    doc.chunk_id,
                    tokens,
                    Vec::new(),
                    doc.offset_ms / 1000.0,
                    doc.tempo,
                    SchemaVersion::V1,
                )
            }
            TimingDocument::V2(doc) => TrackTimingPayload::new(
                doc.track_type,
                doc.chunk_id,
                doc.tokens,
                doc.pauses,
                doc.track_offset,
                doc.tempo_factor,
                SchemaVersion::V2,
            ),
        }
    }
}

/// Legacy word-list shape (milliseconds, no pauses)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTimingDocument {
    pub chunk_id: String,
    pub track_type: TrackType,
    pub words: Vec<LegacyWord>,
    #[serde(default)]
    pub offset_ms: f64,
    #[serde(default = "default_tempo")]
    pub tempo: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyWord {
    #[serde(default)]
    pub id: Option<String>,
    pub sentence_idx: i64,
    pub word_idx: u32,
    pub text: String,
    #[serde(default)]
    pub lane: Option<Lane>,
    pub start_ms: f64,
    pub end_ms: f64,
}

/// Current token/pause shape (seconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTimingDocument {
    pub chunk_id: String,
    pub track_type: TrackType,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub pauses: Vec<PauseInterval>,
    #[serde(default)]
    pub track_offset: f64,
    #[serde(default = "default_tempo")]
    pub tempo_factor: f64,
}

fn default_tempo() -> f64 {
    1.0
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
