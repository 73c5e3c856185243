//! Chunk and payload fixtures
//!
//! Sentence ranges (raw seconds):
//!
//! | sentence | original  | translation |
//! |----------|-----------|-------------|
//! | 0        | 0.0 - 2.0 | 0.0 - 3.0   |
//! | 1        | 2.0 - 4.0 | 3.0 - 5.0   |
//! | 2        | 4.0 - 6.0 | 5.0 - 8.0   |
//!
//! The original payload has four tokens per sentence, the translation
//! payload three, both spread evenly over the sentence's range.

use narr_common::chunk::{ChunkMetadata, ChunkSentence, TimeRange, TrackAvailability};
use narr_common::timing::{Lane, SchemaVersion, Token, TrackTimingPayload, TrackType};
use narr_sync::TrackPayloads;

pub const ORIGINAL_RANGES: [(f64, f64); 3] = [(0.0, 2.0), (2.0, 4.0), (4.0, 6.0)];
pub const TRANSLATION_RANGES: [(f64, f64); 3] = [(0.0, 3.0), (3.0, 5.0), (5.0, 8.0)];

pub const ORIGINAL_TOKENS_PER_SENTENCE: usize = 4;
pub const TRANSLATION_TOKENS_PER_SENTENCE: usize = 3;

pub fn three_sentence_chunk() -> ChunkMetadata {
    let sentences = ORIGINAL_RANGES
        .iter()
        .zip(TRANSLATION_RANGES.iter())
        .enumerate()
        .map(|(i, (o, t))| ChunkSentence {
            sentence_index: i,
            sentence_number: Some(100 + i as u32),
            text: format!("sentence {}", i),
            weight: None,
            original: Some(TimeRange::new(o.0, o.1)),
            translation: Some(TimeRange::new(t.0, t.1)),
        })
        .collect();

    ChunkMetadata {
        chunk_id: "chunk-7".into(),
        sentences,
        availability: TrackAvailability {
            original: true,
            translation: true,
            combined: false,
        },
    }
}

/// Chunk with weights only; sentence timing must be apportioned
pub fn chunk_without_ranges(weights: &[f64]) -> ChunkMetadata {
    ChunkMetadata {
        chunk_id: "chunk-weighted".into(),
        sentences: weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| ChunkSentence {
                sentence_index: i,
                sentence_number: None,
                text: String::new(),
                weight: Some(weight),
                original: None,
                translation: None,
            })
            .collect(),
        availability: TrackAvailability {
            original: true,
            translation: false,
            combined: false,
        },
    }
}

fn spread(lane: Lane, ranges: &[(f64, f64)], per_sentence: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (sentence, &(start, end)) in ranges.iter().enumerate() {
        let step = (end - start) / per_sentence as f64;
        for i in 0..per_sentence {
            let t0 = start + step * i as f64;
            tokens.push(Token {
                id: format!("{}-{}-{}", lane, sentence, i),
                sentence_id: sentence as i64,
                token_index: i as u32,
                lane,
                text: format!("w{}", i),
                t0,
                t1: t0 + step,
            });
        }
    }
    tokens
}

pub fn original_payload() -> TrackTimingPayload {
    TrackTimingPayload::new(
        TrackType::Original,
        "chunk-7",
        spread(Lane::Original, &ORIGINAL_RANGES, ORIGINAL_TOKENS_PER_SENTENCE),
        vec![],
        0.0,
        1.0,
        SchemaVersion::V2,
    )
}

pub fn translation_payload() -> TrackTimingPayload {
    TrackTimingPayload::new(
        TrackType::Translated,
        "chunk-7",
        spread(Lane::Translation, &TRANSLATION_RANGES, TRANSLATION_TOKENS_PER_SENTENCE),
        vec![],
        0.0,
        1.0,
        SchemaVersion::V2,
    )
}

/// Original-track payload whose tokens carry a transliteration lane
/// alongside the original one
pub fn transliteration_payload() -> TrackTimingPayload {
    let mut tokens = spread(Lane::Original, &ORIGINAL_RANGES, ORIGINAL_TOKENS_PER_SENTENCE);
    tokens.extend(spread(
        Lane::Transliteration,
        &ORIGINAL_RANGES,
        ORIGINAL_TOKENS_PER_SENTENCE,
    ));
    TrackTimingPayload::new(
        TrackType::Original,
        "chunk-7",
        tokens,
        vec![],
        0.0,
        1.0,
        SchemaVersion::V2,
    )
}

pub fn two_track_payloads() -> TrackPayloads {
    TrackPayloads::from_payloads([original_payload(), translation_payload()])
}

/// Single-sentence original payload from `(t0, t1)` pairs
pub fn payload_from_pairs(pairs: &[(f64, f64)]) -> TrackTimingPayload {
    let tokens = pairs
        .iter()
        .enumerate()
        .map(|(i, &(t0, t1))| Token {
            id: format!("t{}", i),
            sentence_id: 0,
            token_index: i as u32,
            lane: Lane::Original,
            text: String::new(),
            t0,
            t1,
        })
        .collect();
    TrackTimingPayload::new(
        TrackType::Original,
        "chunk-7",
        tokens,
        vec![],
        0.0,
        1.0,
        SchemaVersion::V2,
    )
}
