//! Unit tests for the token timing data model
//!
//! Covers canonical ordering, numeric sanitization, and ingestion of both
//! timing JSON schemas.

use super::*;

fn token(id: &str, sentence_id: i64, token_index: u32, t0: f64, t1: f64) -> Token {
    Token {
        id: id.to_string(),
        sentence_id,
        token_index,
        lane: Lane::Original,
        text: id.to_string(),
        t0,
        t1,
    }
}

fn payload(tokens: Vec<Token>, pauses: Vec<PauseInterval>) -> TrackTimingPayload {
    TrackTimingPayload::new(
        TrackType::Original,
        "chunk-1",
        tokens,
        pauses,
        0.0,
        1.0,
        SchemaVersion::V2,
    )
}

// ============================================================================
// Test Group 1: Composite Ordering
// ============================================================================

#[test]
fn test_tokens_sorted_by_start_time() {
    let p = payload(
        vec![
            token("c", 0, 2, 2.0, 3.0),
            token("a", 0, 0, 0.0, 1.0),
            token("b", 0, 1, 1.0, 2.0),
        ],
        vec![],
    );

    let ids: Vec<&str> = p.tokens().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_zero_duration_ties_broken_by_sentence_then_index_then_id() {
    let p = payload(
        vec![
            token("z", 1, 0, 1.0, 1.0),
            token("y", 0, 3, 1.0, 1.0),
            token("x", 0, 2, 1.0, 1.0),
            token("w2", 0, 2, 1.0, 1.0),
        ],
        vec![],
    );

    let ids: Vec<&str> = p.tokens().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["w2", "x", "y", "z"]);
}

#[test]
fn test_shorter_token_sorts_first_at_same_start() {
    let a = token("a", 0, 0, 1.0, 1.5);
    let b = token("b", 0, 0, 1.0, 1.2);
    assert_eq!(compare_tokens(&a, &b), Ordering::Greater);
    assert_eq!(compare_tokens(&b, &a), Ordering::Less);
    assert_eq!(compare_tokens(&a, &a), Ordering::Equal);
}

#[test]
fn test_hit_order_follows_segment_index() {
    let earlier = Hit { segment_index: 2, token_index: 9 };
    let later = Hit { segment_index: 3, token_index: 0 };
    assert!(earlier < later);
}

// ============================================================================
// Test Group 2: Sanitization
// ============================================================================

#[test]
fn test_tempo_factor_sanitized() {
    assert_eq!(sanitize_tempo_factor(1.5), 1.5);
    assert_eq!(sanitize_tempo_factor(0.0), 1.0);
    assert_eq!(sanitize_tempo_factor(-2.0), 1.0);
    assert_eq!(sanitize_tempo_factor(f64::NAN), 1.0);
    assert_eq!(sanitize_tempo_factor(f64::INFINITY), 1.0);
}

#[test]
fn test_payload_sanitizes_offset_and_tempo() {
    let p = TrackTimingPayload::new(
        TrackType::Translated,
        "chunk-1",
        vec![],
        vec![],
        f64::NAN,
        -1.0,
        SchemaVersion::V2,
    );
    assert_eq!(p.track_offset(), 0.0);
    assert_eq!(p.tempo_factor(), 1.0);
}

#[test]
fn test_non_finite_tokens_dropped() {
    let p = payload(
        vec![
            token("ok", 0, 0, 0.0, 1.0),
            token("nan", 0, 1, f64::NAN, 2.0),
            token("inf", 0, 2, 2.0, f64::INFINITY),
        ],
        vec![],
    );
    assert_eq!(p.len(), 1);
    assert_eq!(p.tokens()[0].id, "ok");
}

#[test]
fn test_inverted_token_clamped() {
    let p = payload(vec![token("a", 0, 0, 2.0, 1.0)], vec![]);
    assert_eq!(p.tokens()[0].t0, 2.0);
    assert_eq!(p.tokens()[0].t1, 2.0);
}

// ============================================================================
// Test Group 3: Trailing End
// ============================================================================

#[test]
fn test_trailing_end_without_pauses_is_last_t1() {
    let p = payload(vec![token("a", 0, 0, 0.0, 1.0), token("b", 0, 1, 1.0, 2.0)], vec![]);
    assert_eq!(p.trailing_end(), 2.0);
}

#[test]
fn test_trailing_end_extends_through_contiguous_pauses() {
    let p = payload(
        vec![token("a", 0, 0, 0.0, 1.0), token("b", 0, 1, 1.0, 2.0)],
        vec![
            PauseInterval { t0: 2.0, t1: 2.5, reason: PauseReason::Silence },
            PauseInterval { t0: 2.5, t1: 3.0, reason: PauseReason::Tempo },
            PauseInterval { t0: 4.0, t1: 5.0, reason: PauseReason::Gap },
        ],
    );
    assert_eq!(p.trailing_end(), 3.0);
    assert_eq!(p.duration(), 5.0);
}

#[test]
fn test_trailing_end_covers_longer_earlier_token() {
    let p = payload(vec![token("a", 0, 0, 0.0, 5.0), token("b", 0, 1, 1.0, 2.0)], vec![]);
    assert_eq!(p.trailing_end(), 5.0);
}

#[test]
fn test_empty_payload() {
    let p = payload(vec![], vec![]);
    assert!(p.is_empty());
    assert_eq!(p.trailing_end(), 0.0);
    assert_eq!(p.duration(), 0.0);
    assert!(p.hit_token(Hit { segment_index: 0, token_index: 0 }).is_none());
}

// ============================================================================
// Test Group 4: Ingestion
// ============================================================================

#[test]
fn test_legacy_document_converted_from_milliseconds() {
    let json = r#"{
        "version": "1",
        "chunkId": "c-legacy",
        "trackType": "translated",
        "offsetMs": 250,
        "tempo": 0.8,
        "words": [
            {"sentenceIdx": 0, "wordIdx": 1, "text": "world", "startMs": 500, "endMs": 900},
            {"sentenceIdx": 0, "wordIdx": 0, "text": "hello", "startMs": 0, "endMs": 500, "lane": "translation"}
        ]
    }"#;

    let p = TrackTimingPayload::from_json(json).unwrap();
    assert_eq!(p.version(), SchemaVersion::V1);
    assert_eq!(p.track_type(), TrackType::Translated);
    assert_eq!(p.chunk_id(), "c-legacy");
    assert_eq!(p.track_offset(), 0.25);
    assert_eq!(p.tempo_factor(), 0.8);

    let first = &p.tokens()[0];
    assert_eq!(first.text, "hello");
    assert_eq!(first.lane, Lane::Translation);
    assert_eq!(first.t1, 0.5);

    let second = &p.tokens()[1];
    assert_eq!(second.lane, Lane::Original);
    assert_eq!(second.id, "0-1-original");
    assert_eq!(second.t0, 0.5);
    assert!(p.pauses().is_empty());
}

#[test]
fn test_current_document_with_pauses() {
    let json = r#"{
        "version": "2",
        "chunkId": "c-2",
        "trackType": "original_translated",
        "trackOffset": 0.5,
        "tokens": [
            {"id": "t0", "sentenceId": 3, "tokenIndex": 0, "lane": "transliteration", "text": "nihao", "t0": 0.0, "t1": 0.6}
        ],
        "pauses": [{"t0": 0.6, "t1": 1.0, "reason": "silence"}]
    }"#;

    let p = TrackTimingPayload::from_json(json).unwrap();
    assert_eq!(p.version(), SchemaVersion::V2);
    assert_eq!(p.track_type(), TrackType::OriginalTranslated);
    assert_eq!(p.tempo_factor(), 1.0);
    assert_eq!(p.track_offset(), 0.5);
    assert_eq!(p.pauses().len(), 1);
    assert_eq!(p.trailing_end(), 1.0);
}

#[test]
fn test_unknown_version_rejected() {
    let json = r#"{"version": "9", "chunkId": "c", "trackType": "original", "tokens": []}"#;
    assert!(matches!(
        TrackTimingPayload::from_json(json),
        Err(crate::Error::Json(_))
    ));
}
