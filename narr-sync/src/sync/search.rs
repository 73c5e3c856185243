//! Nearest-token search
//!
//! Maps an effective playback time to the token that should be highlighted.
//!
//! **Active token rule:** token `i` is active at `τ` when `t0(i) <= τ` and
//! `τ` is before the next token's `t0`. A token therefore stays highlighted
//! through the silence that trails it, so micro-pauses never flash an empty
//! highlight. The last token is active until the payload's trailing end (the
//! latest token `t1`, extended through contiguous trailing pauses).
//!
//! **Algorithm:**
//! 1. With a usable hint, walk from the hint (forward, or backward when the
//!    time is behind it) for a bounded number of steps (O(1) hot path for
//!    monotonically advancing playback)
//! 2. Otherwise, or when the walk runs out of steps, binary search over `t0`
//!    (O(log n) cold path)
//!
//! The hint only affects cost, never the answer.

use narr_common::timing::{Hit, TrackTimingPayload};

/// Steps walked from a hint before giving up and binary searching
const HINT_WALK_LIMIT: usize = 8;

/// Find the token active at `time`
///
/// # Arguments
/// * `payload` - Canonical (sorted) timing payload
/// * `time` - Effective track time in seconds
/// * `hint` - Previous hit; ignored when out of range for this payload
///
/// # Returns
/// The active hit, or `None` when the payload is empty, the time precedes
/// the first token, or the time is past the trailing end.
///
/// # Examples
/// ```
/// use narr_common::timing::{Lane, SchemaVersion, Token, TrackTimingPayload, TrackType};
/// use narr_sync::sync::search::find_nearest_token;
///
/// let tok = |i: u32, t0: f64, t1: f64| Token {
///     id: format!("t{}", i),
///     sentence_id: 0,
///     token_index: i,
///     lane: Lane::Original,
///     text: String::new(),
///     t0,
///     t1,
/// };
/// let payload = TrackTimingPayload::new(
///     TrackType::Original,
///     "c",
///     vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)],
///     vec![],
///     0.0,
///     1.0,
///     SchemaVersion::V2,
/// );
///
/// let hit = find_nearest_token(&payload, 1.5, None).unwrap();
/// assert_eq!(hit.segment_index, 1);
/// assert!(find_nearest_token(&payload, 3.0, None).is_none());
/// ```
pub fn find_nearest_token(
    payload: &TrackTimingPayload,
    time: f64,
    hint: Option<Hit>,
) -> Option<Hit> {
    let tokens = payload.tokens();
    if tokens.is_empty() || !time.is_finite() {
        return None;
    }
    if time < tokens[0].t0 {
        return None;
    }

    let index = hint
        .filter(|h| h.segment_index < tokens.len())
        .and_then(|h| walk_from_hint(payload, time, h.segment_index))
        .unwrap_or_else(|| last_started_index(payload, time));

    let last = tokens.len() - 1;
    if index == last {
        let token = &tokens[last];
        let still_active = time < payload.trailing_end() || time == token.t0;
        if !still_active {
            return None;
        }
    }

    Some(Hit {
        segment_index: index,
        token_index: tokens[index].token_index,
    })
}

/// Index of the last token with `t0 <= time` (caller guarantees one exists)
fn last_started_index(payload: &TrackTimingPayload, time: f64) -> usize {
    let tokens = payload.tokens();
    tokens.partition_point(|t| t.t0 <= time).saturating_sub(1)
}

/// Bounded walk from a hint; `None` when the limit is exhausted
fn walk_from_hint(payload: &TrackTimingPayload, time: f64, start: usize) -> Option<usize> {
    let tokens = payload.tokens();
    let mut index = start;

    if tokens[index].t0 <= time {
        // Forward: advance while the next token has already started
        for _ in 0..HINT_WALK_LIMIT {
            match tokens.get(index + 1) {
                Some(next) if next.t0 <= time => index += 1,
                _ => return Some(index),
            }
        }
        // Limit hit: only done if the following token has not started
        match tokens.get(index + 1) {
            Some(next) if next.t0 <= time => None,
            _ => Some(index),
        }
    } else {
        // Backward: retreat until a started token is found
        for _ in 0..HINT_WALK_LIMIT {
            if index == 0 {
                return None;
            }
            index -= 1;
            if tokens[index].t0 <= time {
                return Some(index);
            }
        }
        None
    }
}

/// Whether a jump between two raw times is large enough to be a seek
///
/// Symmetric in its arguments. Non-finite inputs are never a large seek.
pub fn is_large_seek(last_time: f64, new_time: f64, threshold_secs: f64) -> bool {
    if !last_time.is_finite() || !new_time.is_finite() {
        return false;
    }
    (new_time - last_time).abs() > threshold_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use narr_common::timing::{Lane, PauseInterval, PauseReason, SchemaVersion, Token, TrackType};

    fn tok(i: u32, t0: f64, t1: f64) -> Token {
        Token {
            id: format!("t{:03}", i),
            sentence_id: 0,
            token_index: i,
            lane: Lane::Original,
            text: format!("w{}", i),
            t0,
            t1,
        }
    }

    fn payload(tokens: Vec<Token>, pauses: Vec<PauseInterval>) -> TrackTimingPayload {
        TrackTimingPayload::new(
            TrackType::Original,
            "chunk",
            tokens,
            pauses,
            0.0,
            1.0,
            SchemaVersion::V2,
        )
    }

    /// 100 tokens, 0.5s each, with a 0.1s gap after each
    fn long_payload() -> TrackTimingPayload {
        let tokens = (0..100)
            .map(|i| {
                let t0 = i as f64 * 0.6;
                tok(i, t0, t0 + 0.5)
            })
            .collect();
        payload(tokens, vec![])
    }

    #[test]
    fn test_empty_payload_never_matches() {
        let p = payload(vec![], vec![]);
        assert_eq!(find_nearest_token(&p, 0.0, None), None);
        assert_eq!(
            find_nearest_token(&p, 1.0, Some(Hit { segment_index: 0, token_index: 0 })),
            None
        );
    }

    #[test]
    fn test_before_first_token() {
        let p = payload(vec![tok(0, 1.0, 2.0), tok(1, 2.0, 3.0)], vec![]);
        assert_eq!(find_nearest_token(&p, 0.0, None), None);
        assert_eq!(find_nearest_token(&p, 0.999, None), None);
    }

    #[test]
    fn test_inside_token_interval() {
        let p = payload(vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)], vec![]);
        let hit = find_nearest_token(&p, 1.5, None).unwrap();
        assert_eq!(hit, Hit { segment_index: 1, token_index: 1 });

        let hit = find_nearest_token(&p, 0.0, None).unwrap();
        assert_eq!(hit.segment_index, 0);
    }

    #[test]
    fn test_trailing_gap_keeps_previous_token() {
        let p = payload(vec![tok(0, 0.0, 1.0), tok(1, 1.5, 2.0)], vec![]);
        let hit = find_nearest_token(&p, 1.25, None).unwrap();
        assert_eq!(hit.segment_index, 0);
    }

    #[test]
    fn test_past_last_token_without_pause() {
        let p = payload(vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)], vec![]);
        assert_eq!(find_nearest_token(&p, 2.0, None), None);
        assert_eq!(find_nearest_token(&p, 3.0, None), None);
    }

    #[test]
    fn test_trailing_pause_extends_last_token() {
        let p = payload(
            vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)],
            vec![PauseInterval { t0: 2.0, t1: 2.8, reason: PauseReason::Silence }],
        );
        assert_eq!(find_nearest_token(&p, 2.5, None).unwrap().segment_index, 1);
        assert_eq!(find_nearest_token(&p, 2.8, None), None);
    }

    #[test]
    fn test_overlapping_tokens_stay_active_until_longest_ends() {
        let p = payload(vec![tok(0, 0.0, 5.0), tok(1, 1.0, 2.0)], vec![]);
        assert_eq!(find_nearest_token(&p, 3.0, None).unwrap().segment_index, 1);
        assert_eq!(find_nearest_token(&p, 4.99, None).unwrap().segment_index, 1);
        assert_eq!(find_nearest_token(&p, 5.0, None), None);
    }

    #[test]
    fn test_zero_duration_tokens_last_one_wins() {
        let p = payload(
            vec![tok(0, 0.0, 1.0), tok(1, 1.0, 1.0), tok(2, 1.0, 1.0), tok(3, 1.0, 2.0)],
            vec![],
        );
        let hit = find_nearest_token(&p, 1.0, None).unwrap();
        assert_eq!(hit.segment_index, 3);
    }

    #[test]
    fn test_zero_duration_final_token_at_its_time() {
        let p = payload(vec![tok(0, 0.0, 1.0), tok(1, 1.0, 1.0)], vec![]);
        assert_eq!(find_nearest_token(&p, 1.0, None).unwrap().segment_index, 1);
        assert_eq!(find_nearest_token(&p, 1.01, None), None);
    }

    #[test]
    fn test_non_finite_time() {
        let p = payload(vec![tok(0, 0.0, 1.0)], vec![]);
        assert_eq!(find_nearest_token(&p, f64::NAN, None), None);
    }

    #[test]
    fn test_out_of_range_hint_ignored() {
        let p = payload(vec![tok(0, 0.0, 1.0), tok(1, 1.0, 2.0)], vec![]);
        let stale = Hit { segment_index: 57, token_index: 3 };
        let hit = find_nearest_token(&p, 1.5, Some(stale)).unwrap();
        assert_eq!(hit.segment_index, 1);
    }

    #[test]
    fn test_hint_never_changes_answer() {
        let p = long_payload();
        let hints: Vec<Option<Hit>> = std::iter::once(None)
            .chain([0usize, 1, 10, 49, 50, 51, 90, 99].iter().map(|&i| {
                Some(Hit { segment_index: i, token_index: i as u32 })
            }))
            .collect();

        let mut time = -0.3;
        while time < 62.0 {
            let expected = find_nearest_token(&p, time, None);
            for hint in &hints {
                assert_eq!(
                    find_nearest_token(&p, time, *hint),
                    expected,
                    "time {} hint {:?}",
                    time,
                    hint
                );
            }
            time += 0.07;
        }
    }

    #[test]
    fn test_monotonic_times_give_monotonic_hits() {
        let p = long_payload();
        let mut hint = None;
        let mut previous: Option<Hit> = None;
        let mut time = 0.0;
        while time < 60.0 {
            let hit = find_nearest_token(&p, time, hint);
            if let (Some(prev), Some(cur)) = (previous, hit) {
                assert!(cur >= prev, "hit went backward at {}", time);
            }
            if hit.is_some() {
                previous = hit;
                hint = hit;
            }
            time += 0.033;
        }
    }

    #[test]
    fn test_large_seek_threshold() {
        assert!(is_large_seek(0.9, 3.0, 2.0));
        assert!(!is_large_seek(1.0, 2.5, 2.0));
        assert!(!is_large_seek(1.0, 3.0, 2.0));
        assert!(!is_large_seek(f64::NAN, 30.0, 2.0));
    }

    #[test]
    fn test_large_seek_symmetric() {
        for (a, b) in [(0.0, 2.5), (10.0, 7.9), (3.0, 3.0), (0.0, 2.0)] {
            assert_eq!(is_large_seek(a, b, 2.0), is_large_seek(b, a, 2.0));
        }
    }
}
