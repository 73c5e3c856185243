//! Sentence change guards
//!
//! Decide whether a candidate sentence index may replace the displayed one.
//! Two tracks with different tempo factors can disagree about where a
//! sentence boundary falls, and the host reports a transient time of 0 while
//! it reloads a source; these rules keep both from showing up as visible
//! backward jumps or boundary flicker.

use crate::config::TimelineTuning;
use crate::sequence::TransitionState;
use narr_common::chunk::TimeRange;
use std::time::Instant;

/// What the guards need to know about the rest of the session
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub transition: &'a TransitionState,
    /// Multi-track alternating sequence is driving sentence movement
    pub sequence_active: bool,
    pub now: Instant,
}

/// Why a candidate was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Seek or source change still settling
    TransitionInProgress,
    /// Host time reads 0 while it reloads after a track switch
    TransientZero,
    /// Sequence advancement owns sentence movement
    SequenceActive,
    /// Backward move too soon after a manual seek
    PostSeekWindow,
    /// Time has not cleared the boundary by the epsilon
    BoundaryJitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Unchanged,
    Accept,
    Reject(RejectReason),
}

/// Apply the sentence change rules
///
/// # Arguments
/// * `current` - Displayed sentence index
/// * `candidate` - Index computed from the current time
/// * `time` - Effective time the candidate was computed at
/// * `spans` - Effective time span of each sentence
pub fn check_sentence_change(
    current: usize,
    candidate: usize,
    time: f64,
    spans: &[TimeRange],
    ctx: &GuardContext<'_>,
    tuning: &TimelineTuning,
) -> GuardVerdict {
    if candidate == current {
        return GuardVerdict::Unchanged;
    }
    if ctx.transition.in_progress() {
        return GuardVerdict::Reject(RejectReason::TransitionInProgress);
    }

    let window = tuning.post_seek_suppression();
    if candidate == 0
        && time == 0.0
        && ctx.transition.recently_switched_track(ctx.now, window)
    {
        return GuardVerdict::Reject(RejectReason::TransientZero);
    }

    let epsilon = tuning.boundary_epsilon_secs;
    if candidate < current {
        if ctx.sequence_active {
            return GuardVerdict::Reject(RejectReason::SequenceActive);
        }
        if ctx.transition.within_post_seek_window(ctx.now, window) {
            return GuardVerdict::Reject(RejectReason::PostSeekWindow);
        }
        if let Some(span) = spans.get(current) {
            if time > span.end - epsilon {
                return GuardVerdict::Reject(RejectReason::BoundaryJitter);
            }
        }
    } else if let Some(span) = spans.get(candidate) {
        if time < span.start + epsilon {
            return GuardVerdict::Reject(RejectReason::BoundaryJitter);
        }
    }

    GuardVerdict::Accept
}
