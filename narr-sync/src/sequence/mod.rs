//! Alternating-track sequence playback
//!
//! Planner, playback controller and the transition-in-progress state they
//! share with the rest of the session.

pub mod controller;
pub mod plan;
pub mod transition;

pub use controller::{AppliedSeek, SequencePlaybackController, SkipDirection, VisibleLanes};
pub use plan::{
    build_sequence_plan, EnabledTracks, SequencePlan, SequenceSegment, TrackPreferences,
};
pub use transition::{PendingSeek, TransitionState};
