//! # Narration Sync Engine (narr-sync)
//!
//! Keeps on-screen token and sentence highlights in step with narration
//! audio played by a host media element, and sequences alternating
//! original/translation playback sentence by sentence.
//!
//! **Architecture:** a [`PlaybackSession`] owns one [`sync::SyncController`]
//! (token hit), one [`timeline::SentenceTimelineResolver`] (active sentence)
//! and one [`sequence::SequencePlaybackController`] (track alternation).
//! Host notifications are drained and routed synchronously, one at a time;
//! the only asynchrony is the track-switch handshake bridged by
//! [`sequence::TransitionState`].

pub mod config;
pub mod error;
pub mod host;
pub mod replay;
pub mod sequence;
pub mod session;
pub mod sync;
pub mod timeline;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use host::{ClockEvent, HostMedia};
pub use session::{PlaybackSession, SessionSnapshot, TrackPayloads};
