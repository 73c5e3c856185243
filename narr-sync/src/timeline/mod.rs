//! Sentence timeline
//!
//! Active sentence resolution, its change guards, and per-sentence runtime
//! entries for progressive text reveal.

pub mod guard;
pub mod resolver;
pub mod runtime;

pub use guard::{check_sentence_change, GuardContext, GuardVerdict, RejectReason};
pub use resolver::{SentenceSource, SentenceTimelineResolver};
pub use runtime::{build_runtime_entries, SentenceRuntimeEntry};
