//! Test helper modules for narr-sync integration tests
//!
//! Provides reusable test infrastructure components:
//! - Fixtures: three-sentence two-track chunk with matching payloads
//! - Session harness: session attached to a scripted host, with a virtual clock
//! - Event helpers: drain a session's event bus

pub mod fixtures;
pub mod harness;

// Re-export commonly used types
pub use fixtures::{
    chunk_without_ranges, original_payload, payload_from_pairs, three_sentence_chunk,
    translation_payload, transliteration_payload, two_track_payloads,
};
pub use harness::{drain_events, Harness};
