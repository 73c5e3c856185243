//! # Narr Common Library
//!
//! Shared code for the narration sync crates including:
//! - Token timing data model and payload ingestion
//! - Chunk/sentence metadata
//! - Event types (SyncEvent enum) and EventBus
//! - Configuration file resolution
//! - Media time formatting

pub mod chunk;
pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod timing;

pub use error::{Error, Result};
pub use timing::{Hit, Lane, Token, TrackTimingPayload, TrackType};
