//! Configuration for the narration sync engine
//!
//! Every threshold here was chosen empirically against playback traces.
//! They are tunables, not invariants: validate changes with
//! `narr-sync replay` before shipping them.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`NARR_SYNC_CONFIG`)
//! 3. `<config_dir>/narr/sync.toml`
//! 4. Built-in defaults (code constants)
//!
//! ```toml
//! [sync]
//! large_seek_threshold_secs = 2.0
//!
//! [timeline]
//! boundary_epsilon_secs = 0.05
//! post_seek_suppression_ms = 500
//! progress_snap_threshold = 0.995
//!
//! [sequence]
//! segment_end_epsilon_secs = 0.03
//! window_epsilon_secs = 0.25
//! seek_settle_frames = 2
//!
//! [events]
//! capacity = 256
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{Error, Result};
use narr_common::config::{load_or_default, ConfigSource, LoggingConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "NARR_SYNC_CONFIG";

/// Config file name under the per-user config directory
pub const CONFIG_FILE_NAME: &str = "sync.toml";

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SyncConfig {
    #[serde(default)]
    pub sync: SyncTuning,
    #[serde(default)]
    pub timeline: TimelineTuning,
    #[serde(default)]
    pub sequence: SequenceTuning,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sync controller tunables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncTuning {
    /// Time jumps larger than this are implicit seeks
    #[serde(default = "default_large_seek_threshold_secs")]
    pub large_seek_threshold_secs: f64,
}

/// Sentence timeline resolver tunables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TimelineTuning {
    /// Distance past a sentence boundary required before switching sentences
    #[serde(default = "default_boundary_epsilon_secs")]
    pub boundary_epsilon_secs: f64,

    /// Backward sentence moves are rejected for this long after a manual seek
    #[serde(default = "default_post_seek_suppression_ms")]
    pub post_seek_suppression_ms: u64,

    /// Progress above this fraction snaps to 1.0
    #[serde(default = "default_progress_snap_threshold")]
    pub progress_snap_threshold: f64,
}

/// Sequence playback tunables
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SequenceTuning {
    /// Tolerance for "segment end reached"
    #[serde(default = "default_segment_end_epsilon_secs")]
    pub segment_end_epsilon_secs: f64,

    /// Slack around a segment window within which the current index is kept
    #[serde(default = "default_window_epsilon_secs")]
    pub window_epsilon_secs: f64,

    /// Animation frames a same-track seek stays "in transition"
    #[serde(default = "default_seek_settle_frames")]
    pub seek_settle_frames: u8,
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EventsConfig {
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

fn default_large_seek_threshold_secs() -> f64 {
    2.0
}

fn default_boundary_epsilon_secs() -> f64 {
    0.05
}

fn default_post_seek_suppression_ms() -> u64 {
    500
}

fn default_progress_snap_threshold() -> f64 {
    0.995
}

fn default_segment_end_epsilon_secs() -> f64 {
    0.03
}

fn default_window_epsilon_secs() -> f64 {
    0.25
}

fn default_seek_settle_frames() -> u8 {
    2
}

fn default_event_capacity() -> usize {
    256
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            large_seek_threshold_secs: default_large_seek_threshold_secs(),
        }
    }
}

impl Default for TimelineTuning {
    fn default() -> Self {
        Self {
            boundary_epsilon_secs: default_boundary_epsilon_secs(),
            post_seek_suppression_ms: default_post_seek_suppression_ms(),
            progress_snap_threshold: default_progress_snap_threshold(),
        }
    }
}

impl TimelineTuning {
    pub fn post_seek_suppression(&self) -> Duration {
        Duration::from_millis(self.post_seek_suppression_ms)
    }
}

impl Default for SequenceTuning {
    fn default() -> Self {
        Self {
            segment_end_epsilon_secs: default_segment_end_epsilon_secs(),
            window_epsilon_secs: default_window_epsilon_secs(),
            seek_settle_frames: default_seek_settle_frames(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl SyncConfig {
    /// Resolve, load and validate configuration
    ///
    /// Returns the config together with where it came from.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (config, source): (SyncConfig, ConfigSource) =
            load_or_default(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME)?;
        config.validate()?;
        Ok((config, source))
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: SyncConfig =
            toml::from_str(toml_str).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject non-finite or negative tunables
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("sync.large_seek_threshold_secs", self.sync.large_seek_threshold_secs),
            ("timeline.boundary_epsilon_secs", self.timeline.boundary_epsilon_secs),
            ("timeline.progress_snap_threshold", self.timeline.progress_snap_threshold),
            ("sequence.segment_end_epsilon_secs", self.sequence.segment_end_epsilon_secs),
            ("sequence.window_epsilon_secs", self.sequence.window_epsilon_secs),
        ];
        for (key, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    key, value
                )));
            }
        }
        if self.timeline.progress_snap_threshold > 1.0 {
            return Err(Error::Config(format!(
                "timeline.progress_snap_threshold must be <= 1.0, got {}",
                self.timeline.progress_snap_threshold
            )));
        }
        Ok(())
    }
}
