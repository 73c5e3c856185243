//! Sync diagnostics counters
//!
//! Developer-facing counters for an optional debug overlay. Nothing in the
//! engine branches on them.

use serde::Serialize;

/// Counters maintained by the sync controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncDiagnostics {
    /// Time updates whose hit would have moved backward and were discarded
    pub drift_corrections: u64,

    /// Time updates treated as implicit seeks
    pub large_seeks: u64,

    /// Updates that cleared a hit because no payload was available
    pub dropped_frames: u64,

    /// Host notifications lost because the subscription lagged
    pub lagged_events: u64,
}

impl SyncDiagnostics {
    pub fn record_drift_correction(&mut self) {
        self.drift_corrections += 1;
    }

    pub fn record_large_seek(&mut self) {
        self.large_seeks += 1;
    }

    pub fn record_dropped_frame(&mut self) {
        self.dropped_frames += 1;
    }

    pub fn record_lagged(&mut self, count: u64) {
        self.lagged_events += count;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for SyncDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "drift_corrections={} large_seeks={} dropped_frames={} lagged_events={}",
            self.drift_corrections, self.large_seeks, self.dropped_frames, self.lagged_events
        )
    }
}
