//! Media clock adapter
//!
//! The only place raw host time becomes logical time. Raw values are coerced
//! at entry (non-finite time → 0, bad rate → 1, bad tempo factor → 1) and
//! every other component consumes the resulting effective time, which undoes
//! a track's lead-in offset and tempo scaling so all tracks share one
//! sentence-progress axis.

use crate::host::HostMedia;
use narr_common::timing::{sanitize_offset, sanitize_tempo_factor};

/// Coerce a raw media time (non-finite or negative → 0)
pub fn coerce_media_time(time: f64) -> f64 {
    if time.is_finite() && time > 0.0 {
        time
    } else {
        0.0
    }
}

/// Coerce a playback rate (non-finite or `<= 0` → 1)
pub fn coerce_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        1.0
    }
}

/// Coerce a media duration (non-finite or negative → 0, meaning unknown)
pub fn coerce_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// `max(0, (raw - offset) / tempo_factor)` with all inputs coerced
pub fn effective_time(raw_time: f64, offset: f64, tempo_factor: f64) -> f64 {
    let raw = if raw_time.is_finite() { raw_time } else { 0.0 };
    ((raw - sanitize_offset(offset)) / sanitize_tempo_factor(tempo_factor)).max(0.0)
}

/// Inverse of [`effective_time`]: raw media time for an effective time
pub fn raw_time(effective: f64, offset: f64, tempo_factor: f64) -> f64 {
    let effective = if effective.is_finite() { effective } else { 0.0 };
    (effective * sanitize_tempo_factor(tempo_factor) + sanitize_offset(offset)).max(0.0)
}

/// Read-only view of a host element's clock
///
/// A detached clock (no element) reads as time 0, rate 1, duration unknown.
#[derive(Clone, Copy)]
pub struct MediaClock<'a> {
    element: Option<&'a dyn HostMedia>,
}

impl<'a> MediaClock<'a> {
    pub fn new(element: &'a dyn HostMedia) -> Self {
        Self {
            element: Some(element),
        }
    }

    pub fn detached() -> Self {
        Self { element: None }
    }

    pub fn is_attached(&self) -> bool {
        self.element.is_some()
    }

    /// Raw current time, 0 if non-finite or detached
    pub fn media_time(&self) -> f64 {
        self.element
            .map(|e| coerce_media_time(e.current_time()))
            .unwrap_or(0.0)
    }

    /// Playback rate, 1 if non-finite, non-positive, or detached
    pub fn playback_rate(&self) -> f64 {
        self.element
            .map(|e| coerce_rate(e.playback_rate()))
            .unwrap_or(1.0)
    }

    /// Source duration, 0 if unknown
    pub fn duration(&self) -> f64 {
        self.element
            .map(|e| coerce_duration(e.duration()))
            .unwrap_or(0.0)
    }

    pub fn is_playing(&self) -> bool {
        self.element.map(|e| e.is_playing()).unwrap_or(false)
    }

    /// Current time on the sentence-progress axis of a track
    pub fn effective_time(&self, offset: f64, tempo_factor: f64) -> f64 {
        effective_time(self.media_time(), offset, tempo_factor)
    }

    /// Source duration on the sentence-progress axis, 0 if unknown
    pub fn effective_duration(&self, offset: f64, tempo_factor: f64) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            effective_time(duration, offset, tempo_factor)
        } else {
            0.0
        }
    }
}
