//! Human-readable media time formatting
//!
//! Consistent display of playback positions for debug overlays, logs and the
//! replay CLI.

/// Values at or above one hour switch to `H:MM:SS.mmm`
const HOUR_FORMAT_MIN: f64 = 3600.0;

/// Placeholder for times that cannot be shown
const UNKNOWN_TIME: &str = "--:--.---";

/// Format seconds as a playback position.
///
/// - Below one hour: `M:SS.mmm`
/// - One hour or more: `H:MM:SS.mmm`
/// - Non-finite input: `--:--.---`
///
/// Milliseconds are rounded to the nearest unit.
///
/// # Examples
///
/// ```
/// use narr_common::human_time::format_media_time;
///
/// assert_eq!(format_media_time(0.0), "0:00.000");
/// assert_eq!(format_media_time(75.25), "1:15.250");
/// assert_eq!(format_media_time(3661.5), "1:01:01.500");
/// assert_eq!(format_media_time(-2.0), "-0:02.000");
/// assert_eq!(format_media_time(f64::NAN), "--:--.---");
/// ```
pub fn format_media_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return UNKNOWN_TIME.to_string();
    }

    let is_negative = seconds < 0.0;
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    let formatted = if seconds.abs() >= HOUR_FORMAT_MIN {
        format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
    } else {
        format!("{}:{:02}.{:03}", total_secs / 60, secs, ms)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Format an optional position, `"null"` for None
pub fn format_media_time_opt(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) => format_media_time(s),
        None => "null".to_string(),
    }
}

/// Format a playback rate multiplier as `1.25x`
pub fn format_rate(rate: f64) -> String {
    if rate.is_finite() {
        format!("{:.2}x", rate)
    } else {
        "?x".to_string()
    }
}
