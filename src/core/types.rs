//! core/types.rs
//! Small shared types used across the engine.
//!
//! Times are `i64` nanoseconds everywhere, with `-1` meaning "unknown"
//! where a plain number is stored (stream length).

use std::fmt;
use std::time::Duration;

/// Logical player state as seen by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// No backend; only observed transiently
    Invalid,
    Stop,
    Play,
    Pause,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Invalid => write!(f, "invalid"),
            PlayerState::Stop => write!(f, "stop"),
            PlayerState::Play => write!(f, "play"),
            PlayerState::Pause => write!(f, "pause"),
        }
    }
}

/// Unit used by `seek`, `tell` and `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFormat {
    /// Nanoseconds
    Time,
    /// 0..=100 of the stream length
    Percent,
}

pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

pub fn duration_to_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}

/// Negative values clamp to zero.
pub fn nanos_to_duration(ns: i64) -> Duration {
    Duration::from_nanos(ns.max(0) as u64)
}

/// Format nanoseconds as `m:ss` for status lines.
pub fn format_clock(ns: i64) -> String {
    if ns < 0 {
        return "--:--".into();
    }
    let secs = ns / NANOS_PER_SEC;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(-1), "--:--");
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(61 * NANOS_PER_SEC + 500 * NANOS_PER_MILLI), "1:01");
    }

    #[test]
    fn duration_conversions_clamp() {
        assert_eq!(nanos_to_duration(-5), Duration::ZERO);
        assert_eq!(duration_to_nanos(Duration::from_millis(3)), 3 * NANOS_PER_MILLI);
    }
}
