//! Log message levels.
//!
//! Six levels in ascending verbosity. A logger holds one of these as its
//! *threshold*: a message is emitted iff its level is admitted by the
//! threshold. `None` disables all output; `Trace` enables everything,
//! including zero-content spans that only mark call entry/exit.

use std::fmt;

/// Severity/verbosity of a log message, and the threshold type of a logger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// No messages are ever logged.
    #[default]
    None = 0,
    /// Error messages only.
    Error = 1,
    /// Warnings and errors.
    Warning = 2,
    /// Informational messages, warnings and errors.
    Info = 3,
    /// As `Info`, plus debug messages.
    Debug = 4,
    /// As `Debug`, plus internal trace spans.
    Trace = 5,
}

impl LogLevel {
    /// Lowercase level name as it appears in log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Whether a message at `level` passes this threshold.
    ///
    /// A `None`-level message is never admitted, so a malformed call
    /// cannot bypass a `None` threshold.
    #[must_use]
    pub fn admits(self, level: LogLevel) -> bool {
        level != Self::None && level <= self
    }

    /// Whether a logger at this threshold uses the verbose line shape
    /// (timestamp and thread-id columns, one-shot column header).
    #[must_use]
    pub fn is_verbose(self) -> bool {
        self >= Self::Debug
    }

    /// Parse from string (case-insensitive). Accepts level names and the
    /// numeric forms `0`..`5`; anything unrecognized falls back to `None`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "err" | "1" => Self::Error,
            "warning" | "warn" | "2" => Self::Warning,
            "info" | "3" => Self::Info,
            "debug" | "4" => Self::Debug,
            "trace" | "verbose" | "5" => Self::Trace,
            _ => Self::None,
        }
    }

    /// Recover a level from its discriminant.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Debug),
            5 => Some(Self::Trace),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_verbosity() {
        assert!(LogLevel::None < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn admission_is_level_at_most_threshold() {
        assert!(LogLevel::Warning.admits(LogLevel::Error));
        assert!(LogLevel::Warning.admits(LogLevel::Warning));
        assert!(!LogLevel::Warning.admits(LogLevel::Info));
        assert!(LogLevel::Trace.admits(LogLevel::Trace));
    }

    #[test]
    fn none_threshold_suppresses_everything() {
        for level in [
            LogLevel::Error,
            LogLevel::Warning,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(!LogLevel::None.admits(level), "{level} must be suppressed");
        }
    }

    #[test]
    fn none_level_messages_are_never_admitted() {
        assert!(!LogLevel::Trace.admits(LogLevel::None));
        assert!(!LogLevel::None.admits(LogLevel::None));
    }

    #[test]
    fn loose_parse_accepts_names_and_digits() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), LogLevel::Warning);
        assert_eq!(LogLevel::from_str_loose("warn"), LogLevel::Warning);
        assert_eq!(LogLevel::from_str_loose(" 4 "), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_loose("5"), LogLevel::Trace);
        assert_eq!(LogLevel::from_str_loose("garbage"), LogLevel::None);
    }

    #[test]
    fn verbose_shape_starts_at_debug() {
        assert!(!LogLevel::Info.is_verbose());
        assert!(LogLevel::Debug.is_verbose());
        assert!(LogLevel::Trace.is_verbose());
    }

    #[test]
    fn discriminant_roundtrip() {
        for v in 0u8..=5 {
            let level = LogLevel::from_u8(v).expect("valid discriminant");
            assert_eq!(level as u8, v);
        }
        assert_eq!(LogLevel::from_u8(6), None);
    }
}
