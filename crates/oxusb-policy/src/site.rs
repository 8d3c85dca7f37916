//! Call-site metadata and the process-relative timestamp clock.
//!
//! Every dispatch into a policy carries where the request came from (file,
//! function, line) and when (seconds since the library was first
//! initialized, as `f64`). The macros in the `oxusb` crate capture the
//! location; the dispatch wrappers stamp the time.

use std::sync::OnceLock;
use std::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Pin the timestamp origin to "now" if it is not set yet.
///
/// `Context::new` calls this so timestamps count from context
/// initialization. If nothing calls it, the origin is pinned lazily by the
/// first [`timestamp`] call instead.
pub fn init_timestamp_origin() {
    let _ = ORIGIN.get_or_init(Instant::now);
}

/// Seconds since the timestamp origin.
#[must_use]
pub fn timestamp() -> f64 {
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Static source location of a policy call, captured by the call-site
/// macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Source file the request originated in.
    pub file: &'static str,
    /// Enclosing function path.
    pub func: &'static str,
    /// Line number within `file`.
    pub line: u32,
}

/// A [`CallSite`] stamped for an allocation request, with the request's
/// display label (usually a type name, or `"T[n]"` for arrays; absent for
/// plain frees).
#[derive(Debug, Clone, Copy)]
pub struct AllocSite {
    pub label: Option<&'static str>,
    pub file: &'static str,
    pub func: &'static str,
    pub line: u32,
    /// Seconds since the timestamp origin at the moment of dispatch.
    pub stamp: f64,
}

impl AllocSite {
    /// Stamp a call site for an allocation request.
    #[must_use]
    pub fn new(label: Option<&'static str>, site: CallSite) -> Self {
        Self {
            label,
            file: site.file,
            func: site.func,
            line: site.line,
            stamp: timestamp(),
        }
    }
}

/// A [`CallSite`] stamped for a log entry.
#[derive(Debug, Clone, Copy)]
pub struct LogSite {
    pub file: &'static str,
    pub func: &'static str,
    pub line: u32,
    /// Seconds since the timestamp origin at the moment of dispatch.
    pub stamp: f64,
}

impl LogSite {
    /// Stamp a call site for a log entry.
    #[must_use]
    pub fn new(site: CallSite) -> Self {
        Self {
            file: site.file,
            func: site.func,
            line: site.line,
            stamp: timestamp(),
        }
    }
}
