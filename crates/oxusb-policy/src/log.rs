//! The logging policy contract.
//!
//! A log *entry* is produced by exactly one `begin`/`extend`*/`end`
//! sequence. `begin` decides admission against the threshold and, if
//! admitted, takes the logger's serialization lock; `extend` appends
//! formatted text (an embedded newline starts a new output line within the
//! entry, and the final `extend` conventionally omits the trailing newline
//! because `end` appends it); `end` terminates the entry, flushes, and
//! releases the lock.
//!
//! Logging never fails observably: suppressed or malformed sequences
//! degrade to silent no-ops, because diagnostics must never destabilize
//! the host application.

use std::fmt;

use crate::level::LogLevel;
use crate::site::LogSite;

/// A swappable logging back end.
///
/// State machine per instance:
/// `IDLE --begin(admitted)--> OPEN --extend*--> OPEN --end--> IDLE`, and
/// `IDLE --begin(suppressed)--> IDLE` without touching the lock. A `begin`
/// while already `OPEN` on the same thread is rejected silently; there is
/// no return channel in `begin` through which to report it.
pub trait LogPolicy: Send + Sync {
    /// Start a log entry if `level` passes the current threshold.
    ///
    /// When admitted, acquires the per-instance serialization lock for the
    /// duration of the entry; a thread contending with another thread's
    /// open entry blocks here. When suppressed, leaves the instance in a
    /// state where the matching `extend`/`end` calls are cheap no-ops
    /// that never acquire or release the lock.
    fn begin(&self, level: LogLevel, site: &LogSite);

    /// Append formatted text to the open entry.
    ///
    /// Takes a pre-built argument list; variadic callers forward through
    /// `format_args!`. A no-op when this thread has no open entry.
    fn extend(&self, args: fmt::Arguments<'_>);

    /// Terminate the open entry: append the trailing newline, flush, and
    /// release the serialization lock. A no-op when this thread has no
    /// open entry.
    fn end(&self);

    /// Current threshold.
    fn level(&self) -> LogLevel;

    /// Replace the threshold.
    ///
    /// Not synchronized against an in-flight entry; a concurrent level
    /// change during an open entry is an accepted race, not a defect.
    fn set_level(&self, level: LogLevel);
}

/// Emit a complete one-shot entry through the three primitives.
pub fn emit(policy: &dyn LogPolicy, level: LogLevel, site: &LogSite, args: fmt::Arguments<'_>) {
    policy.begin(level, site);
    policy.extend(args);
    policy.end();
}

/// Emit a zero-content span, used purely to mark call entry/exit at
/// `Trace` verbosity.
pub fn emit_span(policy: &dyn LogPolicy, level: LogLevel, site: &LogSite) {
    policy.begin(level, site);
    policy.end();
}
