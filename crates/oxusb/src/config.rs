//! Environment override for the log level.
//!
//! `OXUSB_DEBUG` is read once per process and cached in an atomic. When it
//! is set, the level it names is applied to the default logger at context
//! initialization and the level is *fixed*: [`crate::Context::set_log_level`]
//! becomes a no-op, so an embedder's debugging session cannot be silenced
//! by application code.

use std::sync::atomic::{AtomicU8, Ordering};

use oxusb_policy::LogLevel;

/// Environment variable naming the fixed log level.
pub const ENV_VAR: &str = "OXUSB_DEBUG";

// Atomic cache: level discriminants 0..=5, or one of the two sentinels.
static CACHED: AtomicU8 = AtomicU8::new(UNRESOLVED);

const UNRESOLVED: u8 = 0xFF;
const UNSET: u8 = 0xFE;

/// The level named by `OXUSB_DEBUG`, or `None` if the variable is unset.
///
/// Unrecognized values parse loosely and fall back to [`LogLevel::None`]
/// (still fixed, still disabling output). The first call resolves the
/// environment; concurrent first calls may both read it, which is benign
/// because they store the same result.
#[must_use]
pub fn env_level() -> Option<LogLevel> {
    match CACHED.load(Ordering::Acquire) {
        UNRESOLVED => {
            let resolved = std::env::var(ENV_VAR)
                .ok()
                .map(|raw| LogLevel::from_str_loose(&raw));
            CACHED.store(resolved.map_or(UNSET, |l| l as u8), Ordering::Release);
            resolved
        }
        UNSET => None,
        v => LogLevel::from_u8(v),
    }
}
