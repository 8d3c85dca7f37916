//! Library contexts and the process-wide default policies.
//!
//! A [`Context`] names the active allocation and logging policies for one
//! slice of library state. Policies are context-scoped singletons shared
//! by every thread using that context; replacing one requires `&mut
//! Context`, which is this design's "quiesce before reconfiguring" rule:
//! exclusive access proves no call against the old policy is in flight
//! through this context.

use std::sync::{Arc, OnceLock};

use oxusb_alloc::SystemAllocator;
use oxusb_log::ConsoleLogger;
use oxusb_policy::{AllocPolicy, LogLevel, LogPolicy, init_timestamp_origin};

use crate::config;

/// The process-wide default allocation policy: a shared pass-through to
/// the system allocator, created on first use.
#[must_use]
pub fn default_allocator() -> Arc<dyn AllocPolicy> {
    static ALLOCATOR: OnceLock<Arc<SystemAllocator>> = OnceLock::new();
    ALLOCATOR.get_or_init(|| Arc::new(SystemAllocator)).clone()
}

/// The process-wide default logging policy: a shared console logger,
/// created on first use with the `OXUSB_DEBUG` level if that is set and
/// [`LogLevel::None`] otherwise.
#[must_use]
pub fn default_logger() -> Arc<dyn LogPolicy> {
    static LOGGER: OnceLock<Arc<ConsoleLogger>> = OnceLock::new();
    LOGGER
        .get_or_init(|| Arc::new(ConsoleLogger::new(config::env_level().unwrap_or_default())))
        .clone()
}

/// A library context: the indirection table every dispatch goes through.
pub struct Context {
    allocator: Arc<dyn AllocPolicy>,
    logger: Arc<dyn LogPolicy>,
    /// Set when `OXUSB_DEBUG` pinned the level at initialization.
    level_fixed: bool,
}

impl Context {
    /// A context on the process default policies.
    ///
    /// This is the defined initialization point: it pins the timestamp
    /// origin and applies the environment level override.
    #[must_use]
    pub fn new() -> Self {
        init_timestamp_origin();
        Self {
            allocator: default_allocator(),
            logger: default_logger(),
            level_fixed: config::env_level().is_some(),
        }
    }

    /// A context on caller-provided policies.
    #[must_use]
    pub fn with_policies(allocator: Arc<dyn AllocPolicy>, logger: Arc<dyn LogPolicy>) -> Self {
        init_timestamp_origin();
        Self {
            allocator,
            logger,
            level_fixed: false,
        }
    }

    /// The active allocation policy.
    #[must_use]
    pub fn allocator(&self) -> &Arc<dyn AllocPolicy> {
        &self.allocator
    }

    /// The active logging policy.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn LogPolicy> {
        &self.logger
    }

    /// Install a different allocation policy.
    ///
    /// Blocks previously handed out by the old policy must still be
    /// resized/freed through the old policy; callers own that migration.
    pub fn set_allocator(&mut self, allocator: Arc<dyn AllocPolicy>) {
        self.allocator = allocator;
    }

    /// Install a different logging policy.
    pub fn set_logger(&mut self, logger: Arc<dyn LogPolicy>) {
        self.logger = logger;
    }

    /// Current log threshold of the active logger.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.logger.level()
    }

    /// Set the log threshold, unless `OXUSB_DEBUG` fixed it for the
    /// process.
    pub fn set_log_level(&self, level: LogLevel) {
        if !self.level_fixed {
            self.logger.set_level(level);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxusb_alloc::TrackingAllocator;
    use oxusb_policy::walk;

    #[test]
    fn default_context_uses_the_pass_through_allocator() {
        let ctx = Context::new();
        // Pass-through policy: introspection is unsupported.
        assert_eq!(walk(&**ctx.allocator(), (), |acc, _| acc), None);
    }

    #[test]
    fn default_policies_are_process_singletons() {
        let a = default_allocator();
        let b = default_allocator();
        assert!(Arc::ptr_eq(&a, &b));
        let x = default_logger();
        let y = default_logger();
        assert!(Arc::ptr_eq(&x, &y));
    }

    #[test]
    fn replacing_the_allocator_requires_exclusive_access() {
        let mut ctx = Context::new();
        ctx.set_allocator(Arc::new(TrackingAllocator::new()));
        // Tracking policy: introspection is supported and empty.
        assert_eq!(walk(&**ctx.allocator(), 0usize, |acc, _| acc + 1), Some(0));
    }

    #[test]
    fn set_log_level_reaches_the_active_logger() {
        let mut ctx = Context::new();
        ctx.set_logger(Arc::new(oxusb_log::ConsoleLogger::buffered(LogLevel::None)));
        assert_eq!(ctx.log_level(), LogLevel::None);
        ctx.set_log_level(LogLevel::Info);
        assert_eq!(ctx.log_level(), LogLevel::Info);
    }
}
