//! Stable per-thread identifier for log output.

/// A nonzero id for the calling thread, printed as the `[%08x]` column in
/// verbose log lines and used to tag span ownership.
///
/// On Linux this is the kernel thread id. Elsewhere it is a hash of the
/// std thread id, stable for the thread's lifetime.
#[must_use]
pub fn current_thread_id() -> u32 {
    imp::current_thread_id()
}

#[cfg(target_os = "linux")]
mod imp {
    pub fn current_thread_id() -> u32 {
        // SAFETY: gettid has no preconditions and always succeeds.
        let tid = unsafe { libc::syscall(libc::SYS_gettid) };
        tid as u32
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    pub fn current_thread_id() -> u32 {
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        let id = hasher.finish() as u32;
        // Zero is reserved for "no owner".
        if id == 0 { 1 } else { id }
    }
}
