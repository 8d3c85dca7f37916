//! The allocation policy contract.
//!
//! One function replaces malloc, calloc, realloc and free: which operation
//! runs is decided by the `mem` pointer and the requested total size. The
//! optional [`AllocPolicy::visit_blocks`] hook exposes the policy's live
//! registry (if it keeps one) to leak/profile tooling; a policy without a
//! registry simply leaves the default in place, and callers must treat
//! that as "introspection unsupported", not as an error.

use crate::site::AllocSite;

/// Payload alignment every policy guarantees for returned payload
/// pointers. Typed dispatch wrappers reject types with stricter alignment.
pub const PAYLOAD_ALIGN: usize = 16;

/// Shape of a requested memory region: a fixed header followed by `count`
/// contiguous elements of `size` bytes.
///
/// This mirrors the common C layout of a fixed struct followed by a
/// variable-length array. A policy is free to ignore the split and only
/// track the total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockShape {
    /// Size of the fixed header, in bytes.
    pub head: usize,
    /// Number of trailing elements.
    pub count: usize,
    /// Size of each trailing element, in bytes.
    pub size: usize,
}

impl BlockShape {
    /// The shape of a free request: zero total.
    pub const FREE: Self = Self {
        head: 0,
        count: 0,
        size: 0,
    };

    /// A header-only shape.
    #[must_use]
    pub const fn bytes(head: usize) -> Self {
        Self {
            head,
            count: 0,
            size: 0,
        }
    }

    /// An array shape with no header.
    #[must_use]
    pub const fn array(count: usize, size: usize) -> Self {
        Self {
            head: 0,
            count,
            size,
        }
    }

    /// Total requested bytes, `head + count * size`.
    ///
    /// `None` on arithmetic overflow; policies treat an overflowing
    /// request as allocation failure.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.count.checked_mul(self.size)?.checked_add(self.head)
    }
}

/// One live block as seen by an introspection visitor: the metadata the
/// policy recorded at allocation time plus the payload address.
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub label: Option<&'static str>,
    pub file: &'static str,
    pub func: &'static str,
    pub line: u32,
    pub stamp: f64,
    /// Payload address, exactly as it was returned to the caller.
    pub mem: *mut u8,
    pub shape: BlockShape,
}

/// A swappable allocation back end.
///
/// Policy instances are context-scoped and shared by every thread using
/// that context, hence `Send + Sync`. The policy itself decides how much
/// internal serialization it needs; the dispatch layer adds none.
pub trait AllocPolicy: Send + Sync {
    /// The single entry point for create/resize/destroy, dispatched on
    /// `mem` and the requested total (`shape.total()`):
    ///
    /// - `mem` null, total zero: no-op, returns null.
    /// - `mem` null, total nonzero: fresh allocation, contents
    ///   uninitialized; null on failure.
    /// - `mem` nonnull, total nonzero: resize, possibly relocating; bytes
    ///   in `[0, min(old_total, new_total))` are preserved. On failure
    ///   returns null and the original block remains valid and owned by
    ///   the caller.
    /// - `mem` nonnull, total zero: free; always returns null.
    ///
    /// A request whose total overflows `usize` fails (null) without any
    /// side effect.
    ///
    /// # Safety
    ///
    /// `mem` must be null or a payload pointer previously returned by
    /// *this* policy instance and not yet freed. Passing a foreign or
    /// stale pointer is undefined behavior; this layer performs no
    /// double-free or use-after-free detection.
    unsafe fn allocate(&self, site: &AllocSite, mem: *mut u8, shape: BlockShape) -> *mut u8;

    /// Visit every live block in registration order.
    ///
    /// The default reports introspection as unsupported by returning
    /// `None`. An implementation with a registry calls `visit` once per
    /// live block and returns `Some(())`.
    ///
    /// The visitor must not allocate or free through this policy; the
    /// registry is locked for the duration of the walk.
    fn visit_blocks(&self, visit: &mut dyn FnMut(&BlockInfo)) -> Option<()> {
        let _ = visit;
        None
    }
}

/// Fold `fold` over every live block of `policy`, threading an
/// accumulator: the seed goes into the first call, each call's return
/// value into the next, and the final value comes back out.
///
/// Returns `None` when the policy does not support introspection, and
/// `Some(seed)` unchanged when the registry is empty.
pub fn walk<A>(
    policy: &dyn AllocPolicy,
    seed: A,
    mut fold: impl FnMut(A, &BlockInfo) -> A,
) -> Option<A> {
    let mut acc = Some(seed);
    policy.visit_blocks(&mut |info| {
        let prev = acc.take().expect("walk accumulator is always present");
        acc = Some(fold(prev, info));
    })?;
    acc
}
