//! Pass-through allocation policy.

use std::ptr;

use oxusb_policy::{AllocPolicy, AllocSite, BlockShape};

/// The default allocation policy: delegates directly to the system
/// allocator and keeps no metadata.
///
/// `visit_blocks` stays the trait default, so introspection over this
/// policy reports "unsupported". Thread safety is inherited from the
/// system allocator; this type adds no serialization of its own.
///
/// `libc` primitives are used rather than `std::alloc` because a
/// bookkeeping-free pass-through cannot supply the layout `std::alloc`
/// demands at free time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl AllocPolicy for SystemAllocator {
    unsafe fn allocate(&self, _site: &AllocSite, mem: *mut u8, shape: BlockShape) -> *mut u8 {
        let Some(total) = shape.total() else {
            return ptr::null_mut();
        };

        if total == 0 {
            if !mem.is_null() {
                // SAFETY: per the contract, a nonnull `mem` was returned by
                // this policy, i.e. by malloc/realloc, and is live.
                unsafe { libc::free(mem.cast()) };
            }
            ptr::null_mut()
        } else if !mem.is_null() {
            // SAFETY: `mem` is a live malloc'd block; realloc preserves it
            // untouched when it fails.
            unsafe { libc::realloc(mem.cast(), total) }.cast()
        } else {
            // SAFETY: total is nonzero.
            unsafe { libc::malloc(total) }.cast()
        }
    }
}
