//! Typed dispatch into the active policies.
//!
//! These wrappers are what the rest of the library actually calls (through
//! the macros in this crate, which supply the call site and label). Each
//! one stamps the request and forwards to the context's policy; none of
//! them adds serialization or error handling of its own. Allocation
//! failure is a `None`; logging never fails observably.
//!
//! All allocation wrappers require `align_of::<T>() <= PAYLOAD_ALIGN`;
//! policies guarantee no more than that.

use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

use oxusb_policy::{
    AllocSite, BlockShape, CallSite, LogLevel, LogSite, PAYLOAD_ALIGN, emit, emit_span,
};

use crate::context::Context;

/// Forward one allocation request to the context's policy.
///
/// # Safety
///
/// `mem` must be null or a live payload pointer from this context's
/// current allocation policy.
unsafe fn raw_allocate(
    ctx: &Context,
    label: Option<&'static str>,
    site: CallSite,
    mem: *mut u8,
    shape: BlockShape,
) -> *mut u8 {
    let stamped = AllocSite::new(label, site);
    // SAFETY: contract forwarded to the caller.
    unsafe { ctx.allocator().allocate(&stamped, mem, shape) }
}

/// Allocate one `T`-sized, uninitialized object.
#[must_use]
pub fn alloc_obj<T>(ctx: &Context, site: CallSite, label: &'static str) -> Option<NonNull<T>> {
    debug_assert!(align_of::<T>() <= PAYLOAD_ALIGN);
    // SAFETY: fresh allocation request.
    let raw = unsafe {
        raw_allocate(ctx, Some(label), site, ptr::null_mut(), BlockShape::bytes(size_of::<T>()))
    };
    NonNull::new(raw.cast())
}

/// Allocate `len` uninitialized bytes.
#[must_use]
pub fn alloc_bytes(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    len: usize,
) -> Option<NonNull<u8>> {
    // SAFETY: fresh allocation request.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, ptr::null_mut(), BlockShape::bytes(len)) };
    NonNull::new(raw)
}

/// Allocate an uninitialized array of `count` `T`s.
#[must_use]
pub fn alloc_array<T>(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    count: usize,
) -> Option<NonNull<T>> {
    debug_assert!(align_of::<T>() <= PAYLOAD_ALIGN);
    let shape = BlockShape::array(count, size_of::<T>());
    // SAFETY: fresh allocation request.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, ptr::null_mut(), shape) };
    NonNull::new(raw.cast())
}

/// Allocate a fixed `H` header followed by `count` `T`s, returning the
/// header address.
#[must_use]
pub fn alloc_header_array<H, T>(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    count: usize,
) -> Option<NonNull<H>> {
    debug_assert!(align_of::<H>() <= PAYLOAD_ALIGN && align_of::<T>() <= PAYLOAD_ALIGN);
    let shape = BlockShape {
        head: size_of::<H>(),
        count,
        size: size_of::<T>(),
    };
    // SAFETY: fresh allocation request.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, ptr::null_mut(), shape) };
    NonNull::new(raw.cast())
}

/// Resize a byte buffer. Resizing to zero frees it.
///
/// On failure returns `None` and `mem` remains valid and owned by the
/// caller.
///
/// # Safety
///
/// `mem` must be null or a live payload pointer from this context's
/// current allocation policy.
pub unsafe fn realloc_bytes(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    mem: *mut u8,
    len: usize,
) -> Option<NonNull<u8>> {
    // SAFETY: contract forwarded to the caller.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, mem, BlockShape::bytes(len)) };
    NonNull::new(raw)
}

/// Resize an array of `T`s. Resizing to zero count frees it.
///
/// On failure returns `None` and `mem` remains valid and owned by the
/// caller.
///
/// # Safety
///
/// `mem` must be null or a live payload pointer from this context's
/// current allocation policy.
pub unsafe fn realloc_array<T>(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    mem: *mut T,
    count: usize,
) -> Option<NonNull<T>> {
    debug_assert!(align_of::<T>() <= PAYLOAD_ALIGN);
    let shape = BlockShape::array(count, size_of::<T>());
    // SAFETY: contract forwarded to the caller.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, mem.cast(), shape) };
    NonNull::new(raw.cast())
}

/// Resize an array of `T`s, freeing the original if the resize fails.
///
/// Convenient where a failed grow means the data is abandoned anyway;
/// after `None`, `mem` is gone.
///
/// # Safety
///
/// As [`realloc_array`]; additionally, after a `None` return `mem` must
/// not be used at all.
pub unsafe fn realloc_array_or_free<T>(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    mem: *mut T,
    count: usize,
) -> Option<NonNull<T>> {
    // SAFETY: contract forwarded to the caller.
    let ret = unsafe { realloc_array(ctx, site, label, mem, count) };
    let shape = BlockShape::array(count, size_of::<T>());
    if ret.is_none() && !mem.is_null() && shape.total() != Some(0) {
        // The resize itself failed (not a free request): release the
        // original rather than hand a stale block back.
        // SAFETY: mem is still the caller's live block at this point.
        unsafe { release(ctx, site, mem) };
    }
    ret
}

/// Free a block. Forwarding a null pointer is a no-op.
///
/// # Safety
///
/// `mem` must be null or a live payload pointer from this context's
/// current allocation policy; it must not be used afterwards.
pub unsafe fn release<T>(ctx: &Context, site: CallSite, mem: *mut T) {
    // SAFETY: contract forwarded to the caller.
    unsafe { raw_allocate(ctx, None, site, mem.cast(), BlockShape::FREE) };
}

/// Duplicate a string into a policy-owned, NUL-terminated byte buffer.
///
/// The allocation is `s.len() + 1` bytes; free it with [`release`].
#[must_use]
pub fn dup_str(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    s: &str,
) -> Option<NonNull<u8>> {
    let bytes = s.as_bytes();
    let shape = BlockShape::array(bytes.len() + 1, size_of::<u8>());
    // SAFETY: fresh allocation request.
    let raw = unsafe { raw_allocate(ctx, Some(label), site, ptr::null_mut(), shape) };
    let p = NonNull::new(raw)?;
    // SAFETY: the block is len+1 bytes; source and destination are
    // distinct allocations.
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), p.as_ptr(), bytes.len());
        p.as_ptr().add(bytes.len()).write(0);
    }
    Some(p)
}

/// Format into a policy-owned, NUL-terminated byte buffer.
///
/// Returns the buffer and the formatted length (excluding the NUL). This
/// is the pre-built argument-list entry point; the `usb_asprintf!` macro
/// forwards variadic arguments into it.
#[must_use]
pub fn alloc_fmt(
    ctx: &Context,
    site: CallSite,
    label: &'static str,
    args: fmt::Arguments<'_>,
) -> Option<(NonNull<u8>, usize)> {
    let text = args.to_string();
    let p = dup_str(ctx, site, label, &text)?;
    Some((p, text.len()))
}

/// Emit one complete log entry through the context's logging policy.
pub fn log(ctx: &Context, level: LogLevel, site: CallSite, args: fmt::Arguments<'_>) {
    emit(&**ctx.logger(), level, &LogSite::new(site), args);
}

/// Emit a zero-content `Trace` span marking call entry/exit.
pub fn trace_mark(ctx: &Context, site: CallSite) {
    emit_span(&**ctx.logger(), LogLevel::Trace, &LogSite::new(site));
}
