//! Debug/tracking allocation policy.
//!
//! Every block carries a hidden [`BlockRecord`] immediately in front of
//! the payload: the payload address handed to the caller and the record
//! are two views of one allocation, converted back and forth by a fixed
//! offset. Live records form a doubly-linked registry in registration
//! order. On a relocating resize only the two neighbors' link fields are
//! rewritten; the list is never re-scanned.
//!
//! Registry mutation is a critical section: the pool mutex is held across
//! the entire allocate/resize/free call, including the underlying memory
//! operation, and across walks.

use std::mem;
use std::ptr;

use parking_lot::Mutex;

use oxusb_policy::{AllocPolicy, AllocSite, BlockInfo, BlockShape, PAYLOAD_ALIGN};

/// Hidden per-block metadata, laid out directly in front of the payload.
#[repr(C)]
struct BlockRecord {
    /// Previous record in registration order; null at the head.
    prev: *mut BlockRecord,
    /// Next record in registration order; null at the tail.
    next: *mut BlockRecord,
    label: Option<&'static str>,
    file: &'static str,
    func: &'static str,
    line: u32,
    stamp: f64,
    head: usize,
    count: usize,
    size: usize,
}

/// Record size padded so the payload that follows keeps
/// [`PAYLOAD_ALIGN`]-byte alignment.
const RECORD_SIZE: usize =
    (mem::size_of::<BlockRecord>() + PAYLOAD_ALIGN - 1) & !(PAYLOAD_ALIGN - 1);

/// Recover the record address from the payload address the caller holds.
fn record_of(mem: *mut u8) -> *mut BlockRecord {
    // SAFETY of the arithmetic is the caller's: `mem` must be a payload
    // pointer produced by this policy, so the record sits RECORD_SIZE
    // bytes below it inside the same allocation.
    mem.wrapping_sub(RECORD_SIZE).cast()
}

/// The payload address for a record.
fn payload_of(rec: *mut BlockRecord) -> *mut u8 {
    rec.cast::<u8>().wrapping_add(RECORD_SIZE)
}

/// Head and tail of the live-block list.
struct Registry {
    first: *mut BlockRecord,
    last: *mut BlockRecord,
}

// SAFETY: the raw pointers are only dereferenced while the owning mutex is
// held; records themselves never cross threads outside that lock.
unsafe impl Send for Registry {}

impl Registry {
    const fn new() -> Self {
        Self {
            first: ptr::null_mut(),
            last: ptr::null_mut(),
        }
    }

    /// Append a record at the tail.
    ///
    /// # Safety
    ///
    /// `rec` must point to an initialized record not currently linked.
    unsafe fn link(&mut self, rec: *mut BlockRecord) {
        // SAFETY: rec is valid per the contract; prior tail (if any) is a
        // live linked record.
        unsafe {
            (*rec).next = ptr::null_mut();
            (*rec).prev = self.last;
            if let Some(last) = self.last.as_mut() {
                last.next = rec;
            }
        }
        self.last = rec;
        if self.first.is_null() {
            self.first = rec;
        }
    }

    /// Remove a record from the list.
    ///
    /// # Safety
    ///
    /// `rec` must be a record currently linked into this registry.
    unsafe fn unlink(&mut self, rec: *mut BlockRecord) {
        // SAFETY: rec and its neighbors are live linked records.
        unsafe {
            if let Some(prev) = (*rec).prev.as_mut() {
                prev.next = (*rec).next;
            } else {
                self.first = (*rec).next;
            }
            if let Some(next) = (*rec).next.as_mut() {
                next.prev = (*rec).prev;
            } else {
                self.last = (*rec).prev;
            }
            (*rec).prev = ptr::null_mut();
            (*rec).next = ptr::null_mut();
        }
    }

    /// Repair the list after `rec` moved to a new address.
    ///
    /// The record's own link fields survived the move; only the neighbors
    /// (or the list ends) still point at the old address. Touches at most
    /// two other records.
    ///
    /// # Safety
    ///
    /// `rec` must be the relocated image of a record that was linked at
    /// its previous address.
    unsafe fn relink(&mut self, rec: *mut BlockRecord) {
        // SAFETY: rec's prev/next still identify its live neighbors.
        unsafe {
            if let Some(prev) = (*rec).prev.as_mut() {
                prev.next = rec;
            } else {
                self.first = rec;
            }
            if let Some(next) = (*rec).next.as_mut() {
                next.prev = rec;
            } else {
                self.last = rec;
            }
        }
    }
}

/// The debug allocation policy: system allocation plus a walkable
/// live-block registry.
///
/// Dropping the policy while blocks are still live leaks them; the policy
/// is meant to outlive every allocation it handed out, and the leak report
/// exists precisely to surface such blocks first.
pub struct TrackingAllocator {
    registry: Mutex<Registry>,
}

impl TrackingAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
        }
    }
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocPolicy for TrackingAllocator {
    unsafe fn allocate(&self, site: &AllocSite, mem: *mut u8, shape: BlockShape) -> *mut u8 {
        let Some(payload_total) = shape.total() else {
            return ptr::null_mut();
        };

        let mut registry = self.registry.lock();

        if payload_total == 0 {
            if !mem.is_null() {
                let rec = record_of(mem);
                // SAFETY: mem is a live payload of this policy, so rec is
                // its linked record; after unlinking the whole block
                // (record + payload) goes back to the system allocator.
                unsafe {
                    registry.unlink(rec);
                    libc::free(rec.cast());
                }
            }
            ptr::null_mut()
        } else if !mem.is_null() {
            let Some(raw_total) = payload_total.checked_add(RECORD_SIZE) else {
                return ptr::null_mut();
            };
            let old = record_of(mem);
            // SAFETY: old is the live record of mem; realloc resizes the
            // whole block and leaves it untouched on failure.
            let moved = unsafe { libc::realloc(old.cast(), raw_total) };
            if moved.is_null() {
                // Original block and its linkage stay exactly as they were.
                return ptr::null_mut();
            }
            let rec = moved.cast::<BlockRecord>();
            // SAFETY: rec is the (possibly relocated) live record; its own
            // link fields survived the byte-wise move.
            unsafe {
                if rec != old {
                    registry.relink(rec);
                }
                (*rec).head = shape.head;
                (*rec).count = shape.count;
                (*rec).size = shape.size;
            }
            payload_of(rec)
        } else {
            let Some(raw_total) = payload_total.checked_add(RECORD_SIZE) else {
                return ptr::null_mut();
            };
            // SAFETY: raw_total is nonzero.
            let raw = unsafe { libc::malloc(raw_total) };
            if raw.is_null() {
                return ptr::null_mut();
            }
            let rec = raw.cast::<BlockRecord>();
            // SAFETY: rec points at RECORD_SIZE writable bytes inside the
            // fresh block.
            unsafe {
                rec.write(BlockRecord {
                    prev: ptr::null_mut(),
                    next: ptr::null_mut(),
                    label: site.label,
                    file: site.file,
                    func: site.func,
                    line: site.line,
                    stamp: site.stamp,
                    head: shape.head,
                    count: shape.count,
                    size: shape.size,
                });
                registry.link(rec);
            }
            payload_of(rec)
        }
    }

    fn visit_blocks(&self, visit: &mut dyn FnMut(&BlockInfo)) -> Option<()> {
        let registry = self.registry.lock();
        let mut cur = registry.first;
        while !cur.is_null() {
            // SAFETY: every record reachable from the registry is live and
            // initialized; the lock keeps it that way for the walk.
            let rec = unsafe { &*cur };
            visit(&BlockInfo {
                label: rec.label,
                file: rec.file,
                func: rec.func,
                line: rec.line,
                stamp: rec.stamp,
                mem: payload_of(cur),
                shape: BlockShape {
                    head: rec.head,
                    count: rec.count,
                    size: rec.size,
                },
            });
            cur = rec.next;
        }
        Some(())
    }
}
