//! Deterministic alloc/resize/free pressure against the tracking policy,
//! checked against an independent shadow set after every step.
//!
//! Deterministic, bounded, and intentionally simple: invariant pressure,
//! not a fuzz campaign.

use std::collections::BTreeMap;
use std::ptr;
use std::sync::Arc;
use std::thread;

use oxusb_alloc::TrackingAllocator;
use oxusb_policy::{AllocPolicy, AllocSite, BlockShape, CallSite, walk};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

fn site(label: &'static str) -> AllocSite {
    AllocSite::new(
        Some(label),
        CallSite {
            file: "tracking_sequences_test.rs",
            func: "sequences",
            line: 1,
        },
    )
}

fn free_site() -> AllocSite {
    AllocSite::new(
        None,
        CallSite {
            file: "tracking_sequences_test.rs",
            func: "sequences",
            line: 1,
        },
    )
}

/// Registry contents keyed by payload address, via the walk protocol.
fn registry_snapshot(policy: &TrackingAllocator) -> BTreeMap<usize, usize> {
    walk(policy, BTreeMap::new(), |mut acc, info| {
        let total = info.shape.total().expect("live blocks have valid totals");
        let previous = acc.insert(info.mem as usize, total);
        assert!(previous.is_none(), "registry must hold one record per block");
        acc
    })
    .expect("tracking policy supports introspection")
}

#[test]
fn walk_output_matches_shadow_set_across_sequences() {
    const SEEDS: [u64; 4] = [1, 2, 3, 4];
    const STEPS: usize = 2_000;
    const SLOTS: usize = 32;

    for seed in SEEDS {
        let policy = TrackingAllocator::new();
        let mut rng = XorShift64::new(seed);

        // Shadow set: payload address -> (size, first byte written).
        let mut shadow: BTreeMap<usize, (usize, u8)> = BTreeMap::new();
        let mut ptrs = [ptr::null_mut::<u8>(); SLOTS];

        for step in 0..STEPS {
            let slot = rng.gen_range_usize(0, SLOTS - 1);
            let op = rng.next_u64() % 3;

            if ptrs[slot].is_null() {
                // Empty slot: allocate regardless of op.
                let size = rng.gen_range_usize(1, 512);
                // SAFETY: fresh allocation request.
                let p = unsafe {
                    policy.allocate(&site("seq_block"), ptr::null_mut(), BlockShape::bytes(size))
                };
                assert!(!p.is_null(), "seed {seed} step {step}: allocation failed");
                let tag = (step as u8) ^ (seed as u8);
                // SAFETY: p is valid for `size` bytes.
                unsafe { p.write(tag) };
                shadow.insert(p as usize, (size, tag));
                ptrs[slot] = p;
            } else if op == 0 {
                // Free.
                let p = ptrs[slot];
                shadow.remove(&(p as usize)).expect("shadow tracked this block");
                // SAFETY: p is live.
                let ret = unsafe { policy.allocate(&free_site(), p, BlockShape::FREE) };
                assert!(ret.is_null());
                ptrs[slot] = ptr::null_mut();
            } else {
                // Resize, shrinking and growing alike.
                let p = ptrs[slot];
                let new_size = rng.gen_range_usize(1, 4096);
                let (_, tag) = shadow.remove(&(p as usize)).expect("shadow tracked this block");
                // SAFETY: p is live.
                let moved = unsafe {
                    policy.allocate(&site("seq_block"), p, BlockShape::bytes(new_size))
                };
                assert!(!moved.is_null(), "seed {seed} step {step}: resize failed");
                // SAFETY: moved is valid for new_size >= 1 bytes; the first
                // byte must have survived the resize.
                unsafe {
                    assert_eq!(moved.read(), tag, "seed {seed} step {step}: prefix byte lost");
                }
                shadow.insert(moved as usize, (new_size, tag));
                ptrs[slot] = moved;
            }

            let snapshot = registry_snapshot(&policy);
            assert_eq!(
                snapshot.len(),
                shadow.len(),
                "seed {seed} step {step}: live count diverged"
            );
            for (addr, (size, _)) in &shadow {
                assert_eq!(
                    snapshot.get(addr),
                    Some(size),
                    "seed {seed} step {step}: block {addr:#x} missing or wrong size"
                );
            }
        }

        // Drain everything; the registry must end empty.
        for slot in 0..SLOTS {
            if !ptrs[slot].is_null() {
                // SAFETY: still live.
                unsafe { policy.allocate(&free_site(), ptrs[slot], BlockShape::FREE) };
            }
        }
        assert!(registry_snapshot(&policy).is_empty(), "seed {seed}: blocks leaked");
    }
}

#[test]
fn concurrent_threads_share_one_pool() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 200;

    let policy = Arc::new(TrackingAllocator::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let policy = Arc::clone(&policy);
            thread::spawn(move || {
                let mut rng = XorShift64::new(0x9E37_79B9 + t as u64);
                let mut live: Vec<*mut u8> = Vec::new();
                for _ in 0..PER_THREAD {
                    if live.len() < 8 || rng.next_u64() % 2 == 0 {
                        let size = rng.gen_range_usize(1, 256);
                        // SAFETY: fresh allocation request.
                        let p = unsafe {
                            policy.allocate(
                                &site("thread_block"),
                                ptr::null_mut(),
                                BlockShape::bytes(size),
                            )
                        };
                        assert!(!p.is_null());
                        live.push(p);
                    } else {
                        let idx = rng.gen_range_usize(0, live.len() - 1);
                        let p = live.swap_remove(idx);
                        // SAFETY: p is live and owned by this thread.
                        unsafe { policy.allocate(&free_site(), p, BlockShape::FREE) };
                    }
                }
                // Leave a known number of blocks live; raw pointers are not
                // Send, so hand back plain addresses.
                let keep = 3.min(live.len());
                for p in live.drain(keep..) {
                    // SAFETY: p is live.
                    unsafe { policy.allocate(&free_site(), p, BlockShape::FREE) };
                }
                live.into_iter().map(|p| p as usize).collect::<Vec<usize>>()
            })
        })
        .collect();

    let mut kept: Vec<usize> = Vec::new();
    for handle in handles {
        kept.extend(handle.join().expect("worker thread must not panic"));
    }

    let snapshot = registry_snapshot(&policy);
    assert_eq!(snapshot.len(), kept.len(), "every kept block must be registered");
    for addr in &kept {
        assert!(snapshot.contains_key(addr));
    }

    for addr in kept {
        // SAFETY: the address is a live payload pointer kept by a worker.
        unsafe { policy.allocate(&free_site(), addr as *mut u8, BlockShape::FREE) };
    }
    assert!(registry_snapshot(&policy).is_empty());
}
