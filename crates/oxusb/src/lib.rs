//! # oxusb
//!
//! Pluggable allocation and logging policies for a USB host-access
//! library.
//!
//! Call sites never touch the system allocator or an output stream
//! directly. They go through a per-[`Context`] indirection table, so an
//! embedding application can substitute a pool allocator, a leak-tracking
//! allocator, or its own log sink without touching a single call site:
//!
//! ```
//! use std::sync::Arc;
//! use oxusb::{Context, TrackingAllocator, usb_alloc, usb_free, usb_warn};
//!
//! let tracker = Arc::new(TrackingAllocator::new());
//! let ctx = Context::with_policies(tracker.clone(), oxusb::default_logger());
//!
//! let buf = usb_alloc!(&ctx, u64).expect("out of memory");
//! usb_warn!(&ctx, "device {} gone", 3);
//!
//! // Anything still registered shows up in the leak report.
//! let report = oxusb::report::collect(&*tracker).expect("tracking supports walks");
//! assert_eq!(report.len(), 1);
//!
//! // SAFETY: buf came from this context's policy and is live.
//! unsafe { usb_free!(&ctx, buf.as_ptr()) };
//! ```
//!
//! The policy contracts live in `oxusb-policy`, the reference back ends in
//! `oxusb-alloc` ([`SystemAllocator`], [`TrackingAllocator`]) and
//! `oxusb-log` ([`ConsoleLogger`]). This crate ties them together: the
//! [`Context`], the typed dispatch wrappers ([`dispatch`]), and the
//! call-site macros.

pub mod config;
pub mod context;
pub mod dispatch;
mod macros;

pub use context::{Context, default_allocator, default_logger};

pub use oxusb_policy::{
    AllocPolicy, AllocSite, BlockInfo, BlockShape, CallSite, LogLevel, LogPolicy, LogSite,
    PAYLOAD_ALIGN, emit, emit_span, init_timestamp_origin, timestamp, walk,
};

pub use oxusb_alloc::{SystemAllocator, TrackingAllocator};
pub use oxusb_alloc::report;
pub use oxusb_log::ConsoleLogger;
