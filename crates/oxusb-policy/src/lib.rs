//! # oxusb-policy
//!
//! Policy contracts for the oxusb support layer: the swappable allocation
//! and logging back ends the rest of the library dispatches through.
//!
//! A *policy* is a context-scoped implementation of one of two fixed
//! contracts: [`AllocPolicy`] (a single allocate/resize/free entry point
//! plus optional live-block introspection) and [`LogPolicy`] (a
//! begin/extend/end log-entry protocol with a level threshold). Call sites
//! never reach the system allocator or an output stream directly; they go
//! through whichever policy the embedding application installed on the
//! library context.
//!
//! This crate holds only the contracts and the call-site metadata types.
//! The reference back ends live in `oxusb-alloc` and `oxusb-log`; the
//! dispatch wrappers and macros live in the `oxusb` umbrella crate.

pub mod alloc;
pub mod level;
pub mod log;
pub mod site;

pub use alloc::{AllocPolicy, BlockInfo, BlockShape, PAYLOAD_ALIGN, walk};
pub use level::LogLevel;
pub use log::{LogPolicy, emit, emit_span};
pub use site::{AllocSite, CallSite, LogSite, init_timestamp_origin, timestamp};
