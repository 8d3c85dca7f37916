//! # oxusb-log
//!
//! The reference logging policy for oxusb: a console logger implementing
//! the begin/extend/end entry protocol with per-instance serialization,
//! level filtering, and the one-shot verbose column header.

pub mod console;
pub mod tid;

pub use console::ConsoleLogger;
pub use tid::current_thread_id;
