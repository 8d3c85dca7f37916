//! Benchmark support for the oxusb policy layer. The benches live under
//! `benches/`; this crate exists to anchor them in the workspace.
