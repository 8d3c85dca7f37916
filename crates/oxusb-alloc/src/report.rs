//! Leak/profile tooling built on the walk protocol.
//!
//! A [`LeakReport`] is a snapshot of every block still live in a policy's
//! registry, in registration order. Reports serialize as JSONL (one object
//! per block) so they can be diffed and aggregated by external tooling.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use oxusb_policy::{AllocPolicy, walk};

/// One live block in a [`LeakReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    pub file: &'static str,
    pub func: &'static str,
    pub line: u32,
    /// Seconds since library initialization when the block was allocated.
    pub stamp: f64,
    /// Payload address, for correlating with pointers seen elsewhere.
    pub addr: usize,
    pub head: usize,
    pub count: usize,
    pub size: usize,
    /// Total payload bytes, `head + count * size`.
    pub total: usize,
}

/// Snapshot of all live blocks of one allocation policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeakReport {
    pub entries: Vec<LeakEntry>,
    /// Sum of the entries' payload totals.
    pub total_bytes: usize,
}

impl LeakReport {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors from report collection and emission.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("allocation policy does not support introspection")]
    Unsupported,
}

/// Collect a snapshot of `policy`'s live blocks.
///
/// `None` when the policy does not support introspection -- callers treat
/// that as "nothing to report", never as a failure.
#[must_use]
pub fn collect(policy: &dyn AllocPolicy) -> Option<LeakReport> {
    walk(policy, LeakReport::default(), |mut report, info| {
        let total = info.shape.total().unwrap_or_default();
        report.entries.push(LeakEntry {
            label: info.label,
            file: info.file,
            func: info.func,
            line: info.line,
            stamp: info.stamp,
            addr: info.mem as usize,
            head: info.shape.head,
            count: info.shape.count,
            size: info.shape.size,
            total,
        });
        report.total_bytes = report.total_bytes.saturating_add(total);
        report
    })
}

/// Write a report as JSONL, one entry object per line.
pub fn write_jsonl(report: &LeakReport, out: &mut dyn Write) -> Result<(), ReportError> {
    for entry in &report.entries {
        serde_json::to_writer(&mut *out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Collect from `policy` and emit as JSONL in one step.
///
/// Unlike [`collect`], an introspection-less policy is an error here: the
/// caller explicitly asked for output that cannot be produced.
pub fn dump_jsonl(policy: &dyn AllocPolicy, out: &mut dyn Write) -> Result<LeakReport, ReportError> {
    let report = collect(policy).ok_or(ReportError::Unsupported)?;
    write_jsonl(&report, out)?;
    Ok(report)
}
