//! Console logging policy.
//!
//! Entries follow the begin/extend/end protocol. An admitted `begin`
//! acquires the instance's span lock and tags the calling thread as the
//! span owner; `extend`/`end` from any other thread (or after a
//! suppressed `begin`) are cheap no-ops that never touch the lock. Entry
//! text accumulates in a buffer and is written and flushed in one piece at
//! `end`: informational entries to stdout, everything else to stderr.
//!
//! Non-verbose line shape:
//!
//! ```text
//! oxusb: <level> [<function>] <message>
//! ```
//!
//! With a verbose threshold (`Debug`/`Trace`) every line is prefixed with
//! `[<sec>.<usec>] [<tid>]` columns, and the first such entry of the
//! instance's lifetime is preceded by a fixed two-line column header.

use std::fmt;
use std::fmt::Write as _;
use std::io::Write as _;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use parking_lot::Mutex;
use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as _;

use oxusb_policy::{LogLevel, LogPolicy, LogSite};

use crate::tid::current_thread_id;

const LIB_NAME: &str = "oxusb";

const COLUMN_HEADER: &str = "\
[timestamp] [threadID] facility level [function call] <message>\n\
--------------------------------------------------------------------------------\n";

/// Owner tag meaning "no span open".
const NO_OWNER: u32 = 0;

/// Text of the entry being assembled, and where it will go.
struct EntryBuf {
    text: String,
    to_stdout: bool,
}

enum Sink {
    /// stdout for `Info`, stderr for everything else.
    Console,
    /// Capture buffer, for embedders and tests that assert on output.
    Buffer(Mutex<String>),
}

/// The default logging policy.
///
/// The threshold accessors are not synchronized against an in-flight
/// entry; changing the level while another thread holds an open span is an
/// accepted race.
pub struct ConsoleLogger {
    threshold: AtomicU8,
    /// Serializes whole entries; held from an admitted `begin` to the
    /// matching `end`.
    span: RawMutex,
    /// Thread id of the span owner, [`NO_OWNER`] when idle.
    owner: AtomicU32,
    entry: Mutex<EntryBuf>,
    /// One-shot: set when the column header goes out, never reset.
    header_shown: AtomicBool,
    sink: Sink,
}

impl ConsoleLogger {
    /// A logger writing to the process console.
    #[must_use]
    pub fn new(threshold: LogLevel) -> Self {
        Self::with_sink(threshold, Sink::Console)
    }

    /// A logger capturing output in memory; see [`ConsoleLogger::take_output`].
    #[must_use]
    pub fn buffered(threshold: LogLevel) -> Self {
        Self::with_sink(threshold, Sink::Buffer(Mutex::new(String::new())))
    }

    fn with_sink(threshold: LogLevel, sink: Sink) -> Self {
        Self {
            threshold: AtomicU8::new(threshold as u8),
            span: RawMutex::INIT,
            owner: AtomicU32::new(NO_OWNER),
            entry: Mutex::new(EntryBuf {
                text: String::new(),
                to_stdout: false,
            }),
            header_shown: AtomicBool::new(false),
            sink,
        }
    }

    /// Drain captured output. Empty for a console-sink logger.
    #[must_use]
    pub fn take_output(&self) -> String {
        match &self.sink {
            Sink::Console => String::new(),
            Sink::Buffer(buf) => mem::take(&mut *buf.lock()),
        }
    }

    fn write_out(&self, text: &str, to_stdout: bool) {
        // Diagnostics must never destabilize the host: output errors are
        // swallowed.
        match &self.sink {
            Sink::Console => {
                if to_stdout {
                    let mut out = std::io::stdout().lock();
                    let _ = out.write_all(text.as_bytes());
                    let _ = out.flush();
                } else {
                    let mut out = std::io::stderr().lock();
                    let _ = out.write_all(text.as_bytes());
                    let _ = out.flush();
                }
            }
            Sink::Buffer(buf) => buf.lock().push_str(text),
        }
    }
}

impl LogPolicy for ConsoleLogger {
    fn begin(&self, level: LogLevel, site: &LogSite) {
        let threshold = self.level();
        if !threshold.admits(level) {
            // Suppressed: the lock stays untouched and the owner tag keeps
            // this thread's extend/end as no-ops.
            return;
        }
        let tid = current_thread_id();
        if self.owner.load(Ordering::Acquire) == tid {
            // Reentrant begin before the matching end: reject silently
            // rather than deadlock on the span lock or corrupt the open
            // entry.
            return;
        }

        self.span.lock();
        self.owner.store(tid, Ordering::Release);

        let mut entry = self.entry.lock();
        entry.text.clear();
        entry.to_stdout = level == LogLevel::Info;
        if threshold.is_verbose() {
            if !self.header_shown.swap(true, Ordering::Relaxed) {
                entry.text.push_str(COLUMN_HEADER);
            }
            let secs = site.stamp as u64;
            let micros = ((site.stamp - secs as f64) * 1_000_000.0) as u32;
            let _ = write!(entry.text, "[{secs:2}.{micros:06}] [{tid:08x}] ");
        }
        let _ = write!(entry.text, "{LIB_NAME}: {} [{}] ", level.name(), site.func);
    }

    fn extend(&self, args: fmt::Arguments<'_>) {
        if self.owner.load(Ordering::Acquire) != current_thread_id() {
            return;
        }
        let mut entry = self.entry.lock();
        let _ = write!(entry.text, "{args}");
    }

    fn end(&self) {
        if self.owner.load(Ordering::Acquire) != current_thread_id() {
            return;
        }
        let (text, to_stdout) = {
            let mut entry = self.entry.lock();
            entry.text.push('\n');
            (mem::take(&mut entry.text), entry.to_stdout)
        };
        self.write_out(&text, to_stdout);

        self.owner.store(NO_OWNER, Ordering::Release);
        // SAFETY: the lock was acquired by the admitted begin that made
        // this thread the owner; no other end can run for this span.
        unsafe { self.span.unlock() };
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.threshold.load(Ordering::Relaxed)).unwrap_or(LogLevel::None)
    }

    fn set_level(&self, level: LogLevel) {
        self.threshold.store(level as u8, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxusb_policy::{CallSite, emit};

    fn site(func: &'static str) -> LogSite {
        LogSite::new(CallSite {
            file: "console.rs",
            func,
            line: 1,
        })
    }

    #[test]
    fn admitted_entry_has_the_plain_line_shape() {
        let logger = ConsoleLogger::buffered(LogLevel::Warning);
        logger.begin(LogLevel::Warning, &site("submit_transfer"));
        logger.extend(format_args!("endpoint {} stalled", 0x81));
        logger.end();
        assert_eq!(
            logger.take_output(),
            "oxusb: warning [submit_transfer] endpoint 129 stalled\n"
        );
    }

    #[test]
    fn suppressed_entry_produces_nothing_and_end_is_harmless() {
        let logger = ConsoleLogger::buffered(LogLevel::Warning);
        logger.begin(LogLevel::Info, &site("open_device"));
        logger.extend(format_args!("should never appear"));
        logger.end();
        assert_eq!(logger.take_output(), "");

        // The lock was never taken: a fresh admitted span still works.
        emit(&logger, LogLevel::Error, &site("open_device"), format_args!("broken pipe"));
        assert_eq!(logger.take_output(), "oxusb: error [open_device] broken pipe\n");
    }

    #[test]
    fn multiple_extends_build_one_entry() {
        let logger = ConsoleLogger::buffered(LogLevel::Info);
        logger.begin(LogLevel::Info, &site("get_descriptor"));
        logger.extend(format_args!("read {} of ", 12));
        logger.extend(format_args!("{} bytes", 64));
        logger.end();
        assert_eq!(
            logger.take_output(),
            "oxusb: info [get_descriptor] read 12 of 64 bytes\n"
        );
    }

    #[test]
    fn embedded_newline_starts_a_new_line_within_the_entry() {
        let logger = ConsoleLogger::buffered(LogLevel::Info);
        logger.begin(LogLevel::Info, &site("dump"));
        logger.extend(format_args!("first\nsecond"));
        logger.end();
        assert_eq!(logger.take_output(), "oxusb: info [dump] first\nsecond\n");
    }

    #[test]
    fn reentrant_begin_is_rejected_silently() {
        let logger = ConsoleLogger::buffered(LogLevel::Info);
        logger.begin(LogLevel::Info, &site("outer"));
        logger.extend(format_args!("outer text"));
        // A second begin on the same thread must neither deadlock nor
        // restart the entry.
        logger.begin(LogLevel::Info, &site("inner"));
        logger.extend(format_args!(" and more"));
        logger.end();
        assert_eq!(logger.take_output(), "oxusb: info [outer] outer text and more\n");
    }

    #[test]
    fn verbose_threshold_prints_the_header_exactly_once() {
        let logger = ConsoleLogger::buffered(LogLevel::Debug);
        for i in 0..3 {
            emit(&logger, LogLevel::Debug, &site("poll"), format_args!("pass {i}"));
        }
        let output = logger.take_output();
        assert_eq!(
            output.matches("[timestamp] [threadID]").count(),
            1,
            "header must appear exactly once:\n{output}"
        );
        assert_eq!(output.matches("----").count(), 1);
        assert!(
            output.starts_with("[timestamp] [threadID] facility level [function call] <message>\n"),
            "header precedes the first verbose line:\n{output}"
        );
    }

    #[test]
    fn verbose_lines_carry_timestamp_and_thread_columns() {
        let logger = ConsoleLogger::buffered(LogLevel::Trace);
        emit(&logger, LogLevel::Debug, &site("poll"), format_args!("tick"));
        let output = logger.take_output();
        let line = output
            .lines()
            .nth(2)
            .expect("header (2 lines) then the entry");
        let tid = current_thread_id();
        assert!(line.starts_with('['), "timestamp column first: {line}");
        assert!(
            line.contains(&format!("[{tid:08x}] {LIB_NAME}: debug [poll] tick")),
            "thread id and entry text: {line}"
        );
    }

    #[test]
    fn non_verbose_threshold_prints_no_header() {
        let logger = ConsoleLogger::buffered(LogLevel::Info);
        emit(&logger, LogLevel::Info, &site("poll"), format_args!("tick"));
        let output = logger.take_output();
        assert!(!output.contains("[timestamp]"), "no header below Debug: {output}");
        assert_eq!(output, "oxusb: info [poll] tick\n");
    }

    #[test]
    fn set_level_stores_into_the_threshold_field() {
        let logger = ConsoleLogger::buffered(LogLevel::None);
        assert_eq!(logger.level(), LogLevel::None);
        logger.set_level(LogLevel::Trace);
        assert_eq!(logger.level(), LogLevel::Trace);

        emit(&logger, LogLevel::Trace, &site("probe"), format_args!("enter"));
        assert!(logger.take_output().contains("oxusb: trace [probe] enter"));

        logger.set_level(LogLevel::None);
        emit(&logger, LogLevel::Error, &site("probe"), format_args!("gone"));
        assert_eq!(logger.take_output(), "");
    }

    #[test]
    fn trace_threshold_admits_zero_content_spans() {
        let logger = ConsoleLogger::buffered(LogLevel::Trace);
        logger.begin(LogLevel::Trace, &site("claim_interface"));
        logger.end();
        let output = logger.take_output();
        assert!(
            output.ends_with("oxusb: trace [claim_interface] \n"),
            "zero-content span still forms a line: {output}"
        );
    }

    #[test]
    fn foreign_thread_extend_and_end_are_no_ops() {
        use std::sync::Arc;

        let logger = Arc::new(ConsoleLogger::buffered(LogLevel::Info));
        logger.begin(LogLevel::Info, &site("owner"));
        logger.extend(format_args!("owned text"));

        let other = Arc::clone(&logger);
        std::thread::spawn(move || {
            // Not the owner: both calls must do nothing and must not block.
            other.extend(format_args!("intruder"));
            other.end();
        })
        .join()
        .expect("foreign thread must not panic");

        logger.end();
        assert_eq!(logger.take_output(), "oxusb: info [owner] owned text\n");
    }
}
