//! Call-site macros.
//!
//! The allocation macros generate a display label from the source tokens
//! (`"T"`, `"T[n]"`, `"H+T[n]"`, `"strdup(expr)"`), and every macro here
//! captures the current file, enclosing function and line, so policies see
//! where each request originated without the call sites spelling any of it
//! out.
//!
//! Macros forwarding to an `unsafe` dispatch wrapper (`usb_reallocz!`,
//! `usb_recalloc!`, `usb_recallocf!`, `usb_free!`) expand to a call to
//! that wrapper and must themselves be used inside `unsafe`.

/// Path of the enclosing function, the `__FUNCTION__` stand-in.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn __probe() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        let name = __type_name_of(__probe);
        // Trim the trailing "::__probe".
        &name[..name.len() - 9]
    }};
}

/// The current source location as a [`crate::CallSite`].
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite {
            file: ::core::file!(),
            func: $crate::__function_path!(),
            line: ::core::line!(),
        }
    };
}

/// Allocate one object by type: `usb_alloc!(ctx, Foo)`.
#[macro_export]
macro_rules! usb_alloc {
    ($ctx:expr, $ty:ty) => {
        $crate::dispatch::alloc_obj::<$ty>($ctx, $crate::call_site!(), ::core::stringify!($ty))
    };
}

/// Allocate raw memory by size: `usb_allocz!(ctx, 512)`.
#[macro_export]
macro_rules! usb_allocz {
    ($ctx:expr, $len:expr) => {
        $crate::dispatch::alloc_bytes(
            $ctx,
            $crate::call_site!(),
            ::core::concat!("u8[", ::core::stringify!($len), "]"),
            $len,
        )
    };
}

/// Allocate an array by count and type: `usb_calloc!(ctx, n, Foo)`.
#[macro_export]
macro_rules! usb_calloc {
    ($ctx:expr, $count:expr, $ty:ty) => {
        $crate::dispatch::alloc_array::<$ty>(
            $ctx,
            $crate::call_site!(),
            ::core::concat!(
                ::core::stringify!($ty),
                "[",
                ::core::stringify!($count),
                "]"
            ),
            $count,
        )
    };
}

/// Allocate a header plus trailing array: `usb_hcalloc!(ctx, Hdr, n, Foo)`.
#[macro_export]
macro_rules! usb_hcalloc {
    ($ctx:expr, $head:ty, $count:expr, $ty:ty) => {
        $crate::dispatch::alloc_header_array::<$head, $ty>(
            $ctx,
            $crate::call_site!(),
            ::core::concat!(
                ::core::stringify!($head),
                "+",
                ::core::stringify!($ty),
                "[",
                ::core::stringify!($count),
                "]"
            ),
            $count,
        )
    };
}

/// Resize raw memory by size: `usb_reallocz!(ctx, ptr, 1024)`.
#[macro_export]
macro_rules! usb_reallocz {
    ($ctx:expr, $mem:expr, $len:expr) => {
        $crate::dispatch::realloc_bytes(
            $ctx,
            $crate::call_site!(),
            ::core::concat!("u8[", ::core::stringify!($len), "]"),
            $mem,
            $len,
        )
    };
}

/// Resize an array by count and type: `usb_recalloc!(ctx, ptr, n, Foo)`.
#[macro_export]
macro_rules! usb_recalloc {
    ($ctx:expr, $mem:expr, $count:expr, $ty:ty) => {
        $crate::dispatch::realloc_array::<$ty>(
            $ctx,
            $crate::call_site!(),
            ::core::concat!(
                ::core::stringify!($ty),
                "[",
                ::core::stringify!($count),
                "]"
            ),
            $mem,
            $count,
        )
    };
}

/// Resize an array, freeing the original if the resize fails.
#[macro_export]
macro_rules! usb_recallocf {
    ($ctx:expr, $mem:expr, $count:expr, $ty:ty) => {
        $crate::dispatch::realloc_array_or_free::<$ty>(
            $ctx,
            $crate::call_site!(),
            ::core::concat!(
                ::core::stringify!($ty),
                "[",
                ::core::stringify!($count),
                "]"
            ),
            $mem,
            $count,
        )
    };
}

/// Free a block: `usb_free!(ctx, ptr)`.
#[macro_export]
macro_rules! usb_free {
    ($ctx:expr, $mem:expr) => {
        $crate::dispatch::release($ctx, $crate::call_site!(), $mem)
    };
}

/// Duplicate a string through the allocation policy.
#[macro_export]
macro_rules! usb_strdup {
    ($ctx:expr, $s:expr) => {
        $crate::dispatch::dup_str(
            $ctx,
            $crate::call_site!(),
            ::core::concat!("strdup(", ::core::stringify!($s), ")"),
            $s,
        )
    };
}

/// Allocate a formatted, NUL-terminated string; yields the buffer and its
/// length.
#[macro_export]
macro_rules! usb_asprintf {
    ($ctx:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::dispatch::alloc_fmt(
            $ctx,
            $crate::call_site!(),
            ::core::concat!("asprintf(", ::core::stringify!($fmt), ")"),
            ::core::format_args!($fmt $(, $arg)*),
        )
    };
}

/// Emit a log entry at an explicit level.
#[macro_export]
macro_rules! usb_log {
    ($ctx:expr, $level:expr, $($arg:tt)+) => {
        $crate::dispatch::log($ctx, $level, $crate::call_site!(), ::core::format_args!($($arg)+))
    };
}

/// Emit an error entry.
#[macro_export]
macro_rules! usb_err {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::usb_log!($ctx, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Emit a warning entry.
#[macro_export]
macro_rules! usb_warn {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::usb_log!($ctx, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Emit an informational entry.
#[macro_export]
macro_rules! usb_info {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::usb_log!($ctx, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Emit a debug entry.
#[macro_export]
macro_rules! usb_dbg {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::usb_log!($ctx, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Mark call entry/exit with a zero-content trace span.
#[macro_export]
macro_rules! usb_trc {
    ($ctx:expr) => {
        $crate::dispatch::trace_mark($ctx, $crate::call_site!())
    };
}
