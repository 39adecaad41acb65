//! Normalization of a raised error into its reportable text form.
//!
//! Normalization must never fail the caller's flow: a value whose
//! [`Display`](core::fmt::Display) implementation errors is rendered as a
//! placeholder instead of propagating a secondary failure. All functions
//! here are pure and safe to call concurrently.

use alloc::{
    format,
    string::{String, ToString},
};
use core::fmt::{self, Write as _};

use crate::fault::{FaultKind, FaultTrace};

/// Placeholder used when a value cannot be formatted.
pub const UNPRINTABLE: &str = "<unprintable value>";

/// Captures a value's [`Display`](fmt::Display) output, falling back to
/// [`UNPRINTABLE`] if the implementation reports a formatting error.
///
/// # Examples
///
/// ```
/// use core::fmt;
///
/// use faultline::normalize;
///
/// struct Broken;
///
/// impl fmt::Display for Broken {
///     fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
///         Err(fmt::Error)
///     }
/// }
///
/// assert_eq!(normalize::message_of(&"fine"), "fine");
/// assert_eq!(normalize::message_of(&Broken), normalize::UNPRINTABLE);
/// ```
#[must_use]
pub fn message_of(value: &dyn fmt::Display) -> String {
    let mut out = String::new();
    match write!(out, "{value}") {
        Ok(()) => out,
        Err(fmt::Error) => UNPRINTABLE.to_string(),
    }
}

/// Produces the single formatted text representation of a failure: the kind
/// and message on the first line, followed by the rendered trace when one is
/// present and non-empty.
#[must_use]
pub fn format_fault(kind: &FaultKind, message: &str, trace: Option<&FaultTrace>) -> String {
    let head = if message.is_empty() {
        kind.to_string()
    } else {
        format!("{kind}: {message}")
    };
    match trace {
        Some(trace) if !trace.is_empty() => format!("{head}\n{trace}"),
        _ => head,
    }
}

/// Resolves the current call stack into a [`FaultTrace`].
///
/// Symbol names are recorded verbatim as the backtrace resolver reports
/// them. Frames without any symbol information are recorded as `<unknown>`.
#[cfg(feature = "backtrace")]
#[cfg_attr(docsrs, doc(cfg(feature = "backtrace")))]
#[must_use]
pub fn capture_trace() -> FaultTrace {
    use crate::fault::TraceFrame;

    let backtrace = backtrace::Backtrace::new();
    let mut trace = FaultTrace::new();
    for frame in backtrace.frames() {
        let symbols = frame.symbols();
        if symbols.is_empty() {
            trace.push_frame(TraceFrame::new("<unknown>"));
            continue;
        }
        for symbol in symbols {
            let function = symbol
                .name()
                .map(|name| name.to_string())
                .unwrap_or_else(|| String::from("<unknown>"));
            let frame = match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(line)) => {
                    TraceFrame::with_location(function, file.display().to_string(), line)
                }
                _ => TraceFrame::new(function),
            };
            trace.push_frame(frame);
        }
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::TraceFrame;

    struct Unformattable;

    impl fmt::Display for Unformattable {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn message_of_falls_back_for_failing_display() {
        assert_eq!(message_of(&Unformattable), UNPRINTABLE);
    }

    #[test]
    fn format_fault_without_trace_is_single_line() {
        let kind = FaultKind::from_static("ValueError");
        assert_eq!(format_fault(&kind, "bad input", None), "ValueError: bad input");
        assert_eq!(format_fault(&kind, "", None), "ValueError");
    }

    #[test]
    fn format_fault_appends_non_empty_trace() {
        let kind = FaultKind::from_static("ValueError");
        let trace: FaultTrace = [TraceFrame::new("handler")].into_iter().collect();

        let text = format_fault(&kind, "bad input", Some(&trace));
        assert!(text.starts_with("ValueError: bad input\n"));
        assert!(text.contains("0: handler"));

        let empty = FaultTrace::new();
        assert_eq!(format_fault(&kind, "bad input", Some(&empty)), "ValueError: bad input");
    }

    #[cfg(feature = "backtrace")]
    #[test]
    fn capture_trace_resolves_frames() {
        let trace = capture_trace();
        assert!(!trace.is_empty());
    }
}
