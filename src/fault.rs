//! Error identity: kinds, traces, and the [`Fault`] value.
//!
//! A failure observed by an error trace is described by three pieces of data:
//! the **kind** (a stable identifier used by ignore lists and reports), the
//! **message** (a human-readable description), and an optional structured
//! **trace** (the call frames active when the failure occurred). The
//! [`Fault`] type bundles all three and is the error value used on the
//! type-erased dispatch path; user error types participate on the generic
//! path by implementing [`FaultClass`].

use alloc::{
    borrow::Cow,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

/// A stable identifier for an error kind.
///
/// Kinds are what ignore lists match against and what reports are keyed by.
/// They are opaque identifiers compared by exact equality; no hierarchy or
/// subtyping relation exists between kinds.
///
/// Construction from a `&'static str` does not allocate.
///
/// # Examples
///
/// ```
/// use faultline::FaultKind;
///
/// const VALUE_ERROR: FaultKind = FaultKind::from_static("ValueError");
///
/// assert_eq!(VALUE_ERROR.as_str(), "ValueError");
/// assert_eq!(VALUE_ERROR, FaultKind::new("ValueError"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaultKind(Cow<'static, str>);

impl FaultKind {
    /// Creates a kind from a static string without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a kind from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Derives a kind from a Rust type.
    ///
    /// Uses the unqualified type name: module path and generic arguments are
    /// stripped, so `app::errors::ParseError` becomes `ParseError`. Two
    /// distinct instantiations of the same generic type therefore share a
    /// kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use faultline::FaultKind;
    ///
    /// assert_eq!(FaultKind::of::<std::io::Error>().as_str(), "Error");
    /// ```
    #[must_use]
    pub fn of<E: ?Sized>() -> Self {
        let full = core::any::type_name::<E>();
        let head = full.split('<').next().unwrap_or(full);
        let short = head.rsplit("::").next().unwrap_or(head);
        Self(Cow::Borrowed(short))
    }

    /// Returns the kind as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for FaultKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for FaultKind {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// A single frame of a [`FaultTrace`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceFrame {
    function: String,
    file: Option<String>,
    line: Option<u32>,
}

impl TraceFrame {
    /// Creates a frame with only a function name.
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    /// Creates a frame with a source location.
    #[must_use]
    pub fn with_location(
        function: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            function: function.into(),
            file: Some(file.into()),
            line: Some(line),
        }
    }

    /// The function the frame executed in.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// The source file, when known.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The source line, when known.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

/// An ordered sequence of call frames captured at the point of failure.
///
/// Frames are stored outermost-last, matching the order a backtrace is
/// walked. The [`Display`](fmt::Display) implementation renders the stable
/// text form embedded in [`ErrorRecord`](crate::record::ErrorRecord)s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultTrace {
    frames: Vec<TraceFrame>,
}

impl FaultTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trace from a sequence of frames.
    #[must_use]
    pub fn from_frames(frames: Vec<TraceFrame>) -> Self {
        Self { frames }
    }

    /// Appends a frame.
    pub fn push_frame(&mut self, frame: TraceFrame) {
        self.frames.push(frame);
    }

    /// The captured frames.
    #[must_use]
    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    /// Returns `true` if no frames were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The number of captured frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl FromIterator<TraceFrame> for FaultTrace {
    fn from_iter<I: IntoIterator<Item = TraceFrame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for FaultTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack trace:")?;
        for (index, frame) in self.frames.iter().enumerate() {
            write!(f, "\n{index:>4}: {}", frame.function)?;
            if let Some(file) = &frame.file {
                write!(f, "\n      at {file}")?;
                if let Some(line) = frame.line {
                    write!(f, ":{line}")?;
                }
            }
        }
        Ok(())
    }
}

/// The concrete error value carried through type-erased guarded calls.
///
/// A `Fault` is what a [`TargetCallable`](crate::callable::TargetCallable)
/// raises. Instrumentation layers only ever read it: the fault a caller
/// receives is the identical value the target produced.
///
/// # Examples
///
/// ```
/// use faultline::{Fault, FaultKind};
///
/// let fault = Fault::new(FaultKind::from_static("TimeoutError"), "deadline exceeded");
/// assert_eq!(fault.kind().as_str(), "TimeoutError");
/// assert_eq!(fault.to_string(), "TimeoutError: deadline exceeded");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    message: String,
    trace: Option<FaultTrace>,
}

impl Fault {
    /// Creates a fault with a kind and message.
    #[must_use]
    pub fn new(kind: impl Into<FaultKind>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: None,
        }
    }

    /// Attaches a captured trace.
    #[must_use]
    pub fn with_trace(mut self, trace: FaultTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Builds a fault from any error type, deriving the kind from the type
    /// name via [`FaultKind::of`].
    #[must_use]
    pub fn from_error<E: core::error::Error>(error: &E) -> Self {
        Self {
            kind: FaultKind::of::<E>(),
            message: error.to_string(),
            trace: None,
        }
    }

    /// The fault's kind.
    #[must_use]
    pub fn kind(&self) -> &FaultKind {
        &self.kind
    }

    /// The fault's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The captured trace, if any.
    #[must_use]
    pub fn trace(&self) -> Option<&FaultTrace> {
        self.trace.as_ref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            fmt::Display::fmt(&self.kind, f)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl core::error::Error for Fault {}

/// Classification of an error type for reporting purposes.
///
/// The generic wrapper path ([`ErrorTrace`](crate::error_trace::ErrorTrace))
/// works with the caller's own error type `E` and never converts it; it only
/// needs to know the error's kind (for ignore-list matching and the report
/// key), its message (via [`Display`](fmt::Display)), and optionally a trace.
///
/// # Examples
///
/// ```
/// use core::fmt;
///
/// use faultline::{FaultClass, FaultKind};
///
/// #[derive(Debug)]
/// struct ParseFailure {
///     offset: usize,
/// }
///
/// impl fmt::Display for ParseFailure {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "unparseable input at offset {}", self.offset)
///     }
/// }
///
/// impl FaultClass for ParseFailure {
///     fn kind(&self) -> FaultKind {
///         FaultKind::from_static("ParseError")
///     }
/// }
/// ```
pub trait FaultClass: fmt::Display {
    /// The kind identifier matched against ignore lists.
    fn kind(&self) -> FaultKind;

    /// The trace carried by the error, if it captured one.
    fn fault_trace(&self) -> Option<&FaultTrace> {
        None
    }
}

impl FaultClass for Fault {
    fn kind(&self) -> FaultKind {
        self.kind.clone()
    }

    fn fault_trace(&self) -> Option<&FaultTrace> {
        self.trace.as_ref()
    }
}
