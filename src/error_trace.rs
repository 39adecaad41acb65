//! The generic error-trace wrapper and its decorator factory.
//!
//! [`ErrorTrace`] is a proxy that stands in for a callable: it forwards
//! invocation to the wrapped target and, when the target fails under an
//! active transaction, normalizes and reports the failure before letting it
//! propagate unchanged. This is the explicit, code-site instrumentation
//! path; targets reached by dotted path go through the
//! [`Registry`](crate::registry::Registry) instead.
//!
//! The wrapper holds no mutable per-call state. Every invocation works with
//! locally scoped data plus the shared, read-only ignore list, so concurrent
//! calls through one wrapper are safe whenever the target itself is.

use core::future::Future;

use crate::{
    fault::FaultClass,
    ignore::IgnoreList,
    transaction::{CallContext, TransactionBinding},
};

/// A proxy around a callable that reports failures to the active
/// transaction.
///
/// The wrapper is purely observational on the failure path: the value a
/// caller receives, success or failure, is the identical value the target
/// produced. With no active transaction the wrapper constructs nothing and
/// simply forwards the call.
///
/// # Examples
///
/// ```
/// use faultline::{CallContext, ErrorRecord, ErrorTrace, Fault, Transaction};
///
/// struct Sink;
///
/// impl Transaction for Sink {
///     fn record_error(&self, record: ErrorRecord) {
///         println!("captured: {record}");
///     }
/// }
///
/// fn parse_port(input: &str) -> Result<u16, Fault> {
///     input
///         .parse()
///         .map_err(|_| Fault::new("ValueError", format!("bad port `{input}`")))
/// }
///
/// let guarded = ErrorTrace::new(parse_port);
/// let sink = Sink;
/// let cx = CallContext::with_transaction(&sink);
///
/// assert_eq!(guarded.call(cx, "8080"), Ok(8080));
/// assert!(guarded.call(cx, "eighty").is_err()); // reported, then propagated
/// ```
#[derive(Clone, Debug)]
pub struct ErrorTrace<F> {
    target: F,
    ignore: IgnoreList,
}

impl<F> ErrorTrace<F> {
    /// Wraps a target with no ignore filtering.
    #[must_use]
    pub fn new(target: F) -> Self {
        Self {
            target,
            ignore: IgnoreList::new(),
        }
    }

    /// Wraps a target with an ignore list.
    #[must_use]
    pub fn with_ignore_list(target: F, ignore: IgnoreList) -> Self {
        Self { target, ignore }
    }

    /// The ignore list attached to this wrapper.
    #[must_use]
    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// A reference to the wrapped target.
    #[must_use]
    pub fn get_ref(&self) -> &F {
        &self.target
    }

    /// Unwraps the proxy, returning the target.
    #[must_use]
    pub fn into_inner(self) -> F {
        self.target
    }

    /// Invokes the wrapped target under `cx`.
    ///
    /// On failure with an active transaction, the error is observed through
    /// a [`TransactionBinding`], which suppresses it if its kind is on the
    /// ignore list and reports it otherwise, and then returned to the caller
    /// verbatim.
    pub fn call<A, T, E>(&self, cx: CallContext<'_>, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        E: FaultClass,
    {
        let Some(binding) = TransactionBinding::acquire(cx, &self.ignore) else {
            return (self.target)(args);
        };
        let result = (self.target)(args);
        if let Err(error) = &result {
            binding.observe(error);
        }
        result
    }

    /// Invokes a future-returning target under `cx`.
    ///
    /// Suspension belongs to the target and passes through untouched; the
    /// failure path is observed once the future resolves.
    pub async fn call_async<A, Fut, T, E>(&self, cx: CallContext<'_>, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FaultClass,
    {
        let Some(binding) = TransactionBinding::acquire(cx, &self.ignore) else {
            return (self.target)(args).await;
        };
        let result = (self.target)(args).await;
        if let Err(error) = &result {
            binding.observe(error);
        }
        result
    }
}

/// A factory that stamps one ignore list onto every wrapper it creates.
///
/// This is the explicit, code-level instrumentation entry point: no dotted
/// path, no registry, no chain linkage, just a target and the decorator's
/// ignore list. Invokability of the target is enforced statically by the
/// `Fn` bound on [`ErrorTrace::call`].
///
/// # Examples
///
/// ```
/// use faultline::{ErrorTraceDecorator, Fault, FaultKind};
///
/// fn lookup(key: &str) -> Result<&'static str, Fault> {
///     match key {
///         "host" => Ok("localhost"),
///         _ => Err(Fault::new("KeyError", key)),
///     }
/// }
///
/// let decorator = ErrorTraceDecorator::with_ignore_list(
///     [FaultKind::from_static("KeyError")].into_iter().collect(),
/// );
/// let guarded = decorator.wrap(lookup);
///
/// assert!(guarded.ignore_list().contains(&FaultKind::new("KeyError")));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ErrorTraceDecorator {
    ignore: IgnoreList,
}

impl ErrorTraceDecorator {
    /// A decorator with no ignore filtering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A decorator that stamps `ignore` onto every wrapper it produces.
    #[must_use]
    pub fn with_ignore_list(ignore: IgnoreList) -> Self {
        Self { ignore }
    }

    /// The ignore list this decorator stamps onto wrappers.
    #[must_use]
    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Produces a wrapper around `target`.
    #[must_use]
    pub fn wrap<F>(&self, target: F) -> ErrorTrace<F> {
        ErrorTrace::with_ignore_list(target, self.ignore.clone())
    }
}
