//! The transaction seam: reporting sink, ambient context, and the per-call
//! binding.
//!
//! Transactions are the external unit of work (one request, one job) that
//! error reports are attributed to. Their lifecycle is managed outside this
//! crate; here they appear only as the [`Transaction`] trait consumed through
//! an explicit [`CallContext`] handle. Threading the handle through guarded
//! calls, rather than consulting a global or thread-local, keeps the core
//! free of global mutable state and testable in isolation.

use core::fmt;

use crate::{
    fault::FaultClass,
    ignore::IgnoreList,
    normalize,
    record::{ErrorRecord, Params},
};

/// Namespace label under which [`Transaction::params`] are merged into every
/// record.
pub const TRANSACTION_PARAMS: &str = "transaction";

/// The external unit of work error reports are attributed to.
///
/// Implementations live in the host's transaction subsystem. Both methods
/// are consumed on the failure path of a guarded call:
/// [`record_error`](Self::record_error) is the fire-and-forget reporting
/// sink, and [`params`](Self::params) supplies the contextual parameters
/// folded into each record.
///
/// A sink that can fail must handle the failure internally; nothing it does
/// can prevent the original error from propagating to the caller.
pub trait Transaction {
    /// Accepts one normalized error record. Fire-and-forget: the caller does
    /// not wait on, or learn about, the fate of the record.
    fn record_error(&self, record: ErrorRecord);

    /// Contextual parameters merged into every record produced while this
    /// transaction is active, under the [`TRANSACTION_PARAMS`] namespace.
    fn params(&self) -> Params {
        Params::new()
    }
}

/// The ambient-context handle threaded through every guarded call.
///
/// Carries the active transaction, if any. With no transaction present,
/// wrappers behave as fully transparent passthroughs: no binding is
/// acquired, no record is built, and the sink is never invoked.
///
/// # Examples
///
/// ```
/// use faultline::{CallContext, ErrorRecord, Transaction};
///
/// struct Sink;
///
/// impl Transaction for Sink {
///     fn record_error(&self, _record: ErrorRecord) {}
/// }
///
/// let sink = Sink;
/// assert!(!CallContext::none().is_active());
/// assert!(CallContext::with_transaction(&sink).is_active());
/// ```
#[derive(Clone, Copy, Default)]
pub struct CallContext<'a> {
    transaction: Option<&'a dyn Transaction>,
}

impl<'a> CallContext<'a> {
    /// A context with no active transaction.
    #[must_use]
    pub const fn none() -> Self {
        Self { transaction: None }
    }

    /// A context bound to an active transaction.
    #[must_use]
    pub const fn with_transaction(transaction: &'a dyn Transaction) -> Self {
        Self {
            transaction: Some(transaction),
        }
    }

    /// The active transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<&'a dyn Transaction> {
        self.transaction
    }

    /// Returns `true` if a transaction is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.transaction.is_some()
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The per-invocation association between one guarded call and the active
/// transaction.
///
/// A binding is acquired when a guarded call begins under an active
/// transaction and dropped when the call ends, on every exit path. It holds
/// the effective ignore list for the invocation and owns the observe/report
/// step; it never influences what the caller receives.
pub struct TransactionBinding<'a> {
    transaction: &'a dyn Transaction,
    ignore: &'a IgnoreList,
}

impl<'a> TransactionBinding<'a> {
    /// Binds the context's transaction for one invocation.
    ///
    /// Returns `None` when no transaction is active, which is the signal for
    /// the wrapper to run as a transparent passthrough.
    #[must_use]
    pub fn acquire(cx: CallContext<'a>, ignore: &'a IgnoreList) -> Option<Self> {
        let transaction = cx.transaction()?;
        Some(Self {
            transaction,
            ignore,
        })
    }

    /// The bound transaction.
    #[must_use]
    pub fn transaction(&self) -> &'a dyn Transaction {
        self.transaction
    }

    /// The ignore list in effect for this invocation.
    #[must_use]
    pub fn ignore_list(&self) -> &IgnoreList {
        self.ignore
    }

    /// Observes one failure: consults the ignore list, and unless the kind
    /// is suppressed, normalizes the error, merges transaction parameters,
    /// and forwards the record to the sink.
    ///
    /// Purely observational: the error value itself is untouched and still
    /// propagates to the caller regardless of what happens here.
    pub fn observe<E: FaultClass>(&self, error: &E) {
        let kind = error.kind();
        if self.ignore.contains(&kind) {
            log::trace!(
                target: "faultline",
                "suppressing error trace for ignored kind `{kind}`"
            );
            return;
        }

        let message = normalize::message_of(error);
        let stack_trace = normalize::format_fault(&kind, &message, error.fault_trace());
        log::debug!(target: "faultline", "recording error trace for `{kind}`");

        let mut record = ErrorRecord::new(kind, message, stack_trace);
        let params = self.transaction.params();
        if !params.is_empty() {
            record.merge_params(TRANSACTION_PARAMS, params);
        }
        self.transaction.record_error(record);
    }
}

impl fmt::Debug for TransactionBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBinding")
            .field("ignored_kinds", &self.ignore.len())
            .finish()
    }
}
