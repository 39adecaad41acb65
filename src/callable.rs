//! The type-erased callable seam used by registry dispatch.
//!
//! Targets reached through the [`Registry`](crate::registry::Registry) are
//! heterogeneous, so their arguments and return values are erased behind
//! [`Any`]: a [`TargetCallable`] accepts a [`CallArgs`] box and produces a
//! [`CallValue`] box or a [`Fault`]. Hosts that know their target's concrete
//! types at the call site should prefer the generic
//! [`ErrorTrace`](crate::error_trace::ErrorTrace) wrapper, which erases
//! nothing.

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;

use crate::{fault::Fault, transaction::CallContext};

/// Erased arguments passed to a registry-dispatched target.
pub type CallArgs = Box<dyn Any + Send>;

/// Erased return value produced by a registry-dispatched target.
pub type CallValue = Box<dyn Any + Send>;

/// A callable that can be stored in, and dispatched through, the registry.
///
/// Implemented for free by any matching `Fn` closure:
///
/// ```
/// use faultline::prelude::*;
///
/// fn double(_cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
///     let n: i32 = *args.downcast().map_err(|_| Fault::new("TypeError", "expected i32"))?;
///     Ok(Box::new(n * 2))
/// }
///
/// let registry = Registry::new();
/// registry.register("app.math", "double", double);
/// ```
pub trait TargetCallable: Send + Sync {
    /// Invokes the target. The context is forwarded so that a target may
    /// itself perform guarded calls under the same transaction.
    fn invoke(&self, cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault>;
}

impl<F> TargetCallable for F
where
    F: Fn(CallContext<'_>, CallArgs) -> Result<CallValue, Fault> + Send + Sync,
{
    fn invoke(&self, cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
        self(cx, args)
    }
}

impl fmt::Debug for dyn TargetCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TargetCallable")
    }
}
