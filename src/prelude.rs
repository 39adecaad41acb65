//! Convenient imports for the common surface of the crate.
//!
//! ```
//! use faultline::prelude::*;
//! ```

pub use crate::{
    callable::{CallArgs, CallValue, TargetCallable},
    error_trace::{ErrorTrace, ErrorTraceDecorator},
    fault::{Fault, FaultClass, FaultKind, FaultTrace, TraceFrame},
    ignore::IgnoreList,
    params,
    record::{ErrorRecord, Params},
    registry::{Registry, TargetPath},
    transaction::{CallContext, Transaction},
};
