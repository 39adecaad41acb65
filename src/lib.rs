#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Guarded-call error tracing for in-process instrumentation agents.
//!
//! ## Overview
//!
//! This crate is the interception and error-capture core of an
//! application-performance-monitoring agent. It provides **error traces**:
//! proxies that stand in for a callable, forward invocation to it, and, when
//! the call fails under an active transaction, normalize the failure
//! into a report and hand it to the transaction's error sink, filtered by an
//! ignore list. The guarded call itself is never altered: success values and
//! failures reach the caller exactly as the target produced them.
//!
//! The surrounding agent (transaction lifecycle, telemetry transport,
//! configuration) stays outside this crate, consumed through the
//! [`Transaction`] trait.
//!
//! ## Quick Example
//!
//! ```
//! use faultline::prelude::*;
//!
//! struct RequestTransaction;
//!
//! impl Transaction for RequestTransaction {
//!     fn record_error(&self, record: ErrorRecord) {
//!         // hand off to the reporting pipeline
//!         println!("captured: {record}");
//!     }
//! }
//!
//! fn parse_port(input: &str) -> Result<u16, Fault> {
//!     input
//!         .parse()
//!         .map_err(|_| Fault::new("ValueError", format!("bad port `{input}`")))
//! }
//!
//! let guarded = ErrorTrace::new(parse_port);
//! let transaction = RequestTransaction;
//! let cx = CallContext::with_transaction(&transaction);
//!
//! assert_eq!(guarded.call(cx, "8080"), Ok(8080));
//! assert!(guarded.call(cx, "eighty").is_err());
//! ```
//!
//! ## Core Concepts
//!
//! Two instrumentation paths share the same capture machinery:
//!
//! - **Explicit wrapping**: [`ErrorTrace`] wraps a callable you hold in
//!   hand, keeping its concrete argument, return, and error types. The
//!   [`ErrorTraceDecorator`] factory stamps one ignore list onto many such
//!   wrappers.
//! - **Path-based instrumentation**: the [`Registry`] models the host's
//!   namespace as a registration table. Targets are resolved by dotted
//!   [`TargetPath`] ([`Registry::locate`]), wrapped in place
//!   ([`Registry::install`]), and invoked through the table
//!   ([`Registry::dispatch`]). Installing repeatedly builds an ordered chain
//!   of stages around one original: the last-installed stage is outermost,
//!   the original runs exactly once, and on failure every stage observes the
//!   fault from the innermost outward.
//!
//! On the failure path the error's **kind** ([`FaultKind`]) is matched
//! against the effective [`IgnoreList`]; a match suppresses the report but
//! never the propagation. Unsuppressed failures are normalized
//! ([`normalize`]) into an [`ErrorRecord`] holding the kind, message, and
//! formatted trace text, plus transaction parameters merged under a
//! namespace, and handed
//! to [`Transaction::record_error`].
//!
//! Ambient transaction context is always passed explicitly as a
//! [`CallContext`]; there is no global or thread-local lookup. A context
//! without a transaction makes every wrapper a transparent passthrough.
//!
//! ## Failure Policy
//!
//! - Setup-time failures ([`registry::LocateError`],
//!   [`registry::AttachError`]) are local and recoverable: the policy is
//!   fail open, logging a warning and leaving that one target
//!   uninstrumented ([`Registry::instrument_or_skip`]).
//! - Call-time failures belong to the caller. Reporting is purely
//!   observational, and nothing in the reporting path (including a
//!   misbehaving sink or an unformattable error value) can stop the
//!   original error from propagating.
//!
//! ## Feature Flags
//!
//! - `std` *(default)*: use `std::sync` locking for the registry; without
//!   it the crate is `no_std` + `alloc` and locks via [`spin`].
//! - `backtrace` *(implies `std`)*: enables `normalize::capture_trace` for
//!   resolving live stack traces.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod macros;

pub mod callable;
pub mod error_trace;
pub mod fault;
pub mod ignore;
pub mod normalize;
pub mod prelude;
pub mod record;
pub mod registry;
pub mod transaction;

pub use self::{
    error_trace::{ErrorTrace, ErrorTraceDecorator},
    fault::{Fault, FaultClass, FaultKind, FaultTrace, TraceFrame},
    ignore::IgnoreList,
    record::{ErrorRecord, Params},
    registry::{Registry, TargetPath},
    transaction::{CallContext, Transaction, TransactionBinding},
};
