//! The registration table: locating targets, installing wrappers, and
//! dispatching through chains.
//!
//! Rust has no runtime attribute rewriting, so "patch a namespace slot with
//! a proxy" is modeled as an explicit table: containers (a module, or a
//! `module:Class` pair) map attribute names to slots, and instrumented call
//! sites go through
//! [`Registry::dispatch`] instead of a rewritten attribute. Hosts populate
//! the table at setup time with [`Registry::register`], instrument targets
//! with [`Registry::instrument`], and consult the table on every call.
//!
//! Installing an error trace does not overwrite the slot's callable; it
//! appends a **stage** to the slot's ordered stage sequence. The stages are
//! the wrapper chain: the last-installed stage is outermost, invocation
//! delegates stage by stage down to the original (which runs exactly once),
//! and failure observation runs strictly inner-to-outer on the way back.
//! There are no next/last links to maintain, so repeated installation can
//! only ever lengthen the sequence, never corrupt it.
//!
//! Registry mutation is expected to happen during single-threaded agent
//! setup, but every access is internally serialized regardless. Dispatch
//! snapshots a slot under a read lock and releases the lock before the
//! target runs, so a guarded call is free to consult the registry itself.

mod lock;

use alloc::{
    borrow::Cow,
    boxed::Box,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{any::Any, fmt};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;
use unsize::{CoerceUnsize, Coercion};

use self::lock::TableLock;
use crate::{
    callable::{CallArgs, CallValue, TargetCallable},
    fault::Fault,
    ignore::IgnoreList,
    transaction::{CallContext, TransactionBinding},
};

type Table<K, V> = HashMap<K, V, FxBuildHasher>;

/// The dotted path of an instrumentation target: a module, an optional
/// owning class, and an attribute name.
///
/// # Examples
///
/// ```
/// use faultline::TargetPath;
///
/// let function = TargetPath::function("app.views", "render");
/// assert_eq!(function.to_string(), "app.views:render");
///
/// let method = TargetPath::method("app.views", "UserController", "show");
/// assert_eq!(method.to_string(), "app.views:UserController.show");
/// assert_eq!(method.container(), "app.views:UserController");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetPath {
    module: String,
    class: Option<String>,
    attribute: String,
}

impl TargetPath {
    /// A module-level target.
    #[must_use]
    pub fn function(module: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class: None,
            attribute: attribute.into(),
        }
    }

    /// A class-level target.
    #[must_use]
    pub fn method(
        module: impl Into<String>,
        class: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            class: Some(class.into()),
            attribute: attribute.into(),
        }
    }

    /// The module segment.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The owning class segment, if any.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// The attribute name within the container.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The container identifier the attribute lives on: the module name, or
    /// `module:Class` for class-level targets.
    #[must_use]
    pub fn container(&self) -> Cow<'_, str> {
        match &self.class {
            None => Cow::Borrowed(&self.module),
            Some(class) => Cow::Owned(format!("{}:{class}", self.module)),
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            None => write!(f, "{}:{}", self.module, self.attribute),
            Some(class) => write!(f, "{}:{class}.{}", self.module, self.attribute),
        }
    }
}

/// A resolved target: the original callable plus the container identifier
/// and attribute name needed to install a wrapper in the same slot.
#[derive(Clone)]
pub struct Located {
    callable: Arc<dyn TargetCallable>,
    container: String,
    attribute: String,
}

impl Located {
    /// The original callable the path resolves to, independent of any
    /// installed stages.
    #[must_use]
    pub fn callable(&self) -> &Arc<dyn TargetCallable> {
        &self.callable
    }

    /// Consumes the result, returning the original callable.
    #[must_use]
    pub fn into_callable(self) -> Arc<dyn TargetCallable> {
        self.callable
    }

    /// The container the attribute was found on.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The attribute name used to reach the callable.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl fmt::Debug for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Located")
            .field("container", &self.container)
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Located {
    fn eq(&self, other: &Self) -> bool {
        self.container == other.container
            && self.attribute == other.attribute
            && Arc::ptr_eq(&self.callable, &other.callable)
    }
}

/// Failure to resolve a target path. Fatal only to the setup step for that
/// one target: the policy is fail open, leaving the target uninstrumented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocateError {
    /// Some segment of the path (container or attribute) did not resolve.
    NotFound {
        /// The path that failed to resolve.
        path: TargetPath,
    },
    /// The path resolved to a registered value that is not invokable.
    NotCallable {
        /// The path that resolved to a non-callable.
        path: TargetPath,
    },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "target `{path}` does not resolve"),
            Self::NotCallable { path } => write!(f, "target `{path}` is not callable"),
        }
    }
}

impl core::error::Error for LocateError {}

/// Failure to install a wrapper into a resolved slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachError {
    /// The container was sealed against modification.
    Sealed {
        /// The sealed container.
        container: String,
        /// The attribute the install targeted.
        attribute: String,
    },
    /// The container has no such attribute.
    NoSuchAttribute {
        /// The container that was consulted.
        container: String,
        /// The missing attribute.
        attribute: String,
    },
    /// The attribute holds a non-callable value, which cannot carry stages.
    NotCallable {
        /// The container that was consulted.
        container: String,
        /// The non-callable attribute.
        attribute: String,
    },
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sealed {
                container,
                attribute,
            } => write!(
                f,
                "container `{container}` is sealed; cannot replace `{attribute}`"
            ),
            Self::NoSuchAttribute {
                container,
                attribute,
            } => write!(f, "container `{container}` has no attribute `{attribute}`"),
            Self::NotCallable {
                container,
                attribute,
            } => write!(
                f,
                "attribute `{attribute}` of `{container}` is not a callable slot"
            ),
        }
    }
}

impl core::error::Error for AttachError {}

/// Failure of the combined locate-and-install setup step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrumentError {
    /// The target path did not resolve to a callable.
    Locate(LocateError),
    /// The wrapper could not be installed into the resolved slot.
    Attach(AttachError),
}

impl fmt::Display for InstrumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locate(error) => fmt::Display::fmt(error, f),
            Self::Attach(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl core::error::Error for InstrumentError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Locate(error) => Some(error),
            Self::Attach(error) => Some(error),
        }
    }
}

impl From<LocateError> for InstrumentError {
    fn from(error: LocateError) -> Self {
        Self::Locate(error)
    }
}

impl From<AttachError> for InstrumentError {
    fn from(error: AttachError) -> Self {
        Self::Attach(error)
    }
}

/// One installed error-trace layer on a slot.
struct ErrorTraceStage {
    ignore: IgnoreList,
}

struct CallableSlot {
    original: Arc<dyn TargetCallable>,
    stages: Vec<Arc<ErrorTraceStage>>,
}

enum AttributeSlot {
    Callable(CallableSlot),
    // Kept so lookups can distinguish "absent" from "present but not
    // invokable"; the value itself is never read back.
    Value(#[allow(dead_code)] Box<dyn Any + Send + Sync>),
}

#[derive(Default)]
struct Container {
    sealed: bool,
    attributes: Table<String, AttributeSlot>,
}

/// The registration table standing in for the host's dynamic namespace.
///
/// # Examples
///
/// ```
/// use faultline::prelude::*;
///
/// fn checkout(_cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
///     let total: i64 = *args
///         .downcast()
///         .map_err(|_| Fault::new("TypeError", "expected i64"))?;
///     if total < 0 {
///         return Err(Fault::new("ValueError", "negative total"));
///     }
///     Ok(Box::new(total) as CallValue)
/// }
///
/// let registry = Registry::new();
/// registry.register("app.handlers", "checkout", checkout);
///
/// let path = TargetPath::function("app.handlers", "checkout");
/// registry.instrument(&path, IgnoreList::new()).unwrap();
///
/// let value = registry
///     .dispatch(&path)
///     .unwrap()
///     .call(CallContext::none(), Box::new(17_i64))
///     .unwrap();
/// assert_eq!(*value.downcast::<i64>().unwrap(), 17);
/// ```
pub struct Registry {
    containers: TableLock<Table<String, Container>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: TableLock::new(Table::default()),
        }
    }

    /// Registers a callable attribute on a container, creating the container
    /// if needed. Re-registering an attribute resets its slot, dropping any
    /// installed stages.
    ///
    /// This is host-namespace population and belongs to the setup phase,
    /// before any container is sealed or instrumented.
    pub fn register<C>(&self, container: &str, attribute: &str, callable: C)
    where
        C: TargetCallable + 'static,
    {
        let callable = Arc::new(callable).unsize(Coercion!(to dyn TargetCallable));
        let mut table = self.containers.write();
        table.entry_ref(container).or_default().attributes.insert(
            attribute.to_string(),
            AttributeSlot::Callable(CallableSlot {
                original: callable,
                stages: Vec::new(),
            }),
        );
    }

    /// Registers a non-callable attribute, so that lookups of data slots
    /// resolve but fail with [`LocateError::NotCallable`].
    pub fn register_value<V>(&self, container: &str, attribute: &str, value: V)
    where
        V: Any + Send + Sync,
    {
        let mut table = self.containers.write();
        table
            .entry_ref(container)
            .or_default()
            .attributes
            .insert(attribute.to_string(), AttributeSlot::Value(Box::new(value)));
    }

    /// Seals a container against wrapper installation, modeling a read-only
    /// namespace. The container is created if it does not exist yet.
    pub fn seal(&self, container: &str) {
        let mut table = self.containers.write();
        table.entry_ref(container).or_default().sealed = true;
    }

    /// Resolves a target path to its original callable plus the container
    /// and attribute needed to install into the same slot.
    ///
    /// Pure lookup; no side effects. Fails with [`LocateError::NotFound`]
    /// when any path segment does not resolve and
    /// [`LocateError::NotCallable`] when the attribute holds data.
    pub fn locate(&self, path: &TargetPath) -> Result<Located, LocateError> {
        self.with_callable_slot(path, |slot| Located {
            callable: slot.original.clone(),
            container: path.container().into_owned(),
            attribute: path.attribute().to_string(),
        })
    }

    /// Installs an error-trace stage into the slot `path` resolves to,
    /// returning a handle to the original callable.
    ///
    /// Each installation appends one stage: installing twice produces a
    /// chain of length two, with the later installation outermost. The
    /// original callable is never displaced and remains reachable through
    /// the returned handle and through [`locate`](Self::locate).
    pub fn install(
        &self,
        path: &TargetPath,
        ignore: IgnoreList,
    ) -> Result<Arc<dyn TargetCallable>, AttachError> {
        let container_id = path.container();
        let mut table = self.containers.write();
        let container =
            table
                .get_mut(container_id.as_ref())
                .ok_or_else(|| AttachError::NoSuchAttribute {
                    container: container_id.to_string(),
                    attribute: path.attribute().to_string(),
                })?;
        if container.sealed {
            return Err(AttachError::Sealed {
                container: container_id.to_string(),
                attribute: path.attribute().to_string(),
            });
        }
        let slot = container.attributes.get_mut(path.attribute()).ok_or_else(|| {
            AttachError::NoSuchAttribute {
                container: container_id.to_string(),
                attribute: path.attribute().to_string(),
            }
        })?;
        match slot {
            AttributeSlot::Callable(slot) => {
                slot.stages.push(Arc::new(ErrorTraceStage { ignore }));
                Ok(slot.original.clone())
            }
            AttributeSlot::Value(_) => Err(AttachError::NotCallable {
                container: container_id.to_string(),
                attribute: path.attribute().to_string(),
            }),
        }
    }

    /// The combined setup step: locate the target, then install an
    /// error-trace stage around it.
    pub fn instrument(
        &self,
        path: &TargetPath,
        ignore: IgnoreList,
    ) -> Result<(), InstrumentError> {
        self.locate(path)?;
        self.install(path, ignore)?;
        Ok(())
    }

    /// Fail-open variant of [`instrument`](Self::instrument): on failure,
    /// logs a warning for the operator and reports `false`, leaving the
    /// target to run uninstrumented.
    pub fn instrument_or_skip(&self, path: &TargetPath, ignore: IgnoreList) -> bool {
        match self.instrument(path, ignore) {
            Ok(()) => true,
            Err(error) => {
                log::warn!(
                    target: "faultline",
                    "skipping error-trace instrumentation of `{path}`: {error}"
                );
                false
            }
        }
    }

    /// The number of stages currently installed around `path`, or zero when
    /// the path does not resolve to a callable.
    #[must_use]
    pub fn stage_count(&self, path: &TargetPath) -> usize {
        self.with_callable_slot(path, |slot| slot.stages.len())
            .unwrap_or(0)
    }

    /// Snapshots the dispatch plan for `path`: the original callable and the
    /// stages installed at this moment.
    ///
    /// This is the thin indirection instrumented call sites go through; a
    /// site that re-dispatches on every call observes installations as they
    /// happen. The lock is released before [`Dispatch::call`] runs anything.
    pub fn dispatch(&self, path: &TargetPath) -> Result<Dispatch, LocateError> {
        self.with_callable_slot(path, |slot| Dispatch {
            original: slot.original.clone(),
            stages: slot.stages.clone(),
        })
    }

    fn with_callable_slot<R>(
        &self,
        path: &TargetPath,
        project: impl FnOnce(&CallableSlot) -> R,
    ) -> Result<R, LocateError> {
        let table = self.containers.read();
        let container = table
            .get(path.container().as_ref())
            .ok_or_else(|| LocateError::NotFound { path: path.clone() })?;
        let slot = container
            .attributes
            .get(path.attribute())
            .ok_or_else(|| LocateError::NotFound { path: path.clone() })?;
        match slot {
            AttributeSlot::Callable(slot) => Ok(project(slot)),
            AttributeSlot::Value(_) => Err(LocateError::NotCallable { path: path.clone() }),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

/// A snapshot of one slot's dispatch plan: the original callable wrapped in
/// the stages installed at snapshot time.
pub struct Dispatch {
    original: Arc<dyn TargetCallable>,
    stages: Vec<Arc<ErrorTraceStage>>,
}

impl Dispatch {
    /// The number of stages in this snapshot.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the call through the stage chain down to the original.
    ///
    /// The outermost (last-installed) stage is entered first and the
    /// original runs exactly once. On failure, each stage observes the fault
    /// on the way back out, innermost first, and the fault the caller
    /// receives is exactly the one the original raised. Without an active
    /// transaction every stage is a transparent passthrough.
    pub fn call(&self, cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
        call_chain(&self.stages, &*self.original, cx, args)
    }
}

impl TargetCallable for Dispatch {
    fn invoke(&self, cx: CallContext<'_>, args: CallArgs) -> Result<CallValue, Fault> {
        self.call(cx, args)
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

fn call_chain(
    stages: &[Arc<ErrorTraceStage>],
    original: &dyn TargetCallable,
    cx: CallContext<'_>,
    args: CallArgs,
) -> Result<CallValue, Fault> {
    let Some((outer, inner)) = stages.split_last() else {
        return original.invoke(cx, args);
    };
    let Some(binding) = TransactionBinding::acquire(cx, &outer.ignore) else {
        return call_chain(inner, original, cx, args);
    };
    let result = call_chain(inner, original, cx, args);
    if let Err(fault) = &result {
        binding.observe(fault);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_shareable() {
        static_assertions::assert_impl_all!(Registry: Send, Sync);
        static_assertions::assert_impl_all!(Dispatch: Send, Sync);
    }

    #[test]
    fn container_id_includes_class() {
        let function = TargetPath::function("app.views", "render");
        assert_eq!(function.container(), "app.views");

        let method = TargetPath::method("app.views", "UserController", "show");
        assert_eq!(method.container(), "app.views:UserController");
        assert_eq!(method.to_string(), "app.views:UserController.show");
    }

    #[test]
    fn stage_count_defaults_to_zero() {
        let registry = Registry::new();
        let path = TargetPath::function("missing", "target");
        assert_eq!(registry.stage_count(&path), 0);
    }
}
