//! # Lockup
//!
//! Boundary protection and diagnostics for a library's public surface.
//!
//! ## Design Philosophy
//!
//! 1. **Sealed entities stay sealed**: classes, namespaces and modules accept
//!    attributes only while under construction
//! 2. **Only sanctioned errors cross the boundary**: anything else is a
//!    fugitive and is apprehended into an internal-invariant error
//! 3. **Every error is diagnosable**: messages are built from labels which
//!    name the entity involved
//! 4. **The diagnostic machinery distrusts itself**: factories and providers
//!    are validated on every use, and their misbehavior is reported rather
//!    than propagated raw
//!
//! ## Components
//!
//! - [`labels`]: human-readable labels for modules, classes, instances,
//!   invocables and argument positions
//! - [`taxonomy`] and [`definitions`]: the closed set of error kinds and the
//!   failure classes which produce them
//! - [`registry`] and [`catalog`]: the exception factory registry
//! - [`interception`]: the interception engine and its four-outcome
//!   apprehension policy
//! - [`lockdown`], [`module`] and [`reflection`]: sealed classes,
//!   namespaces, modules and the self-hosting bootstrap
//!
//! ## Quick Start
//!
//! ```rust
//! use lockup::{arguments, Completion, Descriptor, ErrorKind, Interceptor, Routine, Signature, Value};
//!
//! #[derive(Debug)]
//! struct DivisionByZero;
//!
//! impl std::fmt::Display for DivisionByZero {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("division by zero")
//!     }
//! }
//!
//! impl std::error::Error for DivisionByZero {}
//!
//! let divide = Routine::new(
//!     Descriptor::function("arithmetic", "divide")
//!         .with_signature(Signature::new().positional("a").positional("b")),
//!     |arguments| {
//!         let a = arguments.positional()[0].as_integer().unwrap_or_default();
//!         let b = arguments.positional()[1].as_integer().unwrap_or_default();
//!         if b == 0 {
//!             return Err(DivisionByZero.into());
//!         }
//!         Ok(Value::Integer(a / b))
//!     },
//! );
//!
//! let divide = Interceptor::ours().intercept(divide).unwrap();
//!
//! let quotient = divide.invoke(arguments![8, 2]).unwrap();
//! assert!(matches!(quotient, Completion::Returned(Value::Integer(4))));
//!
//! let fault = divide.invoke(arguments![4, 0]).unwrap_err();
//! let error = fault.downcast_ref::<lockup::BoundaryError>().unwrap();
//! assert_eq!(error.kind(), ErrorKind::InvalidState);
//! assert!(error.cause().unwrap().is::<DivisionByZero>());
//!
//! let fault = divide.invoke(arguments![1, 2, 3]).unwrap_err();
//! let error = fault.downcast_ref::<lockup::BoundaryError>().unwrap();
//! assert_eq!(error.kind(), ErrorKind::IncorrectData);
//! ```
//!
//! ## Sealed Namespaces
//!
//! ```rust
//! use lockup::{create_namespace, ErrorKind, MutableAttributeGuard, Value, Arguments};
//!
//! let constants = create_namespace([("answer", Value::Integer(42))]).unwrap();
//! assert_eq!(constants.attribute("answer").unwrap(), Value::Integer(42));
//!
//! let err = constants.assign_attribute("answer", Value::Integer(43)).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
//!
//! let err = constants.instantiate(Arguments::new()).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);
//! ```
//!
//! ## Features
//!
//! - `reflection` (default): self-hosting rebinding of the primitive class
//!   factory
//! - `trusted_debug`: detailed debug formatting for trusted environments
//!   (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

use smallvec::SmallVec;
use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::result;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod catalog;
pub mod convenience;
pub mod definitions;
pub mod interception;
pub mod invocable;
pub mod labels;
pub mod lockdown;
pub mod logging;
pub mod module;
pub mod reflection;
pub mod registry;
pub mod taxonomy;
pub mod validators;
pub mod visibility;

pub use catalog::*;
pub use interception::*;
pub use invocable::*;
pub use labels::*;
pub use lockdown::*;
pub use logging::*;
pub use module::*;
pub use reflection::*;
pub use registry::*;
pub use taxonomy::*;
pub use validators::*;
pub use visibility::*;

/// Type alias for Results using our error type.
pub type Result<T> = result::Result<T, BoundaryError>;

/// Name of this package, as cited in internal-state reports.
pub const PACKAGE_NAME: &str = "lockup";

// ============================================================================
// Fault (Anything Raised By Wrapped Code)
// ============================================================================

/// Owned, type-erased error raised by wrapped code.
///
/// Any `E: Error + Send + Sync + 'static` converts into a `Fault` with `?`.
/// The concrete type path is recorded at conversion time so that
/// apprehension messages can name the class of what was raised.
///
/// `Fault` deliberately does not implement [`std::error::Error`] itself;
/// use [`Fault::as_error`] where a `&dyn Error` is needed.
pub struct Fault {
    identity: u64,
    class: ClassPath,
    error: Box<dyn Error + Send + Sync + 'static>,
}

static NEXT_FAULT_IDENTITY: AtomicU64 = AtomicU64::new(1);

impl Fault {
    /// Wrap an error, recording its type path.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::from_boxed(ClassPath::of::<E>(), Box::new(error))
    }

    /// Wrap an already boxed error under an explicit class path.
    pub fn from_boxed(class: ClassPath, error: Box<dyn Error + Send + Sync + 'static>) -> Self {
        Self {
            identity: NEXT_FAULT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            class,
            error,
        }
    }

    /// Convert a panic payload caught at a boundary.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
            Cow::Borrowed(*text)
        } else if let Some(text) = payload.downcast_ref::<String>() {
            Cow::Owned(text.clone())
        } else {
            Cow::Borrowed("panic with non-textual payload")
        };
        Self::new(Panicked { message })
    }

    /// Type path of the raised error.
    #[inline]
    pub fn class(&self) -> &ClassPath {
        &self.class
    }

    /// Borrow as a standard error.
    #[inline]
    pub fn as_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Is the raised error of type `E`?
    #[inline]
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.error.is::<E>()
    }

    /// Borrow the raised error as `E`.
    #[inline]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// Recover the raised error as `E`, or give the fault back.
    pub fn downcast<E: Error + 'static>(self) -> result::Result<E, Self> {
        let Self { identity, class, error } = self;
        match error.downcast::<E>() {
            Ok(error) => Ok(*error),
            Err(error) => Err(Self { identity, class, error }),
        }
    }

    /// Identity assigned when the fault was raised.
    ///
    /// Every construction draws a fresh identity, zero-sized errors included,
    /// so two observations with equal identities refer to the same fault.
    #[inline]
    pub fn identity(&self) -> u64 {
        self.identity
    }

    /// Unwrap into the boxed error.
    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.error
    }
}

impl<E> From<E> for Fault
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("identity", &self.identity)
            .field("class", &format_args!("{}", self.class))
            .field("error", &self.error)
            .finish()
    }
}

/// Panic caught at a boundary and carried as a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked {
    message: Cow<'static, str>,
}

impl Panicked {
    /// Panic message, if it was textual.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}

impl Error for Panicked {}

// ============================================================================
// Boundary Error
// ============================================================================

/// Error of a kind from the closed taxonomy.
///
/// # Key Properties
///
/// - Exactly one [`ErrorKind`]; match by kind or by [`Capability`]
/// - Message composed by a factory from labels, so it names the entity
///   involved
/// - Optional cause, recorded when the error replaces another one
/// - Exception labels (such as `failure class`) for structured diagnosis
/// - Owned message and label text is zeroized on drop
///
/// Errors are normally produced through a [`Registry`] rather than built by
/// hand, so that the message format stays uniform.
#[must_use = "errors should be raised or reported"]
pub struct BoundaryError {
    kind: ErrorKind,
    message: ContextField,
    positional: SmallVec<[Value; 2]>,
    named: SmallVec<[(Cow<'static, str>, Value); 2]>,
    labels: SmallVec<[(Cow<'static, str>, ContextField); 2]>,
    cause: Option<Fault>,
}

impl BoundaryError {
    /// Create an error with a message and no context.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: ContextField::new(message),
            positional: SmallVec::new(),
            named: SmallVec::new(),
            labels: SmallVec::new(),
            cause: None,
        }
    }

    /// Record the error this one replaces. An earlier cause is discarded.
    #[inline]
    pub fn with_cause(mut self, cause: impl Into<Fault>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Drop any recorded cause.
    #[inline]
    pub fn without_cause(mut self) -> Self {
        self.cause = None;
        self
    }

    /// Attach a supplementary positional argument.
    #[inline]
    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Attach a supplementary named argument, replacing one of the same name.
    pub fn with_named(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.named.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.named.push((key, value)),
        }
        self
    }

    /// Attach an exception label, replacing one of the same key.
    pub fn with_label(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        let key = key.into();
        let value = ContextField::new(value);
        match self.labels.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.labels.push((key, value)),
        }
        self
    }

    /// Kind of this error.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Does the kind carry the capability?
    #[inline]
    pub const fn has(&self, capability: Capability) -> bool {
        self.kind.has(capability)
    }

    /// Does the kind match the conventional category?
    #[inline]
    pub const fn matches(&self, category: InteropCategory) -> bool {
        self.kind.matches(category)
    }

    /// Diagnostic message.
    #[inline]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary positional arguments.
    #[inline]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Supplementary named arguments.
    #[inline]
    pub fn named(&self) -> &[(Cow<'static, str>, Value)] {
        &self.named
    }

    /// Look up a supplementary named argument.
    pub fn named_value(&self, key: &str) -> Option<&Value> {
        self.named.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Exception labels.
    #[inline]
    pub fn labels(&self) -> &[(Cow<'static, str>, ContextField)] {
        &self.labels
    }

    /// Look up an exception label.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Recorded cause, if any.
    #[inline]
    pub fn cause(&self) -> Option<&Fault> {
        self.cause.as_ref()
    }

    /// Take the recorded cause out of this error.
    #[inline]
    pub fn take_cause(&mut self) -> Option<Fault> {
        self.cause.take()
    }

    /// Walk the chain of causes, nearest first.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        let first = self
            .cause
            .as_ref()
            .map(|fault| fault.as_error() as &(dyn Error + 'static));
        std::iter::successors(first, |&error| error.source())
    }

    /// Structured diagnostic record borrowing from this error.
    ///
    /// The record cannot outlive the error, so context handed to a logger is
    /// consumed immediately and scrubbed when the error drops.
    #[inline]
    pub fn diagnostic_log(&self) -> DiagnosticLog<'_> {
        DiagnosticLog::new(self)
    }
}

impl fmt::Debug for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryError")
            .field("kind", &self.kind)
            .field("message", &self.message.as_str())
            .field("labels", &self.labels.len())
            .field("cause", &self.cause.as_ref().map(|c| c.class().to_string()))
            .finish()
    }
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for BoundaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|fault| fault.as_error() as &(dyn Error + 'static))
    }
}
