//! Interception engine.
//!
//! [`Interceptor::intercept`] wraps an [`Invocable`] so that:
//!
//! 1. arguments are bound against its signature first; a mismatch is
//!    [`ErrorKind::IncorrectData`] and the invocable is never entered
//! 2. a normal return passes through unchanged
//! 3. an error (or panic) is handed to an [`Apprehender`], whose verdict
//!    decides what crosses the boundary
//!
//! # Apprehension Outcomes
//!
//! | Verdict | Effect |
//! |---|---|
//! | [`AtLiberty`](Apprehension::AtLiberty) | original propagates unmodified |
//! | [`InCustody`](Apprehension::InCustody) | replacement propagates, original recorded as its cause |
//! | [`Untraceable`](Apprehension::Untraceable) | replacement propagates without cause |
//! | [`Released`](Apprehension::Released) | original is returned as [`Completion::Recovered`] |
//!
//! An apprehender which fails or panics is reported as
//! [`ErrorKind::InvalidState`] chained to its failure.
//!
//! The default policy, [`ApprehendFugitives`], lets any [`BoundaryError`]
//! go at liberty and takes anything else into custody as a fugitive.

use crate::definitions::{ARGUMENT_VALIDATION, FUGITIVE_APPREHENSION, INVOCATION_VALIDATION};
use crate::{
    arguments, Arguments, BoundaryError, Descriptor, ErrorKind, Fault, Invocable, Registry,
    Subject, Value,
};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

const MODULE: &str = "lockup.interception";

// ============================================================================
// Apprehension Policy
// ============================================================================

/// Verdict of an apprehender on one raised error.
#[derive(Debug)]
pub enum Apprehension {
    /// Let the original error propagate unmodified.
    AtLiberty,
    /// Propagate a replacement with the original recorded as its cause.
    InCustody(BoundaryError),
    /// Propagate a replacement and discard the original.
    Untraceable(BoundaryError),
    /// Return the original error as data instead of propagating it.
    Released,
}

/// Policy deciding what crosses the boundary when a wrapped invocable fails.
///
/// Closures `Fn(&Registry, &Fault, &Arc<Descriptor>) -> Result<Apprehension,
/// Fault>` are apprehenders too.
pub trait Apprehender: Send + Sync {
    /// Judge an error raised by `invocable`.
    fn apprehend(
        &self,
        registry: &Registry,
        fault: &Fault,
        invocable: &Arc<Descriptor>,
    ) -> Result<Apprehension, Fault>;
}

impl<F> Apprehender for F
where
    F: Fn(&Registry, &Fault, &Arc<Descriptor>) -> Result<Apprehension, Fault> + Send + Sync,
{
    fn apprehend(
        &self,
        registry: &Registry,
        fault: &Fault,
        invocable: &Arc<Descriptor>,
    ) -> Result<Apprehension, Fault> {
        self(registry, fault, invocable)
    }
}

/// Default policy: sanctioned errors go at liberty, fugitives into custody.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprehendFugitives;

impl Apprehender for ApprehendFugitives {
    fn apprehend(
        &self,
        registry: &Registry,
        fault: &Fault,
        invocable: &Arc<Descriptor>,
    ) -> Result<Apprehension, Fault> {
        if fault.is::<BoundaryError>() {
            return Ok(Apprehension::AtLiberty);
        }
        Ok(Apprehension::InCustody(registry.raise(
            &FUGITIVE_APPREHENSION,
            arguments![fault.class().clone(), Subject::Invocable(Arc::clone(invocable))],
        )))
    }
}

/// Result of a successful passage through the boundary.
#[derive(Debug)]
pub enum Completion {
    /// The invocable returned normally.
    Returned(Value),
    /// The invocable failed and the apprehender released the error as data.
    Recovered(Fault),
}

impl Completion {
    /// Returned value, if the invocable returned normally.
    pub fn returned(self) -> Option<Value> {
        match self {
            Self::Returned(value) => Some(value),
            Self::Recovered(_) => None,
        }
    }
}

enum Verdict {
    Raise(Fault),
    Release(Fault),
}

// ============================================================================
// Interceptor
// ============================================================================

/// Factory of boundary-protecting wrappers.
///
/// Cheap to clone; clones share the registry and the apprehender.
#[derive(Clone)]
pub struct Interceptor {
    registry: Registry,
    apprehender: Arc<dyn Apprehender>,
}

/// Factories an interceptor cannot work without.
const REQUIRED_FACTORIES: [&str; 3] = [
    ARGUMENT_VALIDATION.name(),
    FUGITIVE_APPREHENSION.name(),
    INVOCATION_VALIDATION.name(),
];

impl Interceptor {
    /// Interceptor over a registry and a policy.
    ///
    /// Fails immediately if the registry cannot provide the factories the
    /// interceptor reports with.
    pub fn new(
        registry: Registry,
        apprehender: impl Apprehender + 'static,
    ) -> Result<Self, BoundaryError> {
        for name in REQUIRED_FACTORIES {
            registry.provide(name)?;
        }
        Ok(Self::assemble(registry, apprehender))
    }

    fn assemble(registry: Registry, apprehender: impl Apprehender + 'static) -> Self {
        Self {
            registry,
            apprehender: Arc::new(apprehender),
        }
    }

    /// Process-wide interceptor over [`Registry::ours`] and
    /// [`ApprehendFugitives`].
    pub fn ours() -> &'static Interceptor {
        static OURS: OnceLock<Interceptor> = OnceLock::new();
        OURS.get_or_init(|| Self::assemble(Registry::ours().clone(), ApprehendFugitives))
    }

    /// Registry used for reports.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wrap an invocable.
    ///
    /// The descriptor is validated now, not on first call.
    pub fn intercept<I>(&self, invocable: I) -> Result<Intercepted, BoundaryError>
    where
        I: Invocable + 'static,
    {
        if let Err(defect) = invocable.descriptor().validate() {
            let operation = Descriptor::operation(MODULE, "Interceptor.intercept", &["invocable"]);
            return Err(self
                .registry
                .raise(
                    &ARGUMENT_VALIDATION,
                    arguments!["invocable", Subject::Invocable(operation), "well-formed invocable"],
                )
                .with_cause(defect));
        }
        Ok(Intercepted {
            invocable: Arc::new(invocable),
            interceptor: self.clone(),
        })
    }

    /// Run one of this library's own operations behind the boundary.
    ///
    /// Errors are judged by the apprehender as if `descriptor` had raised
    /// them. Anything that still is not a [`BoundaryError`] afterwards, or
    /// that the apprehender released, is taken into custody.
    pub fn shield<T>(
        &self,
        descriptor: &Arc<Descriptor>,
        body: impl FnOnce() -> Result<T, Fault>,
    ) -> Result<T, BoundaryError> {
        let fault = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::from_panic(payload),
        };
        let fault = match self.judge(descriptor, fault) {
            Verdict::Raise(fault) | Verdict::Release(fault) => fault,
        };
        match fault.downcast::<BoundaryError>() {
            Ok(error) => Err(error),
            Err(fault) => Err(self
                .registry
                .raise(
                    &FUGITIVE_APPREHENSION,
                    arguments![fault.class().clone(), Subject::Invocable(Arc::clone(descriptor))],
                )
                .with_cause(fault)),
        }
    }

    fn judge(&self, descriptor: &Arc<Descriptor>, fault: Fault) -> Verdict {
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
            self.apprehender.apprehend(&self.registry, &fault, descriptor)
        }));
        let failure = match verdict {
            Ok(Ok(Apprehension::AtLiberty)) => {
                tracing::debug!(
                    invocable = descriptor.qualname(),
                    class = %fault.class(),
                    "error at liberty"
                );
                return Verdict::Raise(fault);
            }
            Ok(Ok(Apprehension::InCustody(replacement))) => {
                tracing::debug!(
                    invocable = descriptor.qualname(),
                    class = %fault.class(),
                    kind = %replacement.kind(),
                    "error taken into custody"
                );
                return Verdict::Raise(replacement.with_cause(fault).into());
            }
            Ok(Ok(Apprehension::Untraceable(replacement))) => {
                tracing::debug!(
                    invocable = descriptor.qualname(),
                    kind = %replacement.kind(),
                    "error replaced without trace"
                );
                return Verdict::Raise(replacement.without_cause().into());
            }
            Ok(Ok(Apprehension::Released)) => {
                tracing::debug!(
                    invocable = descriptor.qualname(),
                    class = %fault.class(),
                    "error released as data"
                );
                return Verdict::Release(fault);
            }
            Ok(Err(failure)) => failure,
            Err(payload) => Fault::from_panic(payload),
        };
        let apprehender = Descriptor::operation(MODULE, "Apprehender.apprehend", &["fault", "invocable"]);
        let error = self
            .registry
            .raise(
                &FUGITIVE_APPREHENSION,
                arguments![failure.class().clone(), Subject::Invocable(apprehender)],
            )
            .with_cause(failure);
        Verdict::Raise(error.into())
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Intercepted
// ============================================================================

/// Invocable wrapped by an [`Interceptor`].
///
/// Carries the descriptor of the wrapped invocable unchanged, so labels of
/// the wrapper and the wrapped are identical and wrappers nest.
pub struct Intercepted {
    invocable: Arc<dyn Invocable>,
    interceptor: Interceptor,
}

impl Intercepted {
    /// Invoke behind the boundary.
    ///
    /// `Err` carries whatever the verdict lets across: the original error,
    /// a replacement, or a report about a misbehaving apprehender.
    pub fn invoke(&self, arguments: Arguments) -> Result<Completion, Fault> {
        let descriptor = self.invocable.descriptor();
        if let Err(failure) = descriptor.signature().bind(&arguments) {
            let error = self
                .interceptor
                .registry
                .raise(
                    &INVOCATION_VALIDATION,
                    arguments![Subject::Invocable(Arc::clone(descriptor)), failure.to_string()],
                )
                .with_cause(failure);
            return Err(error.into());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.invocable.call(arguments)));
        let fault = match outcome {
            Ok(Ok(value)) => return Ok(Completion::Returned(value)),
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::from_panic(payload),
        };
        match self.interceptor.judge(descriptor, fault) {
            Verdict::Raise(fault) => Err(fault),
            Verdict::Release(fault) => Ok(Completion::Recovered(fault)),
        }
    }

    /// Kind of the error which would cross the boundary, for quick checks.
    pub fn invoke_kind(&self, arguments: Arguments) -> Option<ErrorKind> {
        match self.invoke(arguments) {
            Err(fault) => fault.downcast_ref::<BoundaryError>().map(BoundaryError::kind),
            Ok(_) => None,
        }
    }
}

impl Invocable for Intercepted {
    fn descriptor(&self) -> &Arc<Descriptor> {
        self.invocable.descriptor()
    }

    fn call(&self, arguments: Arguments) -> Result<Value, Fault> {
        match self.invoke(arguments)? {
            Completion::Returned(value) => Ok(value),
            Completion::Recovered(fault) => Ok(Value::Recovered(Arc::new(fault))),
        }
    }
}

impl fmt::Debug for Intercepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let descriptor = self.invocable.descriptor();
        f.debug_struct("Intercepted")
            .field("module", &descriptor.module())
            .field("qualname", &descriptor.qualname())
            .finish_non_exhaustive()
    }
}
