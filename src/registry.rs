//! Exception factory registry.
//!
//! A [`Registry`] maps registry names (such as `attribute_immutability`) to
//! [`ExceptionFactory`] implementations through a [`FactoryProvider`], and
//! produces ready-to-raise [`BoundaryError`]s.
//!
//! # Distrust
//!
//! The registry sits on the boundary it is used to police, so it does not
//! trust its own parts. Every production:
//!
//! 1. asks the provider for the factory; a provider failure other than a
//!    sanctioned [`BoundaryError`] becomes a fugitive apprehension
//! 2. binds the arguments against the factory's own signature; a mismatch
//!    is [`ErrorKind::IncorrectData`]
//! 3. runs the factory; a failure or panic becomes a fugitive apprehension
//!    ([`ErrorKind::InvalidState`]) with the original as cause
//! 4. checks that the produced error has the kind the factory declares;
//!    anything else is [`ErrorKind::InvalidState`]
//!
//! Misbehavior is always reported through the built-in catalog, never
//! through the provider under suspicion, and a report which itself fails
//! falls back to a fixed internal-state message.
//!
//! # Example
//!
//! ```rust
//! use lockup::{arguments, ErrorKind, ExtraData, Registry, Subject};
//!
//! let registry = Registry::ours();
//! let err = registry.produce(
//!     "attribute_indelibility",
//!     arguments!["stock", Subject::module("inventory")],
//!     ExtraData::new().with_label("ticket", "INV-7"),
//! );
//! assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
//! assert_eq!(err.label("failure class"), Some("attribute indelibility"));
//! assert_eq!(err.label("ticket"), Some("INV-7"));
//! ```

use crate::definitions::{FUGITIVE_APPREHENSION, INVOCATION_VALIDATION, RETURN_VALIDATION};
use crate::{
    arguments, Arguments, Binding, BoundaryError, Catalog, Descriptor, ErrorKind, FailureClass,
    Fault, OurFactories, Subject, Value, PACKAGE_NAME,
};
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

const MODULE: &str = "lockup.registry";

/// Named entry which, when supplied as extra data, suppresses label injection.
pub const EXCEPTION_LABELS_ENTRY: &str = "exception_labels";

/// Label carrying the human name of the failure class.
pub const FAILURE_CLASS_LABEL: &str = "failure class";

// ============================================================================
// Traits
// ============================================================================

/// Factory producing errors of one kind.
pub trait ExceptionFactory: Send + Sync {
    /// Identity and signature; arguments are bound against it before
    /// [`produce`](Self::produce) is called.
    fn descriptor(&self) -> &Arc<Descriptor>;

    /// Kind every produced error must have.
    fn kind(&self) -> ErrorKind;

    /// Compose the error from bound arguments.
    fn produce(&self, registry: &Registry, binding: &Binding<'_>) -> Result<BoundaryError, Fault>;
}

/// Source of factories by registry name.
///
/// Closures `Fn(&str) -> Result<Arc<dyn ExceptionFactory>, Fault>` are
/// providers too.
pub trait FactoryProvider: Send + Sync {
    /// Factory for a registry name.
    fn provide(&self, name: &str) -> Result<Arc<dyn ExceptionFactory>, Fault>;

    /// Identity used when the provider itself misbehaves.
    fn descriptor(&self) -> Arc<Descriptor> {
        Descriptor::operation(MODULE, "provide_exception_factory", &["name"])
    }
}

impl<F> FactoryProvider for F
where
    F: Fn(&str) -> Result<Arc<dyn ExceptionFactory>, Fault> + Send + Sync,
{
    fn provide(&self, name: &str) -> Result<Arc<dyn ExceptionFactory>, Fault> {
        self(name)
    }
}

// ============================================================================
// Extra Data
// ============================================================================

/// Supplementary data applied to a produced error.
#[derive(Debug, Clone, Default)]
pub struct ExtraData {
    positional: Vec<Value>,
    named: Vec<(Cow<'static, str>, Value)>,
    labels: Vec<(Cow<'static, str>, Cow<'static, str>)>,
}

impl ExtraData {
    /// No extra data.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a positional argument after the message.
    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a named argument.
    ///
    /// A named argument called `exception_labels` suppresses label
    /// injection entirely.
    pub fn with_named(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.named.push((key.into(), value.into()));
        self
    }

    /// Add an exception label, overriding any default of the same key.
    pub fn with_label(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    fn apply(self, mut error: BoundaryError, failure_class: String) -> BoundaryError {
        for value in self.positional {
            error = error.with_positional(value);
        }
        let suppress = self.named.iter().any(|(key, _)| key == EXCEPTION_LABELS_ENTRY);
        for (key, value) in self.named {
            error = error.with_named(key, value);
        }
        if suppress {
            return error;
        }
        error = error.with_label(FAILURE_CLASS_LABEL, failure_class);
        for (key, value) in self.labels {
            error = error.with_label(key, value);
        }
        error
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Exception factory registry.
///
/// Cheap to clone; clones share the provider.
#[derive(Clone)]
pub struct Registry {
    provider: Arc<dyn FactoryProvider>,
}

impl Registry {
    /// Registry over a provider.
    pub fn new(provider: impl FactoryProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Process-wide registry over the built-in catalog.
    pub fn ours() -> &'static Registry {
        static OURS: OnceLock<Registry> = OnceLock::new();
        OURS.get_or_init(|| Registry::new(OurFactories))
    }

    /// Obtain a validated handle on a factory.
    pub fn provide(&self, name: &str) -> Result<ProvidedFactory<'_>, BoundaryError> {
        let provided = panic::catch_unwind(AssertUnwindSafe(|| self.provider.provide(name)));
        let fault = match provided {
            Ok(Ok(factory)) => {
                if let Err(defect) = factory.descriptor().validate() {
                    return Err(report(
                        &RETURN_VALIDATION,
                        arguments![
                            Subject::Invocable(self.provider.descriptor()),
                            "exception factory with well-formed descriptor"
                        ],
                    )
                    .with_cause(defect));
                }
                return Ok(ProvidedFactory {
                    registry: self,
                    name: name.to_owned(),
                    factory,
                });
            }
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::from_panic(payload),
        };
        match fault.downcast::<BoundaryError>() {
            Ok(sanctioned) => Err(sanctioned),
            Err(fault) => Err(apprehend(fault, self.provider.descriptor())),
        }
    }

    /// Produce an error from the named factory.
    ///
    /// Always yields an error: when production fails, the error describes
    /// that failure instead.
    pub fn produce(&self, name: &str, arguments: Arguments, extra: ExtraData) -> BoundaryError {
        match self.provide(name) {
            Ok(factory) => factory.produce(&arguments, extra),
            Err(error) => error,
        }
    }

    /// Produce an error for a declared failure class.
    #[inline]
    pub fn raise(&self, class: &FailureClass, arguments: Arguments) -> BoundaryError {
        self.produce(class.name(), arguments, ExtraData::new())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provider = self.provider.descriptor();
        f.debug_struct("Registry")
            .field("provider", &provider.qualname())
            .finish()
    }
}

/// Validated handle on one factory.
pub struct ProvidedFactory<'r> {
    registry: &'r Registry,
    name: String,
    factory: Arc<dyn ExceptionFactory>,
}

impl ProvidedFactory<'_> {
    /// Identity and signature of the factory.
    #[inline]
    pub fn descriptor(&self) -> &Arc<Descriptor> {
        self.factory.descriptor()
    }

    /// Kind the factory declares.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.factory.kind()
    }

    /// Produce an error, checking the factory at every step.
    pub fn produce(&self, arguments: &Arguments, extra: ExtraData) -> BoundaryError {
        let descriptor = self.factory.descriptor();
        let binding = match descriptor.signature().bind(arguments) {
            Ok(binding) => binding,
            Err(failure) => {
                return report(
                    &INVOCATION_VALIDATION,
                    arguments![Subject::Invocable(Arc::clone(descriptor)), failure.to_string()],
                )
                .with_cause(failure);
            }
        };

        let produced = panic::catch_unwind(AssertUnwindSafe(|| {
            self.factory.produce(self.registry, &binding)
        }));
        let error = match produced {
            Ok(Ok(error)) => error,
            Ok(Err(fault)) => return apprehend(fault, Arc::clone(descriptor)),
            Err(payload) => return apprehend(Fault::from_panic(payload), Arc::clone(descriptor)),
        };

        let kind = self.factory.kind();
        if error.kind() != kind {
            return report(
                &RETURN_VALIDATION,
                arguments![
                    Subject::Invocable(Arc::clone(descriptor)),
                    format!("error of kind '{kind}'")
                ],
            )
            .with_cause(error);
        }

        announce(extra.apply(error, self.name.replace('_', " ")))
    }
}

impl fmt::Debug for ProvidedFactory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedFactory")
            .field("name", &self.name)
            .field("kind", &self.factory.kind())
            .finish()
    }
}

// ============================================================================
// Trusted Reporting
// ============================================================================

fn apprehend(fault: Fault, invocation: Arc<Descriptor>) -> BoundaryError {
    let fugitive = fault.class().clone();
    report(
        &FUGITIVE_APPREHENSION,
        arguments![fugitive, Subject::Invocable(invocation)],
    )
    .with_cause(fault)
}

fn announce(error: BoundaryError) -> BoundaryError {
    if error.kind() == ErrorKind::InvalidState {
        tracing::warn!(
            failure_class = error.label(FAILURE_CLASS_LABEL).unwrap_or_default(),
            message = error.message(),
            "internal invariant violated"
        );
    }
    error
}

/// Report misbehavior through the built-in catalog.
///
/// Bypasses every provider, so a broken provider cannot obstruct its own
/// report. If the built-in factory fails, a fixed message is used.
pub(crate) fn report(class: &'static FailureClass, arguments: Arguments) -> BoundaryError {
    let composed = match Catalog::shared().get(class.name()) {
        Some(factory) => match factory.descriptor().signature().bind(&arguments) {
            Ok(binding) => factory
                .produce(Registry::ours(), &binding)
                .map_err(|fault| fault.to_string()),
            Err(failure) => Err(failure.to_string()),
        },
        None => Err(format!("no built-in factory named '{}'", class.name())),
    };
    let error = match composed {
        Ok(error) => error.with_label(FAILURE_CLASS_LABEL, class.label()),
        Err(detail) => BoundaryError::new(
            ErrorKind::InvalidState,
            format!(
                "Invalid internal state! Report of {} failed: {detail} \
                 Please report to the '{PACKAGE_NAME}' package maintainers.",
                class.label()
            ),
        )
        .with_label(FAILURE_CLASS_LABEL, "invalid state"),
    };
    announce(error)
}
