//! Class factories and the self-hosting bootstrap.
//!
//! Every sealed class is manufactured by a class factory, which is itself a
//! sealed class. The primitive factory, `lockup.Class`, has no factory but
//! itself; `lockup.NamespaceClass` derives from it and is manufactured by it.
//!
//! The circularity is resolved once, on first use of [`factories`]: the
//! primitive factory is rebound to itself through
//! [`reassign_class_factory`]. Without the `reflection` feature the
//! rebinding is unavailable and the primitive factory stays unbound; nothing
//! else changes.
//!
//! ```rust
//! use lockup::factories;
//!
//! let factories = factories();
//! assert!(factories.namespace().is_subclass_of(factories.class()));
//! # #[cfg(feature = "reflection")]
//! assert!(std::sync::Arc::ptr_eq(
//!     &factories.class().factory().unwrap(),
//!     factories.class(),
//! ));
//! ```

use crate::definitions::{ARGUMENT_VALIDATION, ATTRIBUTE_IMMUTABILITY, IMPLEMENTATION_ABSENCE};
use crate::lockdown::FactoryBinding;
use crate::{
    arguments, BoundaryError, Class, ClassPath, Descriptor, Registry, Subject, Value, Variety,
    PACKAGE_NAME,
};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

const MODULE: &str = "lockup.reflection";

/// Is rebinding a class to a new factory available in this build?
pub const REFLECTION_AVAILABLE: bool = cfg!(feature = "reflection");

/// The built-in class factories.
#[derive(Debug)]
pub struct Factories {
    class: Arc<Class>,
    namespace: Arc<Class>,
}

impl Factories {
    /// Primitive factory of sealed classes.
    #[inline]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Factory of namespace classes.
    #[inline]
    pub fn namespace(&self) -> &Arc<Class> {
        &self.namespace
    }
}

fn bookkeeping(qualname: &'static str, doc: &'static str) -> Vec<(Cow<'static, str>, Value)> {
    vec![
        (Cow::Borrowed("__module__"), Value::text(PACKAGE_NAME)),
        (Cow::Borrowed("__qualname__"), Value::text(qualname)),
        (Cow::Borrowed("__doc__"), Value::text(doc)),
    ]
}

/// Built-in class factories, bootstrapped on first use.
pub fn factories() -> &'static Factories {
    static FACTORIES: OnceLock<Factories> = OnceLock::new();
    FACTORIES.get_or_init(|| {
        let class = Class::assemble(
            ClassPath::new(PACKAGE_NAME, "Class"),
            Vec::new(),
            bookkeeping("Class", "Produces classes which have immutable attributes."),
            Variety::Ordinary,
            true,
        );
        match reassign_class_factory(&class, &class, false) {
            Ok(()) if class.factory_binding().is_some() => {
                tracing::trace!(factory = %class.path(), "primitive class factory self-hosted");
            }
            Ok(()) => {
                tracing::trace!(factory = %class.path(), "self-hosting unavailable");
            }
            Err(error) => {
                tracing::warn!(message = error.message(), "self-hosting failed");
            }
        }

        let namespace = Class::assemble(
            ClassPath::new(PACKAGE_NAME, "NamespaceClass"),
            vec![Arc::clone(&class)],
            bookkeeping(
                "NamespaceClass",
                "Produces namespace classes which have immutable attributes.",
            ),
            Variety::Ordinary,
            true,
        );
        namespace.bind_factory(FactoryBinding::Bound(Arc::clone(&class)));
        tracing::trace!(factory = %namespace.path(), "namespace class factory sealed");

        Factories { class, namespace }
    })
}

fn operation() -> Arc<Descriptor> {
    Descriptor::operation(
        MODULE,
        "reassign_class_factory",
        &["class_", "factory", "assert_implementation"],
    )
}

/// Bind a class to a factory, once.
///
/// Binding a class to the factory it already has is a no-op; binding it to
/// any other factory is an [`ImpermissibleAttributeOperation`] on its
/// `__class__` attribute. Without the `reflection` feature nothing is bound
/// and the call fails with [`AbsentImplementation`] only if
/// `assert_implementation` is set.
///
/// [`ImpermissibleAttributeOperation`]: crate::ErrorKind::ImpermissibleAttributeOperation
/// [`AbsentImplementation`]: crate::ErrorKind::AbsentImplementation
pub fn reassign_class_factory(
    class: &Arc<Class>,
    factory: &Arc<Class>,
    assert_implementation: bool,
) -> Result<(), BoundaryError> {
    let registry = Registry::ours();
    if !factory.is_factory() {
        return Err(registry.raise(
            &ARGUMENT_VALIDATION,
            arguments!["factory", Subject::Invocable(operation()), "class factory"],
        ));
    }
    if !REFLECTION_AVAILABLE {
        if assert_implementation {
            return Err(registry.raise(
                &IMPLEMENTATION_ABSENCE,
                arguments![
                    Subject::Invocable(operation()),
                    "builds without the 'reflection' feature"
                ],
            ));
        }
        return Ok(());
    }

    let binding = if Arc::ptr_eq(class, factory) {
        FactoryBinding::SelfHosted
    } else {
        FactoryBinding::Bound(Arc::clone(factory))
    };
    if class.bind_factory(binding) {
        return Ok(());
    }
    let current = class.factory_binding().map(|binding| match binding {
        FactoryBinding::SelfHosted => Arc::ptr_eq(class, factory),
        FactoryBinding::Bound(current) => Arc::ptr_eq(current, factory),
    });
    if current == Some(true) {
        return Ok(());
    }
    Err(registry.raise(
        &ATTRIBUTE_IMMUTABILITY,
        arguments!["__class__", Subject::Class(class.path().clone())],
    ))
}
