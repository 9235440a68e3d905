//! Sealed classes and namespaces.
//!
//! Entities move through two states: *under construction* ([`ClassDraft`],
//! [`OpenModule`](crate::OpenModule)) and *sealed* ([`Class`],
//! [`LockedModule`](crate::LockedModule)). There is no way back.
//!
//! Sealed entities implement [`MutableAttributeGuard`]. Reads succeed for
//! existing attributes; assignment and deletion always fail:
//!
//! - assignment: [`ErrorKind::ImpermissibleAttributeOperation`] for any
//!   legal name
//! - deletion: [`ErrorKind::InaccessibleAttribute`] if the attribute does
//!   not exist, otherwise [`ErrorKind::ImpermissibleAttributeOperation`]
//!
//! Namespaces are classes which only hold public data and can never be
//! instantiated.
//!
//! ```rust
//! use lockup::{ClassDraft, ErrorKind, MutableAttributeGuard, Seal, Value};
//!
//! let circle = ClassDraft::new("shapes", "Circle")
//!     .define("sides", 0)
//!     .seal()
//!     .unwrap();
//! assert_eq!(circle.attribute("sides").unwrap(), Value::Integer(0));
//!
//! let err = circle.assign_attribute("sides", Value::Integer(1)).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Attempt to assign immutable attribute 'sides' on class 'shapes.Circle'."
//! );
//!
//! let err = circle.delete_attribute("radius").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
//! ```

use crate::definitions::{
    ATTRIBUTE_IMMUTABILITY, ATTRIBUTE_INDELIBILITY, ATTRIBUTE_NONEXISTENCE,
    CLASS_ATTRIBUTE_REJECTION, IMPERMISSIBLE_INSTANTIATION, INVOCATION_VALIDATION,
};
use crate::{
    arguments, factories, is_public_name, select_public_attributes, validate_attribute_existence,
    validate_attribute_name, Arguments, BoundaryError, ClassPath, Descriptor, Interceptor,
    Registry, Signature, Subject, Value, PACKAGE_NAME,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Bookkeeping names a namespace may hold besides public names.
pub const NAMESPACE_BOOKKEEPING: [&str; 3] = ["__doc__", "__module__", "__qualname__"];

type Entries = Vec<(Cow<'static, str>, Value)>;

fn find<'e>(entries: &'e [(Cow<'static, str>, Value)], name: &str) -> Option<&'e Value> {
    entries
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn upsert(entries: &mut Entries, name: Cow<'static, str>, value: Value) {
    match entries.iter_mut().find(|(key, _)| *key == name) {
        Some((_, slot)) => *slot = value,
        None => entries.push((name, value)),
    }
}

// ============================================================================
// Guard Trait
// ============================================================================

/// Attribute protocol of sealed entities.
///
/// Implementors supply storage access; the provided methods enforce
/// immutability. Assignment and deletion run behind
/// [`Interceptor::shield`], so nothing but a [`BoundaryError`] escapes
/// them.
pub trait MutableAttributeGuard: Send + Sync {
    /// Subject used to label this entity in messages.
    fn subject(&self) -> Subject;

    /// Stored attribute, if any.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Names of every stored attribute, visible or not.
    fn stored_names(&self) -> Vec<String>;

    /// Class whose operations guard this entity.
    fn factory_path(&self) -> ClassPath;

    /// Non-public names to list in the directory anyway.
    fn visibility_includes(&self) -> &[&str] {
        &[]
    }

    /// Names to hide from the directory even if public.
    fn visibility_excludes(&self) -> &[&str] {
        &[]
    }

    /// Read an attribute.
    fn attribute(&self, name: &str) -> Result<Value, BoundaryError> {
        self.lookup(name).ok_or_else(|| {
            Interceptor::ours().registry().raise(
                &ATTRIBUTE_NONEXISTENCE,
                arguments![name.to_owned(), self.subject()],
            )
        })
    }

    /// Attempt to assign an attribute. Never succeeds.
    fn assign_attribute(&self, name: &str, _value: Value) -> Result<(), BoundaryError> {
        let operation = Arc::new(
            Descriptor::method(self.factory_path(), "__setattr__")
                .with_signature(Signature::new().positional("name").positional("value")),
        );
        let interceptor = Interceptor::ours();
        interceptor.shield(&operation, || {
            let registry = interceptor.registry();
            validate_attribute_name(registry, name)?;
            Err(registry
                .raise(&ATTRIBUTE_IMMUTABILITY, arguments![name.to_owned(), self.subject()])
                .into())
        })
    }

    /// Attempt to delete an attribute. Never succeeds.
    fn delete_attribute(&self, name: &str) -> Result<(), BoundaryError> {
        let operation = Arc::new(
            Descriptor::method(self.factory_path(), "__delattr__")
                .with_signature(Signature::new().positional("name")),
        );
        let interceptor = Interceptor::ours();
        interceptor.shield(&operation, || {
            let registry = interceptor.registry();
            validate_attribute_name(registry, name)?;
            validate_attribute_existence(registry, name, self, None)?;
            Err(registry
                .raise(&ATTRIBUTE_INDELIBILITY, arguments![name.to_owned(), self.subject()])
                .into())
        })
    }

    /// Sorted names of public attributes, adjusted by the visibility lists.
    fn directory(&self) -> Vec<String> {
        let names = self.stored_names();
        select_public_attributes(
            names.iter().map(String::as_str),
            self.visibility_includes(),
            self.visibility_excludes(),
        )
    }
}

/// Transition from under construction to sealed.
///
/// Sealing something already sealed returns it unchanged.
pub trait Seal {
    /// Sealed form.
    type Sealed;

    /// Seal.
    fn seal(self) -> Result<Self::Sealed, BoundaryError>;
}

// ============================================================================
// Class Drafts
// ============================================================================

/// Variety of a sealed class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variety {
    /// Ordinary class; may be instantiated.
    Ordinary,
    /// Typed bag of public constants; never instantiated.
    Namespace,
}

/// Class under construction.
#[derive(Debug, Clone)]
pub struct ClassDraft {
    path: ClassPath,
    bases: Vec<Arc<Class>>,
    namespace: Entries,
    variety: Variety,
}

impl ClassDraft {
    fn start(path: ClassPath, variety: Variety) -> Self {
        let namespace = vec![
            (Cow::Borrowed("__module__"), Value::text(path.module().to_owned())),
            (Cow::Borrowed("__qualname__"), Value::text(path.qualname().to_owned())),
        ];
        Self {
            path,
            bases: Vec::new(),
            namespace,
            variety,
        }
    }

    /// Draft of an ordinary class.
    pub fn new(
        module: impl Into<Cow<'static, str>>,
        qualname: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::start(ClassPath::new(module, qualname), Variety::Ordinary)
    }

    /// Draft of a namespace class.
    pub fn namespace(
        module: impl Into<Cow<'static, str>>,
        qualname: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::start(ClassPath::new(module, qualname), Variety::Namespace)
    }

    /// Add a base class.
    ///
    /// Deriving from a namespace makes the sealed class a namespace too.
    pub fn base(mut self, base: Arc<Class>) -> Self {
        self.bases.push(base);
        self
    }

    /// Define an attribute, replacing any earlier definition.
    pub fn define(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        upsert(&mut self.namespace, name.into(), value.into());
        self
    }

    /// Set the documentation string.
    pub fn doc(self, doc: impl Into<Cow<'static, str>>) -> Self {
        self.define("__doc__", Value::text(doc))
    }

    /// Path the sealed class will have.
    #[inline]
    pub fn path(&self) -> &ClassPath {
        &self.path
    }

    fn reject_namespace_entries(&self, registry: &Registry) -> Result<(), BoundaryError> {
        let rejected = self.namespace.iter().find(|(name, _)| {
            let name: &str = name;
            !NAMESPACE_BOOKKEEPING.contains(&name) && !is_public_name(name)
        });
        match rejected {
            Some((name, _)) => Err(registry.raise(
                &CLASS_ATTRIBUTE_REJECTION,
                arguments![name.clone(), Subject::ClassNamespace(self.namespace.clone())],
            )),
            None => Ok(()),
        }
    }
}

impl Seal for ClassDraft {
    type Sealed = Arc<Class>;

    fn seal(mut self) -> Result<Arc<Class>, BoundaryError> {
        let registry = Interceptor::ours().registry();
        // Descendants of a namespace are namespaces.
        if self.bases.iter().any(|base| base.variety == Variety::Namespace) {
            self.variety = Variety::Namespace;
        }
        match self.variety {
            Variety::Namespace => self.reject_namespace_entries(registry)?,
            Variety::Ordinary => {
                for (name, _) in &self.namespace {
                    validate_attribute_name(registry, name)?;
                }
            }
        }
        let factory = match self.variety {
            Variety::Ordinary => factories().class(),
            Variety::Namespace => factories().namespace(),
        };
        let class = Class::assemble(self.path, self.bases, self.namespace, self.variety, false);
        class.bind_factory(FactoryBinding::Bound(Arc::clone(factory)));
        tracing::trace!(class = %class.path, variety = ?class.variety, "class sealed");
        Ok(class)
    }
}

impl Seal for Arc<Class> {
    type Sealed = Arc<Class>;

    fn seal(self) -> Result<Arc<Class>, BoundaryError> {
        Ok(self)
    }
}

/// Build an anonymous namespace class from name-value pairs.
///
/// The class is named `Namespace` and belongs to this package.
pub fn create_namespace<I, K, V>(entries: I) -> Result<Arc<Class>, BoundaryError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Cow<'static, str>>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .fold(ClassDraft::namespace(PACKAGE_NAME, "Namespace"), |draft, (name, value)| {
            draft.define(name, value)
        })
        .seal()
}

// ============================================================================
// Sealed Classes
// ============================================================================

#[derive(Debug)]
pub(crate) enum FactoryBinding {
    /// The class is its own factory.
    SelfHosted,
    Bound(Arc<Class>),
}

/// Sealed class.
pub struct Class {
    path: ClassPath,
    bases: Vec<Arc<Class>>,
    attributes: Entries,
    variety: Variety,
    is_factory: bool,
    factory: OnceLock<FactoryBinding>,
}

impl Class {
    pub(crate) fn assemble(
        path: ClassPath,
        bases: Vec<Arc<Class>>,
        attributes: Entries,
        variety: Variety,
        is_factory: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            path,
            bases,
            attributes,
            variety,
            is_factory,
            factory: OnceLock::new(),
        })
    }

    /// Bind the factory once. Returns `false` if one was already bound.
    pub(crate) fn bind_factory(&self, binding: FactoryBinding) -> bool {
        self.factory.set(binding).is_ok()
    }

    pub(crate) fn factory_binding(&self) -> Option<&FactoryBinding> {
        self.factory.get()
    }

    /// Module and qualified name.
    #[inline]
    pub fn path(&self) -> &ClassPath {
        &self.path
    }

    /// Direct base classes.
    #[inline]
    pub fn bases(&self) -> &[Arc<Class>] {
        &self.bases
    }

    /// Attributes defined directly on this class.
    #[inline]
    pub fn attributes(&self) -> &[(Cow<'static, str>, Value)] {
        &self.attributes
    }

    /// Variety.
    #[inline]
    pub const fn variety(&self) -> Variety {
        self.variety
    }

    /// Does this class manufacture classes?
    #[inline]
    pub const fn is_factory(&self) -> bool {
        self.is_factory
    }

    /// Class which manufactured this one.
    ///
    /// `None` only for the primitive factory when self-hosting is
    /// unavailable.
    pub fn factory(self: &Arc<Self>) -> Option<Arc<Class>> {
        match self.factory.get()? {
            FactoryBinding::SelfHosted => Some(Arc::clone(self)),
            FactoryBinding::Bound(factory) => Some(Arc::clone(factory)),
        }
    }

    /// Is `other` this class or one of its ancestors?
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        std::ptr::eq(self, other) || self.bases.iter().any(|base| base.is_subclass_of(other))
    }

    /// Create an instance.
    ///
    /// Named arguments become instance attributes. Namespaces and class
    /// factories cannot be instantiated this way.
    pub fn instantiate(self: &Arc<Self>, arguments: Arguments) -> Result<Instance, BoundaryError> {
        let registry = Interceptor::ours().registry();
        if self.variety == Variety::Namespace || self.is_factory {
            return Err(registry.raise(
                &IMPERMISSIBLE_INSTANTIATION,
                arguments![Subject::Class(self.path.clone())],
            ));
        }
        let constructor = Arc::new(
            Descriptor::constructor(&self.path).with_signature(Signature::new().var_keyword("attributes")),
        );
        let binding = match constructor.signature().bind(&arguments) {
            Ok(binding) => binding,
            Err(failure) => {
                return Err(registry
                    .raise(
                        &INVOCATION_VALIDATION,
                        arguments![Subject::Invocable(Arc::clone(&constructor)), failure.to_string()],
                    )
                    .with_cause(failure));
            }
        };
        let mut instance = Instance {
            class: Arc::clone(self),
            attributes: Vec::new(),
        };
        for (name, value) in binding.extra_named("attributes").unwrap_or_default() {
            instance.set_attribute(name, (*value).clone())?;
        }
        Ok(instance)
    }

    fn resolve(&self, name: &str) -> Option<&Value> {
        find(&self.attributes, name).or_else(|| self.bases.iter().find_map(|base| base.resolve(name)))
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        names.extend(self.attributes.iter().map(|(name, _)| name.to_string()));
        for base in &self.bases {
            base.collect_names(names);
        }
    }
}

impl MutableAttributeGuard for Class {
    fn subject(&self) -> Subject {
        Subject::Class(self.path.clone())
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.resolve(name).cloned()
    }

    fn stored_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn factory_path(&self) -> ClassPath {
        match self.factory.get() {
            Some(FactoryBinding::Bound(factory)) => factory.path.clone(),
            Some(FactoryBinding::SelfHosted) => self.path.clone(),
            None => ClassPath::new(PACKAGE_NAME, "Class"),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factory = match self.factory.get() {
            Some(FactoryBinding::SelfHosted) => Some(self.path.to_string()),
            Some(FactoryBinding::Bound(factory)) => Some(factory.path.to_string()),
            None => None,
        };
        f.debug_struct("Class")
            .field("path", &self.path)
            .field("variety", &self.variety)
            .field("is_factory", &self.is_factory)
            .field("factory", &factory)
            .field("attributes", &self.attributes.len())
            .finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variety != Variety::Namespace {
            return write!(f, "<class '{}'>", self.path);
        }
        write!(f, "NamespaceClass( '{}', (", self.path.name())?;
        for (index, base) in self.bases.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}'", base.path.qualname())?;
        }
        if self.bases.len() == 1 {
            f.write_str(",")?;
        }
        f.write_str("), { ")?;
        for (index, (name, value)) in self.attributes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{name}': {value}")?;
        }
        f.write_str(" } )")
    }
}

// ============================================================================
// Instances
// ============================================================================

/// Instance of an ordinary sealed class.
///
/// Only class attributes are immutable; instance attributes may change.
#[derive(Debug, Clone)]
pub struct Instance {
    class: Arc<Class>,
    attributes: Entries,
}

impl Instance {
    /// Class of this instance.
    #[inline]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Instance attribute, falling back to class attributes.
    pub fn attribute(&self, name: &str) -> Result<Value, BoundaryError> {
        find(&self.attributes, name)
            .or_else(|| self.class.resolve(name))
            .cloned()
            .ok_or_else(|| {
                Interceptor::ours().registry().raise(
                    &ATTRIBUTE_NONEXISTENCE,
                    arguments![name.to_owned(), Subject::Instance(self.class.path.clone())],
                )
            })
    }

    /// Set an instance attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<(), BoundaryError> {
        validate_attribute_name(Interceptor::ours().registry(), name)?;
        upsert(&mut self.attributes, Cow::Owned(name.to_owned()), value.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn circle() -> Arc<Class> {
        ClassDraft::new("shapes", "Circle")
            .doc("Round shape.")
            .define("sides", 0)
            .define("_cache", Value::Unit)
            .seal()
            .unwrap()
    }

    #[test]
    fn sealed_class_reads() {
        let circle = circle();
        assert_eq!(circle.attribute("sides").unwrap(), Value::Integer(0));
        assert_eq!(circle.attribute("__qualname__").unwrap(), Value::text("Circle"));
        let err = circle.attribute("radius").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
    }

    #[test]
    fn sealed_class_rejects_assignment_and_deletion() {
        let circle = circle();
        let err = circle.assign_attribute("radius", Value::Integer(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);

        let err = circle.assign_attribute("not legal", Value::Unit).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);

        let err = circle.delete_attribute("sides").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
        assert_eq!(
            err.to_string(),
            "Attempt to delete indelible attribute 'sides' on class 'shapes.Circle'."
        );
        assert_eq!(circle.attribute("sides").unwrap(), Value::Integer(0));
    }

    #[test]
    fn directory_hides_plumbing() {
        let circle = circle();
        assert_eq!(circle.directory(), vec!["sides"]);
    }

    #[test]
    fn illegal_names_cannot_be_sealed() {
        let err = ClassDraft::new("shapes", "Square")
            .define("two words", 1)
            .seal()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
    }

    #[test]
    fn inheritance_resolves_through_bases() {
        let base = circle();
        let derived = ClassDraft::new("shapes", "Wheel")
            .base(Arc::clone(&base))
            .define("spokes", 12)
            .seal()
            .unwrap();
        assert_eq!(derived.attribute("sides").unwrap(), Value::Integer(0));
        assert!(derived.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&derived));
        assert_eq!(derived.directory(), vec!["sides", "spokes"]);
    }

    #[test]
    fn namespaces_reject_non_public_entries() {
        let err = ClassDraft::namespace("config", "Limits")
            .define("_secret", 1)
            .seal()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);
        assert_eq!(
            err.to_string(),
            "Rejection of extant definition of attribute '_secret' on class 'config.Limits'."
        );

        let limits = ClassDraft::namespace("config", "Limits")
            .doc("Limits.")
            .define("depth", 16)
            .seal();
        assert!(limits.is_ok());
    }

    #[test]
    fn namespaces_cannot_be_instantiated() {
        let namespace = create_namespace([("answer", 42)]).unwrap();
        let err = namespace.instantiate(Arguments::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);
        assert_eq!(err.to_string(), "Impermissible instantiation of class 'lockup.Namespace'.");
    }

    #[test]
    fn descendants_of_namespaces_are_namespaces() {
        let answers = create_namespace([("answer", 42)]).unwrap();
        let derived = ClassDraft::new("config", "Derived")
            .base(Arc::clone(&answers))
            .define("question", 6)
            .seal()
            .unwrap();
        assert_eq!(derived.variety(), Variety::Namespace);
        assert_eq!(derived.factory().unwrap().path().to_string(), "lockup.NamespaceClass");
        assert_eq!(derived.attribute("answer").unwrap(), Value::Integer(42));

        let err = derived.instantiate(Arguments::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);
        assert_eq!(err.to_string(), "Impermissible instantiation of class 'config.Derived'.");

        let err = ClassDraft::new("config", "Leaky")
            .base(answers)
            .define("_hidden", 1)
            .seal()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImpermissibleOperation);
    }

    #[test]
    fn namespace_representation() {
        let namespace = create_namespace([("answer", 42)]).unwrap();
        assert_eq!(
            namespace.to_string(),
            "NamespaceClass( 'Namespace', (), { '__module__': 'lockup', \
             '__qualname__': 'Namespace', 'answer': 42 } )"
        );
        assert_eq!(circle().to_string(), "<class 'shapes.Circle'>");
    }

    #[test]
    fn instances_carry_mutable_attributes() {
        let circle = circle();
        let mut instance = circle.instantiate(arguments![; radius = 3]).unwrap();
        assert_eq!(instance.attribute("radius").unwrap(), Value::Integer(3));
        assert_eq!(instance.attribute("sides").unwrap(), Value::Integer(0));
        instance.set_attribute("radius", 4).unwrap();
        assert_eq!(instance.attribute("radius").unwrap(), Value::Integer(4));

        let err = instance.attribute("area").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attempt to access nonexistent attribute 'area' on instance of class 'shapes.Circle'."
        );

        let err = circle.instantiate(arguments![3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectData);
    }

    #[test]
    fn sealed_classes_know_their_factory() {
        let circle = circle();
        let factory = circle.factory().unwrap();
        assert_eq!(factory.path().to_string(), "lockup.Class");
        assert!(factory.is_factory());

        let namespace = create_namespace([("answer", 42)]).unwrap();
        assert_eq!(namespace.factory().unwrap().path().to_string(), "lockup.NamespaceClass");
    }

    #[test]
    fn sealing_a_sealed_class_is_identity() {
        let circle = circle();
        let resealed = Arc::clone(&circle).seal().unwrap();
        assert!(Arc::ptr_eq(&circle, &resealed));
    }
}
