//! Human-readable labels for entities appearing in diagnostics.
//!
//! Labels are the nouns of every error message: `module 'inventory'`,
//! `class 'shapes.Circle'`, `method 'area' on instance of class
//! 'shapes.Circle'`, `argument 'radius' (position #1)`. An optional context
//! prefix produces `"<context> on <label>"`, as in `attribute 'radius' on
//! class 'shapes.Circle'`.
//!
//! Malformed input is reported as [`ErrorKind::IncorrectData`] through the
//! registry passed in, so callers decide which factories produce the
//! complaint.
//!
//! ```rust
//! use lockup::{label_of, ClassPath, Registry, Subject};
//!
//! let registry = Registry::ours();
//! let circle = Subject::Class(ClassPath::new("shapes", "Circle"));
//! assert_eq!(
//!     label_of(registry, &circle, Some("attribute 'radius'")).unwrap(),
//!     "attribute 'radius' on class 'shapes.Circle'"
//! );
//! ```
//!
//! [`ErrorKind::IncorrectData`]: crate::ErrorKind::IncorrectData

use crate::definitions::ARGUMENT_VALIDATION;
use crate::{
    arguments, BoundaryError, Descriptor, Flavor, Form, ParameterKind, Registry, Signature, Value,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

const MODULE: &str = "lockup.labels";

// ============================================================================
// Class Paths & Subjects
// ============================================================================

/// Module and qualified name of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPath {
    module: Cow<'static, str>,
    qualname: Cow<'static, str>,
}

impl ClassPath {
    /// Class `qualname` defined in `module`.
    pub fn new(
        module: impl Into<Cow<'static, str>>,
        qualname: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
        }
    }

    /// Class path of a Rust type.
    ///
    /// Module segments are joined with dots and generic arguments dropped,
    /// so `core::num::error::ParseIntError` becomes
    /// `core.num.error.ParseIntError`.
    pub fn of<T: ?Sized>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Parse a Rust type name.
    pub fn from_type_name(type_name: &str) -> Self {
        let bare = type_name.split('<').next().unwrap_or(type_name);
        match bare.rsplit_once("::") {
            Some((module, qualname)) => Self::new(module.replace("::", "."), qualname.to_owned()),
            None => Self::new("core", bare.to_owned()),
        }
    }

    /// Defining module.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Qualified name within the module.
    #[inline]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    /// Last segment of the qualified name.
    pub fn name(&self) -> &str {
        self.qualname
            .rsplit_once('.')
            .map_or(self.qualname.as_ref(), |(_, name)| name)
    }
}

impl fmt::Display for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.qualname)
    }
}

/// Entity which can be labeled.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    /// Module, by name.
    Module(Cow<'static, str>),
    /// Class.
    Class(ClassPath),
    /// Several alternative classes.
    Classes(Vec<ClassPath>),
    /// Namespace of a class under construction.
    ///
    /// Qualifies through its `__module__` and `__qualname__` entries.
    ClassNamespace(Vec<(Cow<'static, str>, Value)>),
    /// Instance of a class.
    Instance(ClassPath),
    /// Invocable.
    Invocable(Arc<Descriptor>),
}

impl Subject {
    /// Module subject.
    pub fn module(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Module(name.into())
    }

    /// Class subject.
    pub fn class(module: impl Into<Cow<'static, str>>, qualname: impl Into<Cow<'static, str>>) -> Self {
        Self::Class(ClassPath::new(module, qualname))
    }

    /// Invocable subject.
    pub fn invocable(descriptor: impl Into<Arc<Descriptor>>) -> Self {
        Self::Invocable(descriptor.into())
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(name) => write!(f, "module {name}"),
            Self::Class(path) => write!(f, "class {path}"),
            Self::Classes(paths) => write!(f, "{} classes", paths.len()),
            Self::ClassNamespace(entries) => write!(f, "class namespace of {} entries", entries.len()),
            Self::Instance(path) => write!(f, "instance of {path}"),
            Self::Invocable(descriptor) => {
                write!(f, "invocable {}.{}", descriptor.module(), descriptor.qualname())
            }
        }
    }
}

// ============================================================================
// Labels
// ============================================================================

fn contextualize(label: String, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("{context} on {label}"),
        None => label,
    }
}

fn invalid_argument(
    registry: &Registry,
    name: &'static str,
    operation: Arc<Descriptor>,
    expectation: &'static str,
) -> BoundaryError {
    registry.raise(
        &ARGUMENT_VALIDATION,
        arguments![name, Subject::Invocable(operation), expectation],
    )
}

/// Label any subject, with an optional context prefix.
pub fn label_of(
    registry: &Registry,
    subject: &Subject,
    context: Option<&str>,
) -> Result<String, BoundaryError> {
    match subject {
        Subject::Module(name) => module_label(registry, name, context),
        Subject::Class(path) => Ok(class_label(std::slice::from_ref(path), context)),
        Subject::Classes(paths) => {
            if paths.is_empty() {
                return Err(invalid_argument(
                    registry,
                    "subject",
                    Descriptor::operation(MODULE, "label_of", &["subject", "context"]),
                    "at least one class",
                ));
            }
            Ok(class_label(paths, context))
        }
        Subject::ClassNamespace(entries) => {
            let path = qualify_namespace(registry, entries)?;
            Ok(class_label(std::slice::from_ref(&path), context))
        }
        Subject::Instance(path) => Ok(instance_label(path, context)),
        Subject::Invocable(descriptor) => {
            let label = invocable_label(registry, descriptor)?;
            Ok(contextualize(label, context))
        }
    }
}

/// Label of a module.
pub fn module_label(
    registry: &Registry,
    name: &str,
    context: Option<&str>,
) -> Result<String, BoundaryError> {
    if name.is_empty() {
        return Err(invalid_argument(
            registry,
            "module",
            Descriptor::operation(MODULE, "module_label", &["module", "context"]),
            "module",
        ));
    }
    Ok(contextualize(format!("module '{name}'"), context))
}

/// Label of one or several alternative classes.
pub fn class_label(classes: &[ClassPath], context: Option<&str>) -> String {
    let label = classes
        .iter()
        .map(|path| format!("class '{path}'"))
        .collect::<Vec<_>>()
        .join(" or ");
    contextualize(label, context)
}

/// Label of an instance of a class.
pub fn instance_label(class: &ClassPath, context: Option<&str>) -> String {
    contextualize(format!("instance of class '{class}'"), context)
}

/// Resolve the class path recorded in a namespace under construction.
pub fn qualify_namespace(
    registry: &Registry,
    entries: &[(Cow<'static, str>, Value)],
) -> Result<ClassPath, BoundaryError> {
    let lookup = |key: &str| {
        entries
            .iter()
            .find(|(name, _)| name == key)
            .and_then(|(_, value)| value.as_text())
    };
    match (lookup("__module__"), lookup("__qualname__")) {
        (Some(module), Some(qualname)) => Ok(ClassPath::new(module.to_owned(), qualname.to_owned())),
        _ => Err(invalid_argument(
            registry,
            "class_",
            Descriptor::operation(MODULE, "qualify_namespace", &["class_"]),
            "class or class namespace dictionary",
        )),
    }
}

/// Label of any invocable: routine, constructor or callable object.
pub fn invocable_label(registry: &Registry, descriptor: &Descriptor) -> Result<String, BoundaryError> {
    match descriptor.form() {
        Form::Function | Form::Method { .. } => routine_label(registry, descriptor),
        Form::Constructor => Ok(class_label(&[descriptor.class_path()], None)),
        Form::CallableObject { class } => Ok(format!("invocable {}", instance_label(class, None))),
    }
}

/// Label of a function or method.
pub fn routine_label(registry: &Registry, descriptor: &Descriptor) -> Result<String, BoundaryError> {
    let well_formed = !descriptor.module().is_empty()
        && !descriptor.name().is_empty()
        && !descriptor.qualname().is_empty();
    let routine = matches!(descriptor.form(), Form::Function | Form::Method { .. });
    if !well_formed || !routine {
        return Err(invalid_argument(
            registry,
            "routine",
            Descriptor::operation(MODULE, "routine_label", &["routine"]),
            "routine",
        ));
    }

    if descriptor.is_lambda() {
        return Ok(format!("lambda from module '{}'", descriptor.module()));
    }
    let mut label = match descriptor.form() {
        Form::Method { receiver } => {
            instance_label(receiver, Some(&format!("method '{}'", descriptor.name())))
        }
        _ => attribute_label(descriptor, "function"),
    };
    label = match descriptor.flavor() {
        Flavor::Ordinary => label,
        Flavor::Generator => format!("generator {label}"),
        Flavor::AsyncGenerator => format!("async generator {label}"),
        Flavor::Async => format!("async {label}"),
    };
    if descriptor.is_builtin() {
        label = format!("builtin {label}");
    }
    Ok(label)
}

fn attribute_label(descriptor: &Descriptor, base: &str) -> String {
    let label = format!("{base} '{}'", descriptor.name());
    let module = descriptor.module();
    match descriptor.qualname().rsplit_once('.') {
        Some((class, _)) if descriptor.name() != descriptor.qualname() => {
            format!("{label} on class '{module}.{class}'")
        }
        _ => format!("{label} on module '{module}'"),
    }
}

/// Label of a parameter by its kind and position in a signature.
pub fn argument_label(
    registry: &Registry,
    name: &str,
    signature: &Signature,
) -> Result<String, BoundaryError> {
    let Some((position, parameter)) = signature.find(name) else {
        return Err(invalid_argument(
            registry,
            "name",
            Descriptor::operation(MODULE, "argument_label", &["name", "signature"]),
            "name of valid argument",
        ));
    };
    Ok(match parameter.kind() {
        ParameterKind::PositionalOnly => format!("positional argument #{position}"),
        ParameterKind::PositionalOrKeyword => format!("argument '{name}' (position #{position})"),
        ParameterKind::VarPositional => format!("sequence of extra positional arguments '{name}'"),
        ParameterKind::KeywordOnly => format!("argument '{name}'"),
        ParameterKind::VarKeyword => format!("dictionary of extra nominative arguments '{name}'"),
    })
}

/// Top-level package of a dotted module name.
pub fn apex_package_name(module: &str) -> &str {
    module.split('.').next().unwrap_or(module)
}
