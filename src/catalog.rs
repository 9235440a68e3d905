//! Built-in exception factories.
//!
//! One factory per failure class in [`definitions`](crate::definitions).
//! Each factory is a pure function of its bound arguments: it validates
//! them, composes a message from labels and returns an error of the kind
//! its failure class declares.
//!
//! Factories validate their own arguments through the registry they are
//! given. A factory that rejects its arguments does so by failing, and the
//! registry reports that failure as an apprehended fugitive.

use crate::definitions::{self, ARGUMENT_VALIDATION, INACCESSIBLE_ENTITY};
use crate::registry::report;
use crate::{
    apex_package_name, argument_label, arguments, invocable_label, label_of,
    validate_argument_class, Binding, BoundaryError, Descriptor, ErrorKind, ExceptionFactory,
    FactoryProvider, FailureClass, Fault, Registry, Signature, Subject, Value, ValueClass,
    PACKAGE_NAME,
};
use std::fmt;
use std::sync::{Arc, OnceLock};

const MODULE: &str = "lockup.catalog";

// ============================================================================
// Argument Access
// ============================================================================

/// Validated access to the bound arguments of one factory call.
struct Reader<'r, 'b> {
    registry: &'r Registry,
    binding: &'r Binding<'b>,
    factory: &'r Arc<Descriptor>,
}

impl<'r, 'b> Reader<'r, 'b> {
    fn value(&self, name: &str) -> &'b Value {
        const UNIT: &Value = &Value::Unit;
        self.binding.value(name).unwrap_or(UNIT)
    }

    fn reject(&self, name: &str, expectation: &'static str) -> Fault {
        self.registry
            .raise(
                &ARGUMENT_VALIDATION,
                arguments![
                    name.to_owned(),
                    Subject::Invocable(Arc::clone(self.factory)),
                    expectation
                ],
            )
            .into()
    }

    fn text(&self, name: &str) -> Result<&'b str, Fault> {
        let value = validate_argument_class(
            self.registry,
            self.value(name),
            &[ValueClass::Text],
            name,
            self.factory,
        )?;
        Ok(value.as_text().unwrap_or_default())
    }

    fn optional_text(&self, name: &str) -> Result<Option<&'b str>, Fault> {
        match self.value(name) {
            Value::Unit => Ok(None),
            _ => self.text(name).map(Some),
        }
    }

    fn subject(&self, name: &str) -> Result<&'b Subject, Fault> {
        self.value(name)
            .as_subject()
            .ok_or_else(|| self.reject(name, "labelable entity"))
    }

    fn invocation(&self, name: &str) -> Result<&'b Arc<Descriptor>, Fault> {
        match self.value(name) {
            Value::Subject(Subject::Invocable(descriptor)) => Ok(descriptor),
            _ => Err(self.reject(name, "invocable")),
        }
    }

    fn attribute_label(&self) -> Result<String, Fault> {
        let name = self.text("name")?;
        let object = self.subject("object")?;
        Ok(label_of(self.registry, object, Some(&format!("attribute '{name}'")))?)
    }

    fn with_extra_context(&self, label: String) -> Result<String, Fault> {
        Ok(match self.optional_text("extra_context")? {
            Some(extra) if !extra.is_empty() => format!("{label} {extra}"),
            _ => label,
        })
    }
}

type Compose = fn(&Reader<'_, '_>) -> Result<String, Fault>;

// ============================================================================
// Message Composition
// ============================================================================

fn argument_validation(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let name = reader.text("name")?;
    let invocation = reader.invocation("invocation")?;
    let expectation = reader.text("expectation")?;
    let argument = argument_label(reader.registry, name, invocation.signature())?;
    let invocation = invocable_label(reader.registry, invocation)?;
    Ok(format!("Invalid {argument} to {invocation}: must be {expectation}"))
}

fn attribute_immutability(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let action = reader.text("action")?;
    let label = reader.attribute_label()?;
    Ok(format!("Attempt to {action} immutable {label}."))
}

fn attribute_indelibility(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let label = reader.attribute_label()?;
    Ok(format!("Attempt to delete indelible {label}."))
}

fn attribute_name_illegality(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let name = reader.text("name")?;
    Ok(format!("Attempt to access attribute with illegal name '{name}'."))
}

fn attribute_nonexistence(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let label = reader.with_extra_context(reader.attribute_label()?)?;
    Ok(format!("Attempt to access nonexistent {label}."))
}

fn attribute_noninvocability(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let label = reader.with_extra_context(reader.attribute_label()?)?;
    Ok(format!("Attempt to invoke noninvocable {label}."))
}

fn class_attribute_rejection(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let name = reader.text("name")?;
    let class = reader.subject("class_")?;
    let label = label_of(reader.registry, class, Some(&format!("attribute '{name}'")))?;
    Ok(format!("Rejection of extant definition of {label}."))
}

fn fugitive_apprehension(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let fugitive = reader.subject("fugitive")?;
    let invocation = reader.invocation("invocation")?;
    let fugitive = label_of(reader.registry, fugitive, None)?;
    let invocation = invocable_label(reader.registry, invocation)?;
    Ok(format!(
        "Apprehension of fugitive exception of {fugitive} at boundary of {invocation}."
    ))
}

fn impermissible_instantiation(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let class = reader.subject("class_")?;
    let label = label_of(reader.registry, class, None)?;
    Ok(format!("Impermissible instantiation of {label}."))
}

fn implementation_absence(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let invocation = reader.invocation("invocation")?;
    let variant = reader.text("variant_name")?;
    let invocation = invocable_label(reader.registry, invocation)?;
    Ok(format!("No implementation of {invocation} exists for {variant}."))
}

fn inaccessible_entity(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let name = reader.text("name")?;
    let expectation = reader.text("expectation")?;
    Ok(format!(
        "Impermissible attempt to access entity '{name}': must access {expectation}"
    ))
}

fn invalid_state(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let message = reader.text("message")?;
    let package = apex_package_name(reader.text("package_name")?);
    Ok(format!(
        "Invalid internal state! {message} Please report to the '{package}' package maintainers."
    ))
}

fn invocation_validation(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let invocation = reader.invocation("invocation")?;
    let cause = reader.text("cause")?;
    let label = invocable_label(reader.registry, invocation)?;
    Ok(format!("Incompatible arguments for invocation of {label}: {cause}"))
}

fn return_validation(reader: &Reader<'_, '_>) -> Result<String, Fault> {
    let invocation = reader.invocation("invocation")?;
    let expectation = reader.text("expectation")?;
    let returned = match reader.value("position") {
        Value::Unit => "return value".to_owned(),
        Value::Integer(position) => format!("return value (position #{position})"),
        Value::Text(position) => format!("return value (position #{position})"),
        _ => return Err(reader.reject("position", "integer or text")),
    };
    let invocation = invocable_label(reader.registry, invocation)?;
    Ok(format!("Invalid {returned} from {invocation}: must be {expectation}"))
}

// ============================================================================
// Catalog
// ============================================================================

/// Built-in factory for one failure class.
pub struct CatalogFactory {
    class: &'static FailureClass,
    descriptor: Arc<Descriptor>,
    compose: Compose,
}

impl CatalogFactory {
    fn new(class: &'static FailureClass, signature: Signature, compose: Compose) -> Self {
        let qualname = format!("create_{}_exception", class.name());
        Self {
            class,
            descriptor: Arc::new(Descriptor::function(MODULE, qualname).with_signature(signature)),
            compose,
        }
    }

    /// Failure class served by this factory.
    #[inline]
    pub const fn class(&self) -> &'static FailureClass {
        self.class
    }
}

impl ExceptionFactory for CatalogFactory {
    fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    fn kind(&self) -> ErrorKind {
        self.class.kind()
    }

    fn produce(&self, registry: &Registry, binding: &Binding<'_>) -> Result<BoundaryError, Fault> {
        let reader = Reader {
            registry,
            binding,
            factory: &self.descriptor,
        };
        let message = (self.compose)(&reader)?;
        Ok(BoundaryError::new(self.class.kind(), message))
    }
}

impl fmt::Debug for CatalogFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogFactory")
            .field("class", &self.class.name())
            .field("qualname", &self.descriptor.qualname())
            .finish()
    }
}

/// The built-in factories, one per declared failure class.
#[derive(Debug)]
pub struct Catalog {
    factories: Vec<Arc<CatalogFactory>>,
}

impl Catalog {
    fn assemble() -> Self {
        use definitions::*;
        let name_object = || Signature::new().positional("name").positional("object");
        let factories = vec![
            CatalogFactory::new(
                &ARGUMENT_VALIDATION,
                Signature::new()
                    .positional("name")
                    .positional("invocation")
                    .positional("expectation"),
                argument_validation,
            ),
            CatalogFactory::new(
                &ATTRIBUTE_IMMUTABILITY,
                name_object().optional("action", "assign"),
                attribute_immutability,
            ),
            CatalogFactory::new(&ATTRIBUTE_INDELIBILITY, name_object(), attribute_indelibility),
            CatalogFactory::new(
                &ATTRIBUTE_NAME_ILLEGALITY,
                Signature::new().positional("name"),
                attribute_name_illegality,
            ),
            CatalogFactory::new(
                &ATTRIBUTE_NONEXISTENCE,
                name_object().optional("extra_context", ()),
                attribute_nonexistence,
            ),
            CatalogFactory::new(
                &ATTRIBUTE_NONINVOCABILITY,
                name_object().optional("extra_context", ()),
                attribute_noninvocability,
            ),
            CatalogFactory::new(
                &CLASS_ATTRIBUTE_REJECTION,
                Signature::new().positional("name").positional("class_"),
                class_attribute_rejection,
            ),
            CatalogFactory::new(
                &FUGITIVE_APPREHENSION,
                Signature::new().positional("fugitive").positional("invocation"),
                fugitive_apprehension,
            ),
            CatalogFactory::new(
                &IMPERMISSIBLE_INSTANTIATION,
                Signature::new().positional("class_"),
                impermissible_instantiation,
            ),
            CatalogFactory::new(
                &IMPLEMENTATION_ABSENCE,
                Signature::new().positional("invocation").positional("variant_name"),
                implementation_absence,
            ),
            CatalogFactory::new(
                &INACCESSIBLE_ENTITY,
                Signature::new().positional("name").positional("expectation"),
                inaccessible_entity,
            ),
            CatalogFactory::new(
                &INVALID_STATE,
                Signature::new()
                    .positional("message")
                    .optional("package_name", PACKAGE_NAME),
                invalid_state,
            ),
            CatalogFactory::new(
                &INVOCATION_VALIDATION,
                Signature::new().positional("invocation").positional("cause"),
                invocation_validation,
            ),
            CatalogFactory::new(
                &RETURN_VALIDATION,
                Signature::new()
                    .positional("invocation")
                    .positional("expectation")
                    .optional("position", ()),
                return_validation,
            ),
        ];
        Self {
            factories: factories.into_iter().map(Arc::new).collect(),
        }
    }

    /// Process-wide catalog, assembled on first use.
    pub fn shared() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Self::assemble)
    }

    /// Registry names served by the catalog.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.iter().map(|factory| factory.class.name())
    }

    /// Factory for a registry name.
    pub fn get(&self, name: &str) -> Option<&Arc<CatalogFactory>> {
        self.factories
            .iter()
            .find(|factory| factory.class.name() == name)
    }
}

/// Provider serving the built-in catalog.
///
/// Unknown names are reported as [`ErrorKind::InaccessibleEntity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OurFactories;

impl FactoryProvider for OurFactories {
    fn provide(&self, name: &str) -> Result<Arc<dyn ExceptionFactory>, Fault> {
        match Catalog::shared().get(name) {
            Some(factory) => Ok(Arc::clone(factory) as Arc<dyn ExceptionFactory>),
            None => Err(report(
                &INACCESSIBLE_ENTITY,
                arguments![
                    format!("create_{name}_exception"),
                    "name of available exception factory"
                ],
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::ALL;
    use crate::{ClassPath, ExtraData};

    #[test]
    fn catalog_serves_every_declared_class() {
        let catalog = Catalog::shared();
        for class in ALL {
            let factory = catalog.get(class.name()).unwrap();
            assert_eq!(factory.kind(), class.kind());
            assert!(factory.descriptor().validate().is_ok());
        }
        assert_eq!(catalog.names().count(), ALL.len());
    }

    #[test]
    fn unknown_names_are_inaccessible_entities() {
        let Err(fault) = OurFactories.provide("nonsense") else {
            panic!("provider accepted an unknown factory name");
        };
        let err = fault.downcast_ref::<BoundaryError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::InaccessibleEntity);
        assert_eq!(
            err.to_string(),
            "Impermissible attempt to access entity 'create_nonsense_exception': \
             must access name of available exception factory"
        );
    }

    #[test]
    fn message_formats() {
        let registry = Registry::ours();
        let circle = Subject::Class(ClassPath::new("shapes", "Circle"));
        let area = Subject::invocable(Descriptor::function("shapes", "area"));
        let cases: Vec<(&FailureClass, crate::Arguments, &str)> = vec![
            (
                &definitions::ATTRIBUTE_INDELIBILITY,
                arguments!["radius", circle.clone()],
                "Attempt to delete indelible attribute 'radius' on class 'shapes.Circle'.",
            ),
            (
                &definitions::CLASS_ATTRIBUTE_REJECTION,
                arguments!["_cache", circle.clone()],
                "Rejection of extant definition of attribute '_cache' on class 'shapes.Circle'.",
            ),
            (
                &definitions::IMPERMISSIBLE_INSTANTIATION,
                arguments![circle.clone()],
                "Impermissible instantiation of class 'shapes.Circle'.",
            ),
            (
                &definitions::IMPLEMENTATION_ABSENCE,
                arguments![area.clone(), "this platform"],
                "No implementation of function 'area' on module 'shapes' exists for this platform.",
            ),
            (
                &definitions::INVALID_STATE,
                arguments!["Registry vanished."; package_name = "lockup.registry"],
                "Invalid internal state! Registry vanished. Please report to the 'lockup' package maintainers.",
            ),
            (
                &definitions::INVOCATION_VALIDATION,
                arguments![area.clone(), "too many positional arguments"],
                "Incompatible arguments for invocation of function 'area' on module 'shapes': \
                 too many positional arguments",
            ),
            (
                &definitions::RETURN_VALIDATION,
                arguments![area.clone(), "number"; position = 1],
                "Invalid return value (position #1) from function 'area' on module 'shapes': must be number",
            ),
            (
                &definitions::FUGITIVE_APPREHENSION,
                arguments![ClassPath::new("core.num.error", "ParseIntError"), area],
                "Apprehension of fugitive exception of class 'core.num.error.ParseIntError' \
                 at boundary of function 'area' on module 'shapes'.",
            ),
        ];
        for (class, arguments, expected) in cases {
            let err = registry.raise(class, arguments);
            assert_eq!(err.kind(), class.kind());
            assert_eq!(err.to_string(), expected);
            assert_eq!(err.label("failure class"), Some(class.label().as_str()));
        }
    }

    #[test]
    fn factories_reject_malformed_arguments() {
        let registry = Registry::ours();
        let err = registry.raise(&definitions::ATTRIBUTE_NAME_ILLEGALITY, arguments![42]);
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let cause = err.cause().unwrap().downcast_ref::<BoundaryError>().unwrap();
        assert_eq!(cause.kind(), ErrorKind::IncorrectData);
        assert_eq!(
            cause.to_string(),
            "Invalid argument 'name' (position #0) to function \
             'create_attribute_name_illegality_exception' on module 'lockup.catalog': must be text"
        );
        let err = registry.produce("fugitive_apprehension", arguments!["x", "y"], ExtraData::new());
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
