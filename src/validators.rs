//! Validation helpers which complain through a registry.
//!
//! Each validator returns its subject on success, so it can be used inline:
//!
//! ```rust
//! use lockup::{validate_attribute_name, ErrorKind, Registry};
//!
//! let registry = Registry::ours();
//! assert_eq!(validate_attribute_name(registry, "radius").unwrap(), "radius");
//! let err = validate_attribute_name(registry, "not legal").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InaccessibleAttribute);
//! ```

use crate::definitions::{
    ARGUMENT_VALIDATION, ATTRIBUTE_NAME_ILLEGALITY, ATTRIBUTE_NONEXISTENCE,
    ATTRIBUTE_NONINVOCABILITY,
};
use crate::{
    arguments, is_identifier, BoundaryError, Descriptor, MutableAttributeGuard, Registry, Subject,
    Value, ValueClass,
};
use std::sync::Arc;

/// Validate an attribute name as a legal identifier.
pub fn validate_attribute_name<'n>(
    registry: &Registry,
    name: &'n str,
) -> Result<&'n str, BoundaryError> {
    if is_identifier(name) {
        return Ok(name);
    }
    Err(registry.raise(&ATTRIBUTE_NAME_ILLEGALITY, arguments![name.to_owned()]))
}

/// Validate that an attribute exists on a guarded object.
pub fn validate_attribute_existence<'n, G>(
    registry: &Registry,
    name: &'n str,
    object: &G,
    extra_context: Option<&str>,
) -> Result<&'n str, BoundaryError>
where
    G: MutableAttributeGuard + ?Sized,
{
    if object.lookup(name).is_some() {
        return Ok(name);
    }
    Err(registry.raise(
        &ATTRIBUTE_NONEXISTENCE,
        arguments![
            name.to_owned(),
            object.subject(),
            extra_context.map(str::to_owned)
        ],
    ))
}

/// Validate that an attribute exists and holds an invocable.
///
/// Returns the descriptor of the invocable.
pub fn validate_attribute_invocability<G>(
    registry: &Registry,
    name: &str,
    object: &G,
    extra_context: Option<&str>,
) -> Result<Arc<Descriptor>, BoundaryError>
where
    G: MutableAttributeGuard + ?Sized,
{
    validate_attribute_existence(registry, name, object, extra_context)?;
    if let Some(Value::Subject(Subject::Invocable(descriptor))) = object.lookup(name) {
        return Ok(descriptor);
    }
    Err(registry.raise(
        &ATTRIBUTE_NONINVOCABILITY,
        arguments![
            name.to_owned(),
            object.subject(),
            extra_context.map(str::to_owned)
        ],
    ))
}

/// Validate that an argument belongs to one of several value classes.
pub fn validate_argument_class<'v>(
    registry: &Registry,
    argument: &'v Value,
    classes: &[ValueClass],
    name: &str,
    invocation: &Arc<Descriptor>,
) -> Result<&'v Value, BoundaryError> {
    if classes.contains(&argument.class()) {
        return Ok(argument);
    }
    let expectation = classes
        .iter()
        .map(|class| class.label())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(registry.raise(
        &ARGUMENT_VALIDATION,
        arguments![
            name.to_owned(),
            Subject::Invocable(Arc::clone(invocation)),
            expectation
        ],
    ))
}
