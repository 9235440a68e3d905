//! Pre-defined failure classes.
//!
//! # Taxonomy & Governance
//!
//! Each failure class names one factory in the built-in
//! [`catalog`](crate::catalog) and fixes the kind that factory must produce.
//! The registry checks every produced error against this kind; a factory
//! which returns anything else is reported as [`ErrorKind::InvalidState`].
//!
//! Classes are grouped by the kind they produce:
//! - IncorrectData | malformed arguments and invocations
//! - InaccessibleAttribute | illegal or nonexistent attribute names
//! - Impermissible(Attribute)Operation | mutation of sealed entities
//! - InvalidState | misbehavior of this library itself
//!
//! # Governance
//!
//! [`ALL`] must list every class below. The `tests` module checks that names
//! are unique and that the catalog serves each one.

use crate::{define_failure_classes, ErrorKind, FailureClass};

// -----------------------------------------------------------------------------
// IncorrectData - Caller supplied malformed data
// -----------------------------------------------------------------------------
define_failure_classes! {
    ErrorKind::IncorrectData => {
        ARGUMENT_VALIDATION   = "argument_validation",
        INVOCATION_VALIDATION = "invocation_validation",
    }
}

// -----------------------------------------------------------------------------
// InaccessibleAttribute / InaccessibleEntity - Unreachable targets
// -----------------------------------------------------------------------------
define_failure_classes! {
    ErrorKind::InaccessibleAttribute => {
        ATTRIBUTE_NAME_ILLEGALITY = "attribute_name_illegality",
        ATTRIBUTE_NONEXISTENCE    = "attribute_nonexistence",
    }
}

define_failure_classes! {
    ErrorKind::InaccessibleEntity => {
        INACCESSIBLE_ENTITY = "inaccessible_entity",
    }
}

// -----------------------------------------------------------------------------
// Impermissible operations - Sealed entities and namespaces
// -----------------------------------------------------------------------------
define_failure_classes! {
    ErrorKind::ImpermissibleAttributeOperation => {
        ATTRIBUTE_IMMUTABILITY = "attribute_immutability",
        ATTRIBUTE_INDELIBILITY = "attribute_indelibility",
    }
}

define_failure_classes! {
    ErrorKind::ImpermissibleOperation => {
        CLASS_ATTRIBUTE_REJECTION   = "class_attribute_rejection",
        IMPERMISSIBLE_INSTANTIATION = "impermissible_instantiation",
    }
}

define_failure_classes! {
    ErrorKind::InvalidOperation => {
        ATTRIBUTE_NONINVOCABILITY = "attribute_noninvocability",
    }
}

define_failure_classes! {
    ErrorKind::AbsentImplementation => {
        IMPLEMENTATION_ABSENCE = "implementation_absence",
    }
}

// -----------------------------------------------------------------------------
// InvalidState - Owner of problem: maintainers of this library
// -----------------------------------------------------------------------------
define_failure_classes! {
    ErrorKind::InvalidState => {
        FUGITIVE_APPREHENSION = "fugitive_apprehension",
        INVALID_STATE         = "invalid_state",
        RETURN_VALIDATION     = "return_validation",
    }
}

/// Every declared failure class.
pub const ALL: [&FailureClass; 14] = [
    &ARGUMENT_VALIDATION,
    &INVOCATION_VALIDATION,
    &ATTRIBUTE_NAME_ILLEGALITY,
    &ATTRIBUTE_NONEXISTENCE,
    &INACCESSIBLE_ENTITY,
    &ATTRIBUTE_IMMUTABILITY,
    &ATTRIBUTE_INDELIBILITY,
    &CLASS_ATTRIBUTE_REJECTION,
    &IMPERMISSIBLE_INSTANTIATION,
    &ATTRIBUTE_NONINVOCABILITY,
    &IMPLEMENTATION_ABSENCE,
    &FUGITIVE_APPREHENSION,
    &INVALID_STATE,
    &RETURN_VALIDATION,
];

/// Look up a declared failure class by registry name.
pub fn by_name(name: &str) -> Option<&'static FailureClass> {
    ALL.into_iter().find(|class| class.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = ALL.iter().map(|class| class.name()).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("attribute_indelibility"), Some(&ATTRIBUTE_INDELIBILITY));
        assert_eq!(by_name("create_attribute_indelibility_exception"), None);
    }

    #[test]
    fn internal_invariant_classes_produce_invalid_state() {
        for class in [&FUGITIVE_APPREHENSION, &INVALID_STATE, &RETURN_VALIDATION] {
            assert_eq!(class.kind(), ErrorKind::InvalidState);
        }
    }

    #[test]
    fn illegal_names_are_inaccessible_attributes() {
        assert_eq!(ATTRIBUTE_NAME_ILLEGALITY.kind(), ErrorKind::InaccessibleAttribute);
    }
}
