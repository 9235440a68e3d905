//! Convenience macros for declaring failure classes, building argument
//! lists and producing errors through a registry.
//!
//! # Usage
//!
//! ```rust
//! use lockup::{arguments, failure, definitions, ErrorKind, Registry, Subject, ClassPath};
//!
//! let registry = Registry::ours();
//! let class = Subject::Class(ClassPath::new("shapes", "Circle"));
//! let err = failure!(registry, definitions::ATTRIBUTE_IMMUTABILITY, "radius", class);
//! assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
//! assert_eq!(
//!     err.to_string(),
//!     "Attempt to assign immutable attribute 'radius' on class 'shapes.Circle'."
//! );
//!
//! let args = arguments![1, 2; scale = 3];
//! assert_eq!(args.positional().len(), 2);
//! assert_eq!(args.named().len(), 1);
//! ```

/// Declare a single failure class as a const static.
#[macro_export]
macro_rules! define_failure_class {
    ($name:ident, $registry_name:literal, $kind:expr) => {
        #[doc = concat!("Failure class `", $registry_name, "`.")]
        pub const $name: $crate::FailureClass =
            $crate::FailureClass::__internal_new($registry_name, $kind);
    };
}

/// Declare a batch of failure classes sharing one kind.
///
/// # Example
///
/// ```rust
/// use lockup::{define_failure_classes, ErrorKind};
///
/// define_failure_classes! {
///     ErrorKind::IncorrectData => {
///         PAYLOAD_MALFORMED = "payload_malformed",
///         PAYLOAD_TRUNCATED = "payload_truncated",
///     }
/// }
///
/// assert_eq!(PAYLOAD_MALFORMED.kind(), ErrorKind::IncorrectData);
/// ```
#[macro_export]
macro_rules! define_failure_classes {
    ($kind:expr => { $( $name:ident = $registry_name:literal ),+ $(,)? }) => {
        $(
            $crate::define_failure_class!($name, $registry_name, $kind);
        )+
    };
}

/// Build an [`Arguments`](crate::Arguments) list.
///
/// Positional values come first; named values follow a semicolon.
/// Every value goes through `Value::from`.
#[macro_export]
macro_rules! arguments {
    () => {
        $crate::Arguments::new()
    };
    ($($value:expr),* $(,)? $(; $($key:ident = $named:expr),* $(,)?)?) => {{
        #[allow(unused_mut)]
        let mut arguments = $crate::Arguments::new();
        $( arguments.push($crate::Value::from($value)); )*
        $( $( arguments.insert(stringify!($key), $crate::Value::from($named)); )* )?
        arguments
    }};
}

/// Produce a [`BoundaryError`](crate::BoundaryError) for a failure class
/// through a registry.
///
/// The result is always an error: if the factory misbehaves, the error
/// describes that misbehavior instead.
#[macro_export]
macro_rules! failure {
    ($registry:expr, $class:expr $(, $value:expr)* $(; $($key:ident = $named:expr),* $(,)?)?) => {
        $registry.raise(&$class, $crate::arguments![$($value),* $(; $($key = $named),*)?])
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::{definitions, ErrorKind, Registry, Subject, Value};

    #[test]
    fn arguments_macro_collects_positional_and_named() {
        let args = arguments![4, "text"; flag = true];
        assert_eq!(args.positional(), &[Value::Integer(4), Value::text("text")]);
        assert_eq!(args.named()[0].0, "flag");
        assert_eq!(args.named()[0].1, Value::Bool(true));
    }

    #[test]
    fn arguments_macro_accepts_only_named() {
        let args = arguments![; action = "delete"];
        assert!(args.positional().is_empty());
        assert_eq!(args.named().len(), 1);
    }

    #[test]
    fn empty_arguments_macro() {
        let args = arguments![];
        assert!(args.is_empty());
    }

    #[test]
    fn failure_macro_forwards_named_arguments() {
        let registry = Registry::ours();
        let module = Subject::module("inventory");
        let err = failure!(
            registry,
            definitions::ATTRIBUTE_IMMUTABILITY,
            "stock",
            module;
            action = "rebind"
        );
        assert_eq!(err.kind(), ErrorKind::ImpermissibleAttributeOperation);
        assert_eq!(
            err.to_string(),
            "Attempt to rebind immutable attribute 'stock' on module 'inventory'."
        );
    }
}
