//! Closed error taxonomy for the library boundary.
//!
//! Every error that crosses the boundary carries exactly one [`ErrorKind`].
//! Kinds are a shallow classification: consumers match by kind identity or by
//! [`Capability`] ("is this a data error?") rather than by walking a type
//! hierarchy.
//!
//! # Governance
//!
//! The set of kinds is frozen. New kinds are added by extending
//! [`ErrorKind`] here, never by ad hoc construction at call sites. Failure
//! classes (the named factories which produce errors) are likewise declared
//! only through [`define_failure_classes!`](crate::define_failure_classes),
//! and [`FailureClass`] has a private field so it cannot be built elsewhere.
//!
//! # Interop
//!
//! Each kind also corresponds to one or more conventional error categories
//! ([`InteropCategory`]). These exist only so that code written against the
//! conventional categories ("is this an attribute error?") keeps working.
//! The canonical identity of an error is its kind name.
//!
//! ```rust
//! use lockup::{Capability, ErrorKind, InteropCategory};
//!
//! let kind = ErrorKind::from_name("ImpermissibleAttributeOperation").unwrap();
//! assert!(kind.has(Capability::Impermissible));
//! assert!(kind.has(Capability::Attribute));
//! assert!(kind.matches(InteropCategory::AttributeError));
//! assert!(!ErrorKind::InvalidState.has(Capability::InvalidOperation));
//! ```

use std::fmt;

// ============================================================================
// Capabilities
// ============================================================================

/// Capability tag carried by one or more kinds.
///
/// Capabilities are metadata, so they are `Copy` and cheap to pass around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Caller attempted an operation which cannot be honored.
    InvalidOperation,
    /// Operation is structurally disallowed regardless of arguments.
    Impermissible,
    /// Target of the operation cannot be reached.
    Inaccessible,
    /// Operation concerns an attribute.
    Attribute,
    /// Supplied data is malformed.
    Data,
    /// Internal invariant of this library was violated.
    Internal,
    /// No implementation exists for the current platform.
    Absent,
}

impl Capability {
    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Self::InvalidOperation => 1 << 0,
            Self::Impermissible => 1 << 1,
            Self::Inaccessible => 1 << 2,
            Self::Attribute => 1 << 3,
            Self::Data => 1 << 4,
            Self::Internal => 1 << 5,
            Self::Absent => 1 << 6,
        }
    }
}

/// Set of capability tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Empty set.
    pub const EMPTY: Self = Self(0);

    /// Add a capability.
    #[inline]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Check for a capability.
    #[inline]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

/// Conventional error categories used for interop only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteropCategory {
    /// Wrong type of operation or operand.
    TypeError,
    /// Right type, wrong value.
    ValueError,
    /// Attribute lookup or mutation failed.
    AttributeError,
    /// Operation lacks an implementation.
    NotImplemented,
    /// Unexpected runtime condition.
    RuntimeError,
}

impl InteropCategory {
    /// Conventional name of the category.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::AttributeError => "AttributeError",
            Self::NotImplemented => "NotImplementedError",
            Self::RuntimeError => "RuntimeError",
        }
    }
}

// ============================================================================
// Error Kind (Frozen Identity)
// ============================================================================

/// Error kind drawn from the closed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Complaint about an invalid operation.
    InvalidOperation,
    /// Complaint about a structurally disallowed operation.
    ImpermissibleOperation,
    /// Complaint about a disallowed operation on an attribute.
    ImpermissibleAttributeOperation,
    /// Complaint about an attempt to reach an inaccessible entity.
    InaccessibleEntity,
    /// Complaint about an attempt to reach an inaccessible attribute.
    InaccessibleAttribute,
    /// Complaint about incorrect data for an invocation or operation.
    IncorrectData,
    /// Complaint about an operation without implementation on this platform.
    AbsentImplementation,
    /// Alert about invalid internal state. Owner of the problem: this library.
    InvalidState,
}

/// Kind policy tables, extracted so changes are easy to audit.
mod kind_policy {
    use super::{Capabilities, Capability, ErrorKind, InteropCategory};
    use Capability::*;

    pub(super) const fn capabilities(kind: ErrorKind) -> Capabilities {
        let base = Capabilities::EMPTY;
        match kind {
            ErrorKind::InvalidOperation => base.with(InvalidOperation),
            ErrorKind::ImpermissibleOperation => base.with(InvalidOperation).with(Impermissible),
            ErrorKind::ImpermissibleAttributeOperation => base
                .with(InvalidOperation)
                .with(Impermissible)
                .with(Attribute),
            ErrorKind::InaccessibleEntity => base.with(InvalidOperation).with(Inaccessible),
            ErrorKind::InaccessibleAttribute => base
                .with(InvalidOperation)
                .with(Inaccessible)
                .with(Attribute),
            ErrorKind::IncorrectData => base.with(InvalidOperation).with(Data),
            ErrorKind::AbsentImplementation => base.with(Absent),
            ErrorKind::InvalidState => base.with(Internal),
        }
    }

    pub(super) const fn interop(kind: ErrorKind) -> &'static [InteropCategory] {
        use InteropCategory as C;
        match kind {
            ErrorKind::InvalidOperation => &[],
            ErrorKind::ImpermissibleOperation => &[C::TypeError],
            ErrorKind::ImpermissibleAttributeOperation => &[C::TypeError, C::AttributeError],
            ErrorKind::InaccessibleEntity => &[],
            ErrorKind::InaccessibleAttribute => &[C::AttributeError],
            ErrorKind::IncorrectData => &[C::TypeError, C::ValueError],
            ErrorKind::AbsentImplementation => &[C::NotImplemented],
            ErrorKind::InvalidState => &[C::RuntimeError],
        }
    }
}

impl ErrorKind {
    /// Every kind in the registry.
    pub const ALL: [ErrorKind; 8] = [
        Self::InvalidOperation,
        Self::ImpermissibleOperation,
        Self::ImpermissibleAttributeOperation,
        Self::InaccessibleEntity,
        Self::InaccessibleAttribute,
        Self::IncorrectData,
        Self::AbsentImplementation,
        Self::InvalidState,
    ];

    /// Canonical kind name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidOperation => "InvalidOperation",
            Self::ImpermissibleOperation => "ImpermissibleOperation",
            Self::ImpermissibleAttributeOperation => "ImpermissibleAttributeOperation",
            Self::InaccessibleEntity => "InaccessibleEntity",
            Self::InaccessibleAttribute => "InaccessibleAttribute",
            Self::IncorrectData => "IncorrectData",
            Self::AbsentImplementation => "AbsentImplementation",
            Self::InvalidState => "InvalidState",
        }
    }

    /// Resolve a kind by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Capability tags of this kind.
    #[inline]
    pub const fn capabilities(self) -> Capabilities {
        kind_policy::capabilities(self)
    }

    /// Does this kind carry the capability?
    #[inline]
    pub const fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Interop categories which also match this kind.
    #[inline]
    pub const fn interop(self) -> &'static [InteropCategory] {
        kind_policy::interop(self)
    }

    /// Does this kind match the conventional category?
    pub const fn matches(self, category: InteropCategory) -> bool {
        let categories = self.interop();
        let mut index = 0;
        while index < categories.len() {
            if categories[index] as u8 == category as u8 {
                return true;
            }
            index += 1;
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Failure Class (Frozen Identity)
// ============================================================================

/// Named class of failure with the kind its factory must produce.
///
/// Instances exist only as const statics declared in
/// [`definitions`](crate::definitions). The private field prevents
/// construction elsewhere.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct FailureClass {
    name: &'static str,
    kind: ErrorKind,
    _private: (),
}

impl FailureClass {
    /// Internal constructor - not pub, enforces const-only usage.
    #[doc(hidden)]
    pub const fn __internal_new(name: &'static str, kind: ErrorKind) -> Self {
        assert!(!name.is_empty(), "Failure class name must not be empty");
        Self {
            name,
            kind,
            _private: (),
        }
    }

    /// Registry name, such as `attribute_immutability`.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Kind which the corresponding factory must produce.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human label, such as `attribute immutability`.
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
