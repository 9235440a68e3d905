//! Attribute name classification.
//!
//! - **public**: a legal identifier not beginning with `_`
//! - **operational**: `__x__` with a non-underscore character right after
//!   the leading pair and right before the trailing pair
//! - **private**: any other legal identifier beginning with `_`
//!
//! ```rust
//! use lockup::{is_operational_name, is_public_name, Visibility};
//!
//! assert!(is_public_name("radius"));
//! assert!(is_operational_name("__doc__"));
//! assert!(!is_operational_name("___x__"));
//! assert_eq!(Visibility::classify("_cache"), Some(Visibility::Private));
//! assert_eq!(Visibility::classify("1st"), None);
//! ```

use std::collections::BTreeSet;

/// Words which are not legal attribute names.
const RESERVED_WORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while",
];

/// Visibility class of a legal attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Does not begin with an underscore.
    Public,
    /// Double underscores on both ends around a real name.
    Operational,
    /// Begins with an underscore and is not operational.
    Private,
}

impl Visibility {
    /// Classify a name; `None` for illegal names.
    pub fn classify(name: &str) -> Option<Self> {
        if !is_identifier(name) {
            return None;
        }
        Some(if !name.starts_with('_') {
            Self::Public
        } else if has_operational_shape(name) {
            Self::Operational
        } else {
            Self::Private
        })
    }
}

/// Is the name a legal identifier which is not a reserved word?
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !RESERVED_WORDS.contains(&name)
}

fn has_operational_shape(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 4
        && name.starts_with("__")
        && name.ends_with("__")
        && bytes[2] != b'_'
        && bytes[bytes.len() - 3] != b'_'
}

/// Is the name user-public?
#[inline]
pub fn is_public_name(name: &str) -> bool {
    Visibility::classify(name) == Some(Visibility::Public)
}

/// Is the name operational?
#[inline]
pub fn is_operational_name(name: &str) -> bool {
    Visibility::classify(name) == Some(Visibility::Operational)
}

/// Is the name user-public or operational?
#[inline]
pub fn is_public_or_operational_name(name: &str) -> bool {
    matches!(
        Visibility::classify(name),
        Some(Visibility::Public | Visibility::Operational)
    )
}

/// Select public names, plus `includes`, minus `excludes`.
///
/// The result is sorted and free of duplicates. Exclusion wins over
/// inclusion.
pub fn select_public_attributes<'a>(
    names: impl IntoIterator<Item = &'a str>,
    includes: &[&str],
    excludes: &[&str],
) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !excludes.contains(name))
        .filter(|name| includes.contains(name) || is_public_name(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}
