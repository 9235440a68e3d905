//! Structured diagnostic record for error forensics.
//!
//! # Properties
//!
//! - Borrows from [`BoundaryError`] with an explicit lifetime
//! - Cannot outlive the error that created it
//! - No heap allocations in accessors
//! - Field output is truncated to bound log volume
//!
//! The record exists only during the logging call. Owned message and label
//! text is zeroized when the error drops.

use crate::{BoundaryError, ClassPath, ErrorKind, Fault};
use std::borrow::Cow;
use std::fmt;
use zeroize::Zeroize;

/// Longest rendering of a single field, indicator included.
const MAX_FIELD_OUTPUT_LEN: usize = 1024;

const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Causes beyond this depth are elided.
const MAX_CAUSE_DEPTH: usize = 16;

/// Message or label text of a [`BoundaryError`].
///
/// Owned text is scrubbed when the field drops. Static text is left alone.
#[derive(Debug)]
pub struct ContextField(Cow<'static, str>);

impl ContextField {
    pub(crate) fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self(text.into())
    }

    /// Borrow the text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Zeroize for ContextField {
    fn zeroize(&mut self) {
        if let Cow::Owned(text) = &mut self.0 {
            text.zeroize();
        }
    }
}

impl Drop for ContextField {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Structured diagnostic record with borrowed data from a [`BoundaryError`].
///
/// # Example
///
/// ```rust
/// use lockup::{definitions, failure, Registry};
///
/// let err = failure!(Registry::ours(), definitions::ATTRIBUTE_NAME_ILLEGALITY, "1st");
/// let mut buffer = String::new();
/// err.diagnostic_log().write_to(&mut buffer).unwrap();
/// assert!(buffer.starts_with("[InaccessibleAttribute]"));
/// assert!(buffer.contains("failure class='attribute name illegality'"));
/// ```
#[derive(Debug)]
pub struct DiagnosticLog<'a> {
    error: &'a BoundaryError,
}

impl<'a> DiagnosticLog<'a> {
    pub(crate) const fn new(error: &'a BoundaryError) -> Self {
        Self { error }
    }

    /// Kind of the logged error.
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Message of the logged error.
    #[inline]
    pub fn message(&self) -> &'a str {
        self.error.message()
    }

    /// Exception labels of the logged error.
    #[inline]
    pub fn labels(&self) -> &'a [(Cow<'static, str>, ContextField)] {
        self.error.labels()
    }

    /// Class of the immediate cause, if any.
    #[inline]
    pub fn cause_class(&self) -> Option<&'a ClassPath> {
        self.error.cause().map(Fault::class)
    }

    /// Format for human-readable logs in trusted debug contexts.
    ///
    /// Only available with BOTH the `trusted_debug` feature flag AND debug
    /// assertions enabled. Unlike [`write_to`](Self::write_to), this also
    /// renders supplementary arguments.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut output);
        for (index, value) in self.error.positional().iter().enumerate() {
            output.push_str(&format!(
                " extra[{}]='{}'",
                index,
                truncate_with_indicator(&value.to_string())
            ));
        }
        for (key, value) in self.error.named() {
            output.push_str(&format!(
                " extra.{}='{}'",
                key,
                truncate_with_indicator(&value.to_string())
            ));
        }
        output
    }

    /// Write the record to a formatter.
    ///
    /// Writes the kind, message, labels and the chain of causes. Each field
    /// is truncated to a bounded length.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(
            f,
            "[{}] message='{}'",
            self.error.kind(),
            truncate_with_indicator(self.error.message())
        )?;

        for (key, value) in self.error.labels() {
            write!(f, " {}='{}'", key, truncate_with_indicator(value.as_str()))?;
        }

        if let Some(cause) = self.error.cause() {
            write!(
                f,
                " cause='{}: {}'",
                cause.class(),
                truncate_with_indicator(&cause.to_string())
            )?;
            let mut depth = 1;
            let mut next = cause.as_error().source();
            while let Some(source) = next {
                if depth >= MAX_CAUSE_DEPTH {
                    f.write_str(" cause[..]='...[TRUNCATED]'")?;
                    break;
                }
                write!(
                    f,
                    " cause[{}]='{}'",
                    depth,
                    truncate_with_indicator(&source.to_string())
                )?;
                depth += 1;
                next = source.source();
            }
        }

        Ok(())
    }
}

/// Bound a field to [`MAX_FIELD_OUTPUT_LEN`] bytes, marking any cut.
fn truncate_with_indicator(text: &str) -> Cow<'_, str> {
    if text.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(text);
    }
    let budget = MAX_FIELD_OUTPUT_LEN - TRUNCATION_INDICATOR.len();
    let cut = text
        .char_indices()
        .map(|(index, ch)| index + ch.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);
    Cow::Owned(format!("{}{TRUNCATION_INDICATOR}", &text[..cut]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arguments, definitions, Registry};
    use std::error::Error;

    #[derive(Debug)]
    struct Disconnected;

    impl fmt::Display for Disconnected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disconnected")
        }
    }

    impl Error for Disconnected {}

    fn rendered(err: &BoundaryError) -> String {
        let mut buffer = String::new();
        err.diagnostic_log().write_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn short_fields_are_borrowed() {
        let message = "Attempt to assign immutable attribute 'x' on module 'm'.";
        assert!(matches!(truncate_with_indicator(message), Cow::Borrowed(_)));
        let exact = "m".repeat(MAX_FIELD_OUTPUT_LEN);
        assert!(matches!(truncate_with_indicator(&exact), Cow::Borrowed(_)));
    }

    #[test]
    fn oversized_attribute_names_are_cut_in_messages() {
        let name = "n".repeat(3 * MAX_FIELD_OUTPUT_LEN);
        let err = Registry::ours().raise(&definitions::ATTRIBUTE_NAME_ILLEGALITY, arguments![name]);
        let buffer = rendered(&err);
        assert!(buffer.starts_with("[InaccessibleAttribute] message='"));
        assert!(buffer.contains(TRUNCATION_INDICATOR));
        assert!(buffer.contains(" failure class='attribute name illegality'"));
        assert!(buffer.len() < 2 * MAX_FIELD_OUTPUT_LEN);
    }

    #[test]
    fn labels_are_cut_on_character_boundaries() {
        let err = BoundaryError::new(ErrorKind::IncorrectData, "bad argument")
            .with_label("ticket", "й".repeat(MAX_FIELD_OUTPUT_LEN));
        let label = err.labels()[0].1.as_str();
        let cut = truncate_with_indicator(label);
        assert!(cut.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(cut.ends_with(TRUNCATION_INDICATOR));
        assert!(rendered(&err).contains(cut.as_ref()));
    }

    #[test]
    fn owned_messages_are_scrubbed_and_static_ones_kept() {
        let mut owned = ContextField::new(format!("attribute '{}'", "secret"));
        owned.zeroize();
        assert_eq!(owned.as_str(), "");

        let mut fixed = ContextField::new("Impermissible instantiation.");
        fixed.zeroize();
        assert_eq!(fixed.as_str(), "Impermissible instantiation.");
    }

    #[test]
    fn record_includes_labels_and_cause() {
        let err = BoundaryError::new(ErrorKind::InvalidState, "wrapped")
            .with_label("failure class", "fugitive apprehension")
            .with_cause(Disconnected);
        let log = err.diagnostic_log();
        assert_eq!(log.kind(), ErrorKind::InvalidState);
        assert_eq!(log.cause_class().map(ClassPath::qualname), Some("Disconnected"));

        let buffer = rendered(&err);
        assert!(buffer.starts_with("[InvalidState] message='wrapped'"));
        assert!(buffer.contains(" failure class='fugitive apprehension'"));
        assert!(buffer.contains("Disconnected: disconnected'"));
    }

    #[test]
    fn record_walks_nested_causes() {
        let inner = BoundaryError::new(ErrorKind::IncorrectData, "inner").with_cause(Disconnected);
        let outer = BoundaryError::new(ErrorKind::InvalidState, "outer").with_cause(inner);
        assert!(rendered(&outer).contains(" cause[1]='disconnected'"));
    }

    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    #[test]
    fn trusted_debug_renders_supplementary_arguments() {
        let err = BoundaryError::new(ErrorKind::ImpermissibleAttributeOperation, "immutable")
            .with_positional("radius")
            .with_positional(3)
            .with_named("action", "assign");
        let output = err.diagnostic_log().format_for_trusted_debug();
        assert!(output.starts_with("[ImpermissibleAttributeOperation] message='immutable'"));
        assert!(output.contains(" extra[0]=''radius''"));
        assert!(output.contains(" extra[1]='3'"));
        assert!(output.contains(" extra.action=''assign''"));
    }
}
