//! Error kinds shared across parsing, deserialization, and normalization.
//!
//! Follows the `kind` + wrapping-struct split used throughout this corpus
//! (`BreakpadError`/`BreakpadErrorKind`, `Unreal4Error`/`Unreal4ErrorKind`):
//! a `Copy`-able, comparable enum describing *what* went wrong, wrapped in a
//! `thiserror`-derived struct that can carry an arbitrary `source`.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// The reason a dialect parser gave up.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token or pattern was required and not found.
    ExpectedToken(&'static str),
    /// Parsing succeeded syntactically but produced a value that violates a
    /// structural invariant (e.g. an exception header outside a managed
    /// thread).
    InvariantViolation(&'static str),
    /// The dialect tag passed to [`crate::parse`] is not one of the known
    /// tag strings.
    UnknownTag,
    /// Allocation failed. Never returned by any parser in practice; exists
    /// so the error-kind enum is total across this crate and the document
    /// round-trip path (see the `Allocation` kind below).
    Allocation,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::ExpectedToken(what) => write!(f, "expected {what}"),
            ParseErrorKind::InvariantViolation(which) => {
                write!(f, "invariant violated: {which}")
            }
            ParseErrorKind::UnknownTag => write!(f, "unknown dialect tag"),
            ParseErrorKind::Allocation => write!(f, "allocation failure"),
        }
    }
}

/// A parse failure with its position in the input.
///
/// This is the `{ line, column, message }` record of the external
/// interface: callers report the first error position only, no
/// second-pass heuristics are attempted.
#[derive(Debug, Error)]
#[error("{line}:{column}: {kind}")]
pub struct ParseError {
    kind: ParseErrorKind,
    /// 1-based line at which parsing failed.
    pub line: u32,
    /// 1-based column at which parsing failed.
    pub column: u32,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ParseError {
    /// Creates a new parse error at `(line, column)`.
    pub fn new(kind: ParseErrorKind, line: u32, column: u32) -> Self {
        Self {
            kind,
            line,
            column,
            source: None,
        }
    }

    /// Creates a parse error from a [`crashtrace_common::Location`].
    pub fn from_location(kind: ParseErrorKind, location: &crashtrace_common::Location) -> Self {
        Self::new(kind, location.line(), location.column())
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }
}

/// The reason a document failed to deserialize into a [`crate::Stacktrace`].
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentErrorKind {
    /// A key was missing or held a value of the wrong JSON type.
    DocumentShape {
        /// Dotted path to the offending key, e.g. `"threads[0].frames[2].address"`.
        path: String,
        /// Description of the expected shape, e.g. `"a non-negative integer"`.
        expected: &'static str,
    },
    /// The `"type"` key held a string that is not one of the known tag
    /// strings.
    UnknownTag(String),
    /// Deserialization succeeded syntactically but violated a structural
    /// invariant from the data model (see [`ParseErrorKind::InvariantViolation`]).
    InvariantViolation(&'static str),
}

impl fmt::Display for DocumentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentErrorKind::DocumentShape { path, expected } => {
                write!(f, "at `{path}`: expected {expected}")
            }
            DocumentErrorKind::UnknownTag(tag) => write!(f, "unknown dialect tag `{tag}`"),
            DocumentErrorKind::InvariantViolation(which) => {
                write!(f, "invariant violated: {which}")
            }
        }
    }
}

/// An error produced by [`crate::from_document`].
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct DocumentError {
    kind: DocumentErrorKind,
}

impl DocumentError {
    /// Creates a new document error.
    pub fn new(kind: DocumentErrorKind) -> Self {
        Self { kind }
    }

    /// Shorthand for [`DocumentErrorKind::DocumentShape`].
    pub fn shape(path: impl Into<String>, expected: &'static str) -> Self {
        Self::new(DocumentErrorKind::DocumentShape {
            path: path.into(),
            expected,
        })
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &DocumentErrorKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::new(ParseErrorKind::ExpectedToken("'#'"), 3, 5);
        assert_eq!(err.to_string(), "3:5: expected '#'");
    }

    #[test]
    fn document_error_display() {
        let err = DocumentError::shape("threads[0].tid", "an integer");
        assert_eq!(
            err.to_string(),
            "at `threads[0].tid`: expected an integer"
        );
    }
}
