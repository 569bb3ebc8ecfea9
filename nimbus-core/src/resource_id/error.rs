//! Errors produced while parsing or building resource IDs

use thiserror::Error;

/// Why an input did not conform to a resource ID shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("ID was empty")]
    Empty,

    #[error("ID must start with '/'")]
    MissingLeadingSlash,

    /// A literal or value segment was expected but the path ended
    #[error("missing segment '{0}'")]
    MissingSegment(&'static str),

    #[error("expected segment '{expected}' but found '{found}'")]
    UnexpectedSegment {
        expected: &'static str,
        found: String,
    },

    #[error("empty value for '{0}'")]
    EmptyValue(&'static str),

    #[error("unexpected trailing content '{0}'")]
    TrailingContent(String),

    #[error("expected {expected} values but got {got}")]
    FieldCountMismatch { expected: usize, got: usize },

    #[error("key/value pairs are unbalanced")]
    UnbalancedPairs,

    /// A parsed ID of one shape was converted to the typed ID of another
    #[error("expected a {expected} ID but got a {found} ID")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// An input did not conform to the declared shape.
///
/// Carries the offending input and the shape name; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parsing {shape} ID {input:?}: {reason}")]
pub struct ResourceIdError {
    pub shape: &'static str,
    pub input: String,
    pub reason: MalformedReason,
}

impl ResourceIdError {
    pub fn new(shape: &'static str, input: impl Into<String>, reason: MalformedReason) -> Self {
        Self {
            shape,
            input: input.into(),
            reason,
        }
    }
}
