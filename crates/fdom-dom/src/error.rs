#![forbid(unsafe_code)]

//! Errors raised while parsing tag strings and building elements.

use std::fmt;

/// Errors from element construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The tag string has no tag name (`""`, `"#id"`, `".cls"`).
    EmptyTag { spec: String },
    /// An id segment appeared after a class segment.
    IdAfterClass { spec: String },
    /// More than one id segment.
    DuplicateId { spec: String },
    /// A `#` or `.` with nothing behind it.
    EmptySegment { spec: String },
    /// A node argument could not be attached where it was placed.
    InvalidInsertion { what: &'static str },
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTag { spec } => write!(f, "tag string {spec:?} has no tag name"),
            Self::IdAfterClass { spec } => {
                write!(f, "tag string {spec:?} places an id after a class")
            }
            Self::DuplicateId { spec } => write!(f, "tag string {spec:?} has more than one id"),
            Self::EmptySegment { spec } => {
                write!(f, "tag string {spec:?} has an empty id or class segment")
            }
            Self::InvalidInsertion { what } => write!(f, "cannot insert {what} here"),
        }
    }
}

impl std::error::Error for DomError {}
