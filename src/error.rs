use std::fmt;

use thiserror::Error;

use crate::path::Path;
use crate::value::ValueKind;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (byte offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

/// A parse error with span information (begin..end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Start of the offending region
    pub begin: Position,
    /// End of the offending region (exclusive)
    pub end: Position,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, begin: Position, end: Position) -> Self {
        SyntaxError {
            message: message.into(),
            begin,
            end,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.begin == self.end {
            write!(
                f,
                "{}:{}: {}",
                self.begin.line, self.begin.column, self.message
            )
        } else {
            write!(
                f,
                "{}:{}-{}:{}: {}",
                self.begin.line, self.begin.column, self.end.line, self.end.column, self.message
            )
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Stable discriminant of an [`OmlError`], for callers that map errors to codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    PathSyntax,
    NoSuchField,
    IndexOutOfRange,
    NotAMap,
    NotAnArray,
    TypeMismatch,
    CyclicReference,
    InvalidOperation,
    DepthLimitExceeded,
    Mutation,
}

/// Every failure the parser, evaluator and mutator can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OmlError {
    #[error("syntax error at {0}")]
    Syntax(#[from] SyntaxError),

    #[error("invalid path \"{path}\": {message}")]
    PathSyntax { path: String, message: String },

    #[error("no field \"{field}\" in map at {path}")]
    NoSuchField { path: String, field: String },

    #[error("index {index} out of range for array of length {len} at {path}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("expected a map at {path}, found {found}")]
    NotAMap { path: String, found: ValueKind },

    #[error("expected an array at {path}, found {found}")]
    NotAnArray { path: String, found: ValueKind },

    #[error("expected {expected} at {path}, found {found}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The cycle lists every node on the loop, starting and ending with the same node.
    #[error("cyclic reference: {}", .cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    #[error("invalid operation at {path}: {message}")]
    InvalidOperation { path: String, message: String },

    #[error("evaluation depth limit of {limit} exceeded at {path}")]
    DepthLimitExceeded { path: String, limit: usize },

    #[error("cannot mutate {path}: {message}")]
    Mutation { path: String, message: String },
}

impl OmlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OmlError::Syntax(_) => ErrorKind::Syntax,
            OmlError::PathSyntax { .. } => ErrorKind::PathSyntax,
            OmlError::NoSuchField { .. } => ErrorKind::NoSuchField,
            OmlError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            OmlError::NotAMap { .. } => ErrorKind::NotAMap,
            OmlError::NotAnArray { .. } => ErrorKind::NotAnArray,
            OmlError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            OmlError::CyclicReference { .. } => ErrorKind::CyclicReference,
            OmlError::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            OmlError::DepthLimitExceeded { .. } => ErrorKind::DepthLimitExceeded,
            OmlError::Mutation { .. } => ErrorKind::Mutation,
        }
    }

    pub(crate) fn no_such_field(at: &Path, field: &str) -> Self {
        OmlError::NoSuchField {
            path: at.describe(),
            field: field.to_string(),
        }
    }

    pub(crate) fn index_out_of_range(at: &Path, index: usize, len: usize) -> Self {
        OmlError::IndexOutOfRange {
            path: at.describe(),
            index,
            len,
        }
    }

    pub(crate) fn not_a_map(at: &Path, found: ValueKind) -> Self {
        OmlError::NotAMap {
            path: at.describe(),
            found,
        }
    }

    pub(crate) fn not_an_array(at: &Path, found: ValueKind) -> Self {
        OmlError::NotAnArray {
            path: at.describe(),
            found,
        }
    }

    pub(crate) fn invalid_operation(at: &Path, message: String) -> Self {
        OmlError::InvalidOperation {
            path: at.describe(),
            message,
        }
    }

    pub(crate) fn mutation(at: &Path, message: impl Into<String>) -> Self {
        OmlError::Mutation {
            path: at.describe(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OmlError>;
