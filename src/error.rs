//! Error types for the interpreter.

use thiserror::Error;

use crate::ast::{NodeId, NodeKind};
use crate::value::RuntimeValue;

/// Source location information for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for the interpreter.
#[derive(Debug, Error)]
pub enum Error {
    #[error("SyntaxError: {message} at {location}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    #[error("TypeError: {message}")]
    Type { message: String },

    #[error("ReferenceError: {message}")]
    Reference { message: String },

    /// An AST node kind the evaluator has no handler for. Fatal unless the
    /// runtime is configured with `skip_unsupported_nodes`.
    #[error("Unsupported node kind: {kind}")]
    Unsupported { kind: NodeKind, node: NodeId },

    /// A guest `throw`. Caught only by a guest `try`/`catch`; otherwise it
    /// surfaces to the host carrying the thrown value unmodified.
    #[error("Uncaught {value:?}")]
    Thrown { value: RuntimeValue },

    /// A defect in the evaluator or one of its collaborators. Never
    /// user-recoverable.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Error::Syntax {
            message: message.into(),
            location: SourceLocation { line, column },
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl std::fmt::Display) -> Self {
        Error::Reference {
            message: format!("{name} is not defined"),
        }
    }

    pub fn not_initialized(name: impl std::fmt::Display) -> Self {
        Error::Reference {
            message: format!("Cannot access '{name}' before initialization"),
        }
    }

    pub fn thrown(value: RuntimeValue) -> Self {
        Error::Thrown { value }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Whether this error is a guest-level throw (catchable by guest code).
    pub fn is_guest_throw(&self) -> bool {
        matches!(self, Error::Thrown { .. })
    }
}
