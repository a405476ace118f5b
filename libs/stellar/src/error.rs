//! Error types for the Stellar engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Broad phase an [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed token.
    Lex,
    /// Grammar violation, or a call whose shape is wrong (unknown name, arity).
    Parse,
    /// Failure while computing a value.
    Evaluation,
}

/// Stellar lexing, parsing and evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Lex error at offset {offset}: {message} (found {found:?})")]
    Lex {
        offset: usize,
        found: char,
        message: String,
    },

    #[error("Parse error at offset {position}: {message} (token {token:?})")]
    Parse {
        token: String,
        position: usize,
        message: String,
    },

    #[error("Function not found: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Predicate did not return a boolean (got {0})")]
    NotBoolean(String),

    #[error("Function {function} failed to initialize: {message}")]
    Initialization { function: String, message: String },

    #[error("Function already registered: {0}")]
    DuplicateFunction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lex { .. } => ErrorKind::Lex,
            Error::Parse { .. } | Error::UnknownFunction(_) | Error::Arity { .. } => {
                ErrorKind::Parse
            }
            _ => ErrorKind::Evaluation,
        }
    }

    pub(crate) fn parse_at(token: &crate::token::Token, message: impl Into<String>) -> Self {
        Error::Parse {
            token: token.text.clone(),
            position: token.offset,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Error::TypeError(message.into())
    }
}
