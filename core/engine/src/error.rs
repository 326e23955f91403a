//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Error type returned by evaluation.
//! CONTEXT: Every variant carries the 1-based line and column of the node
//! that failed. Dimensional errors are kept apart from other evaluation
//! failures so callers can tell unit mistakes from bad input.

use calcmark_parser::{ParseError, Span};
use thiserror::Error;

/// Errors raised while evaluating a document. Parse errors pass through
/// unchanged so callers see one error type from `evaluate_document`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Undefined variable, division by zero, wrong operand type.
    #[error("Evaluation error at {line}:{column}: {message}")]
    Evaluation {
        message: String,
        line: usize,
        column: usize,
    },

    /// Incompatible units or currencies in one operation.
    #[error("Dimensional error at {line}:{column}: {message}")]
    Dimensional {
        message: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EvalError {
    pub fn evaluation(message: impl Into<String>, span: Span) -> Self {
        EvalError::Evaluation {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn dimensional(message: impl Into<String>, span: Span) -> Self {
        EvalError::Dimensional {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            EvalError::Evaluation { message, .. } | EvalError::Dimensional { message, .. } => {
                message
            }
            EvalError::Parse(e) => e.message(),
        }
    }

    pub fn line(&self) -> usize {
        match self {
            EvalError::Evaluation { line, .. } | EvalError::Dimensional { line, .. } => *line,
            EvalError::Parse(e) => e.line(),
        }
    }

    pub fn column(&self) -> usize {
        match self {
            EvalError::Evaluation { column, .. } | EvalError::Dimensional { column, .. } => *column,
            EvalError::Parse(e) => e.column(),
        }
    }

    pub fn is_dimensional(&self) -> bool {
        matches!(self, EvalError::Dimensional { .. })
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
