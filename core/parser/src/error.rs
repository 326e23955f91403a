//! FILENAME: core/parser/src/error.rs
//! PURPOSE: Error types raised while lexing and parsing a document.
//! CONTEXT: Syntax errors are language-conformance failures. Security errors
//! are resource-limit violations (nesting depth, token count) and are kept
//! separate so hosts can treat them as an abuse signal.

use crate::token::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Security error at {line}:{column}: {message}")]
    Security {
        message: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        ParseError::Syntax {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn security(message: impl Into<String>, span: Span) -> Self {
        ParseError::Security {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax { message, .. } | ParseError::Security { message, .. } => message,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::Syntax { line, .. } | ParseError::Security { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Syntax { column, .. } | ParseError::Security { column, .. } => *column,
        }
    }

    pub fn is_security(&self) -> bool {
        matches!(self, ParseError::Security { .. })
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
