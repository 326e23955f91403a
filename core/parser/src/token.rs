//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the CalcMark lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.
//! Literal tokens carry their normalized value (the decimal after suffix
//! expansion, the canonical unit, the ISO currency code) while `lexeme` keeps
//! the text exactly as it appeared in the source line.

use crate::ast::{RelativeDate, TimeUnit};
use rust_decimal::Decimal;
use serde::Serialize;

/// A source location: 1-based line, 1-based code point columns, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
}

impl Span {
    pub const fn new(line: usize, column: usize, end_column: usize) -> Self {
        Span {
            line,
            column,
            end_column,
        }
    }

    /// Smallest span covering both `self` and `other` on the same line.
    pub fn to(self, other: Span) -> Span {
        if other.line != self.line {
            return self;
        }
        Span {
            line: self.line,
            column: self.column.min(other.column),
            end_column: self.end_column.max(other.end_column),
        }
    }
}

/// Token kinds recognized by the lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    // Literals
    Number(Decimal),
    /// `5%` lexes as 0.05.
    Percent(Decimal),
    Currency {
        amount: Decimal,
        symbol: String,
        code: String,
    },
    Quantity {
        amount: Decimal,
        unit: String,
    },
    Duration {
        amount: Decimal,
        unit: TimeUnit,
    },
    Date {
        month: u32,
        day: u32,
        year: Option<i32>,
    },
    Time {
        hour: u32,
        minute: u32,
        second: u32,
    },
    RelativeDate(RelativeDate),
    Boolean(bool),
    Identifier(String),

    // Fused natural-language function phrases
    FuncAverageOf,
    FuncSquareRootOf,

    // Operators
    Plus,
    Minus,
    Asterisk,
    Slash,
    /// `%` used as the modulus operator (not attached to a number).
    Modulo,
    Caret,
    Assign,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,

    // Delimiters
    LParen,
    RParen,
    Comma,
    /// Frontmatter marker: @globals.rate = 5
    At,
    Dot,

    // Special
    Newline,
    EOF,
}

impl TokenKind {
    /// Returns the identifier name if this is an identifier token.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Checks for a contextual keyword such as `per` or `in` (case-insensitive).
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, TokenKind::Identifier(name) if name.eq_ignore_ascii_case(word))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Percent(p) => write!(f, "{}%", p * Decimal::ONE_HUNDRED),
            TokenKind::Currency { amount, code, .. } => write!(f, "{} {}", amount, code),
            TokenKind::Quantity { amount, unit } => write!(f, "{} {}", amount, unit),
            TokenKind::Duration { amount, unit } => write!(f, "{} {}", amount, unit),
            TokenKind::Date { month, day, year } => match year {
                Some(y) => write!(f, "{}-{:02}-{:02}", y, month, day),
                None => write!(f, "--{:02}-{:02}", month, day),
            },
            TokenKind::Time {
                hour,
                minute,
                second,
            } => write!(f, "{:02}:{:02}:{:02}", hour, minute, second),
            TokenKind::RelativeDate(r) => write!(f, "{}", r),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::FuncAverageOf => write!(f, "average of"),
            TokenKind::FuncSquareRootOf => write!(f, "square root of"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Modulo => write!(f, "%"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Equal => write!(f, "=="),
            TokenKind::NotEqual => write!(f, "!="),
            TokenKind::LessThan => write!(f, "<"),
            TokenKind::GreaterThan => write!(f, ">"),
            TokenKind::LessEqual => write!(f, "<="),
            TokenKind::GreaterEqual => write!(f, ">="),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::At => write!(f, "@"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::EOF => write!(f, "end of input"),
        }
    }
}
