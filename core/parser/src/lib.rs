//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the CalcMark parser.
//! CONTEXT: This crate exposes the lexer, unit registry, parser, and AST
//! needed to turn calculation lines into expression trees. Evaluation lives
//! in the engine crate.
//!
//! PIPELINE: Document Text --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, % (modulus), ^ (power)
//! - Comparison: ==, !=, <, >, <=, >=
//! - Literals: 1,234 / 1.5k / 1.23e10 / 5% / $100 / 100 USD / 5 kg / 3 days
//! - Dates and times: March 15, Jan 1 2025, 10:30, 3pm, today, next week
//! - Variables: x = 5, @globals.tax = 8%
//! - Functions: avg(1, 2), sqrt(16), average of 1, 2, square root of 16
//! - Natural constructs: x in cm, x as napkin, 100 MB per second,
//!   rate over 1 day, load at 500 req/s per server, 99.9% downtime per month

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod units;


// Re-export commonly used types for convenience
pub use ast::{
    BinaryOperator, BuiltinFunction, ComparisonOperator, Expression, ExpressionKind, Period,
    RelativeDate, TimeUnit, UnaryOperator,
};
pub use config::{ParserConfig, MAX_NESTING_DEPTH, MAX_TOKEN_COUNT};
pub use error::{ParseError, ParseResult};
pub use lexer::{boolean_keyword, lex, lex_bytes, Lexer};
pub use parser::{parse, parse_with_config, Parser};
pub use token::{Span, Token, TokenKind};
