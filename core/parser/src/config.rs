//! FILENAME: core/parser/src/config.rs
//! PURPOSE: Resource limits applied while parsing.
//! CONTEXT: Hosts may load these from their own configuration files (the
//! struct deserializes with serde, missing fields fall back to defaults).

use serde::{Deserialize, Serialize};

/// Default maximum nesting of parentheses and unary operators.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Default maximum number of tokens in one parse.
pub const MAX_TOKEN_COUNT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub max_nesting_depth: usize,
    pub max_token_count: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_nesting_depth: MAX_NESTING_DEPTH,
            max_token_count: MAX_TOKEN_COUNT,
        }
    }
}
