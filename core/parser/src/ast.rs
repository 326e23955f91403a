//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for CalcMark lines.
//! CONTEXT: After the Lexer tokenizes a line, the Parser converts those
//! tokens into this tree structure. The Evaluator then traverses this tree
//! to compute a typed value.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: numbers, currency, quantities, rates, dates, times, durations,
//!   relative dates (today, next week), booleans
//! - Identifiers and assignments (x = 5), frontmatter assignments (@globals.x = 5)
//! - Binary operations: +, -, *, /, %, ^
//! - Comparisons: ==, !=, <, >, <=, >= (one per expression)
//! - Unary operations: -, +
//! - Function calls: avg(1, 2), sqrt(16), plus the natural-language forms
//! - Unit conversion (x in cm), napkin rounding (x as napkin), 20% of x

use crate::token::Span;
use rust_decimal::Decimal;
use serde::Serialize;

/// A parsed line. Every node carries the source range it was parsed from.
/// Nodes are never mutated after the parser returns them; children are owned.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Expression { kind, span }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub enum ExpressionKind {
    Number(Decimal),

    /// `$100`, `100 USD`. The code is always the canonical 3-letter form.
    Currency {
        amount: Decimal,
        symbol: String,
        code: String,
    },

    /// `5 kg`, `1 nautical mile`, `100cm`. The unit is registry-canonical.
    Quantity {
        amount: Decimal,
        unit: String,
    },

    /// `100 MB/s`, `$50 per hour`. The amount is any expression that
    /// evaluates to a Number, Currency or Quantity.
    Rate {
        amount: Box<Expression>,
        per: TimeUnit,
    },

    /// `March 15` or `Jan 1 2025`; a missing year resolves to the current one.
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

    Duration {
        amount: Decimal,
        unit: TimeUnit,
    },

    RelativeDate(RelativeDate),

    Boolean(bool),

    Identifier(String),

    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    Comparison {
        left: Box<Expression>,
        op: ComparisonOperator,
        right: Box<Expression>,
    },

    Assignment {
        name: String,
        value: Box<Expression>,
    },

    /// Both `avg(1, 2)` and `average of 1, 2` produce this node.
    FunctionCall {
        func: BuiltinFunction,
        args: Vec<Expression>,
    },

    /// `x in cm`. The target is canonicalized: a registry unit, a time unit
    /// name, or a currency code.
    UnitConversion {
        value: Box<Expression>,
        target: String,
    },

    /// `x as napkin`
    NapkinConversion {
        value: Box<Expression>,
    },

    /// `20% of 500`
    PercentageOf {
        percent: Box<Expression>,
        base: Box<Expression>,
    },

    /// `@globals.tax = 8%`
    FrontmatterAssignment {
        namespace: String,
        key: String,
        value: Box<Expression>,
    },
}

/// Binary arithmetic operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Power,    // ^ (highest precedence among binary ops)
}

/// Comparison operators. Non-associative: at most one per expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum ComparisonOperator {
    Equal,        // ==
    NotEqual,     // !=
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum UnaryOperator {
    Negate, // -
    Plus,   // +
}

/// Normalized time units. Months are 30 days and years 365 days wherever a
/// fixed length is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 7] = [
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
    ];

    /// Normalizes a time-unit word. Abbreviations are case-sensitive so that
    /// `W` (watt) and `M` stay free; full words are case-insensitive.
    pub fn parse(word: &str) -> Option<TimeUnit> {
        let unit = match word {
            "s" | "sec" | "secs" => TimeUnit::Second,
            "min" | "mins" => TimeUnit::Minute,
            "h" | "hr" | "hrs" => TimeUnit::Hour,
            "d" => TimeUnit::Day,
            "w" | "wk" | "wks" => TimeUnit::Week,
            "mo" | "mos" => TimeUnit::Month,
            "y" | "yr" | "yrs" => TimeUnit::Year,
            _ => match word.to_ascii_lowercase().as_str() {
                "second" | "seconds" => TimeUnit::Second,
                "minute" | "minutes" => TimeUnit::Minute,
                "hour" | "hours" => TimeUnit::Hour,
                "day" | "days" => TimeUnit::Day,
                "week" | "weeks" => TimeUnit::Week,
                "month" | "months" => TimeUnit::Month,
                "year" | "years" => TimeUnit::Year,
                _ => return None,
            },
        };
        Some(unit)
    }

    /// Length of one unit in seconds.
    pub fn seconds(self) -> Decimal {
        Decimal::from(match self {
            TimeUnit::Second => 1i64,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            TimeUnit::Day => 86_400,
            TimeUnit::Week => 604_800,
            TimeUnit::Month => 2_592_000,
            TimeUnit::Year => 31_536_000,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Calendar periods usable after this/next/last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn parse(word: &str) -> Option<Period> {
        match word.to_ascii_lowercase().as_str() {
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "year" => Some(Period::Year),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelativeDate {
    Today,
    Tomorrow,
    Yesterday,
    Now,
    This(Period),
    Next(Period),
    Last(Period),
}

impl RelativeDate {
    pub fn keyword(word: &str) -> Option<RelativeDate> {
        match word.to_ascii_lowercase().as_str() {
            "today" => Some(RelativeDate::Today),
            "tomorrow" => Some(RelativeDate::Tomorrow),
            "yesterday" => Some(RelativeDate::Yesterday),
            "now" => Some(RelativeDate::Now),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelativeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let period = |p: &Period| match p {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        };
        match self {
            RelativeDate::Today => write!(f, "today"),
            RelativeDate::Tomorrow => write!(f, "tomorrow"),
            RelativeDate::Yesterday => write!(f, "yesterday"),
            RelativeDate::Now => write!(f, "now"),
            RelativeDate::This(p) => write!(f, "this {}", period(p)),
            RelativeDate::Next(p) => write!(f, "next {}", period(p)),
            RelativeDate::Last(p) => write!(f, "last {}", period(p)),
        }
    }
}

/// Built-in functions. Natural-language phrases desugar to these.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum BuiltinFunction {
    Avg,
    Sqrt,
    ConvertRate,
    Accumulate,
    Capacity,
    Requires,
    Downtime,
}

impl BuiltinFunction {
    /// Looks up a function by its call-syntax name (case-insensitive).
    pub fn from_name(name: &str) -> Option<BuiltinFunction> {
        match name.to_ascii_lowercase().as_str() {
            "avg" | "average" => Some(BuiltinFunction::Avg),
            "sqrt" => Some(BuiltinFunction::Sqrt),
            "convert_rate" => Some(BuiltinFunction::ConvertRate),
            "accumulate" => Some(BuiltinFunction::Accumulate),
            "capacity" => Some(BuiltinFunction::Capacity),
            "requires" => Some(BuiltinFunction::Requires),
            "downtime" => Some(BuiltinFunction::Downtime),
            _ => None,
        }
    }

    /// Canonical name, shared by the call and natural-language syntaxes.
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Avg => "avg",
            BuiltinFunction::Sqrt => "sqrt",
            BuiltinFunction::ConvertRate => "convert_rate",
            BuiltinFunction::Accumulate => "accumulate",
            BuiltinFunction::Capacity => "capacity",
            BuiltinFunction::Requires => "requires",
            BuiltinFunction::Downtime => "downtime",
        }
    }

    /// Minimum and maximum argument counts (`None` = unbounded).
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            BuiltinFunction::Avg => (1, None),
            BuiltinFunction::Sqrt => (1, Some(1)),
            BuiltinFunction::ConvertRate => (2, Some(2)),
            BuiltinFunction::Accumulate => (2, Some(2)),
            BuiltinFunction::Capacity => (3, Some(4)),
            BuiltinFunction::Requires => (2, Some(3)),
            BuiltinFunction::Downtime => (2, Some(2)),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.is_none_or(|m| count <= m)
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::Power => write!(f, "^"),
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOperator::Equal => write!(f, "=="),
            ComparisonOperator::NotEqual => write!(f, "!="),
            ComparisonOperator::LessThan => write!(f, "<"),
            ComparisonOperator::GreaterThan => write!(f, ">"),
            ComparisonOperator::LessEqual => write!(f, "<="),
            ComparisonOperator::GreaterEqual => write!(f, ">="),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
        }
    }
}
