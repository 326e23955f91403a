//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the CalcMark evaluator.
//! CONTEXT: Re-exports public types and modules for use by host crates.
//! A host keeps one Context per document and feeds it either parsed
//! statements (`evaluate`) or raw text (`evaluate_document`).

pub mod arithmetic;
pub mod context;
pub mod convert;
pub mod dates;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod value;

// Re-export commonly used types at the crate root
pub use context::Context;
pub use error::{EvalError, EvalResult};
pub use evaluator::{evaluate, evaluate_document, Evaluator};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn it_evaluates_a_document() {
        let mut ctx = Context::with_today(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let values = evaluate_document("rent = $1,200\nrent * 12", &mut ctx).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1], Value::currency(Decimal::from(14_400), "USD"));
        assert_eq!(values[1].to_string(), "$14400");
    }

    #[test]
    fn it_surfaces_parse_errors() {
        let mut ctx = Context::new();
        let err = evaluate_document("1 +", &mut ctx).unwrap_err();
        assert!(matches!(err, EvalError::Parse(_)));
        assert!(ctx.is_empty());
    }

    #[test]
    fn it_stops_at_the_first_error() {
        let mut ctx = Context::new();
        let err = evaluate_document("a = 1\nb = a / 0\nc = 3", &mut ctx).unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(ctx.contains("a"));
        assert!(!ctx.contains("c"));
    }
}
