//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for CalcMark evaluator integration tests.

#![allow(dead_code)]

use calcmark_engine::{evaluate_document, Context, EvalError, Value};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Reference date every harness evaluates against.
pub const TODAY: (i32, u32, u32) = (2025, 6, 15);

/// Test harness holding one document session.
pub struct TestHarness {
    pub context: Context,
}

impl TestHarness {
    /// Create a harness with an empty context pinned to `TODAY`.
    pub fn new() -> Self {
        let (y, m, d) = TODAY;
        TestHarness {
            context: Context::with_today(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
        }
    }

    /// Evaluate a document and return every statement value.
    pub fn run(&mut self, text: &str) -> Result<Vec<Value>, EvalError> {
        evaluate_document(text, &mut self.context)
    }

    /// Evaluate a document and return the value of its last statement.
    pub fn last(&mut self, text: &str) -> Value {
        match self.run(text) {
            Ok(mut values) => values.pop().expect("document has no statements"),
            Err(e) => panic!("{:?} failed: {}", text, e),
        }
    }

    /// Evaluate a document that is expected to fail.
    pub fn error(&mut self, text: &str) -> EvalError {
        match self.run(text) {
            Ok(values) => panic!("{:?} unexpectedly produced {:?}", text, values),
            Err(e) => e,
        }
    }

    /// Evaluate and render the last value the way a host would show it.
    pub fn display(&mut self, text: &str) -> String {
        self.last(text).to_string()
    }
}

/// One-shot evaluation in a fresh harness.
pub fn eval(text: &str) -> Value {
    TestHarness::new().last(text)
}

/// One-shot failing evaluation in a fresh harness.
pub fn eval_err(text: &str) -> EvalError {
    TestHarness::new().error(text)
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn num(s: &str) -> Value {
    Value::Number(dec(s))
}

pub fn date(y: i32, m: u32, d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}
