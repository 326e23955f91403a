//! FILENAME: core/engine/src/context.rs
//! PURPOSE: Variable storage for one evaluation session.
//! CONTEXT: A Context is created per document and lives for the whole
//! document; assignments on one line are visible on every later line.
//! Names are case-sensitive and compared code point by code point.

use crate::value::Value;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Context {
    variables: HashMap<String, Value>,
    /// Reference instant for `today`, `now`, `next week` and dates without a year.
    now: NaiveDateTime,
}

impl Context {
    /// Creates an empty context anchored at the local clock.
    pub fn new() -> Self {
        Context::with_now(Local::now().naive_local())
    }

    /// Creates an empty context anchored at midnight of `today`.
    pub fn with_today(today: NaiveDate) -> Self {
        Context::with_now(today.and_time(NaiveTime::MIN))
    }

    pub fn with_now(now: NaiveDateTime) -> Self {
        Context {
            variables: HashMap::new(),
            now,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Stores `value` under `name`, returning the previous value if any.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Removes every variable, keeping the reference date.
    pub fn clear(&mut self) {
        self.variables.clear();
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_names_are_case_sensitive() {
        let mut ctx = Context::with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        ctx.set("Total", Value::Number(Decimal::ONE));
        assert!(ctx.contains("Total"));
        assert!(!ctx.contains("total"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let mut ctx = Context::with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(ctx.set("x", Value::Number(Decimal::ONE)), None);
        assert_eq!(
            ctx.set("x", Value::Number(Decimal::TWO)),
            Some(Value::Number(Decimal::ONE))
        );
        assert_eq!(ctx.get("x"), Some(&Value::Number(Decimal::TWO)));
        ctx.clear();
        assert!(ctx.is_empty());
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_unicode_names_are_not_normalized() {
        let mut ctx = Context::with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        // Precomposed vs decomposed e-acute.
        ctx.set("caf\u{e9}", Value::Boolean(true));
        assert!(ctx.get("cafe\u{301}").is_none());
    }
}
