//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to typed values.
//! CONTEXT: After a document is parsed into one Expression per line, this
//! module walks each tree against the shared variable Context, strictly in
//! source order. The first error aborts evaluation of the document.
//!
//! SUPPORTED FEATURES:
//! - Literal evaluation: numbers, currency, quantities, rates, durations,
//!   dates, times, relative dates, booleans
//! - Variable lookup with boolean keyword and constant (pi, e) fallbacks
//! - Assignment and @globals frontmatter assignment
//! - Binary operations and comparisons (see `arithmetic`)
//! - Unary operations: - (negation), + (identity)
//! - Functions: avg, sqrt, convert_rate, accumulate, capacity, requires, downtime
//! - Unit conversion (`in`), napkin rounding, percentage-of

use calcmark_parser::units::is_currency_code;
use calcmark_parser::{
    boolean_keyword, parse, BinaryOperator, BuiltinFunction, Expression, ExpressionKind, Span, TimeUnit,
    UnaryOperator,
};
use chrono::NaiveTime;
use rust_decimal::Decimal;

use crate::arithmetic;
use crate::context::Context;
use crate::convert::{convert_duration, convert_quantity};
use crate::dates;
use crate::error::{EvalError, EvalResult};
use crate::functions;
use crate::value::Value;

/// The only frontmatter namespace that assigns variables.
const GLOBALS_NAMESPACE: &str = "globals";

/// Evaluates parsed statements in order, producing one value per statement.
pub fn evaluate(nodes: &[Expression], context: &mut Context) -> EvalResult<Vec<Value>> {
    let mut evaluator = Evaluator::new(context);
    nodes
        .iter()
        .map(|node| {
            log::trace!("evaluating line {}", node.span.line);
            evaluator.evaluate(node)
        })
        .collect()
}

/// Parses and evaluates a whole document against `context`.
pub fn evaluate_document(text: &str, context: &mut Context) -> EvalResult<Vec<Value>> {
    let nodes = parse(text)?;
    log::debug!("evaluating {} statement(s)", nodes.len());
    evaluate(&nodes, context)
}

/// The expression evaluator.
/// Holds the session context exclusively while it runs.
pub struct Evaluator<'a> {
    context: &'a mut Context,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a mut Context) -> Self {
        Evaluator { context }
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    /// Evaluates an AST expression and returns its value.
    pub fn evaluate(&mut self, expr: &Expression) -> EvalResult<Value> {
        let span = expr.span;
        match &expr.kind {
            ExpressionKind::Number(n) => Ok(Value::Number(*n)),
            ExpressionKind::Currency { amount, code, .. } => Ok(Value::currency(*amount, code)),
            ExpressionKind::Quantity { amount, unit } => Ok(Value::quantity(*amount, unit.clone())),
            ExpressionKind::Duration { amount, unit } => Ok(Value::Duration {
                amount: *amount,
                unit: *unit,
            }),
            ExpressionKind::Boolean(b) => Ok(Value::Boolean(*b)),
            ExpressionKind::Rate { .. } | ExpressionKind::BinaryOp { .. } => self.eval_chain(expr),
            ExpressionKind::Date { month, day, year } => {
                dates::date_from_parts(*month, *day, *year, self.context.today())
                    .map(Value::Date)
                    .ok_or_else(|| {
                        EvalError::evaluation(format!("invalid date {}/{}", month, day), span)
                    })
            }
            ExpressionKind::Time {
                hour,
                minute,
                second,
            } => NaiveTime::from_hms_opt(*hour, *minute, *second)
                .map(Value::Time)
                .ok_or_else(|| EvalError::evaluation("invalid time of day", span)),
            ExpressionKind::RelativeDate(relative) => {
                dates::resolve_relative(*relative, self.context.now()).ok_or_else(|| {
                    EvalError::evaluation(format!("'{}' is out of range", relative), span)
                })
            }
            ExpressionKind::Identifier(name) => self.lookup(name, span),
            ExpressionKind::UnaryOp { op, operand } => self.eval_unary_op(*op, operand, span),
            ExpressionKind::Comparison { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                arithmetic::compare(*op, &left, &right, span)
            }
            ExpressionKind::Assignment { name, value } => self.assign(name, value),
            ExpressionKind::FunctionCall { func, args } => self.eval_function(*func, args, span),
            ExpressionKind::UnitConversion { value, target } => {
                let value = self.evaluate(value)?;
                convert_to(value, target, span)
            }
            ExpressionKind::NapkinConversion { value } => {
                let value = self.evaluate(value)?;
                functions::napkin(&value, span)
            }
            ExpressionKind::PercentageOf { percent, base } => {
                let fraction = match self.evaluate(percent)? {
                    Value::Number(n) => n,
                    other => {
                        return Err(EvalError::evaluation(
                            format!("expected a percentage, got {}", other.type_name()),
                            span,
                        ))
                    }
                };
                let base = self.evaluate(base)?;
                arithmetic::scale(&base, fraction, span)
            }
            ExpressionKind::FrontmatterAssignment {
                namespace,
                key,
                value,
            } => {
                if namespace != GLOBALS_NAMESPACE {
                    return Err(EvalError::evaluation(
                        format!("unknown frontmatter namespace '@{}'", namespace),
                        span,
                    ));
                }
                self.assign(key, value)
            }
        }
    }

    fn assign(&mut self, name: &str, value: &Expression) -> EvalResult<Value> {
        let value = self.evaluate(value)?;
        log::debug!("assign {} = {}", name, value);
        self.context.set(name, value.clone());
        Ok(value)
    }

    /// Variables first, then boolean keywords, then the constants `pi` and `e`.
    fn lookup(&self, name: &str, span: Span) -> EvalResult<Value> {
        if let Some(value) = self.context.get(name) {
            return Ok(value.clone());
        }
        if let Some(b) = boolean_keyword(name) {
            return Ok(Value::Boolean(b));
        }
        match name {
            "pi" => Ok(Value::Number(Decimal::PI)),
            "e" => Ok(Value::Number(Decimal::E)),
            _ => Err(EvalError::evaluation(
                format!("undefined variable '{}'", name),
                span,
            )),
        }
    }

    /// Evaluates a left-associative chain (`a + b - c`, `x / s / s`) with a
    /// loop. The parser builds these chains without nesting, so their depth
    /// is bounded only by the token limit.
    fn eval_chain(&mut self, expr: &Expression) -> EvalResult<Value> {
        let mut steps = Vec::new();
        let mut head = expr;
        loop {
            match &head.kind {
                ExpressionKind::BinaryOp { left, op, right } => {
                    steps.push(ChainStep::Binary(*op, right.as_ref(), head.span));
                    head = left.as_ref();
                }
                ExpressionKind::Rate { amount, per } => {
                    steps.push(ChainStep::Per(*per, head.span));
                    head = amount.as_ref();
                }
                _ => break,
            }
        }

        let mut acc = self.evaluate(head)?;
        for step in steps.into_iter().rev() {
            acc = match step {
                ChainStep::Binary(op, right, span) => {
                    let right = self.evaluate(right)?;
                    arithmetic::binary(op, &acc, &right, span)?
                }
                ChainStep::Per(per, span) => rate_of(acc, per, span)?,
            };
        }
        Ok(acc)
    }

    fn eval_unary_op(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        span: Span,
    ) -> EvalResult<Value> {
        let value = self.evaluate(operand)?;
        let numeric = value.amount().is_some() || matches!(value, Value::Rate { .. });
        if !numeric {
            return Err(EvalError::evaluation(
                format!("cannot apply unary '{}' to a {}", op, value.type_name()),
                span,
            ));
        }
        match op {
            UnaryOperator::Negate => arithmetic::scale(&value, Decimal::NEGATIVE_ONE, span),
            UnaryOperator::Plus => Ok(value),
        }
    }

    fn eval_function(
        &mut self,
        func: BuiltinFunction,
        args: &[Expression],
        span: Span,
    ) -> EvalResult<Value> {
        if !func.accepts(args.len()) {
            return Err(EvalError::evaluation(
                format!("{}() called with {} argument(s)", func.name(), args.len()),
                span,
            ));
        }

        match func {
            BuiltinFunction::Avg => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                functions::avg(&values, span)
            }
            BuiltinFunction::Sqrt => {
                let value = self.evaluate(&args[0])?;
                functions::sqrt(&value, span)
            }
            BuiltinFunction::ConvertRate => {
                let rate = self.evaluate(&args[0])?;
                let unit = self.time_unit_arg(&args[1])?;
                arithmetic::convert_rate(&rate, unit, span)
            }
            BuiltinFunction::Accumulate => {
                let rate = self.evaluate(&args[0])?;
                let duration = self.evaluate(&args[1])?;
                arithmetic::accumulate(&rate, &duration, span)
            }
            BuiltinFunction::Capacity => {
                let demand = self.evaluate(&args[0])?;
                let capacity = self.evaluate(&args[1])?;
                let unit = label_arg(&args[2])?;
                let buffer = args.get(3).map(|b| self.evaluate(b)).transpose()?;
                functions::capacity(&demand, &capacity, unit, buffer.as_ref(), span)
            }
            BuiltinFunction::Requires => {
                let load = self.evaluate(&args[0])?;
                let capacity = self.evaluate(&args[1])?;
                let buffer = args.get(2).map(|b| self.evaluate(b)).transpose()?;
                functions::requires(&load, &capacity, buffer.as_ref(), span)
            }
            BuiltinFunction::Downtime => {
                let availability = self.evaluate(&args[0])?;
                let unit = self.time_unit_arg(&args[1])?;
                functions::downtime(&availability, unit, span)
            }
        }
    }

    /// A time unit written as a bare word (`hour`), or taken from a duration value.
    fn time_unit_arg(&mut self, arg: &Expression) -> EvalResult<TimeUnit> {
        if let ExpressionKind::Identifier(name) = &arg.kind {
            if let Some(unit) = TimeUnit::parse(name) {
                return Ok(unit);
            }
        }
        match self.evaluate(arg)? {
            Value::Duration { unit, .. } => Ok(unit),
            other => Err(EvalError::evaluation(
                format!("expected a time unit, got {}", other.type_name()),
                arg.span,
            )),
        }
    }
}

/// One link of a left-associative chain, innermost first once reversed.
enum ChainStep<'e> {
    Binary(BinaryOperator, &'e Expression, Span),
    Per(TimeUnit, Span),
}

/// `amount per unit`: plain amounts become rates, rates are re-expressed.
fn rate_of(value: Value, per: TimeUnit, span: Span) -> EvalResult<Value> {
    match value {
        value @ (Value::Number(_) | Value::Currency { .. } | Value::Quantity { .. }) => {
            Ok(Value::rate(value, per))
        }
        rate @ Value::Rate { .. } => arithmetic::convert_rate(&rate, per, span),
        other => Err(EvalError::evaluation(
            format!("a {} cannot be expressed per {}", other.type_name(), per.name()),
            span,
        )),
    }
}

/// The unit label of a capacity clause (`per server`) is a bare word.
fn label_arg(arg: &Expression) -> EvalResult<&str> {
    match &arg.kind {
        ExpressionKind::Identifier(name) => Ok(name),
        _ => Err(EvalError::evaluation(
            "capacity unit must be a plain word such as 'server'",
            arg.span,
        )),
    }
}

/// Applies `value in target`.
fn convert_to(value: Value, target: &str, span: Span) -> EvalResult<Value> {
    let cannot = |value: &Value| {
        EvalError::dimensional(
            format!("cannot convert {} to '{}'", value.type_name(), target),
            span,
        )
    };

    if let Some(unit) = TimeUnit::parse(target) {
        return match value {
            Value::Duration { amount, unit: from } => {
                let amount = convert_duration(amount, from, unit)
                    .ok_or_else(|| arithmetic::overflow(span))?;
                Ok(Value::Duration { amount, unit })
            }
            Value::Number(amount) => Ok(Value::Duration { amount, unit }),
            rate @ Value::Rate { .. } => arithmetic::convert_rate(&rate, unit, span),
            other => Err(cannot(&other)),
        };
    }

    if is_currency_code(target) {
        return match value {
            Value::Currency { amount, code, .. } if code == target => {
                Ok(Value::currency(amount, target))
            }
            Value::Currency { code, .. } => Err(EvalError::dimensional(
                format!("cannot convert {} to {} without an exchange rate", code, target),
                span,
            )),
            Value::Number(amount) => Ok(Value::currency(amount, target)),
            other => Err(cannot(&other)),
        };
    }

    match value {
        Value::Quantity { amount, unit } => match convert_quantity(amount, &unit, target) {
            Some(converted) => Ok(Value::quantity(converted, target)),
            None => Err(EvalError::dimensional(
                format!("cannot convert '{}' to '{}'", unit, target),
                span,
            )),
        },
        Value::Number(amount) => Ok(Value::quantity(amount, target)),
        Value::Rate { amount, per } => Ok(Value::rate(convert_to(*amount, target, span)?, per)),
        other => Err(cannot(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn context() -> Context {
        Context::with_today(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap())
    }

    fn eval(input: &str) -> EvalResult<Value> {
        let mut ctx = context();
        evaluate_document(input, &mut ctx).map(|mut values| values.pop().unwrap())
    }

    fn number(input: &str) -> Decimal {
        match eval(input) {
            Ok(Value::Number(n)) => n,
            other => panic!("{}: expected number, got {:?}", input, other),
        }
    }

    #[test]
    fn test_literal_number() {
        let mut ctx = context();
        let mut eval = Evaluator::new(&mut ctx);
        let expr = Expression::new(ExpressionKind::Number(dec("42")), Span::new(1, 1, 3));
        assert_eq!(eval.evaluate(&expr), Ok(Value::Number(dec("42"))));
    }

    #[test]
    fn test_binary_op_from_nodes() {
        let mut ctx = context();
        let mut eval = Evaluator::new(&mut ctx);
        let lit = |n: &str| Expression::new(ExpressionKind::Number(dec(n)), Span::new(1, 1, 2));
        let expr = Expression::new(
            ExpressionKind::BinaryOp {
                left: Box::new(lit("7")),
                op: BinaryOperator::Modulo,
                right: Box::new(lit("4")),
            },
            Span::new(1, 1, 6),
        );
        assert_eq!(eval.evaluate(&expr), Ok(Value::Number(dec("3"))));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(number("2 + 3 * 4"), dec("14"));
        assert_eq!(number("2 ^ 3 * 4"), dec("32"));
        assert_eq!(number("2 ^ 3 ^ 2"), dec("512"));
        assert_eq!(number("-2 ^ 2"), dec("-4"));
        assert_eq!(number("(2 + 3) * 4"), dec("20"));
    }

    #[test]
    fn test_variables_persist_across_lines() {
        let mut ctx = context();
        let values = evaluate_document("x = 5\ny = x * 2\ny + 1", &mut ctx).unwrap();
        assert_eq!(values[2], Value::Number(dec("11")));
        assert_eq!(ctx.get("y"), Some(&Value::Number(dec("10"))));
    }

    #[test]
    fn test_undefined_variable() {
        let err = eval("1 + missing").unwrap_err();
        assert!(!err.is_dimensional());
        assert!(err.message().contains("missing"));
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn test_boolean_and_constant_fallbacks() {
        assert_eq!(eval("t"), Ok(Value::Boolean(true)));
        assert_eq!(eval("N"), Ok(Value::Boolean(false)));
        assert_eq!(number("pi"), Decimal::PI);
        assert_eq!(number("e"), Decimal::E);
    }

    #[test]
    fn test_frontmatter_globals() {
        let mut ctx = context();
        let values = evaluate_document("@globals.tax = 8%\n$100 * tax", &mut ctx).unwrap();
        assert_eq!(values[1], Value::currency(dec("8"), "USD"));
        let err = eval("@locals.tax = 1").unwrap_err();
        assert!(err.message().contains("@locals"));
    }

    #[test]
    fn test_unary_preserves_unit() {
        assert_eq!(eval("-$5"), Ok(Value::currency(dec("-5"), "USD")));
        assert_eq!(eval("+5 kg"), Ok(Value::quantity(dec("5"), "kg")));
        assert!(eval("-true").is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 m == 100 cm"), Ok(Value::Boolean(true)));
        assert_eq!(eval("$5 < $10"), Ok(Value::Boolean(true)));
        assert_eq!(eval("yes != no"), Ok(Value::Boolean(true)));
        assert_eq!(eval("March 1 < March 2"), Ok(Value::Boolean(true)));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(eval("1 km in m"), Ok(Value::quantity(dec("1000"), "m")));
        assert_eq!(
            eval("90 minutes in hours"),
            Ok(Value::Duration {
                amount: dec("1.5"),
                unit: TimeUnit::Hour,
            })
        );
        assert_eq!(eval("5 in USD"), Ok(Value::currency(dec("5"), "USD")));
        assert!(eval("$5 in EUR").unwrap_err().is_dimensional());
        assert!(eval("5 kg in m").unwrap_err().is_dimensional());
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(number("20% of 50"), dec("10"));
        assert_eq!(eval("10% of $250"), Ok(Value::currency(dec("25"), "USD")));
    }

    #[test]
    fn test_dates_and_times() {
        assert_eq!(
            eval("today + 3 days"),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2025, 6, 18).unwrap()))
        );
        assert_eq!(
            eval("March 15"),
            Ok(Value::Date(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()))
        );
        assert_eq!(
            eval("Dec 25, 2025 - today"),
            Ok(Value::Duration {
                amount: dec("193"),
                unit: TimeUnit::Day,
            })
        );
        assert_eq!(
            eval("5pm - 9:30"),
            Ok(Value::Duration {
                amount: dec("450"),
                unit: TimeUnit::Minute,
            })
        );
        assert!(eval("Feb 30 2025").is_err());
    }

    #[test]
    fn test_rate_per_and_conversion() {
        assert_eq!(
            eval("$30 per hour"),
            Ok(Value::rate(Value::currency(dec("30"), "USD"), TimeUnit::Hour))
        );
        assert_eq!(
            eval("1 MB/s per minute"),
            Ok(Value::rate(Value::quantity(dec("60"), "MB"), TimeUnit::Minute))
        );
        assert!(eval("March 1 per day").is_err());
    }

    #[test]
    fn test_accumulation() {
        assert_eq!(
            eval("100 MB/s over 1 hour"),
            Ok(Value::quantity(dec("360000"), "MB"))
        );
        assert_eq!(
            eval("(100 MB/s over 1 hour) in GB"),
            Ok(Value::quantity(dec("360"), "GB"))
        );
    }

    #[test]
    fn test_natural_functions() {
        assert_eq!(
            eval("10000 req/s at 500 req/s per server with 20% buffer"),
            Ok(Value::quantity(dec("24"), "server"))
        );
        assert_eq!(number("10000 req/s with 500 req/s and 100%"), dec("40"));
        assert_eq!(
            eval("99.9% downtime per month"),
            Ok(Value::Duration {
                amount: dec("43.2"),
                unit: TimeUnit::Minute,
            })
        );
        assert_eq!(number("average of 1, 2, 3, 4"), dec("2.5"));
        assert_eq!(eval("square root of 81 kg"), Ok(Value::quantity(dec("9"), "kg")));
        assert_eq!(number("12345 as napkin"), dec("12000"));
    }
}
