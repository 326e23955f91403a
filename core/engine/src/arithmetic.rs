//! FILENAME: core/engine/src/arithmetic.rs
//! PURPOSE: Binary operators and comparisons over typed values.
//! CONTEXT: This module is the type-resolution table of the language. For
//! every operator and pair of operand kinds it decides whether units are
//! preserved, converted (right operand into the left operand's unit), or
//! rejected. Mismatched units and currencies raise DimensionalError; operand
//! kinds that have no arithmetic at all (booleans, misuse of dates) and
//! division by zero raise EvaluationError.

use calcmark_parser::{BinaryOperator, ComparisonOperator, Span, TimeUnit};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::convert::{compatible, convert_duration, convert_quantity, convert_rate_amount};
use crate::dates;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Applies a binary operator. `span` locates the whole operation for errors.
pub fn binary(op: BinaryOperator, left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
        return Err(EvalError::evaluation(
            format!(
                "cannot apply '{}' to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
            span,
        ));
    }

    match op {
        BinaryOperator::Add => add(left, right, span),
        BinaryOperator::Subtract => subtract(left, right, span),
        BinaryOperator::Multiply => multiply(left, right, span),
        BinaryOperator::Divide => divide(left, right, span),
        BinaryOperator::Modulo => modulo(left, right, span),
        BinaryOperator::Power => power(left, right, span),
    }
}

pub(crate) fn overflow(span: Span) -> EvalError {
    EvalError::evaluation("arithmetic overflow", span)
}

fn checked(result: Option<Decimal>, span: Span) -> EvalResult<Decimal> {
    result.ok_or_else(|| overflow(span))
}

fn unsupported(op: &str, left: &Value, right: &Value, span: Span) -> EvalError {
    let message = format!(
        "cannot {} {} and {}",
        op,
        describe(left),
        describe(right)
    );
    // Two amount-bearing values with different units are a dimensional clash;
    // anything involving dates or times is simply the wrong operand type.
    if left.amount().is_some() || matches!(left, Value::Rate { .. }) {
        if right.amount().is_some() || matches!(right, Value::Rate { .. }) {
            return EvalError::dimensional(message, span);
        }
    }
    EvalError::evaluation(message, span)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Currency { code, .. } => format!("currency {}", code),
        Value::Quantity { unit, .. } => format!("quantity '{}'", unit),
        Value::Duration { unit, .. } => format!("duration ({})", unit.name()),
        Value::Rate { amount, per } => format!("rate ({} per {})", describe(amount), per.name()),
        other => other.type_name().to_string(),
    }
}

/// Expresses `right` in the unit of `left` and returns both amounts. This is
/// the shared rule behind addition, comparison, and ratios.
pub fn aligned_amounts(left: &Value, right: &Value, span: Span) -> EvalResult<(Decimal, Decimal)> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),

        (Value::Currency { amount: l, code: lc, .. }, Value::Currency { amount: r, code: rc, .. }) => {
            if lc == rc {
                Ok((*l, *r))
            } else {
                Err(EvalError::dimensional(
                    format!(
                        "cannot combine {} and {} without an exchange rate",
                        lc, rc
                    ),
                    span,
                ))
            }
        }

        (Value::Quantity { amount: l, unit: lu }, Value::Quantity { amount: r, unit: ru }) => {
            if !compatible(lu, ru) {
                return Err(EvalError::dimensional(
                    format!("incompatible units '{}' and '{}'", lu, ru),
                    span,
                ));
            }
            Ok((*l, checked(convert_quantity(*r, ru, lu), span)?))
        }

        (Value::Duration { amount: l, unit: lu }, Value::Duration { amount: r, unit: ru }) => {
            Ok((*l, checked(convert_duration(*r, *ru, *lu), span)?))
        }

        (Value::Rate { amount: la, per: lp }, Value::Rate { amount: ra, per: rp }) => {
            let right_inner = per_unit(ra, *rp, *lp, span)?;
            aligned_amounts(la, &right_inner, span)
        }

        _ => Err(unsupported("combine", left, right, span)),
    }
}

/// Re-expresses a rate numerator "per `from`" as "per `to`".
fn per_unit(amount: &Value, from: TimeUnit, to: TimeUnit, span: Span) -> EvalResult<Value> {
    let scalar = amount.amount().ok_or_else(|| overflow(span))?;
    let converted = checked(convert_rate_amount(scalar, from, to), span)?;
    amount.with_amount(converted).ok_or_else(|| overflow(span))
}

/// Converts a rate to a different time unit (`convert_rate`).
pub fn convert_rate(rate: &Value, to: TimeUnit, span: Span) -> EvalResult<Value> {
    match rate {
        Value::Rate { amount, per } => Ok(Value::rate(per_unit(amount, *per, to, span)?, to)),
        other => Err(EvalError::evaluation(
            format!("expected a rate, got {}", other.type_name()),
            span,
        )),
    }
}

/// Total produced by `rate` over a duration (`accumulate`, `rate * duration`).
pub fn accumulate(rate: &Value, duration: &Value, span: Span) -> EvalResult<Value> {
    let (Value::Rate { amount, per }, Value::Duration { amount: d, unit }) = (rate, duration) else {
        return Err(EvalError::evaluation(
            format!(
                "accumulate needs a rate and a duration, got {} and {}",
                rate.type_name(),
                duration.type_name()
            ),
            span,
        ));
    };
    let periods = checked(convert_duration(*d, *unit, *per), span)?;
    scale(amount, periods, span)
}

/// Multiplies the amount of `value` by `factor`, keeping its unit.
pub fn scale(value: &Value, factor: Decimal, span: Span) -> EvalResult<Value> {
    let new_value = match value {
        Value::Rate { amount, per } => Value::rate(scale(amount, factor, span)?, *per),
        other => {
            let amount = other.amount().ok_or_else(|| {
                EvalError::evaluation(format!("cannot scale a {}", other.type_name()), span)
            })?;
            let product = checked(amount.checked_mul(factor), span)?;
            other.with_amount(product).ok_or_else(|| overflow(span))?
        }
    };
    Ok(new_value)
}

fn add(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    combine(left, right, span, false)
}

fn subtract(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    combine(left, right, span, true)
}

/// Addition and subtraction share one table; `negate` flips the right operand.
fn combine(left: &Value, right: &Value, span: Span, negate: bool) -> EvalResult<Value> {
    let op_name = if negate { "subtract" } else { "add" };
    let signed = |d: Decimal| if negate { -d } else { d };

    match (left, right) {
        // Dates and times.
        (Value::Date(date), Value::Duration { amount, unit }) => {
            dates::add_to_date(*date, signed(*amount), *unit)
                .map(Value::Date)
                .ok_or_else(|| {
                    EvalError::evaluation(
                        format!("cannot {} {} {} to a date", op_name, amount, unit.name()),
                        span,
                    )
                })
        }
        (Value::Duration { amount, unit }, Value::Date(date)) if !negate => {
            dates::add_to_date(*date, *amount, *unit)
                .map(Value::Date)
                .ok_or_else(|| EvalError::evaluation("date out of range", span))
        }
        (Value::Date(l), Value::Date(r)) if negate => Ok(Value::Duration {
            amount: dates::days_between(*l, *r),
            unit: TimeUnit::Day,
        }),
        (Value::Time(time), Value::Duration { amount, unit }) => {
            dates::add_to_time(*time, signed(*amount), *unit)
                .map(Value::Time)
                .ok_or_else(|| overflow(span))
        }
        (Value::Time(l), Value::Time(r)) if negate => Ok(Value::Duration {
            amount: dates::minutes_between(*l, *r),
            unit: TimeUnit::Minute,
        }),

        // A plain number takes on the unit of the other operand.
        (Value::Number(n), other) | (other, Value::Number(n))
            if !other.is_number() && other.amount().is_some() =>
        {
            let base = other.amount().ok_or_else(|| overflow(span))?;
            let result = if matches!(left, Value::Number(_)) {
                checked(if negate { n.checked_sub(base) } else { n.checked_add(base) }, span)?
            } else {
                checked(if negate { base.checked_sub(*n) } else { base.checked_add(*n) }, span)?
            };
            other.with_amount(result).ok_or_else(|| overflow(span))
        }

        (Value::Rate { amount: la, per: lp }, Value::Rate { amount: ra, per: rp }) => {
            let right_inner = per_unit(ra, *rp, *lp, span)?;
            let sum = combine(la, &right_inner, span, negate)?;
            Ok(Value::rate(sum, *lp))
        }

        _ => {
            let compatible_kinds = std::mem::discriminant(left) == std::mem::discriminant(right)
                && left.amount().is_some();
            if !compatible_kinds {
                return Err(unsupported(op_name, left, right, span));
            }
            let (l, r) = aligned_amounts(left, right, span)?;
            let result = checked(if negate { l.checked_sub(r) } else { l.checked_add(r) }, span)?;
            left.with_amount(result).ok_or_else(|| overflow(span))
        }
    }
}

fn multiply(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            Ok(Value::Number(checked(l.checked_mul(*r), span)?))
        }
        (Value::Number(n), other) | (other, Value::Number(n))
            if other.amount().is_some() || matches!(other, Value::Rate { .. }) =>
        {
            scale(other, *n, span)
        }
        (rate @ Value::Rate { .. }, duration @ Value::Duration { .. })
        | (duration @ Value::Duration { .. }, rate @ Value::Rate { .. }) => {
            accumulate(rate, duration, span)
        }
        _ => Err(unsupported("multiply", left, right, span)),
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Rate { amount, .. } => is_zero(amount),
        other => other.amount().is_some_and(|a| a.is_zero()),
    }
}

fn divide(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    if is_zero(right) {
        return Err(EvalError::evaluation("division by zero", span));
    }

    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            Ok(Value::Number(checked(l.checked_div(*r), span)?))
        }

        // Scaling down keeps the unit.
        (other, Value::Number(n)) if other.amount().is_some() => {
            let quotient = checked(other.amount().and_then(|a| a.checked_div(*n)), span)?;
            other.with_amount(quotient).ok_or_else(|| overflow(span))
        }
        (Value::Rate { amount, per }, Value::Number(_)) => {
            Ok(Value::rate(divide(amount, right, span)?, *per))
        }

        // An amount over a duration is a rate: `100 MB / 2 s` is 50 MB/s.
        (
            amount @ (Value::Number(_) | Value::Currency { .. } | Value::Quantity { .. }),
            Value::Duration { amount: d, unit },
        ) => {
            let per_one = checked(amount.amount().and_then(|a| a.checked_div(*d)), span)?;
            let numerator = amount.with_amount(per_one).ok_or_else(|| overflow(span))?;
            Ok(Value::rate(numerator, *unit))
        }

        // Like units divide to a plain ratio.
        (Value::Quantity { .. }, Value::Quantity { .. })
        | (Value::Duration { .. }, Value::Duration { .. })
        | (Value::Rate { .. }, Value::Rate { .. }) => {
            let (l, r) = aligned_amounts(left, right, span)?;
            if r.is_zero() {
                return Err(EvalError::evaluation("division by zero", span));
            }
            Ok(Value::Number(checked(l.checked_div(r), span)?))
        }

        _ => Err(unsupported("divide", left, right, span)),
    }
}

fn modulo(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    if is_zero(right) {
        return Err(EvalError::evaluation("modulus by zero", span));
    }

    match (left, right) {
        (other, Value::Number(n)) if other.amount().is_some() => {
            let base = other.amount().ok_or_else(|| overflow(span))?;
            let remainder = checked(base.checked_rem(*n), span)?;
            other.with_amount(remainder).ok_or_else(|| overflow(span))
        }
        (Value::Quantity { .. }, Value::Quantity { .. })
        | (Value::Currency { .. }, Value::Currency { .. })
        | (Value::Duration { .. }, Value::Duration { .. }) => {
            let (l, r) = aligned_amounts(left, right, span)?;
            let remainder = checked(l.checked_rem(r), span)?;
            left.with_amount(remainder).ok_or_else(|| overflow(span))
        }
        _ => Err(unsupported("take the modulus of", left, right, span)),
    }
}

fn power(left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    let (Value::Number(base), Value::Number(exponent)) = (left, right) else {
        return Err(unsupported("raise", left, right, span));
    };

    if exponent.fract().is_zero() {
        if let Some(n) = exponent.to_i64() {
            return integer_power(*base, n, span).map(Value::Number);
        }
    }

    // Non-integer exponents are computed in floating point and are approximate.
    let result = match (base.to_f64(), exponent.to_f64()) {
        (Some(b), Some(e)) => b.powf(e),
        _ => return Err(overflow(span)),
    };
    if !result.is_finite() {
        return Err(EvalError::evaluation(
            format!("{} ^ {} is not a real number", base, exponent),
            span,
        ));
    }
    Decimal::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| overflow(span))
}

/// Exact exponentiation by squaring. Negative exponents invert the result.
fn integer_power(base: Decimal, exponent: i64, span: Span) -> EvalResult<Decimal> {
    if exponent < 0 && base.is_zero() {
        return Err(EvalError::evaluation("division by zero", span));
    }

    let mut result = Decimal::ONE;
    let mut factor = base;
    let mut remaining = exponent.unsigned_abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = checked(result.checked_mul(factor), span)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = checked(factor.checked_mul(factor), span)?;
        }
    }

    if exponent < 0 {
        result = checked(Decimal::ONE.checked_div(result), span)?;
    }
    Ok(result)
}

/// Evaluates a comparison operator to a Boolean.
pub fn compare(op: ComparisonOperator, left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    let ordering = match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => {
            return match op {
                ComparisonOperator::Equal => Ok(Value::Boolean(l == r)),
                ComparisonOperator::NotEqual => Ok(Value::Boolean(l != r)),
                _ => Err(EvalError::evaluation(
                    format!("booleans cannot be ordered with '{}'", op),
                    span,
                )),
            };
        }
        (Value::Date(l), Value::Date(r)) => l.cmp(r),
        (Value::Time(l), Value::Time(r)) => l.cmp(r),
        // Currencies compare by amount alone, whatever their codes.
        (Value::Currency { amount: l, .. }, Value::Currency { amount: r, .. }) => l.cmp(r),
        // A bare number compares against the amount of a unit value.
        (Value::Number(l), other) | (other, Value::Number(l))
            if other.amount().is_some() && !other.is_number() =>
        {
            let r = other.amount().ok_or_else(|| overflow(span))?;
            if matches!(left, Value::Number(_)) {
                l.cmp(&r)
            } else {
                r.cmp(l)
            }
        }
        _ => {
            let (l, r) = aligned_amounts(left, right, span)?;
            l.cmp(&r)
        }
    };

    let result = match op {
        ComparisonOperator::Equal => ordering == Ordering::Equal,
        ComparisonOperator::NotEqual => ordering != Ordering::Equal,
        ComparisonOperator::LessThan => ordering == Ordering::Less,
        ComparisonOperator::GreaterThan => ordering == Ordering::Greater,
        ComparisonOperator::LessEqual => ordering != Ordering::Greater,
        ComparisonOperator::GreaterEqual => ordering != Ordering::Less,
    };
    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn num(s: &str) -> Value {
        Value::Number(dec(s))
    }

    fn qty(s: &str, unit: &str) -> Value {
        Value::quantity(dec(s), unit)
    }

    fn span() -> Span {
        Span::new(1, 1, 2)
    }

    #[test]
    fn test_quantity_conversion_into_left_unit() {
        let result = binary(BinaryOperator::Add, &qty("100", "cm"), &qty("1", "m"), span());
        assert_eq!(result, Ok(qty("200", "cm")));
        let result = binary(BinaryOperator::Subtract, &qty("1", "km"), &qty("250", "m"), span());
        assert_eq!(result, Ok(qty("0.75", "km")));
    }

    #[test]
    fn test_incompatible_units_are_dimensional() {
        let err = binary(BinaryOperator::Add, &qty("100", "cm"), &qty("50", "Pa"), span()).unwrap_err();
        assert!(err.is_dimensional());
        let usd = Value::currency(dec("100"), "USD");
        let err = binary(BinaryOperator::Add, &usd, &qty("50", "cm"), span()).unwrap_err();
        assert!(err.is_dimensional());
        let eur = Value::currency(dec("50"), "EUR");
        let err = binary(BinaryOperator::Add, &usd, &eur, span()).unwrap_err();
        assert!(err.is_dimensional());
    }

    #[test]
    fn test_number_takes_unit_of_other_operand() {
        let usd = Value::currency(dec("100"), "USD");
        assert_eq!(
            binary(BinaryOperator::Add, &usd, &num("5"), span()),
            Ok(Value::currency(dec("105"), "USD"))
        );
        assert_eq!(
            binary(BinaryOperator::Subtract, &num("5"), &qty("2", "kg"), span()),
            Ok(qty("3", "kg"))
        );
        assert_eq!(
            binary(BinaryOperator::Multiply, &num("3"), &usd, span()),
            Ok(Value::currency(dec("300"), "USD"))
        );
    }

    #[test]
    fn test_currency_times_currency_is_rejected() {
        let usd = Value::currency(dec("2"), "USD");
        assert!(binary(BinaryOperator::Multiply, &usd, &usd, span()).is_err());
    }

    #[test]
    fn test_division_and_modulus_by_zero() {
        let err = binary(BinaryOperator::Divide, &num("5"), &num("0"), span()).unwrap_err();
        assert!(!err.is_dimensional());
        assert!(err.message().contains("division by zero"));
        let err = binary(BinaryOperator::Modulo, &num("5"), &num("0"), span()).unwrap_err();
        assert!(err.message().contains("modulus by zero"));
        assert!(binary(BinaryOperator::Divide, &qty("1", "m"), &qty("0", "cm"), span()).is_err());
    }

    #[test]
    fn test_quantity_ratio() {
        assert_eq!(
            binary(BinaryOperator::Divide, &qty("1", "km"), &qty("250", "m"), span()),
            Ok(num("4"))
        );
    }

    #[test]
    fn test_quantity_over_duration_is_rate() {
        let duration = Value::Duration {
            amount: dec("2"),
            unit: TimeUnit::Second,
        };
        assert_eq!(
            binary(BinaryOperator::Divide, &qty("100", "MB"), &duration, span()),
            Ok(Value::rate(qty("50", "MB"), TimeUnit::Second))
        );
    }

    #[test]
    fn test_rate_times_duration_accumulates() {
        let rate = Value::rate(qty("100", "MB"), TimeUnit::Second);
        let minute = Value::Duration {
            amount: dec("1"),
            unit: TimeUnit::Minute,
        };
        assert_eq!(
            binary(BinaryOperator::Multiply, &rate, &minute, span()),
            Ok(qty("6000", "MB"))
        );
    }

    #[test]
    fn test_rates_add_in_left_time_unit() {
        let per_second = Value::rate(num("1"), TimeUnit::Second);
        let per_minute = Value::rate(num("60"), TimeUnit::Minute);
        assert_eq!(
            binary(BinaryOperator::Add, &per_second, &per_minute, span()),
            Ok(Value::rate(num("2"), TimeUnit::Second))
        );
    }

    #[test]
    fn test_integer_power_is_exact() {
        assert_eq!(binary(BinaryOperator::Power, &num("2"), &num("10"), span()), Ok(num("1024")));
        assert_eq!(binary(BinaryOperator::Power, &num("2"), &num("-2"), span()), Ok(num("0.25")));
        assert_eq!(binary(BinaryOperator::Power, &num("1.1"), &num("2"), span()), Ok(num("1.21")));
        assert!(binary(BinaryOperator::Power, &num("0"), &num("-1"), span()).is_err());
    }

    #[test]
    fn test_fractional_power_is_approximate() {
        let Ok(Value::Number(root)) = binary(BinaryOperator::Power, &num("2"), &num("0.5"), span()) else {
            panic!("expected a number");
        };
        assert!((root - dec("1.41421356")).abs() < dec("0.0000001"));
        assert!(binary(BinaryOperator::Power, &num("-8"), &num("0.5"), span()).is_err());
    }

    #[test]
    fn test_overflow_is_an_error() {
        let big = Value::Number(Decimal::MAX);
        let err = binary(BinaryOperator::Multiply, &big, &num("10"), span()).unwrap_err();
        assert_eq!(err.message(), "arithmetic overflow");
    }

    #[test]
    fn test_booleans_have_no_arithmetic() {
        let err = binary(BinaryOperator::Add, &Value::Boolean(true), &num("1"), span()).unwrap_err();
        assert!(!err.is_dimensional());
    }

    #[test]
    fn test_compare_converts_units() {
        assert_eq!(
            compare(ComparisonOperator::Equal, &qty("1", "m"), &qty("100", "cm"), span()),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            compare(ComparisonOperator::LessThan, &num("3"), &qty("5", "kg"), span()),
            Ok(Value::Boolean(true))
        );
        assert!(compare(ComparisonOperator::LessThan, &qty("1", "m"), &qty("1", "kg"), span()).is_err());
        assert!(compare(
            ComparisonOperator::LessThan,
            &Value::Boolean(true),
            &Value::Boolean(false),
            span()
        )
        .is_err());
    }

    #[test]
    fn test_currencies_compare_by_amount() {
        let usd = Value::currency(dec("100"), "USD");
        let eur = Value::currency(dec("100"), "EUR");
        let small_eur = Value::currency(dec("50"), "EUR");
        assert_eq!(
            compare(ComparisonOperator::Equal, &usd, &eur, span()),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            compare(ComparisonOperator::GreaterThan, &usd, &small_eur, span()),
            Ok(Value::Boolean(true))
        );
        assert!(binary(BinaryOperator::Add, &usd, &eur, span()).is_err());
    }

    #[test]
    fn test_user_units_only_match_themselves() {
        let apples = qty("3", "apples");
        assert_eq!(
            binary(BinaryOperator::Add, &apples, &qty("2", "apples"), span()),
            Ok(qty("5", "apples"))
        );
        let err = binary(BinaryOperator::Add, &apples, &qty("2", "oranges"), span()).unwrap_err();
        assert!(err.is_dimensional());
    }
}
