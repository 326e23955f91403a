//! FILENAME: core/engine/src/functions.rs
//! PURPOSE: Built-in functions over evaluated argument values.
//! CONTEXT: Both call syntax (`avg(1, 2)`) and the natural-language forms
//! (`average of 1, 2`, `x at y per server`) reach these functions with the
//! same arguments. Arity was already checked by the parser.
//!
//! FUNCTIONS:
//! - avg: unit kept when all arguments share one unit, plain number otherwise
//! - sqrt: unit kept, negative input rejected
//! - capacity / requires: ceil(demand * (1 + buffer) / capacity)
//! - downtime: (1 - availability) * period, in the largest fitting unit
//! - napkin: two significant figures
//! - convert_rate / accumulate live in `arithmetic`, shared with `*` and `per`

use calcmark_parser::{Span, TimeUnit};
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

use crate::arithmetic::{aligned_amounts, overflow};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Units tried, largest first, when presenting a downtime budget.
const DOWNTIME_UNITS: [TimeUnit; 4] = [
    TimeUnit::Day,
    TimeUnit::Hour,
    TimeUnit::Minute,
    TimeUnit::Second,
];

/// Amount used for averaging: rates contribute their numerator.
fn scalar(value: &Value) -> Option<Decimal> {
    match value {
        Value::Rate { amount, .. } => scalar(amount),
        other => other.amount(),
    }
}

pub fn avg(values: &[Value], span: Span) -> EvalResult<Value> {
    let mut total = Decimal::ZERO;
    for value in values {
        let amount = scalar(value).ok_or_else(|| {
            EvalError::evaluation(format!("avg() cannot average a {}", value.type_name()), span)
        })?;
        total = total.checked_add(amount).ok_or_else(|| overflow(span))?;
    }

    let Some(first) = values.first() else {
        return Err(EvalError::evaluation("avg() requires at least 1 argument", span));
    };
    let count = Decimal::from(values.len());
    let mean = total.checked_div(count).ok_or_else(|| overflow(span))?;

    let same_unit = values.iter().all(|v| v.unit_key() == first.unit_key());
    if !same_unit {
        return Ok(Value::Number(mean));
    }
    match first {
        Value::Rate { amount, per } => {
            let numerator = amount.with_amount(mean).ok_or_else(|| overflow(span))?;
            Ok(Value::rate(numerator, *per))
        }
        other => other.with_amount(mean).ok_or_else(|| overflow(span)),
    }
}

pub fn sqrt(value: &Value, span: Span) -> EvalResult<Value> {
    let amount = value.amount().ok_or_else(|| {
        EvalError::evaluation(
            format!("sqrt() cannot take the root of a {}", value.type_name()),
            span,
        )
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(EvalError::evaluation(
            "sqrt() of a negative number is not a real number",
            span,
        ));
    }
    let root = amount.sqrt().ok_or_else(|| overflow(span))?;
    value.with_amount(root.normalize()).ok_or_else(|| overflow(span))
}

/// `1 + buffer`, where the buffer is a percentage such as `20%`.
fn buffer_factor(buffer: Option<&Value>, span: Span) -> EvalResult<Decimal> {
    let Some(buffer) = buffer else {
        return Ok(Decimal::ONE);
    };
    match buffer {
        Value::Number(fraction) if !fraction.is_sign_negative() || fraction.is_zero() => {
            Decimal::ONE.checked_add(*fraction).ok_or_else(|| overflow(span))
        }
        Value::Number(_) => Err(EvalError::evaluation("buffer cannot be negative", span)),
        other => Err(EvalError::evaluation(
            format!("buffer must be a percentage, got {}", other.type_name()),
            span,
        )),
    }
}

/// Number of capacity units needed to serve `demand`, rounded up.
fn units_needed(
    demand: &Value,
    capacity: &Value,
    buffer: Option<&Value>,
    span: Span,
) -> EvalResult<Decimal> {
    let (needed, available) = match (demand, capacity) {
        (Value::Number(_), other) | (other, Value::Number(_)) if !other.is_number() => {
            let d = scalar(demand).ok_or_else(|| mismatch(demand, capacity, span))?;
            let c = scalar(capacity).ok_or_else(|| mismatch(demand, capacity, span))?;
            (d, c)
        }
        _ => aligned_amounts(demand, capacity, span)?,
    };
    if available.is_zero() {
        return Err(EvalError::evaluation("capacity cannot be zero", span));
    }

    let factor = buffer_factor(buffer, span)?;
    let buffered = needed.checked_mul(factor).ok_or_else(|| overflow(span))?;
    let units = buffered.checked_div(available).ok_or_else(|| overflow(span))?;
    Ok(units.ceil())
}

fn mismatch(demand: &Value, capacity: &Value, span: Span) -> EvalError {
    EvalError::evaluation(
        format!(
            "cannot plan capacity for a {} with a {}",
            demand.type_name(),
            capacity.type_name()
        ),
        span,
    )
}

/// `10000 req/s at 500 req/s per server with 20% buffer` is 24 server.
pub fn capacity(
    demand: &Value,
    capacity: &Value,
    unit: &str,
    buffer: Option<&Value>,
    span: Span,
) -> EvalResult<Value> {
    let count = units_needed(demand, capacity, buffer, span)?;
    Ok(Value::quantity(count, unit))
}

/// `10000 req/s with 500 req/s and 20%` is 24.
pub fn requires(
    load: &Value,
    capacity: &Value,
    buffer: Option<&Value>,
    span: Span,
) -> EvalResult<Value> {
    units_needed(load, capacity, buffer, span).map(Value::Number)
}

/// Allowed downtime for an availability target over one `period`.
pub fn downtime(availability: &Value, period: TimeUnit, span: Span) -> EvalResult<Value> {
    let fraction = match availability {
        Value::Number(n) if *n >= Decimal::ZERO && *n <= Decimal::ONE => *n,
        Value::Number(n) => {
            return Err(EvalError::evaluation(
                format!("availability must be between 0% and 100%, got {}", n),
                span,
            ))
        }
        other => {
            return Err(EvalError::evaluation(
                format!("availability must be a percentage, got {}", other.type_name()),
                span,
            ))
        }
    };

    let seconds = (Decimal::ONE - fraction)
        .checked_mul(period.seconds())
        .ok_or_else(|| overflow(span))?;

    let unit = DOWNTIME_UNITS
        .iter()
        .copied()
        .find(|u| seconds >= u.seconds())
        .unwrap_or(TimeUnit::Second);
    let amount = seconds
        .checked_div(unit.seconds())
        .ok_or_else(|| overflow(span))?;

    Ok(Value::Duration {
        amount: amount.normalize(),
        unit,
    })
}

/// Rounds to two significant figures, keeping the unit.
pub fn napkin(value: &Value, span: Span) -> EvalResult<Value> {
    match value {
        Value::Rate { amount, per } => Ok(Value::rate(napkin(amount, span)?, *per)),
        other => {
            let amount = other.amount().ok_or_else(|| {
                EvalError::evaluation(
                    format!("cannot round a {} as napkin math", other.type_name()),
                    span,
                )
            })?;
            let rounded = round_significant(amount, 2).ok_or_else(|| overflow(span))?;
            other.with_amount(rounded).ok_or_else(|| overflow(span))
        }
    }
}

fn round_significant(amount: Decimal, digits: u32) -> Option<Decimal> {
    if amount.is_zero() {
        return Some(Decimal::ZERO);
    }
    // Halves round away from zero: 1250 becomes 1300, not 1200.
    amount
        .round_sf_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
        .map(|d| d.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn span() -> Span {
        Span::new(1, 1, 2)
    }

    fn req_per_second(amount: &str) -> Value {
        Value::rate(Value::quantity(dec(amount), "req"), TimeUnit::Second)
    }

    #[test]
    fn test_avg_keeps_shared_unit() {
        let values = vec![
            Value::quantity(dec("10"), "kg"),
            Value::quantity(dec("20"), "kg"),
        ];
        assert_eq!(avg(&values, span()), Ok(Value::quantity(dec("15"), "kg")));
    }

    #[test]
    fn test_avg_mixed_units_drop_to_number() {
        let values = vec![
            Value::quantity(dec("10"), "kg"),
            Value::currency(dec("20"), "USD"),
            Value::Number(dec("30")),
        ];
        assert_eq!(avg(&values, span()), Ok(Value::Number(dec("20"))));
        assert!(avg(&[Value::Boolean(true)], span()).is_err());
    }

    #[test]
    fn test_sqrt_keeps_unit() {
        assert_eq!(
            sqrt(&Value::currency(dec("16"), "USD"), span()),
            Ok(Value::currency(dec("4"), "USD"))
        );
        assert!(sqrt(&Value::Number(dec("-4")), span()).is_err());
    }

    #[test]
    fn test_capacity_with_and_without_buffer() {
        let demand = req_per_second("10000");
        let per_server = req_per_second("500");
        assert_eq!(
            capacity(&demand, &per_server, "server", None, span()),
            Ok(Value::quantity(dec("20"), "server"))
        );
        let buffer = Value::Number(dec("0.2"));
        assert_eq!(
            capacity(&demand, &per_server, "server", Some(&buffer), span()),
            Ok(Value::quantity(dec("24"), "server"))
        );
    }

    #[test]
    fn test_full_buffer_doubles_demand() {
        let demand = req_per_second("10000");
        let per_server = req_per_second("500");
        let buffer = Value::Number(dec("1"));
        assert_eq!(
            requires(&demand, &per_server, Some(&buffer), span()),
            Ok(Value::Number(dec("40")))
        );
    }

    #[test]
    fn test_huge_buffer_is_an_error() {
        let demand = Value::Number(dec("1"));
        let buffer = Value::Number(Decimal::MAX);
        let err = requires(&demand, &demand, Some(&buffer), span()).unwrap_err();
        assert_eq!(err.message(), "arithmetic overflow");
    }

    #[test]
    fn test_capacity_rounds_up_and_converts() {
        let demand = Value::quantity(dec("10"), "TB");
        let per_disk = Value::quantity(dec("3000"), "GB");
        assert_eq!(
            requires(&demand, &per_disk, None, span()),
            Ok(Value::Number(dec("4")))
        );
        let zero = Value::quantity(dec("0"), "GB");
        assert!(requires(&demand, &zero, None, span()).is_err());
    }

    #[test]
    fn test_downtime_picks_largest_unit() {
        assert_eq!(
            downtime(&Value::Number(dec("0.999")), TimeUnit::Month, span()),
            Ok(Value::Duration {
                amount: dec("43.2"),
                unit: TimeUnit::Minute,
            })
        );
        assert_eq!(
            downtime(&Value::Number(dec("0.99")), TimeUnit::Year, span()),
            Ok(Value::Duration {
                amount: dec("3.65"),
                unit: TimeUnit::Day,
            })
        );
        assert!(downtime(&Value::Number(dec("99.9")), TimeUnit::Month, span()).is_err());
    }

    #[test]
    fn test_napkin_two_significant_figures() {
        assert_eq!(napkin(&Value::Number(dec("1234")), span()), Ok(Value::Number(dec("1200"))));
        assert_eq!(
            napkin(&Value::quantity(dec("0.04567"), "kg"), span()),
            Ok(Value::quantity(dec("0.046"), "kg"))
        );
        assert_eq!(napkin(&Value::Number(dec("1250")), span()), Ok(Value::Number(dec("1300"))));
    }
}
