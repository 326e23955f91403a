//! FILENAME: core/engine/src/value.rs
//! PURPOSE: The typed result of evaluating one CalcMark expression.
//! CONTEXT: Every evaluated line produces exactly one Value. Amounts are
//! exact decimals; currency codes and units are always canonical.

use calcmark_parser::units::currency_symbol_for_code;
use calcmark_parser::TimeUnit;
use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Number(Decimal),
    /// `symbol` is `$ € £ ¥` when the code has one, otherwise the code itself.
    Currency {
        amount: Decimal,
        symbol: String,
        code: String,
    },
    Quantity {
        amount: Decimal,
        unit: String,
    },
    /// The amount is a Number, Currency or Quantity.
    Rate {
        amount: Box<Value>,
        per: TimeUnit,
    },
    Duration {
        amount: Decimal,
        unit: TimeUnit,
    },
    Date(NaiveDate),
    Time(NaiveTime),
    Boolean(bool),
}

impl Value {
    /// Builds a currency value from its ISO code, picking the display symbol.
    pub fn currency(amount: Decimal, code: &str) -> Value {
        let symbol = currency_symbol_for_code(code)
            .map(String::from)
            .unwrap_or_else(|| code.to_string());
        Value::Currency {
            amount,
            symbol,
            code: code.to_string(),
        }
    }

    pub fn quantity(amount: Decimal, unit: impl Into<String>) -> Value {
        Value::Quantity {
            amount,
            unit: unit.into(),
        }
    }

    pub fn rate(amount: Value, per: TimeUnit) -> Value {
        Value::Rate {
            amount: Box::new(amount),
            per,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Currency { .. } => "currency",
            Value::Quantity { .. } => "quantity",
            Value::Rate { .. } => "rate",
            Value::Duration { .. } => "duration",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Boolean(_) => "boolean",
        }
    }

    /// The scalar amount of a Number, Currency, Quantity or Duration.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Currency { amount, .. }
            | Value::Quantity { amount, .. }
            | Value::Duration { amount, .. } => Some(*amount),
            Value::Rate { .. } | Value::Date(_) | Value::Time(_) | Value::Boolean(_) => None,
        }
    }

    /// The same kind and unit with a new amount. Rates replace the amount of
    /// their numerator. Dates, times and booleans have no amount.
    pub fn with_amount(&self, new_amount: Decimal) -> Option<Value> {
        let value = match self {
            Value::Number(_) => Value::Number(new_amount),
            Value::Currency { symbol, code, .. } => Value::Currency {
                amount: new_amount,
                symbol: symbol.clone(),
                code: code.clone(),
            },
            Value::Quantity { unit, .. } => Value::quantity(new_amount, unit.clone()),
            Value::Duration { unit, .. } => Value::Duration {
                amount: new_amount,
                unit: *unit,
            },
            Value::Rate { amount, per } => Value::rate(amount.with_amount(new_amount)?, *per),
            Value::Date(_) | Value::Time(_) | Value::Boolean(_) => return None,
        };
        Some(value)
    }

    /// Identifies the unit of an amount-bearing value, so that values with
    /// equal keys can be combined without conversion.
    pub fn unit_key(&self) -> Option<String> {
        match self {
            Value::Number(_) => Some(String::new()),
            Value::Currency { code, .. } => Some(format!("currency:{}", code)),
            Value::Quantity { unit, .. } => Some(format!("unit:{}", unit)),
            Value::Duration { unit, .. } => Some(format!("duration:{}", unit.name())),
            Value::Rate { amount, per } => amount.unit_key().map(|k| format!("{}/{}", k, per.name())),
            Value::Date(_) | Value::Time(_) | Value::Boolean(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

fn format_amount(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_amount(n)),
            Value::Currency {
                amount,
                symbol,
                code,
            } => {
                if symbol == code {
                    write!(f, "{} {}", format_amount(amount), code)
                } else if amount.is_sign_negative() {
                    write!(f, "-{}{}", symbol, format_amount(&amount.abs()))
                } else {
                    write!(f, "{}{}", symbol, format_amount(amount))
                }
            }
            Value::Quantity { amount, unit } => write!(f, "{} {}", format_amount(amount), unit),
            Value::Rate { amount, per } => write!(f, "{}/{}", amount, per.abbreviation()),
            Value::Duration { amount, unit } => {
                let plural = if amount.abs() == Decimal::ONE { "" } else { "s" };
                write!(f, "{} {}{}", format_amount(amount), unit.name(), plural)
            }
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::Time(time) => {
                if time.second() == 0 {
                    write!(f, "{}", time.format("%H:%M"))
                } else {
                    write!(f, "{}", time.format("%H:%M:%S"))
                }
            }
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_units() {
        assert_eq!(Value::Number(Decimal::new(1500, 0)).to_string(), "1500");
        assert_eq!(Value::currency(Decimal::new(1050, 1), "USD").to_string(), "$105");
        assert_eq!(Value::currency(Decimal::new(-5, 0), "EUR").to_string(), "-€5");
        assert_eq!(Value::currency(Decimal::new(7, 0), "CHF").to_string(), "7 CHF");
        assert_eq!(Value::quantity(Decimal::new(200, 0), "cm").to_string(), "200 cm");
        assert_eq!(
            Value::rate(Value::quantity(Decimal::new(100, 0), "MB"), TimeUnit::Second)
                .to_string(),
            "100 MB/s"
        );
        assert_eq!(
            Value::Duration {
                amount: Decimal::ONE,
                unit: TimeUnit::Day
            }
            .to_string(),
            "1 day"
        );
        assert_eq!(
            Value::Duration {
                amount: Decimal::new(90, 0),
                unit: TimeUnit::Minute
            }
            .to_string(),
            "90 minutes"
        );
    }

    #[test]
    fn test_with_amount_keeps_unit() {
        let rate = Value::rate(Value::currency(Decimal::new(50, 0), "USD"), TimeUnit::Hour);
        assert_eq!(
            rate.with_amount(Decimal::new(60, 0)),
            Some(Value::rate(Value::currency(Decimal::new(60, 0), "USD"), TimeUnit::Hour))
        );
        assert_eq!(Value::Boolean(true).with_amount(Decimal::ONE), None);
    }

    #[test]
    fn test_unit_keys_distinguish_kinds() {
        let usd = Value::currency(Decimal::ONE, "USD");
        let eur = Value::currency(Decimal::ONE, "EUR");
        assert_ne!(usd.unit_key(), eur.unit_key());
        assert_eq!(usd.unit_key(), Value::currency(Decimal::TEN, "USD").unit_key());
        assert_eq!(Value::Date(NaiveDate::MIN).unit_key(), None);
    }
}
