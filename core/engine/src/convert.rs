//! FILENAME: core/engine/src/convert.rs
//! PURPOSE: Exact conversion between units of the same dimension.
//! CONTEXT: Measurement units convert through the registry's base-unit
//! factors; time units convert through their length in seconds. All results
//! are exact decimals. `None` means the units are not convertible or the
//! result overflowed.

use calcmark_parser::units::{unit_definition, Dimension};
use calcmark_parser::TimeUnit;
use rust_decimal::Decimal;

/// The dimension of a registered unit. User-defined units have none.
fn dimension_of(unit: &str) -> Option<Dimension> {
    unit_definition(unit).map(|def| def.dimension)
}

/// Whether two quantity units can be added or compared.
pub fn compatible(from: &str, to: &str) -> bool {
    from == to || matches!((dimension_of(from), dimension_of(to)), (Some(a), Some(b)) if a == b)
}

/// Converts `amount` from one quantity unit into another.
pub fn convert_quantity(amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
    if from == to {
        return Some(amount);
    }
    let from_def = unit_definition(from)?;
    let to_def = unit_definition(to)?;
    if from_def.dimension != to_def.dimension {
        return None;
    }
    amount
        .checked_mul(from_def.factor)?
        .checked_div(to_def.factor)
}

/// Converts a duration amount between time units.
pub fn convert_duration(amount: Decimal, from: TimeUnit, to: TimeUnit) -> Option<Decimal> {
    if from == to {
        return Some(amount);
    }
    amount
        .checked_mul(from.seconds())?
        .checked_div(to.seconds())
}

/// Re-expresses a rate amount "per `from`" as "per `to`"
/// (`60 per minute` is `3600 per hour`).
pub fn convert_rate_amount(amount: Decimal, from: TimeUnit, to: TimeUnit) -> Option<Decimal> {
    if from == to {
        return Some(amount);
    }
    amount.checked_mul(to.seconds())?.checked_div(from.seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_length_conversion_is_exact() {
        assert_eq!(convert_quantity(dec("1"), "m", "cm"), Some(dec("100")));
        assert_eq!(convert_quantity(dec("12"), "inch", "ft"), Some(dec("1")));
        assert_eq!(convert_quantity(dec("1"), "nautical mile", "m"), Some(dec("1852")));
    }

    #[test]
    fn test_data_conversion() {
        assert_eq!(convert_quantity(dec("1"), "GB", "MB"), Some(dec("1000")));
        assert_eq!(convert_quantity(dec("1"), "GiB", "MiB"), Some(dec("1024")));
        assert_eq!(convert_quantity(dec("8"), "bit", "B"), Some(dec("1")));
    }

    #[test]
    fn test_incompatible_dimensions() {
        assert_eq!(convert_quantity(dec("1"), "cm", "Pa"), None);
        assert_eq!(convert_quantity(dec("1"), "apples", "oranges"), None);
        assert!(compatible("apples", "apples"));
        assert!(!compatible("kg", "L"));
        assert!(compatible("kg", "lb"));
    }

    #[test]
    fn test_time_conversion() {
        assert_eq!(
            convert_duration(dec("90"), TimeUnit::Minute, TimeUnit::Hour),
            Some(dec("1.5"))
        );
        assert_eq!(
            convert_duration(dec("1"), TimeUnit::Year, TimeUnit::Day),
            Some(dec("365"))
        );
        assert_eq!(
            convert_rate_amount(dec("1"), TimeUnit::Second, TimeUnit::Minute),
            Some(dec("60"))
        );
    }
}
