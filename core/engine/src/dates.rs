//! FILENAME: core/engine/src/dates.rs
//! PURPOSE: Calendar arithmetic for dates, times, and relative date keywords.
//! CONTEXT: Months and years move by calendar months when the amount is a
//! whole number (Jan 31 + 1 month = Feb 28/29). Every other unit moves by
//! its fixed length and must land on a whole day for dates.

use calcmark_parser::{Period, RelativeDate, TimeUnit};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::value::Value;

const SECONDS_PER_DAY: i64 = 86_400;

/// Resolves `today`, `next month`, `now` and friends against `now`.
pub fn resolve_relative(relative: RelativeDate, now: NaiveDateTime) -> Option<Value> {
    let today = now.date();
    let value = match relative {
        RelativeDate::Today => Value::Date(today),
        RelativeDate::Tomorrow => Value::Date(today.succ_opt()?),
        RelativeDate::Yesterday => Value::Date(today.pred_opt()?),
        RelativeDate::Now => Value::Time(now.time().with_nanosecond(0)?),
        RelativeDate::This(_) => Value::Date(today),
        RelativeDate::Next(period) => Value::Date(shift_period(today, period, 1)?),
        RelativeDate::Last(period) => Value::Date(shift_period(today, period, -1)?),
    };
    Some(value)
}

fn shift_period(date: NaiveDate, period: Period, sign: i64) -> Option<NaiveDate> {
    match period {
        Period::Week => date.checked_add_signed(TimeDelta::try_days(7 * sign)?),
        Period::Month => shift_months(date, sign),
        Period::Year => shift_months(date, 12 * sign),
    }
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// `March 15` without a year resolves against the reference year.
pub fn date_from_parts(month: u32, day: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.unwrap_or_else(|| today.year()), month, day)
}

/// Adds a signed duration to a date. Returns `None` when the duration is not
/// a whole number of days (or months) or the result is out of range.
pub fn add_to_date(date: NaiveDate, amount: Decimal, unit: TimeUnit) -> Option<NaiveDate> {
    if matches!(unit, TimeUnit::Month | TimeUnit::Year) && amount.fract().is_zero() {
        let per_unit = if unit == TimeUnit::Year { 12 } else { 1 };
        let months = amount.to_i64()?.checked_mul(per_unit)?;
        return shift_months(date, months);
    }

    let seconds = amount.checked_mul(unit.seconds())?;
    let days = seconds.checked_div(Decimal::from(SECONDS_PER_DAY))?;
    if !days.fract().is_zero() {
        return None;
    }
    date.checked_add_signed(TimeDelta::try_days(days.to_i64()?)?)
}

/// Whole days from `right` to `left`.
pub fn days_between(left: NaiveDate, right: NaiveDate) -> Decimal {
    Decimal::from(left.signed_duration_since(right).num_days())
}

/// Adds a signed duration to a clock time, wrapping around midnight.
/// Fractions of a second are rounded.
pub fn add_to_time(time: NaiveTime, amount: Decimal, unit: TimeUnit) -> Option<NaiveTime> {
    let seconds = amount.checked_mul(unit.seconds())?.round().to_i64()?;
    let wrapped = seconds.rem_euclid(SECONDS_PER_DAY);
    let (result, _) = time.overflowing_add_signed(TimeDelta::try_seconds(wrapped)?);
    Some(result)
}

/// Minutes from `right` to `left` on the same day.
pub fn minutes_between(left: NaiveTime, right: NaiveTime) -> Decimal {
    let seconds = left.signed_duration_since(right).num_seconds();
    Decimal::from(seconds) / Decimal::from(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(12, 30, 15).unwrap()
    }

    #[test]
    fn test_relative_keywords() {
        let now = noon(date(2025, 1, 31));
        assert_eq!(
            resolve_relative(RelativeDate::Tomorrow, now),
            Some(Value::Date(date(2025, 2, 1)))
        );
        assert_eq!(
            resolve_relative(RelativeDate::Yesterday, now),
            Some(Value::Date(date(2025, 1, 30)))
        );
        assert_eq!(
            resolve_relative(RelativeDate::Next(Period::Month), now),
            Some(Value::Date(date(2025, 2, 28)))
        );
        assert_eq!(
            resolve_relative(RelativeDate::Last(Period::Week), now),
            Some(Value::Date(date(2025, 1, 24)))
        );
        assert_eq!(
            resolve_relative(RelativeDate::This(Period::Year), now),
            Some(Value::Date(date(2025, 1, 31)))
        );
        assert_eq!(
            resolve_relative(RelativeDate::Now, now),
            Some(Value::Time(NaiveTime::from_hms_opt(12, 30, 15).unwrap()))
        );
    }

    #[test]
    fn test_add_to_date() {
        let start = date(2024, 1, 31);
        assert_eq!(
            add_to_date(start, Decimal::ONE, TimeUnit::Month),
            Some(date(2024, 2, 29))
        );
        assert_eq!(
            add_to_date(start, Decimal::TWO, TimeUnit::Week),
            Some(date(2024, 2, 14))
        );
        assert_eq!(
            add_to_date(start, Decimal::from(48), TimeUnit::Hour),
            Some(date(2024, 2, 2))
        );
        assert_eq!(add_to_date(start, Decimal::from(5), TimeUnit::Hour), None);
        assert_eq!(
            add_to_date(start, Decimal::NEGATIVE_ONE, TimeUnit::Year),
            Some(date(2023, 1, 31))
        );
    }

    #[test]
    fn test_time_wraps_midnight() {
        let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(
            add_to_time(late, Decimal::from(45), TimeUnit::Minute),
            NaiveTime::from_hms_opt(0, 15, 0)
        );
        assert_eq!(
            add_to_time(late, Decimal::from(-24), TimeUnit::Hour),
            Some(late)
        );
        let early = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(minutes_between(late, early), Decimal::from(870));
    }

    #[test]
    fn test_missing_year_uses_reference_year() {
        assert_eq!(
            date_from_parts(3, 15, None, date(2026, 7, 1)),
            Some(date(2026, 3, 15))
        );
        assert_eq!(date_from_parts(2, 30, Some(2025), date(2026, 7, 1)), None);
        assert_eq!(days_between(date(2025, 3, 1), date(2025, 2, 1)), Decimal::from(28));
    }
}
