//! FILENAME: tests/test_natural.rs
//! Integration tests for natural-language constructs, rates, capacity
//! planning, and calendar arithmetic.

mod common;

use calcmark_engine::Value;
use calcmark_parser::TimeUnit;
use common::{date, dec, eval, eval_err, num, TestHarness};

fn minutes(amount: &str) -> Value {
    Value::Duration {
        amount: dec(amount),
        unit: TimeUnit::Minute,
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

#[test]
fn test_call_and_natural_average_agree() {
    assert_eq!(eval("avg(1, 2, 3)"), num("2"));
    assert_eq!(eval("average of 1, 2, 3"), num("2"));
    assert_eq!(eval("avg($10, $20)"), Value::currency(dec("15"), "USD"));
}

#[test]
fn test_square_root_forms() {
    assert_eq!(eval("sqrt(16)"), num("4"));
    assert_eq!(eval("square root of 16 + 1"), num("5"));
    assert!(eval_err("sqrt(-1)").message().contains("negative"));
}

#[test]
fn test_wrong_arity_is_reported() {
    let err = eval_err("sqrt(1, 2)");
    assert!(err.message().contains("exactly 1"));
}

// ============================================================================
// RATES
// ============================================================================

#[test]
fn test_rate_literals_display() {
    let mut harness = TestHarness::new();
    assert_eq!(harness.display("100 MB/s"), "100 MB/s");
    assert_eq!(harness.display("$25 per hour"), "$25/h");
}

#[test]
fn test_rate_conversion() {
    assert_eq!(
        eval("convert_rate(1 MB/s, minute)"),
        Value::rate(Value::quantity(dec("60"), "MB"), TimeUnit::Minute)
    );
    assert_eq!(
        eval("($30 per hour) in minute"),
        Value::rate(Value::currency(dec("0.5"), "USD"), TimeUnit::Minute)
    );
}

#[test]
fn test_rate_accumulates_over_duration() {
    assert_eq!(
        eval("100 MB/s over 1 day"),
        Value::quantity(dec("8640000"), "MB")
    );
    assert_eq!(
        eval("accumulate($30/hour, 8 hours)"),
        Value::currency(dec("240"), "USD")
    );
    assert_eq!(eval("$30/hour * 8 hours"), Value::currency(dec("240"), "USD"));
}

#[test]
fn test_amount_over_duration_forms_rate() {
    assert_eq!(
        eval("1 GB / 10 s"),
        Value::rate(Value::quantity(dec("0.1"), "GB"), TimeUnit::Second)
    );
}

// ============================================================================
// CAPACITY PLANNING
// ============================================================================

#[test]
fn test_capacity_with_buffer() {
    assert_eq!(
        eval("10000 req/s at 500 req/s per server"),
        Value::quantity(dec("20"), "server")
    );
    assert_eq!(
        eval("10000 req/s at 500 req/s per server with 20% buffer"),
        Value::quantity(dec("24"), "server")
    );
}

#[test]
fn test_capacity_rounds_up() {
    assert_eq!(
        eval("10 TB at 3 TB per disk"),
        Value::quantity(dec("4"), "disk")
    );
}

#[test]
fn test_requires_full_buffer_doubles() {
    assert_eq!(eval("10000 req/s with 500 req/s"), num("20"));
    assert_eq!(eval("10000 req/s with 500 req/s and 100%"), num("40"));
}

#[test]
fn test_capacity_call_form() {
    assert_eq!(
        eval("capacity(1000, 300, node)"),
        Value::quantity(dec("4"), "node")
    );
}

#[test]
fn test_downtime_budget() {
    assert_eq!(eval("99.9% downtime per month"), minutes("43.2"));
    assert_eq!(
        eval("downtime(99%, year)"),
        Value::Duration {
            amount: dec("3.65"),
            unit: TimeUnit::Day,
        }
    );
}

// ============================================================================
// CONVERSION AND ROUNDING
// ============================================================================

#[test]
fn test_in_converts_units() {
    assert_eq!(eval("5 km in m"), Value::quantity(dec("5000"), "m"));
    assert_eq!(eval("2 hours in minutes"), minutes("120"));
    assert_eq!(eval("3 in kg"), Value::quantity(dec("3"), "kg"));
    assert!(eval_err("$10 in EUR").is_dimensional());
}

#[test]
fn test_napkin_rounding() {
    assert_eq!(eval("1234 as napkin"), num("1200"));
    assert_eq!(eval("98765 kg as napkin"), Value::quantity(dec("99000"), "kg"));
}

#[test]
fn test_percentage_of() {
    assert_eq!(eval("15% of $200"), Value::currency(dec("30"), "USD"));
}

// ============================================================================
// DATES AND TIMES
// ============================================================================

#[test]
fn test_relative_dates_use_reference_day() {
    assert_eq!(eval("today"), date(2025, 6, 15));
    assert_eq!(eval("tomorrow"), date(2025, 6, 16));
    assert_eq!(eval("next week"), date(2025, 6, 22));
    assert_eq!(eval("last month"), date(2025, 5, 15));
}

#[test]
fn test_date_plus_duration() {
    assert_eq!(eval("March 1 + 2 weeks"), date(2025, 3, 15));
    assert_eq!(eval("Jan 31, 2024 + 1 month"), date(2024, 2, 29));
}

#[test]
fn test_date_difference_in_days() {
    assert_eq!(
        eval("Dec 25 - today"),
        Value::Duration {
            amount: dec("193"),
            unit: TimeUnit::Day,
        }
    );
}

#[test]
fn test_time_arithmetic_wraps() {
    let mut harness = TestHarness::new();
    assert_eq!(harness.display("11pm + 2 hours"), "01:00");
    assert_eq!(eval("17:00 - 9:30"), minutes("450"));
}

#[test]
fn test_values_serialize_to_json() {
    let value = eval("5 kg");
    let json = serde_json::to_value(&value).unwrap();
    assert_eq!(json["Quantity"]["unit"], "kg");
}
