//! # Domain Services
//!
//! Pure counter transforms. No ledger access, no async.

use crate::domain::value_objects::CounterValue;

// =============================================================================
// COUNTER TRANSFORMS
// =============================================================================

/// Computes the value written by `increment`.
///
/// The accumulator starts at `amount` (zero when absent) and the existing
/// value is added to it. A zero accumulator yields 1; anything else yields
/// accumulator + 1. The extra 1 is applied on top of an explicit amount,
/// so `increment(k, 5)` on an absent key stores 6, and an explicit zero
/// amount behaves exactly like no amount.
///
/// Returns `None` on signed 64-bit overflow.
#[must_use]
pub fn next_increment(existing: CounterValue, amount: Option<i64>) -> Option<CounterValue> {
    let accumulator = amount.unwrap_or(0).checked_add(existing.0)?;
    if accumulator == 0 {
        return Some(CounterValue(1));
    }
    accumulator.checked_add(1).map(CounterValue)
}

/// Computes the value written by `decrement`.
///
/// Zero stays zero; any other value drops by one. Returns `None` on
/// underflow of `i64::MIN`.
#[must_use]
pub fn next_decrement(existing: CounterValue) -> Option<CounterValue> {
    if existing.is_zero() {
        return Some(CounterValue::ZERO);
    }
    existing.0.checked_sub(1).map(CounterValue)
}

/// Parses an explicit increment amount.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

// =============================================================================
// TESTS
// =============================================================================
