//! Fixed-point arithmetic at 6 fractional digits.
//!
//! Prices and signals inside the evaluator are `i64` micro-units. Every
//! division rounds half away from zero, so identical inputs give identical
//! bits on every execution path.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by prices and signals.
pub const PRICE_DP: u32 = 6;

/// One unit expressed in micro-units.
pub const SCALE: i64 = 1_000_000;

/// Round a decimal to [`PRICE_DP`] digits, half away from zero.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert a decimal to micro-units. `None` if it does not fit in `i64`.
pub fn to_micros(value: Decimal) -> Option<i64> {
    let scaled = round_price(value).checked_mul(Decimal::from(SCALE))?;
    scaled.trunc().to_i64()
}

/// Convert micro-units back to a decimal with [`PRICE_DP`] digits.
pub fn from_micros(micros: i64) -> Decimal {
    Decimal::new(micros, PRICE_DP)
}

/// Integer division rounding half away from zero. `None` on a zero divisor.
pub fn div_round(numerator: i128, denominator: i128) -> Option<i128> {
    if denominator == 0 {
        return None;
    }
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.unsigned_abs() * 2 >= denominator.unsigned_abs() {
        let away = if (numerator < 0) == (denominator < 0) { 1 } else { -1 };
        Some(quotient + away)
    } else {
        Some(quotient)
    }
}

/// `numerator / denominator` expressed in micro-units, as `i64`.
pub fn ratio_micros(numerator: i128, denominator: i128) -> Option<i64> {
    let scaled = numerator.checked_mul(SCALE as i128)?;
    div_round(scaled, denominator).and_then(|v| i64::try_from(v).ok())
}
