//! # Money — Fixed-Point Amounts and Rates
//!
//! All monetary amounts in the stack are `i64` minor units (cents).
//! Decimal strings cross the API boundary; integers flow inside. Tax
//! rates are decimal fractions in `[0, 1]` stored as basis points
//! (1/10000).
//!
//! ## Determinism
//!
//! Every rounding in the stack goes through [`div_round_half_even`]:
//! round-half-even to the minor unit. Tax application and proration both
//! use it, so recomputing a payroll run from the same inputs always
//! produces identical slips.
//!
//! ## Overflow
//!
//! Intermediate products are computed in `i128`; conversion back to `i64`
//! and all sums use checked arithmetic. Overflow is a typed error, never
//! a wrap.

use thiserror::Error;

/// Basis points per whole unit: a rate of 1.0 is `RATE_SCALE` bps.
pub const RATE_SCALE: i64 = 10_000;

const CENTS_PER_UNIT: i64 = 100;

/// Error raised by amount/rate parsing and fixed-point arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount string could not be parsed as a fixed-point decimal.
    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount {
        /// The offending input string.
        input: String,
        /// Why parsing rejected it.
        reason: String,
    },

    /// The rate string could not be parsed, or falls outside `[0, 1]`.
    #[error("invalid rate {input:?}: {reason}")]
    InvalidRate {
        /// The offending input string.
        input: String,
        /// Why parsing rejected it.
        reason: String,
    },

    /// An arithmetic operation exceeded the representable range.
    #[error("arithmetic overflow in {operation}")]
    Overflow {
        /// The operation that overflowed.
        operation: &'static str,
    },
}

/// Parse a decimal amount string into minor units (cents).
///
/// Accepts an optional leading `-`, an integer part, and at most two
/// fractional digits: `"1000"`, `"1000.5"`, `"1000.50"`, `"-25.00"`.
/// Rejects empty strings, floats in exponent notation, and more than two
/// fractional digits (amounts are exact, never silently truncated).
pub fn parse_amount(input: &str) -> Result<i64, MoneyError> {
    let err = |reason: &str| MoneyError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if digits.is_empty() {
        return Err(err("empty amount"));
    }

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("integer part must be decimal digits"));
    }
    if frac_part.len() > 2 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("at most two fractional digits allowed"));
    }

    let whole: i64 = int_part
        .parse()
        .map_err(|_| err("integer part out of range"))?;
    let frac: i64 = match frac_part.len() {
        0 => 0,
        1 => frac_part.parse::<i64>().map_err(|_| err("bad fraction"))? * 10,
        _ => frac_part.parse().map_err(|_| err("bad fraction"))?,
    };

    let magnitude = whole
        .checked_mul(CENTS_PER_UNIT)
        .and_then(|c| c.checked_add(frac))
        .ok_or(MoneyError::Overflow {
            operation: "parse_amount",
        })?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Format minor units as a decimal string with two fractional digits.
///
/// `90000` → `"900.00"`, `-1` → `"-0.01"`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parse a decimal rate string in `[0, 1]` into basis points.
///
/// `"0.1"` → `1000`, `"0.0825"` → `825`, `"1"` → `10000`. At most four
/// fractional digits; anything finer than a basis point is rejected
/// rather than rounded.
pub fn parse_rate(input: &str) -> Result<i64, MoneyError> {
    let err = |reason: &str| MoneyError::InvalidRate {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.starts_with('-') {
        return Err(err("rate must not be negative"));
    }
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("integer part must be decimal digits"));
    }
    if frac_part.len() > 4 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("at most four fractional digits allowed"));
    }

    let whole: i64 = int_part.parse().map_err(|_| err("integer part out of range"))?;
    if whole > 1 {
        return Err(err("rate must not exceed 1"));
    }
    let mut frac: i64 = 0;
    if !frac_part.is_empty() {
        let parsed: i64 = frac_part.parse().map_err(|_| err("bad fraction"))?;
        let scale = 10_i64.pow(4 - frac_part.len() as u32);
        frac = parsed * scale;
    }

    let bps = whole * RATE_SCALE + frac;
    if bps > RATE_SCALE {
        return Err(err("rate must not exceed 1"));
    }
    Ok(bps)
}

/// Format basis points as a decimal rate string with four fractional
/// digits. `1000` → `"0.1000"`.
pub fn format_rate_bps(bps: i64) -> String {
    format!("{}.{:04}", bps / RATE_SCALE, (bps % RATE_SCALE).abs())
}

/// Divide with round-half-even (bankers' rounding).
///
/// Ties round toward the even quotient: `25 / 10` → `2`, `35 / 10` → `4`,
/// and symmetrically for negative numerators.
fn div_round_half_even(numer: i128, denom: i128) -> i128 {
    debug_assert!(denom > 0);
    let quot = numer / denom;
    let rem = numer % denom;
    if rem == 0 {
        return quot;
    }
    let twice = rem.abs() * 2;
    let round_away = twice > denom || (twice == denom && quot % 2 != 0);
    if round_away {
        if numer < 0 {
            quot - 1
        } else {
            quot + 1
        }
    } else {
        quot
    }
}

/// Apply a basis-point rate to an amount, rounding half-even.
///
/// `apply_rate_bps(100_000, 1000)` (1000.00 at 10%) → `10_000` (100.00).
pub fn apply_rate_bps(amount_cents: i64, rate_bps: i64) -> Result<i64, MoneyError> {
    let product = amount_cents as i128 * rate_bps as i128;
    i64::try_from(div_round_half_even(product, RATE_SCALE as i128)).map_err(|_| {
        MoneyError::Overflow {
            operation: "apply_rate_bps",
        }
    })
}

/// Prorate an amount by `days_active / days_total`, rounding half-even.
///
/// Used for mid-period hires: a full period (`days_active == days_total`)
/// returns the amount unchanged.
pub fn prorate(amount_cents: i64, days_active: i64, days_total: i64) -> Result<i64, MoneyError> {
    if days_total <= 0 || days_active < 0 || days_active > days_total {
        return Err(MoneyError::InvalidAmount {
            input: format!("{days_active}/{days_total}"),
            reason: "proration days out of range".to_string(),
        });
    }
    let product = amount_cents as i128 * days_active as i128;
    i64::try_from(div_round_half_even(product, days_total as i128)).map_err(|_| {
        MoneyError::Overflow {
            operation: "prorate",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_amount_plain_and_fractional() {
        assert_eq!(parse_amount("1000").unwrap(), 100_000);
        assert_eq!(parse_amount("1000.5").unwrap(), 100_050);
        assert_eq!(parse_amount("1000.50").unwrap(), 100_050);
        assert_eq!(parse_amount("0.01").unwrap(), 1);
        assert_eq!(parse_amount("-25.00").unwrap(), -2_500);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        for bad in ["", "-", "1.234", "1e3", "12.", "abc", "1,000", "--5"] {
            assert!(parse_amount(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn format_amount_is_fixed_two_digits() {
        assert_eq!(format_amount(90_000), "900.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(-1), "-0.01");
        assert_eq!(format_amount(0), "0.00");
    }

    #[test]
    fn parse_rate_decimal_fractions() {
        assert_eq!(parse_rate("0.1").unwrap(), 1000);
        assert_eq!(parse_rate("0.0825").unwrap(), 825);
        assert_eq!(parse_rate("0").unwrap(), 0);
        assert_eq!(parse_rate("1").unwrap(), 10_000);
        assert_eq!(parse_rate("1.0").unwrap(), 10_000);
    }

    #[test]
    fn parse_rate_rejects_out_of_range() {
        assert!(parse_rate("1.0001").is_err());
        assert!(parse_rate("2").is_err());
        assert!(parse_rate("-0.1").is_err());
        assert!(parse_rate("0.00005").is_err());
    }

    #[test]
    fn rate_formats_with_four_digits() {
        assert_eq!(format_rate_bps(1000), "0.1000");
        assert_eq!(format_rate_bps(10_000), "1.0000");
        assert_eq!(format_rate_bps(825), "0.0825");
    }

    #[test]
    fn apply_rate_exact_ten_percent() {
        // 1000.00 at 10% -> 100.00
        assert_eq!(apply_rate_bps(100_000, 1000).unwrap(), 10_000);
    }

    #[test]
    fn apply_rate_ties_round_to_even() {
        // 1.00 at 12.5% = 12.5 cents -> 12 (even)
        assert_eq!(apply_rate_bps(100, 1250).unwrap(), 12);
        // 3.00 at 12.5% = 37.5 cents -> 38 (even)
        assert_eq!(apply_rate_bps(300, 1250).unwrap(), 38);
        // Symmetric for negatives.
        assert_eq!(apply_rate_bps(-100, 1250).unwrap(), -12);
        assert_eq!(apply_rate_bps(-300, 1250).unwrap(), -38);
    }

    #[test]
    fn prorate_full_period_is_identity() {
        assert_eq!(prorate(100_000, 30, 30).unwrap(), 100_000);
    }

    #[test]
    fn prorate_half_period() {
        assert_eq!(prorate(100_000, 15, 30).unwrap(), 50_000);
    }

    #[test]
    fn prorate_rejects_bad_day_counts() {
        assert!(prorate(100, 5, 0).is_err());
        assert!(prorate(100, -1, 30).is_err());
        assert!(prorate(100, 31, 30).is_err());
    }

    proptest! {
        /// The rounded quotient never differs from the exact quotient by
        /// more than half a unit.
        #[test]
        fn apply_rate_error_bounded_by_half_cent(
            amount in -1_000_000_000i64..1_000_000_000,
            bps in 0i64..=10_000,
        ) {
            let rounded = apply_rate_bps(amount, bps).unwrap() as i128;
            let exact_times_scale = amount as i128 * bps as i128;
            let diff = (rounded * RATE_SCALE as i128 - exact_times_scale).abs();
            prop_assert!(diff * 2 <= RATE_SCALE as i128);
        }

        /// Proration never exceeds the original amount in magnitude.
        #[test]
        fn prorate_bounded_by_amount(
            amount in 0i64..1_000_000_000,
            active in 0i64..=31,
        ) {
            let result = prorate(amount, active, 31).unwrap();
            prop_assert!(result <= amount);
            prop_assert!(result >= 0);
        }
    }
}
