//! Currency amounts.
//!
//! `Money` is a value object: two amounts are equal when their values are equal.
//! Every `Money` carries exactly two fraction digits; constructors round
//! half-away-from-zero to cents, so arithmetic never drifts.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A signed currency amount with two fraction digits.
///
/// Serializes as a decimal string (e.g. `"850.00"`) so clients never see
/// binary floating point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;

    /// Round any decimal to currency precision.
    pub fn new(value: Decimal) -> Self {
        let mut rounded = value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::SCALE);
        Self(rounded)
    }

    /// Largest magnitude a balance or amount may have: 12 integer digits, the
    /// range of the `NUMERIC(14,2)` ledger columns.
    pub const MAX_CENTS: i64 = 99_999_999_999_999;

    pub fn max() -> Self {
        Self::from_cents(Self::MAX_CENTS)
    }

    pub fn zero() -> Self {
        Self(Decimal::new(0, Self::SCALE))
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, Self::SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money::new)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money::new)
    }

    pub fn negate(self) -> Money {
        Money::new(-self.0)
    }

    /// Require a strictly positive amount (after rounding to cents).
    pub fn positive(self, field: &str) -> DomainResult<Money> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(DomainError::validation(format!("{field} must be greater than zero")))
        }
    }

    /// Require `|self| <= Money::max()`.
    pub fn bounded(self, field: &str) -> DomainResult<Money> {
        if self.0.abs() <= Money::max().0 {
            Ok(self)
        } else {
            Err(DomainError::validation(format!(
                "{field} must not exceed {}",
                Money::max()
            )))
        }
    }

    /// Parse a user-supplied amount.
    ///
    /// Accepts JSON numbers and numeric strings (an optional leading `$` and
    /// thousands separators are tolerated). The result is rounded to cents,
    /// must be strictly positive and may not exceed [`Money::max`].
    pub fn parse_amount(value: &serde_json::Value, field: &str) -> DomainResult<Money> {
        Self::parse_decimal(value, field)?.positive(field)
    }

    /// Like [`Money::parse_amount`] but zero and absent values are allowed
    /// (opening deposits).
    pub fn parse_non_negative(value: &serde_json::Value, field: &str) -> DomainResult<Money> {
        if value.is_null() {
            return Ok(Money::zero());
        }
        let money = Self::parse_decimal(value, field)?;
        if money.is_negative() {
            return Err(DomainError::validation(format!("{field} cannot be negative")));
        }
        Ok(money)
    }

    fn parse_decimal(value: &serde_json::Value, field: &str) -> DomainResult<Money> {
        let raw = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().trim_start_matches('$').replace(',', ""),
            serde_json::Value::Null => {
                return Err(DomainError::validation(format!("{field} is required")));
            }
            _ => return Err(DomainError::validation(format!("{field} must be a number"))),
        };

        let decimal = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| DomainError::validation(format!("{field} must be a number")))?;

        Money::new(decimal).bounded(field)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money::new(iter.map(|m| m.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn amounts_are_rounded_to_cents() {
        assert_eq!(Money::new(Decimal::new(10005, 3)).to_string(), "10.01");
        assert_eq!(Money::new(Decimal::new(100, 0)).to_string(), "100.00");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn parse_accepts_numbers_and_numeric_strings() {
        assert_eq!(Money::parse_amount(&json!(150), "amount").unwrap(), Money::from_cents(15000));
        assert_eq!(Money::parse_amount(&json!(150.5), "amount").unwrap(), Money::from_cents(15050));
        assert_eq!(Money::parse_amount(&json!("$1,250.10"), "amount").unwrap(), Money::from_cents(125010));
    }

    #[test]
    fn parse_rejects_non_numeric_and_non_positive() {
        for bad in [json!("abc"), json!(0), json!(-5), json!("0.001"), json!(true), json!(null)] {
            let err = Money::parse_amount(&bad, "amount").unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_amounts_beyond_the_ledger_range() {
        assert_eq!(
            Money::parse_amount(&json!("999999999999.99"), "amount").unwrap(),
            Money::max()
        );
        for bad in [json!("1000000000000"), json!("79228162514264337593543950335"), json!(1e20)] {
            let err = Money::parse_amount(&bad, "amount").unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{bad} should be rejected");
        }
        assert!(Money::parse_non_negative(&json!("1000000000000.00"), "initialDeposit").is_err());
    }

    #[test]
    fn non_negative_parse_allows_zero() {
        assert_eq!(Money::parse_non_negative(&json!(0), "initialDeposit").unwrap(), Money::zero());
        assert_eq!(Money::parse_non_negative(&json!(null), "initialDeposit").unwrap(), Money::zero());
        assert_eq!(Money::parse_non_negative(&json!("0.00"), "initialDeposit").unwrap(), Money::zero());
        assert!(Money::parse_non_negative(&json!(-1), "initialDeposit").is_err());
    }

    #[test]
    fn serializes_as_decimal_string() {
        let v = serde_json::to_value(Money::from_cents(85000)).unwrap();
        assert_eq!(v, json!("850.00"));
    }

    proptest! {
        #[test]
        fn add_then_sub_is_identity(a in -10_000_000i64..10_000_000i64, b in -10_000_000i64..10_000_000i64) {
            let x = Money::from_cents(a);
            let y = Money::from_cents(b);
            prop_assert_eq!(x.checked_add(y).unwrap().checked_sub(y).unwrap(), x);
        }

        #[test]
        fn rounding_is_idempotent(cents in -1_000_000_000i64..1_000_000_000i64, extra in 0u32..4) {
            let m = Money::new(Decimal::new(cents, 2 + extra));
            prop_assert_eq!(Money::new(m.amount()), m);
            prop_assert_eq!(m.amount().scale(), Money::SCALE);
        }
    }
}
