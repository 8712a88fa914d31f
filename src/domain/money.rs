use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A monetary value in minor currency units (e.g. cents, bani).
///
/// All money in the system is stored and compared as integer minor units;
/// decimal text only exists at the input boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(minor_units: i64) -> Result<Self> {
        if minor_units >= 0 {
            Ok(Self(minor_units))
        } else {
            Err(ShopError::ValidationFailed(
                "amount must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parses decimal text (e.g. `"750"` or `"749.99"`) into minor units,
    /// rounding to the nearest unit with banker's rounding.
    pub fn from_decimal_str(text: &str) -> Result<Self> {
        let decimal = Decimal::from_str(text.trim()).map_err(|_| {
            ShopError::ValidationFailed(format!("{text:?} is not a valid price"))
        })?;
        if decimal.is_sign_negative() {
            return Err(ShopError::ValidationFailed(
                "price must not be negative".to_string(),
            ));
        }
        let minor = (decimal * Decimal::ONE_HUNDRED).round();
        let minor = minor.to_i64().ok_or_else(|| {
            ShopError::ValidationFailed(format!("{text:?} is out of range"))
        })?;
        Ok(Self(minor))
    }

    /// Line subtotal: unit price times quantity.
    pub fn times(&self, qty: u32) -> Self {
        Self(self.0 * i64::from(qty))
    }
}

impl fmt::Display for Amount {
    /// Renders in major units with two decimals, e.g. `750.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Decimal::new(self.0, 2))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_major_units() {
        assert_eq!(Amount::from_decimal_str("750").unwrap(), Amount(75000));
    }

    #[test]
    fn test_fractional_major_units() {
        assert_eq!(Amount::from_decimal_str("749.99").unwrap(), Amount(74999));
        assert_eq!(Amount::from_decimal_str(" 0.5 ").unwrap(), Amount(50));
    }

    #[test]
    fn test_bankers_rounding_at_midpoint() {
        assert_eq!(Amount::from_decimal_str("1.005").unwrap(), Amount(100));
        assert_eq!(Amount::from_decimal_str("1.015").unwrap(), Amount(102));
    }

    #[test]
    fn test_rejects_garbage_and_negatives() {
        assert!(matches!(
            Amount::from_decimal_str("abc"),
            Err(ShopError::ValidationFailed(_))
        ));
        assert!(matches!(
            Amount::from_decimal_str("-1"),
            Err(ShopError::ValidationFailed(_))
        ));
        assert!(matches!(Amount::new(-5), Err(ShopError::ValidationFailed(_))));
    }

    #[test]
    fn test_subtotal_and_sum() {
        let unit = Amount::new(50000).unwrap();
        assert_eq!(unit.times(2), Amount(100000));
        let total: Amount = [Amount(100), Amount(250)].into_iter().sum();
        assert_eq!(total, Amount(350));
    }

    #[test]
    fn test_display_in_major_units() {
        assert_eq!(Amount(75000).to_string(), "750.00");
        assert_eq!(Amount(50).to_string(), "0.50");
    }
}
