//! Decimal money and percentage rates.
//!
//! Amounts are kept at full `Decimal` precision through every calculation.
//! Rounding to two places (midpoint away from zero) only happens when a value
//! is presented, via [`Money::rounded`] or the `Display` impl.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Decimal places used when presenting currency amounts.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// A monetary amount in document currency units (not cents).
///
/// Signed: credit notes, retentions and negative totals are representable.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
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

    /// The amount rounded to currency precision (2 places, half away from zero).
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self × rate / 100`.
    pub fn percent(&self, rate: Rate) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// Multiply by a plain factor (quantity, exchange rate, metric dimension).
    pub fn scale(&self, factor: Decimal) -> Money {
        Money(self.0 * factor)
    }
}

impl ValueObject for Money {}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, rhs: Decimal) -> Money {
        self.scale(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

/// A percentage expressed in points (`14` means 14%).
///
/// Used for tax rates, line discounts, global discounts and withholding.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const HUNDRED: Rate = Rate(Decimal::ONE_HUNDRED);

    /// Build a rate from percentage points without range checks.
    pub fn percent(points: Decimal) -> Self {
        Self(points)
    }

    /// Build a rate, rejecting values outside `0..=100`.
    pub fn try_percent(points: Decimal) -> DomainResult<Self> {
        let rate = Self(points);
        rate.ensure_bounded("rate")?;
        Ok(rate)
    }

    pub fn points(&self) -> Decimal {
        self.0
    }

    /// `points / 100`.
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// `1 − points / 100`.
    pub fn complement(&self) -> Decimal {
        Decimal::ONE - self.fraction()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Validate that the rate lies in `0..=100`; `what` names the field in the error.
    pub fn ensure_bounded(&self, what: &str) -> DomainResult<()> {
        if self.0 < Decimal::ZERO || self.0 > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(format!(
                "{what} must be between 0 and 100, got {}",
                self.0
            )));
        }
        Ok(())
    }
}

impl ValueObject for Rate {}

impl core::fmt::Display for Rate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
