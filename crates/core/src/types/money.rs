//! Monetary amounts using decimal arithmetic.
//!
//! All prices, line totals and order totals flow through [`Money`] so that no
//! amount ever passes through binary floating point. The storefront sells in a
//! single currency (USD); there is no currency code on the type.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places in a displayed or charged amount.
pub const CURRENCY_DECIMALS: u32 = 2;

/// An amount of money in dollars (not cents).
///
/// Arithmetic is exact; rounding to cents only happens through
/// [`Money::round_currency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal number of dollars.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CURRENCY_DECIMALS))
    }

    /// Convert a JSON number from the content backend, rounded to cents.
    ///
    /// Returns `None` for NaN or infinite values.
    #[must_use]
    pub fn from_f64(amount: f64) -> Option<Self> {
        Decimal::from_f64(amount).map(|d| Self(d).round_currency())
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round to cents, midpoint away from zero (0.125 -> 0.13).
    #[must_use]
    pub fn round_currency(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Multiply by a line quantity. Saturates instead of overflowing.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Take a percentage (0-100) of this amount, unrounded.
    ///
    /// Saturates instead of overflowing, like the other operations.
    #[must_use]
    pub fn percent(self, percentage: Decimal) -> Self {
        let hundredths = self.0.checked_mul(percentage).map_or_else(
            || (self.0 / Decimal::ONE_HUNDRED).saturating_mul(percentage),
            |product| product / Decimal::ONE_HUNDRED,
        );
        Self(hundredths)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// Formats as `$12.50`, rounding to cents for display only.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_currency().0;
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-${:.2}", rounded.abs())
        } else {
            write!(f, "${:.2}", rounded.abs())
        }
    }
}
