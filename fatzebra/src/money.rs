//! Monetary amounts in integer cents.
//!
//! The gateway speaks Australian dollars as an integer number of cents, and so
//! does [`Amount`]. Floats are accepted as an input convenience and produced as
//! an output convenience, never used for arithmetic.

use std::{
    fmt,
    ops::{Add, AddAssign},
};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// An amount of money as a signed number of cents.
///
/// Serializes as a bare integer of cents, which is the gateway's wire format.
///
/// # Examples
///
/// ```
/// use fatzebra::Amount;
///
/// let price = Amount::from_dollars(12.34);
/// assert_eq!(price.cents(), 1234);
/// assert_eq!(price.to_string(), "$12.34");
///
/// let total = price + Amount::from_cents(3);
/// assert_eq!(total.to_string(), "$12.37");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a number of cents. Exact.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from a number of dollars.
    ///
    /// Multiplies by 100 and rounds to the nearest cent, ties away from zero
    /// (`0.125` becomes 13 cents). Non-finite input saturates the way float to
    /// integer casts do: `NaN` becomes zero.
    ///
    /// Do not do arithmetic on dollars in float form and convert afterwards;
    /// convert first and add [`Amount`]s.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "saturating cast is the documented behavior")]
    pub fn from_dollars(dollars: f64) -> Self {
        Self((dollars * 100.0).round() as i64)
    }

    /// Creates an amount from a decimal number of dollars.
    ///
    /// Rounds to whole cents, ties away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if the value does not fit in `i64` cents.
    pub fn from_decimal(dollars: Decimal) -> Result<Self> {
        let rounded = dollars.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(|| GatewayError::InvalidInput(format!("amount out of range: {dollars}")))
    }

    /// Returns the number of cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the amount in dollars as a float.
    ///
    /// For display or interop only.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "float output is a convenience only")]
    pub fn dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the amount in dollars as an exact decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns `true` if the amount is greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Amount {
    /// Formats as `$D.CC`, e.g. `$12.34`, `$0.40` or `$1500.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

/// Saturates at the `i64` bounds, so an overflowing sum stays above any
/// ceiling instead of wrapping negative. Use [`Amount::checked_add`] to detect
/// overflow.
impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl From<i64> for Amount {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}
