//! # Money Module
//!
//! Integer peso amounts for every price, total and fee in the storefront.
//!
//! ## Centavos, Not Floats
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A browser cart that sums floats drifts:                                │
//! │    ₱33.30 + ₱33.30 + ₱33.40 = 99.99999999999999                        │
//! │                                                                         │
//! │  The order record is compared against the cart with EXACT equality,    │
//! │  so both sides must compute in the same integer unit:                  │
//! │    3330 + 3330 + 3340 = 10000 centavos = ₱100.00                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharmaline_core::money::Money;
//!
//! let price = Money::from_centavos(50_000); // ₱500.00
//! let line = price * 2;
//! assert_eq!(line.to_string(), "₱1000.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A peso amount held in centavos (1/100 of a peso).
///
/// Serialized as a bare integer so the persisted cart and the order payload
/// carry the same value the arithmetic works with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a value from centavos.
    #[inline]
    pub const fn from_centavos(centavos: i64) -> Self {
        Money(centavos)
    }

    /// Creates a value from whole pesos and centavos.
    ///
    /// ```rust
    /// use pharmaline_core::money::Money;
    ///
    /// assert_eq!(Money::from_pesos(999, 99).centavos(), 99_999);
    /// ```
    #[inline]
    pub const fn from_pesos(pesos: i64, centavos: i64) -> Self {
        if pesos < 0 {
            Money(pesos * 100 - centavos)
        } else {
            Money(pesos * 100 + centavos)
        }
    }

    #[inline]
    pub const fn centavos(&self) -> i64 {
        self.0
    }

    /// Whole-peso portion, truncated toward zero.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Centavo portion, always 0-99.
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Takes `percent` whole percent of this amount, rounding half up.
    ///
    /// This is the per-unit savings of a discounted product:
    /// `round_half_up(P × D / 100)`.
    ///
    /// ```rust
    /// use pharmaline_core::money::Money;
    ///
    /// // ₱500.00 at 15% off saves ₱75.00
    /// assert_eq!(Money::from_centavos(50_000).percentage(15).centavos(), 7_500);
    /// // ₱0.05 at 10% is half a centavo and rounds up
    /// assert_eq!(Money::from_centavos(5).percentage(10).centavos(), 1);
    /// ```
    pub fn percentage(&self, percent: u8) -> Money {
        self.apply_bps(percent as u32 * 100)
    }

    /// Computes tax on this amount at `rate`, rounding half up.
    ///
    /// ```rust
    /// use pharmaline_core::money::Money;
    /// use pharmaline_core::types::TaxRate;
    ///
    /// // ₱850.00 at 12% VAT
    /// let tax = Money::from_centavos(85_000).calculate_tax(TaxRate::VAT);
    /// assert_eq!(tax.centavos(), 10_200);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.apply_bps(rate.bps())
    }

    /// `(amount × bps + 5000) / 10000` in i128 so large carts cannot overflow.
    fn apply_bps(&self, bps: u32) -> Money {
        let scaled = (self.0 as i128 * bps as i128 + 5000).div_euclid(10_000);
        Money(scaled as i64)
    }

    /// `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Line total for `qty` units at this unit price. `None` on overflow.
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums `amounts`, or `None` if the total does not fit.
    ///
    /// ```rust
    /// use pharmaline_core::money::Money;
    ///
    /// let lines = [Money::from_centavos(i64::MAX), Money::from_centavos(2)];
    /// assert_eq!(Money::checked_sum(lines), None);
    /// ```
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Subtracts `other`, stopping at zero.
    #[inline]
    pub fn saturating_sub_zero(self, other: Money) -> Money {
        if other.0 >= self.0 {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `₱1234.50`: peso sign, no grouping, exactly two decimals.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₱{}.{:02}",
            sign,
            self.pesos().abs(),
            self.centavos_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
