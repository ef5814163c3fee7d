//! # Money
//!
//! Prices and order amounts are integer minor units (fen). A ¥0.10
//! discount on a ¥0.20 line has to leave exactly ¥0.10, which `f64`
//! cannot promise.
//!
//! ```text
//! Medicine.retail_price_cents ─► PricedLine.unit_price × qty ─► subtotal
//!                                                                  │
//! Order.total = Σ subtotals ◄──────────────────────────────────────┘
//! Order.actual_payment = original − discount
//! ```
//!
//! ```rust
//! use pharmacy_core::money::Money;
//!
//! let subtotal = Money::from_cents(1000) * 3;
//! let paid = subtotal - Money::from_cents(500);
//! assert_eq!(paid.cents(), 2500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};
use ts_rs::TS;

/// An amount in fen. Serializes as a bare integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Unit price × quantity, saturating at the `i64` bounds. Stored rows
    /// were validated on the way in; totals over caller input use
    /// [`checked_multiply_quantity`](Self::checked_multiply_quantity).
    #[inline]
    pub const fn multiply_quantity(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Unit price × quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Σ amounts, `None` if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::default(), Money::checked_add)
    }
}

/// `¥10.99`, `-¥5.50`. For logs; the frontend formats its own.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}¥{}.{:02}", abs / 100, abs % 100)
    }
}

// Operators saturate instead of panicking in debug builds.

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::default(), Add::add)
    }
}
