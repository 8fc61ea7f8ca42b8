//! Fixed-point money type.
//!
//! # Motivation
//!
//! All loyalty-point amounts in this system use an integer minor-unit
//! representation (cents) stored as `i64`. Using raw `i64` for money is
//! error-prone: it allows accidental arithmetic with unrelated integers
//! (user IDs, row counts) without any compile-time signal.
//!
//! `Cents` wraps the raw `i64` so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Cents` with unrelated `i64` values in arithmetic.
//!
//! # Scale
//!
//! 1 point = 100 cents. All balances, accruals, and withdrawal sums use this
//! scale. The only place decimal major units exist is at wire boundaries
//! (accrual responses, API JSON), converted exactly once in each direction.
//!
//! # Arithmetic
//!
//! `Add`, `Sub`, `AddAssign`, `SubAssign` are implemented for
//! `Cents op Cents`; these carry standard integer overflow semantics.
//! `checked_sub` / `saturating_add` are provided for the ledger paths that
//! must not wrap.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A monetary amount in integer minor units (cents).
///
/// 1 point = `Cents(100)`.
///
/// Use [`Cents::new`] for explicit construction and [`Cents::raw`] to cross
/// boundaries that require raw integers (SQL binds, wire encoding). There is
/// intentionally no `From<i64>` implementation.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero amount.
    pub const ZERO: Cents = Cents(0);

    /// Construct from a raw minor-unit integer.
    #[inline]
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Extract the raw minor-unit integer.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// `true` when the amount is strictly positive.
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked subtraction; `None` on overflow.
    #[inline]
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    /// Saturating addition — clamps at `i64::MAX`.
    #[inline]
    pub fn saturating_add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }

    /// Convert a decimal major-unit amount (e.g. `729.98` from a wire
    /// payload) into cents, rounding to the nearest cent.
    ///
    /// This is the single sanctioned float-to-money conversion point; all
    /// arithmetic after it is integer.
    #[inline]
    pub fn from_major_f64(major: f64) -> Cents {
        Cents((major * 100.0).round() as i64)
    }

    /// Render as decimal major units for wire payloads (e.g. `729.98`).
    ///
    /// Computed from integers; no float arithmetic is performed on the
    /// amount itself.
    #[inline]
    pub fn to_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Cents {
    type Output = Cents;
    #[inline]
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Cents;
    #[inline]
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl AddAssign for Cents {
    #[inline]
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    #[inline]
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
