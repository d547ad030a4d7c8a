//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! `CurrencyProfile` that carries per-currency rounding policy.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Minor Units                                      │
//! │    All amounts are i64 in the smallest currency unit. IQD is            │
//! │    zero-decimal, so minor == major; fractional currencies carry         │
//! │    their decimals in the CurrencyProfile.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dukkan_core::money::Money;
//!
//! // Create from minor units (the only way in)
//! let price = Money::from_minor(5000);
//!
//! // Arithmetic operations
//! let line = price * 2;
//! let tax = line.portion_bps(500); // 5% of the line
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for ledger payment entries
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// Product.selling_price ──► SaleItem.line_total ──► Sale.total
///                                                       │
///            JournalLine.debit/credit ◄── Payment ◄─────┤
///            LedgerEntry.amount       ◄─────────────────┘
///
/// EVERY monetary value in the system flows through this type.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (the smallest currency unit).
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the negated value (for ledger payment entries).
    #[inline]
    pub const fn negated(&self) -> Self {
        Money(-self.0)
    }

    /// Calculates a basis-point portion of this amount, rounded half-up.
    ///
    /// ## Basis Points
    /// 1 bps = 0.01% = 1/10000. A 5% tax is 500 bps; a 2% monthly interest
    /// rate is 200 bps. Keeping rates in bps keeps ALL money math integral.
    ///
    /// ## Implementation
    /// Integer math with i128 widening: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use dukkan_core::money::Money;
    ///
    /// let total = Money::from_minor(10000);
    /// assert_eq!(total.portion_bps(500).minor(), 500);  // 5%
    /// assert_eq!(total.portion_bps(825).minor(), 825);  // 8.25%
    /// ```
    pub fn portion_bps(&self, bps: u32) -> Money {
        // i128 prevents overflow on large amounts
        let portion = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_minor(portion as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Currency Profile
// =============================================================================

/// Per-currency rounding policy.
///
/// ## The Residual-Remainder Problem
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale total: 10,000 IQD   Paid: 9,900 IQD   Remaining: 100 IQD          │
/// │                                                                         │
/// │  The smallest circulating IQD denomination is 250. A 100 IQD debt      │
/// │  can never be settled in cash, so it would linger as a "pending"       │
/// │  sale forever. Remainders below the threshold collapse to zero and     │
/// │  the sale completes.                                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CurrencyProfile {
    /// ISO 4217 code, e.g. "IQD".
    pub code: String,

    /// Number of decimal places in the minor unit (0 for IQD).
    pub decimals: u8,

    /// Remaining amounts strictly below this many minor units collapse
    /// to zero when settling a sale, purchase, or payment.
    pub zero_threshold_minor: i64,
}

impl CurrencyProfile {
    /// Iraqi dinar: zero-decimal, smallest circulating denomination 250.
    pub fn iqd() -> Self {
        CurrencyProfile {
            code: "IQD".to_string(),
            decimals: 0,
            zero_threshold_minor: 250,
        }
    }

    /// A fractional currency (e.g. USD with 2 decimals). The threshold is
    /// one minor unit, i.e. only exact zero collapses.
    pub fn fractional(code: impl Into<String>, decimals: u8) -> Self {
        CurrencyProfile {
            code: code.into(),
            decimals,
            zero_threshold_minor: 1,
        }
    }

    /// Collapses an amount below the zero threshold to zero.
    pub fn collapse(&self, amount: Money) -> Money {
        if amount.minor() < self.zero_threshold_minor {
            Money::zero()
        } else {
            amount
        }
    }

    /// Computes the remaining balance after a payment:
    /// `max(0, total − paid)`, then collapsed per the threshold.
    pub fn remaining(&self, total: Money, paid: Money) -> Money {
        self.collapse((total - paid).max(Money::zero()))
    }
}

impl Default for CurrencyProfile {
    fn default() -> Self {
        CurrencyProfile::iqd()
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the raw minor amount. Currency formatting is the UI's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
