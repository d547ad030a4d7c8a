//! # Totals Module
//!
//! Pure document-total math shared by the Sale and Purchase engines.
//!
//! ## Total Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal  = Σ (unit_price × quantity)                                  │
//! │  discount  = Σ line discounts                                           │
//! │  taxable   = subtotal − discount                                        │
//! │  tax       = taxable × tax_bps / 10000        (rounded half-up)        │
//! │  interest  = (taxable + tax) × interest_bps / 10000                    │
//! │              (credit/mixed documents only)                              │
//! │  total     = taxable + tax + interest                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All inputs and outputs are integral [`Money`]; rates travel as basis
//! points so no floating point ever enters the calculation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Line Amounts
// =============================================================================

/// The monetary slice of one document line, ready for totalling.
#[derive(Debug, Clone, Copy)]
pub struct LineAmounts {
    /// Quantity in the entered unit (pricing unit, not base unit).
    pub quantity: i64,
    /// Price per entered unit.
    pub unit_price: Money,
    /// Absolute discount on this line.
    pub discount: Money,
}

impl LineAmounts {
    /// Gross line total before discount.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Net line total after discount.
    #[inline]
    pub fn net(&self) -> Money {
        self.gross() - self.discount
    }
}

// =============================================================================
// Document Totals
// =============================================================================

/// Computed totals for a sale or purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    /// Zero unless an interest rate was supplied (credit/mixed only).
    pub interest: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Computes document totals from line amounts and optional rates.
    ///
    /// `interest_rate_bps` must already be gated by the caller: the
    /// engines pass it only for credit/mixed documents.
    pub fn compute(
        lines: &[LineAmounts],
        tax_rate_bps: Option<u32>,
        interest_rate_bps: Option<u32>,
    ) -> DocumentTotals {
        let mut subtotal = Money::zero();
        let mut discount = Money::zero();
        for line in lines {
            subtotal += line.gross();
            discount += line.discount;
        }

        let taxable = subtotal - discount;
        let tax = match tax_rate_bps {
            Some(bps) => taxable.portion_bps(bps),
            None => Money::zero(),
        };

        let before_interest = taxable + tax;
        let interest = match interest_rate_bps {
            Some(bps) => before_interest.portion_bps(bps),
            None => Money::zero(),
        };

        DocumentTotals {
            subtotal,
            discount,
            tax,
            interest,
            total: before_interest + interest,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
