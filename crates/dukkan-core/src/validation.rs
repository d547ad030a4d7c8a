//! # Validation Module
//!
//! Explicit validation functions for the command DTOs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (deserialization)                                  │
//! │  ├── Type/shape checks — wrong types never reach the core              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE — policy checks on typed commands                │
//! │  ├── empty items, zero quantity change, credit without customer        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engines — stateful checks against repositories               │
//! │  ├── stock levels, document state, batch ownership                     │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different class of error       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities are `i64` end to end, so "non-integer quantity" rejection is
//! enforced by the type system before this module runs.

use crate::commands::{
    AddPaymentInput, AdjustStockInput, CreatePurchaseInput, CreateSaleInput, PostPeriodInput,
};
use crate::error::{ValidationError, ValidationResult};
use crate::types::PaymentType;

// =============================================================================
// Scalar Validators
// =============================================================================

/// Validates a quantity in the entered unit. Must be positive.
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a unit factor (base units per entered unit). Must be >= 1.
pub fn validate_unit_factor(factor: i64) -> ValidationResult<()> {
    if factor < 1 {
        return Err(ValidationError::MustBePositive {
            field: "unit_factor".to_string(),
        });
    }
    Ok(())
}

/// Validates an amount in minor units that must be non-negative
/// (prices, discounts, paid amounts).
pub fn validate_non_negative(field: &str, minor: i64) -> ValidationResult<()> {
    if minor < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Command Validators
// =============================================================================

/// Validates a [`CreateSaleInput`].
///
/// ## Rules
/// - items must not be empty
/// - each line: quantity > 0, unit_factor >= 1, price/discount >= 0
/// - each line: discount never exceeds the line gross (quantity × price),
///   so no line — and therefore no document — can total negative
/// - paid amount >= 0
/// - payment_type Credit requires a customer_id
pub fn validate_create_sale(input: &CreateSaleInput) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for item in &input.items {
        validate_quantity("quantity", item.quantity)?;
        validate_unit_factor(item.unit_factor)?;
        validate_non_negative("unit_price_minor", item.unit_price_minor)?;
        validate_non_negative("discount_minor", item.discount_minor)?;

        let gross_minor = item.quantity * item.unit_price_minor;
        if item.discount_minor > gross_minor {
            return Err(ValidationError::OutOfRange {
                field: "discount_minor".to_string(),
                min: 0,
                max: gross_minor,
            });
        }
    }

    validate_non_negative("paid_amount_minor", input.paid_amount_minor)?;

    if input.payment_type == PaymentType::Credit && input.customer_id.is_none() {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a [`CreatePurchaseInput`] (mirror of the sale rules, AP-side).
pub fn validate_create_purchase(input: &CreatePurchaseInput) -> ValidationResult<()> {
    if input.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for item in &input.items {
        validate_quantity("quantity", item.quantity)?;
        validate_unit_factor(item.unit_factor)?;
        validate_non_negative("unit_cost_minor", item.unit_cost_minor)?;
    }

    validate_non_negative("paid_amount_minor", input.paid_amount_minor)?;

    if input.payment_type == PaymentType::Credit && input.supplier_id.is_none() {
        return Err(ValidationError::Required {
            field: "supplier_id".to_string(),
        });
    }

    Ok(())
}

/// Validates an [`AddPaymentInput`].
///
/// ## Rules
/// - exactly one of sale_id / purchase_id is set
/// - amount > 0
pub fn validate_add_payment(input: &AddPaymentInput) -> ValidationResult<()> {
    match (&input.sale_id, &input.purchase_id) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(ValidationError::InvalidFormat {
                field: "target".to_string(),
                reason: "exactly one of sale_id or purchase_id must be set".to_string(),
            });
        }
        _ => {}
    }

    if input.amount_minor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount_minor".to_string(),
        });
    }

    Ok(())
}

/// Validates an [`AdjustStockInput`]. Zero changes are meaningless and
/// rejected.
pub fn validate_adjust_stock(input: &AdjustStockInput) -> ValidationResult<()> {
    if input.quantity_change == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "quantity_change".to_string(),
        });
    }
    Ok(())
}

/// Validates a [`PostPeriodInput`]. The period must be well-ordered.
pub fn validate_post_period(input: &PostPeriodInput) -> ValidationResult<()> {
    if input.period_start > input.period_end {
        return Err(ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: "period_start must not be after period_end".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
