//! # Command DTOs
//!
//! Typed command structs consumed by the engines in dukkan-engine.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller (IPC transport)                                                 │
//! │       │  builds a command DTO                                           │
//! │       ▼                                                                 │
//! │  opens ambient transaction scope                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.commit(&input)      ← all repository writes happen here        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  scope closes (commit or rollback)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.side_effects(&receipt).await   ← audit logging, best effort    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation lives in [`crate::validation`] as explicit functions
//! returning typed errors — no reflection, no runtime schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{AdjustmentReason, PaymentMethod, PaymentType, PeriodType};

/// Default unit factor: the entered unit IS the base unit.
fn default_unit_factor() -> i64 {
    1
}

// =============================================================================
// Sale Commands
// =============================================================================

/// One line of a sale command.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItemInput {
    pub product_id: String,
    /// Quantity in the entered unit.
    pub quantity: i64,
    /// Base units per entered unit (carton of 12 → 12). Defaults to 1.
    #[serde(default = "default_unit_factor")]
    pub unit_factor: i64,
    /// Price per entered unit in minor units.
    pub unit_price_minor: i64,
    /// Absolute discount on this line in minor units.
    #[serde(default)]
    pub discount_minor: i64,
    /// Explicit lot to deplete. Auto-selected when absent.
    pub batch_id: Option<String>,
}

/// Command: create a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSaleInput {
    pub items: Vec<SaleItemInput>,
    /// Required when payment_type is Credit.
    pub customer_id: Option<String>,
    pub payment_type: PaymentType,
    /// Amount tendered up front, in minor units.
    #[serde(default)]
    pub paid_amount_minor: i64,
    /// Document-level tax rate in basis points.
    pub tax_rate_bps: Option<u32>,
    /// Interest rate in basis points; applied only to credit/mixed sales.
    pub interest_rate_bps: Option<u32>,
    /// Retry-safety token. Same key → same sale, no duplicate writes.
    pub idempotency_key: Option<String>,
}

// =============================================================================
// Purchase Commands
// =============================================================================

/// One line of a purchase command. Each line receives a new batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItemInput {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default = "default_unit_factor")]
    pub unit_factor: i64,
    /// Cost per entered unit in minor units.
    pub unit_cost_minor: i64,
    /// Supplier lot number for the batch created by this line.
    pub batch_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Command: create a purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePurchaseInput {
    pub items: Vec<PurchaseItemInput>,
    /// Required when payment_type is Credit.
    pub supplier_id: Option<String>,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub paid_amount_minor: i64,
    /// VAT-input rate in basis points; split into its own journal line.
    pub tax_rate_bps: Option<u32>,
    pub idempotency_key: Option<String>,
}

// =============================================================================
// Payment Command
// =============================================================================

/// Command: apply a payment against an existing sale XOR purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddPaymentInput {
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    /// Requested amount in minor units; clamped to the remaining balance.
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub idempotency_key: Option<String>,
}

// =============================================================================
// Stock Adjustment Command
// =============================================================================

/// Command: adjust a product's batch-level stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdjustStockInput {
    pub product_id: String,
    /// Signed base-unit change. Never zero.
    pub quantity_change: i64,
    pub reason: AdjustmentReason,
    /// Explicit lot to add to / deduct from. Auto-handled when absent:
    /// positive changes open a new lot, negative changes pick the first
    /// lot that covers the whole deduction.
    pub batch_id: Option<String>,
}

// =============================================================================
// Posting Command
// =============================================================================

/// Command: post all unposted journal entries in a period.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostPeriodInput {
    pub period_type: PeriodType,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
}
