//! # Domain Types
//!
//! Core domain types used throughout the Dukkan POS transaction core.
//!
//! ## Aggregate Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Five Interdependent Aggregates                          │
//! │                                                                         │
//! │  ┌──────────┐    depletes    ┌──────────────┐   append-only            │
//! │  │   Sale   │───────────────►│ ProductBatch │──► InventoryMovement     │
//! │  │ Purchase │    receives    └──────────────┘                          │
//! │  └────┬─────┘                                                          │
//! │       │ settles                                                        │
//! │       ▼                                                                │
//! │  ┌──────────┐   projects    ┌──────────────┐   period-close           │
//! │  │ Payment  │──────────────►│ JournalEntry │──► PostingBatch          │
//! │  └────┬─────┘               └──────────────┘                          │
//! │       │ tracks                                                         │
//! │       ▼                                                                │
//! │  CustomerLedgerEntry / SupplierLedgerEntry (running AR/AP balances)   │
//! │                                                                         │
//! │  All five are written inside ONE atomic scope by an engine's          │
//! │  commit phase. No entity is cached across calls.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an `id` (UUID v4, immutable, used for relations);
//! accounts additionally carry a business `code` and are looked up by
//! code, never by id, from call sites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product & Batches
// =============================================================================

/// Availability status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Sellable, cached stock above zero.
    Available,
    /// Cached stock at zero; flips back on receipt or positive adjustment.
    OutOfStock,
    /// Soft-deleted; not sellable.
    Inactive,
}

/// A sellable item with a cached stock count.
///
/// ## Invariant
/// `stock` must equal the sum of `quantity_on_hand` across the product's
/// active batches. Only the Stock Adjustment, Sale, and Purchase engines
/// mutate it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to cashier and on documents.
    pub name: String,

    /// Cost per base unit in minor units (drives COGS).
    pub cost_price_minor: i64,

    /// Selling price per base unit in minor units.
    pub selling_price_minor: i64,

    /// Cached stock in base units (sum of active batch quantities).
    pub stock: i64,

    pub status: ProductStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the cost price as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_minor(self.cost_price_minor)
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_minor(self.selling_price_minor)
    }
}

/// Lifecycle status of a receipt lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    /// Set iff quantity_on_hand reaches 0.
    Depleted,
}

/// A receipt lot of a product (batch/expiry tracking).
///
/// Created on purchase receipt or opening adjustment; depleted by sales
/// and negative adjustments. `quantity_on_hand` never goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductBatch {
    pub id: String,
    pub product_id: String,

    /// Supplier lot number, when known.
    pub batch_number: Option<String>,

    /// Base units originally received into this lot.
    pub quantity_received: i64,

    /// Base units still on hand. >= 0 always.
    pub quantity_on_hand: i64,

    /// Cost per base unit in minor units at receipt time.
    pub cost_per_unit_minor: i64,

    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,

    pub status: BatchStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Movements
// =============================================================================

/// Direction of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
}

/// What caused a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    Sale,
    Purchase,
    Manual,
    Damage,
    Opening,
}

/// Caller-facing reason for a manual stock adjustment. A strict subset of
/// [`MovementReason`]: sale/purchase movements are never created through
/// the adjustment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Manual,
    Damage,
    Opening,
}

impl From<AdjustmentReason> for MovementReason {
    fn from(reason: AdjustmentReason) -> Self {
        match reason {
            AdjustmentReason::Manual => MovementReason::Manual,
            AdjustmentReason::Damage => MovementReason::Damage,
            AdjustmentReason::Opening => MovementReason::Opening,
        }
    }
}

/// Immutable ledger row for every stock change.
///
/// Append-only: created by every stock-affecting operation, never updated
/// or deleted. `batch_id` is always set — auto-selected when the caller
/// didn't supply one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    /// Never null: every movement is pinned to a lot.
    pub batch_id: String,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    /// Base units moved, always positive; direction lives in movement_type.
    pub quantity_base: i64,
    /// Product cached stock before this movement.
    pub stock_before: i64,
    /// Product cached stock after this movement.
    pub stock_after: i64,
    /// Originating document kind ("sale", "purchase", "adjustment").
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sales & Purchases
// =============================================================================

/// Status shared by sales and purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Unpaid balance remains.
    Pending,
    /// Fully settled.
    Completed,
    /// Voided; no further payments accepted.
    Cancelled,
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Pending
    }
}

/// How the customer/supplier settles the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Credit,
    Mixed,
}

/// Tender used for an individual payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// A sales invoice.
///
/// ## Invariants
/// - `total = subtotal − discount + tax (+ interest)`
/// - `remaining = max(0, total − paid)` after currency-threshold collapse
/// - Created once per idempotency key; only the Payment Engine mutates
///   `paid`/`remaining`/`status` afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub customer_id: Option<String>,
    pub payment_type: PaymentType,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    /// Interest added to credit/mixed sales (0 otherwise).
    pub interest_minor: i64,
    /// Cost of goods sold, accumulated at commit time for reporting.
    pub cogs_minor: i64,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub remaining_minor: i64,
    pub status: DocumentStatus,
    /// Caller-supplied retry-safety token. Unique in the backing store.
    pub idempotency_key: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_minor(self.remaining_minor)
    }
}

/// A line item in a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity in the entered unit.
    pub quantity: i64,
    /// Base units per entered unit (carton of 12 → 12).
    pub unit_factor: i64,
    /// quantity × unit_factor.
    pub quantity_base: i64,
    /// Price per entered unit in minor units at time of sale (frozen).
    pub unit_price_minor: i64,
    pub discount_minor: i64,
    /// unit_price × quantity − discount.
    pub line_total_minor: i64,
    /// The lot this line depleted. Never split across batches.
    pub batch_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A procurement invoice. Same shape as Sale, AP-side.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: Option<String>,
    pub payment_type: PaymentType,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub tax_minor: i64,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub remaining_minor: i64,
    pub status: DocumentStatus,
    pub idempotency_key: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_minor(self.remaining_minor)
    }
}

/// A line item in a purchase. Each line receives a new `ProductBatch`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_factor: i64,
    pub quantity_base: i64,
    /// Cost per entered unit in minor units.
    pub unit_cost_minor: i64,
    pub line_total_minor: i64,
    /// The lot created by receiving this line.
    pub batch_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payments
// =============================================================================

/// A single money receipt/disbursement against a sale or purchase.
///
/// ## Invariants
/// - Exactly one of `sale_id` / `purchase_id` is set
/// - `amount > 0`, and never exceeds the target's remaining balance at
///   creation time (the Payment Engine clamps)
/// - Immutable once created
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub method: PaymentMethod,
    pub amount_minor: i64,
    pub idempotency_key: Option<String>,
    /// External reference (bank slip number, etc.).
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_minor(self.amount_minor)
    }
}

// =============================================================================
// Accounting
// =============================================================================

/// Chart-of-accounts classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// A chart-of-accounts node. Seeded externally; read-only to this core.
/// Looked up by `code`, never by id, from call sites.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Account {
    pub id: String,
    /// Unique business code, e.g. "1000" for Cash.
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub is_active: bool,
}

/// One side of a double-entry journal line. Exactly one of debit/credit
/// is nonzero per line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JournalLine {
    pub id: String,
    pub entry_id: String,
    pub account_id: String,
    /// Denormalized for readability of reports and tests.
    pub account_code: String,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub memo: Option<String>,
}

/// A double-entry accounting record.
///
/// ## Lifecycle
/// ```text
/// unposted ──(Posting Engine)──► posted ──(Reversal Engine)──► reversed
///     │
///     └──(Reversal Engine, void)──► voided in place (terminal)
/// ```
///
/// Created unposted by the Sale/Purchase/Payment engines; `is_posted` is
/// set only by the Posting Engine. Σdebit(lines) == Σcredit(lines) always.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JournalEntry {
    pub id: String,
    #[ts(as = "String")]
    pub entry_date: DateTime<Utc>,
    pub description: String,
    /// Originating document kind ("sale", "purchase", "payment").
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub is_posted: bool,
    /// True when reversed (posted entries) or voided (unposted entries).
    pub is_reversed: bool,
    /// On a reversal entry: the id of the entry it cancels.
    pub reversal_of_id: Option<String>,
    pub posting_batch_id: Option<String>,
    pub created_by: Option<String>,
    pub lines: Vec<JournalLine>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Sum of all debit amounts.
    pub fn debit_total(&self) -> Money {
        Money::from_minor(self.lines.iter().map(|l| l.debit_minor).sum())
    }

    /// Sum of all credit amounts.
    pub fn credit_total(&self) -> Money {
        Money::from_minor(self.lines.iter().map(|l| l.credit_minor).sum())
    }

    /// The double-entry invariant: Σdebit == Σcredit.
    pub fn is_balanced(&self) -> bool {
        self.debit_total() == self.credit_total()
    }
}

/// Lifecycle status of a posting batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PostingBatchStatus {
    Draft,
    Posted,
    /// One-way safety gate: entries in a locked batch cannot be reversed
    /// or amended.
    Locked,
}

/// Period granularity for a posting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Daily,
    Monthly,
    Custom,
}

/// A period-close grouping of posted entries.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostingBatch {
    pub id: String,
    pub period_type: PeriodType,
    #[ts(as = "String")]
    pub period_start: DateTime<Utc>,
    #[ts(as = "String")]
    pub period_end: DateTime<Utc>,
    pub entries_count: i64,
    /// Aggregated debit total of the batch's entries.
    pub total_minor: i64,
    pub status: PostingBatchStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub locked_at: Option<DateTime<Utc>>,
}

// =============================================================================
// AR/AP Ledgers
// =============================================================================

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerTransactionType {
    /// Unpaid balance created by a sale/purchase (+).
    Invoice,
    /// Settlement applied against the balance (−).
    Payment,
    /// Manual correction.
    Adjustment,
}

/// Running balance ledger row for accounts receivable.
///
/// Appended by the Sale and Payment engines; never mutated.
/// `balance_after = prior balance_after + signed amount`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerLedgerEntry {
    pub id: String,
    pub customer_id: String,
    pub transaction_type: LedgerTransactionType,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    /// Signed: invoices positive, payments negative.
    pub amount_minor: i64,
    pub balance_after_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Running balance ledger row for accounts payable. Mirror of
/// [`CustomerLedgerEntry`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierLedgerEntry {
    pub id: String,
    pub supplier_id: String,
    pub transaction_type: LedgerTransactionType,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub amount_minor: i64,
    pub balance_after_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
