//! # Repository Ports
//!
//! Narrow read/write contracts the engines depend on. The persistence
//! layer behind each port (a relational store, accessed synchronously) is
//! the host application's business.
//!
//! ## Port Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Every method is SYNCHRONOUS. The caller wraps a whole commit       │
//! │     phase in one ambient transaction scope; a port call never          │
//! │     suspends inside it.                                                 │
//! │  2. Every method is commit-safe: a thrown CoreError means "roll back   │
//! │     everything written so far in this call".                            │
//! │  3. Ports are the ONLY shared mutable resource. Engines hold           │
//! │     Arc<dyn Port> references and no other state.                       │
//! │  4. The async surface of the system lives in the side-effects phase    │
//! │     (see `audit`), never behind these traits.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use dukkan_core::error::CoreResult;
use dukkan_core::types::{
    Account, BatchStatus, CustomerLedgerEntry, DocumentStatus, InventoryMovement, JournalEntry,
    Payment, PostingBatch, Product, ProductBatch, ProductStatus, Purchase, PurchaseItem, Sale,
    SaleItem, SupplierLedgerEntry,
};

// =============================================================================
// Products & Batches
// =============================================================================

/// Products, their cached stock counter, and their receipt lots.
pub trait ProductRepository: Send + Sync {
    fn find_by_id(&self, id: &str) -> CoreResult<Option<Product>>;

    /// Applies a signed delta to the cached stock counter.
    ///
    /// ## Delta Pattern
    /// Deltas, not absolute writes: two concurrent terminals selling the
    /// same product must both land (`-3` then `-2`), never clobber.
    fn update_stock(&self, id: &str, delta: i64) -> CoreResult<()>;

    /// Overwrites the cached stock counter. Used by the Stock Adjustment
    /// Engine when re-syncing the cache to the batch sum.
    fn set_stock(&self, id: &str, stock: i64) -> CoreResult<()>;

    fn set_status(&self, id: &str, status: ProductStatus) -> CoreResult<()>;

    fn insert_batch(&self, batch: &ProductBatch) -> CoreResult<()>;

    fn find_batch(&self, batch_id: &str) -> CoreResult<Option<ProductBatch>>;

    /// All batches of a product, in creation order. Creation order is the
    /// order batch auto-selection scans.
    fn batches_for_product(&self, product_id: &str) -> CoreResult<Vec<ProductBatch>>;

    /// Applies a signed delta to a batch's quantity_on_hand.
    fn update_batch_stock(&self, batch_id: &str, delta: i64) -> CoreResult<()>;

    fn set_batch_status(&self, batch_id: &str, status: BatchStatus) -> CoreResult<()>;
}

// =============================================================================
// Sales & Purchases
// =============================================================================

/// Sales invoices and their line items.
pub trait SaleRepository: Send + Sync {
    /// Inserts a sale and all its items in one shot.
    ///
    /// Must surface `CoreError::Conflict` when the sale's idempotency key
    /// already exists — the store's uniqueness constraint is the final
    /// tie-breaker for racing retries.
    fn insert(&self, sale: &Sale, items: &[SaleItem]) -> CoreResult<()>;

    fn find_by_id(&self, id: &str) -> CoreResult<Option<Sale>>;

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Sale>>;

    /// Partial update written by the Payment Engine: new paid/remaining
    /// amounts plus the resulting status.
    fn apply_payment_progress(
        &self,
        id: &str,
        paid_minor: i64,
        remaining_minor: i64,
        status: DocumentStatus,
    ) -> CoreResult<()>;

    fn update_status(&self, id: &str, status: DocumentStatus) -> CoreResult<()>;
}

/// Procurement invoices and their line items. Mirror of [`SaleRepository`].
pub trait PurchaseRepository: Send + Sync {
    fn insert(&self, purchase: &Purchase, items: &[PurchaseItem]) -> CoreResult<()>;

    fn find_by_id(&self, id: &str) -> CoreResult<Option<Purchase>>;

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Purchase>>;

    fn apply_payment_progress(
        &self,
        id: &str,
        paid_minor: i64,
        remaining_minor: i64,
        status: DocumentStatus,
    ) -> CoreResult<()>;

    fn update_status(&self, id: &str, status: DocumentStatus) -> CoreResult<()>;
}

// =============================================================================
// Payments
// =============================================================================

/// Money receipts/disbursements. Payments are immutable once created.
pub trait PaymentRepository: Send + Sync {
    /// Surfaces `CoreError::Conflict` on a duplicate idempotency key.
    fn insert(&self, payment: &Payment) -> CoreResult<()>;

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Payment>>;

    fn find_by_sale_id(&self, sale_id: &str) -> CoreResult<Vec<Payment>>;

    fn find_by_purchase_id(&self, purchase_id: &str) -> CoreResult<Vec<Payment>>;
}

// =============================================================================
// Inventory Movements
// =============================================================================

/// Append-only stock ledger. Movements are never updated or deleted.
pub trait InventoryRepository: Send + Sync {
    fn insert_movement(&self, movement: &InventoryMovement) -> CoreResult<()>;
}

// =============================================================================
// Accounting
// =============================================================================

/// Chart of accounts and the journal.
pub trait AccountingRepository: Send + Sync {
    /// Accounts are looked up by business code, never by id.
    fn find_account_by_code(&self, code: &str) -> CoreResult<Option<Account>>;

    /// Inserts a journal entry with its lines.
    ///
    /// Rejects entries constructed with `is_posted = true`
    /// (`CoreError::InvalidState`): the Posting Engine is the only path
    /// that ever posts an entry.
    fn insert_journal_entry(&self, entry: &JournalEntry) -> CoreResult<()>;

    fn find_entry_by_id(&self, id: &str) -> CoreResult<Option<JournalEntry>>;
}

/// Posting batches and the journal state machine's storage side.
pub trait PostingRepository: Send + Sync {
    fn insert_batch(&self, batch: &PostingBatch) -> CoreResult<()>;

    fn find_batch(&self, id: &str) -> CoreResult<Option<PostingBatch>>;

    /// All entries with `is_posted = false` and `is_reversed = false`
    /// (voided entries stay behind) whose entry_date falls in
    /// `[start, end]`.
    fn unposted_entries_in(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<JournalEntry>>;

    /// Marks every listed entry `is_posted = true` with the batch id set.
    fn mark_entries_posted(&self, entry_ids: &[String], batch_id: &str) -> CoreResult<()>;

    /// Marks an entry `is_reversed = true` (reversal of a posted entry,
    /// or void of an unposted one).
    fn mark_entry_reversed(&self, entry_id: &str) -> CoreResult<()>;

    fn set_batch_locked(&self, id: &str, locked: bool) -> CoreResult<()>;

    fn is_batch_locked(&self, id: &str) -> CoreResult<bool>;
}

// =============================================================================
// AR/AP Ledgers
// =============================================================================

/// Append-only running balance ledger for accounts receivable.
pub trait CustomerLedgerRepository: Send + Sync {
    fn append(&self, entry: &CustomerLedgerEntry) -> CoreResult<()>;

    /// `balance_after` of the customer's newest entry, or 0 when none.
    fn last_balance(&self, customer_id: &str) -> CoreResult<i64>;

    /// Current balance. For an append-only store this equals
    /// [`Self::last_balance`].
    fn balance(&self, customer_id: &str) -> CoreResult<i64>;
}

/// Append-only running balance ledger for accounts payable.
pub trait SupplierLedgerRepository: Send + Sync {
    fn append(&self, entry: &SupplierLedgerEntry) -> CoreResult<()>;

    fn last_balance(&self, supplier_id: &str) -> CoreResult<i64>;

    fn balance(&self, supplier_id: &str) -> CoreResult<i64>;
}

// =============================================================================
// Settings
// =============================================================================

/// String key-value settings. The engines use it only for feature
/// toggles (see [`dukkan_core::settings_keys`]).
pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str) -> CoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> CoreResult<()>;
}

/// Reads a feature toggle. Absent keys default to enabled; only an
/// explicit "false"/"0"/"off" disables.
pub fn feature_enabled(settings: &dyn SettingsRepository, key: &str) -> CoreResult<bool> {
    Ok(match settings.get(key)? {
        Some(value) => !matches!(value.trim(), "false" | "0" | "off"),
        None => true,
    })
}
