//! # In-Memory Store
//!
//! A single `MemoryStore` implements every repository port plus the audit
//! sink. It backs the integration tests and doubles as the reference
//! semantics for real port implementations: whatever a backend does, it
//! must be observationally equivalent to this.
//!
//! ## Fidelity Notes
//! - Batches and ledger rows live in `Vec`s, so creation order (the order
//!   batch auto-selection scans) is insertion order.
//! - Idempotency keys are enforced here the way a store's uniqueness
//!   constraint would: a duplicate insert surfaces `CoreError::Conflict`.
//! - `fail_audit` simulates a dead audit sink to prove side-effect
//!   failures never reach the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use dukkan_core::error::{CoreError, CoreResult};
use dukkan_core::types::{
    Account, AccountType, BatchStatus, CustomerLedgerEntry, DocumentStatus, InventoryMovement,
    JournalEntry, Payment, PostingBatch, PostingBatchStatus, Product, ProductBatch, ProductStatus,
    Purchase, PurchaseItem, Sale, SaleItem, SupplierLedgerEntry,
};
use dukkan_core::coa;

use crate::audit::{AuditEvent, AuditLog};
use crate::ports::{
    AccountingRepository, CustomerLedgerRepository, InventoryRepository, PaymentRepository,
    PostingRepository, ProductRepository, PurchaseRepository, SaleRepository, SettingsRepository,
    SupplierLedgerRepository,
};

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct State {
    products: HashMap<String, Product>,
    batches: Vec<ProductBatch>,
    sales: HashMap<String, Sale>,
    sale_items: Vec<SaleItem>,
    purchases: HashMap<String, Purchase>,
    purchase_items: Vec<PurchaseItem>,
    payments: Vec<Payment>,
    movements: Vec<InventoryMovement>,
    accounts: Vec<Account>,
    entries: Vec<JournalEntry>,
    posting_batches: HashMap<String, PostingBatch>,
    customer_ledger: Vec<CustomerLedgerEntry>,
    supplier_ledger: Vec<SupplierLedgerEntry>,
    settings: HashMap<String, String>,
    audit_events: Vec<AuditEvent>,
}

/// Everything behind one mutex. Commit phases are synchronous and the
/// tests are single-threaded per store, so one lock is plenty.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_audit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Seed helpers -------------------------------------------------------

    /// Seeds a product with one active batch holding `stock` units.
    /// Returns (product_id, batch_id).
    pub fn seed_product(
        &self,
        name: &str,
        cost_minor: i64,
        price_minor: i64,
        stock: i64,
    ) -> (String, String) {
        let now = Utc::now();
        let product_id = Uuid::new_v4().to_string();
        let batch_id = Uuid::new_v4().to_string();
        let mut state = self.state();

        state.products.insert(
            product_id.clone(),
            Product {
                id: product_id.clone(),
                sku: format!("SKU-{}", name),
                name: name.to_string(),
                cost_price_minor: cost_minor,
                selling_price_minor: price_minor,
                stock,
                status: if stock > 0 {
                    ProductStatus::Available
                } else {
                    ProductStatus::OutOfStock
                },
                created_at: now,
                updated_at: now,
            },
        );

        if stock > 0 {
            state.batches.push(ProductBatch {
                id: batch_id.clone(),
                product_id: product_id.clone(),
                batch_number: None,
                quantity_received: stock,
                quantity_on_hand: stock,
                cost_per_unit_minor: cost_minor,
                expiry_date: None,
                status: BatchStatus::Active,
                created_at: now,
            });
        }

        (product_id, batch_id)
    }

    /// Appends another active batch to a product and bumps its cached
    /// stock. Returns the batch id.
    pub fn seed_batch(&self, product_id: &str, quantity: i64, cost_minor: i64) -> String {
        let now = Utc::now();
        let batch_id = Uuid::new_v4().to_string();
        let mut state = self.state();

        state.batches.push(ProductBatch {
            id: batch_id.clone(),
            product_id: product_id.to_string(),
            batch_number: None,
            quantity_received: quantity,
            quantity_on_hand: quantity,
            cost_per_unit_minor: cost_minor,
            expiry_date: None,
            status: BatchStatus::Active,
            created_at: now,
        });
        if let Some(product) = state.products.get_mut(product_id) {
            product.stock += quantity;
            if product.stock > 0 {
                product.status = ProductStatus::Available;
            }
        }

        batch_id
    }

    /// Seeds the full chart of accounts the engines resolve.
    pub fn seed_accounts(&self) {
        let accounts = [
            (coa::CASH, "Cash", AccountType::Asset),
            (coa::ACCOUNTS_RECEIVABLE, "Accounts Receivable", AccountType::Asset),
            (coa::INVENTORY, "Inventory", AccountType::Asset),
            (coa::VAT_INPUT, "VAT Input", AccountType::Asset),
            (coa::ACCOUNTS_PAYABLE, "Accounts Payable", AccountType::Liability),
            (coa::SALES_REVENUE, "Sales Revenue", AccountType::Revenue),
            (coa::COGS, "Cost of Goods Sold", AccountType::Expense),
        ];
        let mut state = self.state();
        for (code, name, account_type) in accounts {
            state.accounts.push(Account {
                id: Uuid::new_v4().to_string(),
                code: code.to_string(),
                name: name.to_string(),
                account_type,
                is_active: true,
            });
        }
    }

    /// Makes the audit sink fail until further notice.
    pub fn fail_audit(&self) {
        self.fail_audit.store(true, Ordering::SeqCst);
    }

    // -- Inspection helpers ---------------------------------------------------

    pub fn product(&self, id: &str) -> Option<Product> {
        self.state().products.get(id).cloned()
    }

    pub fn batch(&self, id: &str) -> Option<ProductBatch> {
        self.state().batches.iter().find(|b| b.id == id).cloned()
    }

    pub fn movements(&self) -> Vec<InventoryMovement> {
        self.state().movements.clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.state().payments.clone()
    }

    pub fn sale_count(&self) -> usize {
        self.state().sales.len()
    }

    pub fn purchase_count(&self) -> usize {
        self.state().purchases.len()
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.state().entries.clone()
    }

    pub fn customer_ledger_rows(&self) -> Vec<CustomerLedgerEntry> {
        self.state().customer_ledger.clone()
    }

    pub fn supplier_ledger_rows(&self) -> Vec<SupplierLedgerEntry> {
        self.state().supplier_ledger.clone()
    }

    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.state().audit_events.clone()
    }
}

// =============================================================================
// Port Implementations
// =============================================================================

impl ProductRepository for MemoryStore {
    fn find_by_id(&self, id: &str) -> CoreResult<Option<Product>> {
        Ok(self.state().products.get(id).cloned())
    }

    fn update_stock(&self, id: &str, delta: i64) -> CoreResult<()> {
        let mut state = self.state();
        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;
        product.stock += delta;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn set_stock(&self, id: &str, stock: i64) -> CoreResult<()> {
        let mut state = self.state();
        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;
        product.stock = stock;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn set_status(&self, id: &str, status: ProductStatus) -> CoreResult<()> {
        let mut state = self.state();
        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Product", id))?;
        product.status = status;
        product.updated_at = Utc::now();
        Ok(())
    }

    fn insert_batch(&self, batch: &ProductBatch) -> CoreResult<()> {
        self.state().batches.push(batch.clone());
        Ok(())
    }

    fn find_batch(&self, batch_id: &str) -> CoreResult<Option<ProductBatch>> {
        Ok(self
            .state()
            .batches
            .iter()
            .find(|b| b.id == batch_id)
            .cloned())
    }

    fn batches_for_product(&self, product_id: &str) -> CoreResult<Vec<ProductBatch>> {
        Ok(self
            .state()
            .batches
            .iter()
            .filter(|b| b.product_id == product_id)
            .cloned()
            .collect())
    }

    fn update_batch_stock(&self, batch_id: &str, delta: i64) -> CoreResult<()> {
        let mut state = self.state();
        let batch = state
            .batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| CoreError::not_found("Batch", batch_id))?;
        batch.quantity_on_hand += delta;
        Ok(())
    }

    fn set_batch_status(&self, batch_id: &str, status: BatchStatus) -> CoreResult<()> {
        let mut state = self.state();
        let batch = state
            .batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| CoreError::not_found("Batch", batch_id))?;
        batch.status = status;
        Ok(())
    }
}

impl SaleRepository for MemoryStore {
    fn insert(&self, sale: &Sale, items: &[SaleItem]) -> CoreResult<()> {
        let mut state = self.state();
        if let Some(key) = &sale.idempotency_key {
            if state
                .sales
                .values()
                .any(|s| s.idempotency_key.as_deref() == Some(key))
            {
                return Err(CoreError::Conflict { key: key.clone() });
            }
        }
        state.sales.insert(sale.id.clone(), sale.clone());
        state.sale_items.extend_from_slice(items);
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> CoreResult<Option<Sale>> {
        Ok(self.state().sales.get(id).cloned())
    }

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Sale>> {
        Ok(self
            .state()
            .sales
            .values()
            .find(|s| s.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    fn apply_payment_progress(
        &self,
        id: &str,
        paid_minor: i64,
        remaining_minor: i64,
        status: DocumentStatus,
    ) -> CoreResult<()> {
        let mut state = self.state();
        let sale = state
            .sales
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Sale", id))?;
        let now = Utc::now();
        sale.paid_minor = paid_minor;
        sale.remaining_minor = remaining_minor;
        sale.status = status;
        sale.updated_at = now;
        if status == DocumentStatus::Completed && sale.completed_at.is_none() {
            sale.completed_at = Some(now);
        }
        Ok(())
    }

    fn update_status(&self, id: &str, status: DocumentStatus) -> CoreResult<()> {
        let mut state = self.state();
        let sale = state
            .sales
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Sale", id))?;
        sale.status = status;
        sale.updated_at = Utc::now();
        Ok(())
    }
}

impl PurchaseRepository for MemoryStore {
    fn insert(&self, purchase: &Purchase, items: &[PurchaseItem]) -> CoreResult<()> {
        let mut state = self.state();
        if let Some(key) = &purchase.idempotency_key {
            if state
                .purchases
                .values()
                .any(|p| p.idempotency_key.as_deref() == Some(key))
            {
                return Err(CoreError::Conflict { key: key.clone() });
            }
        }
        state.purchases.insert(purchase.id.clone(), purchase.clone());
        state.purchase_items.extend_from_slice(items);
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> CoreResult<Option<Purchase>> {
        Ok(self.state().purchases.get(id).cloned())
    }

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Purchase>> {
        Ok(self
            .state()
            .purchases
            .values()
            .find(|p| p.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    fn apply_payment_progress(
        &self,
        id: &str,
        paid_minor: i64,
        remaining_minor: i64,
        status: DocumentStatus,
    ) -> CoreResult<()> {
        let mut state = self.state();
        let purchase = state
            .purchases
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Purchase", id))?;
        let now = Utc::now();
        purchase.paid_minor = paid_minor;
        purchase.remaining_minor = remaining_minor;
        purchase.status = status;
        purchase.updated_at = now;
        if status == DocumentStatus::Completed && purchase.completed_at.is_none() {
            purchase.completed_at = Some(now);
        }
        Ok(())
    }

    fn update_status(&self, id: &str, status: DocumentStatus) -> CoreResult<()> {
        let mut state = self.state();
        let purchase = state
            .purchases
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Purchase", id))?;
        purchase.status = status;
        purchase.updated_at = Utc::now();
        Ok(())
    }
}

impl PaymentRepository for MemoryStore {
    fn insert(&self, payment: &Payment) -> CoreResult<()> {
        let mut state = self.state();
        if let Some(key) = &payment.idempotency_key {
            if state
                .payments
                .iter()
                .any(|p| p.idempotency_key.as_deref() == Some(key))
            {
                return Err(CoreError::Conflict { key: key.clone() });
            }
        }
        state.payments.push(payment.clone());
        Ok(())
    }

    fn find_by_idempotency_key(&self, key: &str) -> CoreResult<Option<Payment>> {
        Ok(self
            .state()
            .payments
            .iter()
            .find(|p| p.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    fn find_by_sale_id(&self, sale_id: &str) -> CoreResult<Vec<Payment>> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.sale_id.as_deref() == Some(sale_id))
            .cloned()
            .collect())
    }

    fn find_by_purchase_id(&self, purchase_id: &str) -> CoreResult<Vec<Payment>> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|p| p.purchase_id.as_deref() == Some(purchase_id))
            .cloned()
            .collect())
    }
}

impl InventoryRepository for MemoryStore {
    fn insert_movement(&self, movement: &InventoryMovement) -> CoreResult<()> {
        self.state().movements.push(movement.clone());
        Ok(())
    }
}

impl AccountingRepository for MemoryStore {
    fn find_account_by_code(&self, code: &str) -> CoreResult<Option<Account>> {
        Ok(self
            .state()
            .accounts
            .iter()
            .find(|a| a.code == code)
            .cloned())
    }

    fn insert_journal_entry(&self, entry: &JournalEntry) -> CoreResult<()> {
        if entry.is_posted {
            return Err(CoreError::invalid_state(
                "JournalEntry",
                entry.id.clone(),
                "posted",
                "insert",
            ));
        }
        self.state().entries.push(entry.clone());
        Ok(())
    }

    fn find_entry_by_id(&self, id: &str) -> CoreResult<Option<JournalEntry>> {
        Ok(self.state().entries.iter().find(|e| e.id == id).cloned())
    }
}

impl PostingRepository for MemoryStore {
    fn insert_batch(&self, batch: &PostingBatch) -> CoreResult<()> {
        self.state()
            .posting_batches
            .insert(batch.id.clone(), batch.clone());
        Ok(())
    }

    fn find_batch(&self, id: &str) -> CoreResult<Option<PostingBatch>> {
        Ok(self.state().posting_batches.get(id).cloned())
    }

    fn unposted_entries_in(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<JournalEntry>> {
        Ok(self
            .state()
            .entries
            .iter()
            .filter(|e| {
                !e.is_posted && !e.is_reversed && e.entry_date >= start && e.entry_date <= end
            })
            .cloned()
            .collect())
    }

    fn mark_entries_posted(&self, entry_ids: &[String], batch_id: &str) -> CoreResult<()> {
        let mut state = self.state();
        for id in entry_ids {
            let entry = state
                .entries
                .iter_mut()
                .find(|e| e.id == *id)
                .ok_or_else(|| CoreError::not_found("JournalEntry", id.clone()))?;
            entry.is_posted = true;
            entry.posting_batch_id = Some(batch_id.to_string());
        }
        Ok(())
    }

    fn mark_entry_reversed(&self, entry_id: &str) -> CoreResult<()> {
        let mut state = self.state();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| CoreError::not_found("JournalEntry", entry_id))?;
        entry.is_reversed = true;
        Ok(())
    }

    fn set_batch_locked(&self, id: &str, locked: bool) -> CoreResult<()> {
        let mut state = self.state();
        let batch = state
            .posting_batches
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("PostingBatch", id))?;
        if locked {
            batch.status = PostingBatchStatus::Locked;
            batch.locked_at = Some(Utc::now());
        } else {
            batch.status = PostingBatchStatus::Posted;
            batch.locked_at = None;
        }
        Ok(())
    }

    fn is_batch_locked(&self, id: &str) -> CoreResult<bool> {
        let state = self.state();
        let batch = state
            .posting_batches
            .get(id)
            .ok_or_else(|| CoreError::not_found("PostingBatch", id))?;
        Ok(batch.status == PostingBatchStatus::Locked)
    }
}

impl CustomerLedgerRepository for MemoryStore {
    fn append(&self, entry: &CustomerLedgerEntry) -> CoreResult<()> {
        self.state().customer_ledger.push(entry.clone());
        Ok(())
    }

    fn last_balance(&self, customer_id: &str) -> CoreResult<i64> {
        Ok(self
            .state()
            .customer_ledger
            .iter()
            .filter(|e| e.customer_id == customer_id)
            .last()
            .map(|e| e.balance_after_minor)
            .unwrap_or(0))
    }

    fn balance(&self, customer_id: &str) -> CoreResult<i64> {
        // Both ledger traits define last_balance; qualify the side.
        CustomerLedgerRepository::last_balance(self, customer_id)
    }
}

impl SupplierLedgerRepository for MemoryStore {
    fn append(&self, entry: &SupplierLedgerEntry) -> CoreResult<()> {
        self.state().supplier_ledger.push(entry.clone());
        Ok(())
    }

    fn last_balance(&self, supplier_id: &str) -> CoreResult<i64> {
        Ok(self
            .state()
            .supplier_ledger
            .iter()
            .filter(|e| e.supplier_id == supplier_id)
            .last()
            .map(|e| e.balance_after_minor)
            .unwrap_or(0))
    }

    fn balance(&self, supplier_id: &str) -> CoreResult<i64> {
        SupplierLedgerRepository::last_balance(self, supplier_id)
    }
}

impl SettingsRepository for MemoryStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.state().settings.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.state()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record(&self, event: AuditEvent) -> CoreResult<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("audit sink unavailable".to_string()));
        }
        self.state().audit_events.push(event);
        Ok(())
    }
}
