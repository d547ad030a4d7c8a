//! # Purchase Engine
//!
//! Receives procurement invoices: every line opens a fresh receipt lot
//! (`ProductBatch`), so cost and expiry stay traceable per delivery.
//!
//! ## Commit Phase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. idempotency lookup  ── replay committed purchase, write nothing    │
//! │  2. validate command                                                    │
//! │  3. plan lines          ── resolve products, pre-build one new batch   │
//! │                            per line                                     │
//! │  4. compute totals                                                      │
//! │  5. write (fixed order) ── purchase+items → batches+movements →        │
//! │                            product stock → payment → journal → ledger  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use dukkan_core::commands::CreatePurchaseInput;
use dukkan_core::error::{CoreError, CoreResult};
use dukkan_core::money::{CurrencyProfile, Money};
use dukkan_core::totals::{DocumentTotals, LineAmounts};
use dukkan_core::types::{
    BatchStatus, DocumentStatus, InventoryMovement, LedgerTransactionType, MovementReason,
    MovementType, Payment, PaymentMethod, Product, ProductBatch, ProductStatus, Purchase,
    PurchaseItem, SupplierLedgerEntry,
};
use dukkan_core::validation::validate_create_purchase;
use dukkan_core::{coa, settings_keys};

use crate::audit::{record_best_effort, AuditEvent, AuditLog};
use crate::journal;
use crate::ports::{
    feature_enabled, AccountingRepository, InventoryRepository, PaymentRepository,
    ProductRepository, PurchaseRepository, SettingsRepository, SupplierLedgerRepository,
};

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    /// Empty on a deduplicated replay.
    pub items: Vec<PurchaseItem>,
    /// The receipt lots opened by this purchase, one per item.
    pub batch_ids: Vec<String>,
    pub payment_id: Option<String>,
    pub journal_entry_id: Option<String>,
    pub ledger_entry_id: Option<String>,
    pub deduplicated: bool,
}

impl PurchaseReceipt {
    fn replayed(purchase: Purchase) -> Self {
        PurchaseReceipt {
            purchase,
            items: Vec::new(),
            batch_ids: Vec::new(),
            payment_id: None,
            journal_entry_id: None,
            ledger_entry_id: None,
            deduplicated: true,
        }
    }
}

// =============================================================================
// Planned Line
// =============================================================================

struct PlannedLine {
    product_id: String,
    name_snapshot: String,
    quantity: i64,
    unit_factor: i64,
    quantity_base: i64,
    unit_cost: Money,
    batch: ProductBatch,
    stock_before: i64,
    stock_after: i64,
}

// =============================================================================
// Engine
// =============================================================================

/// The purchase (goods receipt) transaction engine.
pub struct PurchaseEngine {
    products: Arc<dyn ProductRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    payments: Arc<dyn PaymentRepository>,
    inventory: Arc<dyn InventoryRepository>,
    accounting: Arc<dyn AccountingRepository>,
    supplier_ledger: Arc<dyn SupplierLedgerRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: Arc<dyn AuditLog>,
    currency: CurrencyProfile,
}

impl PurchaseEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        payments: Arc<dyn PaymentRepository>,
        inventory: Arc<dyn InventoryRepository>,
        accounting: Arc<dyn AccountingRepository>,
        supplier_ledger: Arc<dyn SupplierLedgerRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: Arc<dyn AuditLog>,
        currency: CurrencyProfile,
    ) -> Self {
        PurchaseEngine {
            products,
            purchases,
            payments,
            inventory,
            accounting,
            supplier_ledger,
            settings,
            audit,
            currency,
        }
    }

    /// Commits a purchase receipt.
    pub fn commit(&self, input: &CreatePurchaseInput) -> CoreResult<PurchaseReceipt> {
        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self.purchases.find_by_idempotency_key(key)? {
                info!(purchase_id = %existing.id, key = %key, "Idempotency key replay; returning committed purchase");
                return Ok(PurchaseReceipt::replayed(existing));
            }
        }

        validate_create_purchase(input)?;
        debug!(items = input.items.len(), payment_type = ?input.payment_type, "Committing purchase");

        let now = Utc::now();
        let purchase_id = Uuid::new_v4().to_string();

        // -- Plan -------------------------------------------------------
        let mut products: HashMap<String, Product> = HashMap::new();
        let mut stock_after: HashMap<String, i64> = HashMap::new();
        let mut planned: Vec<PlannedLine> = Vec::with_capacity(input.items.len());

        for line in &input.items {
            let product = match products.get(&line.product_id) {
                Some(product) => product.clone(),
                None => {
                    let product = self
                        .products
                        .find_by_id(&line.product_id)?
                        .ok_or_else(|| CoreError::not_found("Product", line.product_id.clone()))?;
                    products.insert(product.id.clone(), product.clone());
                    product
                }
            };

            if product.status == ProductStatus::Inactive {
                return Err(CoreError::invalid_state(
                    "Product",
                    product.id,
                    "inactive",
                    "receive",
                ));
            }

            let quantity_base = line.quantity * line.unit_factor;
            let before = *stock_after.get(&product.id).unwrap_or(&product.stock);
            stock_after.insert(product.id.clone(), before + quantity_base);

            // Per-base-unit cost for the new lot. Integer division: the
            // sub-minor-unit remainder is below any circulating
            // denomination and is not carried.
            let cost_per_unit = line.unit_cost_minor / line.unit_factor;

            let batch = ProductBatch {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                batch_number: line.batch_number.clone(),
                quantity_received: quantity_base,
                quantity_on_hand: quantity_base,
                cost_per_unit_minor: cost_per_unit,
                expiry_date: line.expiry_date,
                status: BatchStatus::Active,
                created_at: now,
            };

            planned.push(PlannedLine {
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                quantity: line.quantity,
                unit_factor: line.unit_factor,
                quantity_base,
                unit_cost: Money::from_minor(line.unit_cost_minor),
                batch,
                stock_before: before,
                stock_after: before + quantity_base,
            });
        }

        // -- Totals -----------------------------------------------------
        let line_amounts: Vec<LineAmounts> = planned
            .iter()
            .map(|p| LineAmounts {
                quantity: p.quantity,
                unit_price: p.unit_cost,
                discount: Money::zero(),
            })
            .collect();
        let totals = DocumentTotals::compute(&line_amounts, input.tax_rate_bps, None);

        let tendered = Money::from_minor(input.paid_amount_minor);
        let cash_paid = tendered.min(totals.total);
        let remaining = self.currency.remaining(totals.total, cash_paid);
        let status = if remaining.is_zero() {
            DocumentStatus::Completed
        } else {
            DocumentStatus::Pending
        };

        let purchase = Purchase {
            id: purchase_id.clone(),
            supplier_id: input.supplier_id.clone(),
            payment_type: input.payment_type,
            subtotal_minor: totals.subtotal.minor(),
            discount_minor: totals.discount.minor(),
            tax_minor: totals.tax.minor(),
            total_minor: totals.total.minor(),
            paid_minor: cash_paid.minor(),
            remaining_minor: remaining.minor(),
            status,
            idempotency_key: input.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
            completed_at: (status == DocumentStatus::Completed).then_some(now),
        };

        let items: Vec<PurchaseItem> = planned
            .iter()
            .map(|p| PurchaseItem {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase_id.clone(),
                product_id: p.product_id.clone(),
                name_snapshot: p.name_snapshot.clone(),
                quantity: p.quantity,
                unit_factor: p.unit_factor,
                quantity_base: p.quantity_base,
                unit_cost_minor: p.unit_cost.minor(),
                line_total_minor: p.unit_cost.multiply_quantity(p.quantity).minor(),
                batch_id: p.batch.id.clone(),
                created_at: now,
            })
            .collect();

        // -- Write (fixed order) ----------------------------------------
        if let Err(err) = self.purchases.insert(&purchase, &items) {
            if matches!(err, CoreError::Conflict { .. }) {
                if let Some(key) = &input.idempotency_key {
                    if let Some(existing) = self.purchases.find_by_idempotency_key(key)? {
                        info!(purchase_id = %existing.id, key = %key, "Lost idempotency race; returning committed purchase");
                        return Ok(PurchaseReceipt::replayed(existing));
                    }
                }
            }
            return Err(err);
        }

        for p in &planned {
            self.products.insert_batch(&p.batch)?;
            self.inventory.insert_movement(&InventoryMovement {
                id: Uuid::new_v4().to_string(),
                product_id: p.product_id.clone(),
                batch_id: p.batch.id.clone(),
                movement_type: MovementType::In,
                reason: MovementReason::Purchase,
                quantity_base: p.quantity_base,
                stock_before: p.stock_before,
                stock_after: p.stock_after,
                reference_type: Some("purchase".to_string()),
                reference_id: Some(purchase_id.clone()),
                created_at: now,
            })?;
        }

        for (product_id, after) in &stock_after {
            let before = products
                .get(product_id)
                .map(|p| p.stock)
                .unwrap_or_default();
            self.products.update_stock(product_id, after - before)?;
            if before == 0 && *after > 0 {
                self.products
                    .set_status(product_id, ProductStatus::Available)?;
            }
        }

        let payment_id = if cash_paid.is_positive() {
            let payment = Payment {
                id: Uuid::new_v4().to_string(),
                sale_id: None,
                purchase_id: Some(purchase_id.clone()),
                method: PaymentMethod::Cash,
                amount_minor: cash_paid.minor(),
                idempotency_key: None,
                reference: None,
                created_at: now,
            };
            self.payments.insert(&payment)?;
            Some(payment.id)
        } else {
            None
        };

        let journal_entry_id =
            self.write_journal(&purchase, cash_paid, remaining, totals.tax, now)?;
        let ledger_entry_id = self.write_ledger(&purchase, remaining, now)?;

        info!(
            purchase_id = %purchase_id,
            total = %totals.total,
            paid = %cash_paid,
            remaining = %remaining,
            status = ?status,
            "Purchase committed"
        );

        Ok(PurchaseReceipt {
            purchase,
            batch_ids: planned.iter().map(|p| p.batch.id.clone()).collect(),
            items,
            payment_id,
            journal_entry_id,
            ledger_entry_id,
            deduplicated: false,
        })
    }

    /// Draft journal projection of the purchase.
    ///
    /// The credit side is `cash + remaining` (a sub-threshold residual
    /// that collapsed is never booked), so inventory value is derived as
    /// `cash + remaining − tax` to keep the entry balanced.
    fn write_journal(
        &self,
        purchase: &Purchase,
        cash: Money,
        remaining: Money,
        tax: Money,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        if !feature_enabled(self.settings.as_ref(), settings_keys::ACCOUNTING_ENABLED)? {
            return Ok(None);
        }

        let specs = vec![
            journal::debit(coa::INVENTORY, cash + remaining - tax),
            journal::debit(coa::VAT_INPUT, tax),
            journal::credit(coa::CASH, cash),
            journal::credit(coa::ACCOUNTS_PAYABLE, remaining),
        ];

        let entry = journal::build_draft_entry(
            self.accounting.as_ref(),
            format!("Purchase {}", purchase.id),
            "purchase",
            &purchase.id,
            specs,
            now,
        )?;

        match entry {
            Some(entry) => {
                self.accounting.insert_journal_entry(&entry)?;
                Ok(Some(entry.id))
            }
            None => Ok(None),
        }
    }

    /// AP invoice row: only open payables hit the supplier ledger.
    fn write_ledger(
        &self,
        purchase: &Purchase,
        remaining: Money,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        let supplier_id = match &purchase.supplier_id {
            Some(id) if remaining.is_positive() => id,
            _ => return Ok(None),
        };
        if !feature_enabled(self.settings.as_ref(), settings_keys::LEDGER_ENABLED)? {
            return Ok(None);
        }

        let prior = self.supplier_ledger.last_balance(supplier_id)?;
        let entry = SupplierLedgerEntry {
            id: Uuid::new_v4().to_string(),
            supplier_id: supplier_id.clone(),
            transaction_type: LedgerTransactionType::Invoice,
            reference_type: Some("purchase".to_string()),
            reference_id: Some(purchase.id.clone()),
            amount_minor: remaining.minor(),
            balance_after_minor: prior + remaining.minor(),
            created_at: now,
        };
        self.supplier_ledger.append(&entry)?;
        Ok(Some(entry.id))
    }

    /// Best-effort side effects, run after the transaction scope closed.
    pub async fn side_effects(&self, receipt: &PurchaseReceipt) {
        if receipt.deduplicated {
            debug!(purchase_id = %receipt.purchase.id, "Replayed purchase; skipping side effects");
            return;
        }
        let event = AuditEvent::new(
            "Purchase received",
            "purchase",
            receipt.purchase.id.clone(),
            json!({
                "total_minor": receipt.purchase.total_minor,
                "paid_minor": receipt.purchase.paid_minor,
                "remaining_minor": receipt.purchase.remaining_minor,
                "items": receipt.items.len(),
                "batches": receipt.batch_ids.len(),
                "journal_entry_id": receipt.journal_entry_id,
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }
}
