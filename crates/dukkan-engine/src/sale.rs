//! # Sale Engine
//!
//! Turns a `CreateSaleInput` into one consistent set of persisted facts:
//! the invoice, its items, inventory movements, batch depletions, an
//! optional up-front payment, a draft journal entry, and an AR ledger row.
//!
//! ## Commit Phase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. idempotency lookup  ── key already committed? replay, write nothing│
//! │  2. validate command    ── pure rules, no repository access            │
//! │  3. plan lines          ── resolve products/batches, running stock     │
//! │                            checks so multi-line sales of the same      │
//! │                            product see cumulative deductions           │
//! │  4. compute totals      ── integral math, rates in bps                 │
//! │  5. write (fixed order) ── sale+items → movements+batches →            │
//! │                            product stock → payment → journal → ledger  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error aborts the whole scope; the ambient transaction rolls the
//! partial writes back. The journal write alone degrades to a logged skip
//! when the chart of accounts is incomplete.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use dukkan_core::commands::CreateSaleInput;
use dukkan_core::error::{CoreError, CoreResult, ValidationError};
use dukkan_core::money::{CurrencyProfile, Money};
use dukkan_core::totals::{DocumentTotals, LineAmounts};
use dukkan_core::types::{
    BatchStatus, CustomerLedgerEntry, DocumentStatus, InventoryMovement, LedgerTransactionType,
    MovementReason, MovementType, Payment, PaymentMethod, PaymentType, Product, ProductStatus,
    Sale, SaleItem,
};
use dukkan_core::validation::validate_create_sale;
use dukkan_core::{coa, settings_keys};

use crate::audit::{record_best_effort, AuditEvent, AuditLog};
use crate::journal;
use crate::ports::{
    feature_enabled, AccountingRepository, CustomerLedgerRepository, InventoryRepository,
    PaymentRepository, ProductRepository, SaleRepository, SettingsRepository,
};
use crate::stock::select_covering_batch;

// =============================================================================
// Receipt
// =============================================================================

/// What the commit phase hands back to the caller (and to the
/// side-effects phase).
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// Empty on a deduplicated replay; the items were written by the
    /// original call.
    pub items: Vec<SaleItem>,
    pub payment_id: Option<String>,
    /// None when accounting is disabled or the journal write was skipped.
    pub journal_entry_id: Option<String>,
    pub ledger_entry_id: Option<String>,
    /// True when this call wrote nothing and replayed an earlier commit.
    pub deduplicated: bool,
}

impl SaleReceipt {
    fn replayed(sale: Sale) -> Self {
        SaleReceipt {
            sale,
            items: Vec::new(),
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

/// One resolved sale line, ready to write. Planning is read-only; nothing
/// is persisted until every line has passed its stock checks.
struct PlannedLine {
    product_id: String,
    name_snapshot: String,
    quantity: i64,
    unit_factor: i64,
    quantity_base: i64,
    unit_price: Money,
    discount: Money,
    batch_id: String,
    cogs: Money,
    stock_before: i64,
    stock_after: i64,
}

// =============================================================================
// Engine
// =============================================================================

/// The sale transaction engine. Holds only port references; all state
/// lives behind them.
pub struct SaleEngine {
    products: Arc<dyn ProductRepository>,
    sales: Arc<dyn SaleRepository>,
    payments: Arc<dyn PaymentRepository>,
    inventory: Arc<dyn InventoryRepository>,
    accounting: Arc<dyn AccountingRepository>,
    customer_ledger: Arc<dyn CustomerLedgerRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: Arc<dyn AuditLog>,
    currency: CurrencyProfile,
}

impl SaleEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        sales: Arc<dyn SaleRepository>,
        payments: Arc<dyn PaymentRepository>,
        inventory: Arc<dyn InventoryRepository>,
        accounting: Arc<dyn AccountingRepository>,
        customer_ledger: Arc<dyn CustomerLedgerRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: Arc<dyn AuditLog>,
        currency: CurrencyProfile,
    ) -> Self {
        SaleEngine {
            products,
            sales,
            payments,
            inventory,
            accounting,
            customer_ledger,
            settings,
            audit,
            currency,
        }
    }

    /// Commits a sale. Synchronous: the caller wraps this in one ambient
    /// transaction scope.
    pub fn commit(&self, input: &CreateSaleInput) -> CoreResult<SaleReceipt> {
        // Idempotency gate comes before validation: a replayed command
        // must return the committed sale even if validation rules have
        // tightened since the original call.
        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self.sales.find_by_idempotency_key(key)? {
                info!(sale_id = %existing.id, key = %key, "Idempotency key replay; returning committed sale");
                return Ok(SaleReceipt::replayed(existing));
            }
        }

        validate_create_sale(input)?;
        debug!(items = input.items.len(), payment_type = ?input.payment_type, "Committing sale");

        let now = Utc::now();
        let sale_id = Uuid::new_v4().to_string();

        // -- Plan -------------------------------------------------------
        let mut products: HashMap<String, Product> = HashMap::new();
        let mut stock_after: HashMap<String, i64> = HashMap::new();
        let mut batch_on_hand: HashMap<String, i64> = HashMap::new();
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
                    "sell",
                ));
            }

            let quantity_base = line.quantity * line.unit_factor;
            let available = *stock_after.get(&product.id).unwrap_or(&product.stock);
            if quantity_base > available {
                return Err(CoreError::insufficient_stock(
                    &product.id,
                    available,
                    quantity_base,
                ));
            }

            let batch = match &line.batch_id {
                Some(batch_id) => {
                    let batch = self
                        .products
                        .find_batch(batch_id)?
                        .ok_or_else(|| CoreError::not_found("Batch", batch_id.clone()))?;
                    if batch.product_id != product.id {
                        return Err(ValidationError::WrongOwner {
                            field: "batch_id".to_string(),
                            owner: product.id.clone(),
                        }
                        .into());
                    }
                    let on_hand = *batch_on_hand
                        .get(&batch.id)
                        .unwrap_or(&batch.quantity_on_hand);
                    if batch.status != BatchStatus::Active || on_hand < quantity_base {
                        return Err(CoreError::insufficient_batch_stock(
                            &product.id,
                            &batch.id,
                            on_hand,
                            quantity_base,
                        ));
                    }
                    batch
                }
                None => {
                    let batches = self.products.batches_for_product(&product.id)?;
                    select_covering_batch(&batches, quantity_base, |b| {
                        *batch_on_hand.get(&b.id).unwrap_or(&b.quantity_on_hand)
                    })
                    .cloned()
                    .ok_or_else(|| {
                        CoreError::insufficient_stock(&product.id, available, quantity_base)
                    })?
                }
            };

            let on_hand = *batch_on_hand
                .get(&batch.id)
                .unwrap_or(&batch.quantity_on_hand);
            batch_on_hand.insert(batch.id.clone(), on_hand - quantity_base);
            stock_after.insert(product.id.clone(), available - quantity_base);

            planned.push(PlannedLine {
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                quantity: line.quantity,
                unit_factor: line.unit_factor,
                quantity_base,
                unit_price: Money::from_minor(line.unit_price_minor),
                discount: Money::from_minor(line.discount_minor),
                batch_id: batch.id,
                cogs: product.cost_price().multiply_quantity(quantity_base),
                stock_before: available,
                stock_after: available - quantity_base,
            });
        }

        // -- Totals -----------------------------------------------------
        let line_amounts: Vec<LineAmounts> = planned
            .iter()
            .map(|p| LineAmounts {
                quantity: p.quantity,
                unit_price: p.unit_price,
                discount: p.discount,
            })
            .collect();

        // Interest only ever applies to credit/mixed sales.
        let interest_bps = match input.payment_type {
            PaymentType::Cash => None,
            PaymentType::Credit | PaymentType::Mixed => input.interest_rate_bps,
        };
        let totals = DocumentTotals::compute(&line_amounts, input.tax_rate_bps, interest_bps);

        let cogs: Money = planned.iter().fold(Money::zero(), |acc, p| acc + p.cogs);

        // Tender above the total is change handed back, never stored.
        let tendered = Money::from_minor(input.paid_amount_minor);
        let cash_received = tendered.min(totals.total);
        let remaining = self.currency.remaining(totals.total, cash_received);
        let status = if remaining.is_zero() {
            DocumentStatus::Completed
        } else {
            DocumentStatus::Pending
        };

        let sale = Sale {
            id: sale_id.clone(),
            customer_id: input.customer_id.clone(),
            payment_type: input.payment_type,
            subtotal_minor: totals.subtotal.minor(),
            discount_minor: totals.discount.minor(),
            tax_minor: totals.tax.minor(),
            interest_minor: totals.interest.minor(),
            cogs_minor: cogs.minor(),
            total_minor: totals.total.minor(),
            paid_minor: cash_received.minor(),
            remaining_minor: remaining.minor(),
            status,
            idempotency_key: input.idempotency_key.clone(),
            created_at: now,
            updated_at: now,
            completed_at: (status == DocumentStatus::Completed).then_some(now),
        };

        let items: Vec<SaleItem> = planned
            .iter()
            .map(|p| SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: p.product_id.clone(),
                name_snapshot: p.name_snapshot.clone(),
                quantity: p.quantity,
                unit_factor: p.unit_factor,
                quantity_base: p.quantity_base,
                unit_price_minor: p.unit_price.minor(),
                discount_minor: p.discount.minor(),
                line_total_minor: (p.unit_price.multiply_quantity(p.quantity) - p.discount)
                    .minor(),
                batch_id: p.batch_id.clone(),
                created_at: now,
            })
            .collect();

        // -- Write (fixed order) ----------------------------------------
        if let Err(err) = self.sales.insert(&sale, &items) {
            // A racing retry may have won the uniqueness constraint
            // between our lookup and our insert. Resolve by re-reading.
            if matches!(err, CoreError::Conflict { .. }) {
                if let Some(key) = &input.idempotency_key {
                    if let Some(existing) = self.sales.find_by_idempotency_key(key)? {
                        info!(sale_id = %existing.id, key = %key, "Lost idempotency race; returning committed sale");
                        return Ok(SaleReceipt::replayed(existing));
                    }
                }
            }
            return Err(err);
        }

        for p in &planned {
            self.inventory.insert_movement(&InventoryMovement {
                id: Uuid::new_v4().to_string(),
                product_id: p.product_id.clone(),
                batch_id: p.batch_id.clone(),
                movement_type: MovementType::Out,
                reason: MovementReason::Sale,
                quantity_base: p.quantity_base,
                stock_before: p.stock_before,
                stock_after: p.stock_after,
                reference_type: Some("sale".to_string()),
                reference_id: Some(sale_id.clone()),
                created_at: now,
            })?;
            self.products
                .update_batch_stock(&p.batch_id, -p.quantity_base)?;
        }
        for (batch_id, on_hand) in &batch_on_hand {
            if *on_hand == 0 {
                self.products
                    .set_batch_status(batch_id, BatchStatus::Depleted)?;
            }
        }

        for (product_id, after) in &stock_after {
            let before = products
                .get(product_id)
                .map(|p| p.stock)
                .unwrap_or_default();
            self.products.update_stock(product_id, after - before)?;
            if *after == 0 {
                self.products
                    .set_status(product_id, ProductStatus::OutOfStock)?;
            }
        }

        let payment_id = if cash_received.is_positive() {
            let payment = Payment {
                id: Uuid::new_v4().to_string(),
                sale_id: Some(sale_id.clone()),
                purchase_id: None,
                method: PaymentMethod::Cash,
                amount_minor: cash_received.minor(),
                idempotency_key: None,
                reference: None,
                created_at: now,
            };
            self.payments.insert(&payment)?;
            Some(payment.id)
        } else {
            None
        };

        let journal_entry_id = self.write_journal(&sale, cash_received, remaining, cogs, now)?;
        let ledger_entry_id = self.write_ledger(&sale, remaining, now)?;

        info!(
            sale_id = %sale_id,
            total = %totals.total,
            paid = %cash_received,
            remaining = %remaining,
            status = ?status,
            "Sale committed"
        );

        Ok(SaleReceipt {
            sale,
            items,
            payment_id,
            journal_entry_id,
            ledger_entry_id,
            deduplicated: false,
        })
    }

    /// Draft journal projection of the sale.
    ///
    /// Revenue is recognized as `cash + remaining`: when a sub-threshold
    /// residual collapsed, the collapsed part is never booked anywhere,
    /// keeping the entry balanced without a write-off line.
    fn write_journal(
        &self,
        sale: &Sale,
        cash: Money,
        remaining: Money,
        cogs: Money,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        if !feature_enabled(self.settings.as_ref(), settings_keys::ACCOUNTING_ENABLED)? {
            return Ok(None);
        }

        let specs = vec![
            journal::debit(coa::CASH, cash),
            journal::debit(coa::ACCOUNTS_RECEIVABLE, remaining),
            journal::credit(coa::SALES_REVENUE, cash + remaining),
            journal::debit(coa::COGS, cogs),
            journal::credit(coa::INVENTORY, cogs),
        ];

        let entry = journal::build_draft_entry(
            self.accounting.as_ref(),
            format!("Sale {}", sale.id),
            "sale",
            &sale.id,
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

    /// AR invoice row: only credit exposure (remaining > 0) hits the
    /// customer ledger.
    fn write_ledger(
        &self,
        sale: &Sale,
        remaining: Money,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        let customer_id = match &sale.customer_id {
            Some(id) if remaining.is_positive() => id,
            _ => return Ok(None),
        };
        if !feature_enabled(self.settings.as_ref(), settings_keys::LEDGER_ENABLED)? {
            return Ok(None);
        }

        let prior = self.customer_ledger.last_balance(customer_id)?;
        let entry = CustomerLedgerEntry {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.clone(),
            transaction_type: LedgerTransactionType::Invoice,
            reference_type: Some("sale".to_string()),
            reference_id: Some(sale.id.clone()),
            amount_minor: remaining.minor(),
            balance_after_minor: prior + remaining.minor(),
            created_at: now,
        };
        self.customer_ledger.append(&entry)?;
        Ok(Some(entry.id))
    }

    /// Best-effort side effects, run after the transaction scope closed.
    pub async fn side_effects(&self, receipt: &SaleReceipt) {
        if receipt.deduplicated {
            debug!(sale_id = %receipt.sale.id, "Replayed sale; skipping side effects");
            return;
        }
        let event = AuditEvent::new(
            "Sale created",
            "sale",
            receipt.sale.id.clone(),
            json!({
                "total_minor": receipt.sale.total_minor,
                "paid_minor": receipt.sale.paid_minor,
                "remaining_minor": receipt.sale.remaining_minor,
                "items": receipt.items.len(),
                "journal_entry_id": receipt.journal_entry_id,
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }
}
