//! # Stock Adjustment Engine
//!
//! Manual stock corrections: opening balances, damage write-offs, and
//! count fixes. Every change lands on exactly one batch and produces
//! exactly one inventory movement.
//!
//! ## Batch Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  change > 0, batch given   ──► add to that batch (reactivate if        │
//! │                                depleted)                                 │
//! │  change > 0, no batch      ──► open a new batch at the product's       │
//! │                                current cost                             │
//! │  change < 0, batch given   ──► deduct from exactly that batch          │
//! │  change < 0, no batch      ──► first batch (creation order) whose      │
//! │                                on-hand covers the WHOLE deduction;     │
//! │                                a deduction is never split across       │
//! │                                batches                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! After the batch write, the product's cached stock is re-synced to the
//! sum of its batches' on-hand quantities, which also heals a drifted
//! cache as a side benefit.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use dukkan_core::commands::AdjustStockInput;
use dukkan_core::error::{CoreError, CoreResult, ValidationError};
use dukkan_core::types::{
    BatchStatus, InventoryMovement, MovementType, ProductBatch, ProductStatus,
};
use dukkan_core::validation::validate_adjust_stock;

use crate::audit::{record_best_effort, AuditEvent, AuditLog};
use crate::ports::{InventoryRepository, ProductRepository};

// =============================================================================
// Batch Selection
// =============================================================================

/// Picks the batch an unpinned deduction comes from: the first batch in
/// creation order, active, whose on-hand covers the whole quantity.
///
/// `on_hand_of` lets callers substitute an adjusted on-hand view (the
/// Sale Engine passes its running per-batch map so earlier lines of the
/// same command are accounted for).
pub fn select_covering_batch<F>(
    batches: &[ProductBatch],
    needed: i64,
    on_hand_of: F,
) -> Option<&ProductBatch>
where
    F: Fn(&ProductBatch) -> i64,
{
    batches
        .iter()
        .find(|b| b.status == BatchStatus::Active && on_hand_of(b) >= needed)
}

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentReceipt {
    pub product_id: String,
    /// The batch the change landed on (created, topped up, or deducted).
    pub batch_id: String,
    pub movement_id: String,
    pub quantity_change: i64,
    pub stock_before: i64,
    pub stock_after: i64,
}

// =============================================================================
// Engine
// =============================================================================

/// The manual stock adjustment engine.
pub struct StockAdjustmentEngine {
    products: Arc<dyn ProductRepository>,
    inventory: Arc<dyn InventoryRepository>,
    audit: Arc<dyn AuditLog>,
}

impl StockAdjustmentEngine {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        inventory: Arc<dyn InventoryRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        StockAdjustmentEngine {
            products,
            inventory,
            audit,
        }
    }

    /// Commits a stock adjustment.
    pub fn commit(&self, input: &AdjustStockInput) -> CoreResult<AdjustmentReceipt> {
        validate_adjust_stock(input)?;
        debug!(product_id = %input.product_id, change = input.quantity_change, reason = ?input.reason, "Committing stock adjustment");

        let product = self
            .products
            .find_by_id(&input.product_id)?
            .ok_or_else(|| CoreError::not_found("Product", input.product_id.clone()))?;

        let now = Utc::now();
        let batch_id = if input.quantity_change > 0 {
            self.receive(&product.id, product.cost_price_minor, input, now)?
        } else {
            self.deduct(&product.id, product.stock, input)?
        };

        // Re-sync the cached counter to the batch sum.
        let stock_after: i64 = self
            .products
            .batches_for_product(&product.id)?
            .iter()
            .map(|b| b.quantity_on_hand)
            .sum();
        self.products.set_stock(&product.id, stock_after)?;

        if stock_after == 0 && product.status == ProductStatus::Available {
            self.products
                .set_status(&product.id, ProductStatus::OutOfStock)?;
        } else if stock_after > 0 && product.status == ProductStatus::OutOfStock {
            self.products
                .set_status(&product.id, ProductStatus::Available)?;
        }

        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            batch_id: batch_id.clone(),
            movement_type: if input.quantity_change > 0 {
                MovementType::In
            } else {
                MovementType::Out
            },
            reason: input.reason.into(),
            quantity_base: input.quantity_change.abs(),
            stock_before: product.stock,
            stock_after,
            reference_type: Some("adjustment".to_string()),
            reference_id: None,
            created_at: now,
        };
        self.inventory.insert_movement(&movement)?;

        info!(
            product_id = %product.id,
            batch_id = %batch_id,
            change = input.quantity_change,
            stock_after,
            "Stock adjustment committed"
        );

        Ok(AdjustmentReceipt {
            product_id: product.id,
            batch_id,
            movement_id: movement.id,
            quantity_change: input.quantity_change,
            stock_before: product.stock,
            stock_after,
        })
    }

    /// Positive change: top up an explicit batch or open a new one.
    fn receive(
        &self,
        product_id: &str,
        cost_per_unit_minor: i64,
        input: &AdjustStockInput,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<String> {
        match &input.batch_id {
            Some(batch_id) => {
                let batch = self.verify_batch(product_id, batch_id)?;
                self.products
                    .update_batch_stock(&batch.id, input.quantity_change)?;
                if batch.status == BatchStatus::Depleted {
                    self.products
                        .set_batch_status(&batch.id, BatchStatus::Active)?;
                }
                Ok(batch.id)
            }
            None => {
                let batch = ProductBatch {
                    id: Uuid::new_v4().to_string(),
                    product_id: product_id.to_string(),
                    batch_number: None,
                    quantity_received: input.quantity_change,
                    quantity_on_hand: input.quantity_change,
                    cost_per_unit_minor,
                    expiry_date: None,
                    status: BatchStatus::Active,
                    created_at: now,
                };
                self.products.insert_batch(&batch)?;
                Ok(batch.id)
            }
        }
    }

    /// Negative change: deduct from an explicit batch or the first one
    /// that covers the whole amount.
    fn deduct(
        &self,
        product_id: &str,
        cached_stock: i64,
        input: &AdjustStockInput,
    ) -> CoreResult<String> {
        let deduct = -input.quantity_change;
        let batch = match &input.batch_id {
            Some(batch_id) => {
                let batch = self.verify_batch(product_id, batch_id)?;
                if batch.quantity_on_hand < deduct {
                    return Err(CoreError::insufficient_batch_stock(
                        product_id,
                        &batch.id,
                        batch.quantity_on_hand,
                        deduct,
                    ));
                }
                batch
            }
            None => {
                let batches = self.products.batches_for_product(product_id)?;
                select_covering_batch(&batches, deduct, |b| b.quantity_on_hand)
                    .cloned()
                    .ok_or_else(|| {
                        CoreError::insufficient_stock(product_id, cached_stock, deduct)
                    })?
            }
        };

        self.products.update_batch_stock(&batch.id, -deduct)?;
        if batch.quantity_on_hand == deduct {
            self.products
                .set_batch_status(&batch.id, BatchStatus::Depleted)?;
        }
        Ok(batch.id)
    }

    fn verify_batch(&self, product_id: &str, batch_id: &str) -> CoreResult<ProductBatch> {
        let batch = self
            .products
            .find_batch(batch_id)?
            .ok_or_else(|| CoreError::not_found("Batch", batch_id))?;
        if batch.product_id != product_id {
            return Err(ValidationError::WrongOwner {
                field: "batch_id".to_string(),
                owner: product_id.to_string(),
            }
            .into());
        }
        Ok(batch)
    }

    /// Best-effort side effects, run after the transaction scope closed.
    pub async fn side_effects(&self, receipt: &AdjustmentReceipt) {
        let event = AuditEvent::new(
            "Stock adjusted",
            "product",
            receipt.product_id.clone(),
            json!({
                "batch_id": receipt.batch_id,
                "quantity_change": receipt.quantity_change,
                "stock_before": receipt.stock_before,
                "stock_after": receipt.stock_after,
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }
}
