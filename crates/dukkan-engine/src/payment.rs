//! # Payment Engine
//!
//! Applies a payment against an existing sale (AR) or purchase (AP).
//!
//! ## Clamp Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  requested 999,999 against remaining 5,000                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  applied = min(requested, remaining) = 5,000                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payment row records 5,000; overshoot is change, never stored          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A payment never overdraws: remaining is recomputed through the currency
//! profile, so a sub-threshold residual collapses and the document
//! completes. The AR/AP ledger row carries the full settled amount
//! (applied + collapsed residual) so the running balance tracks the
//! document; the journal records only the cash that actually moved.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use dukkan_core::commands::AddPaymentInput;
use dukkan_core::error::{CoreError, CoreResult};
use dukkan_core::money::{CurrencyProfile, Money};
use dukkan_core::types::{
    CustomerLedgerEntry, DocumentStatus, LedgerTransactionType, Payment, SupplierLedgerEntry,
};
use dukkan_core::validation::validate_add_payment;
use dukkan_core::{coa, settings_keys};

use crate::audit::{record_best_effort, AuditEvent, AuditLog};
use crate::journal;
use crate::ports::{
    feature_enabled, AccountingRepository, CustomerLedgerRepository, PaymentRepository,
    PurchaseRepository, SaleRepository, SettingsRepository, SupplierLedgerRepository,
};

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// The clamped amount actually recorded.
    pub applied_minor: i64,
    /// The target document's remaining balance after this payment.
    pub remaining_minor: i64,
    /// The target document's status after this payment.
    pub status: DocumentStatus,
    pub journal_entry_id: Option<String>,
    pub ledger_entry_id: Option<String>,
    pub deduplicated: bool,
}

// =============================================================================
// Engine
// =============================================================================

/// The payment transaction engine, shared by the AR and AP sides.
pub struct PaymentEngine {
    sales: Arc<dyn SaleRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    payments: Arc<dyn PaymentRepository>,
    accounting: Arc<dyn AccountingRepository>,
    customer_ledger: Arc<dyn CustomerLedgerRepository>,
    supplier_ledger: Arc<dyn SupplierLedgerRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: Arc<dyn AuditLog>,
    currency: CurrencyProfile,
}

impl PaymentEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sales: Arc<dyn SaleRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        payments: Arc<dyn PaymentRepository>,
        accounting: Arc<dyn AccountingRepository>,
        customer_ledger: Arc<dyn CustomerLedgerRepository>,
        supplier_ledger: Arc<dyn SupplierLedgerRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: Arc<dyn AuditLog>,
        currency: CurrencyProfile,
    ) -> Self {
        PaymentEngine {
            sales,
            purchases,
            payments,
            accounting,
            customer_ledger,
            supplier_ledger,
            settings,
            audit,
            currency,
        }
    }

    /// Commits a payment against a sale XOR purchase.
    pub fn commit(&self, input: &AddPaymentInput) -> CoreResult<PaymentReceipt> {
        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self.payments.find_by_idempotency_key(key)? {
                info!(payment_id = %existing.id, key = %key, "Idempotency key replay; returning committed payment");
                return self.replayed(existing);
            }
        }

        validate_add_payment(input)?;
        debug!(amount = input.amount_minor, "Committing payment");

        if input.sale_id.is_some() {
            self.commit_against_sale(input)
        } else {
            self.commit_against_purchase(input)
        }
    }

    // -- AR side ----------------------------------------------------------

    fn commit_against_sale(&self, input: &AddPaymentInput) -> CoreResult<PaymentReceipt> {
        let sale_id = input.sale_id.as_deref().unwrap_or_default();
        let sale = self
            .sales
            .find_by_id(sale_id)?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if sale.status == DocumentStatus::Cancelled {
            return Err(CoreError::invalid_state(
                "Sale",
                sale.id,
                "cancelled",
                "add payment",
            ));
        }
        if sale.remaining_minor == 0 {
            return Err(CoreError::invalid_state(
                "Sale",
                sale.id,
                "settled",
                "add payment",
            ));
        }

        let now = Utc::now();
        let remaining_before = sale.remaining();
        let applied = Money::from_minor(input.amount_minor).min(remaining_before);
        let new_paid = Money::from_minor(sale.paid_minor) + applied;
        let new_remaining = self.currency.remaining(sale.total(), new_paid);
        let settled = remaining_before - new_remaining;
        let status = if new_remaining.is_zero() {
            DocumentStatus::Completed
        } else {
            DocumentStatus::Pending
        };

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: Some(sale.id.clone()),
            purchase_id: None,
            method: input.method,
            amount_minor: applied.minor(),
            idempotency_key: input.idempotency_key.clone(),
            reference: None,
            created_at: now,
        };
        if let Err(err) = self.payments.insert(&payment) {
            if matches!(err, CoreError::Conflict { .. }) {
                if let Some(key) = &input.idempotency_key {
                    if let Some(existing) = self.payments.find_by_idempotency_key(key)? {
                        info!(payment_id = %existing.id, key = %key, "Lost idempotency race; returning committed payment");
                        return self.replayed(existing);
                    }
                }
            }
            return Err(err);
        }

        self.sales
            .apply_payment_progress(&sale.id, new_paid.minor(), new_remaining.minor(), status)?;

        let journal_entry_id = self.write_journal(
            &payment,
            journal::debit(coa::CASH, applied),
            journal::credit(coa::ACCOUNTS_RECEIVABLE, applied),
            now,
        )?;

        let mut ledger_entry_id = None;
        if let Some(customer_id) = &sale.customer_id {
            if feature_enabled(self.settings.as_ref(), settings_keys::LEDGER_ENABLED)? {
                let prior = self.customer_ledger.last_balance(customer_id)?;
                let entry = CustomerLedgerEntry {
                    id: Uuid::new_v4().to_string(),
                    customer_id: customer_id.clone(),
                    transaction_type: LedgerTransactionType::Payment,
                    reference_type: Some("payment".to_string()),
                    reference_id: Some(payment.id.clone()),
                    amount_minor: -settled.minor(),
                    balance_after_minor: prior - settled.minor(),
                    created_at: now,
                };
                self.customer_ledger.append(&entry)?;
                ledger_entry_id = Some(entry.id);
            }
        }

        info!(
            payment_id = %payment.id,
            sale_id = %sale.id,
            applied = %applied,
            remaining = %new_remaining,
            status = ?status,
            "Payment committed"
        );

        Ok(PaymentReceipt {
            payment,
            applied_minor: applied.minor(),
            remaining_minor: new_remaining.minor(),
            status,
            journal_entry_id,
            ledger_entry_id,
            deduplicated: false,
        })
    }

    // -- AP side ----------------------------------------------------------

    fn commit_against_purchase(&self, input: &AddPaymentInput) -> CoreResult<PaymentReceipt> {
        let purchase_id = input.purchase_id.as_deref().unwrap_or_default();
        let purchase = self
            .purchases
            .find_by_id(purchase_id)?
            .ok_or_else(|| CoreError::not_found("Purchase", purchase_id))?;

        if purchase.status == DocumentStatus::Cancelled {
            return Err(CoreError::invalid_state(
                "Purchase",
                purchase.id,
                "cancelled",
                "add payment",
            ));
        }
        if purchase.remaining_minor == 0 {
            return Err(CoreError::invalid_state(
                "Purchase",
                purchase.id,
                "settled",
                "add payment",
            ));
        }

        let now = Utc::now();
        let remaining_before = purchase.remaining();
        let applied = Money::from_minor(input.amount_minor).min(remaining_before);
        let new_paid = Money::from_minor(purchase.paid_minor) + applied;
        let new_remaining = self.currency.remaining(purchase.total(), new_paid);
        let settled = remaining_before - new_remaining;
        let status = if new_remaining.is_zero() {
            DocumentStatus::Completed
        } else {
            DocumentStatus::Pending
        };

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: None,
            purchase_id: Some(purchase.id.clone()),
            method: input.method,
            amount_minor: applied.minor(),
            idempotency_key: input.idempotency_key.clone(),
            reference: None,
            created_at: now,
        };
        if let Err(err) = self.payments.insert(&payment) {
            if matches!(err, CoreError::Conflict { .. }) {
                if let Some(key) = &input.idempotency_key {
                    if let Some(existing) = self.payments.find_by_idempotency_key(key)? {
                        info!(payment_id = %existing.id, key = %key, "Lost idempotency race; returning committed payment");
                        return self.replayed(existing);
                    }
                }
            }
            return Err(err);
        }

        self.purchases.apply_payment_progress(
            &purchase.id,
            new_paid.minor(),
            new_remaining.minor(),
            status,
        )?;

        let journal_entry_id = self.write_journal(
            &payment,
            journal::debit(coa::ACCOUNTS_PAYABLE, applied),
            journal::credit(coa::CASH, applied),
            now,
        )?;

        let mut ledger_entry_id = None;
        if let Some(supplier_id) = &purchase.supplier_id {
            if feature_enabled(self.settings.as_ref(), settings_keys::LEDGER_ENABLED)? {
                let prior = self.supplier_ledger.last_balance(supplier_id)?;
                let entry = SupplierLedgerEntry {
                    id: Uuid::new_v4().to_string(),
                    supplier_id: supplier_id.clone(),
                    transaction_type: LedgerTransactionType::Payment,
                    reference_type: Some("payment".to_string()),
                    reference_id: Some(payment.id.clone()),
                    amount_minor: -settled.minor(),
                    balance_after_minor: prior - settled.minor(),
                    created_at: now,
                };
                self.supplier_ledger.append(&entry)?;
                ledger_entry_id = Some(entry.id);
            }
        }

        info!(
            payment_id = %payment.id,
            purchase_id = %purchase.id,
            applied = %applied,
            remaining = %new_remaining,
            status = ?status,
            "Payment committed"
        );

        Ok(PaymentReceipt {
            payment,
            applied_minor: applied.minor(),
            remaining_minor: new_remaining.minor(),
            status,
            journal_entry_id,
            ledger_entry_id,
            deduplicated: false,
        })
    }

    // -- Shared pieces ------------------------------------------------------

    /// Two-line cash movement entry. The journal books only the cash that
    /// moved; a collapsed residual lives in the ledger row, not here.
    fn write_journal(
        &self,
        payment: &Payment,
        debit: journal::LineSpec,
        credit: journal::LineSpec,
        now: chrono::DateTime<Utc>,
    ) -> CoreResult<Option<String>> {
        if !feature_enabled(self.settings.as_ref(), settings_keys::ACCOUNTING_ENABLED)? {
            return Ok(None);
        }

        let entry = journal::build_draft_entry(
            self.accounting.as_ref(),
            format!("Payment {}", payment.id),
            "payment",
            &payment.id,
            vec![debit, credit],
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

    /// Rebuilds a receipt for an already-committed payment by re-reading
    /// its target document's current progress.
    fn replayed(&self, payment: Payment) -> CoreResult<PaymentReceipt> {
        let (remaining_minor, status) = if let Some(sale_id) = &payment.sale_id {
            let sale = self
                .sales
                .find_by_id(sale_id)?
                .ok_or_else(|| CoreError::not_found("Sale", sale_id.clone()))?;
            (sale.remaining_minor, sale.status)
        } else if let Some(purchase_id) = &payment.purchase_id {
            let purchase = self
                .purchases
                .find_by_id(purchase_id)?
                .ok_or_else(|| CoreError::not_found("Purchase", purchase_id.clone()))?;
            (purchase.remaining_minor, purchase.status)
        } else {
            (0, DocumentStatus::Completed)
        };

        Ok(PaymentReceipt {
            applied_minor: payment.amount_minor,
            payment,
            remaining_minor,
            status,
            journal_entry_id: None,
            ledger_entry_id: None,
            deduplicated: true,
        })
    }

    /// Best-effort side effects, run after the transaction scope closed.
    pub async fn side_effects(&self, receipt: &PaymentReceipt) {
        if receipt.deduplicated {
            debug!(payment_id = %receipt.payment.id, "Replayed payment; skipping side effects");
            return;
        }
        let event = AuditEvent::new(
            "Payment applied",
            "payment",
            receipt.payment.id.clone(),
            json!({
                "applied_minor": receipt.applied_minor,
                "remaining_minor": receipt.remaining_minor,
                "sale_id": receipt.payment.sale_id,
                "purchase_id": receipt.payment.purchase_id,
                "status": receipt.status,
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }
}
