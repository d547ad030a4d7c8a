//! Shared test harness: one MemoryStore wired into all five engines.

#![allow(dead_code)]

use std::sync::Arc;

use dukkan_core::commands::{
    AddPaymentInput, CreatePurchaseInput, CreateSaleInput, PurchaseItemInput, SaleItemInput,
};
use dukkan_core::money::CurrencyProfile;
use dukkan_core::types::{PaymentMethod, PaymentType};
use dukkan_engine::{
    MemoryStore, PaymentEngine, PostingEngine, PurchaseEngine, SaleEngine, StockAdjustmentEngine,
};

pub struct World {
    pub store: Arc<MemoryStore>,
    pub sales: SaleEngine,
    pub purchases: PurchaseEngine,
    pub payments: PaymentEngine,
    pub stock: StockAdjustmentEngine,
    pub posting: PostingEngine,
}

impl World {
    /// Full world: chart of accounts seeded, IQD rounding profile.
    pub fn new() -> Self {
        let world = World::bare();
        world.store.seed_accounts();
        world
    }

    /// World WITHOUT a chart of accounts, for the journal-skip paths.
    pub fn bare() -> Self {
        let store = Arc::new(MemoryStore::new());
        let currency = CurrencyProfile::iqd();

        let sales = SaleEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            currency.clone(),
        );
        let purchases = PurchaseEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            currency.clone(),
        );
        let payments = PaymentEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            currency,
        );
        let stock = StockAdjustmentEngine::new(store.clone(), store.clone(), store.clone());
        let posting = PostingEngine::new(store.clone(), store.clone(), store.clone());

        World {
            store,
            sales,
            purchases,
            payments,
            stock,
            posting,
        }
    }
}

// -- Input builders -----------------------------------------------------------

pub fn sale_line(product_id: &str, quantity: i64, unit_price_minor: i64) -> SaleItemInput {
    SaleItemInput {
        product_id: product_id.to_string(),
        quantity,
        unit_factor: 1,
        unit_price_minor,
        discount_minor: 0,
        batch_id: None,
    }
}

pub fn cash_sale(items: Vec<SaleItemInput>, paid_amount_minor: i64) -> CreateSaleInput {
    CreateSaleInput {
        items,
        customer_id: None,
        payment_type: PaymentType::Cash,
        paid_amount_minor,
        tax_rate_bps: None,
        interest_rate_bps: None,
        idempotency_key: None,
    }
}

pub fn credit_sale(items: Vec<SaleItemInput>, customer_id: &str) -> CreateSaleInput {
    CreateSaleInput {
        items,
        customer_id: Some(customer_id.to_string()),
        payment_type: PaymentType::Credit,
        paid_amount_minor: 0,
        tax_rate_bps: None,
        interest_rate_bps: None,
        idempotency_key: None,
    }
}

pub fn purchase_line(product_id: &str, quantity: i64, unit_cost_minor: i64) -> PurchaseItemInput {
    PurchaseItemInput {
        product_id: product_id.to_string(),
        quantity,
        unit_factor: 1,
        unit_cost_minor,
        batch_number: None,
        expiry_date: None,
    }
}

pub fn cash_purchase(items: Vec<PurchaseItemInput>, paid_amount_minor: i64) -> CreatePurchaseInput {
    CreatePurchaseInput {
        items,
        supplier_id: None,
        payment_type: PaymentType::Cash,
        paid_amount_minor,
        tax_rate_bps: None,
        idempotency_key: None,
    }
}

pub fn credit_purchase(items: Vec<PurchaseItemInput>, supplier_id: &str) -> CreatePurchaseInput {
    CreatePurchaseInput {
        items,
        supplier_id: Some(supplier_id.to_string()),
        payment_type: PaymentType::Credit,
        paid_amount_minor: 0,
        tax_rate_bps: None,
        idempotency_key: None,
    }
}

pub fn sale_payment(sale_id: &str, amount_minor: i64) -> AddPaymentInput {
    AddPaymentInput {
        sale_id: Some(sale_id.to_string()),
        purchase_id: None,
        amount_minor,
        method: PaymentMethod::Cash,
        idempotency_key: None,
    }
}

pub fn purchase_payment(purchase_id: &str, amount_minor: i64) -> AddPaymentInput {
    AddPaymentInput {
        sale_id: None,
        purchase_id: Some(purchase_id.to_string()),
        amount_minor,
        method: PaymentMethod::Cash,
        idempotency_key: None,
    }
}

// -- Journal assertions ---------------------------------------------------------

use dukkan_core::types::JournalEntry;

/// Finds the single line on `code` and returns (debit, credit).
pub fn line_amounts(entry: &JournalEntry, code: &str) -> (i64, i64) {
    let line = entry
        .lines
        .iter()
        .find(|l| l.account_code == code)
        .unwrap_or_else(|| panic!("no journal line for account {code}"));
    (line.debit_minor, line.credit_minor)
}
