//! End-to-end purchase (goods receipt) scenarios.

mod common;

use common::*;

use dukkan_core::coa;
use dukkan_core::error::CoreError;
use dukkan_core::types::{BatchStatus, DocumentStatus, MovementType, ProductStatus};

#[test]
fn purchase_opens_batch_and_raises_stock() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w
        .purchases
        .commit(&cash_purchase(vec![purchase_line(&product_id, 10, 2000)], 20000))
        .unwrap();

    assert_eq!(receipt.purchase.total_minor, 20000);
    assert_eq!(receipt.purchase.status, DocumentStatus::Completed);
    assert_eq!(receipt.batch_ids.len(), 1);

    let batch = w.store.batch(&receipt.batch_ids[0]).unwrap();
    assert_eq!(batch.quantity_received, 10);
    assert_eq!(batch.quantity_on_hand, 10);
    assert_eq!(batch.cost_per_unit_minor, 2000);
    assert_eq!(batch.status, BatchStatus::Active);

    let product = w.store.product(&product_id).unwrap();
    assert_eq!(product.stock, 10);
    assert_eq!(product.status, ProductStatus::Available);

    let movements = w.store.movements();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::In);
    assert_eq!(movements[0].stock_before, 0);
    assert_eq!(movements[0].stock_after, 10);

    // Journal: Inventory 20000 / Cash 20000
    let entry = &w.store.journal_entries()[0];
    assert!(entry.is_balanced());
    assert_eq!(line_amounts(entry, coa::INVENTORY), (20000, 0));
    assert_eq!(line_amounts(entry, coa::CASH), (0, 20000));
}

#[test]
fn carton_unit_factor_converts_to_base_units() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    // 2 cartons of 12 at 24,000 per carton.
    let mut line = purchase_line(&product_id, 2, 24000);
    line.unit_factor = 12;

    let receipt = w
        .purchases
        .commit(&cash_purchase(vec![line], 48000))
        .unwrap();

    assert_eq!(receipt.items[0].quantity_base, 24);
    let batch = w.store.batch(&receipt.batch_ids[0]).unwrap();
    assert_eq!(batch.quantity_on_hand, 24);
    assert_eq!(batch.cost_per_unit_minor, 2000); // 24,000 / 12
    assert_eq!(w.store.product(&product_id).unwrap().stock, 24);
}

#[test]
fn each_line_gets_its_own_batch() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w
        .purchases
        .commit(&cash_purchase(
            vec![
                purchase_line(&product_id, 5, 2000),
                purchase_line(&product_id, 7, 2100),
            ],
            24700,
        ))
        .unwrap();

    assert_eq!(receipt.batch_ids.len(), 2);
    assert_ne!(receipt.batch_ids[0], receipt.batch_ids[1]);
    assert_eq!(w.store.product(&product_id).unwrap().stock, 12);
    assert_eq!(w.store.movements().len(), 2);
}

#[test]
fn credit_purchase_books_payable() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w
        .purchases
        .commit(&credit_purchase(
            vec![purchase_line(&product_id, 10, 2000)],
            "supp-1",
        ))
        .unwrap();

    assert_eq!(receipt.purchase.remaining_minor, 20000);
    assert_eq!(receipt.purchase.status, DocumentStatus::Pending);

    let entry = &w.store.journal_entries()[0];
    assert_eq!(line_amounts(entry, coa::INVENTORY), (20000, 0));
    assert_eq!(line_amounts(entry, coa::ACCOUNTS_PAYABLE), (0, 20000));

    let rows = w.store.supplier_ledger_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].amount_minor, 20000);
    assert_eq!(rows[0].balance_after_minor, 20000);
}

#[test]
fn tax_splits_into_vat_input_line() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    // 20,000 + 5% VAT = 21,000
    let mut input = cash_purchase(vec![purchase_line(&product_id, 10, 2000)], 21000);
    input.tax_rate_bps = Some(500);

    let receipt = w.purchases.commit(&input).unwrap();
    assert_eq!(receipt.purchase.tax_minor, 1000);
    assert_eq!(receipt.purchase.total_minor, 21000);

    let entry = &w.store.journal_entries()[0];
    assert!(entry.is_balanced());
    assert_eq!(line_amounts(entry, coa::INVENTORY), (20000, 0));
    assert_eq!(line_amounts(entry, coa::VAT_INPUT), (1000, 0));
    assert_eq!(line_amounts(entry, coa::CASH), (0, 21000));
}

#[test]
fn idempotency_key_replays_without_new_writes() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let mut input = cash_purchase(vec![purchase_line(&product_id, 10, 2000)], 20000);
    input.idempotency_key = Some("purchase-key-1".to_string());

    let first = w.purchases.commit(&input).unwrap();
    let second = w.purchases.commit(&input).unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(second.purchase.id, first.purchase.id);
    assert_eq!(w.store.purchase_count(), 1);
    assert_eq!(w.store.product(&product_id).unwrap().stock, 10);
}

#[test]
fn credit_purchase_requires_supplier() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let mut input = cash_purchase(vec![purchase_line(&product_id, 10, 2000)], 0);
    input.payment_type = dukkan_core::types::PaymentType::Credit;

    let err = w.purchases.commit(&input).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn unknown_product_rejected() {
    let w = World::new();

    let err = w
        .purchases
        .commit(&cash_purchase(vec![purchase_line("ghost", 10, 2000)], 20000))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn side_effects_record_audit_event() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w
        .purchases
        .commit(&cash_purchase(vec![purchase_line(&product_id, 10, 2000)], 20000))
        .unwrap();
    w.purchases.side_effects(&receipt).await;

    let events = w.store.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "Purchase received");
}
