//! Payment scenarios: clamping, settlement, state guards, idempotency.

mod common;

use common::*;

use dukkan_core::coa;
use dukkan_core::error::CoreError;
use dukkan_core::types::DocumentStatus;
use dukkan_engine::SaleRepository;

fn open_credit_sale(w: &World, price_minor: i64) -> String {
    let (product_id, _) = w.store.seed_product("TV", price_minor / 2, price_minor, 10);
    w.sales
        .commit(&credit_sale(vec![sale_line(&product_id, 1, price_minor)], "cust-1"))
        .unwrap()
        .sale
        .id
}

#[test]
fn payment_clamps_to_remaining() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 5000);

    let receipt = w.payments.commit(&sale_payment(&sale_id, 999999)).unwrap();

    assert_eq!(receipt.applied_minor, 5000);
    assert_eq!(receipt.remaining_minor, 0);
    assert_eq!(receipt.status, DocumentStatus::Completed);
    assert_eq!(receipt.payment.amount_minor, 5000);

    let sale = w.store.find_by_id(&sale_id).unwrap().unwrap();
    assert_eq!(sale.paid_minor, 5000);
    assert_eq!(sale.status, DocumentStatus::Completed);
    assert!(sale.completed_at.is_some());
}

#[test]
fn partial_payment_keeps_sale_pending() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 10000);

    let receipt = w.payments.commit(&sale_payment(&sale_id, 2000)).unwrap();

    assert_eq!(receipt.applied_minor, 2000);
    assert_eq!(receipt.remaining_minor, 8000);
    assert_eq!(receipt.status, DocumentStatus::Pending);

    // Ledger: invoice +10000 then payment −2000 → balance 8000.
    let rows = w.store.customer_ledger_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].amount_minor, -2000);
    assert_eq!(rows[1].balance_after_minor, 8000);

    // Journal: Cash in, AR released.
    let entries = w.store.journal_entries();
    let entry = entries.last().unwrap();
    assert_eq!(line_amounts(entry, coa::CASH), (2000, 0));
    assert_eq!(line_amounts(entry, coa::ACCOUNTS_RECEIVABLE), (0, 2000));
}

#[test]
fn sub_threshold_residual_settles_document_and_ledger() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 10000);

    // 9,900 against 10,000: the 100 IQD residual collapses.
    let receipt = w.payments.commit(&sale_payment(&sale_id, 9900)).unwrap();

    assert_eq!(receipt.applied_minor, 9900);
    assert_eq!(receipt.remaining_minor, 0);
    assert_eq!(receipt.status, DocumentStatus::Completed);

    // The ledger row carries the full settled amount (9,900 + 100), so
    // the running balance returns to zero.
    let rows = w.store.customer_ledger_rows();
    assert_eq!(rows[1].amount_minor, -10000);
    assert_eq!(rows[1].balance_after_minor, 0);
}

#[test]
fn settled_sale_rejects_further_payments() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 5000);
    w.payments.commit(&sale_payment(&sale_id, 5000)).unwrap();

    let err = w.payments.commit(&sale_payment(&sale_id, 100)).unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));
}

#[test]
fn cancelled_sale_rejects_payments() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 5000);
    w.store
        .update_status(&sale_id, DocumentStatus::Cancelled)
        .unwrap();

    let err = w.payments.commit(&sale_payment(&sale_id, 100)).unwrap_err();
    match err {
        CoreError::InvalidState { state, .. } => assert_eq!(state, "cancelled"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[test]
fn target_must_be_exactly_one_document() {
    let w = World::new();

    let mut input = sale_payment("s-1", 100);
    input.purchase_id = Some("p-1".to_string());
    assert!(matches!(
        w.payments.commit(&input).unwrap_err(),
        CoreError::Validation(_)
    ));

    let mut input = sale_payment("s-1", 100);
    input.sale_id = None;
    assert!(matches!(
        w.payments.commit(&input).unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[test]
fn unknown_sale_not_found() {
    let w = World::new();
    let err = w.payments.commit(&sale_payment("ghost", 100)).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn idempotency_key_replays_payment() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 10000);

    let mut input = sale_payment(&sale_id, 4000);
    input.idempotency_key = Some("pay-key-1".to_string());

    let first = w.payments.commit(&input).unwrap();
    let second = w.payments.commit(&input).unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(second.payment.id, first.payment.id);
    // One payment row beyond nothing from the credit sale (paid 0).
    assert_eq!(w.store.payments().len(), 1);

    let sale = w.store.find_by_id(&sale_id).unwrap().unwrap();
    assert_eq!(sale.paid_minor, 4000);
}

#[test]
fn purchase_payment_releases_payable() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);
    let purchase_id = w
        .purchases
        .commit(&credit_purchase(
            vec![purchase_line(&product_id, 10, 2000)],
            "supp-1",
        ))
        .unwrap()
        .purchase
        .id;

    let receipt = w
        .payments
        .commit(&purchase_payment(&purchase_id, 20000))
        .unwrap();

    assert_eq!(receipt.applied_minor, 20000);
    assert_eq!(receipt.status, DocumentStatus::Completed);

    // Journal: AP debited, cash out.
    let entries = w.store.journal_entries();
    let entry = entries.last().unwrap();
    assert_eq!(line_amounts(entry, coa::ACCOUNTS_PAYABLE), (20000, 0));
    assert_eq!(line_amounts(entry, coa::CASH), (0, 20000));

    // Supplier ledger back to zero.
    let rows = w.store.supplier_ledger_rows();
    assert_eq!(rows.last().unwrap().balance_after_minor, 0);
}

#[test]
fn balance_reads_track_running_ledgers() {
    use dukkan_engine::{CustomerLedgerRepository, SupplierLedgerRepository};

    let w = World::new();
    let sale_id = open_credit_sale(&w, 10000);
    w.payments.commit(&sale_payment(&sale_id, 2000)).unwrap();

    let store = w.store.as_ref();
    assert_eq!(
        CustomerLedgerRepository::balance(store, "cust-1").unwrap(),
        8000
    );
    // Untouched ledgers read as zero on either side.
    assert_eq!(
        SupplierLedgerRepository::balance(store, "supp-1").unwrap(),
        0
    );
}

#[tokio::test]
async fn side_effects_record_audit_event() {
    let w = World::new();
    let sale_id = open_credit_sale(&w, 5000);

    let receipt = w.payments.commit(&sale_payment(&sale_id, 5000)).unwrap();
    w.payments.side_effects(&receipt).await;

    let events = w.store.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "Payment applied");
}
