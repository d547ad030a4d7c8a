//! Manual stock adjustment scenarios: batch resolution, re-sync, guards.

mod common;

use common::*;

use dukkan_core::commands::AdjustStockInput;
use dukkan_core::error::CoreError;
use dukkan_core::types::{
    AdjustmentReason, BatchStatus, MovementReason, MovementType, ProductStatus,
};

fn adjust(product_id: &str, change: i64) -> AdjustStockInput {
    AdjustStockInput {
        product_id: product_id.to_string(),
        quantity_change: change,
        reason: AdjustmentReason::Manual,
        batch_id: None,
    }
}

#[test]
fn positive_adjustment_opens_batch() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w.stock.commit(&adjust(&product_id, 10)).unwrap();

    assert_eq!(receipt.stock_before, 0);
    assert_eq!(receipt.stock_after, 10);

    let batch = w.store.batch(&receipt.batch_id).unwrap();
    assert_eq!(batch.quantity_on_hand, 10);
    assert_eq!(batch.cost_per_unit_minor, 3000); // product cost

    let product = w.store.product(&product_id).unwrap();
    assert_eq!(product.stock, 10);
    assert_eq!(product.status, ProductStatus::Available);

    let movements = w.store.movements();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::In);
    assert_eq!(movements[0].reason, MovementReason::Manual);
    assert_eq!(movements[0].reference_type.as_deref(), Some("adjustment"));
}

#[test]
fn opening_reason_carries_through() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let mut input = adjust(&product_id, 5);
    input.reason = AdjustmentReason::Opening;
    w.stock.commit(&input).unwrap();

    assert_eq!(w.store.movements()[0].reason, MovementReason::Opening);
}

#[test]
fn negative_adjustment_picks_first_covering_batch() {
    let w = World::new();
    let (product_id, first_batch) = w.store.seed_product("Cola", 3000, 5000, 5);
    let second_batch = w.store.seed_batch(&product_id, 10, 3000);

    // Deduct 8: the first batch (5) cannot cover it whole, so the second
    // batch takes the entire deduction. Never split.
    let receipt = w.stock.commit(&adjust(&product_id, -8)).unwrap();

    assert_eq!(receipt.batch_id, second_batch);
    assert_eq!(w.store.batch(&first_batch).unwrap().quantity_on_hand, 5);
    assert_eq!(w.store.batch(&second_batch).unwrap().quantity_on_hand, 2);
    assert_eq!(w.store.product(&product_id).unwrap().stock, 7);

    let movements = w.store.movements();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].quantity_base, 8);
    assert_eq!(movements[0].stock_before, 15);
    assert_eq!(movements[0].stock_after, 7);
}

#[test]
fn deduction_never_splits_across_batches() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 5);
    w.store.seed_batch(&product_id, 5, 3000);

    // Total on hand is 10, but no single batch covers 8.
    let err = w.stock.commit(&adjust(&product_id, -8)).unwrap_err();
    assert!(matches!(err, CoreError::InsufficientStock { .. }));
    assert_eq!(w.store.product(&product_id).unwrap().stock, 10);
}

#[test]
fn explicit_batch_deduction_and_depletion() {
    let w = World::new();
    let (product_id, batch_id) = w.store.seed_product("Cola", 3000, 5000, 5);

    let mut input = adjust(&product_id, -5);
    input.batch_id = Some(batch_id.clone());
    let receipt = w.stock.commit(&input).unwrap();

    assert_eq!(receipt.batch_id, batch_id);
    let batch = w.store.batch(&batch_id).unwrap();
    assert_eq!(batch.quantity_on_hand, 0);
    assert_eq!(batch.status, BatchStatus::Depleted);
    assert_eq!(
        w.store.product(&product_id).unwrap().status,
        ProductStatus::OutOfStock
    );
}

#[test]
fn explicit_batch_overdraw_rejected() {
    let w = World::new();
    let (product_id, batch_id) = w.store.seed_product("Cola", 3000, 5000, 5);

    let mut input = adjust(&product_id, -6);
    input.batch_id = Some(batch_id.clone());
    let err = w.stock.commit(&input).unwrap_err();

    match err {
        CoreError::InsufficientStock {
            batch_id: Some(id),
            available,
            requested,
            ..
        } => {
            assert_eq!(id, batch_id);
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        other => panic!("expected batch-level InsufficientStock, got {other:?}"),
    }
}

#[test]
fn explicit_batch_must_belong_to_product() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 5);
    let (_, other_batch) = w.store.seed_product("Fanta", 3000, 5000, 5);

    let mut input = adjust(&product_id, -1);
    input.batch_id = Some(other_batch);
    let err = w.stock.commit(&input).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn top_up_reactivates_depleted_batch() {
    let w = World::new();
    let (product_id, batch_id) = w.store.seed_product("Cola", 3000, 5000, 5);

    let mut drain = adjust(&product_id, -5);
    drain.batch_id = Some(batch_id.clone());
    w.stock.commit(&drain).unwrap();

    let mut refill = adjust(&product_id, 3);
    refill.batch_id = Some(batch_id.clone());
    w.stock.commit(&refill).unwrap();

    let batch = w.store.batch(&batch_id).unwrap();
    assert_eq!(batch.quantity_on_hand, 3);
    assert_eq!(batch.status, BatchStatus::Active);
    assert_eq!(
        w.store.product(&product_id).unwrap().status,
        ProductStatus::Available
    );
}

#[test]
fn zero_change_rejected() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 5);

    let err = w.stock.commit(&adjust(&product_id, 0)).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[test]
fn unknown_product_rejected() {
    let w = World::new();
    let err = w.stock.commit(&adjust("ghost", 5)).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn cache_resyncs_to_batch_sum() {
    use dukkan_engine::ProductRepository;

    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 5);

    // Drift the cache; the next adjustment heals it.
    w.store.set_stock(&product_id, 99).unwrap();
    w.stock.commit(&adjust(&product_id, 3)).unwrap();

    assert_eq!(w.store.product(&product_id).unwrap().stock, 8);
}

#[tokio::test]
async fn side_effects_record_audit_event() {
    let w = World::new();
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 0);

    let receipt = w.stock.commit(&adjust(&product_id, 10)).unwrap();
    w.stock.side_effects(&receipt).await;

    let events = w.store.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "Stock adjusted");
}
