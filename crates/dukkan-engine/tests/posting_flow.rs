//! Period close, reversal, void, and lock scenarios.

mod common;

use common::*;

use chrono::{Duration, Utc};
use dukkan_core::commands::PostPeriodInput;
use dukkan_core::error::CoreError;
use dukkan_core::types::{PeriodType, PostingBatchStatus};
use dukkan_engine::{AccountingRepository, PostingRepository};

fn today() -> PostPeriodInput {
    let now = Utc::now();
    PostPeriodInput {
        period_type: PeriodType::Daily,
        period_start: now - Duration::hours(1),
        period_end: now + Duration::hours(1),
    }
}

/// Commits `n` cash sales of 5,000 each, producing one draft journal
/// entry per sale.
fn seed_entries(w: &World, n: usize) {
    let (product_id, _) = w.store.seed_product("Cola", 3000, 5000, 100);
    for _ in 0..n {
        w.sales
            .commit(&cash_sale(vec![sale_line(&product_id, 1, 5000)], 5000))
            .unwrap();
    }
}

#[test]
fn post_period_groups_unposted_entries() {
    let w = World::new();
    seed_entries(&w, 2);

    let receipt = w.posting.post_period(&today()).unwrap();

    assert_eq!(receipt.batch.entries_count, 2);
    assert_eq!(receipt.batch.status, PostingBatchStatus::Posted);
    // Each sale entry debits Cash 5000 + COGS 3000 = 8000.
    assert_eq!(receipt.batch.total_minor, 16000);

    for entry in w.store.journal_entries() {
        assert!(entry.is_posted);
        assert_eq!(entry.posting_batch_id.as_deref(), Some(receipt.batch.id.as_str()));
    }

    // A second run finds nothing left.
    let second = w.posting.post_period(&today()).unwrap();
    assert_eq!(second.batch.entries_count, 0);
    assert_eq!(second.batch.total_minor, 0);
}

#[test]
fn inverted_period_rejected() {
    let w = World::new();
    let now = Utc::now();
    let input = PostPeriodInput {
        period_type: PeriodType::Custom,
        period_start: now,
        period_end: now - Duration::days(1),
    };
    assert!(matches!(
        w.posting.post_period(&input).unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[test]
fn reversal_mirrors_lines_and_flags_original() {
    let w = World::new();
    seed_entries(&w, 1);
    w.posting.post_period(&today()).unwrap();

    let original = w.store.journal_entries()[0].clone();
    let reversal = w.posting.reverse_entry(&original.id, Some("admin")).unwrap();

    // The mirror: every debit becomes a credit and vice versa.
    assert_eq!(reversal.lines.len(), original.lines.len());
    for (orig, rev) in original.lines.iter().zip(reversal.lines.iter()) {
        assert_eq!(rev.account_code, orig.account_code);
        assert_eq!(rev.debit_minor, orig.credit_minor);
        assert_eq!(rev.credit_minor, orig.debit_minor);
    }
    assert!(reversal.is_balanced());
    assert!(!reversal.is_posted);
    assert_eq!(reversal.reversal_of_id.as_deref(), Some(original.id.as_str()));
    assert!(reversal.description.starts_with("REVERSAL: "));
    assert_eq!(reversal.created_by.as_deref(), Some("admin"));

    let original_now = w.store.find_entry_by_id(&original.id).unwrap().unwrap();
    assert!(original_now.is_reversed);

    // The mirror is picked up by the next close.
    let next = w.posting.post_period(&today()).unwrap();
    assert_eq!(next.batch.entries_count, 1);
}

#[test]
fn reverse_unposted_rejected() {
    let w = World::new();
    seed_entries(&w, 1);

    let entry_id = w.store.journal_entries()[0].id.clone();
    let err = w.posting.reverse_entry(&entry_id, None).unwrap_err();
    match err {
        CoreError::InvalidState { state, .. } => assert_eq!(state, "unposted"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[test]
fn reverse_twice_rejected() {
    let w = World::new();
    seed_entries(&w, 1);
    w.posting.post_period(&today()).unwrap();

    let entry_id = w.store.journal_entries()[0].id.clone();
    w.posting.reverse_entry(&entry_id, None).unwrap();

    let err = w.posting.reverse_entry(&entry_id, None).unwrap_err();
    match err {
        CoreError::InvalidState { state, .. } => assert_eq!(state, "reversed"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[test]
fn locked_batch_blocks_reversal_until_unlocked() {
    let w = World::new();
    seed_entries(&w, 1);
    let receipt = w.posting.post_period(&today()).unwrap();
    let entry_id = receipt.entry_ids[0].clone();

    w.posting.lock_batch(&receipt.batch.id).unwrap();
    assert_eq!(
        w.store.find_batch(&receipt.batch.id).unwrap().unwrap().status,
        PostingBatchStatus::Locked
    );

    let err = w.posting.reverse_entry(&entry_id, None).unwrap_err();
    match err {
        CoreError::InvalidState { entity, state, .. } => {
            assert_eq!(entity, "PostingBatch");
            assert_eq!(state, "locked");
        }
        other => panic!("expected InvalidState, got {other:?}"),
    }

    w.posting.unlock_batch(&receipt.batch.id).unwrap();
    assert!(w.posting.reverse_entry(&entry_id, None).is_ok());
}

#[test]
fn lock_guards_are_state_checked() {
    let w = World::new();
    seed_entries(&w, 1);
    let receipt = w.posting.post_period(&today()).unwrap();

    // Unlocking an unlocked batch is invalid, as is double-locking.
    assert!(matches!(
        w.posting.unlock_batch(&receipt.batch.id).unwrap_err(),
        CoreError::InvalidState { .. }
    ));
    w.posting.lock_batch(&receipt.batch.id).unwrap();
    assert!(matches!(
        w.posting.lock_batch(&receipt.batch.id).unwrap_err(),
        CoreError::InvalidState { .. }
    ));
    assert!(matches!(
        w.posting.lock_batch("ghost").unwrap_err(),
        CoreError::NotFound { .. }
    ));
}

#[test]
fn void_excludes_draft_from_posting() {
    let w = World::new();
    seed_entries(&w, 2);

    let entry_id = w.store.journal_entries()[0].id.clone();
    w.posting.void_unposted(&entry_id).unwrap();

    let receipt = w.posting.post_period(&today()).unwrap();
    assert_eq!(receipt.batch.entries_count, 1);
    assert!(!receipt.entry_ids.contains(&entry_id));

    // The voided draft stays unposted forever.
    let voided = w.store.find_entry_by_id(&entry_id).unwrap().unwrap();
    assert!(voided.is_reversed);
    assert!(!voided.is_posted);
}

#[test]
fn void_posted_rejected() {
    let w = World::new();
    seed_entries(&w, 1);
    w.posting.post_period(&today()).unwrap();

    let entry_id = w.store.journal_entries()[0].id.clone();
    let err = w.posting.void_unposted(&entry_id).unwrap_err();
    match err {
        CoreError::InvalidState { state, .. } => assert_eq!(state, "posted"),
        other => panic!("expected InvalidState, got {other:?}"),
    }
}

#[test]
fn pre_posted_insert_rejected_by_store() {
    let w = World::new();
    seed_entries(&w, 1);

    let mut entry = w.store.journal_entries()[0].clone();
    entry.id = "forged".to_string();
    entry.is_posted = true;

    let err = w.store.insert_journal_entry(&entry).unwrap_err();
    assert!(matches!(err, CoreError::InvalidState { .. }));
}

#[test]
fn unknown_entry_not_found() {
    let w = World::new();
    assert!(matches!(
        w.posting.reverse_entry("ghost", None).unwrap_err(),
        CoreError::NotFound { .. }
    ));
    assert!(matches!(
        w.posting.void_unposted("ghost").unwrap_err(),
        CoreError::NotFound { .. }
    ));
}

#[tokio::test]
async fn side_effects_record_audit_events() {
    let w = World::new();
    seed_entries(&w, 1);

    let receipt = w.posting.post_period(&today()).unwrap();
    w.posting.side_effects(&receipt).await;

    let reversal = w
        .posting
        .reverse_entry(&receipt.entry_ids[0], None)
        .unwrap();
    w.posting.reversal_side_effects(&reversal).await;

    let events = w.store.audit_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "Period posted");
    assert_eq!(events[1].action, "Journal entry reversed");
}
