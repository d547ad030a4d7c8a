//! # Posting & Reversal Engine
//!
//! Drives the journal state machine: period-close posting, reversal of
//! posted entries, and voiding of unposted drafts.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 ┌── void ──► voided (terminal)                          │
//! │   unposted ─────┤                                                       │
//! │                 └── post_period ──► posted ── reverse ──► reversed      │
//! │                                        │                  (original     │
//! │                                        │                   flagged, a   │
//! │                                 batch locked?               mirror      │
//! │                                 reversal refused            entry is    │
//! │                                                             created)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is ever deleted: a reversal creates a mirror entry with debit
//! and credit swapped, so the books stay append-only and the net effect
//! of the pair is zero on every account.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use dukkan_core::commands::PostPeriodInput;
use dukkan_core::error::{CoreError, CoreResult};
use dukkan_core::types::{JournalEntry, JournalLine, PostingBatch, PostingBatchStatus};
use dukkan_core::validation::validate_post_period;

use crate::audit::{record_best_effort, AuditEvent, AuditLog};
use crate::ports::{AccountingRepository, PostingRepository};

// =============================================================================
// Receipt
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PostingReceipt {
    pub batch: PostingBatch,
    /// The entries this run posted, in storage order.
    pub entry_ids: Vec<String>,
}

// =============================================================================
// Engine
// =============================================================================

/// The posting, reversal, and lock engine.
pub struct PostingEngine {
    accounting: Arc<dyn AccountingRepository>,
    posting: Arc<dyn PostingRepository>,
    audit: Arc<dyn AuditLog>,
}

impl PostingEngine {
    pub fn new(
        accounting: Arc<dyn AccountingRepository>,
        posting: Arc<dyn PostingRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        PostingEngine {
            accounting,
            posting,
            audit,
        }
    }

    /// Posts every unposted, non-voided entry in the period under a new
    /// batch. An empty period still produces a (zero-entry) batch so the
    /// close is recorded.
    pub fn post_period(&self, input: &PostPeriodInput) -> CoreResult<PostingReceipt> {
        validate_post_period(input)?;
        debug!(period = ?input.period_type, "Posting period");

        let entries = self
            .posting
            .unposted_entries_in(input.period_start, input.period_end)?;
        let entry_ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        let total_minor: i64 = entries.iter().map(|e| e.debit_total().minor()).sum();

        let now = Utc::now();
        let batch = PostingBatch {
            id: Uuid::new_v4().to_string(),
            period_type: input.period_type,
            period_start: input.period_start,
            period_end: input.period_end,
            entries_count: entry_ids.len() as i64,
            total_minor,
            status: PostingBatchStatus::Posted,
            created_at: now,
            locked_at: None,
        };

        self.posting.insert_batch(&batch)?;
        self.posting.mark_entries_posted(&entry_ids, &batch.id)?;

        info!(
            batch_id = %batch.id,
            entries = batch.entries_count,
            total = batch.total_minor,
            "Period posted"
        );

        Ok(PostingReceipt { batch, entry_ids })
    }

    /// Reverses a posted entry by creating its debit/credit mirror.
    ///
    /// The original stays in place, flagged `is_reversed`; the mirror is
    /// created unposted and will be picked up by the next period close.
    pub fn reverse_entry(
        &self,
        entry_id: &str,
        user_id: Option<&str>,
    ) -> CoreResult<JournalEntry> {
        let original = self
            .accounting
            .find_entry_by_id(entry_id)?
            .ok_or_else(|| CoreError::not_found("JournalEntry", entry_id))?;

        if !original.is_posted {
            return Err(CoreError::invalid_state(
                "JournalEntry",
                original.id,
                "unposted",
                "reverse",
            ));
        }
        if original.is_reversed {
            return Err(CoreError::invalid_state(
                "JournalEntry",
                original.id,
                "reversed",
                "reverse",
            ));
        }
        if let Some(batch_id) = &original.posting_batch_id {
            if self.posting.is_batch_locked(batch_id)? {
                return Err(CoreError::invalid_state(
                    "PostingBatch",
                    batch_id.clone(),
                    "locked",
                    "reverse entry",
                ));
            }
        }

        let now = Utc::now();
        let reversal_id = Uuid::new_v4().to_string();
        let lines: Vec<JournalLine> = original
            .lines
            .iter()
            .map(|line| JournalLine {
                id: Uuid::new_v4().to_string(),
                entry_id: reversal_id.clone(),
                account_id: line.account_id.clone(),
                account_code: line.account_code.clone(),
                // The swap IS the reversal: net effect per account is zero.
                debit_minor: line.credit_minor,
                credit_minor: line.debit_minor,
                memo: line.memo.clone(),
            })
            .collect();

        let reversal = JournalEntry {
            id: reversal_id,
            entry_date: now,
            description: format!("REVERSAL: {}", original.description),
            reference_type: original.reference_type.clone(),
            reference_id: original.reference_id.clone(),
            is_posted: false,
            is_reversed: false,
            reversal_of_id: Some(original.id.clone()),
            posting_batch_id: None,
            created_by: user_id.map(str::to_string),
            lines,
            created_at: now,
        };

        self.accounting.insert_journal_entry(&reversal)?;
        self.posting.mark_entry_reversed(&original.id)?;

        info!(
            entry_id = %original.id,
            reversal_id = %reversal.id,
            "Journal entry reversed"
        );

        Ok(reversal)
    }

    /// Voids an unposted draft in place. No mirror entry is created; the
    /// draft simply never reaches a posting batch.
    pub fn void_unposted(&self, entry_id: &str) -> CoreResult<()> {
        let entry = self
            .accounting
            .find_entry_by_id(entry_id)?
            .ok_or_else(|| CoreError::not_found("JournalEntry", entry_id))?;

        if entry.is_posted {
            return Err(CoreError::invalid_state(
                "JournalEntry",
                entry.id,
                "posted",
                "void",
            ));
        }
        if entry.is_reversed {
            return Err(CoreError::invalid_state(
                "JournalEntry",
                entry.id,
                "voided",
                "void",
            ));
        }

        self.posting.mark_entry_reversed(&entry.id)?;
        info!(entry_id = %entry.id, "Journal entry voided");
        Ok(())
    }

    /// Locks a posted batch: its entries can no longer be reversed.
    pub fn lock_batch(&self, batch_id: &str) -> CoreResult<()> {
        let batch = self
            .posting
            .find_batch(batch_id)?
            .ok_or_else(|| CoreError::not_found("PostingBatch", batch_id))?;

        if batch.status == PostingBatchStatus::Locked {
            return Err(CoreError::invalid_state(
                "PostingBatch",
                batch.id,
                "locked",
                "lock",
            ));
        }

        self.posting.set_batch_locked(&batch.id, true)?;
        info!(batch_id = %batch.id, "Posting batch locked");
        Ok(())
    }

    /// Unlocks a batch. An explicit administrative override, audited like
    /// everything else.
    pub fn unlock_batch(&self, batch_id: &str) -> CoreResult<()> {
        let batch = self
            .posting
            .find_batch(batch_id)?
            .ok_or_else(|| CoreError::not_found("PostingBatch", batch_id))?;

        if batch.status != PostingBatchStatus::Locked {
            return Err(CoreError::invalid_state(
                "PostingBatch",
                batch.id,
                "unlocked",
                "unlock",
            ));
        }

        self.posting.set_batch_locked(&batch.id, false)?;
        info!(batch_id = %batch.id, "Posting batch unlocked");
        Ok(())
    }

    /// Best-effort side effects for a period close.
    pub async fn side_effects(&self, receipt: &PostingReceipt) {
        let event = AuditEvent::new(
            "Period posted",
            "posting_batch",
            receipt.batch.id.clone(),
            json!({
                "period_type": receipt.batch.period_type,
                "entries": receipt.batch.entries_count,
                "total_minor": receipt.batch.total_minor,
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }

    /// Best-effort side effects for a reversal.
    pub async fn reversal_side_effects(&self, reversal: &JournalEntry) {
        let event = AuditEvent::new(
            "Journal entry reversed",
            "journal_entry",
            reversal.id.clone(),
            json!({
                "reversal_of_id": reversal.reversal_of_id,
                "debit_total_minor": reversal.debit_total().minor(),
            }),
        );
        record_best_effort(self.audit.as_ref(), event).await;
    }
}
