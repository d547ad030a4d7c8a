//! # Journal Construction
//!
//! Shared draft-entry builder for the Sale, Purchase, and Payment engines.
//!
//! ## Best-Effort Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Journal creation is the ONE documented exception to fail-fast:        │
//! │                                                                         │
//! │  missing chart-of-accounts code ──► skip entry, warn!                  │
//! │  computed lines don't balance   ──► skip entry, warn!                  │
//! │                                                                         │
//! │  The sale/purchase/payment itself still commits. Accounting is a       │
//! │  projection of a valid transaction, not a precondition for it.         │
//! │  Storage failures on the actual insert are NOT covered by this         │
//! │  policy — those still roll the commit back.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use dukkan_core::error::CoreResult;
use dukkan_core::money::Money;
use dukkan_core::types::{JournalEntry, JournalLine};

use crate::ports::AccountingRepository;

// =============================================================================
// Line Specs
// =============================================================================

/// One intended journal line, by account code. Zero-amount specs are
/// dropped before account resolution.
pub(crate) struct LineSpec {
    pub code: &'static str,
    pub debit: Money,
    pub credit: Money,
    pub memo: Option<String>,
}

/// Debit `amount` on the account with `code`.
pub(crate) fn debit(code: &'static str, amount: Money) -> LineSpec {
    LineSpec {
        code,
        debit: amount,
        credit: Money::zero(),
        memo: None,
    }
}

/// Credit `amount` on the account with `code`.
pub(crate) fn credit(code: &'static str, amount: Money) -> LineSpec {
    LineSpec {
        code,
        debit: Money::zero(),
        credit: amount,
        memo: None,
    }
}

// =============================================================================
// Draft Entry Builder
// =============================================================================

/// Builds an unposted journal entry from line specs.
///
/// Returns `Ok(None)` — with a logged reason — when the entry must be
/// skipped: no nonzero lines, a missing account code, or an unbalanced
/// result. Port failures during account lookup propagate.
pub(crate) fn build_draft_entry(
    accounting: &dyn AccountingRepository,
    description: String,
    reference_type: &str,
    reference_id: &str,
    specs: Vec<LineSpec>,
    now: DateTime<Utc>,
) -> CoreResult<Option<JournalEntry>> {
    let specs: Vec<LineSpec> = specs
        .into_iter()
        .filter(|s| !s.debit.is_zero() || !s.credit.is_zero())
        .collect();

    if specs.is_empty() {
        debug!(reference_id = %reference_id, "No nonzero journal lines; skipping entry");
        return Ok(None);
    }

    let entry_id = Uuid::new_v4().to_string();
    let mut lines = Vec::with_capacity(specs.len());

    for spec in specs {
        let account = match accounting.find_account_by_code(spec.code)? {
            Some(account) => account,
            None => {
                warn!(
                    code = %spec.code,
                    reference_id = %reference_id,
                    "Chart-of-accounts code missing; skipping journal entry"
                );
                return Ok(None);
            }
        };

        lines.push(JournalLine {
            id: Uuid::new_v4().to_string(),
            entry_id: entry_id.clone(),
            account_id: account.id,
            account_code: account.code,
            debit_minor: spec.debit.minor(),
            credit_minor: spec.credit.minor(),
            memo: spec.memo,
        });
    }

    let entry = JournalEntry {
        id: entry_id,
        entry_date: now,
        description,
        reference_type: Some(reference_type.to_string()),
        reference_id: Some(reference_id.to_string()),
        is_posted: false,
        is_reversed: false,
        reversal_of_id: None,
        posting_batch_id: None,
        created_by: None,
        lines,
        created_at: now,
    };

    if !entry.is_balanced() {
        warn!(
            reference_id = %reference_id,
            debit = %entry.debit_total(),
            credit = %entry.credit_total(),
            "Computed journal lines do not balance; skipping journal entry"
        );
        return Ok(None);
    }

    Ok(Some(entry))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_specs_are_dropped() {
        let specs = vec![
            debit("1000", Money::zero()),
            credit("4000", Money::zero()),
        ];
        assert!(specs
            .iter()
            .all(|s| s.debit.is_zero() && s.credit.is_zero()));
    }

    #[test]
    fn test_spec_constructors() {
        let d = debit("1000", Money::from_minor(500));
        assert_eq!(d.debit.minor(), 500);
        assert!(d.credit.is_zero());

        let c = credit("4000", Money::from_minor(500));
        assert!(c.debit.is_zero());
        assert_eq!(c.credit.minor(), 500);
    }
}
