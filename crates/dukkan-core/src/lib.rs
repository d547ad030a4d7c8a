//! # dukkan-core: Pure Business Logic for the Dukkan POS Transaction Core
//!
//! This crate is the **heart** of the transaction core. It contains all
//! business math and domain types as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Dukkan POS Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Host Application (IPC transport, UI)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ command DTOs                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    dukkan-engine                                │   │
//! │  │    SaleEngine, PurchaseEngine, PaymentEngine,                   │   │
//! │  │    StockAdjustmentEngine, PostingEngine + repository ports      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukkan-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ validation│  │   │
//! │  │   │  Sale     │  │   Money   │  │ Document  │  │   rules   │  │   │
//! │  │   │  Journal  │  │  Currency │  │  Totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, JournalEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`totals`] - Pure document-total and interest math
//! - [`commands`] - Command DTOs the engines consume
//! - [`error`] - The closed domain error taxonomy
//! - [`validation`] - Explicit command validation functions
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are i64 minor units; rates are bps
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commands;
pub mod error;
pub mod money;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use dukkan_core::Money` instead of
// `use dukkan_core::money::Money`

pub use commands::*;
pub use error::{CoreError, CoreResult, ValidationError, ValidationResult};
pub use money::{CurrencyProfile, Money};
pub use totals::{DocumentTotals, LineAmounts};
pub use types::*;

// =============================================================================
// Chart-of-Accounts Codes
// =============================================================================

/// Chart-of-accounts codes the engines resolve at commit time.
///
/// ## Why codes, not ids?
/// The chart is seeded externally and its row ids differ per installation.
/// Codes are the stable business identifiers, so every call site looks
/// accounts up by code and never by id. A missing code downgrades the
/// journal write to a logged skip — accounting is a best-effort projection
/// of a valid transaction, not a precondition for it.
pub mod coa {
    /// Asset: cash on hand / till.
    pub const CASH: &str = "1000";
    /// Asset: accounts receivable.
    pub const ACCOUNTS_RECEIVABLE: &str = "1100";
    /// Asset: inventory at cost.
    pub const INVENTORY: &str = "1200";
    /// Asset: recoverable VAT paid on purchases.
    pub const VAT_INPUT: &str = "1400";
    /// Liability: accounts payable.
    pub const ACCOUNTS_PAYABLE: &str = "2000";
    /// Revenue: sales revenue.
    pub const SALES_REVENUE: &str = "4000";
    /// Expense: cost of goods sold.
    pub const COGS: &str = "5000";
}

// =============================================================================
// Settings Keys
// =============================================================================

/// Feature-toggle keys read through the settings port. Absent keys mean
/// "enabled".
pub mod settings_keys {
    /// Gates journal-entry creation in every engine.
    pub const ACCOUNTING_ENABLED: &str = "accounting.enabled";
    /// Gates customer/supplier ledger appends.
    pub const LEDGER_ENABLED: &str = "ledger.enabled";
}
