//! # dukkan-engine: Transaction Engines for the Dukkan POS Core
//!
//! Five engines turn command DTOs into consistent persisted facts through
//! narrow repository ports.
//!
//! ## Two-Phase Execution Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  caller opens ambient transaction scope                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.commit(&input)          SYNCHRONOUS                             │
//! │       │   every repository write happens here; any CoreError           │
//! │       │   rolls the whole scope back                                    │
//! │       ▼                                                                 │
//! │  scope closes ── receipt returned to the caller                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.side_effects(&receipt).await    ASYNC, BEST-EFFORT              │
//! │       │   audit logging; failures are warn!-logged, never surfaced     │
//! │       ▼                                                                 │
//! │  done                                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Engines
//! - [`SaleEngine`] — invoices, stock depletion, up-front payment
//! - [`PurchaseEngine`] — goods receipt, one new batch per line
//! - [`PaymentEngine`] — AR/AP settlement with the clamp rule
//! - [`StockAdjustmentEngine`] — manual corrections, cache re-sync
//! - [`PostingEngine`] — period close, reversal, void, batch locks
//!
//! ## Ports
//! Engines hold `Arc<dyn Port>` references and nothing else. The host
//! application provides the real store; [`MemoryStore`] implements every
//! port for tests and as reference semantics.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod memory;
pub mod payment;
pub mod ports;
pub mod posting;
pub mod purchase;
pub mod sale;
pub mod stock;

mod journal;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{AuditEvent, AuditLog};
pub use memory::MemoryStore;
pub use payment::{PaymentEngine, PaymentReceipt};
pub use ports::{
    feature_enabled, AccountingRepository, CustomerLedgerRepository, InventoryRepository,
    PaymentRepository, PostingRepository, ProductRepository, PurchaseRepository, SaleRepository,
    SettingsRepository, SupplierLedgerRepository,
};
pub use posting::{PostingEngine, PostingReceipt};
pub use purchase::{PurchaseEngine, PurchaseReceipt};
pub use sale::{SaleEngine, SaleReceipt};
pub use stock::{select_covering_batch, AdjustmentReceipt, StockAdjustmentEngine};
