//! # Error Types
//!
//! Domain-specific error types for dukkan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukkan-core errors (this file)                                        │
//! │  ├── CoreError        - Closed taxonomy thrown by the engines          │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → (host transport error) → caller   │
//! │                                                                         │
//! │  The ambient transaction scope around a commit phase treats ANY        │
//! │  CoreError as "roll back everything written so far in this call".      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, id, quantities)
//! 3. Errors are enum variants, never String
//! 4. The set is closed: transports map these to their own codes

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// The closed error taxonomy thrown by engines and repository ports.
///
/// Engines throw these synchronously from the commit phase. Side-effects
/// phases never surface them to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or policy-violating input (empty items, zero quantity
    /// change, credit sale without a customer).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity (product, batch, sale, purchase, journal entry)
    /// does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requested deduction exceeds available quantity at the product or
    /// batch level.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell quantity=10 (base units)
    ///      │
    ///      ▼
    /// Check cached stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { available: 5, requested: 10 }
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        /// Set when the shortage is at a specific batch rather than the
        /// product's cached stock.
        batch_id: Option<String>,
        available: i64,
        requested: i64,
    },

    /// Operation not legal for the entity's current state (paying a
    /// cancelled sale, reversing an unposted or already-reversed entry,
    /// amending a locked posting batch).
    #[error("{entity} {id} is {state}, cannot {operation}")]
    InvalidState {
        entity: &'static str,
        id: String,
        state: String,
        operation: &'static str,
    },

    /// Idempotency-key race that could not be resolved by lookup. The
    /// backing store's uniqueness constraint is the final tie-breaker;
    /// this surfaces only when the losing writer cannot observe the
    /// committed row either.
    #[error("Conflict on idempotency key: {key}")]
    Conflict { key: String },

    /// A repository port failed for storage-level reasons. Real backends
    /// map their driver errors here; the in-memory store uses it for the
    /// simulated failure modes in tests.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        state: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        CoreError::InvalidState {
            entity,
            id: id.into(),
            state: state.into(),
            operation,
        }
    }

    /// Creates a product-level InsufficientStock error.
    pub fn insufficient_stock(
        product_id: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            product_id: product_id.into(),
            batch_id: None,
            available,
            requested,
        }
    }

    /// Creates a batch-level InsufficientStock error.
    pub fn insufficient_batch_stock(
        product_id: impl Into<String>,
        batch_id: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            product_id: product_id.into(),
            batch_id: Some(batch_id.into()),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a command DTO doesn't meet requirements. Used for
/// early validation before any repository port is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection field must contain at least one element.
    #[error("{field} must not be empty")]
    Empty { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format or combination (bad UUID, both/neither of an
    /// either-or pair).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A reference points at an entity that belongs to someone else
    /// (batch supplied for a different product).
    #[error("{field} does not belong to {owner}")]
    WrongOwner { field: String, owner: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::insufficient_stock("prod-1", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product prod-1: available 3, requested 5"
        );

        let err = CoreError::not_found("Sale", "sale-1");
        assert_eq!(err.to_string(), "Sale not found: sale-1");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = CoreError::invalid_state("Sale", "sale-1", "cancelled", "add payment");
        assert_eq!(err.to_string(), "Sale sale-1 is cancelled, cannot add payment");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Empty {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items must not be empty");

        let err = ValidationError::MustBeNonZero {
            field: "quantity_change".to_string(),
        };
        assert_eq!(err.to_string(), "quantity_change must not be zero");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
