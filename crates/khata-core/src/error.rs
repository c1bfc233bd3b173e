//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError ∪ DbError, what callers see          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include the relevant numbers in error messages (available vs.
//!    requested, already-returned vs. sale quantity)
//! 3. Errors are enum variants, never String
//! 4. Validation rejects; it never clamps or coerces input

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// All preconditions are checked before any mutation; a failed precondition
/// leaves stock and ledger rows untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Return cannot be found.
    #[error("Return not found: {0}")]
    ReturnNotFound(String),

    /// Insufficient stock to complete a sale of a stock-tracked product.
    ///
    /// ## When This Occurs
    /// - Selling more than available stock of an imported product
    /// - Increasing a sale's quantity beyond what remains in stock
    ///
    /// Manually-added products never raise this; their stock may go
    /// negative.
    #[error("Insufficient stock for {product}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A credit sale was submitted without a customer.
    #[error("A credit sale requires a customer")]
    CustomerRequired,

    /// A return exceeds the quantity still returnable on the sale.
    ///
    /// The message states how much was already returned and the sale's
    /// total quantity, so the caller can show the shopkeeper exactly what
    /// remains.
    #[error("Cannot return {requested} of sale {sale_id}: {already_returned} of {sale_quantity} already returned")]
    OverReturn {
        sale_id: String,
        already_returned: i64,
        sale_quantity: i64,
        requested: i64,
    },

    /// A credit sale with payments already allocated against it cannot be
    /// deleted; the realized profit would lose its originating sale.
    #[error("Sale {sale_id} has {paid_cents} cents allocated from payments and cannot be deleted")]
    SaleSettled { sale_id: String, paid_cents: i64 },

    /// A sale with recorded returns cannot be deleted; deleting it would
    /// restore stock the returns already restored. Delete the returns first.
    #[error("Sale {sale_id} has {returned} returned units; delete its returns first")]
    SaleHasReturns { sale_id: String, returned: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input doesn't meet requirements. Used for early
/// validation before ledger logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_carries_numbers() {
        let err = CoreError::InsufficientStock {
            product: "Sugar 1kg".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Sugar 1kg. Available: 3, Requested: 5"
        );
    }

    #[test]
    fn test_over_return_message_states_history() {
        let err = CoreError::OverReturn {
            sale_id: "s-42".to_string(),
            already_returned: 6,
            sale_quantity: 10,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("6 of 10 already returned"));
        assert!(msg.contains("Cannot return 5"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
