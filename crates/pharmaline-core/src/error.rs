//! # Error Types
//!
//! Domain errors for pharmaline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pharmaline-core (this file)                                            │
//! │  ├── CoreError        - totals mismatch, missing product               │
//! │  └── ValidationError  - bad input, empty cart, stock limits            │
//! │                                                                         │
//! │  pharmaline-core::store                                                 │
//! │  └── StoreError       - what an order/cart store reports               │
//! │                                                                         │
//! │  pharmaline-db                                                          │
//! │  └── DbError          - sqlx failures (→ StoreError)                   │
//! │                                                                         │
//! │  pharmaline-checkout                                                    │
//! │  └── CheckoutError → ApiError   - what the storefront sees             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A total supplied with an order does not match the total re-derived
    /// from its line items.
    ///
    /// ```text
    /// items: ₱500.00           supplied subtotal: ₱450.00
    ///      │                            │
    ///      └──────── verify_totals ─────┘
    ///                     │
    ///                     ▼
    /// TotalsMismatch { field: "subtotal", expected: ₱500.00, supplied: ₱450.00 }
    /// ```
    #[error("Order {field} mismatch: expected {expected}, supplied {supplied}")]
    TotalsMismatch {
        field: &'static str,
        expected: Money,
        supplied: Money,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input that is rejected before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    NegativeAmount { field: String },

    /// An amount or quantity too large to compute with.
    #[error("{field} is too large")]
    TooLarge { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{sku} is out of stock")]
    OutOfStock { sku: String },

    /// Requested quantity pushes the line past stock or the per-order cap.
    #[error("Only {available} more of {sku} can be added, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("{sku} is no longer available")]
    ProductUnavailable { sku: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn too_large(field: &str) -> Self {
        ValidationError::TooLarge {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = CoreError::TotalsMismatch {
            field: "subtotal",
            expected: Money::from_centavos(50_000),
            supplied: Money::from_centavos(45_000),
        };
        assert_eq!(
            err.to_string(),
            "Order subtotal mismatch: expected ₱500.00, supplied ₱450.00"
        );
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::required("customer_email").to_string(),
            "customer_email is required"
        );
        let err = ValidationError::InsufficientStock {
            sku: "AMOX-500".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Only 2 more of AMOX-500 can be added, requested 5"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(
            core_err,
            CoreError::Validation(ValidationError::EmptyCart)
        ));
    }
}
