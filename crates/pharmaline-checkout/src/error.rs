//! # Checkout Errors
//!
//! [`CheckoutError`] is what session and checkout operations return.
//! [`ApiError`] is what the storefront receives: a machine-readable code and
//! a message safe to show a customer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError ───────────────┐                                       │
//! │  CoreError (TotalsMismatch) ────┤                                       │
//! │  StoreError (header / items) ───┼──► CheckoutError ──► ApiError         │
//! │  serde_json (cart encoding) ────┘                      { code, message }│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Details of totals mismatches and store failures are logged where they
//! happen; customers only see the generic messages below.

use serde::Serialize;
use thiserror::Error;

use pharmaline_core::{CoreError, StoreError, ValidationError};

pub const EMPTY_CART_MESSAGE: &str = "Cart is empty. Please add items before checking out.";
pub const ORDER_FAILED_MESSAGE: &str = "Failed to create order. Please try again.";
pub const ORDER_ITEMS_FAILED_MESSAGE: &str = "Failed to create order items. Please try again.";

// =============================================================================
// Checkout Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// The order header could not be written. Nothing was persisted.
    #[error("Failed to create order: {0}")]
    OrderPersistence(#[source] StoreError),

    /// The header was written but its lines were not. `rolled_back` tells
    /// whether the header was deleted again.
    #[error("Failed to create items for order {order_id}: {source}")]
    ItemsPersistence {
        order_id: String,
        #[source]
        source: StoreError,
        rolled_back: bool,
    },

    #[error("Failed to save cart: {0}")]
    CartPersistence(#[source] StoreError),

    #[error("Failed to encode cart: {0}")]
    CartEncoding(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CheckoutError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// API Error
// =============================================================================

/// Error body returned to the storefront.
///
/// ```json
/// { "code": "VALIDATION_ERROR", "message": "Cart is empty. Please add items before checking out." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Order could not be created (500)
    OrderFailed,

    /// Store read failed (500)
    DatabaseError,

    /// Cart could not be saved
    CartError,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyCart => ApiError::validation(EMPTY_CART_MESSAGE),
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::TotalsMismatch { .. } => {
                ApiError::new(ErrorCode::OrderFailed, ORDER_FAILED_MESSAGE)
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(e) => ApiError::from(e),
            CheckoutError::Core(e) => ApiError::from(e),
            CheckoutError::OrderPersistence(_) => {
                ApiError::new(ErrorCode::OrderFailed, ORDER_FAILED_MESSAGE)
            }
            CheckoutError::ItemsPersistence { .. } => {
                ApiError::new(ErrorCode::OrderFailed, ORDER_ITEMS_FAILED_MESSAGE)
            }
            CheckoutError::CartPersistence(e) => {
                tracing::error!("Cart persistence failed: {}", e);
                ApiError::new(ErrorCode::CartError, "Failed to save cart")
            }
            CheckoutError::CartEncoding(e) => {
                tracing::error!("Cart encoding failed: {}", e);
                ApiError::new(ErrorCode::CartError, "Failed to save cart")
            }
            CheckoutError::NotFound { entity, id } => ApiError::not_found(entity, &id),
            CheckoutError::Store(StoreError::NotFound { entity, id }) => {
                ApiError::not_found(entity, &id)
            }
            CheckoutError::Store(e) => {
                tracing::error!("Store operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmaline_core::Money;

    #[test]
    fn test_empty_cart_message() {
        let api: ApiError = CheckoutError::from(ValidationError::EmptyCart).into();
        assert_eq!(api.code, ErrorCode::ValidationError);
        assert_eq!(api.message, EMPTY_CART_MESSAGE);
    }

    #[test]
    fn test_totals_mismatch_is_generic() {
        let err = CheckoutError::from(CoreError::TotalsMismatch {
            field: "subtotal",
            expected: Money::from_centavos(50_000),
            supplied: Money::from_centavos(45_000),
        });
        let api = ApiError::from(err);
        assert_eq!(api.code, ErrorCode::OrderFailed);
        assert_eq!(api.message, ORDER_FAILED_MESSAGE);
        assert!(!api.message.contains("450"));
    }

    #[test]
    fn test_items_failure_message() {
        let api = ApiError::from(CheckoutError::ItemsPersistence {
            order_id: "o-1".into(),
            source: StoreError::Failed("disk full".into()),
            rolled_back: true,
        });
        assert_eq!(api.code, ErrorCode::OrderFailed);
        assert_eq!(api.message, ORDER_ITEMS_FAILED_MESSAGE);
    }

    #[test]
    fn test_serialized_shape() {
        let api = ApiError::not_found("Order", "o-9");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Order not found: o-9");
        assert_eq!(api.to_string(), "[NotFound] Order not found: o-9");
    }

    #[test]
    fn test_store_errors_hide_details() {
        let api = ApiError::from(CheckoutError::Store(StoreError::Failed(
            "no such table: orders".into(),
        )));
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert!(!api.message.contains("orders"));
    }
}
