//! # Store Ports
//!
//! The persistence seams checkout depends on. pharmaline-db implements them
//! on SQLite; tests swap in doubles that fail on demand.
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────────┐
//! │  pharmaline-checkout │        │  pharmaline-db                   │
//! │                      │        │                                  │
//! │  CheckoutService ────┼──────► │  OrderRepository  : OrderStore   │
//! │  CartSession ────────┼──────► │  CartKvRepository : CartStore    │
//! └──────────────────────┘        └──────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::order::{NewOrder, OrderItemSnapshot};
use crate::types::Order;
use crate::types::OrderItem;

// =============================================================================
// Store Error
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique value is already taken (e.g. an order number).
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: String, value: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation failed: {0}")]
    Failed(String),
}

impl StoreError {
    pub fn is_duplicate_of(&self, wanted: &str) -> bool {
        matches!(self, StoreError::Duplicate { field, .. } if field == wanted)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Order Store
// =============================================================================

/// Durable order storage.
///
/// Header and items are separate writes; the caller deletes the header if
/// the items write fails.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Writes the header and returns it with its generated id and timestamps.
    async fn insert_order_header(&self, order: &NewOrder) -> StoreResult<Order>;

    /// Writes all lines for `order_id` in one batch, or none of them.
    async fn insert_order_items(
        &self,
        order_id: &str,
        items: &[OrderItemSnapshot],
    ) -> StoreResult<Vec<OrderItem>>;

    /// Removes a header (and any lines) written by a failed checkout.
    async fn delete_order_header(&self, order_id: &str) -> StoreResult<()>;

    /// Loads an order with its lines. With `user_id`, only that user's order
    /// matches.
    async fn find_order(&self, order_id: &str, user_id: Option<&str>) -> StoreResult<Option<Order>>;

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>>;

    /// A user's orders with their lines, newest first.
    async fn list_orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>>;
}

// =============================================================================
// Cart Store
// =============================================================================

/// Client-local key/value storage for the serialized cart.
#[allow(async_fn_in_trait)]
pub trait CartStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_field_match() {
        let err = StoreError::Duplicate {
            field: "order_number".to_string(),
            value: "ORD-20250101-A1B2".to_string(),
        };
        assert!(err.is_duplicate_of("order_number"));
        assert!(!err.is_duplicate_of("id"));
        assert!(!StoreError::Failed("x".into()).is_duplicate_of("order_number"));
    }
}
