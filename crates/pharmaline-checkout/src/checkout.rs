//! # Checkout Service
//!
//! Turns cart data plus a checkout form into a persisted order.
//!
//! ## Order Creation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate form ──► build request (non-empty) ──► verify totals          │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                              insert header (ORD-YYYYMMDD-XXXX)          │
//! │                              number taken? regenerate, try again        │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                                   insert items (one batch)              │
//! │                                     │               │                   │
//! │                                    ok             failed                │
//! │                                     │               │                   │
//! │                                     ▼               ▼                   │
//! │                              order + items    delete header             │
//! │                                               ItemsPersistence          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Supplied totals are never corrected. A mismatch is logged with both
//! values and the request is refused before anything is written.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use pharmaline_core::validation::validate_checkout_form;
use pharmaline_core::{
    build_order_request, verify_totals, CartSnapshot, CartStore, CheckoutForm, CoreError,
    CreateOrderRequest, NewOrder, Order, OrderNumber, OrderStore, OrderSummary,
};

use crate::config::DEFAULT_ORDER_NUMBER_ATTEMPTS;
use crate::error::{CheckoutError, CheckoutResult};
use crate::response::{ApiResponse, ORDER_PLACED_MESSAGE};
use crate::session::CartSession;

#[derive(Debug, Clone)]
pub struct CheckoutService<O: OrderStore> {
    orders: O,
    order_number_attempts: u32,
}

impl<O: OrderStore> CheckoutService<O> {
    pub fn new(orders: O) -> Self {
        CheckoutService {
            orders,
            order_number_attempts: DEFAULT_ORDER_NUMBER_ATTEMPTS,
        }
    }

    /// Order numbers to try before a collision becomes an error. At least 1.
    pub fn with_order_number_attempts(mut self, attempts: u32) -> Self {
        self.order_number_attempts = attempts.max(1);
        self
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates an order from a form and cart data captured by the client.
    pub async fn create_order(
        &self,
        user_id: Option<&str>,
        form: CheckoutForm,
        cart: CartSnapshot,
    ) -> CheckoutResult<Order> {
        validate_checkout_form(&form)?;
        let request = CreateOrderRequest::new(form, cart)?;
        self.create_from_request(user_id, &request).await
    }

    /// [`create_order`](Self::create_order) shaped for the storefront.
    pub async fn submit(
        &self,
        user_id: Option<&str>,
        form: CheckoutForm,
        cart: CartSnapshot,
    ) -> ApiResponse<Order> {
        match self.create_order(user_id, form, cart).await {
            Ok(order) => ApiResponse::ok_with_message(order, ORDER_PLACED_MESSAGE),
            Err(e) => ApiResponse::err(e),
        }
    }

    /// Checks out the session's cart and empties it on success.
    ///
    /// The order stands even if the emptied cart cannot be saved.
    pub async fn place_order<S: CartStore>(
        &self,
        session: &mut CartSession<S>,
        user_id: Option<&str>,
        form: CheckoutForm,
    ) -> CheckoutResult<Order> {
        validate_checkout_form(&form)?;
        let request = build_order_request(session.cart(), form)?;
        let order = self.create_from_request(user_id, &request).await?;

        if let Err(e) = session.clear().await {
            warn!(order_number = %order.order_number, error = %e, "Order placed but cart was not cleared");
        }

        Ok(order)
    }

    async fn create_from_request(
        &self,
        user_id: Option<&str>,
        request: &CreateOrderRequest,
    ) -> CheckoutResult<Order> {
        let totals = verify_totals(&request.cart).map_err(|e| {
            if let CoreError::TotalsMismatch {
                field,
                expected,
                supplied,
            } = &e
            {
                error!(
                    field = %field,
                    expected = %expected,
                    supplied = %supplied,
                    "Order totals mismatch"
                );
            }
            e
        })?;

        let new_order = NewOrder::from_request(
            request,
            totals,
            OrderNumber::generate(Utc::now().date_naive()),
            user_id.map(str::to_string),
        );
        let header = self.insert_header(new_order).await?;

        match self
            .orders
            .insert_order_items(&header.id, &request.cart.items)
            .await
        {
            Ok(items) => {
                info!(
                    order_id = %header.id,
                    order_number = %header.order_number,
                    total = %header.total,
                    items = items.len(),
                    "Order created"
                );
                Ok(Order { items, ..header })
            }
            Err(source) => {
                error!(order_id = %header.id, error = %source, "Failed to create order items");
                let rolled_back = match self.orders.delete_order_header(&header.id).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(order_id = %header.id, error = %e, "Failed to roll back order header");
                        false
                    }
                };
                Err(CheckoutError::ItemsPersistence {
                    order_id: header.id,
                    source,
                    rolled_back,
                })
            }
        }
    }

    async fn insert_header(&self, mut new_order: NewOrder) -> CheckoutResult<Order> {
        let mut attempt = 1;
        loop {
            match self.orders.insert_order_header(&new_order).await {
                Ok(order) => return Ok(order),
                Err(e) if e.is_duplicate_of("order_number") && attempt < self.order_number_attempts => {
                    warn!(
                        order_number = %new_order.order_number,
                        attempt,
                        "Order number taken, generating another"
                    );
                    attempt += 1;
                    new_order =
                        new_order.with_order_number(OrderNumber::generate(Utc::now().date_naive()));
                }
                Err(e) => {
                    error!(order_number = %new_order.order_number, error = %e, "Failed to create order");
                    return Err(CheckoutError::OrderPersistence(e));
                }
            }
        }
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// With `user_id`, another user's order reads as not found.
    pub async fn order_by_id(&self, order_id: &str, user_id: Option<&str>) -> CheckoutResult<Order> {
        debug!(order_id = %order_id, "order_by_id");
        self.orders
            .find_order(order_id, user_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))
    }

    pub async fn order_by_number(&self, order_number: &str) -> CheckoutResult<Order> {
        debug!(order_number = %order_number, "order_by_number");
        let number = OrderNumber::parse(order_number.trim())?;
        self.orders
            .find_order_by_number(number.as_str())
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_number))
    }

    /// Newest first.
    pub async fn orders_for_user(&self, user_id: &str) -> CheckoutResult<Vec<Order>> {
        Ok(self.orders.list_orders_for_user(user_id).await?)
    }

    pub async fn order_history(&self, user_id: &str) -> CheckoutResult<Vec<OrderSummary>> {
        let orders = self.orders_for_user(user_id).await?;
        Ok(orders.iter().map(Order::summary).collect())
    }
}
