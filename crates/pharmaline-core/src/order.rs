//! # Order Creation
//!
//! Turns a cart into an order-creation request and checks the request's
//! totals before anything is written.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart ──► CartSnapshot::from_cart ──► CreateOrderRequest::new           │
//! │            (plain copies of lines       (empty ⇒ EmptyCart)            │
//! │             and cart totals)                   │                        │
//! │                                                ▼                        │
//! │                                         verify_totals                   │
//! │                                  Σ line.total_price == subtotal ?      │
//! │                  subtotal + tax + delivery − discount == total ?       │
//! │                                                │                        │
//! │                                                ▼                        │
//! │           NewOrder::from_request (+ OrderNumber::generate)             │
//! │                                                │                        │
//! │                                                ▼                        │
//! │                              OrderStore: header, then items            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::{Cart, CartLineItem};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CheckoutForm, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::validation::ValidationResult;

// =============================================================================
// Snapshots
// =============================================================================

/// A cart line copied into plain values for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItemSnapshot {
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_generic_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_amount: Money,
    pub total_price: Money,
    pub requires_prescription: bool,
}

impl From<&CartLineItem> for OrderItemSnapshot {
    fn from(line: &CartLineItem) -> Self {
        OrderItemSnapshot {
            product_id: line.product_id.clone(),
            product_name: line.product.name.clone(),
            product_sku: line.product.sku.clone(),
            product_generic_name: line.product.generic_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_amount: line.discount_amount,
            total_price: line.total_price,
            requires_prescription: line.product.requires_prescription,
        }
    }
}

/// The cart-derived half of a checkout submission.
///
/// Field names match the JSON the storefront posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSnapshot {
    pub items: Vec<OrderItemSnapshot>,
    pub subtotal: Money,
    #[serde(default)]
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub has_prescription_items: bool,
}

impl CartSnapshot {
    pub fn from_cart(cart: &Cart) -> Self {
        let totals = cart.totals();
        CartSnapshot {
            items: cart.items().iter().map(OrderItemSnapshot::from).collect(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            has_prescription_items: totals.has_prescription_items,
        }
    }

    /// Rejects negative amounts on the lines or the totals.
    pub fn check_amounts(&self) -> ValidationResult<()> {
        let negative = |field: &str| ValidationError::NegativeAmount {
            field: field.to_string(),
        };

        for item in &self.items {
            if item.unit_price.is_negative() {
                return Err(negative("items.unit_price"));
            }
            if item.discount_amount.is_negative() {
                return Err(negative("items.discount_amount"));
            }
            if item.total_price.is_negative() {
                return Err(negative("items.total_price"));
            }
        }

        let totals = [
            ("subtotal", self.subtotal),
            ("discount_amount", self.discount_amount),
            ("tax_amount", self.tax_amount),
            ("delivery_fee", self.delivery_fee),
            ("total", self.total),
        ];
        match totals.iter().find(|(_, amount)| amount.is_negative()) {
            Some(&(field, _)) => Err(negative(field)),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// Everything needed to create one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub form: CheckoutForm,
    pub cart: CartSnapshot,
}

impl CreateOrderRequest {
    /// Pairs form data with cart data.
    ///
    /// Fails with [`ValidationError::EmptyCart`] when there are no lines,
    /// with `MustBePositive` for a line with a non-positive quantity and with
    /// `NegativeAmount` for any negative price or total.
    pub fn new(form: CheckoutForm, cart: CartSnapshot) -> ValidationResult<Self> {
        if cart.items.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        if cart.items.iter().any(|i| i.quantity <= 0) {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        cart.check_amounts()?;
        Ok(CreateOrderRequest { form, cart })
    }
}

/// Snapshots `cart` and pairs it with `form`.
///
/// The request owns its copies; later cart changes do not reach it.
pub fn build_order_request(cart: &Cart, form: CheckoutForm) -> ValidationResult<CreateOrderRequest> {
    CreateOrderRequest::new(form, CartSnapshot::from_cart(cart))
}

// =============================================================================
// Totals Validator
// =============================================================================

/// Totals that passed [`verify_totals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

/// Re-derives the subtotal from the lines and the total from its parts.
///
/// Any difference, even one centavo, is a [`CoreError::TotalsMismatch`].
/// A non-zero cart discount is rejected the same way, since the storefront
/// has no coupons. Negative amounts and sums that overflow are validation
/// errors.
pub fn verify_totals(cart: &CartSnapshot) -> CoreResult<VerifiedTotals> {
    cart.check_amounts()?;

    let expected_subtotal = Money::checked_sum(cart.items.iter().map(|i| i.total_price))
        .ok_or_else(|| ValidationError::too_large("subtotal"))?;
    if expected_subtotal != cart.subtotal {
        return Err(CoreError::TotalsMismatch {
            field: "subtotal",
            expected: expected_subtotal,
            supplied: cart.subtotal,
        });
    }

    if !cart.discount_amount.is_zero() {
        return Err(CoreError::TotalsMismatch {
            field: "discount_amount",
            expected: Money::zero(),
            supplied: cart.discount_amount,
        });
    }

    let expected_total = expected_subtotal
        .checked_add(cart.tax_amount)
        .and_then(|t| t.checked_add(cart.delivery_fee))
        .and_then(|t| t.checked_sub(cart.discount_amount))
        .ok_or_else(|| ValidationError::too_large("total"))?;
    if expected_total != cart.total {
        return Err(CoreError::TotalsMismatch {
            field: "total",
            expected: expected_total,
            supplied: cart.total,
        });
    }

    Ok(VerifiedTotals {
        subtotal: expected_subtotal,
        discount_amount: cart.discount_amount,
        tax_amount: cart.tax_amount,
        delivery_fee: cart.delivery_fee,
        total: expected_total,
    })
}

// =============================================================================
// Order Number
// =============================================================================

const ORDER_NUMBER_PREFIX: &str = "ORD";
const SUFFIX_LEN: usize = 4;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `ORD-YYYYMMDD-XXXX`, where `XXXX` is four uppercase base-36 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// New number for `date` with a random suffix.
    pub fn generate(date: NaiveDate) -> Self {
        Self::from_entropy(date, Uuid::new_v4().as_u128())
    }

    /// Builds the number from the low base-36 digits of `entropy`.
    pub fn from_entropy(date: NaiveDate, entropy: u128) -> Self {
        let mut suffix = [b'0'; SUFFIX_LEN];
        let mut rest = entropy;
        for slot in suffix.iter_mut().rev() {
            *slot = BASE36[(rest % 36) as usize];
            rest /= 36;
        }
        let suffix: String = suffix.iter().map(|b| *b as char).collect();

        OrderNumber(format!(
            "{}-{}-{}",
            ORDER_NUMBER_PREFIX,
            date.format("%Y%m%d"),
            suffix
        ))
    }

    /// Accepts only well-formed order numbers.
    pub fn parse(value: &str) -> ValidationResult<Self> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "order_number".to_string(),
            reason: reason.to_string(),
        };

        let mut parts = value.split('-');
        let (Some(prefix), Some(date), Some(suffix), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected ORD-YYYYMMDD-XXXX"));
        };

        if prefix != ORDER_NUMBER_PREFIX {
            return Err(invalid("must start with ORD"));
        }
        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(invalid("date must be YYYYMMDD"));
        }
        if suffix.len() != SUFFIX_LEN || !suffix.bytes().all(|b| BASE36.contains(&b)) {
            return Err(invalid("suffix must be 4 characters of 0-9 or A-Z"));
        }

        Ok(OrderNumber(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// New Order
// =============================================================================

/// A verified order header ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: ShippingAddress,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub has_prescription_items: bool,
    pub requires_prescription_verification: bool,
    pub notes: Option<String>,
}

impl NewOrder {
    /// Every order starts `pending` and `unpaid`. Prescription orders are
    /// flagged for pharmacist verification.
    pub fn from_request(
        request: &CreateOrderRequest,
        totals: VerifiedTotals,
        order_number: OrderNumber,
        user_id: Option<String>,
    ) -> Self {
        let form = &request.form;
        let has_rx = request.cart.has_prescription_items
            || request.cart.items.iter().any(|i| i.requires_prescription);

        NewOrder {
            order_number,
            user_id,
            customer_name: form.customer_name.trim().to_string(),
            customer_email: form.customer_email.trim().to_string(),
            customer_phone: form.customer_phone.trim().to_string(),
            shipping_address: form.shipping_address.clone(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            status: OrderStatus::Pending,
            payment_method: form.payment_method,
            payment_status: PaymentStatus::Unpaid,
            has_prescription_items: has_rx,
            requires_prescription_verification: has_rx,
            notes: form
                .notes
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }

    /// Fresh number for a retry after a collision.
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = order_number;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
