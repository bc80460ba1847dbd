//! # Cart
//!
//! The shopping cart aggregate and its derived totals.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront action       Cart method              Effect                │
//! │  ─────────────────       ───────────              ──────                │
//! │  Add to cart ──────────► add_item(p, n) ────────► new line, or qty += n │
//! │                                                   and re-price at the   │
//! │                                                   product's CURRENT     │
//! │                                                   discount              │
//! │  Quantity stepper ─────► update_quantity(id, n) ─► n ≤ 0 removes        │
//! │  Trash icon ───────────► remove_item(id) ────────► idempotent           │
//! │  Order placed ─────────► clear() ────────────────► back to empty        │
//! │                                                                         │
//! │  After EVERY mutation: totals rebuilt from scratch                     │
//! │    subtotal  = Σ line.total_price                                      │
//! │    tax       = round_half_up(subtotal × 12%)                           │
//! │    delivery  = ₱0 if subtotal ≥ ₱1000, else ₱50 (₱0 when empty)        │
//! │    total     = subtotal + tax + delivery                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A mutation that would overflow a figure fails and leaves the cart as it
//! was. The cart does not check stock. Callers run
//! [`validate_add_quantity`](crate::validation::validate_add_quantity) first,
//! using [`Cart::item_quantity`] and [`Cart::available_to_add`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::{calculate_price_info, PriceInfo};
use crate::types::{Product, TaxRate};
use crate::validation::ValidationResult;
use crate::{CART_ID, DELIVERY_FEE, FREE_DELIVERY_THRESHOLD};

// =============================================================================
// Line Item
// =============================================================================

/// One product in the cart, with a copy of the product as it was last added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineItem {
    /// `cart-item-<unix millis>-<product id>`
    pub id: String,
    pub product_id: String,
    pub product: Product,
    pub quantity: i64,
    /// Discounted price of one unit.
    pub unit_price: Money,
    /// Per-unit savings × quantity.
    pub discount_amount: Money,
    /// Discounted price × quantity.
    pub total_price: Money,
}

impl CartLineItem {
    /// Fails if the product price is negative or the line total overflows.
    pub fn new(product: &Product, quantity: i64) -> ValidationResult<Self> {
        let mut line = CartLineItem {
            id: format!(
                "cart-item-{}-{}",
                Utc::now().timestamp_millis(),
                product.id
            ),
            product_id: product.id.clone(),
            product: product.clone(),
            quantity,
            unit_price: Money::zero(),
            discount_amount: Money::zero(),
            total_price: Money::zero(),
        };
        line.reprice(quantity)?;
        Ok(line)
    }

    /// Sets the quantity and prices it from the captured product. Leaves the
    /// line untouched on error.
    fn reprice(&mut self, quantity: i64) -> ValidationResult<()> {
        let info = calculate_price_info(&self.product);
        if info.final_price.is_negative() {
            return Err(ValidationError::NegativeAmount {
                field: "price".to_string(),
            });
        }
        let total_price = info
            .final_price
            .checked_mul(quantity)
            .ok_or_else(|| ValidationError::too_large("quantity"))?;
        let discount_amount = info
            .savings
            .checked_mul(quantity)
            .ok_or_else(|| ValidationError::too_large("quantity"))?;

        self.quantity = quantity;
        self.unit_price = info.final_price;
        self.discount_amount = discount_amount;
        self.total_price = total_price;
        Ok(())
    }

    pub fn price_info(&self) -> PriceInfo {
        calculate_price_info(&self.product)
    }

    #[inline]
    pub fn requires_prescription(&self) -> bool {
        self.product.requires_prescription
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart-level figures, always derived from the line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub subtotal: Money,
    /// Cart-wide discount. No coupon support, so always zero.
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub total: Money,
    /// Units, not lines.
    pub item_count: i64,
    pub has_prescription_items: bool,
}

impl CartTotals {
    /// Fails with [`ValidationError::TooLarge`] when a figure overflows.
    pub fn from_items(items: &[CartLineItem]) -> ValidationResult<Self> {
        let subtotal = Money::checked_sum(items.iter().map(|i| i.total_price))
            .ok_or_else(|| ValidationError::too_large("subtotal"))?;
        let tax_amount = subtotal.calculate_tax(TaxRate::VAT);
        let delivery_fee = delivery_fee_for(subtotal, items.is_empty());
        let total = subtotal
            .checked_add(tax_amount)
            .and_then(|t| t.checked_add(delivery_fee))
            .ok_or_else(|| ValidationError::too_large("total"))?;
        let item_count = items
            .iter()
            .try_fold(0i64, |acc, i| acc.checked_add(i.quantity))
            .ok_or_else(|| ValidationError::too_large("item_count"))?;

        Ok(CartTotals {
            subtotal,
            discount_amount: Money::zero(),
            tax_amount,
            delivery_fee,
            total,
            item_count,
            has_prescription_items: items.iter().any(CartLineItem::requires_prescription),
        })
    }

    /// How much more to spend before delivery becomes free.
    pub fn remaining_for_free_delivery(&self) -> Money {
        FREE_DELIVERY_THRESHOLD.saturating_sub_zero(self.subtotal)
    }
}

/// Flat fee below the threshold, waived at or above it and for an empty cart.
pub fn delivery_fee_for(subtotal: Money, is_empty: bool) -> Money {
    if subtotal >= FREE_DELIVERY_THRESHOLD || is_empty {
        Money::zero()
    } else {
        DELIVERY_FEE
    }
}

/// Totals plus the free-delivery hint, for the order summary panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSummary {
    #[serde(flatten)]
    pub totals: CartTotals,
    pub remaining_for_free_delivery: Money,
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - At most one line per product id
/// - Every line has quantity > 0
/// - `totals` always equals `CartTotals::from_items(&items)`
/// - A mutation that fails leaves the cart unchanged
///
/// Serialized flat (`id`, `items`, `subtotal`, ... ) for the client-local
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    id: String,
    items: Vec<CartLineItem>,
    #[serde(flatten)]
    totals: CartTotals,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            id: CART_ID.to_string(),
            items: Vec::new(),
            totals: CartTotals::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Adds `quantity` units of `product`.
    ///
    /// An existing line keeps its id and position but takes the product's
    /// current price, discount and snapshot.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> ValidationResult<()> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }

        let mut items = self.items.clone();
        match items.iter_mut().find(|i| i.product_id == product.id) {
            Some(line) => {
                let new_quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| ValidationError::too_large("quantity"))?;
                line.product = product.clone();
                line.reprice(new_quantity)?;
            }
            None => items.push(CartLineItem::new(product, quantity)?),
        }

        self.replace_items(items)
    }

    /// Sets a line's quantity, pricing it from the line's captured product.
    ///
    /// `quantity <= 0` removes the line. Unknown product ids are ignored.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> ValidationResult<()> {
        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        let Some(index) = self.items.iter().position(|i| i.product_id == product_id) else {
            return Ok(());
        };
        let mut items = self.items.clone();
        items[index].reprice(quantity)?;
        self.replace_items(items)
    }

    /// Drops the line for `product_id`. Returns whether one existed.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let items: Vec<CartLineItem> = self
            .items
            .iter()
            .filter(|i| i.product_id != product_id)
            .cloned()
            .collect();
        if items.len() == self.items.len() {
            return false;
        }
        // line totals are never negative, so fewer lines cannot overflow
        self.replace_items(items).is_ok()
    }

    pub fn clear(&mut self) {
        *self = Cart::new();
    }

    /// Units of `product_id` in the cart, 0 if absent.
    pub fn item_quantity(&self, product_id: &str) -> i64 {
        self.line(product_id).map_or(0, |l| l.quantity)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.line(product_id).is_some()
    }

    /// Units of `product` that can still be added:
    /// `min(stock − in_cart, max_order_quantity or stock)`, never below zero.
    pub fn available_to_add(&self, product: &Product) -> i64 {
        let stock = product.stock_quantity.max(0);
        let remaining_stock = stock - self.item_quantity(&product.id);
        let cap = product.max_order_quantity.unwrap_or(stock);
        remaining_stock.min(cap).max(0)
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            totals: self.totals,
            remaining_for_free_delivery: self.totals.remaining_for_free_delivery(),
        }
    }

    /// Rebuilds a cart from its persisted JSON.
    ///
    /// Stored totals are not trusted: lines are re-priced from their product
    /// snapshots and totals recomputed. Lines with a non-positive quantity are
    /// dropped. Two lines for one product, or figures that do not fit, make
    /// the stored value invalid.
    pub fn restore(json: &str) -> serde_json::Result<Cart> {
        use serde::de::Error as _;

        let stored: Cart = serde_json::from_str(json)?;
        let mut items: Vec<CartLineItem> = Vec::with_capacity(stored.items.len());
        for mut line in stored.items.into_iter().filter(|i| i.quantity > 0) {
            if items.iter().any(|l| l.product_id == line.product_id) {
                return Err(serde_json::Error::custom(format!(
                    "duplicate cart line for product {}",
                    line.product_id
                )));
            }
            let quantity = line.quantity;
            line.reprice(quantity).map_err(serde_json::Error::custom)?;
            items.push(line);
        }

        let mut cart = Cart::new();
        cart.replace_items(items).map_err(serde_json::Error::custom)?;
        Ok(cart)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    fn replace_items(&mut self, items: Vec<CartLineItem>) -> ValidationResult<()> {
        self.totals = CartTotals::from_items(&items)?;
        self.items = items;
        Ok(())
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn peso(p: i64) -> Money {
        Money::from_pesos(p, 0)
    }

    fn product(id: &str, price: Money) -> Product {
        Product::new(id, format!("SKU-{id}"), format!("Product {id}"), price).with_stock(100)
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new();
        assert_eq!(cart.id(), "cart-default");
        assert_eq!(*cart.totals(), CartTotals::default());
        assert!(cart.totals().delivery_fee.is_zero());
    }

    #[test]
    fn test_add_prices_line_with_discount() {
        let mut cart = Cart::new();
        let p = product("vitc", peso(500)).with_discount(15);
        cart.add_item(&p, 2).unwrap();

        let line = cart.line("vitc").unwrap();
        assert!(line.id.starts_with("cart-item-"));
        assert!(line.id.ends_with("-vitc"));
        assert_eq!(line.unit_price, peso(425));
        assert_eq!(line.discount_amount, peso(150));
        assert_eq!(line.total_price, peso(850));

        let totals = cart.totals();
        assert_eq!(totals.subtotal, peso(850));
        assert_eq!(totals.tax_amount, peso(102));
        assert_eq!(totals.delivery_fee, peso(50));
        assert_eq!(totals.total, peso(1002));
        assert_eq!(totals.item_count, 2);
        assert!(totals.discount_amount.is_zero());
    }

    #[test]
    fn test_rejects_non_positive_add() {
        let mut cart = Cart::new();
        let p = product("a", peso(10));
        assert!(cart.add_item(&p, 0).is_err());
        assert!(cart.add_item(&p, -3).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_free_delivery_threshold() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(1000)), 1).unwrap();
        assert!(cart.totals().delivery_fee.is_zero());
        assert_eq!(cart.totals().total, peso(1120));

        let mut cart = Cart::new();
        cart.add_item(&product("b", Money::from_centavos(99_999)), 1).unwrap();
        assert_eq!(cart.totals().delivery_fee, peso(50));
        assert_eq!(
            cart.summary().remaining_for_free_delivery,
            Money::from_centavos(1)
        );
    }

    #[test]
    fn test_totals_are_idempotent() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", Money::from_centavos(33_333)), 3).unwrap();
        cart.add_item(&product("b", Money::from_centavos(1_999)).with_discount(7), 2)
            .unwrap();

        let first = *cart.totals();
        let again = CartTotals::from_items(cart.items()).unwrap();
        assert_eq!(first, again);
        assert_eq!(again, CartTotals::from_items(cart.items()).unwrap());
    }

    #[test]
    fn test_add_then_remove_restores_empty_state() {
        let mut cart = Cart::new();
        let rx = product("amox", peso(120)).requiring_prescription();
        cart.add_item(&rx, 3).unwrap();
        assert!(cart.totals().has_prescription_items);

        assert!(cart.remove_item("amox"));
        assert_eq!(cart.totals().subtotal, Money::zero());
        assert_eq!(cart.totals().item_count, 0);
        assert!(!cart.totals().has_prescription_items);
        assert!(cart.totals().delivery_fee.is_zero());
        assert!(cart.totals().total.is_zero());

        assert!(!cart.remove_item("amox"));
    }

    #[test]
    fn test_repeated_add_reprices_with_current_discount() {
        let mut cart = Cart::new();
        let p = product("p", peso(100)).with_discount(10);
        cart.add_item(&p, 1).unwrap();
        assert_eq!(cart.line("p").unwrap().total_price, peso(90));

        let repriced = p.clone().with_discount(20);
        cart.add_item(&repriced, 1).unwrap();

        let line = cart.line("p").unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.total_price, peso(160));
        assert_eq!(line.discount_amount, peso(40));
        assert_eq!(line.unit_price, peso(80));
        assert_eq!(line.product.discount_percentage, 20);
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(100)).with_discount(10), 1).unwrap();

        cart.update_quantity("a", 4).unwrap();
        assert_eq!(cart.item_quantity("a"), 4);
        assert_eq!(cart.totals().subtotal, peso(360));

        cart.update_quantity("missing", 3).unwrap();
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity("a", 0).unwrap();
        assert!(!cart.contains("a"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_after_readd_uses_refreshed_snapshot() {
        let mut cart = Cart::new();
        let p = product("p", peso(100)).with_discount(10);
        cart.add_item(&p, 1).unwrap();
        cart.add_item(&p.clone().with_discount(20), 1).unwrap();

        cart.update_quantity("p", 5).unwrap();

        let line = cart.line("p").unwrap();
        assert_eq!(line.unit_price, peso(80));
        assert_eq!(line.discount_amount, peso(100));
        assert_eq!(line.total_price, peso(400));
        assert_eq!(cart.totals().subtotal, peso(400));
    }

    #[test]
    fn test_oversized_quantity_is_rejected() {
        let mut cart = Cart::new();
        let p = product("p", peso(500));
        cart.add_item(&p, 2).unwrap();
        let before = cart.clone();

        let err = cart.add_item(&p, 1_000_000_000_000_000).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(cart, before);

        assert!(cart.add_item(&p, i64::MAX).is_err());
        assert!(cart.update_quantity("p", i64::MAX).is_err());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_total_overflow_is_rejected() {
        let mut cart = Cart::new();
        let half = Money::from_centavos(i64::MAX / 2);
        cart.add_item(&product("a", half), 1).unwrap();
        let before = cart.clone();

        // the subtotal still fits but tax on top of it does not
        let err = cart.add_item(&product("b", half), 1).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(100)), 2).unwrap();
        cart.clear();
        assert_eq!(cart, Cart::new());
    }

    #[test]
    fn test_available_to_add() {
        let mut cart = Cart::new();
        let p = product("a", peso(10)).with_stock(10).with_max_order_quantity(4);
        assert_eq!(cart.available_to_add(&p), 4);

        cart.add_item(&p, 8).unwrap();
        assert_eq!(cart.available_to_add(&p), 2);

        cart.add_item(&p, 2).unwrap();
        assert_eq!(cart.available_to_add(&p), 0);

        let sold_out = product("b", peso(10)).with_stock(0);
        assert_eq!(cart.available_to_add(&sold_out), 0);
    }

    #[test]
    fn test_prescription_flag() {
        let mut cart = Cart::new();
        cart.add_item(&product("otc", peso(50)), 1).unwrap();
        assert!(!cart.totals().has_prescription_items);

        cart.add_item(&product("rx", peso(50)).requiring_prescription(), 1)
            .unwrap();
        assert!(cart.totals().has_prescription_items);
    }

    #[test]
    fn test_restore_recomputes_totals() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(250)).with_discount(10), 2).unwrap();
        let json = cart.to_json().unwrap();

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["subtotal"] = serde_json::json!(1);
        value["total"] = serde_json::json!(1);
        let restored = Cart::restore(&value.to_string()).unwrap();

        assert_eq!(restored, cart);
        assert_eq!(restored.totals().subtotal, peso(450));
    }

    #[test]
    fn test_restore_rejects_garbage() {
        assert!(Cart::restore("{not json").is_err());
        assert!(Cart::restore("[]").is_err());
    }

    #[test]
    fn test_restore_rejects_duplicate_lines() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(10)), 1).unwrap();
        let mut value = serde_json::to_value(&cart).unwrap();
        let line = value["items"][0].clone();
        value["items"].as_array_mut().unwrap().push(line);

        assert!(Cart::restore(&value.to_string()).is_err());
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let mut cart = Cart::new();
        cart.add_item(&product("a", peso(10)), 1).unwrap();
        let value: serde_json::Value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value["id"], "cart-default");
        assert_eq!(value["subtotal"], 1000);
        assert_eq!(value["delivery_fee"], 5000);
        assert_eq!(value["items"][0]["product_id"], "a");
    }
}
