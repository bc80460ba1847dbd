//! # Domain Types
//!
//! Catalog, checkout and order types shared by every PharmaLine crate.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, sku, slug  │   │  order_number   │   │  product_name   │       │
//! │  │  base_price     │   │  totals (₱)     │   │  product_sku    │       │
//! │  │  discount %     │   │  status         │   │  unit_price     │       │
//! │  │  stock, max qty │   │  payment_*      │   │  total_price    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │     (read-only)           (immutable after       (snapshot, no FK)      │
//! │                             creation)                                   │
//! │                                                                         │
//! │  CheckoutForm ──► ShippingAddress, PaymentMethod                        │
//! │  OrderStatus: pending → confirmed → processing → out_for_delivery      │
//! │               → delivered   (cancelled / refunded end the flow)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Philippine VAT, 12%.
    pub const VAT: TaxRate = TaxRate(1200);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Rate as a percentage, for display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::VAT
    }
}

// =============================================================================
// Product
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Prescription,
    #[default]
    Otc,
    HealthProduct,
}

/// A catalog product. The cart reads products but never writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub generic_name: Option<String>,

    /// Price before any discount.
    pub base_price: Money,

    /// Whole-percent discount, 0-100.
    pub discount_percentage: u8,

    pub stock_quantity: i64,

    /// Per-order cap. `None` means the stock level is the only limit.
    pub max_order_quantity: Option<i64>,
    pub min_order_quantity: Option<i64>,

    pub requires_prescription: bool,
    pub product_type: ProductType,
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active, in-catalog OTC product with no discount and no stock.
    ///
    /// The `with_*` methods fill in the rest; mostly used by catalog import and
    /// tests.
    pub fn new(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        base_price: Money,
    ) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        let now = Utc::now();
        Self {
            id: id.into(),
            sku: sku.into(),
            name,
            slug,
            generic_name: None,
            base_price,
            discount_percentage: 0,
            stock_quantity: 0,
            max_order_quantity: None,
            min_order_quantity: None,
            requires_prescription: false,
            product_type: ProductType::Otc,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_discount(mut self, percent: u8) -> Self {
        self.discount_percentage = percent;
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock_quantity = stock;
        self
    }

    pub fn with_max_order_quantity(mut self, max: i64) -> Self {
        self.max_order_quantity = Some(max);
        self
    }

    pub fn with_generic_name(mut self, generic: impl Into<String>) -> Self {
        self.generic_name = Some(generic.into());
        self
    }

    /// Marks the product as prescription-only (Rx).
    pub fn requiring_prescription(mut self) -> Self {
        self.requires_prescription = true;
        self.product_type = ProductType::Prescription;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    #[inline]
    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Largest quantity one order may hold: `min(stock, max_order_quantity)`.
    pub fn purchase_limit(&self) -> i64 {
        let stock = self.stock_quantity.max(0);
        match self.max_order_quantity {
            Some(max) => stock.min(max),
            None => stock,
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment state of an order.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    /// Wire/storage name, e.g. `out_for_delivery`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Customer-facing label, e.g. "Out For Delivery".
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cancelled and refunded orders never move again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Whether fulfilment may move from `self` to `next`.
    ///
    /// ```text
    /// pending ──► confirmed ──► processing ──► out_for_delivery ──► delivered
    ///    │            │             │                                  │
    ///    └────────────┴─────────────┴──► cancelled          refunded ◄─┘
    /// ```
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, OutForDelivery)
                | (Processing, Cancelled)
                | (OutForDelivery, Delivered)
                | (Delivered, Refunded)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Payment option picked at checkout. No gateway is attached to any of them.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Gcash,
    CreditCard,
    DebitCard,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

// =============================================================================
// Checkout Input
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingAddress {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
}

/// Customer and delivery details submitted with the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutForm {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Never modified by the checkout flow once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    /// `None` for guest checkout.
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
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Empty when only the header has been loaded.
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            order_number: self.order_number.clone(),
            total: self.total,
            status: self.status,
            created_at: self.created_at,
            item_count: self.item_count(),
        }
    }
}

/// A purchased line, frozen at checkout.
///
/// `product_id` is a plain value: the catalog row may change or disappear
/// and the order still reads correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_sku: String,
    pub product_generic_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_amount: Money,
    pub total_price: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One row of the order history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub order_number: String,
    pub total: Money,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
