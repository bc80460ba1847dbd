//! # pharmaline-core: Cart Pricing and Order Totals
//!
//! Pure business logic for the PharmaLine storefront. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront (web)                                                       │
//! │    product page ──► cart page ──► checkout form ──► confirmation        │
//! │                                │                                        │
//! │  pharmaline-checkout           ▼                                        │
//! │    CartSession, CheckoutService, ApiResponse                            │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ pharmaline-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   pricing ──► cart ──► order (snapshot, verify_totals)         │   │
//! │  │   money, types, validation, store (traits only)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  pharmaline-db                 ▼                                        │
//! │    SQLite: orders, order_items, products, client_kv                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use pharmaline_core::{Cart, Money, Product};
//!
//! let mut cart = Cart::new();
//! let vit_c = Product::new("p1", "VITC-500", "Vitamin C 500mg", Money::from_pesos(500, 0))
//!     .with_discount(15)
//!     .with_stock(50);
//! cart.add_item(&vit_c, 2).unwrap();
//!
//! let totals = cart.totals();
//! assert_eq!(totals.subtotal, Money::from_pesos(850, 0));
//! assert_eq!(totals.tax_amount, Money::from_pesos(102, 0));
//! assert_eq!(totals.delivery_fee, Money::from_pesos(50, 0));
//! assert_eq!(totals.total, Money::from_pesos(1002, 0));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{Cart, CartLineItem, CartSummary, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{
    build_order_request, verify_totals, CartSnapshot, CreateOrderRequest, NewOrder,
    OrderItemSnapshot, OrderNumber, VerifiedTotals,
};
pub use pricing::{calculate_price_info, PriceInfo};
pub use store::{CartStore, OrderStore, StoreError, StoreResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Flat delivery fee below the free-delivery threshold (₱50.00).
pub const DELIVERY_FEE: Money = Money::from_centavos(5_000);

/// Subtotal at or above which delivery is free (₱1,000.00).
pub const FREE_DELIVERY_THRESHOLD: Money = Money::from_centavos(100_000);

/// Id of the single client cart.
pub const CART_ID: &str = "cart-default";

/// Default key the cart is persisted under in the client-local store.
pub const CART_STORAGE_KEY: &str = "pharma-line-cart";
