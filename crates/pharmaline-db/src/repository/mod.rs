//! # Repository Module
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog lookups
//! - [`OrderRepository`](order::OrderRepository) - orders and their lines ([`OrderStore`](pharmaline_core::OrderStore))
//! - [`CartKvRepository`](cart_store::CartKvRepository) - persisted cart ([`CartStore`](pharmaline_core::CartStore))

pub mod cart_store;
pub mod order;
pub mod product;
