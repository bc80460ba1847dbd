//! # pharmaline-db: SQLite Storage for PharmaLine
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products      read-only catalog (id, sku, slug, price, discount, ...) │
//! │  orders        one row per placed order, UNIQUE order_number           │
//! │  order_items   snapshot lines, ON DELETE CASCADE from orders           │
//! │  client_kv     persisted cart JSON under a fixed key                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use pharmaline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./storefront.db")).await?;
//! let order = db.orders().get_by_number("ORD-20250101-A1B2").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::cart_store::CartKvRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
