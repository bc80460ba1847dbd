//! # pharmaline-checkout: Cart Session and Checkout
//!
//! Wires `pharmaline-core` (pricing, cart, order rules) to `pharmaline-db`
//! (SQLite) for one storefront client.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. StorefrontConfig::load   defaults → storefront.toml → PHARMALINE_* │
//! │  2. init_tracing             RUST_LOG or the configured filter          │
//! │  3. Database::new            open SQLite, run migrations                │
//! │  4. CartSession::load        restore the persisted cart                 │
//! │  5. CheckoutService::new     ready to take orders                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = StorefrontConfig::load(None)?;
//! init_tracing(&config.log_filter);
//! let mut storefront = Storefront::open(config).await?;
//!
//! storefront.add_to_cart("p-para", 2).await?;
//! let response = storefront.place_order(Some("user-1"), form).await;
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod response;
pub mod session;
pub mod telemetry;

pub use checkout::CheckoutService;
pub use config::{ConfigError, StorefrontConfig};
pub use error::{ApiError, CheckoutError, CheckoutResult, ErrorCode};
pub use response::ApiResponse;
pub use session::{CartSession, MemoryCartStore};
pub use telemetry::init_tracing;

use thiserror::Error;
use tracing::info;

use pharmaline_core::{Cart, CheckoutForm, CoreError, Order, StoreError};
use pharmaline_db::{CartKvRepository, Database, DbConfig, DbError, OrderRepository};

use crate::response::ORDER_PLACED_MESSAGE;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// One client's storefront: catalog, persisted cart and checkout on a
/// single SQLite database.
#[derive(Debug)]
pub struct Storefront {
    config: StorefrontConfig,
    db: Database,
    session: CartSession<CartKvRepository>,
    checkout: CheckoutService<OrderRepository>,
}

impl Storefront {
    pub async fn open(config: StorefrontConfig) -> Result<Self, StartupError> {
        let path = config.resolve_database_path()?;
        let db = Database::new(DbConfig::new(path)).await?;
        Ok(Self::with_database(config, db).await)
    }

    /// Builds on an already opened database.
    pub async fn with_database(config: StorefrontConfig, db: Database) -> Self {
        let session = CartSession::load_with_key(db.cart_store(), &config.cart_storage_key).await;
        let checkout = CheckoutService::new(db.orders())
            .with_order_number_attempts(config.order_number_attempts);

        info!(
            cart_key = %config.cart_storage_key,
            items = session.cart().items().len(),
            "Storefront ready"
        );

        Storefront {
            config,
            db,
            session,
            checkout,
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn session(&mut self) -> &mut CartSession<CartKvRepository> {
        &mut self.session
    }

    pub fn cart(&self) -> &Cart {
        self.session.cart()
    }

    pub fn checkout(&self) -> &CheckoutService<OrderRepository> {
        &self.checkout
    }

    /// Looks the product up in the catalog and adds it to the cart.
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: i64) -> CheckoutResult<&Cart> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        self.session.add_to_cart(&product, quantity).await
    }

    /// Places an order for the current cart; the cart is emptied on success.
    pub async fn place_order(&mut self, user_id: Option<&str>, form: CheckoutForm) -> ApiResponse<Order> {
        match self
            .checkout
            .place_order(&mut self.session, user_id, form)
            .await
        {
            Ok(order) => ApiResponse::ok_with_message(order, ORDER_PLACED_MESSAGE),
            Err(e) => ApiResponse::err(e),
        }
    }

    pub fn format_currency(&self, amount: pharmaline_core::Money) -> String {
        self.config.format_currency(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmaline_core::{Money, PaymentMethod, Product, ShippingAddress};

    fn form() -> CheckoutForm {
        CheckoutForm {
            customer_name: "Jose Rizal".into(),
            customer_email: "jose@example.ph".into(),
            customer_phone: "09181234567".into(),
            shipping_address: ShippingAddress {
                address_line1: "1 Bonifacio Ave".into(),
                address_line2: Some("Unit 4".into()),
                city: "Makati".into(),
                province: "Metro Manila".into(),
                postal_code: "1200".into(),
            },
            payment_method: PaymentMethod::Gcash,
            notes: Some("  Leave at the guard house  ".into()),
        }
    }

    async fn storefront(db: Database) -> Storefront {
        Storefront::with_database(StorefrontConfig::default(), db).await
    }

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(
                &Product::new("p-cet", "CET-10", "Cetirizine 10mg", Money::from_pesos(12, 50))
                    .with_stock(100),
            )
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let db = seeded_db().await;
        let mut first = storefront(db.clone()).await;
        first.add_to_cart("p-cet", 4).await.unwrap();
        assert_eq!(first.cart().totals().subtotal, Money::from_pesos(50, 0));

        let second = storefront(db).await;
        assert_eq!(second.cart().item_quantity("p-cet"), 4);
        assert_eq!(second.format_currency(second.cart().totals().total), "₱106.00");
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let mut shop = storefront(seeded_db().await).await;
        let err = shop.add_to_cart("missing", 1).await.unwrap_err();
        assert_eq!(ApiError::from(err).code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_place_order_end_to_end() {
        let mut shop = storefront(seeded_db().await).await;
        shop.add_to_cart("p-cet", 2).await.unwrap();

        let response = shop.place_order(Some("user-3"), form()).await;
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Order placed successfully!"));

        let order = response.data.unwrap();
        assert_eq!(order.notes.as_deref(), Some("Leave at the guard house"));
        assert_eq!(order.shipping_address.address_line2.as_deref(), Some("Unit 4"));
        assert_eq!(order.payment_method, PaymentMethod::Gcash);
        assert!(shop.cart().is_empty());

        let empty = shop.place_order(Some("user-3"), form()).await;
        assert!(!empty.success);
        assert_eq!(empty.error.unwrap().code, ErrorCode::ValidationError);
    }
}
