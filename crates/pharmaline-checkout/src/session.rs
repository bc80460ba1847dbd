//! # Cart Session
//!
//! Owns the shopper's [`Cart`] and keeps it in sync with a [`CartStore`].
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load ──► stored JSON? ──yes──► Cart::restore ──ok──► session           │
//! │              │                        │                                 │
//! │              no                    corrupt                              │
//! │              │                        │                                 │
//! │              │                  remove key, warn                        │
//! │              ▼                        ▼                                 │
//! │           empty cart ◄────────────────┘                                 │
//! │                                                                         │
//! │  add_to_cart / update_quantity / remove_item / clear                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  mutate Cart ──► persist full cart under the session key                │
//! │                        │                                                │
//! │                      fails ──► put the previous cart back, report error │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use pharmaline_core::validation::{validate_add_quantity, validate_line_quantity};
use pharmaline_core::{
    Cart, CartStore, CartSummary, Product, StoreError, StoreResult, CART_STORAGE_KEY,
};

use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug)]
pub struct CartSession<S: CartStore> {
    store: S,
    key: String,
    cart: Cart,
}

impl<S: CartStore> CartSession<S> {
    /// Session on the default `pharma-line-cart` key.
    pub async fn load(store: S) -> Self {
        Self::load_with_key(store, CART_STORAGE_KEY).await
    }

    /// Restores the cart stored under `key`.
    ///
    /// Never fails: a missing, unreadable or corrupt value yields an empty
    /// cart. A corrupt value is also removed from the store.
    pub async fn load_with_key(store: S, key: impl Into<String>) -> Self {
        let key = key.into();

        let cart = match store.get(&key).await {
            Ok(Some(json)) => match Cart::restore(&json) {
                Ok(cart) => {
                    debug!(key = %key, items = cart.items().len(), "Restored cart");
                    cart
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored cart is corrupt, starting empty");
                    if let Err(e) = store.remove(&key).await {
                        warn!(key = %key, error = %e, "Failed to remove corrupt cart");
                    }
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read stored cart, starting empty");
                Cart::new()
            }
        };

        CartSession { store, key, cart }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn summary(&self) -> CartSummary {
        self.cart.summary()
    }

    /// Adds `quantity` units after checking availability and stock. The
    /// resulting line may not exceed `min(stock, max_order_quantity)`.
    pub async fn add_to_cart(&mut self, product: &Product, quantity: i64) -> CheckoutResult<&Cart> {
        debug!(product_id = %product.id, quantity, "add_to_cart");

        let in_cart = self.cart.item_quantity(&product.id);
        validate_add_quantity(product, in_cart, quantity)?;
        validate_line_quantity(product, in_cart.saturating_add(quantity))?;

        let previous = self.cart.clone();
        self.cart.add_item(product, quantity)?;
        self.commit(previous).await
    }

    /// Sets a line's quantity; `quantity <= 0` removes it. The new quantity
    /// is checked against the line's captured stock and order limit.
    pub async fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CheckoutResult<&Cart> {
        debug!(product_id = %product_id, quantity, "update_quantity");

        if let Some(line) = self.cart.line(product_id) {
            validate_line_quantity(&line.product, quantity)?;
        }

        let previous = self.cart.clone();
        self.cart.update_quantity(product_id, quantity)?;
        self.commit(previous).await
    }

    pub async fn remove_item(&mut self, product_id: &str) -> CheckoutResult<&Cart> {
        debug!(product_id = %product_id, "remove_item");

        let previous = self.cart.clone();
        self.cart.remove_item(product_id);
        self.commit(previous).await
    }

    /// Empties the cart and stores the empty cart.
    pub async fn clear(&mut self) -> CheckoutResult<&Cart> {
        debug!("clear cart");

        let previous = self.cart.clone();
        self.cart.clear();
        self.commit(previous).await
    }

    /// Stores the mutated cart. On failure the cart goes back to `previous`,
    /// so memory never runs ahead of the store.
    async fn commit(&mut self, previous: Cart) -> CheckoutResult<&Cart> {
        if let Err(e) = self.persist().await {
            warn!(key = %self.key, error = %e, "Failed to save cart, change reverted");
            self.cart = previous;
            return Err(e);
        }
        Ok(&self.cart)
    }

    async fn persist(&self) -> CheckoutResult<()> {
        let json = self.cart.to_json()?;
        self.store
            .set(&self.key, &json)
            .await
            .map_err(CheckoutError::CartPersistence)
    }
}

// =============================================================================
// In-Memory Cart Store
// =============================================================================

/// Process-local [`CartStore`]. Clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_values<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> StoreResult<R> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Failed("cart store mutex poisoned".into()))?;
        Ok(f(&mut values))
    }
}

impl CartStore for MemoryCartStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_values(|v| v.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.with_values(|v| {
            v.insert(key.to_string(), value.to_string());
        })
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.with_values(|v| {
            v.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmaline_core::{Money, ValidationError};

    fn peso(p: i64) -> Money {
        Money::from_pesos(p, 0)
    }

    fn biogesic() -> Product {
        Product::new("p-bio", "BIO-500", "Biogesic 500mg", peso(100))
            .with_discount(10)
            .with_stock(20)
            .with_max_order_quantity(5)
    }

    /// Serves `stored` but fails every write.
    struct ReadOnlyStore {
        stored: Option<String>,
    }

    impl CartStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(self.stored.clone())
        }

        async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".into()))
        }

        async fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".into()))
        }
    }

    #[tokio::test]
    async fn test_mutations_are_persisted() {
        let store = MemoryCartStore::new();
        let mut session = CartSession::load(store.clone()).await;

        session.add_to_cart(&biogesic(), 2).await.unwrap();

        let stored = store.get(CART_STORAGE_KEY).await.unwrap().unwrap();
        let restored = Cart::restore(&stored).unwrap();
        assert_eq!(restored.item_quantity("p-bio"), 2);
        assert_eq!(restored.totals().subtotal, peso(180));

        // a new session picks up where the last one left off
        let reloaded = CartSession::load(store.clone()).await;
        assert_eq!(reloaded.cart(), session.cart());
    }

    #[tokio::test]
    async fn test_corrupt_cart_is_discarded() {
        let store = MemoryCartStore::new();
        store.set(CART_STORAGE_KEY, "{not json").await.unwrap();

        let session = CartSession::load(store.clone()).await;

        assert!(session.cart().is_empty());
        assert_eq!(session.summary().totals.total, Money::zero());
        assert_eq!(store.get(CART_STORAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_respects_max_order_quantity() {
        let mut session = CartSession::load(MemoryCartStore::new()).await;
        session.add_to_cart(&biogesic(), 4).await.unwrap();

        let err = session.add_to_cart(&biogesic(), 2).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::InsufficientStock { requested: 6, .. })
        ));
        assert_eq!(session.cart().item_quantity("p-bio"), 4);
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_stock() {
        let mut session = CartSession::load(MemoryCartStore::new()).await;
        let product = biogesic().with_stock(0);

        let err = session.add_to_cart(&product, 1).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::OutOfStock { .. })
        ));
        assert!(session.cart().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_checks_limit_and_removes_at_zero() {
        let store = MemoryCartStore::new();
        let mut session = CartSession::load(store.clone()).await;
        session.add_to_cart(&biogesic(), 1).await.unwrap();

        assert!(session.update_quantity("p-bio", 6).await.is_err());
        assert_eq!(session.cart().item_quantity("p-bio"), 1);

        session.update_quantity("p-bio", 3).await.unwrap();
        assert_eq!(session.cart().item_quantity("p-bio"), 3);

        session.update_quantity("p-bio", 0).await.unwrap();
        assert!(session.cart().is_empty());

        let stored = store.get(CART_STORAGE_KEY).await.unwrap().unwrap();
        assert!(Cart::restore(&stored).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_persists_empty_cart() {
        let store = MemoryCartStore::new();
        let mut session = CartSession::load_with_key(store.clone(), "cart-test").await;
        session.add_to_cart(&biogesic(), 1).await.unwrap();
        session.remove_item("missing").await.unwrap();

        session.clear().await.unwrap();

        let stored = store.get("cart-test").await.unwrap().unwrap();
        assert!(Cart::restore(&stored).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let mut session = CartSession::load(ReadOnlyStore { stored: None }).await;
        let err = session.add_to_cart(&biogesic(), 1).await.unwrap_err();
        assert!(matches!(err, CheckoutError::CartPersistence(_)));
        assert!(session.cart().is_empty());
        assert_eq!(session.summary().totals.item_count, 0);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_stored_cart() {
        let mut cart = Cart::new();
        cart.add_item(&biogesic(), 2).unwrap();
        let store = ReadOnlyStore {
            stored: Some(cart.to_json().unwrap()),
        };
        let mut session = CartSession::load(store).await;

        assert!(session.update_quantity("p-bio", 3).await.is_err());
        assert!(session.remove_item("p-bio").await.is_err());
        assert!(session.clear().await.is_err());

        assert_eq!(session.cart(), &cart);
    }
}
