//! # Order Repository
//!
//! SQLite implementation of [`OrderStore`].
//!
//! ## Write Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_header(NewOrder)                                                │
//! │     INSERT INTO orders ... (order_number UNIQUE)                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  insert_items(order_id, lines)                                          │
//! │     BEGIN; INSERT INTO order_items × N; COMMIT                          │
//! │        │                                                                │
//! │        ├── ok  → order complete                                         │
//! │        └── err → caller runs delete_header(order_id)                    │
//! │                  (ON DELETE CASCADE removes any stray lines)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders are never updated here; status changes belong to back-office
//! tooling outside checkout.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharmaline_core::{
    Money, NewOrder, Order, OrderItem, OrderItemSnapshot, OrderStatus, OrderStore,
    PaymentMethod, PaymentStatus, ShippingAddress, StoreResult,
};

const ORDER_COLUMNS: &str = r#"
    id, order_number, user_id, customer_name, customer_email, customer_phone,
    delivery_address_line1, delivery_address_line2, delivery_city,
    delivery_province, delivery_postal_code,
    subtotal, discount_amount, tax_amount, delivery_fee, total,
    status, payment_method, payment_status,
    has_prescription_items, requires_prescription_verification,
    notes, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, order_id, product_id, product_name, product_sku, product_generic_name,
    quantity, unit_price, discount_amount, total_price, created_at
"#;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRecord {
    id: String,
    order_number: String,
    user_id: Option<String>,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    delivery_address_line1: String,
    delivery_address_line2: Option<String>,
    delivery_city: String,
    delivery_province: String,
    delivery_postal_code: String,
    subtotal: i64,
    discount_amount: i64,
    tax_amount: i64,
    delivery_fee: i64,
    total: i64,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    has_prescription_items: bool,
    requires_prescription_verification: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRecord {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: ShippingAddress {
                address_line1: self.delivery_address_line1,
                address_line2: self.delivery_address_line2,
                city: self.delivery_city,
                province: self.delivery_province,
                postal_code: self.delivery_postal_code,
            },
            subtotal: Money::from_centavos(self.subtotal),
            discount_amount: Money::from_centavos(self.discount_amount),
            tax_amount: Money::from_centavos(self.tax_amount),
            delivery_fee: Money::from_centavos(self.delivery_fee),
            total: Money::from_centavos(self.total),
            status: self.status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            has_prescription_items: self.has_prescription_items,
            requires_prescription_verification: self.requires_prescription_verification,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRecord {
    id: String,
    order_id: String,
    product_id: Option<String>,
    product_name: String,
    product_sku: String,
    product_generic_name: Option<String>,
    quantity: i64,
    unit_price: i64,
    discount_amount: i64,
    total_price: i64,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRecord> for OrderItem {
    fn from(r: OrderItemRecord) -> Self {
        OrderItem {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            product_sku: r.product_sku,
            product_generic_name: r.product_generic_name,
            quantity: r.quantity,
            unit_price: Money::from_centavos(r.unit_price),
            discount_amount: Money::from_centavos(r.discount_amount),
            total_price: Money::from_centavos(r.total_price),
            created_at: r.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes an order header and returns it with no items.
    pub async fn insert_header(&self, order: &NewOrder) -> DbResult<Order> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(order_id = %id, order_number = %order.order_number, "Inserting order header");

        let address = &order.shipping_address;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, customer_name, customer_email, customer_phone,
                delivery_address_line1, delivery_address_line2, delivery_city,
                delivery_province, delivery_postal_code,
                subtotal, discount_amount, tax_amount, delivery_fee, total,
                status, payment_method, payment_status,
                has_prescription_items, requires_prescription_verification,
                notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(order.order_number.as_str())
        .bind(&order.user_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.province)
        .bind(&address.postal_code)
        .bind(order.subtotal.centavos())
        .bind(order.discount_amount.centavos())
        .bind(order.tax_amount.centavos())
        .bind(order.delivery_fee.centavos())
        .bind(order.total.centavos())
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.payment_status)
        .bind(order.has_prescription_items)
        .bind(order.requires_prescription_verification)
        .bind(&order.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(order.order_number.as_str()))?;

        Ok(Order {
            id,
            order_number: order.order_number.to_string(),
            user_id: order.user_id.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            customer_phone: order.customer_phone.clone(),
            shipping_address: order.shipping_address.clone(),
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            tax_amount: order.tax_amount,
            delivery_fee: order.delivery_fee,
            total: order.total,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            has_prescription_items: order.has_prescription_items,
            requires_prescription_verification: order.requires_prescription_verification,
            notes: order.notes.clone(),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        })
    }

    /// Writes every line for `order_id` in one transaction.
    pub async fn insert_items(
        &self,
        order_id: &str,
        items: &[OrderItemSnapshot],
    ) -> DbResult<Vec<OrderItem>> {
        debug!(order_id = %order_id, count = items.len(), "Inserting order items");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(items.len());

        for item in items {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, product_sku,
                    product_generic_name, quantity, unit_price, discount_amount,
                    total_price, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(order_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.product_sku)
            .bind(&item.product_generic_name)
            .bind(item.quantity)
            .bind(item.unit_price.centavos())
            .bind(item.discount_amount.centavos())
            .bind(item.total_price.centavos())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            written.push(OrderItem {
                id,
                order_id: order_id.to_string(),
                product_id: Some(item.product_id.clone()),
                product_name: item.product_name.clone(),
                product_sku: item.product_sku.clone(),
                product_generic_name: item.product_generic_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount_amount: item.discount_amount,
                total_price: item.total_price,
                created_at: now,
            });
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Deletes a header; its lines go with it.
    pub async fn delete_header(&self, order_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, "Deleting order header");
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }
        Ok(())
    }

    /// Loads one order with its items, optionally scoped to `user_id`.
    pub async fn get_by_id(&self, order_id: &str, user_id: Option<&str>) -> DbResult<Option<Order>> {
        let record: Option<OrderRecord> = match user_id {
            Some(user_id) => {
                let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? AND user_id = ?");
                sqlx::query_as(&sql)
                    .bind(order_id)
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
                sqlx::query_as(&sql)
                    .bind(order_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        self.with_items(record).await
    }

    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?");
        let record: Option<OrderRecord> = sqlx::query_as(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        self.with_items(record).await
    }

    /// A user's orders, newest first, each with its items.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        );
        let records: Vec<OrderRecord> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut orders = Vec::with_capacity(records.len());
        for record in records {
            let items = self.items_for(&record.id).await?;
            orders.push(record.into_order(items));
        }
        Ok(orders)
    }

    pub async fn items_for(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY rowid"
        );
        let records: Vec<OrderItemRecord> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(records.into_iter().map(OrderItem::from).collect())
    }

    async fn with_items(&self, record: Option<OrderRecord>) -> DbResult<Option<Order>> {
        match record {
            Some(record) => {
                let items = self.items_for(&record.id).await?;
                Ok(Some(record.into_order(items)))
            }
            None => Ok(None),
        }
    }
}

impl OrderStore for OrderRepository {
    async fn insert_order_header(&self, order: &NewOrder) -> StoreResult<Order> {
        Ok(self.insert_header(order).await?)
    }

    async fn insert_order_items(
        &self,
        order_id: &str,
        items: &[OrderItemSnapshot],
    ) -> StoreResult<Vec<OrderItem>> {
        Ok(self.insert_items(order_id, items).await?)
    }

    async fn delete_order_header(&self, order_id: &str) -> StoreResult<()> {
        Ok(self.delete_header(order_id).await?)
    }

    async fn find_order(&self, order_id: &str, user_id: Option<&str>) -> StoreResult<Option<Order>> {
        Ok(self.get_by_id(order_id, user_id).await?)
    }

    async fn find_order_by_number(&self, order_number: &str) -> StoreResult<Option<Order>> {
        Ok(self.get_by_number(order_number).await?)
    }

    async fn list_orders_for_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        Ok(self.list_for_user(user_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use pharmaline_core::{
        build_order_request, verify_totals, Cart, CheckoutForm, OrderNumber, Product,
    };

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            customer_name: "Ana Reyes".to_string(),
            customer_email: "ana@example.ph".to_string(),
            customer_phone: "09181234567".to_string(),
            shipping_address: ShippingAddress {
                address_line1: "7 Bonifacio St".to_string(),
                address_line2: None,
                city: "Davao City".to_string(),
                province: "Davao del Sur".to_string(),
                postal_code: "8000".to_string(),
            },
            payment_method: PaymentMethod::Cod,
            notes: Some("Leave at the guard house".to_string()),
        }
    }

    fn new_order(suffix_entropy: u128, user_id: Option<&str>) -> (NewOrder, Vec<OrderItemSnapshot>) {
        let mut cart = Cart::new();
        cart.add_item(
            &Product::new("p1", "MEF-500", "Mefenamic Acid 500mg", Money::from_centavos(850))
                .with_discount(10),
            4,
        )
        .unwrap();
        cart.add_item(
            &Product::new("p2", "SALB-2", "Salbutamol 2mg", Money::from_centavos(1_200))
                .requiring_prescription(),
            1,
        )
        .unwrap();

        let request = build_order_request(&cart, form()).unwrap();
        let totals = verify_totals(&request.cart).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let order = NewOrder::from_request(
            &request,
            totals,
            OrderNumber::from_entropy(date, suffix_entropy),
            user_id.map(str::to_string),
        );
        (order, request.cart.items)
    }

    #[tokio::test]
    async fn test_header_then_items_round_trip() {
        let db = db().await;
        let repo = db.orders();
        let (new_order, items) = new_order(1, Some("user-1"));

        let header = repo.insert_header(&new_order).await.unwrap();
        let written = repo.insert_items(&header.id, &items).await.unwrap();
        assert_eq!(written.len(), 2);

        let loaded = repo.get_by_id(&header.id, None).await.unwrap().unwrap();
        assert_eq!(loaded.order_number, "ORD-20250314-0001");
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.payment_status, PaymentStatus::Unpaid);
        assert!(loaded.requires_prescription_verification);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.item_count(), 5);

        let line_sum: Money = loaded.items.iter().map(|i| i.total_price).sum();
        assert_eq!(line_sum, loaded.subtotal);
        assert_eq!(
            loaded.total,
            loaded.subtotal + loaded.tax_amount + loaded.delivery_fee - loaded.discount_amount
        );
        assert_eq!(loaded.shipping_address.city, "Davao City");
        assert_eq!(loaded.notes.as_deref(), Some("Leave at the guard house"));
    }

    #[tokio::test]
    async fn test_user_scope() {
        let db = db().await;
        let repo = db.orders();
        let (new_order, _) = new_order(2, Some("user-1"));
        let header = repo.insert_header(&new_order).await.unwrap();

        assert!(repo.get_by_id(&header.id, Some("user-1")).await.unwrap().is_some());
        assert!(repo.get_by_id(&header.id, Some("user-2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_number() {
        let db = db().await;
        let repo = db.orders();
        let (first, _) = new_order(3, None);
        repo.insert_header(&first).await.unwrap();

        let (second, _) = new_order(3, None);
        let err = repo.insert_header(&second).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "order_number");
                assert_eq!(value, "ORD-20250314-0003");
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_item_rolls_back_batch() {
        let db = db().await;
        let repo = db.orders();
        let (new_order, mut items) = new_order(4, None);
        let header = repo.insert_header(&new_order).await.unwrap();

        items[1].quantity = 0;
        let err = repo.insert_items(&header.id, &items).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation { .. }));
        assert!(repo.items_for(&header.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_header_cascades() {
        let db = db().await;
        let repo = db.orders();
        let (new_order, items) = new_order(5, None);
        let header = repo.insert_header(&new_order).await.unwrap();
        repo.insert_items(&header.id, &items).await.unwrap();

        repo.delete_header(&header.id).await.unwrap();
        assert!(repo.get_by_id(&header.id, None).await.unwrap().is_none());
        assert!(repo.items_for(&header.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_header(&header.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let db = db().await;
        let repo = db.orders();
        for n in 10..13u128 {
            let (order, items) = new_order(n, Some("user-9"));
            let header = repo.insert_header(&order).await.unwrap();
            repo.insert_items(&header.id, &items).await.unwrap();
        }
        let (other, _) = new_order(20, Some("someone-else"));
        repo.insert_header(&other).await.unwrap();

        let orders = repo.list_for_user("user-9").await.unwrap();
        let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["ORD-20250314-000C", "ORD-20250314-000B", "ORD-20250314-000A"]
        );
        assert!(orders.iter().all(|o| o.items.len() == 2));

        let by_number = repo.get_by_number("ORD-20250314-000B").await.unwrap().unwrap();
        assert_eq!(by_number.user_id.as_deref(), Some("user-9"));
    }
}
