//! # Product Repository
//!
//! Read access to the catalog for cart and checkout, plus a plain insert
//! used by catalog import and tests. Checkout never writes products.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharmaline_core::validation::validate_discount_percentage;
use pharmaline_core::{Money, Product, ProductType};

const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, slug, generic_name, base_price, discount_percentage,
    stock_quantity, max_order_quantity, min_order_quantity,
    requires_prescription, product_type, is_active, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct ProductRecord {
    id: String,
    sku: String,
    name: String,
    slug: String,
    generic_name: Option<String>,
    base_price: i64,
    discount_percentage: i64,
    stock_quantity: i64,
    max_order_quantity: Option<i64>,
    min_order_quantity: Option<i64>,
    requires_prescription: bool,
    product_type: ProductType,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRecord> for Product {
    type Error = DbError;

    fn try_from(r: ProductRecord) -> DbResult<Self> {
        let discount_percentage =
            validate_discount_percentage(r.discount_percentage).map_err(|_| DbError::Decode {
                column: "products.discount_percentage".to_string(),
                value: r.discount_percentage.to_string(),
            })?;

        Ok(Product {
            id: r.id,
            sku: r.sku,
            name: r.name,
            slug: r.slug,
            generic_name: r.generic_name,
            base_price: Money::from_centavos(r.base_price),
            discount_percentage,
            stock_quantity: r.stock_quantity,
            max_order_quantity: r.max_order_quantity,
            min_order_quantity: r.min_order_quantity,
            requires_prescription: r.requires_prescription,
            product_type: r.product_type,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        debug!(product_id = %id, "Fetching product");
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let record: Option<ProductRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Product::try_from).transpose()
    }

    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        debug!(slug = %slug, "Fetching product by slug");
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = ?");
        let record: Option<ProductRecord> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Product::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id) but a missing row is an error.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Active products by name, for catalog listings.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?"
        );
        let records: Vec<ProductRecord> = sqlx::query_as(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Product::try_from).collect()
    }

    /// Imports one catalog row.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");
        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, slug, generic_name, base_price, discount_percentage,
                stock_quantity, max_order_quantity, min_order_quantity,
                requires_prescription, product_type, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.generic_name)
        .bind(product.base_price.centavos())
        .bind(product.discount_percentage as i64)
        .bind(product.stock_quantity)
        .bind(product.max_order_quantity)
        .bind(product.min_order_quantity)
        .bind(product.requires_prescription)
        .bind(product.product_type)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&product.sku))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ProductRecord;
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use chrono::Utc;
    use pharmaline_core::{Money, Product, ProductType};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let db = db().await;
        let repo = db.products();
        let product = Product::new("p-amox", "AMOX-500", "Amoxicillin 500mg", Money::from_centavos(1_250))
            .with_discount(10)
            .with_stock(40)
            .with_max_order_quantity(6)
            .with_generic_name("Amoxicillin Trihydrate")
            .requiring_prescription();
        repo.insert(&product).await.unwrap();

        let by_id = repo.get_by_id("p-amox").await.unwrap().unwrap();
        assert_eq!(by_id.base_price, Money::from_centavos(1_250));
        assert_eq!(by_id.discount_percentage, 10);
        assert_eq!(by_id.max_order_quantity, Some(6));
        assert_eq!(by_id.product_type, ProductType::Prescription);
        assert!(by_id.requires_prescription);

        let by_slug = repo.get_by_slug("amoxicillin-500mg").await.unwrap().unwrap();
        assert_eq!(by_slug.id, "p-amox");

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert!(repo.require("missing").await.is_err());
    }

    fn record(discount_percentage: i64) -> ProductRecord {
        ProductRecord {
            id: "p-zinc".to_string(),
            sku: "ZINC-20".to_string(),
            name: "Zinc 20mg".to_string(),
            slug: "zinc-20mg".to_string(),
            generic_name: None,
            base_price: 800,
            discount_percentage,
            stock_quantity: 12,
            max_order_quantity: None,
            min_order_quantity: None,
            requires_prescription: false,
            product_type: ProductType::Otc,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_discount_out_of_range_fails_decode() {
        assert_eq!(Product::try_from(record(25)).unwrap().discount_percentage, 25);

        for bad in [-1, 101, 300] {
            match Product::try_from(record(bad)) {
                Err(DbError::Decode { column, value }) => {
                    assert_eq!(column, "products.discount_percentage");
                    assert_eq!(value, bad.to_string());
                }
                other => panic!("expected decode error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&Product::new("a", "SKU-1", "First", Money::zero()))
            .await
            .unwrap();
        let err = repo
            .insert(&Product::new("b", "SKU-1", "Second", Money::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "sku"));
    }

    #[tokio::test]
    async fn test_list_active_skips_inactive() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&Product::new("a", "A", "Ascorbic Acid", Money::zero()))
            .await
            .unwrap();
        repo.insert(&Product::new("b", "B", "Biogesic", Money::zero()).inactive())
            .await
            .unwrap();

        let active = repo.list_active(10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].sku, "A");
    }
}
