//! # Client Key/Value Store
//!
//! Durable string values keyed by name. The cart session keeps its
//! serialized cart here under one fixed key; last write wins.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use pharmaline_core::{CartStore, StoreResult};

#[derive(Debug, Clone)]
pub struct CartKvRepository {
    pool: SqlitePool,
}

impl CartKvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartKvRepository { pool }
    }

    pub async fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM client_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set_value(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Persisting client value");
        sqlx::query(
            r#"
            INSERT INTO client_kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_value(&self, key: &str) -> DbResult<()> {
        debug!(key = %key, "Removing client value");
        sqlx::query("DELETE FROM client_kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl CartStore for CartKvRepository {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.get_value(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        Ok(self.set_value(key, value).await?)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        Ok(self.remove_value(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_set_get_overwrite_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let kv = db.cart_store();

        assert_eq!(kv.get_value("pharma-line-cart").await.unwrap(), None);

        kv.set_value("pharma-line-cart", "{\"v\":1}").await.unwrap();
        kv.set_value("pharma-line-cart", "{\"v\":2}").await.unwrap();
        assert_eq!(
            kv.get_value("pharma-line-cart").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );

        kv.remove_value("pharma-line-cart").await.unwrap();
        assert_eq!(kv.get_value("pharma-line-cart").await.unwrap(), None);

        // removing an absent key is fine
        kv.remove_value("pharma-line-cart").await.unwrap();
    }
}
