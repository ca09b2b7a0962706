//! Discovery ledger: append-only facts about where categories and products
//! were first seen.
//!
//! Both writes are insert-if-absent, so re-discovering the same URL from
//! another page is a silent no-op. This is the layer that keeps one leaf
//! URL from being fetched once per inbound link.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::domain::StatusCounts;
use crate::infrastructure::database_connection::unix_ts;

#[derive(Clone)]
pub struct DiscoveryRepository {
    pool: SqlitePool,
}

impl DiscoveryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a category sighting. First discovery wins; never updated.
    pub async fn insert_category(&self, url: &str, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO categories(url, name, discovered_at) VALUES(?, ?, ?)")
            .bind(url)
            .bind(name)
            .bind(unix_ts())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a product sighting on a listing page. The first discovery's
    /// title and owning category are retained for good.
    pub async fn insert_product_discovery(
        &self,
        url: &str,
        title: &str,
        category_url: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO product_discovery(url, title, category_url, discovered_at) VALUES(?, ?, ?, ?)",
        )
        .bind(url)
        .bind(title)
        .bind(category_url)
        .bind(unix_ts())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Owning category for a discovered product, if any.
    pub async fn category_url_for_product(&self, url: &str) -> Result<Option<String>> {
        let row: Option<Option<String>> =
            sqlx::query_scalar("SELECT category_url FROM product_discovery WHERE url=?")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.flatten())
    }

    /// Progress of one category: how many of its discovered products are
    /// done / pending / error. Reporting only, never a control decision.
    pub async fn product_counts_for_category(&self, category_url: &str) -> Result<StatusCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM product_discovery WHERE category_url = ?1) AS total,
                COALESCE(SUM(status='done'), 0) AS done,
                COALESCE(SUM(status='pending'), 0) AS pending,
                COALESCE(SUM(status='error'), 0) AS error
            FROM queue
            WHERE kind='product'
              AND url IN (SELECT url FROM product_discovery WHERE category_url = ?1)
            "#,
        )
        .bind(category_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            total: row.get("total"),
            done: row.get("done"),
            pending: row.get("pending"),
            error: row.get("error"),
        })
    }
}
