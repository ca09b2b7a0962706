//! Result store: the final structured product table.
//!
//! Rows are upserted whole. On conflict every non-key column takes the new
//! value except `discovered_at`, which keeps its first-seen time. The
//! attribute map and fitment list travel as JSON payloads; fitment row
//! order is significant and preserved.

use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::domain::{FitmentRow, ProductRecord};
use crate::infrastructure::database_connection::unix_ts;

#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether a prior run already produced a result for this URL. The
    /// product handler short-circuits on true, which is what makes the
    /// crawl resumable across restarts.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM products WHERE url=? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Insert or fully overwrite the record for its URL.
    pub async fn upsert(&self, record: &ProductRecord) -> Result<()> {
        let attrs_json = serde_json::to_string(&record.attrs).context("serializing attrs")?;
        let fitment_json = serde_json::to_string(&record.fitment).context("serializing fitment")?;
        let now = unix_ts();

        sqlx::query(
            r#"
            INSERT INTO products(
                url, title, price, currency, part_number, brand, stock,
                prod_id, app_id, alt_sku, category_url,
                attrs_json, fitment_json, discovered_at, scraped_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title=excluded.title,
                price=excluded.price,
                currency=excluded.currency,
                part_number=excluded.part_number,
                brand=excluded.brand,
                stock=excluded.stock,
                prod_id=excluded.prod_id,
                app_id=excluded.app_id,
                alt_sku=excluded.alt_sku,
                category_url=excluded.category_url,
                attrs_json=excluded.attrs_json,
                fitment_json=excluded.fitment_json,
                scraped_at=excluded.scraped_at
            "#,
        )
        .bind(&record.url)
        .bind(&record.title)
        .bind(record.price)
        .bind(&record.currency)
        .bind(&record.part_number)
        .bind(&record.brand)
        .bind(record.stock)
        .bind(&record.prod_id)
        .bind(&record.app_id)
        .bind(&record.alt_sku)
        .bind(&record.category_url)
        .bind(&attrs_json)
        .bind(&fitment_json)
        .bind(record.discovered_at.unwrap_or(now))
        .bind(record.scraped_at.unwrap_or(now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            r#"
            SELECT url, title, price, currency, part_number, brand, stock,
                   prod_id, app_id, alt_sku, category_url,
                   attrs_json, fitment_json, discovered_at, scraped_at
            FROM products WHERE url=?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attrs: HashMap<String, String> = row
            .get::<Option<String>, _>("attrs_json")
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("decoding attrs_json")?
            .unwrap_or_default();
        let fitment: Vec<FitmentRow> = row
            .get::<Option<String>, _>("fitment_json")
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("decoding fitment_json")?
            .unwrap_or_default();

        Ok(Some(ProductRecord {
            url: row.get("url"),
            title: row.get("title"),
            price: row.get("price"),
            currency: row.get("currency"),
            part_number: row.get("part_number"),
            brand: row.get("brand"),
            stock: row.get("stock"),
            prod_id: row.get("prod_id"),
            app_id: row.get("app_id"),
            alt_sku: row.get("alt_sku"),
            category_url: row.get("category_url"),
            attrs,
            fitment,
            discovered_at: row.get("discovered_at"),
            scraped_at: row.get("scraped_at"),
        }))
    }
}
