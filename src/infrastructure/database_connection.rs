//! SQLite connection pool and schema management.
//!
//! One on-disk database holds the whole crawl state: the work queue, the
//! lock table, the discovery ledger and the result store. WAL mode lets the
//! worker pool read and write concurrently from one process without
//! external locking.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (creating if necessary) the crawl database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .with_context(|| format!("opening sqlite database {}", path.display()))?;

        Ok(Self { pool })
    }

    /// Open an in-memory database. Handy for the fastest tests; most tests
    /// use a tempfile so multiple pool connections see one database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let create_queue_sql = r#"
            CREATE TABLE IF NOT EXISTS queue (
                url TEXT PRIMARY KEY,
                kind TEXT CHECK(kind IN ('catalog','category','product')) NOT NULL,
                status TEXT CHECK(status IN ('pending','done','error')) NOT NULL DEFAULT 'pending',
                tries INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                updated_at REAL
            )
        "#;

        let create_locks_sql = r#"
            CREATE TABLE IF NOT EXISTS locks (
                url TEXT PRIMARY KEY,
                ts REAL
            )
        "#;

        let create_categories_sql = r#"
            CREATE TABLE IF NOT EXISTS categories (
                url TEXT PRIMARY KEY,
                name TEXT,
                discovered_at REAL
            )
        "#;

        let create_product_discovery_sql = r#"
            CREATE TABLE IF NOT EXISTS product_discovery (
                url TEXT PRIMARY KEY,
                title TEXT,
                category_url TEXT,
                discovered_at REAL
            )
        "#;

        let create_products_sql = r#"
            CREATE TABLE IF NOT EXISTS products (
                url TEXT PRIMARY KEY,
                title TEXT,
                price REAL,
                currency TEXT,
                part_number TEXT,
                brand TEXT,
                stock INTEGER,
                prod_id TEXT,
                app_id TEXT,
                alt_sku TEXT,
                category_url TEXT,
                attrs_json TEXT,
                fitment_json TEXT,
                discovered_at REAL,
                scraped_at REAL
            )
        "#;

        sqlx::query(create_queue_sql).execute(&self.pool).await?;
        sqlx::query(create_locks_sql).execute(&self.pool).await?;
        sqlx::query(create_categories_sql).execute(&self.pool).await?;
        sqlx::query(create_product_discovery_sql)
            .execute(&self.pool)
            .await?;
        sqlx::query(create_products_sql).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_status ON queue(status)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_queue_kind_status ON queue(kind, status)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_product_discovery_category ON product_discovery(category_url)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current time as unix seconds, the timestamp format of every table.
pub fn unix_ts() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
