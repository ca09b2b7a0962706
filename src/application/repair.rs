//! Offline repair: requeue corrupt results and grant error amnesty.
//!
//! Runs against the same store as the crawler but independently of it.
//! Two passes, each in its own `BEGIN IMMEDIATE` transaction:
//!
//! 1. Detect "empty" product results (no usable structured data), delete
//!    them and force their queue items back to pending. This is how pages
//!    mis-extracted by a since-fixed bug get a second chance.
//! 2. Reset every errored queue item to pending with tries cleared,
//!    regardless of failure reason, dropping any stale lock.

use anyhow::Result;
use sqlx::pool::PoolConnection;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::info;

use crate::infrastructure::config::RepairPolicy;
use crate::infrastructure::unix_ts;

/// Counts reported by one repair run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Empty results detected (and deleted).
    pub empty_found: usize,
    /// Their queue items forced back to pending.
    pub requeued: usize,
    /// Errored items reset to pending by the amnesty pass.
    pub amnestied: usize,
}

pub struct RepairTool {
    pool: SqlitePool,
    policy: RepairPolicy,
}

impl RepairTool {
    pub fn new(pool: SqlitePool, policy: RepairPolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn run(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();

        let empty_urls = self.requeue_empty_results().await?;
        report.empty_found = empty_urls;
        report.requeued = empty_urls;
        info!("deleted {empty_urls} empty results and re-queued them");

        report.amnestied = self.requeue_all_errors().await?;
        info!("re-queued {} items from error", report.amnestied);

        Ok(report)
    }

    /// Pass 1: delete empty results, force their items back to pending.
    async fn requeue_empty_results(&self) -> Result<usize> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = self.requeue_empty_in_tx(&mut conn).await;
        finish_tx(&mut conn, result).await
    }

    async fn requeue_empty_in_tx(&self, conn: &mut PoolConnection<Sqlite>) -> Result<usize> {
        let urls = self.find_empty_result_urls(conn).await?;
        let ts = unix_ts();

        for url in &urls {
            sqlx::query("DELETE FROM products WHERE url=?")
                .bind(url)
                .execute(&mut **conn)
                .await?;
            sqlx::query(
                r#"
                UPDATE queue
                   SET status='pending', tries=0, last_error=NULL, updated_at=?
                 WHERE url=? AND status!='pending'
                "#,
            )
            .bind(ts)
            .bind(url)
            .execute(&mut **conn)
            .await?;
            sqlx::query(
                "INSERT OR IGNORE INTO queue(url, kind, status, updated_at) VALUES(?, 'product', 'pending', ?)",
            )
            .bind(url)
            .bind(ts)
            .execute(&mut **conn)
            .await?;
            sqlx::query("DELETE FROM locks WHERE url=?")
                .bind(url)
                .execute(&mut **conn)
                .await?;
        }

        Ok(urls.len())
    }

    /// A result is "empty" when its title is blank or a known placeholder,
    /// or when it has no price and no part number, brand or attributes.
    /// Approximate by design; the placeholder list is configurable.
    async fn find_empty_result_urls(
        &self,
        conn: &mut PoolConnection<Sqlite>,
    ) -> Result<Vec<String>> {
        let placeholders = vec!["?"; self.policy.placeholder_titles.len().max(1)].join(",");
        let sql = format!(
            r#"
            SELECT url FROM products
            WHERE
                (title IS NULL OR trim(title) = '' OR title IN ({placeholders}))
                OR (
                    price IS NULL
                    AND IFNULL(trim(part_number), '') = ''
                    AND IFNULL(trim(brand), '') = ''
                    AND (attrs_json IS NULL OR attrs_json = '' OR attrs_json = '{{}}')
                )
            "#
        );

        let mut query = sqlx::query(&sql);
        if self.policy.placeholder_titles.is_empty() {
            // Keep the placeholder slot harmless when the list is empty.
            query = query.bind("");
        } else {
            for title in &self.policy.placeholder_titles {
                query = query.bind(title);
            }
        }

        let rows = query.fetch_all(&mut **conn).await?;
        Ok(rows.into_iter().map(|row| row.get("url")).collect())
    }

    /// Pass 2: error amnesty.
    async fn requeue_all_errors(&self) -> Result<usize> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = async {
            let rows = sqlx::query("SELECT url FROM queue WHERE status='error'")
                .fetch_all(&mut *conn)
                .await?;
            let urls: Vec<String> = rows.into_iter().map(|row| row.get("url")).collect();

            sqlx::query(
                r#"
                UPDATE queue
                   SET status='pending', tries=0, last_error=NULL, updated_at=?
                 WHERE status='error'
                "#,
            )
            .bind(unix_ts())
            .execute(&mut *conn)
            .await?;

            for url in &urls {
                sqlx::query("DELETE FROM locks WHERE url=?")
                    .bind(url)
                    .execute(&mut *conn)
                    .await?;
            }
            Ok(urls.len())
        }
        .await;

        finish_tx(&mut conn, result).await
    }
}

async fn finish_tx<T>(conn: &mut PoolConnection<Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT").execute(&mut **conn).await?;
            Ok(value)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut **conn).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProductRecord, WorkKind};
    use crate::infrastructure::{
        DatabaseConnection, ProductRepository, QueueRepository,
    };
    use tempfile::TempDir;

    struct Fixture {
        pool: SqlitePool,
        queue: QueueRepository,
        products: ProductRepository,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = DatabaseConnection::new(dir.path().join("repair.db"))
            .await
            .expect("open db");
        db.migrate().await.expect("migrate");
        let pool = db.pool().clone();
        Fixture {
            queue: QueueRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            pool,
            _dir: dir,
        }
    }

    fn tool(pool: &SqlitePool) -> RepairTool {
        RepairTool::new(pool.clone(), RepairPolicy::default())
    }

    async fn lock_count(pool: &SqlitePool, url: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM locks WHERE url=?")
            .bind(url)
            .fetch_one(pool)
            .await
            .expect("count locks")
    }

    #[tokio::test]
    async fn blank_title_result_is_deleted_and_requeued() -> Result<()> {
        let f = fixture().await;

        let mut record = ProductRecord::new("p-blank");
        record.title = Some("   ".to_string());
        record.price = Some(10.0);
        f.products.upsert(&record).await?;

        f.queue.enqueue_if_absent("p-blank", WorkKind::Product).await?;
        f.queue.reserve_next().await?.expect("reserved");
        f.queue.record_done("p-blank").await?;
        // Simulate a lock left behind by a crashed worker.
        sqlx::query("INSERT INTO locks(url, ts) VALUES('p-blank', 0)")
            .execute(&f.pool)
            .await?;

        let report = tool(&f.pool).run().await?;
        assert_eq!(report.empty_found, 1);
        assert_eq!(report.requeued, 1);

        assert!(f.products.find_by_url("p-blank").await?.is_none());
        assert_eq!(lock_count(&f.pool, "p-blank").await, 0);

        let row = sqlx::query("SELECT status, tries, last_error FROM queue WHERE url='p-blank'")
            .fetch_one(&f.pool)
            .await?;
        assert_eq!(row.get::<String, _>("status"), "pending");
        assert_eq!(row.get::<i64, _>("tries"), 0);
        assert_eq!(row.get::<Option<String>, _>("last_error"), None);
        Ok(())
    }

    #[tokio::test]
    async fn currency_placeholder_title_counts_as_empty() -> Result<()> {
        let f = fixture().await;

        let mut record = ProductRecord::new("p-usd");
        record.title = Some("USD".to_string());
        record.price = Some(5.0);
        record.part_number = Some("PN".to_string());
        f.products.upsert(&record).await?;

        let report = tool(&f.pool).run().await?;
        assert_eq!(report.empty_found, 1);
        // The queue row is created when absent.
        let status: String = sqlx::query_scalar("SELECT status FROM queue WHERE url='p-usd'")
            .fetch_one(&f.pool)
            .await?;
        assert_eq!(status, "pending");
        Ok(())
    }

    #[tokio::test]
    async fn priceless_record_without_identity_counts_as_empty() -> Result<()> {
        let f = fixture().await;

        let mut empty = ProductRecord::new("p-empty");
        empty.title = Some("Some Part".to_string());
        f.products.upsert(&empty).await?;

        // Priceless but with a part number: usable, must survive.
        let mut keeper = ProductRecord::new("p-keeper");
        keeper.title = Some("Other Part".to_string());
        keeper.part_number = Some("PN-1".to_string());
        f.products.upsert(&keeper).await?;

        let report = tool(&f.pool).run().await?;
        assert_eq!(report.empty_found, 1);
        assert!(f.products.find_by_url("p-empty").await?.is_none());
        assert!(f.products.find_by_url("p-keeper").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn attribute_bearing_record_is_not_empty() -> Result<()> {
        let f = fixture().await;

        let mut record = ProductRecord::new("p-attrs");
        record.title = Some("Part With Specs".to_string());
        record
            .attrs
            .insert("Position".to_string(), "Front".to_string());
        f.products.upsert(&record).await?;

        let report = tool(&f.pool).run().await?;
        assert_eq!(report.empty_found, 0);
        Ok(())
    }

    #[tokio::test]
    async fn error_amnesty_resets_all_failed_items() -> Result<()> {
        let f = fixture().await;

        f.queue.enqueue_if_absent("e1", WorkKind::Product).await?;
        f.queue.enqueue_if_absent("e2", WorkKind::Category).await?;
        f.queue.enqueue_if_absent("ok", WorkKind::Product).await?;
        f.queue.record_error("e1", "title_missing").await?;
        f.queue.record_error("e2", "fetch failed: 503").await?;
        f.queue.record_done("ok").await?;

        let report = tool(&f.pool).run().await?;
        assert_eq!(report.amnestied, 2);

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM queue WHERE status='pending'")
                .fetch_one(&f.pool)
                .await?;
        assert_eq!(pending, 2);
        // Done items are untouched by amnesty.
        let done: String = sqlx::query_scalar("SELECT status FROM queue WHERE url='ok'")
            .fetch_one(&f.pool)
            .await?;
        assert_eq!(done, "done");

        // Amnestied items are reservable again.
        assert!(f.queue.reserve_next().await?.is_some());
        Ok(())
    }
}
