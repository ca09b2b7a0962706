//! Work queue repository: the item store, the lock table and the atomic
//! claim-next reservation protocol.
//!
//! This is the load-bearing piece of the whole crawler. `reserve_next` runs
//! its candidate check and lock insertion inside one `BEGIN IMMEDIATE`
//! transaction so two concurrent workers can never claim the same URL.

use anyhow::{anyhow, Result};
use sqlx::pool::PoolConnection;
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::domain::{StatusCounts, WorkKind};
use crate::infrastructure::database_connection::unix_ts;

/// Diagnostics longer than this are truncated before storage so one verbose
/// failure cannot bloat the queue table.
const MAX_ERROR_LEN: usize = 1000;

/// Locks older than this are treated as abandoned by a crashed worker and
/// become reclaimable by `reserve_next`.
const DEFAULT_LOCK_LEASE_SECS: f64 = 600.0;

#[derive(Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
    lock_lease_secs: f64,
}

impl QueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            lock_lease_secs: DEFAULT_LOCK_LEASE_SECS,
        }
    }

    /// Override the lock lease. A lock held longer than this is assumed to
    /// belong to a dead worker.
    pub fn with_lock_lease_secs(mut self, secs: f64) -> Self {
        self.lock_lease_secs = secs;
        self
    }

    /// Insert a pending item if the URL was never seen; no-op otherwise.
    ///
    /// Safe to call repeatedly for the same URL, which is the normal case
    /// when the same product is reachable from several listing pages.
    pub async fn enqueue_if_absent(&self, url: &str, kind: WorkKind) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO queue(url, kind, status, updated_at) VALUES(?, ?, 'pending', ?)",
        )
        .bind(url)
        .bind(kind.as_str())
        .bind(unix_ts())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of items still waiting for a worker. The termination oracle.
    pub async fn count_pending(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue WHERE status='pending'")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Mark the item done and release its lock.
    ///
    /// Succeeds even when no lock exists for the URL.
    pub async fn record_done(&self, url: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE queue SET status='done', updated_at=? WHERE url=?")
            .bind(unix_ts())
            .bind(url)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM locks WHERE url=?")
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Mark the item failed with a bounded diagnostic and release its lock.
    pub async fn record_error(&self, url: &str, message: &str) -> Result<()> {
        let truncated: String = message.chars().take(MAX_ERROR_LEN).collect();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE queue SET status='error', tries=tries+1, last_error=?, updated_at=? WHERE url=?",
        )
        .bind(&truncated)
        .bind(unix_ts())
        .bind(url)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM locks WHERE url=?")
            .bind(url)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Per-status tallies for one kind, read in a single statement so the
    /// numbers come from one snapshot.
    pub async fn counts_by_kind(&self, kind: WorkKind) -> Result<StatusCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(status='done'), 0) AS done,
                   COALESCE(SUM(status='pending'), 0) AS pending,
                   COALESCE(SUM(status='error'), 0) AS error
            FROM queue WHERE kind=?
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusCounts {
            total: row.get("total"),
            done: row.get("done"),
            pending: row.get("pending"),
            error: row.get("error"),
        })
    }

    /// Atomically claim the next eligible item.
    ///
    /// Candidate selection is the smallest `(kind priority, updated_at)`
    /// among pending rows without a live lock; the lock insert happens in
    /// the same `BEGIN IMMEDIATE` transaction as the check. An empty result
    /// does not by itself mean the queue is exhausted: an in-flight worker
    /// may still fan out new items.
    pub async fn reserve_next(&self) -> Result<Option<(String, WorkKind)>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match self.reserve_in_tx(&mut conn).await {
            Ok(candidate) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(candidate)
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn reserve_in_tx(
        &self,
        conn: &mut PoolConnection<Sqlite>,
    ) -> Result<Option<(String, WorkKind)>> {
        let now = unix_ts();
        let live_since = now - self.lock_lease_secs;

        let row = sqlx::query(
            r#"
            SELECT url, kind FROM queue
            WHERE status='pending'
              AND url NOT IN (SELECT url FROM locks WHERE ts > ?)
            ORDER BY CASE kind WHEN 'catalog' THEN 0 WHEN 'category' THEN 1 ELSE 2 END,
                     updated_at ASC
            LIMIT 1
            "#,
        )
        .bind(live_since)
        .fetch_optional(&mut **conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let url: String = row.get("url");
        let kind_col: String = row.get("kind");
        let kind = WorkKind::parse(&kind_col)
            .ok_or_else(|| anyhow!("queue row {url} has unknown kind '{kind_col}'"))?;

        // Upsert rather than plain insert: an expired lease leaves a stale
        // row behind, and reclaiming it means refreshing its timestamp.
        sqlx::query(
            "INSERT INTO locks(url, ts) VALUES(?, ?) ON CONFLICT(url) DO UPDATE SET ts=excluded.ts",
        )
        .bind(&url)
        .bind(now)
        .execute(&mut **conn)
        .await?;

        debug!("reserved {url} ({kind})");
        Ok(Some((url, kind)))
    }
}
