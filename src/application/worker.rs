//! The worker pool: cooperative consumers of the shared work queue.
//!
//! Each worker loops reserve → dispatch → record. Workers share no mutable
//! state besides the store; mutual exclusion comes entirely from the
//! reservation protocol. A worker stops once a reservation comes back
//! empty while nothing is pending, so the pool drains itself when the
//! discovery graph is exhausted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{CatalogHandler, CategoryHandler, ProductHandler, WorkKind};
use crate::infrastructure::config::WorkerConfig;
use crate::infrastructure::{DiscoveryRepository, ProductRepository, QueueRepository};

#[derive(Clone)]
pub struct WorkerPool {
    queue: QueueRepository,
    discovery: DiscoveryRepository,
    products: ProductRepository,
    catalog_handler: Arc<dyn CatalogHandler>,
    category_handler: Arc<dyn CategoryHandler>,
    product_handler: Arc<dyn ProductHandler>,
    config: WorkerConfig,
    shutdown: CancellationToken,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: QueueRepository,
        discovery: DiscoveryRepository,
        products: ProductRepository,
        catalog_handler: Arc<dyn CatalogHandler>,
        category_handler: Arc<dyn CategoryHandler>,
        product_handler: Arc<dyn ProductHandler>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            discovery,
            products,
            catalog_handler,
            category_handler,
            product_handler,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops all workers at their next loop iteration.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run all workers to completion. Returns once every worker has
    /// drained out or the pool was cancelled.
    pub async fn run(&self) -> Result<()> {
        info!("starting {} workers", self.config.max_workers);

        let mut handles = Vec::new();
        for worker_id in 0..self.config.max_workers {
            let pool = self.clone();
            handles.push(tokio::spawn(async move { pool.run_worker(worker_id).await }));
        }

        for handle in handles {
            handle.await.context("worker task panicked")??;
        }

        info!("all workers finished");
        Ok(())
    }

    async fn run_worker(&self, worker_id: usize) -> Result<()> {
        debug!("worker {worker_id} started");
        let mut idle_rounds: u64 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                debug!("worker {worker_id} cancelled");
                break;
            }

            let Some((url, kind)) = self.queue.reserve_next().await? else {
                // Empty by itself is not exhaustion: a lock may represent
                // in-flight work that will fan out more items.
                if self.queue.count_pending().await? == 0 {
                    debug!("worker {worker_id} drained");
                    break;
                }
                idle_rounds += 1;
                let backoff = Duration::from_millis(
                    (self.config.idle_backoff_base_ms
                        + idle_rounds * self.config.idle_backoff_step_ms)
                        .min(self.config.idle_backoff_max_ms),
                );
                tokio::select! {
                    () = tokio::time::sleep(backoff) => {}
                    () = self.shutdown.cancelled() => break,
                }
                continue;
            };

            idle_rounds = 0;
            match self.dispatch(&url, kind).await {
                Ok(()) => self.queue.record_done(&url).await?,
                Err(e) => {
                    warn!("worker {worker_id}: {kind} {url} failed: {e:#}");
                    self.queue.record_error(&url, &format!("{e:#}")).await?;
                    // Brief pause so one broken page doesn't hot-loop the
                    // worker through a burst of failures.
                    let pause = self.config.error_pause_ms
                        + fastrand::u64(0..=self.config.error_pause_jitter_ms);
                    tokio::time::sleep(Duration::from_millis(pause)).await;
                }
            }
        }

        debug!("worker {worker_id} stopped");
        Ok(())
    }

    /// Route one reserved item to its handler. Any error here, expected or
    /// not, is an item-level failure; the caller records it.
    async fn dispatch(&self, url: &str, kind: WorkKind) -> Result<()> {
        match kind {
            WorkKind::Catalog => self.handle_catalog(url).await,
            WorkKind::Category => self.handle_category(url).await,
            WorkKind::Product => self.handle_product(url).await,
        }
    }

    async fn handle_catalog(&self, url: &str) -> Result<()> {
        let categories = self.catalog_handler.fetch_categories(url).await?;
        info!("catalog {url}: {} categories found", categories.len());

        for link in categories {
            self.discovery.insert_category(&link.url, &link.name).await?;
            self.queue
                .enqueue_if_absent(&link.url, WorkKind::Category)
                .await?;
        }
        Ok(())
    }

    async fn handle_category(&self, url: &str) -> Result<()> {
        let counts = self.queue.counts_by_kind(WorkKind::Category).await?;
        info!("category {}/{} -> {url}", counts.done + 1, counts.total);

        let mut page_num = 1u32;
        let mut current = url.to_string();
        let mut found = 0usize;

        loop {
            let page = self.category_handler.fetch_listing_page(&current).await?;
            found += page.products.len();
            debug!(
                "category {url} page {page_num}: {} products (accumulated {found})",
                page.products.len()
            );

            for product in &page.products {
                self.discovery
                    .insert_product_discovery(&product.url, &product.title, url)
                    .await?;
                self.queue
                    .enqueue_if_absent(&product.url, WorkKind::Product)
                    .await?;
            }

            match page.next_page {
                Some(next) => {
                    current = next;
                    page_num += 1;
                }
                None => break,
            }
        }

        info!("category {url} done: {found} products over {page_num} pages");
        Ok(())
    }

    async fn handle_product(&self, url: &str) -> Result<()> {
        // A prior run may already hold the result; don't fetch it twice.
        if self.products.exists(url).await? {
            debug!("product {url} already resolved");
            return Ok(());
        }

        let category_url = self.discovery.category_url_for_product(url).await?;
        let record = self
            .product_handler
            .fetch_product(url, category_url.as_deref())
            .await?;
        self.products.upsert(&record).await?;

        if let Some(category) = category_url {
            let progress = self.discovery.product_counts_for_category(&category).await?;
            info!(
                "product {}/{} saved: {} | {} | {}",
                progress.done + 1,
                progress.total,
                record.title.as_deref().unwrap_or("?"),
                record.part_number.as_deref().unwrap_or("n/a"),
                match (record.price, record.currency.as_deref()) {
                    (Some(price), Some(currency)) => format!("{price} {currency}"),
                    _ => "n/a".to_string(),
                },
            );
        }
        Ok(())
    }
}
