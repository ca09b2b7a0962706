//! Crawler binary: seed the catalog root and run the worker pool until the
//! queue drains or Ctrl-C is pressed.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use partsgeek_crawler::application::WorkerPool;
use partsgeek_crawler::domain::WorkKind;
use partsgeek_crawler::infrastructure::config::AppConfig;
use partsgeek_crawler::infrastructure::handlers::SiteHandlers;
use partsgeek_crawler::infrastructure::http_client::HttpClient;
use partsgeek_crawler::infrastructure::logging::init_logging;
use partsgeek_crawler::infrastructure::{
    DatabaseConnection, DiscoveryRepository, ProductRepository, QueueRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = AppConfig::load(AppConfig::default_path()).await?;
    info!("database: {}", config.database_path.display());

    let db = DatabaseConnection::new(&config.database_path).await?;
    db.migrate().await?;
    let pool = db.pool().clone();

    let queue = QueueRepository::new(pool.clone())
        .with_lock_lease_secs(config.worker.lock_lease_secs as f64);
    let discovery = DiscoveryRepository::new(pool.clone());
    let products = ProductRepository::new(pool.clone());

    // Idempotent: re-running against an existing database resumes it.
    queue
        .enqueue_if_absent(&config.catalog_url, WorkKind::Catalog)
        .await?;
    info!("seeded catalog root {}", config.catalog_url);

    let handlers = Arc::new(SiteHandlers::new(HttpClient::new(&config.http)?));
    let workers = WorkerPool::new(
        queue.clone(),
        discovery,
        products,
        handlers.clone(),
        handlers.clone(),
        handlers,
        config.worker.clone(),
    );

    let shutdown = workers.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping workers after current items");
            shutdown.cancel();
        }
    });

    workers.run().await?;

    for kind in [WorkKind::Catalog, WorkKind::Category, WorkKind::Product] {
        let counts = queue.counts_by_kind(kind).await?;
        info!(
            "{kind}: {} total, {} done, {} pending, {} error",
            counts.total, counts.done, counts.pending, counts.error
        );
    }
    Ok(())
}
