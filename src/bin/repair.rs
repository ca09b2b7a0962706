//! Repair binary: delete empty product results, requeue them, and grant
//! amnesty to every errored queue item. Run while the crawler is stopped.

use anyhow::Result;

use partsgeek_crawler::application::RepairTool;
use partsgeek_crawler::infrastructure::config::AppConfig;
use partsgeek_crawler::infrastructure::logging::init_logging;
use partsgeek_crawler::infrastructure::DatabaseConnection;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = AppConfig::load(AppConfig::default_path()).await?;
    let db = DatabaseConnection::new(&config.database_path).await?;
    db.migrate().await?;

    let tool = RepairTool::new(db.pool().clone(), config.repair.clone());
    let report = tool.run().await?;

    println!("Empty results found:  {}", report.empty_found);
    println!("Deleted + re-queued:  {}", report.requeued);
    println!("Re-queued from error: {}", report.amnestied);
    println!("Done.");
    Ok(())
}
