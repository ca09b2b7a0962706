//! Application configuration.
//!
//! Loaded from a JSON file when one exists, otherwise defaults. Every field
//! has a default so a partial config file stays valid as settings are
//! added.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database holding queue, locks, ledger and results.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Catalog root seeded as the first work item.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub repair: RepairPolicy,
}

/// Worker pool behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers sharing the store.
    pub max_workers: usize,

    /// Idle backoff when the queue has nothing claimable: starts at `base`,
    /// grows by `step` per idle round, capped at `max`.
    pub idle_backoff_base_ms: u64,
    pub idle_backoff_step_ms: u64,
    pub idle_backoff_max_ms: u64,

    /// Pause after an unexpected handler failure, plus up to `jitter` more.
    pub error_pause_ms: u64,
    pub error_pause_jitter_ms: u64,

    /// A lock older than this is treated as abandoned and reclaimable.
    pub lock_lease_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            idle_backoff_base_ms: 500,
            idle_backoff_step_ms: 100,
            idle_backoff_max_ms: 2000,
            error_pause_ms: 800,
            error_pause_jitter_ms: 400,
            lock_lease_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 20,
            user_agent: format!("partsgeek-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Tunable heuristic for the repair tool's empty-result detection.
///
/// Titles equal to one of these placeholders are a known extraction-bug
/// signature (the price cell bleeding into the title slot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairPolicy {
    pub placeholder_titles: Vec<String>,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            placeholder_titles: vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()],
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("partsgeek.sqlite3")
}

fn default_catalog_url() -> String {
    "https://www.partsgeek.com/catalog/".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            catalog_url: default_catalog_url(),
            worker: WorkerConfig::default(),
            http: HttpConfig::default(),
            repair: RepairPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Default config file location, next to the working directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from("crawler.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = AppConfig::load(dir.path().join("nope.json")).await?;
        assert_eq!(config.worker.max_workers, 5);
        assert_eq!(config.repair.placeholder_titles, ["USD", "EUR", "GBP"]);
        Ok(())
    }

    #[tokio::test]
    async fn partial_file_keeps_defaults_for_missing_sections() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("crawler.json");
        tokio::fs::write(&path, r#"{"catalog_url": "https://example.com/catalog"}"#).await?;

        let config = AppConfig::load(&path).await?;
        assert_eq!(config.catalog_url, "https://example.com/catalog");
        assert_eq!(config.worker.idle_backoff_max_ms, 2000);
        Ok(())
    }
}
