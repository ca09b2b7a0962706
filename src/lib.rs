//! Resumable parts-catalog crawler.
//!
//! A small pool of concurrent workers walks a hierarchical site (catalog →
//! categories → paginated listings → product pages). All coordination goes
//! through one SQLite database in WAL mode: a durable work queue with an
//! atomic claim-next reservation protocol, an idempotent discovery ledger
//! and an upsert-by-URL result store. The crawl survives interruption; a
//! separate repair binary requeues corrupt results and failed items.

pub mod application;
pub mod domain;
pub mod infrastructure;
