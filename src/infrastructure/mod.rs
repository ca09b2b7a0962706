//! Infrastructure: storage, HTTP, extraction, configuration and logging.

pub mod config;
pub mod database_connection;
pub mod discovery_repository;
pub mod handlers;
pub mod http_client;
pub mod logging;
pub mod parsing;
pub mod product_repository;
pub mod queue_repository;

pub use database_connection::{unix_ts, DatabaseConnection};
pub use discovery_repository::DiscoveryRepository;
pub use product_repository::ProductRepository;
pub use queue_repository::QueueRepository;
