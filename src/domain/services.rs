//! Handler seams between the coordination engine and the site.
//!
//! The queue engine never talks to the network itself. Each work kind is
//! dispatched to one of these traits; the production implementations live in
//! the infrastructure layer and are swappable (tests drive the worker pool
//! with in-memory stubs).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::{CategoryLink, CategoryPage, ProductRecord};

/// Item-level handler failure.
///
/// These are recorded against the work item as a bounded diagnostic and are
/// never fatal to the process. Store-level failures take the `anyhow` path
/// at the worker loop instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The product page rendered without its detail container.
    #[error("product_container_not_found")]
    ContainerNotFound,

    /// The detail container exists but carries no title.
    #[error("title_missing")]
    TitleMissing,

    /// The page could not be fetched at all.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A link on the page could not be resolved to an absolute URL.
    #[error("url resolution failed: {0}")]
    UrlResolution(String),

    #[error("{0}")]
    Other(String),
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Expands the catalog root into category links.
#[async_trait]
pub trait CatalogHandler: Send + Sync {
    /// Returns the categories linked from the catalog page, with absolute
    /// canonical URLs.
    async fn fetch_categories(&self, catalog_url: &str) -> HandlerResult<Vec<CategoryLink>>;
}

/// Walks one page of a paginated category listing.
#[async_trait]
pub trait CategoryHandler: Send + Sync {
    /// Returns the product links on `page_url` and the next-page URL if the
    /// listing continues. The caller drives the pagination loop.
    async fn fetch_listing_page(&self, page_url: &str) -> HandlerResult<CategoryPage>;
}

/// Fetches and extracts one product detail page.
#[async_trait]
pub trait ProductHandler: Send + Sync {
    /// Produces a fully-populated record, or a failure code when the page
    /// yields no usable structured data.
    async fn fetch_product(
        &self,
        product_url: &str,
        category_url: Option<&str>,
    ) -> HandlerResult<ProductRecord>;
}
