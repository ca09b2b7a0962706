//! Production handler implementations: HTTP fetch + HTML extraction.
//!
//! One struct implements all three handler seams, so the worker pool only
//! needs a single collaborator for live crawling. Failures to fetch are
//! item-level (`HandlerError::Fetch`); the store never sees raw reqwest
//! errors.

use async_trait::async_trait;

use crate::domain::{
    CatalogHandler, CategoryHandler, CategoryLink, CategoryPage, HandlerError, HandlerResult,
    ProductHandler, ProductRecord,
};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing;

#[derive(Clone)]
pub struct SiteHandlers {
    http: HttpClient,
}

impl SiteHandlers {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch(&self, url: &str) -> HandlerResult<String> {
        self.http
            .fetch_text(url)
            .await
            .map_err(|e| HandlerError::Fetch(format!("{e:#}")))
    }
}

#[async_trait]
impl CatalogHandler for SiteHandlers {
    async fn fetch_categories(&self, catalog_url: &str) -> HandlerResult<Vec<CategoryLink>> {
        let html = self.fetch(catalog_url).await?;
        parsing::catalog::parse_catalog_page(&html, catalog_url)
            .map_err(|e| HandlerError::Other(format!("{e:#}")))
    }
}

#[async_trait]
impl CategoryHandler for SiteHandlers {
    async fn fetch_listing_page(&self, page_url: &str) -> HandlerResult<CategoryPage> {
        let html = self.fetch(page_url).await?;
        parsing::category::parse_listing_page(&html, page_url)
            .map_err(|e| HandlerError::Other(format!("{e:#}")))
    }
}

#[async_trait]
impl ProductHandler for SiteHandlers {
    async fn fetch_product(
        &self,
        product_url: &str,
        category_url: Option<&str>,
    ) -> HandlerResult<ProductRecord> {
        let html = self.fetch(product_url).await?;
        parsing::product::parse_product_page(&html, product_url, category_url)
    }
}
