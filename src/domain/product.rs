//! Product domain entities: discovery links, listing pages and the final
//! structured record produced by a successful product fetch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A category link found on the catalog page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub url: String,
    pub name: String,
}

/// A product link found on a category listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLink {
    pub url: String,
    pub title: String,
}

/// One listing page worth of product links plus the pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryPage {
    pub products: Vec<ProductLink>,
    /// Absolute URL of the next page, if the listing continues.
    pub next_page: Option<String>,
}

/// One row of the vehicle-fitment table on a product page.
///
/// Row order is significant and must survive storage round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitmentRow {
    pub vehicle: Option<String>,
    pub sub_model: Option<String>,
    pub engine: Option<String>,
}

/// Final structured record for one product URL.
///
/// Upserted whole into the result store; never partially updated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub part_number: Option<String>,
    pub brand: Option<String>,
    pub stock: Option<i64>,
    pub prod_id: Option<String>,
    pub app_id: Option<String>,
    pub alt_sku: Option<String>,
    pub category_url: Option<String>,
    pub attrs: HashMap<String, String>,
    pub fitment: Vec<FitmentRow>,
    /// Unix seconds of first discovery; preserved across re-scrapes.
    pub discovered_at: Option<f64>,
    /// Unix seconds of the scrape that produced this record.
    pub scraped_at: Option<f64>,
}

impl ProductRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
