//! HTTP client for page fetching.
//!
//! This is the page-rendering collaborator of the queue engine, kept
//! deliberately thin: fetch a URL, return its body text. Anything the site
//! renders client-side is out of reach of this client and surfaces as a
//! `product_container_not_found` item error downstream.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;

use crate::infrastructure::config::HttpConfig;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the response body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }

        response
            .text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}
