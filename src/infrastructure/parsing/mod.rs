//! Field extraction from rendered pages.
//!
//! The extraction collaborator of the queue engine: each submodule turns a
//! page's HTML into structured link/record data. Shared here: URL
//! canonicalization and the price/stock text parsers.

pub mod catalog;
pub mod category;
pub mod product;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([$€£])?\s*([0-9][0-9.,]*)").expect("valid price regex"));

static STOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\)").expect("valid stock regex"));

/// Normalize a URL into the identity form used as queue/store key:
/// fragment stripped, trailing slash trimmed (except the bare root path).
pub fn canonicalize_url(url: &str) -> String {
    let without_fragment = match url.split_once('#') {
        Some((before, _)) => before,
        None => url,
    };
    let path_is_root = Url::parse(without_fragment)
        .map(|u| u.path() == "/")
        .unwrap_or(false);
    if without_fragment.ends_with('/') && !path_is_root {
        without_fragment.trim_end_matches('/').to_string()
    } else {
        without_fragment.to_string()
    }
}

/// Resolve a possibly-relative `href` against `base` and canonicalize it.
pub fn resolve_link(base: &str, href: &str) -> Result<String> {
    let base_url = Url::parse(base).with_context(|| format!("invalid base URL {base}"))?;
    let joined = base_url
        .join(href)
        .with_context(|| format!("cannot resolve '{href}' against {base}"))?;
    Ok(canonicalize_url(joined.as_str()))
}

/// Pull a numeric price and ISO currency code out of display text like
/// `"$ 38.95"`. Unknown symbols default to USD, matching the site.
pub fn parse_price(text: &str) -> (Option<f64>, Option<&'static str>) {
    let Some(caps) = PRICE_RE.captures(text.trim()) else {
        return (None, None);
    };
    let symbol = caps.get(1).map(|m| m.as_str()).unwrap_or("$");
    let raw = match caps.get(2) {
        Some(m) => m.as_str().replace(',', ""),
        None => return (None, None),
    };
    match raw.parse::<f64>() {
        Ok(price) => {
            let currency = match symbol {
                "€" => "EUR",
                "£" => "GBP",
                _ => "USD",
            };
            (Some(price), Some(currency))
        }
        Err(_) => (None, None),
    }
}

/// Extract a stock count from text like `"In Stock (14)"`.
pub fn parse_stock(text: &str) -> Option<i64> {
    STOCK_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_fragment_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("https://x.com/a/b/#section"),
            "https://x.com/a/b"
        );
        assert_eq!(canonicalize_url("https://x.com/a/b"), "https://x.com/a/b");
        // Bare root keeps its slash.
        assert_eq!(canonicalize_url("https://x.com/"), "https://x.com/");
    }

    #[test]
    fn resolve_joins_relative_links() -> Result<()> {
        assert_eq!(
            resolve_link("https://x.com/catalog/", "../brakes/")?,
            "https://x.com/brakes"
        );
        assert_eq!(
            resolve_link("https://x.com/catalog", "https://y.com/p#frag")?,
            "https://y.com/p"
        );
        Ok(())
    }

    #[test]
    fn price_parsing_handles_symbols_and_thousands() {
        assert_eq!(parse_price("$1,299.99"), (Some(1299.99), Some("USD")));
        assert_eq!(parse_price("€ 42.50"), (Some(42.5), Some("EUR")));
        assert_eq!(parse_price("£9"), (Some(9.0), Some("GBP")));
        // Bare number defaults to USD.
        assert_eq!(parse_price("38.95"), (Some(38.95), Some("USD")));
        assert_eq!(parse_price("call for price"), (None, None));
    }

    #[test]
    fn stock_parsing_finds_parenthesized_count() {
        assert_eq!(parse_stock("In Stock (14)"), Some(14));
        assert_eq!(parse_stock("Out of stock"), None);
    }
}
