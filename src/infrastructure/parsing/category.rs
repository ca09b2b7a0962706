//! Category listing extraction: product links plus the pagination cursor.

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::{CategoryPage, ProductLink};
use crate::infrastructure::parsing::resolve_link;

static PRODUCT_LINKS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#whole main ul li > div:first-of-type a").expect("valid listing selector")
});

static PAGE_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#whole a").expect("valid anchor selector"));

/// Extract one listing page: product links (absolute canonical URLs) and
/// the next-page URL if the listing continues.
pub fn parse_listing_page(html: &str, base_url: &str) -> Result<CategoryPage> {
    let document = Html::parse_document(html);
    let mut page = CategoryPage::default();

    for anchor in document.select(&PRODUCT_LINKS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();
        match resolve_link(base_url, href.trim()) {
            Ok(url) => page.products.push(ProductLink { url, title }),
            Err(e) => warn!("skipping unresolvable product link '{href}': {e:#}"),
        }
    }

    page.next_page = find_next_page(&document, base_url);
    Ok(page)
}

/// The site marks its pagination link with `rel="next"`; older templates
/// only carry link text ("Next", or "След" on the localized variant).
fn find_next_page(document: &Html, base_url: &str) -> Option<String> {
    for anchor in document.select(&PAGE_ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let is_rel_next = anchor.value().attr("rel").is_some_and(|rel| rel == "next");
        let text = anchor.text().collect::<String>().trim().to_lowercase();
        if is_rel_next || text.contains("next") || text.contains("след") {
            return resolve_link(base_url, href.trim()).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <div id="whole"><main>
          <ul>
            <li><div><a href="/p/1001">Brake Pad Set</a></div><div class="price">$10</div></li>
            <li><div><a href="/p/1002">Brake Rotor</a></div></li>
          </ul>
          <nav><a rel="next" href="?page=2">2</a></nav>
        </main></div>
    "#;

    const LAST_PAGE_HTML: &str = r#"
        <div id="whole"><main>
          <ul><li><div><a href="/p/1003">Caliper</a></div></li></ul>
        </main></div>
    "#;

    #[test]
    fn extracts_products_and_next_page() -> Result<()> {
        let page = parse_listing_page(LISTING_HTML, "https://example.com/brakes")?;
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.products[0].url, "https://example.com/p/1001");
        assert_eq!(page.products[0].title, "Brake Pad Set");
        assert_eq!(
            page.next_page.as_deref(),
            Some("https://example.com/brakes?page=2")
        );
        Ok(())
    }

    #[test]
    fn text_only_next_link_is_recognized() -> Result<()> {
        let html = r#"
            <div id="whole"><main>
              <ul><li><div><a href="/p/1">P</a></div></li></ul>
              <a href="/brakes?page=3">Next »</a>
            </main></div>
        "#;
        let page = parse_listing_page(html, "https://example.com/brakes")?;
        assert_eq!(
            page.next_page.as_deref(),
            Some("https://example.com/brakes?page=3")
        );
        Ok(())
    }

    #[test]
    fn last_page_has_no_cursor() -> Result<()> {
        let page = parse_listing_page(LAST_PAGE_HTML, "https://example.com/brakes")?;
        assert_eq!(page.products.len(), 1);
        assert!(page.next_page.is_none());
        Ok(())
    }
}
