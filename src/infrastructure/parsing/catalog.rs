//! Catalog page extraction: the top-level list of category links.

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::warn;

use crate::domain::CategoryLink;
use crate::infrastructure::parsing::resolve_link;

static CATALOG_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#whole main > ul > li > a").expect("valid catalog selector"));

/// Extract the category links from the catalog root page, resolved against
/// `base_url` into absolute canonical URLs.
pub fn parse_catalog_page(html: &str, base_url: &str) -> Result<Vec<CategoryLink>> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for anchor in document.select(&CATALOG_LINKS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let name = anchor.text().collect::<String>().trim().to_string();
        match resolve_link(base_url, href.trim()) {
            Ok(url) => links.push(CategoryLink { url, name }),
            Err(e) => warn!("skipping unresolvable catalog link '{href}': {e:#}"),
        }
    }

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_HTML: &str = r#"
        <div id="whole"><main>
          <ul>
            <li><a href="/brakes/"> Brakes </a></li>
            <li><a href="/suspension/">Suspension</a></li>
            <li><a>no href</a></li>
          </ul>
        </main></div>
    "#;

    #[test]
    fn extracts_category_links_with_absolute_urls() -> Result<()> {
        let links = parse_catalog_page(CATALOG_HTML, "https://example.com/catalog/")?;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.com/brakes");
        assert_eq!(links[0].name, "Brakes");
        assert_eq!(links[1].url, "https://example.com/suspension");
        Ok(())
    }

    #[test]
    fn empty_page_yields_no_links() -> Result<()> {
        let links = parse_catalog_page("<html></html>", "https://example.com/")?;
        assert!(links.is_empty());
        Ok(())
    }
}
