//! Product detail extraction: title, price, attribute block, hidden form
//! identifiers, stock and the fitment table.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{FitmentRow, HandlerError, HandlerResult, ProductRecord};
use crate::infrastructure::parsing::{parse_price, parse_stock};

static CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-info-container").expect("valid container selector"));

static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".product-info-container .product-title h1").expect("valid title selector")
});

static PRICE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".product-info-container .product-offer .product-price")
        .expect("valid price selector")
});

static STOCK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".product-info-container .product-stock").expect("valid stock selector")
});

static ATTR_ROWS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(concat!(
        ".product-info-container .product-info .product-attributes > div, ",
        ".product-info-container .product-info .product-attributes-red-bold > div, ",
        ".product-info-container .product-info > div"
    ))
    .expect("valid attribute selector")
});

static ATTR_HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-attribute-heading").expect("valid heading selector"));

static ATTR_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".product-attribute-content").expect("valid content selector"));

static FITMENT_ROWS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".fitment-container .applications-container table tbody tr")
        .expect("valid fitment selector")
});

static FITMENT_CELLS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.application-content").expect("valid fitment cell selector"));

/// Extract a product record from a detail page.
///
/// Fails with `ContainerNotFound` when the detail container never rendered
/// and `TitleMissing` when the container carries no usable title; both are
/// item-level failure codes, not infrastructure errors.
pub fn parse_product_page(
    html: &str,
    url: &str,
    category_url: Option<&str>,
) -> HandlerResult<ProductRecord> {
    let document = Html::parse_document(html);

    if document.select(&CONTAINER).next().is_none() {
        return Err(HandlerError::ContainerNotFound);
    }

    let mut record = ProductRecord::new(url);
    record.category_url = category_url.map(str::to_string);

    record.attrs = extract_attrs(&document);
    let hidden = extract_hidden_inputs(&document);

    record.title = document
        .select(&TITLE)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());
    if record.title.is_none() {
        return Err(HandlerError::TitleMissing);
    }

    if let Some(price_el) = document.select(&PRICE).next() {
        let (price, currency) = parse_price(&element_text(&price_el));
        record.price = price;
        record.currency = currency.map(str::to_string);
    }
    if record.currency.is_none() {
        record.currency = Some("USD".to_string());
    }

    record.part_number = record
        .attrs
        .get("Part Number")
        .cloned()
        .or_else(|| hidden.part_number.clone())
        .or_else(|| hidden.alt_sku.clone());
    record.brand = record.attrs.get("Brand").cloned();
    record.prod_id = hidden.prod_id;
    record.app_id = hidden.app_id;
    record.alt_sku = hidden.alt_sku;

    record.stock = document
        .select(&STOCK)
        .next()
        .and_then(|el| parse_stock(&element_text(&el)));

    record.fitment = extract_fitment(&document);

    Ok(record)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn extract_attrs(document: &Html) -> std::collections::HashMap<String, String> {
    let mut attrs = std::collections::HashMap::new();
    for row in document.select(&ATTR_ROWS) {
        let Some(heading) = row.select(&ATTR_HEADING).next() else {
            continue;
        };
        let key = element_text(&heading)
            .trim_end_matches(':')
            .trim()
            .to_string();
        if key.is_empty() {
            continue;
        }

        let value = match row.select(&ATTR_CONTENT).next() {
            Some(content) => element_text(&content),
            None => {
                // No content node: take the row text and strip the leading
                // "Key:" prefix if present.
                let full = element_text(&row);
                let prefix = format!("{key}:");
                if full.to_lowercase().starts_with(&prefix.to_lowercase()) {
                    full.get(prefix.len()..)
                        .map(|rest| rest.trim().to_string())
                        .unwrap_or(full)
                } else {
                    full
                }
            }
        };
        attrs.insert(key, value);
    }
    attrs
}

#[derive(Default)]
struct HiddenInputs {
    prod_id: Option<String>,
    app_id: Option<String>,
    alt_sku: Option<String>,
    part_number: Option<String>,
}

fn extract_hidden_inputs(document: &Html) -> HiddenInputs {
    HiddenInputs {
        prod_id: hidden_input_value(document, "prod_id"),
        app_id: hidden_input_value(document, "app_id"),
        alt_sku: hidden_input_value(document, "alt_sku"),
        part_number: hidden_input_value(document, "part_number"),
    }
}

fn hidden_input_value(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"form.product-form input[name="{name}"]"#)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn extract_fitment(document: &Html) -> Vec<FitmentRow> {
    let mut rows = Vec::new();
    for tr in document.select(&FITMENT_ROWS) {
        let cells: Vec<String> = tr.select(&FITMENT_CELLS).map(|td| element_text(&td)).collect();
        let get = |i: usize| {
            cells
                .get(i)
                .map(String::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let row = FitmentRow {
            vehicle: get(0),
            sub_model: get(1),
            engine: get(2),
        };
        if row.vehicle.is_some() || row.sub_model.is_some() || row.engine.is_some() {
            rows.push(row);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_HTML: &str = r#"
        <div class="product-info-container">
          <div class="product-title"><h1> Front Brake Rotor </h1></div>
          <div class="product-offer"><span class="product-price">$38.95</span></div>
          <div class="product-stock">In Stock (12)</div>
          <div class="product-info">
            <div class="product-attributes">
              <div>
                <span class="product-attribute-heading">Part Number:</span>
                <span class="product-attribute-content">BR-900123</span>
              </div>
              <div>
                <span class="product-attribute-heading">Brand:</span>
                <span class="product-attribute-content">Centric</span>
              </div>
            </div>
            <div>
              <span class="product-attribute-heading">Warranty:</span> 1 Year
            </div>
          </div>
        </div>
        <form class="product-form">
          <input type="hidden" name="prod_id" value="900123">
          <input type="hidden" name="app_id" value="A77">
          <input type="hidden" name="alt_sku" value="ALT-1">
        </form>
        <div class="fitment-container"><div class="applications-container">
          <table><tbody>
            <tr>
              <td class="application-content">2015 Honda Civic</td>
              <td class="application-content">LX</td>
              <td class="application-content">1.8L L4</td>
            </tr>
            <tr>
              <td class="application-content">2016 Honda Civic</td>
              <td class="application-content"></td>
              <td class="application-content">2.0L L4</td>
            </tr>
            <tr>
              <td class="application-content"></td>
              <td class="application-content"></td>
              <td class="application-content"></td>
            </tr>
          </tbody></table>
        </div></div>
    "#;

    #[test]
    fn extracts_full_record() -> HandlerResult<()> {
        let record = parse_product_page(
            PRODUCT_HTML,
            "https://example.com/p/900123",
            Some("https://example.com/brakes"),
        )?;

        assert_eq!(record.title.as_deref(), Some("Front Brake Rotor"));
        assert_eq!(record.price, Some(38.95));
        assert_eq!(record.currency.as_deref(), Some("USD"));
        assert_eq!(record.part_number.as_deref(), Some("BR-900123"));
        assert_eq!(record.brand.as_deref(), Some("Centric"));
        assert_eq!(record.stock, Some(12));
        assert_eq!(record.prod_id.as_deref(), Some("900123"));
        assert_eq!(record.app_id.as_deref(), Some("A77"));
        assert_eq!(record.alt_sku.as_deref(), Some("ALT-1"));
        assert_eq!(record.attrs.get("Warranty").map(String::as_str), Some("1 Year"));
        assert_eq!(record.fitment.len(), 2);
        assert_eq!(record.fitment[0].vehicle.as_deref(), Some("2015 Honda Civic"));
        assert_eq!(record.fitment[1].sub_model, None);
        assert_eq!(
            record.category_url.as_deref(),
            Some("https://example.com/brakes")
        );
        Ok(())
    }

    #[test]
    fn part_number_falls_back_to_hidden_inputs() -> HandlerResult<()> {
        let html = r#"
            <div class="product-info-container">
              <div class="product-title"><h1>Widget</h1></div>
            </div>
            <form class="product-form">
              <input name="part_number" value="PN-77">
            </form>
        "#;
        let record = parse_product_page(html, "u", None)?;
        assert_eq!(record.part_number.as_deref(), Some("PN-77"));
        // No price element: currency still defaults to USD.
        assert_eq!(record.currency.as_deref(), Some("USD"));
        Ok(())
    }

    #[test]
    fn missing_container_is_an_item_error() {
        let err = parse_product_page("<html><body></body></html>", "u", None).unwrap_err();
        assert_eq!(err, HandlerError::ContainerNotFound);
    }

    #[test]
    fn blank_title_is_an_item_error() {
        let html = r#"
            <div class="product-info-container">
              <div class="product-title"><h1>  </h1></div>
            </div>
        "#;
        let err = parse_product_page(html, "u", None).unwrap_err();
        assert_eq!(err, HandlerError::TitleMissing);
    }
}
