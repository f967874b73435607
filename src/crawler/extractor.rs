//! Item page field extraction
//!
//! A fetched item page always yields a record: any field whose element is
//! missing or unreadable falls back to its default and is reported as a
//! [`FieldWarning`]. Only a document that cannot be treated as an item page
//! at all is an extraction failure.

use crate::crawler::record::{
    Extraction, Field, FieldWarning, Record, CURRENCY, DEFAULT_CATEGORY, DEFAULT_TITLE,
};
use crate::CrawlError;
use scraper::{ElementRef, Html, Selector};

/// Rating words in the order they are tried; the first one found wins
const RATING_WORDS: [(&str, u8); 5] = [("One", 1), ("Two", 2), ("Three", 3), ("Four", 4), ("Five", 5)];

/// Literal marking an in-stock availability line
const IN_STOCK_MARKER: &str = "In stock";

/// Breadcrumb position holding the category (Home > Books > Category > Item)
const CATEGORY_CRUMB: usize = 2;

/// Extracts a record from the HTML of one item page
///
/// # Arguments
///
/// * `html` - The item page body
/// * `url` - The page URL, stored verbatim in the record
///
/// # Returns
///
/// * `Ok(Extraction)` - The record plus the fields that were defaulted
/// * `Err(CrawlError::HtmlParse)` - The body is not a usable document
///
/// # Example
///
/// ```
/// use catalog_crawler::crawler::extract_record;
///
/// let html = r#"<html><body><h1>Sapiens</h1><p class="price_color">£54.23</p></body></html>"#;
/// let extraction = extract_record(html, "https://books.toscrape.com/catalogue/sapiens_996/index.html").unwrap();
/// assert_eq!(extraction.record.title, "Sapiens");
/// assert_eq!(extraction.record.price, 54.23);
/// ```
pub fn extract_record(html: &str, url: &str) -> Result<Extraction, CrawlError> {
    if html.trim().is_empty() {
        return Err(CrawlError::HtmlParse {
            url: url.to_string(),
            message: "empty document".to_string(),
        });
    }

    let document = Html::parse_document(html);
    let mut warnings = Vec::new();
    let mut record = Record::with_defaults(url);

    record.title = extract_title(&document, url, &mut warnings)?;
    record.price = extract_price(&document, url, &mut warnings)?;
    record.in_stock = extract_in_stock(&document, url, &mut warnings)?;
    record.rating = extract_rating(&document, url, &mut warnings)?;

    let (upc, reviews) = extract_product_table(&document, url, &mut warnings)?;
    record.upc = upc;
    record.reviews = reviews;

    record.category = extract_category(&document, url, &mut warnings)?;
    record.currency = CURRENCY.to_string();

    Ok(Extraction { record, warnings })
}

/// Keeps only the digits and decimal points of `text` and parses the rest
///
/// Returns `0.0` when nothing numeric survives or the result does not parse.
///
/// ```
/// use catalog_crawler::crawler::clean_price;
///
/// assert_eq!(clean_price("£51.77"), 51.77);
/// assert_eq!(clean_price(""), 0.0);
/// assert_eq!(clean_price("free"), 0.0);
/// ```
pub fn clean_price(text: &str) -> f64 {
    parse_price(text).unwrap_or(0.0)
}

fn parse_price(text: &str) -> Option<f64> {
    let clean: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if clean.is_empty() {
        return None;
    }

    clean.parse::<f64>().ok()
}

/// Maps a star-rating element's markup to 1..=5
///
/// ```
/// use catalog_crawler::crawler::rating_from_markup;
///
/// assert_eq!(rating_from_markup(r#"<p class="star-rating Three"></p>"#), 3);
/// assert_eq!(rating_from_markup(r#"<p class="star-rating"></p>"#), 0);
/// ```
pub fn rating_from_markup(markup: &str) -> u8 {
    RATING_WORDS
        .iter()
        .find(|(word, _)| markup.contains(word))
        .map(|(_, rating)| *rating)
        .unwrap_or(0)
}

fn selector(css: &str, url: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| CrawlError::HtmlParse {
        url: url.to_string(),
        message: format!("invalid selector '{}': {}", css, e),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn extract_title(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<String, CrawlError> {
    let h1 = selector("h1", url)?;

    Ok(match document.select(&h1).next().map(element_text) {
        Some(title) if !title.is_empty() => title,
        Some(blank) => {
            warnings.push(FieldWarning::Unparsable {
                field: Field::Title,
                raw: blank,
            });
            DEFAULT_TITLE.to_string()
        }
        None => {
            warnings.push(FieldWarning::Missing(Field::Title));
            DEFAULT_TITLE.to_string()
        }
    })
}

fn extract_price(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<f64, CrawlError> {
    let price_selector = selector("p.price_color", url)?;

    let Some(element) = document.select(&price_selector).next() else {
        warnings.push(FieldWarning::Missing(Field::Price));
        return Ok(0.0);
    };

    let text = element_text(element);
    Ok(match parse_price(&text) {
        Some(price) => price,
        None => {
            warnings.push(FieldWarning::Unparsable {
                field: Field::Price,
                raw: text,
            });
            0.0
        }
    })
}

fn extract_in_stock(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<bool, CrawlError> {
    let stock_selector = selector("p.instock.availability", url)?;

    Ok(match document.select(&stock_selector).next() {
        Some(element) => element.text().collect::<String>().contains(IN_STOCK_MARKER),
        None => {
            warnings.push(FieldWarning::Missing(Field::Availability));
            false
        }
    })
}

fn extract_rating(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<u8, CrawlError> {
    let rating_selector = selector("p.star-rating", url)?;

    let Some(element) = document.select(&rating_selector).next() else {
        warnings.push(FieldWarning::Missing(Field::Rating));
        return Ok(0);
    };

    let rating = rating_from_markup(&element.html());
    if rating == 0 {
        warnings.push(FieldWarning::Unparsable {
            field: Field::Rating,
            raw: element.value().attr("class").unwrap_or_default().to_string(),
        });
    }

    Ok(rating)
}

/// Reads UPC and review count from the product information table
fn extract_product_table(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<(String, u32), CrawlError> {
    let table_selector = selector("table", url)?;
    let row_selector = selector("tr", url)?;
    let th_selector = selector("th", url)?;
    let td_selector = selector("td", url)?;

    let Some(table) = document.select(&table_selector).next() else {
        warnings.push(FieldWarning::Missing(Field::Upc));
        warnings.push(FieldWarning::Missing(Field::Reviews));
        return Ok((String::new(), 0));
    };

    let mut upc = None;
    let mut reviews = None;

    for row in table.select(&row_selector) {
        let (Some(th), Some(td)) = (
            row.select(&th_selector).next(),
            row.select(&td_selector).next(),
        ) else {
            continue;
        };

        let label = element_text(th);
        let value = element_text(td);

        if label.eq_ignore_ascii_case("UPC") {
            upc = Some(value);
        } else if label.to_lowercase().contains("review") {
            match value.parse::<u32>() {
                Ok(count) => reviews = Some(count),
                Err(_) => {
                    warnings.push(FieldWarning::Unparsable {
                        field: Field::Reviews,
                        raw: value,
                    });
                    reviews = Some(0);
                }
            }
        }
    }

    if upc.is_none() {
        warnings.push(FieldWarning::Missing(Field::Upc));
    }
    if reviews.is_none() {
        warnings.push(FieldWarning::Missing(Field::Reviews));
    }

    Ok((upc.unwrap_or_default(), reviews.unwrap_or(0)))
}

fn extract_category(
    document: &Html,
    url: &str,
    warnings: &mut Vec<FieldWarning>,
) -> Result<String, CrawlError> {
    let crumb_selector = selector("ul.breadcrumb li", url)?;

    Ok(match document.select(&crumb_selector).nth(CATEGORY_CRUMB) {
        Some(element) => element_text(element),
        None => {
            warnings.push(FieldWarning::Missing(Field::Category));
            DEFAULT_CATEGORY.to_string()
        }
    })
}
