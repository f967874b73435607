//! Listing page scanning and item URL discovery
//!
//! Discovery is sequential: listing pages are cheap next to the item pages
//! they point at, so pages are visited strictly in order 1..=total.

use crate::crawler::fetcher::PageFetcher;
use crate::url::{listing_page_url, resolve_href};
use crate::CrawlError;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// What one listing page contributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Item page URLs in page order, resolved against the listing page URL
    pub item_urls: Vec<Url>,

    /// Total listing page count from the pagination control, if present
    pub total_pages: Option<u32>,
}

/// A listing page that could not be fetched or scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFailure {
    pub page: u32,
    pub url: String,
    pub reason: String,
}

/// The outcome of walking every listing page
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// All item URLs, in page order then in-page order; duplicates are kept
    pub item_urls: Vec<Url>,

    /// Listing page count announced by page one
    pub total_pages: u32,

    /// Pages that contributed nothing because they failed
    pub failed_pages: Vec<ListingFailure>,
}

/// Scans one listing page for item links and the pagination total
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `page_url` - The URL the page was fetched from; item hrefs are resolved against it
pub fn scan_listing(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);

    ListingPage {
        item_urls: extract_item_urls(&document, page_url),
        total_pages: extract_total_pages(&document),
    }
}

fn extract_item_urls(document: &Html, page_url: &Url) -> Vec<Url> {
    let Ok(link_selector) = Selector::parse("article.product_pod h3 a[href]") else {
        return Vec::new();
    };

    document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(href, page_url))
        .collect()
}

/// Reads "Page 1 of 50" style text from the pager's current marker
fn extract_total_pages(document: &Html) -> Option<u32> {
    let current_selector = Selector::parse("ul.pager li.current").ok()?;
    let text = document
        .select(&current_selector)
        .next()?
        .text()
        .collect::<String>();

    parse_total_pages(&text)
}

/// Parses the trailing page number of a pager label
///
/// ```
/// use catalog_crawler::crawler::parse_total_pages;
///
/// assert_eq!(parse_total_pages("Page 1 of 50"), Some(50));
/// assert_eq!(parse_total_pages("Page 1 of many"), None);
/// ```
pub fn parse_total_pages(text: &str) -> Option<u32> {
    text.split_whitespace()
        .last()?
        .parse::<u32>()
        .ok()
        .filter(|pages| *pages > 0)
}

/// Collects item URLs from every listing page of the catalog at `base_url`
///
/// Page one decides how many pages there are; if it cannot be fetched the
/// discovery fails. Any later page that fails is recorded in
/// [`Discovery::failed_pages`] and skipped.
pub async fn collect_item_urls(
    fetcher: &dyn PageFetcher,
    base_url: &Url,
    timeout: Duration,
) -> Result<Discovery, CrawlError> {
    let first_url = listing_page_url(base_url, 1)?;
    let first_body = fetcher.fetch(&first_url, timeout).await.map_err(|e| {
        CrawlError::Discovery(format!("first listing page {} failed: {}", first_url, e))
    })?;

    let first = scan_listing(&first_body, &first_url);
    let total_pages = match first.total_pages {
        Some(total) => total,
        None => {
            tracing::debug!("No pagination control on {}, assuming one page", first_url);
            1
        }
    };

    tracing::info!("Found {} listing pages", total_pages);
    tracing::info!("  Page 1: {} items", first.item_urls.len());

    let mut discovery = Discovery {
        item_urls: first.item_urls,
        total_pages,
        failed_pages: Vec::new(),
    };

    for page in 2..=total_pages {
        let page_url = match listing_page_url(base_url, page) {
            Ok(url) => url,
            Err(e) => {
                discovery.failed_pages.push(ListingFailure {
                    page,
                    url: base_url.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match fetcher.fetch(&page_url, timeout).await {
            Ok(body) => {
                let listing = scan_listing(&body, &page_url);
                tracing::info!("  Page {}: {} items", page, listing.item_urls.len());
                discovery.item_urls.extend(listing.item_urls);
            }
            Err(e) => {
                tracing::warn!("Listing page {} failed: {}", page, e);
                discovery.failed_pages.push(ListingFailure {
                    page,
                    url: page_url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_html(hrefs: &[&str], pager: Option<&str>) -> String {
        let articles: String = hrefs
            .iter()
            .map(|href| {
                format!(
                    r#"<li><article class="product_pod"><h3><a href="{}" title="t">t</a></h3></article></li>"#,
                    href
                )
            })
            .collect();
        let pager = pager
            .map(|text| format!(r#"<ul class="pager"><li class="current">{}</li></ul>"#, text))
            .unwrap_or_default();
        format!("<html><body><ol>{}</ol>{}</body></html>", articles, pager)
    }

    #[test]
    fn test_scan_first_page() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        let html = listing_html(
            &["catalogue/a_1/index.html", "catalogue/b_2/index.html"],
            Some("\n    Page 1 of 50\n"),
        );
        let page = scan_listing(&html, &base);

        assert_eq!(page.total_pages, Some(50));
        assert_eq!(
            page.item_urls
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            vec![
                "https://books.toscrape.com/catalogue/a_1/index.html",
                "https://books.toscrape.com/catalogue/b_2/index.html",
            ]
        );
    }

    #[test]
    fn test_scan_later_page_resolves_against_own_path() {
        let page_url = Url::parse("https://books.toscrape.com/catalogue/page-3.html").unwrap();
        let html = listing_html(&["c_3/index.html"], Some("Page 3 of 50"));
        let page = scan_listing(&html, &page_url);

        assert_eq!(
            page.item_urls[0].as_str(),
            "https://books.toscrape.com/catalogue/c_3/index.html"
        );
    }

    #[test]
    fn test_no_pager() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        let page = scan_listing(&listing_html(&["a.html"], None), &base);
        assert_eq!(page.total_pages, None);
        assert_eq!(page.item_urls.len(), 1);
    }

    #[test]
    fn test_links_outside_product_pods_ignored() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        let html = r#"<html><body>
            <a href="catalogue/category/books_1/index.html">Books</a>
            <article class="product_pod"><h3><a href="catalogue/x_9/index.html">x</a></h3></article>
        </body></html>"#;
        let page = scan_listing(html, &base);
        assert_eq!(page.item_urls.len(), 1);
    }

    #[test]
    fn test_duplicates_kept() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        let page = scan_listing(&listing_html(&["a.html", "a.html"], None), &base);
        assert_eq!(page.item_urls.len(), 2);
    }

    #[test]
    fn test_parse_total_pages() {
        assert_eq!(parse_total_pages("Page 1 of 50"), Some(50));
        assert_eq!(parse_total_pages("  Page 2 of 3 "), Some(3));
        assert_eq!(parse_total_pages("Page 1 of 0"), None);
        assert_eq!(parse_total_pages(""), None);
    }
}
