//! URL handling module for Catalog-Crawler
//!
//! Listing pages live at two different path depths (the catalog root for page
//! one, `catalogue/page-N.html` afterwards), so item links must always be
//! resolved against the page they were found on.

use url::Url;

/// Returns the URL of listing page `page` (1-based)
///
/// Page 1 is the catalog root itself; later pages live under `catalogue/`.
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::listing_page_url;
/// use url::Url;
///
/// let base = Url::parse("https://books.toscrape.com/").unwrap();
/// assert_eq!(
///     listing_page_url(&base, 3).unwrap().as_str(),
///     "https://books.toscrape.com/catalogue/page-3.html"
/// );
/// ```
pub fn listing_page_url(base_url: &Url, page: u32) -> Result<Url, url::ParseError> {
    if page <= 1 {
        Ok(base_url.clone())
    } else {
        base_url.join(&format!("catalogue/page-{}.html", page))
    }
}

/// Resolves an href found on `page_url` to an absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - non-HTTP(S) URLs after resolution
pub fn resolve_href(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match page_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
