//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalog and run the full
//! discover-then-harvest cycle end-to-end.

use catalog_crawler::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use catalog_crawler::crawler::{Coordinator, RunStatus};
use catalog_crawler::output::load_checkpoint;
use catalog_crawler::CrawlError;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(base_url: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            workers: 3,
            fetch_timeout_secs: 1,
            listing_timeout_secs: 2,
            queue_wait_ms: 100,
            collect_timeout_secs: 10,
            shutdown_grace_secs: 5,
            checkpoint_interval: 2,
            result_buffer: 4,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
        },
        output: OutputConfig::default(),
    }
}

fn listing_page(hrefs: &[String], pager: Option<&str>) -> String {
    let articles: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li><article class="product_pod"><h3><a href="{}" title="x">x</a></h3></article></li>"#,
                href
            )
        })
        .collect();
    let pager = pager
        .map(|text| {
            format!(
                r#"<ul class="pager"><li class="current">{}</li><li class="next"><a href="catalogue/page-2.html">next</a></li></ul>"#,
                text
            )
        })
        .unwrap_or_default();
    format!(
        "<html><body><ol class=\"row\">{}</ol>{}</body></html>",
        articles, pager
    )
}

fn item_page(n: u32) -> String {
    format!(
        r#"<html><body>
        <ul class="breadcrumb">
            <li><a href="../../index.html">Home</a></li>
            <li><a href="../category/books_1/index.html">Books</a></li>
            <li><a href="../category/books/travel_2/index.html">Travel</a></li>
            <li class="active">Book {n}</li>
        </ul>
        <h1>Book {n}</h1>
        <p class="price_color">£{n}.50</p>
        <p class="instock availability">In stock (3 available)</p>
        <p class="star-rating Four"></p>
        <table class="table table-striped">
            <tr><th>UPC</th><td>upc-{n}</td></tr>
            <tr><th>Number of reviews</th><td>{n}</td></tr>
        </table>
        </body></html>"#,
        n = n
    )
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts two listing pages with three items each
///
/// Page one lives at the root and links `catalogue/book-N/index.html`;
/// page two lives under `catalogue/` and links `book-N/index.html`, so both
/// resolve to `/catalogue/book-N/index.html`.
async fn mount_two_page_catalog(server: &MockServer) {
    let first: Vec<String> = (1..=3)
        .map(|n| format!("catalogue/book-{}/index.html", n))
        .collect();
    let second: Vec<String> = (4..=6).map(|n| format!("book-{}/index.html", n)).collect();

    mount_html(server, "/", listing_page(&first, Some("\n Page 1 of 2 \n"))).await;
    mount_html(
        server,
        "/catalogue/page-2.html",
        listing_page(&second, Some("Page 2 of 2")),
    )
    .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_two_listing_pages() {
    let server = MockServer::start().await;
    mount_two_page_catalog(&server).await;
    for n in 1..=6 {
        mount_html(&server, &format!("/catalogue/book-{}/index.html", n), item_page(n)).await;
    }

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("books.json");
    let config = create_test_config(&format!("{}/", server.uri()));

    let coordinator = Coordinator::new(config, &output).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.discovery.total_pages, 2);
    assert_eq!(report.discovery.item_urls.len(), 6);
    assert!(report.discovery.failed_pages.is_empty());

    assert_eq!(report.run.status, RunStatus::Complete);
    assert_eq!(report.run.dispatched, 6);
    assert_eq!(report.run.succeeded, 6);
    assert_eq!(report.run.failed, 0);
    assert_eq!(report.run.degraded, 0);
    assert_eq!(report.run.records.len(), 6);

    let saved = load_checkpoint(&output).expect("Checkpoint missing");
    assert_eq!(saved.len(), 6);

    let book_five = saved
        .iter()
        .find(|r| r.url.ends_with("/catalogue/book-5/index.html"))
        .expect("book 5 missing");
    assert_eq!(book_five.title, "Book 5");
    assert_eq!(book_five.category, "Travel");
    assert_eq!(book_five.rating, 4);
    assert_eq!(book_five.upc, "upc-5");
    assert_eq!(book_five.price, 5.5);
    assert_eq!(book_five.currency, "GBP");
    assert!(book_five.in_stock);
    assert_eq!(book_five.reviews, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_item_timeout_counts_as_failure() {
    let server = MockServer::start().await;
    mount_two_page_catalog(&server).await;
    for n in 1..=6 {
        let mut response = ResponseTemplate::new(200).set_body_string(item_page(n));
        if n == 4 {
            response = response.set_delay(Duration::from_secs(3));
        }
        Mock::given(method("GET"))
            .and(path(format!("/catalogue/book-{}/index.html", n)))
            .respond_with(response)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("books.json");
    let config = create_test_config(&format!("{}/", server.uri()));

    let report = Coordinator::new(config, &output)
        .unwrap()
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.run.status, RunStatus::Complete);
    assert_eq!(report.run.succeeded, 5);
    assert_eq!(report.run.failed, 1);
    assert_eq!(report.run.records.len(), 5);

    assert!(output.exists());
    let saved = load_checkpoint(&output).unwrap();
    assert_eq!(saved.len(), 5);
    assert!(saved.iter().all(|r| !r.url.contains("book-4")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_listing_page_is_skipped() {
    let server = MockServer::start().await;

    let first: Vec<String> = (1..=2)
        .map(|n| format!("catalogue/book-{}/index.html", n))
        .collect();
    mount_html(&server, "/", listing_page(&first, Some("Page 1 of 3"))).await;
    Mock::given(method("GET"))
        .and(path("/catalogue/page-2.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/catalogue/page-3.html",
        listing_page(&["book-3/index.html".to_string()], Some("Page 3 of 3")),
    )
    .await;
    for n in 1..=3 {
        mount_html(&server, &format!("/catalogue/book-{}/index.html", n), item_page(n)).await;
    }

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("books.json");
    let config = create_test_config(&format!("{}/", server.uri()));

    let report = Coordinator::new(config, &output).unwrap().run().await.unwrap();

    assert_eq!(report.discovery.total_pages, 3);
    assert_eq!(report.discovery.failed_pages.len(), 1);
    assert_eq!(report.discovery.failed_pages[0].page, 2);
    assert_eq!(report.discovery.item_urls.len(), 3);
    assert_eq!(report.run.succeeded, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_item_page_is_counted() {
    let server = MockServer::start().await;

    let hrefs: Vec<String> = (1..=3)
        .map(|n| format!("catalogue/book-{}/index.html", n))
        .collect();
    // No pager: the catalog has a single listing page
    mount_html(&server, "/", listing_page(&hrefs, None)).await;
    mount_html(&server, "/catalogue/book-1/index.html", item_page(1)).await;
    mount_html(&server, "/catalogue/book-3/index.html", item_page(3)).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("books.json");
    let config = create_test_config(&format!("{}/", server.uri()));

    let report = Coordinator::new(config, &output).unwrap().run().await.unwrap();

    assert_eq!(report.discovery.total_pages, 1);
    assert_eq!(report.run.succeeded + report.run.failed, report.run.dispatched);
    assert_eq!(report.run.failed, 1);
    assert_eq!(load_checkpoint(&output).unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_first_listing_page_fails_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("books.json");
    let config = create_test_config(&format!("{}/", server.uri()));

    let result = Coordinator::new(config, &output).unwrap().run().await;

    assert!(matches!(result, Err(CrawlError::Discovery(_))));
    assert!(!output.exists());
}
