//! Integration tests for the crawler
//!
//! These tests use wiremock to serve small fixture sites and run the full
//! crawl cycle end-to-end, down to the CSV on disk.

use cep_harvest::config::{
    load_config, ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use cep_harvest::crawler::{run_crawl, Coordinator, CrawlOutcome};
use cep_harvest::output::read_postal_codes;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_PATH: &str = "/sp/sao-paulo/";

/// Creates a test configuration rooted at `BASE_PATH` on the mock server
fn create_test_config(server: &MockServer, target: usize, workers: usize, csv: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: format!("{}{}", server.uri(), BASE_PATH),
            target,
            workers,
            timeout_secs: 5,
            request_delay_ms: 0, // No pacing in tests
            min_parallel_delay_ms: 0,
            region_prefix: Some("0".to_string()),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            csv_path: csv.display().to_string(),
        },
        classifier: ClassifierConfig::default(),
    }
}

fn no_stop() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

/// Mounts an HTML page that must be fetched exactly `hits` times
async fn mount_page(server: &MockServer, at: &str, body: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body.to_string())
                .insert_header("content-type", "text/html"),
        )
        .expect(hits)
        .mount(server)
        .await;
}

fn results_table(codes: &[&str]) -> String {
    let rows: String = codes
        .iter()
        .map(|c| format!(r#"<tr><td><a href="/cep/{c}/">{c}</a></td><td>Rua</td></tr>"#))
        .collect();
    format!(r#"<table id="ul_list"><tbody id="tbody_results">{rows}</tbody></table>"#)
}

fn page_url(server: &MockServer, at: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), at)).unwrap()
}

fn read_csv(path: &Path) -> String {
    std::fs::read_to_string(path).expect("CSV should exist")
}

#[tokio::test]
async fn test_two_page_crawl_trims_to_target() {
    let server = MockServer::start().await;

    // Page A: results table with 2 codes and a link to page B
    mount_page(
        &server,
        BASE_PATH,
        &format!(
            r#"<html><body>{}<a href="/sp/sao-paulo/bela-vista/">Bela Vista</a></body></html>"#,
            results_table(&["01310-100", "01311-000"])
        ),
        1,
    )
    .await;

    // Page B: 3 codes in free text, no further links
    mount_page(
        &server,
        "/sp/sao-paulo/bela-vista/",
        "<html><body><p>01000-001, 04538-133 e 05000-000</p></body></html>",
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let config = create_test_config(&server, 4, 1, &csv);

    let report = run_crawl(config, no_stop()).await.expect("crawl should succeed");

    assert_eq!(report.outcome, CrawlOutcome::TargetReached);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.collected, 5);
    assert_eq!(report.written, 4);
    assert_eq!(report.trimmed, 1);
    assert_eq!(
        read_csv(&csv),
        "cep\n01000001\n01310100\n01311000\n04538133\n"
    );
}

#[tokio::test]
async fn test_region_filter_drops_other_regions() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        "<html><body><p>01310-100 and 12345-678</p></body></html>",
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let config = create_test_config(&server, 10, 1, &csv);

    let report = run_crawl(config, no_stop()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.written, 1);
    assert!(!report.is_complete());
    assert_eq!(read_csv(&csv), "cep\n01310100\n");
}

#[tokio::test]
async fn test_relative_links_resolve_under_root() {
    let server = MockServer::start().await;

    // Served without a redirect, so the page URL is the root as configured
    mount_page(
        &server,
        BASE_PATH,
        r#"<p>01310-100</p><a href="moema/">Moema</a><a href="./pinheiros">Pinheiros</a>"#,
        1,
    )
    .await;
    mount_page(
        &server,
        "/sp/sao-paulo/moema/",
        r#"<p>04077-000</p><a href="vila-uberabinha/">Vila Uberabinha</a><a href="../">up</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/sp/sao-paulo/moema/vila-uberabinha/", "<p>04511-000</p>", 1).await;
    mount_page(&server, "/sp/sao-paulo/pinheiros", "<p>05422-000</p>", 1).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(create_test_config(&server, 10, 1, &csv), no_stop())
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.pages_visited, 4);
    assert_eq!(
        read_csv(&csv),
        "cep\n01310100\n04077000\n04511000\n05422000\n"
    );
}

#[tokio::test]
async fn test_failed_page_is_visited_once_and_skipped() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        &format!(
            r#"{}<a href="/sp/sao-paulo/moema">Moema</a>"#,
            results_table(&["01310-100", "01311-000"])
        ),
        1,
    )
    .await;

    // Page B never answers within the timeout
    Mock::given(method("GET"))
        .and(path("/sp/sao-paulo/moema"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>01000-001</p>")
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let mut config = create_test_config(&server, 4, 1, &csv);
    config.crawler.timeout_secs = 1;

    let coordinator = Coordinator::new(config, no_stop()).unwrap();
    let frontier = Arc::clone(coordinator.frontier());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.pages_failed, 1);
    assert!(frontier.is_visited(&page_url(&server, "/sp/sao-paulo/moema")));
    assert_eq!(read_csv(&csv), "cep\n01310100\n01311000\n");
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        r#"<p>01310-100</p><a href="/sp/sao-paulo/a">A</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sp/sao-paulo/a"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(create_test_config(&server, 5, 1, &csv), no_stop())
        .await
        .unwrap();

    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.written, 1);
}

#[tokio::test]
async fn test_parallel_crawl_fetches_each_page_once() {
    let server = MockServer::start().await;

    let neighborhoods = ["bela-vista", "moema", "pinheiros", "se"];
    let links: String = neighborhoods
        .iter()
        .map(|n| format!(r#"<a href="/sp/sao-paulo/{n}/">{n}</a>"#))
        .collect();
    mount_page(
        &server,
        BASE_PATH,
        &format!("<p>01000-000</p>{}", links),
        1,
    )
    .await;

    for (i, n) in neighborhoods.iter().enumerate() {
        // Every page links to all of its siblings and to itself
        mount_page(
            &server,
            &format!("/sp/sao-paulo/{}/", n),
            &format!("<p>0{i}100-001 0{i}100-002</p>{}", links),
            1,
        )
        .await;
    }

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(create_test_config(&server, 100, 3, &csv), no_stop())
        .await
        .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::FrontierExhausted);
    assert_eq!(report.pages_visited, 5);
    assert_eq!(report.written, 9);

    let check = read_postal_codes(&csv).unwrap();
    assert_eq!(check.valid.len(), 9);
    assert_eq!(check.duplicates, 0);
}

#[tokio::test]
async fn test_in_flight_pages_finish_after_target() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        r#"<a href="/sp/sao-paulo/a">a</a><a href="/sp/sao-paulo/b">b</a><a href="/sp/sao-paulo/c">c</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/sp/sao-paulo/a", "<p>03000-001 03000-002</p>", 1).await;
    mount_page(&server, "/sp/sao-paulo/b", "<p>02000-001 02000-002</p>", 1).await;
    mount_page(&server, "/sp/sao-paulo/c", "<p>01000-001 01000-002</p>", 1).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(create_test_config(&server, 3, 3, &csv), no_stop())
        .await
        .unwrap();

    // All three sub-pages were claimed together; none is abandoned
    assert_eq!(report.outcome, CrawlOutcome::TargetReached);
    assert_eq!(report.pages_visited, 4);
    assert_eq!(report.collected, 6);
    assert_eq!(report.written, 3);
    assert_eq!(read_csv(&csv), "cep\n01000001\n01000002\n02000001\n");
}

#[tokio::test]
async fn test_noise_links_are_not_followed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        r#"<p>01310-100</p>
           <a href="/blog/">blog</a>
           <a href="/cep/01310-100/">record</a>
           <a href="/sp/sao-paulo/logradouro/avenida-paulista/">street</a>
           <a href="/rj/rio-de-janeiro/">elsewhere</a>
           <a href="/sp/sao-paulo/">self</a>
           <a href="mailto:x@y.com">mail</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/blog"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(create_test_config(&server, 10, 1, &csv), no_stop())
        .await
        .unwrap();

    assert_eq!(report.pages_visited, 1);
    assert_eq!(read_csv(&csv), "cep\n01310100\n");
}

#[tokio::test]
async fn test_halted_crawl_still_writes_csv() {
    let server = MockServer::start().await;
    mount_page(&server, BASE_PATH, "<p>01310-100</p>", 0).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("ceps.csv");
    let report = run_crawl(
        create_test_config(&server, 10, 1, &csv),
        Arc::new(AtomicBool::new(true)),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Halted);
    assert_eq!(report.pages_visited, 0);
    assert_eq!(read_csv(&csv), "cep\n");
}

#[tokio::test]
async fn test_output_replaces_existing_file_in_new_directory() {
    let server = MockServer::start().await;
    mount_page(&server, BASE_PATH, "<p>01310-100</p>", 2).await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("data/run-1/ceps.csv");
    std::fs::create_dir_all(csv.parent().unwrap()).unwrap();
    std::fs::write(&csv, "cep\n99999999\n88888888\n").unwrap();

    run_crawl(create_test_config(&server, 10, 1, &csv), no_stop())
        .await
        .unwrap();
    assert_eq!(read_csv(&csv), "cep\n01310100\n");

    let fresh = dir.path().join("never/created/ceps.csv");
    run_crawl(create_test_config(&server, 10, 1, &fresh), no_stop())
        .await
        .unwrap();
    assert_eq!(read_csv(&fresh), "cep\n01310100\n");
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        BASE_PATH,
        &results_table(&["04538-133", "01310-100"]),
        1,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("out/ceps.csv");
    let config_path = dir.path().join("harvest.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
base-url = "{}{}"
target = 2
request-delay-ms = 0
region-prefix = "0"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
csv-path = "{}"
"#,
            server.uri(),
            BASE_PATH,
            csv.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let report = run_crawl(config, no_stop()).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::TargetReached);
    assert_eq!(read_csv(&csv), "cep\n01310100\n04538133\n");
}
