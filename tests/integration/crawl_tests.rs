//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use knowledge_crawler::chunk::Chunker;
use knowledge_crawler::config::{Config, CrawlerConfig};
use knowledge_crawler::crawler::{run_job, JobRunner, Pipeline};
use knowledge_crawler::extract::Extractor;
use knowledge_crawler::sink::MemorySink;
use knowledge_crawler::state::{
    JobSnapshot, JobStatus, JobStatusStore, ScrapeErrorKind, StatusCallback, StatusUpdate,
};
use knowledge_crawler::url::normalize_url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delay
fn create_test_config(max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            max_concurrent: 3,
            politeness_delay_ms: 0,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    }
}

fn test_pipeline(sink: &Arc<MemorySink>) -> Pipeline {
    Pipeline {
        extractor: Extractor::new(None, 50),
        chunker: Chunker::characters(1500, 150),
        indexing: sink.clone(),
        concepts: sink.clone(),
    }
}

fn html_page(title: &str, body: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>", href))
        .collect();
    let html = format!(
        "<html><head><title>{}</title></head><body><main><p>{}</p>{}</main></body></html>",
        title, body, anchors
    );
    ResponseTemplate::new(200)
        .set_body_raw(html, "text/html; charset=utf-8")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Runs a crawl of `server` to completion through the job runner
async fn crawl(
    server: &MockServer,
    max_depth: u32,
    sink: &Arc<MemorySink>,
) -> (JobSnapshot, JobStatusStore) {
    let store = JobStatusStore::new();
    let runner = JobRunner::with_pipeline(create_test_config(max_depth), test_pipeline(sink), store.clone());

    let key = runner.start(&server.uri()).expect("job should start");
    let snapshot = tokio::time::timeout(
        Duration::from_secs(30),
        runner.wait(&key, Duration::from_millis(10)),
    )
    .await
    .expect("crawl should finish")
    .expect("job should exist");

    (snapshot, store)
}

/// Number of GET requests the server received per path
async fn request_counts(server: &MockServer) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for request in server.received_requests().await.unwrap_or_default() {
        *counts.entry(request.url.path().to_string()).or_insert(0) += 1;
    }
    counts
}

#[tokio::test]
async fn test_single_page_hello_world() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Hello", "Hello World", &[])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 1);
    assert_eq!(snapshot.total_pages, 1);
    assert_eq!(snapshot.error_count, 0);
    assert!(snapshot
        .message
        .as_deref()
        .unwrap()
        .starts_with("Crawl finished in"));

    let chunks = sink.chunks();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Hello World");
    assert_eq!(chunks[0].metadata.ordinal, 1);
    assert_eq!(chunks[0].metadata.title.as_deref(), Some("Hello"));
    assert_eq!(chunks[0].metadata.source_url, normalize_url(&server.uri()));
}

#[tokio::test]
async fn test_links_are_followed_within_site() {
    let server = MockServer::start().await;
    let external = MockServer::start().await;
    let external_link = format!("{}/elsewhere", external.uri());

    mount(
        &server,
        "/",
        html_page("Home", "Home page", &["/about", "docs#intro", external_link.as_str()]),
    )
    .await;
    mount(&server, "/about", html_page("About", "About us", &[])).await;
    mount(&server, "/docs", html_page("Docs", "Documentation", &[])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 3);
    assert_eq!(snapshot.total_pages, 3);
    assert_eq!(sink.chunks().len(), 3);
    assert!(external.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Seed", "Seed page", &["/level1"])).await;
    mount(&server, "/level1", html_page("One", "Level one", &["/level2"])).await;
    mount(&server, "/level2", html_page("Two", "Level two", &[])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 1, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 2);

    let counts = request_counts(&server).await;
    assert_eq!(counts.get("/level1"), Some(&1));
    assert_eq!(counts.get("/level2"), None);
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_seed() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Seed", "Seed page", &["/next"])).await;
    mount(&server, "/next", html_page("Next", "Next page", &[])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 0, &sink).await;

    assert_eq!(snapshot.progress, 1);
    assert_eq!(snapshot.total_pages, 1);
    assert_eq!(request_counts(&server).await.get("/next"), None);
}

#[tokio::test]
async fn test_cycles_fetched_once() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home", &["/a", "/b", "/"])).await;
    mount(&server, "/a", html_page("A", "Page A", &["/", "/b", "/a/"])).await;
    mount(&server, "/b", html_page("B", "Page B", &["/a", "/", "/b#top"])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 5, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 3);
    assert_eq!(snapshot.total_pages, 3);

    let counts = request_counts(&server).await;
    for route in ["/", "/a", "/b"] {
        assert_eq!(counts.get(route), Some(&1), "{} fetched more than once", route);
    }
}

#[tokio::test]
async fn test_http_404_recorded_as_error() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home page", &["/missing"])).await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, store) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::CompletedWithErrors);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(snapshot.total_pages, 2);
    assert_eq!(snapshot.error_count, 1);
    assert!(snapshot.message.as_deref().unwrap().contains("Errors: 1."));

    let errors = store.errors(&snapshot.url);
    assert_eq!(errors[0].kind, ScrapeErrorKind::HttpStatus);
    assert!(errors[0].url.ends_with("/missing"));
    assert_eq!(request_counts(&server).await.get("/missing"), Some(&1));
}

#[tokio::test]
async fn test_off_site_redirect() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    mount(&server, "/", html_page("Home", "Home page", &["/go"])).await;
    mount(
        &server,
        "/go",
        ResponseTemplate::new(302)
            .insert_header("location", format!("{}/landing", elsewhere.uri()).as_str()),
    )
    .await;
    mount(&elsewhere, "/landing", html_page("Away", "Somewhere else", &["/more"])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, store) = crawl(&server, 3, &sink).await;

    assert_eq!(snapshot.status, JobStatus::CompletedWithErrors);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(snapshot.error_count, 1);
    assert_eq!(store.errors(&snapshot.url)[0].kind, ScrapeErrorKind::OffSiteRedirect);

    // Only the seed page was indexed
    assert_eq!(sink.chunks().len(), 1);
    let counts = request_counts(&elsewhere).await;
    assert_eq!(counts.get("/landing"), Some(&1));
    assert_eq!(counts.get("/more"), None);
}

#[tokio::test]
async fn test_same_site_redirect_marks_final_url() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home page", &["/old"])).await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    mount(&server, "/new", html_page("New", "Moved here", &["/new", "/old"])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 3, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(request_counts(&server).await.get("/new"), Some(&1));
}

#[tokio::test]
async fn test_plain_text_and_unsupported_types() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home page", &["/notes.txt", "/data.json"])).await;
    mount(
        &server,
        "/notes.txt",
        ResponseTemplate::new(200)
            .set_body_raw("Plain   notes\n\nwith    spacing", "text/plain; charset=utf-8"),
    )
    .await;
    mount(
        &server,
        "/data.json",
        ResponseTemplate::new(200)
            .set_body_raw("{\"a\": 1}", "application/json"),
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 3);

    let notes = sink.chunks_for(&format!("{}/notes.txt", server.uri()));
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text, "Plain notes with spacing");
    assert!(sink.chunks_for(&format!("{}/data.json", server.uri())).is_empty());
}

#[tokio::test]
async fn test_broken_pdf_is_a_page_error() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home page", &["/report.pdf"])).await;
    mount(
        &server,
        "/report.pdf",
        ResponseTemplate::new(200)
            .set_body_raw(b"this is not a pdf".to_vec(), "application/pdf"),
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, store) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::CompletedWithErrors);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(store.errors(&snapshot.url)[0].kind, ScrapeErrorKind::PdfParse);
}

#[tokio::test]
async fn test_indexing_rejection_does_not_stop_crawl() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home page", &["/next"])).await;
    mount(&server, "/next", html_page("Next", "Next page", &[])).await;

    let sink = Arc::new(MemorySink::new());
    sink.set_reject_chunks(true);
    let (snapshot, store) = crawl(&server, 2, &sink).await;

    assert_eq!(snapshot.status, JobStatus::CompletedWithErrors);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(snapshot.error_count, 2);
    assert!(store
        .errors(&snapshot.url)
        .iter()
        .all(|e| e.kind == ScrapeErrorKind::Indexing));
    assert_eq!(sink.upsert_calls(), 2);
}

#[tokio::test]
async fn test_concepts_offered_once_per_job() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html_page("Home", "The NASA and ESA missions", &["/more"]),
    )
    .await;
    mount(&server, "/more", html_page("More", "More from NASA and JPL", &[])).await;

    let sink = Arc::new(MemorySink::new());
    let (snapshot, _) = crawl(&server, 2, &sink).await;
    assert_eq!(snapshot.status, JobStatus::Completed);

    let mut terms: Vec<String> = sink.concepts().into_iter().map(|c| c.term).collect();
    terms.sort();
    assert_eq!(terms, vec!["ESA", "JPL", "NASA"]);
}

#[tokio::test]
async fn test_processed_never_exceeds_total() {
    let server = MockServer::start().await;
    mount(&server, "/", html_page("Home", "Home", &["/a", "/b", "/c"])).await;
    mount(&server, "/a", html_page("A", "A", &["/a1", "/a2"])).await;
    mount(&server, "/b", ResponseTemplate::new(500)).await;
    mount(&server, "/c", html_page("C", "C", &["/a1", "/c1"])).await;
    mount(&server, "/a1", html_page("A1", "A1", &[])).await;
    mount(&server, "/a2", html_page("A2", "A2", &["/"])).await;
    mount(&server, "/c1", html_page("C1", "C1", &[])).await;

    let updates: Arc<Mutex<Vec<StatusUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&updates);
    let callback: StatusCallback = Arc::new(move |u| recorder.lock().unwrap().push(u));

    let sink = Arc::new(MemorySink::new());
    let status = run_job(
        server.uri(),
        create_test_config(3).crawler,
        test_pipeline(&sink),
        callback,
    )
    .await;

    assert_eq!(status, JobStatus::CompletedWithErrors);
    let updates = updates.lock().unwrap();
    assert_eq!(updates.first().unwrap().message.as_deref(), Some("Crawl started..."));
    for update in updates.iter() {
        assert!(
            update.processed <= update.total,
            "processed {} > total {}",
            update.processed,
            update.total
        );
    }

    let last = updates.last().unwrap();
    assert_eq!(last.status, JobStatus::CompletedWithErrors);
    assert_eq!(last.processed, 7);
    assert_eq!(last.total, 7);
}
