//! Integration tests for job start, duplicate rejection and status queries

use knowledge_crawler::chunk::Chunker;
use knowledge_crawler::config::{Config, CrawlerConfig};
use knowledge_crawler::crawler::{JobRunner, Pipeline, StartError};
use knowledge_crawler::extract::Extractor;
use knowledge_crawler::sink::MemorySink;
use knowledge_crawler::state::{JobStatus, JobStatusStore, StatusUpdate};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_runner(store: &JobStatusStore) -> JobRunner {
    let config = Config {
        crawler: CrawlerConfig {
            max_depth: 1,
            politeness_delay_ms: 0,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    };
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline {
        extractor: Extractor::new(None, 50),
        chunker: Chunker::characters(1500, 150),
        indexing: sink.clone(),
        concepts: sink,
    };
    JobRunner::with_pipeline(config, pipeline, store.clone())
}

/// Server whose only page answers after `delay`
async fn slow_server(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Slow page</body></html>", "text/html")
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

async fn wait_terminal(runner: &JobRunner, key: &str) -> JobStatus {
    tokio::time::timeout(
        Duration::from_secs(30),
        runner.wait(key, Duration::from_millis(10)),
    )
    .await
    .expect("job should finish")
    .expect("job should exist")
    .status
}

#[tokio::test]
async fn test_duplicate_start_rejected() {
    let server = slow_server(Duration::from_millis(500)).await;
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    let key = runner.start(&server.uri()).unwrap();
    let second = runner.start(&format!("{}/", server.uri()));

    match second {
        Err(StartError::AlreadyActive { key: rejected, status }) => {
            assert_eq!(rejected, key);
            assert!(status.is_active());
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(store.len(), 1);

    assert_eq!(wait_terminal(&runner, &key).await, JobStatus::Completed);
}

#[tokio::test]
async fn test_restart_after_completion() {
    let server = slow_server(Duration::ZERO).await;
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    let key = runner.start(&server.uri()).unwrap();
    assert_eq!(wait_terminal(&runner, &key).await, JobStatus::Completed);

    let again = runner.start(&server.uri()).unwrap();
    assert_eq!(again, key);
    assert_eq!(wait_terminal(&runner, &key).await, JobStatus::Completed);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_invalid_seed_rejected() {
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    for seed in ["ftp://example.com/file", "not a url", "mailto:someone@example.com"] {
        assert_eq!(
            runner.start(seed),
            Err(StartError::InvalidUrl {
                url: seed.to_string()
            })
        );
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_snapshot_fields() {
    let server = slow_server(Duration::ZERO).await;
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    let key = runner.start(&server.uri()).unwrap();
    wait_terminal(&runner, &key).await;

    let snapshot = runner.status(&key).unwrap();
    assert_eq!(snapshot.url, key);
    assert_eq!(snapshot.progress, 1);
    assert_eq!(snapshot.total_pages, 1);
    assert_eq!(snapshot.error_count, 0);
    assert!(snapshot.last_error.is_none());
    assert!(snapshot.updated_at >= snapshot.started_at);
    assert!(snapshot.message.unwrap().contains("Processed: 1."));

    assert!(runner.status("https://unknown.example/").is_none());
}

#[tokio::test]
async fn test_terminal_status_is_sticky() {
    let server = slow_server(Duration::ZERO).await;
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    let key = runner.start(&server.uri()).unwrap();
    wait_terminal(&runner, &key).await;

    store.update(StatusUpdate::new(key.clone(), JobStatus::Running, 9, 9));
    let snapshot = store.get(&key).unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.progress, 1);
}

#[tokio::test]
async fn test_unreachable_site_completes_with_errors() {
    let store = JobStatusStore::new();
    let runner = create_runner(&store);

    let key = runner.start("http://127.0.0.1:9/").unwrap();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(30),
        runner.wait(&key, Duration::from_millis(10)),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(snapshot.status, JobStatus::CompletedWithErrors);
    assert_eq!(snapshot.progress, 1);
    assert_eq!(snapshot.error_count, 1);
    assert!(snapshot.last_error.is_some());
}
