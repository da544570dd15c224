//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the control loop of one crawl job:
//! - Seeding the frontier and reporting the start of the job
//! - Running up to `max-concurrent` page units at once
//! - Folding each finished unit back into the frontier and the counters
//! - Deciding the final status and reporting it
//!
//! A page unit is fetch → extract → chunk → index → concepts. Every failure
//! inside a unit becomes a [`ScrapeError`] on the job; only a fault in the
//! control loop itself ends the job as `failed`.

use crate::chunk::Chunker;
use crate::concepts::ConceptTracker;
use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::extract::Extractor;
use crate::sink::{ConceptSink, IndexingSink};
use crate::state::{
    completion_message, JobStatus, ScrapeError, ScrapeErrorKind, StatusCallback, StatusUpdate,
};
use crate::url::{normalize_url, parse_normalized, site_key};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Faults that end a job as `failed`
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Crawl loop panicked: {0}")]
    Panicked(String),
}

/// Everything a page passes through after it is fetched
#[derive(Clone)]
pub struct Pipeline {
    pub extractor: Extractor,
    pub chunker: Chunker,
    pub indexing: Arc<dyn IndexingSink>,
    pub concepts: Arc<dyn ConceptSink>,
}

/// Result of one page unit, applied by the control loop
#[derive(Debug)]
struct UnitOutcome {
    entry: FrontierEntry,
    final_url: Option<String>,
    links: Vec<String>,
    chunks: usize,
    error: Option<ScrapeError>,
}

impl UnitOutcome {
    fn new(entry: FrontierEntry) -> Self {
        Self {
            entry,
            final_url: None,
            links: Vec::new(),
            chunks: 0,
            error: None,
        }
    }

    fn failed(mut self, kind: ScrapeErrorKind, message: impl Into<String>) -> Self {
        self.error = Some(ScrapeError::new(self.entry.url.clone(), kind, message));
        self
    }
}

/// Per-job page processing shared by all in-flight units
struct PageWorker {
    fetcher: Fetcher,
    pipeline: Pipeline,
    site: String,
    concepts: Mutex<ConceptTracker>,
}

impl PageWorker {
    async fn process(&self, entry: FrontierEntry) -> UnitOutcome {
        let mut outcome = UnitOutcome::new(entry);
        let url = outcome.entry.url.clone();

        let page = match self.fetcher.fetch(&url, &self.site).await {
            Ok(page) => page,
            Err(e) => {
                if let FetchError::OffSiteRedirect { final_url } = &e {
                    outcome.final_url = Some(final_url.clone());
                }
                tracing::warn!("Failed to fetch {}: {}", url, e);
                return outcome.failed(e.kind(), e.to_string());
            }
        };
        outcome.final_url = Some(normalize_url(page.final_url.as_str()));

        let extracted = match self
            .pipeline
            .extractor
            .extract(&page.final_url, &page.content_type, page.body, &self.site)
            .await
        {
            Ok(Some(extracted)) => extracted,
            Ok(None) => return outcome,
            Err(e) => {
                tracing::warn!("Failed to extract {}: {}", url, e);
                return outcome.failed(e.kind(), e.to_string());
            }
        };
        outcome.links = extracted.links;

        if extracted.text.trim().is_empty() {
            tracing::debug!("No text extracted from {}", url);
            return outcome;
        }

        let chunks = self
            .pipeline
            .chunker
            .chunk(&extracted.text, &url, extracted.title.as_deref());
        if chunks.is_empty() {
            return outcome;
        }

        if let Err(e) = self.pipeline.indexing.upsert(&chunks).await {
            tracing::warn!("Failed to index {} chunks from {}: {}", chunks.len(), url, e);
            return outcome.failed(ScrapeErrorKind::Indexing, e.to_string());
        }
        outcome.chunks = chunks.len();
        tracing::info!("Indexed {} chunks from {}", chunks.len(), url);

        let mut tracker = self.concepts.lock().await;
        for chunk in &chunks {
            tracker
                .offer(self.pipeline.concepts.as_ref(), &chunk.text, &url)
                .await;
        }

        outcome
    }
}

/// Main crawler coordinator structure
///
/// Owns one job from its first status update to its last.
pub struct Coordinator {
    key: String,
    max_depth: u32,
    max_concurrent: usize,
    worker: PageWorker,
    callback: StatusCallback,
    processed: usize,
    total: usize,
    errors: Vec<ScrapeError>,
}

impl Coordinator {
    /// Creates a coordinator for one crawl job
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed URL; normalized to form the job key
    /// * `config` - The crawler configuration
    /// * `pipeline` - Extraction, chunking and sinks
    /// * `callback` - Receives every status update of the job
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(OrchestratorError)` - Seed unusable or HTTP client unavailable
    pub fn new(
        seed: &str,
        config: &CrawlerConfig,
        pipeline: Pipeline,
        callback: StatusCallback,
    ) -> Result<Self, OrchestratorError> {
        let seed_url = parse_normalized(seed).map_err(|e| OrchestratorError::InvalidSeed {
            url: seed.to_string(),
            reason: e.to_string(),
        })?;
        let site = site_key(&seed_url).ok_or_else(|| OrchestratorError::InvalidSeed {
            url: seed.to_string(),
            reason: "no host".to_string(),
        })?;

        let client = build_http_client(config)?;
        let fetcher = Fetcher::with_client(client, config);
        let max_concurrent = fetcher.max_concurrent();

        Ok(Self {
            key: seed_url.to_string(),
            max_depth: config.max_depth,
            max_concurrent,
            worker: PageWorker {
                fetcher,
                pipeline,
                site,
                concepts: Mutex::new(ConceptTracker::new()),
            },
            callback,
            processed: 0,
            total: 1,
            errors: Vec::new(),
        })
    }

    /// Job key (normalized seed URL)
    pub fn key(&self) -> &str {
        &self.key
    }

    fn report(&self, status: JobStatus, message: Option<String>, error: Option<ScrapeError>) {
        let mut update = StatusUpdate::new(self.key.clone(), status, self.processed, self.total)
            .with_error(error);
        if let Some(message) = message {
            update = update.with_message(message);
        }
        (self.callback)(update);
    }

    /// Runs the crawl to completion
    ///
    /// The loop tops up in-flight units to `max-concurrent` from the frontier,
    /// then waits for one to finish. It ends when the frontier is empty and
    /// nothing is in flight.
    ///
    /// # Returns
    ///
    /// `completed` if no page failed, `completed_with_errors` otherwise
    pub async fn run(&mut self) -> JobStatus {
        let start_time = Instant::now();
        tracing::info!("Starting crawl of {} (max depth {})", self.key, self.max_depth);

        let mut frontier = Frontier::new(self.key.clone(), self.max_depth);
        self.processed = 0;
        self.total = 1;
        self.errors.clear();
        self.report(JobStatus::Running, Some("Crawl started...".to_string()), None);

        let worker = &self.worker;
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.max_concurrent {
                let Some(entry) = frontier.pop() else {
                    break;
                };
                tracing::debug!("Processing URL: {} (depth {})", entry.url, entry.depth);
                in_flight.push(isolated(worker, entry));
            }

            let Some(outcome) = in_flight.next().await else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            if let Some(final_url) = &outcome.final_url {
                frontier.mark_visited(final_url.clone());
            }

            let link_count = outcome.links.len();
            let mut newly_queued = 0;
            for link in outcome.links {
                if frontier.push(link, outcome.entry.depth + 1) {
                    newly_queued += 1;
                }
            }

            self.processed += 1;
            self.total += newly_queued;
            if let Some(error) = &outcome.error {
                self.errors.push(error.clone());
            }

            tracing::info!(
                "Processed: {} (Depth: {}). Pages Processed: {}/{}. Chunks: {}. Links Found: {}. Errors: {}",
                outcome.entry.url,
                outcome.entry.depth,
                self.processed,
                self.total,
                outcome.chunks,
                link_count,
                self.errors.len()
            );

            let mut update =
                StatusUpdate::new(self.key.clone(), JobStatus::Running, self.processed, self.total)
                    .with_error(outcome.error);
            if update.error.is_some() {
                update = update.with_message(format!("Failed to process {}", outcome.entry.url));
            }
            (self.callback)(update);
        }

        let status = if self.errors.is_empty() {
            JobStatus::Completed
        } else {
            JobStatus::CompletedWithErrors
        };
        let message = completion_message(
            start_time.elapsed().as_secs_f64(),
            self.processed,
            &self.errors,
        );
        tracing::info!("{}", message);
        if !self.errors.is_empty() {
            let sample: Vec<String> = self.errors.iter().take(5).map(|e| e.to_string()).collect();
            tracing::warn!(
                "Errors encountered during crawl of {}: {} total. Sample: {:?}",
                self.key,
                self.errors.len(),
                sample
            );
        }
        self.report(status, Some(message), None);

        status
    }

    /// Reports the job as failed, keeping the counters reached so far
    pub fn fail(&self, error: &OrchestratorError) {
        tracing::error!("Crawl of {} failed: {}", self.key, error);
        self.report(
            JobStatus::Failed,
            Some(format!("Crawl failed: {}", error)),
            None,
        );
    }
}

/// Runs one page unit, turning a panic inside it into a page error
async fn isolated(worker: &PageWorker, entry: FrontierEntry) -> UnitOutcome {
    let fallback = UnitOutcome::new(entry.clone());
    match AssertUnwindSafe(worker.process(entry)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic_info) => {
            let message = extract_panic_message(&panic_info);
            tracing::error!("Page unit for {} panicked: {}", fallback.entry.url, message);
            fallback.failed(
                ScrapeErrorKind::Panicked,
                format!("Page unit panicked: {}", message),
            )
        }
    }
}

/// Runs one job from construction to its terminal status update
///
/// Construction errors and panics in the control loop end the job as
/// `failed`; nothing escapes to the caller. A panic inside a page unit is
/// only a page error.
///
/// # Arguments
///
/// * `key` - Job key (normalized seed URL)
/// * `config` - The crawler configuration
/// * `pipeline` - Extraction, chunking and sinks
/// * `callback` - Receives every status update of the job
pub async fn run_job(
    key: String,
    config: CrawlerConfig,
    pipeline: Pipeline,
    callback: StatusCallback,
) -> JobStatus {
    let mut coordinator = match Coordinator::new(&key, &config, pipeline, Arc::clone(&callback)) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!("Crawl of {} failed to start: {}", key, e);
            callback(
                StatusUpdate::new(key, JobStatus::Failed, 0, 0)
                    .with_message(format!("Crawl failed: {}", e)),
            );
            return JobStatus::Failed;
        }
    };

    match AssertUnwindSafe(coordinator.run()).catch_unwind().await {
        Ok(status) => status,
        Err(panic_info) => {
            let error = OrchestratorError::Panicked(extract_panic_message(&panic_info));
            coordinator.fail(&error);
            JobStatus::Failed
        }
    }
}

/// Extract a human-readable message from a panic payload
fn extract_panic_message(panic_info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Parses the seed the way the coordinator will key it
pub(crate) fn seed_url(seed: &str) -> Option<Url> {
    parse_normalized(seed).ok().filter(|url| site_key(url).is_some())
}
