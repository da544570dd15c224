//! Job start and duplicate rejection
//!
//! A job is keyed by its normalized seed URL. At most one run per key may be
//! queued or running; a finished job can be started again.

use crate::chunk::Chunker;
use crate::config::Config;
use crate::crawler::coordinator::{run_job, seed_url, Pipeline};
use crate::extract::Extractor;
use crate::sink::{ConceptSink, IndexingSink};
use crate::state::{JobSnapshot, JobStatus, JobStatusStore};
use std::sync::Arc;
use thiserror::Error;

/// Reasons a job start request is refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("A crawl for {key} is already {status}")]
    AlreadyActive { key: String, status: JobStatus },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Starts crawl jobs and tracks them in a [`JobStatusStore`]
#[derive(Clone)]
pub struct JobRunner {
    config: Arc<Config>,
    pipeline: Pipeline,
    store: JobStatusStore,
}

impl JobRunner {
    /// Builds a runner whose jobs write to the given sinks
    ///
    /// The chunking strategy is resolved here, once, and held by every job
    /// this runner starts.
    pub fn new(
        config: Config,
        indexing: Arc<dyn IndexingSink>,
        concepts: Arc<dyn ConceptSink>,
        store: JobStatusStore,
    ) -> Self {
        let pipeline = Pipeline {
            extractor: Extractor::from_config(&config.ocr),
            chunker: Chunker::from_config(&config.chunking),
            indexing,
            concepts,
        };
        Self::with_pipeline(config, pipeline, store)
    }

    /// Builds a runner around an already assembled pipeline
    pub fn with_pipeline(config: Config, pipeline: Pipeline, store: JobStatusStore) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            store,
        }
    }

    pub fn store(&self) -> &JobStatusStore {
        &self.store
    }

    /// Starts a crawl of `url` in a background task
    ///
    /// # Arguments
    ///
    /// * `url` - Seed URL; must be http(s) with a host
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The job key (normalized seed URL)
    /// * `Err(StartError)` - Invalid seed, or a run for the key is active
    pub fn start(&self, url: &str) -> Result<String, StartError> {
        let seed = seed_url(url).ok_or_else(|| StartError::InvalidUrl {
            url: url.to_string(),
        })?;
        let key = seed.to_string();

        self.store
            .reserve(&key)
            .map_err(|status| StartError::AlreadyActive {
                key: key.clone(),
                status,
            })?;

        tracing::info!("Queued crawl job {}", key);
        let job = run_job(
            key.clone(),
            self.config.crawler.clone(),
            self.pipeline.clone(),
            self.store.callback(),
        );
        let handle = tokio::spawn(async move {
            let status = job.await;
            tracing::debug!("Crawl task finished with status {}", status);
        });
        self.store.attach_handle(&key, handle);

        Ok(key)
    }

    /// Snapshot of a job, or None if the key is unknown
    pub fn status(&self, key: &str) -> Option<JobSnapshot> {
        self.store.get(key)
    }

    /// Waits until the job reaches a terminal state
    ///
    /// Polls the store every `interval`. Returns None if the key is unknown.
    pub async fn wait(&self, key: &str, interval: std::time::Duration) -> Option<JobSnapshot> {
        loop {
            let snapshot = self.store.get(key)?;
            if snapshot.status.is_terminal() {
                return Some(snapshot);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
