use super::job_status::JobStatus;
use super::scrape_error::{truncate_chars, ScrapeError, ERROR_SNIPPET_CHARS};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// One status push from a running crawl
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub key: String,
    pub status: JobStatus,
    pub processed: usize,
    pub total: usize,
    pub message: Option<String>,
    pub error: Option<ScrapeError>,
}

impl StatusUpdate {
    pub fn new(key: impl Into<String>, status: JobStatus, processed: usize, total: usize) -> Self {
        Self {
            key: key.into(),
            status,
            processed,
            total,
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: Option<ScrapeError>) -> Self {
        self.error = error;
        self
    }
}

/// Function handle through which the coordinator reports progress
///
/// The coordinator only knows this signature, never the store behind it.
pub type StatusCallback = Arc<dyn Fn(StatusUpdate) + Send + Sync>;

/// Defensive copy of a job record, safe to hand to external callers
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub url: String,
    pub status: JobStatus,
    pub progress: usize,
    pub total_pages: usize,
    pub message: Option<String>,
    pub error_count: usize,
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

struct JobRecord {
    url: String,
    status: JobStatus,
    processed: usize,
    total: usize,
    message: Option<String>,
    errors: Vec<ScrapeError>,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    handle: Option<JoinHandle<()>>,
}

impl JobRecord {
    fn queued(url: &str) -> Self {
        let now = Utc::now();
        Self {
            url: url.to_string(),
            status: JobStatus::Queued,
            processed: 0,
            total: 0,
            message: None,
            errors: Vec::new(),
            started_at: now,
            updated_at: now,
            handle: None,
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            url: self.url.clone(),
            status: self.status,
            progress: self.processed,
            total_pages: self.total,
            message: self.message.clone(),
            error_count: self.errors.len(),
            last_error: self.errors.last().map(ScrapeError::snippet),
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }
}

/// In-memory map of job key → status record
///
/// Cloning the store clones a handle; all clones share one map behind a single
/// coarse lock. The lock is never held across an `.await`.
#[derive(Clone, Default)]
pub struct JobStatusStore {
    inner: Arc<Mutex<HashMap<String, JobRecord>>>,
}

impl JobStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JobRecord>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a `queued` record for `key` unless an active one already exists
    ///
    /// A record in a terminal state is replaced by a fresh one so the job can
    /// run again.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The key is now reserved for a new run
    /// * `Err(JobStatus)` - The status of the run already holding the key
    pub fn reserve(&self, key: &str) -> Result<(), JobStatus> {
        let mut jobs = self.lock();
        if let Some(existing) = jobs.get(key) {
            if existing.status.is_active() {
                return Err(existing.status);
            }
        }
        jobs.insert(key.to_string(), JobRecord::queued(key));
        Ok(())
    }

    /// Stores the task running the job; never exposed through snapshots
    pub fn attach_handle(&self, key: &str, handle: JoinHandle<()>) {
        if let Some(record) = self.lock().get_mut(key) {
            if !record.status.is_terminal() {
                record.handle = Some(handle);
            }
        }
    }

    /// Applies a status update to the job record
    ///
    /// Creates the record if absent. Updates against a terminal record are
    /// dropped, as are updates that would move the status backwards. An
    /// attached error is appended to the job's error log.
    pub fn update(&self, update: StatusUpdate) {
        let mut jobs = self.lock();
        let record = jobs
            .entry(update.key.clone())
            .or_insert_with(|| JobRecord::queued(&update.key));

        if record.status.is_terminal() {
            tracing::warn!(
                "Ignoring {} update for {}: job already {}",
                update.status,
                update.key,
                record.status
            );
            return;
        }

        if update.status.rank() >= record.status.rank() {
            record.status = update.status;
        }
        record.processed = update.processed;
        record.total = update.total;
        if update.message.is_some() {
            record.message = update.message;
        }
        if let Some(error) = update.error {
            record.errors.push(error);
        }
        record.updated_at = Utc::now();

        if record.status.is_terminal() {
            record.handle = None;
        }
    }

    /// Returns a snapshot of the job, or None if the key is unknown
    pub fn get(&self, key: &str) -> Option<JobSnapshot> {
        self.lock().get(key).map(JobRecord::snapshot)
    }

    /// Returns snapshots of every known job, ordered by key
    pub fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.lock();
        let mut keys: Vec<&String> = jobs.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|k| jobs.get(k).map(JobRecord::snapshot))
            .collect()
    }

    /// Returns the full error log of a job
    pub fn errors(&self, key: &str) -> Vec<ScrapeError> {
        self.lock()
            .get(key)
            .map(|record| record.errors.clone())
            .unwrap_or_default()
    }

    /// Number of jobs known to the store
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a callback that writes updates into this store
    pub fn callback(&self) -> StatusCallback {
        let store = self.clone();
        Arc::new(move |update| store.update(update))
    }
}

/// Formats the message attached to the final status update
pub fn completion_message(elapsed_secs: f64, processed: usize, errors: &[ScrapeError]) -> String {
    let mut message = format!(
        "Crawl finished in {:.2}s. Processed: {}. Errors: {}.",
        elapsed_secs,
        processed,
        errors.len()
    );
    if let Some(last) = errors.last() {
        message.push_str(&format!(
            " Last error: {}...",
            truncate_chars(&last.to_string(), ERROR_SNIPPET_CHARS)
        ));
    }
    message
}
