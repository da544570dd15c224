//! State module for tracking crawl jobs
//!
//! This module provides the job lifecycle and the shared status store that the
//! coordinator reports into and external callers query.
//!
//! # Components
//!
//! - `JobStatus`: Lifecycle of a job (queued, running, completed, ...)
//! - `JobStatusStore`: Lockable map of job key → progress record
//! - `ScrapeError`: Per-page failure entry in a job's error log

mod job_status;
mod job_store;
mod scrape_error;

// Re-export main types
pub use job_status::JobStatus;
pub use job_store::{completion_message, JobSnapshot, JobStatusStore, StatusCallback, StatusUpdate};
pub use scrape_error::{truncate_chars, ScrapeError, ScrapeErrorKind, ERROR_SNIPPET_CHARS};
