//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching under a permit pool with classified failures
//! - The breadth-first frontier and visited set
//! - Overall crawl coordination and the job status state machine
//! - Starting jobs and refusing duplicates

mod coordinator;
mod fetcher;
mod frontier;
mod jobs;

pub use coordinator::{run_job, Coordinator, OrchestratorError, Pipeline};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use jobs::{JobRunner, StartError};
