//! Knowledge-Crawler: a depth-bounded single-site crawler that feeds a text index
//!
//! This crate crawls one website breadth-first under a concurrency limit,
//! extracts text from HTML, PDF (with an OCR fallback) and plain-text pages,
//! splits it into overlapping chunks with stable ids, and hands those chunks to
//! an indexing sink while reporting live job progress to a status store.

pub mod chunk;
pub mod concepts;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod sink;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Knowledge-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Job could not be started: {0}")]
    Start(#[from] crawler::StartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
///
/// Raised when a URL cannot be normalized; callers drop the entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Knowledge-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkMetadata, ChunkStrategy, Chunker};
pub use config::Config;
pub use crawler::{Coordinator, JobRunner};
pub use sink::{ConceptSink, IndexingSink, MemorySink, SinkError, SqliteSink};
pub use state::{JobSnapshot, JobStatus, JobStatusStore, ScrapeError, ScrapeErrorKind};
pub use url::{is_same_site, is_valid_url, normalize_url};
