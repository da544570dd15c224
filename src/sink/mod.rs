//! Sinks that receive crawl output
//!
//! The crawler hands chunk batches to an [`IndexingSink`] and concept
//! candidates to a [`ConceptSink`]. Both may reject input; the crawler records
//! the rejection and keeps going.
//!
//! # Implementations
//!
//! - `MemorySink`: keeps everything in memory, used by tests and dry runs
//! - `SqliteSink`: persists chunks and concepts with rusqlite

mod memory;
mod schema;
mod sqlite;

use crate::chunk::Chunk;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

/// Errors a sink can report back to the crawler
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink rejected input: {0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Receives chunk batches for indexing
///
/// `upsert` is idempotent on chunk id: re-sending a chunk overwrites it.
#[async_trait]
pub trait IndexingSink: Send + Sync {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), SinkError>;
}

/// Receives concept candidates (term plus surrounding context)
#[async_trait]
pub trait ConceptSink: Send + Sync {
    async fn add(&self, term: &str, snippet: &str, source_url: &str) -> Result<(), SinkError>;
}
