use super::{ConceptSink, IndexingSink, SinkError};
use crate::chunk::Chunk;
use crate::concepts::ConceptCandidate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory sink for both chunks and concepts
///
/// Chunks keep insertion order; an upsert with a known id replaces the chunk
/// in place. Either half can be switched to reject everything, which is how
/// tests exercise the crawler's rejection handling.
#[derive(Debug, Default)]
pub struct MemorySink {
    chunks: Mutex<Vec<Chunk>>,
    concepts: Mutex<Vec<ConceptCandidate>>,
    reject_chunks: AtomicBool,
    reject_concepts: AtomicBool,
    upsert_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject_chunks(&self, reject: bool) {
        self.reject_chunks.store(reject, Ordering::SeqCst);
    }

    pub fn set_reject_concepts(&self, reject: bool) {
        self.reject_concepts.store(reject, Ordering::SeqCst);
    }

    /// Stored chunks in insertion order
    pub fn chunks(&self) -> Vec<Chunk> {
        lock(&self.chunks).clone()
    }

    /// Stored chunks whose source URL matches
    pub fn chunks_for(&self, source_url: &str) -> Vec<Chunk> {
        lock(&self.chunks)
            .iter()
            .filter(|c| c.metadata.source_url == source_url)
            .cloned()
            .collect()
    }

    /// Accepted concept candidates in insertion order
    pub fn concepts(&self) -> Vec<ConceptCandidate> {
        lock(&self.concepts).clone()
    }

    /// Number of upsert calls received, accepted or not
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexingSink for MemorySink {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), SinkError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_chunks.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected(format!(
                "{} chunks refused",
                chunks.len()
            )));
        }

        let mut stored = lock(&self.chunks);
        for chunk in chunks {
            match stored.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => stored.push(chunk.clone()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConceptSink for MemorySink {
    async fn add(&self, term: &str, snippet: &str, source_url: &str) -> Result<(), SinkError> {
        if self.reject_concepts.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected(format!("concept '{}' refused", term)));
        }
        lock(&self.concepts).push(ConceptCandidate {
            term: term.to_string(),
            snippet: snippet.to_string(),
            source_url: source_url.to_string(),
        });
        Ok(())
    }
}
