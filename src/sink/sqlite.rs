//! SQLite sink implementation
//!
//! Persists chunks and concept candidates. Writes run on the blocking pool so
//! the crawl loop never waits on disk I/O directly.

use super::schema::initialize_schema;
use super::{ConceptSink, IndexingSink, SinkError};
use crate::chunk::{Chunk, ChunkMetadata};
use crate::CrawlerError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// SQLite-backed indexing and concept sink
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, SinkError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|e| SinkError::Rejected(format!("sqlite task aborted: {}", e)))?
        .map_err(SinkError::from)
    }

    /// Number of stored chunks
    pub fn chunk_count(&self) -> Result<usize, CrawlerError> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Stored chunks of one page, ordered by ordinal
    pub fn chunks_for(&self, source_url: &str) -> Result<Vec<Chunk>, CrawlerError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, text, source_url, base_url, ordinal, title
             FROM chunks WHERE source_url = ?1 ORDER BY ordinal",
        )?;

        let chunks = stmt
            .query_map(params![source_url], |row| {
                Ok(Chunk {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    metadata: ChunkMetadata {
                        source_url: row.get(2)?,
                        base_url: row.get(3)?,
                        ordinal: row.get::<_, i64>(4)? as usize,
                        title: row.get(5)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    /// Distinct base URLs that have indexed chunks
    pub fn sources(&self) -> Result<Vec<String>, CrawlerError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT base_url FROM chunks ORDER BY base_url")?;
        let sources = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(sources)
    }

    /// Stored concept terms, alphabetically
    pub fn concept_terms(&self) -> Result<Vec<String>, CrawlerError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT term FROM concepts ORDER BY term")?;
        let terms = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(terms)
    }
}

#[async_trait]
impl IndexingSink for SqliteSink {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<(), SinkError> {
        let chunks = chunks.to_vec();
        self.with_conn(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO chunks
                     (id, text, source_url, base_url, ordinal, title, indexed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for chunk in &chunks {
                    stmt.execute(params![
                        chunk.id,
                        chunk.text,
                        chunk.metadata.source_url,
                        chunk.metadata.base_url,
                        chunk.metadata.ordinal as i64,
                        chunk.metadata.title,
                        now,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
    }
}

#[async_trait]
impl ConceptSink for SqliteSink {
    async fn add(&self, term: &str, snippet: &str, source_url: &str) -> Result<(), SinkError> {
        let (term, snippet, source_url) =
            (term.to_string(), snippet.to_string(), source_url.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO concepts (term, snippet, source_url, added_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![term, snippet, source_url, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use tempfile::TempDir;

    const URL: &str = "https://example.com/docs";

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let sink = SqliteSink::new_in_memory().unwrap();
        let chunks = Chunker::characters(5, 0).chunk("helloworld", URL, Some("Docs"));

        sink.upsert(&chunks).await.unwrap();

        let stored = sink.chunks_for(URL).unwrap();
        assert_eq!(stored, chunks);
        assert_eq!(sink.chunk_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let sink = SqliteSink::new_in_memory().unwrap();
        let chunker = Chunker::characters(5, 0);

        sink.upsert(&chunker.chunk("helloworld", URL, None)).await.unwrap();
        sink.upsert(&chunker.chunk("helloworld", URL, None)).await.unwrap();
        assert_eq!(sink.chunk_count().unwrap(), 2);

        // Same ordinals, new content: rows are replaced, not added
        sink.upsert(&chunker.chunk("HELLOWORLD", URL, None)).await.unwrap();
        assert_eq!(sink.chunk_count().unwrap(), 2);
        assert_eq!(sink.chunks_for(URL).unwrap()[0].text, "HELLO");
    }

    #[tokio::test]
    async fn test_sources() {
        let sink = SqliteSink::new_in_memory().unwrap();
        let chunker = Chunker::characters(100, 0);
        sink.upsert(&chunker.chunk("a", "https://b.example/x", None)).await.unwrap();
        sink.upsert(&chunker.chunk("b", "https://a.example/y", None)).await.unwrap();
        sink.upsert(&chunker.chunk("c", "https://a.example/z", None)).await.unwrap();

        assert_eq!(
            sink.sources().unwrap(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[tokio::test]
    async fn test_concepts() {
        let sink = SqliteSink::new_in_memory().unwrap();
        sink.add("NASA", "snippet one", URL).await.unwrap();
        sink.add("NASA", "snippet two", URL).await.unwrap();
        sink.add("ESA", "snippet", URL).await.unwrap();

        assert_eq!(sink.concept_terms().unwrap(), vec!["ESA", "NASA"]);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knowledge.db");

        {
            let sink = SqliteSink::new(&path).unwrap();
            let chunks = Chunker::characters(100, 0).chunk("persisted", URL, None);
            sink.upsert(&chunks).await.unwrap();
        }

        let reopened = SqliteSink::new(&path).unwrap();
        assert_eq!(reopened.chunk_count().unwrap(), 1);
    }
}
