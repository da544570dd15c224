//! Database schema definitions
//!
//! This module contains the SQL schema for the knowledge database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Indexed text chunks, keyed by the deterministic chunk id
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    source_url TEXT NOT NULL,
    base_url TEXT NOT NULL,
    ordinal INTEGER NOT NULL,
    title TEXT,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_url);
CREATE INDEX IF NOT EXISTS idx_chunks_base ON chunks(base_url);

-- Concept candidates with a context snippet
CREATE TABLE IF NOT EXISTS concepts (
    term TEXT PRIMARY KEY,
    snippet TEXT NOT NULL,
    source_url TEXT NOT NULL,
    added_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
