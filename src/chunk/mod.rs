//! Sliding-window chunking of extracted text
//!
//! Text is split into overlapping windows, over tokens when a tokenizer is
//! available and over characters otherwise. Every chunk gets an id derived
//! from its source URL and ordinal, so re-indexing the same page overwrites
//! the same rows instead of duplicating them.

mod tokenizer;

use crate::config::{ChunkingConfig, ChunkingStrategyName};
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub use tokenizer::{Cl100kTokenizer, Tokenizer};

/// Metadata attached to every chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source_url: String,
    /// `scheme://host[:port]` of the source page
    pub base_url: String,
    /// 1-based position among the chunks emitted for this page
    pub ordinal: usize,
    pub title: Option<String>,
}

/// A bounded slice of page text, the unit handed to the indexing sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Deterministic chunk id: hex SHA-256 of `"{source_url}_{ordinal}"`
pub fn chunk_id(source_url: &str, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}", source_url, ordinal).as_bytes());
    hex::encode(hasher.finalize())
}

/// Unit the window slides over
#[derive(Clone)]
pub enum ChunkStrategy {
    Tokens {
        tokenizer: Arc<dyn Tokenizer>,
        window: usize,
        overlap: usize,
    },
    Characters {
        window: usize,
        overlap: usize,
    },
}

impl ChunkStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tokens { .. } => "tokens",
            Self::Characters { .. } => "characters",
        }
    }
}

impl std::fmt::Debug for ChunkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tokens { window, overlap, .. } => f
                .debug_struct("Tokens")
                .field("window", window)
                .field("overlap", overlap)
                .finish(),
            Self::Characters { window, overlap } => f
                .debug_struct("Characters")
                .field("window", window)
                .field("overlap", overlap)
                .finish(),
        }
    }
}

/// Returns the `[start, end)` ranges of a sliding window over `len` units
///
/// The step is `window - overlap`, or a full `window` when that would not be
/// positive, so the iteration always advances.
pub fn window_ranges(len: usize, window: usize, overlap: usize) -> Vec<(usize, usize)> {
    if window == 0 {
        return Vec::new();
    }
    let step = if window > overlap { window - overlap } else { window };

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < len {
        ranges.push((start, (start + window).min(len)));
        start += step;
    }
    ranges
}

/// Splits page text into chunks
///
/// The strategy is chosen once and held for the lifetime of the chunker.
#[derive(Debug, Clone)]
pub struct Chunker {
    strategy: ChunkStrategy,
}

impl Chunker {
    pub fn new(strategy: ChunkStrategy) -> Self {
        Self { strategy }
    }

    /// Character windows with the given sizes
    pub fn characters(window: usize, overlap: usize) -> Self {
        Self::new(ChunkStrategy::Characters { window, overlap })
    }

    /// Builds the chunker configured for this deployment
    ///
    /// If token chunking is configured but the encoding cannot be loaded, the
    /// chunker falls back to character windows and logs a warning.
    pub fn from_config(config: &ChunkingConfig) -> Self {
        let characters = ChunkStrategy::Characters {
            window: config.window_chars,
            overlap: config.overlap_chars,
        };

        let strategy = match config.strategy {
            ChunkingStrategyName::Characters => characters,
            ChunkingStrategyName::Tokens => match Cl100kTokenizer::load() {
                Ok(tokenizer) => ChunkStrategy::Tokens {
                    tokenizer: Arc::new(tokenizer),
                    window: config.window_tokens,
                    overlap: config.overlap_tokens,
                },
                Err(e) => {
                    tracing::warn!(
                        "Tokenizer unavailable ({}), chunking by characters instead",
                        e
                    );
                    characters
                }
            },
        };

        tracing::info!("Chunking strategy: {:?}", strategy);
        Self { strategy }
    }

    pub fn strategy(&self) -> &ChunkStrategy {
        &self.strategy
    }

    /// Splits `text` into ordered chunks
    ///
    /// # Arguments
    ///
    /// * `text` - Extracted page text
    /// * `source_url` - URL the text came from; part of every chunk id
    /// * `title` - Page title, copied into each chunk's metadata
    ///
    /// # Returns
    ///
    /// Chunks in document order, each holding its window's text as decoded.
    /// Windows that are blank are dropped, and ordinals count only the
    /// chunks that are kept.
    pub fn chunk(&self, text: &str, source_url: &str, title: Option<&str>) -> Vec<Chunk> {
        let pieces = match &self.strategy {
            ChunkStrategy::Tokens {
                tokenizer,
                window,
                overlap,
            } => {
                let tokens = tokenizer.encode(text);
                let pieces: Vec<String> = window_ranges(tokens.len(), *window, *overlap)
                    .into_iter()
                    .filter_map(|(start, end)| tokenizer.decode(&tokens[start..end]))
                    .collect();
                pieces
            }
            ChunkStrategy::Characters { window, overlap } => {
                let chars: Vec<char> = text.chars().collect();
                let pieces: Vec<String> = window_ranges(chars.len(), *window, *overlap)
                    .into_iter()
                    .map(|(start, end)| chars[start..end].iter().collect())
                    .collect();
                pieces
            }
        };

        let base_url = ::url::Url::parse(source_url)
            .ok()
            .and_then(|u| crate::url::base_url(&u))
            .unwrap_or_else(|| source_url.to_string());

        pieces
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .enumerate()
            .map(|(i, piece)| {
                let ordinal = i + 1;
                Chunk {
                    id: chunk_id(source_url, ordinal),
                    text: piece,
                    metadata: ChunkMetadata {
                        source_url: source_url.to_string(),
                        base_url: base_url.clone(),
                        ordinal,
                        title: title.map(str::to_string),
                    },
                }
            })
            .collect()
    }
}
