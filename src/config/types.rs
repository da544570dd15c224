use serde::Deserialize;

/// Main configuration structure for Knowledge-Crawler
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub chunking: ChunkingConfig,
    pub ocr: OcrConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Permit count shared by the fetcher and the worker pool
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: u32,

    /// Fixed delay before every request (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "read-timeout-secs")]
    pub read_timeout_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_concurrent: 5,
            politeness_delay_ms: 50,
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            user_agent: "KnowledgeBot/1.0".to_string(),
        }
    }
}

/// Which unit the chunker slides its window over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategyName {
    Tokens,
    Characters,
}

/// Chunking configuration
///
/// The strategy is fixed per deployment: chunk ids depend on ordinals, so
/// switching strategies re-keys every chunk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategyName,

    #[serde(rename = "window-tokens")]
    pub window_tokens: usize,

    #[serde(rename = "overlap-tokens")]
    pub overlap_tokens: usize,

    #[serde(rename = "window-chars")]
    pub window_chars: usize,

    #[serde(rename = "overlap-chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategyName::Tokens,
            window_tokens: 500,
            overlap_tokens: 50,
            window_chars: 1500,
            overlap_chars: 150,
        }
    }
}

/// OCR fallback configuration for PDF pages without a usable text layer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,

    /// Pages with fewer extracted characters than this are OCR'd
    #[serde(rename = "min-text-chars")]
    pub min_text_chars: usize,

    pub dpi: u32,

    /// Tesseract language set, e.g. `eng+spa+cat`
    pub languages: String,

    /// Executable that renders a PDF page to PNG
    pub renderer: String,

    /// OCR engine executable
    pub tesseract: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_text_chars: 50,
            dpi: 300,
            languages: "eng+spa+cat".to_string(),
            renderer: "pdftoppm".to_string(),
            tesseract: "tesseract".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./knowledge.db".to_string(),
        }
    }
}
