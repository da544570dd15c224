use chrono::{DateTime, Utc};
use std::fmt;

/// Maximum number of characters of error text exposed outside the crawler
pub const ERROR_SNIPPET_CHARS: usize = 100;

/// Short tag describing what went wrong with a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeErrorKind {
    Timeout,
    Network,
    HttpStatus,
    OffSiteRedirect,
    HtmlParse,
    PdfParse,
    Decode,
    Indexing,
    Panicked,
}

impl ScrapeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::OffSiteRedirect => "off_site_redirect",
            Self::HtmlParse => "html_parse",
            Self::PdfParse => "pdf_parse",
            Self::Decode => "decode",
            Self::Indexing => "indexing",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for ScrapeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-page failure recorded in a job's error log
///
/// Errors are append-only; the log is never pruned.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeError {
    pub url: String,
    pub kind: ScrapeErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ScrapeError {
    /// Creates a new error stamped with the current time
    pub fn new(url: impl Into<String>, kind: ScrapeErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns the error text truncated for external exposure
    pub fn snippet(&self) -> String {
        truncate_chars(&self.to_string(), ERROR_SNIPPET_CHARS)
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.url, self.message)
    }
}

/// Returns at most `max` characters of `s`, never splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
