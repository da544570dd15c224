//! Content extraction for fetched pages
//!
//! A single classifier maps the response content type to one of the supported
//! kinds (HTML, PDF, plain text); each kind has its own extractor. Every
//! extractor yields text, an optional title and the in-site links it found.

mod decode;
mod html;
mod ocr;
mod pdf;
mod text;

use crate::config::OcrConfig;
use crate::state::ScrapeErrorKind;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub use decode::{decode_text, normalize_whitespace};
pub use html::{parse_html, HtmlPage};
pub use ocr::{OcrEngine, OcrError, TesseractOcr};
pub use pdf::extract_pdf;
pub use text::extract_plain_text;

/// Errors raised while turning a response body into text
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    #[error("PDF parse error: {0}")]
    PdfParse(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ExtractionError {
    pub fn kind(&self) -> ScrapeErrorKind {
        match self {
            Self::HtmlParse(_) => ScrapeErrorKind::HtmlParse,
            Self::PdfParse(_) => ScrapeErrorKind::PdfParse,
            Self::Decode(_) => ScrapeErrorKind::Decode,
        }
    }
}

/// The content kinds the crawler knows how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Pdf,
    PlainText,
}

impl ContentKind {
    /// Classifies a content-type token by substring
    ///
    /// Returns None for content the crawler skips (images, JSON, ...).
    ///
    /// # Examples
    ///
    /// ```
    /// use knowledge_crawler::extract::ContentKind;
    ///
    /// assert_eq!(ContentKind::classify("text/html"), Some(ContentKind::Html));
    /// assert_eq!(ContentKind::classify("application/xhtml+xml"), Some(ContentKind::Html));
    /// assert_eq!(ContentKind::classify("application/pdf"), Some(ContentKind::Pdf));
    /// assert_eq!(ContentKind::classify("image/png"), None);
    /// ```
    pub fn classify(content_type: &str) -> Option<Self> {
        if content_type.contains("html") {
            Some(Self::Html)
        } else if content_type.contains("pdf") {
            Some(Self::Pdf)
        } else if content_type.contains("text/plain") {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

/// Reduces a `Content-Type` header to its lowercase media type
///
/// `"Text/HTML; charset=UTF-8"` becomes `"text/html"`; a missing header
/// becomes the empty token.
pub fn content_type_token(header: Option<&str>) -> String {
    header
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().to_lowercase())
        .unwrap_or_default()
}

/// Text extracted from one page, consumed immediately by the chunker
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub url: String,
    pub content_type: String,
    pub text: String,
    pub title: Option<String>,
    pub links: Vec<String>,
}

/// Dispatches response bodies to the extractor for their content kind
#[derive(Clone)]
pub struct Extractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    min_text_chars: usize,
}

impl Extractor {
    /// # Arguments
    ///
    /// * `ocr` - Engine used for sparse PDF pages; None disables the fallback
    /// * `min_text_chars` - OCR trigger threshold per PDF page
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, min_text_chars: usize) -> Self {
        Self {
            ocr,
            min_text_chars,
        }
    }

    /// Builds an extractor using the Tesseract CLI when OCR is enabled
    pub fn from_config(config: &OcrConfig) -> Self {
        let ocr: Option<Arc<dyn OcrEngine>> = if config.enabled {
            Some(Arc::new(TesseractOcr::from_config(config)))
        } else {
            None
        };
        Self::new(ocr, config.min_text_chars)
    }

    /// Extracts a fetched body
    ///
    /// # Arguments
    ///
    /// * `page_url` - Final URL the body was served from
    /// * `content_type` - Content-type token of the response
    /// * `body` - Raw response body
    /// * `site` - Site key links must belong to
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ExtractedPage))` - Extracted page (text may be empty)
    /// * `Ok(None)` - Content type is not one the crawler handles
    /// * `Err(ExtractionError)` - The body could not be decoded or parsed
    pub async fn extract(
        &self,
        page_url: &Url,
        content_type: &str,
        body: Vec<u8>,
        site: &str,
    ) -> Result<Option<ExtractedPage>, ExtractionError> {
        let Some(kind) = ContentKind::classify(content_type) else {
            tracing::debug!("Skipping {} with content type '{}'", page_url, content_type);
            return Ok(None);
        };

        let (text, title, links) = match kind {
            ContentKind::Html => {
                let html = decode_text(&body)?;
                let page = parse_html(&html, page_url, site)?;
                (page.text, page.title, page.links)
            }
            ContentKind::Pdf => {
                let text = extract_pdf(body, self.ocr.as_deref(), self.min_text_chars).await?;
                (text, None, Vec::new())
            }
            ContentKind::PlainText => (extract_plain_text(&body)?, None, Vec::new()),
        };

        Ok(Some(ExtractedPage {
            url: page_url.to_string(),
            content_type: content_type.to_string(),
            text,
            title,
            links,
        }))
    }
}
