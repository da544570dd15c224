use super::ocr::OcrEngine;
use super::ExtractionError;
use std::sync::Arc;

/// Extracts page texts from a PDF's text layer, one entry per page
///
/// Runs on the blocking pool: parsing is CPU-bound and the parser can panic on
/// malformed documents, which surfaces here as a `PdfParse` error.
async fn text_layer_pages(bytes: Arc<Vec<u8>>) -> Result<Vec<String>, ExtractionError> {
    let pages =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| ExtractionError::PdfParse(format!("PDF parser aborted: {}", e)))?
            .map_err(|e| ExtractionError::PdfParse(e.to_string()))?;

    Ok(pages.into_iter().map(|page| page.trim().to_string()).collect())
}

/// Extracts the text of a PDF document, OCR'ing pages with too little text
///
/// # Arguments
///
/// * `bytes` - The PDF document
/// * `ocr` - OCR engine, or None when the fallback is disabled
/// * `min_text_chars` - Pages with fewer characters than this are OCR'd
///
/// # Returns
///
/// * `Ok(String)` - Page texts joined by blank lines (possibly empty)
/// * `Err(ExtractionError::PdfParse)` - The document could not be parsed
///
/// An OCR failure on one page leaves that page empty; it never fails the document.
pub async fn extract_pdf(
    bytes: Vec<u8>,
    ocr: Option<&dyn OcrEngine>,
    min_text_chars: usize,
) -> Result<String, ExtractionError> {
    let bytes = Arc::new(bytes);
    let pages = text_layer_pages(Arc::clone(&bytes)).await?;
    Ok(fill_sparse_pages(pages, &bytes, ocr, min_text_chars).await)
}

/// Replaces pages shorter than `min_text_chars` with their OCR text and joins
/// all pages with blank lines
async fn fill_sparse_pages(
    pages: Vec<String>,
    pdf: &[u8],
    ocr: Option<&dyn OcrEngine>,
    min_text_chars: usize,
) -> String {
    let page_count = pages.len();
    let mut texts = Vec::with_capacity(page_count);

    for (index, page_text) in pages.into_iter().enumerate() {
        let page_no = index + 1;
        let chars = page_text.chars().count();

        let text = match ocr {
            Some(engine) if chars < min_text_chars => {
                tracing::debug!(
                    "Page {}/{} has {} chars, attempting OCR",
                    page_no,
                    page_count,
                    chars
                );
                match engine.recognize_page(pdf, page_no).await {
                    Ok(recognized) => recognized.trim().to_string(),
                    Err(e) => {
                        tracing::warn!("OCR failed on page {}/{}: {}", page_no, page_count, e);
                        String::new()
                    }
                }
            }
            _ => page_text,
        };

        texts.push(text);
    }

    texts.join("\n\n").trim().to_string()
}
