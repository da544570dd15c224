use super::decode::{decode_text, normalize_whitespace};
use super::ExtractionError;

/// Decodes a plain-text body and collapses its whitespace
pub fn extract_plain_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = decode_text(bytes)?;
    Ok(normalize_whitespace(&text))
}
